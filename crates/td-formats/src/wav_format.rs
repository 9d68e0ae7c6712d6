//! WAV decoding and encoding.
//!
//! Chunk headers are parsed with binrw; sample data is converted by hand to
//! planar f32. Integer PCM of 8, 16, 24 and 32 bits and 32-bit float are
//! read directly. Anything else is reported as `Unsupported` so the caller
//! can hand the file to symphonia.

use std::io::{Cursor, Write};

use binrw::{BinRead, BinReaderExt};
use td_ir::{AudioSource, StreamData, MAX_CHANNELS};

use crate::FormatError;

const FORMAT_PCM: u16 = 1;
const FORMAT_IEEE_FLOAT: u16 = 3;

#[derive(BinRead, Debug)]
#[br(little, magic = b"RIFF")]
struct RiffHeader {
    _size: u32,
    #[br(assert(form == *b"WAVE", "not a WAVE file"))]
    form: [u8; 4],
}

#[derive(BinRead, Debug)]
#[br(little)]
struct ChunkHeader {
    id: [u8; 4],
    size: u32,
}

#[derive(BinRead, Debug, Clone, Copy)]
#[br(little)]
struct FmtChunk {
    format_tag: u16,
    channels: u16,
    sample_rate: u32,
    _byte_rate: u32,
    _block_align: u16,
    bits_per_sample: u16,
}

struct WavLayout {
    fmt: FmtChunk,
    data_offset: usize,
    data_size: usize,
}

// --- Reading ---

/// Decode a WAV file held in memory.
pub fn load_wav(data: &[u8]) -> Result<StreamData, FormatError> {
    let layout = parse_layout(data)?;
    let fmt = layout.fmt;

    let end = layout.data_offset.saturating_add(layout.data_size).min(data.len());
    let raw = &data[layout.data_offset..end];
    let convert = sample_converter(fmt.format_tag, fmt.bits_per_sample)?;

    let channels = fmt.channels as usize;
    let bytes_per_sample = fmt.bits_per_sample as usize / 8;
    let frames = raw.len() / (bytes_per_sample * channels);
    let mut planes = vec![Vec::with_capacity(frames); channels];

    for frame in raw.chunks_exact(bytes_per_sample * channels) {
        for (plane, sample) in planes.iter_mut().zip(frame.chunks_exact(bytes_per_sample)) {
            plane.push(convert(sample));
        }
    }

    Ok(StreamData::from_planar(planes, fmt.sample_rate))
}

fn parse_layout(data: &[u8]) -> Result<WavLayout, FormatError> {
    let mut cursor = Cursor::new(data);
    cursor.read_le::<RiffHeader>().map_err(header_error)?;

    let mut fmt: Option<FmtChunk> = None;
    let mut body: Option<(usize, usize)> = None;

    while cursor.position() as usize + 8 <= data.len() {
        let chunk: ChunkHeader = cursor.read_le().map_err(header_error)?;
        let start = cursor.position() as usize;

        match &chunk.id {
            b"fmt " if chunk.size >= 16 => fmt = Some(cursor.read_le().map_err(header_error)?),
            b"data" => body = Some((start, chunk.size as usize)),
            _ => {}
        }

        // Chunks are padded to even sizes.
        let mut next = start.saturating_add(chunk.size as usize);
        if next % 2 != 0 {
            next += 1;
        }
        cursor.set_position(next as u64);
    }

    let fmt = fmt.ok_or_else(|| FormatError::InvalidHeader("missing fmt chunk".into()))?;
    let (data_offset, data_size) =
        body.ok_or_else(|| FormatError::InvalidHeader("missing data chunk".into()))?;

    if fmt.channels == 0 || fmt.channels > MAX_CHANNELS {
        return Err(FormatError::Unsupported(format!("{} channels", fmt.channels)));
    }
    if fmt.sample_rate == 0 {
        return Err(FormatError::InvalidHeader("sample rate is zero".into()));
    }

    Ok(WavLayout { fmt, data_offset, data_size })
}

fn header_error(err: binrw::Error) -> FormatError {
    match err {
        binrw::Error::Io(ref e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            FormatError::UnexpectedEof
        }
        other => FormatError::InvalidHeader(other.to_string()),
    }
}

fn sample_converter(format_tag: u16, bits: u16) -> Result<fn(&[u8]) -> f32, FormatError> {
    match (format_tag, bits) {
        (FORMAT_PCM, 8) => Ok(read_u8),
        (FORMAT_PCM, 16) => Ok(read_i16),
        (FORMAT_PCM, 24) => Ok(read_i24),
        (FORMAT_PCM, 32) => Ok(read_i32),
        (FORMAT_IEEE_FLOAT, 32) => Ok(read_f32),
        (tag, bits) => Err(FormatError::Unsupported(format!(
            "format tag {tag:#06x} with {bits} bits"
        ))),
    }
}

/// 8-bit WAV is unsigned with 128 as the midpoint.
fn read_u8(b: &[u8]) -> f32 {
    (b[0] as f32 - 128.0) / 128.0
}

fn read_i16(b: &[u8]) -> f32 {
    i16::from_le_bytes([b[0], b[1]]) as f32 / 32768.0
}

fn read_i24(b: &[u8]) -> f32 {
    let v = i32::from_le_bytes([0, b[0], b[1], b[2]]) >> 8;
    v as f32 / 8_388_608.0
}

fn read_i32(b: &[u8]) -> f32 {
    (i32::from_le_bytes([b[0], b[1], b[2], b[3]]) as f64 / 2_147_483_648.0) as f32
}

fn read_f32(b: &[u8]) -> f32 {
    f32::from_le_bytes([b[0], b[1], b[2], b[3]])
}

// --- Writing ---

/// Write `source` as 16-bit PCM. Samples outside [-1, 1] are clipped.
pub fn write_wav(w: &mut impl Write, source: &impl AudioSource) -> std::io::Result<()> {
    let num_channels = source.channels().max(1);
    let bits_per_sample: u16 = 16;
    let block_align = num_channels * (bits_per_sample / 8);
    let data_size = source.frames() as u32 * block_align as u32;

    write_riff_header(w, data_size)?;
    write_fmt_chunk(w, num_channels, source.sample_rate(), block_align, bits_per_sample)?;

    w.write_all(b"data")?;
    w.write_all(&data_size.to_le_bytes())?;
    for frame in 0..source.frames() {
        for ch in 0..num_channels {
            let s = source.read_f32(ch, frame).clamp(-1.0, 1.0);
            w.write_all(&((s * 32767.0) as i16).to_le_bytes())?;
        }
    }
    Ok(())
}

/// Encode `source` into an in-memory WAV file.
pub fn wav_bytes(source: &impl AudioSource) -> Vec<u8> {
    let mut buf = Vec::with_capacity(44 + source.frames() * source.channels() as usize * 2);
    // Writing into a Vec cannot fail.
    let _ = write_wav(&mut buf, source);
    buf
}

fn write_riff_header(w: &mut impl Write, data_size: u32) -> std::io::Result<()> {
    w.write_all(b"RIFF")?;
    w.write_all(&(36 + data_size).to_le_bytes())?;
    w.write_all(b"WAVE")
}

fn write_fmt_chunk(
    w: &mut impl Write,
    num_channels: u16,
    sample_rate: u32,
    block_align: u16,
    bits_per_sample: u16,
) -> std::io::Result<()> {
    w.write_all(b"fmt ")?;
    w.write_all(&16u32.to_le_bytes())?;
    w.write_all(&FORMAT_PCM.to_le_bytes())?;
    w.write_all(&num_channels.to_le_bytes())?;
    w.write_all(&sample_rate.to_le_bytes())?;
    w.write_all(&(sample_rate * block_align as u32).to_le_bytes())?;
    w.write_all(&block_align.to_le_bytes())?;
    w.write_all(&bits_per_sample.to_le_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build a minimal WAV file from raw parameters.
    fn make_wav(format_tag: u16, channels: u16, sample_rate: u32, bits: u16, pcm: &[u8]) -> Vec<u8> {
        let block_align = channels * (bits / 8);
        let byte_rate = sample_rate * block_align as u32;
        let data_size = pcm.len() as u32;

        let mut buf = Vec::new();
        buf.extend(b"RIFF");
        buf.extend(&(36 + data_size).to_le_bytes());
        buf.extend(b"WAVE");
        buf.extend(b"fmt ");
        buf.extend(&16u32.to_le_bytes());
        buf.extend(&format_tag.to_le_bytes());
        buf.extend(&channels.to_le_bytes());
        buf.extend(&sample_rate.to_le_bytes());
        buf.extend(&byte_rate.to_le_bytes());
        buf.extend(&block_align.to_le_bytes());
        buf.extend(&bits.to_le_bytes());
        buf.extend(b"data");
        buf.extend(&data_size.to_le_bytes());
        buf.extend(pcm);
        buf
    }

    #[test]
    fn load_8bit_mono() {
        let wav = make_wav(FORMAT_PCM, 1, 22050, 8, &[128, 192, 0, 64]);
        let stream = load_wav(&wav).unwrap();
        assert_eq!(stream.sample_rate(), 22050);
        assert_eq!(stream.plane(0), &[0.0, 0.5, -1.0, -0.5]);
    }

    #[test]
    fn load_16bit_stereo_deinterleaves() {
        let pcm: Vec<u8> = [16384i16, -16384, 0, 8192]
            .iter()
            .flat_map(|&v| v.to_le_bytes())
            .collect();
        let stream = load_wav(&make_wav(FORMAT_PCM, 2, 44100, 16, &pcm)).unwrap();
        assert_eq!(stream.len(), 2);
        assert_eq!(stream.plane(0), &[0.5, 0.0]);
        assert_eq!(stream.plane(1), &[-0.5, 0.25]);
    }

    #[test]
    fn load_24bit_sign_extends() {
        // -1 and the largest positive value
        let pcm = [0xff, 0xff, 0xff, 0xff, 0xff, 0x7f];
        let stream = load_wav(&make_wav(FORMAT_PCM, 1, 48000, 24, &pcm)).unwrap();
        let plane = stream.plane(0);
        assert!(plane[0] < 0.0 && plane[0] > -1e-6);
        assert!((plane[1] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn load_float() {
        let pcm: Vec<u8> = [0.25f32, -0.75].iter().flat_map(|v| v.to_le_bytes()).collect();
        let stream = load_wav(&make_wav(FORMAT_IEEE_FLOAT, 1, 8000, 32, &pcm)).unwrap();
        assert_eq!(stream.plane(0), &[0.25, -0.75]);
    }

    #[test]
    fn skips_unknown_chunks() {
        let mut wav = make_wav(FORMAT_PCM, 1, 8000, 16, &[0, 0, 0, 0]);
        // Insert an odd-sized LIST chunk (padded) between fmt and data.
        let list = [b"LIST".as_slice(), &3u32.to_le_bytes(), &[1, 2, 3, 0]].concat();
        wav.splice(36..36, list);
        let stream = load_wav(&wav).unwrap();
        assert_eq!(stream.len(), 2);
    }

    #[test]
    fn unsupported_format_is_reported() {
        let wav = make_wav(0x0011, 1, 8000, 4, &[0; 8]);
        assert!(matches!(load_wav(&wav), Err(FormatError::Unsupported(_))));
    }

    #[test]
    fn invalid_header_rejected() {
        assert!(matches!(
            load_wav(b"not a wav file at all"),
            Err(FormatError::InvalidHeader(_))
        ));
    }

    #[test]
    fn too_short_rejected() {
        assert!(load_wav(&[b'R', b'I', b'F', b'F', 0, 0]).is_err());
    }

    #[test]
    fn missing_data_chunk_rejected() {
        let mut wav = make_wav(FORMAT_PCM, 1, 8000, 16, &[]);
        wav.truncate(36);
        assert!(matches!(load_wav(&wav), Err(FormatError::InvalidHeader(_))));
    }

    #[test]
    fn written_wav_reads_back() {
        let stream = StreamData::from_planar(vec![vec![0.5, -0.5, 2.0], vec![0.0, 0.25, -3.0]], 22050);
        let bytes = wav_bytes(&stream);
        assert_eq!(bytes.len(), 44 + 3 * 2 * 2);

        let back = load_wav(&bytes).unwrap();
        assert_eq!(back.sample_rate(), 22050);
        assert_eq!(back.num_channels(), 2);
        assert!((back.plane(0)[0] - 0.5).abs() < 1e-3);
        // Out-of-range samples are clipped.
        assert!((back.plane(0)[2] - 1.0).abs() < 1e-3);
        assert!((back.plane(1)[2] + 1.0).abs() < 1e-3);
    }
}

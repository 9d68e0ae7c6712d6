//! Headless two-deck controller.
//!
//! [`Session`] is the control side of the player: it owns both [`Deck`]
//! handles and the metadata worker, runs the periodic poll, and hands the
//! render side ([`Mixer`]) either to the audio device or to the offline
//! renderer. A GUI or terminal front end only talks to this crate.

mod config;
mod deck;
mod error;
mod events;
mod metadata;
mod playlist;

use std::time::Duration;

use td_audio::{AudioError, AudioOutput, CpalOutput};
use td_engine::DECK_COUNT;
use td_ir::{seconds_to_frames, AudioBuffer, RenderCallback, StreamData};

pub use config::{default_config_path, load_config, save_config, SessionConfig};
pub use deck::Deck;
pub use error::{ConfigError, DeckError};
pub use events::{DeckId, SessionEvent};
pub use metadata::{MetadataRequest, MetadataResult, MetadataService};
pub use playlist::Playlist;

// Re-export common types so front ends don't need the lower crates directly.
pub use td_engine::{BlockOutcome, Mixer, StatusSnapshot};
pub use td_formats::{wildcard_pattern, FormatError, TrackMetadata, SUPPORTED_EXTENSIONS};
pub use td_ir::{LoopRegion, PlaybackMode};

/// Two decks, their shared configuration and the metadata worker.
pub struct Session {
    config: SessionConfig,
    decks: [Deck; DECK_COUNT],
    metadata: MetadataService,
    output: Option<CpalOutput>,
}

impl Session {
    /// Build a session and the mixer that renders it. The mixer is not
    /// prepared yet: pass it to [`Session::start_output`] for live playback
    /// or to [`Session::render_offline`].
    pub fn new(config: SessionConfig) -> (Self, Mixer) {
        let config = config.validated();
        let (mixer, [link_a, link_b]) = Mixer::new(config.command_capacity);
        let metadata = MetadataService::spawn();

        let decks = [
            Deck::new(DeckId::A, link_a, metadata.requester(), &config),
            Deck::new(DeckId::B, link_b, metadata.requester(), &config),
        ];

        let session = Self {
            config,
            decks,
            metadata,
            output: None,
        };
        (session, mixer)
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn deck(&self, id: DeckId) -> &Deck {
        &self.decks[id.index()]
    }

    pub fn deck_mut(&mut self, id: DeckId) -> &mut Deck {
        &mut self.decks[id.index()]
    }

    pub fn decks(&self) -> &[Deck] {
        &self.decks
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.config.poll_interval_ms)
    }

    /// One pass of the control loop: deliver finished metadata lookups,
    /// release streams the render side has dropped, and run auto-advance.
    /// Call every [`Session::poll_interval`].
    pub fn tick(&mut self) -> Vec<SessionEvent> {
        let mut events = Vec::new();

        for result in self.metadata.ready() {
            let deck = &mut self.decks[result.deck.index()];
            if deck.accept_metadata(result.epoch, &result.metadata) {
                events.push(SessionEvent::MetadataLoaded {
                    deck: result.deck,
                    metadata: result.metadata,
                });
            }
        }

        for deck in &mut self.decks {
            deck.poll(&mut events);
        }
        events
    }

    // --- Live playback ---

    /// Open the default audio device and start rendering `mixer` into it.
    /// Returns the device sample rate.
    pub fn start_output(&mut self, mixer: Mixer) -> Result<u32, AudioError> {
        self.stop_output();
        let mut output = CpalOutput::new()?;
        output.build_stream(mixer, self.config.block_size, self.config.channels)?;
        let rate = output.sample_rate();
        self.output = Some(output);
        Ok(rate)
    }

    /// Close the device. The mixer is released and dropped with it.
    pub fn stop_output(&mut self) {
        if let Some(mut output) = self.output.take() {
            if let Err(e) = output.stop() {
                log::warn!("stopping output: {e}");
            }
        }
    }

    pub fn is_output_running(&self) -> bool {
        self.output.is_some()
    }

    // --- Offline rendering ---

    /// Render `seconds` of the two-deck mix without a device, running the
    /// control poll at the configured interval between blocks. Events the
    /// poll produces are returned alongside the audio.
    pub fn render_offline(&mut self, mixer: &mut Mixer, seconds: f64) -> (StreamData, Vec<SessionEvent>) {
        let block_size = self.config.block_size;
        let rate = self.config.sample_rate;
        let channels = self.config.channels;
        if mixer.block_size() != block_size || mixer.sample_rate() != rate || mixer.channels() != channels {
            mixer.prepare(block_size, rate, channels);
        }

        let total = seconds_to_frames(seconds, rate) as usize;
        let poll_frames = (rate as u64 * self.config.poll_interval_ms / 1000).max(1) as usize;
        let mut block = AudioBuffer::new(channels, block_size);
        let mut interleaved = vec![0.0f32; total * channels as usize];
        let mut events = Vec::new();
        let mut since_poll = 0;
        let mut written = 0;

        while written < total {
            mixer.render(&mut block);
            let count = block_size.min(total - written);
            let out = &mut interleaved[written * channels as usize..(written + count) * channels as usize];
            block.write_interleaved(0, count, out, channels as usize);
            written += count;

            since_poll += count;
            if since_poll >= poll_frames {
                since_poll = 0;
                events.extend(self.tick());
            }
        }

        (StreamData::from_interleaved(&interleaved, channels, rate), events)
    }

    /// [`Session::render_offline`] encoded as a 16-bit PCM WAV file.
    pub fn render_to_wav(&mut self, mixer: &mut Mixer, seconds: f64) -> Vec<u8> {
        let (audio, events) = self.render_offline(mixer, seconds);
        for event in &events {
            log::info!("{event:?}");
        }
        td_formats::wav_bytes(&audio)
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.stop_output();
    }
}

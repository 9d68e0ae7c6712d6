//! Control-side deck: the handle the presentation layer talks to.
//!
//! Every operation updates a local mirror and queues a command for the
//! render side. Reads of playback state (`position`, `is_playing`) come from
//! the status the render side publishes.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crossbeam::channel::Sender;
use td_engine::{ControlLink, DeckCommand, StatusSnapshot, MAX_GAIN};
use td_formats::TrackMetadata;
use td_ir::{clamp_seconds, AudioSource, LoopRegion, PlaybackMode, StreamData};

use crate::config::SessionConfig;
use crate::error::DeckError;
use crate::events::{DeckId, SessionEvent};
use crate::metadata::MetadataRequest;
use crate::playlist::Playlist;

pub struct Deck {
    id: DeckId,
    link: ControlLink,
    metadata_requests: Sender<MetadataRequest>,

    stream: Option<Arc<StreamData>>,
    /// Every stream sent to the render side that it may still hold. Kept
    /// here so the final drop happens on this thread.
    retained: Vec<Arc<StreamData>>,
    source: Option<PathBuf>,
    now_playing: Option<TrackMetadata>,

    length: f64,
    gain: f32,
    speed: f64,
    mode: PlaybackMode,
    region: LoopRegion,

    /// Epoch of the latest load sent.
    epoch: u64,
    /// Commands sent so far; compared with the render side's count.
    sent: u64,
    /// Seek target and the command count at which it was sent.
    pending_seek: Option<(f64, u64)>,
    /// The end of the current stream has already been acted on.
    end_handled: bool,
    end_epsilon: f64,

    playlist: Playlist,
}

impl Deck {
    pub fn new(
        id: DeckId,
        link: ControlLink,
        metadata_requests: Sender<MetadataRequest>,
        config: &SessionConfig,
    ) -> Self {
        let mut deck = Self {
            id,
            link,
            metadata_requests,
            stream: None,
            retained: Vec::new(),
            source: None,
            now_playing: None,
            length: 0.0,
            gain: 1.0,
            speed: 1.0,
            mode: PlaybackMode::Normal,
            region: LoopRegion::default(),
            epoch: 0,
            sent: 0,
            pending_seek: None,
            end_handled: false,
            end_epsilon: config.end_epsilon_secs,
            playlist: Playlist::new(),
        };
        deck.set_gain(config.initial_gain);
        deck
    }

    pub fn id(&self) -> DeckId {
        self.id
    }

    // --- Command plumbing ---

    fn send(&mut self, command: DeckCommand) -> Result<(), DeckError> {
        match self.link.commands.send(command) {
            Ok(()) => {
                self.sent += 1;
                Ok(())
            }
            Err(rejected) => {
                log::warn!("deck {}: command queue full, dropped {rejected:?}", self.id);
                Err(DeckError::QueueFull)
            }
        }
    }

    /// Send a command whose mirror update is already done or not needed.
    /// A full queue has been logged by `send`.
    fn dispatch(&mut self, command: DeckCommand) {
        let _ = self.send(command);
    }

    /// Latest state published by the render side.
    pub fn status(&self) -> StatusSnapshot {
        self.link.status.load()
    }

    /// True once the render side has applied every command sent so far.
    pub fn is_synced(&self) -> bool {
        self.status().applied == self.sent
    }

    // --- Loading ---

    /// Decode `path` and hand it to the render side, which starts playing
    /// it immediately. On failure nothing about the deck changes.
    pub fn load(&mut self, path: &Path) -> Result<(), DeckError> {
        if !path.is_file() {
            return Err(DeckError::NotFound(path.to_path_buf()));
        }
        let stream = td_formats::load_stream(path)?;
        self.install(Arc::new(stream), path)
    }

    fn install(&mut self, stream: Arc<StreamData>, path: &Path) -> Result<(), DeckError> {
        let epoch = self.epoch + 1;
        let length = stream.duration_secs();
        self.send(DeckCommand::Load {
            stream: Arc::clone(&stream),
            epoch,
            autoplay: true,
        })?;

        log::info!("deck {}: loaded {} ({length:.2}s)", self.id, path.display());
        self.epoch = epoch;
        self.retained.push(Arc::clone(&stream));
        self.stream = Some(stream);
        self.source = Some(path.to_path_buf());
        self.length = length;
        self.region = LoopRegion::whole(length);
        self.pending_seek = None;
        self.end_handled = false;
        self.now_playing = Some(TrackMetadata::from_path(path));

        let request = MetadataRequest {
            deck: self.id,
            epoch,
            path: path.to_path_buf(),
        };
        if self.metadata_requests.send(request).is_err() {
            log::warn!("deck {}: metadata worker is gone", self.id);
        }
        Ok(())
    }

    /// Drop the current stream and go silent. The playlist is kept.
    pub fn eject(&mut self) -> Result<(), DeckError> {
        if self.stream.is_none() {
            return Err(DeckError::NoStream);
        }
        self.send(DeckCommand::Unload)?;
        self.stream = None;
        self.source = None;
        self.now_playing = None;
        self.length = 0.0;
        self.region = LoopRegion::default();
        self.pending_seek = None;
        Ok(())
    }

    pub fn has_stream(&self) -> bool {
        self.stream.is_some()
    }

    /// Path of the loaded file.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Metadata of the loaded track: file-name based until the tag lookup
    /// comes back.
    pub fn now_playing(&self) -> Option<&TrackMetadata> {
        self.now_playing.as_ref()
    }

    /// Accept a tag lookup result if it belongs to the current load.
    pub(crate) fn accept_metadata(&mut self, epoch: u64, metadata: &TrackMetadata) -> bool {
        if epoch != self.epoch || self.stream.is_none() {
            return false;
        }
        self.now_playing = Some(metadata.clone());
        true
    }

    // --- Transport ---

    /// Start playback. A no-op with nothing loaded.
    pub fn start(&mut self) {
        if self.stream.is_none() {
            return;
        }
        self.end_handled = false;
        self.dispatch(DeckCommand::Start);
    }

    /// Pause, keeping the position.
    pub fn stop(&mut self) {
        self.dispatch(DeckCommand::Stop);
    }

    /// Stop and rewind to the start.
    pub fn stop_and_rewind(&mut self) {
        self.stop();
        self.set_position(0.0);
    }

    pub fn go_to_start(&mut self) {
        self.set_position(0.0);
        self.start();
    }

    /// Jump to the end of the stream. Outside loop modes the next poll
    /// treats this as the track ending.
    pub fn go_to_end(&mut self) {
        self.set_position(self.length);
    }

    pub fn is_playing(&self) -> bool {
        self.status().playing
    }

    /// Seek, clamped to `[0, length]`. Non-finite values are ignored.
    pub fn set_position(&mut self, seconds: f64) {
        if !seconds.is_finite() {
            return;
        }
        let target = clamp_seconds(seconds, self.length);
        if self.send(DeckCommand::Seek(target)).is_ok() {
            self.pending_seek = Some((target, self.sent));
            self.end_handled = false;
        }
    }

    /// Seek to a fraction of the stream, as a slider would.
    pub fn set_position_fraction(&mut self, fraction: f64) {
        if fraction.is_finite() {
            self.set_position(fraction.clamp(0.0, 1.0) * self.length);
        }
    }

    /// Play head in seconds, always within `[0, length]`.
    ///
    /// A seek or load that the render side has not applied yet reads back
    /// as its target.
    pub fn position(&self) -> f64 {
        let snap = self.status();
        if let Some((target, seq)) = self.pending_seek {
            if snap.applied < seq {
                return target;
            }
        }
        if snap.epoch != self.epoch {
            return 0.0;
        }
        clamp_seconds(snap.position, self.length)
    }

    /// Duration of the loaded stream, 0.0 when empty.
    pub fn length(&self) -> f64 {
        self.length
    }

    // --- Gain and speed ---

    /// Linear gain, clamped to `[0, 2]`. Non-finite values are ignored.
    pub fn set_gain(&mut self, gain: f32) {
        if !gain.is_finite() {
            return;
        }
        let gain = gain.clamp(0.0, MAX_GAIN);
        if gain != self.gain && self.send(DeckCommand::SetGain(gain)).is_ok() {
            self.gain = gain;
        }
    }

    pub fn gain(&self) -> f32 {
        self.gain
    }

    pub fn mute(&mut self) {
        self.set_gain(0.0);
    }

    pub fn unmute(&mut self) {
        self.set_gain(1.0);
    }

    pub fn is_muted(&self) -> bool {
        self.gain == 0.0
    }

    /// Playback rate, clamped to `[0.25, 4]`. Non-finite values are ignored.
    pub fn set_speed(&mut self, speed: f64) {
        if !speed.is_finite() {
            return;
        }
        let speed = speed.clamp(td_engine::MIN_SPEED, td_engine::MAX_SPEED);
        if speed != self.speed && self.send(DeckCommand::SetSpeed(speed)).is_ok() {
            self.speed = speed;
        }
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    // --- Looping ---

    fn set_mode(&mut self, mode: PlaybackMode) {
        if mode != self.mode && self.send(DeckCommand::SetMode(mode)).is_ok() {
            self.mode = mode;
        }
    }

    pub fn mode(&self) -> PlaybackMode {
        self.mode
    }

    /// Whole-stream looping. Turning it on ends A-B looping.
    pub fn set_looping(&mut self, enable: bool) {
        self.set_mode(self.mode.with_looping(enable));
    }

    pub fn is_looping(&self) -> bool {
        self.mode.is_looping()
    }

    /// A-B looping. Turning it on ends whole-stream looping; turning it off
    /// does not bring that back.
    pub fn enable_ab_loop(&mut self, enable: bool) {
        self.set_mode(self.mode.with_ab_loop(enable));
    }

    pub fn is_ab_loop_enabled(&self) -> bool {
        self.mode.is_ab_loop()
    }

    fn send_region(&mut self, region: LoopRegion) {
        if self.send(DeckCommand::SetLoopRegion(region)).is_ok() {
            self.region = region;
        }
    }

    /// Move the A marker, clamped to `[0, length]`. May leave the region
    /// inverted.
    pub fn set_loop_start(&mut self, seconds: f64) {
        if seconds.is_finite() {
            let region = LoopRegion::new(seconds, self.region.end).clamped(self.length);
            self.send_region(region);
        }
    }

    /// Move the B marker, clamped to `[0, length]`. May leave the region
    /// inverted.
    pub fn set_loop_end(&mut self, seconds: f64) {
        if seconds.is_finite() {
            let region = LoopRegion::new(self.region.start, seconds).clamped(self.length);
            self.send_region(region);
        }
    }

    /// Set both markers at once. An inverted pair is swapped.
    pub fn set_loop_region(&mut self, start: f64, end: f64) {
        if start.is_finite() && end.is_finite() {
            let region = LoopRegion::new(start, end).clamped(self.length).ordered();
            self.send_region(region);
        }
    }

    /// Leave A-B mode and reset the markers to the whole stream.
    pub fn clear_ab_loop(&mut self) {
        if self.send(DeckCommand::ClearAbLoop).is_ok() {
            self.mode = self.mode.with_ab_loop(false);
            self.region = LoopRegion::whole(self.length);
        }
    }

    pub fn loop_region(&self) -> LoopRegion {
        self.region
    }

    pub fn loop_start(&self) -> f64 {
        self.region.start
    }

    pub fn loop_end(&self) -> f64 {
        self.region.end
    }

    /// A marker as a fraction of the stream, for drawing.
    pub fn start_percentage(&self) -> f64 {
        self.fraction_of_length(self.region.start)
    }

    /// B marker as a fraction of the stream, for drawing.
    pub fn end_percentage(&self) -> f64 {
        self.fraction_of_length(self.region.end)
    }

    fn fraction_of_length(&self, seconds: f64) -> f64 {
        if self.length > 0.0 {
            seconds / self.length
        } else {
            0.0
        }
    }

    // --- Playlist ---

    /// Append files to the playlist. The first batch added to an empty
    /// playlist starts playing entry 0.
    pub fn add_files<I>(&mut self, files: I) -> Result<(), DeckError>
    where
        I: IntoIterator<Item = PathBuf>,
    {
        if self.playlist.add(files) {
            self.load_and_play(0)?;
        }
        Ok(())
    }

    /// Load playlist entry `index` and play it.
    pub fn load_and_play(&mut self, index: usize) -> Result<(), DeckError> {
        let path = self
            .playlist
            .get(index)
            .ok_or(DeckError::IndexOutOfRange {
                index,
                len: self.playlist.len(),
            })?
            .to_path_buf();
        self.load(&path)?;
        self.playlist.select(index);
        Ok(())
    }

    pub fn playlist(&self) -> &[PathBuf] {
        self.playlist.entries()
    }

    pub fn current_index(&self) -> Option<usize> {
        self.playlist.current()
    }

    // --- Polling ---

    /// Periodic housekeeping from the control loop: release streams the
    /// render side has let go of and run the auto-advance check.
    pub fn poll(&mut self, events: &mut Vec<SessionEvent>) {
        self.collect_garbage();
        if self.reached_end() {
            self.end_handled = true;
            self.advance(events);
        }
    }

    /// The current stream has ended and nothing will loop it.
    fn reached_end(&self) -> bool {
        if self.end_handled || self.stream.is_none() || self.mode != PlaybackMode::Normal {
            return false;
        }
        if self.length <= 0.0 {
            return false;
        }
        let snap = self.status();
        if snap.epoch != self.epoch || snap.applied != self.sent {
            return false;
        }
        snap.finished || snap.position >= self.length - self.end_epsilon
    }

    fn advance(&mut self, events: &mut Vec<SessionEvent>) {
        let mut next = self.playlist.next_index();
        while let Some(index) = next {
            match self.load_and_play(index) {
                Ok(()) => {
                    let path = self.playlist.entries()[index].clone();
                    events.push(SessionEvent::TrackLoaded { deck: self.id, index, path });
                    return;
                }
                Err(DeckError::QueueFull) => {
                    // Retry on the next poll.
                    self.end_handled = false;
                    return;
                }
                Err(e) => {
                    let path = self.playlist.entries()[index].clone();
                    log::warn!("deck {}: skipping {}: {e}", self.id, path.display());
                    events.push(SessionEvent::LoadFailed {
                        deck: self.id,
                        path,
                        reason: e.to_string(),
                    });
                    next = self.playlist.index_after(index);
                }
            }
        }

        log::info!("deck {}: end of playlist", self.id);
        self.stop();
        events.push(SessionEvent::PlaylistEnded { deck: self.id });
    }

    /// Drop retained streams nobody else references any more.
    pub fn collect_garbage(&mut self) {
        self.retained.retain(|stream| Arc::strong_count(stream) > 1);
    }

    /// Streams held back from the render side, including the current one.
    pub fn retained_streams(&self) -> usize {
        self.retained.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam::channel::unbounded;
    use td_engine::Mixer;
    use td_ir::{AudioBuffer, RenderCallback};

    const RATE: u32 = 1000;

    fn deck_with_mixer() -> (Deck, Mixer) {
        let config = SessionConfig::default();
        let (mut mixer, [link, _]) = Mixer::new(config.command_capacity);
        mixer.prepare(100, RATE, 1);
        let (tx, _rx) = unbounded();
        (Deck::new(DeckId::A, link, tx, &config), mixer)
    }

    fn install_constant(deck: &mut Deck, seconds: usize) {
        let stream = Arc::new(StreamData::constant(1, seconds * RATE as usize, RATE, 0.5));
        deck.install(stream, Path::new("test.wav")).unwrap();
    }

    #[test]
    fn install_sets_length_and_whole_region() {
        let (mut deck, _mixer) = deck_with_mixer();
        install_constant(&mut deck, 10);
        assert_eq!(deck.length(), 10.0);
        assert_eq!(deck.loop_region(), LoopRegion::new(0.0, 10.0));
        assert_eq!(deck.position(), 0.0);
        assert_eq!(deck.now_playing().unwrap().title, "test");
    }

    #[test]
    fn missing_file_leaves_deck_untouched() {
        let (mut deck, _mixer) = deck_with_mixer();
        install_constant(&mut deck, 3);
        let err = deck.load(Path::new("/no/such/file.wav")).unwrap_err();
        assert!(matches!(err, DeckError::NotFound(_)));
        assert_eq!(deck.length(), 3.0);
        assert_eq!(deck.source(), Some(Path::new("test.wav")));
    }

    #[test]
    fn pending_seek_reads_back_before_render() {
        let (mut deck, mut mixer) = deck_with_mixer();
        install_constant(&mut deck, 10);
        mixer.process_commands();
        deck.set_position(4.0);
        assert_eq!(deck.position(), 4.0);
        mixer.process_commands();
        assert_eq!(deck.position(), 4.0);
        assert!(deck.is_synced());
    }

    #[test]
    fn position_is_clamped() {
        let (mut deck, mut mixer) = deck_with_mixer();
        install_constant(&mut deck, 5);
        deck.set_position(99.0);
        assert_eq!(deck.position(), 5.0);
        deck.set_position(-3.0);
        mixer.process_commands();
        assert_eq!(deck.position(), 0.0);
        deck.set_position_fraction(0.5);
        assert_eq!(deck.position(), 2.5);
    }

    #[test]
    fn ab_loop_excludes_whole_loop() {
        let (mut deck, _mixer) = deck_with_mixer();
        install_constant(&mut deck, 10);
        deck.set_looping(true);
        deck.enable_ab_loop(true);
        assert!(deck.is_ab_loop_enabled());
        assert!(!deck.is_looping());
        deck.enable_ab_loop(false);
        assert!(!deck.is_looping());
        assert_eq!(deck.mode(), PlaybackMode::Normal);
    }

    #[test]
    fn loop_markers_clamp_and_region_swaps() {
        let (mut deck, _mixer) = deck_with_mixer();
        install_constant(&mut deck, 10);
        deck.set_loop_start(-1.0);
        deck.set_loop_end(42.0);
        assert_eq!(deck.loop_region(), LoopRegion::new(0.0, 10.0));

        deck.set_loop_start(8.0);
        deck.set_loop_end(2.0);
        assert!(deck.loop_region().is_inverted());

        deck.set_loop_region(6.0, 3.0);
        assert_eq!(deck.loop_region(), LoopRegion::new(3.0, 6.0));
        assert_eq!(deck.start_percentage(), 0.3);
        assert_eq!(deck.end_percentage(), 0.6);
    }

    #[test]
    fn clear_ab_loop_resets_markers() {
        let (mut deck, _mixer) = deck_with_mixer();
        install_constant(&mut deck, 10);
        deck.set_loop_region(2.0, 4.0);
        deck.enable_ab_loop(true);
        deck.clear_ab_loop();
        assert!(!deck.is_ab_loop_enabled());
        assert_eq!(deck.loop_region(), LoopRegion::new(0.0, 10.0));
    }

    #[test]
    fn percentages_are_zero_when_empty() {
        let (deck, _mixer) = deck_with_mixer();
        assert_eq!(deck.start_percentage(), 0.0);
        assert_eq!(deck.end_percentage(), 0.0);
        assert_eq!(deck.length(), 0.0);
    }

    #[test]
    fn gain_and_speed_are_idempotent_and_clamped() {
        let (mut deck, _mixer) = deck_with_mixer();
        deck.set_gain(0.5);
        let sent = deck.sent;
        deck.set_gain(0.5);
        assert_eq!(deck.sent, sent);

        deck.set_gain(7.0);
        assert_eq!(deck.gain(), 2.0);
        deck.set_gain(f32::NAN);
        assert_eq!(deck.gain(), 2.0);

        deck.set_speed(0.01);
        assert_eq!(deck.speed(), 0.25);
        deck.set_speed(f64::INFINITY);
        assert_eq!(deck.speed(), 0.25);
    }

    #[test]
    fn mute_and_unmute() {
        let (mut deck, _mixer) = deck_with_mixer();
        deck.mute();
        assert!(deck.is_muted());
        deck.unmute();
        assert_eq!(deck.gain(), 1.0);
    }

    #[test]
    fn load_and_play_rejects_bad_index() {
        let (mut deck, _mixer) = deck_with_mixer();
        let err = deck.load_and_play(3).unwrap_err();
        assert!(matches!(err, DeckError::IndexOutOfRange { index: 3, len: 0 }));
        assert_eq!(deck.current_index(), None);
    }

    #[test]
    fn end_without_playlist_reports_once() {
        let (mut deck, mut mixer) = deck_with_mixer();
        install_constant(&mut deck, 1);
        let mut out = AudioBuffer::new(1, 100);
        for _ in 0..11 {
            mixer.render(&mut out);
        }

        let mut events = Vec::new();
        deck.poll(&mut events);
        assert_eq!(events, vec![SessionEvent::PlaylistEnded { deck: DeckId::A }]);

        events.clear();
        mixer.process_commands();
        deck.poll(&mut events);
        assert!(events.is_empty());
    }

    #[test]
    fn looping_deck_never_auto_advances() {
        let (mut deck, mut mixer) = deck_with_mixer();
        install_constant(&mut deck, 1);
        deck.set_looping(true);
        deck.go_to_end();
        mixer.process_commands();

        let mut events = Vec::new();
        deck.poll(&mut events);
        assert!(events.is_empty());
    }

    #[test]
    fn old_streams_are_released_once_render_side_drops_them() {
        let (mut deck, mut mixer) = deck_with_mixer();
        install_constant(&mut deck, 1);
        install_constant(&mut deck, 2);
        assert_eq!(deck.retained_streams(), 2);

        mixer.process_commands();
        deck.collect_garbage();
        assert_eq!(deck.retained_streams(), 1);
    }

    #[test]
    fn eject_clears_stream() {
        let (mut deck, mut mixer) = deck_with_mixer();
        assert!(matches!(deck.eject(), Err(DeckError::NoStream)));
        install_constant(&mut deck, 2);
        deck.eject().unwrap();
        assert!(!deck.has_stream());
        assert_eq!(deck.length(), 0.0);
        mixer.process_commands();
        deck.collect_garbage();
        assert_eq!(deck.retained_streams(), 0);
    }
}

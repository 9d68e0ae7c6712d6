//! End-to-end deck behaviour: real WAV files on disk, a session on the
//! control side and the mixer rendered by hand in place of a device.

use std::path::{Path, PathBuf};
use std::time::Duration;

use td_ir::{AudioBuffer, AudioSource, RenderCallback, StreamData};
use td_master::{BlockOutcome, DeckError, DeckId, Mixer, Session, SessionConfig, SessionEvent};

const RATE: u32 = 8000;
const BLOCK: usize = 80;

fn write_tone(dir: &Path, name: &str, seconds: f64, value: f32) -> PathBuf {
    let frames = (seconds * RATE as f64) as usize;
    let path = dir.join(name);
    let stream = StreamData::constant(1, frames, RATE, value);
    std::fs::write(&path, td_formats::wav_bytes(&stream)).unwrap();
    path
}

fn session() -> (Session, Mixer) {
    let config = SessionConfig {
        sample_rate: RATE,
        block_size: BLOCK,
        ..SessionConfig::default()
    };
    let (session, mut mixer) = Session::new(config);
    mixer.prepare(BLOCK, RATE, 2);
    (session, mixer)
}

/// Render and poll one block at a time until `until` matches an event.
fn run_until<F>(session: &mut Session, mixer: &mut Mixer, max_blocks: usize, until: F) -> Vec<SessionEvent>
where
    F: Fn(&SessionEvent) -> bool,
{
    let mut out = AudioBuffer::new(2, BLOCK);
    let mut seen = Vec::new();
    for _ in 0..max_blocks {
        mixer.render(&mut out);
        let events = session.tick();
        let done = events.iter().any(&until);
        seen.extend(events);
        if done {
            return seen;
        }
    }
    panic!("condition not reached after {max_blocks} blocks; events: {seen:?}");
}

#[test]
fn ab_loop_wraps_exactly_to_loop_start() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_tone(dir.path(), "ten.wav", 10.0, 0.25);
    let (mut session, mut mixer) = session();

    let deck = session.deck_mut(DeckId::A);
    deck.load(&path).unwrap();
    assert_eq!(deck.length(), 10.0);
    deck.set_loop_start(2.0);
    deck.set_loop_end(4.0);
    deck.enable_ab_loop(true);
    assert!(!deck.is_looping());

    let mut out = AudioBuffer::new(2, BLOCK);
    let mut last = 0.0;
    for _ in 0..1000 {
        mixer.render(&mut out);
        if mixer.last_outcome(0) == BlockOutcome::LoopedToRegionStart {
            assert!(last <= 4.0);
            assert_eq!(session.deck(DeckId::A).position(), 2.0);
            return;
        }
        last = session.deck(DeckId::A).position();
    }
    panic!("A-B loop never wrapped");
}

#[test]
fn playlist_advances_to_next_track_at_zero() {
    let dir = tempfile::tempdir().unwrap();
    let first = write_tone(dir.path(), "first.wav", 5.0, 0.25);
    let second = write_tone(dir.path(), "second.wav", 5.0, 0.5);
    let (mut session, mut mixer) = session();

    session
        .deck_mut(DeckId::A)
        .add_files(vec![first.clone(), second.clone()])
        .unwrap();
    assert_eq!(session.deck(DeckId::A).current_index(), Some(0));
    assert_eq!(session.deck(DeckId::A).playlist(), &[first, second.clone()]);

    let events = run_until(&mut session, &mut mixer, 700, |e| {
        matches!(e, SessionEvent::TrackLoaded { .. })
    });
    assert!(events.contains(&SessionEvent::TrackLoaded {
        deck: DeckId::A,
        index: 1,
        path: second,
    }));

    let deck = session.deck(DeckId::A);
    assert_eq!(deck.current_index(), Some(1));
    assert_eq!(deck.position(), 0.0);

    mixer.process_commands();
    let deck = session.deck(DeckId::A);
    assert_eq!(deck.position(), 0.0);
    assert!(deck.is_playing());
    assert_eq!(deck.length(), 5.0);

    let mut out = AudioBuffer::new(2, BLOCK);
    mixer.render(&mut out);
    assert!((out.channel(0)[0] - 0.5).abs() < 1e-4);
}

#[test]
fn first_batch_autoplays_later_batches_do_not() {
    let dir = tempfile::tempdir().unwrap();
    let one = write_tone(dir.path(), "one.wav", 1.0, 0.1);
    let two = write_tone(dir.path(), "two.wav", 2.0, 0.1);
    let (mut session, mut mixer) = session();

    let deck = session.deck_mut(DeckId::B);
    deck.add_files(vec![one]).unwrap();
    deck.add_files(vec![two]).unwrap();
    assert_eq!(deck.current_index(), Some(0));
    assert_eq!(deck.length(), 1.0);

    mixer.process_commands();
    assert!(session.deck(DeckId::B).is_playing());
}

#[test]
fn missing_file_leaves_length_unchanged() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_tone(dir.path(), "three.wav", 3.0, 0.25);
    let (mut session, _mixer) = session();

    let deck = session.deck_mut(DeckId::A);
    assert!(matches!(
        deck.load(Path::new("/nonexistent/nothing.wav")),
        Err(DeckError::NotFound(_))
    ));
    assert_eq!(deck.length(), 0.0);

    deck.load(&path).unwrap();
    assert!(deck.load(&dir.path().join("absent.wav")).is_err());
    assert_eq!(deck.length(), 3.0);
    assert_eq!(deck.source(), Some(path.as_path()));
}

#[test]
fn corrupt_file_is_a_format_error() {
    let dir = tempfile::tempdir().unwrap();
    let good = write_tone(dir.path(), "good.wav", 1.0, 0.25);
    let bad = dir.path().join("bad.wav");
    std::fs::write(&bad, b"RIFF....WAVEnot really").unwrap();
    let (mut session, _mixer) = session();

    let deck = session.deck_mut(DeckId::A);
    deck.load(&good).unwrap();
    assert!(matches!(deck.load(&bad), Err(DeckError::Format(_))));
    assert_eq!(deck.length(), 1.0);
}

#[test]
fn unloadable_playlist_entry_is_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let first = write_tone(dir.path(), "a.wav", 0.5, 0.25);
    let missing = dir.path().join("gone.wav");
    let third = write_tone(dir.path(), "c.wav", 0.5, 0.25);
    let (mut session, mut mixer) = session();

    session
        .deck_mut(DeckId::A)
        .add_files(vec![first, missing.clone(), third])
        .unwrap();

    let events = run_until(&mut session, &mut mixer, 200, |e| {
        matches!(e, SessionEvent::TrackLoaded { .. })
    });
    assert!(events
        .iter()
        .any(|e| matches!(e, SessionEvent::LoadFailed { path, .. } if *path == missing)));
    assert_eq!(session.deck(DeckId::A).current_index(), Some(2));
}

#[test]
fn last_track_ends_the_playlist() {
    let dir = tempfile::tempdir().unwrap();
    let only = write_tone(dir.path(), "only.wav", 0.5, 0.25);
    let (mut session, mut mixer) = session();
    session.deck_mut(DeckId::B).add_files(vec![only]).unwrap();

    run_until(&mut session, &mut mixer, 200, |e| {
        *e == SessionEvent::PlaylistEnded { deck: DeckId::B }
    });
    mixer.process_commands();
    assert!(!session.deck(DeckId::B).is_playing());
    assert_eq!(session.deck(DeckId::B).current_index(), Some(0));
}

#[test]
fn go_to_end_advances_on_next_poll() {
    let dir = tempfile::tempdir().unwrap();
    let first = write_tone(dir.path(), "x.wav", 5.0, 0.25);
    let second = write_tone(dir.path(), "y.wav", 5.0, 0.25);
    let (mut session, mut mixer) = session();

    let deck = session.deck_mut(DeckId::A);
    deck.add_files(vec![first, second]).unwrap();
    deck.go_to_end();
    assert_eq!(deck.position(), 5.0);

    mixer.process_commands();
    let events = session.tick();
    assert!(events
        .iter()
        .any(|e| matches!(e, SessionEvent::TrackLoaded { index: 1, .. })));
}

#[test]
fn looping_deck_repeats_instead_of_advancing() {
    let dir = tempfile::tempdir().unwrap();
    let first = write_tone(dir.path(), "x.wav", 0.5, 0.25);
    let second = write_tone(dir.path(), "y.wav", 0.5, 0.25);
    let (mut session, mut mixer) = session();

    let deck = session.deck_mut(DeckId::A);
    deck.add_files(vec![first, second]).unwrap();
    deck.set_looping(true);

    let mut out = AudioBuffer::new(2, BLOCK);
    let mut restarted = false;
    for _ in 0..300 {
        mixer.render(&mut out);
        restarted |= mixer.last_outcome(0) == BlockOutcome::Restarted;
        let events = session.tick();
        assert!(!events.iter().any(|e| matches!(e, SessionEvent::TrackLoaded { .. })));
    }
    assert!(restarted);
    assert_eq!(session.deck(DeckId::A).current_index(), Some(0));
}

#[test]
fn position_stays_within_bounds() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_tone(dir.path(), "two.wav", 2.0, 0.25);
    let (mut session, mut mixer) = session();
    session.deck_mut(DeckId::A).load(&path).unwrap();

    let mut out = AudioBuffer::new(2, BLOCK);
    let seeks = [-5.0, 0.5, 1.99, 250.0, f64::NAN, 1.0, 2.0];
    for (i, &target) in seeks.iter().enumerate() {
        session.deck_mut(DeckId::A).set_position(target);
        if i % 2 == 0 {
            session.deck_mut(DeckId::A).start();
        }
        for _ in 0..30 {
            mixer.render(&mut out);
            let deck = session.deck(DeckId::A);
            let p = deck.position();
            assert!((0.0..=deck.length()).contains(&p), "position {p} after seek {target}");
        }
    }
}

#[test]
fn metadata_arrives_through_tick() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_tone(dir.path(), "Morning Set.wav", 0.5, 0.25);
    let (mut session, _mixer) = session();
    session.deck_mut(DeckId::B).load(&path).unwrap();

    for _ in 0..500 {
        for event in session.tick() {
            if let SessionEvent::MetadataLoaded { deck, metadata } = event {
                assert_eq!(deck, DeckId::B);
                assert_eq!(metadata.title, "Morning Set");
                assert_eq!(metadata.artist, td_formats::UNKNOWN_ARTIST);
                assert_eq!(session.deck(DeckId::B).now_playing(), Some(&metadata));
                return;
            }
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    panic!("metadata never arrived");
}

#[test]
fn offline_export_mixes_both_decks() {
    let dir = tempfile::tempdir().unwrap();
    let a = write_tone(dir.path(), "a.wav", 1.0, 0.25);
    let b = write_tone(dir.path(), "b.wav", 1.0, 0.5);
    let (mut session, mut mixer) = session();
    session.deck_mut(DeckId::A).load(&a).unwrap();
    session.deck_mut(DeckId::B).load(&b).unwrap();

    let wav = session.render_to_wav(&mut mixer, 0.5);
    let rendered = td_formats::load_wav(&wav).unwrap();
    assert_eq!(rendered.sample_rate(), RATE);
    assert_eq!(rendered.num_channels(), 2);
    assert_eq!(rendered.len(), 4000);
    assert!(rendered.plane(1)[100..].iter().all(|&s| (s - 0.75).abs() < 1e-3));
}

#[test]
fn mute_silences_one_deck_only() {
    let dir = tempfile::tempdir().unwrap();
    let a = write_tone(dir.path(), "a.wav", 1.0, 0.25);
    let b = write_tone(dir.path(), "b.wav", 1.0, 0.5);
    let (mut session, mut mixer) = session();
    session.deck_mut(DeckId::A).load(&a).unwrap();
    session.deck_mut(DeckId::B).load(&b).unwrap();
    session.deck_mut(DeckId::B).mute();

    let mut out = AudioBuffer::new(2, BLOCK);
    mixer.render(&mut out);
    assert!(out.channel(0).iter().all(|&s| (s - 0.25).abs() < 1e-4));

    session.deck_mut(DeckId::B).unmute();
    mixer.render(&mut out);
    assert!(out.channel(0).iter().all(|&s| (s - 0.75).abs() < 1e-4));
}

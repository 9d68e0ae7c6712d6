//! twindeck: two-deck player for the terminal.
//!
//! Usage:
//!   twindeck -a intro.wav outro.mp3 -b loop.flac
//!   twindeck -a track.wav --ab 2.0 4.0
//!   twindeck -a one.wav -b two.wav --wav mix.wav --seconds 60

use std::io::Write;
use std::path::PathBuf;
use std::thread;

use anyhow::{bail, Context, Result};
use clap::Parser;
use td_master::{load_config, save_config, Deck, DeckId, Session, SessionEvent};

#[cfg(all(feature = "alloc_check", debug_assertions))]
#[global_allocator]
static A: assert_no_alloc::AllocDisabler = assert_no_alloc::AllocDisabler;

#[derive(Parser, Debug)]
#[command(name = "twindeck")]
#[command(about = "Two-deck audio player with looping and playlists")]
#[command(version)]
struct Args {
    /// Files queued on deck A, in play order
    #[arg(short = 'a', long = "deck-a", num_args = 1..)]
    deck_a: Vec<PathBuf>,

    /// Files queued on deck B, in play order
    #[arg(short = 'b', long = "deck-b", num_args = 1..)]
    deck_b: Vec<PathBuf>,

    /// Loop each deck's track
    #[arg(long = "loop")]
    looping: bool,

    /// A-B loop region on deck A, in seconds
    #[arg(long, num_args = 2, value_names = ["START", "END"])]
    ab: Option<Vec<f64>>,

    /// Gain for deck A (0.0 - 2.0)
    #[arg(long)]
    gain_a: Option<f32>,

    /// Gain for deck B (0.0 - 2.0)
    #[arg(long)]
    gain_b: Option<f32>,

    /// Playback speed for both decks (0.25 - 4.0)
    #[arg(long)]
    speed: Option<f64>,

    /// Render the mix to this WAV file instead of playing it
    #[arg(long)]
    wav: Option<PathBuf>,

    /// Length of the offline render
    #[arg(long, default_value_t = 30.0)]
    seconds: f64,

    /// Configuration file (defaults to the user config directory)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write the effective configuration back to the config file
    #[arg(long)]
    save_config: bool,

    /// Print the supported file patterns and exit
    #[arg(long)]
    formats: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let args = Args::parse();

    if args.formats {
        println!("{}", td_master::wildcard_pattern());
        return Ok(());
    }
    if args.deck_a.is_empty() && args.deck_b.is_empty() {
        bail!("nothing to play: pass files with --deck-a and/or --deck-b");
    }

    let config_path = args.config.clone().unwrap_or_else(td_master::default_config_path);
    let config = load_config(&config_path);
    if args.save_config {
        save_config(&config.validated(), &config_path)
            .with_context(|| format!("saving {}", config_path.display()))?;
    }

    let (mut session, mut mixer) = Session::new(config);
    setup_decks(&mut session, &args)?;

    match &args.wav {
        Some(path) => {
            let wav = session.render_to_wav(&mut mixer, args.seconds);
            std::fs::write(path, &wav).with_context(|| format!("writing {}", path.display()))?;
            println!("Rendered {:.1}s ({} bytes) to {}", args.seconds, wav.len(), path.display());
        }
        None => {
            let rate = session
                .start_output(mixer)
                .context("opening audio output")?;
            log::info!("playing at {rate} Hz");
            run_status_loop(&mut session);
        }
    }
    Ok(())
}

fn setup_decks(session: &mut Session, args: &Args) -> Result<()> {
    for (id, files, gain) in [
        (DeckId::A, &args.deck_a, args.gain_a),
        (DeckId::B, &args.deck_b, args.gain_b),
    ] {
        let deck = session.deck_mut(id);
        if let Some(gain) = gain {
            deck.set_gain(gain);
        }
        if let Some(speed) = args.speed {
            deck.set_speed(speed);
        }
        if args.looping {
            deck.set_looping(true);
        }
        if !files.is_empty() {
            deck.add_files(files.iter().cloned())
                .with_context(|| format!("loading deck {id}"))?;
        }
    }

    if let Some(ab) = &args.ab {
        let deck = session.deck_mut(DeckId::A);
        deck.set_loop_region(ab[0], ab[1]);
        deck.enable_ab_loop(true);
    }
    Ok(())
}

/// Poll the session and redraw the status line until both decks are idle.
fn run_status_loop(session: &mut Session) {
    let interval = session.poll_interval();
    let mut idle_polls = 0;

    loop {
        thread::sleep(interval);
        for event in session.tick() {
            report(&event);
        }

        let line: Vec<String> = session.decks().iter().map(status_text).collect();
        print!("\r{}   ", line.join("  |  "));
        let _ = std::io::stdout().flush();

        if session.decks().iter().any(Deck::is_playing) {
            idle_polls = 0;
        } else {
            idle_polls += 1;
        }
        // A couple of polls of grace so freshly queued loads can start.
        if idle_polls > 3 {
            break;
        }
    }
    println!("\nDone.");
}

fn report(event: &SessionEvent) {
    match event {
        SessionEvent::TrackLoaded { deck, index, path } => {
            println!("\rdeck {deck}: now playing #{} {}", index + 1, path.display());
        }
        SessionEvent::LoadFailed { deck, path, reason } => {
            println!("\rdeck {deck}: skipped {}: {reason}", path.display());
        }
        SessionEvent::PlaylistEnded { deck } => println!("\rdeck {deck}: end of playlist"),
        SessionEvent::MetadataLoaded { deck, metadata } => {
            println!("\rdeck {deck}: {}", metadata.display_line());
        }
    }
}

fn status_text(deck: &Deck) -> String {
    let title = deck
        .now_playing()
        .map(|m| m.title.as_str())
        .unwrap_or("-");
    let mut flags = String::new();
    if deck.is_looping() {
        flags.push_str(" [loop]");
    }
    if deck.is_ab_loop_enabled() {
        flags.push_str(&format!(
            " [A-B {} - {}]",
            format_time(deck.loop_start()),
            format_time(deck.loop_end())
        ));
    }
    if deck.is_muted() {
        flags.push_str(" [mute]");
    }
    format!(
        "{}: {} {} / {}{}",
        deck.id(),
        title,
        format_time(deck.position()),
        format_time(deck.length()),
        flags
    )
}

/// `mm:ss`, rounding down. Minutes keep counting past 59.
fn format_time(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds as u64
    } else {
        0
    };
    format!("{:02}:{:02}", total / 60, total % 60)
}

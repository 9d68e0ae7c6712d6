//! Real-time engine for the twindeck player.
//!
//! Owns everything that runs on the audio render thread: the per-deck
//! transport and loop state machine, the two-deck mixer, and the lock-free
//! handoff structures that connect them to the control thread.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod command;
mod mixer;
mod status;
mod transport;

pub use command::{command_channel, CommandReceiver, CommandSender, DeckCommand};
pub use mixer::{ControlLink, Mixer, DECK_COUNT};
pub use status::{DeckStatus, StatusSnapshot};
pub use transport::{BlockOutcome, Transport, MAX_GAIN, MAX_SPEED, MIN_SPEED};

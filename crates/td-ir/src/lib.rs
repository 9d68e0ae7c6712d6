//! Core types for the twindeck two-deck player.
//!
//! This crate defines the data shared by the real-time engine, the file
//! loaders and the control layer: audio blocks, decoded streams, playback
//! modes and loop regions.
//!
//! Designed to be `no_std` compatible with the `alloc` crate.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod audio_buffer;
mod audio_traits;
mod playback_mode;
mod stream;
mod timestamp;

pub use audio_buffer::{AudioBuffer, BLOCK_SIZE, MAX_CHANNELS};
pub use audio_traits::{AudioSource, RenderCallback};
pub use playback_mode::{LoopRegion, PlaybackMode};
pub use stream::StreamData;
pub use timestamp::{clamp_seconds, frames_to_seconds, seconds_to_frames};

//! Audio device output for the twindeck player.

mod block;
mod cpal_backend;
mod traits;

pub use block::BlockAdapter;
pub use cpal_backend::CpalOutput;
pub use traits::{AudioError, AudioOutput};

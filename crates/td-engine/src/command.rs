//! Lock-free command queue from the control thread to the render thread.
//!
//! One single-producer single-consumer ring per deck. The control side
//! pushes without blocking; the render side drains the ring at the start of
//! every render cycle, so a command takes effect before the next block.

use alloc::sync::Arc;
use ringbuf::traits::{Consumer, Observer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};
use td_ir::{LoopRegion, PlaybackMode, StreamData};

/// A transport operation issued by the control thread.
///
/// Every variant is a plain value or a pointer swap, so applying it on the
/// render thread never allocates.
#[derive(Debug)]
pub enum DeckCommand {
    /// Replace the current stream. `epoch` identifies this load in the
    /// published status.
    Load {
        stream: Arc<StreamData>,
        epoch: u64,
        autoplay: bool,
    },
    /// Drop the current stream and go silent.
    Unload,
    Start,
    Stop,
    /// Move the play head, in stream seconds.
    Seek(f64),
    SetGain(f32),
    SetSpeed(f64),
    SetMode(PlaybackMode),
    SetLoopRegion(LoopRegion),
    /// Leave A-B mode and reset the region to the whole stream.
    ClearAbLoop,
}

/// Control-side end of a deck's command ring.
pub struct CommandSender {
    producer: HeapProd<DeckCommand>,
}

impl CommandSender {
    /// Queue a command. Returns it back when the ring is full.
    pub fn send(&mut self, command: DeckCommand) -> Result<(), DeckCommand> {
        self.producer.try_push(command)
    }

    /// Free slots left in the ring.
    pub fn capacity_left(&self) -> usize {
        self.producer.vacant_len()
    }
}

/// Render-side end of a deck's command ring.
pub struct CommandReceiver {
    consumer: HeapCons<DeckCommand>,
}

impl CommandReceiver {
    /// Take the next pending command, if any.
    pub fn pop(&mut self) -> Option<DeckCommand> {
        self.consumer.try_pop()
    }

    pub fn is_empty(&self) -> bool {
        self.consumer.is_empty()
    }
}

/// Allocate a command ring holding up to `capacity` pending commands.
pub fn command_channel(capacity: usize) -> (CommandSender, CommandReceiver) {
    let rb = HeapRb::<DeckCommand>::new(capacity.max(1));
    let (producer, consumer) = rb.split();
    (CommandSender { producer }, CommandReceiver { consumer })
}

//! Two-deck mixer: the render callback the audio device drives.

use alloc::sync::Arc;
use td_ir::{AudioBuffer, RenderCallback};

use crate::command::{command_channel, CommandReceiver, CommandSender};
use crate::status::DeckStatus;
use crate::transport::{BlockOutcome, Transport};

/// The mixer always owns exactly this many decks.
pub const DECK_COUNT: usize = 2;

/// Render-side state of one deck.
struct DeckSlot {
    transport: Transport,
    commands: CommandReceiver,
    status: Arc<DeckStatus>,
    last_outcome: BlockOutcome,
}

impl DeckSlot {
    fn drain_commands(&mut self) {
        while let Some(command) = self.commands.pop() {
            // The control side keeps its own reference to every stream it
            // sends, so this drop only decrements a count.
            drop(self.transport.apply(command));
        }
    }
}

/// Control-side handles for one deck: where to send commands and where to
/// read the published state.
pub struct ControlLink {
    pub commands: CommandSender,
    pub status: Arc<DeckStatus>,
}

/// Sums two decks into one output block.
///
/// Deck 0 renders straight into the destination; deck 1 renders into a
/// scratch block of the same shape that is then added on top. The sum is
/// not normalised or limited, so two loud decks can clip.
pub struct Mixer {
    decks: [DeckSlot; DECK_COUNT],
    scratch: AudioBuffer,
    block_size: usize,
    sample_rate: u32,
    channels: u16,
}

impl Mixer {
    /// Create a mixer and the control links for its two decks.
    /// `command_capacity` bounds the number of pending commands per deck.
    pub fn new(command_capacity: usize) -> (Self, [ControlLink; DECK_COUNT]) {
        let (tx_a, rx_a) = command_channel(command_capacity);
        let (tx_b, rx_b) = command_channel(command_capacity);
        let status_a = Arc::new(DeckStatus::new());
        let status_b = Arc::new(DeckStatus::new());

        let slot = |commands: CommandReceiver, status: &Arc<DeckStatus>| DeckSlot {
            transport: Transport::new(),
            commands,
            status: Arc::clone(status),
            last_outcome: BlockOutcome::Silent,
        };

        let mixer = Self {
            decks: [slot(rx_a, &status_a), slot(rx_b, &status_b)],
            scratch: AudioBuffer::new(0, 0),
            block_size: 0,
            sample_rate: 0,
            channels: 0,
        };
        let links = [
            ControlLink { commands: tx_a, status: status_a },
            ControlLink { commands: tx_b, status: status_b },
        ];
        (mixer, links)
    }

    /// Apply every pending command and publish the resulting state.
    /// Called at the start of each render cycle.
    pub fn process_commands(&mut self) {
        for deck in &mut self.decks {
            deck.drain_commands();
            deck.transport.publish(&deck.status);
        }
    }

    /// One render cycle: drain commands, render both decks, sum, publish.
    pub fn render_block(&mut self, output: &mut AudioBuffer) {
        #[cfg(feature = "alloc_check")]
        assert_no_alloc::assert_no_alloc(|| self.render_inner(output));
        #[cfg(not(feature = "alloc_check"))]
        self.render_inner(output);
    }

    fn render_inner(&mut self, output: &mut AudioBuffer) {
        for deck in &mut self.decks {
            deck.drain_commands();
        }

        output.silence();
        let [first, second] = &mut self.decks;
        first.last_outcome = first.transport.render(output);
        second.last_outcome = second.transport.render(&mut self.scratch);
        output.mix_from(&self.scratch);

        for deck in &self.decks {
            deck.transport.publish(&deck.status);
        }
    }

    /// Transport of deck `index` (0 or 1).
    pub fn deck(&self, index: usize) -> &Transport {
        &self.decks[index].transport
    }

    pub fn deck_mut(&mut self, index: usize) -> &mut Transport {
        &mut self.decks[index].transport
    }

    /// What deck `index` did during the most recent render cycle.
    pub fn last_outcome(&self, index: usize) -> BlockOutcome {
        self.decks[index].last_outcome
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }
}

impl RenderCallback for Mixer {
    fn prepare(&mut self, block_size: usize, sample_rate: u32, channels: u16) {
        self.block_size = block_size;
        self.sample_rate = sample_rate;
        self.channels = channels;
        self.scratch.resize(channels, block_size);
        for deck in &mut self.decks {
            deck.transport.prepare(block_size, sample_rate);
        }
    }

    fn render(&mut self, output: &mut AudioBuffer) {
        self.render_block(output);
    }

    fn release(&mut self) {
        for deck in &mut self.decks {
            deck.transport.release();
        }
    }
}

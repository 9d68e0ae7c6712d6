//! Background tag reading.
//!
//! Tag extraction touches the file system, so it runs on its own worker
//! thread. Requests and results travel over crossbeam channels; results are
//! drained by the session's poll.

use std::path::PathBuf;
use std::thread;

use crossbeam::channel::{unbounded, Receiver, Sender};
use td_formats::{read_metadata, TrackMetadata};

use crate::events::DeckId;

/// Look up tags for `path`, on behalf of the load identified by `epoch`.
#[derive(Debug, Clone)]
pub struct MetadataRequest {
    pub deck: DeckId,
    pub epoch: u64,
    pub path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct MetadataResult {
    pub deck: DeckId,
    pub epoch: u64,
    pub metadata: TrackMetadata,
}

/// Handle to the metadata worker. The worker exits once every request
/// sender (this handle's and the decks' clones) is gone.
pub struct MetadataService {
    requests: Sender<MetadataRequest>,
    results: Receiver<MetadataResult>,
}

impl MetadataService {
    pub fn spawn() -> Self {
        let (requests, request_rx) = unbounded::<MetadataRequest>();
        let (result_tx, results) = unbounded();

        thread::spawn(move || {
            for request in request_rx {
                let metadata = read_metadata(&request.path);
                log::debug!(
                    "deck {}: {} by {}",
                    request.deck,
                    metadata.title,
                    metadata.artist
                );
                let result = MetadataResult {
                    deck: request.deck,
                    epoch: request.epoch,
                    metadata,
                };
                if result_tx.send(result).is_err() {
                    break;
                }
            }
        });

        Self { requests, results }
    }

    /// A sender for queueing lookups.
    pub fn requester(&self) -> Sender<MetadataRequest> {
        self.requests.clone()
    }

    /// Results that are ready now, without waiting.
    pub fn ready(&self) -> impl Iterator<Item = MetadataResult> + '_ {
        self.results.try_iter()
    }

    /// Block until the next result arrives or the worker goes away.
    pub fn wait(&self) -> Option<MetadataResult> {
        self.results.recv().ok()
    }
}

//
// include_link/initial_scan.rs
//
// Background discovery of include links in already-open documents
//
// The worker only reads snapshots. Every result is posted on a channel and
// applied by the consumer while it holds the state lock, so sessions are never
// mutated from the worker.
//

use ropey::Rope;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use url::Url;

use super::path_resolve::PathContext;
use super::pattern::{Candidate, LinkPatternMatcher};

/// Read-only copy of an open document taken for the background scan
#[derive(Debug, Clone)]
pub struct ScanSnapshot {
    pub uri: Url,
    pub revision: u64,
    pub contents: Rope,
    pub context: PathContext,
}

/// Discovery result for one document, valid for `revision` only
#[derive(Debug, Clone)]
pub struct ScanMessage {
    pub uri: Url,
    pub revision: u64,
    pub candidates: Vec<Candidate>,
}

/// Find the include candidates of a snapshot
pub fn discover(snapshot: &ScanSnapshot, matcher: &LinkPatternMatcher) -> ScanMessage {
    let text = snapshot.contents.to_string();
    ScanMessage {
        uri: snapshot.uri.clone(),
        revision: snapshot.revision,
        candidates: matcher.find_candidates(&text, 0, &snapshot.context),
    }
}

/// A running background scan
pub struct InitialScan {
    token: CancellationToken,
    handle: JoinHandle<usize>,
}

impl InitialScan {
    /// Start scanning `snapshots`, posting one message per document to `sender`
    pub fn spawn(
        snapshots: Vec<ScanSnapshot>,
        matcher: LinkPatternMatcher,
        sender: UnboundedSender<ScanMessage>,
        token: CancellationToken,
    ) -> Self {
        let worker_token = token.clone();
        let handle = tokio::spawn(async move {
            let total = snapshots.len();
            log::info!("Initial include scan started ({} documents)", total);
            let mut sent = 0;

            for (index, snapshot) in snapshots.into_iter().enumerate() {
                let uri = snapshot.uri.clone();
                let matcher = matcher.clone();
                let work = tokio::task::spawn_blocking(move || discover(&snapshot, &matcher));

                let message = tokio::select! {
                    biased;
                    _ = worker_token.cancelled() => {
                        log::info!(
                            "Initial include scan cancelled after {}/{} documents",
                            index,
                            total
                        );
                        return sent;
                    }
                    result = work => match result {
                        Ok(message) => message,
                        Err(e) => {
                            log::warn!("Initial include scan failed for {}: {}", uri, e);
                            continue;
                        }
                    }
                };

                log::trace!(
                    "Initial include scan {}/{}: {} ({} candidates)",
                    index + 1,
                    total,
                    uri,
                    message.candidates.len()
                );
                if sender.send(message).is_err() {
                    log::trace!("Initial include scan receiver dropped");
                    return sent;
                }
                sent += 1;
            }

            log::info!("Initial include scan finished ({} documents)", sent);
            sent
        });

        Self { token, handle }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Wait for the worker. Returns the number of messages posted.
    pub async fn join(self) -> usize {
        match self.handle.await {
            Ok(sent) => sent,
            Err(e) => {
                log::warn!("Initial include scan task failed: {}", e);
                0
            }
        }
    }
}

//! Hand-off of `bestmove` tokens from the line reader to a waiting search.
//!
//! The reader pushes without blocking. A search first claims the receiving
//! side ([`ResultChannel::try_claim`]); the claim is the single-flight guard,
//! so at most one [`PendingSearch`] exists at a time. The claimant drains
//! whatever is queued (results of searches nobody waited for) before sending
//! its own `go`.

use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{Mutex, MutexGuard, mpsc};
use tracing::warn;

/// Producer side, held by the line reader.
#[derive(Debug, Clone)]
pub struct ResultSender {
    tx: mpsc::Sender<String>,
}

impl ResultSender {
    /// Queue a best move. Returns false if it had to be dropped because the
    /// queue is full.
    pub fn push(&self, bestmove: String) -> bool {
        match self.tx.try_send(bestmove) {
            Ok(()) => true,
            Err(TrySendError::Full(bestmove)) => {
                warn!(%bestmove, "result queue full, dropping bestmove");
                false
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }
}

#[derive(Debug)]
pub struct ResultChannel {
    tx: mpsc::Sender<String>,
    rx: Mutex<mpsc::Receiver<String>>,
}

impl ResultChannel {
    pub fn new(capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        Self {
            tx,
            rx: Mutex::new(rx),
        }
    }

    pub fn sender(&self) -> ResultSender {
        ResultSender {
            tx: self.tx.clone(),
        }
    }

    /// Claim the consumer side for one search. `None` while another search
    /// holds it.
    pub fn try_claim(&self) -> Option<PendingSearch<'_>> {
        self.rx.try_lock().ok().map(|rx| PendingSearch { rx })
    }
}

/// Exclusive right to receive the next result. Dropping it releases the
/// channel for the next search.
#[derive(Debug)]
pub struct PendingSearch<'a> {
    rx: MutexGuard<'a, mpsc::Receiver<String>>,
}

impl PendingSearch<'_> {
    /// Discard every queued token. Returns how many were dropped.
    pub fn drain(&mut self) -> usize {
        let mut dropped = 0;
        while self.rx.try_recv().is_ok() {
            dropped += 1;
        }
        dropped
    }

    /// Next token in arrival order. Pending until one arrives.
    pub async fn recv(&mut self) -> Option<String> {
        self.rx.recv().await
    }
}

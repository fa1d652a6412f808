//! Shared state cells.
//!
//! Server status and the log buffer are written by more than one component.
//! Each lives in a single `watch` channel so writes are serialized and every
//! change is published to subscribers.

use std::sync::atomic::{AtomicU64, Ordering};

use panel_common::ServerStatus;
use tokio::sync::watch;

/// Shown for an empty log buffer.
pub const NO_LOGS_MESSAGE: &str = "No logs available.";
/// Shown when the last log fetch failed.
pub const LOG_FETCH_ERROR_MESSAGE: &str = "Error fetching logs.";

/// Observed server status, written by the status poller and by optimistic
/// lifecycle updates.
///
/// Every optimistic write bumps an epoch. A poll result carries the epoch
/// read when its request was issued and is dropped if the epoch moved since,
/// so a response already in flight cannot undo an optimistic write.
#[derive(Debug)]
pub struct StatusCell {
    tx: watch::Sender<ServerStatus>,
    epoch: AtomicU64,
}

impl Default for StatusCell {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusCell {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(ServerStatus::Unknown);
        Self {
            tx,
            epoch: AtomicU64::new(0),
        }
    }

    pub fn get(&self) -> ServerStatus {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<ServerStatus> {
        self.tx.subscribe()
    }

    /// Epoch to hand back to [`StatusCell::apply_observed`].
    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    /// Record a polled status. Returns `false` if an optimistic write
    /// happened after the poll was issued.
    pub fn apply_observed(&self, epoch: u64, status: ServerStatus) -> bool {
        let mut applied = false;
        self.tx.send_if_modified(|current| {
            if self.epoch.load(Ordering::SeqCst) != epoch {
                return false;
            }
            applied = true;
            if *current == status {
                false
            } else {
                *current = status;
                true
            }
        });
        applied
    }

    /// Write a status predicted from a command outcome. Advisory: the next
    /// poll issued afterwards overrides it.
    pub fn set_optimistic(&self, status: ServerStatus) {
        self.tx.send_modify(|current| {
            self.epoch.fetch_add(1, Ordering::SeqCst);
            *current = status;
        });
    }
}

/// Last known contents of the inference server's log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogBuffer {
    Contents(String),
    /// The last fetch failed.
    FetchFailed,
}

impl Default for LogBuffer {
    fn default() -> Self {
        LogBuffer::Contents(String::new())
    }
}

impl LogBuffer {
    /// Text to show the operator.
    pub fn display(&self) -> &str {
        match self {
            LogBuffer::Contents(text) if text.is_empty() => NO_LOGS_MESSAGE,
            LogBuffer::Contents(text) => text,
            LogBuffer::FetchFailed => LOG_FETCH_ERROR_MESSAGE,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, LogBuffer::Contents(text) if text.is_empty())
    }
}

/// Log buffer shared by the log tailer and the lifecycle controller.
///
/// Clearing bumps an epoch, like [`StatusCell`]'s optimistic writes, so a
/// fetch issued before a server stop cannot bring the old log back.
#[derive(Debug)]
pub struct LogCell {
    tx: watch::Sender<LogBuffer>,
    epoch: AtomicU64,
}

impl Default for LogCell {
    fn default() -> Self {
        Self::new()
    }
}

impl LogCell {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(LogBuffer::default());
        Self {
            tx,
            epoch: AtomicU64::new(0),
        }
    }

    pub fn get(&self) -> LogBuffer {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<LogBuffer> {
        self.tx.subscribe()
    }

    /// Epoch to hand back to [`LogCell::apply_fetched`].
    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    /// Replace the buffer wholesale.
    pub fn replace(&self, buffer: LogBuffer) {
        self.tx.send_if_modified(|current| {
            if *current == buffer {
                false
            } else {
                *current = buffer;
                true
            }
        });
    }

    /// Record a fetched buffer. Returns `false` if the buffer was cleared
    /// after the fetch was issued.
    pub fn apply_fetched(&self, epoch: u64, buffer: LogBuffer) -> bool {
        let mut applied = false;
        self.tx.send_if_modified(|current| {
            if self.epoch.load(Ordering::SeqCst) != epoch {
                return false;
            }
            applied = true;
            if *current == buffer {
                false
            } else {
                *current = buffer;
                true
            }
        });
        applied
    }

    pub fn clear(&self) {
        self.tx.send_if_modified(|current| {
            self.epoch.fetch_add(1, Ordering::SeqCst);
            if current.is_empty() {
                false
            } else {
                *current = LogBuffer::default();
                true
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_cell_starts_unknown() {
        assert_eq!(StatusCell::new().get(), ServerStatus::Unknown);
    }

    #[test]
    fn test_observed_status_applies_with_current_epoch() {
        let cell = StatusCell::new();
        let epoch = cell.epoch();
        assert!(cell.apply_observed(epoch, ServerStatus::Running));
        assert_eq!(cell.get(), ServerStatus::Running);
    }

    #[test]
    fn test_optimistic_write_supersedes_older_poll() {
        let cell = StatusCell::new();
        let issued_at = cell.epoch();

        cell.set_optimistic(ServerStatus::Running);
        assert!(!cell.apply_observed(issued_at, ServerStatus::Stopped));
        assert_eq!(cell.get(), ServerStatus::Running);

        // A poll issued after the optimistic write is authoritative.
        assert!(cell.apply_observed(cell.epoch(), ServerStatus::Stopped));
        assert_eq!(cell.get(), ServerStatus::Stopped);
    }

    #[tokio::test]
    async fn test_status_change_notifies_subscribers() {
        let cell = StatusCell::new();
        let mut rx = cell.subscribe();

        cell.apply_observed(cell.epoch(), ServerStatus::Stopped);
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), ServerStatus::Stopped);

        // Same value again is not a change.
        cell.apply_observed(cell.epoch(), ServerStatus::Stopped);
        assert!(!rx.has_changed().unwrap());
    }

    #[test]
    fn test_log_buffer_display() {
        assert_eq!(LogBuffer::default().display(), NO_LOGS_MESSAGE);
        assert_eq!(LogBuffer::FetchFailed.display(), LOG_FETCH_ERROR_MESSAGE);
        assert_eq!(LogBuffer::Contents("ready".to_string()).display(), "ready");
        assert!(LogBuffer::default().is_empty());
        assert!(!LogBuffer::FetchFailed.is_empty());
    }

    #[test]
    fn test_log_cell_clear() {
        let cell = LogCell::new();
        cell.replace(LogBuffer::Contents("loading model".to_string()));
        cell.clear();
        assert!(cell.get().is_empty());
    }

    #[test]
    fn test_clear_supersedes_older_fetch() {
        let cell = LogCell::new();
        cell.replace(LogBuffer::Contents("serving".to_string()));
        let issued_at = cell.epoch();

        cell.clear();
        assert!(!cell.apply_fetched(issued_at, LogBuffer::Contents("serving".to_string())));
        assert!(cell.get().is_empty());

        assert!(cell.apply_fetched(cell.epoch(), LogBuffer::Contents("restarted".to_string())));
        assert_eq!(cell.get().display(), "restarted");
    }
}

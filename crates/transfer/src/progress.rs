use std::sync::{Arc, Mutex};

use flaredrive_write_api::SentCallback;

/// Aggregate progress of one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferProgress {
    pub loaded: u64,
    pub total: u64,
}

/// Callback invoked with aggregate progress.
pub type ProgressCallback = Arc<dyn Fn(TransferProgress) + Send + Sync>;

/// Sums per-part byte counts into one monotonic progress figure.
///
/// A part only counts as fully transferred once [`complete`](Self::complete)
/// is called for it, so `loaded == total` is reported exactly once, after the
/// last part finished.
pub struct PartProgress {
    inner: Mutex<Inner>,
    callback: Option<ProgressCallback>,
}

struct Inner {
    lengths: Vec<u64>,
    loaded: Vec<u64>,
    total: u64,
    reported: u64,
    finished: bool,
}

impl PartProgress {
    /// Creates a tracker for parts of the given lengths.
    pub fn new(lengths: Vec<u64>, callback: Option<ProgressCallback>) -> Arc<Self> {
        let total = lengths.iter().sum();
        let loaded = vec![0; lengths.len()];
        Arc::new(Self {
            inner: Mutex::new(Inner {
                lengths,
                loaded,
                total,
                reported: 0,
                finished: false,
            }),
            callback,
        })
    }

    /// Records that `sent` bytes of part `index` (0-based) are on the wire.
    pub fn update(&self, index: usize, sent: u64) {
        let mut inner = self.inner.lock().unwrap();
        let Some(&len) = inner.lengths.get(index) else {
            return;
        };
        let capped = sent.min(len.saturating_sub(1));
        if capped > inner.loaded[index] {
            inner.loaded[index] = capped;
            self.emit(&mut inner);
        }
    }

    /// Marks part `index` (0-based) as stored.
    pub fn complete(&self, index: usize) {
        let mut inner = self.inner.lock().unwrap();
        let Some(&len) = inner.lengths.get(index) else {
            return;
        };
        inner.loaded[index] = len;
        self.emit(&mut inner);
    }

    /// Returns a transport callback feeding part `index`.
    pub fn sent_callback(self: &Arc<Self>, index: usize) -> SentCallback {
        let tracker = Arc::clone(self);
        Arc::new(move |sent| tracker.update(index, sent))
    }

    /// Returns the last aggregate figure.
    pub fn snapshot(&self) -> TransferProgress {
        let inner = self.inner.lock().unwrap();
        TransferProgress {
            loaded: inner.reported,
            total: inner.total,
        }
    }

    fn emit(&self, inner: &mut Inner) {
        let loaded: u64 = inner.loaded.iter().sum();
        let done = loaded == inner.total;
        if loaded <= inner.reported && !(done && !inner.finished) {
            return;
        }
        if done {
            if inner.finished {
                return;
            }
            inner.finished = true;
        }
        inner.reported = loaded;
        if let Some(cb) = &self.callback {
            cb(TransferProgress {
                loaded,
                total: inner.total,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recording() -> (ProgressCallback, Arc<Mutex<Vec<TransferProgress>>>) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let e = Arc::clone(&events);
        let cb: ProgressCallback = Arc::new(move |p| e.lock().unwrap().push(p));
        (cb, events)
    }

    #[test]
    fn out_of_order_updates_stay_monotonic() {
        let (cb, events) = recording();
        let progress = PartProgress::new(vec![100, 100, 50], Some(cb));

        progress.update(1, 60);
        progress.update(0, 30);
        progress.complete(1);
        progress.update(2, 50);
        progress.complete(2);
        progress.complete(0);

        let events = events.lock().unwrap();
        let loaded: Vec<u64> = events.iter().map(|p| p.loaded).collect();
        assert!(loaded.windows(2).all(|w| w[0] <= w[1]), "{loaded:?}");
        assert_eq!(loaded.iter().filter(|&&l| l == 250).count(), 1);
        assert_eq!(*loaded.last().unwrap(), 250);
    }

    #[test]
    fn total_not_reached_before_last_completion() {
        let (cb, events) = recording();
        let progress = PartProgress::new(vec![10, 10], Some(cb));

        progress.update(0, 10);
        progress.update(1, 10);
        assert_eq!(progress.snapshot().loaded, 18);

        progress.complete(0);
        assert_eq!(progress.snapshot().loaded, 19);
        progress.complete(1);
        assert_eq!(progress.snapshot().loaded, 20);

        let events = events.lock().unwrap();
        assert_eq!(events.iter().filter(|p| p.loaded == p.total).count(), 1);
    }

    #[test]
    fn repeated_completion_reports_once() {
        let (cb, events) = recording();
        let progress = PartProgress::new(vec![5], Some(cb));
        progress.complete(0);
        progress.complete(0);
        progress.update(0, 5);
        assert_eq!(events.lock().unwrap().len(), 1);
    }

    #[test]
    fn empty_file_reports_completion_once() {
        let (cb, events) = recording();
        let progress = PartProgress::new(vec![0], Some(cb));
        progress.update(0, 0);
        progress.complete(0);
        progress.complete(0);

        let events = events.lock().unwrap();
        assert_eq!(
            *events,
            vec![TransferProgress {
                loaded: 0,
                total: 0
            }]
        );
    }

    #[test]
    fn sent_callback_feeds_part() {
        let progress = PartProgress::new(vec![100, 100], None);
        let cb = progress.sent_callback(1);
        cb(40);
        assert_eq!(progress.snapshot().loaded, 40);
    }

    #[test]
    fn unknown_index_ignored() {
        let progress = PartProgress::new(vec![10], None);
        progress.update(5, 3);
        progress.complete(5);
        assert_eq!(progress.snapshot().loaded, 0);
    }
}

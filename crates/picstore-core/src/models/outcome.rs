//! Terminal state tracking for one upload request.
//!
//! The original keeps per-request counters and an "already responded" flag in
//! nested closures; here the same state is an explicit value shared by handle
//! (`Arc<RequestOutcome>`) across every async continuation, with an atomic
//! guard so the response is emitted exactly once even when a timeout path and
//! a late completion race.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use super::picture::{PictureEntry, PictureMap, SizeLabel};

#[derive(Debug)]
pub struct RequestOutcome {
    attempted: usize,
    resolved: AtomicUsize,
    responded: AtomicBool,
    picture: Mutex<PictureMap>,
}

impl RequestOutcome {
    pub fn new(attempted: usize) -> Self {
        Self {
            attempted,
            resolved: AtomicUsize::new(0),
            responded: AtomicBool::new(false),
            picture: Mutex::new(PictureMap::new()),
        }
    }

    pub fn attempted(&self) -> usize {
        self.attempted
    }

    pub fn resolved(&self) -> usize {
        self.resolved.load(Ordering::Acquire)
    }

    /// Record the stored original. Zoom is always inserted before any
    /// transform starts, so no finalization check is needed here.
    pub fn insert_zoom(&self, url: impl Into<String>, byte_len: u64) {
        let mut picture = self.picture.lock().expect("picture lock poisoned");
        picture.insert_zoom(url, byte_len);
    }

    /// Record one variant entry. A completion landing after the response was
    /// already sent is discarded harmlessly. Returns whether it was accepted.
    pub fn insert(&self, label: SizeLabel, entry: PictureEntry) -> bool {
        if self.is_finalized() {
            return false;
        }
        let mut picture = self.picture.lock().expect("picture lock poisoned");
        picture.insert(label, entry)
    }

    /// Count one spec as resolved (success or recognized failure both count).
    /// Returns `true` when this was the last outstanding spec.
    pub fn mark_resolved(&self) -> bool {
        let now = self.resolved.fetch_add(1, Ordering::AcqRel) + 1;
        now == self.attempted
    }

    pub fn all_resolved(&self) -> bool {
        self.resolved() >= self.attempted
    }

    /// Claim the right to respond. Only the first caller gets `true`.
    pub fn finalize(&self) -> bool {
        self.responded
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn is_finalized(&self) -> bool {
        self.responded.load(Ordering::Acquire)
    }

    pub fn picture_snapshot(&self) -> PictureMap {
        self.picture.lock().expect("picture lock poisoned").clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn resolves_only_after_all_specs() {
        let outcome = RequestOutcome::new(3);
        assert!(!outcome.mark_resolved());
        assert!(!outcome.mark_resolved());
        assert!(outcome.mark_resolved());
        assert!(outcome.all_resolved());
    }

    #[test]
    fn finalize_claims_exactly_once() {
        let outcome = RequestOutcome::new(1);
        assert!(outcome.finalize());
        assert!(!outcome.finalize());
        assert!(outcome.is_finalized());
    }

    #[test]
    fn late_insert_after_finalize_is_discarded() {
        let outcome = RequestOutcome::new(1);
        outcome.insert_zoom("https://cdn/1/@v4/a.png", 10);
        assert!(outcome.finalize());
        let accepted = outcome.insert(
            SizeLabel::Big,
            PictureEntry::new("https://cdn/late.webp", Some(700), 99),
        );
        assert!(!accepted);
        assert_eq!(outcome.picture_snapshot().len(), 1);
    }

    #[test]
    fn concurrent_finalize_yields_single_winner() {
        let outcome = Arc::new(RequestOutcome::new(8));
        let mut handles = Vec::new();
        for _ in 0..8 {
            let outcome = Arc::clone(&outcome);
            handles.push(std::thread::spawn(move || {
                outcome.mark_resolved();
                outcome.finalize()
            }));
        }
        let winners = handles
            .into_iter()
            .map(|h| h.join().expect("thread panicked"))
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
        assert!(outcome.all_resolved());
    }
}

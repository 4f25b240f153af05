use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

/// Report phases, in pipeline order. The key names (`p0`..`p15`) are the
/// readout contract for external pollers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    UsersIndex,
    ShelvesIndex,
    Membership,
    BooksIndex,
    ChaptersIndex,
    PagesIndex,
    PageTags,
    PagesReport,
    AttachmentsReport,
    BooksReport,
    DuplicateBooksReport,
    UnshelvedBooksReport,
    ChaptersReport,
    DuplicatePagesReport,
    ShelvesReport,
    UsersReport,
}

impl Phase {
    pub fn key(self) -> &'static str {
        match self {
            Self::UsersIndex => "p0",
            Self::ShelvesIndex => "p1",
            Self::Membership => "p2",
            Self::BooksIndex => "p3",
            Self::ChaptersIndex => "p4",
            Self::PagesIndex => "p5",
            Self::PageTags => "p6",
            Self::PagesReport => "p7",
            Self::AttachmentsReport => "p8",
            Self::BooksReport => "p9",
            Self::DuplicateBooksReport => "p10",
            Self::UnshelvedBooksReport => "p11",
            Self::ChaptersReport => "p12",
            Self::DuplicatePagesReport => "p13",
            Self::ShelvesReport => "p14",
            Self::UsersReport => "p15",
        }
    }
}

/// Run-scoped progress sink. Handles are cheap clones over shared state, so
/// a poller can hold one while a report run updates another. One run at a
/// time per sink; a new run starts by calling [`Progress::clear`].
#[derive(Debug, Clone, Default)]
pub struct Progress {
    inner: Arc<Mutex<BTreeMap<&'static str, f64>>>,
}

impl Progress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, phase: Phase, percent: f64) {
        let mut inner = self.inner.lock().expect("progress lock poisoned");
        inner.insert(phase.key(), percent.clamp(0.0, 100.0));
    }

    pub fn clear(&self) {
        self.inner.lock().expect("progress lock poisoned").clear();
    }

    /// Current phase -> percentage readout for UI polling.
    pub fn snapshot(&self) -> BTreeMap<String, f64> {
        self.inner
            .lock()
            .expect("progress lock poisoned")
            .iter()
            .map(|(key, value)| ((*key).to_string(), *value))
            .collect()
    }

    /// Per-loop tracker: starts the phase at 0 and advances an equal share
    /// per processed record. An empty loop completes the phase immediately.
    pub fn tracker(&self, phase: Phase, len: usize) -> PhaseTracker {
        if len == 0 {
            self.set(phase, 100.0);
        } else {
            self.set(phase, 0.0);
        }
        PhaseTracker {
            progress: self.clone(),
            phase,
            step: if len == 0 { 0.0 } else { 100.0 / len as f64 },
            done: 0.0,
        }
    }
}

pub struct PhaseTracker {
    progress: Progress,
    phase: Phase,
    step: f64,
    done: f64,
}

impl PhaseTracker {
    pub fn tick(&mut self) {
        self.done += self.step;
        self.progress.set(self.phase, self.done);
    }
}

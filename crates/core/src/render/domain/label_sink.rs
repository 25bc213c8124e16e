use crate::liveness::domain::decision::Verdict;

/// Domain interface for publishing the latest liveness verdict.
///
/// Publication is last-write-wins with no history; publishing the same
/// verdict twice is indistinguishable from publishing it once.
pub trait LabelSink: Send {
    fn publish(&mut self, verdict: Verdict);
}

/// Keeps only the most recent verdict, unset until the first publish.
#[derive(Debug, Default)]
pub struct LatestLabelSink {
    current: Option<Verdict>,
}

impl LatestLabelSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<Verdict> {
        self.current
    }
}

impl LabelSink for LatestLabelSink {
    fn publish(&mut self, verdict: Verdict) {
        self.current = Some(verdict);
    }
}

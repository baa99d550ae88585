use std::fmt;

/// Counts reported at the end of a batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub groups: usize,
    pub records: usize,
    pub written: usize,
    /// Records whose image could not be read or written.
    pub skipped: usize,
    pub refined: usize,
    pub refinement_failures: usize,
}

impl BatchSummary {
    pub fn absorb(&mut self, other: &BatchSummary) {
        self.groups += other.groups;
        self.records += other.records;
        self.written += other.written;
        self.skipped += other.skipped;
        self.refined += other.refined;
        self.refinement_failures += other.refinement_failures;
    }
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} groups, {} images: {} written, {} skipped, {} refined, {} refinement failures",
            self.groups,
            self.records,
            self.written,
            self.skipped,
            self.refined,
            self.refinement_failures
        )
    }
}

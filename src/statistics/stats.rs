use serde::Serialize;

/// Counters describing the work performed by frontier iterators and orchestrators.
///
/// Each iterator owns its own `Stats`; orchestrators merge them into the outcome they
/// return, so there is no process-wide state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Stats {
    next_calls: usize,
    vertices_settled: usize,
    candidates_emitted: usize,
    bound_evaluations: usize,
    timeouts: usize,
    peak_live_entries: usize,
}

impl Stats {
    pub fn new() -> Self {
        Stats::default()
    }

    /// Record that `next()` was called on an iterator
    pub fn bump_next_calls(&mut self) {
        self.next_calls += 1
    }

    /// Record that a frontier finalized the distance of one more vertex
    pub fn bump_settled(&mut self) {
        self.vertices_settled += 1
    }

    /// Record that a complete candidate was handed out
    pub fn bump_emitted(&mut self) {
        self.candidates_emitted += 1
    }

    /// Record that the pruner was asked for a threshold
    pub fn bump_bound_evaluations(&mut self) {
        self.bound_evaluations += 1
    }

    /// Record that a search stopped because its deadline passed
    pub fn bump_timeouts(&mut self) {
        self.timeouts += 1
    }

    /// Track the largest number of live map/queue entries observed
    pub fn observe_live_entries(&mut self, entries: usize) {
        self.peak_live_entries = self.peak_live_entries.max(entries)
    }

    pub fn get_next_calls(&self) -> usize {
        self.next_calls
    }

    pub fn get_vertices_settled(&self) -> usize {
        self.vertices_settled
    }

    pub fn get_candidates_emitted(&self) -> usize {
        self.candidates_emitted
    }

    pub fn get_bound_evaluations(&self) -> usize {
        self.bound_evaluations
    }

    pub fn get_timeouts(&self) -> usize {
        self.timeouts
    }

    pub fn get_peak_live_entries(&self) -> usize {
        self.peak_live_entries
    }

    /// Combine two statistics objects. Counters add up, the memory peak is the larger one.
    pub fn merge(&self, other: &Stats) -> Stats {
        Stats {
            next_calls: self.next_calls + other.next_calls,
            vertices_settled: self.vertices_settled + other.vertices_settled,
            candidates_emitted: self.candidates_emitted + other.candidates_emitted,
            bound_evaluations: self.bound_evaluations + other.bound_evaluations,
            timeouts: self.timeouts + other.timeouts,
            peak_live_entries: self.peak_live_entries.max(other.peak_live_entries),
        }
    }
}

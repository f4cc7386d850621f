use std::{
    cmp::Reverse,
    collections::BinaryHeap,
    time::{Duration, Instant},
};

use hashbrown::HashSet;
use tracing::warn;

use crate::{
    graph::{DistanceOracle, SimilarityOracle, Vertex},
    search::{
        advance_cheapest, PartialCandidates, Pruner, PruningMode, ScoreCache, ScoreParams,
        SourceSearch,
    },
    sets::candidates::CandidateEntry,
    statistics::Stats,
};

/// Number of settled vertices between two deadline checks.
const DEADLINE_CHECK_INTERVAL: usize = 64;

/// Lazily yields the vertices that best extend a candidate set, in score order.
///
/// One [`SourceSearch`] runs from the query and one from every member of the set. Frontiers
/// are advanced in global cost order; a vertex becomes *complete* once every active source
/// has settled it, and only complete vertices are ever emitted. The [`PruningMode`] decides
/// when the best complete vertex may be emitted without further expansion.
///
/// The set can be grown with [`expand_set`](Self::expand_set) and modified with
/// [`replace_set`](Self::replace_set); both keep the shortest-path state of every other
/// source. Emitted vertices are excluded from later `next()` calls until the set changes
/// them back (a member removed by `replace_set` becomes eligible again).
///
/// # Invariants
/// - `sources[0]` is the query search; `sources[1..]` follow the set's insertion order.
/// - Every eligible discovered vertex is complete, queued in `partial` (the query settled
///   it) or not yet settled by the query, unless `stale`, in which case `complete` and
///   `partial` are rebuilt from `discovered` before the next expansion.
/// - Keys in `partial` never exceed the current score lower bound of their vertex.
/// - Scores in `cache` and `complete` are valid for the current set only.
pub struct DiversityIterator<'a, V: Vertex, G, S> {
    graph: &'a G,
    similarity: &'a S,
    params: ScoreParams,
    pruning: PruningMode,
    pool: Option<&'a HashSet<V>>,
    sources: Vec<SourceSearch<V>>,
    yielded: HashSet<V>,
    discovered: HashSet<V>,
    partial: PartialCandidates<V>,
    complete: BinaryHeap<Reverse<CandidateEntry<V>>>,
    cache: ScoreCache<V>,
    stale: bool,
    deadline: Option<Instant>,
    timed_out: bool,
    stats: Stats,
}

impl<V: Vertex, G, S> Clone for DiversityIterator<'_, V, G, S> {
    fn clone(&self) -> Self {
        DiversityIterator {
            graph: self.graph,
            similarity: self.similarity,
            params: self.params,
            pruning: self.pruning,
            pool: self.pool,
            sources: self.sources.clone(),
            yielded: self.yielded.clone(),
            discovered: self.discovered.clone(),
            partial: self.partial.clone(),
            complete: self.complete.clone(),
            cache: self.cache.clone(),
            stale: self.stale,
            deadline: self.deadline,
            timed_out: self.timed_out,
            stats: self.stats,
        }
    }
}

impl<'a, V, G, S> DiversityIterator<'a, V, G, S>
where
    V: Vertex,
    G: DistanceOracle<V>,
    S: SimilarityOracle<V>,
{
    /// Iterator over an empty set: yields vertices by relevance to `query` alone.
    pub fn new(graph: &'a G, similarity: &'a S, query: V, params: ScoreParams) -> Self {
        DiversityIterator {
            graph,
            similarity,
            params,
            pruning: PruningMode::default(),
            pool: None,
            sources: vec![SourceSearch::new(graph, query, params.direction)],
            yielded: HashSet::new(),
            discovered: HashSet::new(),
            partial: PartialCandidates::new(),
            complete: BinaryHeap::new(),
            cache: ScoreCache::new(),
            stale: false,
            deadline: None,
            timed_out: false,
            stats: Stats::new(),
        }
    }

    pub fn with_pruning(mut self, pruning: PruningMode) -> Self {
        self.pruning = pruning;
        self.stale = true;
        self
    }

    /// Restricts emitted vertices to `pool`. Other vertices still relay paths.
    pub fn with_pool(mut self, pool: Option<&'a HashSet<V>>) -> Self {
        self.pool = pool;
        self.discovered.retain(|v| pool.is_none_or(|p| p.contains(v)));
        self.stale = true;
        self
    }

    pub fn with_deadline(mut self, deadline: Option<Instant>) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn with_timeout(self, timeout: Option<Duration>) -> Self {
        self.with_deadline(timeout.map(|t| Instant::now() + t))
    }

    /// Adds every vertex of `members`, in order, to the set.
    pub fn with_members(mut self, members: &[V]) -> Self {
        for &member in members {
            self.expand_set(member);
        }
        self
    }

    pub fn query(&self) -> V {
        self.sources[0].source()
    }

    pub fn params(&self) -> &ScoreParams {
        &self.params
    }

    pub fn pruning(&self) -> PruningMode {
        self.pruning
    }

    /// Members of the candidate set in insertion order.
    pub fn members(&self) -> Vec<V> {
        self.sources[1..].iter().map(SourceSearch::source).collect()
    }

    pub fn is_member(&self, vertex: V) -> bool {
        self.sources[1..].iter().any(|s| s.source() == vertex)
    }

    pub fn timed_out(&self) -> bool {
        self.timed_out
    }

    pub fn stats(&self) -> Stats {
        self.stats
    }

    /// Running count of map and queue entries held by the iterator.
    pub fn live_entries(&self) -> usize {
        self.sources.iter().map(SourceSearch::live_entries).sum::<usize>()
            + self.yielded.len()
            + self.discovered.len()
            + self.partial.len()
            + self.complete.len()
            + self.cache.len()
    }

    fn in_pool(&self, vertex: V) -> bool {
        self.pool.is_none_or(|pool| pool.contains(&vertex))
    }

    fn is_eligible(&self, vertex: V) -> bool {
        vertex != self.query()
            && self.in_pool(vertex)
            && !self.yielded.contains(&vertex)
            && !self.is_member(vertex)
    }

    /// Whether every active source has settled `vertex`.
    pub fn is_complete(&self, vertex: V) -> bool {
        self.sources.iter().all(|s| s.distance(vertex).is_some())
    }

    /// Score of `vertex` against the current set, `None` until the vertex is complete.
    ///
    /// Memoized until the set mutates.
    pub fn score_of(&mut self, vertex: V) -> Option<f32> {
        if !self.is_complete(vertex) {
            return None;
        }
        let DiversityIterator {
            params,
            similarity,
            sources,
            cache,
            ..
        } = self;
        Some(cache.get_or_compute(vertex, || {
            let (query, members) = sources.split_at(1);
            let query = &query[0];
            params.vertex_score(
                query.distance(vertex).unwrap_or(f32::INFINITY),
                similarity.similarity(query.source(), vertex),
                members.iter().map(|member| {
                    (
                        member.distance(vertex).unwrap_or(f32::INFINITY),
                        similarity.similarity(member.source(), vertex),
                    )
                }),
            )
        }))
    }

    /// Adds `vertex` as a new source.
    ///
    /// `vertex` should have been reached by this iterator; adding the query or an existing
    /// member is a contract violation (asserted in debug builds, ignored otherwise).
    pub fn expand_set(&mut self, vertex: V) {
        debug_assert!(
            vertex != self.query() && !self.is_member(vertex),
            "{vertex:?} is already a source"
        );
        if vertex == self.query() || self.is_member(vertex) {
            return;
        }
        self.sources
            .push(SourceSearch::new(self.graph, vertex, self.params.direction));
        self.invalidate();
    }

    /// Replaces member `removed` by `substitute`, which becomes the newest member.
    ///
    /// The search of `removed` is discarded; all others are kept. `removed` becomes eligible
    /// for emission again.
    pub fn replace_set(&mut self, removed: V, substitute: V) {
        let position = self.sources[1..]
            .iter()
            .position(|s| s.source() == removed);
        debug_assert!(position.is_some(), "{removed:?} is not a member");
        debug_assert!(
            substitute == removed || (substitute != self.query() && !self.is_member(substitute)),
            "{substitute:?} is already a source"
        );
        let Some(position) = position else {
            return;
        };
        if substitute != removed && (substitute == self.query() || self.is_member(substitute)) {
            return;
        }
        self.remove_source(position + 1);
        self.sources
            .push(SourceSearch::new(self.graph, substitute, self.params.direction));
    }

    /// Like [`replace_set`](Self::replace_set), on an independent copy.
    pub fn replace_set_return(&self, removed: V, substitute: V) -> Self {
        let mut replaced = self.clone();
        replaced.replace_set(removed, substitute);
        replaced
    }

    /// Independent copy whose set lacks `removed`; its next result is the best substitute
    /// for `removed` (possibly `removed` itself).
    pub fn without_member(&self, removed: V) -> Self {
        let mut reduced = self.clone();
        match reduced.sources[1..].iter().position(|s| s.source() == removed) {
            Some(position) => reduced.remove_source(position + 1),
            None => debug_assert!(false, "{removed:?} is not a member"),
        }
        reduced
    }

    /// Independent copy that forgets what was emitted so far and adds `seed` to the set.
    pub fn branch(&self, seed: V) -> Self {
        let mut branch = self.clone();
        branch.yielded.clear();
        branch.stats = Stats::new();
        branch.expand_set(seed);
        branch
    }

    fn remove_source(&mut self, index: usize) {
        let removed = self.sources.remove(index).source();
        self.yielded.remove(&removed);
        if self.in_pool(removed) {
            self.discovered.insert(removed);
        }
        self.invalidate();
    }

    fn invalidate(&mut self) {
        self.cache.invalidate();
        self.stale = true;
    }

    fn rebuild(&mut self) {
        self.partial.clear();
        self.complete.clear();
        let discovered: Vec<V> = self.discovered.iter().copied().collect();
        for vertex in discovered {
            self.classify(vertex);
        }
        self.stale = false;
    }

    fn pruner(&self) -> Pruner<'_, V, S> {
        let (query, members) = self.sources.split_at(1);
        Pruner {
            params: &self.params,
            similarity: self.similarity,
            query: &query[0],
            members,
        }
    }

    /// Files a freshly settled (or re-examined) vertex as partial or complete.
    ///
    /// A complete vertex left in `partial` is dropped once it reaches the front.
    fn classify(&mut self, vertex: V) {
        if !self.is_eligible(vertex) {
            return;
        }
        if let Some(score) = self.score_of(vertex) {
            self.complete
                .push(Reverse(CandidateEntry::new(vertex, score)));
        } else if self.sources[0].distance(vertex).is_some() && !self.partial.contains(vertex) {
            let bound = self.pruner().vertex_lower_bound(vertex);
            self.partial.insert(vertex, bound);
        }
    }

    fn threshold(&mut self) -> f32 {
        self.stats.bump_bound_evaluations();
        let (query, members) = self.sources.split_at(1);
        let pruner = Pruner {
            params: &self.params,
            similarity: self.similarity,
            query: &query[0],
            members,
        };
        pruner.threshold(self.pruning, &mut self.partial)
    }

    fn deadline_passed(&mut self) -> bool {
        if !self.timed_out && self.deadline.is_some_and(|d| Instant::now() >= d) {
            self.timed_out = true;
            self.stats.bump_timeouts();
            warn!(
                query = ?self.query(),
                members = self.sources.len() - 1,
                "diversity iterator timed out"
            );
        }
        self.timed_out
    }

    fn emit(&mut self, entry: CandidateEntry<V>) -> CandidateEntry<V> {
        self.yielded.insert(entry.vertex);
        let live = self.live_entries();
        self.stats.bump_emitted();
        self.stats.observe_live_entries(live);
        entry
    }

    /// Next best vertex with its score against the current set.
    ///
    /// # Returns
    /// `None` when no eligible vertex remains reachable from every source, or once the
    /// deadline has passed (and on every later call).
    pub fn next_entry(&mut self) -> Option<CandidateEntry<V>> {
        self.stats.bump_next_calls();
        if self.deadline_passed() {
            return None;
        }
        if self.stale {
            self.rebuild();
        }

        let mut expansions = 0usize;
        loop {
            if let Some(&Reverse(best)) = self.complete.peek() {
                let threshold = self.threshold();
                if self.pruning.admits(best.score.get(), threshold) {
                    self.complete.pop();
                    return Some(self.emit(best));
                }
            }

            let Some((_, settled)) = advance_cheapest(self.graph, &mut self.sources) else {
                // nothing left to expand: every remaining partial vertex is unreachable
                let Reverse(best) = self.complete.pop()?;
                return Some(self.emit(best));
            };
            self.stats.bump_settled();
            if self.in_pool(settled.vertex) && settled.vertex != self.query() {
                self.discovered.insert(settled.vertex);
                self.classify(settled.vertex);
            }

            expansions += 1;
            if expansions % DEADLINE_CHECK_INTERVAL == 0 && self.deadline_passed() {
                return None;
            }
        }
    }
}

impl<V, G, S> Iterator for DiversityIterator<'_, V, G, S>
where
    V: Vertex,
    G: DistanceOracle<V>,
    S: SimilarityOracle<V>,
{
    type Item = V;

    fn next(&mut self) -> Option<V> {
        self.next_entry().map(|entry| entry.vertex)
    }
}

use std::{
    sync::{
        Mutex, PoisonError,
        atomic::{AtomicUsize, Ordering},
    },
    thread,
};

use serde::Serialize;
use tracing::{debug, info};

use crate::{
    error::Result,
    graph::{DistanceOracle, SimilarityOracle, Vertex},
    orchestrate::{DiversifyRequest, ResultHeap, ScoredSet},
    search::{DiversityIterator, PruningMode},
    sets::candidates::CandidateEntry,
    statistics::Stats,
};

/// Result sets of a diversification run, best first.
#[derive(Debug, Clone, Serialize)]
pub struct DiversifyOutcome<V> {
    pub sets: Vec<ScoredSet<V>>,
    pub stats: Stats,
}

impl<V: Vertex> DiversifyOutcome<V> {
    pub fn best(&self) -> Option<&ScoredSet<V>> {
        self.sets.first()
    }

    /// Whether the deadline cut the run short.
    pub fn timed_out(&self) -> bool {
        self.stats.get_timeouts() > 0
    }
}

/// Generalized nearest-neighbour seeding: the `k` most relevant vertices, drawn from an
/// iterator over the empty set.
pub fn seed<V, G, S>(seeding: &mut DiversityIterator<'_, V, G, S>, k: usize) -> Vec<CandidateEntry<V>>
where
    V: Vertex,
    G: DistanceOracle<V>,
    S: SimilarityOracle<V>,
{
    std::iter::from_fn(|| seeding.next_entry()).take(k).collect()
}

/// Grows `seed` to `result_size` vertices by repeatedly adding the iterator's best vertex.
///
/// `worst` reports the score of the worst kept result once the heap is full. In bounded
/// mode a set whose partial score already reaches it is abandoned; increments can be
/// negative, so exhaustive mode always grows the set to the end.
fn grow<V, G, S>(
    seeding: &DiversityIterator<'_, V, G, S>,
    seed: CandidateEntry<V>,
    result_size: usize,
    worst: impl Fn() -> Option<f32>,
) -> (Option<ScoredSet<V>>, Stats)
where
    V: Vertex,
    G: DistanceOracle<V>,
    S: SimilarityOracle<V>,
{
    let mut iterator = seeding.branch(seed.vertex);
    let mut members = vec![seed.vertex];
    let mut score = seed.score.get();
    let prunes = matches!(iterator.pruning(), PruningMode::Bounded { .. });

    while members.len() < result_size {
        if prunes && worst().is_some_and(|worst| score >= worst) {
            debug!(seed = ?seed.vertex, size = members.len(), score, "set abandoned");
            return (None, iterator.stats());
        }
        let Some(next) = iterator.next_entry() else {
            debug!(
                seed = ?seed.vertex,
                size = members.len(),
                timed_out = iterator.timed_out(),
                "set cannot be completed"
            );
            return (None, iterator.stats());
        };
        score += next.score.get();
        members.push(next.vertex);
        if members.len() < result_size {
            iterator.expand_set(next.vertex);
        }
    }
    debug!(members = ?members, score, "set completed");
    (Some(ScoredSet::new(members, score)), iterator.stats())
}

/// Greedy diversification: seeds `keep_top_k` singleton sets with the vertices most
/// relevant to the query, grows each one vertex at a time and keeps the best `keep_top_k`
/// complete sets.
pub fn diversify<V, G, S>(graph: &G, similarity: &S, request: &DiversifyRequest<V>) -> Result<DiversifyOutcome<V>>
where
    V: Vertex,
    G: DistanceOracle<V>,
    S: SimilarityOracle<V>,
{
    request.validate(graph)?;
    let pool = request.pool_set();
    let mut seeding = request.iterator(graph, similarity, pool.as_ref(), request.deadline());
    let seeds = seed(&mut seeding, request.keep_top_k);
    debug!(query = ?request.query, seeds = seeds.len(), "seeded");

    let mut heap = ResultHeap::new(request.keep_top_k);
    let mut stats = seeding.stats();
    for seed in seeds {
        let worst = || heap.is_full().then(|| heap.worst().map(|w| w.score.get())).flatten();
        let (set, set_stats) = grow(&seeding, seed, request.result_size, worst);
        stats = stats.merge(&set_stats);
        if let Some(set) = set {
            heap.insert(set);
        }
    }

    let outcome = DiversifyOutcome {
        sets: heap.into_iter().collect(),
        stats,
    };
    summarize(request, &outcome);
    Ok(outcome)
}

/// [`diversify`] with the seed sets grown on `threads` worker threads.
///
/// Workers pull seed indices from a shared counter; the result heap sits behind a mutex.
pub fn diversify_parallel<V, G, S>(
    graph: &G,
    similarity: &S,
    request: &DiversifyRequest<V>,
    threads: usize,
) -> Result<DiversifyOutcome<V>>
where
    V: Vertex,
    G: DistanceOracle<V> + Sync,
    S: SimilarityOracle<V> + Sync,
{
    request.validate(graph)?;
    let pool = request.pool_set();
    let mut seeding = request.iterator(graph, similarity, pool.as_ref(), request.deadline());
    let seeds = seed(&mut seeding, request.keep_top_k);
    debug!(query = ?request.query, seeds = seeds.len(), threads, "seeded");

    let heap = Mutex::new(ResultHeap::new(request.keep_top_k));
    let next_seed = AtomicUsize::new(0);
    let (heap_ref, next_seed, seeds, seeding_ref) = (&heap, &next_seed, &seeds, &seeding);

    let worker_stats: Vec<Stats> = thread::scope(|scope| {
        let handles: Vec<_> = (0..threads.max(1))
            .map(|_| {
                scope.spawn(move || {
                    let mut local_stats = Stats::new();
                    loop {
                        let index = next_seed.fetch_add(1, Ordering::Relaxed);
                        let Some(&seed) = seeds.get(index) else {
                            break;
                        };
                        let worst = || {
                            let heap = heap_ref.lock().unwrap_or_else(PoisonError::into_inner);
                            heap.is_full().then(|| heap.worst().map(|w| w.score.get())).flatten()
                        };
                        let (set, set_stats) = grow(seeding_ref, seed, request.result_size, worst);
                        local_stats = local_stats.merge(&set_stats);
                        if let Some(set) = set {
                            heap_ref.lock().unwrap_or_else(PoisonError::into_inner).insert(set);
                        }
                    }
                    local_stats
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().unwrap_or_else(|panic| std::panic::resume_unwind(panic)))
            .collect()
    });

    let stats = worker_stats
        .iter()
        .fold(seeding.stats(), |total, local| total.merge(local));
    let heap = heap.into_inner().unwrap_or_else(PoisonError::into_inner);
    let outcome = DiversifyOutcome {
        sets: heap.into_iter().collect(),
        stats,
    };
    summarize(request, &outcome);
    Ok(outcome)
}

fn summarize<V: Vertex>(request: &DiversifyRequest<V>, outcome: &DiversifyOutcome<V>) {
    info!(
        query = ?request.query,
        sets = outcome.sets.len(),
        best = outcome.best().map(|s| s.score.get()),
        settled = outcome.stats.get_vertices_settled(),
        emitted = outcome.stats.get_candidates_emitted(),
        timed_out = outcome.timed_out(),
        "diversification finished"
    );
}

#[cfg(test)]
mod tests {
    use rand::prelude::*;
    use rand_distr::Uniform;

    use super::*;
    use crate::{
        error::DivError,
        graph::{NoSimilarity, WeightedGraph},
        search::{Aggregation, Direction, ScoreParams, score_set},
    };

    // triangle 0-1-2 with pendants 3 (on 1), 4 (on 2) and 5 (on 0)
    fn triangle() -> WeightedGraph<u32> {
        WeightedGraph::from_undirected_edges([
            (0, 1, 1.0),
            (1, 2, 1.0),
            (0, 2, 2.0),
            (1, 3, 2.0),
            (2, 4, 1.0),
            (0, 5, 3.0),
        ])
        .unwrap()
    }

    // a path through every vertex plus random chords
    fn connected_graph(seed: u64, vertices: u32, chords: usize) -> WeightedGraph<u32> {
        let mut rng = StdRng::seed_from_u64(seed);
        let weights = Uniform::new_inclusive(1u32, 5).unwrap();
        let mut graph = WeightedGraph::new();
        for v in 1..vertices {
            graph.add_undirected_edge(v - 1, v, weights.sample(&mut rng) as f32).unwrap();
        }
        for _ in 0..chords {
            let a = rng.random_range(0..vertices);
            let b = rng.random_range(0..vertices);
            if a != b {
                graph.add_undirected_edge(a, b, weights.sample(&mut rng) as f32).unwrap();
            }
        }
        graph
    }

    fn brute_force_minimum(graph: &WeightedGraph<u32>, params: &ScoreParams, query: u32) -> f32 {
        let vertices: Vec<u32> = graph.vertices().filter(|&v| v != query).collect();
        let mut best = f32::INFINITY;
        for &a in &vertices {
            for &b in &vertices {
                if a != b {
                    let score = score_set(graph, &NoSimilarity, params, query, &[a, b]).unwrap();
                    best = best.min(score);
                }
            }
        }
        best
    }

    #[test]
    fn end_to_end_matches_brute_force() {
        let graph = triangle();
        let params = ScoreParams::new(0.5, 1.0, 1.0, Aggregation::Sum, Direction::Ordered);
        for pruning in [PruningMode::default(), PruningMode::Exhaustive] {
            let request = DiversifyRequest::new(0u32, 2, 1)
                .with_params(params)
                .with_pruning(pruning);

            let first = diversify(&graph, &NoSimilarity, &request).unwrap();
            let second = diversify(&graph, &NoSimilarity, &request).unwrap();
            assert_eq!(first.sets, second.sets);
            assert_eq!(first.sets.len(), 1);

            let best = first.best().unwrap();
            assert_eq!(best.members, vec![1, 5], "{pruning:?}");
            assert_eq!(best.score.get(), brute_force_minimum(&graph, &params, 0));
            assert_eq!(best.score.get(), 0.0);
        }
    }

    #[test]
    fn default_request_finds_the_triangle_optimum() {
        let graph = triangle();
        let outcome = diversify(&graph, &NoSimilarity, &DiversifyRequest::new(0u32, 2, 1)).unwrap();
        assert_eq!(outcome.best().unwrap().members, vec![1, 5]);
        assert_eq!(outcome.best().unwrap().score.get(), 0.0);
    }

    #[test]
    fn bounded_runs_are_deterministic_and_consistent() {
        let graph = connected_graph(21, 20, 25);
        let params = ScoreParams::new(0.6, 1.0, 1.0, Aggregation::Max, Direction::Ordered);
        let request = DiversifyRequest::new(0u32, 3, 4).with_params(params);
        let first = diversify(&graph, &NoSimilarity, &request).unwrap();
        let second = diversify(&graph, &NoSimilarity, &request).unwrap();
        assert_eq!(first.sets, second.sets);
        for set in &first.sets {
            let direct = score_set(&graph, &NoSimilarity, &params, 0, &set.members).unwrap();
            assert!((direct - set.score.get()).abs() < 1e-4);
        }
    }

    #[test]
    fn result_heap_respects_its_bounds() {
        let graph = connected_graph(4, 18, 20);
        for pruning in [PruningMode::Exhaustive, PruningMode::default()] {
            let request = DiversifyRequest::new(3u32, 4, 3).with_pruning(pruning);
            let outcome = diversify(&graph, &NoSimilarity, &request).unwrap();
            assert!(!outcome.sets.is_empty());
            assert!(outcome.sets.len() <= 3);
            for set in &outcome.sets {
                assert_eq!(set.len(), 4);
                assert!(!set.members.contains(&3));
                let mut distinct = set.members.clone();
                distinct.sort();
                distinct.dedup();
                assert_eq!(distinct.len(), 4);
            }
            assert!(outcome.sets.windows(2).all(|w| w[0] <= w[1]));
        }
    }

    #[test]
    fn pool_limits_every_member() {
        let graph = connected_graph(9, 16, 20);
        let pool = [2u32, 5, 7, 11, 13];
        let request = DiversifyRequest::new(0u32, 2, 2).with_pool(pool);
        let outcome = diversify(&graph, &NoSimilarity, &request).unwrap();
        for set in &outcome.sets {
            assert!(set.members.iter().all(|v| pool.contains(v)));
        }
    }

    #[test]
    fn parallel_matches_sequential_when_exhaustive() {
        let graph = connected_graph(13, 24, 30);
        let params = ScoreParams::new(0.7, 1.0, 1.0, Aggregation::Sum, Direction::Symmetric);
        let request = DiversifyRequest::new(5u32, 3, 5)
            .with_params(params)
            .with_pruning(PruningMode::Exhaustive);
        let sequential = diversify(&graph, &NoSimilarity, &request).unwrap();
        let parallel = diversify_parallel(&graph, &NoSimilarity, &request, 4).unwrap();
        assert_eq!(sequential.sets, parallel.sets);
        assert_eq!(
            sequential.stats.get_candidates_emitted(),
            parallel.stats.get_candidates_emitted()
        );
    }

    #[test]
    fn unreachable_sets_are_dropped() {
        // 0 - 1 and an isolated 2: no set of size 2 exists
        let mut graph = WeightedGraph::from_undirected_edges([(0u32, 1, 1.0)]).unwrap();
        graph.add_vertex(2);
        let outcome = diversify(&graph, &NoSimilarity, &DiversifyRequest::new(0u32, 2, 2)).unwrap();
        assert!(outcome.sets.is_empty());
    }

    #[test]
    fn expired_deadline_returns_no_sets() {
        let graph = triangle();
        let request = DiversifyRequest::new(0u32, 2, 1).with_timeout_ms(Some(0));
        let outcome = diversify(&graph, &NoSimilarity, &request).unwrap();
        assert!(outcome.sets.is_empty());
        assert!(outcome.timed_out());
    }

    #[test]
    fn invalid_requests_fail_before_searching() {
        let graph = triangle();
        assert!(matches!(
            diversify(&graph, &NoSimilarity, &DiversifyRequest::new(0u32, 0, 1)),
            Err(DivError::InvalidConfig { .. })
        ));
        assert!(matches!(
            diversify_parallel(&graph, &NoSimilarity, &DiversifyRequest::new(77u32, 2, 1), 2),
            Err(DivError::UnknownVertex(_))
        ));
    }
}

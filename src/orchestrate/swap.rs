use std::time::Instant;

use hashbrown::HashMap;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::{
    error::Result,
    graph::{DistanceOracle, SimilarityOracle, Vertex},
    orchestrate::{RefineRequest, ResultHeap, ScoredSet},
    search::{DiversityIterator, ScoreParams, score_set},
    sets::{candidates::CandidateEntry, lineage::Lineage},
    statistics::Stats,
};

/// Outcome of swap refinement.
#[derive(Debug, Clone, Serialize)]
pub struct RefineOutcome<V> {
    /// Best kept sets, best first. Seeds are part of the population, so the first entry
    /// never scores worse than the best seed.
    pub sets: Vec<ScoredSet<V>>,
    pub rounds: usize,
    pub accepted_swaps: usize,
    pub stats: Stats,
}

impl<V: Vertex> RefineOutcome<V> {
    pub fn best(&self) -> Option<&ScoredSet<V>> {
        self.sets.first()
    }
}

/// Memoized [`score_set`] keyed by the ordered member list.
pub struct SetScores<'a, V: Vertex, G, S> {
    graph: &'a G,
    similarity: &'a S,
    params: ScoreParams,
    query: V,
    scores: HashMap<Vec<V>, Option<f32>>,
}

impl<'a, V, G, S> SetScores<'a, V, G, S>
where
    V: Vertex,
    G: DistanceOracle<V>,
    S: SimilarityOracle<V>,
{
    pub fn new(graph: &'a G, similarity: &'a S, params: ScoreParams, query: V) -> Self {
        SetScores {
            graph,
            similarity,
            params,
            query,
            scores: HashMap::new(),
        }
    }

    pub fn score(&mut self, members: &[V]) -> Option<f32> {
        if let Some(&score) = self.scores.get(members) {
            return score;
        }
        let score = score_set(self.graph, self.similarity, &self.params, self.query, members);
        self.scores.insert(members.to_vec(), score);
        score
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }
}

/// A set under refinement, with the iterator over its members and how it was derived.
struct Derived<'a, V: Vertex, G, S> {
    members: Vec<V>,
    score: f32,
    iterator: DiversityIterator<'a, V, G, S>,
    lineage: Lineage<V>,
}

/// Local search over the seed sets: every member of every set is tentatively replaced by
/// the best vertex an iterator over the remaining members offers, and the swap is kept when
/// it improves the set and enters the result heap. Accepted sets are refined again in the
/// next round, until no swap is accepted, `max_rounds` is reached or the deadline passes.
///
/// Swaps that undo or repeat a substitution in a set's lineage are skipped; this bounds
/// obvious cycles, not every cycle.
pub fn refine<V, G, S>(graph: &G, similarity: &S, request: &RefineRequest<V>) -> Result<RefineOutcome<V>>
where
    V: Vertex,
    G: DistanceOracle<V>,
    S: SimilarityOracle<V>,
{
    request.validate(graph)?;
    let base = &request.base;
    let pool = base.pool_set();
    let deadline = base.deadline();
    let empty = base.iterator(graph, similarity, pool.as_ref(), deadline);
    let mut set_scores = SetScores::new(graph, similarity, base.params, base.query);
    let mut heap = ResultHeap::new(base.keep_top_k);
    let mut stats = Stats::new();

    let mut population = Vec::with_capacity(request.seeds.len());
    for seed in &request.seeds {
        let Some(score) = set_scores.score(seed) else {
            debug!(seed = ?seed, "seed is not reachable, skipped");
            continue;
        };
        heap.insert(ScoredSet::new(seed.clone(), score));
        population.push(Derived {
            members: seed.clone(),
            score,
            iterator: empty.clone().with_members(seed),
            lineage: Lineage::new(),
        });
    }

    let mut rounds = 0;
    let mut accepted_swaps = 0;
    while !population.is_empty() && rounds < request.max_rounds {
        if deadline.is_some_and(|d| Instant::now() >= d) {
            warn!(query = ?base.query, rounds, "swap refinement timed out");
            stats.bump_timeouts();
            break;
        }
        rounds += 1;
        let mut next_population = vec![];
        for current in &population {
            for &removed in &current.members {
                let mut reduced = current.iterator.without_member(removed);
                let substitute = std::iter::from_fn(|| reduced.next_entry()).find(|e| e.vertex != removed);
                stats = stats.merge(&reduced.stats());
                let Some(CandidateEntry { vertex: substitute, score: gain }) = substitute else {
                    continue;
                };
                if current.lineage.repeats(removed, substitute) {
                    debug!(removed = ?removed, substitute = ?substitute, "swap repeats its lineage");
                    continue;
                }

                // the substitute is appended last, so the new score is the remaining set's
                // score plus the substitute's emitted score against it
                let mut members: Vec<V> = current.members.iter().copied().filter(|&m| m != removed).collect();
                let Some(remaining) = set_scores.score(&members) else {
                    continue;
                };
                members.push(substitute);
                let score = remaining + gain.get();
                if score < current.score && heap.insert(ScoredSet::new(members.clone(), score)) {
                    debug!(members = ?members, score, from = current.score, "swap accepted");
                    accepted_swaps += 1;
                    next_population.push(Derived {
                        members,
                        score,
                        iterator: current.iterator.replace_set_return(removed, substitute),
                        lineage: current.lineage.record(removed, substitute),
                    });
                } else {
                    debug!(members = ?members, score, from = current.score, "swap rejected");
                }
            }
        }
        population = next_population;
    }

    let outcome = RefineOutcome {
        sets: heap.into_iter().collect(),
        rounds,
        accepted_swaps,
        stats,
    };
    info!(
        query = ?base.query,
        best = outcome.best().map(|s| s.score.get()),
        rounds,
        accepted_swaps,
        scored_sets = set_scores.len(),
        "swap refinement finished"
    );
    Ok(outcome)
}

use std::{cmp::Reverse, collections::BinaryHeap};

use hashbrown::HashSet;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    error::{DivError, Result},
    graph::{DistanceOracle, Vertex},
    search::{advance_cheapest, Aggregation, Direction, SourceSearch},
    sets::candidates::CandidateEntry,
    statistics::Stats,
};

/// A traveller and the importance of its travel cost.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Party<V> {
    pub vertex: V,
    pub weight: f32,
}

impl<V> Party<V> {
    pub fn new(vertex: V, weight: f32) -> Self {
        Party { vertex, weight }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MeetingPoint<V> {
    pub vertex: V,
    pub cost: f32,
    pub stats: Stats,
}

/// `Σ w_i·d_i` (Sum) or `max_i w_i·d_i` (Max). Zero weights ignore their distance.
fn travel_cost(aggregation: Aggregation, terms: impl IntoIterator<Item = (f32, f32)>) -> f32 {
    let weighted = terms
        .into_iter()
        .map(|(weight, distance)| if weight == 0.0 { 0.0 } else { weight * distance });
    match aggregation {
        Aggregation::Sum => weighted.sum(),
        Aggregation::Max => weighted.fold(0.0, f32::max),
    }
}

/// Finds the vertex minimizing the aggregate weighted travel cost of every party.
///
/// One search runs per party and the searches are advanced in global cost order. The best
/// complete vertex is returned as soon as its cost is below the cost of every other vertex
/// with each missing distance replaced by the corresponding frontier minimum. Ties go to the
/// smallest vertex.
///
/// # Returns
/// `Ok(None)` if no vertex of `pool` is reachable from every party.
pub fn optimal_meeting_point<V, G>(
    graph: &G,
    parties: &[Party<V>],
    aggregation: Aggregation,
    direction: Direction,
    pool: Option<&HashSet<V>>,
) -> Result<Option<MeetingPoint<V>>>
where
    V: Vertex,
    G: DistanceOracle<V>,
{
    if parties.is_empty() {
        return Err(DivError::invalid_config("at least one party is required"));
    }
    for party in parties {
        if !graph.contains_node(party.vertex) {
            return Err(DivError::unknown_vertex(party.vertex));
        }
        if !(party.weight >= 0.0 && party.weight.is_finite()) {
            return Err(DivError::invalid_config(format!(
                "party {:?} has invalid weight {}",
                party.vertex, party.weight
            )));
        }
    }

    let weights: Vec<f32> = parties.iter().map(|p| p.weight).collect();
    let mut searches: Vec<SourceSearch<V>> = parties
        .iter()
        .map(|p| SourceSearch::new(graph, p.vertex, direction))
        .collect();
    let mut stats = Stats::new();
    let mut partial: HashSet<V> = HashSet::new();
    let mut complete: BinaryHeap<Reverse<CandidateEntry<V>>> = BinaryHeap::new();
    let eligible = |v: V| pool.is_none_or(|p| p.contains(&v));

    // origins are settled on construction
    let mut fresh: Vec<V> = parties.iter().map(|p| p.vertex).collect();
    fresh.sort();
    fresh.dedup();

    loop {
        for vertex in fresh.drain(..) {
            if !searches.iter().all(|s| s.distance(vertex).is_some()) {
                partial.insert(vertex);
                continue;
            }
            partial.remove(&vertex);
            if eligible(vertex) {
                let cost = travel_cost(
                    aggregation,
                    weights
                        .iter()
                        .zip(&searches)
                        .map(|(&w, s)| (w, s.distance(vertex).unwrap_or(f32::INFINITY))),
                );
                complete.push(Reverse(CandidateEntry::new(vertex, cost)));
            }
        }

        if let Some(&Reverse(best)) = complete.peek() {
            stats.bump_bound_evaluations();
            let unseen = travel_cost(
                aggregation,
                weights
                    .iter()
                    .zip(&searches)
                    .map(|(&w, s)| (w, s.unsettled_lower_bound())),
            );
            let bound = partial
                .iter()
                .filter(|&&v| eligible(v) && !searches.iter().any(|s| s.never_reaches(v)))
                .map(|&v| {
                    travel_cost(
                        aggregation,
                        weights
                            .iter()
                            .zip(&searches)
                            .map(|(&w, s)| (w, s.distance_lower_bound(v))),
                    )
                })
                .fold(unseen, f32::min);
            if best.score.get() < bound || searches.iter().all(SourceSearch::is_exhausted) {
                stats.observe_live_entries(
                    searches.iter().map(SourceSearch::live_entries).sum::<usize>() + partial.len(),
                );
                debug!(vertex = ?best.vertex, cost = best.score.get(), "meeting point found");
                return Ok(Some(MeetingPoint {
                    vertex: best.vertex,
                    cost: best.score.get(),
                    stats,
                }));
            }
        }

        match advance_cheapest(graph, &mut searches) {
            Some((_, settled)) => {
                stats.bump_settled();
                fresh.push(settled.vertex);
            }
            None if complete.is_empty() => return Ok(None),
            // exhausted: the next iteration returns the best complete vertex
            None => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::WeightedGraph;

    // undirected path 0 - 1 - 2 - 3 - 4 with a shortcut 0 - 4 of weight 10
    fn graph() -> WeightedGraph<u32> {
        WeightedGraph::from_undirected_edges([(0, 1, 1.0), (1, 2, 1.0), (2, 3, 1.0), (3, 4, 1.0), (0, 4, 10.0)])
            .unwrap()
    }

    fn brute_force(graph: &WeightedGraph<u32>, parties: &[Party<u32>], aggregation: Aggregation) -> (u32, f32) {
        let mut best = CandidateEntry::new(u32::MAX, f32::INFINITY);
        for v in graph.vertices() {
            let cost = travel_cost(
                aggregation,
                parties
                    .iter()
                    .map(|p| (p.weight, graph.path_cost(p.vertex, v).unwrap_or(f32::INFINITY))),
            );
            best = best.min(CandidateEntry::new(v, cost));
        }
        (best.vertex, best.score.get())
    }

    #[test]
    fn sum_meets_in_the_middle() {
        let graph = graph();
        let parties = [Party::new(0, 1.0), Party::new(4, 1.0)];
        let point = optimal_meeting_point(&graph, &parties, Aggregation::Sum, Direction::Ordered, None)
            .unwrap()
            .unwrap();
        // every vertex of the path costs 4; the smallest wins
        assert_eq!((point.vertex, point.cost), (0, 4.0));
    }

    #[test]
    fn max_balances_travel() {
        let graph = graph();
        let parties = [Party::new(0, 1.0), Party::new(4, 1.0)];
        let point = optimal_meeting_point(&graph, &parties, Aggregation::Max, Direction::Ordered, None)
            .unwrap()
            .unwrap();
        assert_eq!((point.vertex, point.cost), (2, 2.0));
    }

    #[test]
    fn weights_pull_towards_important_parties() {
        let graph = graph();
        let parties = [Party::new(0, 3.0), Party::new(4, 1.0), Party::new(2, 1.0)];
        for aggregation in [Aggregation::Sum, Aggregation::Max] {
            let point = optimal_meeting_point(&graph, &parties, aggregation, Direction::Ordered, None)
                .unwrap()
                .unwrap();
            assert_eq!((point.vertex, point.cost), brute_force(&graph, &parties, aggregation));
        }
    }

    #[test]
    fn pool_limits_the_meeting_points() {
        let graph = graph();
        let parties = [Party::new(0, 1.0), Party::new(4, 1.0)];
        let pool: HashSet<u32> = [3].into_iter().collect();
        let point = optimal_meeting_point(&graph, &parties, Aggregation::Max, Direction::Ordered, Some(&pool))
            .unwrap()
            .unwrap();
        assert_eq!((point.vertex, point.cost), (3, 3.0));
    }

    #[test]
    fn unreachable_parties_have_no_meeting_point() {
        let mut graph = WeightedGraph::from_edges([(0u32, 1, 1.0)]).unwrap();
        graph.add_vertex(7);
        let parties = [Party::new(0, 1.0), Party::new(7, 1.0)];
        let point = optimal_meeting_point(&graph, &parties, Aggregation::Sum, Direction::Symmetric, None).unwrap();
        assert!(point.is_none());
    }

    #[test]
    fn rejects_bad_parties() {
        let graph = graph();
        assert!(matches!(
            optimal_meeting_point(&graph, &[], Aggregation::Sum, Direction::Ordered, None),
            Err(DivError::InvalidConfig { .. })
        ));
        assert!(matches!(
            optimal_meeting_point(&graph, &[Party::new(9, 1.0)], Aggregation::Sum, Direction::Ordered, None),
            Err(DivError::UnknownVertex(_))
        ));
        assert!(optimal_meeting_point(&graph, &[Party::new(1, -1.0)], Aggregation::Sum, Direction::Ordered, None).is_err());
    }
}

use std::str::FromStr;

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::{
    error::{DivError, Result},
    graph::{DistanceOracle, SimilarityOracle, Vertex},
    search::SourceSearch,
};

/// How the per-member dissimilarities of a candidate are combined into its diversity term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggregation {
    /// Mean over the set members.
    #[default]
    Sum,
    /// Minimum over the set members (the closest member dominates).
    Max,
}

/// Which path cost is used as the distance between two vertices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Directed cost from the query (or member) to the candidate.
    #[default]
    Ordered,
    /// Mean of both directed costs, `(d(u,v) + d(v,u)) / 2`.
    Symmetric,
}

impl Direction {
    /// Whether frontiers must also be run over incoming edges.
    pub fn needs_backward(self) -> bool {
        self == Direction::Symmetric
    }

    /// Combines the forward cost `d(u,v)` and backward cost `d(v,u)`.
    #[inline]
    pub fn combine(self, forward: f32, backward: f32) -> f32 {
        match self {
            Direction::Ordered => forward,
            Direction::Symmetric => (forward + backward) / 2.0,
        }
    }

    /// Distance between two vertices as seen by this policy, `None` if unreachable.
    #[cfg(test)]
    pub(crate) fn path_cost<V: Vertex, G: DistanceOracle<V>>(self, graph: &G, from: V, to: V) -> Option<f32> {
        let forward = graph.path_cost(from, to)?;
        match self {
            Direction::Ordered => Some(forward),
            Direction::Symmetric => Some(self.combine(forward, graph.path_cost(to, from)?)),
        }
    }
}

impl FromStr for Aggregation {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sum" | "minsum" => Ok(Aggregation::Sum),
            "max" | "minmax" => Ok(Aggregation::Max),
            other => Err(format!("unknown aggregation '{other}', expected sum or max")),
        }
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ordered" => Ok(Direction::Ordered),
            "symmetric" => Ok(Direction::Symmetric),
            other => Err(format!(
                "unknown direction '{other}', expected ordered or symmetric"
            )),
        }
    }
}

/// `weight * value`, treating a zero weight as absorbing so that infinite values
/// switched off by their weight do not turn into NaN.
#[inline]
fn weighted(weight: f32, value: f32) -> f32 {
    if weight == 0.0 { 0.0 } else { weight * value }
}

/// Parameters of the vertex score
///
/// ```text
/// relevance(v)   = α·d(q,v) + (1-α)·(1-sim(q,v))
/// diversity(v,S) = agg_{s∈S} β·d(s,v) + (1-β)·(1-sim(s,v))
/// score(v,S)     = λ·relevance(v) - (1-λ)·diversity(v,S)
/// ```
///
/// Lower scores are better. An empty set has diversity 0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreParams {
    /// Weight of relevance against diversity.
    pub lambda: f32,
    /// Weight of path cost against similarity inside the relevance term.
    pub alpha: f32,
    /// Weight of path cost against similarity inside the diversity term.
    pub beta: f32,
    #[serde(default)]
    pub aggregation: Aggregation,
    #[serde(default)]
    pub direction: Direction,
}

impl ScoreParams {
    pub fn new(lambda: f32, alpha: f32, beta: f32, aggregation: Aggregation, direction: Direction) -> Self {
        ScoreParams {
            lambda,
            alpha,
            beta,
            aggregation,
            direction,
        }
    }

    pub fn validate(&self) -> Result<()> {
        for (name, value) in [("lambda", self.lambda), ("alpha", self.alpha), ("beta", self.beta)] {
            if !(0.0..=1.0).contains(&value) {
                return Err(DivError::invalid_config(format!(
                    "{name} must lie in [0, 1], got {value}"
                )));
            }
        }
        Ok(())
    }

    #[inline]
    pub fn relevance(&self, distance: f32, similarity: f32) -> f32 {
        weighted(self.alpha, distance) + weighted(1.0 - self.alpha, 1.0 - similarity)
    }

    #[inline]
    pub fn dissimilarity(&self, distance: f32, similarity: f32) -> f32 {
        weighted(self.beta, distance) + weighted(1.0 - self.beta, 1.0 - similarity)
    }

    /// Mean (`Sum`) or minimum (`Max`) of the per-member terms; 0 for an empty set.
    pub fn aggregate(&self, terms: impl IntoIterator<Item = f32>) -> f32 {
        let mut count = 0usize;
        let mut total = 0.0f32;
        let mut smallest = f32::INFINITY;
        for term in terms {
            count += 1;
            total += term;
            smallest = smallest.min(term);
        }
        if count == 0 {
            return 0.0;
        }
        match self.aggregation {
            Aggregation::Sum => total / count as f32,
            Aggregation::Max => smallest,
        }
    }

    #[inline]
    pub fn combine(&self, relevance: f32, diversity: f32) -> f32 {
        weighted(self.lambda, relevance) - weighted(1.0 - self.lambda, diversity)
    }

    /// Score of a vertex from its query distance/similarity and its `(distance, similarity)`
    /// pair towards every set member.
    pub fn vertex_score(
        &self,
        query_distance: f32,
        query_similarity: f32,
        members: impl IntoIterator<Item = (f32, f32)>,
    ) -> f32 {
        let relevance = self.relevance(query_distance, query_similarity);
        let diversity = self.aggregate(
            members
                .into_iter()
                .map(|(distance, similarity)| self.dissimilarity(distance, similarity)),
        );
        self.combine(relevance, diversity)
    }

    /// Largest `c` such that `score >= c·d(q,v) + constant` for every vertex, used to bound
    /// vertices whose query distance is not known yet (see the pruner).
    #[inline]
    pub fn distance_slope(&self) -> f32 {
        self.lambda * self.alpha - (1.0 - self.lambda) * self.beta
    }
}

impl Default for ScoreParams {
    fn default() -> Self {
        ScoreParams::new(0.5, 1.0, 1.0, Aggregation::Sum, Direction::Ordered)
    }
}

/// Score of an ordered candidate set computed directly from the collaborators:
/// the sum of the incremental vertex scores in insertion order,
/// `Σ_i score(s_i, {s_1..s_{i-1}})`.
///
/// Runs one search from the query and one from each member, each stopped as soon as it
/// settled the members it needs.
///
/// # Returns
/// `None` if some member is unreachable from the query or from an earlier member.
pub fn score_set<V, G, S>(graph: &G, similarity: &S, params: &ScoreParams, query: V, members: &[V]) -> Option<f32>
where
    V: Vertex,
    G: DistanceOracle<V>,
    S: SimilarityOracle<V>,
{
    let from_query = distances_to(graph, params.direction, query, members)?;
    // from_members[j][i] is the distance from members[j] to members[j + 1 + i]
    let from_members = members
        .iter()
        .enumerate()
        .map(|(j, &member)| distances_to(graph, params.direction, member, &members[j + 1..]))
        .collect::<Option<Vec<_>>>()?;

    let mut total = 0.0;
    for (i, &vertex) in members.iter().enumerate() {
        let member_terms = members[..i].iter().enumerate().map(|(j, &earlier)| {
            (from_members[j][i - j - 1], similarity.similarity(earlier, vertex))
        });
        total += params.vertex_score(from_query[i], similarity.similarity(query, vertex), member_terms);
    }
    Some(total)
}

/// Distances from `source` to every target, advancing a single search until all are settled.
fn distances_to<V: Vertex, G: DistanceOracle<V>>(
    graph: &G,
    direction: Direction,
    source: V,
    targets: &[V],
) -> Option<Vec<f32>> {
    let mut search = SourceSearch::new(graph, source, direction);
    while targets.iter().any(|&target| search.distance(target).is_none()) {
        let (leg, _) = search.cheapest_leg()?;
        search.frontier_mut(leg)?.advance(graph);
    }
    targets.iter().map(|&target| search.distance(target)).collect()
}

/// Memoized vertex scores for the current candidate set.
///
/// A score is only valid for the set it was computed against; the owner must call
/// [`ScoreCache::invalidate`] whenever the set mutates.
#[derive(Debug, Clone)]
pub struct ScoreCache<V: Vertex> {
    scores: HashMap<V, f32>,
    hits: usize,
}

impl<V: Vertex> ScoreCache<V> {
    pub fn new() -> Self {
        ScoreCache {
            scores: HashMap::new(),
            hits: 0,
        }
    }

    pub fn get_or_compute(&mut self, vertex: V, compute: impl FnOnce() -> f32) -> f32 {
        if let Some(&score) = self.scores.get(&vertex) {
            self.hits += 1;
            return score;
        }
        let score = compute();
        self.scores.insert(vertex, score);
        score
    }

    pub fn invalidate(&mut self) {
        self.scores.clear();
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    pub fn hits(&self) -> usize {
        self.hits
    }
}

impl<V: Vertex> Default for ScoreCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

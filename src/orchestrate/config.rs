use std::time::{Duration, Instant};

use hashbrown::HashSet;
use serde::{Deserialize, Serialize};

use crate::{
    error::{DivError, Result},
    graph::{DistanceOracle, SimilarityOracle, Vertex},
    search::{DiversityIterator, PruningMode, ScoreParams},
};

/// Default cap on swap refinement rounds.
pub const DEFAULT_MAX_ROUNDS: usize = 32;

fn default_max_rounds() -> usize {
    DEFAULT_MAX_ROUNDS
}

/// Parameters of a greedy diversification run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(deserialize = "V: Deserialize<'de>"))]
pub struct DiversifyRequest<V> {
    pub query: V,
    /// Eligible vertices; `None` makes every vertex of the graph eligible.
    #[serde(default)]
    pub pool: Option<Vec<V>>,
    /// Number of vertices per result set (`n`).
    pub result_size: usize,
    /// Number of seeds and of result sets kept (`k`).
    pub keep_top_k: usize,
    #[serde(default)]
    pub params: ScoreParams,
    #[serde(default)]
    pub pruning: PruningMode,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

/// Parameters of a swap refinement run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(deserialize = "V: Deserialize<'de>"))]
pub struct RefineRequest<V> {
    #[serde(flatten)]
    pub base: DiversifyRequest<V>,
    /// Initial population; every seed holds exactly `result_size` vertices.
    pub seeds: Vec<Vec<V>>,
    #[serde(default = "default_max_rounds")]
    pub max_rounds: usize,
}

impl<V: Vertex> DiversifyRequest<V> {
    pub fn new(query: V, result_size: usize, keep_top_k: usize) -> Self {
        DiversifyRequest {
            query,
            pool: None,
            result_size,
            keep_top_k,
            params: ScoreParams::default(),
            pruning: PruningMode::default(),
            timeout_ms: None,
        }
    }

    pub fn with_pool(mut self, pool: impl IntoIterator<Item = V>) -> Self {
        self.pool = Some(pool.into_iter().collect());
        self
    }

    pub fn with_params(mut self, params: ScoreParams) -> Self {
        self.params = params;
        self
    }

    pub fn with_pruning(mut self, pruning: PruningMode) -> Self {
        self.pruning = pruning;
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: Option<u64>) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Fails fast on anything that would make the search meaningless.
    pub fn validate<G: DistanceOracle<V>>(&self, graph: &G) -> Result<()> {
        self.params.validate()?;
        if !graph.contains_node(self.query) {
            return Err(DivError::unknown_vertex(self.query));
        }
        if self.result_size == 0 {
            return Err(DivError::invalid_config("result size must be positive"));
        }
        if self.keep_top_k == 0 {
            return Err(DivError::invalid_config("keep-top-k must be positive"));
        }
        if let PruningMode::Bounded { prefix: 0 } = self.pruning {
            return Err(DivError::invalid_config("bounded pruning needs a positive prefix"));
        }
        if let Some(pool) = &self.pool {
            if pool.is_empty() {
                return Err(DivError::invalid_config("candidate pool is empty"));
            }
            if let Some(&missing) = pool.iter().find(|&&v| !graph.contains_node(v)) {
                return Err(DivError::unknown_vertex(missing));
            }
        }
        Ok(())
    }

    pub fn pool_set(&self) -> Option<HashSet<V>> {
        self.pool.as_ref().map(|pool| pool.iter().copied().collect())
    }

    /// Absolute deadline for a run starting now.
    pub fn deadline(&self) -> Option<Instant> {
        self.timeout_ms
            .map(|ms| Instant::now() + Duration::from_millis(ms))
    }

    /// Iterator over an empty set configured by this request.
    pub(crate) fn iterator<'a, G, S>(
        &self,
        graph: &'a G,
        similarity: &'a S,
        pool: Option<&'a HashSet<V>>,
        deadline: Option<Instant>,
    ) -> DiversityIterator<'a, V, G, S>
    where
        G: DistanceOracle<V>,
        S: SimilarityOracle<V>,
    {
        DiversityIterator::new(graph, similarity, self.query, self.params)
            .with_pruning(self.pruning)
            .with_pool(pool)
            .with_deadline(deadline)
    }
}

impl<V: Vertex> RefineRequest<V> {
    pub fn new(base: DiversifyRequest<V>, seeds: Vec<Vec<V>>) -> Self {
        RefineRequest {
            base,
            seeds,
            max_rounds: DEFAULT_MAX_ROUNDS,
        }
    }

    pub fn with_max_rounds(mut self, max_rounds: usize) -> Self {
        self.max_rounds = max_rounds;
        self
    }

    pub fn validate<G: DistanceOracle<V>>(&self, graph: &G) -> Result<()> {
        self.base.validate(graph)?;
        if self.seeds.is_empty() {
            return Err(DivError::invalid_config("at least one seed set is required"));
        }
        for seed in &self.seeds {
            if seed.len() != self.base.result_size {
                return Err(DivError::invalid_config(format!(
                    "seed {seed:?} has {} vertices, expected {}",
                    seed.len(),
                    self.base.result_size
                )));
            }
            if seed.contains(&self.base.query) {
                return Err(DivError::invalid_config(format!(
                    "seed {seed:?} contains the query"
                )));
            }
            let distinct: HashSet<V> = seed.iter().copied().collect();
            if distinct.len() != seed.len() {
                return Err(DivError::invalid_config(format!(
                    "seed {seed:?} contains duplicates"
                )));
            }
            if let Some(&missing) = seed.iter().find(|&&v| !graph.contains_node(v)) {
                return Err(DivError::unknown_vertex(missing));
            }
        }
        Ok(())
    }
}

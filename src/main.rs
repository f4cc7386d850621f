use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use divgraph::{
    Result,
    error::DivError,
    fs::{load_edge_list, load_embeddings, load_queries, load_similarity_table, load_vertex_lists},
    graph::{DistanceOracle, EmbeddingSimilarity, NoSimilarity, SimilarityOracle, SimilarityTable, WeightedGraph},
    orchestrate::{DiversifyRequest, RefineRequest, diversify, diversify_parallel, refine},
    search::{Aggregation, Direction, Party, PruningMode, ScoreParams, optimal_meeting_point},
};
use hashbrown::HashSet;
use serde::{Deserialize, Serialize};
use tqdm::tqdm;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

type Vertex = u32;

/// Diversified result sets and meeting points over weighted graphs
#[derive(Parser, Debug)]
#[command(name = "divgraph")]
#[command(about = "Diversified result sets and meeting points over weighted graphs", long_about = None)]
struct Cli {
    #[command(flatten)]
    graph: GraphArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Greedy diversification from the query's nearest neighbours
    Diversify(SearchArgs),
    /// Swap refinement of given seed sets
    Refine {
        #[command(flatten)]
        search: SearchArgs,

        /// File with one seed set per line
        #[arg(long)]
        seeds: PathBuf,

        /// Maximum number of refinement rounds
        #[arg(long)]
        max_rounds: Option<usize>,
    },
    /// Optimal meeting point of several parties
    Meet(MeetArgs),
}

#[derive(Args, Debug)]
struct GraphArgs {
    /// Path to the edge list (`from to [weight]` per line)
    #[arg(short, long, global = true)]
    graph: Option<PathBuf>,

    /// Mirror every edge of the list
    #[arg(long, global = true)]
    undirected: bool,

    /// Path to a similarity table (`u v similarity` per line)
    #[arg(long, global = true, conflicts_with = "embeddings")]
    similarities: Option<PathBuf>,

    /// Similarity of pairs missing from the table
    #[arg(long, global = true, default_value_t = 0.0)]
    default_similarity: f32,

    /// Path to vertex embeddings (`vertex x_1 .. x_d` per line), compared by cosine
    #[arg(long, global = true)]
    embeddings: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct SearchArgs {
    /// Query vertex
    #[arg(short, long, required_unless_present = "queries")]
    query: Option<Vertex>,

    /// File with one query vertex per line, run as a batch
    #[arg(long)]
    queries: Option<PathBuf>,

    /// File listing the candidate pool (whitespace separated vertices)
    #[arg(long)]
    pool: Option<PathBuf>,

    /// JSON parameter file, applied before the flags below
    #[arg(long)]
    config: Option<PathBuf>,

    /// Vertices per result set
    #[arg(short = 'n', long)]
    result_size: Option<usize>,

    /// Number of seeds and of result sets kept
    #[arg(short = 'k', long)]
    keep_top_k: Option<usize>,

    /// Weight of relevance against diversity
    #[arg(long)]
    lambda: Option<f32>,

    /// Weight of path cost against similarity for relevance
    #[arg(long)]
    alpha: Option<f32>,

    /// Weight of path cost against similarity for diversity
    #[arg(long)]
    beta: Option<f32>,

    /// Diversity aggregation: sum (mean over members) or max (closest member)
    #[arg(long)]
    aggregation: Option<Aggregation>,

    /// Distance policy: ordered or symmetric
    #[arg(long)]
    direction: Option<Direction>,

    /// Emit candidates in exact score order
    #[arg(long, conflicts_with = "prefix")]
    exhaustive: bool,

    /// Number of partial candidates examined by the bounded pruner
    #[arg(long)]
    prefix: Option<usize>,

    /// Per-query time budget in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Number of worker threads growing seed sets
    #[arg(short, long)]
    threads: Option<usize>,
}

#[derive(Args, Debug)]
struct MeetArgs {
    /// A party as `vertex` or `vertex:weight`; repeat for every party
    #[arg(short, long = "party", required = true, value_parser = parse_party)]
    parties: Vec<Party<Vertex>>,

    /// Travel cost aggregation: sum or max
    #[arg(long, default_value = "sum")]
    aggregation: Aggregation,

    /// Distance policy: ordered or symmetric
    #[arg(long, default_value = "ordered")]
    direction: Direction,

    /// File listing the admissible meeting points
    #[arg(long)]
    pool: Option<PathBuf>,
}

/// Parameters that can be read from the `--config` file. Flags override them.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ParamFile {
    result_size: Option<usize>,
    keep_top_k: Option<usize>,
    params: Option<ScoreParams>,
    pruning: Option<PruningMode>,
    timeout_ms: Option<u64>,
    max_rounds: Option<usize>,
    threads: Option<usize>,
}

const DEFAULT_RESULT_SIZE: usize = 5;
const DEFAULT_KEEP_TOP_K: usize = 10;

#[derive(Serialize)]
struct Report<T> {
    query: Vertex,
    #[serde(flatten)]
    outcome: T,
}

fn parse_party(s: &str) -> std::result::Result<Party<Vertex>, String> {
    let (vertex, weight) = match s.split_once(':') {
        Some((vertex, weight)) => (vertex, weight.parse().map_err(|_| format!("invalid weight in '{s}'"))?),
        None => (s, 1.0),
    };
    let vertex = vertex.parse().map_err(|_| format!("invalid vertex in '{s}'"))?;
    Ok(Party::new(vertex, weight))
}

/// The similarity backend selected on the command line.
enum Similarity {
    Structural(NoSimilarity),
    Table(SimilarityTable<Vertex>),
    Embedding(EmbeddingSimilarity<Vertex>),
}

impl SimilarityOracle<Vertex> for Similarity {
    fn similarity(&self, a: Vertex, b: Vertex) -> f32 {
        match self {
            Similarity::Structural(s) => s.similarity(a, b),
            Similarity::Table(s) => s.similarity(a, b),
            Similarity::Embedding(s) => s.similarity(a, b),
        }
    }
}

impl GraphArgs {
    fn load(&self) -> Result<(WeightedGraph<Vertex>, Similarity)> {
        let path = self
            .graph
            .as_ref()
            .ok_or_else(|| DivError::invalid_config("--graph is required"))?;
        let graph = load_edge_list(path, self.undirected)?;
        let similarity = match (&self.similarities, &self.embeddings) {
            (Some(path), _) => Similarity::Table(load_similarity_table(path, self.default_similarity)?),
            (None, Some(path)) => Similarity::Embedding(load_embeddings(path)?),
            (None, None) => Similarity::Structural(NoSimilarity),
        };
        Ok((graph, similarity))
    }
}

fn load_pool(path: Option<&Path>) -> Result<Option<Vec<Vertex>>> {
    path.map(|path| -> Result<Vec<Vertex>> {
        Ok(load_vertex_lists::<Vertex>(path)?.into_iter().flatten().collect())
    })
    .transpose()
}

impl SearchArgs {
    fn param_file(&self) -> Result<ParamFile> {
        match &self.config {
            Some(path) => Ok(serde_json::from_str(&std::fs::read_to_string(path)?)?),
            None => Ok(ParamFile::default()),
        }
    }

    fn query_batch(&self) -> Result<Vec<Vertex>> {
        let mut queries: Vec<Vertex> = self.query.into_iter().collect();
        if let Some(path) = &self.queries {
            queries.extend(load_queries::<Vertex>(path)?);
        }
        Ok(queries)
    }

    /// Defaults, then the parameter file, then the flags.
    fn request(&self, file: &ParamFile, query: Vertex, pool: Option<Vec<Vertex>>) -> DiversifyRequest<Vertex> {
        let mut params = file.params.unwrap_or_default();
        params.lambda = self.lambda.unwrap_or(params.lambda);
        params.alpha = self.alpha.unwrap_or(params.alpha);
        params.beta = self.beta.unwrap_or(params.beta);
        params.aggregation = self.aggregation.unwrap_or(params.aggregation);
        params.direction = self.direction.unwrap_or(params.direction);

        let pruning = if self.exhaustive {
            PruningMode::Exhaustive
        } else if let Some(prefix) = self.prefix {
            PruningMode::Bounded { prefix }
        } else {
            file.pruning.unwrap_or_default()
        };

        DiversifyRequest {
            query,
            pool,
            result_size: self.result_size.or(file.result_size).unwrap_or(DEFAULT_RESULT_SIZE),
            keep_top_k: self.keep_top_k.or(file.keep_top_k).unwrap_or(DEFAULT_KEEP_TOP_K),
            params,
            pruning,
            timeout_ms: self.timeout_ms.or(file.timeout_ms),
        }
    }
}

/// Runs `job` for every query, with a progress bar for batches.
fn run_batch<T: Serialize>(queries: Vec<Vertex>, mut job: impl FnMut(Vertex) -> Result<T>) -> Result<()> {
    let mut reports = Vec::with_capacity(queries.len());
    if queries.len() > 1 {
        for query in tqdm(queries.into_iter()) {
            reports.push(Report { query, outcome: job(query)? });
        }
    } else {
        for query in queries {
            reports.push(Report { query, outcome: job(query)? });
        }
    }
    println!("{}", serde_json::to_string_pretty(&reports)?);
    Ok(())
}

fn run_diversify(graph: &WeightedGraph<Vertex>, similarity: &Similarity, args: &SearchArgs) -> Result<()> {
    let file = args.param_file()?;
    let pool = load_pool(args.pool.as_deref())?;
    let threads = args.threads.or(file.threads).unwrap_or(1);
    run_batch(args.query_batch()?, |query| {
        let request = args.request(&file, query, pool.clone());
        if threads > 1 {
            diversify_parallel(graph, similarity, &request, threads)
        } else {
            diversify(graph, similarity, &request)
        }
    })
}

fn run_refine(
    graph: &WeightedGraph<Vertex>,
    similarity: &Similarity,
    args: &SearchArgs,
    seeds: &Path,
    max_rounds: Option<usize>,
) -> Result<()> {
    let file = args.param_file()?;
    let pool = load_pool(args.pool.as_deref())?;
    let seeds: Vec<Vec<Vertex>> = load_vertex_lists(seeds)?;
    let max_rounds = max_rounds.or(file.max_rounds);
    run_batch(args.query_batch()?, |query| {
        let mut base = args.request(&file, query, pool.clone());
        if args.result_size.is_none() && file.result_size.is_none() {
            // seed sets define the result size
            if let Some(first) = seeds.first() {
                base.result_size = first.len();
            }
        }
        let mut request = RefineRequest::new(base, seeds.clone());
        if let Some(max_rounds) = max_rounds {
            request = request.with_max_rounds(max_rounds);
        }
        refine(graph, similarity, &request)
    })
}

fn run_meet(graph: &WeightedGraph<Vertex>, args: &MeetArgs) -> Result<()> {
    let pool: Option<HashSet<Vertex>> = load_pool(args.pool.as_deref())?.map(|p| p.into_iter().collect());
    let point = optimal_meeting_point(graph, &args.parties, args.aggregation, args.direction, pool.as_ref())?;
    match &point {
        Some(point) => info!(vertex = point.vertex, cost = point.cost, "meeting point"),
        None => info!("no vertex is reachable by every party"),
    }
    println!("{}", serde_json::to_string_pretty(&point)?);
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "divgraph=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let (graph, similarity) = cli.graph.load()?;
    info!(
        vertices = graph.node_count(),
        edges = graph.edge_count(),
        "graph ready"
    );

    match &cli.command {
        Command::Diversify(args) => run_diversify(&graph, &similarity, args),
        Command::Refine {
            search,
            seeds,
            max_rounds,
        } => run_refine(&graph, &similarity, search, seeds, *max_rounds),
        Command::Meet(args) => run_meet(&graph, args),
    }
}

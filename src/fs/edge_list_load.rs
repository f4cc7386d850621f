use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
    str::FromStr,
};

use tracing::info;

use crate::{
    error::{DivError, Result},
    fs::records::{field, records},
    graph::{Vertex, WeightedGraph},
};

/// Parses an edge list: `from to [weight]` per line, weight defaulting to 1. A line holding
/// a single vertex declares an isolated vertex. With `undirected`, every edge is mirrored.
pub fn parse_edge_list<V, R>(reader: R, undirected: bool) -> Result<WeightedGraph<V>>
where
    V: Vertex + FromStr,
    R: BufRead,
{
    let mut graph = WeightedGraph::new();
    for record in records(reader) {
        let (line, fields) = record?;
        match fields.as_slice() {
            [vertex] => graph.add_vertex(field(line, vertex, "vertex")?),
            [from, to, rest @ ..] if rest.len() <= 1 => {
                let from: V = field(line, from, "vertex")?;
                let to: V = field(line, to, "vertex")?;
                let weight = match rest.first() {
                    Some(weight) => field(line, weight, "weight")?,
                    None => 1.0,
                };
                if undirected {
                    graph.add_undirected_edge(from, to, weight)?;
                } else {
                    graph.add_edge(from, to, weight)?;
                }
            }
            _ => {
                return Err(DivError::parse(
                    line,
                    format!("expected 'from to [weight]', got {} fields", fields.len()),
                ));
            }
        }
    }
    Ok(graph)
}

pub fn load_edge_list<V>(path: impl AsRef<Path>, undirected: bool) -> Result<WeightedGraph<V>>
where
    V: Vertex + FromStr,
{
    let path = path.as_ref();
    let graph = parse_edge_list(BufReader::new(File::open(path)?), undirected)?;
    info!(
        path = %path.display(),
        vertices = graph.vertices().count(),
        edges = graph.edge_count(),
        "graph loaded"
    );
    Ok(graph)
}

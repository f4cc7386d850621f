use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
    str::FromStr,
};

use crate::{
    error::{DivError, Result},
    fs::records::{field, records},
    graph::Vertex,
};

/// Parses one query vertex per line.
pub fn parse_queries<V, R>(reader: R) -> Result<Vec<V>>
where
    V: Vertex + FromStr,
    R: BufRead,
{
    records(reader)
        .map(|record| -> Result<V> {
            let (line, fields) = record?;
            match fields.as_slice() {
                [vertex] => field(line, vertex, "vertex"),
                _ => Err(DivError::parse(line, "expected a single vertex")),
            }
        })
        .collect()
}

/// Parses one whitespace-separated vertex list per line (seed sets, pools).
pub fn parse_vertex_lists<V, R>(reader: R) -> Result<Vec<Vec<V>>>
where
    V: Vertex + FromStr,
    R: BufRead,
{
    records(reader)
        .map(|record| -> Result<Vec<V>> {
            let (line, fields) = record?;
            fields.iter().map(|v| field(line, v, "vertex")).collect()
        })
        .collect()
}

pub fn load_vertex_lists<V>(path: impl AsRef<Path>) -> Result<Vec<Vec<V>>>
where
    V: Vertex + FromStr,
{
    parse_vertex_lists(BufReader::new(File::open(path)?))
}

pub fn load_queries<V>(path: impl AsRef<Path>) -> Result<Vec<V>>
where
    V: Vertex + FromStr,
{
    parse_queries(BufReader::new(File::open(path)?))
}

use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
    str::FromStr,
};

use crate::{
    error::{DivError, Result},
    fs::records::{field, records},
    graph::{EmbeddingSimilarity, SimilarityTable, Vertex},
};

/// Parses `u v similarity` lines into a table; unlisted pairs get `default`.
pub fn parse_similarity_table<V, R>(reader: R, default: f32) -> Result<SimilarityTable<V>>
where
    V: Vertex + FromStr,
    R: BufRead,
{
    let mut table = SimilarityTable::new(default);
    for record in records(reader) {
        let (line, fields) = record?;
        let [a, b, similarity] = fields.as_slice() else {
            return Err(DivError::parse(line, "expected 'u v similarity'"));
        };
        let similarity: f32 = field(line, similarity, "similarity")?;
        if !(0.0..=1.0).contains(&similarity) {
            return Err(DivError::parse(
                line,
                format!("similarity {similarity} is outside [0, 1]"),
            ));
        }
        table.insert(field(line, a, "vertex")?, field(line, b, "vertex")?, similarity);
    }
    Ok(table)
}

pub fn load_similarity_table<V>(path: impl AsRef<Path>, default: f32) -> Result<SimilarityTable<V>>
where
    V: Vertex + FromStr,
{
    parse_similarity_table(BufReader::new(File::open(path)?), default)
}

/// Parses `vertex x_1 .. x_d` lines; every line must have the same dimension.
pub fn parse_embeddings<V, R>(reader: R) -> Result<EmbeddingSimilarity<V>>
where
    V: Vertex + FromStr,
    R: BufRead,
{
    let mut rows: Vec<(V, Vec<f32>)> = vec![];
    for record in records(reader) {
        let (line, fields) = record?;
        let Some((vertex, values)) = fields.split_first() else {
            continue;
        };
        if values.is_empty() {
            return Err(DivError::parse(line, "embedding has no components"));
        }
        let embedding = values
            .iter()
            .map(|v| field(line, v, "component"))
            .collect::<Result<Vec<f32>>>()?;
        if let Some((_, first)) = rows.first() {
            if first.len() != embedding.len() {
                return Err(DivError::parse(
                    line,
                    format!("expected {} components, got {}", first.len(), embedding.len()),
                ));
            }
        }
        rows.push((field(line, vertex, "vertex")?, embedding));
    }

    let mut embeddings = EmbeddingSimilarity::new(rows.first().map_or(0, |(_, e)| e.len()));
    for (vertex, embedding) in rows {
        embeddings.insert(vertex, embedding);
    }
    Ok(embeddings)
}

pub fn load_embeddings<V>(path: impl AsRef<Path>) -> Result<EmbeddingSimilarity<V>>
where
    V: Vertex + FromStr,
{
    parse_embeddings(BufReader::new(File::open(path)?))
}

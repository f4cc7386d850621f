//! Error types shared by the graph loaders, the search engine and the orchestrators.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, DivError>;

#[derive(Error, Debug)]
pub enum DivError {
    /// A request failed validation before any search began.
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// A query, seed member or party does not belong to the graph.
    #[error("Vertex {0} is not part of the graph")]
    UnknownVertex(String),

    /// Frontier expansion is Dijkstra-based, so every edge weight must be finite and non-negative.
    #[error("Edge {from} -> {to} has unsupported weight {weight}")]
    NegativeWeight {
        from: String,
        to: String,
        weight: f32,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error on line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DivError {
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    pub fn unknown_vertex(vertex: impl std::fmt::Debug) -> Self {
        Self::UnknownVertex(format!("{vertex:?}"))
    }

    pub fn parse(line: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            line,
            message: message.into(),
        }
    }
}

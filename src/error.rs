use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("input file not found: {}", .0.display())]
    MissingInput(PathBuf),

    #[error("input file is empty: {}", .0.display())]
    EmptyInput(PathBuf),

    #[error("missing required column `{0}`")]
    MissingColumn(String),

    #[error("failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("invalid {field} for product {product_id}: {value}")]
    InvalidInput {
        product_id: String,
        field: &'static str,
        value: f64,
    },

    #[error("invalid simulation input: {0}")]
    InvalidSimulation(String),

    #[error("clustering failed: {0}")]
    Clustering(String),

    #[error("sentiment lexicon unavailable: {0}")]
    Lexicon(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("unknown product: {0}")]
    UnknownProduct(String),
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

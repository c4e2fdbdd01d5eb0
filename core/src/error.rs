use crate::attribute::Attribute;
use thiserror::Error;

/// Failures a query can surface to its caller. The query is not executed when one is returned.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum QueryError {
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    #[error("cannot weight {attribute}: every track in the catalog has {attribute} 0")]
    DegenerateNormalization { attribute: Attribute },
}

impl QueryError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        QueryError::InvalidQuery(msg.into())
    }

    /// Stable machine-readable name of the failure kind.
    pub fn kind(&self) -> &'static str {
        match self {
            QueryError::InvalidQuery(_) => "InvalidQuery",
            QueryError::DegenerateNormalization { .. } => "DegenerateNormalization",
        }
    }
}

/// Ingestion-time validation failures for a single record.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TrackError {
    #[error("track id is empty")]
    EmptyId,

    #[error("track {id}: malformed duration {text:?}, expected minutes:seconds")]
    MalformedDuration { id: String, text: String },

    #[error("track {id}: {field} = {value} is outside 0..=100")]
    PercentageOutOfRange {
        id: String,
        field: &'static str,
        value: u32,
    },
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("duplicate track id {0}")]
    DuplicateId(String),
}

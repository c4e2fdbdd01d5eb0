pub mod attribute;
pub mod catalog;
pub mod engine;
pub mod error;
pub mod load;
pub mod normalize;
pub mod paginate;
pub mod query;
pub mod track;

pub use attribute::{Attribute, Percentage};
pub use catalog::{Catalog, SharedCatalog};
pub use engine::{QueryEngine, QueryRequest, QueryResult};
pub use error::{CatalogError, QueryError, TrackError};
pub use normalize::NormalizationIndex;
pub use paginate::{check_page, max_page, paginate, Page};
pub use query::{composite_score, filter, rank, Ranked, Weights};
pub use track::{duration_to_seconds, Track, TrackRecord};

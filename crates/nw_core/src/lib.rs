pub mod datetime;
pub mod error;
pub mod models;
pub mod progress;
pub mod storage;
pub mod types;

pub use datetime::{
    format_timestamp, humanize_since, normalize_timestamp, publication_label, TimestampNormalizer,
};
pub use error::Error;
pub use models::InferenceModel;
pub use progress::{NoProgress, ProgressObserver};
pub use storage::ArticleStorage;
pub use types::{
    CanonicalArticle, Category, Headline, NewArticle, RawArticle, RunStats, UpsertOutcome,
};

pub type Result<T> = std::result::Result<T, Error>;

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use nw_core::{ArticleStorage, Result};

pub mod backends;
pub mod batches;
pub mod loader;

pub use backends::*;
pub use batches::{BatchDirectory, BatchInfo, BatchRow, DirectoryInfo};
pub use loader::{dedup_records, DataLoader, IngestReport, Ingestor};

#[async_trait]
pub trait StorageBackend: Send + Sync {
    fn get_error_message() -> &'static str;
    async fn new() -> Result<Self>
    where
        Self: Sized;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum StorageKind {
    #[default]
    Memory,
    Sqlite,
}

impl StorageKind {
    pub fn error_message(&self) -> &'static str {
        match self {
            StorageKind::Memory => InMemoryStorage::get_error_message(),
            #[cfg(feature = "sqlite")]
            StorageKind::Sqlite => SQLiteStorage::get_error_message(),
            #[cfg(not(feature = "sqlite"))]
            StorageKind::Sqlite => "SQLite support is not compiled in (enable the `sqlite` feature)",
        }
    }
}

/// Open the configured backend. `database` only matters for SQLite.
pub async fn create_storage(kind: StorageKind, database: Option<&Path>) -> Result<Arc<dyn ArticleStorage>> {
    match kind {
        StorageKind::Memory => Ok(Arc::new(InMemoryStorage::new())),
        #[cfg(feature = "sqlite")]
        StorageKind::Sqlite => {
            let storage = match database {
                Some(path) => SQLiteStorage::new_with_path(path).await?,
                None => <SQLiteStorage as StorageBackend>::new().await?,
            };
            Ok(Arc::new(storage))
        }
        #[cfg(not(feature = "sqlite"))]
        StorageKind::Sqlite => {
            let _ = database;
            Err(nw_core::Error::Config(kind.error_message().to_string()))
        }
    }
}

pub mod prelude {
    pub use super::backends::*;
    pub use super::{create_storage, StorageBackend, StorageKind};
}

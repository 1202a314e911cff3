mod config;
mod connection;
mod error;
mod models;
pub mod store;

pub use config::MongoConfig;
pub use error::MongoDaoError;
pub use store::MongoClubStore;

use crate::dao::storage::StorageError;

impl From<MongoDaoError> for StorageError {
    fn from(err: MongoDaoError) -> Self {
        match err {
            MongoDaoError::CorruptDocument { collection, key, reason } => {
                StorageError::corrupt(format!("{collection}/{key}"), reason)
            }
            other => StorageError::unavailable(other.to_string(), other),
        }
    }
}

use mongodb::error::Error as MongoError;
use thiserror::Error;

pub type MongoResult<T> = std::result::Result<T, MongoDaoError>;

#[derive(Debug, Error)]
pub enum MongoDaoError {
    #[error("missing environment variable `{var}`")]
    MissingEnvVar { var: &'static str },
    #[error("failed to parse MongoDB connection URI `{uri}`")]
    InvalidUri {
        uri: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to build MongoDB client from options")]
    ClientConstruction {
        #[source]
        source: MongoError,
    },
    #[error("MongoDB ping failed during initial connection after {attempts} attempt(s)")]
    InitialPing {
        attempts: u32,
        #[source]
        source: MongoError,
    },
    #[error("MongoDB ping health check failed")]
    HealthPing {
        #[source]
        source: MongoError,
    },
    #[error("failed to ensure index `{index}` on collection `{collection}`")]
    EnsureIndex {
        collection: &'static str,
        index: &'static str,
        #[source]
        source: MongoError,
    },
    #[error("failed to write `{key}` in `{collection}`")]
    Write {
        collection: &'static str,
        key: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to read `{key}` from `{collection}`")]
    Read {
        collection: &'static str,
        key: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to list `{collection}`")]
    List {
        collection: &'static str,
        #[source]
        source: MongoError,
    },
    #[error("document `{key}` in `{collection}` is malformed: {reason}")]
    CorruptDocument {
        collection: &'static str,
        key: String,
        reason: String,
    },
}

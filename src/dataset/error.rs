use crate::types::setup::Setup;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("Failed to configure object store for bucket '{bucket}'")]
    StoreConfig {
        bucket: String,
        #[source]
        source: object_store::Error,
    },

    #[error("Invalid store key '{path}'")]
    StoreKey {
        path: String,
        #[source]
        source: zarrs::storage::StoreKeyError,
    },

    #[error("Failed to read '{path}' from object store")]
    Storage {
        path: String,
        #[source]
        source: zarrs::storage::StorageError,
    },

    #[error("No consolidated metadata at '{path}'; not a readable zarr store")]
    MissingMetadata { path: String },

    #[error("Failed to parse consolidated metadata at '{path}'")]
    MetadataParse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Consolidated metadata at '{path}' is malformed: {reason}")]
    MalformedMetadata { path: String, reason: String },

    #[error("Store at '{path}' has no gid coordinate")]
    MissingGidCoordinate { path: String },

    #[error("Failed to open array '{path}'")]
    ArrayOpen {
        path: String,
        #[source]
        source: Box<zarrs::array::ArrayCreateError>,
    },

    #[error("Failed to read array '{name}'")]
    ArrayRead {
        name: String,
        #[source]
        source: Box<zarrs::array::ArrayError>,
    },

    #[error("Array '{name}' has unsupported data type {data_type}")]
    UnsupportedDataType { name: String, data_type: String },

    #[error("Rows of variable '{name}' do not share a shape")]
    ShapeMismatch {
        name: String,
        #[source]
        source: ndarray::ShapeError,
    },

    #[error("Setups cannot be merged: {reason}")]
    MergeMismatch { reason: String },

    #[error("Variable '{0}' is not present in the dataset")]
    UnknownVariable(String),

    #[error("No dataset registered for setup {0}")]
    UnknownSetup(Setup),
}

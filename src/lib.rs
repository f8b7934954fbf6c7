mod dataset;
mod error;
mod inspire;
mod lookup;
mod types;

pub use error::InspireError;
pub use inspire::*;

pub use dataset::data::{DataVariable, SetupData, GID_DIM, SETUP_DIM};
pub use dataset::error::DatasetError;
pub use dataset::memory::{MemoryDataset, MemoryOpener};
pub use dataset::opener::DatasetOpener;
pub use dataset::setup_dataset::{SetupDataset, VariableSpec};
pub use dataset::zarr::{ZarrOpener, DEFAULT_BUCKET, DEFAULT_PREFIX, DEFAULT_REGION};

pub use lookup::error::LookupError;
pub use lookup::table::{LookupTable, GID_COLUMN};

pub use types::geo::{BoundingBox, LatLon};
pub use types::selection::*;
pub use types::setup::Setup;

use crate::dataset::error::DatasetError;
use crate::lookup::error::LookupError;
use thiserror::Error;

/// Top-level error returned by the [`Inspire`](crate::Inspire) client.
#[derive(Debug, Error)]
pub enum InspireError {
    #[error(transparent)]
    Lookup(#[from] LookupError),

    #[error(transparent)]
    Dataset(#[from] DatasetError),
}

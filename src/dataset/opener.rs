use crate::dataset::error::DatasetError;
use crate::dataset::setup_dataset::SetupDataset;
use crate::types::setup::Setup;
use async_trait::async_trait;

/// Capability of opening the array store behind one setup.
///
/// The default implementation is [`ZarrOpener`](crate::ZarrOpener) against the
/// public OEDI data lake; tests substitute
/// [`MemoryOpener`](crate::MemoryOpener). Opening is read-only and performs no
/// retries; an unreachable or unparsable store surfaces as a
/// [`DatasetError`] to the caller unchanged.
#[async_trait]
pub trait DatasetOpener: Send + Sync {
    async fn open(&self, setup: Setup) -> Result<SetupDataset, DatasetError>;
}

//! In-memory datasets, the substitutable fixture behind
//! [`DatasetOpener`](crate::DatasetOpener).

use crate::dataset::error::DatasetError;
use crate::dataset::opener::DatasetOpener;
use crate::dataset::setup_dataset::{SetupDataset, VariableReader, VariableSpec};
use crate::types::setup::Setup;
use async_trait::async_trait;
use ndarray::{ArrayD, Axis};
use std::collections::HashMap;
use std::sync::Arc;

/// One setup's arrays held entirely in memory.
///
/// # Examples
///
/// ```
/// use inspire_oedi::{MemoryDataset, MemoryOpener, Setup};
/// use ndarray::array;
///
/// let dataset = MemoryDataset::new(vec![100, 200]).with_variable(
///     "ghi",
///     &["gid", "time"],
///     array![[1.0, 2.0], [3.0, 4.0]].into_dyn(),
/// );
/// let opener = MemoryOpener::new().with_dataset(Setup::new(1), dataset);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryDataset {
    gids: Vec<i64>,
    variables: Vec<(VariableSpec, ArrayD<f64>)>,
}

impl MemoryDataset {
    pub fn new(gids: Vec<i64>) -> Self {
        Self {
            gids,
            variables: Vec::new(),
        }
    }

    /// Adds a variable. `dims` names every axis of `values` in order; an axis
    /// named `gid` is the one selections slice along.
    pub fn with_variable(mut self, name: &str, dims: &[&str], values: ArrayD<f64>) -> Self {
        let spec = VariableSpec {
            name: name.to_string(),
            dims: dims.iter().map(|dim| dim.to_string()).collect(),
            shape: values.shape().to_vec(),
        };
        self.variables.push((spec, values));
        self
    }
}

struct MemoryReader {
    dataset: Arc<MemoryDataset>,
}

impl MemoryReader {
    fn values(&self, spec: &VariableSpec) -> Result<&ArrayD<f64>, DatasetError> {
        self.dataset
            .variables
            .iter()
            .find(|(candidate, _)| candidate.name == spec.name)
            .map(|(_, values)| values)
            .ok_or_else(|| DatasetError::UnknownVariable(spec.name.clone()))
    }
}

impl VariableReader for MemoryReader {
    fn read_rows(
        &self,
        spec: &VariableSpec,
        axis: usize,
        rows: &[usize],
    ) -> Result<ArrayD<f64>, DatasetError> {
        Ok(self.values(spec)?.select(Axis(axis), rows))
    }

    fn read_full(&self, spec: &VariableSpec) -> Result<ArrayD<f64>, DatasetError> {
        Ok(self.values(spec)?.clone())
    }
}

/// Serves registered [`MemoryDataset`]s instead of hitting an object store.
///
/// Opening an unregistered setup fails with
/// [`DatasetError::UnknownSetup`], standing in for the remote-store open
/// failure of the real opener.
#[derive(Debug, Clone, Default)]
pub struct MemoryOpener {
    datasets: HashMap<Setup, Arc<MemoryDataset>>,
}

impl MemoryOpener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dataset(mut self, setup: Setup, dataset: MemoryDataset) -> Self {
        self.datasets.insert(setup, Arc::new(dataset));
        self
    }
}

#[async_trait]
impl DatasetOpener for MemoryOpener {
    async fn open(&self, setup: Setup) -> Result<SetupDataset, DatasetError> {
        let dataset = self
            .datasets
            .get(&setup)
            .cloned()
            .ok_or(DatasetError::UnknownSetup(setup))?;
        let gids = dataset.gids.clone();
        let variables = dataset
            .variables
            .iter()
            .map(|(spec, _)| spec.clone())
            .collect();
        Ok(SetupDataset::new(
            setup,
            gids,
            variables,
            Box::new(MemoryReader { dataset }),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unknown_setup_fails_to_open() {
        let opener = MemoryOpener::new();
        let result = opener.open(Setup::new(9)).await;
        assert!(matches!(result, Err(DatasetError::UnknownSetup(setup)) if setup == Setup::new(9)));
    }
}

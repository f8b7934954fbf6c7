//! An opened store and the select-by-gid primitive every retrieval mode
//! converges on.

use crate::dataset::data::{DataVariable, SetupData, GID_DIM};
use crate::dataset::error::DatasetError;
use crate::types::setup::Setup;
use ndarray::ArrayD;
use std::collections::HashSet;

/// Shape and dimension names of one array in a store, discovered at open time.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableSpec {
    pub(crate) name: String,
    pub(crate) dims: Vec<String>,
    pub(crate) shape: Vec<usize>,
}

impl VariableSpec {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dims(&self) -> &[String] {
        &self.dims
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub(crate) fn gid_axis(&self) -> Option<usize> {
        self.dims.iter().position(|dim| dim == GID_DIM)
    }
}

/// Reads variable payloads out of whatever backs the store.
///
/// The zarr implementation fetches only the requested rows; the in-memory
/// implementation slices fixture arrays. Both sides stay behind this seam so
/// the selection logic never knows where bytes come from.
pub(crate) trait VariableReader: Send + Sync {
    /// Reads the given positions along the variable's gid axis, in order.
    fn read_rows(
        &self,
        spec: &VariableSpec,
        axis: usize,
        rows: &[usize],
    ) -> Result<ArrayD<f64>, DatasetError>;

    /// Reads the whole variable.
    fn read_full(&self, spec: &VariableSpec) -> Result<ArrayD<f64>, DatasetError>;
}

/// One setup's store, opened and ready for selection.
///
/// Holds the fully read `gid` coordinate plus per-variable specs; variable
/// payloads stay behind the reader until a selection asks for them. Instances
/// are created per call by a [`DatasetOpener`](crate::DatasetOpener) and not
/// cached anywhere.
pub struct SetupDataset {
    setup: Setup,
    gids: Vec<i64>,
    variables: Vec<VariableSpec>,
    reader: Box<dyn VariableReader>,
}

impl SetupDataset {
    pub(crate) fn new(
        setup: Setup,
        gids: Vec<i64>,
        variables: Vec<VariableSpec>,
        reader: Box<dyn VariableReader>,
    ) -> Self {
        Self {
            setup,
            gids,
            variables,
            reader,
        }
    }

    pub fn setup(&self) -> Setup {
        self.setup
    }

    /// The full `gid` coordinate of the store, in native order.
    pub fn gids(&self) -> &[i64] {
        &self.gids
    }

    pub fn variables(&self) -> &[VariableSpec] {
        &self.variables
    }

    /// Restricts the store to the requested gids.
    ///
    /// The intersection with the store's gid coordinate decides what is read;
    /// matched gids come back in the store's native order regardless of the
    /// requested order. An empty intersection returns `(None, [])` without
    /// touching any variable payload. Variables without a gid dimension pass
    /// through whole.
    pub fn select(&self, gids: &[i64]) -> Result<(Option<SetupData>, Vec<i64>), DatasetError> {
        let requested: HashSet<i64> = gids.iter().copied().collect();

        let mut rows = Vec::new();
        let mut matched = Vec::new();
        for (row, gid) in self.gids.iter().enumerate() {
            if requested.contains(gid) {
                rows.push(row);
                matched.push(*gid);
            }
        }

        if matched.is_empty() {
            return Ok((None, Vec::new()));
        }

        let mut variables = Vec::with_capacity(self.variables.len());
        for spec in &self.variables {
            let values = match spec.gid_axis() {
                Some(axis) => self.reader.read_rows(spec, axis, &rows)?,
                None => self.reader.read_full(spec)?,
            };
            variables.push(DataVariable::new(
                spec.name.clone(),
                spec.dims.clone(),
                values,
            ));
        }

        Ok((Some(SetupData::single(matched.clone(), variables)), matched))
    }
}

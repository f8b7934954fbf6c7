//! Zarr-backed dataset access against the OEDI data lake.
//!
//! The stores are xarray-written zarr v2 hierarchies: consolidated metadata at
//! `.zmetadata` lists every array together with its `_ARRAY_DIMENSIONS`
//! attribute. The opener reads that document once per open, pulls the `gid`
//! coordinate eagerly, and leaves the (much larger) variable payloads behind
//! per-row subset reads so a selection only fetches the grid cells it matched.

use crate::dataset::data::GID_DIM;
use crate::dataset::error::DatasetError;
use crate::dataset::opener::DatasetOpener;
use crate::dataset::setup_dataset::{SetupDataset, VariableReader, VariableSpec};
use crate::types::setup::Setup;
use async_trait::async_trait;
use log::info;
use ndarray::{ArrayD, Axis};
use object_store::aws::{AmazonS3, AmazonS3Builder};
use serde_json::Value;
use std::collections::BTreeMap;
use std::ops::Range;
use std::sync::Arc;
use zarrs::array::{Array, DataType};
use zarrs::array_subset::ArraySubset;
use zarrs::storage::{ReadableStorageTraits, StoreKey};
use zarrs_object_store::AsyncObjectStore;
use zarrs_storage::storage_adapter::async_to_sync::{
    AsyncToSyncBlockOn, AsyncToSyncStorageAdapter,
};

/// Public bucket holding the InSPIRE agrivoltaics irradiance release.
pub const DEFAULT_BUCKET: &str = "oedi-data-lake";
/// Key prefix of the current data release inside the bucket.
pub const DEFAULT_PREFIX: &str = "inspire/agrivoltaics_irradiance/v1.1";
/// Region the OEDI data lake is served from.
pub const DEFAULT_REGION: &str = "us-west-2";

const CONSOLIDATED_METADATA_KEY: &str = ".zmetadata";

/// Drives the storage futures to completion from sync zarr calls.
///
/// The sync zarrs API runs inside an async context here, so a plain
/// `Runtime::block_on` would panic with a nested-runtime error. Moving the
/// task off the async worker via `block_in_place` first makes the inner
/// `block_on` legal; it also ties this opener to the multi-threaded runtime.
#[derive(Clone, Copy)]
struct TokioBlockOn;

impl AsyncToSyncBlockOn for TokioBlockOn {
    fn block_on<F: core::future::Future>(&self, future: F) -> F::Output {
        tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
    }
}

type SyncStorage = AsyncToSyncStorageAdapter<AsyncObjectStore<AmazonS3>, TokioBlockOn>;

/// Opens setup stores from the OEDI data lake with anonymous, unsigned reads.
///
/// There is no credential surface: the bucket is public and every request is
/// sent without a signature. No handle or metadata is cached between opens.
///
/// The zarr reads run through a sync-to-async storage adapter that needs
/// `block_in_place`, so this opener requires the multi-threaded tokio runtime.
pub struct ZarrOpener {
    storage: Arc<SyncStorage>,
    prefix: String,
}

impl ZarrOpener {
    /// Anonymous client for the default OEDI bucket and release prefix.
    pub fn new() -> Result<Self, DatasetError> {
        Self::with_location(DEFAULT_BUCKET, DEFAULT_PREFIX, DEFAULT_REGION)
    }

    /// Points the opener at another bucket/prefix (mirrors, test buckets).
    pub fn with_location(bucket: &str, prefix: &str, region: &str) -> Result<Self, DatasetError> {
        let s3 = AmazonS3Builder::new()
            .with_bucket_name(bucket)
            .with_region(region)
            .with_skip_signature(true)
            .build()
            .map_err(|e| DatasetError::StoreConfig {
                bucket: bucket.to_string(),
                source: e,
            })?;

        let async_store = Arc::new(AsyncObjectStore::new(s3));
        let storage = Arc::new(AsyncToSyncStorageAdapter::new(async_store, TokioBlockOn));

        Ok(Self {
            storage,
            prefix: prefix.trim_matches('/').to_string(),
        })
    }

    fn consolidated_specs(&self, store_path: &str) -> Result<Vec<VariableSpec>, DatasetError> {
        let key_path = format!("{store_path}/{CONSOLIDATED_METADATA_KEY}");
        let key = StoreKey::new(key_path.clone()).map_err(|e| DatasetError::StoreKey {
            path: key_path.clone(),
            source: e,
        })?;
        let bytes = self
            .storage
            .get(&key)
            .map_err(|e| DatasetError::Storage {
                path: key_path.clone(),
                source: e,
            })?
            .ok_or_else(|| DatasetError::MissingMetadata {
                path: key_path.clone(),
            })?;
        parse_consolidated(&key_path, &bytes)
    }
}

#[async_trait]
impl DatasetOpener for ZarrOpener {
    async fn open(&self, setup: Setup) -> Result<SetupDataset, DatasetError> {
        let store_path = format!("{}/{}", self.prefix, setup.store_name());
        info!("Opening zarr store at {}", store_path);

        let specs = self.consolidated_specs(&store_path)?;
        let gid_spec = specs
            .iter()
            .find(|spec| spec.name == GID_DIM)
            .cloned()
            .ok_or_else(|| DatasetError::MissingGidCoordinate {
                path: store_path.clone(),
            })?;
        if gid_spec.shape.len() != 1 {
            return Err(DatasetError::MalformedMetadata {
                path: store_path.clone(),
                reason: "gid coordinate is not one-dimensional".to_string(),
            });
        }

        let reader = ZarrVariableReader {
            storage: self.storage.clone(),
            node_prefix: format!("/{store_path}"),
        };
        let gids = reader.read_gids(&gid_spec)?;
        info!("Store {} exposes {} grid cells", store_path, gids.len());

        let variables = specs
            .into_iter()
            .filter(|spec| spec.name != GID_DIM)
            .collect();
        Ok(SetupDataset::new(
            setup,
            gids,
            variables,
            Box::new(reader),
        ))
    }
}

/// Extracts array specs from a consolidated-metadata document.
///
/// Only top-level arrays are considered; the published stores are flat. Every
/// array must carry the xarray `_ARRAY_DIMENSIONS` attribute naming its axes.
fn parse_consolidated(path: &str, bytes: &[u8]) -> Result<Vec<VariableSpec>, DatasetError> {
    let document: Value =
        serde_json::from_slice(bytes).map_err(|e| DatasetError::MetadataParse {
            path: path.to_string(),
            source: e,
        })?;
    let entries = document
        .get("metadata")
        .and_then(Value::as_object)
        .ok_or_else(|| DatasetError::MalformedMetadata {
            path: path.to_string(),
            reason: "no 'metadata' object".to_string(),
        })?;

    // BTreeMap keeps the variable order deterministic across opens
    let mut specs = BTreeMap::new();
    for (entry, value) in entries {
        let Some(name) = entry.strip_suffix("/.zarray") else {
            continue;
        };
        if name.contains('/') {
            continue;
        }

        let shape = value
            .get("shape")
            .and_then(Value::as_array)
            .and_then(|arr| {
                arr.iter()
                    .map(|v| v.as_u64().map(|n| n as usize))
                    .collect::<Option<Vec<_>>>()
            })
            .ok_or_else(|| DatasetError::MalformedMetadata {
                path: path.to_string(),
                reason: format!("array '{name}' has no shape"),
            })?;

        let dims = entries
            .get(&format!("{name}/.zattrs"))
            .and_then(|attrs| attrs.get("_ARRAY_DIMENSIONS"))
            .and_then(Value::as_array)
            .and_then(|arr| {
                arr.iter()
                    .map(|v| v.as_str().map(str::to_string))
                    .collect::<Option<Vec<_>>>()
            })
            .ok_or_else(|| DatasetError::MalformedMetadata {
                path: path.to_string(),
                reason: format!("array '{name}' has no _ARRAY_DIMENSIONS attribute"),
            })?;

        if dims.len() != shape.len() {
            return Err(DatasetError::MalformedMetadata {
                path: path.to_string(),
                reason: format!("array '{name}' names {} dims for {} axes", dims.len(), shape.len()),
            });
        }

        specs.insert(
            name.to_string(),
            VariableSpec {
                name: name.to_string(),
                dims,
                shape,
            },
        );
    }

    Ok(specs.into_values().collect())
}

struct ZarrVariableReader {
    storage: Arc<SyncStorage>,
    /// Leading-slash zarr node path of the store root.
    node_prefix: String,
}

impl ZarrVariableReader {
    fn open_array(&self, name: &str) -> Result<Array<SyncStorage>, DatasetError> {
        let path = format!("{}/{}", self.node_prefix, name);
        Array::open(self.storage.clone(), &path).map_err(|e| DatasetError::ArrayOpen {
            path,
            source: Box::new(e),
        })
    }

    fn read_gids(&self, spec: &VariableSpec) -> Result<Vec<i64>, DatasetError> {
        let array = self.open_array(&spec.name)?;
        let subset = ArraySubset::new_with_shape(array.shape().to_vec());
        let read = |e| DatasetError::ArrayRead {
            name: spec.name.clone(),
            source: Box::new(e),
        };
        match array.data_type() {
            DataType::Int64 => array
                .retrieve_array_subset_elements::<i64>(&subset)
                .map_err(read),
            DataType::Int32 => Ok(array
                .retrieve_array_subset_elements::<i32>(&subset)
                .map_err(read)?
                .into_iter()
                .map(i64::from)
                .collect()),
            DataType::UInt32 => Ok(array
                .retrieve_array_subset_elements::<u32>(&subset)
                .map_err(read)?
                .into_iter()
                .map(i64::from)
                .collect()),
            DataType::UInt64 => Ok(array
                .retrieve_array_subset_elements::<u64>(&subset)
                .map_err(read)?
                .into_iter()
                .map(|v| v as i64)
                .collect()),
            other => Err(DatasetError::UnsupportedDataType {
                name: spec.name.clone(),
                data_type: format!("{other:?}"),
            }),
        }
    }
}

impl VariableReader for ZarrVariableReader {
    fn read_rows(
        &self,
        spec: &VariableSpec,
        axis: usize,
        rows: &[usize],
    ) -> Result<ArrayD<f64>, DatasetError> {
        let array = self.open_array(&spec.name)?;
        let shape = array.shape().to_vec();

        // coalesce consecutive rows into one range read per run
        let mut runs: Vec<(usize, usize)> = Vec::new();
        for &row in rows {
            match runs.last_mut() {
                Some((start, len)) if *start + *len == row => *len += 1,
                _ => runs.push((row, 1)),
            }
        }

        let mut parts = Vec::with_capacity(runs.len());
        for (start, len) in runs {
            let ranges: Vec<Range<u64>> = shape
                .iter()
                .enumerate()
                .map(|(dim, &extent)| {
                    if dim == axis {
                        start as u64..(start + len) as u64
                    } else {
                        0..extent
                    }
                })
                .collect();
            let subset = ArraySubset::new_with_ranges(&ranges);
            parts.push(retrieve_f64(&array, &spec.name, &subset)?);
        }

        let views: Vec<_> = parts.iter().map(|part| part.view()).collect();
        ndarray::concatenate(Axis(axis), &views).map_err(|e| DatasetError::ShapeMismatch {
            name: spec.name.clone(),
            source: e,
        })
    }

    fn read_full(&self, spec: &VariableSpec) -> Result<ArrayD<f64>, DatasetError> {
        let array = self.open_array(&spec.name)?;
        let subset = ArraySubset::new_with_shape(array.shape().to_vec());
        retrieve_f64(&array, &spec.name, &subset)
    }
}

/// Retrieves a subset as f64 regardless of the stored numeric dtype.
fn retrieve_f64(
    array: &Array<SyncStorage>,
    name: &str,
    subset: &ArraySubset,
) -> Result<ArrayD<f64>, DatasetError> {
    let read = |e| DatasetError::ArrayRead {
        name: name.to_string(),
        source: Box::new(e),
    };
    match array.data_type() {
        DataType::Float64 => array
            .retrieve_array_subset_ndarray::<f64>(subset)
            .map_err(read),
        DataType::Float32 => Ok(array
            .retrieve_array_subset_ndarray::<f32>(subset)
            .map_err(read)?
            .mapv(f64::from)),
        DataType::Int64 => Ok(array
            .retrieve_array_subset_ndarray::<i64>(subset)
            .map_err(read)?
            .mapv(|v| v as f64)),
        DataType::Int32 => Ok(array
            .retrieve_array_subset_ndarray::<i32>(subset)
            .map_err(read)?
            .mapv(f64::from)),
        DataType::Int16 => Ok(array
            .retrieve_array_subset_ndarray::<i16>(subset)
            .map_err(read)?
            .mapv(f64::from)),
        DataType::UInt64 => Ok(array
            .retrieve_array_subset_ndarray::<u64>(subset)
            .map_err(read)?
            .mapv(|v| v as f64)),
        DataType::UInt32 => Ok(array
            .retrieve_array_subset_ndarray::<u32>(subset)
            .map_err(read)?
            .mapv(f64::from)),
        DataType::UInt16 => Ok(array
            .retrieve_array_subset_ndarray::<u16>(subset)
            .map_err(read)?
            .mapv(f64::from)),
        other => Err(DatasetError::UnsupportedDataType {
            name: name.to_string(),
            data_type: format!("{other:?}"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_ZMETADATA: &str = r#"{
        "metadata": {
            ".zattrs": {},
            ".zgroup": {"zarr_format": 2},
            "gid/.zarray": {"shape": [3], "chunks": [3], "dtype": "<i8"},
            "gid/.zattrs": {"_ARRAY_DIMENSIONS": ["gid"]},
            "time/.zarray": {"shape": [24], "chunks": [24], "dtype": "<i8"},
            "time/.zattrs": {"_ARRAY_DIMENSIONS": ["time"], "units": "hours since 2022-01-01"},
            "ghi/.zarray": {"shape": [3, 24], "chunks": [1, 24], "dtype": "<f8"},
            "ghi/.zattrs": {"_ARRAY_DIMENSIONS": ["gid", "time"]}
        },
        "zarr_consolidated_format": 1
    }"#;

    #[test]
    fn consolidated_metadata_lists_arrays_with_dims() {
        let specs = parse_consolidated("test/.zmetadata", SAMPLE_ZMETADATA.as_bytes()).unwrap();
        assert_eq!(specs.len(), 3);

        let ghi = specs.iter().find(|spec| spec.name() == "ghi").unwrap();
        assert_eq!(ghi.dims(), &["gid", "time"]);
        assert_eq!(ghi.shape(), &[3, 24]);

        let gid = specs.iter().find(|spec| spec.name() == "gid").unwrap();
        assert_eq!(gid.shape(), &[3]);
    }

    #[test]
    fn missing_dimension_attribute_is_rejected() {
        let document = r#"{
            "metadata": {
                "ghi/.zarray": {"shape": [3, 24], "dtype": "<f8"},
                "ghi/.zattrs": {}
            }
        }"#;
        let result = parse_consolidated("test/.zmetadata", document.as_bytes());
        assert!(matches!(result, Err(DatasetError::MalformedMetadata { .. })));
    }

    #[test]
    fn garbage_document_is_a_parse_error() {
        let result = parse_consolidated("test/.zmetadata", b"not json");
        assert!(matches!(result, Err(DatasetError::MetadataParse { .. })));
    }

    /// Touches the real OEDI bucket; run with `cargo test -- --ignored`.
    #[tokio::test(flavor = "multi_thread")]
    #[ignore = "requires network access to the public OEDI data lake"]
    async fn opens_setup_one_from_oedi() {
        let opener = ZarrOpener::new().unwrap();
        let dataset = opener.open(Setup::new(1)).await.unwrap();
        assert!(!dataset.gids().is_empty());
        assert!(!dataset.variables().is_empty());
    }
}

//! Result types returned by the [`Inspire`](crate::Inspire) retrieval methods.
//!
//! In every selection an empty match is a normal outcome, represented as
//! `data: None` plus an empty match collection. Remote or parse failures are
//! raised as errors instead and never collapse into an empty result.

use crate::dataset::data::SetupData;
use crate::lookup::table::LookupTable;
use crate::types::setup::Setup;
use serde::{Deserialize, Serialize};

/// Outcome of a nearest-neighbor search against the coordinate index.
///
/// `distance_deg` is the planar Euclidean distance in raw lat/lon degrees
/// between the query point and the matched grid cell, mirroring the metric
/// the published lookup table was built for. It is not a geodesic distance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NearestGid {
    /// Grid cell identifier of the closest row.
    pub gid: i64,
    /// Euclidean distance in degrees to the matched row.
    pub distance_deg: f64,
    /// Latitude of the matched row.
    pub latitude: f64,
    /// Longitude of the matched row.
    pub longitude: f64,
}

/// A selection against a single setup.
///
/// `matched_gids` follows the dataset's native gid ordering, not the order the
/// gids were requested in, and always agrees exactly with the gid coordinate
/// of `data`.
#[derive(Debug, Clone, PartialEq)]
pub struct GidSelection {
    /// The selected subset, or `None` when no requested gid was present.
    pub data: Option<SetupData>,
    /// The gids that were actually found, in dataset order.
    pub matched_gids: Vec<i64>,
}

impl GidSelection {
    pub(crate) fn empty() -> Self {
        Self {
            data: None,
            matched_gids: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_none()
    }
}

/// A selection merged across several setups along a new `setup` dimension.
#[derive(Debug, Clone, PartialEq)]
pub struct MultiGidSelection {
    /// The merged subset, or `None` when every setup came up empty.
    pub data: Option<SetupData>,
    /// Per-setup matched gids, in input setup order. Setups that produced no
    /// match carry no entry here, mirroring their absence from `data`.
    pub matched_gids: Vec<(Setup, Vec<i64>)>,
}

impl MultiGidSelection {
    pub(crate) fn empty() -> Self {
        Self {
            data: None,
            matched_gids: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_none()
    }

    /// Matched gids for one setup, if that setup contributed to the result.
    pub fn matched_for(&self, setup: Setup) -> Option<&[i64]> {
        self.matched_gids
            .iter()
            .find(|(s, _)| *s == setup)
            .map(|(_, gids)| gids.as_slice())
    }
}

/// Selection resolved from a coordinate via the nearest grid cell.
///
/// The nearest-gid resolution is reported even when the selection itself is
/// empty (the resolved gid may be absent from the requested setup).
#[derive(Debug, Clone, PartialEq)]
pub struct LocationSelection {
    pub nearest: NearestGid,
    pub selection: GidSelection,
}

/// Multi-setup variant of [`LocationSelection`].
#[derive(Debug, Clone, PartialEq)]
pub struct LocationMultiSelection {
    pub nearest: NearestGid,
    pub selection: MultiGidSelection,
}

/// Selection of every grid cell inside a bounding box.
///
/// `rows` holds the lookup-table rows that fell inside the box so the caller
/// can inspect which coordinates were included; it is `None` when the box
/// matched no rows at all (in which case no store is opened).
#[derive(Debug, Clone, PartialEq)]
pub struct BoundingBoxSelection {
    pub rows: Option<LookupTable>,
    pub selection: GidSelection,
}

/// Multi-setup variant of [`BoundingBoxSelection`].
#[derive(Debug, Clone, PartialEq)]
pub struct BoundingBoxMultiSelection {
    pub rows: Option<LookupTable>,
    pub selection: MultiGidSelection,
}

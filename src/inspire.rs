//! This module provides the main entry point for accessing the InSPIRE
//! agrivoltaics irradiance datasets on the Open Energy Data Initiative (OEDI)
//! data lake. Data can be selected by grid cell identifier, by geographic
//! coordinate (resolved through the published lookup table), or by bounding
//! box, against one setup or merged across several.

use crate::dataset::data::SetupData;
use crate::dataset::opener::DatasetOpener;
use crate::dataset::zarr::{ZarrOpener, DEFAULT_BUCKET, DEFAULT_PREFIX, DEFAULT_REGION};
use crate::error::InspireError;
use crate::lookup::table::LookupTable;
use crate::types::geo::{BoundingBox, LatLon};
use crate::types::selection::{
    BoundingBoxMultiSelection, BoundingBoxSelection, GidSelection, LocationMultiSelection,
    LocationSelection, MultiGidSelection, NearestGid,
};
use crate::types::setup::Setup;
use bon::bon;
use log::info;
use reqwest::Client;
use std::borrow::Cow;
use std::sync::Arc;

/// File name of the coordinate index published next to the stores.
const LOOKUP_TABLE_FILE: &str = "gid-lat-lon.csv";

/// The main client struct for accessing InSPIRE irradiance data.
///
/// The client holds no state beyond its connection handles: nothing is cached
/// between calls. The lookup table in particular is re-downloaded by every
/// method that needs it, unless the caller loads it once via
/// [`Inspire::lookup_table`] and passes it back in through the `lookup`
/// builder argument.
///
/// Create an instance with [`Inspire::new()`] for the public OEDI release, or
/// [`Inspire::for_location()`] to point it at a mirror.
///
/// # Examples
///
/// ```rust
/// # use inspire_oedi::{Inspire, InspireError, LatLon, Setup};
/// # async fn run() -> Result<(), InspireError> {
/// let client = Inspire::new()?;
/// let selection = client
///     .from_location()
///     .location(LatLon(39.7, -105.2))
///     .setup(Setup::new(1))
///     .call()
///     .await?;
/// println!("nearest grid cell: {}", selection.nearest.gid);
/// # Ok(())
/// # }
/// ```
pub struct Inspire {
    opener: Arc<dyn DatasetOpener>,
    http: Client,
    lookup_url: String,
}

#[bon]
impl Inspire {
    /// Creates a client for the public OEDI data lake release.
    ///
    /// Access is anonymous; no credentials are read or sent.
    ///
    /// # Errors
    ///
    /// Returns [`InspireError::Dataset`] if the S3 store configuration is
    /// rejected. This does not perform any network I/O.
    pub fn new() -> Result<Self, InspireError> {
        Self::for_location(DEFAULT_BUCKET, DEFAULT_PREFIX, DEFAULT_REGION)
    }

    /// Creates a client against another bucket and release prefix.
    ///
    /// Useful for mirrors of the published stores or for test buckets laid
    /// out the same way. The lookup table is expected at
    /// `{prefix}/gid-lat-lon.csv` inside the bucket.
    pub fn for_location(bucket: &str, prefix: &str, region: &str) -> Result<Self, InspireError> {
        let prefix = prefix.trim_matches('/');
        let opener = ZarrOpener::with_location(bucket, prefix, region)?;
        Ok(Self {
            opener: Arc::new(opener),
            http: Client::new(),
            lookup_url: format!("https://{bucket}.s3.amazonaws.com/{prefix}/{LOOKUP_TABLE_FILE}"),
        })
    }

    /// Creates a client backed by a custom dataset source.
    ///
    /// The lookup table URL stays pointed at the public release; pass loaded
    /// tables through the `lookup` builder argument to avoid touching it.
    pub fn with_opener(opener: Arc<dyn DatasetOpener>) -> Self {
        Self {
            opener,
            http: Client::new(),
            lookup_url: format!(
                "https://{DEFAULT_BUCKET}.s3.amazonaws.com/{DEFAULT_PREFIX}/{LOOKUP_TABLE_FILE}"
            ),
        }
    }

    /// Downloads the gid/lat/lon lookup table.
    ///
    /// Call this once and pass the result into the `lookup` argument of the
    /// coordinate-based methods to skip the repeated download.
    ///
    /// # Errors
    ///
    /// Returns [`InspireError::Lookup`] on network failure, a non-success
    /// HTTP status, or malformed CSV content.
    pub async fn lookup_table(&self) -> Result<LookupTable, InspireError> {
        Ok(LookupTable::fetch(&self.http, &self.lookup_url).await?)
    }

    /// Resolves the grid cell closest to a coordinate.
    ///
    /// Distance is planar Euclidean on raw latitude/longitude degrees, the
    /// same metric the lookup table was built for. Ties keep the
    /// first-occurring table row.
    ///
    /// # Arguments
    ///
    /// * `.location(LatLon)`: **Required.** The query coordinate.
    /// * `.lookup(&LookupTable)`: Optional. A previously loaded table; when
    ///   absent the table is downloaded first.
    ///
    /// # Errors
    ///
    /// Returns [`InspireError::Lookup`] if the table cannot be loaded or has
    /// no usable rows.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use inspire_oedi::{Inspire, InspireError, LatLon};
    /// # async fn run() -> Result<(), InspireError> {
    /// let client = Inspire::new()?;
    /// let lookup = client.lookup_table().await?;
    /// let nearest = client
    ///     .nearest_gid()
    ///     .location(LatLon(39.7, -105.2))
    ///     .lookup(&lookup)
    ///     .call()
    ///     .await?;
    /// println!("gid {} at {:.1} degrees", nearest.gid, nearest.distance_deg);
    /// # Ok(())
    /// # }
    /// ```
    #[builder]
    pub async fn nearest_gid(
        &self,
        location: LatLon,
        lookup: Option<&LookupTable>,
    ) -> Result<NearestGid, InspireError> {
        let lookup = self.resolve_lookup(lookup).await?;
        Ok(lookup.nearest(location.0, location.1)?)
    }

    /// Selects grid cells from one setup by identifier.
    ///
    /// The result keeps the dataset's native gid ordering regardless of the
    /// request order; identifiers absent from the store are silently dropped.
    /// When nothing matches, the selection is empty rather than an error.
    ///
    /// # Arguments
    ///
    /// * `.setup(Setup)`: **Required.** The setup whose store to read.
    /// * `.gids(&[i64])`: **Required.** The grid cell identifiers to select.
    ///
    /// # Errors
    ///
    /// Returns [`InspireError::Dataset`] if the store cannot be opened or
    /// read.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use inspire_oedi::{Inspire, InspireError, Setup};
    /// # async fn run() -> Result<(), InspireError> {
    /// let client = Inspire::new()?;
    /// let selection = client
    ///     .from_gids()
    ///     .setup(Setup::new(3))
    ///     .gids(&[100489, 100490])
    ///     .call()
    ///     .await?;
    /// if let Some(data) = &selection.data {
    ///     println!("got {} variables", data.variables().len());
    /// }
    /// # Ok(())
    /// # }
    /// ```
    #[builder]
    pub async fn from_gids(
        &self,
        setup: Setup,
        gids: &[i64],
    ) -> Result<GidSelection, InspireError> {
        self.select_one(setup, gids).await
    }

    /// Selects grid cells by identifier across several setups.
    ///
    /// Each setup is read independently and the per-setup results are merged
    /// along a new leading `setup` dimension. Setups with no matching gid are
    /// left out of the merged data and the match mapping. When the matched
    /// sets differ between setups, the merged gid axis is their union and the
    /// missing cells are filled with NaN.
    #[builder]
    pub async fn from_gids_multi(
        &self,
        setups: &[Setup],
        gids: &[i64],
    ) -> Result<MultiGidSelection, InspireError> {
        self.select_many(setups, gids).await
    }

    /// Selects the grid cell nearest to a coordinate from one setup.
    ///
    /// Resolves the coordinate through the lookup table, then selects the
    /// resolved gid. The nearest-gid resolution is reported even when the gid
    /// turns out to be absent from the requested setup's store.
    ///
    /// # Arguments
    ///
    /// * `.location(LatLon)`: **Required.** The query coordinate.
    /// * `.setup(Setup)`: **Required.** The setup whose store to read.
    /// * `.lookup(&LookupTable)`: Optional. A previously loaded table.
    #[builder]
    pub async fn from_location(
        &self,
        location: LatLon,
        setup: Setup,
        lookup: Option<&LookupTable>,
    ) -> Result<LocationSelection, InspireError> {
        let lookup = self.resolve_lookup(lookup).await?;
        let nearest = lookup.nearest(location.0, location.1)?;
        info!(
            "Resolved ({}, {}) to gid {} at {:.4} degrees",
            location.0, location.1, nearest.gid, nearest.distance_deg
        );
        let selection = self.select_one(setup, &[nearest.gid]).await?;
        Ok(LocationSelection { nearest, selection })
    }

    /// Multi-setup variant of [`Inspire::from_location`].
    #[builder]
    pub async fn from_location_multi(
        &self,
        location: LatLon,
        setups: &[Setup],
        lookup: Option<&LookupTable>,
    ) -> Result<LocationMultiSelection, InspireError> {
        let lookup = self.resolve_lookup(lookup).await?;
        let nearest = lookup.nearest(location.0, location.1)?;
        let selection = self.select_many(setups, &[nearest.gid]).await?;
        Ok(LocationMultiSelection { nearest, selection })
    }

    /// Selects every grid cell inside a bounding box from one setup.
    ///
    /// All four box edges are inclusive. The returned `rows` carry the
    /// lookup-table rows that fell inside the box; when the box matches no
    /// rows at all, `rows` is `None` and no store is opened.
    ///
    /// # Arguments
    ///
    /// * `.bounds(BoundingBox)`: **Required.** The latitude/longitude box.
    /// * `.setup(Setup)`: **Required.** The setup whose store to read.
    /// * `.lookup(&LookupTable)`: Optional. A previously loaded table.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use inspire_oedi::{BoundingBox, Inspire, InspireError, Setup};
    /// # async fn run() -> Result<(), InspireError> {
    /// let client = Inspire::new()?;
    /// let selection = client
    ///     .from_bounding_box()
    ///     .bounds(BoundingBox::new(39.5, 40.0, -105.5, -105.0))
    ///     .setup(Setup::new(1))
    ///     .call()
    ///     .await?;
    /// println!("{} grid cells matched", selection.selection.matched_gids.len());
    /// # Ok(())
    /// # }
    /// ```
    #[builder]
    pub async fn from_bounding_box(
        &self,
        bounds: BoundingBox,
        setup: Setup,
        lookup: Option<&LookupTable>,
    ) -> Result<BoundingBoxSelection, InspireError> {
        let lookup = self.resolve_lookup(lookup).await?;
        let rows = lookup.within_bounds(&bounds)?;
        if rows.is_empty() {
            return Ok(BoundingBoxSelection {
                rows: None,
                selection: GidSelection::empty(),
            });
        }
        let gids = rows.gids()?;
        info!("Bounding box matched {} grid cells", gids.len());
        let selection = self.select_one(setup, &gids).await?;
        Ok(BoundingBoxSelection {
            rows: Some(rows),
            selection,
        })
    }

    /// Multi-setup variant of [`Inspire::from_bounding_box`].
    #[builder]
    pub async fn from_bounding_box_multi(
        &self,
        bounds: BoundingBox,
        setups: &[Setup],
        lookup: Option<&LookupTable>,
    ) -> Result<BoundingBoxMultiSelection, InspireError> {
        let lookup = self.resolve_lookup(lookup).await?;
        let rows = lookup.within_bounds(&bounds)?;
        if rows.is_empty() {
            return Ok(BoundingBoxMultiSelection {
                rows: None,
                selection: MultiGidSelection::empty(),
            });
        }
        let gids = rows.gids()?;
        let selection = self.select_many(setups, &gids).await?;
        Ok(BoundingBoxMultiSelection {
            rows: Some(rows),
            selection,
        })
    }

    async fn resolve_lookup<'a>(
        &self,
        lookup: Option<&'a LookupTable>,
    ) -> Result<Cow<'a, LookupTable>, InspireError> {
        match lookup {
            Some(table) => Ok(Cow::Borrowed(table)),
            None => Ok(Cow::Owned(
                LookupTable::fetch(&self.http, &self.lookup_url).await?,
            )),
        }
    }

    async fn select_one(&self, setup: Setup, gids: &[i64]) -> Result<GidSelection, InspireError> {
        let dataset = self.opener.open(setup).await?;
        let (data, matched_gids) = dataset.select(gids)?;
        Ok(GidSelection { data, matched_gids })
    }

    async fn select_many(
        &self,
        setups: &[Setup],
        gids: &[i64],
    ) -> Result<MultiGidSelection, InspireError> {
        let mut parts = Vec::with_capacity(setups.len());
        let mut matched = Vec::with_capacity(setups.len());
        for &setup in setups {
            let dataset = self.opener.open(setup).await?;
            let (data, matched_gids) = dataset.select(gids)?;
            if let Some(data) = data {
                parts.push((setup, data));
                matched.push((setup, matched_gids));
            }
        }

        if parts.is_empty() {
            return Ok(MultiGidSelection::empty());
        }
        let data = SetupData::stack_setups(parts)?;
        Ok(MultiGidSelection {
            data: Some(data),
            matched_gids: matched,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::data::{GID_DIM, SETUP_DIM};
    use crate::dataset::memory::{MemoryDataset, MemoryOpener};
    use polars::prelude::df;

    fn two_setup_client() -> Inspire {
        // setup 1 holds gids 1..3, setup 2 holds 2, 3 and 5
        let one = MemoryDataset::new(vec![1, 2, 3]).with_variable(
            "ghi",
            &[GID_DIM],
            ndarray::array![1.0, 2.0, 3.0].into_dyn(),
        );
        let two = MemoryDataset::new(vec![2, 3, 5]).with_variable(
            "ghi",
            &[GID_DIM],
            ndarray::array![20.0, 30.0, 50.0].into_dyn(),
        );
        let opener = MemoryOpener::new()
            .with_dataset(Setup::new(1), one)
            .with_dataset(Setup::new(2), two);
        Inspire::with_opener(Arc::new(opener))
    }

    fn sample_lookup() -> LookupTable {
        let df = df!(
            "gid" => [1i64, 2, 3, 5],
            "latitude" => [10.0, 11.0, 12.0, 13.0],
            "longitude" => [20.0, 21.0, 22.0, 23.0],
        )
        .unwrap();
        LookupTable::from_dataframe(df).unwrap()
    }

    #[tokio::test]
    async fn from_gids_keeps_dataset_order() {
        let client = two_setup_client();
        let selection = client
            .from_gids()
            .setup(Setup::new(1))
            .gids(&[3, 1, 99])
            .call()
            .await
            .unwrap();

        assert_eq!(selection.matched_gids, vec![1, 3]);
        let data = selection.data.unwrap();
        assert_eq!(data.gids(), &[1, 3]);
        let ghi = data.variable("ghi").unwrap();
        assert_eq!(ghi.values()[[0]], 1.0);
        assert_eq!(ghi.values()[[1]], 3.0);
    }

    #[tokio::test]
    async fn from_gids_with_no_match_is_empty() {
        let client = two_setup_client();
        let selection = client
            .from_gids()
            .setup(Setup::new(1))
            .gids(&[98, 99])
            .call()
            .await
            .unwrap();

        assert!(selection.is_empty());
        assert!(selection.matched_gids.is_empty());
    }

    #[tokio::test]
    async fn multi_setup_merge_pads_missing_gids_with_nan() {
        let client = two_setup_client();
        let selection = client
            .from_gids_multi()
            .setups(&[Setup::new(1), Setup::new(2)])
            .gids(&[2, 5])
            .call()
            .await
            .unwrap();

        assert_eq!(
            selection.matched_gids,
            vec![(Setup::new(1), vec![2]), (Setup::new(2), vec![2, 5])]
        );

        let data = selection.data.unwrap();
        assert_eq!(data.setups(), &[Setup::new(1), Setup::new(2)]);
        assert_eq!(data.gids(), &[2, 5]);

        let ghi = data.variable("ghi").unwrap();
        assert_eq!(ghi.dims(), &[SETUP_DIM, GID_DIM]);
        assert_eq!(ghi.values()[[0, 0]], 2.0);
        assert!(ghi.values()[[0, 1]].is_nan());
        assert_eq!(ghi.values()[[1, 0]], 20.0);
        assert_eq!(ghi.values()[[1, 1]], 50.0);
    }

    #[tokio::test]
    async fn setups_without_matches_are_left_out_of_the_merge() {
        let client = two_setup_client();
        let selection = client
            .from_gids_multi()
            .setups(&[Setup::new(1), Setup::new(2)])
            .gids(&[5])
            .call()
            .await
            .unwrap();

        // setup 1 has no gid 5, so only setup 2 appears anywhere
        assert_eq!(selection.matched_gids, vec![(Setup::new(2), vec![5])]);
        assert_eq!(selection.matched_for(Setup::new(1)), None);

        let data = selection.data.unwrap();
        assert_eq!(data.setups(), &[Setup::new(2)]);
        assert_eq!(data.gids(), &[5]);
    }

    #[tokio::test]
    async fn all_setups_empty_yields_an_empty_selection() {
        let client = two_setup_client();
        let selection = client
            .from_gids_multi()
            .setups(&[Setup::new(1), Setup::new(2)])
            .gids(&[99])
            .call()
            .await
            .unwrap();

        assert!(selection.is_empty());
        assert!(selection.matched_gids.is_empty());
    }

    #[tokio::test]
    async fn from_location_resolves_through_the_lookup_table() {
        let client = two_setup_client();
        let lookup = sample_lookup();

        let selection = client
            .from_location()
            .location(LatLon(11.1, 21.1))
            .setup(Setup::new(1))
            .lookup(&lookup)
            .call()
            .await
            .unwrap();

        assert_eq!(selection.nearest.gid, 2);
        assert_eq!(selection.selection.matched_gids, vec![2]);
    }

    #[tokio::test]
    async fn from_location_reports_nearest_even_when_setup_lacks_the_gid() {
        let client = two_setup_client();
        let lookup = sample_lookup();

        // gid 5 exists in the lookup table but not in setup 1
        let selection = client
            .from_location()
            .location(LatLon(13.0, 23.0))
            .setup(Setup::new(1))
            .lookup(&lookup)
            .call()
            .await
            .unwrap();

        assert_eq!(selection.nearest.gid, 5);
        assert!(selection.selection.is_empty());
    }

    #[tokio::test]
    async fn bounding_box_selects_the_contained_grid_cells() {
        let client = two_setup_client();
        let lookup = sample_lookup();

        let selection = client
            .from_bounding_box()
            .bounds(BoundingBox::new(10.5, 12.0, 20.5, 22.0))
            .setup(Setup::new(1))
            .lookup(&lookup)
            .call()
            .await
            .unwrap();

        let rows = selection.rows.unwrap();
        assert_eq!(rows.gids().unwrap(), vec![2, 3]);
        assert_eq!(selection.selection.matched_gids, vec![2, 3]);
    }

    #[tokio::test]
    async fn empty_bounding_box_opens_no_store() {
        let client = two_setup_client();
        let lookup = sample_lookup();

        let selection = client
            .from_bounding_box()
            .bounds(BoundingBox::new(-10.0, -5.0, 0.0, 5.0))
            .setup(Setup::new(1))
            .lookup(&lookup)
            .call()
            .await
            .unwrap();

        assert!(selection.rows.is_none());
        assert!(selection.selection.is_empty());
    }

    #[tokio::test]
    async fn bounding_box_multi_merges_across_setups() {
        let client = two_setup_client();
        let lookup = sample_lookup();

        let selection = client
            .from_bounding_box_multi()
            .bounds(BoundingBox::new(10.5, 13.0, 20.5, 23.0))
            .setups(&[Setup::new(1), Setup::new(2)])
            .lookup(&lookup)
            .call()
            .await
            .unwrap();

        // box contains gids 2, 3 and 5; setup 1 only holds 2 and 3
        assert_eq!(
            selection.selection.matched_gids,
            vec![
                (Setup::new(1), vec![2, 3]),
                (Setup::new(2), vec![2, 3, 5]),
            ]
        );
        let data = selection.selection.data.unwrap();
        assert_eq!(data.gids(), &[2, 3, 5]);
    }

    #[tokio::test]
    async fn unknown_setup_is_an_error_not_an_empty_result() {
        let client = two_setup_client();
        let result = client
            .from_gids()
            .setup(Setup::new(9))
            .gids(&[1])
            .call()
            .await;

        assert!(matches!(result, Err(InspireError::Dataset(_))));
    }
}

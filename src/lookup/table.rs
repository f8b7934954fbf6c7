//! The GID/lat/lon coordinate index published next to the irradiance stores.
//!
//! The table is one flat CSV mapping every grid cell identifier to its
//! latitude and longitude. It is small enough to scan linearly, and it is
//! reloaded on every call unless the caller passes a previously loaded table
//! back in; that explicit hand-off is the only caching in the library.

use crate::lookup::error::LookupError;
use crate::types::geo::BoundingBox;
use crate::types::selection::NearestGid;
use log::info;
use polars::prelude::*;
use reqwest::Client;
use std::io::Write;
use tempfile::NamedTempFile;
use tokio::task;

/// Name of the grid cell identifier column after loading.
pub const GID_COLUMN: &str = "gid";
const LATITUDE_COLUMN: &str = "latitude";
const LONGITUDE_COLUMN: &str = "longitude";

/// In-memory copy of the coordinate index.
///
/// Wraps a polars [`DataFrame`] with columns `gid`, `latitude` and
/// `longitude`. The table is immutable after load; every query borrows it
/// read-only, so a single instance can be shared across calls freely.
#[derive(Debug, Clone, PartialEq)]
pub struct LookupTable {
    df: DataFrame,
}

impl LookupTable {
    /// Downloads and parses the lookup table CSV.
    pub(crate) async fn fetch(client: &Client, url: &str) -> Result<Self, LookupError> {
        info!("Downloading lookup table from {}", url);

        let response = client
            .get(url)
            .send()
            .await
            .map_err(|e| LookupError::NetworkRequest(url.to_string(), e))?;

        let response = match response.error_for_status() {
            Ok(resp) => resp,
            Err(e) => {
                return Err(if let Some(status) = e.status() {
                    LookupError::HttpStatus {
                        url: url.to_string(),
                        status,
                        source: e,
                    }
                } else {
                    LookupError::NetworkRequest(url.to_string(), e)
                });
            }
        };

        let bytes = response
            .bytes()
            .await
            .map_err(|e| LookupError::NetworkRequest(url.to_string(), e))?;
        info!("Downloaded lookup table ({} bytes)", bytes.len());

        let df = Self::csv_to_dataframe(bytes.to_vec()).await?;
        Self::from_dataframe(df)
    }

    /// Parses raw CSV bytes into a DataFrame using a blocking task.
    async fn csv_to_dataframe(bytes: Vec<u8>) -> Result<DataFrame, LookupError> {
        task::spawn_blocking(move || {
            let mut temp_file = NamedTempFile::new().map_err(LookupError::CsvReadIo)?;
            temp_file.write_all(&bytes).map_err(LookupError::CsvReadIo)?;
            temp_file.flush().map_err(LookupError::CsvReadIo)?;

            CsvReadOptions::default()
                .with_has_header(true)
                .try_into_reader_with_file_path(Some(temp_file.path().to_path_buf()))
                .map_err(LookupError::CsvReadPolars)?
                .finish()
                .map_err(LookupError::CsvReadPolars)
        })
        .await?
    }

    /// Wraps an already-loaded table.
    ///
    /// The first column is taken as the grid cell identifier and renamed to
    /// `gid` if it carries another name. `latitude` and `longitude` columns
    /// must be present. Uniqueness of the identifiers is not validated.
    pub fn from_dataframe(mut df: DataFrame) -> Result<Self, LookupError> {
        let first = df
            .get_column_names_owned()
            .first()
            .cloned()
            .ok_or_else(|| LookupError::MissingColumn(GID_COLUMN.to_string()))?;
        if first.as_str() != GID_COLUMN {
            df.rename(first.as_str(), GID_COLUMN.into())?;
        }
        for column in [LATITUDE_COLUMN, LONGITUDE_COLUMN] {
            if df.column(column).is_err() {
                return Err(LookupError::MissingColumn(column.to_string()));
            }
        }
        Ok(Self { df })
    }

    /// Finds the grid cell closest to the given coordinate.
    ///
    /// Linear scan over the whole table using planar Euclidean distance on raw
    /// degrees. Ties keep the first-occurring row in table order.
    ///
    /// # Errors
    ///
    /// Returns [`LookupError::EmptyIndex`] when the table has no usable rows.
    pub fn nearest(&self, latitude: f64, longitude: f64) -> Result<NearestGid, LookupError> {
        if self.df.height() == 0 {
            return Err(LookupError::EmptyIndex);
        }

        let lat = self.f64_column(LATITUDE_COLUMN)?;
        let lon = self.f64_column(LONGITUDE_COLUMN)?;

        let mut best_row = None;
        let mut best_distance = f64::INFINITY;
        for row in 0..lat.len() {
            let (Some(row_lat), Some(row_lon)) = (lat.get(row), lon.get(row)) else {
                continue;
            };
            let d_lat = row_lat - latitude;
            let d_lon = row_lon - longitude;
            let distance = (d_lat * d_lat + d_lon * d_lon).sqrt();
            // strict `<` keeps the first-occurring row on ties
            if distance < best_distance {
                best_distance = distance;
                best_row = Some((row, row_lat, row_lon));
            }
        }

        let Some((row, row_lat, row_lon)) = best_row else {
            return Err(LookupError::EmptyIndex);
        };
        let gid = self
            .gid_column()?
            .get(row)
            .ok_or_else(|| LookupError::NullValue(row, GID_COLUMN.to_string()))?;

        Ok(NearestGid {
            gid,
            distance_deg: best_distance,
            latitude: row_lat,
            longitude: row_lon,
        })
    }

    /// Returns the rows falling inside the bounding box, all edges inclusive.
    ///
    /// An empty result is a valid table with zero rows, not an error.
    pub fn within_bounds(&self, bounds: &BoundingBox) -> Result<LookupTable, LookupError> {
        let lat = self.f64_column(LATITUDE_COLUMN)?;
        let lon = self.f64_column(LONGITUDE_COLUMN)?;

        let mask = lat.gt_eq(bounds.lat_min)
            & lat.lt_eq(bounds.lat_max)
            & lon.gt_eq(bounds.lon_min)
            & lon.lt_eq(bounds.lon_max);

        let df = self.df.filter(&mask)?;
        Ok(LookupTable { df })
    }

    /// All grid cell identifiers, in table order.
    pub fn gids(&self) -> Result<Vec<i64>, LookupError> {
        let gid = self.gid_column()?;
        Ok((0..gid.len()).filter_map(|row| gid.get(row)).collect())
    }

    pub fn len(&self) -> usize {
        self.df.height()
    }

    pub fn is_empty(&self) -> bool {
        self.df.height() == 0
    }

    /// Borrow of the underlying DataFrame for ad hoc inspection.
    pub fn dataframe(&self) -> &DataFrame {
        &self.df
    }

    fn f64_column(&self, name: &str) -> Result<Float64Chunked, LookupError> {
        let column = self
            .df
            .column(name)
            .map_err(|_| LookupError::MissingColumn(name.to_string()))?;
        Ok(column
            .cast(&DataType::Float64)?
            .as_materialized_series()
            .f64()?
            .clone())
    }

    fn gid_column(&self) -> Result<Int64Chunked, LookupError> {
        let column = self
            .df
            .column(GID_COLUMN)
            .map_err(|_| LookupError::MissingColumn(GID_COLUMN.to_string()))?;
        Ok(column
            .cast(&DataType::Int64)?
            .as_materialized_series()
            .i64()?
            .clone())
    }
}

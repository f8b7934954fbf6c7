use serde::{Deserialize, Serialize};

/// Represents a geographical coordinate using latitude and longitude.
///
/// Latitude is the first element (index 0), and longitude is the second (index 1).
/// Both values are represented as `f64` degrees.
///
/// # Examples
///
/// ```
/// use inspire_oedi::LatLon;
///
/// let golden_co = LatLon(39.7555, -105.2211);
/// assert_eq!(golden_co.0, 39.7555); // Latitude
/// assert_eq!(golden_co.1, -105.2211); // Longitude
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLon(pub f64, pub f64);

/// Rectangular latitude/longitude region used to filter the coordinate index.
///
/// All four bounds are inclusive: a grid cell lying exactly on an edge is
/// considered inside the box.
///
/// # Examples
///
/// ```
/// use inspire_oedi::{BoundingBox, LatLon};
///
/// let bounds = BoundingBox::new(39.0, 40.0, -106.0, -105.0);
/// assert!(bounds.contains(LatLon(39.0, -105.0)));
/// assert!(!bounds.contains(LatLon(40.5, -105.5)));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub lat_min: f64,
    pub lat_max: f64,
    pub lon_min: f64,
    pub lon_max: f64,
}

impl BoundingBox {
    pub fn new(lat_min: f64, lat_max: f64, lon_min: f64, lon_max: f64) -> Self {
        Self {
            lat_min,
            lat_max,
            lon_min,
            lon_max,
        }
    }

    pub fn contains(&self, point: LatLon) -> bool {
        point.0 >= self.lat_min
            && point.0 <= self.lat_max
            && point.1 >= self.lon_min
            && point.1 <= self.lon_max
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounding_box_edges_are_inclusive() {
        let bounds = BoundingBox::new(10.0, 20.0, 30.0, 40.0);
        assert!(bounds.contains(LatLon(10.0, 35.0)));
        assert!(bounds.contains(LatLon(20.0, 35.0)));
        assert!(bounds.contains(LatLon(15.0, 30.0)));
        assert!(bounds.contains(LatLon(15.0, 40.0)));
        assert!(!bounds.contains(LatLon(9.999, 35.0)));
        assert!(!bounds.contains(LatLon(15.0, 40.001)));
    }
}

use geo::{Distance, Haversine, Point};
use serde::{Deserialize, Serialize};

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    fn to_point(self) -> Point<f64> {
        // geo works in (x, y) = (lon, lat)
        Point::new(self.lon, self.lat)
    }

    /// Great-circle distance in kilometres.
    pub fn distance_km(&self, other: &GeoPoint) -> f64 {
        Haversine::distance(self.to_point(), other.to_point()) / 1000.0
    }
}

/// Distance in km from `point` to the closest candidate, `None` when there are no candidates.
pub fn nearest_distance(point: GeoPoint, candidates: &[GeoPoint]) -> Option<f64> {
    let mut closest: Option<f64> = None;
    for candidate in candidates {
        let dist = point.distance_km(candidate);
        if closest.map(|x| dist < x).unwrap_or(true) {
            closest = Some(dist);
        }
    }
    closest
}

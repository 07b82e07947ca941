use serde::{Deserialize, Serialize};

use crate::distance::GeoPoint;

/// One scraped row, every field still text. Columns without a field of their
/// own land in `extra`, except the ones in [`DROPPED_RAW_COLUMNS`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawListing {
    #[serde(rename = "type")]
    pub property_type: Option<String>,
    pub price: Option<String>,
    pub district: Option<String>,
    pub address: Option<String>,
    pub road: Option<String>,
    pub tenure: Option<String>,
    pub bedroom: Option<String>,
    pub area: Option<String>,
    pub land: Option<String>,
    pub psf: Option<String>,
    pub latlon: Option<String>,

    pub first_p_school: Option<String>,
    pub first_p_school_dist: Option<String>,
    pub sec_p_school: Option<String>,
    pub sec_p_school_dist: Option<String>,
    pub third_p_school: Option<String>,
    pub third_p_school_dist: Option<String>,

    pub first_i_school: Option<String>,
    pub first_i_school_dist: Option<String>,
    pub sec_i_school: Option<String>,
    pub sec_i_school_dist: Option<String>,
    pub third_i_school: Option<String>,
    pub third_i_school_dist: Option<String>,

    pub first_mrt_name: Option<String>,
    pub first_mrt_dist: Option<String>,
    pub sec_mrt_name: Option<String>,
    pub sec_mrt_dist: Option<String>,
    pub third_mrt_name: Option<String>,
    pub third_mrt_dist: Option<String>,

    /// Remaining scraped columns as `(header, value)`, in header order.
    #[serde(skip)]
    pub extra: Vec<(String, String)>,
}

/// Columns that must be present in the raw header.
pub const REQUIRED_RAW_COLUMNS: [&str; 3] = ["type", "price", "district"];

/// Scraped columns with no use downstream.
pub const DROPPED_RAW_COLUMNS: [&str; 5] = ["title", "description", "condition", "code", "bathroom"];

const FIELD_RAW_COLUMNS: [&str; 11] = [
    "type", "price", "district", "address", "road", "tenure", "bedroom", "area", "land", "psf",
    "latlon",
];

/// Whether a raw header is read into a [`RawListing`] field of its own.
pub fn is_field_column(header: &str) -> bool {
    FIELD_RAW_COLUMNS.contains(&header)
        || EntityKind::ALL
            .iter()
            .any(|k| k.columns().iter().any(|(name, dist)| *name == header || *dist == header))
}

/// The three closest entities of one kind, as listed on the scraped page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NearestEntities {
    pub names: [Option<String>; 3],
    pub dists: [Option<f64>; 3],
}

impl NearestEntities {
    pub fn first(&self) -> Option<&str> {
        self.names[0].as_deref()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().filter_map(|n| n.as_deref())
    }

    /// How many of the listed entities sit within `radius_km`. Missing distances don't count.
    pub fn count_within(&self, radius_km: f64) -> u32 {
        self.dists
            .iter()
            .filter(|d| d.map(|d| d <= radius_km).unwrap_or(false))
            .count() as u32
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    PrimarySchool,
    InternationalSchool,
    Mrt,
}

impl EntityKind {
    pub const ALL: [EntityKind; 3] = [
        EntityKind::PrimarySchool,
        EntityKind::InternationalSchool,
        EntityKind::Mrt,
    ];

    /// Output column names as `(name, dist)` pairs for first/second/third.
    pub fn columns(&self) -> [(&'static str, &'static str); 3] {
        match self {
            EntityKind::PrimarySchool => [
                ("first_p_school", "first_p_school_dist"),
                ("sec_p_school", "sec_p_school_dist"),
                ("third_p_school", "third_p_school_dist"),
            ],
            EntityKind::InternationalSchool => [
                ("first_i_school", "first_i_school_dist"),
                ("sec_i_school", "sec_i_school_dist"),
                ("third_i_school", "third_i_school_dist"),
            ],
            EntityKind::Mrt => [
                ("first_mrt_name", "first_mrt_dist"),
                ("sec_mrt_name", "sec_mrt_dist"),
                ("third_mrt_name", "third_mrt_dist"),
            ],
        }
    }

    pub fn short_name(&self) -> &'static str {
        match self {
            EntityKind::PrimarySchool => "p_school",
            EntityKind::InternationalSchool => "i_school",
            EntityKind::Mrt => "mrt",
        }
    }
}

/// A cleaned listing. `price` and `district` are always present and
/// `property_type` is one of the configured allowed types.
#[derive(Debug, Clone, PartialEq)]
pub struct Listing {
    pub property_type: String,
    pub price: f64,
    pub district: String,
    pub address: Option<String>,
    pub road: Option<String>,
    pub tenure: Option<f64>,
    pub bedroom: Option<i64>,
    pub area: Option<f64>,
    pub psf: Option<f64>,
    pub location: Option<GeoPoint>,
    pub primary_schools: NearestEntities,
    pub international_schools: NearestEntities,
    pub mrt: NearestEntities,
    /// Scraped columns carried through as-is, blank values as `None`.
    pub extra: Vec<(String, Option<String>)>,
}

impl Listing {
    pub fn entities(&self, kind: EntityKind) -> &NearestEntities {
        match kind {
            EntityKind::PrimarySchool => &self.primary_schools,
            EntityKind::InternationalSchool => &self.international_schools,
            EntityKind::Mrt => &self.mrt,
        }
    }

    /// Renders the listing back into scraped-text form. Cleaning the result
    /// yields the same listing.
    pub fn to_raw(&self) -> RawListing {
        let num = |v: Option<f64>| v.map(|x| x.to_string());
        let pick = |e: &NearestEntities, i: usize| (e.names[i].clone(), num(e.dists[i]));

        let (first_p_school, first_p_school_dist) = pick(&self.primary_schools, 0);
        let (sec_p_school, sec_p_school_dist) = pick(&self.primary_schools, 1);
        let (third_p_school, third_p_school_dist) = pick(&self.primary_schools, 2);
        let (first_i_school, first_i_school_dist) = pick(&self.international_schools, 0);
        let (sec_i_school, sec_i_school_dist) = pick(&self.international_schools, 1);
        let (third_i_school, third_i_school_dist) = pick(&self.international_schools, 2);
        let (first_mrt_name, first_mrt_dist) = pick(&self.mrt, 0);
        let (sec_mrt_name, sec_mrt_dist) = pick(&self.mrt, 1);
        let (third_mrt_name, third_mrt_dist) = pick(&self.mrt, 2);

        RawListing {
            property_type: Some(self.property_type.clone()),
            price: Some(self.price.to_string()),
            district: Some(self.district.clone()),
            address: self.address.clone(),
            road: self.road.clone(),
            tenure: num(self.tenure),
            bedroom: self.bedroom.map(|b| b.to_string()),
            area: num(self.area),
            land: None,
            psf: num(self.psf),
            latlon: self.location.map(|p| format!("={},{}", p.lat, p.lon)),
            first_p_school,
            first_p_school_dist,
            sec_p_school,
            sec_p_school_dist,
            third_p_school,
            third_p_school_dist,
            first_i_school,
            first_i_school_dist,
            sec_i_school,
            sec_i_school_dist,
            third_i_school,
            third_i_school_dist,
            first_mrt_name,
            first_mrt_dist,
            sec_mrt_name,
            sec_mrt_dist,
            third_mrt_name,
            third_mrt_dist,
            extra: self
                .extra
                .iter()
                .map(|(k, v)| (k.clone(), v.clone().unwrap_or_default()))
                .collect(),
        }
    }

    pub fn extra_value(&self, column: &str) -> Option<&str> {
        self.extra
            .iter()
            .find(|(k, _)| k == column)
            .and_then(|(_, v)| v.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn count_within_ignores_missing() {
        let e = NearestEntities {
            names: [Some("a".into()), Some("b".into()), None],
            dists: [Some(0.4), Some(1.0), None],
        };
        assert_eq!(e.count_within(1.0), 2);
        assert_eq!(e.count_within(0.5), 1);
        assert_eq!(e.names().count(), 2);
        assert_eq!(e.first(), Some("a"));
    }

    #[test]
    fn field_columns_are_recognised() {
        assert!(is_field_column("type"));
        assert!(is_field_column("sec_mrt_dist"));
        assert!(!is_field_column("floor"));
        assert!(!is_field_column("bathroom"));
    }
}

use std::collections::{BTreeSet, HashMap, HashSet};

use tracing::{debug, info};

use crate::fuzzy::match_all;
use crate::geo_data::ReferenceTable;
use crate::listing::{EntityKind, Listing};
use crate::table::Value;

/// Listing-side entity name -> attributes of the matched reference row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityMap {
    pub attribute_names: Vec<String>,
    entries: HashMap<String, Vec<Value>>,
}

impl EntityMap {
    pub fn lookup(&self, name: Option<&str>) -> Option<&[Value]> {
        self.entries.get(name?).map(|v| v.as_slice())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Every distinct name mentioned in the first/second/third columns of `kind`, sorted.
pub fn distinct_names(listings: &[Listing], kind: EntityKind) -> Vec<String> {
    listings
        .iter()
        .flat_map(|l| l.entities(kind).names())
        .map(str::to_owned)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Fuzzy-matches `candidates` to `table` and keys the matched attributes by
/// candidate name. With `min_score` set, weaker matches are left unmapped.
pub fn map_by_similarity(candidates: &[String], table: &ReferenceTable, min_score: Option<u8>) -> EntityMap {
    let references = table.names();
    let mut entries = HashMap::with_capacity(candidates.len());
    let mut rejected = 0;

    for m in match_all(candidates, &references) {
        if min_score.map(|min| m.score < min).unwrap_or(false) {
            debug!("rejecting match '{}' -> '{}' (score {})", m.source, m.matched, m.score);
            rejected += 1;
            continue;
        }
        debug!("matched '{}' -> '{}' (score {})", m.source, m.matched, m.score);
        if let Some(row) = table.get(&m.matched) {
            entries.insert(m.source, row.values.clone());
        }
    }

    if rejected > 0 {
        info!("{} names matched below the minimum score and were left unmapped", rejected);
    }

    EntityMap {
        attribute_names: table.attribute_names.clone(),
        entries,
    }
}

pub fn map_primary_schools(listings: &[Listing], ranking: &ReferenceTable, min_score: Option<u8>) -> EntityMap {
    let names = distinct_names(listings, EntityKind::PrimarySchool);
    let map = map_by_similarity(&names, ranking, min_score);
    info!("mapped {} of {} primary school names", map.len(), names.len());
    map
}

pub fn map_transit(listings: &[Listing], stations: &ReferenceTable, min_score: Option<u8>) -> EntityMap {
    let names = distinct_names(listings, EntityKind::Mrt);
    let map = map_by_similarity(&names, stations, min_score);
    info!("mapped {} of {} station names", map.len(), names.len());
    map
}

/// Exact membership test against the top-school list, no fuzzy matching.
pub fn map_international_schools(listings: &[Listing], top_schools: &HashSet<String>) -> HashMap<String, bool> {
    let map: HashMap<String, bool> = distinct_names(listings, EntityKind::InternationalSchool)
        .into_iter()
        .map(|name| {
            let top = top_schools.contains(&name);
            (name, top)
        })
        .collect();
    info!(
        "{} of {} international school names are in the top list",
        map.values().filter(|v| **v).count(),
        map.len()
    );
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo_data::{build_transit_table, ReferenceRow, LINE_LABEL_COLUMN};
    use crate::listing::NearestEntities;

    fn listing(p: [Option<&str>; 3], i: [Option<&str>; 3], mrt: [Option<&str>; 3]) -> Listing {
        let entities = |names: [Option<&str>; 3]| NearestEntities {
            names: names.map(|n| n.map(str::to_owned)),
            dists: [None; 3],
        };
        Listing {
            property_type: "condominium".into(),
            price: 1.0,
            district: "D01".into(),
            address: None,
            road: None,
            tenure: None,
            bedroom: None,
            area: None,
            psf: None,
            location: None,
            primary_schools: entities(p),
            international_schools: entities(i),
            mrt: entities(mrt),
            extra: vec![],
        }
    }

    #[test]
    fn names_are_collected_from_all_three_columns() {
        let listings = vec![
            listing([Some("A"), Some("B"), None], [None; 3], [None; 3]),
            listing([Some("C"), None, Some("A")], [None; 3], [None; 3]),
        ];
        assert_eq!(distinct_names(&listings, EntityKind::PrimarySchool), vec!["A", "B", "C"]);
        assert!(distinct_names(&listings, EntityKind::Mrt).is_empty());
    }

    #[test]
    fn primary_schools_map_to_ranking_attributes() {
        let ranking = ReferenceTable {
            attribute_names: vec!["score".into()],
            rows: vec![
                ReferenceRow { name: "Nanyang Primary School".into(), values: vec![Value::Number(90.0)] },
                ReferenceRow { name: "Tao Nan School".into(), values: vec![Value::Number(80.0)] },
            ],
        };
        let listings = vec![listing(
            [Some("NANYANG PRIMARY SCH"), Some("Tao Nan Sch"), None],
            [None; 3],
            [None; 3],
        )];
        let map = map_primary_schools(&listings, &ranking, None);
        assert_eq!(map.lookup(Some("NANYANG PRIMARY SCH")), Some(&[Value::Number(90.0)][..]));
        assert_eq!(map.lookup(Some("Tao Nan Sch")), Some(&[Value::Number(80.0)][..]));
        assert_eq!(map.lookup(None), None);
    }

    #[test]
    fn min_score_leaves_weak_matches_unmapped() {
        let stations = build_transit_table(
            vec![("ORCHARD".to_owned(), "RED".to_owned())],
            "OTHERS",
            "MULTI",
        );
        let listings = vec![listing([None; 3], [None; 3], [Some("Orchard MRT"), Some("Xyz"), None])];

        let all = map_transit(&listings, &stations, None);
        assert_eq!(all.len(), 2);
        let label = stations.attribute_names.iter().position(|a| a == LINE_LABEL_COLUMN).unwrap();
        assert_eq!(all.lookup(Some("Xyz")).unwrap()[label], Value::Text("RED".into()));

        let strict = map_transit(&listings, &stations, Some(50));
        assert_eq!(strict.len(), 1);
        assert!(strict.lookup(Some("Xyz")).is_none());
    }

    #[test]
    fn international_schools_are_exact() {
        let top: HashSet<String> = ["Tanglin Trust School".to_owned()].into_iter().collect();
        let listings = vec![listing(
            [None; 3],
            [Some("Tanglin Trust School"), Some("tanglin trust school"), None],
            [None; 3],
        )];
        let map = map_international_schools(&listings, &top);
        assert_eq!(map.get("Tanglin Trust School"), Some(&true));
        assert_eq!(map.get("tanglin trust school"), Some(&false));
    }
}

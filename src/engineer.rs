use std::collections::{HashMap, HashSet};

use itertools::Itertools;
use tracing::info;

use crate::config::PipelineConfig;
use crate::distance::{nearest_distance, GeoPoint};
use crate::error::Result;
use crate::geo_data::{
    load_point_set, load_transit_lines, primary_school_table, read_csv_sheet, read_sheet,
    shop_locations, top_international_schools, ReferenceTable, LINE_LABEL_COLUMN,
};
use crate::listing::{EntityKind, Listing};
use crate::mapping::{map_international_schools, map_primary_schools, map_transit, EntityMap};
use crate::table::Value;

/// Descriptive text columns left out of the model table.
pub const TEXT_COLUMNS: [&str; 11] = [
    "address",
    "first_i_school",
    "sec_i_school",
    "third_i_school",
    "first_p_school",
    "sec_p_school",
    "third_p_school",
    "first_mrt_name",
    "sec_mrt_name",
    "third_mrt_name",
    "road",
];

/// Categorical columns with little value to the model.
pub const MODEL_DROPPED_COLUMNS: [&str; 4] = ["district", "type", "tenure", LINE_LABEL_COLUMN];

pub const IN_TOP_20_COLUMN: &str = "in_top_20";

/// Every auxiliary dataset, loaded once up front.
#[derive(Debug, Clone, Default)]
pub struct ReferenceData {
    pub primary_schools: ReferenceTable,
    pub top_international_schools: HashSet<String>,
    pub transit: ReferenceTable,
    pub shops: Vec<GeoPoint>,
    pub food_courts: Vec<GeoPoint>,
    pub supermarkets: Vec<GeoPoint>,
}

impl ReferenceData {
    pub fn load(config: &PipelineConfig) -> Result<Self> {
        let inputs = &config.inputs;
        let sheets = &config.sheets;

        let primary_schools =
            primary_school_table(&read_sheet(&inputs.workbook, &sheets.primary_schools)?)?;
        let top_international_schools =
            top_international_schools(&read_sheet(&inputs.workbook, &sheets.international_schools)?)?;
        let shops = match &inputs.shop_locations {
            Some(path) => shop_locations(&read_csv_sheet(path)?)?,
            None => shop_locations(&read_sheet(&inputs.workbook, &sheets.shops)?)?,
        };
        let transit = load_transit_lines(
            &inputs.transit_lines,
            &config.transit_excluded_color,
            &config.transit_multi_label,
        )?;
        let supermarkets = load_point_set(&inputs.supermarkets)?;
        let food_courts = load_point_set(&inputs.food_courts)?;

        info!(
            "reference data: {} primary schools, {} top international schools, {} stations, {} shops, {} food courts, {} supermarkets",
            primary_schools.len(),
            top_international_schools.len(),
            transit.len(),
            shops.len(),
            food_courts.len(),
            supermarkets.len()
        );

        Ok(Self {
            primary_schools,
            top_international_schools,
            transit,
            shops,
            food_courts,
            supermarkets,
        })
    }
}

/// A cleaned listing joined with its reference attributes and derived features.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedListing {
    pub listing: Listing,
    pub num_p_school_nearby: u32,
    pub num_i_school_nearby: u32,
    pub num_mrt_nearby: u32,
    pub primary_school: Option<Vec<Value>>,
    pub in_top_20: Option<bool>,
    pub transit: Option<Vec<Value>>,
    pub dist_to_shops: Option<f64>,
    pub dist_to_foodcourt: Option<f64>,
    pub dist_to_supermarket: Option<f64>,
    pub dist_to_downtown: Option<f64>,
}

/// The analysis output: every cleaned column plus the engineered ones.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisTable {
    pub proximity_km: f64,
    /// Scraped columns carried through from the raw table.
    pub extra_columns: Vec<String>,
    pub primary_school_columns: Vec<String>,
    pub transit_columns: Vec<String>,
    pub rows: Vec<EnrichedListing>,
}

/// The model output: numeric columns only, no missing cells.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<f64>>,
}

fn joined(map: &EntityMap, name: Option<&str>) -> Option<Vec<Value>> {
    map.lookup(name).map(|v| v.to_vec())
}

/// Joins reference attributes onto each listing by its first nearest-entity
/// name and computes the count-within-radius and nearest-amenity features.
pub fn engineer(listings: Vec<Listing>, refs: &ReferenceData, config: &PipelineConfig) -> AnalysisTable {
    let primary = map_primary_schools(&listings, &refs.primary_schools, config.min_match_score);
    let international: HashMap<String, bool> =
        map_international_schools(&listings, &refs.top_international_schools);
    let transit = map_transit(&listings, &refs.transit, config.min_match_score);
    let downtown = [config.downtown];
    let radius = config.proximity_km;
    let extra_columns: Vec<String> = listings
        .iter()
        .flat_map(|l| l.extra.iter().map(|(k, _)| k.clone()))
        .unique()
        .collect();

    let rows: Vec<EnrichedListing> = listings
        .into_iter()
        .map(|listing| {
            let nearest = |points: &[GeoPoint]| listing.location.and_then(|p| nearest_distance(p, points));
            EnrichedListing {
                num_p_school_nearby: listing.primary_schools.count_within(radius),
                num_i_school_nearby: listing.international_schools.count_within(radius),
                num_mrt_nearby: listing.mrt.count_within(radius),
                primary_school: joined(&primary, listing.primary_schools.first()),
                in_top_20: listing
                    .international_schools
                    .first()
                    .and_then(|n| international.get(n).copied()),
                transit: joined(&transit, listing.mrt.first()),
                dist_to_shops: nearest(&refs.shops),
                dist_to_foodcourt: nearest(&refs.food_courts),
                dist_to_supermarket: nearest(&refs.supermarkets),
                dist_to_downtown: nearest(&downtown),
                listing,
            }
        })
        .collect();

    info!("engineered features for {} listings", rows.len());

    AnalysisTable {
        proximity_km: radius,
        extra_columns,
        primary_school_columns: refs.primary_schools.attribute_names.clone(),
        transit_columns: refs.transit.attribute_names.clone(),
        rows,
    }
}

fn padded(values: &Option<Vec<Value>>, width: usize) -> impl Iterator<Item = Value> + '_ {
    (0..width).map(move |i| {
        values
            .as_ref()
            .and_then(|v| v.get(i).cloned())
            .unwrap_or(Value::Missing)
    })
}

impl AnalysisTable {
    pub fn headers(&self) -> Vec<String> {
        let mut headers: Vec<String> = [
            "type", "price", "district", "address", "road", "tenure", "bedroom", "area", "psf",
            "lat", "lon",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        headers.extend(self.extra_columns.iter().cloned());

        for kind in EntityKind::ALL {
            for (name, dist) in kind.columns() {
                headers.push(name.to_owned());
                headers.push(dist.to_owned());
            }
        }
        for kind in EntityKind::ALL {
            headers.push(format!("num_{}_in_{}km", kind.short_name(), self.proximity_km));
        }
        headers.extend(self.primary_school_columns.iter().cloned());
        headers.push(IN_TOP_20_COLUMN.to_owned());
        headers.extend(self.transit_columns.iter().cloned());
        headers.extend(
            ["dist_to_shops", "dist_to_foodcourt", "dist_to_supermarket", "dist_to_downtown"]
                .iter()
                .map(|s| s.to_string()),
        );
        headers
    }

    /// Cells of one row, aligned with [`AnalysisTable::headers`].
    pub fn cells(&self, row: &EnrichedListing) -> Vec<Value> {
        let l = &row.listing;
        let mut cells = vec![
            Value::Text(l.property_type.clone()),
            Value::Number(l.price),
            Value::Text(l.district.clone()),
            Value::from_text(l.address.as_deref()),
            Value::from_text(l.road.as_deref()),
            l.tenure.into(),
            l.bedroom.map(|b| b as f64).into(),
            l.area.into(),
            l.psf.into(),
            l.location.map(|p| p.lat).into(),
            l.location.map(|p| p.lon).into(),
        ];
        cells.extend(self.extra_columns.iter().map(|c| Value::infer(l.extra_value(c))));

        for kind in EntityKind::ALL {
            let e = l.entities(kind);
            for i in 0..3 {
                cells.push(Value::from_text(e.names[i].as_deref()));
                cells.push(e.dists[i].into());
            }
        }
        cells.push(Value::Number(row.num_p_school_nearby as f64));
        cells.push(Value::Number(row.num_i_school_nearby as f64));
        cells.push(Value::Number(row.num_mrt_nearby as f64));
        cells.extend(padded(&row.primary_school, self.primary_school_columns.len()));
        cells.push(row.in_top_20.into());
        cells.extend(padded(&row.transit, self.transit_columns.len()));
        cells.push(row.dist_to_shops.into());
        cells.push(row.dist_to_foodcourt.into());
        cells.push(row.dist_to_supermarket.into());
        cells.push(row.dist_to_downtown.into());
        cells
    }

    pub fn records(&self) -> impl Iterator<Item = Vec<Value>> + '_ {
        self.rows.iter().map(move |r| self.cells(r))
    }
}

/// One-hot column name for a property type, e.g. `terrace house` -> `terrace_house`.
pub fn type_column(ty: &str) -> String {
    ty.trim().replace(' ', "_")
}

/// Derives the model table: text and low-value categorical columns dropped,
/// property type one-hot encoded, any remaining non-numeric column dropped,
/// then every row with a missing cell dropped.
pub fn model_table(analysis: &AnalysisTable, config: &PipelineConfig) -> ModelTable {
    let headers = analysis.headers();
    let cells: Vec<Vec<Value>> = analysis.records().collect();
    let type_idx = headers.iter().position(|h| h == "type");

    let keep: Vec<usize> = headers
        .iter()
        .enumerate()
        .filter(|(_, h)| !TEXT_COLUMNS.contains(&h.as_str()) && !MODEL_DROPPED_COLUMNS.contains(&h.as_str()))
        .filter(|(i, _)| {
            cells
                .iter()
                .all(|row| matches!(row[*i], Value::Number(_) | Value::Bool(_) | Value::Missing))
        })
        .map(|(i, _)| i)
        .collect();

    let mut model_headers: Vec<String> = keep.iter().map(|i| headers[*i].clone()).collect();
    model_headers.extend(config.property_types.iter().map(|t| type_column(t)));

    let mut rows = Vec::with_capacity(cells.len());
    let mut dropped = 0;
    for row in &cells {
        let numbers: Option<Vec<f64>> = keep.iter().map(|i| row[*i].as_f64()).collect();
        let Some(mut numbers) = numbers else {
            dropped += 1;
            continue;
        };
        let ty = type_idx.and_then(|i| row[i].as_text());
        numbers.extend(
            config
                .property_types
                .iter()
                .map(|t| if Some(t.as_str()) == ty { 1.0 } else { 0.0 }),
        );
        rows.push(numbers);
    }

    info!(
        "model table: {} columns, {} rows ({} dropped for missing values)",
        model_headers.len(),
        rows.len(),
        dropped
    );

    ModelTable {
        headers: model_headers,
        rows,
    }
}

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};
use csv::ReaderBuilder;
use serde::Deserialize;
use tracing::{info, warn};

use crate::distance::GeoPoint;
use crate::error::{PipelineError, Result};
use crate::table::{Sheet, Value};

pub const NUM_LINES_COLUMN: &str = "num_mrt_lines";
pub const LINE_LABEL_COLUMN: &str = "nearest_mrt_color";

#[derive(Deserialize)]
struct FeatureCollection {
    features: Vec<Feature>,
}

#[derive(Deserialize)]
struct Feature {
    geometry: Option<Geometry>,
}

#[derive(Deserialize)]
struct Geometry {
    coordinates: Vec<f64>,
}

/// Reads the point features of a GeoJSON collection. Coordinates are stored
/// `[lon, lat, (alt)]`; the returned points are `(lat, lon)`.
pub fn load_point_set<P: AsRef<Path>>(path: P) -> Result<Vec<GeoPoint>> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|e| PipelineError::io(path, e))?;
    let points = parse_point_set(&text, path)?;
    info!("loaded {} points from {}", points.len(), path.display());
    Ok(points)
}

fn parse_point_set(text: &str, path: &Path) -> Result<Vec<GeoPoint>> {
    let collection: FeatureCollection = serde_json::from_str(text).map_err(|e| PipelineError::Json {
        path: path.to_path_buf(),
        source: e,
    })?;

    let mut points = Vec::with_capacity(collection.features.len());
    for (i, feature) in collection.features.into_iter().enumerate() {
        let Some(geometry) = feature.geometry else {
            warn!("{}: feature {} has no geometry, skipping", path.display(), i);
            continue;
        };
        match geometry.coordinates.as_slice() {
            [lon, lat, ..] => points.push(GeoPoint::new(*lat, *lon)),
            _ => {
                return Err(PipelineError::Feature {
                    path: path.to_path_buf(),
                    message: format!("feature {} has fewer than two coordinates", i),
                })
            }
        }
    }
    Ok(points)
}

/// Name-keyed attribute rows, loaded once and never modified.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReferenceTable {
    pub attribute_names: Vec<String>,
    pub rows: Vec<ReferenceRow>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceRow {
    pub name: String,
    pub values: Vec<Value>,
}

impl ReferenceTable {
    pub fn names(&self) -> Vec<&str> {
        self.rows.iter().map(|r| r.name.as_str()).collect()
    }

    /// First row with exactly this name.
    pub fn get(&self, name: &str) -> Option<&ReferenceRow> {
        self.rows.iter().find(|r| r.name == name)
    }

    pub fn attribute<'a>(&self, row: &'a ReferenceRow, attribute: &str) -> Option<&'a Value> {
        let idx = self.attribute_names.iter().position(|a| a == attribute)?;
        row.values.get(idx)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Every column of `sheet` except `name_column` becomes an attribute.
    pub fn from_sheet(sheet: &Sheet, name_column: &str) -> Result<Self> {
        let name_idx = sheet.column(name_column)?;
        let attribute_names = sheet
            .headers
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != name_idx)
            .map(|(_, h)| h.trim().to_owned())
            .collect::<Vec<_>>();

        let mut rows = Vec::with_capacity(sheet.rows.len());
        for r in 0..sheet.rows.len() {
            let name = match sheet.cell(r, name_idx) {
                Value::Missing => continue,
                v => v.to_string().trim().to_owned(),
            };
            let values = (0..sheet.headers.len())
                .filter(|c| *c != name_idx)
                .map(|c| sheet.cell(r, c).clone())
                .collect();
            rows.push(ReferenceRow { name, values });
        }

        Ok(Self { attribute_names, rows })
    }
}

#[derive(Deserialize)]
struct StationRecord {
    #[serde(rename = "STN_NAME")]
    name: String,
    #[serde(rename = "COLOR")]
    color: String,
}

/// Reads the station/line-colour file and builds one row per station.
pub fn load_transit_lines<P: AsRef<Path>>(path: P, excluded: &str, multi_label: &str) -> Result<ReferenceTable> {
    let path = path.as_ref();
    let mut rdr = ReaderBuilder::new()
        .from_path(path)
        .map_err(|e| PipelineError::csv(path, e))?;

    let mut records = Vec::new();
    for result in rdr.deserialize::<StationRecord>() {
        let record = result.map_err(|e| PipelineError::csv(path, e))?;
        records.push((record.name, record.color));
    }

    let table = build_transit_table(records, excluded, multi_label);
    info!(
        "loaded {} stations on {} lines from {}",
        table.len(),
        table.attribute_names.len().saturating_sub(2),
        path.display()
    );
    Ok(table)
}

/// One-hot line membership per station, merged across duplicate rows.
///
/// Attributes are one 0/1 column per line colour (sorted), then the number of
/// lines, then a label: the single colour, or `multi_label` for interchanges.
pub fn build_transit_table<I>(records: I, excluded: &str, multi_label: &str) -> ReferenceTable
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut stations: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    let mut colors: BTreeSet<String> = BTreeSet::new();

    for (name, color) in records {
        let (name, color) = (name.trim().to_owned(), color.trim().to_owned());
        if color == excluded {
            continue;
        }
        colors.insert(color.clone());
        stations.entry(name).or_default().insert(color);
    }

    let mut attribute_names: Vec<String> = colors.iter().cloned().collect();
    attribute_names.push(NUM_LINES_COLUMN.to_owned());
    attribute_names.push(LINE_LABEL_COLUMN.to_owned());

    let rows = stations
        .into_iter()
        .map(|(name, lines)| {
            let mut values: Vec<Value> = colors
                .iter()
                .map(|c| Value::Number(if lines.contains(c) { 1.0 } else { 0.0 }))
                .collect();
            values.push(Value::Number(lines.len() as f64));
            let label = if lines.len() > 1 {
                multi_label.to_owned()
            } else {
                lines.iter().next().cloned().unwrap_or_default()
            };
            values.push(Value::Text(label));
            ReferenceRow { name, values }
        })
        .collect();

    ReferenceTable { attribute_names, rows }
}

fn cell_value(cell: &Data) -> Value {
    match cell {
        Data::Empty => Value::Missing,
        Data::Float(f) => Value::Number(*f),
        Data::Int(i) => Value::Number(*i as f64),
        Data::Bool(b) => Value::Bool(*b),
        Data::String(s) if s.trim().is_empty() => Value::Missing,
        Data::String(s) => Value::Text(s.clone()),
        other => Value::Text(other.to_string()),
    }
}

/// Reads one sheet of a spreadsheet workbook; the first row is the header.
pub fn read_sheet<P: AsRef<Path>>(path: P, sheet: &str) -> Result<Sheet> {
    let path = path.as_ref();
    let mut workbook = open_workbook_auto(path).map_err(|e| PipelineError::Workbook {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    if !workbook.sheet_names().iter().any(|s| s == sheet) {
        return Err(PipelineError::MissingSheet {
            path: path.to_path_buf(),
            sheet: sheet.to_owned(),
        });
    }

    let range = workbook
        .worksheet_range(sheet)
        .map_err(|e| PipelineError::Workbook {
            path: path.to_path_buf(),
            message: format!("sheet '{}': {}", sheet, e),
        })?;

    let mut rows = range.rows();
    let headers = rows
        .next()
        .map(|r| r.iter().map(|c| c.to_string()).collect())
        .unwrap_or_default();
    let rows = rows.map(|r| r.iter().map(cell_value).collect()).collect();

    Ok(Sheet {
        source: format!("{} [{}]", path.display(), sheet),
        headers,
        rows,
    })
}

/// Reads a small headed CSV into a [`Sheet`], every non-empty cell as text.
pub fn read_csv_sheet<P: AsRef<Path>>(path: P) -> Result<Sheet> {
    let path = path.as_ref();
    let mut rdr = ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(|e| PipelineError::csv(path, e))?;

    let headers = rdr
        .headers()
        .map_err(|e| PipelineError::csv(path, e))?
        .iter()
        .map(str::to_owned)
        .collect();

    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result.map_err(|e| PipelineError::csv(path, e))?;
        rows.push(
            record
                .iter()
                .map(|f| if f.trim().is_empty() { Value::Missing } else { Value::Text(f.to_owned()) })
                .collect(),
        );
    }

    Ok(Sheet {
        source: path.display().to_string(),
        headers,
        rows,
    })
}

/// Primary school ranking: keyed by `primary_school`, every other column kept.
pub fn primary_school_table(sheet: &Sheet) -> Result<ReferenceTable> {
    ReferenceTable::from_sheet(sheet, "primary_school")
}

/// Shop coordinates from the `lat`/`lon` columns. Rows without both are skipped.
pub fn shop_locations(sheet: &Sheet) -> Result<Vec<GeoPoint>> {
    let lat = sheet.column("lat")?;
    let lon = sheet.column("lon")?;

    let mut skipped = 0;
    let mut points = Vec::with_capacity(sheet.rows.len());
    for r in 0..sheet.rows.len() {
        match (sheet.cell(r, lat).as_f64(), sheet.cell(r, lon).as_f64()) {
            (Some(lat), Some(lon)) => points.push(GeoPoint::new(lat, lon)),
            _ => skipped += 1,
        }
    }
    if skipped > 0 {
        warn!("{}: {} shops have no coordinates", sheet.source, skipped);
    }
    Ok(points)
}

/// Mall names from the `shopping_mall` column, for geocoding.
pub fn shop_names(sheet: &Sheet) -> Result<Vec<String>> {
    let col = sheet.column("shopping_mall")?;
    Ok((0..sheet.rows.len())
        .filter_map(|r| match sheet.cell(r, col) {
            Value::Missing => None,
            v => Some(v.to_string()),
        })
        .collect())
}

/// The set of top international school names (column `mapped`).
pub fn top_international_schools(sheet: &Sheet) -> Result<HashSet<String>> {
    let col = sheet.column("mapped")?;
    Ok((0..sheet.rows.len())
        .filter_map(|r| match sheet.cell(r, col) {
            Value::Missing => None,
            v => Some(v.to_string()),
        })
        .collect())
}

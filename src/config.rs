use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::distance::GeoPoint;
use crate::error::{PipelineError, Result};

pub const DEFAULT_PROPERTY_TYPES: [&str; 5] = [
    "condominium",
    "apartment",
    "hdb",
    "bungalow",
    "terrace house",
];

pub const FREEHOLD_YEARS: f64 = 10000.0;

pub const DOWNTOWN: GeoPoint = GeoPoint { lat: 1.279455, lon: 103.852814 };

/// Everything the pipeline used to hard-code. Missing keys in a TOML file fall
/// back to the defaults below.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    pub property_types: Vec<String>,
    pub labels: ColumnLabels,
    pub freehold_years: f64,
    pub proximity_km: f64,
    pub downtown: GeoPoint,
    pub transit_excluded_color: String,
    pub transit_multi_label: String,
    /// Matches scoring below this are treated as unmatched. `None` keeps every match.
    pub min_match_score: Option<u8>,
    pub sheets: SheetNames,
    pub inputs: InputPaths,
    pub outputs: OutputPaths,
    pub geocoder: GeocoderConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            property_types: DEFAULT_PROPERTY_TYPES.iter().map(|s| s.to_string()).collect(),
            labels: ColumnLabels::default(),
            freehold_years: FREEHOLD_YEARS,
            proximity_km: 1.0,
            downtown: DOWNTOWN,
            transit_excluded_color: "OTHERS".to_owned(),
            transit_multi_label: "MULTI".to_owned(),
            min_match_score: None,
            sheets: SheetNames::default(),
            inputs: InputPaths::default(),
            outputs: OutputPaths::default(),
            geocoder: GeocoderConfig::default(),
        }
    }
}

/// Literal prefix the scraper put in front of each labelled column's value.
/// A prefix is only removed from its own column.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct ColumnLabels {
    #[serde(rename = "type")]
    pub property_type: String,
    pub address: String,
}

impl Default for ColumnLabels {
    fn default() -> Self {
        Self {
            property_type: "type: ".to_owned(),
            address: "address: ".to_owned(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct SheetNames {
    pub primary_schools: String,
    pub shops: String,
    pub international_schools: String,
}

impl Default for SheetNames {
    fn default() -> Self {
        Self {
            primary_schools: "primary school".to_owned(),
            shops: "shops".to_owned(),
            international_schools: "international school".to_owned(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct InputPaths {
    pub listings: PathBuf,
    pub supermarkets: PathBuf,
    pub food_courts: PathBuf,
    pub transit_lines: PathBuf,
    pub workbook: PathBuf,
    /// Precomputed `shopping_mall,lat,lon` file; replaces the workbook shop sheet when set.
    pub shop_locations: Option<PathBuf>,
}

impl Default for InputPaths {
    fn default() -> Self {
        Self {
            listings: PathBuf::from("scraped_data.csv"),
            supermarkets: PathBuf::from("supermarkets-geojson.geojson"),
            food_courts: PathBuf::from("hawker-centres-geojson.geojson"),
            transit_lines: PathBuf::from("mrtsg.csv"),
            workbook: PathBuf::from("extra_info.xlsx"),
            shop_locations: None,
        }
    }
}

impl InputPaths {
    /// Resolves every relative path against `dir`.
    pub fn rebase(&mut self, dir: &Path) {
        for path in [
            &mut self.listings,
            &mut self.supermarkets,
            &mut self.food_courts,
            &mut self.transit_lines,
            &mut self.workbook,
        ] {
            if path.is_relative() {
                *path = dir.join(&*path);
            }
        }
        if let Some(path) = self.shop_locations.as_mut() {
            if path.is_relative() {
                *path = dir.join(&*path);
            }
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct OutputPaths {
    pub analysis: PathBuf,
    pub model: PathBuf,
}

impl Default for OutputPaths {
    fn default() -> Self {
        Self {
            analysis: PathBuf::from("engineered_data.csv"),
            model: PathBuf::from("model_data.csv"),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct GeocoderConfig {
    pub base_url: String,
    pub user_agent: String,
    pub region_suffix: String,
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            base_url: "https://nominatim.openstreetmap.org/search".to_owned(),
            user_agent: concat!("listing-features/", env!("CARGO_PKG_VERSION")).to_owned(),
            region_suffix: ", Singapore".to_owned(),
        }
    }
}

impl PipelineConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: PipelineConfig =
            toml::from_str(s).map_err(|e| PipelineError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| PipelineError::io(path, e))?;
        Self::from_toml_str(&text)
            .map_err(|e| PipelineError::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn validate(&self) -> Result<()> {
        if self.property_types.is_empty() {
            return Err(PipelineError::Config("property_types must not be empty".into()));
        }
        if !(self.proximity_km > 0.0) {
            return Err(PipelineError::Config(format!(
                "proximity_km must be positive, got {}",
                self.proximity_km
            )));
        }
        if let Some(score) = self.min_match_score {
            if score > 100 {
                return Err(PipelineError::Config(format!(
                    "min_match_score must be within 0..=100, got {}",
                    score
                )));
            }
        }
        Ok(())
    }

    pub fn is_allowed_type(&self, ty: &str) -> bool {
        self.property_types.iter().any(|t| t == ty)
    }
}

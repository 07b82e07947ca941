//! Looks up shopping mall coordinates through a Nominatim-style search
//! endpoint. Peripheral to the pipeline: its output is the precomputed
//! `shopping_mall,lat,lon` file the pipeline can read instead of the workbook.

use std::path::Path;

use csv::Writer;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::GeocoderConfig;
use crate::distance::GeoPoint;
use crate::error::{PipelineError, Result};

pub trait Locate {
    fn locate(&self, query: &str) -> Result<Option<GeoPoint>>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShopLocation {
    pub shopping_mall: String,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

#[derive(Deserialize)]
struct Place {
    lat: String,
    lon: String,
}

pub struct Geocoder {
    client: reqwest::blocking::Client,
    config: GeocoderConfig,
}

impl Geocoder {
    pub fn new(config: GeocoderConfig) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| PipelineError::Config(format!("cannot build http client: {}", e)))?;
        Ok(Self { client, config })
    }
}

impl Locate for Geocoder {
    fn locate(&self, query: &str) -> Result<Option<GeoPoint>> {
        let q = format!("{}{}", query, self.config.region_suffix);
        let err = |e: reqwest::Error| PipelineError::Geocode { query: q.clone(), source: e };

        let places: Vec<Place> = self
            .client
            .get(&self.config.base_url)
            .query(&[("q", q.as_str()), ("format", "json"), ("limit", "1")])
            .send()
            .and_then(|r| r.error_for_status())
            .and_then(|r| r.json())
            .map_err(err)?;

        Ok(places.into_iter().next().and_then(|p| {
            let lat = p.lat.parse().ok()?;
            let lon = p.lon.parse().ok()?;
            Some(GeoPoint { lat, lon })
        }))
    }
}

/// Geocodes each name in order. Names with no result keep blank coordinates.
pub fn geocode_shops<L: Locate>(names: &[String], locator: &L) -> Result<Vec<ShopLocation>> {
    let mut out = Vec::with_capacity(names.len());
    for name in names {
        let point = locator.locate(name)?;
        match point {
            Some(p) => debug!("{} -> ({}, {})", name, p.lat, p.lon),
            None => warn!("no location found for '{}'", name),
        }
        out.push(ShopLocation {
            shopping_mall: name.clone(),
            lat: point.map(|p| p.lat),
            lon: point.map(|p| p.lon),
        });
    }
    info!(
        "located {} of {} shops",
        out.iter().filter(|s| s.lat.is_some()).count(),
        out.len()
    );
    Ok(out)
}

pub fn write_shop_locations<P: AsRef<Path>>(path: P, shops: &[ShopLocation]) -> Result<()> {
    let path = path.as_ref();
    let mut writer = Writer::from_path(path).map_err(|e| PipelineError::csv(path, e))?;
    for shop in shops {
        writer.serialize(shop).map_err(|e| PipelineError::csv(path, e))?;
    }
    writer.flush().map_err(|e| PipelineError::io(path, e))?;
    Ok(())
}

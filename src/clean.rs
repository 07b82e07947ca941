use std::path::Path;

use csv::ReaderBuilder;
use tracing::{debug, info};

use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use crate::listing::{
    is_field_column, Listing, NearestEntities, RawListing, DROPPED_RAW_COLUMNS, REQUIRED_RAW_COLUMNS,
};
use crate::parse::{
    compute_price_per_area, fill_area, parse_area, parse_bedroom_count, parse_float, parse_latlon,
    parse_price, parse_tenure, strip_label,
};

/// Why a raw row did not make it into the cleaned table.
#[derive(Debug, Clone, PartialEq)]
pub enum Rejection {
    UnknownType(Option<String>),
    MissingPrice,
    MissingDistrict,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CleanStats {
    pub input: usize,
    pub unknown_type: usize,
    pub missing_price: usize,
    pub missing_district: usize,
}

impl CleanStats {
    pub fn kept(&self) -> usize {
        self.input - self.unknown_type - self.missing_price - self.missing_district
    }
}

pub fn load_raw_listings<P: AsRef<Path>>(path: P) -> Result<Vec<RawListing>> {
    let path = path.as_ref();
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .map_err(|e| PipelineError::csv(path, e))?;

    let headers = rdr.headers().map_err(|e| PipelineError::csv(path, e))?.clone();
    for column in REQUIRED_RAW_COLUMNS {
        if !headers.iter().any(|h| h == column) {
            return Err(PipelineError::missing_column(path.display().to_string(), column));
        }
    }

    let extra_columns: Vec<(usize, String)> = headers
        .iter()
        .enumerate()
        .filter(|(_, h)| !is_field_column(h) && !DROPPED_RAW_COLUMNS.contains(h))
        .map(|(i, h)| (i, h.to_owned()))
        .collect();
    if !extra_columns.is_empty() {
        debug!(
            "carrying extra columns: {:?}",
            extra_columns.iter().map(|(_, h)| h).collect::<Vec<_>>()
        );
    }

    let mut listings = Vec::new();
    for result in rdr.records() {
        let record = result.map_err(|e| PipelineError::csv(path, e))?;
        let mut listing: RawListing = record
            .deserialize(Some(&headers))
            .map_err(|e| PipelineError::csv(path, e))?;
        listing.extra = extra_columns
            .iter()
            .map(|(i, h)| (h.clone(), record.get(*i).unwrap_or_default().to_owned()))
            .collect();
        listings.push(listing);
    }

    info!("loaded {} raw listings from {}", listings.len(), path.display());
    Ok(listings)
}

fn text(field: Option<String>) -> Option<String> {
    field.filter(|s| !s.trim().is_empty())
}

fn nearest(names: [Option<String>; 3], dists: [Option<String>; 3]) -> NearestEntities {
    NearestEntities {
        names: names.map(text),
        dists: dists.map(|d| d.as_deref().and_then(parse_float)),
    }
}

/// Cleans a single row, or says why it was dropped.
pub fn clean_listing(raw: RawListing, config: &PipelineConfig) -> std::result::Result<Listing, Rejection> {
    let property_type = raw
        .property_type
        .as_deref()
        .map(|t| strip_label(t, &config.labels.property_type));
    let property_type = match property_type {
        Some(t) if config.is_allowed_type(&t) => t,
        other => return Err(Rejection::UnknownType(other)),
    };

    let price = raw.price.as_deref().and_then(parse_price);
    // blank-but-present districts count as present
    let district = raw.district.filter(|d| !d.is_empty());
    let (price, district) = match (price, district) {
        (None, _) => return Err(Rejection::MissingPrice),
        (_, None) => return Err(Rejection::MissingDistrict),
        (Some(p), Some(d)) => (p, d),
    };

    let area = fill_area(text(raw.area), text(raw.land))
        .as_deref()
        .and_then(parse_area);
    let psf = raw.psf.as_deref().and_then(parse_float);

    Ok(Listing {
        property_type,
        price,
        district,
        address: text(raw.address).map(|a| strip_label(&a, &config.labels.address)),
        road: text(raw.road),
        tenure: raw
            .tenure
            .as_deref()
            .and_then(|t| parse_tenure(t, config.freehold_years)),
        bedroom: raw.bedroom.as_deref().and_then(parse_bedroom_count),
        area,
        psf: compute_price_per_area(psf, Some(price), area),
        location: raw.latlon.as_deref().and_then(parse_latlon),
        primary_schools: nearest(
            [raw.first_p_school, raw.sec_p_school, raw.third_p_school],
            [raw.first_p_school_dist, raw.sec_p_school_dist, raw.third_p_school_dist],
        ),
        international_schools: nearest(
            [raw.first_i_school, raw.sec_i_school, raw.third_i_school],
            [raw.first_i_school_dist, raw.sec_i_school_dist, raw.third_i_school_dist],
        ),
        mrt: nearest(
            [raw.first_mrt_name, raw.sec_mrt_name, raw.third_mrt_name],
            [raw.first_mrt_dist, raw.sec_mrt_dist, raw.third_mrt_dist],
        ),
        extra: raw
            .extra
            .into_iter()
            .map(|(k, v)| (k, text(Some(v))))
            .collect(),
    })
}

/// Normalises every raw row. Rows with an unknown property type, no price or
/// no district are left out and counted.
pub fn clean_listings(raw: Vec<RawListing>, config: &PipelineConfig) -> (Vec<Listing>, CleanStats) {
    let mut stats = CleanStats {
        input: raw.len(),
        ..Default::default()
    };

    let mut listings = Vec::with_capacity(raw.len());
    for row in raw {
        match clean_listing(row, config) {
            Ok(listing) => listings.push(listing),
            Err(rejection) => {
                debug!("dropping listing: {:?}", rejection);
                match rejection {
                    Rejection::UnknownType(_) => stats.unknown_type += 1,
                    Rejection::MissingPrice => stats.missing_price += 1,
                    Rejection::MissingDistrict => stats.missing_district += 1,
                }
            }
        }
    }

    info!(
        "cleaned {} of {} listings (unknown type: {}, no price: {}, no district: {})",
        listings.len(),
        stats.input,
        stats.unknown_type,
        stats.missing_price,
        stats.missing_district
    );
    (listings, stats)
}

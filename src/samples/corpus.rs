//! Flat CSV persistence for the sample corpus.
//!
//! Format:
//! - Header: `lat,lon,SST_C,chlor_a_mg_m3,ocean_depth_m,current_speed_m_s,salinity_psu`
//! - One row per sample, values in shortest round-trip decimal form
//!
//! The column names are a stable contract shared with other tools. Readers
//! locate columns by name, so extra columns (e.g. an index column) and any
//! column order are accepted.

use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

use super::{Covariates, GeoSample};
use crate::store::write_atomic;

/// Column names of the persisted corpus, in write order.
pub const CORPUS_COLUMNS: [&str; 7] = [
    "lat",
    "lon",
    "SST_C",
    "chlor_a_mg_m3",
    "ocean_depth_m",
    "current_speed_m_s",
    "salinity_psu",
];

/// Errors that can occur reading or writing a corpus.
#[derive(Error, Debug)]
pub enum SampleIoError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("corpus is missing required column '{0}'")]
    MissingColumn(&'static str),
    #[error("line {line}: expected at least {expected} fields, found {found}")]
    MalformedRow {
        line: usize,
        expected: usize,
        found: usize,
    },
    #[error("line {line}: column '{column}' has invalid value '{value}'")]
    InvalidValue {
        line: usize,
        column: &'static str,
        value: String,
    },
    #[error("line {line}: {column} {value} is outside [{min}, {max}]")]
    OutOfRange {
        line: usize,
        column: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
    #[error("corpus contains no samples")]
    Empty,
}

/// Writes samples to `path` as CSV.
///
/// The file is written to a temporary sibling and renamed into place, so a
/// failed write never leaves a truncated corpus behind.
pub fn write_corpus(path: &Path, samples: &[GeoSample]) -> Result<(), SampleIoError> {
    let mut out = String::with_capacity(64 * (samples.len() + 1));
    out.push_str(&CORPUS_COLUMNS.join(","));
    out.push('\n');

    for s in samples {
        let c = &s.covariates;
        out.push_str(&format!(
            "{},{},{},{},{},{},{}\n",
            s.latitude,
            s.longitude,
            c.sea_surface_temp_c,
            c.chlorophyll_mg_m3,
            c.ocean_depth_m,
            c.current_speed_m_s,
            c.salinity_psu
        ));
    }

    write_atomic(path, out.as_bytes()).map_err(|source| SampleIoError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Reads a corpus from `path`.
pub fn read_corpus(path: &Path) -> Result<Vec<GeoSample>, SampleIoError> {
    let text = std::fs::read_to_string(path).map_err(|source| SampleIoError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_corpus(&text)
}

fn parse_corpus(text: &str) -> Result<Vec<GeoSample>, SampleIoError> {
    let mut lines = text
        .lines()
        .enumerate()
        .map(|(i, l)| (i + 1, l.trim()))
        .filter(|(_, l)| !l.is_empty() && !l.starts_with('#'));

    let (_, header) = lines.next().ok_or(SampleIoError::Empty)?;
    let names: Vec<&str> = header.split(',').map(clean_field).collect();

    let mut positions = [0usize; 7];
    for (slot, column) in positions.iter_mut().zip(CORPUS_COLUMNS) {
        *slot = names
            .iter()
            .position(|n| *n == column)
            .ok_or(SampleIoError::MissingColumn(column))?;
    }
    let needed = positions.iter().max().copied().unwrap_or(0) + 1;

    let mut samples = Vec::new();
    for (line, row) in lines {
        let fields: Vec<&str> = row.split(',').map(clean_field).collect();
        if fields.len() < needed {
            return Err(SampleIoError::MalformedRow {
                line,
                expected: needed,
                found: fields.len(),
            });
        }

        let mut values = [0.0f64; 7];
        for ((value, &pos), column) in values.iter_mut().zip(&positions).zip(CORPUS_COLUMNS) {
            let raw = fields[pos];
            *value = raw
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| SampleIoError::InvalidValue {
                    line,
                    column,
                    value: raw.to_string(),
                })?;
        }

        check_range(line, "lat", values[0], 90.0)?;
        check_range(line, "lon", values[1], 180.0)?;

        samples.push(GeoSample::new(
            values[0],
            values[1],
            Covariates::from_array([values[2], values[3], values[4], values[5], values[6]]),
        ));
    }

    if samples.is_empty() {
        return Err(SampleIoError::Empty);
    }
    Ok(samples)
}

fn clean_field(field: &str) -> &str {
    field.trim().trim_matches('"')
}

fn check_range(line: usize, column: &'static str, value: f64, limit: f64) -> Result<(), SampleIoError> {
    if value < -limit || value > limit {
        return Err(SampleIoError::OutOfRange {
            line,
            column,
            value,
            min: -limit,
            max: limit,
        });
    }
    Ok(())
}

/// Lat/lon extent of a corpus.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CorpusBounds {
    pub lat_min: f64,
    pub lat_max: f64,
    pub lon_min: f64,
    pub lon_max: f64,
}

/// Quick descriptive summary of a corpus.
#[derive(Debug, Clone, Serialize)]
pub struct CorpusSummary {
    pub rows: usize,
    pub columns: Vec<String>,
    pub bounds: CorpusBounds,
    pub sst_mean: f64,
    pub chlor_mean: f64,
    pub depth_mean: f64,
}

/// Summarizes a non-empty corpus.
pub fn summarize(samples: &[GeoSample]) -> Result<CorpusSummary, SampleIoError> {
    if samples.is_empty() {
        return Err(SampleIoError::Empty);
    }

    let mut bounds = CorpusBounds {
        lat_min: f64::INFINITY,
        lat_max: f64::NEG_INFINITY,
        lon_min: f64::INFINITY,
        lon_max: f64::NEG_INFINITY,
    };
    let (mut sst, mut chlor, mut depth) = (0.0, 0.0, 0.0);

    for s in samples {
        bounds.lat_min = bounds.lat_min.min(s.latitude);
        bounds.lat_max = bounds.lat_max.max(s.latitude);
        bounds.lon_min = bounds.lon_min.min(s.longitude);
        bounds.lon_max = bounds.lon_max.max(s.longitude);
        sst += s.covariates.sea_surface_temp_c;
        chlor += s.covariates.chlorophyll_mg_m3;
        depth += s.covariates.ocean_depth_m;
    }

    let n = samples.len() as f64;
    Ok(CorpusSummary {
        rows: samples.len(),
        columns: CORPUS_COLUMNS.iter().map(|c| c.to_string()).collect(),
        bounds,
        sst_mean: sst / n,
        chlor_mean: chlor / n,
        depth_mean: depth / n,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample(lat: f64, lon: f64, sst: f64) -> GeoSample {
        GeoSample::new(
            lat,
            lon,
            Covariates {
                sea_surface_temp_c: sst,
                chlorophyll_mg_m3: 1.5,
                ocean_depth_m: -250.0,
                current_speed_m_s: 0.4,
                salinity_psu: 35.1,
            },
        )
    }

    #[test]
    fn test_write_then_read_preserves_values() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("corpus.csv");
        let samples = vec![sample(-12.345678901, 170.0, 21.0), sample(45.5, -30.25, 0.1 + 0.2)];

        write_corpus(&path, &samples).unwrap();
        let back = read_corpus(&path).unwrap();
        assert_eq!(back, samples);

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("lat,lon,SST_C,chlor_a_mg_m3,ocean_depth_m,current_speed_m_s,salinity_psu\n"));
    }

    #[test]
    fn test_reordered_and_extra_columns() {
        let text = "\
idx,lon,lat,salinity_psu,SST_C,chlor_a_mg_m3,ocean_depth_m,current_speed_m_s
0,10.0,-5.0,34.0,20.0,2.0,-100.0,0.3
";
        let samples = parse_corpus(text).unwrap();
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].latitude, -5.0);
        assert_eq!(samples[0].longitude, 10.0);
        assert_eq!(samples[0].covariates.salinity_psu, 34.0);
        assert_eq!(samples[0].covariates.current_speed_m_s, 0.3);
    }

    #[test]
    fn test_missing_column_is_reported() {
        let text = "lat,lon,SST_C,chlor_a_mg_m3,ocean_depth_m,current_speed_m_s\n1,2,3,4,5,6\n";
        let err = parse_corpus(text).unwrap_err();
        assert!(matches!(err, SampleIoError::MissingColumn("salinity_psu")));
    }

    #[test]
    fn test_bad_value_reports_line_and_column() {
        let text = "lat,lon,SST_C,chlor_a_mg_m3,ocean_depth_m,current_speed_m_s,salinity_psu\n\
                    1,2,3,4,5,6,7\n\
                    1,2,warm,4,5,6,7\n";
        match parse_corpus(text).unwrap_err() {
            SampleIoError::InvalidValue { line, column, .. } => {
                assert_eq!(line, 3);
                assert_eq!(column, "SST_C");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_header_only_is_empty() {
        let text = "lat,lon,SST_C,chlor_a_mg_m3,ocean_depth_m,current_speed_m_s,salinity_psu\n";
        assert!(matches!(parse_corpus(text).unwrap_err(), SampleIoError::Empty));
        assert!(matches!(parse_corpus("").unwrap_err(), SampleIoError::Empty));
    }

    #[test]
    fn test_latitude_out_of_range() {
        let text = "lat,lon,SST_C,chlor_a_mg_m3,ocean_depth_m,current_speed_m_s,salinity_psu\n\
                    95,2,3,4,5,6,7\n";
        assert!(matches!(parse_corpus(text).unwrap_err(), SampleIoError::OutOfRange { column: "lat", .. }));
    }

    #[test]
    fn test_summary() {
        let samples = vec![sample(-10.0, 20.0, 10.0), sample(30.0, -40.0, 20.0)];
        let summary = summarize(&samples).unwrap();
        assert_eq!(summary.rows, 2);
        assert_eq!(summary.columns.len(), 7);
        assert_eq!(summary.bounds.lat_min, -10.0);
        assert_eq!(summary.bounds.lon_max, 20.0);
        assert!((summary.sst_mean - 15.0).abs() < 1e-12);
        assert!(summarize(&[]).is_err());
    }
}

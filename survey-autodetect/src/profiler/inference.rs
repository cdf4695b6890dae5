//! Column type classification.
//!
//! A single pass over a column's cells collects a [`ColumnScan`]; the scan is
//! then classified by applying the type tests in a fixed order where the
//! first match wins:
//!
//! 1. datetime (native timestamps or parseable date strings)
//! 2. geographic (coordinate pairs, WKT shapes or GeoJSON geometries)
//! 3. numeric, split into discrete and continuous
//! 4. free text
//! 5. boolean
//! 6. categorical fallback

use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;

use super::characteristics::DataType;
use crate::dataset::CellValue;
use crate::policy::ProfilingPolicy;

static LAT_LON: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\(?\s*([+-]?\d{1,3}(?:\.\d+)?)\s*[,;]\s*([+-]?\d{1,3}(?:\.\d+)?)\s*\)?$")
        .expect("valid coordinate regex")
});

static WKT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(MULTI)?(POINT|LINESTRING|POLYGON)\s*(Z\s*|M\s*|ZM\s*)?\(")
        .expect("valid WKT regex")
});

static GEOJSON: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#""type"\s*:\s*"(Multi)?(Point|LineString|Polygon)""#).expect("valid GeoJSON regex")
});

const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%d.%m.%Y", "%Y/%m/%d"];

const BOOLEAN_PAIRS: &[(&str, &str)] = &[
    ("false", "true"),
    ("no", "yes"),
    ("n", "y"),
    ("0", "1"),
    ("f", "t"),
    ("off", "on"),
];

/// Parses the date/time representations the profiler recognizes.
pub fn parse_datetime(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if value.len() < 6 {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.naive_utc());
    }
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Some(dt);
        }
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(value, format) {
            return date.and_hms_opt(0, 0, 0);
        }
    }
    None
}

/// Whether a string looks like a location or geometry.
pub fn is_geographic(value: &str) -> bool {
    let value = value.trim();
    if let Some(caps) = LAT_LON.captures(value) {
        let lat = caps[1].parse::<f64>().ok();
        let lon = caps[2].parse::<f64>().ok();
        return matches!(
            (lat, lon),
            (Some(lat), Some(lon)) if (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lon)
        );
    }
    WKT.is_match(value) || GEOJSON.is_match(value)
}

/// Whether two distinct values form a recognized boolean pair.
pub fn is_boolean_pair(a: &str, b: &str) -> bool {
    let mut pair = [a.trim().to_lowercase(), b.trim().to_lowercase()];
    pair.sort();
    BOOLEAN_PAIRS
        .iter()
        .any(|(lo, hi)| pair[0] == *lo && pair[1] == *hi)
}

/// Everything the classifier needs from one pass over a column.
#[derive(Debug, Clone, Default)]
pub struct ColumnScan {
    pub total: usize,
    pub null_count: usize,
    /// Canonical keys of the distinct non-null values
    pub distinct: HashSet<String>,
    /// Up to two raw distinct values, kept for the boolean-pair test
    pub first_values: Vec<String>,
    pub numeric: Vec<f64>,
    pub all_integral: bool,
    pub datetime_matches: usize,
    pub geographic_matches: usize,
    pub native_bool: usize,
    pub text_length_sum: usize,
}

impl ColumnScan {
    /// Scans the cells of one column.
    pub fn from_cells(cells: impl Iterator<Item = CellValue>) -> Self {
        let mut scan = Self {
            all_integral: true,
            ..Self::default()
        };
        for cell in cells {
            scan.push(cell);
        }
        scan
    }

    fn push(&mut self, cell: CellValue) {
        self.total += 1;
        let cell = cell.normalized();
        if cell.is_null() {
            self.null_count += 1;
            return;
        }

        let key = cell.canonical_key();
        if self.distinct.insert(key) && self.first_values.len() < 2 {
            if let Some(text) = cell.as_text() {
                self.first_values.push(text.into_owned());
            }
        }

        match &cell {
            CellValue::Bool(_) => self.native_bool += 1,
            CellValue::DateTime(_) => self.datetime_matches += 1,
            CellValue::Int(_) | CellValue::Float(_) => {}
            CellValue::Text(text) => {
                if parse_datetime(text).is_some() {
                    self.datetime_matches += 1;
                } else if is_geographic(text) {
                    self.geographic_matches += 1;
                }
            }
            CellValue::Null => {}
        }

        if let Some(value) = cell.as_f64() {
            if value.fract() != 0.0 {
                self.all_integral = false;
            }
            self.numeric.push(value);
        }

        if let Some(text) = cell.as_text() {
            self.text_length_sum += text.chars().count();
        }
    }

    pub fn non_null(&self) -> usize {
        self.total - self.null_count
    }

    pub fn distinct_count(&self) -> usize {
        self.distinct.len()
    }

    pub fn null_ratio(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.null_count as f64 / self.total as f64
        }
    }

    pub fn mean_length(&self) -> Option<f64> {
        let n = self.non_null();
        (n > 0).then(|| self.text_length_sum as f64 / n as f64)
    }

    fn distinct_ratio(&self) -> f64 {
        let n = self.non_null();
        if n == 0 {
            0.0
        } else {
            self.distinct_count() as f64 / n as f64
        }
    }

    fn share(&self, matches: usize) -> f64 {
        let n = self.non_null();
        if n == 0 {
            0.0
        } else {
            matches as f64 / n as f64
        }
    }
}

/// Applies the ordered type tests to a scan.
pub fn classify(scan: &ColumnScan, policy: &ProfilingPolicy) -> DataType {
    let n = scan.non_null();
    if n == 0 {
        return DataType::Categorical;
    }
    let threshold = policy.type_match_ratio;

    if scan.share(scan.datetime_matches) >= threshold {
        return DataType::Datetime;
    }

    if scan.share(scan.geographic_matches) >= threshold {
        return DataType::Geographic;
    }

    if scan.share(scan.numeric.len()) >= threshold {
        let discrete_limit = policy
            .discrete_min_distinct
            .max((policy.discrete_distinct_ratio * n as f64).floor() as usize);
        return if scan.all_integral && scan.distinct_count() <= discrete_limit {
            DataType::NumericDiscrete
        } else {
            DataType::NumericContinuous
        };
    }

    if let Some(mean_length) = scan.mean_length() {
        if mean_length >= policy.text_min_mean_length
            && scan.distinct_ratio() > policy.text_min_distinct_ratio
        {
            return DataType::Text;
        }
    }

    if scan.share(scan.native_bool) >= threshold {
        return DataType::Boolean;
    }
    if scan.distinct_count() == 2 {
        if let [a, b] = scan.first_values.as_slice() {
            if is_boolean_pair(a, b) {
                return DataType::Boolean;
            }
        }
    }

    DataType::Categorical
}

/// Whether a categorical column has too many levels to tabulate usefully.
pub fn is_high_cardinality(scan: &ColumnScan, policy: &ProfilingPolicy) -> bool {
    scan.non_null() > 0
        && (scan.distinct_ratio() > policy.high_cardinality_ratio
            || scan.distinct_count() > policy.high_cardinality_max_distinct)
}

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use artcrm_core::Category;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Confidence that a candidate is a good outreach target, 0..=100.
///
/// Construction clamps, so a value outside the range cannot exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "i64", into = "i64")]
pub struct ConfidenceScore(u8);

impl ConfidenceScore {
    pub const MIN: ConfidenceScore = ConfidenceScore(0);
    pub const MAX: ConfidenceScore = ConfidenceScore(100);

    /// Score given to a candidate no source or model has rated.
    pub const DEFAULT: ConfidenceScore = ConfidenceScore(50);

    #[must_use]
    pub fn new(value: i64) -> Self {
        // Clamped into 0..=100 first, so the narrowing cannot truncate.
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let clamped = value.clamp(0, 100) as u8;
        Self(clamped)
    }

    #[must_use]
    pub fn get(self) -> u8 {
        self.0
    }
}

impl Default for ConfidenceScore {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl From<i64> for ConfidenceScore {
    fn from(value: i64) -> Self {
        Self::new(value)
    }
}

impl From<ConfidenceScore> for i64 {
    fn from(value: ConfidenceScore) -> Self {
        i64::from(value.0)
    }
}

impl std::fmt::Display for ConfidenceScore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where a candidate was discovered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SourceKind {
    #[serde(rename = "google_maps")]
    GooglePlaces,
    #[serde(rename = "openstreetmap")]
    Overpass,
}

impl SourceKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SourceKind::GooglePlaces => "google_maps",
            SourceKind::Overpass => "openstreetmap",
        }
    }

    /// Confidence assigned to a freshly discovered candidate, before enrichment.
    #[must_use]
    pub fn baseline_confidence(self) -> ConfidenceScore {
        match self {
            SourceKind::GooglePlaces => ConfidenceScore::new(90),
            SourceKind::Overpass => ConfidenceScore::new(70),
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One adapter call: a category in a city.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery {
    pub city: String,
    pub country: String,
    pub category: Category,
    pub radius_km: f64,
}

/// A prospective contact, normalized across sources.
///
/// `name` is never empty: adapters fall back to `"Unnamed <category>"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadCandidate {
    pub name: String,
    pub address: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub website: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub category: Category,
    pub subtype: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub confidence_score: ConfidenceScore,
    pub source: SourceKind,
    /// Model explanation captured during enrichment. Only kept in the artifact.
    pub reasoning: Option<String>,
    /// The source's original record, verbatim.
    pub raw_data: serde_json::Value,
}

impl LeadCandidate {
    /// Starts a candidate for `query`, using the source's baseline confidence.
    #[must_use]
    pub fn new(name: Option<&str>, query: &SearchQuery, source: SourceKind) -> Self {
        Self {
            name: display_name(name, &query.category),
            address: None,
            city: Some(query.city.clone()),
            country: Some(query.country.clone()),
            website: None,
            email: None,
            phone: None,
            category: query.category.clone(),
            subtype: None,
            latitude: None,
            longitude: None,
            confidence_score: source.baseline_confidence(),
            source,
            reasoning: None,
            raw_data: serde_json::Value::Null,
        }
    }
}

/// Trimmed `name`, or `"Unnamed <category>"` when it is missing or blank.
#[must_use]
pub fn display_name(name: Option<&str>, category: &Category) -> String {
    match name.map(str::trim) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => format!("Unnamed {category}"),
    }
}

/// Trimmed value, or `None` when missing or blank.
pub(crate) fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// Counters for one scout run. Serialized into the run artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoutStats {
    pub city: String,
    pub country: String,
    pub categories_searched: Vec<Category>,
    pub sources_used: BTreeSet<SourceKind>,
    pub counts_by_category: BTreeMap<String, usize>,
    pub total_found: usize,
    pub total_inserted: usize,
    pub total_merged: usize,
    pub total_skipped: usize,
    pub interrupted: bool,
    pub timestamp: DateTime<Utc>,
}

impl ScoutStats {
    #[must_use]
    pub fn new(city: &str, country: &str, timestamp: DateTime<Utc>) -> Self {
        Self {
            city: city.to_string(),
            country: country.to_string(),
            categories_searched: Vec::new(),
            sources_used: BTreeSet::new(),
            counts_by_category: BTreeMap::new(),
            total_found: 0,
            total_inserted: 0,
            total_merged: 0,
            total_skipped: 0,
            interrupted: false,
            timestamp,
        }
    }
}

/// Everything a scout run produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoutRunResult {
    pub stats: ScoutStats,
    pub candidates: Vec<LeadCandidate>,
    pub inserted_ids: Vec<i64>,
    pub merged_ids: Vec<i64>,
    #[serde(skip)]
    pub results_file: Option<PathBuf>,
}

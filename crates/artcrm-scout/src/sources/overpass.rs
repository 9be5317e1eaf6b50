//! OpenStreetMap Overpass adapter.
//!
//! Runs a single area query per search. The city's administrative boundary
//! bounds the search, so the requested radius is not used here.

use std::collections::HashMap;

use artcrm_core::Category;
use reqwest::{Client, Url};
use serde::Deserialize;

use crate::error::SourceError;
use crate::http::build_client;
use crate::sources::SourceAdapter;
use crate::types::{non_blank, LeadCandidate, SearchQuery, SourceKind};

const SOURCE_NAME: &str = "overpass";

pub struct OverpassClient {
    client: Client,
    endpoint: Url,
}

impl OverpassClient {
    /// Creates a client posting to `endpoint` (the full interpreter URL).
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Http`] if the `reqwest` client cannot be built,
    /// or [`SourceError::InvalidBaseUrl`] if `endpoint` does not parse.
    pub fn new(endpoint: &str, timeout_secs: u64, user_agent: &str) -> Result<Self, SourceError> {
        let endpoint = Url::parse(endpoint).map_err(|e| SourceError::InvalidBaseUrl {
            url: endpoint.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            client: build_client(timeout_secs, user_agent)?,
            endpoint,
        })
    }

    async fn try_search(&self, query: &SearchQuery) -> Result<Vec<LeadCandidate>, SourceError> {
        let overpass_query = build_overpass_query(&query.city, &query.category);

        let response = self
            .client
            .post(self.endpoint.clone())
            .form(&[("data", overpass_query.as_str())])
            .send()
            .await?
            .error_for_status()?;
        let body: serde_json::Value = response.json().await?;

        let elements = body
            .get("elements")
            .and_then(serde_json::Value::as_array)
            .cloned()
            .unwrap_or_default();

        let mut candidates = Vec::with_capacity(elements.len());
        for raw in elements {
            let element: Element =
                serde_json::from_value(raw.clone()).map_err(|source| SourceError::Deserialize {
                    context: format!("overpass element in {}", query.city),
                    source,
                })?;
            if let Some(candidate) = candidate_from_element(element, raw, query) {
                candidates.push(candidate);
            }
        }
        Ok(candidates)
    }
}

impl SourceAdapter for OverpassClient {
    fn kind(&self) -> SourceKind {
        SourceKind::Overpass
    }

    async fn search(&self, query: &SearchQuery) -> Vec<LeadCandidate> {
        match self.try_search(query).await {
            Ok(candidates) => {
                tracing::debug!(
                    source = SOURCE_NAME,
                    city = %query.city,
                    category = %query.category,
                    count = candidates.len(),
                    "collected OpenStreetMap candidates"
                );
                candidates
            }
            Err(e) => {
                tracing::warn!(
                    source = SOURCE_NAME,
                    city = %query.city,
                    category = %query.category,
                    error = %e,
                    "Overpass search failed"
                );
                Vec::new()
            }
        }
    }
}

/// Overpass QL tag filter for a category.
fn tag_filter(category: &Category) -> String {
    match category {
        Category::Gallery => r#"["tourism"="gallery"]"#.to_string(),
        Category::Cafe => r#"["amenity"="cafe"]"#.to_string(),
        Category::Coworking => r#"["office"="coworking"]"#.to_string(),
        Category::Other(raw) => format!(r#"["amenity"="{}"]"#, escape_ql(raw)),
    }
}

/// Builds the area query for `category` inside the administrative area named `city`.
#[must_use]
pub fn build_overpass_query(city: &str, category: &Category) -> String {
    let filter = tag_filter(category);
    let city = escape_ql(city);
    format!(
        r#"[out:json][timeout:25];
area["name"="{city}"]["admin_level"~"[4-8]"]->.searchArea;
(
  node{filter}(area.searchArea);
  way{filter}(area.searchArea);
  relation{filter}(area.searchArea);
);
out center;"#
    )
}

fn escape_ql(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Converts one element, or `None` when it has no coordinates or is tagged
/// as disused or abandoned.
fn candidate_from_element(
    element: Element,
    raw: serde_json::Value,
    query: &SearchQuery,
) -> Option<LeadCandidate> {
    let tags = &element.tags;
    if tags
        .keys()
        .any(|key| key.starts_with("disused:") || key.starts_with("abandoned:"))
    {
        return None;
    }

    let (lat, lon) = match (element.lat, element.lon, &element.center) {
        (Some(lat), Some(lon), _) => (lat, lon),
        (_, _, Some(center)) => (center.lat, center.lon),
        _ => return None,
    };

    let tag = |key: &str| non_blank(tags.get(key).map(String::as_str));
    let either = |primary: &str, fallback: &str| tag(primary).or_else(|| tag(fallback));

    let mut candidate = LeadCandidate::new(
        tags.get("name").map(String::as_str),
        query,
        SourceKind::Overpass,
    );
    candidate.address = tag("addr:street").map(|street| match tag("addr:housenumber") {
        Some(number) => format!("{street} {number}"),
        None => street,
    });
    if let Some(city) = tag("addr:city") {
        candidate.city = Some(city);
    }
    candidate.website = either("website", "contact:website");
    candidate.email = either("email", "contact:email");
    candidate.phone = either("phone", "contact:phone");
    candidate.latitude = Some(lat);
    candidate.longitude = Some(lon);
    candidate.raw_data = raw;
    Some(candidate)
}

#[derive(Debug, Deserialize)]
struct Element {
    lat: Option<f64>,
    lon: Option<f64>,
    center: Option<Center>,
    #[serde(default)]
    tags: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct Center {
    lat: f64,
    lon: f64,
}

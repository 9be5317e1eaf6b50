//! Google Places (legacy JSON web service) adapter.
//!
//! One text search per query, then one details request per returned place.
//! Requests are spaced by the configured delay.

use std::time::Duration;

use artcrm_core::Category;
use reqwest::{Client, Url};
use serde::Deserialize;

use crate::error::SourceError;
use crate::http::{build_client, normalise_base_url, snippet};
use crate::sources::{SourceAdapter, Throttle};
use crate::types::{non_blank, LeadCandidate, SearchQuery, SourceKind};

const DEFAULT_BASE_URL: &str = "https://maps.googleapis.com/";
const TEXT_SEARCH_PATH: &str = "maps/api/place/textsearch/json";
const DETAILS_PATH: &str = "maps/api/place/details/json";
const DETAILS_FIELDS: &str =
    "name,formatted_address,website,formatted_phone_number,geometry,types,business_status";
const SOURCE_NAME: &str = "google_places";

pub struct GooglePlacesClient {
    client: Client,
    api_key: Option<String>,
    base_url: Url,
    request_delay: Duration,
}

impl GooglePlacesClient {
    /// Creates a client pointed at the production Places API.
    ///
    /// A missing `api_key` is accepted: every search then logs a warning and
    /// returns no candidates.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Http`] if the `reqwest` client cannot be built.
    pub fn new(
        api_key: Option<&str>,
        timeout_secs: u64,
        user_agent: &str,
        request_delay: Duration,
    ) -> Result<Self, SourceError> {
        Self::with_base_url(api_key, timeout_secs, user_agent, request_delay, DEFAULT_BASE_URL)
    }

    /// Creates a client with a custom base URL (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Http`] if the `reqwest` client cannot be built,
    /// or [`SourceError::InvalidBaseUrl`] if `base_url` does not parse.
    pub fn with_base_url(
        api_key: Option<&str>,
        timeout_secs: u64,
        user_agent: &str,
        request_delay: Duration,
        base_url: &str,
    ) -> Result<Self, SourceError> {
        Ok(Self {
            client: build_client(timeout_secs, user_agent)?,
            api_key: api_key
                .map(str::trim)
                .filter(|key| !key.is_empty())
                .map(str::to_string),
            base_url: normalise_base_url(base_url)?,
            request_delay,
        })
    }

    async fn try_search(
        &self,
        api_key: &str,
        query: &SearchQuery,
    ) -> Result<Vec<LeadCandidate>, SourceError> {
        let mut throttle = Throttle::new(self.request_delay);
        let place_type = place_type(&query.category);

        let text_query = format!("{place_type} in {}, {}", query.city, query.country);
        let mut params = vec![
            ("query", text_query),
            ("type", place_type.to_string()),
            ("key", api_key.to_string()),
        ];
        if query.radius_km > 0.0 {
            params.push(("radius", radius_metres(query.radius_km).to_string()));
        }

        throttle.ready().await;
        let body = self.get_json(TEXT_SEARCH_PATH, &params).await?;
        let search: TextSearchResponse = parse(body, || format!("textsearch({place_type})"))?;
        check_status(&search.status, search.error_message.as_deref())?;

        let mut candidates = Vec::with_capacity(search.results.len());
        for place in search.results {
            throttle.ready().await;
            let params = [
                ("place_id", place.place_id.clone()),
                ("fields", DETAILS_FIELDS.to_string()),
                ("key", api_key.to_string()),
            ];
            let body = self.get_json(DETAILS_PATH, &params).await?;
            let details: DetailsResponse =
                parse(body, || format!("details(place_id={})", place.place_id))?;

            if matches!(details.status.as_str(), "NOT_FOUND" | "ZERO_RESULTS") {
                tracing::debug!(place_id = %place.place_id, status = %details.status, "place vanished");
                continue;
            }
            check_status(&details.status, details.error_message.as_deref())?;

            let Some(raw) = details.result else {
                continue;
            };
            if let Some(candidate) = candidate_from_details(raw, query)? {
                candidates.push(candidate);
            }
        }

        Ok(candidates)
    }

    async fn get_json(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<serde_json::Value, SourceError> {
        let mut url = self
            .base_url
            .join(path)
            .map_err(|e| SourceError::InvalidBaseUrl {
                url: self.base_url.to_string(),
                reason: e.to_string(),
            })?;
        url.query_pairs_mut()
            .extend_pairs(params.iter().map(|(k, v)| (*k, v.as_str())));

        let response = self.client.get(url).send().await?.error_for_status()?;
        Ok(response.json().await?)
    }
}

impl SourceAdapter for GooglePlacesClient {
    fn kind(&self) -> SourceKind {
        SourceKind::GooglePlaces
    }

    async fn search(&self, query: &SearchQuery) -> Vec<LeadCandidate> {
        let Some(api_key) = self.api_key.as_deref() else {
            tracing::warn!(
                source = SOURCE_NAME,
                "GOOGLE_MAPS_API_KEY not set; skipping Google Places"
            );
            return Vec::new();
        };

        match self.try_search(api_key, query).await {
            Ok(candidates) => {
                tracing::debug!(
                    source = SOURCE_NAME,
                    city = %query.city,
                    category = %query.category,
                    count = candidates.len(),
                    "collected Google Places candidates"
                );
                candidates
            }
            Err(e) => {
                tracing::warn!(
                    source = SOURCE_NAME,
                    city = %query.city,
                    category = %query.category,
                    error = %e,
                    "Google Places search failed"
                );
                Vec::new()
            }
        }
    }
}

/// Places API `type` for a category.
#[must_use]
pub(crate) fn place_type(category: &Category) -> &str {
    match category {
        Category::Gallery => "art_gallery",
        Category::Cafe => "cafe",
        Category::Coworking => "coworking_space",
        Category::Other(raw) => raw,
    }
}

// Radii are small positive distances; the Places API caps them at 50 km.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn radius_metres(radius_km: f64) -> u64 {
    (radius_km * 1000.0).round().max(0.0) as u64
}

fn check_status(status: &str, error_message: Option<&str>) -> Result<(), SourceError> {
    match status {
        "OK" | "ZERO_RESULTS" => Ok(()),
        other => Err(SourceError::Api {
            source_name: SOURCE_NAME,
            status: other.to_string(),
            message: snippet(error_message.unwrap_or("no error message")),
        }),
    }
}

fn parse<T: serde::de::DeserializeOwned>(
    body: serde_json::Value,
    context: impl FnOnce() -> String,
) -> Result<T, SourceError> {
    serde_json::from_value(body).map_err(|source| SourceError::Deserialize {
        context: context(),
        source,
    })
}

/// Converts a details `result` object, or `None` for a permanently closed place.
fn candidate_from_details(
    raw: serde_json::Value,
    query: &SearchQuery,
) -> Result<Option<LeadCandidate>, SourceError> {
    let place: PlaceDetails = parse(raw.clone(), || "details result".to_string())?;

    if place.business_status.as_deref() == Some("CLOSED_PERMANENTLY") {
        tracing::debug!(name = ?place.name, "skipping permanently closed place");
        return Ok(None);
    }

    let mut candidate = LeadCandidate::new(place.name.as_deref(), query, SourceKind::GooglePlaces);
    candidate.address = non_blank(place.formatted_address.as_deref());
    candidate.website = non_blank(place.website.as_deref());
    candidate.phone = non_blank(place.formatted_phone_number.as_deref());
    if let Some(location) = place.geometry.and_then(|g| g.location) {
        candidate.latitude = Some(location.lat);
        candidate.longitude = Some(location.lng);
    }
    candidate.raw_data = raw;
    Ok(Some(candidate))
}

#[derive(Debug, Deserialize)]
struct TextSearchResponse {
    status: String,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    results: Vec<PlaceRef>,
}

#[derive(Debug, Deserialize)]
struct PlaceRef {
    place_id: String,
}

#[derive(Debug, Deserialize)]
struct DetailsResponse {
    status: String,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    result: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct PlaceDetails {
    name: Option<String>,
    formatted_address: Option<String>,
    website: Option<String>,
    formatted_phone_number: Option<String>,
    business_status: Option<String>,
    geometry: Option<Geometry>,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: Option<LatLng>,
}

#[derive(Debug, Deserialize)]
struct LatLng {
    lat: f64,
    lng: f64,
}

//! Forward and reverse geocoding against the hosted geocoding service.
//!
//! Requests go out through the `Http` capability; the shell performs the
//! transport and the completion comes back as an [`Event`] stamped with the
//! request token it was issued under.

use crux_http::Http;
use serde::{de, Deserialize, Deserializer, Serialize};
use thiserror::Error;
use url::Url;

use crate::config::{ApiKey, GeoviewConfig};
use crate::event::{Event, LngLat, SuggestionId};
use crate::suggestion::RequestToken;

/// Queries shorter than this never reach the network.
pub const MIN_QUERY_CHARS: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeocodingError {
    #[error("transport failure: {0}")]
    Transport(String),

    #[error("geocoding service returned status {0}")]
    Status(u16),

    #[error("could not decode geocoding response: {0}")]
    Decode(String),

    #[error("could not build request URL: {0}")]
    InvalidUrl(String),
}

impl From<crux_http::HttpError> for GeocodingError {
    fn from(e: crux_http::HttpError) -> Self {
        match e {
            crux_http::HttpError::Http { code, .. }
                if code.is_client_error() || code.is_server_error() =>
            {
                GeocodingError::Status(u16::from(code))
            }
            crux_http::HttpError::Json(message) => GeocodingError::Decode(message),
            other => GeocodingError::Transport(other.to_string()),
        }
    }
}

// --- Wire format ---

#[derive(Debug, Clone, Deserialize)]
pub struct FeatureCollection {
    #[serde(default, deserialize_with = "usable_features")]
    pub features: Vec<Feature>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Feature {
    pub id: String,
    #[serde(default)]
    pub place_name: Option<String>,
    #[serde(default)]
    pub place_name_en: Option<String>,
    pub geometry: PointGeometry,
    #[serde(default)]
    pub bbox: Option<[f64; 4]>,
    #[serde(default)]
    pub relevance: Option<f64>,
    #[serde(default)]
    pub properties: serde_json::Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PointGeometry {
    #[serde(deserialize_with = "position")]
    pub coordinates: LngLat,
}

/// A feature the service sends in a shape we cannot use is dropped on its
/// own; the rest of the collection is kept in order.
fn usable_features<'de, D>(deserializer: D) -> Result<Vec<Feature>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Vec::<serde_json::Value>::deserialize(deserializer)?;
    let total = raw.len();
    let features: Vec<Feature> = raw
        .into_iter()
        .filter_map(|value| match serde_json::from_value::<Feature>(value) {
            Ok(feature) => Some(feature),
            Err(e) => {
                tracing::debug!(error = %e, "skipping unusable feature");
                None
            }
        })
        .collect();
    if features.len() < total {
        tracing::warn!(
            kept = features.len(),
            total,
            "geocoding response contained unusable features"
        );
    }
    Ok(features)
}

/// GeoJSON positions may carry an altitude after longitude and latitude.
fn position<'de, D>(deserializer: D) -> Result<LngLat, D::Error>
where
    D: Deserializer<'de>,
{
    let values = Vec::<f64>::deserialize(deserializer)?;
    match values.as_slice() {
        [lng, lat, ..] => LngLat::new(*lng, *lat).map_err(de::Error::custom),
        _ => Err(de::Error::invalid_length(
            values.len(),
            &"a position with at least two elements",
        )),
    }
}

impl FeatureCollection {
    /// Service order is kept as-is.
    pub fn into_suggestions(self) -> Vec<SuggestionResult> {
        self.features.into_iter().map(SuggestionResult::from).collect()
    }
}

// --- Domain ---

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl From<[f64; 4]> for BoundingBox {
    fn from([west, south, east, north]: [f64; 4]) -> Self {
        Self {
            west,
            south,
            east,
            north,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SuggestionResult {
    pub id: SuggestionId,
    pub display_name: String,
    pub coordinates: LngLat,
    pub bounding_box: Option<BoundingBox>,
    pub relevance: f64,
    pub raw_properties: serde_json::Value,
}

impl From<Feature> for SuggestionResult {
    fn from(feature: Feature) -> Self {
        let display_name = feature
            .place_name_en
            .or(feature.place_name)
            .unwrap_or_default();
        Self {
            id: SuggestionId::new(feature.id),
            display_name,
            coordinates: feature.geometry.coordinates,
            bounding_box: feature.bbox.map(BoundingBox::from),
            relevance: feature.relevance.unwrap_or_default(),
            raw_properties: feature.properties,
        }
    }
}

/// Result of a reverse lookup as seen by the search state.
#[derive(Clone, Debug, PartialEq)]
pub enum ReverseOutcome {
    Resolved {
        selection: SuggestionResult,
        candidates: Vec<SuggestionResult>,
    },
    NotFound,
    Error(GeocodingError),
}

impl ReverseOutcome {
    pub fn from_candidates(candidates: Vec<SuggestionResult>) -> Self {
        match candidates.first().cloned() {
            Some(selection) => ReverseOutcome::Resolved {
                selection,
                candidates,
            },
            None => ReverseOutcome::NotFound,
        }
    }
}

impl From<Result<Vec<SuggestionResult>, GeocodingError>> for ReverseOutcome {
    fn from(result: Result<Vec<SuggestionResult>, GeocodingError>) -> Self {
        match result {
            Ok(candidates) => Self::from_candidates(candidates),
            Err(e) => ReverseOutcome::Error(e),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Dispatch {
    Sent,
    Skipped,
}

#[must_use]
pub fn accepts_query(query: &str) -> bool {
    query.chars().count() >= MIN_QUERY_CHARS
}

// --- Client ---

#[derive(Clone, Debug)]
pub struct GeocodingClient {
    base: Url,
    api_key: ApiKey,
}

impl GeocodingClient {
    pub fn new(config: &GeoviewConfig) -> Self {
        Self {
            base: config.geocoding_base().clone(),
            api_key: config.api_key().clone(),
        }
    }

    pub fn forward_url(&self, query: &str, proximity: LngLat) -> Result<Url, GeocodingError> {
        let mut url = self.endpoint(&format!("{query}.json"))?;
        url.query_pairs_mut()
            .append_pair("autocomplete", "true")
            .append_pair("proximity", &proximity.to_string())
            .append_pair("key", self.api_key.expose());
        Ok(url)
    }

    pub fn reverse_url(&self, at: LngLat) -> Result<Url, GeocodingError> {
        let mut url = self.endpoint(&format!("{at}.json"))?;
        url.query_pairs_mut().append_pair("key", self.api_key.expose());
        Ok(url)
    }

    /// Issues an autocomplete search biased towards `proximity`.
    /// Short queries are not sent at all.
    pub fn forward_search(
        &self,
        http: &Http<Event>,
        token: RequestToken,
        query: &str,
        proximity: LngLat,
    ) -> Result<Dispatch, GeocodingError> {
        if !accepts_query(query) {
            return Ok(Dispatch::Skipped);
        }

        let url = self.forward_url(query, proximity)?;
        http.get(url.as_str())
            .expect_json::<FeatureCollection>()
            .send(move |result| Event::ForwardSearchCompleted {
                token,
                result: collect_features(result),
            });
        Ok(Dispatch::Sent)
    }

    pub fn reverse_lookup(
        &self,
        http: &Http<Event>,
        token: RequestToken,
        at: LngLat,
    ) -> Result<(), GeocodingError> {
        let url = self.reverse_url(at)?;
        http.get(url.as_str())
            .expect_json::<FeatureCollection>()
            .send(move |result| Event::ReverseLookupCompleted {
                token,
                result: collect_features(result),
            });
        Ok(())
    }

    fn endpoint(&self, segment: &str) -> Result<Url, GeocodingError> {
        let mut url = self.base.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|()| GeocodingError::InvalidUrl(format!("{} cannot be a base", self.base)))?;
            segments.pop_if_empty().push(segment);
        }
        Ok(url)
    }
}

fn collect_features(
    result: crux_http::Result<crux_http::Response<FeatureCollection>>,
) -> Result<Vec<SuggestionResult>, GeocodingError> {
    let mut response = result.map_err(GeocodingError::from)?;

    let status = response.status();
    if !status.is_success() {
        return Err(GeocodingError::Status(u16::from(status)));
    }

    response
        .take_body()
        .map(FeatureCollection::into_suggestions)
        .ok_or_else(|| GeocodingError::Decode("empty response body".to_string()))
}

// src/cities/search_info.rs
use url::Url;

use crate::cities::categories::AttractionCategory;
use crate::cities::error::FetchError;

pub const CITY_LOOKUP_LIMIT: u32 = 6;
pub const RESULTS_PER_ATTRACTION_CAT: usize = 500;
/// Distance from the point of search (city) in metres.
pub const ATTRACTION_SEARCH_RADIUS_M: u32 = 5000;
/// How many days the forecast should include.
pub const FORECAST_DAYS: u32 = 3;

/// Everything needed for one upstream request: endpoint, query parameters
/// and headers. Builders return `None` when a required input is missing, so
/// callers must check before firing.
#[derive(Debug, Clone)]
pub struct SearchInfo {
    pub url: &'static str,
    pub params: Vec<(String, String)>,
    pub headers: Vec<(&'static str, String)>,
}

impl SearchInfo {
    /// The final request URL, also used as the response-cache key.
    pub fn full_url(&self) -> Result<Url, FetchError> {
        let mut url = Url::parse(self.url)
            .map_err(|e| FetchError::Config(format!("bad upstream url {}: {e}", self.url)))?;
        url.query_pairs_mut()
            .extend_pairs(self.params.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        Ok(url)
    }
}

fn rapid_headers(api_key: &str, host: &'static str) -> Vec<(&'static str, String)> {
    vec![
        ("X-RapidAPI-Host", host.to_string()),
        ("X-RapidAPI-Key", api_key.to_string()),
    ]
}

/// City lookup by name prefix.
pub fn city_search(api_key: &str, city: &str) -> Option<SearchInfo> {
    if city.is_empty() {
        return None;
    }
    Some(SearchInfo {
        url: "https://wft-geo-db.p.rapidapi.com/v1/geo/cities",
        params: vec![
            ("namePrefix".into(), city.to_string()),
            ("limit".into(), CITY_LOOKUP_LIMIT.to_string()),
        ],
        headers: rapid_headers(api_key, "wft-geo-db.p.rapidapi.com"),
    })
}

/// Current conditions at a coordinate.
pub fn current_temp(api_key: &str, latitude: f64, longitude: f64) -> Option<SearchInfo> {
    if !latitude.is_finite() || !longitude.is_finite() {
        return None;
    }
    Some(SearchInfo {
        url: "https://weatherapi-com.p.rapidapi.com/current.json",
        params: vec![("q".into(), format!("{latitude},{longitude}"))],
        headers: rapid_headers(api_key, "weatherapi-com.p.rapidapi.com"),
    })
}

/// Points of interest around a coordinate. The request limit scales with the
/// number of categories so each category can fill its share.
pub fn attractions(
    api_key: &str,
    latitude: f64,
    longitude: f64,
    categories: &[AttractionCategory],
) -> Option<SearchInfo> {
    if !latitude.is_finite() || !longitude.is_finite() || categories.is_empty() {
        return None;
    }
    let kinds = categories
        .iter()
        .map(|c| c.code())
        .collect::<Vec<_>>()
        .join(",");
    let limit = RESULTS_PER_ATTRACTION_CAT * categories.len();

    Some(SearchInfo {
        url: "https://opentripmap-places-v1.p.rapidapi.com/en/places/radius",
        params: vec![
            ("kinds".into(), kinds),
            ("format".into(), "json".into()),
            ("limit".into(), limit.to_string()),
            ("lon".into(), longitude.to_string()),
            ("radius".into(), ATTRACTION_SEARCH_RADIUS_M.to_string()),
            ("lat".into(), latitude.to_string()),
        ],
        headers: rapid_headers(api_key, "opentripmap-places-v1.p.rapidapi.com"),
    })
}

/// Multi-day forecast at a coordinate.
pub fn forecast(api_key: &str, latitude: f64, longitude: f64) -> Option<SearchInfo> {
    if !latitude.is_finite() || !longitude.is_finite() {
        return None;
    }
    Some(SearchInfo {
        url: "https://weatherapi-com.p.rapidapi.com/forecast.json",
        params: vec![
            ("q".into(), format!("{latitude},{longitude}")),
            ("days".into(), FORECAST_DAYS.to_string()),
        ],
        headers: rapid_headers(api_key, "weatherapi-com.p.rapidapi.com"),
    })
}

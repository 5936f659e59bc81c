// src/cities/fetch.rs
use reqwest::blocking::Client;
use reqwest::header::{CONTENT_TYPE, RETRY_AFTER};
use serde_json::Value;
use std::time::Duration;

use crate::cities::aggregate::CityApi;
use crate::cities::cache::ResponseCache;
use crate::cities::categories::AttractionCategory;
use crate::cities::error::FetchError;
use crate::cities::models::{Attraction, Attractions, CitySeed, ForecastDay};
use crate::cities::search_info::{self, SearchInfo};

const USER_AGENT: &str = "city_scout/0.1";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

pub const MAX_RETRIES: u32 = 3;
pub const BASE_DELAY: Duration = Duration::from_millis(1000);

/// Blocking client for the RapidAPI upstreams, with a read-through response
/// cache keyed by request URL.
pub struct ApiClient {
    client: Client,
    api_key: String,
    cache: ResponseCache,
}

impl ApiClient {
    pub fn new(api_key: String, cache: ResponseCache) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| FetchError::Network(e.to_string()))?;

        Ok(Self {
            client,
            api_key,
            cache,
        })
    }

    fn fetch_json(&self, info: &SearchInfo, now: i64) -> Result<Value, FetchError> {
        let url = info.full_url()?;

        if let Some(cached) = self.cache.get(url.as_str(), now) {
            return Ok(cached);
        }

        let value = fetch_with_retry(
            &self.client,
            url.as_str(),
            &info.headers,
            MAX_RETRIES,
            BASE_DELAY,
        )?;
        self.cache.insert(url.as_str(), value.clone(), now);
        Ok(value)
    }
}

/// Fetch a URL and parse the body as JSON, retrying transient failures.
///
/// - HTTP 429: sleep for `Retry-After` (seconds) when present, else twice
///   the base delay, then retry.
/// - Other non-2xx, HTML-disguised bodies, and parse failures: linear
///   backoff (`base_delay × attempt`), then retry.
/// - Exhausted retries surface the last error; callers pick the per-field
///   fallback.
pub fn fetch_with_retry(
    client: &Client,
    url: &str,
    headers: &[(&'static str, String)],
    max_retries: u32,
    base_delay: Duration,
) -> Result<Value, FetchError> {
    let mut last_err = FetchError::Network("no attempts made".into());

    for attempt in 1..=max_retries {
        let mut request = client.get(url);
        for (name, value) in headers {
            request = request.header(*name, value.as_str());
        }

        let failure = match request.send() {
            Err(e) => FetchError::Network(e.to_string()),
            Ok(resp) => {
                let status = resp.status().as_u16();
                let retry_after = resp
                    .headers()
                    .get(RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|s| s.parse::<u64>().ok());
                let content_type = resp
                    .headers()
                    .get(CONTENT_TYPE)
                    .and_then(|v| v.to_str().ok())
                    .map(String::from);

                if !(200..300).contains(&status) {
                    if attempt < max_retries {
                        log::warn!("HTTP {status} from {url} (attempt {attempt}/{max_retries})");
                        std::thread::sleep(backoff_after(
                            status,
                            retry_after,
                            attempt,
                            base_delay,
                        ));
                        last_err = FetchError::Status(status);
                        continue;
                    }
                    return Err(FetchError::Status(status));
                }

                match resp.text() {
                    Err(e) => FetchError::Network(e.to_string()),
                    Ok(body) => {
                        if looks_like_html(content_type.as_deref(), &body) {
                            // A 200 wrapping an HTML page: rate-limit or
                            // auth wall pretending everything is fine.
                            FetchError::HtmlBody
                        } else {
                            match serde_json::from_str(&body) {
                                Ok(value) => return Ok(value),
                                Err(e) => FetchError::JsonParse(e.to_string()),
                            }
                        }
                    }
                }
            }
        };

        if attempt < max_retries {
            log::warn!("{failure} from {url} (attempt {attempt}/{max_retries})");
            std::thread::sleep(base_delay * attempt);
            last_err = failure;
        } else {
            return Err(failure);
        }
    }

    Err(last_err)
}

/// Delay before the next attempt after a non-2xx response.
fn backoff_after(
    status: u16,
    retry_after_secs: Option<u64>,
    attempt: u32,
    base_delay: Duration,
) -> Duration {
    if status == 429 {
        match retry_after_secs {
            Some(secs) => Duration::from_millis(secs * 1000),
            None => base_delay * 2,
        }
    } else {
        base_delay * attempt
    }
}

/// Detects an HTML page standing in for a JSON body.
fn looks_like_html(content_type: Option<&str>, body: &str) -> bool {
    if let Some(ct) = content_type {
        if let Ok(m) = ct.parse::<mime::Mime>() {
            if m.type_() == mime::TEXT && m.subtype() == mime::HTML {
                return true;
            }
        }
    }
    let head = body.trim_start();
    let lowered = head
        .chars()
        .take(16)
        .collect::<String>()
        .to_ascii_lowercase();
    lowered.starts_with("<!doctype") || lowered.starts_with("<html")
}

pub fn parse_city_seeds(value: &Value) -> Result<Vec<CitySeed>, FetchError> {
    let data = value
        .get("data")
        .and_then(Value::as_array)
        .ok_or_else(|| FetchError::JsonParse("city lookup payload missing data array".into()))?;

    data.iter()
        .map(|item| {
            serde_json::from_value(item.clone()).map_err(|e| FetchError::JsonParse(e.to_string()))
        })
        .collect()
}

pub fn parse_current_temp(value: &Value) -> Result<f64, FetchError> {
    value
        .get("current")
        .and_then(|c| c.get("temp_c"))
        .and_then(Value::as_f64)
        .ok_or_else(|| FetchError::JsonParse("current weather payload missing temp_c".into()))
}

pub fn parse_attractions(value: &Value) -> Result<Vec<Attraction>, FetchError> {
    // The POI API answers with a plain array for format=json, but falls back
    // to GeoJSON when the format parameter is dropped. Normalize both.
    match Attractions::from_stored(value) {
        Attractions::Loaded(list) => Ok(list),
        Attractions::FetchFailed(msg) => Err(FetchError::JsonParse(msg)),
    }
}

pub fn parse_forecast(value: &Value) -> Result<Vec<ForecastDay>, FetchError> {
    let days = value
        .get("forecast")
        .and_then(|f| f.get("forecastday"))
        .and_then(Value::as_array)
        .ok_or_else(|| FetchError::JsonParse("forecast payload missing forecastday".into()))?;

    days.iter()
        .map(|day| {
            let date = day
                .get("date")
                .and_then(Value::as_str)
                .and_then(|s| chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
                .ok_or_else(|| FetchError::JsonParse("forecast day missing date".into()))?;
            let avg_temp = day
                .get("day")
                .and_then(|d| d.get("avgtemp_c"))
                .and_then(Value::as_f64)
                .ok_or_else(|| FetchError::JsonParse("forecast day missing avgtemp_c".into()))?;
            Ok(ForecastDay { date, avg_temp })
        })
        .collect()
}

impl CityApi for ApiClient {
    fn search_cities(&self, term: &str, now: i64) -> Result<Vec<CitySeed>, FetchError> {
        let Some(info) = search_info::city_search(&self.api_key, term) else {
            return Ok(Vec::new());
        };
        let value = self.fetch_json(&info, now)?;
        parse_city_seeds(&value)
    }

    fn current_temp(&self, latitude: f64, longitude: f64, now: i64) -> Result<f64, FetchError> {
        let info = search_info::current_temp(&self.api_key, latitude, longitude)
            .ok_or_else(|| FetchError::Config("missing coordinates".into()))?;
        let value = self.fetch_json(&info, now)?;
        parse_current_temp(&value)
    }

    fn attractions(
        &self,
        latitude: f64,
        longitude: f64,
        categories: &[AttractionCategory],
        now: i64,
    ) -> Result<Vec<Attraction>, FetchError> {
        let info = search_info::attractions(&self.api_key, latitude, longitude, categories)
            .ok_or_else(|| FetchError::Config("missing coordinates or categories".into()))?;
        let value = self.fetch_json(&info, now)?;
        parse_attractions(&value)
    }

    fn forecast(
        &self,
        latitude: f64,
        longitude: f64,
        now: i64,
    ) -> Result<Vec<ForecastDay>, FetchError> {
        let info = search_info::forecast(&self.api_key, latitude, longitude)
            .ok_or_else(|| FetchError::Config("missing coordinates".into()))?;
        let value = self.fetch_json(&info, now)?;
        parse_forecast(&value)
    }
}

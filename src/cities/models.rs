// src/cities/models.rs
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{json, Value};
use std::collections::BTreeMap;

use crate::cities::categories::AttractionCategory;

pub const ATTRACTIONS_PER_CAT_LIMIT: usize = 5;
/// Stored attractions older than this are considered stale and refetched.
pub const ATTRACTIONS_MAX_AGE_SECS: i64 = 7 * 24 * 60 * 60;
pub const FETCH_FAILED_MESSAGE: &str = "Could not fetch attractions";
/// Display key used when attractions could not be fetched.
pub const FETCH_FAILED_DISPLAY_KEY: &str = "Error";

/// One point of interest: a name plus a comma-separated category tag string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attraction {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub kinds: String,
}

/// Attractions as held in memory. Storage is always a plain array; the
/// fetch-failure marker is a single element flagged `fetchFailed`, which is
/// how "the upstream call failed" stays distinguishable from "zero found".
#[derive(Debug, Clone, PartialEq)]
pub enum Attractions {
    Loaded(Vec<Attraction>),
    FetchFailed(String),
}

impl Attractions {
    pub fn empty() -> Self {
        Attractions::Loaded(Vec::new())
    }

    /// Normalize a stored attractions value. Invoked exactly once, at the
    /// persistence boundary: older rows may hold a double-encoded JSON
    /// string or a GeoJSON `{features: [...]}` wrapper instead of the plain
    /// array newer rows use. Anything unreadable normalizes to empty.
    pub fn from_stored(value: &Value) -> Self {
        match value {
            Value::String(s) => match serde_json::from_str::<Value>(s) {
                Ok(inner) => Self::from_stored(&inner),
                Err(e) => {
                    log::warn!("unreadable attractions string, treating as empty: {e}");
                    Attractions::empty()
                }
            },
            Value::Object(map) => match map.get("features") {
                Some(Value::Array(features)) => {
                    Attractions::Loaded(features.iter().map(parse_feature).collect())
                }
                _ => Attractions::empty(),
            },
            Value::Array(items) => {
                if let [single] = items.as_slice() {
                    if single
                        .get("fetchFailed")
                        .and_then(Value::as_bool)
                        .unwrap_or(false)
                    {
                        let message = single
                            .get("name")
                            .and_then(Value::as_str)
                            .unwrap_or(FETCH_FAILED_MESSAGE);
                        return Attractions::FetchFailed(message.to_string());
                    }
                }
                Attractions::Loaded(items.iter().map(parse_feature).collect())
            }
            _ => Attractions::empty(),
        }
    }

    /// The storage shape: always a plain array.
    pub fn to_stored(&self) -> Value {
        match self {
            Attractions::Loaded(list) => {
                json!(list)
            }
            Attractions::FetchFailed(message) => {
                json!([{ "name": message, "kinds": "", "fetchFailed": true }])
            }
        }
    }

    /// True when the stored attractions are not worth reusing: nothing was
    /// found, the last fetch failed, or the snapshot is older than
    /// [`ATTRACTIONS_MAX_AGE_SECS`].
    pub fn needs_refresh(&self, updated_at: i64, now: i64) -> bool {
        match self {
            Attractions::FetchFailed(_) => true,
            Attractions::Loaded(list) => {
                list.is_empty() || now - updated_at > ATTRACTIONS_MAX_AGE_SECS
            }
        }
    }
}

impl Serialize for Attractions {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_stored().serialize(serializer)
    }
}

/// POI payloads arrive either flat (`{name, kinds}`) or as GeoJSON features
/// with the interesting bits under `properties`.
fn parse_feature(value: &Value) -> Attraction {
    let lookup = |key: &str| -> String {
        value
            .get(key)
            .or_else(|| value.get("properties").and_then(|p| p.get(key)))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };
    Attraction {
        name: lookup("name"),
        kinds: lookup("kinds"),
    }
}

/// Current temperature, or the sentinel the frontend expects when the
/// weather upstream was unreachable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CurrentTemp {
    Known(f64),
    Unavailable,
}

impl Serialize for CurrentTemp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            CurrentTemp::Known(temp) => serializer.serialize_f64(*temp),
            CurrentTemp::Unavailable => serializer.serialize_str("No data available"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastDay {
    pub date: chrono::NaiveDate,
    #[serde(rename = "avgTemp")]
    pub avg_temp: f64,
}

/// Initial city data from the city-lookup API, before enrichment.
#[derive(Debug, Clone, Deserialize)]
pub struct CitySeed {
    pub name: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub population: i64,
    pub latitude: f64,
    pub longitude: f64,
}

/// A fully aggregated city as returned to the frontend. Enrichment stages
/// each consume the value and hand back a new one, so concurrent fan-out
/// never shares a mutable entity.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct City {
    /// `name + latitude`. Not globally unique (two cities with the same name
    /// and latitude collide); kept for frontend keys and dedup anyway.
    pub id: String,
    pub search_term: String,
    pub name: String,
    pub country_name: String,
    pub population: i64,
    pub latitude: f64,
    pub longitude: f64,
    pub current_temp: CurrentTemp,
    pub attractions: Attractions,
    pub display_attractions: BTreeMap<String, Vec<String>>,
    pub forecast: Vec<ForecastDay>,
}

pub fn city_id(name: &str, latitude: f64) -> String {
    format!("{name}{latitude}")
}

impl City {
    pub fn from_seed(search_term: &str, seed: CitySeed) -> Self {
        Self {
            id: city_id(&seed.name, seed.latitude),
            search_term: search_term.to_string(),
            name: seed.name,
            country_name: seed.country,
            population: seed.population,
            latitude: seed.latitude,
            longitude: seed.longitude,
            current_temp: CurrentTemp::Unavailable,
            attractions: Attractions::empty(),
            display_attractions: BTreeMap::new(),
            forecast: Vec::new(),
        }
    }

    pub fn with_temp(self, current_temp: CurrentTemp) -> Self {
        Self {
            current_temp,
            ..self
        }
    }

    pub fn with_attractions(self, attractions: Attractions) -> Self {
        Self {
            attractions,
            ..self
        }
    }

    pub fn with_forecast(self, forecast: Vec<ForecastDay>) -> Self {
        Self { forecast, ..self }
    }

    pub fn with_display(self, selected: &[AttractionCategory]) -> Self {
        let display_attractions = project_attractions(&self.attractions, selected);
        Self {
            display_attractions,
            ..self
        }
    }
}

/// Group attractions by the selected categories, capped per category.
///
/// Single linear pass in upstream order: each attraction lands in the first
/// selected category its tag string matches, and a category that reaches the
/// cap drops out of the matching set so later attractions skip it. Earlier
/// attractions win cap slots. Order-sensitive, not best-ranked.
pub fn project_attractions(
    attractions: &Attractions,
    selected: &[AttractionCategory],
) -> BTreeMap<String, Vec<String>> {
    let mut display: BTreeMap<String, Vec<String>> = BTreeMap::new();

    let list = match attractions {
        Attractions::FetchFailed(message) => {
            display.insert(FETCH_FAILED_DISPLAY_KEY.to_string(), vec![message.clone()]);
            return display;
        }
        Attractions::Loaded(list) => list,
    };

    let mut cats_to_match: Vec<AttractionCategory> = selected.to_vec();

    for attraction in list {
        if attraction.name.is_empty() || cats_to_match.is_empty() {
            continue;
        }
        let kinds: Vec<&str> = attraction.kinds.split(',').collect();
        let Some(matching) = cats_to_match
            .iter()
            .copied()
            .find(|cat| kinds.contains(&cat.code()))
        else {
            continue;
        };

        let entry = display.entry(matching.display_key().to_string()).or_default();
        if entry.len() < ATTRACTIONS_PER_CAT_LIMIT {
            entry.push(attraction.name.clone());
        } else {
            cats_to_match.retain(|c| *c != matching);
        }
    }

    display
}

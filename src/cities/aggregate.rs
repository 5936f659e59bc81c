// src/cities/aggregate.rs
use std::collections::HashMap;
use std::thread;

use crate::cities::categories::{AttractionCategory, ALL_CATEGORIES};
use crate::cities::error::FetchError;
use crate::cities::models::{
    city_id, Attraction, Attractions, City, CitySeed, CurrentTemp, ForecastDay,
    FETCH_FAILED_MESSAGE,
};
use crate::db::cities as city_store;
use crate::db::cities::{CityRecord, NewCityRecord};
use crate::db::connection::Database;
use crate::errors::ServerError;

/// The seam to the external city/weather/attraction APIs. The production
/// implementation is `cities::fetch::ApiClient`; tests substitute a stub.
pub trait CityApi {
    fn search_cities(&self, term: &str, now: i64) -> Result<Vec<CitySeed>, FetchError>;
    fn current_temp(&self, latitude: f64, longitude: f64, now: i64) -> Result<f64, FetchError>;
    fn attractions(
        &self,
        latitude: f64,
        longitude: f64,
        categories: &[AttractionCategory],
        now: i64,
    ) -> Result<Vec<Attraction>, FetchError>;
    fn forecast(
        &self,
        latitude: f64,
        longitude: f64,
        now: i64,
    ) -> Result<Vec<ForecastDay>, FetchError>;
}

/// Produces fully-enriched city lists for a search term, reading through the
/// city store: stored snapshots are reused (with time-sensitive fields
/// refreshed), misses go to the upstream APIs and are written back.
pub struct Aggregator<'a, A: CityApi + Sync> {
    api: &'a A,
    db: &'a Database,
}

impl<'a, A: CityApi + Sync> Aggregator<'a, A> {
    pub fn new(api: &'a A, db: &'a Database) -> Self {
        Self { api, db }
    }

    pub fn search(
        &self,
        term: &str,
        selected: &[AttractionCategory],
        now: i64,
    ) -> Result<Vec<City>, ServerError> {
        if term.is_empty() {
            return Err(ServerError::BadRequest(
                "Please enter a city name to search".into(),
            ));
        }

        // A failing store lookup must not block fresh data.
        let stored = match self
            .db
            .with_conn(|conn| city_store::find_by_search_term(conn, term))
        {
            Ok(records) => records,
            Err(e) => {
                log::warn!("city store lookup failed, fetching fresh: {e}");
                Vec::new()
            }
        };

        if stored.is_empty() {
            Ok(self.fetch_fresh(term, selected, now))
        } else {
            Ok(self.refresh_stored(stored, selected, now))
        }
    }

    /// Miss path: look the term up, enrich every unique city, persist.
    fn fetch_fresh(&self, term: &str, selected: &[AttractionCategory], now: i64) -> Vec<City> {
        let seeds = match self.api.search_cities(term, now) {
            Ok(seeds) => seeds,
            Err(e) => {
                // Upstream trouble at the lookup stage means zero results,
                // not a failed request.
                log::warn!("city lookup failed for {term:?}, returning no results: {e}");
                Vec::new()
            }
        };

        let initial: Vec<City> = seeds
            .into_iter()
            .map(|seed| City::from_seed(term, seed))
            .collect();
        let unique = dedupe_by_id(initial);

        let api = self.api;
        let enriched: Vec<City> = thread::scope(|s| {
            let handles: Vec<_> = unique
                .into_iter()
                .map(|city| {
                    s.spawn(move || {
                        let city = enrich_weather(api, city, now);
                        enrich_attractions(api, city, now)
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().expect("enrichment thread panicked"))
                .collect()
        });

        let records: Vec<NewCityRecord> = enriched
            .iter()
            .map(|city| NewCityRecord {
                search_term: city.search_term.clone(),
                name: city.name.clone(),
                country_name: city.country_name.clone(),
                population: city.population,
                latitude: city.latitude,
                longitude: city.longitude,
                attractions: city.attractions.to_stored(),
            })
            .collect();
        if let Err(e) = self
            .db
            .with_conn(|conn| city_store::insert_cities(conn, &records, now))
        {
            log::warn!("persisting cities failed: {e}");
        }

        enriched
            .into_iter()
            .map(|city| city.with_display(selected))
            .collect()
    }

    /// Hit path: rebuild from the snapshot, refresh what is time-sensitive,
    /// refetch attractions only when they are empty, failed or stale.
    fn refresh_stored(
        &self,
        records: Vec<CityRecord>,
        selected: &[AttractionCategory],
        now: i64,
    ) -> Vec<City> {
        let api = self.api;
        let enriched: Vec<(City, bool)> = thread::scope(|s| {
            let handles: Vec<_> = records
                .into_iter()
                .map(|record| {
                    s.spawn(move || {
                        let attractions = Attractions::from_stored(&record.attractions);
                        let refresh = attractions.needs_refresh(record.updated_at, now);

                        let city = City {
                            id: city_id(&record.name, record.latitude),
                            search_term: record.search_term,
                            name: record.name,
                            country_name: record.country_name,
                            population: record.population,
                            latitude: record.latitude,
                            longitude: record.longitude,
                            current_temp: CurrentTemp::Unavailable,
                            attractions,
                            display_attractions: Default::default(),
                            forecast: Vec::new(),
                        };

                        let city = enrich_weather(api, city, now);
                        if refresh {
                            (enrich_attractions(api, city, now), true)
                        } else {
                            (city, false)
                        }
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().expect("enrichment thread panicked"))
                .collect()
        });

        for (city, refreshed) in &enriched {
            if *refreshed {
                let result = self.db.with_conn(|conn| {
                    city_store::update_attractions(
                        conn,
                        &city.name,
                        city.latitude,
                        &city.attractions.to_stored(),
                        now,
                    )
                });
                if let Err(e) = result {
                    log::warn!("attraction write-back failed for {}: {e}", city.name);
                }
            }
        }

        enriched
            .into_iter()
            .map(|(city, _)| city.with_display(selected))
            .collect()
    }
}

/// Temperature and forecast are always refetched; each failure degrades just
/// that field.
fn enrich_weather<A: CityApi>(api: &A, city: City, now: i64) -> City {
    let city = match api.current_temp(city.latitude, city.longitude, now) {
        Ok(temp) => city.with_temp(CurrentTemp::Known(temp)),
        Err(e) => {
            log::warn!("temperature fetch failed for {}: {e}", city.name);
            city.with_temp(CurrentTemp::Unavailable)
        }
    };

    match api.forecast(city.latitude, city.longitude, now) {
        Ok(days) => city.with_forecast(days),
        Err(e) => {
            log::warn!("forecast fetch failed for {}: {e}", city.name);
            city.with_forecast(Vec::new())
        }
    }
}

/// Attractions are fetched for the full category universe, not just the
/// requested subset, so the persisted snapshot can serve later requests with
/// any selection.
fn enrich_attractions<A: CityApi>(api: &A, city: City, now: i64) -> City {
    match api.attractions(city.latitude, city.longitude, &ALL_CATEGORIES, now) {
        Ok(list) => city.with_attractions(Attractions::Loaded(list)),
        Err(e) => {
            log::warn!("attraction fetch failed for {}: {e}", city.name);
            city.with_attractions(Attractions::FetchFailed(FETCH_FAILED_MESSAGE.to_string()))
        }
    }
}

/// Deduplicate by `id` (name + latitude). The last entity wins a collision;
/// output keeps first-seen order.
fn dedupe_by_id(cities: Vec<City>) -> Vec<City> {
    let mut order: Vec<String> = Vec::new();
    let mut by_id: HashMap<String, City> = HashMap::new();

    for city in cities {
        if !by_id.contains_key(&city.id) {
            order.push(city.id.clone());
        }
        by_id.insert(city.id.clone(), city);
    }

    order
        .into_iter()
        .filter_map(|id| by_id.remove(&id))
        .collect()
}

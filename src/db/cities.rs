// src/db/cities.rs
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde_json::Value;

use crate::errors::ServerError;

/// A persisted city snapshot. `attractions` is whatever JSON the row holds;
/// normalization happens in `cities::models`, not here.
#[derive(Debug, Clone)]
pub struct CityRecord {
    pub id: i64,
    pub search_term: String,
    pub name: String,
    pub country_name: String,
    pub population: i64,
    pub latitude: f64,
    pub longitude: f64,
    pub attractions: Value,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone)]
pub struct NewCityRecord {
    pub search_term: String,
    pub name: String,
    pub country_name: String,
    pub population: i64,
    pub latitude: f64,
    pub longitude: f64,
    pub attractions: Value,
}

const SELECT_COLS: &str =
    "id, search_term, name, country_name, population, latitude, longitude,
     attractions, created_at, updated_at";

fn record_from_row(row: &Row) -> rusqlite::Result<CityRecord> {
    let attractions_text: String = row.get(7)?;
    // Rows written by older revisions can hold invalid JSON; keep the raw
    // text and let the normalizer sort it out.
    let attractions = serde_json::from_str(&attractions_text)
        .unwrap_or(Value::String(attractions_text));

    Ok(CityRecord {
        id: row.get(0)?,
        search_term: row.get(1)?,
        name: row.get(2)?,
        country_name: row.get(3)?,
        population: row.get(4)?,
        latitude: row.get(5)?,
        longitude: row.get(6)?,
        attractions,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

/// Exact, case-sensitive match on the original search term.
pub fn find_by_search_term(conn: &Connection, term: &str) -> Result<Vec<CityRecord>, ServerError> {
    let sql = format!("select {SELECT_COLS} from cities where search_term = ? order by id");
    let mut stmt = conn
        .prepare(&sql)
        .map_err(|e| ServerError::DbError(format!("prepare city lookup failed: {e}")))?;

    let rows = stmt
        .query_map(params![term], record_from_row)
        .map_err(|e| ServerError::DbError(format!("city lookup failed: {e}")))?;

    let mut out = Vec::new();
    for row in rows {
        out.push(row.map_err(|e| ServerError::DbError(format!("city row read failed: {e}")))?);
    }
    Ok(out)
}

pub fn insert_cities(
    conn: &mut Connection,
    records: &[NewCityRecord],
    now: i64,
) -> Result<(), ServerError> {
    let tx = conn
        .transaction()
        .map_err(|e| ServerError::DbError(format!("begin tx failed: {e}")))?;

    for record in records {
        tx.execute(
            r#"
            insert into cities
              (search_term, name, country_name, population, latitude, longitude,
               attractions, created_at, updated_at)
            values (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                record.search_term,
                record.name,
                record.country_name,
                record.population,
                record.latitude,
                record.longitude,
                record.attractions.to_string(),
                now,
                now,
            ],
        )
        .map_err(|e| ServerError::DbError(format!("insert city failed: {e}")))?;
    }

    tx.commit()
        .map_err(|e| ServerError::DbError(format!("commit cities failed: {e}")))
}

/// Write back only the attractions field for one city row.
pub fn update_attractions(
    conn: &Connection,
    name: &str,
    latitude: f64,
    attractions: &Value,
    now: i64,
) -> Result<(), ServerError> {
    conn.execute(
        "update cities set attractions = ?, updated_at = ? where name = ? and latitude = ?",
        params![attractions.to_string(), now, name, latitude],
    )
    .map_err(|e| ServerError::DbError(format!("update attractions failed: {e}")))?;
    Ok(())
}

/// Look a city up by internal id, exact name, case-insensitive name, or
/// substring match, in that preference order; first match wins.
pub fn find_by_id_or_name(
    conn: &Connection,
    ident: &str,
) -> Result<Option<CityRecord>, ServerError> {
    if let Ok(id) = ident.parse::<i64>() {
        let sql = format!("select {SELECT_COLS} from cities where id = ?");
        let found = conn
            .query_row(&sql, params![id], record_from_row)
            .optional()
            .map_err(|e| ServerError::DbError(format!("city by id failed: {e}")))?;
        if found.is_some() {
            return Ok(found);
        }
    }

    let queries = [
        "where name = ?",
        "where lower(name) = lower(?)",
        "where name like '%' || ? || '%'",
    ];
    for clause in queries {
        let sql = format!("select {SELECT_COLS} from cities {clause} order by id limit 1");
        let found = conn
            .query_row(&sql, params![ident], record_from_row)
            .optional()
            .map_err(|e| ServerError::DbError(format!("city by name failed: {e}")))?;
        if found.is_some() {
            return Ok(found);
        }
    }

    Ok(None)
}

/// Returns true when a row was actually deleted.
pub fn delete_by_id(conn: &Connection, id: i64) -> Result<bool, ServerError> {
    let deleted = conn
        .execute("delete from cities where id = ?", params![id])
        .map_err(|e| ServerError::DbError(format!("delete city failed: {e}")))?;
    Ok(deleted > 0)
}

use astra::Body;
use http::{Method, Request};
use serde_json::json;

use crate::db::cities::{insert_cities, NewCityRecord};
use crate::errors::ServerError;
use crate::router::handle;
use crate::tests::router_tests::body_json;
use crate::tests::utils::{create_user_with_session, init_test_state};

fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(Method::GET).uri(uri);
    if let Some(token) = token {
        builder = builder.header("Cookie", format!("token={token}"));
    }
    builder.body(Body::empty()).unwrap()
}

fn delete(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(Method::DELETE).uri(uri);
    if let Some(token) = token {
        builder = builder.header("Cookie", format!("token={token}"));
    }
    builder.body(Body::empty()).unwrap()
}

fn seed_city(state: &crate::router::AppState, term: &str, name: &str) {
    state
        .db
        .with_conn(|conn| {
            insert_cities(
                conn,
                &[NewCityRecord {
                    search_term: term.to_string(),
                    name: name.to_string(),
                    country_name: "France".to_string(),
                    population: 1000,
                    latitude: 48.85,
                    longitude: 2.35,
                    attractions: json!([]),
                }],
                1000,
            )
        })
        .unwrap();
}

#[test]
fn search_requires_authentication() {
    let state = init_test_state();

    let resp = handle(
        get("/cities/search?cityName=paris&categories=%5B%5D", None),
        &state,
    );
    assert!(matches!(resp, Err(ServerError::Unauthorized)));
}

#[test]
fn search_without_city_name_is_rejected_before_any_call() {
    let state = init_test_state();
    let (_, token) = create_user_with_session(&state, "alice", false);

    let resp = handle(get("/cities/search?categories=%5B%5D", Some(&token)), &state);
    match resp {
        Err(ServerError::BadRequest(msg)) => assert!(msg.contains("city name")),
        other => panic!("expected BadRequest, got: {:?}", other.map(|r| r.status())),
    }
}

#[test]
fn search_with_malformed_categories_is_rejected() {
    let state = init_test_state();
    let (_, token) = create_user_with_session(&state, "alice", false);

    // not JSON at all
    let resp = handle(
        get("/cities/search?cityName=paris&categories=notjson", Some(&token)),
        &state,
    );
    assert!(matches!(resp, Err(ServerError::BadRequest(_))));

    // valid JSON, unknown code
    let resp = handle(
        get(
            "/cities/search?cityName=paris&categories=%5B%22volcanic%22%5D",
            Some(&token),
        ),
        &state,
    );
    assert!(matches!(resp, Err(ServerError::BadRequest(_))));

    // missing entirely
    let resp = handle(get("/cities/search?cityName=paris", Some(&token)), &state);
    assert!(matches!(resp, Err(ServerError::BadRequest(_))));
}

#[test]
fn delete_requires_authentication() {
    let state = init_test_state();
    seed_city(&state, "paris", "Paris");

    let resp = handle(delete("/cities/Paris", None), &state);
    assert!(matches!(resp, Err(ServerError::Unauthorized)));
}

#[test]
fn delete_missing_city_is_not_found() {
    let state = init_test_state();
    let (_, token) = create_user_with_session(&state, "alice", false);

    let resp = handle(delete("/cities/Atlantis", Some(&token)), &state);
    assert!(matches!(resp, Err(ServerError::NotFound)));
}

#[test]
fn delete_by_exact_name_removes_the_row() {
    let state = init_test_state();
    let (_, token) = create_user_with_session(&state, "alice", false);
    seed_city(&state, "paris", "Paris");

    let resp = handle(delete("/cities/Paris", Some(&token)), &state).expect("delete failed");
    assert_eq!(resp.status(), 200);
    let body = body_json(resp);
    assert_eq!(body["deletedCity"]["name"], json!("Paris"));

    let remaining = state
        .db
        .with_conn(|conn| crate::db::cities::find_by_search_term(conn, "paris"))
        .unwrap();
    assert!(remaining.is_empty());
}

#[test]
fn delete_matches_case_insensitively_and_by_id() {
    let state = init_test_state();
    let (_, token) = create_user_with_session(&state, "alice", false);
    seed_city(&state, "paris", "Paris");
    seed_city(&state, "lyon", "Lyon");

    let resp = handle(delete("/cities/LYON", Some(&token)), &state).expect("delete failed");
    assert_eq!(body_json(resp)["deletedCity"]["name"], json!("Lyon"));

    // the Paris row is id 1
    let resp = handle(delete("/cities/1", Some(&token)), &state).expect("delete failed");
    assert_eq!(body_json(resp)["deletedCity"]["name"], json!("Paris"));
}

#[test]
fn delete_decodes_percent_encoded_names() {
    let state = init_test_state();
    let (_, token) = create_user_with_session(&state, "la", false);
    seed_city(&state, "los angeles", "Los Angeles");

    let resp = handle(delete("/cities/Los%20Angeles", Some(&token)), &state).expect("delete failed");
    assert_eq!(resp.status(), 200);
}

#[test]
fn unknown_routes_are_not_found() {
    let state = init_test_state();
    let resp = handle(get("/nope", None), &state);
    assert!(matches!(resp, Err(ServerError::NotFound)));
}

#[test]
fn preflight_requests_short_circuit() {
    let state = init_test_state();
    let req = Request::builder()
        .method(Method::OPTIONS)
        .uri("/cities/search")
        .body(Body::empty())
        .unwrap();
    let resp = handle(req, &state).expect("preflight failed");
    assert_eq!(resp.status(), 204);
}

#[test]
fn cors_headers_are_attached() {
    let state = init_test_state();
    let resp = handle(get("/auth/status", None), &state)
        .unwrap_or_else(|e| crate::responses::error_to_response(e));
    let resp = crate::router::with_cors(resp, &state.cfg.allowed_origin);

    assert_eq!(
        resp.headers()
            .get("Access-Control-Allow-Origin")
            .and_then(|v| v.to_str().ok()),
        Some("http://localhost:3000")
    );
    assert_eq!(
        resp.headers()
            .get("Access-Control-Allow-Credentials")
            .and_then(|v| v.to_str().ok()),
        Some("true")
    );
}

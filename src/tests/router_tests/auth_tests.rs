// src/tests/router_tests/auth_tests.rs
use astra::Body;
use http::{Method, Request};
use serde_json::json;

use crate::router::handle;
use crate::tests::router_tests::{body_json, cookie_token};
use crate::tests::utils::init_test_state;

fn json_request(method: Method, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[test]
fn signup_login_status_logout_flow() {
    let state = init_test_state();

    // 1. Sign up
    let req = json_request(
        Method::POST,
        "/auth/signup",
        json!({"username": "alice", "email": "Alice@Example.com", "password": "password123"}),
    );
    let resp = handle(req, &state).expect("signup failed");
    assert_eq!(resp.status(), 201);

    // 2. Log in, grab the session cookie
    let req = json_request(
        Method::POST,
        "/auth/login",
        json!({"username": "alice", "password": "password123"}),
    );
    let resp = handle(req, &state).expect("login failed");
    assert_eq!(resp.status(), 200);
    let cookie = resp.headers().get("Set-Cookie").unwrap().to_str().unwrap();
    assert!(cookie.contains("HttpOnly"));
    let token = cookie_token(&resp).expect("no session token in cookie");
    let body = body_json(resp);
    assert_eq!(body["user"]["username"], json!("alice"));
    // emails are normalized on signup
    assert_eq!(body["user"]["email"], json!("alice@example.com"));

    // 3. Status sees the session
    let req = Request::builder()
        .method(Method::GET)
        .uri("/auth/status")
        .header("Cookie", format!("token={token}"))
        .body(Body::empty())
        .unwrap();
    let resp = handle(req, &state).expect("status failed");
    assert_eq!(resp.status(), 200);
    let body = body_json(resp);
    assert_eq!(body["authenticated"], json!(true));
    assert_eq!(body["user"]["isAdmin"], json!(false));

    // 4. Logout revokes it
    let req = Request::builder()
        .method(Method::POST)
        .uri("/auth/logout")
        .header("Cookie", format!("token={token}"))
        .body(Body::empty())
        .unwrap();
    let resp = handle(req, &state).expect("logout failed");
    assert_eq!(resp.status(), 200);

    let req = Request::builder()
        .method(Method::GET)
        .uri("/auth/status")
        .header("Cookie", format!("token={token}"))
        .body(Body::empty())
        .unwrap();
    let resp = handle(req, &state).expect("status failed");
    assert_eq!(resp.status(), 401);
    assert_eq!(body_json(resp)["authenticated"], json!(false));
}

#[test]
fn login_failures_are_indistinguishable() {
    let state = init_test_state();

    let req = json_request(
        Method::POST,
        "/auth/signup",
        json!({"username": "bob", "email": "bob@example.com", "password": "right"}),
    );
    handle(req, &state).unwrap();

    // wrong password
    let req = json_request(
        Method::POST,
        "/auth/login",
        json!({"username": "bob", "password": "wrong"}),
    );
    let resp = handle(req, &state).unwrap();
    assert_eq!(resp.status(), 401);
    let wrong_pw = body_json(resp);

    // unknown user
    let req = json_request(
        Method::POST,
        "/auth/login",
        json!({"username": "nobody", "password": "whatever"}),
    );
    let resp = handle(req, &state).unwrap();
    assert_eq!(resp.status(), 401);
    let unknown = body_json(resp);

    assert_eq!(wrong_pw, unknown);
}

#[test]
fn duplicate_signup_is_rejected() {
    let state = init_test_state();

    let req = json_request(
        Method::POST,
        "/auth/signup",
        json!({"username": "carol", "email": "carol@example.com", "password": "pw"}),
    );
    assert_eq!(handle(req, &state).unwrap().status(), 201);

    let req = json_request(
        Method::POST,
        "/auth/signup",
        json!({"username": "carol", "email": "other@example.com", "password": "pw"}),
    );
    match handle(req, &state) {
        Err(crate::errors::ServerError::BadRequest(msg)) => {
            assert!(msg.contains("already exists"));
        }
        other => panic!("expected BadRequest, got: {:?}", other.map(|r| r.status())),
    }
}

#[test]
fn signup_validates_email_shape() {
    let state = init_test_state();

    for bad_email in ["", "no-at-symbol", "@example.com", "dave@"] {
        let req = json_request(
            Method::POST,
            "/auth/signup",
            json!({"username": "dave", "email": bad_email, "password": "pw"}),
        );
        assert!(
            matches!(
                handle(req, &state),
                Err(crate::errors::ServerError::BadRequest(_))
            ),
            "email {bad_email:?} should be rejected"
        );
    }
}

#[test]
fn status_without_credentials_is_401() {
    let state = init_test_state();

    let req = Request::builder()
        .method(Method::GET)
        .uri("/auth/status")
        .body(Body::empty())
        .unwrap();
    let resp = handle(req, &state).unwrap();
    assert_eq!(resp.status(), 401);
}

#[test]
fn bearer_header_works_in_place_of_the_cookie() {
    let state = init_test_state();
    let (_, token) = crate::tests::utils::create_user_with_session(&state, "erin", false);

    let req = Request::builder()
        .method(Method::GET)
        .uri("/auth/status")
        .header("Authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    let resp = handle(req, &state).unwrap();
    assert_eq!(resp.status(), 200);
}

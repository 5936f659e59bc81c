use astra::Body;
use http::{Method, Request};
use serde_json::json;

use crate::errors::ServerError;
use crate::router::handle;
use crate::tests::router_tests::body_json;
use crate::tests::utils::{create_user_with_session, init_test_state};

fn request(method: Method, uri: &str, token: Option<&str>, body: Option<serde_json::Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("Cookie", format!("token={token}"));
    }
    let body = match body {
        Some(value) => Body::from(value.to_string()),
        None => Body::empty(),
    };
    builder.body(body).unwrap()
}

#[test]
fn admin_routes_require_a_credential() {
    let state = init_test_state();

    let resp = handle(request(Method::GET, "/admin/users", None, None), &state);
    assert!(matches!(resp, Err(ServerError::Unauthorized)));
}

#[test]
fn non_admin_users_are_forbidden() {
    let state = init_test_state();
    let (_, token) = create_user_with_session(&state, "alice", false);

    let resp = handle(
        request(Method::GET, "/admin/dashboard", Some(&token), None),
        &state,
    );
    assert!(matches!(resp, Err(ServerError::Forbidden)));
}

#[test]
fn username_admin_without_the_role_flag_is_still_forbidden() {
    // The legacy "username is admin" rule is gone; only the flag counts.
    let state = init_test_state();
    let (_, token) = create_user_with_session(&state, "Admin", false);

    let resp = handle(
        request(Method::GET, "/admin/dashboard", Some(&token), None),
        &state,
    );
    assert!(matches!(resp, Err(ServerError::Forbidden)));
}

#[test]
fn admin_sees_the_dashboard() {
    let state = init_test_state();
    let (_, token) = create_user_with_session(&state, "root", true);

    let resp = handle(
        request(Method::GET, "/admin/dashboard", Some(&token), None),
        &state,
    )
    .expect("Handler failed");
    assert_eq!(resp.status(), 200);

    let body = body_json(resp);
    assert_eq!(body["adminUser"], json!("root"));
}

#[test]
fn admin_lists_users_without_password_hashes() {
    let state = init_test_state();
    let (_, token) = create_user_with_session(&state, "root", true);
    create_user_with_session(&state, "alice", false);

    let resp = handle(
        request(Method::GET, "/admin/users", Some(&token), None),
        &state,
    )
    .expect("Handler failed");
    assert_eq!(resp.status(), 200);

    let body = body_json(resp);
    let users = body["users"].as_array().unwrap();
    assert_eq!(users.len(), 2);
    assert!(!body.to_string().contains("passwordHash"));
    assert!(!body.to_string().contains("password_hash"));
}

#[test]
fn admin_creates_updates_and_deletes_a_user() {
    let state = init_test_state();
    let (_, token) = create_user_with_session(&state, "root", true);

    // create
    let resp = handle(
        request(
            Method::POST,
            "/admin/users",
            Some(&token),
            Some(json!({"username": "bob", "email": "bob@example.com", "password": "pw"})),
        ),
        &state,
    )
    .expect("create failed");
    assert_eq!(resp.status(), 201);
    let created = body_json(resp);
    let bob_id = created["user"]["id"].as_i64().unwrap();
    assert_eq!(created["user"]["isAdmin"], json!(false));

    // update
    let resp = handle(
        request(
            Method::PUT,
            &format!("/admin/users/{bob_id}"),
            Some(&token),
            Some(json!({"email": "new@example.com", "isAdmin": true})),
        ),
        &state,
    )
    .expect("update failed");
    let updated = body_json(resp);
    assert_eq!(updated["user"]["email"], json!("new@example.com"));
    assert_eq!(updated["user"]["isAdmin"], json!(true));

    // delete
    let resp = handle(
        request(
            Method::DELETE,
            &format!("/admin/users/{bob_id}"),
            Some(&token),
            None,
        ),
        &state,
    )
    .expect("delete failed");
    assert_eq!(resp.status(), 200);

    let resp = handle(
        request(Method::GET, "/admin/users", Some(&token), None),
        &state,
    )
    .unwrap();
    let users = body_json(resp);
    assert!(!users.to_string().contains("bob"));
}

#[test]
fn protected_admin_account_cannot_be_touched() {
    let state = init_test_state();
    let (admin_id, token) = create_user_with_session(&state, "admin", true);

    let resp = handle(
        request(
            Method::PUT,
            &format!("/admin/users/{admin_id}"),
            Some(&token),
            Some(json!({"email": "evil@example.com"})),
        ),
        &state,
    );
    assert!(matches!(resp, Err(ServerError::Forbidden)));

    let resp = handle(
        request(
            Method::DELETE,
            &format!("/admin/users/{admin_id}"),
            Some(&token),
            None,
        ),
        &state,
    );
    assert!(matches!(resp, Err(ServerError::Forbidden)));
}

#[test]
fn deleting_a_missing_user_is_not_found() {
    let state = init_test_state();
    let (_, token) = create_user_with_session(&state, "root", true);

    let resp = handle(
        request(Method::DELETE, "/admin/users/999", Some(&token), None),
        &state,
    );
    assert!(matches!(resp, Err(ServerError::NotFound)));
}

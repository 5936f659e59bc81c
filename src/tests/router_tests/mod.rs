mod admin_tests;
mod auth_tests;
mod cities_tests;

use astra::Response;
use serde_json::Value;
use std::io::Read;

/// Read a response body back into JSON.
pub fn body_json(resp: Response) -> Value {
    let mut body = String::new();
    resp.into_body()
        .reader()
        .read_to_string(&mut body)
        .unwrap();
    serde_json::from_str(&body).unwrap_or_else(|e| panic!("non-JSON body {body:?}: {e}"))
}

/// Pull the session token out of a Set-Cookie header.
pub fn cookie_token(resp: &Response) -> Option<String> {
    resp.headers()
        .get("Set-Cookie")?
        .to_str()
        .ok()?
        .split(';')
        .next()?
        .strip_prefix("token=")
        .map(str::to_string)
        .filter(|t| !t.is_empty())
}

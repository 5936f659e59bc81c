use std::error::Error;
use std::fmt;

#[derive(Debug)]
pub enum FetchError {
    Network(String),
    /// Non-2xx status after retries were exhausted.
    Status(u16),
    /// A 200 whose body is an HTML page (rate-limit or auth wall).
    HtmlBody,
    JsonParse(String),
    Config(String),
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::Network(msg) => write!(f, "Network error: {msg}"),
            FetchError::Status(code) => write!(f, "Upstream returned HTTP {code}"),
            FetchError::HtmlBody => write!(f, "Upstream returned HTML instead of JSON"),
            FetchError::JsonParse(msg) => write!(f, "JSON parse error: {msg}"),
            FetchError::Config(msg) => write!(f, "Config error: {msg}"),
        }
    }
}

impl Error for FetchError {}

//! JSON submission adapter.
//!
//! Turns raw JSON submissions into [`Submission`]s the scheduler can admit.
//! The mapping is total: anything that is not a request becomes a
//! passthrough task that yields the original value.
//!
//! - `null` → nothing
//! - array → each element, recursively
//! - URL-like string → `GET` request
//! - object with a string `url` → request described by [`RequestConfig`]
//! - anything else → passthrough

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;
use url::Url;

use crate::error::TaskError;
use crate::task::{Deferred, Submission};

/// Request description accepted as an object submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestConfig {
    pub url: String,
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    /// Query string parameters.
    #[serde(default)]
    pub params: HashMap<String, String>,
    /// JSON body.
    #[serde(default)]
    pub data: Option<Value>,
}

fn default_method() -> String {
    "GET".to_string()
}

impl RequestConfig {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: default_method(),
            headers: HashMap::new(),
            params: HashMap::new(),
            data: None,
        }
    }
}

/// Adapter from JSON submissions to HTTP or passthrough tasks.
#[derive(Debug, Clone, Default)]
pub struct HttpAdapter {
    /// Shared HTTP client (connection pooling).
    client: reqwest::Client,
}

impl HttpAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Adapt a raw submission. Never fails.
    pub fn submission(&self, raw: Value) -> Submission<Value> {
        match raw {
            Value::Null => Submission::Empty,
            Value::Array(items) => {
                Submission::Many(items.into_iter().map(|item| self.submission(item)).collect())
            }
            Value::String(s) if looks_like_url(&s) => {
                Submission::One(self.request(RequestConfig::get(s)))
            }
            Value::Object(ref map) if map.get("url").is_some_and(Value::is_string) => {
                match serde_json::from_value::<RequestConfig>(raw.clone()) {
                    Ok(config) => Submission::One(self.request(config)),
                    Err(e) => {
                        debug!(error = %e, "object submission is not a request, passing through");
                        Submission::One(Deferred::ready(raw))
                    }
                }
            }
            other => Submission::One(Deferred::ready(other)),
        }
    }

    /// Build a deferred HTTP request. Nothing is sent until invoked.
    pub fn request(&self, config: RequestConfig) -> Deferred<Value> {
        let client = self.client.clone();
        Deferred::new(move || execute(client, config))
    }
}

async fn execute(client: reqwest::Client, config: RequestConfig) -> Result<Value, TaskError> {
    let url = normalize_url(&config.url)?;
    let method = config
        .method
        .to_uppercase()
        .parse::<reqwest::Method>()
        .map_err(|_| TaskError::Http(format!("invalid HTTP method: {}", config.method)))?;

    let mut request = client.request(method.clone(), url);
    if !config.params.is_empty() {
        request = request.query(&config.params);
    }
    for (key, value) in &config.headers {
        request = request.header(key.as_str(), value.as_str());
    }
    if let Some(body) = &config.data {
        request = request.json(body);
    }

    let response = request.send().await?;
    let status = response.status();
    let final_url = response.url().to_string();
    let text = response.text().await?;

    if !status.is_success() {
        return Err(TaskError::Http(format!("{method} {final_url} returned {status}")));
    }

    debug!(url = %final_url, %method, %status, "request completed");

    let data = serde_json::from_str::<Value>(&text).unwrap_or(Value::String(text));
    Ok(json!({
        "status": status.as_u16(),
        "url": final_url,
        "data": data,
    }))
}

const SCHEMES: &[&str] = &["http", "https", "ftp", "file"];

/// Parse a submission URL; a missing scheme means `http://`. Only
/// `http`/`https` can be executed.
fn normalize_url(raw: &str) -> Result<Url, TaskError> {
    let candidate = if raw.contains("://") {
        raw.to_string()
    } else {
        format!("http://{raw}")
    };
    let url = Url::parse(&candidate).map_err(|e| TaskError::Http(format!("invalid url {raw}: {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(TaskError::UnsupportedScheme(other.to_string())),
    }
}

/// Whether a string submission should be fetched: optional
/// `http|https|ftp|file` scheme, a dotted host whose last label is 2-6
/// letters, and an optional path without query or fragment.
pub fn looks_like_url(s: &str) -> bool {
    if s.is_empty() || (s.chars().any(char::is_whitespace) && !s.contains('/')) {
        return false;
    }

    let rest = match s.split_once("://") {
        Some((scheme, rest)) => {
            if !SCHEMES.contains(&scheme.to_ascii_lowercase().as_str()) {
                return false;
            }
            rest
        }
        None => s,
    };

    let (host, path) = match rest.find('/') {
        Some(idx) => rest.split_at(idx),
        None => (rest, ""),
    };

    valid_host(host) && valid_path(path)
}

fn valid_host(host: &str) -> bool {
    let Some((name, tld)) = host.rsplit_once('.') else {
        return false;
    };
    let tld_ok = (2..=6).contains(&tld.len()) && tld.chars().all(|c| c.is_ascii_lowercase());
    let name_ok = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '.' || c == '-');
    tld_ok && name_ok
}

fn valid_path(path: &str) -> bool {
    path.chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '/' | '_' | ' ' | '.' | '-'))
}

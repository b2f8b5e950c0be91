// src/fetch.rs

use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::USER_AGENT;
use thiserror::Error;
use tracing::debug;

/// One attempt, fail fast; the caller treats any failure as fatal.
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Marker header the source checks before serving the full page.
const REQUESTED_WITH: (&str, &str) = ("X-Requested-With", "XMLHttpRequest");

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("building HTTP client")]
    Client(#[source] reqwest::Error),
    #[error("GET {url}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

/// Blocking client shared by the page fetch and the shapefile download.
pub fn http_client() -> Result<Client, FetchError> {
    Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()
        .map_err(FetchError::Client)
}

/// Fetch the case page as text. Non-2xx statuses and transport errors both
/// surface as a `FetchError`; there is no retry.
pub fn fetch_page(client: &Client, url: &str, user_agent: &str) -> Result<String, FetchError> {
    debug!(%url, "requesting case page");
    client
        .get(url)
        .header(USER_AGENT, user_agent)
        .header(REQUESTED_WITH.0, REQUESTED_WITH.1)
        .send()
        .and_then(|resp| resp.error_for_status())
        .and_then(|resp| resp.text())
        .map_err(|source| FetchError::Request {
            url: url.to_string(),
            source,
        })
}

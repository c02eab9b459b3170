//! Delivery seam between the store-and-forward core and the ingest server.

use std::fmt;
use std::time::Duration;

use log::debug;
use reqwest::blocking::Client;
use reqwest::StatusCode;
use url::Url;

use crate::{Error, Result};

pub const DEFAULT_SERVER_URL: &str = "http://localhost:8000";
pub const API_ENDPOINT: &str = "/api/v1/readings";
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

const USER_AGENT: &str = concat!("refract-client/", env!("CARGO_PKG_VERSION"));

/// A failed delivery attempt. `retryable` distinguishes outages worth
/// retrying later (connect/timeout, 5xx) from rejections that will keep
/// failing (4xx); the caller queues either way and logs the distinction.
#[derive(Debug)]
pub struct DeliveryError {
    pub retryable: bool,
    pub reason: String,
}

impl fmt::Display for DeliveryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let class = if self.retryable { "retryable" } else { "permanent" };
        write!(f, "{} delivery failure: {}", class, self.reason)
    }
}

/// Hands one serialized reading to the remote end.
pub trait Transport {
    fn deliver(&self, line: &str) -> std::result::Result<(), DeliveryError>;
}

/// Blocking HTTP POST transport. Success is exactly status 201.
pub struct HttpTransport {
    client: Client,
    url: Url,
}

impl HttpTransport {
    pub fn new(server_url: &str) -> Result<Self> {
        let full = format!("{}{}", server_url.trim_end_matches('/'), API_ENDPOINT);
        let url = Url::parse(&full)
            .map_err(|err| Error::Invalid(format!("invalid server url '{server_url}': {err}")))?;
        let client = Client::builder()
            .timeout(HTTP_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|err| Error::Invalid(format!("http client setup failed: {err}")))?;
        Ok(Self { client, url })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

impl Transport for HttpTransport {
    fn deliver(&self, line: &str) -> std::result::Result<(), DeliveryError> {
        debug!("POST {} ({} bytes)", self.url, line.len());
        let response = self
            .client
            .post(self.url.clone())
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(line.to_string())
            .send()
            .map_err(|err| DeliveryError {
                retryable: true,
                reason: format!("request failed: {err}"),
            })?;

        let status = response.status();
        if status == StatusCode::CREATED {
            return Ok(());
        }
        Err(DeliveryError {
            retryable: status.is_server_error(),
            reason: format!("unexpected http status {status}"),
        })
    }
}

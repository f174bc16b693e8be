//! Domoticz HTTP JSON API Client
//!
//! This module provides a client for the `json.htm` API served by the Domoticz
//! web server.
//!
//! # Architecture
//!
//! - **Transport**: plain HTTP GET, one request per call, no retries
//! - **Authentication**: optional HTTP Basic credentials sent on every request
//! - **Decoding**: the body is always read and passed through `serde_json`, so a
//!   non-2xx answer surfaces as a decode failure rather than a separate branch
//!
//! # Example
//!
//! ```no_run
//! use domoticz_exporter::config::DomoticzConfig;
//! use domoticz_exporter::domoticz::DomoticzClient;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = DomoticzConfig {
//!     endpoint: "127.0.0.1:8080".to_string(),
//!     device_ids: vec!["1".to_string()],
//!     ..Default::default()
//! };
//!
//! let client = DomoticzClient::new(&config)?;
//! let response = client.fetch_device("1").await?;
//! # Ok(())
//! # }
//! ```

use crate::config::DomoticzConfig;
use crate::domoticz::types::DeviceResponse;
use crate::error::{ExporterError, Result};
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Client, Url};
use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;
use tracing::debug;

/// Sent as `User-Agent` on every request to the hub
pub const USER_AGENT: &str = concat!("domoticz-exporter/", env!("CARGO_PKG_VERSION"));

const MEDIA_TYPE: &str = "application/json";

/// Client for the Domoticz JSON API
///
/// Holds only the endpoint, credentials and a pooled `reqwest::Client`; nothing
/// is remembered between calls.
pub struct DomoticzClient {
    http: Client,
    endpoint: Url,
    username: String,
    password: SecretString,
}

impl DomoticzClient {
    /// Builds a client after validating the configured endpoint
    ///
    /// No network call is made. Fails with [`ExporterError::Config`] when the
    /// endpoint is not a well-formed `http` URL.
    pub fn new(config: &DomoticzConfig) -> Result<Self> {
        let endpoint = parse_endpoint(&config.endpoint)?;

        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(MEDIA_TYPE));
        headers.insert(header::ACCEPT, HeaderValue::from_static(MEDIA_TYPE));

        let mut builder = Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers);
        if let Some(seconds) = config.request_timeout_seconds {
            builder = builder.timeout(Duration::from_secs(seconds));
        }

        debug!("Domoticz client created for {}", endpoint);

        Ok(Self {
            http: builder.build()?,
            endpoint,
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Fetch every used device, ordered by name
    pub async fn fetch_all_devices(&self) -> Result<DeviceResponse> {
        debug!("Fetching all Domoticz devices");
        self.get_devices(&[
            ("type", "devices"),
            ("filter", "all"),
            ("used", "true"),
            ("order", "Name"),
        ])
        .await
    }

    /// Fetch a single device by its `idx`
    pub async fn fetch_device(&self, id: &str) -> Result<DeviceResponse> {
        debug!(device_id = id, "Fetching Domoticz device");
        self.get_devices(&[("type", "devices"), ("rid", id)]).await
    }

    async fn get_devices(&self, query: &[(&str, &str)]) -> Result<DeviceResponse> {
        let mut request = self.http.get(self.json_url()).query(query);

        let password = self.password.expose_secret();
        if !self.username.is_empty() || !password.is_empty() {
            request = request.basic_auth(&self.username, Some(password));
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            debug!(status_code = %status, "Domoticz answered with a non-success status");
        }

        Ok(serde_json::from_str(&body)?)
    }

    fn json_url(&self) -> String {
        format!("{}/json.htm", self.endpoint.as_str().trim_end_matches('/'))
    }
}

/// Turns the configured endpoint into a base URL
///
/// A bare `host:port` is taken as `http://host:port`. Only the `http` scheme is
/// accepted, and the URL must name a host.
pub fn parse_endpoint(endpoint: &str) -> Result<Url> {
    let endpoint = endpoint.trim();
    let candidate = if endpoint.contains("://") {
        endpoint.to_string()
    } else {
        format!("http://{}", endpoint)
    };

    let url = Url::parse(&candidate).map_err(|e| {
        ExporterError::Config(format!("Invalid Domoticz address {:?}: {}", endpoint, e))
    })?;

    if url.scheme() != "http" {
        return Err(ExporterError::Config(format!(
            "Invalid Domoticz address {:?}: unsupported scheme {:?}",
            endpoint,
            url.scheme()
        )));
    }

    if url.host_str().unwrap_or_default().is_empty() {
        return Err(ExporterError::Config(format!(
            "Invalid Domoticz address {:?}: missing host",
            endpoint
        )));
    }

    Ok(url)
}

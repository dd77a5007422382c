//! Schemas fetched over HTTP.
//!
//! Each version key is substituted into a URL template and fetched with a
//! blocking `GET`. The response body goes through the same document checks as
//! files on disk. A `404` means the server has no schema for that version.

use std::io::Read;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::StatusCode;
use tracing::debug;

use crate::config::RegistryConfig;
use crate::error::{Result, SchemaError};
use crate::field::Schema;
use crate::source::SchemaSource;
use crate::validator::DocumentValidator;

/// Replaced by the decimal version key in a URL template.
pub const VERSION_PLACEHOLDER: &str = "{version}";

/// Default whole-request timeout.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Loads schema documents from an HTTP endpoint, e.g.
/// `https://fleet.example/schemas/{version}.json`.
#[derive(Debug)]
pub struct HttpSource {
    client: Client,
    url_template: String,
    validator: DocumentValidator,
    max_document_size: usize,
}

impl HttpSource {
    pub fn new(url_template: impl Into<String>) -> Result<Self> {
        Self::builder(url_template).build()
    }

    pub fn builder(url_template: impl Into<String>) -> HttpSourceBuilder {
        HttpSourceBuilder {
            url_template: url_template.into(),
            headers: Vec::new(),
            timeout: DEFAULT_HTTP_TIMEOUT,
            config: RegistryConfig::default(),
            use_proxy: true,
        }
    }

    /// URL the document for `key` is fetched from.
    pub fn url_for(&self, key: u32) -> String {
        self.url_template
            .replace(VERSION_PLACEHOLDER, &key.to_string())
    }

    fn fetch(&self, key: u32, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|err| SchemaError::LoadFailed(format!("GET {url}: {err}")))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(SchemaError::UnknownVersion(key));
        }
        if !status.is_success() {
            return Err(SchemaError::LoadFailed(format!("GET {url}: HTTP {status}")));
        }
        if let Some(len) = response.content_length() {
            if len > self.max_document_size as u64 {
                return Err(SchemaError::LoadFailed(format!(
                    "schema document too large ({len} bytes): {url}"
                )));
            }
        }

        let read_limit =
            u64::try_from(self.max_document_size.saturating_add(1)).unwrap_or(u64::MAX);
        let mut body = String::new();
        response
            .take(read_limit)
            .read_to_string(&mut body)
            .map_err(|err| SchemaError::LoadFailed(format!("failed reading {url}: {err}")))?;
        if body.len() > self.max_document_size {
            return Err(SchemaError::LoadFailed(format!(
                "schema document too large while reading: {url}"
            )));
        }
        Ok(body)
    }
}

impl SchemaSource for HttpSource {
    fn load(&self, key: u32) -> Result<Schema> {
        let url = self.url_for(key);
        let body = self.fetch(key, &url)?;
        let schema = self.validator.parse(&body)?;
        debug!(key, %url, fields = schema.len(), "fetched schema");
        Ok(schema)
    }
}

/// Builder for [`HttpSource`].
#[derive(Debug, Clone)]
pub struct HttpSourceBuilder {
    url_template: String,
    headers: Vec<(String, String)>,
    timeout: Duration,
    config: RegistryConfig,
    use_proxy: bool,
}

impl HttpSourceBuilder {
    /// Add a request header sent with every fetch.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Strict mode and the document size limit.
    pub fn config(mut self, config: RegistryConfig) -> Self {
        self.config = config;
        self
    }

    /// Ignore proxy settings from the environment.
    pub fn no_proxy(mut self) -> Self {
        self.use_proxy = false;
        self
    }

    pub fn build(self) -> Result<HttpSource> {
        if !self.url_template.contains(VERSION_PLACEHOLDER) {
            return Err(SchemaError::LoadFailed(format!(
                "URL template {:?} has no {VERSION_PLACEHOLDER} placeholder",
                self.url_template
            )));
        }

        let mut headers = HeaderMap::new();
        for (name, value) in &self.headers {
            let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|err| {
                SchemaError::LoadFailed(format!("invalid header name {name:?}: {err}"))
            })?;
            let header_value = HeaderValue::from_str(value).map_err(|err| {
                SchemaError::LoadFailed(format!("invalid value for header {name:?}: {err}"))
            })?;
            headers.append(header_name, header_value);
        }

        let mut client = Client::builder()
            .timeout(self.timeout)
            .user_agent(concat!("serialhub/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers);
        if !self.use_proxy {
            client = client.no_proxy();
        }
        let client = client
            .build()
            .map_err(|err| SchemaError::LoadFailed(format!("HTTP client setup failed: {err}")))?;

        Ok(HttpSource {
            client,
            url_template: self.url_template,
            validator: DocumentValidator::new(self.config.strict_mode)?,
            max_document_size: self.config.max_schema_file_size,
        })
    }
}

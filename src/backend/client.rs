// HTTP catalog source for the inventory REST backend
use super::{CatalogSource, USER_AGENT, parse_names};
use crate::config::ViewerConfig;
use crate::error::{Error, Result};
use crate::inventory::data::{ResourceDetail, ResourceTypeName};
use async_trait::async_trait;
use reqwest::header::HeaderValue;
use reqwest::{Client, Url};
use serde_json::Value;
use tracing::{debug, warn};

/// Resolve the user agent header, falling back to the crate default.
///
/// Lenient: an invalid candidate is logged and replaced, never an error.
#[must_use]
pub fn user_agent_header(candidate: Option<&str>) -> HeaderValue {
    if let Some(user_agent) = candidate {
        match HeaderValue::from_str(user_agent) {
            Ok(value) => return value,
            Err(e) => warn!("Invalid user agent {:?} ({}), using {}", user_agent, e, USER_AGENT),
        }
    }
    HeaderValue::from_static(USER_AGENT)
}

/// Talks to `GET /`, `GET /list/{type}` and `GET /details/{type}/{name}`
#[derive(Debug, Clone)]
pub struct HttpCatalog {
    client: Client,
    base_url: Url,
}

impl HttpCatalog {
    /// # Errors
    ///
    /// Will return `Err` if the base URL is invalid or the HTTP client cannot be built
    pub fn new(config: &ViewerConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| Error::Custom(format!("invalid base URL {:?}: {e}", config.base_url)))?;
        if base_url.cannot_be_a_base() {
            return Err(Error::Custom(format!(
                "base URL {:?} cannot carry a path",
                config.base_url
            )));
        }

        let client = Client::builder()
            .user_agent(user_agent_header(Some(&config.user_agent)))
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self { client, base_url })
    }

    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Appends percent-encoded path segments to the base URL
    pub(crate) fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        if segments.is_empty() && !url.path().ends_with('/') {
            url.set_path(&format!("{}/", url.path()));
        }
        url
    }

    async fn get_json(&self, url: Url) -> Result<Value> {
        debug!("🌐 GET {}", url);
        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Status {
                url: url.to_string(),
                code: status.as_u16(),
            });
        }
        Ok(response.json::<Value>().await?)
    }
}

#[async_trait]
impl CatalogSource for HttpCatalog {
    async fn resource_types(&self) -> Result<Vec<String>> {
        let url = self.endpoint(&[]);
        let body = self.get_json(url.clone()).await?;
        parse_names(url.as_str(), body)
    }

    async fn list_names(&self, resource_type: &ResourceTypeName) -> Result<Vec<String>> {
        let url = self.endpoint(&["list", resource_type.as_str()]);
        let body = self.get_json(url.clone()).await?;
        parse_names(url.as_str(), body)
    }

    async fn details(&self, resource_type: &ResourceTypeName, name: &str) -> Result<ResourceDetail> {
        let url = self.endpoint(&["details", resource_type.as_str(), name]);
        let body = self.get_json(url.clone()).await?;
        ResourceDetail::from_value(url.as_str(), body)
    }

    fn describe(&self) -> String {
        format!("http {}", self.base_url)
    }
}

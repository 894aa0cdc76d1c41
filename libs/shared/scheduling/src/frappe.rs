use anyhow::{anyhow, Context, Result};
use base64::{engine::general_purpose, Engine as _};
use reqwest::{
    header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    Client, Method, RequestBuilder,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, error};

use shared_config::AppConfig;

/// Every whitelisted Frappe method wraps its return value in `{"message": ...}`.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    message: Option<T>,
}

/// Client for the Frappe-hosted scheduling API.
///
/// Methods are addressed as `<base_url>.<method_name>`, e.g.
/// `.../docgenie.utils.api_testing.get_unique_centers`.
#[derive(Debug, Clone)]
pub struct FrappeClient {
    client: Client,
    base_url: String,
    api_key: String,
    api_secret: String,
}

impl FrappeClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.scheduling_api_url.trim_end_matches('.').to_string(),
            api_key: config.scheduling_api_key.clone(),
            api_secret: config.scheduling_api_secret.clone(),
        }
    }

    fn get_headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();

        let credentials = format!("{}:{}", self.api_key, self.api_secret);
        let encoded = general_purpose::STANDARD.encode(credentials);
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Basic {}", encoded))
                .context("API credentials are not a valid header value")?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        Ok(headers)
    }

    pub fn method_url(&self, method: &str) -> String {
        format!("{}.{}", self.base_url, method)
    }

    /// GET a whitelisted method; `params` become query parameters.
    /// A response without a `message` yields `T::default()`.
    pub async fn get<T>(&self, method: &str, params: &[(&str, &str)]) -> Result<T>
    where
        T: DeserializeOwned + Default,
    {
        let req = self
            .client
            .request(Method::GET, self.method_url(method))
            .query(params);
        self.send(method, req).await
    }

    /// POST a JSON body to a whitelisted method.
    pub async fn post<T, B>(&self, method: &str, body: &B) -> Result<T>
    where
        T: DeserializeOwned + Default,
        B: Serialize + ?Sized,
    {
        let req = self
            .client
            .request(Method::POST, self.method_url(method))
            .json(body);
        self.send(method, req).await
    }

    async fn send<T>(&self, method: &str, req: RequestBuilder) -> Result<T>
    where
        T: DeserializeOwned + Default,
    {
        debug!("Calling scheduling method {}", method);

        let response = req.headers(self.get_headers()?).send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("Scheduling API error ({}) on {}: {}", status, method, error_text);

            return Err(match status.as_u16() {
                401 | 403 => anyhow!("Authentication error: {}", error_text),
                404 => anyhow!("Method not found: {}", method),
                _ => anyhow!("HTTP error! status: {}", status),
            });
        }

        let envelope = response
            .json::<Envelope<T>>()
            .await
            .with_context(|| format!("Malformed response from {}", method))?;

        Ok(envelope.message.unwrap_or_default())
    }

    pub fn get_base_url(&self) -> &str {
        &self.base_url
    }
}

// src/client.rs
use std::sync::Arc;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use url::Url;

use crate::config::{Config, PAGERDUTY_ACCEPT, USER_AGENT};
use crate::error::{Error, Result};
use crate::runners::AutomationActionsRunnerService;

/// Transport-level metadata of a completed round trip.
#[derive(Debug, Clone)]
pub struct Response {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

/// Sends one request and hands back whatever the server answered, whatever the status.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    async fn execute(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<Vec<u8>>,
    ) -> Result<Response>;
}

/// reqwest-backed transport talking to the PagerDuty REST API.
#[derive(Clone)]
pub struct HttpTransport {
    base: Url,
    token: Option<String>,
    http: reqwest::Client,
}

impl HttpTransport {
    pub fn new(config: &Config) -> Result<Self> {
        let base = Url::parse(&config.api_url)?;
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            base,
            token: config.token.clone(),
            http,
        })
    }

    fn url(&self, path: &str, query: &[(&str, String)]) -> Result<Url> {
        let mut url = Url::parse(&format!(
            "{}/{}",
            self.base.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        ))?;
        if !query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(query.iter().map(|(k, v)| (*k, v.as_str())));
        }
        Ok(url)
    }
}

#[async_trait::async_trait]
impl Transport for HttpTransport {
    async fn execute(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<Vec<u8>>,
    ) -> Result<Response> {
        let url = self.url(path, query)?;
        let mut req = self
            .http
            .request(method, url)
            .header(ACCEPT, PAGERDUTY_ACCEPT);

        if let Some(token) = &self.token {
            let mut value = HeaderValue::from_str(&format!("Token token={token}"))
                .map_err(|_| Error::InvalidArgument("api token contains invalid header characters".into()))?;
            value.set_sensitive(true);
            req = req.header(AUTHORIZATION, value);
        }
        if let Some(body) = body {
            req = req.header(CONTENT_TYPE, "application/json").body(body);
        }

        let res = req.send().await?;
        let status = res.status();
        let headers = res.headers().clone();
        let body = res.bytes().await?.to_vec();
        Ok(Response { status, headers, body })
    }
}

/// Entry point of the binding; cheap to clone and safe to share across tasks.
#[derive(Clone)]
pub struct Client {
    transport: Arc<dyn Transport>,
}

impl Client {
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self::with_transport(Arc::new(HttpTransport::new(config)?)))
    }

    pub fn with_transport(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    pub fn automation_actions_runner(&self) -> AutomationActionsRunnerService<'_> {
        AutomationActionsRunnerService::new(self)
    }

    /// Send a request and fail on any non-2xx status.
    pub(crate) async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&B>,
    ) -> Result<Response> {
        let body = body
            .map(|b| serde_json::to_vec(b).map_err(Error::Encode))
            .transpose()?;

        tracing::debug!(%method, path, "pagerduty request");
        let res = self.transport.execute(method.clone(), path, query, body).await?;
        tracing::debug!(%method, path, status = res.status.as_u16(), "pagerduty response");

        if !res.status.is_success() {
            return Err(Error::from_status(res.status, &res.body));
        }
        Ok(res)
    }

    /// Send a request and decode the JSON response body.
    pub(crate) async fn fetch<B, T>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&B>,
    ) -> Result<(T, Response)>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let res = self.send(method, path, query, body).await?;
        let value = serde_json::from_slice(&res.body).map_err(Error::Decode)?;
        Ok((value, res))
    }
}

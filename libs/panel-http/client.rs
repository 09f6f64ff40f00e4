use crate::config::HttpClientConfig;
use crate::error::{HttpError, Result};
use crate::interceptor::{InterceptorChain, InterceptorHandle, RequestInterceptor, ResponseInterceptor};
use crate::pending::{PendingRequestInfo, PendingRequests};
use crate::request::{RequestBody, RequestConfig, RequestOptions};
use crate::response::{HttpResponse, ResponseBody};
use crate::token_store::TokenStore;
use parking_lot::RwLock;
use reqwest::header::{HeaderMap, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Method, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

struct Inner {
    config: HttpClientConfig,
    http: Client,
    token: RwLock<Option<String>>,
    token_store: Option<Arc<dyn TokenStore>>,
    request_interceptors: InterceptorChain<dyn RequestInterceptor>,
    response_interceptors: InterceptorChain<dyn ResponseInterceptor>,
    pending: PendingRequests,
}

/// REST client for the reader backend
///
/// Every call merges client defaults, per-call options and the bearer
/// token, runs the request interceptors, then tries up to `1 + retries`
/// times. Network failures and non-2xx statuses are retried after
/// `retry_delay`; timeouts and aborts end the call immediately.
///
/// Cloning is cheap; clones share token, interceptors and the pending table.
#[derive(Clone)]
pub struct HttpClient {
    inner: Arc<Inner>,
}

impl HttpClient {
    /// Create new client
    pub fn new(config: HttpClientConfig) -> Result<Self> {
        Self::build(config, None)
    }

    /// Create a client whose token survives restarts
    ///
    /// The stored token, if any, is loaded immediately.
    pub fn with_token_store(config: HttpClientConfig, store: Arc<dyn TokenStore>) -> Result<Self> {
        Self::build(config, Some(store))
    }

    fn build(config: HttpClientConfig, token_store: Option<Arc<dyn TokenStore>>) -> Result<Self> {
        Url::parse(&config.base_url)
            .map_err(|e| HttpError::InvalidUrl(format!("{}: {}", config.base_url, e)))?;

        let http = Client::builder().build()?;

        let token = match &token_store {
            Some(store) => store.load()?,
            None => None,
        };
        if token.is_some() {
            debug!("Loaded persisted auth token");
        }

        Ok(Self {
            inner: Arc::new(Inner {
                config,
                http,
                token: RwLock::new(token),
                token_store,
                request_interceptors: InterceptorChain::new(),
                response_interceptors: InterceptorChain::new(),
                pending: PendingRequests::new(),
            }),
        })
    }

    pub fn config(&self) -> &HttpClientConfig {
        &self.inner.config
    }

    /// Issue a call and return the decoded body
    pub async fn request(&self, endpoint: &str, options: RequestOptions) -> Result<ResponseBody> {
        Ok(self.execute(endpoint, options).await?.data)
    }

    /// Issue a call and return the full response
    pub async fn execute(&self, endpoint: &str, options: RequestOptions) -> Result<HttpResponse> {
        let url = self.resolve_url(endpoint)?;
        self.execute_url(url, options).await
    }

    /// GET with query parameters; `None` values are left out
    pub async fn get<K, V>(
        &self,
        endpoint: &str,
        params: impl IntoIterator<Item = (K, Option<V>)>,
        options: RequestOptions,
    ) -> Result<ResponseBody>
    where
        K: AsRef<str>,
        V: ToString,
    {
        let mut url = self.resolve_url(endpoint)?;
        let present: Vec<(K, String)> = params
            .into_iter()
            .filter_map(|(key, value)| value.map(|v| (key, v.to_string())))
            .collect();
        if !present.is_empty() {
            let mut query = url.query_pairs_mut();
            for (key, value) in &present {
                query.append_pair(key.as_ref(), value);
            }
        }

        let response = self.execute_url(url, options.method(Method::GET)).await?;
        Ok(response.data)
    }

    /// GET and decode the JSON body into `T`
    pub async fn get_json<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T> {
        let url = self.resolve_url(endpoint)?;
        let response = self
            .execute_url(url, RequestOptions::new().method(Method::GET))
            .await?;
        response.json()
    }

    pub async fn post<B: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        body: &B,
        options: RequestOptions,
    ) -> Result<ResponseBody> {
        self.send_json(Method::POST, endpoint, body, options).await
    }

    pub async fn put<B: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        body: &B,
        options: RequestOptions,
    ) -> Result<ResponseBody> {
        self.send_json(Method::PUT, endpoint, body, options).await
    }

    pub async fn patch<B: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        body: &B,
        options: RequestOptions,
    ) -> Result<ResponseBody> {
        self.send_json(Method::PATCH, endpoint, body, options).await
    }

    pub async fn delete(&self, endpoint: &str, options: RequestOptions) -> Result<ResponseBody> {
        self.request(endpoint, options.method(Method::DELETE)).await
    }

    async fn send_json<B: Serialize + ?Sized>(
        &self,
        method: Method,
        endpoint: &str,
        body: &B,
        options: RequestOptions,
    ) -> Result<ResponseBody> {
        let options = options.method(method).json(body)?;
        self.request(endpoint, options).await
    }

    /// Register a request interceptor; runs after all earlier ones
    pub fn add_request_interceptor(&self, interceptor: impl RequestInterceptor + 'static) -> InterceptorHandle {
        self.inner.request_interceptors.add(Arc::new(interceptor))
    }

    /// Register a response interceptor; runs after all earlier ones
    pub fn add_response_interceptor(&self, interceptor: impl ResponseInterceptor + 'static) -> InterceptorHandle {
        self.inner.response_interceptors.add(Arc::new(interceptor))
    }

    /// Set or clear the bearer token, persisting it when a store is configured
    ///
    /// `None` and the empty string both clear the token.
    pub fn set_auth_token(&self, token: Option<&str>) -> Result<()> {
        let token = token.filter(|t| !t.is_empty());
        *self.inner.token.write() = token.map(str::to_string);

        if let Some(store) = &self.inner.token_store {
            store.save(token)?;
        }
        debug!("Auth token {}", if token.is_some() { "set" } else { "cleared" });
        Ok(())
    }

    pub fn auth_token(&self) -> Option<String> {
        self.inner.token.read().clone()
    }

    /// Abort every in-flight call; each rejects with [`HttpError::Aborted`]
    pub fn cancel_all_requests(&self) {
        let cancelled = self.inner.pending.cancel_all();
        if cancelled > 0 {
            debug!("Cancelled {} pending requests", cancelled);
        }
    }

    pub fn pending_requests(&self) -> Vec<PendingRequestInfo> {
        self.inner.pending.snapshot()
    }

    pub fn pending_count(&self) -> usize {
        self.inner.pending.len()
    }

    /// Join `endpoint` onto the base URL; absolute URLs pass through
    pub fn resolve_url(&self, endpoint: &str) -> Result<Url> {
        let raw = if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
            endpoint.to_string()
        } else {
            let base = self.inner.config.base_url.trim_end_matches('/');
            let path = endpoint.trim_start_matches('/');
            format!("{}/{}", base, path)
        };
        Url::parse(&raw).map_err(|e| HttpError::InvalidUrl(format!("{}: {}", raw, e)))
    }

    fn build_config(&self, url: Url, options: RequestOptions) -> Result<(RequestConfig, Option<CancellationToken>)> {
        let defaults = &self.inner.config;

        let mut headers: HeaderMap = defaults.default_headers.clone();
        for (name, value) in options.headers.iter() {
            headers.insert(name.clone(), value.clone());
        }

        let mut config = RequestConfig {
            method: options.method.unwrap_or(Method::GET),
            url,
            headers,
            body: options.body,
            timeout: options.timeout.unwrap_or(defaults.timeout),
            retries: options.retries.unwrap_or(defaults.retries),
            retry_delay: options.retry_delay.unwrap_or(defaults.retry_delay),
            has_signal: options.signal.is_some(),
        };

        if !config.headers.contains_key(AUTHORIZATION) {
            if let Some(token) = self.inner.token.read().as_deref() {
                config.set_header(AUTHORIZATION, &format!("Bearer {}", token))?;
            }
        }

        Ok((config, options.signal))
    }

    async fn execute_url(&self, url: Url, options: RequestOptions) -> Result<HttpResponse> {
        let (mut config, signal) = self.build_config(url, options)?;

        for interceptor in self.inner.request_interceptors.snapshot() {
            config = interceptor.on_request(config).await?;
        }

        let pending = self
            .inner
            .pending
            .register(&config.method, config.url.as_str(), signal.as_ref());
        let token = pending.token().clone();

        let mut attempt: u32 = 0;
        let response = loop {
            match self.attempt(&config, &token).await {
                Ok(response) => break response,
                Err(e) if e.is_retryable() && attempt < config.retries => {
                    attempt += 1;
                    warn!(
                        "{} {} failed: {} (retry {}/{})",
                        config.method, config.url, e, attempt, config.retries
                    );
                    tokio::select! {
                        _ = token.cancelled() => return Err(HttpError::Aborted),
                        _ = tokio::time::sleep(config.retry_delay) => {}
                    }
                }
                Err(e) => {
                    debug!("{} {} failed: {}", config.method, config.url, e);
                    return Err(e);
                }
            }
        };
        drop(pending);

        let mut response = response;
        for interceptor in self.inner.response_interceptors.snapshot() {
            response = interceptor.on_response(response).await?;
        }
        Ok(response)
    }

    /// One network round trip, bounded by the timer or the caller's signal
    async fn attempt(&self, config: &RequestConfig, token: &CancellationToken) -> Result<HttpResponse> {
        let mut builder = self
            .inner
            .http
            .request(config.method.clone(), config.url.clone())
            .headers(config.headers.clone());
        builder = match &config.body {
            Some(RequestBody::Json(value)) => builder.body(value.to_string()),
            Some(RequestBody::Text(text)) => builder.body(text.clone()),
            Some(RequestBody::Bytes(bytes)) => builder.body(bytes.clone()),
            None => builder,
        };

        debug!("{} {}", config.method, config.url);

        let exchange = async {
            let response = builder.send().await?;
            let status = response.status();
            let headers = response.headers().clone();
            let bytes = response.bytes().await?;
            Ok::<_, HttpError>((status, headers, bytes))
        };

        let (status, headers, bytes) = if config.has_signal {
            tokio::select! {
                _ = token.cancelled() => return Err(HttpError::Aborted),
                result = exchange => result?,
            }
        } else {
            tokio::select! {
                _ = token.cancelled() => return Err(HttpError::Aborted),
                _ = tokio::time::sleep(config.timeout) => {
                    return Err(HttpError::Timeout { after: config.timeout });
                }
                result = exchange => result?,
            }
        };

        if !status.is_success() {
            return Err(HttpError::Status {
                status: status.as_u16(),
                status_text: status.canonical_reason().unwrap_or_default().to_string(),
                headers,
                body: String::from_utf8_lossy(&bytes).into_owned(),
            });
        }

        let content_type = headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok());
        let data = ResponseBody::decode(content_type, &bytes);

        Ok(HttpResponse {
            data,
            status: status.as_u16(),
            headers,
            config: config.clone(),
        })
    }
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("base_url", &self.inner.config.base_url)
            .field("pending", &self.inner.pending.len())
            .finish()
    }
}

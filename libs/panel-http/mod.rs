//! # Panel HTTP
//!
//! REST client for the reader backend.
//!
//! ## Features
//!
//! - **Layered defaults**: client config, per-call options, bearer token
//! - **Interceptors**: ordered async request/response hooks, removable at runtime
//! - **Bounded retry**: network failures and non-2xx statuses, fixed delay
//! - **Cancellation**: client timer or caller signal, plus `cancel_all_requests()`
//! - **Token persistence**: pluggable [`TokenStore`]
//!
//! ## Example
//!
//! ```rust,ignore
//! use panel_http::{HttpClient, HttpClientConfig, RequestOptions};
//!
//! let client = HttpClient::new(HttpClientConfig::new("http://localhost:8080/api"))?;
//! let status = client.get("/readers", [("online", Some(true))], RequestOptions::new()).await?;
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod interceptor;
pub mod pending;
pub mod request;
pub mod response;
pub mod token_store;

pub use client::HttpClient;
pub use config::{HttpClientConfig, DEFAULT_RETRIES, DEFAULT_RETRY_DELAY, DEFAULT_TIMEOUT};
pub use error::{HttpError, Result};
pub use interceptor::{InterceptorChain, InterceptorHandle, RequestInterceptor, ResponseInterceptor};
pub use pending::{PendingRequestInfo, PendingRequests};
pub use request::{RequestBody, RequestConfig, RequestOptions};
pub use response::{HttpResponse, ResponseBody};
pub use token_store::{FileTokenStore, MemoryTokenStore, TokenStore, AUTH_TOKEN_KEY};

// Re-exported so callers need not depend on reqwest/tokio-util directly
pub use reqwest::header;
pub use reqwest::Method;
pub use tokio_util::sync::CancellationToken;

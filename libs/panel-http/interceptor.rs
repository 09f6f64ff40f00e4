//! Request and response interceptor chains
//!
//! Interceptors run in registration order. Each receives the value by
//! ownership and hands back the (possibly modified) value, or an error that
//! fails the call.

use crate::error::Result;
use crate::request::RequestConfig;
use crate::response::HttpResponse;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::future::Future;
use std::sync::{Arc, Weak};

/// Sees every request after defaults, options and the auth header are merged
#[async_trait]
pub trait RequestInterceptor: Send + Sync {
    async fn on_request(&self, config: RequestConfig) -> Result<RequestConfig>;
}

/// Sees every successful response before its data reaches the caller
#[async_trait]
pub trait ResponseInterceptor: Send + Sync {
    async fn on_response(&self, response: HttpResponse) -> Result<HttpResponse>;
}

#[async_trait]
impl<F, Fut> RequestInterceptor for F
where
    F: Fn(RequestConfig) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<RequestConfig>> + Send + 'static,
{
    async fn on_request(&self, config: RequestConfig) -> Result<RequestConfig> {
        self(config).await
    }
}

#[async_trait]
impl<F, Fut> ResponseInterceptor for F
where
    F: Fn(HttpResponse) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<HttpResponse>> + Send + 'static,
{
    async fn on_response(&self, response: HttpResponse) -> Result<HttpResponse> {
        self(response).await
    }
}

struct Entries<T: ?Sized> {
    next_id: u64,
    list: Vec<(u64, Arc<T>)>,
}

/// Ordered, runtime-mutable list of interceptors
pub struct InterceptorChain<T: ?Sized> {
    entries: Arc<Mutex<Entries<T>>>,
}

impl<T: ?Sized + Send + Sync + 'static> InterceptorChain<T> {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(Mutex::new(Entries {
                next_id: 0,
                list: Vec::new(),
            })),
        }
    }

    pub fn add(&self, interceptor: Arc<T>) -> InterceptorHandle {
        let mut entries = self.entries.lock();
        let id = entries.next_id;
        entries.next_id += 1;
        entries.list.push((id, interceptor));

        let weak: Weak<Mutex<Entries<T>>> = Arc::downgrade(&self.entries);
        InterceptorHandle {
            remover: Box::new(move || match weak.upgrade() {
                Some(entries) => {
                    let mut entries = entries.lock();
                    let before = entries.list.len();
                    entries.list.retain(|(entry_id, _)| *entry_id != id);
                    entries.list.len() != before
                }
                None => false,
            }),
        }
    }

    /// Current interceptors in order, cloned out of the lock
    pub fn snapshot(&self) -> Vec<Arc<T>> {
        self.entries
            .lock()
            .list
            .iter()
            .map(|(_, interceptor)| Arc::clone(interceptor))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: ?Sized + Send + Sync + 'static> Default for InterceptorChain<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Returned by registration; `remove()` takes the interceptor out again
pub struct InterceptorHandle {
    remover: Box<dyn FnOnce() -> bool + Send + Sync>,
}

impl InterceptorHandle {
    /// De-register; returns false if it was already removed
    pub fn remove(self) -> bool {
        (self.remover)()
    }
}

impl std::fmt::Debug for InterceptorHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InterceptorHandle").finish_non_exhaustive()
    }
}

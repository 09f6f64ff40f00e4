//! Remote log shipping
//!
//! [`LogShipperLayer`] turns tracing events into [`LogEntry`] values and
//! hands them to a background task, which POSTs them in batches of
//! `{"logs": [...]}` to the backend through [`HttpClient`].

use crate::config::LogShippingSettings;
use chrono::{DateTime, Utc};
use panel_http::{HttpClient, RequestOptions};
use serde::Serialize;
use std::fmt::{self, Write as _};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::field::{Field, Visit};
use tracing::{warn, Event, Level, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::Layer;

/// Targets never shipped, so shipping cannot feed itself
const EXCLUDED_TARGETS: &[&str] = &["panel_http", "reqwest", "hyper", "hyper_util", "h2", module_path!()];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: String,
    pub target: String,
    pub message: String,
}

#[derive(Serialize)]
struct LogBatch<'a> {
    logs: &'a [LogEntry],
}

/// Tracing layer feeding the shipper task
pub struct LogShipperLayer {
    tx: mpsc::UnboundedSender<LogEntry>,
    min_level: Level,
}

impl LogShipperLayer {
    pub(crate) fn new(tx: mpsc::UnboundedSender<LogEntry>, min_level: Level) -> Self {
        Self { tx, min_level }
    }

    fn accepts(&self, level: &Level, target: &str) -> bool {
        // more verbose levels compare greater
        if *level > self.min_level {
            return false;
        }
        !EXCLUDED_TARGETS
            .iter()
            .any(|excluded| target == *excluded || target.starts_with(&format!("{}::", excluded)))
    }
}

impl<S: Subscriber> Layer<S> for LogShipperLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let meta = event.metadata();
        if !self.accepts(meta.level(), meta.target()) {
            return;
        }

        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);

        // receiver gone means the shipper was shut down
        let _ = self.tx.send(LogEntry {
            timestamp: Utc::now(),
            level: meta.level().to_string(),
            target: meta.target().to_string(),
            message: visitor.finish(),
        });
    }
}

#[derive(Default)]
struct MessageVisitor {
    message: String,
    fields: String,
}

impl MessageVisitor {
    fn finish(self) -> String {
        if self.fields.is_empty() {
            self.message
        } else if self.message.is_empty() {
            self.fields.trim_start().to_string()
        } else {
            format!("{}{}", self.message, self.fields)
        }
    }
}

impl Visit for MessageVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message.push_str(value);
        } else {
            let _ = write!(self.fields, " {}={}", field.name(), value);
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            let _ = write!(self.message, "{:?}", value);
        } else {
            let _ = write!(self.fields, " {}={:?}", field.name(), value);
        }
    }
}

/// Handle to the background shipping task
pub struct LogShipper {
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl LogShipper {
    /// Spawn the shipping task and return the layer that feeds it
    ///
    /// Must be called inside a tokio runtime.
    pub fn spawn(client: HttpClient, settings: &LogShippingSettings, min_level: Level) -> (LogShipperLayer, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        let (shutdown, shutdown_rx) = oneshot::channel();

        let worker = Worker {
            client,
            endpoint: settings.endpoint.clone(),
            batch_size: settings.batch_size.max(1),
            flush_interval: settings.flush_interval(),
        };
        let task = tokio::spawn(worker.run(rx, shutdown_rx));

        (LogShipperLayer::new(tx, min_level), Self { shutdown, task })
    }

    /// Flush whatever is buffered and stop the task
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(());
        let _ = self.task.await;
    }
}

struct Worker {
    client: HttpClient,
    endpoint: String,
    batch_size: usize,
    flush_interval: Duration,
}

impl Worker {
    async fn run(self, mut rx: mpsc::UnboundedReceiver<LogEntry>, mut shutdown: oneshot::Receiver<()>) {
        let mut batch: Vec<LogEntry> = Vec::with_capacity(self.batch_size);
        let mut ticker = tokio::time::interval(self.flush_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;

        loop {
            tokio::select! {
                biased;

                _ = &mut shutdown => {
                    while let Ok(entry) = rx.try_recv() {
                        batch.push(entry);
                        if batch.len() >= self.batch_size {
                            self.flush(&mut batch).await;
                        }
                    }
                    self.flush(&mut batch).await;
                    break;
                }

                entry = rx.recv() => match entry {
                    Some(entry) => {
                        batch.push(entry);
                        if batch.len() >= self.batch_size {
                            self.flush(&mut batch).await;
                        }
                    }
                    None => {
                        self.flush(&mut batch).await;
                        break;
                    }
                },

                _ = ticker.tick() => self.flush(&mut batch).await,
            }
        }
    }

    async fn flush(&self, batch: &mut Vec<LogEntry>) {
        if batch.is_empty() {
            return;
        }

        let result = self
            .client
            .post(&self.endpoint, &LogBatch { logs: batch.as_slice() }, RequestOptions::new())
            .await;

        // this module is excluded from shipping, so the warning stays local
        if let Err(e) = result {
            warn!("Log shipping failed, dropped {} entries: {}", batch.len(), e);
        }
        batch.clear();
    }
}

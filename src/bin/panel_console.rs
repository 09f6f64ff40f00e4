//! Operator console for the reader dashboard backend
//!
//! Opens the live socket, logs lifecycle events and inbound frames, and
//! polls `GET /status` until Ctrl+C.

use anyhow::{Context, Result};
use reader_panel::bin_common::{config_path_from_args, parse_args, shutdown_signal, BinaryRunner, RunConfig};
use reader_panel::config::AppConfig;
use reader_panel::log_shipper::LogShipper;
use reader_panel::logging::{init_tracing, init_tracing_with_shipper};
use reader_panel::panel_http::RequestOptions;
use reader_panel::panel_socket::{names, SocketEvent};
use reader_panel::transport::Transport;
use tracing::{error, info, warn};

struct PanelConsole {
    run_config: RunConfig,
    transport: Transport,
    shipper: Option<LogShipper>,
}

impl PanelConsole {
    fn watch_socket(&self) {
        let socket = &self.transport.socket;

        socket.on(names::CONNECTED, |_| {
            info!("Socket connected");
            Ok(())
        });
        socket.on(names::DISCONNECTED, |event| {
            if let SocketEvent::Disconnected { code, reason } = event {
                warn!("Socket closed (code {}): {}", code, reason);
            }
            Ok(())
        });
        socket.on(names::RECONNECTING, |event| {
            if let SocketEvent::Reconnecting { attempt, delay } = event {
                info!("Reconnect attempt {} after {:?}", attempt, delay);
            }
            Ok(())
        });
        socket.on(names::RECONNECT_FAILED, |event| {
            if let SocketEvent::ReconnectFailed { attempts } = event {
                error!("Gave up reconnecting after {} attempts", attempts);
            }
            Ok(())
        });
        socket.on(names::ERROR, |event| {
            if let SocketEvent::Error(message) = event {
                error!("Socket error: {}", message);
            }
            Ok(())
        });
        socket.on(names::MESSAGE, |event| {
            match event {
                SocketEvent::Message(value) => info!("<- {}", value),
                SocketEvent::Raw(text) => info!("<- (text) {}", text),
                SocketEvent::Binary(data) => info!("<- ({} bytes)", data.len()),
                _ => {}
            }
            Ok(())
        });
    }

    async fn log_status(&self) {
        match self.transport.http.request("/status", RequestOptions::new()).await {
            Ok(body) => info!("Backend status: {:?}", body),
            Err(e) => warn!("Status request failed: {}", e),
        }

        let metrics = self.transport.socket.metrics();
        info!(
            "Socket {:?}: sent={} received={} queued={} dropped={} reconnects={}",
            metrics.connection_state,
            metrics.messages_sent,
            metrics.messages_received,
            metrics.queue_len,
            metrics.messages_dropped,
            metrics.reconnect_count
        );
    }
}

impl BinaryRunner for PanelConsole {
    async fn run(&mut self) -> Result<()> {
        self.watch_socket();

        // a failed first attempt is not fatal; the operator sees the error event
        if let Err(e) = self.transport.socket.connect().await {
            warn!("Initial socket connect failed: {}", e);
        }

        let mut ticker = tokio::time::interval(self.run_config.status_interval());
        let shutdown = shutdown_signal();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = ticker.tick() => self.log_status().await,
            }
        }
        Ok(())
    }

    async fn shutdown(&mut self) -> Option<String> {
        self.transport.shutdown();
        let metrics = self.transport.socket.metrics();

        if let Some(shipper) = self.shipper.take() {
            shipper.shutdown().await;
        }

        Some(format!(
            "Sent {} messages, received {}, reconnected {} times",
            metrics.messages_sent, metrics.messages_received, metrics.reconnect_count
        ))
    }

    fn config(&self) -> &RunConfig {
        &self.run_config
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load config first (before logging is initialized)
    let config_path = config_path_from_args(&parse_args());
    let config = AppConfig::load(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;

    let transport = Transport::from_config(&config)?;

    let shipper = if config.log_shipping.enabled {
        let min_level = config
            .log_shipping
            .min_level
            .parse::<tracing::Level>()
            .context("log_shipping.min_level")?;
        let (layer, shipper) = LogShipper::spawn(transport.http.clone(), &config.log_shipping, min_level);
        init_tracing_with_shipper(config.effective_log_level(), layer);
        Some(shipper)
    } else {
        init_tracing(config.effective_log_level());
        None
    };

    info!("Config: {}", config_path.display());
    info!("API: {}", config.api_base_url);
    info!("Socket: {}", config.ws_url);

    let mut console = PanelConsole {
        run_config: RunConfig::new("Reader Panel Console").with_status_interval(30),
        transport,
        shipper,
    };
    console.execute().await
}

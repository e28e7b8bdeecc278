use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::{Result, bail};
use tokio::time::Instant;
use tracing::{debug, info};

/// Where and as whom to connect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectParams {
    pub host: String,
    pub port: u16,
    pub client_id: i32,
}

/// What the server tells us once the handshake completes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handshake {
    pub server_version: i32,
    pub server_time: String,
}

/// Byte-level link to the gateway. Framing and socket handling live behind
/// this trait; the controller only deals in token batches.
pub trait Transport: Send {
    fn connect(&mut self, params: &ConnectParams) -> Result<Handshake>;
    fn disconnect(&mut self);
    fn send(&mut self, tokens: &[String]) -> Result<()>;
}

/// One batch handed to [`ReplayTransport::send`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentFrame {
    pub at: Instant,
    pub tokens: Vec<String>,
}

/// In-memory transport for offline replay and tests. Records every send.
#[derive(Debug, Clone)]
pub struct ReplayTransport {
    server_version: i32,
    server_time: String,
    refuse: Option<String>,
    fail_sends: Option<String>,
    connected: bool,
    sent: Arc<Mutex<Vec<SentFrame>>>,
}

impl ReplayTransport {
    pub fn new(server_version: i32) -> Self {
        Self {
            server_version,
            server_time: chrono::Local::now().format("%Y%m%d %H:%M:%S").to_string(),
            refuse: None,
            fail_sends: None,
            connected: false,
            sent: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Make every connect attempt fail with `reason`.
    pub fn refuse_connections(mut self, reason: impl Into<String>) -> Self {
        self.refuse = Some(reason.into());
        self
    }

    /// Make every send fail with `reason`.
    pub fn fail_sends(mut self, reason: impl Into<String>) -> Self {
        self.fail_sends = Some(reason.into());
        self
    }

    /// Shared handle on the send log; stays valid after the transport is boxed.
    pub fn sent_log(&self) -> Arc<Mutex<Vec<SentFrame>>> {
        Arc::clone(&self.sent)
    }

    fn log(&self) -> MutexGuard<'_, Vec<SentFrame>> {
        self.sent.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Transport for ReplayTransport {
    fn connect(&mut self, params: &ConnectParams) -> Result<Handshake> {
        if let Some(reason) = &self.refuse {
            bail!("{}:{} refused connection: {reason}", params.host, params.port);
        }
        self.connected = true;
        info!(
            host = %params.host,
            port = params.port,
            client_id = params.client_id,
            server_version = self.server_version,
            "replay transport connected"
        );
        Ok(Handshake {
            server_version: self.server_version,
            server_time: self.server_time.clone(),
        })
    }

    fn disconnect(&mut self) {
        self.connected = false;
        debug!("replay transport closed");
    }

    fn send(&mut self, tokens: &[String]) -> Result<()> {
        if !self.connected {
            bail!("transport is closed");
        }
        if let Some(reason) = &self.fail_sends {
            bail!("{reason}");
        }
        self.log().push(SentFrame {
            at: Instant::now(),
            tokens: tokens.to_vec(),
        });
        Ok(())
    }
}

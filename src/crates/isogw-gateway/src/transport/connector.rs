//! The Connector: one persistent framed connection to the upstream.
//!
//! Architecture:
//! - A single supervise task runs the connect → read → reconnect cycle
//!   until [`Connector::close`] is called.
//! - Inbound frames and link transitions are delivered as [`LinkEvent`]s
//!   on an `mpsc` channel, in arrival order: `Up` strictly precedes the
//!   first `Frame` of a session, `Down` strictly follows its last.
//! - Outbound writes go through [`Connector::send`], which holds a single
//!   writer mutex so concurrent senders can never interleave the bytes of
//!   two frames, while a pending read on the other half proceeds
//!   untouched.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{lookup_host, TcpSocket};
use tokio::sync::{mpsc, Mutex};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::{GatewayConfig, BACKOFF_CAP};
use crate::transport::tls::{self, TlsError};

/// Write deadline applied to every [`Connector::send`] call.
const WRITE_DEADLINE: Duration = Duration::from_secs(5);

/// Channel depth for link events; the reader blocks when the supervisor
/// falls this far behind, preserving frame order.
const EVENT_QUEUE: usize = 64;

type Reader = Box<dyn AsyncRead + Send + Unpin>;
type Writer = Box<dyn AsyncWrite + Send + Unpin>;

/// Connection options, immutable for the connector's lifetime.
#[derive(Debug, Clone)]
pub struct DialConfig {
    /// Upstream `host:port`.
    pub endpoint: String,
    /// Tunnel through TLS.
    pub tls: bool,
    /// Skip certificate verification (operator-controlled networks only).
    pub tls_insecure: bool,
    /// Limit on a single dial attempt.
    pub dial_timeout: Duration,
    /// TCP keepalive; zero disables the probe.
    pub keepalive: Duration,
    /// Read deadline per inbound frame.
    pub read_idle: Duration,
    /// Base reconnect backoff, doubled per failed dial up to 30 s.
    pub retry_backoff: Duration,
}

impl From<&GatewayConfig> for DialConfig {
    fn from(cfg: &GatewayConfig) -> Self {
        Self {
            endpoint: cfg.endpoint.clone(),
            tls: cfg.tls,
            tls_insecure: cfg.tls_insecure,
            dial_timeout: cfg.dial_timeout,
            keepalive: cfg.keepalive,
            read_idle: cfg.read_idle,
            retry_backoff: cfg.retry_backoff_base,
        }
    }
}

/// Events emitted by the connector, consumed by the supervisor.
#[derive(Debug)]
pub enum LinkEvent {
    /// A dial succeeded; the link is live.
    Up,
    /// The link dropped or a dial failed.
    Down { reason: String },
    /// One complete inbound message, MLI prefix included.
    Frame(Vec<u8>),
}

/// Errors surfaced to callers of the connector's public API.
#[derive(Debug, thiserror::Error)]
pub enum ConnectorError {
    #[error("not connected")]
    NotConnected,

    #[error("write timeout after {0:?}")]
    WriteTimeout(Duration),

    #[error("dial timeout after {0:?}")]
    DialTimeout(Duration),

    #[error("endpoint {0:?} did not resolve")]
    Unresolvable(String),

    #[error("invalid TLS server name in endpoint {0:?}")]
    InvalidServerName(String),

    #[error(transparent)]
    Tls(#[from] TlsError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Owns the one upstream socket and its reconnect lifecycle.
pub struct Connector {
    cfg: DialConfig,
    tls: Option<tokio_rustls::TlsConnector>,
    writer: Mutex<Option<Writer>>,
    closed: AtomicBool,
    shutdown: CancellationToken,
    events: mpsc::Sender<LinkEvent>,
}

impl Connector {
    /// Creates the connector and the event stream it will feed.
    ///
    /// The TLS client configuration is built eagerly so a broken root
    /// store is a startup error rather than an endless reconnect loop.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError::Tls`] when TLS is enabled and the
    /// platform root store cannot be loaded.
    pub fn new(cfg: DialConfig) -> Result<(Self, mpsc::Receiver<LinkEvent>), ConnectorError> {
        let tls = if cfg.tls {
            Some(tokio_rustls::TlsConnector::from(tls::client_config(
                cfg.tls_insecure,
            )?))
        } else {
            None
        };
        let (tx, rx) = mpsc::channel(EVENT_QUEUE);
        let connector = Self {
            cfg,
            tls,
            writer: Mutex::new(None),
            closed: AtomicBool::new(false),
            shutdown: CancellationToken::new(),
            events: tx,
        };
        Ok((connector, rx))
    }

    /// Spawns the supervise task running the connect/reconnect loop.
    pub fn start(self: &Arc<Self>) {
        let this = Arc::clone(self);
        tokio::spawn(async move { this.supervise().await });
    }

    /// Writes one complete frame (caller supplies the MLI prefix).
    ///
    /// Writes are serialized: the frame hits the wire contiguously even
    /// when several tasks send concurrently.
    ///
    /// # Errors
    ///
    /// [`ConnectorError::NotConnected`] when no live socket exists,
    /// [`ConnectorError::WriteTimeout`] after the 5-second deadline, or
    /// the underlying I/O error.
    pub async fn send(&self, frame: &[u8]) -> Result<(), ConnectorError> {
        if self.closed.load(Ordering::Relaxed) {
            return Err(ConnectorError::NotConnected);
        }
        let mut guard = self.writer.lock().await;
        let writer = guard.as_mut().ok_or(ConnectorError::NotConnected)?;
        let write = async {
            writer.write_all(frame).await?;
            writer.flush().await
        };
        match timeout(WRITE_DEADLINE, write).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(ConnectorError::Io(e)),
            Err(_) => Err(ConnectorError::WriteTimeout(WRITE_DEADLINE)),
        }
    }

    /// Flags the connector closed and wakes the supervise task.
    ///
    /// The reader exits at its next suspension point (a pending framed
    /// read is bounded by `read_idle`), the socket is dropped, and no
    /// further dial is attempted.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Relaxed);
        self.shutdown.cancel();
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Relaxed)
    }

    // ── Connect/reconnect loop ────────────────────────────────────────────────

    async fn supervise(self: Arc<Self>) {
        let base = self.cfg.retry_backoff;
        let mut backoff = base;

        while !self.is_closed() {
            match self.dial().await {
                Err(e) => {
                    warn!("dial {} failed: {e}", self.cfg.endpoint);
                    if self.emit(LinkEvent::Down { reason: e.to_string() }).await.is_err() {
                        break;
                    }
                    self.sleep_backoff(backoff).await;
                    backoff = (backoff * 2).min(BACKOFF_CAP);
                }
                Ok(mut reader) => {
                    backoff = base;
                    info!("connected to {} (tls={})", self.cfg.endpoint, self.cfg.tls);
                    if self.emit(LinkEvent::Up).await.is_err() {
                        break;
                    }
                    let reason = self.read_loop(&mut reader).await;
                    self.writer.lock().await.take();
                    if self.emit(LinkEvent::Down { reason }).await.is_err() {
                        break;
                    }
                }
            }
        }
        // Final teardown so a frame in flight cannot be half-written to a
        // dead socket after close().
        self.writer.lock().await.take();
        debug!("connector loop for {} exited", self.cfg.endpoint);
    }

    /// Resolves, connects, optionally wraps in TLS, and installs the
    /// write half.  Returns the read half for the read loop.
    ///
    /// Every step runs under the dial timeout, name resolution included,
    /// so a hung resolver cannot stall the reconnect loop.
    async fn dial(&self) -> Result<Reader, ConnectorError> {
        let endpoint = &self.cfg.endpoint;
        let addr = timeout(self.cfg.dial_timeout, lookup_host(endpoint.as_str()))
            .await
            .map_err(|_| ConnectorError::DialTimeout(self.cfg.dial_timeout))??
            .next()
            .ok_or_else(|| ConnectorError::Unresolvable(endpoint.clone()))?;

        let socket = if addr.is_ipv4() { TcpSocket::new_v4() } else { TcpSocket::new_v6() }?;
        if !self.cfg.keepalive.is_zero() {
            socket.set_keepalive(true)?;
        }
        let stream = timeout(self.cfg.dial_timeout, socket.connect(addr))
            .await
            .map_err(|_| ConnectorError::DialTimeout(self.cfg.dial_timeout))??;

        match &self.tls {
            Some(connector) => {
                let name = rustls::ServerName::try_from(sni_host(endpoint))
                    .map_err(|_| ConnectorError::InvalidServerName(endpoint.clone()))?;
                let tls_stream = timeout(self.cfg.dial_timeout, connector.connect(name, stream))
                    .await
                    .map_err(|_| ConnectorError::DialTimeout(self.cfg.dial_timeout))??;
                let (r, w) = tokio::io::split(tls_stream);
                *self.writer.lock().await = Some(Box::new(w));
                Ok(Box::new(r))
            }
            None => {
                let (r, w) = stream.into_split();
                *self.writer.lock().await = Some(Box::new(w));
                Ok(Box::new(r))
            }
        }
    }

    // ── Read loop / framing ───────────────────────────────────────────────────

    /// Reads framed messages until the connection dies or the connector
    /// closes.  Returns the reason the session ended.
    async fn read_loop(&self, reader: &mut Reader) -> String {
        while !self.is_closed() {
            let frame = tokio::select! {
                r = read_frame(reader, self.cfg.read_idle) => r,
                _ = self.shutdown.cancelled() => return "closed".to_string(),
            };
            match frame {
                Ok(frame) => {
                    if self.emit(LinkEvent::Frame(frame)).await.is_err() {
                        return "event channel closed".to_string();
                    }
                }
                Err(e) => return e.to_string(),
            }
        }
        "closed".to_string()
    }

    async fn emit(&self, event: LinkEvent) -> Result<(), ()> {
        self.events.send(event).await.map_err(|_| ())
    }

    /// Sleeps the backoff, returning early when close() fires.
    async fn sleep_backoff(&self, backoff: Duration) {
        tokio::select! {
            _ = tokio::time::sleep(backoff) => {}
            _ = self.shutdown.cancelled() => {}
        }
    }
}

/// Extracts the TLS server name from a `host:port` endpoint, stripping
/// the brackets of an IPv6 literal (`[::1]:5001` → `::1`).
fn sni_host(endpoint: &str) -> &str {
    endpoint
        .rsplit_once(':')
        .map_or(endpoint, |(host, _)| host)
        .trim_start_matches('[')
        .trim_end_matches(']')
}

/// Reads one `[2B MLI][body]` frame under a single `read_idle` deadline.
///
/// An MLI of zero is a fatal framing error: the stream offers no way to
/// resynchronize, so the connection must be torn down.  (The 2-byte field
/// caps the body at 65 535 bytes by construction.)
async fn read_frame(reader: &mut Reader, read_idle: Duration) -> Result<Vec<u8>, std::io::Error> {
    let read = async {
        let mut mli = [0u8; 2];
        reader.read_exact(&mut mli).await?;
        let len = u16::from_be_bytes(mli) as usize;
        if len == 0 {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "invalid MLI 0",
            ));
        }
        let mut frame = vec![0u8; 2 + len];
        frame[..2].copy_from_slice(&mli);
        reader.read_exact(&mut frame[2..]).await?;
        Ok(frame)
    };
    match timeout(read_idle, read).await {
        Ok(result) => result,
        Err(_) => Err(std::io::Error::new(
            std::io::ErrorKind::TimedOut,
            format!("no frame within {read_idle:?}"),
        )),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

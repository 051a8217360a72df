//! # Request Server
//!
//! Drives one SFTP session over a byte stream: a single reader loop decodes
//! frames in order, each request runs on its own blocking task, and responses
//! return through the shared [`ResponseSender`].
//!
//! ## Error boundary
//! - Framing failures end the session with an error.
//! - A body that fails to decode is answered with a STATUS for its Id. If the Id
//!   itself cannot be read the session ends.
//! - End-of-stream on a frame boundary ends the session cleanly once in-flight
//!   handlers have answered.
//!
//! The request handler performs the filesystem work and knows nothing about
//! framing:
//!
//! ```rust,no_run
//! use sftp_wire::config::ServerConfig;
//! use sftp_wire::core::packet::{NameEntry, NamePacket, Packet};
//! use sftp_wire::core::status::{StatusCode, StatusError};
//! use sftp_wire::server::Server;
//!
//! # async fn run() -> sftp_wire::error::Result<()> {
//! let handler = |id: u32, request: Packet| match request {
//!     Packet::Realpath(p) => Ok(Packet::Name(NamePacket {
//!         id,
//!         entries: vec![NameEntry::new(p.path)],
//!     })),
//!     _ => Err(StatusError::from_code(StatusCode::OpUnsupported)),
//! };
//! let server = Server::new(ServerConfig::default(), handler);
//! server.serve(tokio::io::stdin(), tokio::io::stdout()).await
//! # }
//! ```

pub mod sender;

use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, instrument, warn};

use crate::config::ServerConfig;
use crate::core::codec::{recv_frame, Frame};
use crate::core::packet::{InitPacket, Packet, PacketType, VersionPacket, WirePacket};
use crate::core::status::{StatusCode, StatusError};
use crate::error::{constants, ProtocolError, Result};
use crate::utils::metrics::{Metrics, Timer};

pub use sender::ResponseSender;

/// Performs the work behind a request.
///
/// Runs on a blocking thread; may do synchronous filesystem I/O. Returns the
/// response packet, which must carry the same Id, or a failure status.
pub trait RequestHandler: Send + Sync + 'static {
    fn handle(&self, id: u32, request: Packet) -> std::result::Result<Packet, StatusError>;
}

impl<F> RequestHandler for F
where
    F: Fn(u32, Packet) -> std::result::Result<Packet, StatusError> + Send + Sync + 'static,
{
    fn handle(&self, id: u32, request: Packet) -> std::result::Result<Packet, StatusError> {
        self(id, request)
    }
}

/// SFTP session driver
pub struct Server<H> {
    config: ServerConfig,
    handler: Arc<H>,
    metrics: Arc<Metrics>,
}

impl<H: RequestHandler> Server<H> {
    pub fn new(config: ServerConfig, handler: H) -> Self {
        Self {
            config,
            handler: Arc::new(handler),
            metrics: Arc::new(Metrics::new()),
        }
    }

    /// Share a metrics collector across sessions
    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Run one session until the peer hangs up or a fatal error occurs.
    ///
    /// Fails with [`ProtocolError::ConfigError`] before touching the stream if
    /// the configuration does not pass [`ServerConfig::validate`].
    #[instrument(skip_all, fields(max_in_flight = self.config.max_in_flight))]
    pub async fn serve<R, W>(&self, mut reader: R, writer: W) -> Result<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let errors = self.config.validate();
        if !errors.is_empty() {
            error!(errors = ?errors, "Refusing to serve with invalid configuration");
            return Err(ProtocolError::ConfigError(errors.join("; ")));
        }

        self.metrics.session_started();
        let sender = ResponseSender::with_metrics(writer, self.metrics.clone());

        let result = self.run(&mut reader, &sender).await;
        match &result {
            Ok(()) => info!("Session closed by peer"),
            Err(e) => {
                self.metrics.fatal_error();
                error!(error = %e, "Session terminated");
            }
        }

        self.metrics.session_ended();
        result
    }

    async fn run<R, W>(&self, reader: &mut R, sender: &ResponseSender<W>) -> Result<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let version = self.negotiate(reader, sender).await?;
        info!(version, "Session negotiated");

        let permits = Arc::new(Semaphore::new(self.config.max_in_flight));
        let mut tasks: JoinSet<Result<()>> = JoinSet::new();

        let outcome = self
            .request_loop(reader, sender, &permits, &mut tasks)
            .await;
        if outcome.is_err() {
            tasks.abort_all();
            return outcome;
        }

        self.drain(&mut tasks).await
    }

    async fn negotiate<R, W>(&self, reader: &mut R, sender: &ResponseSender<W>) -> Result<u32>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let frame = recv_frame(reader, self.config.max_packet_size).await?;
        self.metrics.frame_received(frame.len() as u64);

        if frame.packet_type() != Some(PacketType::Init) {
            return Err(ProtocolError::ProtocolViolation(
                constants::ERR_INIT_EXPECTED.to_string(),
            ));
        }
        let init = InitPacket::decode_body(frame.body())?;
        debug!(
            client_version = init.version,
            extensions = init.extensions.len(),
            "INIT received"
        );

        let version = init.version.min(self.config.protocol_version);
        let reply = VersionPacket {
            version,
            extensions: self.config.extensions.clone(),
        };
        sender.send(&reply).await?;
        Ok(version)
    }

    async fn request_loop<R, W>(
        &self,
        reader: &mut R,
        sender: &ResponseSender<W>,
        permits: &Arc<Semaphore>,
        tasks: &mut JoinSet<Result<()>>,
    ) -> Result<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        loop {
            let frame = match recv_frame(reader, self.config.max_packet_size).await {
                Ok(frame) => frame,
                Err(ProtocolError::ConnectionClosed) => return Ok(()),
                Err(e) => return Err(e),
            };
            self.metrics.frame_received(frame.len() as u64);

            match frame.decode() {
                Ok(packet) => self.dispatch(packet, sender, permits, tasks).await?,
                Err(e) => self.reject(&frame, e, sender).await?,
            }

            while let Some(joined) = tasks.try_join_next() {
                flatten_join(joined)?;
            }
            if sender.is_failed() {
                return Err(ProtocolError::ConnectionClosed);
            }
        }
    }

    async fn dispatch<W>(
        &self,
        packet: Packet,
        sender: &ResponseSender<W>,
        permits: &Arc<Semaphore>,
        tasks: &mut JoinSet<Result<()>>,
    ) -> Result<()>
    where
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let packet_type = packet.packet_type();
        let Some(id) = packet.id() else {
            return Err(ProtocolError::ProtocolViolation(format!(
                "{} after negotiation",
                packet_type.name()
            )));
        };

        if !packet_type.is_request() {
            warn!(id, packet_type = packet_type.name(), "Response-only packet from peer");
            self.metrics.status_error();
            let status = StatusError::from_code(StatusCode::OpUnsupported);
            return sender.send_packet(&Packet::status(id, status)).await;
        }

        debug!(id, packet_type = packet_type.name(), "dispatch request");
        let permit = permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| ProtocolError::ConnectionClosed)?;

        let handler = self.handler.clone();
        let sender = sender.clone();
        let metrics = self.metrics.clone();

        tasks.spawn(async move {
            let _permit = permit;
            metrics.request_handled();

            let outcome = tokio::task::spawn_blocking(move || {
                let _timer = Timer::start(packet_type.name());
                handler.handle(id, packet)
            })
            .await;
            let response = match outcome {
                Ok(Ok(response)) if response.id() == Some(id) => response,
                Ok(Ok(response)) => {
                    error!(
                        id,
                        response_id = ?response.id(),
                        "Handler answered with a mismatched id"
                    );
                    Packet::status(id, StatusError::from_code(StatusCode::Failure))
                }
                Ok(Err(status)) => Packet::status(id, status),
                Err(join_error) => {
                    error!(id, error = %join_error, "Handler panicked");
                    Packet::status(id, StatusError::new(StatusCode::Failure, "internal error"))
                }
            };

            if let Packet::Status(ref status) = response {
                if !status.status.is_ok() {
                    metrics.status_error();
                }
            }
            sender.send_packet(&response).await
        });
        Ok(())
    }

    /// Answer a frame whose body failed to decode
    async fn reject<W>(
        &self,
        frame: &Frame,
        error: ProtocolError,
        sender: &ResponseSender<W>,
    ) -> Result<()>
    where
        W: AsyncWrite + Unpin + Send + 'static,
    {
        self.metrics.decode_error();
        let Some(id) = Packet::recover_id(frame.tag(), frame.body()) else {
            warn!(tag = frame.tag(), error = %error, "Undecodable packet without id");
            return Err(ProtocolError::ProtocolViolation(
                constants::ERR_UNRECOVERABLE_ID.to_string(),
            ));
        };

        warn!(id, tag = frame.tag(), error = %error, "Rejecting malformed packet");
        self.metrics.status_error();
        sender
            .send_packet(&Packet::status(id, StatusError::from(&error)))
            .await
    }

    /// Wait for in-flight handlers after the peer hung up
    async fn drain(&self, tasks: &mut JoinSet<Result<()>>) -> Result<()> {
        let pending = tasks.len();
        if pending == 0 {
            return Ok(());
        }
        debug!(pending, "Waiting for in-flight requests");

        let drained = tokio::time::timeout(self.config.shutdown_timeout, async {
            while let Some(joined) = tasks.join_next().await {
                // Peer is gone; a failed late write is expected
                if let Err(e) = flatten_join(joined) {
                    debug!(error = %e, "Late response not delivered");
                }
            }
        })
        .await;

        if drained.is_err() {
            warn!(remaining = tasks.len(), "Shutdown timeout reached, aborting handlers");
            tasks.abort_all();
        }
        Ok(())
    }
}

fn flatten_join(joined: std::result::Result<Result<()>, tokio::task::JoinError>) -> Result<()> {
    joined.map_err(|e| ProtocolError::Custom(format!("response task failed: {e}")))?
}

//! # Concurrent Sender
//!
//! Serializes frame writes from concurrently running response producers onto a
//! single output stream.
//!
//! ```text
//! Handler 1 ─┐
//! Handler 2 ─┼─► marshal (no lock) ─► lock ─► one frame ─► unlock
//! Handler N ─┘
//! ```
//!
//! Packets are marshalled before the lock is taken, so the critical section
//! covers exactly one frame write. Responses go out in completion order; the
//! peer matches them to requests by Id.
//!
//! A failed write may have left half a frame on the stream. After the first
//! failure every later send fails with [`ProtocolError::ConnectionClosed`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::io::AsyncWrite;
use tokio::sync::Mutex;
use tracing::{debug, error};

use crate::core::codec::send_frame;
use crate::core::packet::{Packet, WirePacket};
use crate::error::{ProtocolError, Result};
use crate::utils::metrics::Metrics;

struct SenderInner<W> {
    writer: Mutex<W>,
    failed: AtomicBool,
    metrics: Arc<Metrics>,
}

/// Cloneable handle to the shared output stream
pub struct ResponseSender<W> {
    inner: Arc<SenderInner<W>>,
}

impl<W> Clone for ResponseSender<W> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<W> ResponseSender<W>
where
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(writer: W) -> Self {
        Self::with_metrics(writer, Arc::new(Metrics::new()))
    }

    pub fn with_metrics(writer: W, metrics: Arc<Metrics>) -> Self {
        Self {
            inner: Arc::new(SenderInner {
                writer: Mutex::new(writer),
                failed: AtomicBool::new(false),
                metrics,
            }),
        }
    }

    /// Whether a previous write failed and the stream is unusable
    pub fn is_failed(&self) -> bool {
        self.inner.failed.load(Ordering::Acquire)
    }

    /// Write one already-marshalled payload as a frame
    pub async fn send_payload(&self, payload: &[u8]) -> Result<()> {
        if self.is_failed() {
            return Err(ProtocolError::ConnectionClosed);
        }

        let result = {
            let mut writer = self.inner.writer.lock().await;
            send_frame(&mut *writer, payload).await
        };

        match result {
            Ok(()) => {
                self.inner.metrics.frame_sent(payload.len() as u64);
                Ok(())
            }
            Err(e) => {
                self.inner.failed.store(true, Ordering::Release);
                error!(error = %e, "Frame write failed, output stream is closed");
                Err(e)
            }
        }
    }

    /// Marshal and send any catalog packet
    pub async fn send_packet(&self, packet: &Packet) -> Result<()> {
        let payload = packet.marshal();
        debug!(
            packet_type = packet.packet_type().name(),
            id = ?packet.id(),
            len = payload.len(),
            "send packet"
        );
        self.send_payload(&payload).await
    }

    /// Marshal and send a single packet kind
    pub async fn send<P: WirePacket>(&self, packet: &P) -> Result<()> {
        let payload = packet.marshal();
        self.send_payload(&payload).await
    }

    /// Recover the writer once every clone has been dropped
    pub fn into_inner(self) -> Option<W> {
        Arc::try_unwrap(self.inner)
            .ok()
            .map(|inner| inner.writer.into_inner())
    }
}

//! The broadcast bus: Simulcard's one transport primitive.
//!
//! The host gives every client a publish/subscribe channel that delivers
//! each published message to all *other* connected clients; a sender never
//! hears its own echo. That is the whole contract: there is no ordering
//! guarantee across different message kinds and no delivery receipt.
//!
//! [`MessageBus`] is the seam; [`ChannelBus`] is an in-process
//! implementation over `tokio::sync::broadcast` used by tests and demos.
//! It carries encoded bytes (via [`JsonCodec`], the same format the real
//! socket carries) and tags each frame with a [`ClientId`] so a client's
//! own frames are filtered out on receive, exactly like the host socket
//! behaves.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use simulcard_protocol::{Codec, JsonCodec, SessionMessage};
use tokio::sync::broadcast;

use crate::HostError;

/// Buffered frames per receiver before a slow client starts lagging.
const DEFAULT_CAPACITY: usize = 64;

// ---------------------------------------------------------------------------
// ClientId
// ---------------------------------------------------------------------------

/// Opaque identifier for one connected client on the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientId(u64);

impl ClientId {
    /// Creates a `ClientId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "client-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// MessageBus
// ---------------------------------------------------------------------------

/// The transport seam the session engine publishes and receives through.
///
/// `broadcast` is synchronous and must not block: the engine applies its
/// own mutation locally and never waits for the frame to come back.
/// `recv` is the inbound side, awaited by whatever event loop the
/// embedding host runs.
pub trait MessageBus: Send + Sync + 'static {
    /// The error type for bus operations.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Publishes a message to every other connected client.
    fn broadcast(&self, msg: &SessionMessage) -> Result<(), Self::Error>;

    /// Waits for the next message from another client.
    ///
    /// Returns `Ok(None)` when the channel is closed for good.
    async fn recv(&mut self) -> Result<Option<SessionMessage>, Self::Error>;
}

// ---------------------------------------------------------------------------
// BusHub / ChannelBus
// ---------------------------------------------------------------------------

/// A frame on the in-memory bus: encoded message bytes plus who
/// published them.
#[derive(Debug, Clone)]
struct Frame {
    origin: ClientId,
    bytes: Vec<u8>,
}

/// The shared end of the in-memory bus. Cheap to clone; one per world.
///
/// Call [`connect`](Self::connect) once per simulated client to get that
/// client's [`ChannelBus`] endpoint.
#[derive(Clone)]
pub struct BusHub {
    tx: broadcast::Sender<Frame>,
    next_id: Arc<AtomicU64>,
}

impl BusHub {
    /// Creates a new hub with the default buffer capacity.
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(DEFAULT_CAPACITY);
        Self {
            tx,
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Connects a new client endpoint to this hub.
    pub fn connect(&self) -> ChannelBus {
        let origin =
            ClientId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        tracing::debug!(%origin, "client connected to bus");
        ChannelBus {
            origin,
            codec: JsonCodec,
            tx: self.tx.clone(),
            rx: self.tx.subscribe(),
        }
    }
}

impl Default for BusHub {
    fn default() -> Self {
        Self::new()
    }
}

/// One client's endpoint on the in-memory bus.
pub struct ChannelBus {
    origin: ClientId,
    codec: JsonCodec,
    tx: broadcast::Sender<Frame>,
    rx: broadcast::Receiver<Frame>,
}

impl ChannelBus {
    /// This endpoint's client id.
    pub fn origin(&self) -> ClientId {
        self.origin
    }
}

impl MessageBus for ChannelBus {
    type Error = HostError;

    fn broadcast(&self, msg: &SessionMessage) -> Result<(), HostError> {
        let bytes = self.codec.encode(msg)?;
        self.tx
            .send(Frame {
                origin: self.origin,
                bytes,
            })
            .map(|_| ())
            .map_err(|_| HostError::ChannelClosed)
    }

    async fn recv(&mut self) -> Result<Option<SessionMessage>, HostError> {
        loop {
            match self.rx.recv().await {
                // The host socket never echoes a client's own frames.
                Ok(frame) if frame.origin == self.origin => continue,
                Ok(frame) => {
                    match self.codec.decode::<SessionMessage>(&frame.bytes)
                    {
                        Ok(msg) => return Ok(Some(msg)),
                        Err(e) => {
                            // Another module version (or stray traffic on
                            // the channel) sent something we can't read;
                            // skip it rather than kill the pump.
                            tracing::warn!(
                                origin = %self.origin,
                                error = %e,
                                "dropping undecodable frame"
                            );
                            continue;
                        }
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(
                        origin = %self.origin,
                        skipped,
                        "bus receiver lagged, frames dropped"
                    );
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => {
                    return Ok(None);
                }
            }
        }
    }
}

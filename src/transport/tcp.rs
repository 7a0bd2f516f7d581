//! TCP transport
//!
//! Responsibilities:
//! - Accept TCP connections and register one `Client` per connection
//! - Run each session's read loop: decode frames in arrival order and dispatch
//!   them one at a time, so a connection's commands are handled in send order
//! - Run each session's writer task, which drains its bounded outbound queue
//! - Remove the session from the broker exactly once when its read loop ends
//!
//! Accept errors are logged and the loop retries after a short pause. Only a
//! failure to bind is reported to the caller.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::{debug, error, info, warn};

use crate::broker::{AuthGate, SharedBroker, lock};
use crate::client::{Client, SessionId};
use crate::config::Settings;
use crate::transport::codec::JsonLinesCodec;
use crate::transport::message::{ClientMessage, ServerMessage};
use crate::utils::{BrokerError, FrameError};

/// Pause after a failed `accept` so a persistent error (EMFILE) cannot spin.
pub const ACCEPT_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Per-connection limits and the auth policy, shared by every session.
#[derive(Debug, Clone)]
pub struct ConnectionOptions {
    pub gate: AuthGate,
    pub max_connections: usize,
    pub outbound_queue_capacity: usize,
    pub max_frame_length: usize,
    pub write_timeout: Duration,
}

impl ConnectionOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            gate: AuthGate::from_settings(&settings.auth),
            max_connections: settings.broker.max_connections,
            outbound_queue_capacity: settings.broker.outbound_queue_capacity.max(1),
            max_frame_length: settings.broker.max_frame_length,
            write_timeout: Duration::from_millis(settings.broker.write_timeout_ms),
        }
    }
}

/// Bind the configured address and serve until the listener task is dropped.
pub async fn start_tcp_server(settings: &Settings, broker: SharedBroker) -> Result<(), BrokerError> {
    let addr = settings.listen_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|source| BrokerError::Bind {
            addr: addr.clone(),
            source,
        })?;

    let options = ConnectionOptions::from_settings(settings);
    info!(
        auth = options.gate.is_enabled(),
        "LiteMsg server listening on {}",
        listener.local_addr()?
    );

    serve(listener, broker, options).await;
    Ok(())
}

/// Accept loop over an already bound listener.
pub async fn serve(listener: TcpListener, broker: SharedBroker, options: ConnectionOptions) {
    let options = Arc::new(options);

    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                error!("Error accepting connection: {e}");
                tokio::time::sleep(ACCEPT_RETRY_DELAY).await;
                continue;
            }
        };

        if let Err(e) = accept_connection(stream, peer, &broker, &options) {
            warn!(peer = %peer, "Rejected connection: {e}");
        }
    }
}

/// Register a session for a freshly accepted stream and start its tasks.
///
/// Never awaits, so a slow client cannot hold up the accept loop.
fn accept_connection(
    stream: TcpStream,
    peer: SocketAddr,
    broker: &SharedBroker,
    options: &Arc<ConnectionOptions>,
) -> Result<(), BrokerError> {
    let (read_half, write_half) = stream.into_split();
    let (tx, rx) = mpsc::channel::<ServerMessage>(options.outbound_queue_capacity);
    let client = Client::from_peer(peer, tx);
    let client_id = client.id.clone();

    {
        let mut broker = lock(broker);
        if broker.client_count() >= options.max_connections {
            return Err(BrokerError::ConnectionLimit(options.max_connections));
        }
        broker.register_client(client)?;
    }

    info!(client = %client_id, "Client connected");

    tokio::spawn(writer_loop(
        client_id.clone(),
        write_half,
        rx,
        options.write_timeout,
    ));
    tokio::spawn(handle_connection(
        client_id,
        read_half,
        broker.clone(),
        options.clone(),
    ));
    Ok(())
}

/// Session read loop. Runs until end-of-stream or an I/O error, then
/// deregisters the session.
async fn handle_connection(
    client_id: SessionId,
    read_half: OwnedReadHalf,
    broker: SharedBroker,
    options: Arc<ConnectionOptions>,
) {
    let mut frames = FramedRead::new(
        read_half,
        JsonLinesCodec::<ClientMessage>::new(options.max_frame_length),
    );

    while let Some(next) = frames.next().await {
        match next {
            Ok(Ok(message)) => dispatch(&broker, &options.gate, &client_id, message),
            Ok(Err(e)) => {
                warn!(client = %client_id, "Invalid client message: {e}");
            }
            Err(e) => {
                debug!(client = %client_id, "Read error: {e}");
                break;
            }
        }
    }

    // Dropping the registry entry drops the queue sender, which ends the
    // writer task and closes the write half.
    lock(&broker).remove_client(&client_id);
    info!(client = %client_id, "Client disconnected");
}

/// Handle one decoded frame on behalf of `client_id`.
pub fn dispatch(broker: &SharedBroker, gate: &AuthGate, client_id: &str, message: ClientMessage) {
    match message {
        ClientMessage::Auth { payload } => {
            let outcome = gate.authenticate(&payload);
            let mut broker = lock(broker);
            if outcome.is_success() {
                broker.mark_authenticated(client_id);
                info!(client = %client_id, "Client authenticated");
            } else {
                warn!(client = %client_id, "Authentication failed");
            }
            broker.send_to(client_id, ServerMessage::auth_ack(outcome.is_success()));
        }
        ClientMessage::Subscribe { topic } => {
            let mut broker = lock(broker);
            if !gate.permits(broker.is_authenticated(client_id)) {
                debug!(client = %client_id, %topic, "Dropped subscribe from unauthenticated client");
                return;
            }
            if broker.subscribe(client_id, &topic) {
                debug!(client = %client_id, %topic, "Subscribed");
            }
        }
        ClientMessage::Publish { topic, payload } => {
            let broker = lock(broker);
            if !gate.permits(broker.is_authenticated(client_id)) {
                debug!(client = %client_id, %topic, "Dropped publish from unauthenticated client");
                return;
            }
            broker.publish(client_id, &topic, &payload);
        }
        ClientMessage::Unknown => {
            debug!(client = %client_id, "Ignoring message of unknown type");
        }
    }
}

/// Drain the outbound queue onto the socket until every sender is gone or a
/// write fails or times out.
async fn writer_loop(
    client_id: SessionId,
    write_half: OwnedWriteHalf,
    mut rx: mpsc::Receiver<ServerMessage>,
    write_timeout: Duration,
) {
    let mut sink = FramedWrite::new(write_half, JsonLinesCodec::<ServerMessage>::default());

    while let Some(message) = rx.recv().await {
        match tokio::time::timeout(write_timeout, sink.send(message)).await {
            Ok(Ok(())) => {}
            Ok(Err(FrameError::Encode(e))) => {
                warn!(client = %client_id, "Failed to encode frame: {e}");
            }
            Ok(Err(e)) => {
                warn!(client = %client_id, "Failed to send message: {e}");
                break;
            }
            Err(_) => {
                warn!(client = %client_id, "Write timed out after {write_timeout:?}");
                break;
            }
        }
    }

    debug!(client = %client_id, "Send loop closed");
}

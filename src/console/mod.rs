//! Interactive console client.
//!
//! Reads commands from stdin, turns them into frames, and prints relayed
//! publishes as `[Topic: <topic>] <payload>`. Supported input:
//!
//! ```text
//! subscribe <topic>
//! publish <topic> <message>
//! ```

use std::io::Write;

use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::TcpStream;
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::{debug, warn};

use crate::transport::codec::JsonLinesCodec;
use crate::transport::message::{ClientMessage, ServerMessage};
use crate::utils::{BrokerError, FrameError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Subscribe { topic: String },
    Publish { topic: String, message: String },
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("Unknown command '{0}'. Use 'subscribe <topic>' or 'publish <topic> <message>'.")]
    Unknown(String),
    #[error("Invalid input. Use 'subscribe <topic>' or 'publish <topic> <message>'.")]
    Invalid,
}

impl Command {
    pub fn into_message(self) -> ClientMessage {
        match self {
            Command::Subscribe { topic } => ClientMessage::Subscribe { topic },
            Command::Publish { topic, message } => ClientMessage::Publish {
                topic,
                payload: message,
            },
        }
    }
}

/// Parse one input line. The publish message keeps its inner spaces.
pub fn parse_command(line: &str) -> Result<Command, CommandError> {
    let (cmd, rest) = line
        .trim()
        .split_once(' ')
        .ok_or(CommandError::Invalid)?;
    let rest = rest.trim_start();

    match cmd {
        "subscribe" if !rest.is_empty() => Ok(Command::Subscribe {
            topic: rest.trim_end().to_string(),
        }),
        "publish" => {
            let (topic, message) = rest.split_once(' ').ok_or(CommandError::Invalid)?;
            Ok(Command::Publish {
                topic: topic.to_string(),
                message: message.to_string(),
            })
        }
        "subscribe" => Err(CommandError::Invalid),
        other => Err(CommandError::Unknown(other.to_string())),
    }
}

/// How a frame from the server is shown to the user.
pub fn render(message: &ServerMessage) -> String {
    match message {
        ServerMessage::Publish { topic, payload } => format!("[Topic: {topic}] {payload}"),
        ServerMessage::Auth { payload } => format!("[Auth] {payload}"),
    }
}

/// Connect to `addr` and run the console until stdin or the connection closes.
///
/// When `credentials` is given an `auth` frame is sent before anything else.
pub async fn run(addr: &str, credentials: Option<String>) -> Result<(), BrokerError> {
    let stream = TcpStream::connect(addr).await?;
    let (read_half, write_half) = stream.into_split();
    let mut frames = FramedRead::new(read_half, JsonLinesCodec::<ServerMessage>::default());
    let mut sink = FramedWrite::new(write_half, JsonLinesCodec::<ClientMessage>::default());

    if let Some(payload) = credentials {
        send(&mut sink, ClientMessage::Auth { payload }).await?;
    }

    let mut printer = tokio::spawn(async move {
        while let Some(next) = frames.next().await {
            match next {
                Ok(Ok(message)) => println!("{}", render(&message)),
                Ok(Err(e)) => eprintln!("Error decoding message: {e}"),
                Err(e) => {
                    debug!("Read error: {e}");
                    break;
                }
            }
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        prompt();
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = &mut printer => {
                println!("Connection closed by server.");
                return Ok(());
            }
        };
        let Some(line) = line else { break };

        match parse_command(&line) {
            Ok(command) => {
                match &command {
                    Command::Subscribe { topic } => println!("Subscribing to topic '{topic}'"),
                    Command::Publish { topic, message } => {
                        println!("Publishing message to topic '{topic}': {message}")
                    }
                }
                send(&mut sink, command.into_message()).await?;
            }
            Err(e) => println!("{e}"),
        }
    }

    printer.abort();
    Ok(())
}

fn prompt() {
    print!("> ");
    let _ = std::io::stdout().flush();
}

async fn send(
    sink: &mut FramedWrite<tokio::net::tcp::OwnedWriteHalf, JsonLinesCodec<ClientMessage>>,
    message: ClientMessage,
) -> Result<(), BrokerError> {
    match sink.send(message).await {
        Ok(()) => Ok(()),
        Err(FrameError::Io(e)) => Err(BrokerError::Io(e)),
        Err(e) => {
            warn!("Dropping unencodable frame: {e}");
            Ok(())
        }
    }
}

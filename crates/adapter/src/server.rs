//! Line server for the session host
//!
//! [`serve_lines`] drives one reader/writer pair: inbound lines become host
//! commands, replies and broadcast events are written back one JSON object per
//! line. [`run_server`] accepts TCP clients and serves each of them the same way;
//! the binary also uses [`serve_lines`] over stdin/stdout.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc, oneshot};

use crate::protocol::{
    create_error, extract_seq_best_effort, parse_message, ErrorCode, OutboundMessage,
};
use crate::runtime::SessionHost;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 7878,
        }
    }
}

impl ServerConfig {
    /// Create from `SHAKTRIS_HOST` / `SHAKTRIS_PORT`
    pub fn from_env() -> Self {
        use std::env;

        let host = env::var("SHAKTRIS_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("SHAKTRIS_PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(7878);

        Self { host, port }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Accept TCP clients until the listener fails.
///
/// `ready_tx` receives the bound address (useful with port 0).
pub async fn run_server(
    config: ServerConfig,
    host: Arc<SessionHost>,
    ready_tx: Option<oneshot::Sender<SocketAddr>>,
) -> anyhow::Result<()> {
    let listener = TcpListener::bind(config.bind_addr()).await?;
    let bound = listener.local_addr()?;
    log::info!("listening on {}", bound);
    if let Some(tx) = ready_tx {
        let _ = tx.send(bound);
    }

    let mut client_id_counter = 0usize;
    loop {
        let (socket, addr) = listener.accept().await?;
        client_id_counter += 1;
        let client_id = client_id_counter;
        log::info!("client {} connected from {}", client_id, addr);

        let host = Arc::clone(&host);
        tokio::spawn(async move {
            let (reader, writer) = socket.into_split();
            let reader = tokio::io::BufReader::new(reader);
            if let Err(e) = serve_lines(reader, writer, host).await {
                log::warn!("client {} error: {:#}", client_id, e);
            }
            log::info!("client {} disconnected", client_id);
        });
    }
}

/// Serve one line-oriented connection until the reader reaches EOF
pub async fn serve_lines<R, W>(reader: R, mut writer: W, host: Arc<SessionHost>) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, mut rx) = mpsc::unbounded_channel::<OutboundMessage>();

    // Writer task: replies and events share one ordered stream.
    let write_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let line = match msg.to_line() {
                Ok(line) => line,
                Err(e) => {
                    log::error!("failed to encode outbound message: {}", e);
                    continue;
                }
            };
            if writer.write_all(line.as_bytes()).await.is_err()
                || writer.write_all(b"\n").await.is_err()
                || writer.flush().await.is_err()
            {
                break;
            }
        }
    });

    let mut events = host.subscribe();
    let event_tx = tx.clone();
    let event_task = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => {
                    if event_tx.send(OutboundMessage::Event { event }).is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    log::warn!("event stream lagged, {} events skipped", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await? {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let reply = match parse_message(trimmed) {
            Ok(msg) => host.handle(msg).await,
            Err(e) => {
                log::debug!("bad inbound line: {}", e);
                let seq = extract_seq_best_effort(trimmed).unwrap_or(0);
                OutboundMessage::Reply(create_error(
                    None,
                    seq,
                    ErrorCode::InvalidMessage,
                    &e.to_string(),
                ))
            }
        };
        if tx.send(reply).is_err() {
            break;
        }
    }

    event_task.abort();
    drop(tx);
    let _ = write_task.await;
    Ok(())
}

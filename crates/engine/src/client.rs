//! TCP connection to a battle server
//!
//! Mirrors the server's connection handling: a reader task parses one event
//! per line, a writer task drains a bounded queue of encoded lines.

use std::time::Duration;

use anyhow::{anyhow, Context};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpStream, ToSocketAddrs};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use tetris_battle_core::TimerGuard;
use tetris_battle_protocol::{encode_line, parse_server_line, ClientEvent, ServerEvent};

/// Default outbound queue depth
pub const DEFAULT_OUTBOUND_CAPACITY: usize = 64;

pub struct BattleClient {
    outbound: mpsc::Sender<String>,
    inbound: mpsc::UnboundedReceiver<ServerEvent>,
    writer: Option<JoinHandle<()>>,
    _reader: TimerGuard,
}

impl BattleClient {
    pub async fn connect(addr: impl ToSocketAddrs, capacity: usize) -> anyhow::Result<Self> {
        let socket = TcpStream::connect(addr)
            .await
            .context("failed to connect to battle server")?;
        let peer = socket.peer_addr()?;
        let (reader, mut writer) = socket.into_split();

        let (out_tx, mut out_rx) = mpsc::channel::<String>(capacity.max(1));
        let writer_task = tokio::spawn(async move {
            while let Some(line) = out_rx.recv().await {
                if writer.write_all(line.as_bytes()).await.is_err() {
                    break;
                }
            }
            let _ = writer.shutdown().await;
        });

        let (in_tx, in_rx) = mpsc::unbounded_channel();
        let reader_task = tokio::spawn(async move {
            let mut lines = BufReader::new(reader).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) if line.trim().is_empty() => {}
                    Ok(Some(line)) => match parse_server_line(line.trim()) {
                        Ok(event) => {
                            if in_tx.send(event).is_err() {
                                break;
                            }
                        }
                        Err(e) => tracing::warn!(error = %e, "unparseable server line"),
                    },
                    Ok(None) => break,
                    Err(e) => {
                        tracing::debug!(error = %e, "server connection read failed");
                        break;
                    }
                }
            }
        });

        tracing::debug!(%peer, "connected to battle server");
        Ok(Self {
            outbound: out_tx,
            inbound: in_rx,
            writer: Some(writer_task),
            _reader: TimerGuard::new(move || reader_task.abort()),
        })
    }

    /// Queue an event, waiting for room in the outbound queue
    pub async fn send(&self, event: &ClientEvent) -> anyhow::Result<()> {
        let line = encode_line(event)?;
        self.outbound
            .send(line)
            .await
            .map_err(|_| anyhow!("connection closed"))
    }

    /// Raw line sender, shared with [`crate::SyncChannel`]
    pub fn outbound(&self) -> mpsc::Sender<String> {
        self.outbound.clone()
    }

    /// Next server event; `None` once the server closed the connection
    pub async fn recv(&mut self) -> Option<ServerEvent> {
        self.inbound.recv().await
    }

    pub fn try_recv(&mut self) -> Option<ServerEvent> {
        self.inbound.try_recv().ok()
    }

    /// Wait up to `timeout` for an event matching `pred`, discarding others
    pub async fn recv_until<F>(&mut self, timeout: Duration, mut pred: F) -> anyhow::Result<ServerEvent>
    where
        F: FnMut(&ServerEvent) -> bool,
    {
        tokio::time::timeout(timeout, async {
            while let Some(event) = self.inbound.recv().await {
                if pred(&event) {
                    return Ok(event);
                }
            }
            Err(anyhow!("connection closed"))
        })
        .await
        .map_err(|_| anyhow!("timed out waiting for server event"))?
    }

    /// Flush queued lines and close the write half
    ///
    /// Other clones of the outbound sender keep the writer alive, so the wait
    /// is bounded.
    pub async fn close(mut self) {
        let Some(writer) = self.writer.take() else {
            return;
        };
        drop(std::mem::replace(&mut self.outbound, mpsc::channel(1).0));
        let _ = tokio::time::timeout(Duration::from_secs(1), writer).await;
    }
}

impl Drop for BattleClient {
    fn drop(&mut self) {
        if let Some(writer) = self.writer.take() {
            writer.abort();
        }
    }
}

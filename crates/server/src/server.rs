//! TCP runtime for the battle coordinator
//!
//! Each connection gets a reader task that parses lines and forwards them to
//! the coordinator queue, and a writer task that drains an unbounded channel
//! of encoded lines into the socket. One coordinator task owns every room and
//! also receives the room timers' ticks.

use std::collections::HashMap;
use std::net::SocketAddr;

use anyhow::{anyhow, Context};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};

use tetris_battle_protocol::{
    encode_line, parse_client_line, ClientEvent, ParsedMessage, RejectCode, ServerEvent,
};

use crate::battle::{BattleCoordinator, Outgoing};
use crate::config::ServerConfig;
use crate::room::ConnId;
use crate::scheduler::{Scheduler, TimerTick, TokioScheduler};

/// Line writer of one connection
pub type LineSender = mpsc::UnboundedSender<String>;

/// Coordinator queue item
#[derive(Debug)]
pub enum Inbound {
    Connected { conn: ConnId, writer: LineSender },
    Event { conn: ConnId, event: ClientEvent },
    Disconnected { conn: ConnId },
}

/// Bind and serve until the listener fails
///
/// `ready_tx` receives the bound address, which is how callers binding port 0
/// learn where to connect.
pub async fn run_server(
    config: ServerConfig,
    ready_tx: Option<oneshot::Sender<SocketAddr>>,
) -> anyhow::Result<()> {
    let addr = config.socket_addr()?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    let bound = listener.local_addr()?;
    tracing::info!(%bound, min_players = config.min_players, "battle server listening");
    if let Some(tx) = ready_tx {
        let _ = tx.send(bound);
    }
    serve(listener, config).await
}

/// Serve battle rooms on an already bound listener
pub async fn serve(listener: TcpListener, config: ServerConfig) -> anyhow::Result<()> {
    let (inbound_tx, inbound_rx) = mpsc::channel::<Inbound>(config.max_pending.max(1));
    let (timer_tx, timer_rx) = mpsc::unbounded_channel::<TimerTick>();
    let coordinator = BattleCoordinator::new(config, TokioScheduler::new(timer_tx));
    tokio::spawn(coordinate(coordinator, inbound_rx, timer_rx));

    let mut next_conn: ConnId = 0;
    loop {
        let (socket, peer) = listener.accept().await?;
        next_conn += 1;
        let conn = next_conn;
        tracing::debug!(conn_id = conn, %peer, "client connected");

        let inbound = inbound_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = handle_connection(socket, conn, inbound).await {
                tracing::warn!(conn_id = conn, error = %e, "connection error");
            }
            tracing::debug!(conn_id = conn, "client disconnected");
        });
    }
}

/// Coordinator task: the only owner of room state
pub async fn coordinate<S: Scheduler>(
    mut coordinator: BattleCoordinator<S>,
    mut inbound: mpsc::Receiver<Inbound>,
    mut timers: mpsc::UnboundedReceiver<TimerTick>,
) {
    let mut writers: HashMap<ConnId, LineSender> = HashMap::new();
    loop {
        let outgoing = tokio::select! {
            msg = inbound.recv() => match msg {
                Some(Inbound::Connected { conn, writer }) => {
                    writers.insert(conn, writer);
                    continue;
                }
                Some(Inbound::Event { conn, event }) => coordinator.handle_event(conn, event),
                Some(Inbound::Disconnected { conn }) => {
                    writers.remove(&conn);
                    coordinator.handle_disconnect(conn)
                }
                None => break,
            },
            Some(tick) = timers.recv() => coordinator.handle_timer(tick),
        };
        deliver(&writers, outgoing);
    }
    tracing::debug!("coordinator stopped");
}

fn deliver(writers: &HashMap<ConnId, LineSender>, outgoing: Vec<Outgoing>) {
    for Outgoing { conn, event } in outgoing {
        let Some(writer) = writers.get(&conn) else {
            continue;
        };
        match encode_line(&event) {
            Ok(line) => {
                let _ = writer.send(line);
            }
            Err(e) => tracing::error!(conn_id = conn, error = %e, "failed to encode event"),
        }
    }
}

fn reject_invalid(writer: &LineSender, message: String) {
    if let Ok(line) = encode_line(&ServerEvent::rejected(RejectCode::InvalidMessage, message)) {
        let _ = writer.send(line);
    }
}

async fn handle_connection(
    socket: TcpStream,
    conn: ConnId,
    inbound: mpsc::Sender<Inbound>,
) -> anyhow::Result<()> {
    let (reader, mut writer) = socket.into_split();
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();

    let write_task = tokio::spawn(async move {
        while let Some(line) = rx.recv().await {
            if writer.write_all(line.as_bytes()).await.is_err() {
                break;
            }
        }
    });

    inbound
        .send(Inbound::Connected {
            conn,
            writer: tx.clone(),
        })
        .await
        .map_err(|_| anyhow!("coordinator stopped"))?;

    let result = read_lines(reader, conn, &inbound, &tx).await;

    let _ = inbound.send(Inbound::Disconnected { conn }).await;
    // The coordinator drops its clone on Disconnected, which ends the writer
    drop(tx);
    let _ = write_task.await;
    result
}

async fn read_lines(
    reader: tokio::net::tcp::OwnedReadHalf,
    conn: ConnId,
    inbound: &mpsc::Sender<Inbound>,
    tx: &LineSender,
) -> anyhow::Result<()> {
    let mut lines = BufReader::new(reader).lines();
    while let Some(line) = lines.next_line().await? {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let event = match parse_client_line(trimmed) {
            Ok(ParsedMessage::Event(event)) => event,
            Ok(ParsedMessage::Unknown { msg_type }) => {
                tracing::debug!(conn_id = conn, msg_type = %msg_type, "unknown message type");
                reject_invalid(tx, format!("unknown message type: {msg_type}"));
                continue;
            }
            Err(e) => {
                tracing::debug!(conn_id = conn, error = %e, "invalid message");
                reject_invalid(tx, format!("invalid message: {e}"));
                continue;
            }
        };

        // Snapshots are superseded by the next one, so they are the one
        // event that may be dropped under load.
        if matches!(event, ClientEvent::UpdateGameState { .. }) {
            match inbound.try_send(Inbound::Event { conn, event }) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    tracing::trace!(conn_id = conn, "coordinator busy, snapshot dropped");
                }
                Err(TrySendError::Closed(_)) => return Err(anyhow!("coordinator stopped")),
            }
        } else {
            inbound
                .send(Inbound::Event { conn, event })
                .await
                .map_err(|_| anyhow!("coordinator stopped"))?;
        }
    }
    Ok(())
}

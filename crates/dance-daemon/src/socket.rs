use crate::BroadcastMessage;
use dance_core::protocol::{
    Broadcast, Command, DisplaySnapshot, Message, MAX_FRAME_LEN, PROTOCOL_VERSION,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc, watch};
use tracing::{error, info, warn};

pub fn start_server(
    bind_address: String,
    port: u16,
    state_rx: watch::Receiver<DisplaySnapshot>,
    command_tx: mpsc::Sender<Command>,
    broadcast_tx: broadcast::Sender<BroadcastMessage>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let addr = format!("{}:{}", bind_address, port);

        let listener = match TcpListener::bind(&addr).await {
            Ok(l) => l,
            Err(e) => {
                error!("Failed to bind TCP socket {}: {}", addr, e);
                return;
            }
        };

        info!("Display socket listening at {}", addr);

        let mut client_id = 0usize;

        loop {
            match listener.accept().await {
                Ok((stream, peer)) => {
                    client_id += 1;
                    let id = client_id;
                    info!("Client {} connected from {}", id, peer);

                    let state_rx = state_rx.clone();
                    let command_tx = command_tx.clone();
                    let bcast_rx = broadcast_tx.subscribe();

                    tokio::spawn(async move {
                        handle_client(stream, id, state_rx, command_tx, bcast_rx).await;
                        info!("Client {} disconnected", id);
                    });
                }
                Err(e) => {
                    error!("Failed to accept connection: {}", e);
                }
            }
        }
    })
}

async fn handle_client(
    stream: TcpStream,
    client_id: usize,
    mut state_rx: watch::Receiver<DisplaySnapshot>,
    command_tx: mpsc::Sender<Command>,
    mut broadcast_rx: broadcast::Receiver<BroadcastMessage>,
) {
    let (mut read_half, mut write_half) = stream.into_split();
    let mut tmp = [0u8; 4096];
    let mut read_buf: Vec<u8> = Vec::new();

    // A new client gets the current frame straight away
    let hello = encode_hello(&state_rx.borrow_and_update());
    if let Ok(encoded) = hello {
        if write_half.write_all(&encoded).await.is_err() {
            return;
        }
    }

    loop {
        tokio::select! {
            result = read_half.read(&mut tmp) => {
                match result {
                    Ok(0) => {
                        info!("Client {} closed connection", client_id);
                        break;
                    }
                    Ok(n) => {
                        read_buf.extend_from_slice(&tmp[..n]);

                        loop {
                            let Some(len) = Message::frame_len(&read_buf) else { break };
                            if len > MAX_FRAME_LEN {
                                warn!("Client {} sent a {} byte frame, dropping", client_id, len);
                                return;
                            }
                            if read_buf.len() < 4 + len { break; }
                            match Message::decode(&read_buf) {
                                Ok((Message::Command(Command::GetState), consumed)) => {
                                    read_buf.drain(..consumed);
                                    let encoded = encode_state(&state_rx.borrow());
                                    if let Ok(encoded) = encoded {
                                        if write_half.write_all(&encoded).await.is_err() {
                                            return;
                                        }
                                    }
                                }
                                Ok((Message::Command(cmd), consumed)) => {
                                    read_buf.drain(..consumed);
                                    info!("Client {} sent command: {:?}", client_id, cmd);

                                    if command_tx.send(cmd).await.is_err() {
                                        warn!("Command channel closed");
                                        return;
                                    }
                                }
                                Ok((_, consumed)) => {
                                    read_buf.drain(..consumed);
                                }
                                Err(e) => {
                                    warn!("Client {} sent a malformed frame: {}", client_id, e);
                                    read_buf.drain(..4 + len);
                                }
                            }
                        }
                    }
                    Err(e) => {
                        error!("Read error from client {}: {}", client_id, e);
                        break;
                    }
                }
            }

            changed = state_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let encoded = encode_state(&state_rx.borrow_and_update());
                if let Ok(encoded) = encoded {
                    if write_half.write_all(&encoded).await.is_err() {
                        break;
                    }
                }
            }

            msg = broadcast_rx.recv() => {
                let broadcast = match msg {
                    Ok(BroadcastMessage::Log(message)) => Broadcast::Log { message },
                    Ok(BroadcastMessage::Error(message)) => Broadcast::Error { message },
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!("Client {} missed {} broadcast messages", client_id, n);
                        continue;
                    }
                    Err(_) => break,
                };
                if let Ok(encoded) = Message::Broadcast(broadcast).encode() {
                    let _ = write_half.write_all(&encoded).await;
                }
            }
        }
    }
}

fn encode_hello(snapshot: &DisplaySnapshot) -> anyhow::Result<Vec<u8>> {
    Message::Broadcast(Broadcast::Hello {
        protocol_version: PROTOCOL_VERSION,
        snapshot: snapshot.clone(),
    })
    .encode()
}

fn encode_state(snapshot: &DisplaySnapshot) -> anyhow::Result<Vec<u8>> {
    Message::Broadcast(Broadcast::State {
        data: snapshot.clone(),
    })
    .encode()
}

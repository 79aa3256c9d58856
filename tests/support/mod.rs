//! In-process peers for the end-to-end publisher tests: a minimal MQTT 3.1.1
//! broker and a WebSocket collector that numbers its replies.

#![allow(dead_code)]

use std::net::SocketAddr;

use futures_util::{SinkExt, StreamExt};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
    sync::mpsc,
    task::JoinHandle,
};
use tokio_tungstenite::tungstenite::Message;

/// What the broker saw in the CONNECT packet.
#[derive(Debug, Clone)]
pub struct ConnectInfo {
    pub client_id: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

/// What the broker saw in the PUBLISH packet.
#[derive(Debug, Clone)]
pub struct PublishInfo {
    pub qos: u8,
    pub topic: String,
    pub payload: String,
}

/// One complete broker session.
#[derive(Debug, Clone)]
pub struct Session {
    pub connect: ConnectInfo,
    pub publish: PublishInfo,
    pub disconnected: bool,
}

async fn read_packet(stream: &mut TcpStream) -> std::io::Result<(u8, Vec<u8>)> {
    let header = stream.read_u8().await?;
    let mut len = 0usize;
    let mut shift = 0;
    loop {
        let byte = stream.read_u8().await?;
        len |= ((byte & 0x7F) as usize) << shift;
        if byte & 0x80 == 0 {
            break;
        }
        shift += 7;
    }
    let mut body = vec![0u8; len];
    stream.read_exact(&mut body).await?;
    Ok((header, body))
}

fn read_str(buf: &[u8], pos: &mut usize) -> String {
    let len = u16::from_be_bytes([buf[*pos], buf[*pos + 1]]) as usize;
    *pos += 2;
    let s = String::from_utf8_lossy(&buf[*pos..*pos + len]).into_owned();
    *pos += len;
    s
}

fn parse_connect(body: &[u8]) -> ConnectInfo {
    let mut pos = 0;
    let _protocol = read_str(body, &mut pos);
    let _level = body[pos];
    let flags = body[pos + 1];
    pos += 4; // level, flags, keep alive
    let client_id = read_str(body, &mut pos);
    if flags & 0x04 != 0 {
        let _will_topic = read_str(body, &mut pos);
        let _will_message = read_str(body, &mut pos);
    }
    let username = (flags & 0x80 != 0).then(|| read_str(body, &mut pos));
    let password = (flags & 0x40 != 0).then(|| read_str(body, &mut pos));
    ConnectInfo {
        client_id,
        username,
        password,
    }
}

fn parse_publish(header: u8, body: &[u8]) -> (PublishInfo, Option<[u8; 2]>) {
    let qos = (header >> 1) & 0x03;
    let mut pos = 0;
    let topic = read_str(body, &mut pos);
    let pkid = if qos > 0 {
        let id = [body[pos], body[pos + 1]];
        pos += 2;
        Some(id)
    } else {
        None
    };
    let payload = String::from_utf8_lossy(&body[pos..]).into_owned();
    (PublishInfo { qos, topic, payload }, pkid)
}

/// Serves one broker session per accepted connection and reports each one.
async fn serve_session(mut stream: TcpStream) -> std::io::Result<Session> {
    let (header, body) = read_packet(&mut stream).await?;
    assert_eq!(header & 0xF0, 0x10, "expected CONNECT");
    let connect = parse_connect(&body);
    stream.write_all(&[0x20, 0x02, 0x00, 0x00]).await?;

    let publish = loop {
        let (header, body) = read_packet(&mut stream).await?;
        match header & 0xF0 {
            0x30 => {
                let (publish, pkid) = parse_publish(header, &body);
                match (publish.qos, pkid) {
                    (1, Some(id)) => stream.write_all(&[0x40, 0x02, id[0], id[1]]).await?,
                    (2, Some(id)) => {
                        stream.write_all(&[0x50, 0x02, id[0], id[1]]).await?;
                        let (rel, _) = read_packet(&mut stream).await?;
                        assert_eq!(rel & 0xF0, 0x60, "expected PUBREL");
                        stream.write_all(&[0x70, 0x02, id[0], id[1]]).await?;
                    }
                    _ => {}
                }
                break publish;
            }
            0xC0 => stream.write_all(&[0xD0, 0x00]).await?,
            other => panic!("unexpected packet type {:#x}", other),
        }
    };

    let disconnected = matches!(read_packet(&mut stream).await, Ok((0xE0, _)));

    Ok(Session {
        connect,
        publish,
        disconnected,
    })
}

/// Minimal broker on an ephemeral port. Every accepted session is sent on
/// the returned channel.
pub async fn spawn_broker() -> (SocketAddr, mpsc::UnboundedReceiver<Session>, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = mpsc::unbounded_channel();
    let handle = tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            if let Ok(session) = serve_session(stream).await {
                if tx.send(session).is_err() {
                    break;
                }
            }
        }
    });
    (addr, rx, handle)
}

/// Address nothing listens on.
pub async fn unused_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// WebSocket collector that records every text frame and answers frame `n`
/// with `ack-n`. With `close_after = Some(n)` it closes the socket after `n`
/// frames instead of answering the last one.
pub async fn spawn_collector(
    close_after: Option<usize>,
) -> (SocketAddr, mpsc::UnboundedReceiver<String>, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = mpsc::unbounded_channel();
    let handle = tokio::spawn(async move {
        let Ok((stream, _)) = listener.accept().await else {
            return;
        };
        let Ok(mut ws) = tokio_tungstenite::accept_async(stream).await else {
            return;
        };
        let mut seen = 0;
        while let Some(Ok(msg)) = ws.next().await {
            if let Message::Text(text) = msg {
                seen += 1;
                let _ = tx.send(text);
                if close_after == Some(seen) {
                    let _ = ws.close(None).await;
                    break;
                }
                if ws.send(Message::Text(format!("ack-{}", seen))).await.is_err() {
                    break;
                }
            }
        }
    });
    (addr, rx, handle)
}

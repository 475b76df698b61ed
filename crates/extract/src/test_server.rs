//! Scripted one-request-per-connection HTTP server for fetch tests.

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

pub enum Reply {
    /// Close the connection after reading the request.
    Hangup,
    Respond(&'static str, &'static [u8]),
}

/// Serves `replies` in order, one connection each, and reports every request
/// head (lowercased) on the returned channel.
pub async fn serve(replies: Vec<Reply>) -> (String, mpsc::UnboundedReceiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        for reply in replies {
            let (mut stream, _) = listener.accept().await.unwrap();
            let head = read_head(&mut stream).await;
            tx.send(head).unwrap();
            match reply {
                Reply::Hangup => drop(stream),
                Reply::Respond(status, body) => {
                    let head = format!(
                        "HTTP/1.1 {status}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                        body.len()
                    );
                    stream.write_all(head.as_bytes()).await.unwrap();
                    stream.write_all(body).await.unwrap();
                    stream.flush().await.unwrap();
                }
            }
        }
    });

    (format!("http://{addr}"), rx)
}

pub fn received(rx: &mut mpsc::UnboundedReceiver<String>) -> Vec<String> {
    let mut heads = Vec::new();
    while let Ok(head) = rx.try_recv() {
        heads.push(head);
    }
    heads
}

async fn read_head(stream: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = stream.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    String::from_utf8_lossy(&buf).to_lowercase()
}

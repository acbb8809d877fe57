//! In-memory stand-in for a browser socket.
//!
//! The server side gets a `Sink<Message>` and a `Stream<Item = Result<Message, io::Error>>`,
//! the same shape as a split axum websocket. The test holds the other ends.

#![allow(dead_code)]

use std::io;
use std::time::Duration;

use axum::extract::ws::Message;
use futures::channel::mpsc;
use futures::StreamExt;

pub type ServerSink = mpsc::UnboundedSender<Message>;
pub type ServerStream = mpsc::UnboundedReceiver<Result<Message, io::Error>>;

pub struct Browser {
    pub from_server: mpsc::UnboundedReceiver<Message>,
    pub to_server: mpsc::UnboundedSender<Result<Message, io::Error>>,
}

pub fn pipe() -> (ServerSink, ServerStream, Browser) {
    let (server_tx, browser_rx) = mpsc::unbounded();
    let (browser_tx, server_rx) = mpsc::unbounded();
    (
        server_tx,
        server_rx,
        Browser {
            from_server: browser_rx,
            to_server: browser_tx,
        },
    )
}

impl Browser {
    pub fn send_text(&self, text: impl Into<String>) {
        self.to_server
            .unbounded_send(Ok(Message::Text(text.into().into())))
            .expect("server end dropped");
    }

    pub fn send_json(&self, value: serde_json::Value) {
        self.send_text(value.to_string());
    }

    /// Next text frame from the server, failing the test after a second.
    pub async fn recv_text(&mut self) -> String {
        let next = tokio::time::timeout(Duration::from_secs(1), self.from_server.next())
            .await
            .expect("timed out waiting for a frame");
        match next {
            Some(Message::Text(text)) => text.as_str().to_string(),
            other => panic!("expected a text frame, got {other:?}"),
        }
    }

    pub async fn recv_json(&mut self) -> serde_json::Value {
        let text = self.recv_text().await;
        serde_json::from_str(&text).expect("server sent invalid json")
    }

    /// True if nothing is waiting to be read right now.
    pub fn nothing_queued(&mut self) -> bool {
        self.from_server.try_next().is_err()
    }

    /// Hang up, as if the tab closed.
    pub fn close(&self) {
        self.to_server.close_channel();
    }
}

/// Yield until `ready` holds, failing the test if it never does.
pub async fn wait_for(ready: impl Fn() -> bool) {
    for _ in 0..1000 {
        if ready() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    panic!("condition never became true");
}

/// Let spawned tasks run for a moment.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}

//! HTTP surface: the page shell, one websocket route per channel, and `/health`.

use std::sync::Arc;

use axum::{
    extract::{ws::WebSocketUpgrade, State},
    response::{Html, IntoResponse},
    routing::get,
    Json, Router,
};
use tracing::info;

use crate::error::ChannelError;
use crate::multiplexer::{HealthSnapshot, Webview};
use crate::protocol::{CAPTURE_ENDPOINT, EVENT_ENDPOINT, PLAYBACK_ENDPOINT, VIEW_ENDPOINT};

pub fn router(webview: Arc<Webview>) -> Router {
    Router::new()
        .route("/", get(serve_page))
        .route("/health", get(health))
        .route(&format!("/{VIEW_ENDPOINT}"), get(view_ws))
        .route(&format!("/{PLAYBACK_ENDPOINT}"), get(playback_ws))
        .route(&format!("/{CAPTURE_ENDPOINT}"), get(capture_ws))
        .route(&format!("/{EVENT_ENDPOINT}"), get(events_ws))
        .with_state(webview)
}

async fn serve_page(State(webview): State<Arc<Webview>>) -> Html<String> {
    Html(render_page(&webview.config().server.title))
}

async fn health(State(webview): State<Arc<Webview>>) -> Json<HealthSnapshot> {
    Json(webview.health())
}

async fn view_ws(State(webview): State<Arc<Webview>>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| async move {
        let result = webview.view().serve(socket).await;
        log_disconnect(&webview, VIEW_ENDPOINT, result);
    })
}

async fn playback_ws(
    State(webview): State<Arc<Webview>>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| async move {
        let result = webview.playback().serve(socket).await;
        log_disconnect(&webview, PLAYBACK_ENDPOINT, result);
    })
}

async fn capture_ws(
    State(webview): State<Arc<Webview>>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| async move {
        let result = webview.capture().serve(socket).await;
        log_disconnect(&webview, CAPTURE_ENDPOINT, result);
    })
}

async fn events_ws(
    State(webview): State<Arc<Webview>>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| async move {
        let result = webview.events().serve(socket).await;
        log_disconnect(&webview, EVENT_ENDPOINT, result);
    })
}

// Peer errors end one connection and are only interesting when debugging.
fn log_disconnect(webview: &Webview, endpoint: &str, result: Result<(), ChannelError>) {
    if let Err(e) = result {
        if webview.flags().debug() {
            info!(endpoint, error = %e, "Browser disconnected from socket");
        }
    }
}

/// Fill the page template with an escaped title.
pub fn render_page(title: &str) -> String {
    PAGE_HTML.replace("{{title}}", &escape_html(title))
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    escaped
}

const PAGE_HTML: &str = r##"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <title>{{title}}</title>
    <style>
        html, body, #main_update_content {
            margin: 0;
            padding: 0;
            width: 100%;
            height: 100%;
        }
    </style>
</head>
<body>
    <div id="main_update_content"></div>
    <script>
    (() => {
        const base = (location.protocol === 'https:' ? 'wss://' : 'ws://') + location.host + '/';
        const RECONNECT_MS = 5000;

        function channel(path, onMessage) {
            const state = { socket: null };
            const connect = () => {
                const socket = new WebSocket(base + path);
                socket.onopen = () => console.log(`webview: ${path} connected`);
                socket.onmessage = (event) => onMessage(event.data, socket);
                socket.onclose = () => {
                    console.log(`webview: ${path} closed, retrying`);
                    setTimeout(connect, RECONNECT_MS);
                };
                socket.onerror = (error) => console.error(`webview: ${path} error`, error);
                state.socket = socket;
            };
            connect();
            return state;
        }

        // View
        channel('ws-html-updater', (data) => {
            document.getElementById('main_update_content').innerHTML = data;
        });

        // Playback: one clip at a time, acknowledged when it ends or fails.
        const queue = [];
        let playing = false;
        const playClip = (clip) => new Promise((resolve, reject) => {
            const audio = new Audio(clip.data);
            audio.onended = resolve;
            audio.onerror = reject;
            const start = () => audio.play().catch(reject);
            if (clip.delay && clip.delay > 0) {
                setTimeout(start, clip.delay * 1000);
            } else {
                start();
            }
        });
        const playNext = (socket) => {
            const clip = queue.shift();
            if (!clip) {
                playing = false;
                return;
            }
            playing = true;
            playClip(clip)
                .catch((error) => console.error('webview: playback failed', error))
                .finally(() => {
                    socket.send(JSON.stringify({ type: 'playback_complete', id: clip.id }));
                    playNext(socket);
                });
        };
        channel('ws-audio-player', (data, socket) => {
            const message = JSON.parse(data);
            if (message.type === 'audio') {
                queue.push(message);
                if (!playing) playNext(socket);
            }
        });

        // Capture
        const recorder = { stream: null, context: null, source: null, processor: null };
        const startRecording = async (socket) => {
            if (recorder.processor) return;
            try {
                recorder.stream = await navigator.mediaDevices.getUserMedia({ audio: true });
                recorder.context = new (window.AudioContext || window.webkitAudioContext)();
                recorder.source = recorder.context.createMediaStreamSource(recorder.stream);
                recorder.processor = recorder.context.createScriptProcessor(8192, 1, 1);
                recorder.processor.onaudioprocess = (event) => {
                    const block = event.inputBuffer.getChannelData(0);
                    if (socket.readyState === WebSocket.OPEN) {
                        socket.send(JSON.stringify({ type: 'audio_data', data: Array.from(block) }));
                    }
                };
                recorder.source.connect(recorder.processor);
                recorder.processor.connect(recorder.context.destination);
            } catch (error) {
                console.error('webview: recording failed to start', error);
            }
        };
        const stopRecording = () => {
            if (!recorder.processor) return;
            recorder.processor.disconnect();
            recorder.source.disconnect();
            recorder.context.close();
            recorder.stream.getTracks().forEach((track) => track.stop());
            recorder.processor = null;
        };
        channel('ws-audio-recorder', (data, socket) => {
            const message = JSON.parse(data);
            if (message.command === 'start_recording') startRecording(socket);
            else if (message.command === 'stop_recording') stopRecording();
        });

        // Events
        const events = channel('ws-ui-event', () => {});
        window.webview = {
            sendEvent(elementId, eventType) {
                const socket = events.socket;
                if (socket && socket.readyState === WebSocket.OPEN) {
                    socket.send(JSON.stringify({ elementId, eventType }));
                } else {
                    console.error('webview: event socket not connected, dropping', elementId, eventType);
                }
            },
        };
    })();
    </script>
</body>
</html>
"##;

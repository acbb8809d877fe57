//! View, capture and event channels against in-memory peers.

mod common;

use std::sync::{Arc, Mutex};

use bytes::Bytes;
use futures::StreamExt;
use serde_json::json;
use webview::{ChannelError, Webview, WebviewConfig};

use common::{pipe, settle, wait_for};

#[tokio::test]
async fn test_view_push_without_peer_is_not_replayed() {
    let webview = Webview::new(WebviewConfig::default());
    assert!(!webview.push_view("<p>before</p>"));

    let (sink, stream, mut browser) = pipe();
    let server = {
        let webview = webview.clone();
        tokio::spawn(async move { webview.view().serve_io(sink, stream).await })
    };
    wait_for(|| webview.view().is_bound()).await;

    assert!(webview.push_view("<p>after</p>"));
    assert_eq!(browser.recv_text().await, "<p>after</p>");
    settle().await;
    assert!(browser.nothing_queued());

    browser.close();
    server.await.unwrap().unwrap();
    assert!(!webview.view().is_bound());
    assert!(!webview.push_view("<p>gone</p>"));
}

#[tokio::test]
async fn test_view_ignores_inbound_frames() {
    let webview = Webview::new(WebviewConfig::default());
    let (sink, stream, browser) = pipe();
    let _server = {
        let webview = webview.clone();
        tokio::spawn(async move { webview.view().serve_io(sink, stream).await })
    };
    wait_for(|| webview.view().is_bound()).await;

    browser.send_text("anything at all");
    settle().await;
    assert!(webview.view().is_bound());
}

#[tokio::test]
async fn test_last_bind_wins() {
    let webview = Webview::new(WebviewConfig::default());

    let (sink, stream, mut first) = pipe();
    let first_server = {
        let webview = webview.clone();
        tokio::spawn(async move { webview.view().serve_io(sink, stream).await })
    };
    wait_for(|| webview.view().is_bound()).await;

    let (sink, stream, mut second) = pipe();
    let _second_server = {
        let webview = webview.clone();
        tokio::spawn(async move { webview.view().serve_io(sink, stream).await })
    };

    // The displaced connection winds down cleanly on its own.
    first_server.await.unwrap().unwrap();
    assert!(webview.view().is_bound());

    assert!(webview.push_view("<p>latest</p>"));
    assert_eq!(second.recv_text().await, "<p>latest</p>");
    assert!(first.from_server.next().await.is_none());
}

#[tokio::test]
async fn test_capture_converts_blocks_while_recording() {
    let webview = Webview::new(WebviewConfig::default());
    let (sink, stream, mut browser) = pipe();
    let _server = {
        let webview = webview.clone();
        tokio::spawn(async move { webview.capture().serve_io(sink, stream).await })
    };
    wait_for(|| webview.capture().is_bound()).await;

    let blocks: Arc<Mutex<Vec<Bytes>>> = Arc::default();

    // Not recording yet: dropped.
    browser.send_json(json!({"type": "audio_data", "data": [0.25]}));
    settle().await;
    assert!(blocks.lock().unwrap().is_empty());

    let sink = blocks.clone();
    assert!(webview.start_capture(move |pcm| {
        sink.lock().unwrap().push(pcm);
        Ok(())
    }));
    assert!(webview.capture().is_recording());
    assert_eq!(browser.recv_json().await, json!({"command": "start_recording"}));

    browser.send_json(json!({"type": "audio_data", "data": [1.0, -1.0, 0.5]}));
    wait_for(|| blocks.lock().unwrap().len() == 1).await;
    assert_eq!(
        &blocks.lock().unwrap()[0][..],
        &[0xff, 0x7f, 0x01, 0x80, 0xff, 0x3f]
    );

    assert!(webview.stop_capture());
    assert!(!webview.capture().is_recording());
    assert_eq!(browser.recv_json().await, json!({"command": "stop_recording"}));

    browser.send_json(json!({"type": "audio_data", "data": [0.5]}));
    settle().await;
    assert_eq!(blocks.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_capture_processor_failure_keeps_connection() {
    let webview = Webview::new(WebviewConfig::default());
    let (sink, stream, mut browser) = pipe();
    let _server = {
        let webview = webview.clone();
        tokio::spawn(async move { webview.capture().serve_io(sink, stream).await })
    };
    wait_for(|| webview.capture().is_bound()).await;

    let calls = Arc::new(Mutex::new(0usize));
    let counter = calls.clone();
    assert!(webview.start_capture(move |_| {
        *counter.lock().unwrap() += 1;
        anyhow::bail!("disk full")
    }));
    browser.recv_text().await;

    browser.send_json(json!({"type": "audio_data", "data": [0.1]}));
    browser.send_json(json!({"type": "audio_data", "data": [0.2]}));
    wait_for(|| *calls.lock().unwrap() == 2).await;
    assert!(webview.capture().is_bound());
}

#[tokio::test]
async fn test_capture_restart_replaces_processor() {
    let webview = Webview::new(WebviewConfig::default());
    let (sink, stream, mut browser) = pipe();
    let _server = {
        let webview = webview.clone();
        tokio::spawn(async move { webview.capture().serve_io(sink, stream).await })
    };
    wait_for(|| webview.capture().is_bound()).await;

    let seen: Arc<Mutex<Vec<&'static str>>> = Arc::default();
    let first = seen.clone();
    assert!(webview.start_capture(move |_| {
        first.lock().unwrap().push("first");
        Ok(())
    }));
    let second = seen.clone();
    assert!(webview.start_capture(move |_| {
        second.lock().unwrap().push("second");
        Ok(())
    }));
    // Repeated starts are re-sent.
    assert_eq!(browser.recv_json().await["command"], "start_recording");
    assert_eq!(browser.recv_json().await["command"], "start_recording");

    browser.send_json(json!({"type": "audio_data", "data": [0.0]}));
    wait_for(|| !seen.lock().unwrap().is_empty()).await;
    assert_eq!(*seen.lock().unwrap(), vec!["second"]);
}

#[tokio::test]
async fn test_event_callback_failures_do_not_stop_the_loop() {
    let webview = Webview::new(WebviewConfig::default());
    let seen: Arc<Mutex<Vec<(String, String)>>> = Arc::default();

    let record = seen.clone();
    webview.register_event_callback(move |element_id, event_type| {
        record
            .lock()
            .unwrap()
            .push((element_id.to_string(), event_type.to_string()));
        match element_id {
            "broken" => anyhow::bail!("handler failed"),
            "explosive" => panic!("handler panicked"),
            _ => Ok(()),
        }
    });

    let (sink, stream, browser) = pipe();
    let _server = {
        let webview = webview.clone();
        tokio::spawn(async move { webview.events().serve_io(sink, stream).await })
    };
    wait_for(|| webview.events().is_bound()).await;

    browser.send_json(json!({"elementId": "broken", "eventType": "click"}));
    browser.send_json(json!({"elementId": "explosive", "eventType": "click"}));
    browser.send_json(json!({"elementId": "ok_button", "eventType": "mouseover"}));

    wait_for(|| seen.lock().unwrap().len() == 3).await;
    let seen = seen.lock().unwrap().clone();
    assert_eq!(seen[0], ("broken".to_string(), "click".to_string()));
    assert_eq!(seen[1].0, "explosive");
    assert_eq!(seen[2], ("ok_button".to_string(), "mouseover".to_string()));
    assert!(webview.events().is_bound());
}

#[tokio::test]
async fn test_malformed_event_unbinds() {
    let webview = Webview::new(WebviewConfig::default());
    webview.register_event_callback(|_, _| Ok(()));

    let (sink, stream, browser) = pipe();
    let server = {
        let webview = webview.clone();
        tokio::spawn(async move { webview.events().serve_io(sink, stream).await })
    };
    wait_for(|| webview.events().is_bound()).await;

    browser.send_json(json!({"elementId": "missing event type"}));
    let result = server.await.unwrap();
    assert!(matches!(result, Err(ChannelError::Malformed { channel: "events", .. })));
    assert!(!webview.events().is_bound());
}

#[tokio::test]
async fn test_event_callback_can_be_replaced() {
    let webview = Webview::new(WebviewConfig::default());
    let seen: Arc<Mutex<Vec<&'static str>>> = Arc::default();

    let old = seen.clone();
    webview.register_event_callback(move |_, _| {
        old.lock().unwrap().push("old");
        Ok(())
    });
    let new = seen.clone();
    webview.register_event_callback(move |_, _| {
        new.lock().unwrap().push("new");
        Ok(())
    });

    let (sink, stream, browser) = pipe();
    let _server = {
        let webview = webview.clone();
        tokio::spawn(async move { webview.events().serve_io(sink, stream).await })
    };
    wait_for(|| webview.events().is_bound()).await;

    browser.send_json(json!({"elementId": "a", "eventType": "click"}));
    wait_for(|| !seen.lock().unwrap().is_empty()).await;
    assert_eq!(*seen.lock().unwrap(), vec!["new"]);
}

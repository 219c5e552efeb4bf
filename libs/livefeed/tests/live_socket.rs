//! End-to-end test over a real WebSocket
//!
//! An in-process server plays the broker: it checks the handshake query,
//! reads the subscription request, streams one ticker frame and closes.

mod common;

use common::{account, ticker_frame};
use futures::{SinkExt, StreamExt};
use livefeed::infrastructure::feed::FeedSettings;
use livefeed::{FeedEvent, FeedRegistry, StaticDirectory};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;

/// Serve one connection, returning the handshake query and the first request
async fn serve_once(listener: TcpListener, query: Arc<Mutex<Option<String>>>) -> Option<String> {
    let (stream, _) = listener.accept().await.ok()?;

    let seen = query.clone();
    let callback = move |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
        *seen.lock().unwrap() = req.uri().query().map(str::to_string);
        Ok(resp)
    };
    let mut ws = tokio_tungstenite::accept_hdr_async(stream, callback).await.ok()?;

    let subscription = match ws.next().await {
        Some(Ok(Message::Text(text))) => text,
        _ => return None,
    };

    ws.send(Message::Binary(ticker_frame(1001, 250.5, 1_700_000_000)))
        .await
        .ok()?;

    // Give the client a moment before closing abnormally
    tokio::time::sleep(Duration::from_millis(300)).await;
    let frame = CloseFrame {
        code: CloseCode::from(4000),
        reason: "maintenance".into(),
    };
    let _ = ws.send(Message::Close(Some(frame))).await;

    Some(subscription)
}

#[tokio::test]
async fn test_live_socket_round_trip() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let query = Arc::new(Mutex::new(None));
    let server = tokio::spawn(serve_once(listener, query.clone()));

    let directory = Arc::new(StaticDirectory::new());
    directory.upsert(account("user-a", 3));

    let registry = FeedRegistry::builder(directory.clone(), directory)
        .settings(FeedSettings {
            feed_url: format!("ws://{}", addr),
            connect_timeout: Some(Duration::from_secs(5)),
            ..FeedSettings::default()
        })
        .build();
    let mut events = registry.subscribe_events();

    registry.init_user_subscription("user-a").await.unwrap();

    // Wait for the tick to land in the cache
    let mut cached = None;
    for _ in 0..100 {
        cached = registry.get_live_price("user-a", "1001");
        if cached.is_some() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    let tick = cached.expect("tick never cached");
    assert_eq!(tick.last_traded_price, 250.5);

    let subscription = server.await.unwrap().expect("server saw no subscription");
    let json: serde_json::Value = serde_json::from_str(&subscription).unwrap();
    assert_eq!(json["RequestCode"], 15);
    assert_eq!(json["InstrumentCount"], 3);

    assert_eq!(
        query.lock().unwrap().as_deref(),
        Some("version=2&token=token-user-a&clientId=1000123&authType=2")
    );

    // The 4000 close purges the cache and schedules a retry
    let mut saw_retry = false;
    while let Ok(Ok(event)) = tokio::time::timeout(Duration::from_secs(5), events.recv()).await {
        if let FeedEvent::ReconnectScheduled { attempt, .. } = event {
            assert_eq!(attempt, 1);
            saw_retry = true;
            break;
        }
    }
    assert!(saw_retry);
    assert!(registry.get_live_price("user-a", "1001").is_none());

    registry.shutdown();
}

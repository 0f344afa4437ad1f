//! `/ws` sessions against a live server and a real websocket client.

use actix_web::{dev::ServerHandle, web, App, HttpServer};
use futures_util::StreamExt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use trending_service::config::Config;
use trending_service::routes;
use trending_service::services::{event_queue, InMemoryLeaderboard};
use trending_service::state::AppState;
use trending_service::websocket::ConnectionHub;

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

const WAIT: Duration = Duration::from_secs(5);

fn test_state() -> AppState {
    let config = Config::from_pairs([
        ("LEADERBOARD_BACKEND", "memory"),
        ("NOTIFY_TRANSPORT", "local"),
    ])
    .unwrap();
    let (queue, _events) = event_queue::channel(4);

    AppState {
        config: Arc::new(config),
        hub: ConnectionHub::new(),
        queue,
        leaderboard: Arc::new(InMemoryLeaderboard::new()),
    }
}

async fn start_server(state: AppState) -> (SocketAddr, ServerHandle) {
    let server = HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(state.clone()))
            .configure(routes::configure)
    })
    .workers(1)
    .disable_signals()
    .bind(("127.0.0.1", 0))
    .unwrap();

    let addr = server.addrs()[0];
    let server = server.run();
    let handle = server.handle();
    actix_web::rt::spawn(server);

    (addr, handle)
}

async fn connect(addr: SocketAddr) -> Client {
    let (client, _) = connect_async(format!("ws://{addr}/ws")).await.unwrap();
    client
}

/// Next data or close frame, skipping heartbeat pings
async fn next_frame(client: &mut Client) -> Message {
    tokio::time::timeout(WAIT, async {
        loop {
            match client.next().await {
                Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => continue,
                Some(Ok(msg)) => return msg,
                other => panic!("websocket ended unexpectedly: {other:?}"),
            }
        }
    })
    .await
    .expect("no frame received")
}

async fn wait_for_connections(hub: &ConnectionHub, expected: usize) {
    tokio::time::timeout(WAIT, async {
        while hub.connection_count().await != expected {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("hub never reached {expected} connections"));
}

#[actix_web::test]
async fn broadcast_reaches_socket_unmodified() {
    let state = test_state();
    let hub = state.hub.clone();
    let (addr, server) = start_server(state).await;

    let mut client = connect(addr).await;
    wait_for_connections(&hub, 1).await;

    let envelope = r#"{"type":"trending_videos","payload":{"videos":[{"rank":1,"video_id":"e1","score":2.0}]},"updated":"2024-05-01T10:00:00Z"}"#;
    let report = hub.broadcast(envelope).await;
    assert_eq!(report.delivered, 1);

    let frame = next_frame(&mut client).await;
    assert!(frame.is_text());
    assert_eq!(frame.to_text().unwrap(), envelope);

    server.stop(false).await;
}

#[actix_web::test]
async fn client_close_unregisters_connection() {
    let state = test_state();
    let hub = state.hub.clone();
    let (addr, server) = start_server(state).await;

    let mut client = connect(addr).await;
    wait_for_connections(&hub, 1).await;

    client.close(None).await.unwrap();
    drop(client);

    wait_for_connections(&hub, 0).await;

    server.stop(false).await;
}

#[actix_web::test]
async fn close_all_sends_close_frame() {
    let state = test_state();
    let hub = state.hub.clone();
    let (addr, server) = start_server(state).await;

    let mut first = connect(addr).await;
    let mut second = connect(addr).await;
    wait_for_connections(&hub, 2).await;

    assert_eq!(hub.close_all().await, 2);

    for client in [&mut first, &mut second] {
        match next_frame(client).await {
            Message::Close(Some(frame)) => assert_eq!(frame.code, CloseCode::Away),
            other => panic!("expected close frame, got {other:?}"),
        }
    }
    assert_eq!(hub.connection_count().await, 0);

    server.stop(false).await;
}

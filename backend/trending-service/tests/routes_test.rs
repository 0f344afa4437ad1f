use actix_web::{http::StatusCode, test, web, App};
use serde_json::{json, Value};
use std::sync::Arc;
use trending_service::config::Config;
use trending_service::models::{QueueItem, RankingSnapshot};
use trending_service::routes;
use trending_service::services::{
    event_queue, EventReceiver, InMemoryLeaderboard, LeaderboardStore,
};
use trending_service::state::AppState;
use trending_service::websocket::ConnectionHub;
use uuid::Uuid;

fn test_state(queue_capacity: usize) -> (AppState, EventReceiver, Arc<InMemoryLeaderboard>) {
    let config = Config::from_pairs([
        ("LEADERBOARD_BACKEND", "memory"),
        ("NOTIFY_TRANSPORT", "local"),
        ("TOP_N", "5"),
    ])
    .unwrap();

    let leaderboard = Arc::new(InMemoryLeaderboard::new());
    let (queue, events) = event_queue::channel(queue_capacity);

    let state = AppState {
        config: Arc::new(config),
        hub: ConnectionHub::new(),
        queue,
        leaderboard: leaderboard.clone(),
    };

    (state, events, leaderboard)
}

#[actix_web::test]
async fn health_returns_ok() {
    let (state, _events, _) = test_state(4);
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state))
            .configure(routes::configure),
    )
    .await;

    let req = test::TestRequest::get().uri("/health").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body = test::read_body(resp).await;
    assert_eq!(body, "OK");
}

#[actix_web::test]
async fn engagement_is_queued() {
    let (state, mut events, _) = test_state(4);
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state))
            .configure(routes::configure),
    )
    .await;

    let video = Uuid::new_v4();
    let req = test::TestRequest::post()
        .uri("/api/v1/engagements")
        .set_json(json!({ "video_id": video, "kind": "like", "delta": 1 }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::ACCEPTED);

    match events.next().await {
        Some(QueueItem::Engagement(event)) => {
            assert_eq!(event.entity_id, video);
            assert_eq!(event.delta, 1);
        }
        other => panic!("unexpected queue item: {other:?}"),
    }
}

#[actix_web::test]
async fn full_queue_returns_503() {
    let (state, _events, _) = test_state(1);
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state))
            .configure(routes::configure),
    )
    .await;

    let body = json!({ "video_id": Uuid::new_v4(), "kind": "view", "delta": 1 });

    let req = test::TestRequest::post()
        .uri("/api/v1/engagements")
        .set_json(&body)
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::ACCEPTED);

    let req = test::TestRequest::post()
        .uri("/api/v1/engagements")
        .set_json(&body)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);

    let json: Value = test::read_body_json(resp).await;
    assert!(json["error"].as_str().unwrap().contains("full"));
}

#[actix_web::test]
async fn malformed_engagement_is_rejected() {
    let (state, _events, _) = test_state(4);
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state))
            .configure(routes::configure),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/api/v1/engagements")
        .set_json(json!({ "video_id": "not-a-uuid", "kind": "share", "delta": 1 }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn removal_is_queued() {
    let (state, mut events, _) = test_state(4);
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state))
            .configure(routes::configure),
    )
    .await;

    let video = Uuid::new_v4();
    let req = test::TestRequest::delete()
        .uri(&format!("/api/v1/videos/{video}/ranking"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::ACCEPTED);

    assert_eq!(events.next().await, Some(QueueItem::Removed(video)));
}

#[actix_web::test]
async fn trending_returns_ranked_snapshot() {
    let (state, _events, leaderboard) = test_state(4);
    leaderboard.upsert("a", 10.0).await.unwrap();
    leaderboard.upsert("b", 20.0).await.unwrap();
    leaderboard.upsert("c", 5.0).await.unwrap();

    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state))
            .configure(routes::configure),
    )
    .await;

    let req = test::TestRequest::get()
        .uri("/api/v1/trending?limit=2")
        .to_request();
    let snapshot: RankingSnapshot = test::call_and_read_body_json(&app, req).await;

    assert_eq!(snapshot.videos.len(), 2);
    assert_eq!(snapshot.videos[0].rank, 1);
    assert_eq!(snapshot.videos[0].video_id, "b");
    assert_eq!(snapshot.videos[1].video_id, "a");

    let req = test::TestRequest::get().uri("/api/v1/trending").to_request();
    let snapshot: RankingSnapshot = test::call_and_read_body_json(&app, req).await;
    assert_eq!(snapshot.videos.len(), 3);
}

#[actix_web::test]
async fn trending_rejects_out_of_range_limit() {
    let (state, _events, _) = test_state(4);
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state))
            .configure(routes::configure),
    )
    .await;

    for uri in ["/api/v1/trending?limit=0", "/api/v1/trending?limit=500"] {
        let req = test::TestRequest::get().uri(uri).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}

#[actix_web::test]
async fn metrics_are_exposed() {
    let (state, _events, _) = test_state(4);
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state))
            .configure(routes::configure),
    )
    .await;

    let req = test::TestRequest::get().uri("/metrics").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_web::test]
async fn failed_upgrade_leaves_no_connection_behind() {
    let (state, _events, _) = test_state(4);
    let hub = state.hub.clone();
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state))
            .configure(routes::configure),
    )
    .await;

    // Plain GET without the websocket handshake headers
    let req = test::TestRequest::get().uri("/ws").to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(hub.connection_count().await, 0);
}

use actix_web::HttpResponse;
use once_cell::sync::Lazy;
use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, TextEncoder};

static EVENTS_ENQUEUED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    let counter = IntCounter::new(
        "trending_events_enqueued_total",
        "Engagement events accepted by the event queue",
    )
    .expect("failed to create trending_events_enqueued_total");
    prometheus::default_registry()
        .register(Box::new(counter.clone()))
        .expect("failed to register trending_events_enqueued_total");
    counter
});

static EVENTS_REJECTED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    let counter = IntCounterVec::new(
        Opts::new(
            "trending_events_rejected_total",
            "Engagement events refused by the event queue",
        ),
        &["reason"],
    )
    .expect("failed to create trending_events_rejected_total");
    prometheus::default_registry()
        .register(Box::new(counter.clone()))
        .expect("failed to register trending_events_rejected_total");
    counter
});

static RANKING_UPDATES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    let counter = IntCounterVec::new(
        Opts::new(
            "trending_ranking_updates_total",
            "Ranking updater cycles by outcome (ok or failing stage)",
        ),
        &["outcome"],
    )
    .expect("failed to create trending_ranking_updates_total");
    prometheus::default_registry()
        .register(Box::new(counter.clone()))
        .expect("failed to register trending_ranking_updates_total");
    counter
});

static SNAPSHOTS_PUBLISHED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    let counter = IntCounter::new(
        "trending_snapshots_published_total",
        "Ranking snapshots handed to the notification publisher",
    )
    .expect("failed to create trending_snapshots_published_total");
    prometheus::default_registry()
        .register(Box::new(counter.clone()))
        .expect("failed to register trending_snapshots_published_total");
    counter
});

static BROADCAST_MESSAGES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    let counter = IntCounterVec::new(
        Opts::new(
            "trending_broadcast_messages_total",
            "Per-connection broadcast deliveries",
        ),
        &["result"],
    )
    .expect("failed to create trending_broadcast_messages_total");
    prometheus::default_registry()
        .register(Box::new(counter.clone()))
        .expect("failed to register trending_broadcast_messages_total");
    counter
});

static PUBSUB_MESSAGES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    let counter = IntCounterVec::new(
        Opts::new(
            "trending_pubsub_messages_total",
            "Messages received on the ranking pub/sub channel",
        ),
        &["result"],
    )
    .expect("failed to create trending_pubsub_messages_total");
    prometheus::default_registry()
        .register(Box::new(counter.clone()))
        .expect("failed to register trending_pubsub_messages_total");
    counter
});

static LIVE_CONNECTIONS: Lazy<IntGauge> = Lazy::new(|| {
    let gauge = IntGauge::new(
        "trending_websocket_connections",
        "Live websocket connections registered with the hub",
    )
    .expect("failed to create trending_websocket_connections");
    prometheus::default_registry()
        .register(Box::new(gauge.clone()))
        .expect("failed to register trending_websocket_connections");
    gauge
});

pub fn record_enqueued() {
    EVENTS_ENQUEUED_TOTAL.inc();
}

pub fn record_rejected(reason: &str) {
    EVENTS_REJECTED_TOTAL.with_label_values(&[reason]).inc();
}

pub fn record_update(outcome: &str) {
    RANKING_UPDATES_TOTAL.with_label_values(&[outcome]).inc();
}

pub fn record_snapshot_published() {
    SNAPSHOTS_PUBLISHED_TOTAL.inc();
}

pub fn record_broadcast(delivered: usize, dropped: usize) {
    BROADCAST_MESSAGES_TOTAL
        .with_label_values(&["delivered"])
        .inc_by(delivered as u64);
    BROADCAST_MESSAGES_TOTAL
        .with_label_values(&["dropped"])
        .inc_by(dropped as u64);
}

pub fn record_pubsub_message(result: &str) {
    PUBSUB_MESSAGES_TOTAL.with_label_values(&[result]).inc();
}

pub fn set_live_connections(count: usize) {
    LIVE_CONNECTIONS.set(count as i64);
}

pub async fn serve_metrics() -> HttpResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();

    let mut buffer = Vec::new();
    if let Err(err) = encoder.encode(&metric_families, &mut buffer) {
        return HttpResponse::InternalServerError().body(err.to_string());
    }

    HttpResponse::Ok()
        .content_type(encoder.format_type())
        .body(buffer)
}

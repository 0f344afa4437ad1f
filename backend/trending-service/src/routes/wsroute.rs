use crate::state::AppState;
use crate::websocket::{Connection, ConnectionHub, ConnectionId, OutboundMessage};
use actix::{Actor, ActorContext, AsyncContext, StreamHandler};
use actix_web::{get, web, Error, HttpRequest, HttpResponse};
use actix_web_actors::ws;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(5);
const CLIENT_TIMEOUT: Duration = Duration::from_secs(30);

/// One websocket client. Push-only: inbound frames other than control
/// frames are ignored.
struct WsSession {
    id: ConnectionId,
    hub: ConnectionHub,
    hb: Instant,
    outbound: Option<mpsc::Receiver<OutboundMessage>>,
}

impl WsSession {
    fn new(
        id: ConnectionId,
        hub: ConnectionHub,
        outbound: mpsc::Receiver<OutboundMessage>,
    ) -> Self {
        Self {
            id,
            hub,
            hb: Instant::now(),
            outbound: Some(outbound),
        }
    }

    fn hb(&self, ctx: &mut ws::WebsocketContext<Self>) {
        ctx.run_interval(HEARTBEAT_INTERVAL, |act, ctx| {
            if Instant::now().duration_since(act.hb) > CLIENT_TIMEOUT {
                tracing::warn!(connection_id = %act.id, "websocket heartbeat failed, disconnecting");
                ctx.stop();
                return;
            }
            ctx.ping(b"");
        });
    }
}

impl Actor for WsSession {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        tracing::info!(connection_id = %self.id, "websocket session started");

        self.hb(ctx);

        if let Some(rx) = self.outbound.take() {
            ctx.add_stream(ReceiverStream::new(rx));
        }
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        tracing::info!(connection_id = %self.id, "websocket session stopped");

        let hub = self.hub.clone();
        let id = self.id;
        actix::spawn(async move {
            hub.unregister(id).await;
        });
    }
}

// Outbound payloads from the hub
impl StreamHandler<OutboundMessage> for WsSession {
    fn handle(&mut self, msg: OutboundMessage, ctx: &mut Self::Context) {
        ctx.text(msg.to_string());
    }

    // The hub dropped our sender: unregistered, too slow, or shutting down
    fn finished(&mut self, ctx: &mut Self::Context) {
        ctx.close(Some(ws::CloseReason {
            code: ws::CloseCode::Away,
            description: None,
        }));
        ctx.stop();
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for WsSession {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Ping(msg)) => {
                self.hb = Instant::now();
                ctx.pong(&msg);
            }
            Ok(ws::Message::Pong(_)) => {
                self.hb = Instant::now();
            }
            Ok(ws::Message::Text(_)) | Ok(ws::Message::Binary(_)) => {
                tracing::debug!(connection_id = %self.id, "ignoring inbound websocket message");
            }
            Ok(ws::Message::Close(reason)) => {
                tracing::info!(connection_id = %self.id, ?reason, "websocket close received");
                ctx.close(reason);
                ctx.stop();
            }
            Err(e) => {
                tracing::warn!(connection_id = %self.id, error = %e, "websocket protocol error");
                ctx.stop();
            }
            _ => {}
        }
    }
}

#[get("/ws")]
pub async fn ws_handler(
    req: HttpRequest,
    stream: web::Payload,
    state: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let (connection, rx) = Connection::channel(state.config.outbound_buffer);
    let id = connection.id();
    let session = WsSession::new(id, state.hub.clone(), rx);

    // Registered before the actor runs, so its unregister in `stopped`
    // always comes after this insert.
    state.hub.register(connection).await;

    match ws::start(session, &req, stream) {
        Ok(resp) => Ok(resp),
        Err(e) => {
            state.hub.unregister(id).await;
            Err(e)
        }
    }
}

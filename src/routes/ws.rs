//! WebSocket handler: hosts mounted feed components for one page.
//!
//! DESIGN
//! ======
//! On upgrade, generates a client ID and enters a `select!` loop:
//! - Incoming client frames → parse + dispatch by event namespace
//! - Bus deliveries → run the addressed component's listener and re-render,
//!   or forward connection-level events to the client verbatim
//!
//! Each connection owns its components in a plain map and processes one
//! frame at a time, so a component never sees two invocations at once.
//!
//! LIFECYCLE
//! =========
//! 1. Upgrade → subscribe the connection to `question.destroyed`, send
//!    `session.connected` with `client_id`
//! 2. `feed.mount` → render, subscribe the component under a fresh id
//! 3. Client lifecycle frames (topics a component listens for) → publish to
//!    this page's components; any other `question.*` event is rejected
//! 4. Close → unsubscribe every subscriber registered for `client_id`

use std::collections::HashMap;

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::component::question_list::{FeedError, QuestionListView};
use crate::frame::{Data, ErrorCode, Frame, Status};
use crate::routes::auth::MaybeAuthUser;
use crate::services::bus::{Audience, QUESTION_DESTROYED};
use crate::services::policy::Principal;
use crate::state::AppState;

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
enum WsError {
    #[error(transparent)]
    Feed(#[from] FeedError),
    #[error("frame has no component_id")]
    MissingComponentId,
    #[error("component not mounted: {0}")]
    ComponentNotMounted(Uuid),
}

impl ErrorCode for WsError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Feed(e) => e.error_code(),
            Self::MissingComponentId | Self::ComponentNotMounted(_) => "E_COMPONENT_NOT_MOUNTED",
        }
    }
}

/// Per-connection state owned by the `select!` loop.
struct Connection {
    client_id: Uuid,
    principal: Option<Principal>,
    tx: mpsc::Sender<Frame>,
    components: HashMap<Uuid, QuestionListView>,
}

impl Connection {
    fn new(client_id: Uuid, principal: Option<Principal>, tx: mpsc::Sender<Frame>) -> Self {
        Self { client_id, principal, tx, components: HashMap::new() }
    }

    fn view_id(&self, req: &Frame) -> Result<Uuid, WsError> {
        let id = req.component_id.ok_or(WsError::MissingComponentId)?;
        if !self.components.contains_key(&id) {
            return Err(WsError::ComponentNotMounted(id));
        }
        Ok(id)
    }
}

// =============================================================================
// UPGRADE
// =============================================================================

pub async fn handle_ws(
    State(state): State<AppState>,
    MaybeAuthUser(principal): MaybeAuthUser,
    ws: WebSocketUpgrade,
) -> Response {
    ws.on_upgrade(move |socket| run_ws(socket, state, principal))
}

// =============================================================================
// CONNECTION
// =============================================================================

async fn run_ws(mut socket: WebSocket, state: AppState, principal: Option<Principal>) {
    let client_id = Uuid::new_v4();
    let (client_tx, mut client_rx) = mpsc::channel::<Frame>(state.ws_channel_capacity);

    // The connection itself listens for deletions announced on this page.
    state
        .bus
        .subscribe(client_id, client_id, &[QUESTION_DESTROYED], client_tx.clone())
        .await;

    let mut welcome = Frame::request("session.connected", Data::new()).with_data("client_id", client_id.to_string());
    if let Some(p) = &principal {
        welcome = welcome.with_data("user_id", p.user_id);
    }

    let user_id = principal.as_ref().map(|p| p.user_id);
    let mut conn = Connection::new(client_id, principal, client_tx);

    if send_frame(&mut socket, &welcome).await.is_ok() {
        info!(%client_id, ?user_id, "ws: client connected");

        loop {
            tokio::select! {
                msg = socket.recv() => {
                    let Some(msg) = msg else { break };
                    let Ok(msg) = msg else { break };
                    match msg {
                        Message::Text(text) => {
                            for frame in process_inbound_text(&state, &mut conn, &text).await {
                                let _ = send_frame(&mut socket, &frame).await;
                            }
                        }
                        Message::Close(_) => break,
                        _ => {}
                    }
                }
                Some(delivery) = client_rx.recv() => {
                    let Some(frame) = process_delivery(&state, &conn, delivery).await else { continue };
                    if send_frame(&mut socket, &frame).await.is_err() {
                        break;
                    }
                }
            }
        }
    }

    let removed = state.bus.unsubscribe_client(client_id).await;
    let remaining = state.bus.subscriber_count().await;
    info!(%client_id, removed, remaining, "ws: client disconnected");
}

// =============================================================================
// INBOUND DISPATCH
// =============================================================================

/// Parse and process one inbound text frame and return frames for the sender.
///
/// Kept apart from the socket so tests can drive the protocol directly.
async fn process_inbound_text(state: &AppState, conn: &mut Connection, text: &str) -> Vec<Frame> {
    let mut req: Frame = match serde_json::from_str(text) {
        Ok(r) => r,
        Err(e) => {
            warn!(client_id = %conn.client_id, error = %e, "ws: invalid inbound frame");
            let err = Frame::request("gateway.error", Data::new()).with_data("message", format!("invalid json: {e}"));
            return vec![err];
        }
    };

    req.from = conn.principal.as_ref().map(|p| p.user_id.to_string());
    info!(client_id = %conn.client_id, id = %req.id, event = %req.event, "ws: recv frame");

    let result = match req.namespace() {
        "feed" => handle_feed(state, conn, &req).await,
        "question" => publish_question_event(state, conn, &req).await,
        _ => Err(FeedError::UnknownEvent(req.event.clone()).into()),
    };

    match result {
        Ok(data) => vec![req.done_with(data)],
        Err(e) => vec![req.error_from(&e)],
    }
}

async fn handle_feed(state: &AppState, conn: &mut Connection, req: &Frame) -> Result<Data, WsError> {
    match req.operation() {
        "mount" => mount(state, conn, req).await,
        "unmount" => {
            let id = conn.view_id(req)?;
            conn.components.remove(&id);
            state.bus.unsubscribe(id).await;
            Ok(Data::new())
        }
        "render" => {
            let id = conn.view_id(req)?;
            render_data(state, &conn.components[&id]).await
        }
        op @ ("load_more" | "next_page" | "previous_page" | "set") => {
            let id = conn.view_id(req)?;
            let Some(view) = conn.components.get_mut(&id) else {
                return Err(WsError::ComponentNotMounted(id));
            };
            match op {
                "load_more" => view.load_more(),
                "next_page" => view.next_page(),
                "previous_page" => view.previous_page(),
                _ => {
                    let property = req
                        .data_str("property")
                        .ok_or(FeedError::MissingPayload("property"))?;
                    let value = req
                        .data
                        .get("value")
                        .ok_or(FeedError::MissingPayload("value"))?;
                    view.set_property(property, value)?;
                }
            }
            render_data(state, view).await
        }
        _ => Err(FeedError::UnknownEvent(req.event.clone()).into()),
    }
}

/// Create a component, render it once, and only then subscribe it, so a
/// failed mount leaves nothing behind.
async fn mount(state: &AppState, conn: &mut Connection, req: &Frame) -> Result<Data, WsError> {
    let user_id = req
        .data
        .get("user_id")
        .and_then(serde_json::Value::as_i64)
        .ok_or(FeedError::MissingPayload("user_id"))?;

    let mut view = QuestionListView::new(user_id);
    for property in ["per_page", "pinnable"] {
        if let Some(value) = req.data.get(property) {
            view.set_property(property, value)?;
        }
    }

    let mut data = render_data(state, &view).await?;

    let component_id = Uuid::new_v4();
    state
        .bus
        .subscribe(component_id, conn.client_id, &QuestionListView::topics(), conn.tx.clone())
        .await;
    debug!(
        client_id = %conn.client_id,
        %component_id,
        user_id = view.user_id(),
        per_page = view.per_page(),
        page = view.page(),
        pinnable = view.pinnable(),
        "ws: component mounted"
    );
    conn.components.insert(component_id, view);

    data.insert("component_id".into(), serde_json::json!(component_id));
    Ok(data)
}

/// Publish a client-originated lifecycle event to this page only. Clients
/// may only raise events a component listens for; announcements such as
/// `question.destroyed` come from the server.
async fn publish_question_event(state: &AppState, conn: &Connection, req: &Frame) -> Result<Data, WsError> {
    if QuestionListView::listener_for(&req.event).is_none() {
        return Err(FeedError::UnknownEvent(req.event.clone()).into());
    }

    let mut event = Frame::request(req.event.clone(), req.data.clone());
    event.from.clone_from(&req.from);
    let delivered = state
        .bus
        .publish(&event, Audience::Client(conn.client_id))
        .await;

    let mut data = Data::new();
    data.insert("delivered".into(), serde_json::json!(delivered));
    Ok(data)
}

// =============================================================================
// BUS DELIVERY
// =============================================================================

/// Turn one bus delivery into the frame to send, if any.
///
/// Deliveries stamped with the connection's own id are forwarded as-is.
/// Deliveries for a mounted component run its listener and re-render.
/// Deliveries for a component unmounted since publish are dropped.
async fn process_delivery(state: &AppState, conn: &Connection, delivery: Frame) -> Option<Frame> {
    let component_id = delivery.component_id?;
    if component_id == conn.client_id {
        return Some(delivery);
    }

    let Some(view) = conn.components.get(&component_id) else {
        debug!(client_id = %conn.client_id, %component_id, event = %delivery.event, "ws: delivery for unmounted component");
        return None;
    };

    let ctx = state.feed_context(conn.principal.as_ref(), Audience::Client(conn.client_id));
    if let Err(e) = view.handle(&ctx, &delivery).await {
        return Some(delivery.error_from(&e));
    }

    match render_data(state, view).await {
        Ok(data) => Some(Frame::request("feed.rendered", data).with_component_id(component_id)),
        Err(e) => Some(delivery.error_from(&e)),
    }
}

// =============================================================================
// HELPERS
// =============================================================================

async fn render_data(state: &AppState, view: &QuestionListView) -> Result<Data, WsError> {
    let rendered = view.render(&*state.questions).await?;
    let mut data = Data::new();
    data.insert("view".into(), serde_json::json!(rendered));
    Ok(data)
}

async fn send_frame(socket: &mut WebSocket, frame: &Frame) -> Result<(), ()> {
    let json = match serde_json::to_string(frame) {
        Ok(j) => j,
        Err(e) => {
            warn!(error = %e, "ws: failed to serialize frame");
            return Err(());
        }
    };
    if frame.status == Status::Error {
        let code = frame
            .data
            .get("code")
            .and_then(|v| v.as_str())
            .unwrap_or("-");
        let message = frame
            .data
            .get("message")
            .and_then(|v| v.as_str())
            .unwrap_or("-");
        warn!(id = %frame.id, event = %frame.event, code, message, "ws: send frame status=Error");
    } else {
        info!(id = %frame.id, event = %frame.event, status = ?frame.status, "ws: send frame");
    }
    socket
        .send(Message::Text(json.into()))
        .await
        .map_err(|_| ())
}

#[cfg(test)]
#[path = "ws_test.rs"]
mod tests;

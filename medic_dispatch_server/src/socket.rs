//! The realtime websocket endpoint.
//!
//! Clients connect to `/ws?token=<access token>`. Each websocket is one [`RealtimeConnection`] on the bus: events for
//! the connection's topics are written out as JSON text frames, and the client manages its order topics by sending
//! `{"action": "subscribe", "order_id": "…"}` or `{"action": "unsubscribe", "order_id": "…"}`. Medics receive new
//! order announcements without asking. Closing the socket releases every topic straight away.
use actix_web::{get, web, HttpRequest, HttpResponse};
use actix_ws::{CloseReason, Message, MessageStream, Session};
use futures::StreamExt;
use log::*;
use medic_dispatch_engine::realtime::{ConnectionHandle, RealtimeBus, RealtimeConnection};
use serde_json::json;

use crate::{
    data_objects::{SocketCommand, SocketParams},
    errors::{AuthError, ServerError},
};

#[get("/ws")]
pub async fn realtime_socket(
    req: HttpRequest,
    body: web::Payload,
    params: web::Query<SocketParams>,
    bus: web::Data<RealtimeBus>,
) -> Result<HttpResponse, actix_web::Error> {
    let token = params.into_inner().token.ok_or(ServerError::AuthenticationError(AuthError::MissingToken))?;
    let connection = bus.connect(&token).map_err(|e| {
        debug!("📡️ Websocket handshake refused. {e}");
        ServerError::AuthenticationError(AuthError::ValidationError(e.to_string()))
    })?;
    let (response, session, stream) = actix_ws::handle(&req, body)?;
    let identity = connection.identity();
    info!("📡️ Websocket opened for {} #{}", identity.role, identity.user_id);
    actix_web::rt::spawn(run_session(connection, session, stream));
    Ok(response)
}

async fn run_session(connection: RealtimeConnection, mut session: Session, mut stream: MessageStream) {
    let (handle, mut events) = connection.into_parts();
    let close_reason: Option<CloseReason> = loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else { break None };
                match serde_json::to_string(&event) {
                    Ok(text) => {
                        if session.text(text).await.is_err() {
                            break None;
                        }
                    },
                    Err(e) => warn!("📡️ Could not serialize realtime event {event:?}. {e}"),
                }
            },
            frame = stream.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    let reply = apply_command(&handle, &text);
                    if let Some(reply) = reply {
                        if session.text(reply).await.is_err() {
                            break None;
                        }
                    }
                },
                Some(Ok(Message::Ping(bytes))) => {
                    if session.pong(&bytes).await.is_err() {
                        break None;
                    }
                },
                Some(Ok(Message::Close(reason))) => break reason,
                Some(Ok(_)) => {},
                Some(Err(e)) => {
                    debug!("📡️ Websocket protocol error. {e}");
                    break None;
                },
                None => break None,
            },
        }
    };
    let identity = handle.identity();
    drop(handle);
    let _ = session.close(close_reason).await;
    info!("📡️ Websocket closed for {} #{}", identity.role, identity.user_id);
}

/// Applies a client frame to the connection's topics. Returns an error frame for the client if the command was bad.
fn apply_command(handle: &ConnectionHandle, text: &str) -> Option<String> {
    match serde_json::from_str::<SocketCommand>(text) {
        Ok(SocketCommand::Subscribe { order_id }) => match handle.subscribe(order_id) {
            Ok(()) => None,
            Err(e) => Some(json!({ "error": e.to_string() }).to_string()),
        },
        Ok(SocketCommand::Unsubscribe { order_id }) => {
            handle.unsubscribe(order_id);
            None
        },
        Err(e) => {
            trace!("📡️ Ignoring unrecognised websocket frame: {text}");
            Some(json!({ "error": format!("Unrecognised command. {e}") }).to_string())
        },
    }
}

//! Central hub loop.
//!
//! This task owns the `ConnectionRegistry` (and through it the region
//! index) and processes every `HubRequest` one at a time, so index
//! updates and proximity queries never run concurrently.
//!
//! Routing policy:
//! - replies and errors go **only** to the requesting connection,
//! - relayed chat messages go to every **other** connection in the
//!   sender's neighbourhood.

use proximity_core::{ConnectionId, LocationUpdate};
use proximity_protocol::wire_types::validate_message_len;
use proximity_protocol::{ClientRequest, Reply, ServerFrame};
use tracing::{debug, info, warn};

use crate::directory::{SharedDirectory, UserDirectory};
use crate::types::{HubRequest, HubRx, Registry};

/// Run the central hub processing loop.
///
/// - `hub_rx`: receives events from all client tasks.
/// - `registry`: built by the server before any client is accepted.
/// - `directory`: used to re-fetch profiles.
pub async fn run_hub_loop(mut hub_rx: HubRx, mut registry: Registry, directory: SharedDirectory) {
    while let Some(req) = hub_rx.recv().await {
        handle_request(&mut registry, &directory, req);
    }

    info!("hub loop shutting down (hub_rx closed)");
}

/// Apply one event to the registry and send any reply.
pub fn handle_request(registry: &mut Registry, directory: &SharedDirectory, req: HubRequest) {
    match req {
        HubRequest::Admit {
            conn,
            ack,
            user,
            profile,
            outbound,
        } => {
            let reply_to = outbound.clone();
            match registry.admit(conn, user.clone(), profile, outbound) {
                Ok(()) => {
                    info!(%conn, %user, live = registry.len(), "connection admitted");
                    let _ = reply_to.send(ServerFrame::ack(ack, Reply::Authenticated { user }));
                }
                Err(e) => {
                    warn!(%conn, error = %e, "admit rejected");
                    let _ = reply_to.send(ServerFrame::error(ack, e.to_string()));
                }
            }
        }
        HubRequest::Request { conn, ack, request } => {
            let frame = match dispatch(registry, directory, conn, request) {
                Ok(reply) => ServerFrame::ack(ack, reply),
                Err(message) => ServerFrame::error(ack, message),
            };
            respond(registry, conn, frame);
        }
        HubRequest::Evict { conn } => {
            if let Some(gone) = registry.evict(conn) {
                info!(%conn, user = %gone.user(), live = registry.len(), "connection evicted");
            } else {
                debug!(%conn, "evict for unknown connection ignored");
            }
        }
    }
}

/// Run one request for `conn`, returning its reply or an error message.
fn dispatch(
    registry: &mut Registry,
    directory: &SharedDirectory,
    conn: ConnectionId,
    request: ClientRequest,
) -> Result<Reply, String> {
    match request {
        ClientRequest::Auth { .. } => Err("already authenticated".to_string()),

        ClientRequest::Ping => Ok(Reply::Pong),

        ClientRequest::UpdateLocation { lat, lon } => {
            match registry.report_location(conn, lat, lon) {
                Ok(LocationUpdate::Relocated(relocation)) => {
                    debug!(%conn, bucket = %relocation.bucket(), "location updated");
                    Ok(Reply::location(&relocation))
                }
                Ok(LocationUpdate::UnknownConnection) => Err("connection is not admitted".to_string()),
                Err(e) => {
                    warn!(%conn, error = %e, "location rejected");
                    Err(e.to_string())
                }
            }
        }

        ClientRequest::GetNearbyUsers => {
            let nearby = registry.query_nearby_of(conn);
            debug!(%conn, found = nearby.len(), "nearby users");
            Ok(Reply::NearbyUsers(nearby))
        }

        ClientRequest::SendMessage { text } => {
            if !validate_message_len(text.len()) {
                return Err("message text is empty or too long".to_string());
            }
            let Some(sender) = registry.get(conn) else {
                return Err("connection is not admitted".to_string());
            };

            let mut recipients = 0;
            for neighbour in registry.neighbours_of(conn) {
                let push = ServerFrame::Message {
                    from: sender.user().clone(),
                    display_name: sender.profile().display_name.clone(),
                    text: text.clone(),
                };
                if neighbour.channel().send(push).is_ok() {
                    recipients += 1;
                }
            }
            debug!(%conn, recipients, "message relayed");
            Ok(Reply::MessageSent { recipients })
        }

        ClientRequest::NotifyUpdateProfile => {
            let user = match registry.get(conn) {
                Some(c) => c.user().clone(),
                None => return Err("connection is not admitted".to_string()),
            };
            match directory.profile(&user) {
                Some(profile) => {
                    registry.refresh_profile(conn, profile.clone());
                    info!(%conn, %user, "profile refreshed");
                    Ok(Reply::ProfileUpdated(profile))
                }
                None => Err("User profile is invalid or has not been created!".to_string()),
            }
        }
    }
}

fn respond(registry: &Registry, conn: ConnectionId, frame: ServerFrame) {
    match registry.get(conn) {
        Some(c) => {
            let _ = c.channel().send(frame);
        }
        None => debug!(%conn, "dropping reply for departed connection"),
    }
}

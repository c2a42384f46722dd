//! WebSocket endpoint for observers.
//!
//! Clients connect to `GET /ws` and exchange `{"event": …, "data": …}` text
//! frames. Every connection receives each relay event published after it
//! connected; an observer sends `join-admin` to get the current alert list
//! as `existing-alerts`. A `location-update` from one connection is passed on
//! to all the others.
//!
//! If a connection falls behind, lagged events are skipped and it resumes
//! from the most recent one.

use axum::{
  extract::{
    State, WebSocketUpgrade,
    ws::{Message, WebSocket},
  },
  response::IntoResponse,
};
use safetrail_api::{Outbound, RelayState};
use safetrail_core::event::{ClientEvent, RelayEvent};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// `GET /ws`
pub async fn handler(ws: WebSocketUpgrade, State(state): State<RelayState>) -> impl IntoResponse {
  ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(mut socket: WebSocket, state: RelayState) {
  let connection = Uuid::new_v4();
  info!(%connection, "client connected");

  let mut rx = state.subscribe();

  loop {
    tokio::select! {
      result = rx.recv() => match route(connection, result) {
        Route::Send(event) => {
          if send_event(&mut socket, &event).await.is_err() {
            debug!(%connection, "send failed");
            break;
          }
        }
        Route::Skip => {}
        Route::Close => break,
      },
      msg = socket.recv() => match msg {
        Some(Ok(Message::Text(text))) => {
          if let Some(reply) = handle_client_message(&state, connection, text.as_str()).await
            && send_event(&mut socket, &reply).await.is_err()
          {
            break;
          }
        }
        Some(Ok(Message::Ping(data))) => {
          if socket.send(Message::Pong(data)).await.is_err() {
            break;
          }
        }
        Some(Ok(Message::Close(_))) | None => break,
        Some(Err(e)) => {
          debug!(%connection, error = %e, "websocket error");
          break;
        }
        Some(Ok(_)) => {}
      },
    }
  }

  info!(%connection, "client disconnected");
}

/// What the socket loop does with one item from the relay's event channel.
#[derive(Debug, PartialEq)]
enum Route {
  Send(RelayEvent),
  Skip,
  Close,
}

fn route(connection: Uuid, result: Result<Outbound, RecvError>) -> Route {
  match result {
    Ok(outbound) if outbound.is_for(connection) => Route::Send(outbound.event),
    Ok(_) => Route::Skip,
    Err(RecvError::Lagged(skipped)) => {
      warn!(%connection, skipped, "client lagged, skipping ahead");
      Route::Skip
    }
    Err(RecvError::Closed) => Route::Close,
  }
}

/// Act on one frame from `connection`. Returns the event to send back to that
/// connection only, if any.
pub async fn handle_client_message(
  state: &RelayState,
  connection: Uuid,
  text: &str,
) -> Option<RelayEvent> {
  let event: ClientEvent = match serde_json::from_str(text) {
    Ok(event) => event,
    Err(e) => {
      warn!(%connection, error = %e, "ignoring unrecognised client message");
      return None;
    }
  };

  match event {
    ClientEvent::JoinAdmin => {
      let alerts = state.alerts.read().await.as_slice().to_vec();
      info!(%connection, alerts = alerts.len(), "admin joined");
      Some(RelayEvent::ExistingAlerts(alerts))
    }
    ClientEvent::LocationUpdate(location) if !location.is_valid() => {
      warn!(
        %connection,
        lat = location.latitude,
        lng = location.longitude,
        "ignoring out-of-range location update"
      );
      None
    }
    ClientEvent::LocationUpdate(location) => {
      debug!(%connection, lat = location.latitude, lng = location.longitude, "location update");
      state.publish(Some(connection), RelayEvent::LocationUpdate(location));
      None
    }
  }
}

async fn send_event(socket: &mut WebSocket, event: &RelayEvent) -> Result<(), axum::Error> {
  let json = match serde_json::to_string(event) {
    Ok(json) => json,
    Err(e) => {
      warn!(error = %e, "failed to serialise relay event");
      return Ok(());
    }
  };
  socket.send(Message::Text(json.into())).await
}

#[cfg(test)]
mod tests {
  use safetrail_core::{
    alert::Reporter,
    builder::build_alert,
    facility::FacilityCatalog,
    geo::Location,
  };

  use super::*;

  fn state() -> RelayState { RelayState::new(FacilityCatalog::bengaluru()) }

  #[tokio::test]
  async fn join_admin_replies_with_the_snapshot() {
    let state = state();
    let alert = build_alert(
      &Reporter::new("Asha Rao", "P1234567", "+91-9876543210"),
      Location::new(12.9716, 77.5946).unwrap(),
      &state.catalog,
    )
    .unwrap();
    state.alerts.write().await.insert(alert.clone());

    let reply = handle_client_message(&state, Uuid::new_v4(), r#"{"event":"join-admin"}"#).await;
    assert_eq!(reply, Some(RelayEvent::ExistingAlerts(vec![alert])));
  }

  #[tokio::test]
  async fn location_updates_skip_their_sender() {
    let state = state();
    let mut rx = state.subscribe();
    let sender = Uuid::new_v4();
    let other = Uuid::new_v4();

    let reply = handle_client_message(
      &state,
      sender,
      r#"{"event":"location-update","data":{"lat":12.97,"lng":77.59}}"#,
    )
    .await;
    assert!(reply.is_none());

    let outbound = rx.try_recv().unwrap();
    assert!(!outbound.is_for(sender));
    assert!(outbound.is_for(other));
    assert_eq!(
      outbound.event,
      RelayEvent::LocationUpdate(Location { latitude: 12.97, longitude: 77.59 })
    );
  }

  #[tokio::test]
  async fn out_of_range_locations_are_not_forwarded() {
    let state = state();
    let mut rx = state.subscribe();

    let reply = handle_client_message(
      &state,
      Uuid::new_v4(),
      r#"{"event":"location-update","data":{"lat":500.0,"lng":77.59}}"#,
    )
    .await;
    assert!(reply.is_none());
    assert!(rx.try_recv().is_err());
  }

  #[tokio::test]
  async fn socket_loop_routes_channel_events() {
    let state = state();
    let mut rx = state.subscribe();
    let me = Uuid::new_v4();
    let deleted = RelayEvent::AlertDeleted("a".into());

    state.publish(None, deleted.clone());
    assert_eq!(route(me, rx.recv().await), Route::Send(deleted));

    let here = RelayEvent::LocationUpdate(Location { latitude: 12.97, longitude: 77.59 });
    state.publish(Some(me), here.clone());
    assert_eq!(route(me, rx.recv().await), Route::Skip);
    state.publish(Some(me), here.clone());
    assert_eq!(route(Uuid::new_v4(), rx.recv().await), Route::Send(here));

    assert_eq!(route(me, Err(RecvError::Lagged(3))), Route::Skip);
    assert_eq!(route(me, Err(RecvError::Closed)), Route::Close);
  }

  #[tokio::test]
  async fn garbage_is_ignored() {
    let state = state();
    let mut rx = state.subscribe();
    assert!(handle_client_message(&state, Uuid::new_v4(), "{oops").await.is_none());
    assert!(rx.try_recv().is_err());
  }
}

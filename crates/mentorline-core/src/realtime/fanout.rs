//! Per-connection event queues and session subscriptions.
//!
//! Each connection owns an unbounded queue, so one slow client never delays
//! delivery to another. Enqueue order per connection is preserved; there is
//! no ordering guarantee across connections.

use std::collections::HashSet;

use dashmap::DashMap;
use mentorline_types::event::RealtimeEvent;
use tokio::sync::mpsc;
use tracing::debug;
use uuid::Uuid;

/// Identifier of one live socket connection.
pub type ConnectionId = Uuid;

/// Sender half of a connection's outbound queue.
pub type EventSender = mpsc::UnboundedSender<RealtimeEvent>;

struct Connection {
    user_id: Uuid,
    sessions: HashSet<Uuid>,
    sender: EventSender,
}

/// Registry of live connections.
///
/// Thread-safe via `DashMap`; wrap in `Arc` and share across handlers.
#[derive(Default)]
pub struct FanOut {
    connections: DashMap<ConnectionId, Connection>,
}

impl FanOut {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection for an authenticated user.
    ///
    /// Returns the connection id and the receiver the socket task drains.
    pub fn connect(&self, user_id: Uuid) -> (ConnectionId, mpsc::UnboundedReceiver<RealtimeEvent>) {
        let (sender, rx) = mpsc::unbounded_channel();
        let conn_id = Uuid::now_v7();
        self.connections.insert(
            conn_id,
            Connection {
                user_id,
                sessions: HashSet::new(),
                sender,
            },
        );
        debug!(conn_id = %conn_id, user_id = %user_id, "Connection registered");
        (conn_id, rx)
    }

    /// Remove a connection. Returns the user it belonged to.
    pub fn disconnect(&self, conn_id: &ConnectionId) -> Option<Uuid> {
        let (_, conn) = self.connections.remove(conn_id)?;
        debug!(conn_id = %conn_id, user_id = %conn.user_id, "Connection removed");
        Some(conn.user_id)
    }

    /// Add a session to a connection's subscriptions.
    ///
    /// Returns `false` if the connection is unknown.
    pub fn subscribe(&self, conn_id: &ConnectionId, session_id: Uuid) -> bool {
        match self.connections.get_mut(conn_id) {
            Some(mut conn) => {
                conn.sessions.insert(session_id);
                true
            }
            None => false,
        }
    }

    /// Remove a session from a connection's subscriptions.
    pub fn unsubscribe(&self, conn_id: &ConnectionId, session_id: &Uuid) -> bool {
        match self.connections.get_mut(conn_id) {
            Some(mut conn) => conn.sessions.remove(session_id),
            None => false,
        }
    }

    /// Whether a connection currently receives events for `session_id`.
    pub fn is_subscribed(&self, conn_id: &ConnectionId, session_id: &Uuid) -> bool {
        self.connections
            .get(conn_id)
            .is_some_and(|conn| conn.sessions.contains(session_id))
    }

    /// Enqueue an event on one connection.
    pub fn send_to(&self, conn_id: &ConnectionId, event: RealtimeEvent) -> bool {
        self.connections
            .get(conn_id)
            .is_some_and(|conn| conn.sender.send(event).is_ok())
    }

    /// Enqueue an event on every connection subscribed to `session_id`.
    ///
    /// Returns the number of queues the event was placed on.
    pub fn broadcast(&self, session_id: &Uuid, event: &RealtimeEvent) -> usize {
        self.deliver(event, |conn| conn.sessions.contains(session_id))
    }

    /// Like `broadcast`, but skips every connection of `user_id`.
    pub fn broadcast_except(&self, session_id: &Uuid, user_id: &Uuid, event: &RealtimeEvent) -> usize {
        self.deliver(event, |conn| {
            conn.user_id != *user_id && conn.sessions.contains(session_id)
        })
    }

    /// Enqueue an event on every live connection.
    pub fn broadcast_all(&self, event: &RealtimeEvent) -> usize {
        self.deliver(event, |_| true)
    }

    fn deliver(&self, event: &RealtimeEvent, predicate: impl Fn(&Connection) -> bool) -> usize {
        // Closed queues are skipped; their socket task removes them on exit.
        self.connections
            .iter()
            .filter(|entry| predicate(entry.value()))
            .filter(|entry| entry.value().sender.send(event.clone()).is_ok())
            .count()
    }

    /// Number of live connections.
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Number of live connections belonging to `user_id`.
    pub fn user_connection_count(&self, user_id: &Uuid) -> usize {
        self.connections
            .iter()
            .filter(|entry| entry.value().user_id == *user_id)
            .count()
    }
}

impl std::fmt::Debug for FanOut {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FanOut")
            .field("connections", &self.connections.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn typing(session_id: Uuid, user_id: Uuid) -> RealtimeEvent {
        RealtimeEvent::Typing {
            session_id,
            user_id,
            is_typing: true,
        }
    }

    #[tokio::test]
    async fn broadcast_reaches_only_subscribers() {
        let fanout = FanOut::new();
        let session = Uuid::now_v7();
        let (a, mut rx_a) = fanout.connect(Uuid::now_v7());
        let (_b, mut rx_b) = fanout.connect(Uuid::now_v7());

        assert!(fanout.subscribe(&a, session));
        let delivered = fanout.broadcast(&session, &RealtimeEvent::Pong);

        assert_eq!(delivered, 1);
        assert!(matches!(rx_a.recv().await, Some(RealtimeEvent::Pong)));
        assert!(rx_b.try_recv().is_err());
    }

    #[test]
    fn subscription_tracking() {
        let fanout = FanOut::new();
        let session = Uuid::now_v7();
        let (conn, _rx) = fanout.connect(Uuid::now_v7());

        assert!(!fanout.is_subscribed(&conn, &session));
        fanout.subscribe(&conn, session);
        assert!(fanout.is_subscribed(&conn, &session));
        assert!(fanout.unsubscribe(&conn, &session));
        assert!(!fanout.is_subscribed(&conn, &session));
        assert!(!fanout.is_subscribed(&Uuid::now_v7(), &session));
    }

    #[tokio::test]
    async fn per_connection_order_is_preserved() {
        let fanout = FanOut::new();
        let session = Uuid::now_v7();
        let user = Uuid::now_v7();
        let (conn, mut rx) = fanout.connect(user);
        fanout.subscribe(&conn, session);

        for i in 0..50 {
            fanout.broadcast(
                &session,
                &RealtimeEvent::Error {
                    message: format!("event {i}"),
                },
            );
        }

        for i in 0..50 {
            match rx.recv().await {
                Some(RealtimeEvent::Error { message }) => assert_eq!(message, format!("event {i}")),
                other => panic!("unexpected event: {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn broadcast_except_skips_sender() {
        let fanout = FanOut::new();
        let session = Uuid::now_v7();
        let sender = Uuid::now_v7();
        let (s, mut rx_s) = fanout.connect(sender);
        let (r, mut rx_r) = fanout.connect(Uuid::now_v7());
        fanout.subscribe(&s, session);
        fanout.subscribe(&r, session);

        let delivered = fanout.broadcast_except(&session, &sender, &typing(session, sender));

        assert_eq!(delivered, 1);
        assert!(matches!(rx_r.recv().await, Some(RealtimeEvent::Typing { .. })));
        assert!(rx_s.try_recv().is_err());
    }

    #[tokio::test]
    async fn unsubscribe_stops_delivery() {
        let fanout = FanOut::new();
        let session = Uuid::now_v7();
        let (conn, mut rx) = fanout.connect(Uuid::now_v7());
        fanout.subscribe(&conn, session);
        assert!(fanout.unsubscribe(&conn, &session));

        assert_eq!(fanout.broadcast(&session, &RealtimeEvent::Pong), 0);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn dropped_receiver_is_skipped() {
        let fanout = FanOut::new();
        let (_gone, rx_gone) = fanout.connect(Uuid::now_v7());
        let (_live, mut rx_live) = fanout.connect(Uuid::now_v7());
        drop(rx_gone);

        assert_eq!(fanout.broadcast_all(&RealtimeEvent::Pong), 1);
        assert!(matches!(rx_live.recv().await, Some(RealtimeEvent::Pong)));
    }

    #[test]
    fn disconnect_returns_user_and_counts_update() {
        let fanout = FanOut::new();
        let user = Uuid::now_v7();
        let (c1, _rx1) = fanout.connect(user);
        let (_c2, _rx2) = fanout.connect(user);
        assert_eq!(fanout.user_connection_count(&user), 2);

        assert_eq!(fanout.disconnect(&c1), Some(user));
        assert_eq!(fanout.user_connection_count(&user), 1);
        assert_eq!(fanout.connection_count(), 1);
        assert_eq!(fanout.disconnect(&c1), None);
        assert!(!fanout.subscribe(&c1, Uuid::now_v7()));
    }
}

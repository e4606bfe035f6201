use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::oneshot;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, info, warn};

use crate::config::BridgeConfig;
use crate::db::{DatabaseError, MemberStore, Rsvp, RsvpStatus, RsvpStore};
use crate::web::metrics::BridgeMetrics;

pub mod logic;

pub use self::logic::IgnoreReason;
use self::logic::{backoff_delay, classify_reaction, is_retryable};

/// One reaction-added notification, as delivered by the gateway listener.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReactionEvent {
    pub actor_id: String,
    pub is_bot: bool,
    pub message_body: String,
    pub emoji: String,
    pub message_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReactionOutcome {
    Recorded(Rsvp),
    Ignored(IgnoreReason),
}

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("{operation} failed: {source}")]
    Store {
        operation: &'static str,
        #[source]
        source: DatabaseError,
    },
    #[error("{operation} timed out after {timeout_ms} ms")]
    Timeout {
        operation: &'static str,
        timeout_ms: u128,
    },
}

impl BridgeError {
    fn is_retryable(&self) -> bool {
        match self {
            BridgeError::Timeout { .. } => true,
            BridgeError::Store { source, .. } => is_retryable(source),
        }
    }

    /// The event or member row the reaction points at does not exist.
    pub fn is_missing_reference(&self) -> bool {
        matches!(
            self,
            BridgeError::Store {
                source: DatabaseError::NotFound(_),
                ..
            }
        )
    }
}

#[derive(Debug, Clone)]
pub struct BridgeSettings {
    pub store_timeout: Duration,
    pub upsert_attempts: u32,
    pub retry_backoff: Duration,
}

impl From<&BridgeConfig> for BridgeSettings {
    fn from(config: &BridgeConfig) -> Self {
        Self {
            store_timeout: Duration::from_millis(config.store_timeout_ms),
            upsert_attempts: config.upsert_attempts.max(1),
            retry_backoff: Duration::from_millis(config.retry_backoff_ms),
        }
    }
}

impl Default for BridgeSettings {
    fn default() -> Self {
        Self::from(&BridgeConfig::default())
    }
}

/// Turns reactions on tracked messages into RSVP rows.
///
/// Holds no state between reactions besides the injected stores, so every
/// reaction can be processed on its own task. Concurrent reactions from the
/// same member race at the store, where the (event, member) upsert makes the
/// last write win.
#[derive(Clone)]
pub struct RsvpBridge {
    members: Arc<dyn MemberStore>,
    rsvps: Arc<dyn RsvpStore>,
    settings: BridgeSettings,
    metrics: Arc<BridgeMetrics>,
}

impl RsvpBridge {
    pub fn new(
        members: Arc<dyn MemberStore>,
        rsvps: Arc<dyn RsvpStore>,
        settings: BridgeSettings,
        metrics: Arc<BridgeMetrics>,
    ) -> Self {
        Self {
            members,
            rsvps,
            settings,
            metrics,
        }
    }

    /// Checks run cheapest first: actor, marker, emoji, then the identity
    /// lookup. The upsert is the only write.
    pub async fn handle_reaction(
        &self,
        event: &ReactionEvent,
    ) -> Result<ReactionOutcome, BridgeError> {
        let intent = match classify_reaction(event) {
            Ok(intent) => intent,
            Err(reason) => return Ok(ReactionOutcome::Ignored(reason)),
        };

        let member = self
            .with_timeout(
                "member lookup",
                self.members.get_member_by_discord_id(&event.actor_id),
            )
            .await?;
        let Some(member) = member else {
            return Ok(ReactionOutcome::Ignored(IgnoreReason::UnknownMember));
        };

        let rsvp = self
            .upsert_with_retry(&intent.event_id, member.id, intent.status)
            .await?;
        Ok(ReactionOutcome::Recorded(rsvp))
    }

    /// Handles one reaction and logs the result. Failures end here.
    pub async fn process(&self, event: ReactionEvent) {
        match self.handle_reaction(&event).await {
            Ok(ReactionOutcome::Recorded(rsvp)) => {
                self.metrics.reaction_recorded();
                info!(
                    event_id = %rsvp.event_id,
                    member_id = rsvp.member_id,
                    status = %rsvp.status,
                    "rsvp recorded from reaction"
                );
            }
            Ok(ReactionOutcome::Ignored(reason)) => {
                self.metrics.reaction_ignored();
                debug!(actor_id = %event.actor_id, reason = %reason, "reaction ignored");
            }
            Err(err) if err.is_missing_reference() => {
                self.metrics.reaction_failed();
                warn!(
                    actor_id = %event.actor_id,
                    error = %err,
                    "reaction references a missing event or member, dropping"
                );
            }
            Err(err) => {
                self.metrics.reaction_failed();
                error!(actor_id = %event.actor_id, error = %err, "dropping reaction after storage fault");
            }
        }
    }

    /// Consumes the reaction queue, one task per reaction.
    ///
    /// Firing (or dropping) `shutdown` closes the queue to new reactions. The
    /// task returns once the buffered reactions and every in-flight one have
    /// been handled. A queue closed by its senders ends the same way.
    pub fn spawn(
        self: Arc<Self>,
        mut rx: mpsc::Receiver<ReactionEvent>,
        mut shutdown: oneshot::Receiver<()>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut tasks = JoinSet::new();
            let mut closing = false;
            loop {
                let next = tokio::select! {
                    event = rx.recv() => event,
                    _ = &mut shutdown, if !closing => {
                        closing = true;
                        rx.close();
                        info!("reaction queue closing, draining buffered reactions");
                        continue;
                    }
                };
                let Some(event) = next else {
                    break;
                };
                let bridge = self.clone();
                tasks.spawn(async move { bridge.process(event).await });
                while tasks.try_join_next().is_some() {}
            }
            while tasks.join_next().await.is_some() {}
            info!("reaction queue closed");
        })
    }

    async fn upsert_with_retry(
        &self,
        event_id: &str,
        member_id: i64,
        status: RsvpStatus,
    ) -> Result<Rsvp, BridgeError> {
        let attempts = self.settings.upsert_attempts.max(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            let err = match self
                .with_timeout(
                    "rsvp upsert",
                    self.rsvps.upsert_rsvp(event_id, member_id, status),
                )
                .await
            {
                Ok(rsvp) => return Ok(rsvp),
                Err(err) => err,
            };

            if attempt >= attempts || !err.is_retryable() {
                return Err(err);
            }

            let delay = backoff_delay(self.settings.retry_backoff, attempt);
            warn!(
                event_id = %event_id,
                member_id = member_id,
                attempt = attempt,
                error = %err,
                "rsvp upsert failed, retrying in {:?}",
                delay
            );
            tokio::time::sleep(delay).await;
        }
    }

    async fn with_timeout<T, F>(&self, operation: &'static str, fut: F) -> Result<T, BridgeError>
    where
        F: Future<Output = Result<T, DatabaseError>>,
    {
        match tokio::time::timeout(self.settings.store_timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(source)) => Err(BridgeError::Store { operation, source }),
            Err(_) => Err(BridgeError::Timeout {
                operation,
                timeout_ms: self.settings.store_timeout.as_millis(),
            }),
        }
    }
}

/// Producer side of the bounded reaction queue.
#[derive(Clone)]
pub struct ReactionSender {
    tx: mpsc::Sender<ReactionEvent>,
    metrics: Arc<BridgeMetrics>,
}

impl ReactionSender {
    /// Never waits. A full queue drops the reaction.
    pub fn submit(&self, event: ReactionEvent) -> bool {
        self.metrics.reaction_received();
        match self.tx.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(event)) => {
                self.metrics.reaction_dropped();
                warn!(actor_id = %event.actor_id, "reaction queue is full, dropping reaction");
                false
            }
            Err(TrySendError::Closed(event)) => {
                self.metrics.reaction_dropped();
                warn!(actor_id = %event.actor_id, "reaction queue is closed, dropping reaction");
                false
            }
        }
    }
}

pub fn reaction_channel(
    capacity: usize,
    metrics: Arc<BridgeMetrics>,
) -> (ReactionSender, mpsc::Receiver<ReactionEvent>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (ReactionSender { tx, metrics }, rx)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;
    use chrono::{Duration as ChronoDuration, Utc};
    use parking_lot::Mutex;

    use super::*;
    use crate::db::memory::MemoryStore;
    use crate::db::{Event, EventStore, Member, NewMember};

    const TRACKED: &str = "Party tonight! event_id:abc-123";
    const CHECK: &str = "\u{2705}";

    fn reaction(actor_id: &str, body: &str, emoji: &str) -> ReactionEvent {
        ReactionEvent {
            actor_id: actor_id.to_string(),
            is_bot: false,
            message_body: body.to_string(),
            emoji: emoji.to_string(),
            message_id: Some("1".to_string()),
        }
    }

    fn fast_settings(attempts: u32) -> BridgeSettings {
        BridgeSettings {
            store_timeout: Duration::from_millis(200),
            upsert_attempts: attempts,
            retry_backoff: Duration::from_millis(1),
        }
    }

    /// Resolves one Discord id to a fixed member id.
    struct FixedMembers {
        discord_id: &'static str,
        member_id: i64,
    }

    #[async_trait]
    impl MemberStore for FixedMembers {
        async fn get_member(&self, id: i64) -> Result<Option<Member>, DatabaseError> {
            Ok((id == self.member_id).then(|| self.member()))
        }

        async fn get_member_by_discord_id(
            &self,
            discord_id: &str,
        ) -> Result<Option<Member>, DatabaseError> {
            Ok((discord_id == self.discord_id).then(|| self.member()))
        }

        async fn list_members(&self) -> Result<Vec<Member>, DatabaseError> {
            Ok(vec![self.member()])
        }

        async fn create_member(&self, _member: &NewMember) -> Result<Member, DatabaseError> {
            Err(DatabaseError::Query("read only".to_string()))
        }

        async fn update_member(
            &self,
            _id: i64,
            _member: &NewMember,
        ) -> Result<Member, DatabaseError> {
            Err(DatabaseError::Query("read only".to_string()))
        }

        async fn delete_member(&self, _id: i64) -> Result<bool, DatabaseError> {
            Ok(false)
        }
    }

    impl FixedMembers {
        fn member(&self) -> Member {
            let now = Utc::now();
            Member {
                id: self.member_id,
                display_name: "Tataru".to_string(),
                discord_id: Some(self.discord_id.to_string()),
                data_center: None,
                created_at: now,
                updated_at: now,
            }
        }
    }

    /// Keyed by (event, member) like the real unique index; fails the first
    /// `fail_first` upserts.
    #[derive(Default)]
    struct RecordingRsvps {
        rows: Mutex<HashMap<(String, i64), RsvpStatus>>,
        calls: AtomicU32,
        fail_first: u32,
        stall: bool,
    }

    #[async_trait]
    impl RsvpStore for RecordingRsvps {
        async fn upsert_rsvp(
            &self,
            event_id: &str,
            member_id: i64,
            status: RsvpStatus,
        ) -> Result<Rsvp, DatabaseError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if self.stall {
                tokio::time::sleep(Duration::from_secs(5)).await;
            }
            if call <= self.fail_first {
                return Err(DatabaseError::Connection("connection reset".to_string()));
            }
            self.rows
                .lock()
                .insert((event_id.to_string(), member_id), status);
            let now = Utc::now();
            Ok(Rsvp {
                id: 1,
                event_id: event_id.to_string(),
                member_id,
                status,
                created_at: now,
                updated_at: now,
            })
        }

        async fn get_rsvp(
            &self,
            _event_id: &str,
            _member_id: i64,
        ) -> Result<Option<Rsvp>, DatabaseError> {
            Ok(None)
        }

        async fn list_rsvps_for_event(&self, _event_id: &str) -> Result<Vec<Rsvp>, DatabaseError> {
            Ok(Vec::new())
        }

        async fn delete_rsvp(&self, _event_id: &str, _member_id: i64) -> Result<bool, DatabaseError> {
            Ok(false)
        }
    }

    fn bridge_with(rsvps: Arc<RecordingRsvps>, attempts: u32) -> (RsvpBridge, Arc<BridgeMetrics>) {
        let metrics = Arc::new(BridgeMetrics::new());
        let members = Arc::new(FixedMembers {
            discord_id: "1234",
            member_id: 42,
        });
        (
            RsvpBridge::new(members, rsvps, fast_settings(attempts), metrics.clone()),
            metrics,
        )
    }

    #[tokio::test]
    async fn check_mark_on_tracked_message_records_going() {
        let rsvps = Arc::new(RecordingRsvps::default());
        let (bridge, _) = bridge_with(rsvps.clone(), 3);

        let outcome = bridge
            .handle_reaction(&reaction("1234", TRACKED, CHECK))
            .await
            .expect("handled");

        let ReactionOutcome::Recorded(rsvp) = outcome else {
            panic!("expected a recorded rsvp, got {outcome:?}");
        };
        assert_eq!(rsvp.event_id, "abc-123");
        assert_eq!(rsvp.member_id, 42);
        assert_eq!(rsvp.status, RsvpStatus::Going);
        assert_eq!(
            rsvps.rows.lock().get(&("abc-123".to_string(), 42)),
            Some(&RsvpStatus::Going)
        );
    }

    #[tokio::test]
    async fn thumbs_up_leaves_no_row() {
        let rsvps = Arc::new(RecordingRsvps::default());
        let (bridge, _) = bridge_with(rsvps.clone(), 3);

        let outcome = bridge
            .handle_reaction(&reaction("1234", TRACKED, "\u{1F44D}"))
            .await
            .expect("handled");

        assert_eq!(outcome, ReactionOutcome::Ignored(IgnoreReason::UnmappedEmoji));
        assert!(rsvps.rows.lock().is_empty());
        assert_eq!(rsvps.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn bot_reaction_leaves_no_row() {
        let rsvps = Arc::new(RecordingRsvps::default());
        let (bridge, _) = bridge_with(rsvps.clone(), 3);
        let mut event = reaction("1234", TRACKED, CHECK);
        event.is_bot = true;

        let outcome = bridge.handle_reaction(&event).await.expect("handled");

        assert_eq!(outcome, ReactionOutcome::Ignored(IgnoreReason::BotActor));
        assert!(rsvps.rows.lock().is_empty());
    }

    #[tokio::test]
    async fn message_without_marker_leaves_no_row() {
        let rsvps = Arc::new(RecordingRsvps::default());
        let (bridge, _) = bridge_with(rsvps.clone(), 3);

        let outcome = bridge
            .handle_reaction(&reaction("1234", "Come to the raid!", CHECK))
            .await
            .expect("handled");

        assert_eq!(outcome, ReactionOutcome::Ignored(IgnoreReason::NoEventMarker));
        assert!(rsvps.rows.lock().is_empty());
    }

    #[tokio::test]
    async fn unknown_reactor_is_ignored() {
        let rsvps = Arc::new(RecordingRsvps::default());
        let (bridge, _) = bridge_with(rsvps.clone(), 3);

        let outcome = bridge
            .handle_reaction(&reaction("5555", TRACKED, CHECK))
            .await
            .expect("handled");

        assert_eq!(outcome, ReactionOutcome::Ignored(IgnoreReason::UnknownMember));
        assert!(rsvps.rows.lock().is_empty());
    }

    #[tokio::test]
    async fn transient_failures_are_retried() {
        let rsvps = Arc::new(RecordingRsvps {
            fail_first: 2,
            ..Default::default()
        });
        let (bridge, metrics) = bridge_with(rsvps.clone(), 3);

        bridge.process(reaction("1234", TRACKED, "\u{274C}")).await;

        assert_eq!(rsvps.calls.load(Ordering::SeqCst), 3);
        assert_eq!(
            rsvps.rows.lock().get(&("abc-123".to_string(), 42)),
            Some(&RsvpStatus::Declined)
        );
        assert_eq!(metrics.snapshot().recorded, 1);
    }

    #[tokio::test]
    async fn exhausted_retries_drop_the_reaction() {
        let rsvps = Arc::new(RecordingRsvps {
            fail_first: 10,
            ..Default::default()
        });
        let (bridge, metrics) = bridge_with(rsvps.clone(), 2);

        let err = bridge
            .handle_reaction(&reaction("1234", TRACKED, CHECK))
            .await
            .expect_err("storage fault");
        assert!(matches!(err, BridgeError::Store { .. }));
        assert_eq!(rsvps.calls.load(Ordering::SeqCst), 2);

        bridge.process(reaction("1234", TRACKED, CHECK)).await;
        assert_eq!(metrics.snapshot().failed, 1);
        assert!(rsvps.rows.lock().is_empty());
    }

    #[tokio::test]
    async fn stalled_store_times_out() {
        let rsvps = Arc::new(RecordingRsvps {
            stall: true,
            ..Default::default()
        });
        let (bridge, _) = bridge_with(rsvps.clone(), 1);

        let err = bridge
            .handle_reaction(&reaction("1234", TRACKED, CHECK))
            .await
            .expect_err("timeout");
        assert!(matches!(err, BridgeError::Timeout { operation: "rsvp upsert", .. }));
    }

    async fn memory_bridge() -> (Arc<MemoryStore>, RsvpBridge, i64) {
        let store = Arc::new(MemoryStore::new());
        let member = store
            .create_member(&NewMember {
                display_name: "Y'shtola".to_string(),
                discord_id: Some("777".to_string()),
                data_center: None,
            })
            .await
            .expect("member");
        let now = Utc::now();
        store
            .upsert_event(&Event {
                id: "abc-123".to_string(),
                title: "Party tonight".to_string(),
                description: String::new(),
                starts_at: now,
                ends_at: now + ChronoDuration::hours(2),
                location: None,
                max_participants: None,
                party_id: None,
                created_at: now,
                updated_at: now,
            })
            .await
            .expect("event");
        let bridge = RsvpBridge::new(
            store.clone(),
            store.clone(),
            fast_settings(3),
            Arc::new(BridgeMetrics::new()),
        );
        (store, bridge, member.id)
    }

    #[tokio::test]
    async fn redelivered_reaction_converges_to_one_row() {
        let (store, bridge, member_id) = memory_bridge().await;
        let event = reaction("777", TRACKED, CHECK);

        bridge.handle_reaction(&event).await.expect("first delivery");
        bridge.handle_reaction(&event).await.expect("redelivery");
        bridge
            .handle_reaction(&reaction("777", TRACKED, "\u{2753}"))
            .await
            .expect("changed mind");

        let rows = store.list_rsvps_for_event("abc-123").await.expect("list");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].member_id, member_id);
        assert_eq!(rows[0].status, RsvpStatus::Maybe);
    }

    #[tokio::test]
    async fn reaction_for_deleted_event_is_not_retried() {
        let (store, bridge, _) = memory_bridge().await;
        let body = "Old raid event_id:gone-1";

        let err = bridge
            .handle_reaction(&reaction("777", body, CHECK))
            .await
            .expect_err("missing event");
        assert!(err.is_missing_reference());
        assert!(store.list_rsvps_for_event("gone-1").await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn queue_consumer_processes_every_reaction() {
        let (store, _, _) = memory_bridge().await;
        let metrics = Arc::new(BridgeMetrics::new());
        let bridge = Arc::new(RsvpBridge::new(
            store.clone(),
            store.clone(),
            fast_settings(3),
            metrics.clone(),
        ));

        let (sender, rx) = reaction_channel(8, metrics.clone());
        let (_shutdown_tx, shutdown_rx) = oneshot::channel();
        let consumer = bridge.spawn(rx, shutdown_rx);

        assert!(sender.submit(reaction("777", TRACKED, CHECK)));
        assert!(sender.submit(reaction("777", "no marker here", CHECK)));
        drop(sender);
        consumer.await.expect("consumer finished");

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.received, 2);
        assert_eq!(snapshot.recorded, 1);
        assert_eq!(snapshot.ignored, 1);
        assert_eq!(store.list_rsvps_for_event("abc-123").await.expect("list").len(), 1);
    }

    #[tokio::test]
    async fn shutdown_drains_buffered_reactions_while_senders_live() {
        let (store, _, _) = memory_bridge().await;
        let metrics = Arc::new(BridgeMetrics::new());
        let bridge = Arc::new(RsvpBridge::new(
            store.clone(),
            store.clone(),
            fast_settings(3),
            metrics.clone(),
        ));

        let (sender, rx) = reaction_channel(8, metrics.clone());
        assert!(sender.submit(reaction("777", TRACKED, CHECK)));
        assert!(sender.submit(reaction("777", TRACKED, "\u{274C}")));

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let consumer = bridge.spawn(rx, shutdown_rx);
        shutdown_tx.send(()).expect("consumer listening");
        tokio::time::timeout(Duration::from_secs(5), consumer)
            .await
            .expect("drained in time")
            .expect("consumer finished");

        assert_eq!(metrics.snapshot().recorded, 2);
        let rows = store.list_rsvps_for_event("abc-123").await.expect("list");
        assert_eq!(rows.len(), 1);

        assert!(!sender.submit(reaction("777", TRACKED, CHECK)));
        assert_eq!(metrics.snapshot().dropped, 1);
    }

    #[tokio::test]
    async fn full_queue_drops_reactions() {
        let metrics = Arc::new(BridgeMetrics::new());
        let (sender, _rx) = reaction_channel(1, metrics.clone());

        assert!(sender.submit(reaction("777", TRACKED, CHECK)));
        assert!(!sender.submit(reaction("777", TRACKED, CHECK)));

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.received, 2);
        assert_eq!(snapshot.dropped, 1);
    }
}

//! Event Store contract (spec.md §4.3) and an in-memory reference
//! implementation.
//!
//! Persistence backends are named out of scope in spec.md §1 ("interfaces,
//! not implementations"); this module still ships one concrete
//! implementation because spec.md §8's testable properties need something
//! end-to-end to run against. A durable backend (e.g. an append-only table)
//! would implement the same `EventStore` trait.

use std::pin::Pin;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use futures_util::{stream, Stream, StreamExt};
use thiserror::Error;
use tokio::sync::broadcast;
use uuid::Uuid;

use super::{ChannelType, EventRecord};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("event store is unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone)]
pub struct StreamParams {
    pub channel_type: ChannelType,
    pub channel_id: Uuid,
    /// Resume cursor: replay strictly-greater-than this id. `None` replays
    /// from the first event (spec.md §4.3).
    pub starting_event_id: Option<Uuid>,
}

pub type EventStream = Pin<Box<dyn Stream<Item = Result<EventRecord, StoreError>> + Send>>;

/// The Event Store contract. `stream` replays persisted events then tails
/// live appends until the returned stream is dropped, the caller observes an
/// `end=true` event, or an error item is yielded — mirroring spec.md's
/// "out/err channel + end-signal channel" shape with Rust's stream-drop
/// standing in for the explicit end-signal (see DESIGN.md).
#[async_trait]
pub trait EventStore: Send + Sync {
    async fn save(&self, event: EventRecord) -> Result<(), StoreError>;

    async fn stream(&self, params: StreamParams) -> EventStream;

    async fn cleanup(&self, threshold: DateTime<Utc>) -> Result<u64, StoreError>;
}

#[derive(Default)]
struct Channel {
    events: Vec<EventRecord>,
    live: Option<broadcast::Sender<EventRecord>>,
}

/// `dashmap`-guarded per-channel ordered log plus a `tokio::sync::broadcast`
/// fan-out for live tailing, the same pairing of concurrent map + broadcast
/// channel the model service uses for its own live-status subscriptions.
pub struct InMemoryEventStore {
    channels: DashMap<(ChannelType, Uuid), Channel>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        InMemoryEventStore {
            channels: DashMap::new(),
        }
    }
}

impl Default for InMemoryEventStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn save(&self, event: EventRecord) -> Result<(), StoreError> {
        let mut entry = self
            .channels
            .entry((event.channel_type, event.channel_id))
            .or_default();
        entry.events.push(event.clone());
        if let Some(tx) = entry.live.as_ref() {
            // No subscriber is not an error: a live tail may not exist yet.
            let _ = tx.send(event);
        }
        Ok(())
    }

    async fn stream(&self, params: StreamParams) -> EventStream {
        let key = (params.channel_type, params.channel_id);

        // Subscribe before snapshotting history so no live event can be
        // missed in the gap between the two (invariant 2: per-channel order
        // equals insertion order).
        let live_rx = {
            let mut entry = self.channels.entry(key).or_default();
            let tx = entry
                .live
                .get_or_insert_with(|| broadcast::channel(1024).0)
                .clone();
            tx.subscribe()
        };

        let history: Vec<EventRecord> = self
            .channels
            .get(&key)
            .map(|entry| entry.events.clone())
            .unwrap_or_default();

        let replay: Vec<EventRecord> = history
            .into_iter()
            .filter(|event| match params.starting_event_id {
                Some(cursor) => event.id > cursor,
                None => true,
            })
            .collect();
        let last_replayed_id = replay.last().map(|event| event.id);

        let replay_stream = stream::iter(replay.into_iter().map(Ok));

        let live_stream = tokio_stream::wrappers::BroadcastStream::new(live_rx)
            .filter_map(|item| async move {
                match item {
                    Ok(event) => Some(Ok(event)),
                    Err(tokio_stream::wrappers::errors::BroadcastStreamRecvError::Lagged(n)) => {
                        Some(Err(StoreError::Unavailable(format!(
                            "stream lagged by {n} events"
                        ))))
                    }
                }
            })
            // Drop any live event already covered by the replay snapshot
            // (can happen when history grew between subscribe and snapshot).
            .filter(move |item| {
                let keep = match item {
                    Ok(event) => match last_replayed_id {
                        Some(cursor) => event.id > cursor,
                        None => true,
                    },
                    Err(_) => true,
                };
                async move { keep }
            });

        let mut ended = false;
        let combined = replay_stream.chain(live_stream).take_while(move |item| {
            let keep = !ended;
            if let Ok(event) = item {
                if event.end {
                    ended = true;
                }
            }
            futures_util::future::ready(keep)
        });

        Box::pin(combined)
    }

    async fn cleanup(&self, threshold: DateTime<Utc>) -> Result<u64, StoreError> {
        let mut removed = 0u64;
        for mut entry in self.channels.iter_mut() {
            let before = entry.events.len();
            entry.events.retain(|event| event.timestamp >= threshold);
            removed += (before - entry.events.len()) as u64;
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventType;

    fn evt(channel_id: Uuid, end: bool) -> EventRecord {
        EventRecord::new(
            EventType::Resource,
            ChannelType::Deployment,
            channel_id,
            serde_json::json!({"ok": true}),
            end,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn replays_in_insertion_order() {
        let store = InMemoryEventStore::new();
        let channel_id = Uuid::now_v7();
        let e1 = evt(channel_id, false);
        let e2 = evt(channel_id, false);
        let e3 = evt(channel_id, true);
        store.save(e1.clone()).await.unwrap();
        store.save(e2.clone()).await.unwrap();
        store.save(e3.clone()).await.unwrap();

        let mut stream = store
            .stream(StreamParams {
                channel_type: ChannelType::Deployment,
                channel_id,
                starting_event_id: None,
            })
            .await;

        let mut ids = Vec::new();
        while let Some(item) = stream.next().await {
            ids.push(item.unwrap().id);
        }
        assert_eq!(ids, vec![e1.id, e2.id, e3.id]);
    }

    #[tokio::test]
    async fn resumes_strictly_after_cursor() {
        let store = InMemoryEventStore::new();
        let channel_id = Uuid::now_v7();
        let e1 = evt(channel_id, false);
        let e2 = evt(channel_id, false);
        let e3 = evt(channel_id, false);
        let e4 = evt(channel_id, true);
        for e in [&e1, &e2, &e3, &e4] {
            store.save(e.clone()).await.unwrap();
        }

        let mut stream = store
            .stream(StreamParams {
                channel_type: ChannelType::Deployment,
                channel_id,
                starting_event_id: Some(e2.id),
            })
            .await;

        let mut ids = Vec::new();
        while let Some(item) = stream.next().await {
            ids.push(item.unwrap().id);
        }
        assert_eq!(ids, vec![e3.id, e4.id]);
    }

    #[tokio::test]
    async fn cleanup_removes_only_events_before_threshold() {
        let store = InMemoryEventStore::new();
        let channel_id = Uuid::now_v7();
        let old = evt(channel_id, false);
        store.save(old).await.unwrap();

        let threshold = Utc::now() + chrono::Duration::seconds(1);
        let removed = store.cleanup(threshold).await.unwrap();
        assert_eq!(removed, 1);

        let fresh = evt(channel_id, true);
        store.save(fresh.clone()).await.unwrap();
        let removed = store
            .cleanup(Utc::now() - chrono::Duration::seconds(60))
            .await
            .unwrap();
        assert_eq!(removed, 0);
    }
}

//! SessionStore -- per-room conversation history.
//!
//! Rooms live in a `DashMap` keyed by room id, each behind its own async
//! mutex, so unrelated rooms never contend and two requests to the same room
//! append without losing each other's turns. A logical clock records the
//! last access of every room.
//!
//! Eviction is whole-room and happens in two cases:
//! - LRU: inserting a room that pushes the count above `max_rooms` drops the
//!   least recently accessed room.
//! - TTL (optional): a room idle for longer than `idle_ttl` is dropped on
//!   its next access or by [`SessionStore::evict_expired`].
//!
//! An evicted room is simply recreated empty on its next access.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use athena_types::config::SessionConfig;
use athena_types::error::SessionError;
use athena_types::session::{ConversationTurn, RoomSession};
use dashmap::DashMap;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

const MAX_ROOM_ID_LEN: usize = 128;

struct RoomSlot {
    session: Mutex<RoomSession>,
    last_access: AtomicU64,
    touched_ms: AtomicU64,
}

pub struct SessionStore {
    rooms: DashMap<String, Arc<RoomSlot>>,
    max_rooms: usize,
    max_history_turns: usize,
    idle_ttl: Option<Duration>,
    clock: AtomicU64,
    epoch: Instant,
    closed: AtomicBool,
}

impl SessionStore {
    pub fn new(max_rooms: usize, max_history_turns: usize, idle_ttl: Option<Duration>) -> Self {
        Self {
            rooms: DashMap::new(),
            max_rooms: max_rooms.max(1),
            max_history_turns,
            idle_ttl,
            clock: AtomicU64::new(0),
            epoch: Instant::now(),
            closed: AtomicBool::new(false),
        }
    }

    pub fn from_config(config: &SessionConfig) -> Self {
        let ttl = (config.idle_ttl_secs > 0).then(|| Duration::from_secs(config.idle_ttl_secs));
        Self::new(config.max_rooms, config.max_history_turns, ttl)
    }

    /// Snapshot of the room's session, creating it if absent.
    pub async fn get_or_create(&self, room_id: &str) -> Result<RoomSession, SessionError> {
        let slot = self.slot(room_id)?;
        let session = slot.session.lock().await;
        Ok(session.clone())
    }

    pub async fn append_turn(
        &self,
        room_id: &str,
        turn: ConversationTurn,
    ) -> Result<(), SessionError> {
        let slot = self.slot(room_id)?;
        slot.session.lock().await.push(turn);
        Ok(())
    }

    /// Append a user turn and its reply under one lock, so no other turn of
    /// the room can land between them.
    pub async fn append_exchange(
        &self,
        room_id: &str,
        user: ConversationTurn,
        assistant: ConversationTurn,
    ) -> Result<(), SessionError> {
        let slot = self.slot(room_id)?;
        let mut session = slot.session.lock().await;
        session.push(user);
        session.push(assistant);
        Ok(())
    }

    /// The most recent `limit` turns, oldest first. Unknown rooms have no
    /// history and are not created.
    pub async fn get_history(
        &self,
        room_id: &str,
        limit: usize,
    ) -> Result<Vec<ConversationTurn>, SessionError> {
        self.check_open()?;
        validate_room_id(room_id)?;

        let Some(slot) = self.live_slot(room_id) else {
            return Ok(Vec::new());
        };
        self.touch(&slot);
        let session = slot.session.lock().await;
        Ok(session.recent(limit))
    }

    pub fn remove(&self, room_id: &str) -> bool {
        self.rooms.remove(room_id).is_some()
    }

    pub fn clear(&self) {
        self.rooms.clear();
    }

    /// Drop every room idle longer than the TTL. Returns how many were dropped.
    pub fn evict_expired(&self) -> usize {
        let Some(ttl) = self.idle_ttl else {
            return 0;
        };
        let before = self.rooms.len();
        let now = self.now_ms();
        self.rooms
            .retain(|_, slot| !is_expired(slot, now, ttl));
        let evicted = before.saturating_sub(self.rooms.len());
        if evicted > 0 {
            debug!(evicted, "Evicted idle rooms");
        }
        evicted
    }

    /// Refuse all further operations with [`SessionError::Closed`].
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.rooms.clear();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn contains(&self, room_id: &str) -> bool {
        self.live_slot(room_id).is_some()
    }

    pub fn max_history_turns(&self) -> usize {
        self.max_history_turns
    }

    /// Existing or fresh slot for `room_id`, marked as just accessed.
    fn slot(&self, room_id: &str) -> Result<Arc<RoomSlot>, SessionError> {
        self.check_open()?;
        validate_room_id(room_id)?;

        if let Some(slot) = self.live_slot(room_id) {
            self.touch(&slot);
            return Ok(slot);
        }

        let slot = Arc::clone(
            self.rooms
                .entry(room_id.to_string())
                .or_insert_with(|| {
                    Arc::new(RoomSlot {
                        session: Mutex::new(RoomSession::new(room_id, self.max_history_turns)),
                        last_access: AtomicU64::new(0),
                        touched_ms: AtomicU64::new(0),
                    })
                })
                .value(),
        );
        self.touch(&slot);
        self.evict_lru();
        Ok(slot)
    }

    /// The room's slot unless it is absent or has outlived the TTL.
    fn live_slot(&self, room_id: &str) -> Option<Arc<RoomSlot>> {
        let slot = self.rooms.get(room_id).map(|r| Arc::clone(r.value()))?;
        if let Some(ttl) = self.idle_ttl {
            if is_expired(&slot, self.now_ms(), ttl) {
                self.rooms.remove_if(room_id, |_, s| Arc::ptr_eq(s, &slot));
                debug!(room_id, "Room expired after idle TTL");
                return None;
            }
        }
        Some(slot)
    }

    fn evict_lru(&self) {
        while self.rooms.len() > self.max_rooms {
            let oldest = self
                .rooms
                .iter()
                .map(|r| (r.key().clone(), r.value().last_access.load(Ordering::SeqCst)))
                .min_by_key(|(_, tick)| *tick);

            let Some((room_id, tick)) = oldest else {
                return;
            };
            let removed = self
                .rooms
                .remove_if(&room_id, |_, s| s.last_access.load(Ordering::SeqCst) == tick);
            if removed.is_some() {
                debug!(room_id = %room_id, max_rooms = self.max_rooms, "Evicted least recently used room");
            }
        }
    }

    fn touch(&self, slot: &RoomSlot) {
        let tick = self.clock.fetch_add(1, Ordering::SeqCst) + 1;
        slot.last_access.store(tick, Ordering::SeqCst);
        slot.touched_ms.store(self.now_ms(), Ordering::SeqCst);
    }

    fn now_ms(&self) -> u64 {
        self.epoch.elapsed().as_millis() as u64
    }

    fn check_open(&self) -> Result<(), SessionError> {
        if self.is_closed() {
            return Err(SessionError::Closed);
        }
        Ok(())
    }
}

fn is_expired(slot: &RoomSlot, now_ms: u64, ttl: Duration) -> bool {
    now_ms.saturating_sub(slot.touched_ms.load(Ordering::SeqCst)) > ttl.as_millis() as u64
}

fn validate_room_id(room_id: &str) -> Result<(), SessionError> {
    if room_id.trim().is_empty()
        || room_id.len() > MAX_ROOM_ID_LEN
        || room_id.chars().any(char::is_control)
    {
        return Err(SessionError::InvalidRoomId(room_id.chars().take(MAX_ROOM_ID_LEN).collect()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(max_rooms: usize) -> SessionStore {
        SessionStore::new(max_rooms, 20, None)
    }

    #[tokio::test]
    async fn test_get_or_create_starts_empty() {
        let store = store(8);
        let session = store.get_or_create("room-1").await.unwrap();
        assert_eq!(session.room_id, "room-1");
        assert!(session.is_empty());
        assert_eq!(store.room_count(), 1);
    }

    #[tokio::test]
    async fn test_append_and_get_history() {
        let store = store(8);
        store.append_turn("r", ConversationTurn::user("What is a list?")).await.unwrap();
        store.append_turn("r", ConversationTurn::assistant("A list is...")).await.unwrap();

        let history = store.get_history("r", 10).await.unwrap();
        let texts: Vec<_> = history.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["What is a list?", "A list is..."]);

        let last = store.get_history("r", 1).await.unwrap();
        assert_eq!(last[0].text, "A list is...");
    }

    #[tokio::test]
    async fn test_history_is_capped_fifo() {
        let store = SessionStore::new(8, 4, None);
        for i in 0..10 {
            store.append_turn("r", ConversationTurn::user(format!("t{i}"))).await.unwrap();
        }
        let history = store.get_history("r", 100).await.unwrap();
        let texts: Vec<_> = history.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["t6", "t7", "t8", "t9"]);
    }

    #[tokio::test]
    async fn test_unknown_room_history_is_empty_and_not_created() {
        let store = store(8);
        assert!(store.get_history("ghost", 5).await.unwrap().is_empty());
        assert_eq!(store.room_count(), 0);
    }

    #[tokio::test]
    async fn test_lru_evicts_least_recently_used_room() {
        let store = store(2);
        store.append_turn("a", ConversationTurn::user("a1")).await.unwrap();
        store.append_turn("b", ConversationTurn::user("b1")).await.unwrap();
        // Touch "a" so "b" becomes least recently used.
        store.get_history("a", 1).await.unwrap();

        store.append_turn("c", ConversationTurn::user("c1")).await.unwrap();

        assert_eq!(store.room_count(), 2);
        assert!(store.contains("a"));
        assert!(!store.contains("b"));
        assert!(store.contains("c"));
    }

    #[tokio::test]
    async fn test_evicted_room_comes_back_empty() {
        let store = store(1);
        for i in 0..6 {
            store.append_turn("old", ConversationTurn::user(format!("t{i}"))).await.unwrap();
        }
        store.get_or_create("new").await.unwrap();
        assert!(!store.contains("old"));

        let session = store.get_or_create("old").await.unwrap();
        assert!(session.is_empty());
        assert!(store.get_history("old", 10).await.unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_rooms_expire_after_ttl() {
        let store = SessionStore::new(8, 20, Some(Duration::from_secs(60)));
        store.append_turn("idle", ConversationTurn::user("hello")).await.unwrap();
        store.append_turn("busy", ConversationTurn::user("hello")).await.unwrap();

        tokio::time::advance(Duration::from_secs(45)).await;
        store.get_history("busy", 1).await.unwrap();
        tokio::time::advance(Duration::from_secs(30)).await;

        assert!(store.get_history("idle", 10).await.unwrap().is_empty());
        assert!(!store.contains("idle"));
        assert_eq!(store.get_history("busy", 10).await.unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_evict_expired_sweeps_idle_rooms() {
        let store = SessionStore::new(8, 20, Some(Duration::from_secs(10)));
        for room in ["a", "b", "c"] {
            store.get_or_create(room).await.unwrap();
        }
        tokio::time::advance(Duration::from_secs(11)).await;
        store.get_or_create("d").await.unwrap();

        assert_eq!(store.evict_expired(), 3);
        assert_eq!(store.room_count(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_exchanges_to_one_room_are_all_kept_and_paired() {
        let store = Arc::new(SessionStore::new(8, 1000, None));
        let mut tasks = Vec::new();
        for i in 0..50 {
            let store = Arc::clone(&store);
            tasks.push(tokio::spawn(async move {
                store
                    .append_exchange(
                        "shared",
                        ConversationTurn::user(format!("q{i}")),
                        ConversationTurn::assistant(format!("a{i}")),
                    )
                    .await
                    .unwrap();
            }));
        }
        futures_util::future::join_all(tasks).await;

        let history = store.get_history("shared", 1000).await.unwrap();
        assert_eq!(history.len(), 100);
        for pair in history.chunks(2) {
            assert_eq!(&pair[0].text[1..], &pair[1].text[1..]);
            assert!(pair[0].text.starts_with('q'));
            assert!(pair[1].text.starts_with('a'));
        }
    }

    #[tokio::test]
    async fn test_rooms_are_independent() {
        let store = store(8);
        store.append_turn("x", ConversationTurn::user("only x")).await.unwrap();
        assert!(store.get_history("y", 10).await.unwrap().is_empty());
        assert_eq!(store.get_history("x", 10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_room_ids_are_rejected() {
        let store = store(8);
        for bad in ["", "   ", "tab\there"] {
            assert!(matches!(
                store.get_or_create(bad).await,
                Err(SessionError::InvalidRoomId(_))
            ));
        }
        let long = "r".repeat(MAX_ROOM_ID_LEN + 1);
        assert!(store.get_or_create(&long).await.is_err());
    }

    #[tokio::test]
    async fn test_closed_store_refuses_operations() {
        let store = store(8);
        store.get_or_create("r").await.unwrap();
        store.close();

        assert!(store.is_closed());
        assert!(matches!(store.get_or_create("r").await, Err(SessionError::Closed)));
        assert!(matches!(store.get_history("r", 1).await, Err(SessionError::Closed)));
        assert!(matches!(
            store.append_turn("r", ConversationTurn::user("x")).await,
            Err(SessionError::Closed)
        ));
    }

    #[tokio::test]
    async fn test_remove_and_clear() {
        let store = store(8);
        store.get_or_create("a").await.unwrap();
        store.get_or_create("b").await.unwrap();

        assert!(store.remove("a"));
        assert!(!store.remove("a"));
        assert_eq!(store.room_count(), 1);

        store.clear();
        assert_eq!(store.room_count(), 0);
    }

    #[test]
    fn test_from_config_ttl_zero_disables() {
        let store = SessionStore::from_config(&SessionConfig::default());
        assert!(store.idle_ttl.is_none());
        assert_eq!(store.max_history_turns(), 20);
    }
}

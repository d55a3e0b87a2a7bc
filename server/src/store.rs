//! Durable-storage seam: credits, statistics, and the game event log.

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use blackjack_shared::UserId;
use tokio::sync::RwLock;

/// One durable record per state-changing game action, keyed by the
/// group's internal id so replays survive group-code reuse.
#[derive(Clone, Debug)]
pub struct EventRecord {
    pub user_id: UserId,
    pub group_id: String,
    pub action: String,
    pub result: String,
    pub payload: String,
    pub round: u32,
}

impl EventRecord {
    /// Round 0 covers bets placed before the first deal; recorded as
    /// round 1.
    pub fn new(
        user_id: UserId,
        group_id: String,
        action: &str,
        result: String,
        payload: String,
        round: u32,
    ) -> Self {
        EventRecord {
            user_id,
            group_id,
            action: action.to_string(),
            result,
            payload,
            round: round.max(1),
        }
    }
}

#[async_trait]
pub trait GameStore: Send + Sync {
    async fn retrieve_credits(&self, user: &UserId) -> Result<u32>;
    async fn update_credits(&self, user: &UserId, credits: u32) -> Result<()>;
    async fn update_statistics(&self, user: &UserId, earnings: u32, losses: u32) -> Result<()>;
    async fn save_event(&self, record: EventRecord) -> Result<()>;
}

#[derive(Default)]
struct MemoryInner {
    credits: HashMap<UserId, u32>,
    stats: HashMap<UserId, (u64, u64)>,
    events: Vec<EventRecord>,
}

/// In-memory store. Keeps the process runnable without external storage;
/// a deployment would back [`GameStore`] with a database instead.
pub struct MemoryStore {
    starting_credits: u32,
    inner: RwLock<MemoryInner>,
}

impl MemoryStore {
    pub fn new(starting_credits: u32) -> Self {
        MemoryStore {
            starting_credits,
            inner: RwLock::new(MemoryInner::default()),
        }
    }

    pub async fn statistics(&self, user: &UserId) -> (u64, u64) {
        self.inner
            .read()
            .await
            .stats
            .get(user)
            .copied()
            .unwrap_or((0, 0))
    }

    pub async fn events(&self) -> Vec<EventRecord> {
        self.inner.read().await.events.clone()
    }
}

#[async_trait]
impl GameStore for MemoryStore {
    async fn retrieve_credits(&self, user: &UserId) -> Result<u32> {
        let inner = self.inner.read().await;
        Ok(inner
            .credits
            .get(user)
            .copied()
            .unwrap_or(self.starting_credits))
    }

    async fn update_credits(&self, user: &UserId, credits: u32) -> Result<()> {
        self.inner
            .write()
            .await
            .credits
            .insert(user.clone(), credits);
        Ok(())
    }

    async fn update_statistics(&self, user: &UserId, earnings: u32, losses: u32) -> Result<()> {
        let mut inner = self.inner.write().await;
        let entry = inner.stats.entry(user.clone()).or_insert((0, 0));
        entry.0 += u64::from(earnings);
        entry.1 += u64::from(losses);
        Ok(())
    }

    async fn save_event(&self, record: EventRecord) -> Result<()> {
        self.inner.write().await.events.push(record);
        Ok(())
    }
}

/// Persist an event, logging and swallowing failures so gameplay never
/// blocks on the recorder.
pub async fn record_event(store: &dyn GameStore, record: EventRecord) {
    if let Err(e) = store.save_event(record).await {
        tracing::warn!(error = %e, "failed to persist game event");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unknown_player_gets_starting_credits() {
        let store = MemoryStore::new(1000);
        let alice = UserId::from("alice");
        assert_eq!(store.retrieve_credits(&alice).await.unwrap(), 1000);
        store.update_credits(&alice, 250).await.unwrap();
        assert_eq!(store.retrieve_credits(&alice).await.unwrap(), 250);
    }

    #[tokio::test]
    async fn statistics_accumulate() {
        let store = MemoryStore::new(1000);
        let alice = UserId::from("alice");
        store.update_statistics(&alice, 150, 0).await.unwrap();
        store.update_statistics(&alice, 0, 50).await.unwrap();
        assert_eq!(store.statistics(&alice).await, (150, 50));
    }

    #[test]
    fn round_zero_is_recorded_as_one() {
        let rec = EventRecord::new(
            UserId::from("alice"),
            "gid".to_string(),
            "BET_PLACED",
            "50".to_string(),
            String::new(),
            0,
        );
        assert_eq!(rec.round, 1);
        let rec = EventRecord::new(
            UserId::from("alice"),
            "gid".to_string(),
            "HIT",
            String::new(),
            String::new(),
            3,
        );
        assert_eq!(rec.round, 3);
    }
}

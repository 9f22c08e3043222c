//! Shared conversation registry.
//!
//! Locking:
//! - the id → conversation map sits behind a `RwLock`, taken only to look up
//!   (read, fast path) or create (write, slow path) a conversation;
//! - each conversation has its own `Mutex`, so appends on different ids never
//!   contend and appends on the same id are serialized.

use std::{
    collections::{HashMap, VecDeque},
    num::NonZeroUsize,
    sync::Arc,
};

use ai_llm_service::Turn;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

use crate::{conversation::Conversation, errors::MemoryError};

/// Cloneable reference to one live conversation.
#[derive(Debug, Clone)]
pub struct ConversationHandle {
    id: Arc<str>,
    capacity: usize,
    inner: Arc<Mutex<Conversation>>,
}

impl ConversationHandle {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Capacity fixed at creation.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub async fn append(&self, turn: Turn) {
        let evicted = self.inner.lock().await.append(turn);
        if evicted > 0 {
            debug!(conversation_id = %self.id, evicted, "evicted oldest turns");
        }
    }

    /// Appends `turns` in order under one lock acquisition, so no other
    /// writer can interleave between them.
    pub async fn append_all(&self, turns: impl IntoIterator<Item = Turn>) {
        let mut conv = self.inner.lock().await;
        let evicted: usize = turns.into_iter().map(|t| conv.append(t)).sum();
        if evicted > 0 {
            debug!(conversation_id = %self.id, evicted, "evicted oldest turns");
        }
    }

    pub async fn snapshot(&self) -> Vec<Turn> {
        self.inner.lock().await.snapshot()
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.is_empty()
    }
}

#[derive(Default)]
struct Registry {
    conversations: HashMap<String, ConversationHandle>,
    /// Creation order, used by the global cap.
    order: VecDeque<String>,
}

/// Process-wide conversation memory.
#[derive(Default)]
pub struct ConversationStore {
    registry: RwLock<Registry>,
    max_conversations: Option<NonZeroUsize>,
}

impl ConversationStore {
    /// Unbounded store: conversations live until the process exits.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store holding at most `max` conversations; creating one more drops the
    /// oldest-created. Handles already given out stay usable but detached.
    /// `None` is unbounded.
    pub fn with_max_conversations(max: Option<NonZeroUsize>) -> Self {
        Self {
            registry: RwLock::new(Registry::default()),
            max_conversations: max,
        }
    }

    /// Returns the conversation for `id`, creating it with `capacity` on first
    /// use. Later calls ignore `capacity`.
    ///
    /// # Errors
    /// [`MemoryError::InvalidCapacity`] if `capacity == 0`.
    pub async fn get_or_create(
        &self,
        id: &str,
        capacity: usize,
    ) -> Result<ConversationHandle, MemoryError> {
        if capacity == 0 {
            return Err(MemoryError::InvalidCapacity(capacity));
        }

        // Fast path: existing conversation.
        if let Some(handle) = self.registry.read().await.conversations.get(id) {
            return Ok(handle.clone());
        }

        // Slow path: another task may have created it in between.
        let mut registry = self.registry.write().await;
        if let Some(handle) = registry.conversations.get(id) {
            return Ok(handle.clone());
        }

        let handle = ConversationHandle {
            id: Arc::from(id),
            capacity,
            inner: Arc::new(Mutex::new(Conversation::new(id, capacity)?)),
        };
        registry.conversations.insert(id.to_string(), handle.clone());
        registry.order.push_back(id.to_string());

        if let Some(max) = self.max_conversations.map(NonZeroUsize::get) {
            while registry.conversations.len() > max {
                let Some(oldest) = registry.order.pop_front() else {
                    break;
                };
                registry.conversations.remove(&oldest);
                info!(conversation_id = %oldest, max, "conversation evicted by global cap");
            }
        }

        debug!(conversation_id = %id, capacity, "conversation created");
        Ok(handle)
    }

    /// Looks up an existing conversation without creating one.
    pub async fn get(&self, id: &str) -> Option<ConversationHandle> {
        self.registry.read().await.conversations.get(id).cloned()
    }

    /// Appends `turn` to `conversation`. See [`ConversationHandle::append`].
    pub async fn append(&self, conversation: &ConversationHandle, turn: Turn) {
        conversation.append(turn).await;
    }

    /// Owned copy of `conversation`'s turns, oldest first.
    pub async fn snapshot(&self, conversation: &ConversationHandle) -> Vec<Turn> {
        conversation.snapshot().await
    }

    /// Number of live conversations.
    pub async fn len(&self) -> usize {
        self.registry.read().await.conversations.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use rand::{Rng, SeedableRng, rngs::StdRng};

    use super::*;

    #[tokio::test]
    async fn get_or_create_is_idempotent_and_keeps_first_capacity() {
        let store = ConversationStore::new();

        let a = store.get_or_create("sess", 2).await.unwrap();
        let b = store.get_or_create("sess", 10).await.unwrap();

        assert!(Arc::ptr_eq(&a.inner, &b.inner));
        assert_eq!(b.capacity(), 2);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn zero_capacity_is_rejected() {
        let store = ConversationStore::new();
        assert_eq!(
            store.get_or_create("x", 0).await.unwrap_err(),
            MemoryError::InvalidCapacity(0)
        );
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn sess1_keeps_last_two_turns() {
        let store = ConversationStore::new();
        let conv = store.get_or_create("sess1", 2).await.unwrap();

        let t1 = Turn::user("T1");
        let t2 = Turn::assistant("T2");
        let t3 = Turn::user("T3");
        store.append(&conv, t1).await;
        store.append(&conv, t2.clone()).await;
        store.append(&conv, t3.clone()).await;

        assert_eq!(store.snapshot(&conv).await, vec![t2, t3]);
    }

    #[tokio::test]
    async fn conversations_are_independent() {
        let store = ConversationStore::new();
        let a = store.get_or_create("a", 5).await.unwrap();
        let b = store.get_or_create("b", 5).await.unwrap();

        a.append(Turn::user("only in a")).await;
        assert_eq!(a.len().await, 1);
        assert!(b.is_empty().await);
        assert!(store.get("c").await.is_none());
    }

    #[tokio::test]
    async fn append_all_keeps_exchange_adjacent() {
        let store = ConversationStore::new();
        let conv = store.get_or_create("x", 3).await.unwrap();
        conv.append(Turn::user("old")).await;
        conv.append_all([Turn::user("q"), Turn::assistant("a"), Turn::user("q2")])
            .await;

        assert_eq!(
            conv.snapshot().await,
            vec![Turn::user("q"), Turn::assistant("a"), Turn::user("q2")]
        );
    }

    #[tokio::test]
    async fn global_cap_evicts_oldest_created() {
        let store = ConversationStore::with_max_conversations(NonZeroUsize::new(2));
        let first = store.get_or_create("1", 4).await.unwrap();
        store.get_or_create("2", 4).await.unwrap();
        store.get_or_create("3", 4).await.unwrap();

        assert_eq!(store.len().await, 2);
        assert!(store.get("1").await.is_none());
        assert!(store.get("3").await.is_some());

        // Detached handle keeps working.
        first.append(Turn::user("late")).await;
        assert_eq!(first.len().await, 1);

        // Recreated id starts empty.
        let again = store.get_or_create("1", 4).await.unwrap();
        assert!(again.is_empty().await);
    }

    #[tokio::test]
    async fn cap_of_one_keeps_only_latest() {
        let store = ConversationStore::with_max_conversations(Some(NonZeroUsize::MIN));
        store.get_or_create("a", 2).await.unwrap();
        store.get_or_create("b", 2).await.unwrap();

        assert_eq!(store.len().await, 1);
        assert!(store.get("a").await.is_none());
        assert!(store.get("b").await.is_some());
    }

    /// Runs `writers` tasks that each append `per_writer` tagged turns with
    /// random pauses, all against the same conversation id.
    async fn concurrent_appends(seed: u64, writers: usize, per_writer: usize, capacity: usize) {
        let store = Arc::new(ConversationStore::new());
        let mut rng = StdRng::seed_from_u64(seed);

        let mut tasks = Vec::with_capacity(writers);
        for w in 0..writers {
            let pauses: Vec<u64> = (0..per_writer).map(|_| rng.random_range(0..3)).collect();
            let store = Arc::clone(&store);
            tasks.push(tokio::spawn(async move {
                for (i, pause) in pauses.into_iter().enumerate() {
                    let conv = store.get_or_create("shared", capacity).await.unwrap();
                    if pause > 0 {
                        tokio::time::sleep(Duration::from_millis(pause)).await;
                    } else {
                        tokio::task::yield_now().await;
                    }
                    conv.append(Turn::user(format!("{w}:{i}"))).await;
                }
            }));
        }
        for t in tasks {
            t.await.unwrap();
        }

        let conv = store.get("shared").await.unwrap();
        let snap = conv.snapshot().await;
        let total = writers * per_writer;
        assert_eq!(snap.len(), total.min(capacity), "seed {seed}");

        // Per-writer order is preserved in whatever survived.
        let mut last_seen = vec![None::<usize>; writers];
        for turn in &snap {
            let (w, i) = turn.text().split_once(':').unwrap();
            let (w, i): (usize, usize) = (w.parse().unwrap(), i.parse().unwrap());
            if let Some(prev) = last_seen[w] {
                assert!(i > prev, "seed {seed}: writer {w} out of order");
            }
            last_seen[w] = Some(i);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_appends_never_lose_turns() {
        for seed in 0..8 {
            concurrent_appends(seed, 8, 25, 1_000).await;
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_appends_never_exceed_capacity() {
        for seed in 0..8 {
            concurrent_appends(seed, 8, 25, 7).await;
        }
    }
}

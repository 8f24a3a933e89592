use {
    anyhow::Result,
    async_trait::async_trait,
    herald_common::{ChatId, UserId},
    std::{
        collections::{HashMap, HashSet},
        sync::{Mutex, RwLock},
    },
};

use crate::access::AccessLevel;

/// Persistent rank lookup.
#[async_trait]
pub trait AccessStore: Send + Sync {
    /// Rank of `user` in `chat`; banned users resolve to [`AccessLevel::Banned`].
    async fn rank(&self, user: UserId, chat: ChatId) -> Result<AccessLevel>;
}

/// Per-(chat, user) pending command marker.
#[async_trait]
pub trait CommandWaitingStore: Send + Sync {
    async fn get(&self, chat: ChatId, user: UserId) -> Result<Option<String>>;
    async fn set(&self, chat: ChatId, user: UserId, command: &str) -> Result<()>;
    async fn clear(&self, chat: ChatId, user: UserId) -> Result<()>;

    /// Read and clear in one step. Two concurrent callers for the same key
    /// never both observe the marker.
    async fn take(&self, chat: ChatId, user: UserId) -> Result<Option<String>>;
}

/// [`AccessStore`] kept in process memory, seeded from configuration.
pub struct InMemoryAccessStore {
    default_level: AccessLevel,
    global: RwLock<HashMap<UserId, AccessLevel>>,
    per_chat: RwLock<HashMap<(ChatId, UserId), AccessLevel>>,
    banned: RwLock<HashSet<UserId>>,
}

impl InMemoryAccessStore {
    pub fn new(default_level: AccessLevel) -> Self {
        Self {
            default_level,
            global: RwLock::default(),
            per_chat: RwLock::default(),
            banned: RwLock::default(),
        }
    }

    /// Rank a user everywhere.
    pub fn set_level(&self, user: UserId, level: AccessLevel) {
        let mut global = self.global.write().unwrap_or_else(|e| e.into_inner());
        global.insert(user, level);
    }

    /// Rank a user in one chat; overrides the global rank there.
    pub fn set_chat_level(&self, chat: ChatId, user: UserId, level: AccessLevel) {
        let mut per_chat = self.per_chat.write().unwrap_or_else(|e| e.into_inner());
        per_chat.insert((chat, user), level);
    }

    pub fn ban(&self, user: UserId) {
        let mut banned = self.banned.write().unwrap_or_else(|e| e.into_inner());
        banned.insert(user);
    }

    fn lookup(&self, user: UserId, chat: ChatId) -> AccessLevel {
        if self
            .banned
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains(&user)
        {
            return AccessLevel::Banned;
        }
        if let Some(level) = self
            .per_chat
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&(chat, user))
        {
            return *level;
        }
        self.global
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&user)
            .copied()
            .unwrap_or(self.default_level)
    }
}

impl Default for InMemoryAccessStore {
    fn default() -> Self {
        Self::new(AccessLevel::default())
    }
}

#[async_trait]
impl AccessStore for InMemoryAccessStore {
    async fn rank(&self, user: UserId, chat: ChatId) -> Result<AccessLevel> {
        Ok(self.lookup(user, chat))
    }
}

/// [`CommandWaitingStore`] kept in process memory.
#[derive(Default)]
pub struct InMemoryWaitingStore {
    markers: Mutex<HashMap<(ChatId, UserId), String>>,
}

impl InMemoryWaitingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.markers.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl CommandWaitingStore for InMemoryWaitingStore {
    async fn get(&self, chat: ChatId, user: UserId) -> Result<Option<String>> {
        let markers = self.markers.lock().unwrap_or_else(|e| e.into_inner());
        Ok(markers.get(&(chat, user)).cloned())
    }

    async fn set(&self, chat: ChatId, user: UserId, command: &str) -> Result<()> {
        let mut markers = self.markers.lock().unwrap_or_else(|e| e.into_inner());
        markers.insert((chat, user), command.to_string());
        Ok(())
    }

    async fn clear(&self, chat: ChatId, user: UserId) -> Result<()> {
        let mut markers = self.markers.lock().unwrap_or_else(|e| e.into_inner());
        markers.remove(&(chat, user));
        Ok(())
    }

    async fn take(&self, chat: ChatId, user: UserId) -> Result<Option<String>> {
        let mut markers = self.markers.lock().unwrap_or_else(|e| e.into_inner());
        Ok(markers.remove(&(chat, user)))
    }
}

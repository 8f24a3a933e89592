use {
    herald_channels::{AccessLevel, AccessStore},
    herald_common::{ChatId, UserId},
    std::sync::Arc,
    tracing::warn,
};

/// Ranks senders through an [`AccessStore`].
#[derive(Clone)]
pub struct AccessResolver {
    store: Arc<dyn AccessStore>,
    /// Rank used when the store cannot answer.
    fallback: AccessLevel,
}

impl AccessResolver {
    pub fn new(store: Arc<dyn AccessStore>) -> Self {
        Self {
            store,
            fallback: AccessLevel::Newcomer,
        }
    }

    pub async fn rank(&self, user: UserId, chat: ChatId) -> AccessLevel {
        match self.store.rank(user, chat).await {
            Ok(level) => level,
            Err(e) => {
                warn!(%user, %chat, error = %e, fallback = %self.fallback, "access store lookup failed");
                self.fallback
            },
        }
    }

    pub fn allowed(user_rank: AccessLevel, required: AccessLevel) -> bool {
        user_rank.permits(required)
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, async_trait::async_trait, herald_channels::InMemoryAccessStore};

    struct BrokenStore;

    #[async_trait]
    impl AccessStore for BrokenStore {
        async fn rank(&self, _user: UserId, _chat: ChatId) -> anyhow::Result<AccessLevel> {
            anyhow::bail!("database unavailable")
        }
    }

    #[tokio::test]
    async fn ranks_from_store() {
        let store = InMemoryAccessStore::default();
        store.set_level(UserId(1), AccessLevel::Admin);
        store.ban(UserId(2));
        let resolver = AccessResolver::new(Arc::new(store));

        assert_eq!(resolver.rank(UserId(1), ChatId(5)).await, AccessLevel::Admin);
        assert_eq!(resolver.rank(UserId(2), ChatId(5)).await, AccessLevel::Banned);
        assert_eq!(resolver.rank(UserId(3), ChatId(5)).await, AccessLevel::Newcomer);
    }

    #[tokio::test]
    async fn store_failure_uses_fallback() {
        let resolver = AccessResolver::new(Arc::new(BrokenStore));
        assert_eq!(resolver.rank(UserId(1), ChatId(1)).await, AccessLevel::Newcomer);
    }

    #[test]
    fn allowed_compares_weights() {
        assert!(AccessResolver::allowed(AccessLevel::Moderator, AccessLevel::Trusted));
        assert!(!AccessResolver::allowed(AccessLevel::Familiar, AccessLevel::Trusted));
    }
}

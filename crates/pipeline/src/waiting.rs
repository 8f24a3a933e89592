//! Command-waiting marker: routes a user's next message in a chat straight
//! to the command that asked for it.

use {
    herald_channels::CommandWaitingStore,
    herald_common::{ChatId, UserId},
    std::sync::Arc,
    tracing::{debug, warn},
};

#[derive(Clone)]
pub struct CommandWaiting {
    store: Arc<dyn CommandWaitingStore>,
}

impl CommandWaiting {
    pub fn new(store: Arc<dyn CommandWaitingStore>) -> Self {
        Self { store }
    }

    /// Take the pending command for (chat, user), clearing it.
    ///
    /// The marker is gone after this call whatever the caller does with the
    /// name, so a marker is used at most once.
    pub async fn consume(&self, chat: ChatId, user: UserId) -> Option<String> {
        match self.store.take(chat, user).await {
            Ok(Some(command)) => {
                debug!(%chat, %user, command, "resuming waiting command");
                Some(command)
            },
            Ok(None) => None,
            Err(e) => {
                warn!(%chat, %user, error = %e, "failed to read command-waiting marker");
                None
            },
        }
    }

    /// Route the next message from (chat, user) to `command`.
    pub async fn mark(&self, chat: ChatId, user: UserId, command: &str) -> anyhow::Result<()> {
        debug!(%chat, %user, command, "waiting for next message");
        self.store.set(chat, user, command).await
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, herald_channels::InMemoryWaitingStore};

    #[tokio::test]
    async fn marker_is_consumed_at_most_once() {
        let waiting = CommandWaiting::new(Arc::new(InMemoryWaitingStore::new()));
        let (chat, user) = (ChatId(3), UserId(4));
        waiting.mark(chat, user, "calories").await.unwrap();

        assert_eq!(waiting.consume(chat, user).await.as_deref(), Some("calories"));
        assert_eq!(waiting.consume(chat, user).await, None);
    }
}

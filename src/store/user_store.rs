// =============================================================================
// UserStore — user preferences repository
// =============================================================================

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::types::UserPreferences;

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn list_active(&self) -> anyhow::Result<Vec<UserPreferences>>;
    async fn preferences(&self, user_id: &str) -> anyhow::Result<Option<UserPreferences>>;
}

#[derive(Default)]
pub struct InMemoryUserStore {
    users: RwLock<Vec<UserPreferences>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_users(users: Vec<UserPreferences>) -> Self {
        Self {
            users: RwLock::new(users),
        }
    }

    pub fn add(&self, user: UserPreferences) {
        self.users.write().push(user);
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn list_active(&self) -> anyhow::Result<Vec<UserPreferences>> {
        Ok(self.users.read().clone())
    }

    async fn preferences(&self, user_id: &str) -> anyhow::Result<Option<UserPreferences>> {
        Ok(self.users.read().iter().find(|u| u.user_id == user_id).cloned())
    }
}

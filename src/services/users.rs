//! Store User Service
//!
//! In-memory stand-in for the host platform's user and user-meta
//! storage, reduced to the operations the sync jobs need.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::models::StoreUser;

/// User store
pub struct UserService {
    users: Arc<RwLock<HashMap<u64, StoreUser>>>,
}

impl UserService {
    pub fn new() -> Self {
        Self {
            users: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn upsert(&self, user: StoreUser) {
        let mut users = self.users.write().await;
        users.insert(user.id, user);
    }

    pub async fn get(&self, id: u64) -> Option<StoreUser> {
        let users = self.users.read().await;
        users.get(&id).cloned()
    }

    /// Look a user up by email, case-insensitively.
    pub async fn find_by_email(&self, email: &str) -> Option<StoreUser> {
        let users = self.users.read().await;
        let needle = email.to_lowercase();
        users
            .values()
            .find(|user| user.email.to_lowercase() == needle)
            .cloned()
    }

    /// All users with the newsletter flag set.
    pub async fn subscribed(&self) -> Vec<StoreUser> {
        let users = self.users.read().await;
        let mut subscribed: Vec<_> = users
            .values()
            .filter(|user| user.newsletter)
            .cloned()
            .collect();
        subscribed.sort_by_key(|user| user.id);
        subscribed
    }

    /// Set a user's newsletter flag. Returns false when unknown.
    pub async fn set_newsletter(&self, id: u64, subscribed: bool) -> bool {
        let mut users = self.users.write().await;
        match users.get_mut(&id) {
            Some(user) => {
                user.newsletter = subscribed;
                true
            }
            None => false,
        }
    }

    pub async fn len(&self) -> usize {
        let users = self.users.read().await;
        users.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for UserService {
    fn default() -> Self {
        Self::new()
    }
}

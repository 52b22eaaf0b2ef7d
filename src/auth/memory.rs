//! In-memory [`UserStore`] for unit and HTTP tests.
//!
//! A single mutex covers the email index and both tables, so the
//! uniqueness check and the insert are one atomic step, like the unique
//! constraint in Postgres.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::auth::repo::UserStore;
use crate::auth::repo_types::{Account, Profile, StoreError};

#[derive(Default)]
struct Tables {
    accounts: HashMap<Uuid, Account>,
    by_email: HashMap<String, Uuid>,
    profiles: HashMap<Uuid, Profile>,
}

#[derive(Default)]
pub struct MemoryUserStore {
    tables: Mutex<Tables>,
    calls: AtomicUsize,
    fail_all: AtomicBool,
    fail_touch: AtomicBool,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of store operations invoked so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn fail_all(&self, on: bool) {
        self.fail_all.store(on, Ordering::SeqCst);
    }

    pub fn fail_touch(&self, on: bool) {
        self.fail_touch.store(on, Ordering::SeqCst);
    }

    pub async fn account_count(&self) -> usize {
        self.tables.lock().await.accounts.len()
    }

    pub async fn get(&self, id: Uuid) -> Option<Account> {
        self.tables.lock().await.accounts.get(&id).cloned()
    }

    pub async fn profile(&self, id: Uuid) -> Option<Profile> {
        self.tables.lock().await.profiles.get(&id).cloned()
    }

    fn enter(&self) -> Result<(), StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_all.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("connection refused".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        self.enter()?;
        let t = self.tables.lock().await;
        Ok(t.by_email.get(email).and_then(|id| t.accounts.get(id)).cloned())
    }

    async fn create(
        &self,
        name: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<(Account, Profile), StoreError> {
        self.enter()?;
        let mut t = self.tables.lock().await;
        if t.by_email.contains_key(email) {
            return Err(StoreError::AlreadyExists);
        }
        let now = OffsetDateTime::now_utc();
        let account = Account {
            id: Uuid::new_v4(),
            name: name.to_owned(),
            email: email.to_owned(),
            password_hash: password_hash.to_owned(),
            created_at: now,
            updated_at: now,
            last_login_at: None,
            is_active: true,
        };
        let profile = Profile {
            user_id: account.id,
            bio: None,
            profile_image: None,
            preferences: None,
        };
        t.by_email.insert(account.email.clone(), account.id);
        t.accounts.insert(account.id, account.clone());
        t.profiles.insert(account.id, profile.clone());
        Ok((account, profile))
    }

    async fn touch_last_login(&self, id: Uuid) -> Result<(), StoreError> {
        self.enter()?;
        if self.fail_touch.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("update timed out".into()));
        }
        let mut t = self.tables.lock().await;
        if let Some(account) = t.accounts.get_mut(&id) {
            let now = OffsetDateTime::now_utc();
            account.last_login_at = Some(account.last_login_at.map_or(now, |prev| prev.max(now)));
            account.updated_at = now;
        }
        Ok(())
    }
}

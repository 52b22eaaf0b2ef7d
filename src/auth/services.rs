use std::sync::Arc;

use lazy_static::lazy_static;
use regex::Regex;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::auth::{
    dto::{FieldError, PublicUser},
    errors::AccountError,
    password::PasswordHasher,
    repo::UserStore,
};

pub(crate) const MIN_PASSWORD_LEN: usize = 8;
/// Matches the `VARCHAR(100)` columns for `users.name` and `users.email`.
pub(crate) const MAX_FIELD_LEN: usize = 100;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub(crate) fn validate_registration(name: &str, email: &str, password: &str) -> Vec<FieldError> {
    let mut errors = Vec::new();
    if name.is_empty() {
        errors.push(FieldError {
            field: "name",
            message: "Name is required",
        });
    } else if name.chars().count() > MAX_FIELD_LEN {
        errors.push(FieldError {
            field: "name",
            message: "Name must be at most 100 characters",
        });
    }
    if !is_valid_email(email) {
        errors.push(FieldError {
            field: "email",
            message: "Valid email is required",
        });
    } else if email.chars().count() > MAX_FIELD_LEN {
        errors.push(FieldError {
            field: "email",
            message: "Email must be at most 100 characters",
        });
    }
    // UTF-16 code units, the unit browsers use for `minlength`.
    if password.encode_utf16().count() < MIN_PASSWORD_LEN {
        errors.push(FieldError {
            field: "password",
            message: "Password must be at least 8 characters long",
        });
    }
    errors
}

pub(crate) fn validate_login(email: &str, password: &str) -> Vec<FieldError> {
    let mut errors = Vec::new();
    if !is_valid_email(email) {
        errors.push(FieldError {
            field: "email",
            message: "Valid email is required",
        });
    }
    if password.is_empty() {
        errors.push(FieldError {
            field: "password",
            message: "Password is required",
        });
    }
    errors
}

/// Registration and login rules on top of a [`UserStore`] and a
/// [`PasswordHasher`].
pub struct AccountService {
    store: Arc<dyn UserStore>,
    hasher: PasswordHasher,
    /// Verified against when the email is unknown, so that branch pays the
    /// same argon2 cost as a wrong password.
    dummy_hash: String,
}

impl AccountService {
    pub fn new(store: Arc<dyn UserStore>, hasher: PasswordHasher) -> Self {
        let dummy_hash = hasher.hash("unknown-account-placeholder").unwrap_or_else(|e| {
            warn!(error = %e, "could not prepare dummy hash");
            String::new()
        });
        Self {
            store,
            hasher,
            dummy_hash,
        }
    }

    #[instrument(skip_all)]
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<Uuid, AccountError> {
        let name = name.trim();
        let email = normalize_email(email);

        let errors = validate_registration(name, &email, password);
        if !errors.is_empty() {
            warn!(?errors, "registration rejected");
            return Err(AccountError::Validation(errors));
        }

        // Fast path only; the unique constraint decides races at insert time.
        if self.store.find_by_email(&email).await?.is_some() {
            warn!(email = %email, "email already registered");
            return Err(AccountError::Conflict);
        }

        let hash = self.hash(password).await?;

        let (account, profile) = match self.store.create(name, &email, &hash).await {
            Ok(created) => created,
            Err(e) => {
                let err = AccountError::from(e);
                if matches!(err, AccountError::Conflict) {
                    warn!(email = %email, "email registered concurrently");
                }
                return Err(err);
            }
        };
        let profile_empty = profile.bio.is_none()
            && profile.profile_image.is_none()
            && profile.preferences.is_none();
        debug!(user_id = %profile.user_id, profile_empty, "profile created");

        info!(user_id = %account.id, email = %account.email, "user registered");
        Ok(account.id)
    }

    #[instrument(skip_all)]
    pub async fn login(&self, email: &str, password: &str) -> Result<PublicUser, AccountError> {
        let email = normalize_email(email);

        let errors = validate_login(&email, password);
        if !errors.is_empty() {
            warn!(?errors, "login rejected");
            return Err(AccountError::Validation(errors));
        }

        let account = match self.store.find_by_email(&email).await? {
            Some(a) => a,
            None => {
                self.verify(password, &self.dummy_hash).await;
                warn!(email = %email, "login unknown email");
                return Err(AccountError::Unauthorized);
            }
        };

        if !self.verify(password, &account.password_hash).await {
            warn!(email = %email, user_id = %account.id, "login invalid password");
            return Err(AccountError::Unauthorized);
        }

        if let Err(e) = self.store.touch_last_login(account.id).await {
            warn!(error = %e, user_id = %account.id, "failed to record last login");
        }

        info!(user_id = %account.id, email = %account.email, "user logged in");
        Ok(PublicUser {
            id: account.id,
            name: account.name,
            email: account.email,
        })
    }

    pub async fn shutdown(&self) {
        self.store.close().await;
    }

    async fn hash(&self, password: &str) -> Result<String, AccountError> {
        let hasher = self.hasher.clone();
        let password = password.to_owned();
        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| AccountError::Internal(format!("spawn_blocking failed: {}", e)))?
            .map_err(|e| AccountError::Internal(e.to_string()))
    }

    async fn verify(&self, password: &str, hash: &str) -> bool {
        let hasher = self.hasher.clone();
        let password = password.to_owned();
        let hash = hash.to_owned();
        match tokio::task::spawn_blocking(move || hasher.verify(&password, &hash)).await {
            Ok(ok) => ok,
            Err(e) => {
                error!(error = %e, "verify task failed");
                false
            }
        }
    }
}

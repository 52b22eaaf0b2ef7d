use anyhow::Context;
use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::info;
use uuid::Uuid;

use crate::auth::repo_types::{Account, Profile, StoreError};

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// Durable account storage. Implementations must enforce email uniqueness
/// themselves; callers only pre-check as a fast path.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Exact-match lookup, no normalisation.
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError>;

    /// Insert an account and its empty profile as one unit.
    /// Returns [`StoreError::AlreadyExists`] on a duplicate email.
    async fn create(
        &self,
        name: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<(Account, Profile), StoreError>;

    /// Set `last_login_at` to now. Never moves it backwards.
    async fn touch_last_login(&self, id: Uuid) -> Result<(), StoreError>;

    /// Release underlying resources at shutdown.
    async fn close(&self) {}
}

const ACCOUNT_COLUMNS: &str =
    "id, name, email, password_hash, created_at, updated_at, last_login_at, is_active";

pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    /// Open the pool and apply pending migrations.
    pub async fn connect(database_url: &str, max_connections: u32) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .context("connect to database")?;
        MIGRATOR.run(&pool).await.context("run migrations")?;
        info!(max_connections, "database ready");
        Ok(Self { pool })
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        let account = sqlx::query_as::<_, Account>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(account)
    }

    async fn create(
        &self,
        name: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<(Account, Profile), StoreError> {
        // Dropping the transaction on an early return rolls back both inserts.
        let mut tx = self.pool.begin().await?;

        let account = sqlx::query_as::<_, Account>(&format!(
            r#"
            INSERT INTO users (id, name, email, password_hash)
            VALUES ($1, $2, $3, $4)
            RETURNING {ACCOUNT_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(email)
        .bind(password_hash)
        .fetch_one(&mut *tx)
        .await?;

        let profile = sqlx::query_as::<_, Profile>(
            r#"
            INSERT INTO user_profiles (user_id)
            VALUES ($1)
            RETURNING user_id, bio, profile_image, preferences
            "#,
        )
        .bind(account.id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok((account, profile))
    }

    async fn touch_last_login(&self, id: Uuid) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            UPDATE users
               SET last_login_at = GREATEST(last_login_at, now()),
                   updated_at = now()
             WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
        info!("database pool closed");
    }
}

//! Database repository for users.

use crate::{
    db::{
        errors::{DbError, Result},
        models::users::{UserCreateDBRequest, UserDBResponse, UserUpdateDBRequest},
    },
    types::UserId,
};
use chrono::Utc;
use sqlx::SqliteConnection;
use tracing::instrument;

pub struct Users<'c> {
    db: &'c mut SqliteConnection,
}

impl<'c> Users<'c> {
    pub fn new(db: &'c mut SqliteConnection) -> Self {
        Self { db }
    }

    #[instrument(skip(self, request), fields(email = %request.email), err)]
    pub async fn create(&mut self, request: &UserCreateDBRequest) -> Result<UserDBResponse> {
        let now = Utc::now();
        let user = sqlx::query_as::<_, UserDBResponse>(
            r#"
            INSERT INTO users (email, display_name, auth_source, password_hash, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(&request.email)
        .bind(&request.display_name)
        .bind(&request.auth_source)
        .bind(&request.password_hash)
        .bind(now)
        .bind(now)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(user)
    }

    #[instrument(skip(self), err)]
    pub async fn get_by_id(&mut self, id: UserId) -> Result<Option<UserDBResponse>> {
        let user = sqlx::query_as::<_, UserDBResponse>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(user)
    }

    #[instrument(skip(self, email), err)]
    pub async fn get_by_email(&mut self, email: &str) -> Result<Option<UserDBResponse>> {
        let user = sqlx::query_as::<_, UserDBResponse>("SELECT * FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(user)
    }

    #[instrument(skip(self, customer_id), err)]
    pub async fn get_by_payment_customer(&mut self, customer_id: &str) -> Result<Option<UserDBResponse>> {
        let user = sqlx::query_as::<_, UserDBResponse>("SELECT * FROM users WHERE payment_customer_id = ?")
            .bind(customer_id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(user)
    }

    /// Partial profile update: submitted fields overwrite, absent fields stay.
    #[instrument(skip(self, request), fields(user_id = id), err)]
    pub async fn update_profile(&mut self, id: UserId, request: &UserUpdateDBRequest) -> Result<UserDBResponse> {
        let user = sqlx::query_as::<_, UserDBResponse>(
            r#"
            UPDATE users SET
                display_name = COALESCE(?, display_name),
                avatar_path = COALESCE(?, avatar_path),
                password_hash = COALESCE(?, password_hash),
                updated_at = ?
            WHERE id = ?
            RETURNING *
            "#,
        )
        .bind(&request.display_name)
        .bind(&request.avatar_path)
        .bind(&request.password_hash)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;

        Ok(user)
    }

    /// Backfill the display name only when none is stored yet.
    ///
    /// Used by identity-header sign-in: the provider's value must never
    /// overwrite what the user already set.
    #[instrument(skip(self, display_name), fields(user_id = id), err)]
    pub async fn backfill_display_name(&mut self, id: UserId, display_name: &str) -> Result<()> {
        sqlx::query(
            "UPDATE users SET display_name = ?, updated_at = ? WHERE id = ? AND (display_name IS NULL OR display_name = '')",
        )
        .bind(display_name)
        .bind(Utc::now())
        .bind(id)
        .execute(&mut *self.db)
        .await?;

        Ok(())
    }

    /// Record the remote payment customer id after lazy creation.
    #[instrument(skip(self, customer_id), fields(user_id = id), err)]
    pub async fn set_payment_customer(&mut self, id: UserId, customer_id: &str) -> Result<()> {
        sqlx::query("UPDATE users SET payment_customer_id = ?, updated_at = ? WHERE id = ?")
            .bind(customer_id)
            .bind(Utc::now())
            .bind(id)
            .execute(&mut *self.db)
            .await?;

        Ok(())
    }

    /// Overwrite the subscription status for a user id.
    #[instrument(skip(self, status), fields(user_id = id), err)]
    pub async fn set_subscription_status(&mut self, id: UserId, status: &str) -> Result<()> {
        sqlx::query("UPDATE users SET subscription_status = ?, updated_at = ? WHERE id = ?")
            .bind(status)
            .bind(Utc::now())
            .bind(id)
            .execute(&mut *self.db)
            .await?;

        Ok(())
    }

    /// Overwrite the subscription status for the user holding a payment
    /// customer id. Returns whether a row matched. The overwrite is
    /// idempotent, so webhook replays are harmless.
    #[instrument(skip(self, customer_id, status), err)]
    pub async fn set_subscription_status_by_customer(&mut self, customer_id: &str, status: &str) -> Result<bool> {
        let result = sqlx::query("UPDATE users SET subscription_status = ?, updated_at = ? WHERE payment_customer_id = ?")
            .bind(status)
            .bind(Utc::now())
            .bind(customer_id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::SqlitePool;

    fn create_request(email: &str) -> UserCreateDBRequest {
        UserCreateDBRequest {
            email: email.to_string(),
            display_name: None,
            auth_source: "native".to_string(),
            password_hash: Some("$argon2id$fake".to_string()),
        }
    }

    #[sqlx::test]
    async fn test_create_and_get_by_email(pool: SqlitePool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Users::new(&mut conn);

        let created = repo.create(&create_request("test@example.com")).await.unwrap();
        assert_eq!(created.email, "test@example.com");
        assert_eq!(created.subscription_status, "free");
        assert!(created.is_active);

        let found = repo.get_by_email("test@example.com").await.unwrap().unwrap();
        assert_eq!(found.id, created.id);

        let missing = repo.get_by_email("nobody@example.com").await.unwrap();
        assert!(missing.is_none());
    }

    #[sqlx::test]
    async fn test_duplicate_email_rejected(pool: SqlitePool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Users::new(&mut conn);

        repo.create(&create_request("dup@example.com")).await.unwrap();
        let err = repo.create(&create_request("dup@example.com")).await.unwrap_err();
        assert!(err.violates_unique("users.email"), "unexpected error: {err:?}");

        // No second row was created
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE email = ?")
            .bind("dup@example.com")
            .fetch_one(&mut *conn)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[sqlx::test]
    async fn test_partial_profile_update(pool: SqlitePool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Users::new(&mut conn);

        let user = repo.create(&create_request("profile@example.com")).await.unwrap();

        let updated = repo
            .update_profile(
                user.id,
                &UserUpdateDBRequest {
                    display_name: Some("Alex".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.display_name.as_deref(), Some("Alex"));
        // Untouched fields survive
        assert_eq!(updated.password_hash, user.password_hash);

        // A later update without display_name leaves it alone
        let updated = repo
            .update_profile(
                user.id,
                &UserUpdateDBRequest {
                    avatar_path: Some("avatars/a.png".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.display_name.as_deref(), Some("Alex"));
        assert_eq!(updated.avatar_path.as_deref(), Some("avatars/a.png"));
    }

    #[sqlx::test]
    async fn test_backfill_never_overwrites(pool: SqlitePool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Users::new(&mut conn);

        let user = repo.create(&create_request("backfill@example.com")).await.unwrap();

        repo.backfill_display_name(user.id, "From Provider").await.unwrap();
        let user = repo.get_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(user.display_name.as_deref(), Some("From Provider"));

        // Second sign-in with a different provider value changes nothing
        repo.backfill_display_name(user.id, "Other Name").await.unwrap();
        let user = repo.get_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(user.display_name.as_deref(), Some("From Provider"));
    }

    #[sqlx::test]
    async fn test_subscription_status_by_customer(pool: SqlitePool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Users::new(&mut conn);

        let user = repo.create(&create_request("billing@example.com")).await.unwrap();
        repo.set_payment_customer(user.id, "cus_123").await.unwrap();

        let matched = repo.set_subscription_status_by_customer("cus_123", "active").await.unwrap();
        assert!(matched);
        let user = repo.get_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(user.subscription_status, "active");

        // Replay is a harmless overwrite
        let matched = repo.set_subscription_status_by_customer("cus_123", "active").await.unwrap();
        assert!(matched);

        // Unknown customer ids match nothing
        let matched = repo.set_subscription_status_by_customer("cus_unknown", "active").await.unwrap();
        assert!(!matched);
    }
}

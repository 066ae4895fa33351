use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl User {
    pub async fn find_by_username(db: &PgPool, username: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, password_hash, created_at
            FROM users
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, password_hash, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn create(
        db: &PgPool,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<User, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, email, password_hash)
            VALUES ($1, $2, $3)
            RETURNING id, username, email, password_hash, created_at
            "#,
        )
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .fetch_one(db)
        .await
    }

    /// Partial profile update; `None` keeps the stored value.
    pub async fn update_profile(
        db: &PgPool,
        id: Uuid,
        username: Option<&str>,
        email: Option<&str>,
    ) -> Result<User, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET username = COALESCE($2, username),
                email = COALESCE($3, email)
            WHERE id = $1
            RETURNING id, username, email, password_hash, created_at
            "#,
        )
        .bind(id)
        .bind(username)
        .bind(email)
        .fetch_one(db)
        .await
    }
}

/// Returns the user's persistent token, creating one with `fresh_key` only if
/// none exists yet. Single statement, so concurrent logins cannot mint
/// duplicate tokens.
pub async fn get_or_create_token(
    db: &PgPool,
    user_id: Uuid,
    fresh_key: &str,
) -> anyhow::Result<String> {
    let key: String = sqlx::query_scalar(
        r#"
        INSERT INTO auth_tokens (key, user_id)
        VALUES ($1, $2)
        ON CONFLICT (user_id) DO UPDATE SET key = auth_tokens.key
        RETURNING key
        "#,
    )
    .bind(fresh_key)
    .bind(user_id)
    .fetch_one(db)
    .await?;
    Ok(key)
}

/// Resolves a bearer key to its owner, if any.
pub async fn find_user_id_by_token(db: &PgPool, key: &str) -> anyhow::Result<Option<Uuid>> {
    let user_id = sqlx::query_scalar::<_, Uuid>(
        r#"
        SELECT user_id
        FROM auth_tokens
        WHERE key = $1
        "#,
    )
    .bind(key)
    .fetch_optional(db)
    .await?;
    Ok(user_id)
}

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::readings::filter::ReadingFilter;
use crate::readings::ordering::Ordering;

const COLUMNS: &str = "id, user_id, value, unit, timestamp, notes, status, created_at";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Reading {
    pub id: Uuid,
    pub user_id: Uuid,
    pub value: Decimal,
    pub unit: String,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub notes: Option<String>,
    pub status: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Client-mutable fields. The owner is never part of this struct; it is
/// supplied separately by every repository call.
#[derive(Debug, Clone)]
pub struct NewReading {
    pub value: Decimal,
    pub unit: String,
    pub timestamp: OffsetDateTime,
    pub notes: Option<String>,
    pub status: Option<String>,
}

pub async fn count_for_user(
    db: &PgPool,
    owner: Uuid,
    filter: &ReadingFilter,
) -> anyhow::Result<i64> {
    let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM readings WHERE user_id = ");
    qb.push_bind(owner);
    filter.apply(&mut qb);
    let count: i64 = qb.build_query_scalar().fetch_one(db).await?;
    Ok(count)
}

pub async fn list_for_user(
    db: &PgPool,
    owner: Uuid,
    filter: &ReadingFilter,
    ordering: &Ordering,
    limit: i64,
    offset: i64,
) -> anyhow::Result<Vec<Reading>> {
    let mut qb = QueryBuilder::<Postgres>::new(format!(
        "SELECT {COLUMNS} FROM readings WHERE user_id = "
    ));
    qb.push_bind(owner);
    filter.apply(&mut qb);
    qb.push(" ");
    qb.push(ordering.to_sql());
    qb.push(" LIMIT ");
    qb.push_bind(limit);
    qb.push(" OFFSET ");
    qb.push_bind(offset);
    let rows = qb.build_query_as::<Reading>().fetch_all(db).await?;
    Ok(rows)
}

/// The stored owner is always the caller, whatever the request body said.
pub async fn create_for_user(
    db: &PgPool,
    owner: Uuid,
    reading: NewReading,
) -> anyhow::Result<Reading> {
    let row = sqlx::query_as::<_, Reading>(&format!(
        r#"
        INSERT INTO readings (user_id, value, unit, timestamp, notes, status)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING {COLUMNS}
        "#
    ))
    .bind(owner)
    .bind(reading.value)
    .bind(&reading.unit)
    .bind(reading.timestamp)
    .bind(&reading.notes)
    .bind(&reading.status)
    .fetch_one(db)
    .await?;
    Ok(row)
}

/// `None` covers both "no such row" and "someone else's row"; callers cannot
/// tell the difference.
pub async fn get_for_user(db: &PgPool, owner: Uuid, id: Uuid) -> anyhow::Result<Option<Reading>> {
    let row = sqlx::query_as::<_, Reading>(&format!(
        r#"
        SELECT {COLUMNS}
        FROM readings
        WHERE id = $1 AND user_id = $2
        "#
    ))
    .bind(id)
    .bind(owner)
    .fetch_optional(db)
    .await?;
    Ok(row)
}

pub async fn update_for_user(
    db: &PgPool,
    owner: Uuid,
    id: Uuid,
    reading: NewReading,
) -> anyhow::Result<Option<Reading>> {
    let row = sqlx::query_as::<_, Reading>(&format!(
        r#"
        UPDATE readings
        SET value = $3, unit = $4, timestamp = $5, notes = $6, status = $7
        WHERE id = $1 AND user_id = $2
        RETURNING {COLUMNS}
        "#
    ))
    .bind(id)
    .bind(owner)
    .bind(reading.value)
    .bind(&reading.unit)
    .bind(reading.timestamp)
    .bind(&reading.notes)
    .bind(&reading.status)
    .fetch_optional(db)
    .await?;
    Ok(row)
}

pub async fn delete_for_user(db: &PgPool, owner: Uuid, id: Uuid) -> anyhow::Result<bool> {
    let result = sqlx::query("DELETE FROM readings WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(owner)
        .execute(db)
        .await?;
    Ok(result.rows_affected() > 0)
}

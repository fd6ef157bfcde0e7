use chrono::Utc;
use sqlx::{Executor, Sqlite, SqlitePool};
use uuid::Uuid;

use crate::models::{NewUser, UserModel};

pub async fn insert(pool: &SqlitePool, user: &NewUser) -> Result<UserModel, sqlx::Error> {
    let id = Uuid::new_v4().to_string();
    let now = Utc::now();

    sqlx::query(
        "INSERT INTO users (id, name, email, password_hash, phone, address, city, state, zip_code, \
         created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(&user.name)
    .bind(&user.email)
    .bind(&user.password_hash)
    .bind(&user.phone)
    .bind(&user.address)
    .bind(&user.city)
    .bind(&user.state)
    .bind(&user.zip_code)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    find_by_id(pool, &id).await?.ok_or(sqlx::Error::RowNotFound)
}

pub async fn find_by_id<'e, E>(executor: E, id: &str) -> Result<Option<UserModel>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, UserModel>("SELECT * FROM users WHERE id = ?")
        .bind(id)
        .fetch_optional(executor)
        .await
}

pub async fn find_by_email(pool: &SqlitePool, email: &str) -> Result<Option<UserModel>, sqlx::Error> {
    sqlx::query_as::<_, UserModel>("SELECT * FROM users WHERE email = ?")
        .bind(email)
        .fetch_optional(pool)
        .await
}

pub async fn exists(pool: &SqlitePool, id: &str) -> Result<bool, sqlx::Error> {
    let found: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM users WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(found.is_some())
}

pub async fn update_location(
    pool: &SqlitePool,
    id: &str,
    longitude: f64,
    latitude: f64,
    address: &str,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE users SET longitude = ?, latitude = ?, location_address = ?, updated_at = ? \
         WHERE id = ?",
    )
    .bind(longitude)
    .bind(latitude)
    .bind(address)
    .bind(Utc::now())
    .bind(id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

/// Moves the active listing counter by `delta`, never below zero.
pub async fn adjust_active_listings<'e, E>(
    executor: E,
    id: &str,
    delta: i64,
) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        "UPDATE users SET active_listings = MAX(active_listings + ?, 0), updated_at = ? WHERE id = ?",
    )
    .bind(delta)
    .bind(Utc::now())
    .bind(id)
    .execute(executor)
    .await?;
    Ok(())
}

/// Donor side of a finished hand-off: one more share, one fewer active listing.
pub async fn record_share<'e, E>(executor: E, donor_id: &str) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        "UPDATE users SET food_shared = food_shared + 1, \
         active_listings = MAX(active_listings - 1, 0), updated_at = ? WHERE id = ?",
    )
    .bind(Utc::now())
    .bind(donor_id)
    .execute(executor)
    .await?;
    Ok(())
}

pub async fn record_receipt<'e, E>(executor: E, requester_id: &str) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query("UPDATE users SET food_received = food_received + 1, updated_at = ? WHERE id = ?")
        .bind(Utc::now())
        .bind(requester_id)
        .execute(executor)
        .await?;
    Ok(())
}

pub async fn count(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(pool)
        .await
}

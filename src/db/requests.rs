use chrono::Utc;
use sqlx::{Executor, Sqlite, SqlitePool};
use uuid::Uuid;

use crate::db::users;
use crate::models::{NewRequest, RequestMessage, RequestModel, RequestStatus};
use crate::response::Page;

const REQUEST_SELECT: &str = "SELECT r.id, r.food_id, f.title AS food_title, \
     f.category AS food_category, f.status AS food_status, \
     r.requester_id, q.name AS requester_name, q.profile_image AS requester_profile_image, \
     r.donor_id, d.name AS donor_name, d.profile_image AS donor_profile_image, \
     r.status, r.requested_quantity, r.pickup_time, r.message, r.responded_at, r.completed_at, \
     r.created_at, r.updated_at \
     FROM food_requests r \
     JOIN food_items f ON f.id = r.food_id \
     JOIN users q ON q.id = r.requester_id \
     JOIN users d ON d.id = r.donor_id";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcceptOutcome {
    /// Reserved; `declined` sibling requests were closed in the same transaction.
    Accepted { declined: u64 },
    FoodUnavailable,
    NotPending,
}

pub async fn insert(pool: &SqlitePool, request: &NewRequest) -> Result<String, sqlx::Error> {
    let id = Uuid::new_v4().to_string();
    let now = Utc::now();

    sqlx::query(
        "INSERT INTO food_requests (id, food_id, requester_id, donor_id, status, \
         requested_quantity, pickup_time, message, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(&request.food_id)
    .bind(&request.requester_id)
    .bind(&request.donor_id)
    .bind(RequestStatus::Pending)
    .bind(request.requested_quantity)
    .bind(request.pickup_time)
    .bind(&request.message)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(id)
}

pub async fn find_by_id<'e, E>(executor: E, id: &str) -> Result<Option<RequestModel>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, RequestModel>(&format!("{} WHERE r.id = ?", REQUEST_SELECT))
        .bind(id)
        .fetch_optional(executor)
        .await
}

/// The requester's pending or accepted request on this food item, if any.
pub async fn find_active(
    pool: &SqlitePool,
    food_id: &str,
    requester_id: &str,
) -> Result<Option<String>, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT id FROM food_requests WHERE food_id = ? AND requester_id = ? \
         AND status IN ('pending', 'accepted')",
    )
    .bind(food_id)
    .bind(requester_id)
    .fetch_optional(pool)
    .await
}

/// Requests the user sent.
pub async fn list_sent(
    pool: &SqlitePool,
    requester_id: &str,
    page: Page,
) -> Result<(Vec<RequestModel>, i64), sqlx::Error> {
    list_by_party(pool, "r.requester_id", requester_id, page).await
}

/// Requests made on the user's listings.
pub async fn list_received(
    pool: &SqlitePool,
    donor_id: &str,
    page: Page,
) -> Result<(Vec<RequestModel>, i64), sqlx::Error> {
    list_by_party(pool, "r.donor_id", donor_id, page).await
}

async fn list_by_party(
    pool: &SqlitePool,
    column: &'static str,
    user_id: &str,
    page: Page,
) -> Result<(Vec<RequestModel>, i64), sqlx::Error> {
    let rows_sql = format!(
        "{} WHERE {} = ? ORDER BY r.created_at DESC LIMIT ? OFFSET ?",
        REQUEST_SELECT, column
    );
    let rows = sqlx::query_as::<_, RequestModel>(&rows_sql)
        .bind(user_id)
        .bind(page.limit)
        .bind(page.offset())
        .fetch_all(pool)
        .await?;

    let count_sql = format!("SELECT COUNT(*) FROM food_requests r WHERE {} = ?", column);
    let total: i64 = sqlx::query_scalar(&count_sql)
        .bind(user_id)
        .fetch_one(pool)
        .await?;

    Ok((rows, total))
}

/// Reserves the food item for this request and declines every other pending
/// request on it, atomically. The first statement is the compare-and-set on
/// the food item's status, so of two racing accepts only one can reserve.
pub async fn accept(pool: &SqlitePool, request: &RequestModel) -> Result<AcceptOutcome, sqlx::Error> {
    let now = Utc::now();
    let mut tx = pool.begin().await?;

    let reserved = sqlx::query(
        "UPDATE food_items SET status = 'reserved', reserved_by = ?, updated_at = ? \
         WHERE id = ? AND status = 'available' AND available_until > ?",
    )
    .bind(&request.requester_id)
    .bind(now)
    .bind(&request.food_id)
    .bind(now)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    if reserved == 0 {
        tx.rollback().await?;
        return Ok(AcceptOutcome::FoodUnavailable);
    }

    let accepted = sqlx::query(
        "UPDATE food_requests SET status = 'accepted', responded_at = ?, updated_at = ? \
         WHERE id = ? AND status = 'pending'",
    )
    .bind(now)
    .bind(now)
    .bind(&request.id)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    if accepted == 0 {
        tx.rollback().await?;
        return Ok(AcceptOutcome::NotPending);
    }

    let declined = sqlx::query(
        "UPDATE food_requests SET status = 'declined', responded_at = ?, updated_at = ? \
         WHERE food_id = ? AND status = 'pending' AND id != ?",
    )
    .bind(now)
    .bind(now)
    .bind(&request.food_id)
    .bind(&request.id)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    tx.commit().await?;
    Ok(AcceptOutcome::Accepted { declined })
}

/// Returns false when the request was no longer pending.
pub async fn decline(pool: &SqlitePool, id: &str) -> Result<bool, sqlx::Error> {
    let now = Utc::now();
    let result = sqlx::query(
        "UPDATE food_requests SET status = 'declined', responded_at = ?, updated_at = ? \
         WHERE id = ? AND status = 'pending'",
    )
    .bind(now)
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Closes an accepted request: request and food item become completed and
/// both parties' counters move, all in one transaction. Returns false when the
/// request was no longer accepted.
pub async fn complete(pool: &SqlitePool, request: &RequestModel) -> Result<bool, sqlx::Error> {
    let now = Utc::now();
    let mut tx = pool.begin().await?;

    let completed = sqlx::query(
        "UPDATE food_requests SET status = 'completed', completed_at = ?, updated_at = ? \
         WHERE id = ? AND status = 'accepted'",
    )
    .bind(now)
    .bind(now)
    .bind(&request.id)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    if completed == 0 {
        tx.rollback().await?;
        return Ok(false);
    }

    sqlx::query(
        "UPDATE food_items SET status = 'completed', updated_at = ? \
         WHERE id = ? AND status = 'reserved'",
    )
    .bind(now)
    .bind(&request.food_id)
    .execute(&mut *tx)
    .await?;

    users::record_share(&mut *tx, &request.donor_id).await?;
    users::record_receipt(&mut *tx, &request.requester_id).await?;

    tx.commit().await?;
    Ok(true)
}

pub async fn add_message(
    pool: &SqlitePool,
    request_id: &str,
    sender_id: &str,
    body: &str,
) -> Result<String, sqlx::Error> {
    let id = Uuid::new_v4().to_string();
    let now = Utc::now();

    sqlx::query(
        "INSERT INTO request_messages (id, request_id, sender_id, body, created_at) \
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(request_id)
    .bind(sender_id)
    .bind(body)
    .bind(now)
    .execute(pool)
    .await?;

    sqlx::query("UPDATE food_requests SET updated_at = ? WHERE id = ?")
        .bind(now)
        .bind(request_id)
        .execute(pool)
        .await?;

    Ok(id)
}

pub async fn list_messages(pool: &SqlitePool, request_id: &str) -> Result<Vec<RequestMessage>, sqlx::Error> {
    sqlx::query_as::<_, RequestMessage>(
        "SELECT m.id, m.sender_id, u.name AS sender_name, m.body, m.created_at \
         FROM request_messages m JOIN users u ON u.id = m.sender_id \
         WHERE m.request_id = ? ORDER BY m.created_at ASC, m.rowid ASC",
    )
    .bind(request_id)
    .fetch_all(pool)
    .await
}

pub async fn count_by_status(pool: &SqlitePool, status: RequestStatus) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM food_requests WHERE status = ?")
        .bind(status)
        .fetch_one(pool)
        .await
}

pub async fn count(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM food_requests")
        .fetch_one(pool)
        .await
}

use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::types::Json;
use sqlx::{Executor, QueryBuilder, Sqlite, SqlitePool};
use uuid::Uuid;

use crate::db::{like_pattern, users};
use crate::geo::{haversine_km, BoundingBox};
use crate::models::{Dietary, FoodCategory, FoodModel, FoodStatus, FoodUpdate, NewFood};
use crate::response::Page;

const FOOD_SELECT: &str = "SELECT f.id, f.donor_id, u.name AS donor_name, \
     u.profile_image AS donor_profile_image, f.title, f.description, f.category, \
     f.quantity_amount, f.quantity_unit, f.expiry_date, f.longitude, f.latitude, \
     f.pickup_address, f.pickup_instructions, f.images, f.available_from, f.available_until, \
     f.is_vegetarian, f.is_vegan, f.is_halal, f.is_kosher, f.is_gluten_free, f.notes, f.tags, \
     f.status, f.reserved_by, f.views, f.created_at, f.updated_at \
     FROM food_items f JOIN users u ON u.id = f.donor_id";

const FOOD_COUNT: &str = "SELECT COUNT(*) FROM food_items f JOIN users u ON u.id = f.donor_id";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoFilter {
    pub latitude: f64,
    pub longitude: f64,
    pub radius_km: f64,
}

/// Filters for the public browse listing. Only open listings are ever returned.
#[derive(Debug, Clone, Default)]
pub struct FoodFilter {
    pub category: Option<FoodCategory>,
    pub city: Option<String>,
    pub search: Option<String>,
    pub dietary: Dietary,
    pub geo: Option<GeoFilter>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryKind {
    Donated,
    Received,
    #[default]
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    Cancelled { declined: u64 },
    /// Has request history and is already finished; kept as a record.
    Retained,
}

/// Inserts a listing and bumps the donor's active listing count in one transaction.
pub async fn create(pool: &SqlitePool, food: &NewFood) -> Result<String, sqlx::Error> {
    let id = Uuid::new_v4().to_string();
    let now = Utc::now();

    let mut tx = pool.begin().await?;

    sqlx::query(
        "INSERT INTO food_items (id, donor_id, title, description, category, quantity_amount, \
         quantity_unit, expiry_date, longitude, latitude, pickup_address, pickup_instructions, \
         images, available_from, available_until, is_vegetarian, is_vegan, is_halal, is_kosher, \
         is_gluten_free, notes, tags, status, views, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 0, ?, ?)",
    )
    .bind(&id)
    .bind(&food.donor_id)
    .bind(&food.title)
    .bind(&food.description)
    .bind(food.category)
    .bind(food.quantity.amount)
    .bind(food.quantity.unit)
    .bind(food.expiry_date)
    .bind(food.location.coordinates[0])
    .bind(food.location.coordinates[1])
    .bind(&food.location.address)
    .bind(&food.pickup_instructions)
    .bind(Json(&food.images))
    .bind(food.available_from)
    .bind(food.available_until)
    .bind(food.dietary.is_vegetarian)
    .bind(food.dietary.is_vegan)
    .bind(food.dietary.is_halal)
    .bind(food.dietary.is_kosher)
    .bind(food.dietary.is_gluten_free)
    .bind(&food.notes)
    .bind(Json(&food.tags))
    .bind(FoodStatus::Available)
    .bind(now)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    users::adjust_active_listings(&mut *tx, &food.donor_id, 1).await?;

    tx.commit().await?;
    Ok(id)
}

pub async fn find_by_id<'e, E>(executor: E, id: &str) -> Result<Option<FoodModel>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, FoodModel>(&format!("{} WHERE f.id = ?", FOOD_SELECT))
        .bind(id)
        .fetch_optional(executor)
        .await
}

/// Returns the number of rows touched; zero means the listing does not exist.
pub async fn increment_views(pool: &SqlitePool, id: &str) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("UPDATE food_items SET views = views + 1 WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

fn push_browse_filters(qb: &mut QueryBuilder<'_, Sqlite>, filter: &FoodFilter, now: DateTime<Utc>) {
    qb.push(" WHERE f.status = ")
        .push_bind(FoodStatus::Available)
        .push(" AND f.available_until > ")
        .push_bind(now);

    if let Some(category) = filter.category {
        qb.push(" AND f.category = ").push_bind(category);
    }
    if let Some(city) = &filter.city {
        qb.push(" AND u.city = ").push_bind(city.clone());
    }
    if let Some(search) = &filter.search {
        let pattern = like_pattern(search);
        qb.push(" AND (f.title LIKE ")
            .push_bind(pattern.clone())
            .push(" ESCAPE '\\' OR f.description LIKE ")
            .push_bind(pattern)
            .push(" ESCAPE '\\')");
    }

    let dietary = filter.dietary;
    if dietary.is_vegetarian {
        qb.push(" AND f.is_vegetarian = 1");
    }
    if dietary.is_vegan {
        qb.push(" AND f.is_vegan = 1");
    }
    if dietary.is_halal {
        qb.push(" AND f.is_halal = 1");
    }
    if dietary.is_kosher {
        qb.push(" AND f.is_kosher = 1");
    }
    if dietary.is_gluten_free {
        qb.push(" AND f.is_gluten_free = 1");
    }

    if let Some(geo) = filter.geo {
        let bbox = BoundingBox::around(geo.latitude, geo.longitude, geo.radius_km);
        qb.push(" AND f.latitude BETWEEN ")
            .push_bind(bbox.min_lat)
            .push(" AND ")
            .push_bind(bbox.max_lat);
        if bbox.crosses_antimeridian() {
            qb.push(" AND (f.longitude >= ")
                .push_bind(bbox.min_lng)
                .push(" OR f.longitude <= ")
                .push_bind(bbox.max_lng)
                .push(")");
        } else {
            qb.push(" AND f.longitude BETWEEN ")
                .push_bind(bbox.min_lng)
                .push(" AND ")
                .push_bind(bbox.max_lng);
        }
    }
}

/// Browse open listings. With a geo filter the results are ordered by
/// distance and carry it; otherwise newest first.
pub async fn list_available(
    pool: &SqlitePool,
    filter: &FoodFilter,
    page: Page,
) -> Result<(Vec<(FoodModel, Option<f64>)>, i64), sqlx::Error> {
    let now = Utc::now();

    let mut qb = QueryBuilder::<Sqlite>::new(FOOD_SELECT);
    push_browse_filters(&mut qb, filter, now);

    if let Some(geo) = filter.geo {
        // The box prefilter is coarse; the exact radius check and the paging
        // both happen here.
        let candidates = qb.build_query_as::<FoodModel>().fetch_all(pool).await?;
        let mut within: Vec<(FoodModel, Option<f64>)> = candidates
            .into_iter()
            .filter_map(|food| {
                let distance = haversine_km(geo.latitude, geo.longitude, food.latitude, food.longitude);
                (distance <= geo.radius_km).then_some((food, Some(distance)))
            })
            .collect();
        within.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));

        let total = within.len() as i64;
        let items = within
            .into_iter()
            .skip(usize::try_from(page.offset()).unwrap_or(usize::MAX))
            .take(usize::try_from(page.limit).unwrap_or(usize::MAX))
            .collect();
        return Ok((items, total));
    }

    qb.push(" ORDER BY f.created_at DESC LIMIT ")
        .push_bind(page.limit)
        .push(" OFFSET ")
        .push_bind(page.offset());
    let rows = qb.build_query_as::<FoodModel>().fetch_all(pool).await?;

    let mut count = QueryBuilder::<Sqlite>::new(FOOD_COUNT);
    push_browse_filters(&mut count, filter, now);
    let total: i64 = count.build_query_scalar::<i64>().fetch_one(pool).await?;

    Ok((rows.into_iter().map(|food| (food, None)).collect(), total))
}

/// A donor's listings that are still in play (available or reserved).
pub async fn list_by_donor(
    pool: &SqlitePool,
    donor_id: &str,
    page: Page,
) -> Result<(Vec<FoodModel>, i64), sqlx::Error> {
    let rows = sqlx::query_as::<_, FoodModel>(&format!(
        "{} WHERE f.donor_id = ? AND f.status IN ('available', 'reserved') \
         ORDER BY f.created_at DESC LIMIT ? OFFSET ?",
        FOOD_SELECT
    ))
    .bind(donor_id)
    .bind(page.limit)
    .bind(page.offset())
    .fetch_all(pool)
    .await?;

    let total: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM food_items WHERE donor_id = ? AND status IN ('available', 'reserved')",
    )
    .bind(donor_id)
    .fetch_one(pool)
    .await?;

    Ok((rows, total))
}

pub async fn list_saved(
    pool: &SqlitePool,
    user_id: &str,
    page: Page,
) -> Result<(Vec<FoodModel>, i64), sqlx::Error> {
    let rows = sqlx::query_as::<_, FoodModel>(&format!(
        "{} JOIN saved_food s ON s.food_id = f.id \
         WHERE s.user_id = ? AND f.status = 'available' \
         ORDER BY f.created_at DESC LIMIT ? OFFSET ?",
        FOOD_SELECT
    ))
    .bind(user_id)
    .bind(page.limit)
    .bind(page.offset())
    .fetch_all(pool)
    .await?;

    let total: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM saved_food s JOIN food_items f ON f.id = s.food_id \
         WHERE s.user_id = ? AND f.status = 'available'",
    )
    .bind(user_id)
    .fetch_one(pool)
    .await?;

    Ok((rows, total))
}

/// Finished listings (completed or cancelled) the user gave or received.
pub async fn list_history(
    pool: &SqlitePool,
    user_id: &str,
    kind: HistoryKind,
    page: Page,
) -> Result<(Vec<FoodModel>, i64), sqlx::Error> {
    let party = match kind {
        HistoryKind::Donated => "f.donor_id = ?",
        HistoryKind::Received => "f.reserved_by = ?",
        HistoryKind::All => "(f.donor_id = ? OR f.reserved_by = ?)",
    };
    let where_clause = format!(
        "WHERE {} AND f.status IN ('completed', 'cancelled')",
        party
    );

    let rows_sql = format!(
        "{} {} ORDER BY f.updated_at DESC LIMIT ? OFFSET ?",
        FOOD_SELECT, where_clause
    );
    let count_sql = format!("SELECT COUNT(*) FROM food_items f {}", where_clause);

    let mut rows_query = sqlx::query_as::<_, FoodModel>(&rows_sql).bind(user_id);
    let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql).bind(user_id);
    if kind == HistoryKind::All {
        rows_query = rows_query.bind(user_id);
        count_query = count_query.bind(user_id);
    }

    let rows = rows_query
        .bind(page.limit)
        .bind(page.offset())
        .fetch_all(pool)
        .await?;
    let total = count_query.fetch_one(pool).await?;

    Ok((rows, total))
}

/// Applies the present fields. The status guard lives in the statement so a
/// concurrent reservation wins; zero rows means the listing was no longer available.
pub async fn update(pool: &SqlitePool, id: &str, changes: &FoodUpdate) -> Result<u64, sqlx::Error> {
    let dietary = changes.dietary;

    let result = sqlx::query(
        "UPDATE food_items SET \
         title = COALESCE(?, title), \
         description = COALESCE(?, description), \
         quantity_amount = COALESCE(?, quantity_amount), \
         quantity_unit = COALESCE(?, quantity_unit), \
         available_from = COALESCE(?, available_from), \
         available_until = COALESCE(?, available_until), \
         is_vegetarian = COALESCE(?, is_vegetarian), \
         is_vegan = COALESCE(?, is_vegan), \
         is_halal = COALESCE(?, is_halal), \
         is_kosher = COALESCE(?, is_kosher), \
         is_gluten_free = COALESCE(?, is_gluten_free), \
         notes = COALESCE(?, notes), \
         tags = COALESCE(?, tags), \
         updated_at = ? \
         WHERE id = ? AND status = 'available'",
    )
    .bind(&changes.title)
    .bind(&changes.description)
    .bind(changes.quantity.map(|q| q.amount))
    .bind(changes.quantity.map(|q| q.unit))
    .bind(changes.available_from)
    .bind(changes.available_until)
    .bind(dietary.map(|d| d.is_vegetarian))
    .bind(dietary.map(|d| d.is_vegan))
    .bind(dietary.map(|d| d.is_halal))
    .bind(dietary.map(|d| d.is_kosher))
    .bind(dietary.map(|d| d.is_gluten_free))
    .bind(&changes.notes)
    .bind(changes.tags.as_ref().map(Json))
    .bind(Utc::now())
    .bind(id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// Removes a listing that nobody has requested. A listing with request
/// history is kept: an open one is cancelled (its pending requests declined),
/// a finished one is left as it is.
pub async fn delete(pool: &SqlitePool, food: &FoodModel) -> Result<DeleteOutcome, sqlx::Error> {
    let now = Utc::now();
    let mut tx = pool.begin().await?;

    let deleted = sqlx::query(
        "DELETE FROM food_items WHERE id = ? AND status != 'reserved' \
         AND NOT EXISTS (SELECT 1 FROM food_requests WHERE food_id = ?)",
    )
    .bind(&food.id)
    .bind(&food.id)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    let outcome = if deleted > 0 {
        if food.status == FoodStatus::Available {
            users::adjust_active_listings(&mut *tx, &food.donor_id, -1).await?;
        }
        DeleteOutcome::Deleted
    } else if food.status.is_terminal() {
        DeleteOutcome::Retained
    } else {
        let cancelled = sqlx::query(
            "UPDATE food_items SET status = 'cancelled', updated_at = ? \
             WHERE id = ? AND status = 'available'",
        )
        .bind(now)
        .bind(&food.id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if cancelled > 0 {
            let declined = sqlx::query(
                "UPDATE food_requests SET status = 'declined', responded_at = ?, updated_at = ? \
                 WHERE food_id = ? AND status = 'pending'",
            )
            .bind(now)
            .bind(now)
            .bind(&food.id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
            users::adjust_active_listings(&mut *tx, &food.donor_id, -1).await?;
            DeleteOutcome::Cancelled { declined }
        } else {
            DeleteOutcome::Retained
        }
    };

    tx.commit().await?;
    Ok(outcome)
}

/// Flips the user's membership in the listing's saved-by set. Returns the new state.
pub async fn toggle_save(pool: &SqlitePool, user_id: &str, food_id: &str) -> Result<bool, sqlx::Error> {
    let removed = sqlx::query("DELETE FROM saved_food WHERE user_id = ? AND food_id = ?")
        .bind(user_id)
        .bind(food_id)
        .execute(pool)
        .await?
        .rows_affected();

    if removed > 0 {
        return Ok(false);
    }

    sqlx::query("INSERT OR IGNORE INTO saved_food (user_id, food_id, created_at) VALUES (?, ?, ?)")
        .bind(user_id)
        .bind(food_id)
        .bind(Utc::now())
        .execute(pool)
        .await?;
    Ok(true)
}

pub async fn count_by_status(pool: &SqlitePool, status: FoodStatus) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM food_items WHERE status = ?")
        .bind(status)
        .fetch_one(pool)
        .await
}

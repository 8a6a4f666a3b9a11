//! Document numbering shared by the outbound and receiving pipelines.
//!
//! Codes read `<PREFIX>-<YYYYMMDD>-<NNNN>`, where `NNNN` is one more than the
//! number of same-type documents the warehouse created that UTC day. Two
//! concurrent creations can compute the same number; the per-warehouse unique
//! index rejects the second one.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use sea_orm::error::{DbErr, SqlErr};
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QuerySelect};
use uuid::Uuid;

use crate::entities::sku::{self, Entity as Sku};
use crate::errors::ServiceError;

pub const RECEIVING_PREFIX: &str = "GRN";

pub fn format_document_code(prefix: &str, day: NaiveDate, sequence: u64) -> String {
    format!("{}-{}-{:04}", prefix, day.format("%Y%m%d"), sequence)
}

/// Half-open `[start, end)` UTC bounds of a calendar day.
pub fn day_bounds(day: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = Utc.from_utc_datetime(&day.and_time(NaiveTime::default()));
    (start, start + Duration::days(1))
}

/// Turns a code collision into a retryable precondition failure.
pub fn map_code_conflict(err: DbErr, code: &str) -> ServiceError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => ServiceError::PreconditionFailed(format!(
            "document code {} was taken concurrently, retry the request",
            code
        )),
        _ => ServiceError::DatabaseError(err),
    }
}

/// Fails with `NotFound` naming the first line sku that is unknown or inactive.
pub async fn ensure_active_skus<C: ConnectionTrait>(
    conn: &C,
    sku_ids: &[Uuid],
) -> Result<(), ServiceError> {
    if sku_ids.is_empty() {
        return Err(ServiceError::ValidationError(
            "at least one line item is required".to_string(),
        ));
    }
    let mut wanted = sku_ids.to_vec();
    wanted.sort();
    wanted.dedup();

    let found: Vec<Uuid> = Sku::find()
        .select_only()
        .column(sku::Column::Id)
        .filter(sku::Column::Id.is_in(wanted.iter().copied()))
        .filter(sku::Column::Active.eq(true))
        .into_tuple()
        .all(conn)
        .await?;
    if let Some(missing) = sku_ids.iter().find(|id| !found.contains(id)) {
        return Err(ServiceError::NotFound(format!("Sku {} not found", missing)));
    }
    Ok(())
}

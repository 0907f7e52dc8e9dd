//! The canonical manufacturer list.

use sqlx::PgPool;

use crate::DbError;

/// Canonical manufacturer names ordered by name.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_manufacturers(pool: &PgPool) -> Result<Vec<String>, DbError> {
    let names = sqlx::query_scalar::<_, String>("SELECT name FROM manufacturers ORDER BY name")
        .fetch_all(pool)
        .await?;
    Ok(names)
}

/// Adds a canonical name. Returns `false` when it already existed.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn insert_manufacturer(pool: &PgPool, name: &str) -> Result<bool, DbError> {
    let result = sqlx::query("INSERT INTO manufacturers (name) VALUES ($1) ON CONFLICT (name) DO NOTHING")
        .bind(name)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() == 1)
}

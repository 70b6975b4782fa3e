use chrono::{DateTime, Utc};
use sqlx::{Row, Sqlite, SqliteConnection, query::Query, sqlite::SqliteArguments};
use uuid::Uuid;

use crate::{
    db::error::{DbError, DbResult, map_write_error},
    models::AttributeValue,
};

/// Parse a UUID string from the database, returning a DbError on failure
pub fn parse_uuid(s: &str) -> DbResult<Uuid> {
    Uuid::parse_str(s).map_err(|e| DbError::Internal(format!("Invalid UUID in database: {}", e)))
}

/// Bind an attribute value in the column's storage representation.
pub(super) fn bind_attribute<'q>(
    query: Query<'q, Sqlite, SqliteArguments<'q>>,
    value: &AttributeValue,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    match value {
        AttributeValue::Id(id) => query.bind(id.to_string()),
        AttributeValue::Bool(b) => query.bind(i64::from(*b)),
        AttributeValue::Text(text) => query.bind(text.clone()),
    }
}

/// Insert a membership on an open connection or transaction.
///
/// Both ends must exist; an existing membership is left untouched.
pub(super) async fn insert_membership(
    conn: &mut SqliteConnection,
    user_id: Uuid,
    group_id: Uuid,
    now: DateTime<Utc>,
) -> DbResult<()> {
    let row = sqlx::query(
        r#"
        SELECT
            (SELECT COUNT(*) FROM users WHERE id = ?) AS user_count,
            (SELECT COUNT(*) FROM groups WHERE id = ?) AS group_count
        "#,
    )
    .bind(user_id.to_string())
    .bind(group_id.to_string())
    .fetch_one(&mut *conn)
    .await?;

    if row.get::<i64, _>("user_count") == 0 {
        return Err(DbError::MissingReference(format!(
            "User {} not found",
            user_id
        )));
    }
    if row.get::<i64, _>("group_count") == 0 {
        return Err(DbError::MissingReference(format!(
            "Group {} not found",
            group_id
        )));
    }

    sqlx::query(
        r#"
        INSERT INTO group_memberships (group_id, user_id, created_at)
        VALUES (?, ?, ?)
        ON CONFLICT (group_id, user_id) DO NOTHING
        "#,
    )
    .bind(group_id.to_string())
    .bind(user_id.to_string())
    .bind(now)
    .execute(&mut *conn)
    .await
    .map_err(|e| map_write_error(e, || "Membership already exists".to_string()))?;

    Ok(())
}

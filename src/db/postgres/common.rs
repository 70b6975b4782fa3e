use chrono::{DateTime, Utc};
use sqlx::{PgConnection, Postgres, Row, postgres::PgArguments, query::Query};
use uuid::Uuid;

use crate::{
    db::error::{DbError, DbResult, map_write_error},
    models::AttributeValue,
};

/// Bind an attribute value in the column's storage representation.
pub(super) fn bind_attribute<'q>(
    query: Query<'q, Postgres, PgArguments>,
    value: &AttributeValue,
) -> Query<'q, Postgres, PgArguments> {
    match value {
        AttributeValue::Id(id) => query.bind(*id),
        AttributeValue::Bool(b) => query.bind(*b),
        AttributeValue::Text(text) => query.bind(text.clone()),
    }
}

/// Insert a membership on an open connection or transaction.
///
/// Both ends must exist; an existing membership is left untouched.
pub(super) async fn insert_membership(
    conn: &mut PgConnection,
    user_id: Uuid,
    group_id: Uuid,
    now: DateTime<Utc>,
) -> DbResult<()> {
    let row = sqlx::query(
        r#"
        SELECT
            EXISTS(SELECT 1 FROM users WHERE id = $1) AS user_exists,
            EXISTS(SELECT 1 FROM groups WHERE id = $2) AS group_exists
        "#,
    )
    .bind(user_id)
    .bind(group_id)
    .fetch_one(&mut *conn)
    .await?;

    if !row.get::<bool, _>("user_exists") {
        return Err(DbError::MissingReference(format!(
            "User {} not found",
            user_id
        )));
    }
    if !row.get::<bool, _>("group_exists") {
        return Err(DbError::MissingReference(format!(
            "Group {} not found",
            group_id
        )));
    }

    sqlx::query(
        r#"
        INSERT INTO group_memberships (group_id, user_id, created_at)
        VALUES ($1, $2, $3)
        ON CONFLICT (group_id, user_id) DO NOTHING
        "#,
    )
    .bind(group_id)
    .bind(user_id)
    .bind(now)
    .execute(&mut *conn)
    .await
    .map_err(|e| map_write_error(e, || "Membership already exists".to_string()))?;

    Ok(())
}

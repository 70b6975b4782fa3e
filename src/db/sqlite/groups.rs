use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Row, SqlitePool, sqlite::SqliteRow};
use uuid::Uuid;

use super::common::{bind_attribute, insert_membership, parse_uuid};
use crate::{
    db::{
        error::{DbError, DbResult, map_write_error},
        repos::{GroupRepo, ListWindow},
    },
    models::{AttributeValue, CreateGroup, Group, GroupAttribute, GroupFilter, ResourceAttribute},
};

pub struct SqliteGroupRepo {
    pool: SqlitePool,
}

impl SqliteGroupRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn parse_group(row: &SqliteRow) -> DbResult<Group> {
        Ok(Group {
            id: parse_uuid(&row.get::<String, _>("id"))?,
            display_name: row.get("display_name"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        })
    }
}

#[async_trait]
impl GroupRepo for SqliteGroupRepo {
    async fn create(&self, input: CreateGroup) -> DbResult<Group> {
        let id = Uuid::new_v4();
        let now = Utc::now();

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO groups (id, display_name, created_at, updated_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(id.to_string())
        .bind(&input.display_name)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            map_write_error(e, || {
                format!(
                    "Group with displayName '{}' already exists",
                    input.display_name
                )
            })
        })?;

        for user_id in &input.member_ids {
            insert_membership(&mut tx, *user_id, id, now).await?;
        }

        tx.commit().await?;

        Ok(Group {
            id,
            display_name: input.display_name,
            created_at: now,
            updated_at: now,
        })
    }

    async fn get_by_id(&self, id: Uuid) -> DbResult<Option<Group>> {
        let row = sqlx::query(
            r#"
            SELECT id, display_name, created_at, updated_at
            FROM groups
            WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::parse_group).transpose()
    }

    async fn list(
        &self,
        filter: Option<&GroupFilter>,
        window: ListWindow,
    ) -> DbResult<Vec<Group>> {
        let rows = match filter {
            Some(filter) => {
                let query = format!(
                    r#"
                    SELECT id, display_name, created_at, updated_at
                    FROM groups
                    WHERE {} = ?
                    ORDER BY rowid
                    LIMIT ? OFFSET ?
                    "#,
                    filter.attribute.column()
                );
                bind_attribute(sqlx::query(&query), &filter.value)
                    .bind(window.limit)
                    .bind(window.offset)
                    .fetch_all(&self.pool)
                    .await?
            }
            None => {
                sqlx::query(
                    r#"
                    SELECT id, display_name, created_at, updated_at
                    FROM groups
                    ORDER BY rowid
                    LIMIT ? OFFSET ?
                    "#,
                )
                .bind(window.limit)
                .bind(window.offset)
                .fetch_all(&self.pool)
                .await?
            }
        };

        rows.iter().map(Self::parse_group).collect()
    }

    async fn replace(&self, id: Uuid, input: CreateGroup) -> DbResult<Group> {
        let now = Utc::now();

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE groups
            SET display_name = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&input.display_name)
        .bind(now)
        .bind(id.to_string())
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            map_write_error(e, || {
                format!(
                    "Group with displayName '{}' already exists",
                    input.display_name
                )
            })
        })?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound);
        }

        sqlx::query("DELETE FROM group_memberships WHERE group_id = ?")
            .bind(id.to_string())
            .execute(&mut *tx)
            .await?;

        for user_id in &input.member_ids {
            insert_membership(&mut tx, *user_id, id, now).await?;
        }

        let row = sqlx::query(
            r#"
            SELECT id, display_name, created_at, updated_at
            FROM groups
            WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Self::parse_group(&row)
    }

    async fn update_attribute(
        &self,
        id: Uuid,
        attribute: GroupAttribute,
        value: AttributeValue,
    ) -> DbResult<Group> {
        let query = format!(
            "UPDATE groups SET {} = ?, updated_at = ? WHERE id = ?",
            attribute.column()
        );
        let result = bind_attribute(sqlx::query(&query), &value)
            .bind(Utc::now())
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| {
                map_write_error(e, || format!("{} '{}' is already in use", attribute, value))
            })?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound);
        }

        self.get_by_id(id).await?.ok_or(DbError::NotFound)
    }
}

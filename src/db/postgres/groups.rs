use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use super::common::{bind_attribute, insert_membership};
use crate::{
    db::{
        error::{DbError, DbResult, map_write_error},
        repos::{GroupRepo, ListWindow},
    },
    models::{AttributeValue, CreateGroup, Group, GroupAttribute, GroupFilter, ResourceAttribute},
};

pub struct PostgresGroupRepo {
    write_pool: PgPool,
    read_pool: PgPool,
}

impl PostgresGroupRepo {
    pub fn new(write_pool: PgPool, read_pool: Option<PgPool>) -> Self {
        let read_pool = read_pool.unwrap_or_else(|| write_pool.clone());
        Self {
            write_pool,
            read_pool,
        }
    }

    fn parse_group(row: &PgRow) -> Group {
        Group {
            id: row.get("id"),
            display_name: row.get("display_name"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        }
    }
}

#[async_trait]
impl GroupRepo for PostgresGroupRepo {
    async fn create(&self, input: CreateGroup) -> DbResult<Group> {
        let id = Uuid::new_v4();
        let now = Utc::now();

        let mut tx = self.write_pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO groups (id, display_name, created_at, updated_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(id)
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
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.read_pool)
        .await?;

        Ok(row.as_ref().map(Self::parse_group))
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
                    WHERE {} = $1
                    ORDER BY seq
                    LIMIT $2 OFFSET $3
                    "#,
                    filter.attribute.column()
                );
                bind_attribute(sqlx::query(&query), &filter.value)
                    .bind(window.limit)
                    .bind(window.offset)
                    .fetch_all(&self.read_pool)
                    .await?
            }
            None => {
                sqlx::query(
                    r#"
                    SELECT id, display_name, created_at, updated_at
                    FROM groups
                    ORDER BY seq
                    LIMIT $1 OFFSET $2
                    "#,
                )
                .bind(window.limit)
                .bind(window.offset)
                .fetch_all(&self.read_pool)
                .await?
            }
        };

        Ok(rows.iter().map(Self::parse_group).collect())
    }

    async fn replace(&self, id: Uuid, input: CreateGroup) -> DbResult<Group> {
        let now = Utc::now();

        let mut tx = self.write_pool.begin().await?;

        let row = sqlx::query(
            r#"
            UPDATE groups
            SET display_name = $1, updated_at = $2
            WHERE id = $3
            RETURNING id, display_name, created_at, updated_at
            "#,
        )
        .bind(&input.display_name)
        .bind(now)
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| {
            map_write_error(e, || {
                format!(
                    "Group with displayName '{}' already exists",
                    input.display_name
                )
            })
        })?
        .ok_or(DbError::NotFound)?;

        sqlx::query("DELETE FROM group_memberships WHERE group_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        for user_id in &input.member_ids {
            insert_membership(&mut tx, *user_id, id, now).await?;
        }

        tx.commit().await?;

        Ok(Self::parse_group(&row))
    }

    async fn update_attribute(
        &self,
        id: Uuid,
        attribute: GroupAttribute,
        value: AttributeValue,
    ) -> DbResult<Group> {
        let query = format!(
            r#"
            UPDATE groups SET {} = $1, updated_at = $2
            WHERE id = $3
            RETURNING id, display_name, created_at, updated_at
            "#,
            attribute.column()
        );
        let row = bind_attribute(sqlx::query(&query), &value)
            .bind(Utc::now())
            .bind(id)
            .fetch_optional(&self.write_pool)
            .await
            .map_err(|e| {
                map_write_error(e, || format!("{} '{}' is already in use", attribute, value))
            })?;

        row.as_ref().map(Self::parse_group).ok_or(DbError::NotFound)
    }
}

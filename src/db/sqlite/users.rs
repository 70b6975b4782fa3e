use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Row, SqlitePool, sqlite::SqliteRow};
use uuid::Uuid;

use super::common::{bind_attribute, insert_membership, parse_uuid};
use crate::{
    db::{
        error::{DbError, DbResult, map_write_error},
        repos::{ListWindow, UserRepo},
    },
    models::{AttributeValue, CreateUser, ResourceAttribute, User, UserAttribute, UserFilter},
};

const USER_COLUMNS: &str = "id, active, user_name, given_name, middle_name, family_name, email, \
                            created_at, updated_at";

pub struct SqliteUserRepo {
    pool: SqlitePool,
}

impl SqliteUserRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn parse_user(row: &SqliteRow) -> DbResult<User> {
        Ok(User {
            id: parse_uuid(&row.get::<String, _>("id"))?,
            active: row.get::<i64, _>("active") != 0,
            user_name: row.get("user_name"),
            given_name: row.get("given_name"),
            middle_name: row.get("middle_name"),
            family_name: row.get("family_name"),
            email: row.get("email"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        })
    }
}

#[async_trait]
impl UserRepo for SqliteUserRepo {
    async fn create(&self, input: CreateUser) -> DbResult<User> {
        let id = Uuid::new_v4();
        let now = Utc::now();

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO users (
                id, active, user_name, given_name, middle_name, family_name, email,
                created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(id.to_string())
        .bind(i64::from(input.active))
        .bind(&input.user_name)
        .bind(&input.given_name)
        .bind(&input.middle_name)
        .bind(&input.family_name)
        .bind(&input.email)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            map_write_error(e, || {
                format!("User with userName '{}' already exists", input.user_name)
            })
        })?;

        for group_id in &input.group_ids {
            insert_membership(&mut tx, id, *group_id, now).await?;
        }

        tx.commit().await?;

        Ok(User {
            id,
            active: input.active,
            user_name: input.user_name,
            given_name: input.given_name,
            middle_name: input.middle_name,
            family_name: input.family_name,
            email: input.email,
            created_at: now,
            updated_at: now,
        })
    }

    async fn get_by_id(&self, id: Uuid) -> DbResult<Option<User>> {
        let query = format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS);
        let row = sqlx::query(&query)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::parse_user).transpose()
    }

    async fn list(&self, filter: Option<&UserFilter>, window: ListWindow) -> DbResult<Vec<User>> {
        let rows = match filter {
            Some(filter) => {
                let query = format!(
                    "SELECT {} FROM users WHERE {} = ? ORDER BY rowid LIMIT ? OFFSET ?",
                    USER_COLUMNS,
                    filter.attribute.column()
                );
                bind_attribute(sqlx::query(&query), &filter.value)
                    .bind(window.limit)
                    .bind(window.offset)
                    .fetch_all(&self.pool)
                    .await?
            }
            None => {
                let query = format!(
                    "SELECT {} FROM users ORDER BY rowid LIMIT ? OFFSET ?",
                    USER_COLUMNS
                );
                sqlx::query(&query)
                    .bind(window.limit)
                    .bind(window.offset)
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        rows.iter().map(Self::parse_user).collect()
    }

    async fn replace(&self, id: Uuid, input: CreateUser) -> DbResult<User> {
        let now = Utc::now();

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE users
            SET active = ?, user_name = ?, given_name = ?, middle_name = ?,
                family_name = ?, email = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(i64::from(input.active))
        .bind(&input.user_name)
        .bind(&input.given_name)
        .bind(&input.middle_name)
        .bind(&input.family_name)
        .bind(&input.email)
        .bind(now)
        .bind(id.to_string())
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            map_write_error(e, || {
                format!("User with userName '{}' already exists", input.user_name)
            })
        })?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound);
        }

        sqlx::query("DELETE FROM group_memberships WHERE user_id = ?")
            .bind(id.to_string())
            .execute(&mut *tx)
            .await?;

        for group_id in &input.group_ids {
            insert_membership(&mut tx, id, *group_id, now).await?;
        }

        let query = format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS);
        let row = sqlx::query(&query)
            .bind(id.to_string())
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        Self::parse_user(&row)
    }

    async fn update_attribute(
        &self,
        id: Uuid,
        attribute: UserAttribute,
        value: AttributeValue,
    ) -> DbResult<User> {
        let query = format!(
            "UPDATE users SET {} = ?, updated_at = ? WHERE id = ?",
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

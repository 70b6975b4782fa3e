use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use super::common::{bind_attribute, insert_membership};
use crate::{
    db::{
        error::{DbError, DbResult, map_write_error},
        repos::{ListWindow, UserRepo},
    },
    models::{AttributeValue, CreateUser, ResourceAttribute, User, UserAttribute, UserFilter},
};

const USER_COLUMNS: &str = "id, active, user_name, given_name, middle_name, family_name, email, \
                            created_at, updated_at";

pub struct PostgresUserRepo {
    write_pool: PgPool,
    read_pool: PgPool,
}

impl PostgresUserRepo {
    pub fn new(write_pool: PgPool, read_pool: Option<PgPool>) -> Self {
        let read_pool = read_pool.unwrap_or_else(|| write_pool.clone());
        Self {
            write_pool,
            read_pool,
        }
    }

    fn parse_user(row: &PgRow) -> User {
        User {
            id: row.get("id"),
            active: row.get("active"),
            user_name: row.get("user_name"),
            given_name: row.get("given_name"),
            middle_name: row.get("middle_name"),
            family_name: row.get("family_name"),
            email: row.get("email"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        }
    }
}

#[async_trait]
impl UserRepo for PostgresUserRepo {
    async fn create(&self, input: CreateUser) -> DbResult<User> {
        let id = Uuid::new_v4();
        let now = Utc::now();

        let mut tx = self.write_pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO users (
                id, active, user_name, given_name, middle_name, family_name, email,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(id)
        .bind(input.active)
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
        let query = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.read_pool)
            .await?;

        Ok(row.as_ref().map(Self::parse_user))
    }

    async fn list(&self, filter: Option<&UserFilter>, window: ListWindow) -> DbResult<Vec<User>> {
        let rows = match filter {
            Some(filter) => {
                let query = format!(
                    "SELECT {} FROM users WHERE {} = $1 ORDER BY seq LIMIT $2 OFFSET $3",
                    USER_COLUMNS,
                    filter.attribute.column()
                );
                bind_attribute(sqlx::query(&query), &filter.value)
                    .bind(window.limit)
                    .bind(window.offset)
                    .fetch_all(&self.read_pool)
                    .await?
            }
            None => {
                let query = format!(
                    "SELECT {} FROM users ORDER BY seq LIMIT $1 OFFSET $2",
                    USER_COLUMNS
                );
                sqlx::query(&query)
                    .bind(window.limit)
                    .bind(window.offset)
                    .fetch_all(&self.read_pool)
                    .await?
            }
        };

        Ok(rows.iter().map(Self::parse_user).collect())
    }

    async fn replace(&self, id: Uuid, input: CreateUser) -> DbResult<User> {
        let now = Utc::now();

        let mut tx = self.write_pool.begin().await?;

        let query = format!(
            r#"
            UPDATE users
            SET active = $1, user_name = $2, given_name = $3, middle_name = $4,
                family_name = $5, email = $6, updated_at = $7
            WHERE id = $8
            RETURNING {}
            "#,
            USER_COLUMNS
        );
        let row = sqlx::query(&query)
            .bind(input.active)
            .bind(&input.user_name)
            .bind(&input.given_name)
            .bind(&input.middle_name)
            .bind(&input.family_name)
            .bind(&input.email)
            .bind(now)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| {
                map_write_error(e, || {
                    format!("User with userName '{}' already exists", input.user_name)
                })
            })?
            .ok_or(DbError::NotFound)?;

        sqlx::query("DELETE FROM group_memberships WHERE user_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        for group_id in &input.group_ids {
            insert_membership(&mut tx, id, *group_id, now).await?;
        }

        tx.commit().await?;

        Ok(Self::parse_user(&row))
    }

    async fn update_attribute(
        &self,
        id: Uuid,
        attribute: UserAttribute,
        value: AttributeValue,
    ) -> DbResult<User> {
        let query = format!(
            "UPDATE users SET {} = $1, updated_at = $2 WHERE id = $3 RETURNING {}",
            attribute.column(),
            USER_COLUMNS
        );
        let row = bind_attribute(sqlx::query(&query), &value)
            .bind(Utc::now())
            .bind(id)
            .fetch_optional(&self.write_pool)
            .await
            .map_err(|e| {
                map_write_error(e, || format!("{} '{}' is already in use", attribute, value))
            })?;

        row.as_ref().map(Self::parse_user).ok_or(DbError::NotFound)
    }
}

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use super::common::insert_membership;
use crate::{
    db::{error::DbResult, repos::MembershipRepo},
    models::{Membership, member_display},
};

const MEMBERSHIP_SELECT: &str = r#"
    SELECT m.group_id, m.user_id, g.display_name, u.user_name, u.given_name, u.family_name
    FROM group_memberships m
    JOIN groups g ON g.id = m.group_id
    JOIN users u ON u.id = m.user_id
"#;

pub struct PostgresMembershipRepo {
    write_pool: PgPool,
    read_pool: PgPool,
}

impl PostgresMembershipRepo {
    pub fn new(write_pool: PgPool, read_pool: Option<PgPool>) -> Self {
        let read_pool = read_pool.unwrap_or_else(|| write_pool.clone());
        Self {
            write_pool,
            read_pool,
        }
    }

    fn parse_membership(row: &PgRow) -> Membership {
        let given: Option<String> = row.get("given_name");
        let family: Option<String> = row.get("family_name");
        let user_name: String = row.get("user_name");

        Membership {
            group_id: row.get("group_id"),
            user_id: row.get("user_id"),
            group_display: row.get("display_name"),
            user_display: member_display(given.as_deref(), family.as_deref(), &user_name),
        }
    }
}

#[async_trait]
impl MembershipRepo for PostgresMembershipRepo {
    async fn add(&self, user_id: Uuid, group_id: Uuid) -> DbResult<()> {
        let mut conn = self.write_pool.acquire().await?;
        insert_membership(&mut conn, user_id, group_id, Utc::now()).await
    }

    async fn remove(&self, user_id: Uuid, group_id: Uuid) -> DbResult<()> {
        sqlx::query("DELETE FROM group_memberships WHERE group_id = $1 AND user_id = $2")
            .bind(group_id)
            .bind(user_id)
            .execute(&self.write_pool)
            .await?;

        Ok(())
    }

    async fn list_all(&self) -> DbResult<Vec<Membership>> {
        let query = format!("{} ORDER BY m.seq", MEMBERSHIP_SELECT);
        let rows = sqlx::query(&query).fetch_all(&self.read_pool).await?;

        Ok(rows.iter().map(Self::parse_membership).collect())
    }

    async fn list_for_user(&self, user_id: Uuid) -> DbResult<Vec<Membership>> {
        let query = format!("{} WHERE m.user_id = $1 ORDER BY m.seq", MEMBERSHIP_SELECT);
        let rows = sqlx::query(&query)
            .bind(user_id)
            .fetch_all(&self.read_pool)
            .await?;

        Ok(rows.iter().map(Self::parse_membership).collect())
    }

    async fn list_for_group(&self, group_id: Uuid) -> DbResult<Vec<Membership>> {
        let query = format!("{} WHERE m.group_id = $1 ORDER BY m.seq", MEMBERSHIP_SELECT);
        let rows = sqlx::query(&query)
            .bind(group_id)
            .fetch_all(&self.read_pool)
            .await?;

        Ok(rows.iter().map(Self::parse_membership).collect())
    }
}

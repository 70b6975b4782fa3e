use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Row, SqlitePool, sqlite::SqliteRow};
use uuid::Uuid;

use super::common::{insert_membership, parse_uuid};
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

pub struct SqliteMembershipRepo {
    pool: SqlitePool,
}

impl SqliteMembershipRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn parse_membership(row: &SqliteRow) -> DbResult<Membership> {
        let given: Option<String> = row.get("given_name");
        let family: Option<String> = row.get("family_name");
        let user_name: String = row.get("user_name");

        Ok(Membership {
            group_id: parse_uuid(&row.get::<String, _>("group_id"))?,
            user_id: parse_uuid(&row.get::<String, _>("user_id"))?,
            group_display: row.get("display_name"),
            user_display: member_display(given.as_deref(), family.as_deref(), &user_name),
        })
    }
}

#[async_trait]
impl MembershipRepo for SqliteMembershipRepo {
    async fn add(&self, user_id: Uuid, group_id: Uuid) -> DbResult<()> {
        let mut conn = self.pool.acquire().await?;
        insert_membership(&mut conn, user_id, group_id, Utc::now()).await
    }

    async fn remove(&self, user_id: Uuid, group_id: Uuid) -> DbResult<()> {
        sqlx::query("DELETE FROM group_memberships WHERE group_id = ? AND user_id = ?")
            .bind(group_id.to_string())
            .bind(user_id.to_string())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn list_all(&self) -> DbResult<Vec<Membership>> {
        let query = format!("{} ORDER BY m.rowid", MEMBERSHIP_SELECT);
        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;

        rows.iter().map(Self::parse_membership).collect()
    }

    async fn list_for_user(&self, user_id: Uuid) -> DbResult<Vec<Membership>> {
        let query = format!("{} WHERE m.user_id = ? ORDER BY m.rowid", MEMBERSHIP_SELECT);
        let rows = sqlx::query(&query)
            .bind(user_id.to_string())
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(Self::parse_membership).collect()
    }

    async fn list_for_group(&self, group_id: Uuid) -> DbResult<Vec<Membership>> {
        let query = format!("{} WHERE m.group_id = ? ORDER BY m.rowid", MEMBERSHIP_SELECT);
        let rows = sqlx::query(&query)
            .bind(group_id.to_string())
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(Self::parse_membership).collect()
    }
}

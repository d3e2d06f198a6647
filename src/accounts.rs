/// Account directory
///
/// Supplies the account facts trust calculation needs. Unknown accounts are
/// treated as brand new and unverified.
use crate::{
    db::{format_timestamp, parse_timestamp},
    error::ModerationResult,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountInfo {
    pub created_at: DateTime<Utc>,
    pub identity_verified: bool,
}

#[async_trait]
pub trait AccountDirectory: Send + Sync {
    async fn lookup(&self, user_id: &str) -> ModerationResult<Option<AccountInfo>>;
}

/// Accounts stored in the local `moderation_account` table
#[derive(Clone)]
pub struct SqliteAccountDirectory {
    db: SqlitePool,
}

impl SqliteAccountDirectory {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Insert or replace an account's facts
    pub async fn upsert(&self, user_id: &str, info: &AccountInfo) -> ModerationResult<()> {
        sqlx::query(
            r#"
            INSERT INTO moderation_account (user_id, created_at, identity_verified)
            VALUES (?, ?, ?)
            ON CONFLICT(user_id) DO UPDATE SET
                created_at = excluded.created_at,
                identity_verified = excluded.identity_verified
            "#,
        )
        .bind(user_id)
        .bind(format_timestamp(info.created_at))
        .bind(info.identity_verified)
        .execute(&self.db)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl AccountDirectory for SqliteAccountDirectory {
    async fn lookup(&self, user_id: &str) -> ModerationResult<Option<AccountInfo>> {
        let row = sqlx::query(
            "SELECT created_at, identity_verified FROM moderation_account WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?;

        row.map(|row| {
            Ok(AccountInfo {
                created_at: parse_timestamp(&row.try_get::<String, _>("created_at")?)?,
                identity_verified: row.try_get("identity_verified")?,
            })
        })
        .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory_pool;
    use chrono::Duration;

    #[tokio::test]
    async fn test_upsert_and_lookup() {
        let directory = SqliteAccountDirectory::new(memory_pool().await.unwrap());
        assert!(directory.lookup("nobody").await.unwrap().is_none());

        let created_at = Utc::now() - Duration::days(40);
        let info = AccountInfo {
            created_at,
            identity_verified: false,
        };
        directory.upsert("user-1", &info).await.unwrap();

        let verified = AccountInfo {
            identity_verified: true,
            ..info
        };
        directory.upsert("user-1", &verified).await.unwrap();

        let found = directory.lookup("user-1").await.unwrap().unwrap();
        assert!(found.identity_verified);
        assert_eq!(
            format_timestamp(found.created_at),
            format_timestamp(created_at)
        );
    }
}

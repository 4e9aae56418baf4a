use crate::Db;
use domain::{CommentId, SectionKey, SubscriptionStatus, UserId};
use sqlx::Row;

impl Db {
    /// Stored status for a user, `None` when nothing is stored. A missing
    /// `comment_id` addresses the section-level subscription.
    pub async fn get_subscription(
        &self,
        user_id: UserId,
        key: &SectionKey,
        comment_id: Option<CommentId>,
    ) -> anyhow::Result<Option<SubscriptionStatus>> {
        let row = sqlx::query(
            r#"
            SELECT status FROM comment_subscriptions
            WHERE user_id = ? AND component = ? AND comment_area = ?
              AND context_id = ? AND item_id = ? AND comment_id = ?
            "#,
        )
        .bind(user_id)
        .bind(&key.component)
        .bind(&key.area)
        .bind(key.context_id)
        .bind(key.item_id)
        .bind(comment_id.unwrap_or(0))
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.and_then(|r| SubscriptionStatus::from_code(r.get(0))))
    }

    // Default 表示清除覆盖，直接删除记录
    pub async fn set_subscription(
        &self,
        user_id: UserId,
        key: &SectionKey,
        comment_id: Option<CommentId>,
        status: SubscriptionStatus,
    ) -> anyhow::Result<()> {
        let Some(code) = status.code() else {
            sqlx::query(
                r#"
                DELETE FROM comment_subscriptions
                WHERE user_id = ? AND component = ? AND comment_area = ?
                  AND context_id = ? AND item_id = ? AND comment_id = ?
                "#,
            )
            .bind(user_id)
            .bind(&key.component)
            .bind(&key.area)
            .bind(key.context_id)
            .bind(key.item_id)
            .bind(comment_id.unwrap_or(0))
            .execute(&self.pool)
            .await?;
            return Ok(());
        };

        sqlx::query(
            r#"
            INSERT INTO comment_subscriptions
                (user_id, component, comment_area, context_id, item_id, comment_id, status)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(user_id, component, comment_area, context_id, item_id, comment_id)
            DO UPDATE SET status = excluded.status
            "#,
        )
        .bind(user_id)
        .bind(&key.component)
        .bind(&key.area)
        .bind(key.context_id)
        .bind(key.item_id)
        .bind(comment_id.unwrap_or(0))
        .bind(code)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Every stored (user, status) pair for the section or one of its comments.
    pub async fn list_subscriptions(
        &self,
        key: &SectionKey,
        comment_id: Option<CommentId>,
    ) -> anyhow::Result<Vec<(UserId, SubscriptionStatus)>> {
        let rows = sqlx::query(
            r#"
            SELECT user_id, status FROM comment_subscriptions
            WHERE component = ? AND comment_area = ? AND context_id = ?
              AND item_id = ? AND comment_id = ?
            ORDER BY user_id ASC
            "#,
        )
        .bind(&key.component)
        .bind(&key.area)
        .bind(key.context_id)
        .bind(key.item_id)
        .bind(comment_id.unwrap_or(0))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .filter_map(|r| {
                let user_id: i64 = r.get(0);
                SubscriptionStatus::from_code(r.get(1)).map(|s| (user_id, s))
            })
            .collect())
    }

    pub async fn delete_user_subscriptions(&self, user_id: UserId) -> anyhow::Result<u64> {
        let result = sqlx::query("DELETE FROM comment_subscriptions WHERE user_id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> SectionKey {
        SectionKey::new("mod_demo", "notes", 1, 42).unwrap()
    }

    #[tokio::test]
    async fn section_and_comment_levels_are_separate() {
        let db = Db::in_memory().await.unwrap();
        db.set_subscription(5, &key(), None, SubscriptionStatus::Immediate)
            .await
            .unwrap();
        db.set_subscription(5, &key(), Some(9), SubscriptionStatus::Off)
            .await
            .unwrap();

        assert_eq!(
            db.get_subscription(5, &key(), None).await.unwrap(),
            Some(SubscriptionStatus::Immediate)
        );
        assert_eq!(
            db.get_subscription(5, &key(), Some(9)).await.unwrap(),
            Some(SubscriptionStatus::Off)
        );
        assert_eq!(db.get_subscription(6, &key(), None).await.unwrap(), None);
    }

    #[tokio::test]
    async fn default_clears_the_stored_status() {
        let db = Db::in_memory().await.unwrap();
        db.set_subscription(5, &key(), None, SubscriptionStatus::DailyDigest)
            .await
            .unwrap();
        db.set_subscription(5, &key(), None, SubscriptionStatus::Default)
            .await
            .unwrap();

        assert_eq!(db.get_subscription(5, &key(), None).await.unwrap(), None);
        assert!(db.list_subscriptions(&key(), None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_user_subscriptions_only_touches_that_user() {
        let db = Db::in_memory().await.unwrap();
        db.set_subscription(5, &key(), None, SubscriptionStatus::Immediate)
            .await
            .unwrap();
        db.set_subscription(6, &key(), None, SubscriptionStatus::Immediate)
            .await
            .unwrap();

        assert_eq!(db.delete_user_subscriptions(5).await.unwrap(), 1);
        assert_eq!(
            db.list_subscriptions(&key(), None).await.unwrap(),
            vec![(6, SubscriptionStatus::Immediate)]
        );
    }
}

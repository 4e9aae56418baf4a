use crate::Db;
use domain::{CommentId, UserId};
use sqlx::Row;
use tracing::debug;

impl Db {
    /// Records or withdraws a user's upvote. Returns false when the vote was
    /// already in the requested state, in which case the counter is untouched.
    pub async fn set_vote(
        &self,
        comment_id: CommentId,
        user_id: UserId,
        upvote: bool,
    ) -> anyhow::Result<bool> {
        let mut tx = self.pool.begin().await?;

        let changed = if upvote {
            sqlx::query("INSERT OR IGNORE INTO comment_votes (comment_id, user_id) VALUES (?, ?)")
                .bind(comment_id)
                .bind(user_id)
                .execute(&mut *tx)
                .await?
                .rows_affected()
        } else {
            sqlx::query("DELETE FROM comment_votes WHERE comment_id = ? AND user_id = ?")
                .bind(comment_id)
                .bind(user_id)
                .execute(&mut *tx)
                .await?
                .rows_affected()
        };

        if changed > 0 {
            let delta: i64 = if upvote { 1 } else { -1 };
            sqlx::query("UPDATE comments SET upvotes = upvotes + ? WHERE id = ?")
                .bind(delta)
                .bind(comment_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(changed > 0)
    }

    pub async fn has_vote(&self, comment_id: CommentId, user_id: UserId) -> anyhow::Result<bool> {
        let row = sqlx::query("SELECT 1 FROM comment_votes WHERE comment_id = ? AND user_id = ?")
            .bind(comment_id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    // 删除用户的全部投票，并同步扣减计数
    pub async fn delete_user_votes(&self, user_id: UserId) -> anyhow::Result<u64> {
        let mut tx = self.pool.begin().await?;

        let rows = sqlx::query("SELECT comment_id FROM comment_votes WHERE user_id = ?")
            .bind(user_id)
            .fetch_all(&mut *tx)
            .await?;

        for row in &rows {
            let comment_id: i64 = row.get(0);
            sqlx::query("UPDATE comments SET upvotes = upvotes - 1 WHERE id = ?")
                .bind(comment_id)
                .execute(&mut *tx)
                .await?;
        }

        let deleted = sqlx::query("DELETE FROM comment_votes WHERE user_id = ?")
            .bind(user_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        tx.commit().await?;
        debug!("Removed {} votes of user {}", deleted, user_id);
        Ok(deleted)
    }
}

use crate::{
    models::SqlComment,
    repo::filter::{push_filter, push_in, COMMENT_COLUMNS},
    Db,
};
use domain::{
    CommentFilter, CommentId, CommentRecord, ContextId, PageRequest, ParentScope, SortDirection,
};
use sqlx::{QueryBuilder, Sqlite};
use tracing::debug;

impl Db {
    // 插入评论，并在同一事务中增加父评论的回复计数
    pub async fn insert_comment(&self, c: &CommentRecord) -> anyhow::Result<CommentId> {
        let mut tx = self.pool.begin().await?;

        let id = sqlx::query(
            r#"
            INSERT INTO comments (
                context_id, component, comment_area, item_id,
                content, format, user_id, user_modified, pseudonym,
                time_created, time_modified, reply_to_id,
                replies, upvotes, custom_data
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(c.context_id)
        .bind(&c.component)
        .bind(&c.area)
        .bind(c.item_id)
        .bind(&c.content)
        .bind(c.format)
        .bind(c.user_id)
        .bind(c.user_modified)
        .bind(&c.pseudonym)
        .bind(c.time_created.timestamp())
        .bind(c.time_modified.timestamp())
        .bind(c.reply_to_id)
        .bind(c.replies)
        .bind(c.upvotes)
        .bind(&c.custom_data)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        if let Some(parent) = c.reply_to_id {
            sqlx::query("UPDATE comments SET replies = replies + 1 WHERE id = ?")
                .bind(parent)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        debug!("Inserted comment {} (reply to {:?})", id, c.reply_to_id);
        Ok(id)
    }

    // 只更新可变字段
    pub async fn update_comment(&self, c: &CommentRecord) -> anyhow::Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE comments
            SET content = ?, format = ?, pseudonym = ?,
                user_modified = ?, time_modified = ?, custom_data = ?
            WHERE id = ?
            "#,
        )
        .bind(&c.content)
        .bind(c.format)
        .bind(&c.pseudonym)
        .bind(c.user_modified)
        .bind(c.time_modified.timestamp())
        .bind(&c.custom_data)
        .bind(c.id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Deletes the comment and its direct replies, and decrements the
    /// parent's reply counter, all in one transaction. Returns the number of
    /// comment rows removed.
    pub async fn delete_comment(
        &self,
        id: CommentId,
        reply_to: Option<CommentId>,
    ) -> anyhow::Result<u64> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            DELETE FROM comment_votes
            WHERE comment_id = ? OR comment_id IN (SELECT id FROM comments WHERE reply_to_id = ?)
            "#,
        )
        .bind(id)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            DELETE FROM comment_subscriptions
            WHERE comment_id = ? OR comment_id IN (SELECT id FROM comments WHERE reply_to_id = ?)
            "#,
        )
        .bind(id)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        let replies = sqlx::query("DELETE FROM comments WHERE reply_to_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        let own = sqlx::query("DELETE FROM comments WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if let (Some(parent), true) = (reply_to, own > 0) {
            sqlx::query("UPDATE comments SET replies = replies - 1 WHERE id = ?")
                .bind(parent)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        debug!("Deleted comment {} with {} direct replies", id, replies);
        Ok(own + replies)
    }

    pub async fn get_comment(&self, id: CommentId) -> anyhow::Result<Option<CommentRecord>> {
        let mut qb = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {} FROM comments WHERE id = ",
            COMMENT_COLUMNS
        ));
        qb.push_bind(id);

        let row = qb
            .build_query_as::<SqlComment>()
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Into::into))
    }

    pub async fn get_comments_by_ids(
        &self,
        ids: &[CommentId],
    ) -> anyhow::Result<Vec<CommentRecord>> {
        let mut qb = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {} FROM comments WHERE 1 = 1",
            COMMENT_COLUMNS
        ));
        push_in(&mut qb, "id", ids);
        qb.push(" ORDER BY id ASC");

        let rows = qb
            .build_query_as::<SqlComment>()
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    pub async fn find_comments(
        &self,
        filter: &CommentFilter,
        sort: SortDirection,
        page: Option<PageRequest>,
    ) -> anyhow::Result<Vec<CommentRecord>> {
        let mut qb = QueryBuilder::<Sqlite>::new(format!("SELECT {} FROM comments", COMMENT_COLUMNS));
        push_filter(&mut qb, filter);

        // id 作为次要排序键，保证同一秒内的评论顺序稳定
        qb.push(" ORDER BY time_created ");
        qb.push(sort.as_sql());
        qb.push(", id ");
        qb.push(sort.as_sql());

        if let Some(page) = page {
            qb.push(" LIMIT ");
            qb.push_bind(page.limit);
            qb.push(" OFFSET ");
            qb.push_bind(page.offset);
        }

        let rows = qb
            .build_query_as::<SqlComment>()
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    pub async fn count_comments(&self, filter: &CommentFilter) -> anyhow::Result<u64> {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM comments");
        push_filter(&mut qb, filter);

        let count = qb.build_query_scalar::<i64>().fetch_one(&self.pool).await?;
        Ok(count.max(0) as u64)
    }

    /// Removes every matching comment together with its votes and
    /// comment-level subscriptions.
    pub async fn delete_comments_matching(&self, filter: &CommentFilter) -> anyhow::Result<u64> {
        let mut tx = self.pool.begin().await?;

        let mut qb = QueryBuilder::<Sqlite>::new(
            "DELETE FROM comment_votes WHERE comment_id IN (SELECT id FROM comments",
        );
        push_filter(&mut qb, filter);
        qb.push(")");
        qb.build().execute(&mut *tx).await?;

        // 整个评论区被清空时，评论区级别的订阅也一起删除
        let whole_sections = filter.parent == ParentScope::Any
            && filter.time_from.is_none()
            && filter.time_to.is_none();
        let mut qb = if whole_sections {
            let mut qb = QueryBuilder::<Sqlite>::new("DELETE FROM comment_subscriptions");
            push_filter(&mut qb, filter);
            qb
        } else {
            let mut qb = QueryBuilder::<Sqlite>::new(
                "DELETE FROM comment_subscriptions WHERE comment_id IN (SELECT id FROM comments",
            );
            push_filter(&mut qb, filter);
            qb.push(")");
            qb
        };
        qb.build().execute(&mut *tx).await?;

        let mut qb = QueryBuilder::<Sqlite>::new("DELETE FROM comments");
        push_filter(&mut qb, filter);
        let deleted = qb.build().execute(&mut *tx).await?.rows_affected();

        tx.commit().await?;
        Ok(deleted)
    }

    pub async fn delete_component_comments(&self, component: &str) -> anyhow::Result<u64> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "DELETE FROM comment_votes WHERE comment_id IN (SELECT id FROM comments WHERE component = ?)",
        )
        .bind(component)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM comment_subscriptions WHERE component = ?")
            .bind(component)
            .execute(&mut *tx)
            .await?;

        let deleted = sqlx::query("DELETE FROM comments WHERE component = ?")
            .bind(component)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        tx.commit().await?;
        Ok(deleted)
    }

    pub async fn delete_context_comments(&self, context_ids: &[ContextId]) -> anyhow::Result<u64> {
        let mut tx = self.pool.begin().await?;

        let mut qb = QueryBuilder::<Sqlite>::new(
            "DELETE FROM comment_votes WHERE comment_id IN (SELECT id FROM comments WHERE 1 = 1",
        );
        push_in(&mut qb, "context_id", context_ids);
        qb.push(")");
        qb.build().execute(&mut *tx).await?;

        let mut qb = QueryBuilder::<Sqlite>::new("DELETE FROM comment_subscriptions WHERE 1 = 1");
        push_in(&mut qb, "context_id", context_ids);
        qb.build().execute(&mut *tx).await?;

        let mut qb = QueryBuilder::<Sqlite>::new("DELETE FROM comments WHERE 1 = 1");
        push_in(&mut qb, "context_id", context_ids);
        let deleted = qb.build().execute(&mut *tx).await?.rows_affected();

        tx.commit().await?;
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use domain::ItemScope;

    fn record(item_id: i64, secs: i64, reply_to: Option<CommentId>) -> CommentRecord {
        let time: DateTime<Utc> = DateTime::from_timestamp(secs, 0).unwrap();
        CommentRecord {
            id: 0,
            context_id: 1,
            component: "mod_demo".into(),
            area: "notes".into(),
            item_id,
            content: format!("at {}", secs),
            format: 0,
            user_id: 10,
            user_modified: 10,
            pseudonym: None,
            time_created: time,
            time_modified: time,
            reply_to_id: reply_to,
            replies: 0,
            upvotes: 0,
            custom_data: String::new(),
        }
    }

    fn section_filter(item_id: i64) -> CommentFilter {
        CommentFilter::area("mod_demo", "notes", 1).with_items(ItemScope::One(item_id))
    }

    #[tokio::test]
    async fn insert_reply_increments_parent_counter() {
        let db = Db::in_memory().await.unwrap();
        let parent = db.insert_comment(&record(42, 100, None)).await.unwrap();
        db.insert_comment(&record(42, 200, Some(parent))).await.unwrap();
        db.insert_comment(&record(42, 300, Some(parent))).await.unwrap();

        let stored = db.get_comment(parent).await.unwrap().unwrap();
        assert_eq!(stored.replies, 2);
        assert_eq!(stored.content, "at 100");
    }

    #[tokio::test]
    async fn delete_removes_direct_replies_and_decrements_parent() {
        let db = Db::in_memory().await.unwrap();
        let top = db.insert_comment(&record(42, 100, None)).await.unwrap();
        let reply = db.insert_comment(&record(42, 200, Some(top))).await.unwrap();
        let other = db.insert_comment(&record(43, 300, None)).await.unwrap();

        let removed = db.delete_comment(reply, Some(top)).await.unwrap();
        assert_eq!(removed, 1);
        assert_eq!(db.get_comment(top).await.unwrap().unwrap().replies, 0);

        db.insert_comment(&record(42, 400, Some(top))).await.unwrap();
        db.insert_comment(&record(42, 500, Some(top))).await.unwrap();
        let removed = db.delete_comment(top, None).await.unwrap();
        assert_eq!(removed, 3);
        assert!(db.get_comment(other).await.unwrap().is_some());
        assert_eq!(db.count_comments(&section_filter(42).with_parent(ParentScope::Any)).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn filter_composes_scope_parent_and_time() {
        let db = Db::in_memory().await.unwrap();
        let top = db.insert_comment(&record(42, 100, None)).await.unwrap();
        db.insert_comment(&record(42, 150, Some(top))).await.unwrap();
        db.insert_comment(&record(42, 200, None)).await.unwrap();
        db.insert_comment(&record(7, 250, None)).await.unwrap();

        let top_level = section_filter(42).with_parent(ParentScope::TopLevel);
        assert_eq!(db.count_comments(&top_level).await.unwrap(), 2);
        let all = section_filter(42);
        assert_eq!(db.count_comments(&all).await.unwrap(), 3);
        let replies = section_filter(42).with_parent(ParentScope::RepliesTo(top));
        assert_eq!(db.count_comments(&replies).await.unwrap(), 1);

        let mut window = section_filter(42);
        window.time_from = DateTime::from_timestamp(150, 0);
        window.time_to = DateTime::from_timestamp(200, 0);
        let rows = db
            .find_comments(&window, SortDirection::Asc, None)
            .await
            .unwrap();
        let times: Vec<i64> = rows.iter().map(|r| r.time_created.timestamp()).collect();
        assert_eq!(times, vec![150, 200]);

        let nothing = CommentFilter::area("mod_demo", "notes", 1).with_items(ItemScope::AnyOf(vec![]));
        assert_eq!(db.count_comments(&nothing).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn find_sorts_and_pages() {
        let db = Db::in_memory().await.unwrap();
        for secs in [300, 100, 200, 400] {
            db.insert_comment(&record(42, secs, None)).await.unwrap();
        }
        let filter = section_filter(42);

        let page = db
            .find_comments(&filter, SortDirection::Desc, PageRequest::from_page(1, 3))
            .await
            .unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].time_created.timestamp(), 100);

        let asc = db
            .find_comments(&filter, SortDirection::Asc, PageRequest::from_page(0, 2))
            .await
            .unwrap();
        let times: Vec<i64> = asc.iter().map(|r| r.time_created.timestamp()).collect();
        assert_eq!(times, vec![100, 200]);
    }

    #[tokio::test]
    async fn batch_lookup_returns_only_existing_rows() {
        let db = Db::in_memory().await.unwrap();
        let a = db.insert_comment(&record(42, 100, None)).await.unwrap();
        let b = db.insert_comment(&record(42, 200, None)).await.unwrap();

        let rows = db.get_comments_by_ids(&[a, 999, b]).await.unwrap();
        let ids: Vec<CommentId> = rows.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![a, b]);
        assert!(db.get_comments_by_ids(&[]).await.unwrap().is_empty());
    }
}

use chrono::{DateTime, Utc};
use domain::{CommentRecord, UserRecord};
use sqlx::FromRow;

#[derive(FromRow)]
pub struct SqlComment {
    pub id: i64,
    pub context_id: i64,
    pub component: String,
    pub comment_area: String,
    pub item_id: i64,
    pub content: String,
    pub format: i64,
    pub user_id: i64,
    pub user_modified: i64,
    pub pseudonym: Option<String>,
    // 秒级 Unix 时间戳
    pub time_created: i64,
    pub time_modified: i64,
    pub reply_to_id: Option<i64>,
    pub replies: i64,
    pub upvotes: i64,
    pub custom_data: String,
}

impl From<SqlComment> for CommentRecord {
    fn from(sql: SqlComment) -> Self {
        CommentRecord {
            id: sql.id,
            context_id: sql.context_id,
            component: sql.component,
            area: sql.comment_area,
            item_id: sql.item_id,
            content: sql.content,
            format: sql.format as i32,
            user_id: sql.user_id,
            user_modified: sql.user_modified,
            pseudonym: sql.pseudonym,
            time_created: from_timestamp(sql.time_created),
            time_modified: from_timestamp(sql.time_modified),
            reply_to_id: sql.reply_to_id,
            replies: sql.replies,
            upvotes: sql.upvotes,
            custom_data: sql.custom_data,
        }
    }
}

#[derive(FromRow)]
pub struct SqlUser {
    pub id: i64,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
}

impl From<SqlUser> for UserRecord {
    fn from(sql: SqlUser) -> Self {
        UserRecord {
            id: sql.id,
            username: sql.username,
            first_name: sql.first_name,
            last_name: sql.last_name,
        }
    }
}

pub(crate) fn from_timestamp(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap_or_default()
}

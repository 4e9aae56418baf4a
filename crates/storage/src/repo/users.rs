use crate::{models::SqlUser, repo::filter::push_in, Db};
use domain::{UserId, UserRecord};
use sqlx::{QueryBuilder, Sqlite};

impl Db {
    // 批量读取用户，不存在的 id 直接忽略
    pub async fn get_users(&self, ids: &[UserId]) -> anyhow::Result<Vec<UserRecord>> {
        let mut qb = QueryBuilder::<Sqlite>::new(
            "SELECT id, username, first_name, last_name FROM users WHERE 1 = 1",
        );
        push_in(&mut qb, "id", ids);

        let rows = qb.build_query_as::<SqlUser>().fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    // 同步宿主系统的用户信息
    pub async fn upsert_user(&self, user: &UserRecord) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO users (id, username, first_name, last_name)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                username = excluded.username,
                first_name = excluded.first_name,
                last_name = excluded.last_name
            "#,
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: UserId, first: &str) -> UserRecord {
        UserRecord {
            id,
            username: format!("user{}", id),
            first_name: first.into(),
            last_name: "Doe".into(),
        }
    }

    #[tokio::test]
    async fn upsert_overwrites_names() {
        let db = Db::in_memory().await.unwrap();
        db.upsert_user(&user(1, "Jane")).await.unwrap();
        db.upsert_user(&user(1, "Janet")).await.unwrap();
        db.upsert_user(&user(2, "John")).await.unwrap();

        let mut users = db.get_users(&[1, 2, 3]).await.unwrap();
        users.sort_by_key(|u| u.id);
        assert_eq!(users.len(), 2);
        assert_eq!(users[0].full_name(), "Janet Doe");
    }
}

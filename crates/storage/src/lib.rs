use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous,
};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use std::str::FromStr;
use tracing::info;

mod models;
mod repo;
mod traits;

pub use traits::CommentStore;

#[derive(Clone)]
pub struct Db {
    pub(crate) pool: Pool<Sqlite>,
}

impl Db {
    /// Opens the database file, creating it and its directory when missing,
    /// and brings the schema up to date.
    pub async fn new(db_url: &str) -> anyhow::Result<Self> {
        if let Some(parent) = file_path(db_url).and_then(Path::parent) {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let options = SqliteConnectOptions::from_str(db_url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);
        let pool = SqlitePoolOptions::new().connect_with(options).await?;

        let db = Self::migrated(pool).await?;
        info!("Comments database ready at {}", db_url);
        Ok(db)
    }

    /// 每个内存连接都是独立的数据库，所以只保留一个常驻连接
    pub async fn in_memory() -> anyhow::Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;
        Self::migrated(pool).await
    }

    async fn migrated(pool: Pool<Sqlite>) -> anyhow::Result<Self> {
        sqlx::migrate!("../../migrations").run(&pool).await?;
        Ok(Self { pool })
    }
}

fn file_path(db_url: &str) -> Option<&Path> {
    if db_url.contains(":memory:") {
        return None;
    }
    db_url
        .strip_prefix("sqlite://")
        .map(|rest| rest.split_once('?').map_or(rest, |(path, _)| path))
        .map(Path::new)
}

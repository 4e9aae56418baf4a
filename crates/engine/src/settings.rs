use config::ConfigError;
use serde::Deserialize;
use std::collections::HashMap;

use crate::area::AreaOptions;

const ENV_PREFIX: &str = "COMMENTS_";

#[derive(Deserialize, Clone, Debug)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub comments: CommentsSettings,
    // component -> area -> options
    #[serde(default)]
    pub areas: HashMap<String, HashMap<String, AreaOptions>>,
}

#[derive(Deserialize, Clone, Debug)]
pub struct DatabaseSettings {
    pub url: String,
}

#[derive(Deserialize, Clone, Debug)]
pub struct CommentsSettings {
    pub enabled: bool,
    pub max_editing_time_secs: i64,
    pub max_page_size: i64,
    pub default_page_size: i64,
}

impl Settings {
    /// defaults -> comments.toml -> comments.{RUN_MODE}.toml -> COMMENTS_* env
    pub fn new() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let mut builder = defaults()?
            .add_source(config::File::with_name("comments").required(false))
            .add_source(config::File::with_name(&format!("comments.{}", run_mode)).required(false));

        for (key, value) in collect_env_vars() {
            builder = builder.set_override(key, value)?;
        }

        builder.build()?.try_deserialize()
    }

    pub fn from_toml_str(toml: &str) -> Result<Self, ConfigError> {
        defaults()?
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()?
            .try_deserialize()
    }

    pub fn area_options(&self, component: &str, area: &str) -> AreaOptions {
        self.areas
            .get(component)
            .and_then(|areas| areas.get(area))
            .copied()
            .unwrap_or_default()
    }
}

impl CommentsSettings {
    pub fn editing_window(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.max_editing_time_secs.max(0))
    }
}

fn defaults() -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
    config::Config::builder()
        .set_default("database.url", "sqlite://data/comments.db")?
        .set_default("comments.enabled", true)?
        .set_default("comments.max_editing_time_secs", 1800)?
        .set_default("comments.max_page_size", 200)?
        .set_default("comments.default_page_size", 50)
}

// COMMENTS_AREAS__MOD_DEMO__NOTES__ALLOW_REPLIES -> areas.mod_demo.notes.allow_replies
fn collect_env_vars() -> HashMap<String, String> {
    std::env::vars()
        .filter(|(k, _)| k.starts_with(ENV_PREFIX))
        .map(|(k, v)| {
            let new_key = k
                .trim_start_matches(ENV_PREFIX)
                .replace("__", ".")
                .to_lowercase();
            (new_key, v)
        })
        .collect()
}

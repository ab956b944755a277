//! Runtime settings: defaults, then `spaced-review.toml`, then environment.
//!
//! `SPACED_*` variables override the file (`SPACED_SQLITE__PATH=/tmp/x.db`).
//! The hosted backend also accepts the conventional `SUPABASE_URL` and
//! `SUPABASE_KEY` variables.

use crate::error::Result;
use chrono::{Datelike, Days, NaiveDate};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_CONFIG_PATH: &str = "spaced-review.toml";
pub const CONFIG_PATH_ENV: &str = "SPACED_REVIEW_CONFIG";
pub const DEFAULT_HEATMAP_WEEKS: u32 = 5;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Sqlite,
    Remote,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub backend: Backend,
    #[serde(default)]
    pub sqlite: SqliteConfig,
    #[serde(default)]
    pub remote: Option<RemoteConfig>,
    #[serde(default)]
    pub dashboard: DashboardConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SqliteConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteConfig {
    pub url: String,
    pub key: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardConfig {
    #[serde(default = "default_heatmap_weeks")]
    pub heatmap_weeks: u32,
    /// First day of the heatmap; when unset the grid ends in the current week.
    #[serde(default)]
    pub heatmap_start: Option<NaiveDate>,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            heatmap_weeks: default_heatmap_weeks(),
            heatmap_start: None,
        }
    }
}

impl DashboardConfig {
    /// Heatmap start date for `today`.
    pub fn start_for(&self, today: NaiveDate) -> NaiveDate {
        if let Some(start) = self.heatmap_start {
            return start;
        }
        let this_sunday = today - Days::new(u64::from(today.weekday().num_days_from_sunday()));
        let earlier_weeks = self.heatmap_weeks.saturating_sub(1);
        this_sunday - Days::new(u64::from(earlier_weeks) * 7)
    }
}

fn default_db_path() -> String {
    "learning.db".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_heatmap_weeks() -> u32 {
    DEFAULT_HEATMAP_WEEKS
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            sqlite: SqliteConfig::default(),
            remote: None,
            dashboard: DashboardConfig::default(),
        }
    }
}

impl Settings {
    /// Loads settings from the config file and the process environment.
    pub fn load() -> Result<Self> {
        let path =
            std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let figment = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(&path))
            .merge(Env::prefixed("SPACED_").split("__"))
            .merge(
                Env::raw()
                    .only(&["SUPABASE_URL", "SUPABASE_KEY"])
                    .map(|key| {
                        if key.as_str().eq_ignore_ascii_case("supabase_url") {
                            "remote.url".into()
                        } else {
                            "remote.key".into()
                        }
                    }),
            );
        Self::from_figment(figment)
    }

    pub fn from_figment(figment: Figment) -> Result<Self> {
        Ok(figment.extract()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Weekday;

    fn layered(toml: &str) -> Result<Settings> {
        Settings::from_figment(
            Figment::from(Serialized::defaults(Settings::default())).merge(Toml::string(toml)),
        )
    }

    #[test]
    fn test_defaults() {
        let settings = layered("").unwrap();
        assert_eq!(settings.backend, Backend::Sqlite);
        assert_eq!(settings.sqlite.path, "learning.db");
        assert_eq!(settings.remote, None);
        assert_eq!(settings.dashboard.heatmap_weeks, 5);
    }

    #[test]
    fn test_remote_section() {
        let settings = layered(
            r#"
            backend = "remote"
            [remote]
            url = "https://example.supabase.co"
            key = "anon"
            "#,
        )
        .unwrap();
        assert_eq!(settings.backend, Backend::Remote);
        let remote = settings.remote.unwrap();
        assert_eq!(remote.url, "https://example.supabase.co");
        assert_eq!(remote.timeout_secs, 10);
    }

    #[test]
    fn test_unknown_backend_rejected() {
        assert!(layered(r#"backend = "postgres""#).is_err());
    }

    #[test]
    fn test_heatmap_start_defaults_to_sunday() {
        let dashboard = DashboardConfig::default();
        // 2025-08-06 is a Wednesday
        let today = NaiveDate::from_ymd_opt(2025, 8, 6).unwrap();
        let start = dashboard.start_for(today);
        assert_eq!(start.weekday(), Weekday::Sun);
        assert_eq!(start, NaiveDate::from_ymd_opt(2025, 7, 6).unwrap());
        assert!(today < start + Days::new(35));
    }

    #[test]
    fn test_explicit_heatmap_start() {
        let settings = layered(
            r#"
            [dashboard]
            heatmap_start = "2025-07-30"
            heatmap_weeks = 6
            "#,
        )
        .unwrap();
        let today = NaiveDate::from_ymd_opt(2025, 8, 6).unwrap();
        assert_eq!(
            settings.dashboard.start_for(today),
            NaiveDate::from_ymd_opt(2025, 7, 30).unwrap()
        );
        assert_eq!(settings.dashboard.heatmap_weeks, 6);
    }

    #[test]
    fn test_env_overrides_file() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                DEFAULT_CONFIG_PATH,
                r#"
                [sqlite]
                path = "from-file.db"
                [dashboard]
                heatmap_weeks = 8
                "#,
            )?;
            jail.set_env("SPACED_SQLITE__PATH", "/tmp/from-env.db");

            let settings = Settings::load().expect("settings load");
            assert_eq!(settings.sqlite.path, "/tmp/from-env.db");
            assert_eq!(settings.dashboard.heatmap_weeks, 8);
            assert_eq!(settings.backend, Backend::Sqlite);
            Ok(())
        });
    }

    #[test]
    fn test_supabase_variables_fill_remote() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("SPACED_BACKEND", "remote");
            jail.set_env("SUPABASE_URL", "https://example.supabase.co");
            jail.set_env("SUPABASE_KEY", "anon");

            let settings = Settings::load().expect("settings load");
            assert_eq!(settings.backend, Backend::Remote);
            let remote = settings.remote.expect("remote section");
            assert_eq!(remote.url, "https://example.supabase.co");
            assert_eq!(remote.key, "anon");
            assert_eq!(remote.timeout_secs, 10);
            Ok(())
        });
    }

    #[test]
    fn test_config_path_from_env() {
        figment::Jail::expect_with(|jail| {
            jail.create_file("other.toml", r#"backend = "remote""#)?;
            jail.set_env(CONFIG_PATH_ENV, "other.toml");
            jail.set_env("SPACED_REMOTE__URL", "https://example.supabase.co");
            jail.set_env("SPACED_REMOTE__KEY", "anon");

            let settings = Settings::load().expect("settings load");
            assert_eq!(settings.backend, Backend::Remote);
            assert_eq!(settings.remote.map(|r| r.key), Some("anon".to_string()));
            Ok(())
        });
    }
}

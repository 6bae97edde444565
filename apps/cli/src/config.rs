//! Application configuration from the environment.

use std::path::PathBuf;

/// Runtime paths for the CLI.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub db_path: PathBuf,
    pub bank_path: Option<PathBuf>,
}

impl AppConfig {
    /// Read `STUDY_DB_PATH` and `STUDY_BANK_PATH`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let db_path = lookup("STUDY_DB_PATH")
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(default_db_path);
        let bank_path = lookup("STUDY_BANK_PATH")
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);
        Self { db_path, bank_path }
    }

    /// Command-line paths take precedence over the environment.
    pub fn with_overrides(mut self, db: Option<PathBuf>, bank: Option<PathBuf>) -> Self {
        if let Some(db) = db {
            self.db_path = db;
        }
        if bank.is_some() {
            self.bank_path = bank;
        }
        self
    }
}

fn default_db_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("study-engine")
        .join("study.db")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn reads_paths_from_env() {
        let config = AppConfig::from_lookup(lookup(&[
            ("STUDY_DB_PATH", "/tmp/s.db"),
            ("STUDY_BANK_PATH", "/tmp/bank.json"),
        ]));
        assert_eq!(config.db_path, PathBuf::from("/tmp/s.db"));
        assert_eq!(config.bank_path, Some(PathBuf::from("/tmp/bank.json")));
    }

    #[test]
    fn falls_back_to_data_dir() {
        let config = AppConfig::from_lookup(lookup(&[("STUDY_DB_PATH", "")]));
        assert!(config.db_path.ends_with("study-engine/study.db"));
        assert_eq!(config.bank_path, None);
    }

    #[test]
    fn flags_override_env() {
        let config = AppConfig::from_lookup(lookup(&[("STUDY_BANK_PATH", "env.json")]))
            .with_overrides(Some(PathBuf::from("flag.db")), None);
        assert_eq!(config.db_path, PathBuf::from("flag.db"));
        assert_eq!(config.bank_path, Some(PathBuf::from("env.json")));
    }
}

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct SimpleOrmConfig {
    pub database: Option<String>,
    /// Log every generated statement at debug level
    pub log_sql: Option<bool>,
}

impl SimpleOrmConfig {
    /// `--database` wins over the config file, which wins over the default.
    pub fn database_path(&self, cli: Option<&Path>) -> PathBuf {
        cli.map(Path::to_path_buf)
            .or_else(|| self.database.as_ref().map(PathBuf::from))
            .unwrap_or_else(default_database_path)
    }

    pub fn log_sql(&self) -> bool {
        self.log_sql.unwrap_or(false)
    }
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("simpleorm.toml")
}

pub fn default_database_path() -> PathBuf {
    PathBuf::from("simpleorm.db")
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Option<SimpleOrmConfig>> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    let config: SimpleOrmConfig = toml::from_str(&contents)?;
    Ok(Some(config))
}

pub fn write_config(path: &Path, config: &SimpleOrmConfig, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("config already exists at {} (use --force to overwrite)", path.display());
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(path, contents)?;
    Ok(())
}

pub fn ensure_db_dir(db_path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

//! Configuration file loader with multi-source merging

use super::file_config::FileConfig;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use std::path::{Path, PathBuf};

/// Project-level config file names, checked in order
const PROJECT_CONFIG_FILES: [&str; 2] = ["toolgate.toml", ".toolgate.toml"];

/// Prefix of environment overrides (`TOOLGATE_PIPELINE__MAX_TURNS=3`)
const ENV_PREFIX: &str = "TOOLGATE_";

/// Configuration loader that handles file discovery and merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from all sources with proper priority
    ///
    /// Priority (highest to lowest):
    /// 1. `TOOLGATE_` environment variables (`__` separates nested keys)
    /// 2. Explicit config path (if provided)
    /// 3. Project root: `./toolgate.toml` or `./.toolgate.toml`
    /// 4. Global: `$XDG_CONFIG_HOME/toolgate/config.toml`
    /// 5. Default values
    pub fn load(config_path: Option<&PathBuf>) -> Result<FileConfig, Box<figment::Error>> {
        let global = Self::global_config_path().filter(|p| p.exists());
        let project = Self::project_config_path();
        Self::ensure_exists(config_path.map(PathBuf::as_path))?;
        Self::figment(global.as_deref(), project.as_deref(), config_path.map(PathBuf::as_path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .map_err(Box::new)
    }

    /// Load the given files only, without environment overrides.
    pub fn load_files(
        global: Option<&Path>,
        project: Option<&Path>,
        explicit: Option<&Path>,
    ) -> Result<FileConfig, Box<figment::Error>> {
        Self::ensure_exists(explicit)?;
        Self::figment(global, project, explicit)
            .extract()
            .map_err(Box::new)
    }

    fn figment(global: Option<&Path>, project: Option<&Path>, explicit: Option<&Path>) -> Figment {
        let mut figment = Figment::new().merge(Serialized::defaults(FileConfig::default()));
        for path in [global, project, explicit].into_iter().flatten() {
            figment = figment.merge(Toml::file_exact(path));
        }
        figment
    }

    /// A missing file named on the command line is an error, not a no-op.
    fn ensure_exists(explicit: Option<&Path>) -> Result<(), Box<figment::Error>> {
        match explicit {
            Some(path) if !path.exists() => Err(Box::new(figment::Error::from(format!(
                "config file not found: {}",
                path.display()
            )))),
            _ => Ok(()),
        }
    }

    /// Load only default configuration (for --no-config)
    pub fn load_defaults() -> FileConfig {
        FileConfig::default()
    }

    /// Get the global config file path
    ///
    /// Returns XDG_CONFIG_HOME/toolgate/config.toml if set,
    /// otherwise falls back to ~/.config/toolgate/config.toml
    pub fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("toolgate").join("config.toml"))
    }

    /// Get the project-level config file path (if it exists)
    pub fn project_config_path() -> Option<PathBuf> {
        PROJECT_CONFIG_FILES
            .iter()
            .map(PathBuf::from)
            .find(|path| path.exists())
    }

    /// Describe the config file locations being used, one line each
    pub fn describe_sources(explicit: Option<&PathBuf>) -> Vec<String> {
        let mut lines = Vec::new();

        if let Some(path) = explicit {
            let mark = if path.exists() { "FOUND" } else { "MISSING" };
            lines.push(format!("[{:^7}] Explicit: {}", mark, path.display()));
        }

        match Self::project_config_path() {
            Some(path) => lines.push(format!("[ FOUND ] Project:  {}", path.display())),
            None => lines.push(format!(
                "[       ] Project:  ./{} or ./{}",
                PROJECT_CONFIG_FILES[0], PROJECT_CONFIG_FILES[1]
            )),
        }

        if let Some(path) = Self::global_config_path() {
            let mark = if path.exists() { " FOUND " } else { "       " };
            lines.push(format!("[{}] Global:   {}", mark, path.display()));
        }

        lines.push(format!("[       ] Env:      {}*", ENV_PREFIX));
        lines.push("[       ] Default:  built-in defaults".to_string());
        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_load_defaults() {
        let config = ConfigLoader::load_defaults();
        assert_eq!(config.pipeline.max_turns, 10);
        assert!(config.roles.is_empty());
    }

    #[test]
    fn test_global_config_path_returns_some() {
        // Should return a path (even if file doesn't exist)
        let path = ConfigLoader::global_config_path();
        assert!(path.is_some());
        let path = path.unwrap();
        assert!(path.to_string_lossy().contains("toolgate"));
    }

    #[test]
    fn test_later_files_override_earlier_ones() {
        let dir = tempfile::tempdir().unwrap();
        let global = dir.path().join("global.toml");
        let project = dir.path().join("toolgate.toml");
        fs::write(
            &global,
            "[pipeline]\nmax_turns = 3\nstreaming = true\n\n[quotas]\nmax_cost_per_day = 1.0\n",
        )
        .unwrap();
        fs::write(&project, "[pipeline]\nmax_turns = 7\n").unwrap();

        let config =
            ConfigLoader::load_files(Some(global.as_path()), Some(project.as_path()), None)
                .unwrap();
        assert_eq!(config.pipeline.max_turns, 7);
        // Untouched keys keep the lower layer's value
        assert!(config.pipeline.streaming);
        assert_eq!(config.quotas.max_cost_per_day, Some(1.0));
        assert_eq!(config.engine.default_timeout_secs, 30);
    }

    #[test]
    fn test_explicit_file_wins() {
        let dir = tempfile::tempdir().unwrap();
        let project = dir.path().join("toolgate.toml");
        let explicit = dir.path().join("ci.toml");
        fs::write(&project, "[engine]\ncooldown_secs = 5\n").unwrap();
        fs::write(&explicit, "[engine]\ncooldown_secs = 60\n").unwrap();

        let config =
            ConfigLoader::load_files(None, Some(project.as_path()), Some(explicit.as_path()))
                .unwrap();
        assert_eq!(config.engine.cooldown_secs, 60);
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(ConfigLoader::load_files(None, None, Some(missing.as_path())).is_err());
    }

    #[test]
    fn test_type_errors_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        let bad = dir.path().join("bad.toml");
        fs::write(&bad, "[pipeline]\nmax_turns = \"many\"\n").unwrap();
        assert!(ConfigLoader::load_files(None, Some(bad.as_path()), None).is_err());
    }
}

use adscale_core::config::{
    ChartOptions, SyntheticOptions, DEFAULT_CHART_HEIGHT, DEFAULT_CHART_WIDTH,
    DEFAULT_NUM_CAMPAIGNS, DEFAULT_NUM_DAYS, DEFAULT_TOP_N,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const CONFIG_ENV_VAR: &str = "ADSCALE_CONFIG";

/// Persistent defaults read from `settings.toml`. CLI flags take precedence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub top_n: usize,
    pub num_campaigns: usize,
    pub num_days: usize,
    pub seed: Option<u64>,
    pub chart_width: u32,
    pub chart_height: u32,
    pub font_path: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            top_n: DEFAULT_TOP_N,
            num_campaigns: DEFAULT_NUM_CAMPAIGNS,
            num_days: DEFAULT_NUM_DAYS,
            seed: None,
            chart_width: DEFAULT_CHART_WIDTH,
            chart_height: DEFAULT_CHART_HEIGHT,
            font_path: None,
        }
    }
}

impl Settings {
    /// Priority: explicit path > ADSCALE_CONFIG > <config dir>/adscale/settings.toml
    pub fn config_path(explicit: Option<&Path>) -> Option<PathBuf> {
        explicit
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(CONFIG_ENV_VAR).map(PathBuf::from))
            .or_else(|| dirs::config_dir().map(|dir| dir.join("adscale").join("settings.toml")))
    }

    pub fn load(explicit: Option<&Path>) -> Self {
        Self::config_path(explicit)
            .map(|path| Self::load_from(&path))
            .unwrap_or_default()
    }

    /// Missing files yield the defaults; malformed ones are reported and ignored.
    pub fn load_from(path: &Path) -> Self {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                debug!("No settings loaded from {}: {}", path.display(), err);
                return Self::default();
            }
        };

        match toml::from_str(&content) {
            Ok(settings) => {
                debug!("Loaded settings from {}", path.display());
                settings
            }
            Err(err) => {
                warn!("Ignoring malformed settings file {}: {}", path.display(), err);
                Self::default()
            }
        }
    }

    pub fn chart_options(&self) -> ChartOptions {
        ChartOptions {
            width: self.chart_width,
            height: self.chart_height,
            font_path: self.font_path.clone(),
        }
    }

    pub fn synthetic_options(&self) -> SyntheticOptions {
        SyntheticOptions {
            num_campaigns: self.num_campaigns,
            num_days: self.num_days,
            seed: self.seed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    fn restore_env(var: &str, previous: Option<std::ffi::OsString>) {
        match previous {
            Some(value) => std::env::set_var(var, value),
            None => std::env::remove_var(var),
        }
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let settings = Settings::load_from(&dir.path().join("absent.toml"));
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.top_n, 3);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.toml");
        fs::write(&path, "top_n = 5\nseed = 42\nchart_width = 800\n").unwrap();

        let settings = Settings::load_from(&path);
        assert_eq!(settings.top_n, 5);
        assert_eq!(settings.seed, Some(42));
        assert_eq!(settings.chart_width, 800);
        assert_eq!(settings.chart_height, DEFAULT_CHART_HEIGHT);
        assert_eq!(settings.num_campaigns, DEFAULT_NUM_CAMPAIGNS);
    }

    #[test]
    fn test_malformed_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.toml");
        fs::write(&path, "top_n = \"many\"\n[[[").unwrap();

        assert_eq!(Settings::load_from(&path), Settings::default());
    }

    #[test]
    fn test_options_conversion() {
        let settings = Settings {
            num_campaigns: 7,
            num_days: 2,
            seed: Some(1),
            font_path: Some(PathBuf::from("/fonts/a.ttf")),
            ..Settings::default()
        };

        let synthetic = settings.synthetic_options();
        assert_eq!((synthetic.num_campaigns, synthetic.num_days), (7, 2));
        assert_eq!(synthetic.seed, Some(1));
        assert_eq!(
            settings.chart_options().font_path,
            Some(PathBuf::from("/fonts/a.ttf"))
        );
    }

    #[test]
    #[serial]
    fn test_explicit_path_beats_env() {
        let previous = std::env::var_os(CONFIG_ENV_VAR);
        std::env::set_var(CONFIG_ENV_VAR, "/from/env.toml");

        let path = Settings::config_path(Some(Path::new("/explicit.toml")));
        restore_env(CONFIG_ENV_VAR, previous);

        assert_eq!(path, Some(PathBuf::from("/explicit.toml")));
    }

    #[test]
    #[serial]
    fn test_env_path_used_without_explicit() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("env.toml");
        fs::write(&path, "top_n = 9\n").unwrap();

        let previous = std::env::var_os(CONFIG_ENV_VAR);
        std::env::set_var(CONFIG_ENV_VAR, &path);
        let settings = Settings::load(None);
        restore_env(CONFIG_ENV_VAR, previous);

        assert_eq!(settings.top_n, 9);
    }
}

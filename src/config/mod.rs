use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::errors::PipelineError;

/// One explicit configuration structure for a whole batch run.
///
/// The transforms never read ambient process state; everything they need is
/// carried in here and passed down by the driver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub pipeline: PipelineConfig,
    pub fetch: FetchConfig,
    pub paths: PathsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// ISO country code baked into programme identifiers
    pub country: String,
    /// Namespace prefix of the identifier scheme
    pub uid_namespace: String,
    /// `system` attribute written on created `<rating>` elements
    pub rating_system: String,
    /// Accept a batch that produced zero programmes instead of failing
    pub allow_empty: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    pub user_agent: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// One feed URL per line
    pub sources_file: PathBuf,
    /// `old-id,new-id[,logo-url]` per line; optional
    pub channel_map_file: PathBuf,
    /// One channel id or display-name per line; optional
    pub allowlist_file: Option<PathBuf>,
    pub output: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            pipeline: PipelineConfig {
                country: "es".to_string(),
                uid_namespace: "epgforge".to_string(),
                rating_system: "ES".to_string(),
                allow_empty: false,
            },
            fetch: FetchConfig {
                user_agent: "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 Safari/537.36"
                    .to_string(),
                timeout_secs: 60,
            },
            paths: PathsConfig {
                sources_file: PathBuf::from("epgs.txt"),
                channel_map_file: PathBuf::from("canales.txt"),
                allowlist_file: None,
                output: PathBuf::from("epg.xml"),
            },
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// An explicitly named file must exist and parse; with no file named, an
    /// `epg-forge.toml` in the working directory is used when present,
    /// defaults otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self, PipelineError> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let default_path = Path::new("epg-forge.toml");
                if default_path.exists() {
                    Self::from_file(default_path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    fn from_file(path: &Path) -> Result<Self, PipelineError> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| PipelineError::input_not_found(path, e))?;
        toml::from_str(&contents)
            .map_err(|e| PipelineError::Config(format!("{}: {}", path.display(), e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.pipeline.country, "es");
        assert_eq!(config.pipeline.uid_namespace, "epgforge");
        assert!(!config.pipeline.allow_empty);
        assert_eq!(config.paths.sources_file, PathBuf::from("epgs.txt"));
        assert!(config.paths.allowlist_file.is_none());
    }

    #[test]
    fn test_load_from_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[pipeline]
country = "pt"
uid_namespace = "guia"
rating_system = "PT"
allow_empty = true

[fetch]
user_agent = "test-agent"
timeout_secs = 5

[paths]
sources_file = "feeds.txt"
channel_map_file = "map.txt"
allowlist_file = "allow.txt"
output = "out.xml"
"#,
        )
        .unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.pipeline.country, "pt");
        assert!(config.pipeline.allow_empty);
        assert_eq!(config.fetch.timeout_secs, 5);
        assert_eq!(config.paths.allowlist_file, Some(PathBuf::from("allow.txt")));
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let err = Config::load(Some(Path::new("/nonexistent/epg.toml"))).unwrap_err();
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn test_invalid_toml_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "pipeline = 42").unwrap();
        let err = Config::load(Some(&path)).unwrap_err();
        assert!(matches!(err, PipelineError::Config(_)));
    }
}

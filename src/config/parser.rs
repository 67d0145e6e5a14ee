use super::{Config, ConfigFile};
use crate::error::{Error, Result};
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "devctl.yaml";
const ALT_CONFIG_FILE_NAME: &str = "devctl.yml";

pub struct Parser;

impl Parser {
    pub fn new() -> Self {
        Self
    }

    /// `devctl.yaml` in the working directory or the nearest ancestor that has one.
    pub fn find_config_file(&self) -> Result<PathBuf> {
        let current_dir = std::env::current_dir()?;
        Self::find_config_in_dir(&current_dir)
    }

    pub fn find_config_in_dir(dir: &Path) -> Result<PathBuf> {
        for name in [CONFIG_FILE_NAME, ALT_CONFIG_FILE_NAME] {
            let candidate = dir.join(name);
            if candidate.exists() {
                return Ok(candidate);
            }
        }

        if let Some(parent) = dir.parent() {
            return Self::find_config_in_dir(parent);
        }

        Err(Error::Config(format!(
            "Could not find {} in current directory or any parent",
            CONFIG_FILE_NAME
        )))
    }

    /// Load config from file path. The file's directory becomes the project root.
    pub fn load_config<P: AsRef<Path>>(&self, path: P) -> Result<Config> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            Error::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        let root = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => std::env::current_dir()?,
        };

        self.parse_config(&content, root)
    }

    /// Parse `content` as `devctl.yaml`, resolving relative paths against `project_root`.
    pub fn parse_config(&self, content: &str, project_root: impl Into<PathBuf>) -> Result<Config> {
        // An empty or comment-only file means "all defaults"
        let file: ConfigFile = if content.trim().is_empty() {
            ConfigFile::default()
        } else {
            serde_yaml::from_str::<Option<ConfigFile>>(content)
                .map_err(|e| Error::Parse(format!("Failed to parse YAML config: {}", e)))?
                .unwrap_or_default()
        };

        Ok(Config::from_file(file, project_root))
    }

    /// Resolve the configuration for a CLI invocation.
    ///
    /// `--config` wins; otherwise `devctl.yaml` is searched upwards from the
    /// working directory; with no file anywhere the built-in defaults apply.
    /// `--workdir` overrides the project root in every case.
    pub fn resolve(&self, config: Option<&Path>, workdir: Option<&Path>) -> Result<Config> {
        let start_dir = match workdir {
            Some(dir) => dir.to_path_buf(),
            None => std::env::current_dir()?,
        };

        let found = match config {
            Some(path) => Some(path.to_path_buf()),
            None => Self::find_config_in_dir(&start_dir).ok(),
        };

        let mut resolved = match found {
            Some(path) => {
                tracing::debug!("Loading configuration from {}", path.display());
                self.load_config(&path)?
            }
            None => {
                tracing::debug!(
                    "No {} found, using built-in defaults",
                    CONFIG_FILE_NAME
                );
                Config::defaults(start_dir.clone())
            }
        };

        if let Some(dir) = workdir {
            resolved.project_root = dir.to_path_buf();
        }

        Ok(resolved)
    }
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_parse_partial_config() {
        let yaml = r#"
backend:
  port: 9090
  fallback_ports: [9091]
  command: ./gradlew bootRun
supervisor:
  grace_period: 2s
  open_browser: false
"#;

        let config = Parser::new().parse_config(yaml, "/proj").unwrap();

        assert_eq!(config.backend.port, 9090);
        assert_eq!(config.backend.fallback_ports, vec![9091]);
        assert_eq!(config.backend.command, vec!["./gradlew", "bootRun"]);
        // untouched fields keep their defaults
        assert_eq!(config.frontend.port, 5173);
        assert_eq!(config.supervisor.grace_period, Duration::from_secs(2));
        assert_eq!(config.supervisor.ready_timeout, Duration::from_secs(120));
        assert!(!config.supervisor.open_browser);
    }

    #[test]
    fn test_parse_empty_config() {
        let config = Parser::new().parse_config("# nothing here\n", "/proj").unwrap();
        assert_eq!(config.backend.port, 8081);
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let err = Parser::new()
            .parse_config("backend:\n  prot: 1\n", "/proj")
            .unwrap_err();
        assert!(matches!(err, Error::Parse(_)), "{}", err);
    }

    #[test]
    fn test_invalid_duration_is_rejected() {
        let err = Parser::new()
            .parse_config("supervisor:\n  grace_period: soon\n", "/proj")
            .unwrap_err();
        assert!(err.to_string().contains("soon"), "{}", err);
    }

    #[test]
    fn test_find_config_in_parent() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(CONFIG_FILE_NAME), "").unwrap();
        let nested = dir.path().join("a").join("b");
        fs::create_dir_all(&nested).unwrap();

        let found = Parser::find_config_in_dir(&nested).unwrap();
        assert_eq!(found, dir.path().join(CONFIG_FILE_NAME));
    }

    #[test]
    fn test_resolve_without_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Parser::new().resolve(None, Some(dir.path())).unwrap();
        assert_eq!(config.project_root, dir.path());
        assert_eq!(config.frontend.port, 5173);
    }
}

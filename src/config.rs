//! Host settings
//!
//! All settings come from the environment, read once at startup into a
//! [`Settings`] value that is handed to the engine.
//!
//! # Environment Variables
//!
//! - `FRANKENPHP_STATE_DIR` - Directory holding `state.json`
//! - `FRANKENPHP_LOG_FILE` - Append log records here instead of stderr
//! - `FRANKENPHP_WEB_ROOT` - Parent directory of site web roots
//! - `FRANKENPHP_CADDY_CONFIG_DIR` - Directory of per-site config files
//! - `FRANKENPHP_CADDY_RELOAD` - Reload command, split on whitespace
//! - `FRANKENPHP_DB_HOST`, `FRANKENPHP_DB_ROOT_USER`, `FRANKENPHP_DB_ROOT_PASSWORD`
//! - `FRANKENPHP_DB_CLIENT` - Database client binary
//! - `FRANKENPHP_PHP_VERSION` - Default PHP label for new sites
//! - `FRANKENPHP_COMMAND_TIMEOUT` - Seconds before an external command is killed
//! - `FRANKENPHP_WP_DOWNLOAD_URL` - WordPress core tarball

use secrecy::SecretString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::validate;

pub const ENV_STATE_DIR: &str = "FRANKENPHP_STATE_DIR";
pub const ENV_LOG_FILE: &str = "FRANKENPHP_LOG_FILE";
pub const ENV_WEB_ROOT: &str = "FRANKENPHP_WEB_ROOT";
pub const ENV_SITES_DIR: &str = "FRANKENPHP_CADDY_CONFIG_DIR";
pub const ENV_RELOAD: &str = "FRANKENPHP_CADDY_RELOAD";
pub const ENV_DB_HOST: &str = "FRANKENPHP_DB_HOST";
pub const ENV_DB_ROOT_USER: &str = "FRANKENPHP_DB_ROOT_USER";
pub const ENV_DB_ROOT_PASSWORD: &str = "FRANKENPHP_DB_ROOT_PASSWORD";
pub const ENV_DB_CLIENT: &str = "FRANKENPHP_DB_CLIENT";
pub const ENV_PHP_VERSION: &str = "FRANKENPHP_PHP_VERSION";
pub const ENV_COMMAND_TIMEOUT: &str = "FRANKENPHP_COMMAND_TIMEOUT";
pub const ENV_WP_DOWNLOAD_URL: &str = "FRANKENPHP_WP_DOWNLOAD_URL";

const DEFAULT_STATE_DIR: &str = "/var/lib/frankenphp-cli";
const DEFAULT_WEB_ROOT: &str = "/var/www";
const DEFAULT_SITES_DIR: &str = "/etc/caddy/sites.d";
const DEFAULT_RELOAD: &str = "systemctl reload caddy";
const DEFAULT_WP_DOWNLOAD_URL: &str = "https://wordpress.org/latest.tar.gz";
const DEFAULT_DB_HOST: &str = "localhost";
const DEFAULT_DB_ROOT_USER: &str = "root";
const DEFAULT_DB_CLIENT: &str = "mysql";
const DEFAULT_PHP_VERSION: &str = "8.3";
const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 120;

/// State file name inside the state directory
pub const STATE_FILE_NAME: &str = "state.json";

/// Database server connection used for DDL
#[derive(Debug)]
pub struct DatabaseSettings {
    pub client: String,
    pub host: String,
    pub root_user: String,
    /// Empty means "let the client use its own defaults"
    pub root_password: SecretString,
}

#[derive(Debug)]
pub struct Settings {
    pub state_dir: PathBuf,
    pub log_file: Option<PathBuf>,
    pub web_root: PathBuf,
    pub sites_dir: PathBuf,
    pub reload_command: Vec<String>,
    pub database: DatabaseSettings,
    pub php_version: String,
    pub command_timeout: Duration,
    pub wordpress_url: String,
}

impl Settings {
    /// Read settings from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through `lookup`; empty values count as unset
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let get_or = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        let reload_command: Vec<String> = get_or(ENV_RELOAD, DEFAULT_RELOAD)
            .split_whitespace()
            .map(ToString::to_string)
            .collect();

        let php_version = get_or(ENV_PHP_VERSION, DEFAULT_PHP_VERSION);
        if !validate::is_valid_php_version(&php_version) {
            return Err(Error::Config(format!(
                "{ENV_PHP_VERSION} must look like '8.3', got '{php_version}'"
            )));
        }

        let command_timeout = match get(ENV_COMMAND_TIMEOUT) {
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    return Err(Error::Config(format!(
                        "{ENV_COMMAND_TIMEOUT} must be a positive number of seconds, got '{raw}'"
                    )));
                }
            },
            None => Duration::from_secs(DEFAULT_COMMAND_TIMEOUT_SECS),
        };

        let settings = Self {
            state_dir: PathBuf::from(get_or(ENV_STATE_DIR, DEFAULT_STATE_DIR)),
            log_file: get(ENV_LOG_FILE).map(PathBuf::from),
            web_root: PathBuf::from(get_or(ENV_WEB_ROOT, DEFAULT_WEB_ROOT)),
            sites_dir: PathBuf::from(get_or(ENV_SITES_DIR, DEFAULT_SITES_DIR)),
            reload_command,
            database: DatabaseSettings {
                client: get_or(ENV_DB_CLIENT, DEFAULT_DB_CLIENT),
                host: get_or(ENV_DB_HOST, DEFAULT_DB_HOST),
                root_user: get_or(ENV_DB_ROOT_USER, DEFAULT_DB_ROOT_USER),
                root_password: SecretString::from(lookup(ENV_DB_ROOT_PASSWORD).unwrap_or_default()),
            },
            php_version,
            command_timeout,
            wordpress_url: get_or(ENV_WP_DOWNLOAD_URL, DEFAULT_WP_DOWNLOAD_URL),
        };

        log::debug!(
            "Settings: state_dir={} web_root={} sites_dir={} reload={:?}",
            settings.state_dir.display(),
            settings.web_root.display(),
            settings.sites_dir.display(),
            settings.reload_command
        );
        Ok(settings)
    }

    /// Path of the state document
    pub fn state_file(&self) -> PathBuf {
        self.state_dir.join(STATE_FILE_NAME)
    }

    /// Web root for a site
    pub fn site_root(&self, primary_domain: &str) -> PathBuf {
        self.web_root.join(primary_domain)
    }

    /// Config file path for a site
    pub fn site_config_path(&self, primary_domain: &str) -> PathBuf {
        self.sites_dir
            .join(crate::render::site_config_file_name(primary_domain))
    }

    /// Apply command-line directory overrides
    pub fn with_overrides(
        mut self,
        state_dir: Option<&Path>,
        web_root: Option<&Path>,
        sites_dir: Option<&Path>,
    ) -> Self {
        if let Some(dir) = state_dir {
            self.state_dir = dir.to_path_buf();
        }
        if let Some(dir) = web_root {
            self.web_root = dir.to_path_buf();
        }
        if let Some(dir) = sites_dir {
            self.sites_dir = dir.to_path_buf();
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(pairs: &[(&str, &str)]) -> Result<Settings> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        Settings::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let s = settings(&[]).unwrap();
        assert_eq!(s.state_file(), PathBuf::from("/var/lib/frankenphp-cli/state.json"));
        assert_eq!(s.web_root, PathBuf::from("/var/www"));
        assert_eq!(s.reload_command, vec!["systemctl", "reload", "caddy"]);
        assert_eq!(s.database.client, "mysql");
        assert_eq!(s.database.host, "localhost");
        assert_eq!(s.php_version, "8.3");
        assert_eq!(s.command_timeout, Duration::from_secs(120));
        assert!(s.log_file.is_none());
        assert_eq!(s.wordpress_url, "https://wordpress.org/latest.tar.gz");
    }

    #[test]
    fn test_environment_overrides() {
        let s = settings(&[
            (ENV_STATE_DIR, "/tmp/state"),
            (ENV_SITES_DIR, "/tmp/sites"),
            (ENV_RELOAD, "  caddy   reload --config /etc/caddy/Caddyfile "),
            (ENV_COMMAND_TIMEOUT, "5"),
            (ENV_PHP_VERSION, "8.4"),
        ])
        .unwrap();
        assert_eq!(s.state_dir, PathBuf::from("/tmp/state"));
        assert_eq!(
            s.site_config_path("www.example.com"),
            PathBuf::from("/tmp/sites/www_example_com.conf")
        );
        assert_eq!(
            s.reload_command,
            vec!["caddy", "reload", "--config", "/etc/caddy/Caddyfile"]
        );
        assert_eq!(s.command_timeout, Duration::from_secs(5));
        assert_eq!(s.php_version, "8.4");
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            settings(&[(ENV_COMMAND_TIMEOUT, "soon")]),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            settings(&[(ENV_COMMAND_TIMEOUT, "0")]),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            settings(&[(ENV_PHP_VERSION, "8.3; id")]),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_cli_overrides_win() {
        let s = settings(&[(ENV_WEB_ROOT, "/srv/www")])
            .unwrap()
            .with_overrides(None, Some(Path::new("/tmp/www")), None);
        assert_eq!(s.site_root("a.com"), PathBuf::from("/tmp/www/a.com"));
    }
}

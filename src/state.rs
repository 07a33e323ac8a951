use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Current state document format version
pub const STATE_VERSION: u32 = 1;

// ============================================================================
// State Structures
// ============================================================================

/// Application served by a site
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AppKind {
    #[default]
    Plain,
    Wordpress,
}

impl std::fmt::Display for AppKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AppKind::Plain => f.write_str("plain"),
            AppKind::Wordpress => f.write_str("wordpress"),
        }
    }
}

/// A hosted domain group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteRecord {
    pub primary_domain: String,

    #[serde(default)]
    pub aliases: Vec<String>,

    pub web_root: PathBuf,

    /// Web server config file for this site
    pub config_path: PathBuf,

    #[serde(default)]
    pub app: AppKind,

    /// Informational only; FrankenPHP embeds its PHP runtime
    pub php_version: String,

    /// Linux login owning the web root, if one was created for the site
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,

    /// Companion database (WordPress installs)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,

    pub created_at: DateTime<Utc>,
}

impl SiteRecord {
    /// Primary domain followed by aliases
    pub fn domains(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.primary_domain.as_str()).chain(self.aliases.iter().map(String::as_str))
    }
}

/// A provisioned database and its owning credential (password not kept)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseRecord {
    pub name: String,
    pub user: String,
    pub host: String,
    pub created_at: DateTime<Utc>,
}

/// A Linux login created by this tool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub username: String,
    pub home: PathBuf,
    pub created_at: DateTime<Utc>,
}

/// Everything this tool manages on the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateDocument {
    pub version: u32,

    #[serde(default)]
    pub sites: BTreeMap<String, SiteRecord>,

    #[serde(default)]
    pub databases: BTreeMap<String, DatabaseRecord>,

    #[serde(default)]
    pub users: BTreeMap<String, UserRecord>,
}

impl Default for StateDocument {
    fn default() -> Self {
        Self {
            version: STATE_VERSION,
            sites: BTreeMap::new(),
            databases: BTreeMap::new(),
            users: BTreeMap::new(),
        }
    }
}

// ============================================================================
// StateDocument Queries
// ============================================================================

impl StateDocument {
    /// Look up a site by primary domain; keys are stored lowercase
    pub fn site(&self, primary_domain: &str) -> Option<&SiteRecord> {
        self.sites.get(&primary_domain.to_ascii_lowercase())
    }

    pub fn database(&self, name: &str) -> Option<&DatabaseRecord> {
        self.databases.get(name)
    }

    pub fn user(&self, username: &str) -> Option<&UserRecord> {
        self.users.get(username)
    }

    /// Site that owns `domain` as its primary domain or an alias
    pub fn domain_owner(&self, domain: &str) -> Option<&SiteRecord> {
        self.sites
            .values()
            .find(|site| site.domains().any(|d| d.eq_ignore_ascii_case(domain)))
    }

    /// Sites that record `name` as their companion database
    pub fn sites_using_database(&self, name: &str) -> Vec<&SiteRecord> {
        self.sites
            .values()
            .filter(|site| site.database.as_deref() == Some(name))
            .collect()
    }

    /// Sites whose web root is owned by `username`
    pub fn sites_owned_by(&self, username: &str) -> Vec<&SiteRecord> {
        self.sites
            .values()
            .filter(|site| site.owner.as_deref() == Some(username))
            .collect()
    }
}

// ============================================================================
// State Store
// ============================================================================

/// Durable home of the [`StateDocument`]
///
/// Writes go to a temporary file in the same directory which is then
/// renamed over the destination, so readers see either the old document
/// or the new one, never a torn write. There is no inter-process locking:
/// concurrent invocations against one state file are not supported.
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, message: impl Into<String>) -> Error {
        Error::StateIo {
            path: self.path.clone(),
            message: message.into(),
        }
    }

    /// Load the document, or an empty one if the file doesn't exist
    pub fn read(&self) -> Result<StateDocument> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                log::debug!("State file does not exist, using empty state");
                return Ok(StateDocument::default());
            }
            Err(e) => return Err(self.io_error(format!("cannot read: {e}"))),
        };

        let state: StateDocument = serde_json::from_str(&content)
            .map_err(|e| self.io_error(format!("cannot parse: {e}")))?;

        if state.version > STATE_VERSION {
            return Err(self.io_error(format!(
                "written by a newer version (format {}, this build understands {STATE_VERSION})",
                state.version
            )));
        }

        log::debug!("Loaded state from {}", self.path.display());
        Ok(state)
    }

    /// Atomically replace the document on disk
    pub fn write(&self, state: &StateDocument) -> Result<()> {
        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)
            .map_err(|e| self.io_error(format!("cannot create {}: {e}", dir.display())))?;

        let mut content = serde_json::to_string_pretty(state)
            .map_err(|e| self.io_error(format!("cannot serialize: {e}")))?;
        content.push('\n');

        let mut temp = tempfile::NamedTempFile::new_in(dir)
            .map_err(|e| self.io_error(format!("cannot create temp file: {e}")))?;
        temp.write_all(content.as_bytes())
            .map_err(|e| self.io_error(format!("cannot write temp file: {e}")))?;
        temp.as_file()
            .sync_all()
            .map_err(|e| self.io_error(format!("cannot sync temp file: {e}")))?;
        temp.persist(&self.path)
            .map_err(|e| self.io_error(format!("cannot replace state file: {}", e.error)))?;

        log::debug!("Saved state to {}", self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn site(domain: &str, aliases: &[&str]) -> SiteRecord {
        SiteRecord {
            primary_domain: domain.to_string(),
            aliases: aliases.iter().map(ToString::to_string).collect(),
            web_root: PathBuf::from("/var/www").join(domain),
            config_path: PathBuf::from("/etc/caddy/sites.d").join(domain),
            app: AppKind::Plain,
            php_version: "8.3".to_string(),
            owner: None,
            database: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_missing_file_reads_empty() {
        let dir = TempDir::new().unwrap();
        let store = StateStore::new(dir.path().join("state.json"));
        let state = store.read().unwrap();
        assert_eq!(state, StateDocument::default());
        assert!(!store.path().exists());
    }

    #[test]
    fn test_write_then_read() {
        let dir = TempDir::new().unwrap();
        let store = StateStore::new(dir.path().join("nested").join("state.json"));

        let mut state = StateDocument::default();
        state
            .sites
            .insert("example.com".to_string(), site("example.com", &["www.example.com"]));
        store.write(&state).unwrap();

        assert_eq!(store.read().unwrap(), state);
    }

    #[test]
    fn test_write_leaves_no_temp_files() {
        let dir = TempDir::new().unwrap();
        let store = StateStore::new(dir.path().join("state.json"));
        store.write(&StateDocument::default()).unwrap();
        store.write(&StateDocument::default()).unwrap();

        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_corrupt_file_is_state_io_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, "{ not json").unwrap();

        let err = StateStore::new(&path).read().unwrap_err();
        assert!(matches!(err, Error::StateIo { .. }));
        // The broken document is left for the operator to inspect
        assert_eq!(fs::read_to_string(&path).unwrap(), "{ not json");
    }

    #[cfg(unix)]
    #[test]
    fn test_unwritable_directory_keeps_previous_document() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let store = StateStore::new(dir.path().join("state.json"));
        store.write(&StateDocument::default()).unwrap();
        let before = fs::read(store.path()).unwrap();

        fs::set_permissions(dir.path(), fs::Permissions::from_mode(0o555)).unwrap();
        let mut changed = StateDocument::default();
        changed.sites.insert("a.com".to_string(), site("a.com", &[]));
        let result = store.write(&changed);
        fs::set_permissions(dir.path(), fs::Permissions::from_mode(0o755)).unwrap();

        // Root ignores directory permissions; only assert when the write was refused
        if let Err(err) = result {
            assert!(matches!(err, Error::StateIo { .. }));
            assert_eq!(fs::read(store.path()).unwrap(), before);
        }
    }

    #[test]
    fn test_domain_owner_checks_aliases_case_insensitively() {
        let mut state = StateDocument::default();
        state
            .sites
            .insert("example.com".to_string(), site("example.com", &["www.example.com"]));

        assert_eq!(
            state.domain_owner("WWW.example.com").map(|s| s.primary_domain.as_str()),
            Some("example.com")
        );
        assert!(state.domain_owner("other.com").is_none());
    }

    #[test]
    fn test_site_lookup_ignores_case() {
        let mut state = StateDocument::default();
        state
            .sites
            .insert("example.com".to_string(), site("example.com", &[]));

        assert!(state.site("Example.COM").is_some());
        assert!(state.site("www.example.com").is_none());
    }

    #[test]
    fn test_sites_using_database() {
        let mut state = StateDocument::default();
        let mut wp = site("blog.com", &[]);
        wp.database = Some("wp_blog_com".to_string());
        state.sites.insert("blog.com".to_string(), wp);
        state.sites.insert("plain.com".to_string(), site("plain.com", &[]));

        assert_eq!(state.sites_using_database("wp_blog_com").len(), 1);
        assert!(state.sites_using_database("other").is_empty());
    }

    #[test]
    fn test_serialized_layout() {
        let state = StateDocument::default();
        let json: serde_json::Value = serde_json::to_value(&state).unwrap();
        assert_eq!(json["version"], 1);
        assert!(json["sites"].is_object());
        assert!(json["databases"].is_object());
        assert!(json["users"].is_object());
    }
}

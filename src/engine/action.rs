//! Side effects a provisioning step can perform

use secrecy::{ExposeSecret, SecretString};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::archive;
use crate::download::Fetcher;
use crate::error::{Error, Result};
use crate::runner::{Invocation, SystemExecutor};
use crate::state::{DatabaseRecord, SiteRecord, StateDocument, UserRecord};

/// What a running plan works against
///
/// `state` is a private copy of the snapshot the plan was built from. It is
/// persisted only after every step succeeded.
pub struct Workspace<'a> {
    pub executor: &'a dyn SystemExecutor,
    pub fetcher: &'a dyn Fetcher,
    pub timeout: Duration,
    pub state: StateDocument,
    /// Entries unpacked into each web root during this run
    pub unpacked: BTreeMap<PathBuf, Vec<PathBuf>>,
}

/// File contents, possibly carrying secrets
#[derive(Debug)]
pub enum Contents {
    Public(String),
    /// Rendered with generated credentials; never shown in previews or logs
    Sensitive(SecretString),
}

impl Contents {
    fn expose(&self) -> &str {
        match self {
            Contents::Public(text) => text,
            Contents::Sensitive(secret) => secret.expose_secret(),
        }
    }
}

/// A change to the draft state document
#[derive(Debug, Clone)]
pub enum StateChange {
    PutSite(Box<SiteRecord>),
    RemoveSite(String),
    PutDatabase(DatabaseRecord),
    RemoveDatabase(String),
    PutUser(UserRecord),
    RemoveUser(String),
}

impl StateChange {
    fn apply(&self, state: &mut StateDocument) {
        match self {
            StateChange::PutSite(site) => {
                state
                    .sites
                    .insert(site.primary_domain.clone(), site.as_ref().clone());
            }
            StateChange::RemoveSite(domain) => {
                state.sites.remove(domain);
            }
            StateChange::PutDatabase(db) => {
                state.databases.insert(db.name.clone(), db.clone());
            }
            StateChange::RemoveDatabase(name) => {
                state.databases.remove(name);
            }
            StateChange::PutUser(user) => {
                state.users.insert(user.username.clone(), user.clone());
            }
            StateChange::RemoveUser(username) => {
                state.users.remove(username);
            }
        }
    }
}

impl fmt::Display for StateChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateChange::PutSite(site) => write!(f, "record site {}", site.primary_domain),
            StateChange::RemoveSite(domain) => write!(f, "forget site {domain}"),
            StateChange::PutDatabase(db) => write!(f, "record database {}", db.name),
            StateChange::RemoveDatabase(name) => write!(f, "forget database {name}"),
            StateChange::PutUser(user) => write!(f, "record user {}", user.username),
            StateChange::RemoveUser(username) => write!(f, "forget user {username}"),
        }
    }
}

/// One side effect
#[derive(Debug)]
pub enum StepAction {
    /// Create a directory and its parents
    CreateDir { path: PathBuf },
    /// Remove a directory tree; a missing directory is not an error
    RemoveDir { path: PathBuf },
    /// Write a file, creating parent directories
    WriteFile {
        path: PathBuf,
        contents: Contents,
        mode: Option<u32>,
    },
    /// Remove a file; a missing file is not an error
    RemoveFile { path: PathBuf },
    /// Run an external command, failing on non-zero exit
    Run(Invocation),
    /// Fail with a conflict if the database server already has `name`
    EnsureDatabaseAbsent { name: String, probe: Invocation },
    /// Download a release tarball and unpack it into a web root
    InstallCore { url: String, web_root: PathBuf },
    /// Remove what `InstallCore` unpacked into this web root
    RemoveCore { web_root: PathBuf },
    /// Mutate the draft state document
    UpdateState(StateChange),
    /// Log a warning for the operator
    Notice { message: String },
}

impl StepAction {
    pub fn update(change: StateChange) -> Self {
        StepAction::UpdateState(change)
    }
}

fn io_context(verb: &str, path: &Path) -> String {
    format!("cannot {verb} {}", path.display())
}

#[cfg(unix)]
pub(super) fn set_mode(path: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
        .map_err(|e| Error::io(io_context("set permissions on", path), e))
}

#[cfg(not(unix))]
pub(super) fn set_mode(_path: &Path, _mode: u32) -> Result<()> {
    Ok(())
}

fn write_file(path: &Path, contents: &str, mode: Option<u32>) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::io(io_context("create", parent), e))?;
    }
    fs::write(path, contents).map_err(|e| Error::io(io_context("write", path), e))?;
    if let Some(mode) = mode {
        set_mode(path, mode)?;
    }
    Ok(())
}

fn ignore_missing(result: std::io::Result<()>, verb: &str, path: &Path) -> Result<()> {
    match result {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(Error::io(io_context(verb, path), e)),
    }
}

impl<'a> reconcile::Action<Workspace<'a>> for StepAction {
    type Error = Error;

    fn apply(&self, ws: &mut Workspace<'a>) -> Result<()> {
        match self {
            StepAction::CreateDir { path } => {
                fs::create_dir_all(path).map_err(|e| Error::io(io_context("create", path), e))
            }
            StepAction::RemoveDir { path } => {
                ignore_missing(fs::remove_dir_all(path), "remove", path)
            }
            StepAction::WriteFile {
                path,
                contents,
                mode,
            } => write_file(path, contents.expose(), *mode),
            StepAction::RemoveFile { path } => {
                ignore_missing(fs::remove_file(path), "remove", path)
            }
            StepAction::Run(invocation) => ws.executor.run(invocation, ws.timeout).map(|_| ()),
            StepAction::EnsureDatabaseAbsent { name, probe } => {
                let output = ws.executor.run(probe, ws.timeout)?;
                // LIKE treats '_' as a wildcard, so compare the listed names exactly
                if output.stdout.lines().any(|line| line.trim() == name) {
                    Err(Error::StateConflict(format!(
                        "database '{name}' already exists on the server"
                    )))
                } else {
                    Ok(())
                }
            }
            StepAction::InstallCore { url, web_root } => {
                let tarball = ws.fetcher.fetch(url, ws.timeout)?;
                let entries = archive::unpack_core(&tarball, web_root)?;
                ws.unpacked.insert(web_root.clone(), entries);
                Ok(())
            }
            StepAction::RemoveCore { web_root } => match ws.unpacked.remove(web_root) {
                Some(entries) => archive::remove_unpacked(&entries),
                None => Ok(()),
            },
            StepAction::UpdateState(change) => {
                change.apply(&mut ws.state);
                Ok(())
            }
            StepAction::Notice { message } => {
                log::warn!("{message}");
                Ok(())
            }
        }
    }
}

impl fmt::Display for StepAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepAction::CreateDir { path } => write!(f, "mkdir -p {}", path.display()),
            StepAction::RemoveDir { path } => write!(f, "rm -r {}", path.display()),
            StepAction::WriteFile { path, contents, .. } => match contents {
                Contents::Public(text) => {
                    write!(f, "write {} ({} bytes)", path.display(), text.len())
                }
                Contents::Sensitive(_) => write!(f, "write {} (contains secrets)", path.display()),
            },
            StepAction::RemoveFile { path } => write!(f, "rm {}", path.display()),
            StepAction::Run(invocation) => write!(f, "{invocation}"),
            StepAction::EnsureDatabaseAbsent { name, .. } => {
                write!(f, "check the server has no database {name}")
            }
            StepAction::InstallCore { url, web_root } => {
                write!(f, "download {url} into {}", web_root.display())
            }
            StepAction::RemoveCore { web_root } => {
                write!(f, "remove WordPress core from {}", web_root.display())
            }
            StepAction::UpdateState(change) => write!(f, "{change}"),
            StepAction::Notice { message } => write!(f, "warn: {message}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::CommandOutput;
    use reconcile::Action;
    use tempfile::TempDir;

    /// Answers every command with fixed output
    struct Canned(&'static str);

    /// Serves the test release tarball for any URL
    struct Mirror;

    impl Fetcher for Mirror {
        fn fetch(&self, _url: &str, _timeout: Duration) -> Result<Vec<u8>> {
            Ok(archive::tests::release_tarball())
        }
    }

    impl SystemExecutor for Canned {
        fn spawn(&self, _invocation: &Invocation, _timeout: Duration) -> Result<CommandOutput> {
            Ok(CommandOutput {
                exit_code: Some(0),
                stdout: self.0.to_string(),
                stderr: String::new(),
            })
        }
    }

    fn workspace(executor: &dyn SystemExecutor) -> Workspace<'_> {
        Workspace {
            executor,
            fetcher: &Mirror,
            timeout: Duration::from_secs(1),
            state: StateDocument::default(),
            unpacked: BTreeMap::new(),
        }
    }

    #[test]
    fn test_write_and_remove_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sites.d").join("a_com.conf");
        let executor = Canned("");
        let mut ws = workspace(&executor);

        StepAction::WriteFile {
            path: path.clone(),
            contents: Contents::Public("a.com {}\n".to_string()),
            mode: Some(0o644),
        }
        .apply(&mut ws)
        .unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "a.com {}\n");

        let remove = StepAction::RemoveFile { path: path.clone() };
        remove.apply(&mut ws).unwrap();
        assert!(!path.exists());
        // Removing again is fine
        remove.apply(&mut ws).unwrap();
    }

    #[test]
    fn test_sensitive_contents_are_not_displayed() {
        let action = StepAction::WriteFile {
            path: PathBuf::from("/var/www/a.com/wp-config.php"),
            contents: Contents::Sensitive(SecretString::from("DB_PASSWORD hunter2".to_string())),
            mode: Some(0o640),
        };
        let shown = action.to_string();
        assert!(!shown.contains("hunter2"));
        assert!(shown.contains("contains secrets"));
        assert!(!format!("{action:?}").contains("hunter2"));
    }

    #[test]
    fn test_database_probe_matches_exact_name() {
        let probe = || Invocation::new("mysql").arg("SHOW DATABASES");

        let executor = Canned("shop1db\nshop_db_old\n");
        let mut ws = workspace(&executor);
        StepAction::EnsureDatabaseAbsent {
            name: "shop_db".to_string(),
            probe: probe(),
        }
        .apply(&mut ws)
        .unwrap();

        let executor = Canned("shop_db\n");
        let mut ws = workspace(&executor);
        let err = StepAction::EnsureDatabaseAbsent {
            name: "shop_db".to_string(),
            probe: probe(),
        }
        .apply(&mut ws)
        .unwrap_err();
        assert!(matches!(err, Error::StateConflict(_)));
    }

    #[test]
    fn test_core_install_is_removed_by_its_undo() {
        let dir = TempDir::new().unwrap();
        let web_root = dir.path().join("a.com");
        fs::create_dir_all(&web_root).unwrap();
        fs::write(web_root.join(".user.ini"), "memory_limit=256M\n").unwrap();
        let executor = Canned("");
        let mut ws = workspace(&executor);

        let install = StepAction::InstallCore {
            url: "https://wordpress.org/latest.tar.gz".to_string(),
            web_root: web_root.clone(),
        };
        assert_eq!(
            install.to_string(),
            format!("download https://wordpress.org/latest.tar.gz into {}", web_root.display())
        );
        install.apply(&mut ws).unwrap();
        assert!(web_root.join("wp-includes").is_dir());

        StepAction::RemoveCore {
            web_root: web_root.clone(),
        }
        .apply(&mut ws)
        .unwrap();
        assert!(!web_root.join("wp-includes").exists());
        assert!(!web_root.join("index.php").exists());
        // Files that were there before survive
        assert!(web_root.join(".user.ini").is_file());
        assert!(ws.unpacked.is_empty());
    }

    #[test]
    fn test_state_changes_touch_only_the_draft() {
        let executor = Canned("");
        let mut ws = workspace(&executor);
        let user = UserRecord {
            username: "shop".to_string(),
            home: PathBuf::from("/home/shop"),
            created_at: chrono::Utc::now(),
        };

        StepAction::update(StateChange::PutUser(user)).apply(&mut ws).unwrap();
        assert!(ws.state.user("shop").is_some());

        StepAction::update(StateChange::RemoveUser("shop".to_string()))
            .apply(&mut ws)
            .unwrap();
        assert!(ws.state.users.is_empty());
    }
}

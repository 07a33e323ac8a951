//! Step lists for each operation
//!
//! Every builder validates its inputs against the snapshot first and only
//! then assembles the plan, so a rejected request never reaches a side
//! effect. Reads of the filesystem (does the web root exist, what does the
//! current config say) happen here; writes happen only when the plan runs.

use chrono::{DateTime, Utc};
use reconcile::{Plan, Step};
use secrecy::{ExposeSecret, SecretString};
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::action::{Contents, StateChange, StepAction};
use super::{AddSite, Document, Operation};
use crate::config::Settings;
use crate::error::{Error, Result};
use crate::render::{self, Renderer};
use crate::runner::{Arg, Invocation};
use crate::secret::{self, DatabaseCredentials};
use crate::state::{AppKind, DatabaseRecord, SiteRecord, StateDocument, UserRecord};
use crate::validate;

const CONFIG_MODE: u32 = 0o644;
const WP_CONFIG_FILE: &str = "wp-config.php";
const WP_TABLE_PREFIX: &str = "wp_";
/// Present in every WordPress core tree
const WP_CORE_MARKER: &str = "wp-includes";

/// A validated operation, ready to preview or run
pub(crate) struct Prepared {
    pub plan: Plan<StepAction>,
    pub documents: Vec<Document>,
    pub credentials: Option<DatabaseCredentials>,
}

/// Builds plans against one state snapshot
pub(crate) struct Builder<'a> {
    pub settings: &'a Settings,
    pub renderer: &'a Renderer,
    pub state: &'a StateDocument,
    pub force: bool,
    pub now: DateTime<Utc>,
}

/// Steps and artifacts of a companion database
struct DatabasePlan {
    plan: Plan<StepAction>,
    record: DatabaseRecord,
    credentials: DatabaseCredentials,
}

/// Steps and artifacts of a WordPress install
struct WordpressPlan {
    plan: Plan<StepAction>,
    record: DatabaseRecord,
    credentials: DatabaseCredentials,
    document: Document,
}

/// MySQL accounts for a local server are bound to localhost, remote ones to any host
fn grant_host(server: &str) -> &'static str {
    match server {
        "localhost" | "127.0.0.1" | "::1" => "localhost",
        _ => "%",
    }
}

fn read_existing(path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(Error::io(format!("cannot read {}", path.display()), e)),
    }
}

/// Undo for a file write: put back what was there, or remove the file
fn restore_or_remove(path: &Path, previous: Option<Contents>) -> StepAction {
    match previous {
        Some(contents) => StepAction::WriteFile {
            path: path.to_path_buf(),
            contents,
            mode: Some(CONFIG_MODE),
        },
        None => StepAction::RemoveFile {
            path: path.to_path_buf(),
        },
    }
}

/// Login derived from the first label of a domain
fn owner_login(primary: &str) -> Result<String> {
    let label = primary.split('.').next().unwrap_or(primary);
    let mut login: String = label
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    login.truncate(validate::MAX_IDENTIFIER_LEN);
    validate::require_identifier(&login, "site owner login")?;
    Ok(login)
}

impl Builder<'_> {
    pub fn build(&self, operation: &Operation) -> Result<Prepared> {
        match operation {
            Operation::AddSite(request) => self.add_site(request),
            Operation::DeleteSite { domain, purge } => self.delete_site(domain, *purge),
            Operation::CreateDatabase { name } => self.create_database(name),
            Operation::DeleteDatabase { name } => self.delete_database(name),
            Operation::InstallWordPress { domain } => self.install_wordpress(domain),
            Operation::CreateUser { username, home } => self.create_user(username, home.as_deref()),
            Operation::DeleteUser {
                username,
                remove_home,
            } => self.delete_user(username, *remove_home),
        }
    }

    // ------------------------------------------------------------------
    // Command builders
    // ------------------------------------------------------------------

    fn reload(&self) -> Result<Invocation> {
        Invocation::from_argv(&self.settings.reload_command)
            .ok_or_else(|| Error::Config("web server reload command is empty".to_string()))
    }

    /// A statement for the database client, authenticated as the admin user.
    /// Secret statements are piped on stdin instead of passed with `-e`.
    fn sql(&self, statement: Arg) -> Invocation {
        let db = &self.settings.database;
        let invocation = Invocation::new(db.client.clone()).args([
            "-h",
            db.host.as_str(),
            "-u",
            db.root_user.as_str(),
            "-N",
            "-B",
        ]);
        let invocation = match statement {
            Arg::Plain(sql) => invocation.arg("-e").arg(sql),
            Arg::Secret(sql) => invocation.stdin_secret(sql),
        };
        if db.root_password.expose_secret().is_empty() {
            invocation
        } else {
            invocation.env_secret("MYSQL_PWD", secret::duplicate(&db.root_password))
        }
    }

    fn drop_database(&self, name: &str) -> StepAction {
        StepAction::Run(self.sql(Arg::from(format!("DROP DATABASE IF EXISTS `{name}`"))))
    }

    fn drop_database_user(&self, user: &str, server: &str) -> StepAction {
        StepAction::Run(self.sql(Arg::from(format!(
            "DROP USER IF EXISTS '{user}'@'{}'; FLUSH PRIVILEGES;",
            grant_host(server)
        ))))
    }

    fn useradd(username: &str, home: &Path) -> Invocation {
        Invocation::new("useradd")
            .args(["-m", "-d"])
            .arg(home.display().to_string())
            .arg(username)
    }

    fn userdel(username: &str, remove_home: bool) -> Invocation {
        let invocation = Invocation::new("userdel");
        let invocation = if remove_home { invocation.arg("-r") } else { invocation };
        invocation.arg(username)
    }

    fn chown(owner: &str, path: &Path, recursive: bool) -> Invocation {
        let invocation = Invocation::new("chown");
        let invocation = if recursive { invocation.arg("-R") } else { invocation };
        invocation.arg(owner).arg(path.display().to_string())
    }

    /// Undo for a chown: hand `path` back to its current owner, or remove it
    /// if an earlier step of the same plan creates it
    fn restore_owner(path: &Path, recursive: bool) -> StepAction {
        #[cfg(unix)]
        {
            use std::os::unix::fs::MetadataExt;
            if let Ok(meta) = fs::metadata(path) {
                let owner = format!("{}:{}", meta.uid(), meta.gid());
                return StepAction::Run(Self::chown(&owner, path, recursive));
            }
        }
        if recursive {
            StepAction::RemoveDir {
                path: path.to_path_buf(),
            }
        } else {
            StepAction::RemoveFile {
                path: path.to_path_buf(),
            }
        }
    }

    // ------------------------------------------------------------------
    // Reusable step lists
    // ------------------------------------------------------------------

    /// Check, create, add user, grant. The caller records the database.
    fn database_plan(&self, name: &str) -> DatabasePlan {
        let server = self.settings.database.host.clone();
        let host = grant_host(&server);
        let user = name.to_string();
        let password = secret::generate_password();

        let mut plan = Plan::new();
        plan.push(Step::check(
            format!("Check database {name} is not on the server"),
            StepAction::EnsureDatabaseAbsent {
                name: name.to_string(),
                probe: self.sql(Arg::from(format!("SHOW DATABASES LIKE '{name}'"))),
            },
        ));
        plan.push(
            Step::new(
                format!("Create database {name}"),
                StepAction::Run(self.sql(Arg::from(format!(
                    "CREATE DATABASE `{name}` CHARACTER SET utf8mb4 COLLATE utf8mb4_unicode_ci"
                )))),
            )
            .with_compensation(self.drop_database(name)),
        );

        let create_user = SecretString::from(format!(
            "CREATE USER '{user}'@'{host}' IDENTIFIED BY '{}';",
            password.expose_secret()
        ));
        plan.push(
            Step::new(
                format!("Create database user {user}"),
                StepAction::Run(self.sql(Arg::Secret(create_user))),
            )
            .with_compensation(self.drop_database_user(&user, &server)),
        );
        plan.push(
            Step::new(
                format!("Grant {user} access to {name}"),
                StepAction::Run(self.sql(Arg::from(format!(
                    "GRANT ALL PRIVILEGES ON `{name}`.* TO '{user}'@'{host}'; FLUSH PRIVILEGES;"
                )))),
            )
            .with_compensation(StepAction::Run(self.sql(Arg::from(format!(
                "REVOKE ALL PRIVILEGES ON `{name}`.* FROM '{user}'@'{host}'; FLUSH PRIVILEGES;"
            ))))),
        );

        DatabasePlan {
            plan,
            record: DatabaseRecord {
                name: name.to_string(),
                user: user.clone(),
                host: server.clone(),
                created_at: self.now,
            },
            credentials: DatabaseCredentials {
                database: name.to_string(),
                user,
                host: server,
                password,
            },
        }
    }

    /// Companion database plus `wp-config.php`. The caller records both.
    fn wordpress_plan(&self, domain: &str, web_root: &Path) -> Result<WordpressPlan> {
        let db_name = validate::identifier_from_domain("wp_", domain);
        if self.state.database(&db_name).is_some() {
            return Err(Error::StateConflict(format!(
                "database '{db_name}' for the WordPress install of {domain} already exists"
            )));
        }

        let wp_path = web_root.join(WP_CONFIG_FILE);
        let previous = read_existing(&wp_path)?;
        if previous.is_some() && !self.force {
            return Err(Error::StateConflict(format!(
                "{} already exists (use --force to replace it)",
                wp_path.display()
            )));
        }

        let DatabasePlan {
            mut plan,
            record,
            credentials,
        } = self.database_plan(&db_name);

        let mut params: BTreeMap<String, String> = BTreeMap::new();
        params.insert("db_name".into(), credentials.database.clone());
        params.insert("db_user".into(), credentials.user.clone());
        params.insert(
            "db_password".into(),
            credentials.password.expose_secret().to_string(),
        );
        params.insert("db_host".into(), credentials.host.clone());
        params.insert("table_prefix".into(), WP_TABLE_PREFIX.into());
        for key in render::WP_SECRET_KEYS {
            params.insert(key.into(), secret::generate_salt().expose_secret().to_string());
        }
        let text = SecretString::from(self.renderer.render(render::WP_CONFIG, &params)?);
        drop(params);

        if !web_root.join(WP_CORE_MARKER).exists() {
            plan.push(
                Step::new(
                    "Download and extract WordPress core",
                    StepAction::InstallCore {
                        url: self.settings.wordpress_url.clone(),
                        web_root: web_root.to_path_buf(),
                    },
                )
                .with_compensation(StepAction::RemoveCore {
                    web_root: web_root.to_path_buf(),
                }),
            );
        }

        plan.push(
            Step::new(
                format!("Write {WP_CONFIG_FILE}"),
                StepAction::WriteFile {
                    path: wp_path.clone(),
                    contents: Contents::Sensitive(text),
                    mode: Some(CONFIG_MODE),
                },
            )
            .with_compensation(restore_or_remove(
                &wp_path,
                previous.map(|p| Contents::Sensitive(SecretString::from(p))),
            )),
        );

        Ok(WordpressPlan {
            plan,
            record,
            credentials,
            document: Document {
                path: wp_path,
                text: None,
                previous: None,
            },
        })
    }

    // ------------------------------------------------------------------
    // Operations
    // ------------------------------------------------------------------

    fn add_site(&self, request: &AddSite) -> Result<Prepared> {
        let domains = validate::validate_domains(&request.primary, &request.aliases)?;
        let primary = domains[0].clone();

        let php_version = request
            .php_version
            .clone()
            .unwrap_or_else(|| self.settings.php_version.clone());
        if !validate::is_valid_php_version(&php_version) {
            return Err(Error::Validation(format!(
                "invalid PHP version '{php_version}' (expected e.g. 8.3)"
            )));
        }

        let existing = self.state.site(&primary);
        if existing.is_some() && !self.force {
            return Err(Error::StateConflict(format!(
                "site '{primary}' already exists (use --force to replace it)"
            )));
        }
        for domain in &domains {
            if let Some(owner) = self.state.domain_owner(domain)
                && owner.primary_domain != primary
            {
                return Err(Error::StateConflict(format!(
                    "domain '{domain}' is already served by site '{}'",
                    owner.primary_domain
                )));
            }
        }

        let web_root = self.settings.site_root(&primary);
        let config_path = self.settings.site_config_path(&primary);
        let previous_config = read_existing(&config_path)?;
        if previous_config.is_some() && !self.force {
            return Err(Error::StateConflict(format!(
                "{} already exists (use --force to replace it)",
                config_path.display()
            )));
        }

        // A replaced site keeps its owner and its WordPress install
        let kept_owner = existing.and_then(|site| site.owner.clone());
        let new_owner = match (&kept_owner, request.create_user) {
            (None, true) => {
                let login = owner_login(&primary)?;
                if self.state.user(&login).is_some() {
                    return Err(Error::StateConflict(format!(
                        "user '{login}' already exists"
                    )));
                }
                Some(login)
            }
            _ => None,
        };
        let owner = kept_owner.clone().or_else(|| new_owner.clone());
        let kept_database = existing.and_then(|site| site.database.clone());

        let wordpress = if request.app == AppKind::Wordpress && kept_database.is_none() {
            Some(self.wordpress_plan(&primary, &web_root)?)
        } else {
            None
        };

        let mut params = BTreeMap::new();
        params.insert("domains".to_string(), domains.join(" "));
        params.insert("web_root".to_string(), web_root.display().to_string());
        params.insert("php_version".to_string(), php_version.clone());
        let config = self.renderer.render(render::SITE_CONFIG, &params)?;

        let reload = self.reload()?;

        let mut plan = Plan::new();
        let mut documents = Vec::new();

        if !web_root.exists() {
            plan.push(
                Step::new(
                    "Create web root",
                    StepAction::CreateDir {
                        path: web_root.clone(),
                    },
                )
                .with_compensation(StepAction::RemoveDir {
                    path: web_root.clone(),
                }),
            );
        }

        if let Some(login) = &new_owner {
            plan.push(
                Step::new(
                    format!("Create Linux user {login}"),
                    StepAction::Run(Self::useradd(login, &web_root)),
                )
                .with_compensation(StepAction::Run(Self::userdel(login, false))),
            );
        }

        plan.push(
            Step::new(
                "Write site config",
                StepAction::WriteFile {
                    path: config_path.clone(),
                    contents: Contents::Public(config.clone()),
                    mode: Some(CONFIG_MODE),
                },
            )
            .with_compensation(restore_or_remove(
                &config_path,
                previous_config.clone().map(Contents::Public),
            )),
        );
        documents.push(Document {
            path: config_path.clone(),
            text: Some(config),
            previous: previous_config,
        });

        plan.push(
            Step::new("Reload web server", StepAction::Run(reload)).with_compensation(
                StepAction::Notice {
                    message: format!(
                        "the web server may still be serving {primary}; reload it once the site config is gone"
                    ),
                },
            ),
        );

        let mut records = Vec::new();
        let mut credentials = None;
        let mut database = kept_database;
        let mut app = if database.is_some() {
            AppKind::Wordpress
        } else {
            request.app
        };

        if let Some(wp) = wordpress {
            plan.extend(wp.plan);
            documents.push(wp.document);
            database = Some(wp.record.name.clone());
            app = AppKind::Wordpress;
            records.push(
                Step::new(
                    format!("Record database {}", wp.record.name),
                    StepAction::update(StateChange::PutDatabase(wp.record.clone())),
                )
                .with_compensation(StepAction::update(StateChange::RemoveDatabase(
                    wp.record.name,
                ))),
            );
            credentials = Some(wp.credentials);
        }

        if let Some(login) = &owner {
            plan.push(
                Step::new(
                    format!("Give {login} ownership of the web root"),
                    StepAction::Run(Self::chown(&format!("{login}:{login}"), &web_root, true)),
                )
                .with_compensation(Self::restore_owner(&web_root, true)),
            );
        }

        if let Some(login) = &new_owner {
            records.insert(
                0,
                Step::new(
                    format!("Record user {login}"),
                    StepAction::update(StateChange::PutUser(UserRecord {
                        username: login.clone(),
                        home: web_root.clone(),
                        created_at: self.now,
                    })),
                )
                .with_compensation(StepAction::update(StateChange::RemoveUser(login.clone()))),
            );
        }

        let site = SiteRecord {
            primary_domain: primary.clone(),
            aliases: domains[1..].to_vec(),
            web_root,
            config_path,
            app,
            php_version,
            owner,
            database,
            created_at: self.now,
        };
        let undo_site = match existing {
            Some(previous) => StateChange::PutSite(Box::new(previous.clone())),
            None => StateChange::RemoveSite(primary.clone()),
        };
        records.push(
            Step::new(
                format!("Record site {primary}"),
                StepAction::update(StateChange::PutSite(Box::new(site))),
            )
            .with_compensation(StepAction::update(undo_site)),
        );

        for step in records {
            plan.push(step);
        }

        Ok(Prepared {
            plan,
            documents,
            credentials,
        })
    }

    fn delete_site(&self, domain: &str, purge: bool) -> Result<Prepared> {
        let domain = domain.to_ascii_lowercase();
        let site = self
            .state
            .site(&domain)
            .ok_or_else(|| Error::not_found("site", &domain))?;

        // Deletion runs forward only; a failure stops where it is
        let mut plan = Plan::new();
        plan.push(Step::new(
            "Remove site config",
            StepAction::RemoveFile {
                path: site.config_path.clone(),
            },
        ));
        plan.push(Step::new("Reload web server", StepAction::Run(self.reload()?)));

        if purge {
            plan.push(Step::new(
                "Remove web root",
                StepAction::RemoveDir {
                    path: site.web_root.clone(),
                },
            ));
            if let Some(db) = site.database.as_deref().and_then(|name| self.state.database(name)) {
                plan.extend(self.drop_database_plan(db));
            }
        }

        plan.push(Step::new(
            format!("Forget site {domain}"),
            StepAction::update(StateChange::RemoveSite(domain.clone())),
        ));

        Ok(Prepared {
            plan,
            documents: Vec::new(),
            credentials: None,
        })
    }

    fn drop_database_plan(&self, db: &DatabaseRecord) -> Plan<StepAction> {
        let mut plan = Plan::new();
        plan.push(Step::new(
            format!("Drop database user {}", db.user),
            self.drop_database_user(&db.user, &db.host),
        ));
        plan.push(Step::new(
            format!("Drop database {}", db.name),
            self.drop_database(&db.name),
        ));
        plan.push(Step::new(
            format!("Forget database {}", db.name),
            StepAction::update(StateChange::RemoveDatabase(db.name.clone())),
        ));
        plan
    }

    fn create_database(&self, name: &str) -> Result<Prepared> {
        validate::require_identifier(name, "database name")?;
        if self.state.database(name).is_some() {
            return Err(Error::StateConflict(format!("database '{name}' already exists")));
        }

        let DatabasePlan {
            mut plan,
            record,
            credentials,
        } = self.database_plan(name);
        plan.push(
            Step::new(
                format!("Record database {name}"),
                StepAction::update(StateChange::PutDatabase(record)),
            )
            .with_compensation(StepAction::update(StateChange::RemoveDatabase(
                name.to_string(),
            ))),
        );

        Ok(Prepared {
            plan,
            documents: Vec::new(),
            credentials: Some(credentials),
        })
    }

    fn delete_database(&self, name: &str) -> Result<Prepared> {
        validate::require_identifier(name, "database name")?;
        let db = self
            .state
            .database(name)
            .ok_or_else(|| Error::not_found("database", name))?;

        if let Some(site) = self.state.sites_using_database(name).first() {
            return Err(Error::StateConflict(format!(
                "database '{name}' is still used by site '{}' (delete the site with --purge)",
                site.primary_domain
            )));
        }

        Ok(Prepared {
            plan: self.drop_database_plan(db),
            documents: Vec::new(),
            credentials: None,
        })
    }

    fn install_wordpress(&self, domain: &str) -> Result<Prepared> {
        let domain = domain.to_ascii_lowercase();
        let site = self
            .state
            .site(&domain)
            .ok_or_else(|| Error::not_found("site", &domain))?;

        if site.app == AppKind::Wordpress || site.database.is_some() {
            return Err(Error::StateConflict(format!(
                "site '{domain}' already has a WordPress install"
            )));
        }
        if !site.web_root.is_dir() {
            return Err(Error::StateConflict(format!(
                "web root {} of site '{domain}' does not exist",
                site.web_root.display()
            )));
        }

        let WordpressPlan {
            mut plan,
            record,
            credentials,
            document,
        } = self.wordpress_plan(&domain, &site.web_root)?;

        if let Some(login) = &site.owner {
            plan.push(
                Step::new(
                    format!("Give {login} ownership of the WordPress files"),
                    StepAction::Run(Self::chown(
                        &format!("{login}:{login}"),
                        &site.web_root,
                        true,
                    )),
                )
                .with_compensation(Self::restore_owner(&site.web_root, true)),
            );
        }

        let updated = SiteRecord {
            app: AppKind::Wordpress,
            database: Some(record.name.clone()),
            ..site.clone()
        };
        plan.push(
            Step::new(
                format!("Record database {}", record.name),
                StepAction::update(StateChange::PutDatabase(record.clone())),
            )
            .with_compensation(StepAction::update(StateChange::RemoveDatabase(
                record.name,
            ))),
        );
        plan.push(
            Step::new(
                format!("Mark {domain} as a WordPress site"),
                StepAction::update(StateChange::PutSite(Box::new(updated))),
            )
            .with_compensation(StepAction::update(StateChange::PutSite(Box::new(
                site.clone(),
            )))),
        );

        Ok(Prepared {
            plan,
            documents: vec![document],
            credentials: Some(credentials),
        })
    }

    fn create_user(&self, username: &str, home: Option<&Path>) -> Result<Prepared> {
        validate::require_identifier(username, "username")?;
        if self.state.user(username).is_some() {
            return Err(Error::StateConflict(format!("user '{username}' already exists")));
        }

        let home = home.map_or_else(|| PathBuf::from("/home").join(username), Path::to_path_buf);
        if !home.is_absolute() {
            return Err(Error::Validation(format!(
                "home directory must be an absolute path, got '{}'",
                home.display()
            )));
        }
        // Only remove the home on rollback if useradd is the one creating it
        let home_is_new = !home.exists();

        let mut plan = Plan::new();
        plan.push(
            Step::new(
                format!("Create Linux user {username}"),
                StepAction::Run(Self::useradd(username, &home)),
            )
            .with_compensation(StepAction::Run(Self::userdel(username, home_is_new))),
        );
        plan.push(
            Step::new(
                format!("Record user {username}"),
                StepAction::update(StateChange::PutUser(UserRecord {
                    username: username.to_string(),
                    home,
                    created_at: self.now,
                })),
            )
            .with_compensation(StepAction::update(StateChange::RemoveUser(
                username.to_string(),
            ))),
        );

        Ok(Prepared {
            plan,
            documents: Vec::new(),
            credentials: None,
        })
    }

    fn delete_user(&self, username: &str, remove_home: bool) -> Result<Prepared> {
        validate::require_identifier(username, "username")?;
        if self.state.user(username).is_none() {
            return Err(Error::not_found("user", username));
        }
        if let Some(site) = self.state.sites_owned_by(username).first() {
            return Err(Error::StateConflict(format!(
                "user '{username}' still owns site '{}'",
                site.primary_domain
            )));
        }

        let mut plan = Plan::new();
        let description = if remove_home {
            format!("Delete Linux user {username} and its home directory")
        } else {
            format!("Delete Linux user {username}")
        };
        plan.push(Step::new(
            description,
            StepAction::Run(Self::userdel(username, remove_home)),
        ));
        plan.push(Step::new(
            format!("Forget user {username}"),
            StepAction::update(StateChange::RemoveUser(username.to_string())),
        ));

        Ok(Prepared {
            plan,
            documents: Vec::new(),
            credentials: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grant_host() {
        assert_eq!(grant_host("localhost"), "localhost");
        assert_eq!(grant_host("127.0.0.1"), "localhost");
        assert_eq!(grant_host("db.internal"), "%");
    }

    #[test]
    fn test_restore_owner_of_missing_path_removes_it() {
        let action = Builder::restore_owner(Path::new("/nonexistent/franken/a.com"), true);
        assert!(matches!(action, StepAction::RemoveDir { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_restore_owner_uses_current_ids() {
        use std::os::unix::fs::MetadataExt;
        let dir = tempfile::TempDir::new().unwrap();
        let meta = fs::metadata(dir.path()).unwrap();

        let action = Builder::restore_owner(dir.path(), true);
        assert_eq!(
            action.to_string(),
            format!("chown -R {}:{} {}", meta.uid(), meta.gid(), dir.path().display())
        );
    }

    #[test]
    fn test_owner_login() {
        assert_eq!(owner_login("shop-1.example.com").unwrap(), "shop_1");
        assert!(matches!(owner_login("1shop.com"), Err(Error::Validation(_))));
    }
}

//! Profile loading and the immutable run configuration.
//!
//! A provisioning run is described by a YAML profile (the operator's
//! declarative input) plus the CLI subcommand that selects the operation
//! mode. The profile is parsed into [`Configuration`], validated once, and
//! never mutated afterwards: installers receive it by reference and own no
//! shared mutable state.
//!
//! Every option axis is a closed enum so that dispatch over engines,
//! servers and backends is exhaustive at compile time.

use std::fmt;
use std::fs::File;
use std::io::BufReader;

use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;
use strum::Display;

use crate::error::WebstrapError;
use crate::platform::{PackageFamily, PlatformFacts};

/// Operation mode, selected by the CLI subcommand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Mode {
    Install,
    Upgrade,
    Uninstall,
}

/// Install profile: `standard` pins a fixed sub-configuration, `advanced`
/// exposes every option axis.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum InstallProfile {
    #[default]
    Standard,
    Advanced,
}

/// Database engine selection.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DbEngine {
    Mysql,
    #[default]
    Mariadb,
    Postgresql,
    Sqlite,
    Percona,
    Mongodb,
    /// Recognized for completeness; rejected by compatibility validation.
    Oraclexe,
}

/// Web server selection.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum WebServer {
    Nginx,
    #[default]
    Apache,
    Caddy,
    Lighttpd,
}

/// Cache backend selection.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum CacheBackend {
    Redis,
    Memcached,
    /// Works as an HTTP accelerator in front of Nginx only.
    Varnish,
    #[default]
    None,
}

/// Message queue selection.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum QueueBackend {
    Rabbitmq,
    Kafka,
    #[default]
    None,
}

/// A write-only secret value.
///
/// The wrapped string is reachable only through [`Secret::expose`]; `Debug`
/// prints `***` so secrets can never leak through log lines or error
/// messages that format surrounding structs.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    /// Returns the secret value for writing into an engine transaction or
    /// a generated artifact. Callers must not log the result.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("***")
    }
}

/// Credentials supplied by the operator.
#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    /// Admin password set on the freshly installed database engine.
    pub db_password: Secret,

    /// Present when the engine already has a password-authenticated root
    /// account (e.g., re-running against a previously secured engine).
    #[serde(default)]
    pub current_root_password: Option<Secret>,
}

fn default_doc_root() -> Utf8PathBuf {
    Utf8PathBuf::from("/var/www/html")
}

fn default_artifact_dir() -> Utf8PathBuf {
    Utf8PathBuf::from(".")
}

fn default_true() -> bool {
    true
}

/// The immutable configuration for one provisioning run.
///
/// Assembled once from the YAML profile and the CLI mode, then only read.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Configuration {
    /// Operation mode; comes from the subcommand, not the profile file.
    #[serde(skip, default = "default_mode")]
    pub mode: Mode,

    #[serde(default)]
    pub profile: InstallProfile,

    pub credentials: Credentials,

    /// Hostnames to serve; each gets its own document root subdirectory
    /// and virtual host.
    pub domains: Vec<String>,

    #[serde(default = "default_doc_root")]
    pub doc_root: Utf8PathBuf,

    #[serde(default)]
    pub database: DbEngine,

    #[serde(default)]
    pub web_server: WebServer,

    #[serde(default)]
    pub cache: CacheBackend,

    #[serde(default)]
    pub queue: QueueBackend,

    #[serde(default)]
    pub ftp: bool,

    #[serde(default = "default_true")]
    pub utils: bool,

    #[serde(default)]
    pub ssh_hardening: bool,

    #[serde(default)]
    pub ssh_deploy: bool,

    /// Public key installed for the deployment user; without it the user is
    /// still created but no `authorized_keys` file is written.
    #[serde(default)]
    pub deploy_public_key: Option<String>,

    /// When set, the hardened sshd config restricts logins to these users.
    #[serde(default)]
    pub ssh_allowed_users: Vec<String>,

    #[serde(default)]
    pub docker_artifact: bool,

    #[serde(default)]
    pub ansible_artifact: bool,

    /// Database admin panel (phpMyAdmin); applies to MySQL-family engines.
    #[serde(default = "default_true")]
    pub panel: bool,

    /// Contact address for certificate provisioning; falls back to
    /// `admin@<first domain>`.
    #[serde(default)]
    pub tls_email: Option<String>,

    /// Directory the docker/ansible artifacts are written into.
    #[serde(default = "default_artifact_dir")]
    pub artifact_dir: Utf8PathBuf,
}

fn default_mode() -> Mode {
    Mode::Install
}

impl Configuration {
    /// The standard profile pins every optional axis to the supported
    /// default combination; only domains, credentials and paths come from
    /// the operator.
    fn pin_standard(&mut self) {
        self.database = DbEngine::Mariadb;
        self.web_server = WebServer::Apache;
        self.cache = CacheBackend::None;
        self.queue = QueueBackend::None;
        self.ftp = false;
        self.docker_artifact = false;
        self.ansible_artifact = false;
        self.panel = true;
    }

    /// Structural validation, independent of the host platform.
    ///
    /// Cross-option compatibility rules live in [`crate::compat`]; this
    /// only rejects profiles that are malformed in themselves.
    pub fn validate(&self) -> Result<(), WebstrapError> {
        if self.domains.is_empty() {
            return Err(WebstrapError::Validation(
                "domains must not be empty: at least one hostname is required".to_string(),
            ));
        }
        for domain in &self.domains {
            if domain.is_empty() || domain.chars().any(char::is_whitespace) {
                return Err(WebstrapError::Validation(format!(
                    "invalid domain name: {:?}",
                    domain
                )));
            }
        }
        if !self.doc_root.is_absolute() {
            return Err(WebstrapError::Validation(format!(
                "doc_root must be an absolute path: {}",
                self.doc_root
            )));
        }
        Ok(())
    }

    /// The engine actually installed on the given platform.
    ///
    /// Oracle's MySQL packages are not shipped by rhel-like distributions;
    /// selecting MySQL there resolves to MariaDB. This is a documented
    /// substitution, not an error.
    pub fn effective_db_engine(&self, facts: &PlatformFacts) -> DbEngine {
        match (self.database, facts.family) {
            (DbEngine::Mysql, PackageFamily::RhelLike) => {
                tracing::info!("mysql is not packaged on {}; installing mariadb instead", facts.distro_id);
                DbEngine::Mariadb
            }
            (engine, _) => engine,
        }
    }

    /// True when the effective engine speaks the MySQL wire protocol.
    pub fn mysql_family(&self, facts: &PlatformFacts) -> bool {
        matches!(
            self.effective_db_engine(facts),
            DbEngine::Mysql | DbEngine::Mariadb | DbEngine::Percona
        )
    }

    /// Per-domain document root (`doc_root/<domain>`).
    pub fn domain_root(&self, domain: &str) -> Utf8PathBuf {
        self.doc_root.join(domain)
    }

    /// Contact address handed to the ACME client.
    pub fn certificate_email(&self) -> String {
        match &self.tls_email {
            Some(email) => email.clone(),
            None => format!("admin@{}", self.domains[0]),
        }
    }
}

/// Loads a profile from the given YAML file and finalizes it for the mode.
///
/// Standard profiles are pinned before validation so a profile that names
/// advanced axes still loads (the values are simply overridden).
pub fn load_profile(path: &Utf8Path, mode: Mode) -> Result<Configuration, WebstrapError> {
    let file = File::open(path).map_err(|e| WebstrapError::io(path.to_string(), e))?;
    let reader = BufReader::new(file);
    let mut config: Configuration = serde_yaml::from_reader(reader)
        .map_err(|e| WebstrapError::Config(format!("failed to parse yaml: {}: {}", path, e)))?;

    config.mode = mode;
    if config.profile == InstallProfile::Standard {
        config.pin_standard();
    }
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::PlatformFacts;

    fn minimal_yaml() -> &'static str {
        r#"---
credentials:
  db_password: s3cret
domains:
  - example.com
"#
    }

    fn from_yaml(yaml: &str, mode: Mode) -> Configuration {
        let mut config: Configuration = serde_yaml::from_str(yaml).expect("profile should parse");
        config.mode = mode;
        if config.profile == InstallProfile::Standard {
            config.pin_standard();
        }
        config
    }

    #[test]
    fn test_minimal_profile_defaults() {
        let config = from_yaml(minimal_yaml(), Mode::Install);
        assert_eq!(config.profile, InstallProfile::Standard);
        assert_eq!(config.database, DbEngine::Mariadb);
        assert_eq!(config.web_server, WebServer::Apache);
        assert_eq!(config.cache, CacheBackend::None);
        assert_eq!(config.queue, QueueBackend::None);
        assert_eq!(config.doc_root, Utf8PathBuf::from("/var/www/html"));
        assert!(config.utils);
        assert!(config.panel);
        assert!(!config.ftp);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_standard_profile_pins_advanced_axes() {
        let yaml = r#"---
profile: standard
credentials:
  db_password: s3cret
domains: [example.com]
database: postgresql
web_server: nginx
cache: redis
queue: kafka
docker_artifact: true
"#;
        let config = from_yaml(yaml, Mode::Install);
        assert_eq!(config.database, DbEngine::Mariadb);
        assert_eq!(config.web_server, WebServer::Apache);
        assert_eq!(config.cache, CacheBackend::None);
        assert_eq!(config.queue, QueueBackend::None);
        assert!(!config.docker_artifact);
    }

    #[test]
    fn test_advanced_profile_keeps_axes() {
        let yaml = r#"---
profile: advanced
credentials:
  db_password: s3cret
domains: [example.com, www.example.com]
database: postgresql
web_server: nginx
cache: varnish
"#;
        let config = from_yaml(yaml, Mode::Install);
        assert_eq!(config.database, DbEngine::Postgresql);
        assert_eq!(config.web_server, WebServer::Nginx);
        assert_eq!(config.cache, CacheBackend::Varnish);
    }

    #[test]
    fn test_empty_domains_rejected() {
        let yaml = r#"---
credentials:
  db_password: s3cret
domains: []
"#;
        let config = from_yaml(yaml, Mode::Install);
        let err = config.validate().unwrap_err();
        assert!(matches!(err, WebstrapError::Validation(_)));
    }

    #[test]
    fn test_relative_doc_root_rejected() {
        let yaml = r#"---
credentials:
  db_password: s3cret
domains: [example.com]
doc_root: www/html
"#;
        let config = from_yaml(yaml, Mode::Install);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_secret_debug_is_redacted() {
        let config = from_yaml(minimal_yaml(), Mode::Install);
        let debug = format!("{:?}", config);
        assert!(!debug.contains("s3cret"), "secret leaked into Debug: {}", debug);
        assert!(debug.contains("***"));
    }

    #[test]
    fn test_mysql_resolves_to_mariadb_on_rhel() {
        let yaml = r#"---
profile: advanced
credentials:
  db_password: s3cret
domains: [example.com]
database: mysql
"#;
        let config = from_yaml(yaml, Mode::Install);
        let rhel = PlatformFacts::for_distro_id("rocky").expect("rocky is supported");
        let debian = PlatformFacts::for_distro_id("debian").expect("debian is supported");
        assert_eq!(config.effective_db_engine(&rhel), DbEngine::Mariadb);
        assert_eq!(config.effective_db_engine(&debian), DbEngine::Mysql);
    }

    #[test]
    fn test_certificate_email_fallback() {
        let config = from_yaml(minimal_yaml(), Mode::Install);
        assert_eq!(config.certificate_email(), "admin@example.com");
    }
}

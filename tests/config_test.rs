//! Profile loading through the real YAML loader.

use camino::Utf8PathBuf;
use webstrap::config::{CacheBackend, DbEngine, InstallProfile, Mode, QueueBackend, WebServer, load_profile};
use webstrap::WebstrapError;

fn write_profile(yaml: &str) -> (tempfile::TempDir, Utf8PathBuf) {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = Utf8PathBuf::from_path_buf(dir.path().join("webstrap.yaml")).unwrap();
    std::fs::write(&path, yaml).expect("write profile");
    (dir, path)
}

#[test]
fn test_load_profile_minimal() {
    let (_dir, path) = write_profile(
        r#"---
credentials:
  db_password: s3cret
domains:
  - example.com
"#,
    );
    let config = load_profile(&path, Mode::Install).unwrap();

    assert_eq!(config.mode, Mode::Install);
    assert_eq!(config.profile, InstallProfile::Standard);
    assert_eq!(config.domains, vec!["example.com"]);
    assert_eq!(config.database, DbEngine::Mariadb);
    assert_eq!(config.web_server, WebServer::Apache);
    assert_eq!(config.cache, CacheBackend::None);
    assert_eq!(config.queue, QueueBackend::None);
    assert_eq!(config.doc_root.as_str(), "/var/www/html");
    assert!(config.ssh_allowed_users.is_empty());
    assert!(config.deploy_public_key.is_none());
}

#[test]
fn test_load_profile_full_advanced() {
    let (_dir, path) = write_profile(
        r#"---
profile: advanced
credentials:
  db_password: s3cret
  current_root_password: old-s3cret
domains: [example.com, www.example.com]
doc_root: /srv/www
database: postgresql
web_server: nginx
cache: redis
queue: rabbitmq
ftp: true
utils: false
ssh_hardening: true
ssh_deploy: true
deploy_public_key: "ssh-ed25519 AAAA test@host"
ssh_allowed_users: [alice, bob]
docker_artifact: true
ansible_artifact: true
panel: false
tls_email: ops@example.com
artifact_dir: /root/artifacts
"#,
    );
    let config = load_profile(&path, Mode::Upgrade).unwrap();

    assert_eq!(config.mode, Mode::Upgrade);
    assert_eq!(config.profile, InstallProfile::Advanced);
    assert_eq!(config.database, DbEngine::Postgresql);
    assert_eq!(config.web_server, WebServer::Nginx);
    assert_eq!(config.cache, CacheBackend::Redis);
    assert_eq!(config.queue, QueueBackend::Rabbitmq);
    assert!(config.ftp);
    assert!(!config.utils);
    assert!(config.ssh_hardening);
    assert!(config.ssh_deploy);
    assert_eq!(config.ssh_allowed_users, vec!["alice", "bob"]);
    assert!(config.docker_artifact);
    assert!(config.ansible_artifact);
    assert!(!config.panel);
    assert_eq!(config.certificate_email(), "ops@example.com");
    assert_eq!(config.artifact_dir.as_str(), "/root/artifacts");
}

#[test]
fn test_load_profile_missing_credentials_fails() {
    let (_dir, path) = write_profile("---\ndomains: [example.com]\n");
    let err = load_profile(&path, Mode::Install).unwrap_err();
    assert!(matches!(err, WebstrapError::Config(_)));
}

#[test]
fn test_load_profile_unknown_field_fails() {
    let (_dir, path) = write_profile(
        r#"---
credentials:
  db_password: s3cret
domains: [example.com]
databse: mariadb
"#,
    );
    let err = load_profile(&path, Mode::Install).unwrap_err();
    assert!(matches!(err, WebstrapError::Config(_)), "typos must be rejected: {:?}", err);
}

#[test]
fn test_load_profile_empty_domains_fails() {
    let (_dir, path) = write_profile(
        r#"---
credentials:
  db_password: s3cret
domains: []
"#,
    );
    let err = load_profile(&path, Mode::Install).unwrap_err();
    assert!(matches!(err, WebstrapError::Validation(_)));
}

#[test]
fn test_load_profile_missing_file_fails() {
    let err = load_profile(Utf8PathBuf::from("/nonexistent/webstrap.yaml").as_path(), Mode::Install)
        .unwrap_err();
    assert!(matches!(err, WebstrapError::Io { .. }));
}

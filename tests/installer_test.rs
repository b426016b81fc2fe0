//! Behavior tests for individual component installers.

mod helpers;

use std::fs;
use std::sync::Arc;
use std::time::Duration;

use camino::Utf8PathBuf;
use helpers::MockExecutor;
use webstrap::config::Mode;
use webstrap::install::{self, InstallContext};
use webstrap::pkg::PackageManager;
use webstrap::platform::PlatformFacts;
use webstrap::service::ServiceManager;

fn with_ctx(
    yaml: &str,
    facts: PlatformFacts,
    executor: Arc<MockExecutor>,
    root: &Utf8PathBuf,
    f: impl FnOnce(&InstallContext),
) {
    let config = helpers::load_config(yaml, Mode::Install);
    let pkg = PackageManager::new(facts.family, executor.clone()).with_backoff(Duration::ZERO);
    let svc = ServiceManager::new(executor.clone());
    let runtime = helpers::debian_runtime();
    let ctx = InstallContext::new(&config, &facts, &runtime, &pkg, &svc, executor)
        .with_fs_root(root.clone());
    f(&ctx);
}

fn temp_root() -> (tempfile::TempDir, Utf8PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
    (dir, root)
}

const DEPLOY_YAML: &str = r#"---
profile: advanced
credentials:
  db_password: s3cret
domains: [example.com]
ssh_deploy: true
deploy_public_key: "ssh-ed25519 AAAA deploy@ci"
"#;

#[test]
fn deploy_user_created_when_absent() {
    let (_dir, root) = temp_root();
    // `id -u deploy` failing means the user does not exist yet
    let executor = Arc::new(MockExecutor::new().failing_on("id -u deploy"));

    with_ctx(DEPLOY_YAML, helpers::debian_facts(), executor.clone(), &root, |ctx| {
        install::deploy_user::run(ctx).unwrap();
    });

    assert_eq!(executor.calls_matching("useradd").len(), 1);
    assert!(!executor.calls_matching("usermod -aG sudo deploy").is_empty());

    let keys = root.join("home/deploy/.ssh/authorized_keys");
    assert_eq!(fs::read_to_string(keys).unwrap(), "ssh-ed25519 AAAA deploy@ci\n");
}

#[test]
fn deploy_user_not_recreated_when_present() {
    let (_dir, root) = temp_root();
    let executor = Arc::new(MockExecutor::new());

    with_ctx(DEPLOY_YAML, helpers::debian_facts(), executor.clone(), &root, |ctx| {
        install::deploy_user::run(ctx).unwrap();
        install::deploy_user::run(ctx).unwrap();
    });

    assert!(
        executor.calls_matching("useradd").is_empty(),
        "an existing user must never be recreated: {:?}",
        executor.calls()
    );
}

#[test]
fn kafka_enables_coordination_before_broker() {
    let (_dir, root) = temp_root();
    let executor = Arc::new(MockExecutor::new());
    let yaml = r#"---
profile: advanced
credentials:
  db_password: s3cret
domains: [example.com]
queue: kafka
"#;

    with_ctx(yaml, helpers::debian_facts(), executor.clone(), &root, |ctx| {
        install::queue::run(ctx).unwrap();
    });

    let calls = executor.calls();
    let zk = calls
        .iter()
        .position(|c| c.contains("enable --now webstrap-zookeeper"))
        .expect("zookeeper must be enabled");
    let kafka = calls
        .iter()
        .position(|c| c.contains("enable --now webstrap-kafka"))
        .expect("kafka must be enabled");
    assert!(zk < kafka, "coordination service starts before the broker");

    let unit = root.join("etc/systemd/system/webstrap-kafka.service");
    let content = fs::read_to_string(unit).unwrap();
    assert!(content.contains("Requires=webstrap-zookeeper.service"));
}

#[test]
fn database_password_branch_requires_current_password() {
    let (_dir, root) = temp_root();
    // the socket-auth probe fails: engine already has a root password
    let executor = Arc::new(MockExecutor::new().failing_on("SELECT 1"));
    let yaml = r#"---
profile: advanced
credentials:
  db_password: s3cret
domains: [example.com]
database: mariadb
"#;

    with_ctx(yaml, helpers::debian_facts(), executor.clone(), &root, |ctx| {
        let err = install::database::run(ctx).unwrap_err();
        assert!(
            matches!(err, webstrap::WebstrapError::Validation(_)),
            "missing current password must be a validation error: {:?}",
            err
        );
    });
}

#[test]
fn database_password_branch_uses_current_password() {
    let (_dir, root) = temp_root();
    let executor = Arc::new(MockExecutor::new().failing_on("SELECT 1"));
    let yaml = r#"---
profile: advanced
credentials:
  db_password: s3cret
  current_root_password: old-s3cret
domains: [example.com]
database: mariadb
"#;

    with_ctx(yaml, helpers::debian_facts(), executor.clone(), &root, |ctx| {
        install::database::run(ctx).unwrap();
    });

    // the securing transaction ran (mysql with no -e argument, SQL on stdin)
    let transactions = executor.calls_matching("mysql -u root");
    assert!(transactions.iter().any(|c| !c.contains("SELECT 1")));
}

#[test]
fn firewall_uses_firewalld_on_rhel() {
    let (_dir, root) = temp_root();
    let executor = Arc::new(MockExecutor::new().with_stdout("--state", "running\n"));
    let yaml = r#"---
credentials:
  db_password: s3cret
domains: [example.com]
"#;

    with_ctx(yaml, helpers::rhel_facts(), executor.clone(), &root, |ctx| {
        install::firewall::run(ctx).unwrap();
    });

    assert!(!executor.calls_matching("--add-port=80/tcp").is_empty());
    assert!(!executor.calls_matching("--add-port=443/tcp").is_empty());
    assert!(!executor.calls_matching("--add-port=2222/tcp").is_empty());
    assert!(!executor.calls_matching("firewall-cmd --reload").is_empty());
    assert!(executor.calls_matching("ufw").is_empty());
}

#[test]
fn runtime_version_probe_falls_back_newest_first() {
    let executor = Arc::new(MockExecutor::new().failing_on("show php8.3"));
    let config = helpers::load_config(
        r#"---
credentials:
  db_password: s3cret
domains: [example.com]
"#,
        Mode::Install,
    );
    let facts = helpers::debian_facts();
    let pkg = PackageManager::new(facts.family, executor).with_backoff(Duration::ZERO);

    let runtime = install::runtime::resolve(&pkg, &facts, &config).unwrap();
    assert_eq!(runtime.php_version, "8.2");
    assert_eq!(runtime.fpm_service, "php8.2-fpm");
    // standard profile pins apache on debian, so the ini is the mod_php one
    assert_eq!(runtime.ini_path.as_str(), "/etc/php/8.2/apache2/php.ini");
}

#[test]
fn artifacts_render_one_stanza_per_component() {
    let (_dir, root) = temp_root();
    let executor = Arc::new(MockExecutor::new());
    let artifact_dir = root.join("artifacts");
    let yaml = format!(
        r#"---
profile: advanced
credentials:
  db_password: s3cret
domains: [example.com]
web_server: nginx
database: mariadb
cache: redis
docker_artifact: true
ansible_artifact: true
artifact_dir: {}
"#,
        artifact_dir
    );

    with_ctx(&yaml, helpers::debian_facts(), executor, &root, |ctx| {
        install::artifacts::run(ctx).unwrap();
    });

    let compose = fs::read_to_string(artifact_dir.join("docker-compose.yml")).unwrap();
    assert!(compose.contains("nginx"));
    assert!(compose.contains("mariadb"));
    assert!(compose.contains("redis"));
    assert!(!compose.contains("s3cret"), "artifact must not embed the secret");

    let playbook = fs::read_to_string(artifact_dir.join("provision-playbook.yml")).unwrap();
    assert!(playbook.contains("ansible.builtin.apt"));
}

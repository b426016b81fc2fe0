//! Uninstall scenarios: confirmation gating, present-only removal, and
//! preservation of user data paths.

mod helpers;

use std::fs;
use std::sync::Arc;
use std::time::Duration;

use camino::Utf8PathBuf;
use helpers::MockExecutor;
use webstrap::config::Mode;
use webstrap::install::InstallContext;
use webstrap::pipeline;
use webstrap::pkg::PackageManager;
use webstrap::service::ServiceManager;
use webstrap::uninstall::UninstallOutcome;

fn run_uninstall(
    executor: Arc<MockExecutor>,
    root: &Utf8PathBuf,
    confirm_answer: bool,
) -> UninstallOutcome {
    let config = helpers::standard_config(Mode::Uninstall);
    let facts = helpers::debian_facts();
    let pkg = PackageManager::new(facts.family, executor.clone()).with_backoff(Duration::ZERO);
    let svc = ServiceManager::new(executor.clone());
    let runtime = helpers::debian_runtime();
    let ctx = InstallContext::new(&config, &facts, &runtime, &pkg, &svc, executor)
        .with_fs_root(root.clone());

    let mut prompts = Vec::new();
    let mut confirm = |prompt: &str| {
        prompts.push(prompt.to_string());
        confirm_answer
    };
    let outcome = pipeline::run(&ctx, &mut confirm).expect("uninstall should not error");

    assert_eq!(prompts.len(), 1, "exactly one confirmation prompt");
    assert!(
        prompts[0].contains("Database data directories and document roots are kept"),
        "prompt must state what is preserved: {}",
        prompts[0]
    );
    outcome
}

#[test]
fn declined_confirmation_changes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
    let executor = Arc::new(MockExecutor::new().with_installed(["apache2", "mariadb-server"]));

    let outcome = run_uninstall(executor.clone(), &root, false);

    assert_eq!(outcome, UninstallOutcome::Declined);
    assert!(
        executor.calls().is_empty(),
        "declining must prevent every command: {:?}",
        executor.calls()
    );
}

#[test]
fn confirmed_uninstall_removes_only_installed_packages() {
    let dir = tempfile::tempdir().unwrap();
    let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
    // only apache2 is actually present on this host
    let executor = Arc::new(MockExecutor::new().with_installed(["apache2"]));

    let outcome = run_uninstall(executor.clone(), &root, true);
    assert_eq!(outcome, UninstallOutcome::Completed);

    let removals = executor.calls_matching("remove --purge -y");
    assert_eq!(removals.len(), 1, "one removal call: {:?}", removals);
    assert!(removals[0].contains("apache2"));
    assert!(
        !removals[0].contains("mariadb-server"),
        "absent packages must not reach the remove call: {}",
        removals[0]
    );

    assert!(!executor.calls_matching("systemctl stop apache2").is_empty());
    assert!(!executor.calls_matching("ufw --force disable").is_empty());
}

#[test]
fn uninstall_deletes_own_config_surface_but_keeps_doc_root() {
    let dir = tempfile::tempdir().unwrap();
    let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();

    let vhost = root.join("etc/apache2/sites-available/example.com.conf");
    fs::create_dir_all(vhost.parent().unwrap()).unwrap();
    fs::write(&vhost, "<VirtualHost *:80>\n</VirtualHost>\n").unwrap();

    let doc_root = root.join("var/www/html/example.com/index.php");
    fs::create_dir_all(doc_root.parent().unwrap()).unwrap();
    fs::write(&doc_root, "<?php echo 'hi';\n").unwrap();

    let tuning = root.join("etc/mysql/conf.d/webstrap-tuning.cnf");
    fs::create_dir_all(tuning.parent().unwrap()).unwrap();
    fs::write(&tuning, "[mysqld]\n").unwrap();

    let executor = Arc::new(MockExecutor::new());
    let outcome = run_uninstall(executor, &root, true);
    assert_eq!(outcome, UninstallOutcome::Completed);

    assert!(!vhost.exists(), "vhost definition must be removed");
    assert!(!tuning.exists(), "tuning drop-in must be removed");
    assert!(doc_root.exists(), "document root content must be preserved");
}

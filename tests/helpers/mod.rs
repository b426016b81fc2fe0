use std::collections::HashSet;
use std::os::unix::process::ExitStatusExt;
use std::process::ExitStatus;
use std::sync::Mutex;

use anyhow::Result;
use camino::Utf8PathBuf;
use webstrap::config::{Configuration, Mode};
use webstrap::executor::{CommandExecutor, CommandSpec, ExecutionResult};
use webstrap::install::ResolvedRuntime;
use webstrap::platform::PlatformFacts;

fn exit(code: i32) -> ExitStatus {
    ExitStatus::from_raw(code << 8)
}

/// Records every executed command and answers from a programmable table.
///
/// Package queries (`dpkg-query`, `rpm -q`) are answered from the
/// `installed` set; commands whose display line contains a configured
/// failure substring exit non-zero; everything else succeeds.
pub struct MockExecutor {
    calls: Mutex<Vec<String>>,
    installed: HashSet<String>,
    fail_matching: Vec<String>,
    stdout_matching: Vec<(String, String)>,
}

#[allow(dead_code)]
impl MockExecutor {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            installed: HashSet::new(),
            fail_matching: Vec::new(),
            stdout_matching: Vec::new(),
        }
    }

    /// Marks packages as already installed for query purposes.
    pub fn with_installed<I: IntoIterator<Item = &'static str>>(mut self, packages: I) -> Self {
        self.installed.extend(packages.into_iter().map(String::from));
        self
    }

    /// Any command whose display line contains the substring fails.
    pub fn failing_on(mut self, substring: impl Into<String>) -> Self {
        self.fail_matching.push(substring.into());
        self
    }

    /// Any matching command succeeds with the given captured stdout.
    pub fn with_stdout(mut self, substring: impl Into<String>, stdout: impl Into<String>) -> Self {
        self.stdout_matching.push((substring.into(), stdout.into()));
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_matching(&self, substring: &str) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| c.contains(substring))
            .collect()
    }
}

impl CommandExecutor for MockExecutor {
    fn execute(&self, spec: &CommandSpec) -> Result<ExecutionResult> {
        let line = if spec.args.is_empty() {
            spec.command.clone()
        } else {
            format!("{} {}", spec.command, spec.args.join(" "))
        };
        self.calls.lock().unwrap().push(line.clone());

        if spec.command == "dpkg-query" || (spec.command == "rpm" && spec.args.first().is_some_and(|a| a == "-q")) {
            let package = spec.args.last().cloned().unwrap_or_default();
            let installed = self.installed.contains(&package);
            return Ok(ExecutionResult {
                status: Some(exit(if installed { 0 } else { 1 })),
                stdout: Some(if installed { "installed" } else { "not-installed" }.to_string()),
            });
        }

        for pattern in &self.fail_matching {
            if line.contains(pattern.as_str()) {
                return Ok(ExecutionResult {
                    status: Some(exit(1)),
                    stdout: None,
                });
            }
        }

        for (pattern, stdout) in &self.stdout_matching {
            if line.contains(pattern.as_str()) {
                return Ok(ExecutionResult {
                    status: Some(exit(0)),
                    stdout: Some(stdout.clone()),
                });
            }
        }

        Ok(ExecutionResult {
            status: Some(exit(0)),
            stdout: if spec.capture_output { Some(String::new()) } else { None },
        })
    }
}

/// Writes the YAML to a temp file and loads it through the real loader.
#[allow(dead_code)]
pub fn load_config(yaml: &str, mode: Mode) -> Configuration {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = Utf8PathBuf::from_path_buf(dir.path().join("webstrap.yaml")).unwrap();
    std::fs::write(&path, yaml).expect("write profile");
    webstrap::config::load_profile(&path, mode).expect("profile should load")
}

#[allow(dead_code)]
pub fn standard_config(mode: Mode) -> Configuration {
    load_config(
        r#"---
credentials:
  db_password: s3cret
domains: [example.com]
"#,
        mode,
    )
}

#[allow(dead_code)]
pub fn debian_facts() -> PlatformFacts {
    PlatformFacts::for_distro_id("debian").expect("debian is supported")
}

#[allow(dead_code)]
pub fn rhel_facts() -> PlatformFacts {
    PlatformFacts::for_distro_id("rocky").expect("rocky is supported")
}

#[allow(dead_code)]
pub fn debian_runtime() -> ResolvedRuntime {
    ResolvedRuntime {
        php_version: "8.3".to_string(),
        fpm_service: "php8.3-fpm".to_string(),
        fpm_socket: "/run/php/php8.3-fpm.sock".to_string(),
        ini_path: Utf8PathBuf::from("/etc/php/8.3/fpm/php.ini"),
    }
}

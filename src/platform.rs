//! Platform detection and the derived distro facts.
//!
//! The probe reads `/etc/os-release` exactly once at startup and derives
//! everything the installers need to vary by distribution: the package
//! manager family, the firewall tool and the service/package names that
//! differ between families. Installers receive the resulting
//! [`PlatformFacts`] by reference and never re-probe, so a run can not
//! observe two different platform identities.

use std::fs;
use std::sync::LazyLock;

use regex::Regex;
use strum::Display;

use crate::error::WebstrapError;

const OS_RELEASE_PATH: &str = "/etc/os-release";

/// Package manager family the host belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum PackageFamily {
    /// apt/dpkg based distributions (Debian, Ubuntu, ...)
    Debian,
    /// dnf/rpm based distributions (RHEL, Rocky, Alma, Fedora, ...)
    RhelLike,
}

/// Firewall tool used on the host, derived from the package family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum FirewallTool {
    Ufw,
    Firewalld,
}

/// Facts derived from the OS identity, computed once per run.
#[derive(Debug, Clone)]
pub struct PlatformFacts {
    /// The `ID=` value from os-release (e.g., "ubuntu", "rocky").
    pub distro_id: String,
    pub family: PackageFamily,
    pub firewall: FirewallTool,
    /// Apache package name ("apache2" vs "httpd").
    pub apache_package: &'static str,
    /// Apache unit name; differs from the package name on neither family,
    /// but resolved here so no installer hard-codes it.
    pub apache_service: &'static str,
    /// SSH daemon unit name ("ssh" vs "sshd").
    pub ssh_service: &'static str,
    /// Group granting administrative rights ("sudo" vs "wheel").
    pub admin_group: &'static str,
    /// Headless JRE package, needed by the Kafka broker.
    pub java_package: &'static str,
}

const DEBIAN_IDS: &[&str] = &["debian", "ubuntu", "linuxmint", "pop", "raspbian"];
const RHEL_IDS: &[&str] = &["rhel", "centos", "rocky", "almalinux", "fedora"];

static ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?m)^ID="?([A-Za-z0-9._-]+)"?\s*$"#).expect("valid regex"));
static ID_LIKE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?m)^ID_LIKE="?([A-Za-z0-9._\- ]+)"?\s*$"#).expect("valid regex"));

impl PlatformFacts {
    /// Builds the fact table for a distro known to belong to `family`.
    fn for_family(distro_id: impl Into<String>, family: PackageFamily) -> Self {
        match family {
            PackageFamily::Debian => Self {
                distro_id: distro_id.into(),
                family,
                firewall: FirewallTool::Ufw,
                apache_package: "apache2",
                apache_service: "apache2",
                ssh_service: "ssh",
                admin_group: "sudo",
                java_package: "default-jre-headless",
            },
            PackageFamily::RhelLike => Self {
                distro_id: distro_id.into(),
                family,
                firewall: FirewallTool::Firewalld,
                apache_package: "httpd",
                apache_service: "httpd",
                ssh_service: "sshd",
                admin_group: "wheel",
                java_package: "java-17-openjdk-headless",
            },
        }
    }

    /// Looks up the facts for a distro id, if it belongs to a known family.
    pub fn for_distro_id(id: &str) -> Option<Self> {
        if DEBIAN_IDS.contains(&id) {
            Some(Self::for_family(id, PackageFamily::Debian))
        } else if RHEL_IDS.contains(&id) {
            Some(Self::for_family(id, PackageFamily::RhelLike))
        } else {
            None
        }
    }

    /// Parses os-release content into platform facts.
    ///
    /// An unknown `ID=` is resolved through `ID_LIKE=` before giving up, so
    /// derivatives that declare their ancestry (e.g., `ID_LIKE="rhel fedora"`)
    /// are still supported.
    pub fn from_os_release(content: &str) -> Result<Self, WebstrapError> {
        let id = ID_RE
            .captures(content)
            .map(|c| c[1].to_ascii_lowercase())
            .ok_or_else(|| {
                WebstrapError::UnsupportedPlatform("os-release has no ID field".to_string())
            })?;

        if let Some(facts) = Self::for_distro_id(&id) {
            return Ok(facts);
        }

        if let Some(like) = ID_LIKE_RE.captures(content) {
            for token in like[1].split_whitespace() {
                let token = token.to_ascii_lowercase();
                if DEBIAN_IDS.contains(&token.as_str()) {
                    return Ok(Self::for_family(id, PackageFamily::Debian));
                }
                if RHEL_IDS.contains(&token.as_str()) {
                    return Ok(Self::for_family(id, PackageFamily::RhelLike));
                }
            }
        }

        Err(WebstrapError::UnsupportedPlatform(format!(
            "distribution {:?} is not in the debian or rhel family",
            id
        )))
    }

    /// Reads the host OS identity and derives the platform facts.
    ///
    /// Deterministic: the same host state always yields the same facts.
    pub fn detect() -> Result<Self, WebstrapError> {
        let content = fs::read_to_string(OS_RELEASE_PATH).map_err(|e| {
            WebstrapError::UnsupportedPlatform(format!("cannot read {}: {}", OS_RELEASE_PATH, e))
        })?;
        let facts = Self::from_os_release(&content)?;
        tracing::info!(
            "detected platform: {} ({} family, firewall {})",
            facts.distro_id,
            facts.family,
            facts.firewall
        );
        Ok(facts)
    }
}

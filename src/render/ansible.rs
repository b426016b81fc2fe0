//! Automation playbook skeleton rendering.
//!
//! Fixed three-task shape: refresh the package index, upgrade installed
//! packages, install the essential tool set. The package module name
//! follows the platform family so the playbook runs on the same hosts
//! webstrap itself provisions.

use crate::platform::{PackageFamily, PlatformFacts};

const ESSENTIAL_PACKAGES: &[&str] = &["curl", "wget", "gnupg", "unzip", "tar"];

/// Renders the provisioning playbook skeleton.
pub fn playbook(facts: &PlatformFacts) -> String {
    let (module, update_task) = match facts.family {
        PackageFamily::Debian => ("ansible.builtin.apt", "        update_cache: true\n"),
        PackageFamily::RhelLike => ("ansible.builtin.dnf", "        update_cache: true\n"),
    };

    let package_list = ESSENTIAL_PACKAGES
        .iter()
        .map(|p| format!("          - {}\n", p))
        .collect::<String>();

    format!(
        r#"---
- name: Provision web application host
  hosts: all
  become: true
  tasks:
    - name: Refresh package index
      {module}:
{update_task}
    - name: Upgrade installed packages
      {module}:
        name: "*"
        state: latest

    - name: Install essential packages
      {module}:
        state: present
        name:
{package_list}"#,
        module = module,
        update_task = update_task,
        package_list = package_list,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::PlatformFacts;

    #[test]
    fn test_debian_playbook_uses_apt_module() {
        let facts = PlatformFacts::for_distro_id("ubuntu").unwrap();
        let playbook = playbook(&facts);
        assert!(playbook.contains("ansible.builtin.apt"));
        assert!(playbook.contains("- curl"));
        assert!(playbook.contains("state: latest"));
    }

    #[test]
    fn test_rhel_playbook_uses_dnf_module() {
        let facts = PlatformFacts::for_distro_id("almalinux").unwrap();
        let playbook = playbook(&facts);
        assert!(playbook.contains("ansible.builtin.dnf"));
        assert!(!playbook.contains("ansible.builtin.apt"));
    }
}

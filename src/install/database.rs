//! Database engine installer.
//!
//! Installs the selected engine, brings its service up (fatal when that
//! fails, later steps need a running engine) and performs exactly one
//! credential-securing transaction. MySQL-family engines default to
//! different root authentication methods depending on version, so the
//! branch between socket-auth and password-auth is read from the live
//! engine rather than assumed.

use std::fs;

use super::InstallContext;
use crate::config::DbEngine;
use crate::error::WebstrapError;
use crate::executor::CommandSpec;
use crate::platform::PackageFamily;

pub fn run(ctx: &InstallContext) -> Result<(), WebstrapError> {
    match ctx.config.effective_db_engine(ctx.facts) {
        DbEngine::Mariadb => mysql_family(ctx, &["mariadb-server", "mariadb-client"], "mariadb"),
        DbEngine::Mysql => mysql_family(ctx, &["mysql-server", "mysql-client"], "mysql"),
        DbEngine::Percona => {
            let packages: &[&str] = match ctx.facts.family {
                PackageFamily::Debian => &["percona-server-server", "percona-server-client"],
                PackageFamily::RhelLike => &["percona-server-server"],
            };
            mysql_family(ctx, packages, "mysql")
        }
        DbEngine::Postgresql => postgresql(ctx),
        DbEngine::Mongodb => mongodb(ctx),
        DbEngine::Sqlite => sqlite(ctx),
        // rejected by compatibility validation before any installer runs
        DbEngine::Oraclexe => Err(WebstrapError::Compatibility(vec![
            crate::compat::CompatibilityError::UnsupportedEngine(DbEngine::Oraclexe),
        ])),
    }
}

/// The unit name of the engine's service, used by uninstall as well.
pub fn service_name(ctx: &InstallContext) -> Option<&'static str> {
    match ctx.config.effective_db_engine(ctx.facts) {
        DbEngine::Mariadb => Some("mariadb"),
        DbEngine::Mysql | DbEngine::Percona => Some("mysql"),
        DbEngine::Postgresql => Some("postgresql"),
        DbEngine::Mongodb => Some("mongod"),
        DbEngine::Sqlite | DbEngine::Oraclexe => None,
    }
}

/// Package set the engine installs, used by uninstall as well.
pub fn package_set(ctx: &InstallContext) -> Vec<&'static str> {
    match (ctx.config.effective_db_engine(ctx.facts), ctx.facts.family) {
        (DbEngine::Mariadb, _) => vec!["mariadb-server", "mariadb-client"],
        (DbEngine::Mysql, _) => vec!["mysql-server", "mysql-client"],
        (DbEngine::Percona, PackageFamily::Debian) => {
            vec!["percona-server-server", "percona-server-client"]
        }
        (DbEngine::Percona, PackageFamily::RhelLike) => vec!["percona-server-server"],
        (DbEngine::Postgresql, PackageFamily::Debian) => {
            vec!["postgresql", "postgresql-contrib"]
        }
        (DbEngine::Postgresql, PackageFamily::RhelLike) => {
            vec!["postgresql-server", "postgresql-contrib"]
        }
        (DbEngine::Mongodb, _) => vec!["mongodb-org"],
        (DbEngine::Sqlite, PackageFamily::Debian) => vec!["sqlite3"],
        (DbEngine::Sqlite, PackageFamily::RhelLike) => vec!["sqlite"],
        (DbEngine::Oraclexe, _) => vec![],
    }
}

fn mysql_family(
    ctx: &InstallContext,
    packages: &[&str],
    service: &str,
) -> Result<(), WebstrapError> {
    ctx.pkg.install(packages)?;
    ctx.svc.enable_now(service)?;
    secure_mysql_family(ctx)
}

/// One credential-securing transaction: set the admin password, drop
/// anonymous accounts and the test schema.
///
/// The SQL travels on stdin and the current password (when needed) in a
/// redacted environment slot, so neither reaches argv or the log.
fn secure_mysql_family(ctx: &InstallContext) -> Result<(), WebstrapError> {
    let password = sql_quote(ctx.config.credentials.db_password.expose());
    let sql = format!(
        "ALTER USER 'root'@'localhost' IDENTIFIED BY '{}';\n\
         DELETE FROM mysql.user WHERE User='';\n\
         DROP DATABASE IF EXISTS test;\n\
         DELETE FROM mysql.db WHERE Db='test' OR Db='test\\_%';\n\
         FLUSH PRIVILEGES;\n",
        password
    );

    // Fresh installs usually answer to unix-socket auth; a re-run against
    // an already-secured engine needs the current password instead.
    let probe = CommandSpec::new("mysql", ["-u", "root", "-e", "SELECT 1"]).capturing_output();
    let socket_auth = ctx.exec(&probe)?.success();

    let spec = if socket_auth {
        tracing::info!("securing database engine via socket authentication");
        CommandSpec::new("mysql", ["-u", "root"]).with_stdin(sql)
    } else {
        let current = ctx.config.credentials.current_root_password.as_ref().ok_or_else(|| {
            WebstrapError::Validation(
                "engine root account is password-protected; set credentials.current_root_password"
                    .to_string(),
            )
        })?;
        tracing::info!("securing database engine via password authentication");
        CommandSpec::new("mysql", ["-u", "root"])
            .with_secret_env("MYSQL_PWD", current.expose())
            .with_stdin(sql)
    };

    ctx.exec_checked(&spec)?;
    tracing::info!("database engine credentials secured");
    Ok(())
}

fn postgresql(ctx: &InstallContext) -> Result<(), WebstrapError> {
    let packages = package_set(ctx);
    ctx.pkg.install(&packages)?;

    // The rhel packaging leaves cluster initialization to the operator;
    // skip when a cluster already exists so re-runs stay clean.
    if ctx.facts.family == PackageFamily::RhelLike
        && !ctx.path("/var/lib/pgsql/data/PG_VERSION").exists()
    {
        ctx.exec_checked(&CommandSpec::new("postgresql-setup", ["--initdb"]))?;
    }

    ctx.svc.enable_now("postgresql")?;

    let sql = format!(
        "ALTER USER postgres WITH PASSWORD '{}';\n",
        sql_quote(ctx.config.credentials.db_password.expose())
    );
    let spec = CommandSpec::new("su", ["-", "postgres", "-c", "psql"]).with_stdin(sql);
    ctx.exec_checked(&spec)?;
    tracing::info!("postgresql admin password set");
    Ok(())
}

fn mongodb(ctx: &InstallContext) -> Result<(), WebstrapError> {
    register_mongodb_repository(ctx)?;
    ctx.pkg.refresh_index()?;
    ctx.pkg.install(&["mongodb-org"])?;
    ctx.svc.enable_now("mongod")?;
    Ok(())
}

/// MongoDB is not carried by either family's default repositories; the
/// vendor repository has to be registered first.
fn register_mongodb_repository(ctx: &InstallContext) -> Result<(), WebstrapError> {
    match ctx.facts.family {
        PackageFamily::Debian => {
            let keyring = "/usr/share/keyrings/mongodb-server-7.0.gpg";
            let asc = format!("/tmp/mongodb-{}.asc", uuid::Uuid::new_v4());
            ctx.exec_checked(&CommandSpec::new(
                "curl",
                ["-fsSL", "https://pgp.mongodb.com/server-7.0.asc", "-o", asc.as_str()],
            ))?;
            ctx.exec_checked(&CommandSpec::new(
                "gpg",
                ["--dearmor", "--yes", "-o", keyring, asc.as_str()],
            ))?;
            let _ = fs::remove_file(&asc);

            let list = format!(
                "deb [signed-by={}] https://repo.mongodb.org/apt/{} {}/mongodb-org/7.0 {}\n",
                keyring,
                ctx.facts.distro_id,
                suite_for(&ctx.facts.distro_id),
                if ctx.facts.distro_id == "ubuntu" { "multiverse" } else { "main" },
            );
            super::write_file_if_changed(
                &ctx.path("/etc/apt/sources.list.d/mongodb-org-7.0.list"),
                &list,
            )?;
        }
        PackageFamily::RhelLike => {
            let repo = "[mongodb-org-7.0]\n\
                 name=MongoDB Repository\n\
                 baseurl=https://repo.mongodb.org/yum/redhat/$releasever/mongodb-org/7.0/x86_64/\n\
                 gpgcheck=1\n\
                 enabled=1\n\
                 gpgkey=https://pgp.mongodb.com/server-7.0.asc\n";
            super::write_file_if_changed(
                &ctx.path("/etc/yum.repos.d/mongodb-org-7.0.repo"),
                repo,
            )?;
        }
    }
    Ok(())
}

fn suite_for(distro_id: &str) -> &'static str {
    match distro_id {
        "ubuntu" => "jammy",
        _ => "bookworm",
    }
}

/// SQLite is file-based: installing the tooling is the whole bring-up,
/// and credential securing is a no-op.
fn sqlite(ctx: &InstallContext) -> Result<(), WebstrapError> {
    let packages = package_set(ctx);
    ctx.pkg.install(&packages)?;
    tracing::info!("sqlite has no service or credentials to configure");
    Ok(())
}

/// Escapes a value for inclusion in a single-quoted SQL string.
fn sql_quote(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "''")
}

//! Container orchestration descriptor rendering.
//!
//! One service stanza per selected component. The database password is
//! referenced through a compose variable (`${DB_PASSWORD}`) rather than
//! embedded, so the artifact can be committed without leaking the secret.

use crate::config::{CacheBackend, Configuration, DbEngine, QueueBackend, WebServer};
use crate::platform::PlatformFacts;

/// Renders a docker-compose descriptor for the selected components.
pub fn docker_compose(config: &Configuration, facts: &PlatformFacts) -> String {
    let mut out = String::from("services:\n");

    out.push_str(&web_stanza(config.web_server));

    match config.effective_db_engine(facts) {
        DbEngine::Mysql => out.push_str(&mysql_stanza("mysql:8.0", "MYSQL_ROOT_PASSWORD")),
        DbEngine::Mariadb => out.push_str(&mysql_stanza("mariadb:11", "MARIADB_ROOT_PASSWORD")),
        DbEngine::Percona => out.push_str(&mysql_stanza("percona:8.0", "MYSQL_ROOT_PASSWORD")),
        DbEngine::Postgresql => out.push_str(
            "  database:\n    image: postgres:16\n    environment:\n      POSTGRES_PASSWORD: ${DB_PASSWORD}\n    volumes:\n      - db-data:/var/lib/postgresql/data\n    restart: unless-stopped\n",
        ),
        DbEngine::Mongodb => out.push_str(
            "  database:\n    image: mongo:7\n    environment:\n      MONGO_INITDB_ROOT_USERNAME: root\n      MONGO_INITDB_ROOT_PASSWORD: ${DB_PASSWORD}\n    volumes:\n      - db-data:/data/db\n    restart: unless-stopped\n",
        ),
        // file-based engine lives inside the application volume
        DbEngine::Sqlite => {}
        // rejected before any renderer runs
        DbEngine::Oraclexe => {}
    }

    match config.cache {
        CacheBackend::Redis => out.push_str(
            "  cache:\n    image: redis:7\n    restart: unless-stopped\n",
        ),
        CacheBackend::Memcached => out.push_str(
            "  cache:\n    image: memcached:1.6\n    restart: unless-stopped\n",
        ),
        CacheBackend::Varnish => out.push_str(
            "  cache:\n    image: varnish:7\n    depends_on:\n      - web\n    restart: unless-stopped\n",
        ),
        CacheBackend::None => {}
    }

    match config.queue {
        QueueBackend::Rabbitmq => out.push_str(
            "  queue:\n    image: rabbitmq:3-management\n    restart: unless-stopped\n",
        ),
        QueueBackend::Kafka => out.push_str(
            "  zookeeper:\n    image: bitnami/zookeeper:3.9\n    environment:\n      ALLOW_ANONYMOUS_LOGIN: \"yes\"\n    restart: unless-stopped\n  queue:\n    image: bitnami/kafka:3.7\n    depends_on:\n      - zookeeper\n    restart: unless-stopped\n",
        ),
        QueueBackend::None => {}
    }

    out.push_str("\nvolumes:\n  db-data:\n");
    out
}

fn web_stanza(server: WebServer) -> String {
    let image = match server {
        WebServer::Nginx => "nginx:stable",
        WebServer::Apache => "httpd:2.4",
        WebServer::Caddy => "caddy:2",
        WebServer::Lighttpd => "sebp/lighttpd:latest",
    };
    format!(
        "  web:\n    image: {}\n    ports:\n      - \"80:80\"\n      - \"443:443\"\n    restart: unless-stopped\n",
        image
    )
}

fn mysql_stanza(image: &str, password_var: &str) -> String {
    format!(
        "  database:\n    image: {}\n    environment:\n      {}: ${{DB_PASSWORD}}\n    volumes:\n      - db-data:/var/lib/mysql\n    restart: unless-stopped\n",
        image, password_var
    )
}

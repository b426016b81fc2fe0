//! Per-domain virtual host and server block rendering.
//!
//! One entry per domain, pointing at `doc_root/<domain>`. Apache runs PHP
//! embedded (mod_php) on the debian family, so only the other servers
//! reference the FPM socket.

use camino::Utf8Path;

use crate::config::WebServer;

/// Parameters for one domain's virtual host.
#[derive(Debug, Clone)]
pub struct VhostParams<'a> {
    pub domain: &'a str,
    /// The per-domain document root (`doc_root/<domain>`).
    pub root: &'a Utf8Path,
    /// PHP FPM socket path, used by servers that proxy to FPM.
    pub fpm_socket: &'a str,
}

/// Renders the configuration entry for one domain on the given server.
pub fn render(server: WebServer, params: &VhostParams) -> String {
    match server {
        WebServer::Nginx => nginx_server_block(params),
        WebServer::Apache => apache_vhost(params),
        WebServer::Caddy => caddy_site(params),
        WebServer::Lighttpd => lighttpd_host(params),
    }
}

pub fn nginx_server_block(params: &VhostParams) -> String {
    format!(
        r#"server {{
    listen 80;
    listen [::]:80;
    server_name {domain};
    root {root};
    index index.php index.html index.htm;

    location / {{
        try_files $uri $uri/ =404;
    }}

    location ~ \.php$ {{
        include snippets/fastcgi-php.conf;
        fastcgi_pass unix:{socket};
    }}

    location ~ /\.ht {{
        deny all;
    }}
}}
"#,
        domain = params.domain,
        root = params.root,
        socket = params.fpm_socket,
    )
}

pub fn apache_vhost(params: &VhostParams) -> String {
    format!(
        r#"<VirtualHost *:80>
    ServerName {domain}
    DocumentRoot {root}

    <Directory {root}>
        Options -Indexes +FollowSymLinks
        AllowOverride All
        Require all granted
    </Directory>

    ErrorLog ${{APACHE_LOG_DIR}}/{domain}-error.log
    CustomLog ${{APACHE_LOG_DIR}}/{domain}-access.log combined
</VirtualHost>
"#,
        domain = params.domain,
        root = params.root,
    )
}

pub fn caddy_site(params: &VhostParams) -> String {
    format!(
        r#"{domain} {{
    root * {root}
    php_fastcgi unix/{socket}
    file_server
}}
"#,
        domain = params.domain,
        root = params.root,
        socket = params.fpm_socket,
    )
}

pub fn lighttpd_host(params: &VhostParams) -> String {
    format!(
        r#"$HTTP["host"] == "{domain}" {{
    server.document-root = "{root}"
    index-file.names = ( "index.php", "index.html" )
    fastcgi.server = ( ".php" => (( "socket" => "{socket}" )) )
}}
"#,
        domain = params.domain,
        root = params.root,
        socket = params.fpm_socket,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;

    fn params<'a>(root: &'a Utf8PathBuf) -> VhostParams<'a> {
        VhostParams {
            domain: "example.com",
            root,
            fpm_socket: "/run/php/php8.3-fpm.sock",
        }
    }

    #[test]
    fn test_nginx_block_points_at_domain_root() {
        let root = Utf8PathBuf::from("/var/www/html/example.com");
        let block = nginx_server_block(&params(&root));
        assert!(block.contains("server_name example.com;"));
        assert!(block.contains("root /var/www/html/example.com;"));
        assert!(block.contains("fastcgi_pass unix:/run/php/php8.3-fpm.sock;"));
    }

    #[test]
    fn test_apache_vhost_has_no_fpm_reference() {
        let root = Utf8PathBuf::from("/var/www/html/example.com");
        let vhost = apache_vhost(&params(&root));
        assert!(vhost.contains("ServerName example.com"));
        assert!(vhost.contains("DocumentRoot /var/www/html/example.com"));
        assert!(!vhost.contains("fpm"));
    }

    #[test]
    fn test_render_is_deterministic() {
        let root = Utf8PathBuf::from("/srv/www/example.com");
        for server in [WebServer::Nginx, WebServer::Apache, WebServer::Caddy, WebServer::Lighttpd] {
            assert_eq!(render(server, &params(&root)), render(server, &params(&root)));
        }
    }
}

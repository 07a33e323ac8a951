//! Config file rendering
//!
//! Templates are compiled into the binary; rendering is a pure function of
//! the template id and the parameter map.

use handlebars::Handlebars;
use std::collections::BTreeMap;

use crate::error::{Error, Result};

/// Web server site block
pub const SITE_CONFIG: &str = "site-config";

/// WordPress `wp-config.php`
pub const WP_CONFIG: &str = "wp-config";

const SITE_CONFIG_TEMPLATE: &str = "\
# Managed by franken (PHP {{php_version}})
{{domains}} {
    root * {{web_root}}
    php_server
}
";

const WP_CONFIG_TEMPLATE: &str = "\
<?php
// Managed by franken
define('DB_NAME', '{{db_name}}');
define('DB_USER', '{{db_user}}');
define('DB_PASSWORD', '{{db_password}}');
define('DB_HOST', '{{db_host}}');
define('DB_CHARSET', 'utf8mb4');
define('DB_COLLATE', '');

define('AUTH_KEY',         '{{auth_key}}');
define('SECURE_AUTH_KEY',  '{{secure_auth_key}}');
define('LOGGED_IN_KEY',    '{{logged_in_key}}');
define('NONCE_KEY',        '{{nonce_key}}');
define('AUTH_SALT',        '{{auth_salt}}');
define('SECURE_AUTH_SALT', '{{secure_auth_salt}}');
define('LOGGED_IN_SALT',   '{{logged_in_salt}}');
define('NONCE_SALT',       '{{nonce_salt}}');

$table_prefix = '{{table_prefix}}';

define('WP_DEBUG', false);

if (!defined('ABSPATH')) {
    define('ABSPATH', __DIR__ . '/');
}

require_once ABSPATH . 'wp-settings.php';
";

/// The eight WordPress authentication keys and salts, as template parameters
pub const WP_SECRET_KEYS: [&str; 8] = [
    "auth_key",
    "secure_auth_key",
    "logged_in_key",
    "nonce_key",
    "auth_salt",
    "secure_auth_salt",
    "logged_in_salt",
    "nonce_salt",
];

struct TemplateDef {
    id: &'static str,
    source: &'static str,
    required: &'static [&'static str],
}

const TEMPLATES: &[TemplateDef] = &[
    TemplateDef {
        id: SITE_CONFIG,
        source: SITE_CONFIG_TEMPLATE,
        required: &["domains", "web_root", "php_version"],
    },
    TemplateDef {
        id: WP_CONFIG,
        source: WP_CONFIG_TEMPLATE,
        required: &[
            "db_name",
            "db_user",
            "db_password",
            "db_host",
            "table_prefix",
            "auth_key",
            "secure_auth_key",
            "logged_in_key",
            "nonce_key",
            "auth_salt",
            "secure_auth_salt",
            "logged_in_salt",
            "nonce_salt",
        ],
    },
];

/// Renders the built-in templates
pub struct Renderer {
    handlebars: Handlebars<'static>,
}

impl std::fmt::Debug for Renderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Renderer")
            .field("templates", &TEMPLATES.iter().map(|t| t.id).collect::<Vec<_>>())
            .finish()
    }
}

impl Renderer {
    pub fn new() -> Result<Self> {
        let mut handlebars = Handlebars::new();
        handlebars.set_strict_mode(true);
        // Output is config text, not HTML
        handlebars.register_escape_fn(handlebars::no_escape);

        for def in TEMPLATES {
            handlebars
                .register_template_string(def.id, def.source)
                .map_err(|e| Error::Template(format!("{}: {e}", def.id)))?;
        }

        Ok(Self { handlebars })
    }

    /// Render `template_id` with `params`.
    ///
    /// Unknown ids and missing required parameters are validation errors.
    pub fn render(&self, template_id: &str, params: &BTreeMap<String, String>) -> Result<String> {
        let def = TEMPLATES
            .iter()
            .find(|t| t.id == template_id)
            .ok_or_else(|| Error::Validation(format!("unknown template '{template_id}'")))?;

        let missing: Vec<&str> = def
            .required
            .iter()
            .copied()
            .filter(|key| !params.contains_key(*key))
            .collect();
        if !missing.is_empty() {
            return Err(Error::Validation(format!(
                "template '{template_id}' is missing parameters: {}",
                missing.join(", ")
            )));
        }

        self.handlebars
            .render(template_id, params)
            .map_err(|e| Error::Validation(format!("cannot render '{template_id}': {e}")))
    }
}

/// Site config file name for a primary domain: dots become underscores
pub fn site_config_file_name(primary_domain: &str) -> String {
    format!("{}.conf", primary_domain.replace('.', "_"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    fn site_params() -> BTreeMap<String, String> {
        params(&[
            ("domains", "example.com www.example.com"),
            ("web_root", "/var/www/example.com"),
            ("php_version", "8.3"),
        ])
    }

    #[test]
    fn test_site_config() {
        let renderer = Renderer::new().unwrap();
        let text = renderer.render(SITE_CONFIG, &site_params()).unwrap();
        assert!(text.contains("example.com www.example.com {\n"));
        assert!(text.contains("    root * /var/www/example.com\n"));
        assert!(text.contains("    php_server\n"));
        assert!(text.ends_with("}\n"));
    }

    #[test]
    fn test_render_is_deterministic() {
        let renderer = Renderer::new().unwrap();
        let first = renderer.render(SITE_CONFIG, &site_params()).unwrap();
        let second = Renderer::new()
            .unwrap()
            .render(SITE_CONFIG, &site_params())
            .unwrap();
        assert_eq!(first.as_bytes(), second.as_bytes());
    }

    #[test]
    fn test_values_are_not_html_escaped() {
        let renderer = Renderer::new().unwrap();
        let mut p: BTreeMap<String, String> = WP_SECRET_KEYS
            .iter()
            .map(|k| ((*k).to_string(), "<&>".to_string()))
            .collect();
        p.extend(params(&[
            ("db_name", "wp_a_com"),
            ("db_user", "wp_a_com"),
            ("db_password", "p@ss&word"),
            ("db_host", "localhost"),
            ("table_prefix", "wp_"),
        ]));

        let text = renderer.render(WP_CONFIG, &p).unwrap();
        assert!(text.contains("define('DB_PASSWORD', 'p@ss&word');"));
        assert!(text.contains("define('NONCE_SALT',       '<&>');"));
        assert!(text.contains("$table_prefix = 'wp_';"));
    }

    #[test]
    fn test_missing_parameter_is_validation_error() {
        let renderer = Renderer::new().unwrap();
        let mut p = site_params();
        p.remove("web_root");

        let err = renderer.render(SITE_CONFIG, &p).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(err.to_string().contains("web_root"));
    }

    #[test]
    fn test_unknown_template_is_validation_error() {
        let renderer = Renderer::new().unwrap();
        let err = renderer.render("nginx", &site_params()).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_site_config_file_name() {
        assert_eq!(site_config_file_name("www.example.com"), "www_example_com.conf");
    }
}

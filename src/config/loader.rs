//! Locating `portal.toml` and expanding `${VAR}` references in it

use crate::error::{Error, Result};
use regex::{Captures, Regex};
use std::env;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use super::Config;

pub const CONFIG_FILENAME: &str = "portal.toml";

/// `${NAME}` or `${NAME:-fallback}`
static ENV_REF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)(?::-([^}]*))?\}").expect("env reference pattern")
});

/// Load the nearest portal.toml
pub fn load_config() -> Result<Config> {
    let cwd = env::current_dir()?;
    let path = locate(&cwd).ok_or(Error::ConfigNotFound)?;
    tracing::debug!("Using configuration at {}", path.display());
    load_config_from_path(&path)
}

/// Like [`load_config`], but a missing file yields the defaults
pub fn load_config_or_default() -> Result<Config> {
    load_config().or_else(|e| match e {
        Error::ConfigNotFound => {
            tracing::debug!("No {} found, using defaults", CONFIG_FILENAME);
            Ok(Config::default())
        }
        other => Err(other),
    })
}

pub fn load_config_from_path(path: &Path) -> Result<Config> {
    let raw = fs::read_to_string(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => Error::ConfigNotFound,
        _ => Error::Io(e),
    })?;
    Ok(toml::from_str(&interpolate_env_vars(&raw))?)
}

/// First directory from `start` upward that holds a portal.toml
fn locate(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join(CONFIG_FILENAME))
        .find(|candidate| candidate.is_file())
}

/// Unset variables without a fallback expand to the empty string
fn interpolate_env_vars(content: &str) -> String {
    ENV_REF
        .replace_all(content, |caps: &Captures| {
            env::var(&caps[1])
                .unwrap_or_else(|_| caps.get(2).map_or("", |m| m.as_str()).to_string())
        })
        .into_owned()
}

/// Starter file written by `portal init`
pub fn default_config_content() -> &'static str {
    r#"# Campus portal client configuration

[api]
base_url = "${PORTAL_API_URL:-http://localhost:5000/api}"
timeout_secs = 15

[storage]
# Holds the bearer token between runs
token_path = "${HOME:-.}/.config/campus-portal/session.json"

# Settings for `portal dev-server`
[server]
host = "127.0.0.1"
port = 5000
jwt_secret = "${PORTAL_JWT_SECRET:-campus-portal-dev-secret}"

# [server.seed_admin]
# name = "Administrator"
# email = "admin@college.edu"
# password = "${PORTAL_ADMIN_PASSWORD}"
"#
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interpolates_set_variable() {
        env::set_var("PORTAL_LOADER_URL", "http://campus.test/api");
        let expanded = interpolate_env_vars("base_url = \"${PORTAL_LOADER_URL:-unused}\"");
        assert_eq!(expanded, "base_url = \"http://campus.test/api\"");
        env::remove_var("PORTAL_LOADER_URL");
    }

    #[test]
    fn test_interpolation_fallbacks() {
        assert_eq!(
            interpolate_env_vars("port = ${PORTAL_UNSET_PORT:-5000}"),
            "port = 5000"
        );
        assert_eq!(interpolate_env_vars("secret = \"${PORTAL_UNSET_SECRET}\""), "secret = \"\"");
        // lowercase names are not references
        assert_eq!(interpolate_env_vars("${home}"), "${home}");
    }

    #[test]
    fn test_locate_searches_upward() {
        let root = tempfile::tempdir().unwrap();
        let nested = root.path().join("a").join("b");
        fs::create_dir_all(&nested).unwrap();
        assert_eq!(locate(&nested), None);

        fs::write(root.path().join(CONFIG_FILENAME), "").unwrap();
        assert_eq!(locate(&nested), Some(root.path().join(CONFIG_FILENAME)));
    }

    #[test]
    fn test_default_content_parses() {
        let content = interpolate_env_vars(default_config_content());
        let config: Config = toml::from_str(&content).expect("default config should parse");
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.api.timeout_secs, 15);
    }

    #[test]
    fn test_load_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILENAME);
        fs::write(
            &path,
            "[api]\nbase_url = \"http://portal.test/api\"\n\n[storage]\ntoken_path = \"/tmp/tok.json\"\n",
        )
        .unwrap();

        let config = load_config_from_path(&path).unwrap();
        assert_eq!(config.api.base_url, "http://portal.test/api");
        assert_eq!(config.api.timeout_secs, 15);
        assert_eq!(config.storage.token_path, PathBuf::from("/tmp/tok.json"));
    }

    #[test]
    fn test_missing_file_is_config_not_found() {
        let result = load_config_from_path(Path::new("/definitely/not/here/portal.toml"));
        assert!(matches!(result, Err(Error::ConfigNotFound)));
    }
}

//! Environment variable and config reference resolver
//!
//! This module handles resolution of:
//! - Environment variables: `${VAR}` and `${VAR:-default}`
//! - Config references: `${section.key}`
//! - Password references: `${password:name}`

use crate::{ConfigError, Result};
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

static PLACEHOLDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("placeholder pattern is valid"));

static REFERENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([A-Za-z0-9_-]+)\.([A-Za-z0-9_-]+)\}").expect("reference pattern is valid")
});

static PASSWORD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{password:([A-Za-z0-9_-]+)\}").expect("password pattern is valid")
});

/// Split `VAR:-default` into its name and optional default
fn split_default(expr: &str) -> (&str, Option<&str>) {
    match expr.find(":-") {
        Some(pos) => (&expr[..pos], Some(&expr[pos + 2..])),
        None => (expr, None),
    }
}

/// Resolve environment variables in a string
///
/// Placeholders that are config or password references are left untouched.
pub fn resolve_env_vars(input: &str, env_vars: &HashMap<String, String>) -> Result<String> {
    let mut result = input.to_string();
    let mut errors = Vec::new();

    for cap in PLACEHOLDER_RE.captures_iter(input) {
        let full_match = &cap[0];
        let (var_name, default_value) = split_default(&cap[1]);

        if var_name.contains('.') || var_name.starts_with("password:") {
            continue;
        }

        if let Some(value) = env_vars.get(var_name) {
            result = result.replace(full_match, value);
        } else if let Some(default) = default_value {
            result = result.replace(full_match, default);
        } else {
            errors.push(var_name.to_string());
        }
    }

    if !errors.is_empty() {
        return Err(ConfigError::EnvVarNotFound(errors.join(", ")));
    }

    Ok(result)
}

/// Resolve `${section.key}` references through `lookup`
pub fn resolve_references<F>(input: &str, mut lookup: F) -> Result<String>
where
    F: FnMut(&str, &str) -> Result<Option<String>>,
{
    let mut result = input.to_string();
    let mut errors = Vec::new();

    for cap in REFERENCE_RE.captures_iter(input) {
        let full_match = &cap[0];
        match lookup(&cap[1], &cap[2])? {
            Some(value) => result = result.replace(full_match, &value),
            None => errors.push(format!("{}.{}", &cap[1], &cap[2])),
        }
    }

    if !errors.is_empty() {
        return Err(ConfigError::ReferenceNotFound(errors.join(", ")));
    }

    Ok(result)
}

/// Resolve `${password:name}` references through `password`
pub fn resolve_passwords<F>(input: &str, mut password: F) -> String
where
    F: FnMut(&str) -> String,
{
    PASSWORD_RE
        .replace_all(input, |cap: &regex::Captures<'_>| password(&cap[1]))
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env() -> HashMap<String, String> {
        HashMap::from([
            ("DB_USER".to_string(), "admin".to_string()),
            ("PORT".to_string(), "3306".to_string()),
        ])
    }

    #[test]
    fn test_resolve_env_vars() {
        let env_vars = env();

        assert_eq!(resolve_env_vars("${DB_USER}", &env_vars).unwrap(), "admin");
        assert_eq!(
            resolve_env_vars("localhost:${PORT}", &env_vars).unwrap(),
            "localhost:3306"
        );
        assert_eq!(
            resolve_env_vars("${MISSING:-default}", &env_vars).unwrap(),
            "default"
        );
        assert_eq!(
            resolve_env_vars("${DB_USER:-ignored}", &env_vars).unwrap(),
            "admin"
        );
        assert_eq!(
            resolve_env_vars("${BIND:-0.0.0.0}", &env_vars).unwrap(),
            "0.0.0.0"
        );
    }

    #[test]
    fn test_missing_env_var_is_reported() {
        let err = resolve_env_vars("${NOPE} ${ALSO_NOPE}", &env()).unwrap_err();
        match err {
            ConfigError::EnvVarNotFound(names) => assert_eq!(names, "NOPE, ALSO_NOPE"),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_env_pass_leaves_references() {
        let input = "${db.host} ${password:sql}";
        assert_eq!(resolve_env_vars(input, &env()).unwrap(), input);
    }

    #[test]
    fn test_resolve_references() {
        let result = resolve_references("mysql://${db.host}:${db.port}", |section, key| {
            assert_eq!(section, "db");
            Ok(match key {
                "host" => Some("10.0.0.5".to_string()),
                "port" => Some("3306".to_string()),
                _ => None,
            })
        })
        .unwrap();
        assert_eq!(result, "mysql://10.0.0.5:3306");

        let err = resolve_references("${db.missing}", |_, _| Ok(None)).unwrap_err();
        assert!(matches!(err, ConfigError::ReferenceNotFound(r) if r == "db.missing"));
    }

    #[test]
    fn test_resolve_passwords() {
        let result = resolve_passwords("admin_token=${password:service_token}", |name| {
            format!("<{}>", name)
        });
        assert_eq!(result, "admin_token=<service_token>");
    }
}

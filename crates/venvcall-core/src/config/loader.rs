//! Environment variable loading.
//!
//! Keeps the fallback chains in one place so callers never repeat `or_else` on
//! `std::env::var`.

use std::env;
use std::path::Path;

use super::env_keys::DEPRECATED_PAIRS;

/// Print a one-time migration hint when a deprecated variable is set and its
/// replacement is not.
fn warn_deprecated_env_vars() {
    use std::sync::Once;
    static WARNED: Once = Once::new();
    WARNED.call_once(|| {
        let mut hints = Vec::new();
        for (deprecated, recommended) in DEPRECATED_PAIRS {
            if env::var(deprecated).is_ok() && env::var(recommended).is_err() {
                hints.push(format!("{} → {}", deprecated, recommended));
            }
        }
        if !hints.is_empty() {
            tracing::warn!(
                "[DEPRECATED] the following environment variables are deprecated:\n   {}",
                hints.join("\n   ")
            );
        }
    });
}

/// Split one `.env` line into key and value. Blank lines and comments yield `None`.
fn parse_dotenv_line(line: &str) -> Option<(&str, &str)> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }
    let eq_pos = line.find('=')?;
    let key = line[..eq_pos].trim();
    let mut value = line[eq_pos + 1..].trim();
    // Strip inline comment (# not inside quotes)
    if let Some(hash_pos) = value.find('#') {
        let before_hash = value[..hash_pos].trim_end();
        if !before_hash.contains('"') && !before_hash.contains('\'') {
            value = before_hash;
        }
    }
    if value.len() >= 2
        && ((value.starts_with('"') && value.ends_with('"'))
            || (value.starts_with('\'') && value.ends_with('\'')))
    {
        value = &value[1..value.len() - 1];
    }
    if key.is_empty() {
        return None;
    }
    Some((key, value))
}

/// Load `<dir>/.env` into the process environment. Variables that are already
/// set are left untouched.
pub fn load_dotenv_from_dir(dir: &Path) {
    let Ok(content) = std::fs::read_to_string(dir.join(".env")) else {
        return;
    };
    for (key, value) in content.lines().filter_map(parse_dotenv_line) {
        if env::var(key).is_err() {
            env::set_var(key, value);
        }
    }
}

/// Load `.env` from the current directory, once per process.
pub fn load_dotenv() {
    use std::sync::Once;
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        if let Ok(cwd) = env::current_dir() {
            load_dotenv_from_dir(&cwd);
        }
        warn_deprecated_env_vars();
    });
}

/// Read the primary variable or the first set alias, falling back to `default`.
pub fn env_or<F>(primary: &str, aliases: &[&str], default: F) -> String
where
    F: FnOnce() -> String,
{
    env::var(primary)
        .ok()
        .or_else(|| aliases.iter().find_map(|a| env::var(a).ok()))
        .filter(|s| !s.is_empty())
        .unwrap_or_else(default)
}

/// Like [`env_or`] but returns `None` when unset. Blank values count as unset.
pub fn env_optional(primary: &str, aliases: &[&str]) -> Option<String> {
    env::var(primary)
        .ok()
        .or_else(|| aliases.iter().find_map(|a| env::var(a).ok()))
        .and_then(|s| {
            let s = s.trim().to_string();
            if s.is_empty() {
                None
            } else {
                Some(s)
            }
        })
}

/// Boolean variable: 0/false/no/off are false, anything else set is true.
pub fn env_bool(primary: &str, aliases: &[&str], default: bool) -> bool {
    let v = env::var(primary)
        .ok()
        .or_else(|| aliases.iter().find_map(|a| env::var(a).ok()));
    match v.as_deref() {
        Some(s) => !matches!(
            s.trim().to_lowercase().as_str(),
            "0" | "false" | "no" | "off"
        ),
        None => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_dotenv_line_plain_and_quoted() {
        assert_eq!(parse_dotenv_line("A=1"), Some(("A", "1")));
        assert_eq!(
            parse_dotenv_line("  B = \"two words\" "),
            Some(("B", "two words"))
        );
        assert_eq!(parse_dotenv_line("C='x'"), Some(("C", "x")));
    }

    #[test]
    fn test_parse_dotenv_line_comments() {
        assert_eq!(parse_dotenv_line("# comment"), None);
        assert_eq!(parse_dotenv_line(""), None);
        assert_eq!(
            parse_dotenv_line("D=value # trailing"),
            Some(("D", "value"))
        );
        assert_eq!(parse_dotenv_line("=orphan"), None);
        assert_eq!(parse_dotenv_line("no_equals_sign"), None);
    }

    #[test]
    fn test_load_dotenv_from_dir_does_not_override() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(
            tmp.path().join(".env"),
            "VENVCALL_TEST_DOTENV_NEW=from_file\nVENVCALL_TEST_DOTENV_SET=from_file\n",
        )
        .unwrap();
        env::set_var("VENVCALL_TEST_DOTENV_SET", "from_env");

        load_dotenv_from_dir(tmp.path());

        assert_eq!(env::var("VENVCALL_TEST_DOTENV_NEW").unwrap(), "from_file");
        assert_eq!(env::var("VENVCALL_TEST_DOTENV_SET").unwrap(), "from_env");
    }

    #[test]
    fn test_env_helpers_alias_chain() {
        env::set_var("VENVCALL_TEST_ALIAS_B", "  aliased ");
        assert_eq!(
            env_optional("VENVCALL_TEST_ALIAS_A", &["VENVCALL_TEST_ALIAS_B"]).as_deref(),
            Some("aliased")
        );
        let fallback = env_or("VENVCALL_TEST_ALIAS_MISSING", &[], || "fallback".into());
        assert_eq!(fallback, "fallback");
    }

    #[test]
    fn test_env_bool() {
        env::set_var("VENVCALL_TEST_BOOL_OFF", "off");
        env::set_var("VENVCALL_TEST_BOOL_ON", "yes");
        assert!(!env_bool("VENVCALL_TEST_BOOL_OFF", &[], true));
        assert!(env_bool("VENVCALL_TEST_BOOL_ON", &[], false));
        assert!(env_bool("VENVCALL_TEST_BOOL_UNSET", &[], true));
    }
}

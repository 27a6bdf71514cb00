//! Environment variable interpolation for configuration

use super::error::ConfigError;
use super::schema::GatewayConfig;
use super::secrets::SecretString;
use regex::Regex;
use std::env;
use std::sync::LazyLock;

static ENV_VAR_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").expect("static pattern compiles")
});

/// Interpolate `${VAR}` references in a configuration string.
///
/// References inside YAML comments are skipped so optional variables can be
/// documented without being required.
pub fn interpolate_env_vars(content: &str) -> Result<String, ConfigError> {
    let mut lines = Vec::new();
    for line in content.lines() {
        let (body, comment) = split_comment(line);
        let mut interpolated = interpolate_single_value(body)?;
        interpolated.push_str(comment);
        lines.push(interpolated);
    }

    let mut result = lines.join("\n");
    if content.ends_with('\n') {
        result.push('\n');
    }
    Ok(result)
}

/// Interpolate fields that may still carry placeholders after parsing
pub fn interpolate_config_env_vars(config: &mut GatewayConfig) -> Result<(), ConfigError> {
    for backend in &mut config.backends {
        interpolate_secret(&mut backend.api_key)?;
        interpolate_secret(&mut backend.secret_access_key)?;
        interpolate_secret(&mut backend.session_token)?;

        if let Some(base_url) = &mut backend.base_url {
            *base_url = interpolate_single_value(base_url)?;
        }
        if let Some(key_id) = &mut backend.access_key_id {
            *key_id = interpolate_single_value(key_id)?;
        }
        if let Some(region) = &mut backend.region {
            *region = interpolate_single_value(region)?;
        }
    }

    Ok(())
}

fn interpolate_secret(secret: &mut Option<SecretString>) -> Result<(), ConfigError> {
    if let Some(value) = secret {
        if ENV_VAR_PATTERN.is_match(value.expose_secret()) {
            *value = SecretString::new(interpolate_single_value(value.expose_secret())?);
        }
    }
    Ok(())
}

/// Interpolate every variable reference in a single value
fn interpolate_single_value(value: &str) -> Result<String, ConfigError> {
    let mut result = String::with_capacity(value.len());
    let mut last = 0;

    for cap in ENV_VAR_PATTERN.captures_iter(value) {
        let Some(full) = cap.get(0) else { continue };
        let var_name = &cap[1];
        let env_value = env::var(var_name).map_err(|_| ConfigError::EnvVarNotFound {
            var: var_name.to_string(),
        })?;

        result.push_str(&value[last..full.start()]);
        result.push_str(&env_value);
        last = full.end();
    }

    result.push_str(&value[last..]);
    Ok(result)
}

/// Split off a trailing ` # comment`, ignoring `#` inside quotes
fn split_comment(line: &str) -> (&str, &str) {
    let mut in_single = false;
    let mut in_double = false;
    let mut prev = ' ';

    for (i, c) in line.char_indices() {
        match c {
            '\'' if !in_double => in_single = !in_single,
            '"' if !in_single => in_double = !in_double,
            '#' if !in_single && !in_double && prev.is_whitespace() => {
                return line.split_at(i);
            }
            _ => {}
        }
        prev = c;
    }

    (line, "")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interpolate_env_vars() {
        env::set_var("RELAY_TEST_VAR", "test_value");

        let content = "api_key: ${RELAY_TEST_VAR}";
        let result = interpolate_env_vars(content).unwrap();
        assert_eq!(result, "api_key: test_value");

        env::remove_var("RELAY_TEST_VAR");
    }

    #[test]
    fn test_missing_env_var() {
        let content = "api_key: ${RELAY_MISSING_VAR}";
        let result = interpolate_env_vars(content);

        if let Err(ConfigError::EnvVarNotFound { var }) = result {
            assert_eq!(var, "RELAY_MISSING_VAR");
        } else {
            panic!("Expected EnvVarNotFound error");
        }
    }

    #[test]
    fn test_multiple_env_vars() {
        env::set_var("RELAY_VAR1", "value1");
        env::set_var("RELAY_VAR2", "value2");

        let content = "key1: ${RELAY_VAR1}, key2: ${RELAY_VAR2}\n";
        let result = interpolate_env_vars(content).unwrap();
        assert_eq!(result, "key1: value1, key2: value2\n");

        env::remove_var("RELAY_VAR1");
        env::remove_var("RELAY_VAR2");
    }

    #[test]
    fn test_comments_are_not_interpolated() {
        let content = "region: us-west-2 # or ${RELAY_UNSET_REGION}";
        let result = interpolate_env_vars(content).unwrap();
        assert_eq!(result, content);
    }

    #[test]
    fn test_hash_inside_quotes_is_kept() {
        assert_eq!(split_comment("key: \"a # b\""), ("key: \"a # b\"", ""));
        assert_eq!(split_comment("key: v # c"), ("key: v ", "# c"));
    }
}

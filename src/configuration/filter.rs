//! Validation and shell embedding of operator supplied capture parameters.

use crate::error_handling::types::ConfigError;

/// Characters never accepted in a capture filter.
pub const FILTER_DENYLIST: [char; 6] = ['\\', ';', '"', '`', '-', '$'];

/// Characters never accepted in an interface name.
const INTERFACE_DENYLIST: [char; 6] = [' ', '\t', '"', '/', '$', '`'];

/// Expression matching IPv4 fragments (non-zero offset or more-fragments flag).
pub const FRAGMENT_EXPRESSION: &str = "( ip[6:2] & 0x3fff != 0x0000 )";

pub fn validate_filter(filter: &str) -> Result<(), ConfigError> {
    match filter.chars().find(|c| FILTER_DENYLIST.contains(c)) {
        Some(c) => Err(ConfigError::ForbiddenFilterCharacter(c)),
        None => Ok(()),
    }
}

/// Widens `filter` so fragmented IPv4 packets are captured as well.
pub fn with_fragments(filter: &str) -> String {
    if filter.trim().is_empty() {
        return FRAGMENT_EXPRESSION.to_string();
    }
    format!("({}) or {}", filter, FRAGMENT_EXPRESSION)
}

pub fn validate_interface(interface: &str) -> Result<(), ConfigError> {
    if interface.is_empty() {
        return Err(ConfigError::BadInterface(
            "Interface name cannot be empty".to_string(),
        ));
    }
    if interface.chars().any(|c| INTERFACE_DENYLIST.contains(&c)) {
        return Err(ConfigError::BadInterface(format!(
            "'{}': interface cannot have white spaces, slashes, dollar signs, backtick or double quotes",
            interface
        )));
    }
    Ok(())
}

/// Quotes `value` as a single word for a POSIX shell.
pub fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

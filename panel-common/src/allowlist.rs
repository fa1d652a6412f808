//! IP allowlist types and input grammar.

use serde::{Deserialize, Serialize};

/// Address that admits connections from anywhere.
pub const ALLOW_ANY: &str = "0.0.0.0";

/// Allowlists for the two network surfaces the backend guards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllowlistConfig {
    /// Who may reach the control panel itself. Changes apply immediately.
    pub control_panel: String,
    /// Who may reach the inference server. Changes apply on next restart.
    pub llm_server: String,
}

impl Default for AllowlistConfig {
    fn default() -> Self {
        Self {
            control_panel: ALLOW_ANY.to_string(),
            llm_server: ALLOW_ANY.to_string(),
        }
    }
}

impl AllowlistConfig {
    pub fn get(&self, field: AllowlistField) -> &str {
        match field {
            AllowlistField::ControlPanel => &self.control_panel,
            AllowlistField::LlmServer => &self.llm_server,
        }
    }

    pub fn set(&mut self, field: AllowlistField, value: String) {
        match field {
            AllowlistField::ControlPanel => self.control_panel = value,
            AllowlistField::LlmServer => self.llm_server = value,
        }
    }

    /// Check both fields, reporting the first malformed one.
    pub fn validate(&self) -> Result<(), (AllowlistField, AllowlistFormatError)> {
        for field in AllowlistField::ALL {
            validate_allowlist(self.get(field)).map_err(|e| (field, e))?;
        }
        Ok(())
    }
}

/// One of the two allowlist surfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllowlistField {
    ControlPanel,
    LlmServer,
}

impl AllowlistField {
    pub const ALL: [AllowlistField; 2] = [AllowlistField::ControlPanel, AllowlistField::LlmServer];
}

impl std::fmt::Display for AllowlistField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AllowlistField::ControlPanel => write!(f, "control_panel_allowlist"),
            AllowlistField::LlmServer => write!(f, "llm_server_allowlist"),
        }
    }
}

/// Why an allowlist string was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AllowlistFormatError {
    #[error("allowlist is empty")]
    Empty,
    #[error("invalid address '{0}': expected four dot-separated groups of 1-3 digits")]
    InvalidAddress(String),
}

/// Validate a comma-separated list of dotted-quad addresses.
///
/// Grammar: `ADDR (',' WS* ADDR)*` where `ADDR` is four dot-separated groups
/// of one to three ASCII digits. Group values are not range-checked, so
/// `999.999.999.999` is accepted; the backend does the numeric check.
pub fn validate_allowlist(value: &str) -> Result<(), AllowlistFormatError> {
    if value.is_empty() {
        return Err(AllowlistFormatError::Empty);
    }

    for (i, entry) in value.split(',').enumerate() {
        // Whitespace is only tolerated right after a comma.
        let address = if i == 0 {
            entry
        } else {
            entry.trim_start_matches(char::is_whitespace)
        };
        validate_address(address)?;
    }

    Ok(())
}

fn validate_address(address: &str) -> Result<(), AllowlistFormatError> {
    let groups: Vec<&str> = address.split('.').collect();
    let well_formed = groups.len() == 4
        && groups
            .iter()
            .all(|g| (1..=3).contains(&g.len()) && g.bytes().all(|b| b.is_ascii_digit()));

    if well_formed {
        Ok(())
    } else {
        Err(AllowlistFormatError::InvalidAddress(address.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_any_address() {
        assert!(validate_allowlist("0.0.0.0").is_ok());
    }

    #[test]
    fn test_accepts_list_with_space_after_comma() {
        assert!(validate_allowlist("10.0.0.1, 10.0.0.2").is_ok());
        assert!(validate_allowlist("10.0.0.1,10.0.0.2,\t192.168.1.1").is_ok());
    }

    #[test]
    fn test_rejects_short_address() {
        assert_eq!(
            validate_allowlist("10.0.0"),
            Err(AllowlistFormatError::InvalidAddress("10.0.0".to_string()))
        );
    }

    #[test]
    fn test_rejects_empty() {
        assert_eq!(validate_allowlist(""), Err(AllowlistFormatError::Empty));
    }

    #[test]
    fn test_digit_count_only_no_range_check() {
        assert!(validate_allowlist("999.1.1.1").is_ok());
        assert!(validate_allowlist("999.999.999.999").is_ok());
    }

    #[test]
    fn test_rejects_misplaced_whitespace() {
        assert!(validate_allowlist(" 10.0.0.1").is_err());
        assert!(validate_allowlist("10.0.0.1 ").is_err());
        assert!(validate_allowlist("10.0.0.1 ,10.0.0.2").is_err());
    }

    #[test]
    fn test_rejects_malformed_groups() {
        assert!(validate_allowlist("1234.0.0.1").is_err());
        assert!(validate_allowlist("10..0.1").is_err());
        assert!(validate_allowlist("a.b.c.d").is_err());
        assert!(validate_allowlist("10.0.0.1.5").is_err());
        assert!(validate_allowlist("10.0.0.1,").is_err());
    }

    #[test]
    fn test_config_validate_reports_field() {
        let config = AllowlistConfig {
            control_panel: "0.0.0.0".to_string(),
            llm_server: "10.0.0".to_string(),
        };
        let (field, _) = config.validate().unwrap_err();
        assert_eq!(field, AllowlistField::LlmServer);
    }
}

//! Validation helpers for DTOs.

use validator::ValidationError;

use crate::state::game::OPTION_LABELS;

/// Validates that an option label names one of the four answer slots (`A`-`D`).
///
/// # Examples
///
/// ```ignore
/// validate_option_label("A") // Ok
/// validate_option_label("d") // Ok - case insensitive
/// validate_option_label("E") // Err - no such slot
/// ```
pub fn validate_option_label(label: &str) -> Result<(), ValidationError> {
    let normalized = label.trim().to_ascii_uppercase();
    if !OPTION_LABELS.contains(&normalized.as_str()) {
        let mut err = ValidationError::new("option_label");
        err.message = Some(format!("option label must be one of {OPTION_LABELS:?}").into());
        return Err(err);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_option_label_valid() {
        assert!(validate_option_label("A").is_ok());
        assert!(validate_option_label("d").is_ok());
        assert!(validate_option_label(" b ").is_ok());
    }

    #[test]
    fn test_validate_option_label_invalid() {
        assert!(validate_option_label("E").is_err());
        assert!(validate_option_label("").is_err());
        assert!(validate_option_label("AB").is_err());
        assert!(validate_option_label("1").is_err());
    }
}

//! Validation helpers for DTOs.

use validator::ValidationError;

/// Longest comment kept with a rating, counted after trimming.
pub const MAX_COMMENT_CHARS: usize = 500;

/// Rejects strings made only of whitespace.
pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("must not be blank".into());
        return Err(err);
    }
    Ok(())
}

/// Rejects comments longer than [`MAX_COMMENT_CHARS`] once trimmed.
pub fn validate_comment(value: &str) -> Result<(), ValidationError> {
    if value.trim().chars().count() > MAX_COMMENT_CHARS {
        let mut err = ValidationError::new("length");
        err.message = Some(format!("must be at most {MAX_COMMENT_CHARS} characters").into());
        return Err(err);
    }
    Ok(())
}

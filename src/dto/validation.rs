//! Validation helpers for request payloads.

use validator::ValidationError;

/// Validates that a guess field is exactly one letter `A..=Z` (or `a..=z`,
/// which callers fold to uppercase).
///
/// # Examples
///
/// ```ignore
/// validate_guess_letter("A")  // Ok
/// validate_guess_letter("q")  // Ok - folded later
/// validate_guess_letter("AB") // Err - too long
/// validate_guess_letter("4")  // Err - not a letter
/// ```
pub fn validate_guess_letter(value: &str) -> Result<(), ValidationError> {
    let mut chars = value.chars();
    let (first, rest) = (chars.next(), chars.next());

    if rest.is_some() || first.is_none() {
        let mut err = ValidationError::new("guess_letter_length");
        err.message = Some(
            format!(
                "Guess must be exactly one character (got {})",
                value.chars().count()
            )
            .into(),
        );
        return Err(err);
    }

    match first {
        Some(c) if c.is_ascii_alphabetic() => Ok(()),
        _ => {
            let mut err = ValidationError::new("guess_letter_format");
            err.message = Some("Guess must be a letter between A and Z".into());
            Err(err)
        }
    }
}

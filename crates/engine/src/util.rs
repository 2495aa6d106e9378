//! Internal helpers for model validation and normalization.
//!
//! These utilities centralize validation and mapping logic so the engine
//! enforces consistent invariants.

use unicode_normalization::UnicodeNormalization;

use crate::{EngineError, ResultEngine};

/// Canonical matching key for a category name: NFKC, lowercased, single
/// spaces. Both budget categories and transactions store this next to the
/// display form so matching never depends on user spelling.
#[must_use]
pub fn normalize_category_key(value: &str) -> String {
    let folded: String = value.nfkc().collect::<String>().to_lowercase();
    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Display form of a category: trimmed, internal whitespace collapsed,
/// original casing kept.
#[must_use]
pub fn normalize_category_display(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Validate a required display name (budget name, category name).
pub(crate) fn normalize_required_name(value: &str, label: &str) -> ResultEngine<String> {
    let trimmed = normalize_category_display(value);
    if trimmed.is_empty() {
        return Err(EngineError::Validation(format!(
            "{label} name must not be empty"
        )));
    }
    Ok(trimmed)
}

/// Validate a chat handle: 10-15 digits, nothing else.
pub(crate) fn validate_handle(handle: &str) -> ResultEngine<&str> {
    let ok = (10..=15).contains(&handle.len()) && handle.bytes().all(|b| b.is_ascii_digit());
    if !ok {
        return Err(EngineError::Validation(format!(
            "invalid chat handle: {handle}"
        )));
    }
    Ok(handle)
}

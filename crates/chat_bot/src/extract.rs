//! Entity extraction from classifier output.
//!
//! Pure functions with explicit `Result` contracts so the parsing rules are
//! unit-testable independently of any classifier.

use std::collections::HashMap;

use engine::Money;

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum ExtractError {
    #[error("no amount entity")]
    MissingAmount,
    #[error("amount is not numeric: {0}")]
    InvalidAmount(String),
}

/// Pulls the transaction amount out of the extracted entities.
///
/// Currency symbols and digit-group separators are stripped by the `Money`
/// parser; anything non-numeric or non-positive fails closed.
pub fn extract_amount(entities: &HashMap<String, String>) -> Result<Money, ExtractError> {
    let raw = entities
        .get("amount")
        .ok_or(ExtractError::MissingAmount)?;
    let amount = raw
        .parse::<Money>()
        .map_err(|_| ExtractError::InvalidAmount(raw.clone()))?;
    if amount.minor() <= 0 {
        return Err(ExtractError::InvalidAmount(raw.clone()));
    }
    Ok(amount)
}

/// Category for a transaction: an explicit `category` entity wins, the
/// purchased `item` is the fallback. `None` means uncategorized.
#[must_use]
pub fn extract_category(entities: &HashMap<String, String>) -> Option<String> {
    entities
        .get("category")
        .or_else(|| entities.get("item"))
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entities(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn amount_accepts_separators_and_symbol() {
        let found = entities(&[("amount", "Rp 1.550.000")]);
        assert_eq!(extract_amount(&found).unwrap().minor(), 1_550_000);
    }

    #[test]
    fn amount_fails_closed_on_garbage() {
        let missing = entities(&[]);
        assert_eq!(extract_amount(&missing), Err(ExtractError::MissingAmount));

        let garbage = entities(&[("amount", "banyak")]);
        assert!(matches!(
            extract_amount(&garbage),
            Err(ExtractError::InvalidAmount(_))
        ));

        let zero = entities(&[("amount", "0")]);
        assert!(matches!(
            extract_amount(&zero),
            Err(ExtractError::InvalidAmount(_))
        ));
    }

    #[test]
    fn category_prefers_explicit_entity_over_item() {
        let both = entities(&[("category", "food"), ("item", "nasi goreng")]);
        assert_eq!(extract_category(&both).as_deref(), Some("food"));

        let item_only = entities(&[("item", "nasi goreng")]);
        assert_eq!(extract_category(&item_only).as_deref(), Some("nasi goreng"));

        assert_eq!(extract_category(&entities(&[])), None);
    }
}

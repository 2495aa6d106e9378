//! Intent classification.
//!
//! The classifier contract mirrors what an NLP engine offers: free text in,
//! a best-guess intent with a confidence score and extracted entities out.
//! The built-in [`PatternClassifier`] matches token patterns with
//! `{amount}`/`{item}`/`{category}` slots; model training is out of scope.

use std::collections::HashMap;

use async_trait::async_trait;
use engine::{CustomPhrase, Language, Money};

/// A classified user goal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Intent {
    TransactionIncome,
    TransactionExpense,
    BudgetSet,
    BudgetView,
    BudgetRemaining,
    ReportDaily,
    ReportWeekly,
    ReportMonthly,
}

impl Intent {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TransactionIncome => "transaction.income",
            Self::TransactionExpense => "transaction.expense",
            Self::BudgetSet => "budget.set",
            Self::BudgetView => "budget.view",
            Self::BudgetRemaining => "budget.remaining",
            Self::ReportDaily => "report.daily",
            Self::ReportWeekly => "report.weekly",
            Self::ReportMonthly => "report.monthly",
        }
    }

    /// Parses the dotted label used by custom phrases and the wire surface.
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "transaction.income" => Some(Self::TransactionIncome),
            "transaction.expense" => Some(Self::TransactionExpense),
            "budget.set" => Some(Self::BudgetSet),
            "budget.view" => Some(Self::BudgetView),
            "budget.remaining" => Some(Self::BudgetRemaining),
            "report.daily" => Some(Self::ReportDaily),
            "report.weekly" => Some(Self::ReportWeekly),
            "report.monthly" => Some(Self::ReportMonthly),
            _ => None,
        }
    }
}

/// Classification result: intent, confidence in 0.0-1.0, extracted
/// entities keyed `amount`/`item`/`category`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Classification {
    pub intent: Option<Intent>,
    pub confidence: f64,
    pub entities: HashMap<String, String>,
}

/// Capability contract of the NLP engine.
#[async_trait]
pub trait IntentClassifier: Send + Sync {
    async fn classify(&self, language: Language, text: &str) -> Classification;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Token {
    Lit(&'static str),
    Amount,
    Item,
    Category,
}

struct Pattern {
    language: Language,
    tokens: &'static [Token],
    intent: Intent,
}

use Token::{Amount, Category, Item, Lit};

/// Built-in phrase patterns, transcribed from the production chat corpus.
static PATTERNS: &[Pattern] = &[
    // Indonesian
    Pattern { language: Language::Id, tokens: &[Lit("terima"), Lit("gaji"), Amount], intent: Intent::TransactionIncome },
    Pattern { language: Language::Id, tokens: &[Lit("dapat"), Lit("uang"), Amount], intent: Intent::TransactionIncome },
    Pattern { language: Language::Id, tokens: &[Lit("masuk"), Amount], intent: Intent::TransactionIncome },
    Pattern { language: Language::Id, tokens: &[Lit("bayar"), Item, Amount], intent: Intent::TransactionExpense },
    Pattern { language: Language::Id, tokens: &[Lit("bayar"), Amount], intent: Intent::TransactionExpense },
    Pattern { language: Language::Id, tokens: &[Lit("beli"), Item, Amount], intent: Intent::TransactionExpense },
    Pattern { language: Language::Id, tokens: &[Lit("keluar"), Amount], intent: Intent::TransactionExpense },
    Pattern { language: Language::Id, tokens: &[Lit("atur"), Lit("budget"), Category, Amount], intent: Intent::BudgetSet },
    Pattern { language: Language::Id, tokens: &[Lit("set"), Lit("budget"), Category, Amount], intent: Intent::BudgetSet },
    Pattern { language: Language::Id, tokens: &[Lit("lihat"), Lit("budget")], intent: Intent::BudgetView },
    Pattern { language: Language::Id, tokens: &[Lit("sisa"), Lit("budget")], intent: Intent::BudgetRemaining },
    Pattern { language: Language::Id, tokens: &[Lit("laporan"), Lit("harian")], intent: Intent::ReportDaily },
    Pattern { language: Language::Id, tokens: &[Lit("laporan"), Lit("mingguan")], intent: Intent::ReportWeekly },
    Pattern { language: Language::Id, tokens: &[Lit("laporan"), Lit("bulanan")], intent: Intent::ReportMonthly },
    // English
    Pattern { language: Language::En, tokens: &[Lit("received"), Lit("salary"), Amount], intent: Intent::TransactionIncome },
    Pattern { language: Language::En, tokens: &[Lit("income"), Amount], intent: Intent::TransactionIncome },
    Pattern { language: Language::En, tokens: &[Lit("got"), Amount], intent: Intent::TransactionIncome },
    Pattern { language: Language::En, tokens: &[Lit("pay"), Item, Amount], intent: Intent::TransactionExpense },
    Pattern { language: Language::En, tokens: &[Lit("pay"), Amount], intent: Intent::TransactionExpense },
    Pattern { language: Language::En, tokens: &[Lit("buy"), Item, Amount], intent: Intent::TransactionExpense },
    Pattern { language: Language::En, tokens: &[Lit("spent"), Amount, Lit("on"), Item], intent: Intent::TransactionExpense },
    Pattern { language: Language::En, tokens: &[Lit("set"), Lit("budget"), Category, Amount], intent: Intent::BudgetSet },
    Pattern { language: Language::En, tokens: &[Lit("show"), Lit("budget")], intent: Intent::BudgetView },
    Pattern { language: Language::En, tokens: &[Lit("remaining"), Lit("budget")], intent: Intent::BudgetRemaining },
    Pattern { language: Language::En, tokens: &[Lit("daily"), Lit("report")], intent: Intent::ReportDaily },
    Pattern { language: Language::En, tokens: &[Lit("weekly"), Lit("report")], intent: Intent::ReportWeekly },
    Pattern { language: Language::En, tokens: &[Lit("monthly"), Lit("report")], intent: Intent::ReportMonthly },
];

fn looks_like_amount(token: &str) -> bool {
    token
        .parse::<Money>()
        .is_ok_and(|amount| amount.minor() > 0)
}

/// Tries to match `tokens` (pattern) against `input` starting at the given
/// positions. Slots capture one or more tokens, stopping as soon as the rest
/// of the pattern matches, so "beli makan siang 50000" binds
/// item="makan siang".
fn match_from(
    tokens: &[Token],
    input: &[&str],
    entities: &mut HashMap<String, String>,
) -> Option<usize> {
    let Some((first, rest)) = tokens.split_first() else {
        return Some(0);
    };

    match first {
        Lit(word) => {
            let token = input.first()?;
            if !token.eq_ignore_ascii_case(word) {
                return None;
            }
            match_from(rest, &input[1..], entities).map(|n| n + 1)
        }
        Amount => {
            let token = input.first()?;
            if !looks_like_amount(token) {
                return None;
            }
            let consumed = match_from(rest, &input[1..], entities)?;
            entities.insert("amount".to_string(), (*token).to_string());
            Some(consumed + 1)
        }
        Item | Category => {
            let key = if *first == Item { "item" } else { "category" };
            // Greedily shortest capture: extend the slot until the tail
            // matches.
            for take in 1..=input.len() {
                // An amount token ends the slot; it belongs to an Amount
                // further right.
                if looks_like_amount(input[take - 1]) {
                    return None;
                }
                if let Some(consumed) = match_from(rest, &input[take..], entities) {
                    entities.insert(key.to_string(), input[..take].join(" "));
                    return Some(consumed + take);
                }
            }
            None
        }
    }
}

/// Rule-based classifier over the built-in pattern table.
#[derive(Debug, Default)]
pub struct PatternClassifier;

impl PatternClassifier {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl IntentClassifier for PatternClassifier {
    async fn classify(&self, language: Language, text: &str) -> Classification {
        let input: Vec<&str> = text.split_whitespace().collect();
        if input.is_empty() {
            return Classification::default();
        }

        let mut best = Classification::default();
        for pattern in PATTERNS.iter().filter(|p| p.language == language) {
            let mut entities = HashMap::new();
            let Some(consumed) = match_from(pattern.tokens, &input, &mut entities) else {
                continue;
            };
            // Unmatched trailing chatter lowers confidence.
            let confidence = consumed as f64 / input.len() as f64;
            if confidence > best.confidence {
                best = Classification {
                    intent: Some(pattern.intent),
                    confidence,
                    entities,
                };
            }
        }
        best
    }
}

/// Matches a session's custom phrases against the text. A custom phrase is
/// an exact prefix match on normalized tokens and scores full confidence;
/// one trailing amount-looking token is captured when present.
#[must_use]
pub fn match_custom_phrases(phrases: &[CustomPhrase], text: &str) -> Option<Classification> {
    let input: Vec<&str> = text.split_whitespace().collect();

    for custom in phrases {
        let Some(intent) = Intent::from_label(custom.intent.trim()) else {
            continue;
        };
        let phrase: Vec<&str> = custom.phrase.split_whitespace().collect();
        if phrase.is_empty() || input.len() < phrase.len() {
            continue;
        }
        let matches = phrase
            .iter()
            .zip(&input)
            .all(|(a, b)| a.eq_ignore_ascii_case(b));
        if !matches {
            continue;
        }

        let mut entities = HashMap::new();
        if let Some(amount) = input[phrase.len()..].iter().find(|t| looks_like_amount(t)) {
            entities.insert("amount".to_string(), (*amount).to_string());
        }
        return Some(Classification {
            intent: Some(intent),
            confidence: 1.0,
            entities,
        });
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn classify(language: Language, text: &str) -> Classification {
        PatternClassifier::new().classify(language, text).await
    }

    #[tokio::test]
    async fn classifies_expense_with_item_and_amount() {
        let result = classify(Language::Id, "beli makan 50000").await;
        assert_eq!(result.intent, Some(Intent::TransactionExpense));
        assert!((result.confidence - 1.0).abs() < f64::EPSILON);
        assert_eq!(result.entities["item"], "makan");
        assert_eq!(result.entities["amount"], "50000");
    }

    #[tokio::test]
    async fn item_slot_spans_multiple_tokens() {
        let result = classify(Language::Id, "beli makan siang 50000").await;
        assert_eq!(result.intent, Some(Intent::TransactionExpense));
        assert_eq!(result.entities["item"], "makan siang");
        assert_eq!(result.entities["amount"], "50000");
    }

    #[tokio::test]
    async fn classifies_income() {
        let result = classify(Language::Id, "terima gaji 4.000.000").await;
        assert_eq!(result.intent, Some(Intent::TransactionIncome));
        assert_eq!(result.entities["amount"], "4.000.000");
    }

    #[tokio::test]
    async fn classifies_budget_set_with_category() {
        let result = classify(Language::Id, "atur budget makan 2000000").await;
        assert_eq!(result.intent, Some(Intent::BudgetSet));
        assert_eq!(result.entities["category"], "makan");
        assert_eq!(result.entities["amount"], "2000000");
    }

    #[tokio::test]
    async fn classifies_reports_per_language() {
        let result = classify(Language::Id, "laporan mingguan").await;
        assert_eq!(result.intent, Some(Intent::ReportWeekly));

        let result = classify(Language::En, "monthly report").await;
        assert_eq!(result.intent, Some(Intent::ReportMonthly));
    }

    #[tokio::test]
    async fn english_spent_on_pattern() {
        let result = classify(Language::En, "spent 25000 on coffee").await;
        assert_eq!(result.intent, Some(Intent::TransactionExpense));
        assert_eq!(result.entities["amount"], "25000");
        assert_eq!(result.entities["item"], "coffee");
    }

    #[tokio::test]
    async fn trailing_chatter_lowers_confidence() {
        let clean = classify(Language::Id, "keluar 20000").await;
        let noisy = classify(Language::Id, "keluar 20000 buat parkir tadi siang").await;
        assert_eq!(noisy.intent, Some(Intent::TransactionExpense));
        assert!(noisy.confidence < clean.confidence);
    }

    #[tokio::test]
    async fn gibberish_has_no_intent() {
        let result = classify(Language::Id, "halo apa kabar").await;
        assert_eq!(result.intent, None);
        assert!(result.confidence < f64::EPSILON);
    }

    #[test]
    fn custom_phrase_overrides() {
        let phrases = vec![CustomPhrase {
            phrase: "jajan".to_string(),
            intent: "transaction.expense".to_string(),
            examples: Vec::new(),
        }];
        let result = match_custom_phrases(&phrases, "jajan 5000").unwrap();
        assert_eq!(result.intent, Some(Intent::TransactionExpense));
        assert!((result.confidence - 1.0).abs() < f64::EPSILON);
        assert_eq!(result.entities["amount"], "5000");

        assert!(match_custom_phrases(&phrases, "beli jajan").is_none());
    }
}

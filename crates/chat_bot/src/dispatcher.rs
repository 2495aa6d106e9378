//! Intent dispatch: free text in, reply text and triggered alerts out.
//!
//! Classification and extraction failures are recovered locally into
//! user-facing fallback replies; only ledger/storage failures surface as
//! errors, and the session worker turns those into an error-log entry plus
//! a fallback reply. Nothing in here may panic the session.

use engine::{Engine, NewTransaction, Session, TransactionKind, TransactionSource};

use crate::{
    BotError,
    classifier::{Intent, IntentClassifier, match_custom_phrases},
    extract::{extract_amount, extract_category},
    replies,
};

/// Reserved command prefix; such messages are a silent no-op.
pub const COMMAND_PREFIX: char = '!';

/// What a handled message produced.
#[derive(Clone, Debug, Default)]
pub struct DispatchOutcome {
    pub reply: Option<String>,
    pub alerts: Vec<engine::BudgetAlert>,
}

impl DispatchOutcome {
    fn reply(text: String) -> Self {
        Self {
            reply: Some(text),
            alerts: Vec::new(),
        }
    }

    fn silent() -> Self {
        Self::default()
    }
}

pub(crate) async fn handle(
    engine: &Engine,
    classifier: &dyn IntentClassifier,
    session: &Session,
    text: &str,
) -> Result<DispatchOutcome, BotError> {
    let text = text.trim();
    if text.is_empty() || text.starts_with(COMMAND_PREFIX) {
        return Ok(DispatchOutcome::silent());
    }

    let language = session.settings.language;

    if !session.nlp.enabled {
        // Classification is off: acknowledge with the auto-reply when the
        // user configured one, otherwise admit we did not understand.
        let reply = if session.settings.auto_reply_enabled {
            session.settings.auto_reply_text.clone()
        } else {
            replies::not_understood(language)
        };
        return Ok(DispatchOutcome::reply(reply));
    }

    let phrases = engine.custom_phrases(session.id).await?;
    let classification = match match_custom_phrases(&phrases, text) {
        Some(custom) => custom,
        None => classifier.classify(language, text).await,
    };

    let Some(intent) = classification.intent else {
        return Ok(DispatchOutcome::reply(replies::not_understood(language)));
    };
    if classification.confidence < session.nlp.confidence {
        tracing::debug!(
            intent = intent.as_str(),
            confidence = classification.confidence,
            threshold = session.nlp.confidence,
            "classification below session threshold"
        );
        return Ok(DispatchOutcome::reply(replies::not_understood(language)));
    }

    match intent {
        Intent::TransactionIncome | Intent::TransactionExpense => {
            let kind = if intent == Intent::TransactionIncome {
                TransactionKind::Income
            } else {
                TransactionKind::Expense
            };
            let amount = match extract_amount(&classification.entities) {
                Ok(amount) => amount,
                Err(err) => {
                    tracing::debug!("amount extraction failed: {err}");
                    return Ok(DispatchOutcome::reply(replies::amount_not_parsed(language)));
                }
            };

            let mut cmd = NewTransaction::new(session.user_id, kind, amount)
                .description(text)
                .source(TransactionSource::Chat)
                .chat_handle(session.handle.clone());
            if let Some(category) = extract_category(&classification.entities) {
                cmd = cmd.category(category);
            }

            let (tx, alerts) = engine.create_transaction(cmd).await?;
            Ok(DispatchOutcome {
                reply: Some(replies::transaction_recorded(
                    language,
                    kind,
                    tx.amount,
                    &tx.category,
                )),
                alerts,
            })
        }
        Intent::BudgetSet => {
            let limit = match extract_amount(&classification.entities) {
                Ok(limit) => limit,
                Err(_) => {
                    return Ok(DispatchOutcome::reply(replies::amount_not_parsed(language)));
                }
            };
            let Some(category) = extract_category(&classification.entities) else {
                return Ok(DispatchOutcome::reply(replies::not_understood(language)));
            };

            match engine
                .upsert_category_limit(session.user_id, &category, limit)
                .await
            {
                Ok(_) => Ok(DispatchOutcome::reply(replies::budget_limit_set(
                    language, &category, limit,
                ))),
                Err(engine::EngineError::KeyNotFound(_)) => {
                    Ok(DispatchOutcome::reply(replies::no_active_budget(language)))
                }
                Err(err) => Err(err.into()),
            }
        }
        Intent::BudgetView | Intent::BudgetRemaining => {
            let summaries = engine.budget_summaries(session.user_id).await?;
            Ok(DispatchOutcome::reply(replies::budget_overview(
                language,
                &summaries,
                intent == Intent::BudgetRemaining,
            )))
        }
        Intent::ReportDaily | Intent::ReportWeekly | Intent::ReportMonthly => {
            let period = match intent {
                Intent::ReportDaily => engine::ReportPeriod::Daily,
                Intent::ReportWeekly => engine::ReportPeriod::Weekly,
                _ => engine::ReportPeriod::Monthly,
            };
            let report = engine
                .report(
                    session.user_id,
                    period,
                    &session.settings.timezone,
                    chrono::Utc::now(),
                )
                .await?;
            Ok(DispatchOutcome::reply(replies::report(language, &report)))
        }
    }
}

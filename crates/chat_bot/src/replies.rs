//! Localized reply rendering.
//!
//! Plain string builders; the transport is responsible for any markup.

use engine::{
    BudgetAlert, BudgetSummary, Language, Money, Report, ReportPeriod, TransactionKind,
};

pub(crate) fn not_understood(language: Language) -> String {
    match language {
        Language::Id => {
            "Maaf, saya tidak mengerti pesan Anda. Silakan coba lagi dengan format yang benar."
                .to_string()
        }
        Language::En => {
            "Sorry, I did not understand that. Please try again with a supported phrase."
                .to_string()
        }
    }
}

pub(crate) fn processing_failed(language: Language) -> String {
    match language {
        Language::Id => "Maaf, terjadi kesalahan dalam memproses pesan Anda.".to_string(),
        Language::En => "Sorry, something went wrong while processing your message.".to_string(),
    }
}

pub(crate) fn amount_not_parsed(language: Language) -> String {
    match language {
        Language::Id => "Maaf, saya tidak bisa membaca jumlahnya. Tulis angka seperti 50000."
            .to_string(),
        Language::En => "Sorry, I could not read the amount. Write a number like 50000.".to_string(),
    }
}

pub(crate) fn transaction_recorded(
    language: Language,
    kind: TransactionKind,
    amount: Money,
    category: &str,
) -> String {
    let signed = match kind {
        TransactionKind::Income => format!("+{amount}"),
        TransactionKind::Expense => format!("-{amount}"),
    };
    match language {
        Language::Id => {
            let label = match kind {
                TransactionKind::Income => "Pemasukan",
                TransactionKind::Expense => "Pengeluaran",
            };
            format!("✅ {label} sebesar {signed} ({category}) telah dicatat.")
        }
        Language::En => {
            let label = match kind {
                TransactionKind::Income => "Income",
                TransactionKind::Expense => "Expense",
            };
            format!("✅ {label} of {signed} ({category}) recorded.")
        }
    }
}

pub(crate) fn no_active_budget(language: Language) -> String {
    match language {
        Language::Id => "Tidak ada budget aktif saat ini. Buat budget dulu ya.".to_string(),
        Language::En => "No active budget right now. Create one first.".to_string(),
    }
}

pub(crate) fn budget_limit_set(language: Language, category: &str, limit: Money) -> String {
    match language {
        Language::Id => format!("✅ Budget {category} diatur ke {limit}."),
        Language::En => format!("✅ Budget for {category} set to {limit}."),
    }
}

pub(crate) fn budget_overview(
    language: Language,
    summaries: &[BudgetSummary],
    remaining_only: bool,
) -> String {
    if summaries.is_empty() {
        return no_active_budget(language);
    }

    let mut lines = Vec::new();
    let header = match (language, remaining_only) {
        (Language::Id, false) => "Budget aktif:",
        (Language::Id, true) => "Sisa budget:",
        (Language::En, false) => "Active budgets:",
        (Language::En, true) => "Remaining budget:",
    };
    lines.push(header.to_string());

    for summary in summaries {
        if remaining_only {
            lines.push(format!("• {}: {}", summary.name, summary.remaining));
        } else {
            lines.push(format!(
                "• {}: {} / {} ({:.1}%)",
                summary.name, summary.total_spent, summary.total_budget, summary.percent_used
            ));
        }
        for category in &summary.categories {
            if remaining_only {
                lines.push(format!("   - {}: {}", category.name, category.remaining));
            } else {
                lines.push(format!(
                    "   - {}: {} / {}",
                    category.name, category.spent, category.limit
                ));
            }
        }
    }
    lines.join("\n")
}

pub(crate) fn report(language: Language, report: &Report) -> String {
    let title = match (language, report.period) {
        (Language::Id, ReportPeriod::Daily) => "Laporan harian",
        (Language::Id, ReportPeriod::Weekly) => "Laporan mingguan",
        (Language::Id, ReportPeriod::Monthly) => "Laporan bulanan",
        (Language::En, ReportPeriod::Daily) => "Daily report",
        (Language::En, ReportPeriod::Weekly) => "Weekly report",
        (Language::En, ReportPeriod::Monthly) => "Monthly report",
    };
    let (income, expense, net) = match language {
        Language::Id => ("Pemasukan", "Pengeluaran", "Selisih"),
        Language::En => ("Income", "Expense", "Net"),
    };

    let summary = &report.summary;
    let mut lines = vec![
        title.to_string(),
        format!("{income}: {}", summary.total_income),
        format!("{expense}: {}", summary.total_expense),
        format!("{net}: {}", summary.net),
    ];
    for category in summary.categories.iter().take(5) {
        lines.push(format!("• {}: {}", category.category, category.total));
    }
    lines.join("\n")
}

pub(crate) fn alert(language: Language, alert: &BudgetAlert) -> String {
    let percent = if alert.percent_used.is_finite() {
        format!("{:.1}%", alert.percent_used)
    } else {
        match language {
            Language::Id => "melebihi batas".to_string(),
            Language::En => "over the limit".to_string(),
        }
    };
    match (language, &alert.category) {
        (Language::Id, Some(category)) => format!(
            "⚠️ Kategori {category} di budget {} sudah {percent}.",
            alert.budget_name
        ),
        (Language::Id, None) => {
            format!("⚠️ Budget {} sudah terpakai {percent}.", alert.budget_name)
        }
        (Language::En, Some(category)) => format!(
            "⚠️ Category {category} of budget {} is at {percent}.",
            alert.budget_name
        ),
        (Language::En, None) => {
            format!("⚠️ Budget {} is at {percent} used.", alert.budget_name)
        }
    }
}

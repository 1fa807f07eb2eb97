//! Chat and question-answering types.

use super::Metadata;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Speaker of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System instructions.
    System,
    /// The end user.
    User,
    /// The assistant.
    Assistant,
}

impl Role {
    /// Returns the label used when a turn is rendered into a prompt.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::System => "System",
            Self::User => "User",
            Self::Assistant => "Assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One prior message in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    /// Who said it.
    pub role: Role,
    /// What was said.
    pub content: String,
}

impl ConversationTurn {
    /// Creates a turn.
    #[must_use]
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Creates a user turn.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Creates an assistant turn.
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// Summary of a user's finances, rendered into chat prompts.
///
/// Optional lines are emitted only when their value is positive (or, for the
/// top spending category, present).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FinancialSnapshot {
    /// Assets minus liabilities.
    pub net_worth: f64,
    /// Total assets.
    pub total_assets: f64,
    /// Total liabilities.
    pub total_liabilities: f64,
    /// Income this month.
    pub monthly_income: f64,
    /// Expenses this month.
    pub monthly_expenses: f64,
    /// Income minus expenses this month.
    pub monthly_cash_flow: f64,
    /// Outstanding debt.
    pub total_debt: f64,
    /// Debt-to-income ratio in percent.
    pub debt_to_income_ratio: f64,
    /// Current value of investments.
    pub total_investments: f64,
    /// Number of active goals.
    pub active_goals: u32,
    /// Category with the highest spend this month.
    pub top_spending_category: Option<String>,
    /// Amount spent in the top category.
    pub top_spending_amount: f64,
    /// Budget adherence in percent.
    pub budget_adherence: f64,
}

impl FinancialSnapshot {
    /// Renders the financial context block.
    #[must_use]
    pub fn render(&self) -> String {
        let mut lines = vec![
            "\n=== USER'S FINANCIAL CONTEXT ===".to_string(),
            format!("Net Worth: {}", format_money(self.net_worth)),
            format!("Total Assets: {}", format_money(self.total_assets)),
            format!("Total Liabilities: {}", format_money(self.total_liabilities)),
            format!("Monthly Income: {}", format_money(self.monthly_income)),
            format!("Monthly Expenses: {}", format_money(self.monthly_expenses)),
            format!("Monthly Cash Flow: {}", format_money(self.monthly_cash_flow)),
        ];

        if self.total_debt > 0.0 {
            lines.push(format!("Total Debt: {}", format_money(self.total_debt)));
            lines.push(format!(
                "Debt-to-Income Ratio: {:.1}%",
                self.debt_to_income_ratio
            ));
        }
        if self.total_investments > 0.0 {
            lines.push(format!(
                "Total Investments: {}",
                format_money(self.total_investments)
            ));
        }
        if self.active_goals > 0 {
            lines.push(format!("Active Financial Goals: {}", self.active_goals));
        }
        if let Some(category) = self.top_spending_category.as_deref().filter(|c| !c.is_empty()) {
            lines.push(format!(
                "Top Spending Category: {category} ({})",
                format_money(self.top_spending_amount)
            ));
        }
        if self.budget_adherence > 0.0 {
            lines.push(format!("Budget Adherence: {:.1}%", self.budget_adherence));
        }

        lines.push("=== END FINANCIAL CONTEXT ===\n".to_string());
        lines.join("\n")
    }
}

/// Formats an amount as `$1,234.56` (negative amounts as `$-1,234.56`).
#[must_use]
pub fn format_money(amount: f64) -> String {
    let fixed = format!("{:.2}", amount.abs());
    let (whole, cents) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if amount < 0.0 && fixed != "0.00" { "-" } else { "" };
    format!("${sign}{grouped}.{cents}")
}

/// A chat request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// The user's message.
    pub prompt: String,
    /// Prior turns, oldest first.
    #[serde(default)]
    pub history: Vec<ConversationTurn>,
    /// Optional financial summary for the user.
    #[serde(default)]
    pub financial: Option<FinancialSnapshot>,
}

impl ChatRequest {
    /// Creates a request with no history or financial context.
    #[must_use]
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Self::default()
        }
    }

    /// Sets the conversation history.
    #[must_use]
    pub fn with_history(mut self, history: Vec<ConversationTurn>) -> Self {
        self.history = history;
        self
    }

    /// Sets the financial context.
    #[must_use]
    pub fn with_financial(mut self, financial: FinancialSnapshot) -> Self {
        self.financial = Some(financial);
        self
    }
}

/// Sources used for a chat answer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatSources {
    /// Metadata of retrieved chunks.
    pub rag: Vec<Metadata>,
    /// Web source URLs.
    pub web: Vec<String>,
}

/// Which context sources contributed and which provider answered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatUsage {
    /// Retrieved documents were included.
    pub rag: bool,
    /// Web documents were included.
    pub web: bool,
    /// Provider kind that generated the answer.
    pub model: String,
}

/// A chat answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatAnswer {
    /// Generated text.
    pub answer: String,
    /// Context sources.
    pub sources: ChatSources,
    /// Source usage flags.
    pub used: ChatUsage,
}

/// A single-shot grounded answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    /// The question asked.
    pub query: String,
    /// Generated text.
    pub response: String,
    /// Metadata of the chunks the answer was grounded on.
    pub sources: Vec<Metadata>,
}

use serde::Serialize;
use tracing::debug;

use crate::balance::{compute_balances, Balances};
use crate::error::AppError;
use crate::exchange::{settle, Settlement, SettlementStrategy};
use crate::schemas::{Expense, Traveler};
use crate::validation::{ledger_currency, validate_expenses, ExpenseWarning};

/// Everything the expenses view needs to show who owes whom.
#[derive(Clone, Debug, Serialize)]
pub struct SettlementReport {
    pub currency: Option<String>,
    pub strategy: SettlementStrategy,
    pub balances: Balances,
    pub settlements: Vec<Settlement>,
    pub warnings: Vec<ExpenseWarning>,
}

impl SettlementReport {
    pub fn build(
        travelers: &[Traveler],
        expenses: &[Expense],
        strategy: SettlementStrategy,
        optimal_limit: usize,
    ) -> Result<Self, AppError> {
        let currency = ledger_currency(expenses)?;
        let warnings = validate_expenses(travelers, expenses);
        let balances = compute_balances(travelers, expenses);
        let settlements = settle(strategy, &balances, expenses, optimal_limit);
        debug!(
            travelers = balances.len(),
            expenses = expenses.len(),
            settlements = settlements.len(),
            warnings = warnings.len(),
            ?strategy,
            "built settlement report"
        );
        Ok(SettlementReport {
            currency,
            strategy,
            balances,
            settlements,
            warnings,
        })
    }
}

use serde::Serialize;

use crate::schemas::Expense;

pub const DEFAULT_CATEGORY: &str = "Other";

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CategoryTotal {
    pub category: String,
    pub total: f64,
}

/// Spending against the trip budget.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TripSummary {
    pub total_spent: f64,
    pub budget: f64,
    pub remaining: f64,
    /// 0 when the trip has no budget.
    pub percent_used: f64,
    /// In the order each category first appears in the ledger.
    pub categories: Vec<CategoryTotal>,
}

pub fn summarize(budget: f64, expenses: &[Expense]) -> TripSummary {
    let mut categories: Vec<CategoryTotal> = Vec::new();
    for expense in expenses {
        let category = expense
            .category
            .as_deref()
            .map(str::trim)
            .filter(|category| !category.is_empty())
            .unwrap_or(DEFAULT_CATEGORY);
        match categories.iter().position(|entry| entry.category == category) {
            Some(position) => categories[position].total += expense.amount,
            None => categories.push(CategoryTotal {
                category: category.to_owned(),
                total: expense.amount,
            }),
        }
    }

    let total_spent: f64 = expenses.iter().map(|expense| expense.amount).sum();
    let percent_used = if budget > 0.0 {
        total_spent / budget * 100.0
    } else {
        0.0
    };

    TripSummary {
        total_spent,
        budget,
        remaining: budget - total_spent,
        percent_used,
        categories,
    }
}

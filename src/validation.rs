//! Consistency checks on a trip's ledger.
//!
//! Nothing here changes what the settlement engine computes. Findings are
//! reported next to the result so the client can flag the offending
//! expenses, except for mixed currencies which cannot be summed at all.

use std::collections::HashSet;

use serde::Serialize;

use crate::balance::{split_value, TOLERANCE};
use crate::error::AppError;
use crate::schemas::{Expense, SplitType, Traveler};

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Issue {
    MissingPayer,
    NoParticipants,
    NonPositiveAmount,
    #[serde(rename = "percentages_do_not_sum_to_100")]
    PercentagesDoNotSumTo100 { total: f64 },
    FixedSharesDoNotMatchAmount { total: f64, amount: f64 },
    UnknownTraveler { traveler: Traveler },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ExpenseWarning {
    /// Position of the expense in the ledger.
    pub index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expense_id: Option<String>,
    #[serde(flatten)]
    pub issue: Issue,
}

pub fn validate_expenses(travelers: &[Traveler], expenses: &[Expense]) -> Vec<ExpenseWarning> {
    let roster: HashSet<&str> = travelers.iter().map(String::as_str).collect();
    let mut warnings = Vec::new();

    for (index, expense) in expenses.iter().enumerate() {
        let mut warn = |issue| {
            warnings.push(ExpenseWarning {
                index,
                expense_id: expense.id.clone(),
                issue,
            })
        };

        if expense.amount <= 0.0 {
            warn(Issue::NonPositiveAmount);
        }
        match expense.payer() {
            None => warn(Issue::MissingPayer),
            Some(payer) if !roster.is_empty() && !roster.contains(payer) => {
                warn(Issue::UnknownTraveler {
                    traveler: payer.to_owned(),
                })
            }
            Some(_) => {}
        }
        if expense.split_between.is_empty() {
            warn(Issue::NoParticipants);
            continue;
        }
        if !roster.is_empty() {
            for participant in &expense.split_between {
                if !roster.contains(participant.as_str())
                    && expense.payer() != Some(participant.as_str())
                {
                    warn(Issue::UnknownTraveler {
                        traveler: participant.clone(),
                    });
                }
            }
        }

        let total: f64 = expense
            .split_between
            .iter()
            .map(|participant| split_value(&expense.split_details, participant))
            .sum();
        match expense.split_type {
            SplitType::Equal => {}
            SplitType::Percentage if (total - 100.0).abs() > TOLERANCE => {
                warn(Issue::PercentagesDoNotSumTo100 { total })
            }
            SplitType::Fixed if (total - expense.amount).abs() > TOLERANCE => {
                warn(Issue::FixedSharesDoNotMatchAmount {
                    total,
                    amount: expense.amount,
                })
            }
            SplitType::Percentage | SplitType::Fixed => {}
        }
    }

    warnings
}

/// The one currency the ledger is kept in. Expenses without a currency
/// are assumed to be in it.
pub fn ledger_currency(expenses: &[Expense]) -> Result<Option<String>, AppError> {
    let mut currencies: Vec<String> = Vec::new();
    for code in expenses.iter().filter_map(Expense::currency) {
        let code = code.to_ascii_uppercase();
        if !currencies.contains(&code) {
            currencies.push(code);
        }
    }
    match currencies.len() {
        0 | 1 => Ok(currencies.pop()),
        _ => Err(AppError::MixedCurrencies(currencies)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::balance::tests::{expense, names, with_split};

    fn issues(warnings: Vec<ExpenseWarning>) -> Vec<Issue> {
        warnings.into_iter().map(|warning| warning.issue).collect()
    }

    #[test]
    fn consistent_ledger_has_no_warnings() {
        let expenses = vec![
            expense(90.0, "A", &["A", "B", "C"]),
            with_split(
                expense(200.0, "B", &["A", "B"]),
                SplitType::Percentage,
                &[("A", 25.0), ("B", 75.0)],
            ),
        ];
        assert!(validate_expenses(&names(&["A", "B", "C"]), &expenses).is_empty());
    }

    #[test]
    fn percentages_must_sum_to_100() {
        let split = with_split(
            expense(200.0, "B", &["A", "B"]),
            SplitType::Percentage,
            &[("A", 25.0), ("B", 50.0)],
        );
        assert_eq!(
            issues(validate_expenses(&names(&["A", "B"]), &[split])),
            vec![Issue::PercentagesDoNotSumTo100 { total: 75.0 }]
        );
    }

    #[test]
    fn fixed_shares_must_match_amount() {
        let split = with_split(
            expense(40.0, "A", &["A", "B"]),
            SplitType::Fixed,
            &[("A", 30.0)],
        );
        assert_eq!(
            issues(validate_expenses(&names(&["A", "B"]), &[split])),
            vec![Issue::FixedSharesDoNotMatchAmount {
                total: 30.0,
                amount: 40.0
            }]
        );
    }

    #[test]
    fn details_for_non_participants_do_not_count() {
        let split = with_split(
            expense(40.0, "A", &["A"]),
            SplitType::Fixed,
            &[("A", 40.0), ("Ghost", 10.0)],
        );
        assert!(validate_expenses(&names(&["A"]), &[split]).is_empty());
    }

    #[test]
    fn skipped_expenses_are_reported() {
        let mut no_payer = expense(10.0, "", &["A"]);
        no_payer.paid_by = None;
        no_payer.id = Some("7".to_string());
        let nobody = expense(0.0, "A", &[]);

        let warnings = validate_expenses(&names(&["A"]), &[no_payer, nobody]);
        assert_eq!(warnings[0].index, 0);
        assert_eq!(warnings[0].expense_id.as_deref(), Some("7"));
        assert_eq!(warnings[0].issue, Issue::MissingPayer);
        assert_eq!(
            issues(warnings[1..].to_vec()),
            vec![Issue::NonPositiveAmount, Issue::NoParticipants]
        );
    }

    #[test]
    fn unknown_travelers_only_checked_against_a_roster() {
        let outsider = expense(10.0, "Zed", &["A", "Yan"]);
        assert_eq!(
            issues(validate_expenses(&names(&["A"]), &[outsider.clone()])),
            vec![
                Issue::UnknownTraveler {
                    traveler: "Zed".to_string()
                },
                Issue::UnknownTraveler {
                    traveler: "Yan".to_string()
                },
            ]
        );
        assert!(validate_expenses(&[], &[outsider]).is_empty());
    }

    #[test]
    fn warning_serializes_flat() {
        let warning = ExpenseWarning {
            index: 2,
            expense_id: None,
            issue: Issue::PercentagesDoNotSumTo100 { total: 90.0 },
        };
        assert_eq!(
            serde_json::to_value(&warning).unwrap(),
            serde_json::json!({
                "index": 2,
                "kind": "percentages_do_not_sum_to_100",
                "total": 90.0
            })
        );
    }

    #[test]
    fn single_currency_is_accepted() {
        let mut usd = expense(10.0, "A", &["A"]);
        usd.currency = Some("usd".to_string());
        let mut untagged = expense(5.0, "A", &["A"]);
        untagged.currency = None;
        assert_eq!(
            ledger_currency(&[usd, untagged]).unwrap(),
            Some("USD".to_string())
        );
        assert_eq!(ledger_currency(&[]).unwrap(), None);
    }

    #[test]
    fn mixed_currencies_are_rejected() {
        let mut usd = expense(10.0, "A", &["A"]);
        usd.currency = Some("USD".to_string());
        let mut eur = expense(5.0, "A", &["A"]);
        eur.currency = Some("EUR".to_string());
        match ledger_currency(&[usd, eur]) {
            Err(AppError::MixedCurrencies(codes)) => assert_eq!(codes, vec!["USD", "EUR"]),
            other => panic!("expected mixed currencies, got {other:?}"),
        }
    }
}

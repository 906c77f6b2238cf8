use std::collections::{BTreeMap, HashMap};

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::schemas::{Expense, SplitType, Traveler};

/// Balances within one cent of zero are treated as settled.
pub const TOLERANCE: f64 = 0.01;

#[derive(Clone, Debug, PartialEq)]
pub struct PersonalBalance {
    pub id: Traveler,
    pub balance: f64,
}

/// Net balance per traveler, positive when the traveler is owed money.
///
/// Keeps insertion order: roster travelers first, then anyone who only
/// shows up in an expense, in the order they were first seen.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Balances {
    entries: Vec<PersonalBalance>,
    index: HashMap<Traveler, usize>,
}

impl Balances {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts every roster traveler at zero. Repeated names are kept once.
    pub fn with_roster(travelers: &[Traveler]) -> Self {
        let mut balances = Self::new();
        for traveler in travelers {
            balances.entry(traveler);
        }
        balances
    }

    fn entry(&mut self, traveler: &str) -> &mut f64 {
        let position = match self.index.get(traveler) {
            Some(&position) => position,
            None => {
                self.entries.push(PersonalBalance {
                    id: traveler.to_owned(),
                    balance: 0.0,
                });
                self.index.insert(traveler.to_owned(), self.entries.len() - 1);
                self.entries.len() - 1
            }
        };
        &mut self.entries[position].balance
    }

    pub fn credit(&mut self, traveler: &str, amount: f64) {
        *self.entry(traveler) += amount;
    }

    pub fn debit(&mut self, traveler: &str, amount: f64) {
        *self.entry(traveler) -= amount;
    }

    pub fn get(&self, traveler: &str) -> Option<f64> {
        self.index
            .get(traveler)
            .map(|&position| self.entries[position].balance)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PersonalBalance> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn total(&self) -> f64 {
        self.entries.iter().map(|person| person.balance).sum()
    }
}

impl Serialize for Balances {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for person in &self.entries {
            map.serialize_entry(&person.id, &person.balance)?;
        }
        map.end()
    }
}

/// Value recorded for `traveler` in a split, 0 when there is none.
pub fn split_value(details: &BTreeMap<Traveler, f64>, traveler: &str) -> f64 {
    details.get(traveler).copied().unwrap_or(0.0)
}

/// What `participant` owes for `expense` under its split policy.
pub fn owed_share(expense: &Expense, participant: &str) -> f64 {
    match expense.split_type {
        SplitType::Equal => expense.amount / expense.split_between.len() as f64,
        SplitType::Percentage => {
            expense.amount * split_value(&expense.split_details, participant) / 100.0
        }
        SplitType::Fixed => split_value(&expense.split_details, participant),
    }
}

pub fn compute_balances(travelers: &[Traveler], expenses: &[Expense]) -> Balances {
    let mut balances = Balances::with_roster(travelers);
    for expense in expenses {
        let Some(payer) = expense.payer() else {
            continue;
        };
        if expense.split_between.is_empty() {
            continue;
        }
        balances.credit(payer, expense.amount);
        for participant in &expense.split_between {
            balances.debit(participant, owed_share(expense, participant));
        }
    }
    balances
}

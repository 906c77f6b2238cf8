use crate::balance::{owed_share, Balances, PersonalBalance, TOLERANCE};
use crate::schemas::{Expense, Traveler};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

/// Most open balances the optimal search will take on; it allocates two
/// tables of `2^n` entries.
pub const MAX_OPTIMAL_BALANCES: usize = 24;

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug)]
pub struct UserPair {
    pub user1: Traveler,
    pub user2: Traveler,
}

/// A payment of `amount` from a debtor to a creditor.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Settlement {
    pub from: Traveler,
    pub to: Traveler,
    pub amount: f64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SettlementStrategy {
    #[default]
    Greedy,
    Optimal,
    Pairwise,
}

// Debtors carry what they owe as a positive residual.
fn split_debtors_and_creditors<'a>(
    people: impl Iterator<Item = &'a PersonalBalance>,
) -> (Vec<PersonalBalance>, Vec<PersonalBalance>) {
    let mut debtors = Vec::new();
    let mut creditors = Vec::new();
    for person in people {
        if person.balance < -TOLERANCE {
            debtors.push(PersonalBalance {
                id: person.id.clone(),
                balance: -person.balance,
            });
        } else if person.balance > TOLERANCE {
            creditors.push(person.clone());
        }
    }
    (debtors, creditors)
}

fn match_greedily(
    mut debtors: Vec<PersonalBalance>,
    mut creditors: Vec<PersonalBalance>,
) -> Vec<Settlement> {
    let mut settlements = Vec::new();
    for debtor in &mut debtors {
        for creditor in &mut creditors {
            if debtor.balance <= TOLERANCE {
                break;
            }
            if creditor.balance <= TOLERANCE {
                continue;
            }
            let amount = debtor.balance.min(creditor.balance);
            settlements.push(Settlement {
                from: debtor.id.clone(),
                to: creditor.id.clone(),
                amount,
            });
            debtor.balance -= amount;
            creditor.balance -= amount;
        }
    }
    settlements
}

/// Matches debtors against creditors in balance order.
///
/// Every balance ends inside the tolerance band, using at most
/// `debtors + creditors - 1` payments. The count is not guaranteed to be
/// the smallest possible; see [`compute_optimal_settlements`].
pub fn compute_settlements(balances: &Balances) -> Vec<Settlement> {
    let (debtors, creditors) = split_debtors_and_creditors(balances.iter());
    match_greedily(debtors, creditors)
}

/// Settles with the fewest possible payments.
///
/// The open balances are split into as many zero-sum groups as possible
/// and each group is settled on its own, so a group of `k` travelers needs
/// at most `k - 1` payments. The search is exponential in the number of
/// open balances; above `limit` of them (never more than
/// [`MAX_OPTIMAL_BALANCES`]) this falls back to [`compute_settlements`].
pub fn compute_optimal_settlements(balances: &Balances, limit: usize) -> Vec<Settlement> {
    let open: Vec<&PersonalBalance> = balances
        .iter()
        .filter(|person| person.balance.abs() > TOLERANCE)
        .collect();
    if open.is_empty() {
        return Vec::new();
    }
    if open.len() > limit.min(MAX_OPTIMAL_BALANCES) {
        warn!(
            open_balances = open.len(),
            limit, "too many open balances for optimal settlement, using greedy"
        );
        return compute_settlements(balances);
    }

    let mut groups = zero_sum_groups(&open);
    groups.sort_by_key(|group| group.first().copied());

    groups
        .into_iter()
        .flat_map(|group| {
            let (debtors, creditors) =
                split_debtors_and_creditors(group.into_iter().map(|position| open[position]));
            match_greedily(debtors, creditors)
        })
        .collect()
}

// Partitions `open` into the largest number of zero-sum groups. Each group
// holds positions into `open`, sorted ascending.
fn zero_sum_groups(open: &[&PersonalBalance]) -> Vec<Vec<usize>> {
    let full = (1usize << open.len()) - 1;
    let mut sums = vec![0.0_f64; full + 1];
    for mask in 1..=full {
        let lowest = mask.trailing_zeros() as usize;
        sums[mask] = sums[mask & (mask - 1)] + open[lowest].balance;
    }
    let is_zero = |mask: usize| sums[mask].abs() <= TOLERANCE;

    // best[mask]: most zero-sum prefixes over any removal order of `mask`.
    let mut best = vec![0u32; full + 1];
    for mask in 1..=full {
        let mut most = 0;
        let mut rest = mask;
        while rest != 0 {
            let bit = rest & rest.wrapping_neg();
            most = most.max(best[mask ^ bit]);
            rest ^= bit;
        }
        best[mask] = most + u32::from(is_zero(mask));
    }

    let mut groups = Vec::new();
    let mut group = Vec::new();
    let mut mask = full;
    while mask != 0 {
        let target = best[mask] - u32::from(is_zero(mask));
        let mut rest = mask;
        let mut chosen = mask & mask.wrapping_neg();
        while rest != 0 {
            let bit = rest & rest.wrapping_neg();
            if best[mask ^ bit] == target {
                chosen = bit;
                break;
            }
            rest ^= bit;
        }
        group.push(chosen.trailing_zeros() as usize);
        mask ^= chosen;
        if mask == 0 || is_zero(mask) {
            group.sort_unstable();
            groups.push(std::mem::take(&mut group));
        }
    }
    groups
}

// The payments that would be made if no simplification happens: every
// participant pays the payer back directly, netted per pair of travelers.
pub fn compute_pairwise_settlements(expenses: &[Expense]) -> Vec<Settlement> {
    let mut balances_between_people: BTreeMap<UserPair, f64> = BTreeMap::new();

    for expense in expenses {
        let Some(payer) = expense.payer() else {
            continue;
        };
        for receiver in &expense.split_between {
            if receiver == payer {
                continue;
            }
            let mut amount = owed_share(expense, receiver);

            // Alphabetical order keeps every debt between the same two
            // travelers in the same entry. Positive means user2 owes user1.
            let pair = if payer < receiver.as_str() {
                UserPair {
                    user1: payer.to_owned(),
                    user2: receiver.clone(),
                }
            } else {
                amount = -amount;
                UserPair {
                    user1: receiver.clone(),
                    user2: payer.to_owned(),
                }
            };

            *balances_between_people.entry(pair).or_insert(0.0) += amount;
        }
    }

    balances_between_people
        .into_iter()
        .filter(|(_, balance)| balance.abs() > TOLERANCE)
        .map(|(pair, balance)| {
            let (from, to) = if balance > 0.0 {
                (pair.user2, pair.user1)
            } else {
                (pair.user1, pair.user2)
            };
            Settlement {
                from,
                to,
                amount: balance.abs(),
            }
        })
        .collect()
}

pub fn settle(
    strategy: SettlementStrategy,
    balances: &Balances,
    expenses: &[Expense],
    optimal_limit: usize,
) -> Vec<Settlement> {
    match strategy {
        SettlementStrategy::Greedy => compute_settlements(balances),
        SettlementStrategy::Optimal => compute_optimal_settlements(balances, optimal_limit),
        SettlementStrategy::Pairwise => compute_pairwise_settlements(expenses),
    }
}

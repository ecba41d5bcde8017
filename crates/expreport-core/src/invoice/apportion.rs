//! Split of a document's weight and value across its commodity codes.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use super::rules::CodeEntry;

/// Share of one commodity code.
#[derive(Debug, Clone, PartialEq)]
pub struct Apportioned {
    pub code: String,
    pub net_weight: u64,
    pub amount: Decimal,
}

/// Split `total_weight` and `total_amount` in proportion to each entry's
/// partial value.
///
/// Weights are whole kilograms distributed by largest remainder, so they sum
/// to `total_weight` exactly. Amounts are rounded to cents and the last share
/// absorbs the rounding difference. Negative partial values count as zero; if
/// nothing is left to weigh by, every share is zero.
pub fn apportion(entries: &[CodeEntry], total_weight: u64, total_amount: Decimal) -> Vec<Apportioned> {
    if let [only] = entries {
        return vec![Apportioned {
            code: only.code.clone(),
            net_weight: total_weight,
            amount: total_amount,
        }];
    }

    let weights: Vec<Decimal> = entries
        .iter()
        .map(|e| e.partial_value.max(Decimal::ZERO))
        .collect();
    let basis: Decimal = weights.iter().sum();

    if basis.is_zero() {
        return entries
            .iter()
            .map(|e| Apportioned {
                code: e.code.clone(),
                net_weight: 0,
                amount: Decimal::ZERO,
            })
            .collect();
    }

    let kilograms = split_whole(&weights, basis, total_weight);

    let mut amounts: Vec<Decimal> = weights
        .iter()
        .map(|w| (total_amount * w / basis).round_dp(2))
        .collect();
    let rounded_sum: Decimal = amounts.iter().sum();
    if let Some(last) = amounts.last_mut() {
        *last += total_amount - rounded_sum;
    }

    entries
        .iter()
        .zip(kilograms)
        .zip(amounts)
        .map(|((entry, net_weight), amount)| Apportioned {
            code: entry.code.clone(),
            net_weight,
            amount,
        })
        .collect()
}

/// Largest remainder split of `total` whole units.
fn split_whole(weights: &[Decimal], basis: Decimal, total: u64) -> Vec<u64> {
    let total_dec = Decimal::from(total);
    let exact: Vec<Decimal> = weights.iter().map(|w| total_dec * w / basis).collect();

    let mut shares: Vec<u64> = exact
        .iter()
        .map(|x| x.floor().to_u64().unwrap_or(0))
        .collect();
    let assigned: u64 = shares.iter().sum();
    let mut residual = total.saturating_sub(assigned);

    let mut by_remainder: Vec<usize> = (0..exact.len()).collect();
    by_remainder.sort_by(|&a, &b| {
        let ra = exact[a] - exact[a].floor();
        let rb = exact[b] - exact[b].floor();
        rb.cmp(&ra).then(a.cmp(&b))
    });

    for i in by_remainder {
        if residual == 0 {
            break;
        }
        shares[i] += 1;
        residual -= 1;
    }

    shares
}

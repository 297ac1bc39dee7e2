//! Non-zero balance view over the Binance account snapshot

use crate::proxy::types::{RelayError, RelayResult};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// The slice of `GET /api/v3/account` this view reads
#[derive(Debug, Deserialize)]
struct AccountSnapshot {
    balances: Vec<AssetBalance>,
}

/// One asset as Binance reports it, amounts as decimal strings
#[derive(Clone, Debug, Deserialize)]
pub struct AssetBalance {
    pub asset: String,
    pub free: String,
    pub locked: String,
}

/// One asset with a non-zero holding
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceEntry {
    pub asset: String,
    pub free: String,
    pub locked: String,
    pub total: String,
}

/// Decode an account snapshot body and keep the assets actually held
pub fn non_zero_balances(body: &[u8]) -> RelayResult<Vec<BalanceEntry>> {
    let snapshot: AccountSnapshot = serde_json::from_slice(body).map_err(|e| {
        RelayError::RelayFailure(format!("Unexpected account payload from upstream: {e}"))
    })?;

    summarize(snapshot.balances)
}

/// Drop zero balances and compute `total = free + locked`
pub fn summarize(balances: Vec<AssetBalance>) -> RelayResult<Vec<BalanceEntry>> {
    balances
        .into_iter()
        .filter_map(|balance| match amounts(&balance) {
            Err(e) => Some(Err(e)),
            Ok((free, locked)) if free.is_zero() && locked.is_zero() => None,
            Ok((free, locked)) => Some(Ok(BalanceEntry {
                total: (free + locked).normalize().to_string(),
                asset: balance.asset,
                free: balance.free,
                locked: balance.locked,
            })),
        })
        .collect()
}

fn amounts(balance: &AssetBalance) -> RelayResult<(Decimal, Decimal)> {
    Ok((
        parse_amount(balance, &balance.free)?,
        parse_amount(balance, &balance.locked)?,
    ))
}

fn parse_amount(balance: &AssetBalance, amount: &str) -> RelayResult<Decimal> {
    Decimal::from_str(amount.trim()).map_err(|e| {
        RelayError::RelayFailure(format!(
            "Invalid amount '{amount}' for asset {}: {e}",
            balance.asset
        ))
    })
}

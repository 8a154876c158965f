use alloy::primitives::U256;
use bigdecimal::num_bigint::BigInt;
use chrono::{DateTime, Utc};
use serde_json::{json, Value as JsonValue};
use std::fmt;

use crate::analytics::format::AmountFormatter;
use crate::analytics::stats::StatsResult;
use crate::anomaly::SuspicionResult;
use crate::indexer::transfer_set::to_bigint;
use crate::indexer::types::short_hex;
use crate::pipeline::Report;

/// Formatters for the kinds of amounts a report shows.
#[derive(Debug, Clone)]
pub struct Units {
    pub token: AmountFormatter,
    pub ether: AmountFormatter,
    /// Account balances, shown with 4 places.
    pub balance: AmountFormatter,
    pub gwei: AmountFormatter,
}

impl Units {
    pub fn new(token: AmountFormatter) -> Self {
        Self {
            token,
            ether: AmountFormatter::new(18, "ETH"),
            balance: AmountFormatter::new(18, "ETH").with_places(4),
            gwei: AmountFormatter::new(9, "Gwei"),
        }
    }

    fn token_amount(&self, amount: U256) -> String {
        self.token.format(&to_bigint(amount))
    }

    fn ether_amount(&self, wei: U256) -> String {
        self.ether.format(&to_bigint(wei))
    }

    fn balance_amount(&self, wei: U256) -> String {
        self.balance.format(&to_bigint(wei))
    }

    fn gwei_amount(&self, wei: u128) -> String {
        self.gwei.format(&BigInt::from(wei))
    }
}

/// Console rendering of a full report.
pub struct TextReport<'a> {
    pub report: &'a Report,
    pub units: &'a Units,
}

impl fmt::Display for TextReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let r = self.report;
        let units = self.units;

        writeln!(f, "Largest {} Transfer Details:", units.token.symbol())?;
        writeln!(f, "Amount: {}", units.token_amount(r.largest.amount))?;
        writeln!(f, "From: {}", short_hex(&r.largest.from_address))?;
        writeln!(f, "To: {}", short_hex(&r.largest.to_address))?;
        writeln!(f, "Block: {}", r.largest.block_number)?;
        match r.block_timestamp {
            Some(ts) => writeln!(f, "Timestamp: {} ({})", ts, utc(ts))?,
            None => writeln!(f, "Timestamp: unavailable")?,
        }

        if let Some(recipient) = &r.recipient {
            writeln!(f)?;
            writeln!(f, "Recipient Details:")?;
            writeln!(
                f,
                "Address Type: {}",
                if recipient.is_contract { "Contract" } else { "EOA" }
            )?;
            writeln!(f, "ETH Balance: {}", units.balance_amount(recipient.native_balance))?;
        }

        if let Some(gas_price) = r.gas_price {
            writeln!(f)?;
            writeln!(f, "Current Gas Price: {}", units.gwei_amount(gas_price))?;
        }

        writeln!(f)?;
        writeln!(f, "Transaction Details:")?;
        match &r.transaction {
            Some(tx) => {
                writeln!(f, "From: {}", short_hex(&tx.from))?;
                match tx.to {
                    Some(to) => writeln!(f, "To: {}", short_hex(&to))?,
                    None => writeln!(f, "To: contract creation")?,
                }
                writeln!(f, "Value: {}", units.ether_amount(tx.value))?;
                writeln!(f, "Gas Used: {}", tx.gas_used)?;
                writeln!(f, "Gas Price: {}", units.gwei_amount(tx.gas_price))?;
                writeln!(f, "Status: {}", if tx.success { "Success" } else { "Failed" })?;
            }
            None => writeln!(f, "Unavailable")?,
        }

        if let Some(stats) = &r.stats {
            writeln!(f)?;
            writeln!(f, "Transfer Statistics (last {} blocks):", r.stats_blocks)?;
            write!(f, "{}", TextStats { stats, units })?;
        }

        if let Some(suspicion) = &r.suspicion {
            writeln!(f)?;
            writeln!(f, "Checking for Suspicious Activity:")?;
            write!(f, "{}", TextSuspicion { suspicion, units })?;
        }

        if r.skipped_logs > 0 {
            writeln!(f)?;
            writeln!(f, "Skipped {} malformed logs", r.skipped_logs)?;
        }

        Ok(())
    }
}

pub struct TextStats<'a> {
    pub stats: &'a StatsResult,
    pub units: &'a Units,
}

impl fmt::Display for TextStats<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = self.stats;
        writeln!(f, "Total Transfers: {}", s.count)?;
        writeln!(f, "Total Volume: {}", self.units.token.format(&s.total_volume))?;
        writeln!(f, "Unique Senders: {}", s.unique_senders)?;
        writeln!(f, "Unique Receivers: {}", s.unique_receivers)?;
        writeln!(f, "Average Transfer: {}", self.units.token.format(&s.average_volume))
    }
}

pub struct TextSuspicion<'a> {
    pub suspicion: &'a SuspicionResult,
    pub units: &'a Units,
}

impl fmt::Display for TextSuspicion<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = self.suspicion;
        writeln!(f, "Total Sent: {}", self.units.token.format(&s.total_sent))?;
        writeln!(f, "Total Received: {}", self.units.token.format(&s.total_received))?;
        writeln!(f, "Number of Transactions: {}", s.transaction_count)?;
        if s.is_suspicious() {
            writeln!(f, "Suspicious Patterns Found:")?;
            for pattern in &s.patterns {
                writeln!(f, "- {}", pattern.description())?;
            }
            Ok(())
        } else {
            writeln!(f, "No suspicious patterns detected")
        }
    }
}

fn utc(ts: u64) -> String {
    i64::try_from(ts)
        .ok()
        .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_else(|| "out of range".to_string())
}

pub fn stats_json(stats: &StatsResult, units: &Units) -> JsonValue {
    json!({
        "total_transfers": stats.count,
        "total_volume": units.token.format(&stats.total_volume),
        "total_volume_raw": stats.total_volume.to_string(),
        "unique_senders": stats.unique_senders,
        "unique_receivers": stats.unique_receivers,
        "avg_transfer": units.token.format(&stats.average_volume),
    })
}

pub fn suspicion_json(suspicion: &SuspicionResult, units: &Units) -> JsonValue {
    json!({
        "total_sent": units.token.format(&suspicion.total_sent),
        "total_received": units.token.format(&suspicion.total_received),
        "num_transactions": suspicion.transaction_count,
        "suspicious_patterns": suspicion
            .patterns
            .iter()
            .map(|p| p.as_str())
            .collect::<Vec<_>>(),
    })
}

pub fn report_json(report: &Report, units: &Units) -> JsonValue {
    let largest = &report.largest;
    json!({
        "largest_transfer": {
            "amount": units.token_amount(largest.amount),
            "amount_raw": largest.amount.to_string(),
            "from": short_hex(&largest.from_address),
            "to": short_hex(&largest.to_address),
            "block": largest.block_number,
            "timestamp": report.block_timestamp,
            "tx_hash": format!("0x{}", hex::encode(largest.transaction_hash)),
        },
        "recipient": report.recipient.as_ref().map(|r| json!({
            "is_contract": r.is_contract,
            "eth_balance": units.balance_amount(r.native_balance),
        })),
        "gas_price": report.gas_price.map(|g| units.gwei_amount(g)),
        "transaction": report.transaction.as_ref().map(|tx| json!({
            "from": short_hex(&tx.from),
            "to": tx.to.as_ref().map(short_hex),
            "value": units.ether_amount(tx.value),
            "gas_used": tx.gas_used,
            "gas_price": units.gwei_amount(tx.gas_price),
            "status": if tx.success { "Success" } else { "Failed" },
        })),
        "stats_blocks": report.stats_blocks,
        "stats": report.stats.as_ref().map(|s| stats_json(s, units)),
        "suspicion": report.suspicion.as_ref().map(|s| suspicion_json(s, units)),
        "skipped_logs": report.skipped_logs,
    })
}

use bigdecimal::num_bigint::BigInt;
use std::collections::BTreeSet;

/// Suspicious patterns the detector can flag. New heuristics add variants here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[non_exhaustive]
pub enum PatternTag {
    /// Many transfers sent, all to one counterparty.
    FanOutToSameAddress,
    /// Many transfers received, all from one counterparty.
    FanInFromSameAddress,
}

impl PatternTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FanOutToSameAddress => "fan_out_to_same_address",
            Self::FanInFromSameAddress => "fan_in_from_same_address",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::FanOutToSameAddress => "Multiple transfers to same address",
            Self::FanInFromSameAddress => "Multiple transfers from same address",
        }
    }
}

/// Outcome of a suspicion check for one address. Totals are in token base units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuspicionResult {
    pub total_sent: BigInt,
    pub total_received: BigInt,
    pub transaction_count: usize,
    pub patterns: BTreeSet<PatternTag>,
}

impl SuspicionResult {
    pub fn is_suspicious(&self) -> bool {
        !self.patterns.is_empty()
    }
}

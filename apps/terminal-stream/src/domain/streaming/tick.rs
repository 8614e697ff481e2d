//! Tick records.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Bit set describing which fields of a tick changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TickFlags(u32);

impl TickFlags {
    /// Bid price changed.
    pub const BID: Self = Self(0x02);
    /// Ask price changed.
    pub const ASK: Self = Self(0x04);
    /// Last deal price changed.
    pub const LAST: Self = Self(0x08);
    /// Volume changed.
    pub const VOLUME: Self = Self(0x10);
    /// Tick is the result of a buy deal.
    pub const BUY: Self = Self(0x20);
    /// Tick is the result of a sell deal.
    pub const SELL: Self = Self(0x40);

    /// Create flags from their raw bits.
    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// Get the raw bits.
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Check whether every bit of `other` is set.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for TickFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// One market update for a symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickRecord {
    /// Symbol name.
    pub symbol: String,
    /// Best bid.
    pub bid: Decimal,
    /// Best ask.
    pub ask: Decimal,
    /// Last deal price.
    pub last: Decimal,
    /// Volume of the last deal.
    pub volume: u64,
    /// Volume of the last deal with fractional lots.
    pub volume_real: Decimal,
    /// Server timestamp, millisecond precision.
    pub time: DateTime<Utc>,
    /// Change flags.
    pub flags: TickFlags,
}

impl TickRecord {
    /// Spread between ask and bid.
    #[must_use]
    pub fn spread(&self) -> Decimal {
        self.ask - self.bid
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_contain_combined_bits() {
        let flags = TickFlags::BID | TickFlags::ASK;
        assert!(flags.contains(TickFlags::BID));
        assert!(flags.contains(TickFlags::ASK));
        assert!(!flags.contains(TickFlags::LAST));
        assert_eq!(flags.bits(), 0x06);
    }

    #[test]
    fn spread_is_ask_minus_bid() {
        let tick = TickRecord {
            symbol: "EURUSD".to_string(),
            bid: Decimal::new(108_450, 5),
            ask: Decimal::new(108_462, 5),
            last: Decimal::ZERO,
            volume: 0,
            volume_real: Decimal::ZERO,
            time: Utc::now(),
            flags: TickFlags::default(),
        };
        assert_eq!(tick.spread(), Decimal::new(12, 5));
    }
}

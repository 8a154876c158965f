use bigdecimal::num_bigint::{BigInt, Sign};
use bigdecimal::{BigDecimal, RoundingMode};

/// Render a base-unit amount as a decimal string with thousands separators and
/// exactly two fractional digits.
///
/// Scaling is exact (`amount * 10^-decimals` as a `BigDecimal`); the only loss is
/// the final rounding to 2 places, which is half-to-even.
pub fn format_amount(amount: &BigInt, decimals: u8) -> String {
    format_amount_places(amount, decimals, 2)
}

/// [`format_amount`] with `places` fractional digits instead of two.
pub fn format_amount_places(amount: &BigInt, decimals: u8, places: u8) -> String {
    let places = usize::from(places);
    let scaled = BigDecimal::new(amount.clone(), i64::from(decimals));
    let rounded = scaled.with_scale_round(places as i64, RoundingMode::HalfEven);
    let (digits, _scale) = rounded.as_bigint_and_exponent();

    let negative = digits.sign() == Sign::Minus;
    let mut digits = digits.magnitude().to_string();
    if digits.len() <= places {
        digits = format!("{:0>width$}", digits, width = places + 1);
    }
    let (whole, fraction) = digits.split_at(digits.len() - places);

    let sign = if negative { "-" } else { "" };
    if fraction.is_empty() {
        format!("{}{}", sign, group_thousands(whole))
    } else {
        format!("{}{}.{}", sign, group_thousands(whole), fraction)
    }
}

fn group_thousands(whole: &str) -> String {
    let mut out = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, c) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Formats amounts of one token with its symbol appended.
#[derive(Debug, Clone)]
pub struct AmountFormatter {
    decimals: u8,
    places: u8,
    symbol: String,
}

impl AmountFormatter {
    pub fn new(decimals: u8, symbol: impl Into<String>) -> Self {
        Self {
            decimals,
            places: 2,
            symbol: symbol.into(),
        }
    }

    /// Show `places` fractional digits instead of two.
    pub fn with_places(mut self, places: u8) -> Self {
        self.places = places;
        self
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn format(&self, amount: &BigInt) -> String {
        format!(
            "{} {}",
            format_amount_places(amount, self.decimals, self.places),
            self.symbol
        )
    }
}

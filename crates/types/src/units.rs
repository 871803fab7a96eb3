//! RankFi Fixed-Point Units
//!
//! Balances are stored as `u128` integers with 18 fractional decimal digits.
//! All split and cap arithmetic is integer-only; no floating point is used
//! anywhere on the mutation path.

/// Fixed-point token amount (1 token = 10^18 units).
pub type Amount = u128;

/// Basis points (1/100 of one percent).
pub type BasisPoints = u16;

/// Number of fractional decimal digits.
pub const DECIMALS: u32 = 18;

/// Units per whole token.
pub const UNIT: Amount = 10u128.pow(DECIMALS);

/// 100% in basis points.
pub const BPS_DENOMINATOR: u128 = 10_000;

/// Convert whole tokens into fixed-point units (saturating).
#[inline]
pub const fn tokens(whole: u128) -> Amount {
    whole.saturating_mul(UNIT)
}

/// Integer multiplication followed by division with overflow detection.
/// Returns `None` on overflow or division by zero.
#[inline]
pub fn mul_div_u128(n: u128, mul: u128, div: u128) -> Option<u128> {
    if div == 0 {
        return None;
    }
    n.checked_mul(mul).map(|product| product / div)
}

/// `floor(total * bps / 10_000)`.
#[inline]
pub fn bps_share(total: Amount, bps: BasisPoints) -> Option<Amount> {
    mul_div_u128(total, bps as u128, BPS_DENOMINATOR)
}

/// Render an amount as a decimal token string, trimming trailing zeros.
pub fn format_amount(amount: Amount) -> String {
    let whole = amount / UNIT;
    let frac = amount % UNIT;
    if frac == 0 {
        return whole.to_string();
    }
    let frac = format!("{:018}", frac);
    format!("{}.{}", whole, frac.trim_end_matches('0'))
}

/// Parse a decimal token string (`"12"`, `"0.5"`) into fixed-point units.
/// Returns `None` for malformed input, more than 18 fractional digits, or
/// overflow.
pub fn parse_amount(input: &str) -> Option<Amount> {
    let input = input.trim();
    let (whole, frac) = match input.split_once('.') {
        Some((whole, frac)) => (whole, frac),
        None => (input, ""),
    };
    if whole.is_empty() && frac.is_empty() {
        return None;
    }
    if !whole.bytes().all(|b| b.is_ascii_digit()) || !frac.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if frac.len() > DECIMALS as usize {
        return None;
    }

    let whole: u128 = if whole.is_empty() { 0 } else { whole.parse().ok()? };
    let frac_units: u128 = if frac.is_empty() {
        0
    } else {
        let padded = format!("{:0<18}", frac);
        padded.parse().ok()?
    };
    whole.checked_mul(UNIT)?.checked_add(frac_units)
}

//! Declarative argument parsing for tool input strings.
//!
//! Every tool declares an ordered table of [`ArgSlot`]s. The raw input is split on
//! whitespace and each token is checked against its slot. There is no network access
//! here: text goes in, typed values or an [`ArgError`] come out.

use ethers_core::types::U256;
use thiserror::Error;

/// Decimals of the native currency (1 ETH = 10^18 wei).
pub const ETH_DECIMALS: u32 = 18;

/// Largest power of ten representable in a `U256`.
const MAX_U256_EXP10: i64 = 77;

const MAX_EXPONENT: i64 = i64::MAX / 4;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ArgError {
    #[error("expected {expected} argument(s), got {found}")]
    ArgumentCount { expected: usize, found: usize },
    #[error("{label} must be a non-negative integer, got '{token}'")]
    NotAnInteger { label: &'static str, token: String },
    #[error("{label} must be a valid non-negative decimal, e.g. 0.01, got '{token}'")]
    NotADecimal { label: &'static str, token: String },
}

/// Primitive type of a positional argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgKind {
    /// Passed through untouched; validated when the call is encoded.
    Address,
    /// Raw base-unit integer, e.g. an ERC-20 amount.
    Integer,
    /// Human ETH amount, converted to wei.
    EthDecimal,
}

/// Where a parsed slot ends up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding {
    /// Next positional ABI argument.
    Arg,
    /// Native value attached to the transaction.
    Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArgSlot {
    pub label: &'static str,
    pub kind: ArgKind,
    pub binding: Binding,
}

impl ArgSlot {
    pub const fn address(label: &'static str) -> Self {
        Self { label, kind: ArgKind::Address, binding: Binding::Arg }
    }

    pub const fn integer(label: &'static str) -> Self {
        Self { label, kind: ArgKind::Integer, binding: Binding::Arg }
    }

    pub const fn eth_decimal(label: &'static str) -> Self {
        Self { label, kind: ArgKind::EthDecimal, binding: Binding::Arg }
    }

    /// An ETH amount sent as the transaction value instead of an ABI argument.
    pub const fn eth_value(label: &'static str) -> Self {
        Self { label, kind: ArgKind::EthDecimal, binding: Binding::Value }
    }
}

/// A typed argument ready to be turned into an ABI token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgValue {
    Address(String),
    Uint(U256),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParsedArgs {
    pub args: Vec<ArgValue>,
    pub value_wei: U256,
}

/// Parses `raw` against `slots`. The token count must match exactly.
pub fn parse_args(slots: &[ArgSlot], raw: &str) -> Result<ParsedArgs, ArgError> {
    let tokens: Vec<&str> = raw.split_whitespace().collect();
    if tokens.len() != slots.len() {
        return Err(ArgError::ArgumentCount {
            expected: slots.len(),
            found: tokens.len(),
        });
    }

    let mut parsed = ParsedArgs::default();
    for (slot, token) in slots.iter().zip(tokens) {
        let value = match slot.kind {
            ArgKind::Address => ArgValue::Address(token.to_string()),
            ArgKind::Integer => ArgValue::Uint(parse_integer(token).ok_or_else(|| {
                ArgError::NotAnInteger {
                    label: slot.label,
                    token: token.to_string(),
                }
            })?),
            ArgKind::EthDecimal => ArgValue::Uint(parse_eth_to_wei(token).ok_or_else(|| {
                ArgError::NotADecimal {
                    label: slot.label,
                    token: token.to_string(),
                }
            })?),
        };

        match (slot.binding, value) {
            (Binding::Value, ArgValue::Uint(wei)) => parsed.value_wei = wei,
            (_, value) => parsed.args.push(value),
        }
    }
    Ok(parsed)
}

/// Non-negative base-10 integer that fits in 256 bits. A leading `+` is allowed.
pub fn parse_integer(token: &str) -> Option<U256> {
    let digits = token.strip_prefix('+').unwrap_or(token);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    U256::from_dec_str(digits).ok()
}

/// Converts a decimal ETH amount to wei, truncating past 18 fractional digits.
pub fn parse_eth_to_wei(token: &str) -> Option<U256> {
    parse_decimal_units(token, ETH_DECIMALS)
}

/// Parses `token` as a non-negative decimal (optionally in scientific notation) and scales
/// it by `10^decimals`. Digits below the base unit are dropped, never rounded.
pub fn parse_decimal_units(token: &str, decimals: u32) -> Option<U256> {
    let body = token.strip_prefix('+').unwrap_or(token);

    let (mantissa, exponent) = match body.find(['e', 'E']) {
        Some(idx) => (&body[..idx], parse_exponent(&body[idx + 1..])?),
        None => (body, 0),
    };

    let (int_part, frac_part) = match mantissa.split_once('.') {
        Some((i, f)) => (i, f),
        None => (mantissa, ""),
    };
    if int_part.is_empty() && frac_part.is_empty() {
        return None;
    }
    if !int_part.bytes().chain(frac_part.bytes()).all(|b| b.is_ascii_digit()) {
        return None;
    }

    let digits = format!("{int_part}{frac_part}");
    let digits = digits.trim_start_matches('0');
    if digits.is_empty() {
        return Some(U256::zero());
    }

    // value = digits * 10^(exponent - frac_len); in base units add `decimals`.
    let shift = i64::from(decimals)
        .checked_add(exponent)?
        .checked_sub(i64::try_from(frac_part.len()).ok()?)?;

    if shift >= 0 {
        if shift > MAX_U256_EXP10 {
            return None;
        }
        let base = U256::from_dec_str(digits).ok()?;
        base.checked_mul(U256::exp10(usize::try_from(shift).ok()?))
    } else {
        let drop = usize::try_from(-shift).ok()?;
        if drop >= digits.len() {
            return Some(U256::zero());
        }
        U256::from_dec_str(&digits[..digits.len() - drop]).ok()
    }
}

fn parse_exponent(s: &str) -> Option<i64> {
    let (negative, digits) = match s.as_bytes().first()? {
        b'-' => (true, &s[1..]),
        b'+' => (false, &s[1..]),
        _ => (false, s),
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    // Saturates: past this bound the value already overflows a U256 or truncates to zero,
    // and the shift arithmetic in `parse_decimal_units` stays in range.
    let magnitude = digits.bytes().fold(0i64, |acc, b| {
        acc.saturating_mul(10)
            .saturating_add(i64::from(b - b'0'))
            .min(MAX_EXPONENT)
    });
    Some(if negative { -magnitude } else { magnitude })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wei(s: &str) -> U256 {
        U256::from_dec_str(s).unwrap()
    }

    #[test]
    fn decimal_to_wei_is_exact_up_to_eighteen_places() {
        assert_eq!(parse_eth_to_wei("0.01"), Some(wei("10000000000000000")));
        assert_eq!(parse_eth_to_wei("0.0001"), Some(wei("100000000000000")));
        assert_eq!(parse_eth_to_wei("1"), Some(wei("1000000000000000000")));
        assert_eq!(parse_eth_to_wei("2.5"), Some(wei("2500000000000000000")));
        assert_eq!(parse_eth_to_wei("0.000000000000000001"), Some(U256::one()));
    }

    #[test]
    fn extra_fractional_digits_truncate() {
        assert_eq!(parse_eth_to_wei("0.0000000000000000019"), Some(U256::one()));
        assert_eq!(parse_eth_to_wei("0.0000000000000000009"), Some(U256::zero()));
        assert_eq!(
            parse_eth_to_wei("1.9999999999999999999"),
            Some(wei("1999999999999999999"))
        );
    }

    #[test]
    fn decimal_accepts_common_spellings() {
        assert_eq!(parse_eth_to_wei(".5"), Some(wei("500000000000000000")));
        assert_eq!(parse_eth_to_wei("5."), Some(wei("5000000000000000000")));
        assert_eq!(parse_eth_to_wei("+0.1"), Some(wei("100000000000000000")));
        assert_eq!(parse_eth_to_wei("1e-4"), Some(wei("100000000000000")));
        assert_eq!(parse_eth_to_wei("1.5E2"), Some(wei("150000000000000000000")));
        assert_eq!(parse_eth_to_wei("000"), Some(U256::zero()));
    }

    #[test]
    fn decimal_rejects_garbage_and_negatives() {
        for bad in ["", ".", "abc", "0.0.1", "-0.01", "1e", "1e+", "0x10", "NaN", "1,5"] {
            assert_eq!(parse_eth_to_wei(bad), None, "{bad:?} should be rejected");
        }
    }

    #[test]
    fn decimal_overflow_is_rejected() {
        assert_eq!(parse_eth_to_wei("1e60"), None);
        assert_eq!(parse_eth_to_wei("1e99999999"), None);
        assert_eq!(parse_eth_to_wei("1e99999999999999999999999"), None);
    }

    #[test]
    fn tiny_decimals_truncate_to_zero() {
        assert_eq!(parse_eth_to_wei("1e-19"), Some(U256::zero()));
        assert_eq!(parse_eth_to_wei("1e-2000000"), Some(U256::zero()));
        assert_eq!(parse_eth_to_wei("5.5e-99999999999999999999999"), Some(U256::zero()));
        assert_eq!(parse_eth_to_wei("0e99999999"), Some(U256::zero()));
    }

    #[test]
    fn integer_parsing() {
        assert_eq!(parse_integer("5000"), Some(U256::from(5000u64)));
        assert_eq!(parse_integer("+7"), Some(U256::from(7u64)));
        assert_eq!(parse_integer("-7"), None);
        assert_eq!(parse_integer("1.0"), None);
        assert_eq!(parse_integer("0x10"), None);
        assert_eq!(parse_integer(""), None);
        // 2^256 does not fit
        assert_eq!(
            parse_integer(
                "115792089237316195423570985008687907853269984665640564039457584007913129639936"
            ),
            None
        );
    }

    #[test]
    fn arity_must_match_exactly() {
        let slots = [
            ArgSlot::address("TOKEN_ADDRESS"),
            ArgSlot::address("TO_ADDRESS"),
            ArgSlot::integer("AMOUNT"),
        ];
        assert_eq!(
            parse_args(&slots, "0xToken 0xReceiver"),
            Err(ArgError::ArgumentCount { expected: 3, found: 2 })
        );
        assert_eq!(
            parse_args(&slots, "a b c d"),
            Err(ArgError::ArgumentCount { expected: 3, found: 4 })
        );
        assert_eq!(
            parse_args(&[], "unexpected"),
            Err(ArgError::ArgumentCount { expected: 0, found: 1 })
        );
        assert_eq!(parse_args(&[], "   "), Ok(ParsedArgs::default()));
    }

    #[test]
    fn positional_and_value_slots() {
        let withdraw = [ArgSlot::address("TO_ADDRESS"), ArgSlot::eth_decimal("AMOUNT_IN_ETH")];
        let parsed = parse_args(&withdraw, "  0xReceiver\t0.01 ").unwrap();
        assert_eq!(
            parsed.args,
            vec![
                ArgValue::Address("0xReceiver".into()),
                ArgValue::Uint(wei("10000000000000000")),
            ]
        );
        assert!(parsed.value_wei.is_zero());

        let deposit = [ArgSlot::eth_value("AMOUNT_IN_ETH")];
        let parsed = parse_args(&deposit, "0.0001").unwrap();
        assert!(parsed.args.is_empty());
        assert_eq!(parsed.value_wei, wei("100000000000000"));
    }

    #[test]
    fn type_errors_name_the_slot() {
        let slots = [ArgSlot::address("TOKEN_ADDRESS"), ArgSlot::integer("AMOUNT")];
        assert_eq!(
            parse_args(&slots, "0xToken lots"),
            Err(ArgError::NotAnInteger { label: "AMOUNT", token: "lots".into() })
        );

        let slots = [ArgSlot::eth_value("AMOUNT_IN_ETH")];
        let err = parse_args(&slots, "-1").unwrap_err();
        assert_eq!(err, ArgError::NotADecimal { label: "AMOUNT_IN_ETH", token: "-1".into() });
        assert!(err.to_string().contains("e.g. 0.01"));
    }

    #[test]
    fn addresses_are_not_validated_by_the_parser() {
        let slots = [ArgSlot::address("TOKEN_ADDRESS")];
        let parsed = parse_args(&slots, "not-an-address").unwrap();
        assert_eq!(parsed.args, vec![ArgValue::Address("not-an-address".into())]);
    }
}

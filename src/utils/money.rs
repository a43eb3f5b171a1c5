//! Currency helpers

use bigdecimal::{BigDecimal, RoundingMode};
use serde::{Deserialize, Deserializer};

use crate::types::*;

/// Round a monetary value to cents, half away from zero
pub fn round_currency(amount: &BigDecimal) -> BigDecimal {
    amount.with_scale_round(2, RoundingMode::HalfUp)
}

/// Format a value the way the back office displays it: `R$ 1.234,56`
pub fn format_brl(amount: &BigDecimal) -> String {
    let rounded = round_currency(amount);
    let negative = rounded < BigDecimal::from(0);
    let plain = rounded.abs().to_string();
    let (int_part, frac_part) = plain.split_once('.').unwrap_or((plain.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }

    format!(
        "{}R$ {},{:0<2}",
        if negative { "-" } else { "" },
        grouped,
        frac_part
    )
}

/// Parse an operator-typed amount. Accepts `1234.56`, `1234,56` and `1.234,56`.
pub fn parse_amount(input: &str) -> FinanceResult<BigDecimal> {
    let cleaned: String = input
        .trim()
        .trim_start_matches("R$")
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();

    if cleaned.is_empty() {
        return Err(FinanceError::MissingField("amount".to_string()));
    }

    let invalid = |reason: String| FinanceError::InvalidField {
        field: "amount".to_string(),
        reason: format!("'{}' {}", input.trim(), reason),
    };

    let normalized = match cleaned.rfind(',') {
        Some(comma) => {
            let (int_part, frac_part) = (&cleaned[..comma], &cleaned[comma + 1..]);
            if frac_part.contains('.') || int_part.contains(',') {
                return Err(invalid("mixes decimal conventions".to_string()));
            }
            if int_part.contains('.') && !is_grouped(int_part) {
                return Err(invalid("has misplaced thousands separators".to_string()));
            }
            format!("{}.{}", int_part.replace('.', ""), frac_part)
        }
        None => cleaned,
    };

    normalized
        .parse::<BigDecimal>()
        .map_err(|e| invalid(format!("is not a number ({})", e)))
}

/// `1.234.567`: a 1-3 digit lead followed by 3-digit groups
fn is_grouped(int_part: &str) -> bool {
    let digits = int_part.strip_prefix('-').unwrap_or(int_part);
    let mut groups = digits.split('.');
    let lead_ok = groups
        .next()
        .is_some_and(|g| (1..=3).contains(&g.len()) && g.chars().all(|c| c.is_ascii_digit()));
    lead_ok && groups.all(|g| g.len() == 3 && g.chars().all(|c| c.is_ascii_digit()))
}

/// Deserialize a nullable numeric column as zero
pub(crate) fn zero_if_null<'de, D>(deserializer: D) -> Result<BigDecimal, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<BigDecimal>::deserialize(deserializer)?.unwrap_or_else(|| BigDecimal::from(0)))
}

//! Number parsing and the two-decimal conventions of the budget spreadsheets.

use crate::models::PrecisionMode;

/// Parse free-form numeric text from budget exports.
///
/// "1.234,56" → 1234.56 (dot is thousands, comma decimal), "1234,56" → 1234.56,
/// "R$ 10,00" → 10.0. Anything else that is not a float yields `None`.
pub fn parse_number(raw: &str) -> Option<f64> {
    let mut s = raw.replace("R$", "").trim().to_string();
    if s.contains(',') && s.contains('.') {
        s = s.replace('.', "").replace(',', ".");
    } else if s.contains(',') {
        s = s.replace(',', ".");
    }
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Cut to two decimals from a 10-digit fixed rendering, so 1.005 stays 1.00.
pub fn truncate_2(value: f64) -> f64 {
    let s = format!("{:.10}", value);
    match s.split_once('.') {
        Some((int_part, dec_part)) => {
            let cut = &dec_part[..dec_part.len().min(2)];
            format!("{}.{}", int_part, cut).parse().unwrap_or(value)
        }
        None => value,
    }
}

/// Round to two decimals on the exact binary value, ties to even.
pub fn round_2(value: f64) -> f64 {
    format!("{:.2}", value).parse().unwrap_or(value)
}

pub fn apply_precision(value: Option<f64>, mode: PrecisionMode) -> Option<f64> {
    let value = value?;
    Some(match mode {
        PrecisionMode::Trunc => truncate_2(value),
        PrecisionMode::Round => round_2(value),
        PrecisionMode::Exact => value,
    })
}

/// Native counterpart of the sheet's `ROUNDDOWN(x, 2)`.
pub fn round_down_2(value: f64) -> f64 {
    truncate_2(value)
}

const CHARS_PER_LINE: usize = 85;
const LINE_HEIGHT: f64 = 15.0;

/// Row height for a wrapped description.
pub fn row_height_for(description: &str, base_height: f64) -> f64 {
    let chars = description.chars().count();
    let lines = chars.div_ceil(CHARS_PER_LINE).max(1);
    if lines == 1 {
        base_height
    } else {
        base_height.max(lines as f64 * LINE_HEIGHT)
    }
}

/// BDI tier used by the SUP discount schedule.
pub const SUP_BDI: f64 = 0.2882;
pub const SUP_DEDUCTION: f64 = 0.19;
pub const DEFAULT_DEDUCTION: f64 = 0.0601;

/// Discount applied over the BDI-inclusive total. Only the SUP tier gets its
/// own schedule; every other BDI falls through to the default one.
pub fn deduction_factor(bdi: f64) -> f64 {
    if (bdi - SUP_BDI).abs() < 0.001 {
        SUP_DEDUCTION
    } else {
        DEFAULT_DEDUCTION
    }
}

/// Parse a BDI percentage typed by a person ("28,82%", "35.18") into a fraction.
pub fn parse_bdi_percent(raw: &str) -> Result<f64, String> {
    let cleaned = raw.replace(',', ".").replace('%', "");
    let pct: f64 = cleaned
        .trim()
        .parse()
        .map_err(|_| format!("BDI must be a number: {}", raw.trim()))?;
    if pct < 0.0 {
        return Err("BDI cannot be negative".to_string());
    }
    if pct > 100.0 {
        return Err("BDI cannot exceed 100%".to_string());
    }
    Ok(pct / 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_brazilian_formats() {
        assert_eq!(parse_number("1.234,56"), Some(1234.56));
        assert_eq!(parse_number("1234,56"), Some(1234.56));
        assert_eq!(parse_number("R$ 10,00"), Some(10.0));
        assert_eq!(parse_number("  42 "), Some(42.0));
        assert_eq!(parse_number("1.5"), Some(1.5));
        assert_eq!(parse_number("abc"), None);
        assert_eq!(parse_number(""), None);
    }

    #[test]
    fn truncation_slices_digits_instead_of_rounding() {
        assert_eq!(truncate_2(1.005), 1.00);
        assert_eq!(truncate_2(1.999), 1.99);
        assert_eq!(truncate_2(-2.345), -2.34);
        assert_eq!(truncate_2(10.0), 10.0);
    }

    #[test]
    fn precision_modes() {
        assert_eq!(apply_precision(Some(1.005), PrecisionMode::Trunc), Some(1.00));
        // 1.005 is stored just below the tie, so it rounds down.
        assert_eq!(apply_precision(Some(1.005), PrecisionMode::Round), Some(1.0));
        assert_eq!(apply_precision(Some(2.5), PrecisionMode::Round), Some(2.5));
        assert_eq!(apply_precision(Some(1.236), PrecisionMode::Round), Some(1.24));
        assert_eq!(apply_precision(Some(1.005), PrecisionMode::Exact), Some(1.005));
        assert_eq!(apply_precision(None, PrecisionMode::Trunc), None);
    }

    #[test]
    fn row_height_grows_only_past_one_line() {
        assert_eq!(row_height_for("", 24.75), 24.75);
        assert_eq!(row_height_for(&"x".repeat(85), 24.75), 24.75);
        assert_eq!(row_height_for(&"x".repeat(86), 24.75), 30.0);
        assert_eq!(row_height_for(&"x".repeat(86), 40.0), 40.0);
        assert_eq!(row_height_for(&"x".repeat(300), 24.75), 60.0);
    }

    #[test]
    fn row_height_counts_characters_not_bytes() {
        let accented = "ç".repeat(85);
        assert_eq!(row_height_for(&accented, 24.75), 24.75);
    }

    #[test]
    fn deduction_follows_bdi_tier() {
        assert_eq!(deduction_factor(0.2882), 0.19);
        assert_eq!(deduction_factor(0.2889), 0.19);
        assert_eq!(deduction_factor(0.2875), 0.19);
        assert_eq!(deduction_factor(0.3518), 0.0601);
        assert_eq!(deduction_factor(0.0), 0.0601);
    }

    #[test]
    fn bdi_percent_parsing() {
        let sup = parse_bdi_percent("28,82%").unwrap();
        assert!((sup - 0.2882).abs() < 1e-12);
        assert_eq!(deduction_factor(sup), 0.19);
        assert_eq!(parse_bdi_percent("0"), Ok(0.0));
        assert!(parse_bdi_percent("-1").is_err());
        assert!(parse_bdi_percent("101").is_err());
        assert!(parse_bdi_percent("abc").is_err());
    }
}

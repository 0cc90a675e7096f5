use std::sync::OnceLock;

use regex::Regex;

fn non_digits() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // [^0-9], not \D: the regex crate's \D is Unicode-aware and would let
    // non-ASCII decimal digits through, breaking the 6-ASCII-digit output
    // guarantee (and the byte slice below).
    RE.get_or_init(|| Regex::new(r"[^0-9]+").expect("static regex"))
}

/// Canonicalize a raw dealer BAC into the fixed 6-digit group key.
///
/// Strips every non-digit, then left-pads to 6. Inputs with more than six
/// digits keep the last seven and drop the final one; historical exports
/// carry a trailing check digit, so `"123456789"` normalizes to `"345678"`.
/// This is the single normalization site for the whole crate: account,
/// subscription, invoice and lookup paths all route through here.
pub fn normalize_bac(raw: &str) -> String {
    let digits = non_digits().replace_all(raw, "");
    if digits.len() <= 6 {
        return format!("{:0>6}", digits);
    }
    let tail: &str = &digits[digits.len() - 7..];
    tail[..6].to_string()
}

/// Strict whole-dollar parse: strips `$`, commas and whitespace, then
/// requires an integer. Decimals and non-numerics are rejected, not rounded.
pub fn to_whole_dollars(raw: &str) -> Option<i64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !matches!(c, '$' | ',') && !c.is_whitespace())
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    // "450.00" style cells are still whole dollars; "12.34" is not.
    if let Some((int_part, frac)) = cleaned.split_once('.') {
        if !frac.is_empty() && frac.chars().all(|c| c == '0') {
            return int_part.parse().ok();
        }
        return None;
    }
    cleaned.parse().ok()
}

/// Whole-dollar parse for numeric spreadsheet cells.
pub fn float_to_whole_dollars(v: f64) -> Option<i64> {
    if v.is_finite() && v.fract() == 0.0 {
        Some(v as i64)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pads_to_six_digits() {
        assert_eq!(normalize_bac("123"), "000123");
        assert_eq!(normalize_bac("123456"), "123456");
        assert_eq!(normalize_bac(""), "000000");
    }

    #[test]
    fn test_strips_non_digits() {
        assert_eq!(normalize_bac("12-34x"), "001234");
        assert_eq!(normalize_bac(" BAC 4521 "), "004521");
        assert_eq!(normalize_bac("no digits here"), "000000");
    }

    #[test]
    fn test_truncates_long_inputs_dropping_check_digit() {
        assert_eq!(normalize_bac("123456789"), "345678");
        assert_eq!(normalize_bac("1234567"), "123456");
        assert_eq!(normalize_bac("00-1234567"), "123456");
    }

    #[test]
    fn test_normalize_is_total() {
        for raw in ["", "x", "ü", "9999999999999999", "  -  ", "١٢٣٤٥٦٧٨٩", "BAC-٤٥86١"] {
            let out = normalize_bac(raw);
            assert_eq!(out.len(), 6);
            assert!(out.chars().all(|c| c.is_ascii_digit()), "bad output {out:?}");
        }
    }

    #[test]
    fn test_to_whole_dollars() {
        assert_eq!(to_whole_dollars("2500"), Some(2500));
        assert_eq!(to_whole_dollars("$1,250"), Some(1250));
        assert_eq!(to_whole_dollars(" $125 "), Some(125));
        assert_eq!(to_whole_dollars("450.00"), Some(450));
        assert_eq!(to_whole_dollars("-300"), Some(-300));
        assert_eq!(to_whole_dollars("12.34"), None);
        assert_eq!(to_whole_dollars("abc"), None);
        assert_eq!(to_whole_dollars(""), None);
    }

    #[test]
    fn test_float_to_whole_dollars() {
        assert_eq!(float_to_whole_dollars(450.0), Some(450));
        assert_eq!(float_to_whole_dollars(12.34), None);
        assert_eq!(float_to_whole_dollars(f64::NAN), None);
    }
}

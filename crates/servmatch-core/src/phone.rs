/// Format an Israeli phone number for display.
///
/// Mobile numbers (10 digits) render as `05X-XXX-XXXX`, landlines (9 digits)
/// as `0X-XXX-XXXX`. A `972` country prefix is folded into a leading `0`.
/// Anything else is returned trimmed and otherwise untouched.
pub fn format_phone(raw: &str) -> String {
    let digits = raw.chars().filter(char::is_ascii_digit).collect::<String>();
    let local = match digits.strip_prefix("972") {
        Some(rest) if !rest.starts_with('0') => format!("0{rest}"),
        Some(rest) => rest.to_string(),
        None => digits,
    };
    if !local.starts_with('0') {
        return raw.trim().to_string();
    }
    match local.len() {
        10 => format!("{}-{}-{}", &local[..3], &local[3..6], &local[6..]),
        9 => format!("{}-{}-{}", &local[..2], &local[2..5], &local[5..]),
        _ => raw.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_mobile_and_landline() {
        assert_eq!(format_phone("0501234567"), "050-123-4567");
        assert_eq!(format_phone("03 123 4567"), "03-123-4567");
    }

    #[test]
    fn folds_country_prefix() {
        assert_eq!(format_phone("+972-50-123-4567"), "050-123-4567");
        assert_eq!(format_phone("972 0501234567"), "050-123-4567");
    }

    #[test]
    fn leaves_unrecognised_shapes_alone() {
        assert_eq!(format_phone(" *6020 "), "*6020");
        assert_eq!(format_phone("12345"), "12345");
    }
}

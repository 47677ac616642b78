/// Format an amount with thousands separators and two decimals: -1,234.56
pub fn amount(val: f64) -> String {
    let negative = val < 0.0 && format!("{:.2}", val.abs()) != "0.00";
    let cents = format!("{:.2}", val.abs());
    let (int_part, dec_part) = cents.split_once('.').unwrap_or((cents.as_str(), "00"));

    let mut with_commas = String::new();
    for (i, c) in int_part.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            with_commas.push(',');
        }
        with_commas.push(c);
    }
    let with_commas: String = with_commas.chars().rev().collect();

    if negative {
        format!("-{with_commas}.{dec_part}")
    } else {
        format!("{with_commas}.{dec_part}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_amount_formatting() {
        assert_eq!(amount(1234.56), "1,234.56");
        assert_eq!(amount(-500.00), "-500.00");
        assert_eq!(amount(0.0), "0.00");
        assert_eq!(amount(-0.001), "0.00");
        assert_eq!(amount(1000000.99), "1,000,000.99");
        assert_eq!(amount(42.10), "42.10");
    }
}

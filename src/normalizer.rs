use std::path::Path;
use std::str::FromStr;

use csv::StringRecord;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::categorizer::CategoryMatcher;
use crate::config::{AccountConfig, AmountColumns, Config, LogicalField};
use crate::error::{Result, TrackitError};
use crate::models::NormalizedRow;
use crate::rates::{month_key, RateCache, RateSource};

/// Parses an amount cell. When a thousands separator is configured only its
/// first occurrence is removed, so "1,234,567.89" does not parse.
pub fn parse_amount(raw: &str, thousands_separator: Option<&str>) -> Option<Decimal> {
    let cleaned = match thousands_separator {
        Some(sep) => raw.replacen(sep, "", 1),
        None => raw.to_string(),
    };
    Decimal::from_str(cleaned.trim()).ok()
}

/// Rounds to cents, halves away from zero.
pub fn round_cents(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Turns data rows of one account's CSV file into ledger rows.
pub struct RowNormalizer<'a> {
    account: &'a AccountConfig,
    base_currency: &'a str,
    categories: &'a CategoryMatcher,
    path: &'a Path,
}

impl<'a> RowNormalizer<'a> {
    pub fn new(config: &'a Config, account: &'a AccountConfig, path: &'a Path) -> Self {
        Self {
            account,
            base_currency: &config.base_currency,
            categories: &config.categories,
            path,
        }
    }

    pub fn normalize(
        &self,
        record: &StringRecord,
        line: u64,
        rates: &mut RateCache,
        source: &dyn RateSource,
    ) -> Result<NormalizedRow> {
        let columns = &self.account.column_map;

        let raw_date = self.cell(record, LogicalField::TransactionDate, line)?;
        let date = self.account.date_layout.parse(raw_date).ok_or_else(|| {
            self.parse_error(
                line,
                format!(
                    "could not parse date '{raw_date}' with layout '{}' ({}) for account {}",
                    self.account.date_layout.raw(),
                    self.account.date_layout.format(),
                    self.account.key
                ),
            )
        })?;

        let mut amount = match columns.amount_columns() {
            Some(AmountColumns::Single(idx)) => {
                let raw = self.cell_at(record, idx, LogicalField::Amount, line)?;
                self.amount(raw, line, "amount")?
            }
            Some(AmountColumns::Split { deposit, withdrawal }) => {
                let deposit = self.cell_at(record, deposit, LogicalField::Deposit, line)?;
                let withdrawal = self.cell_at(record, withdrawal, LogicalField::Withdrawal, line)?;
                let deposit = self.optional_amount(deposit, line, "deposit")?;
                let withdrawal = self.optional_amount(withdrawal, line, "withdrawal")?;
                deposit
                    .checked_sub(withdrawal)
                    .ok_or_else(|| self.out_of_range(line, deposit, withdrawal))?
            }
            None => {
                return Err(TrackitError::FileShape {
                    path: self.path.to_path_buf(),
                    reason: format!(
                        "account {} must define an amount column or both deposit and withdrawal columns",
                        self.account.key
                    ),
                })
            }
        };

        if self.account.debit_as_positive {
            amount = -amount;
        }

        if self.account.currency != self.base_currency {
            let month = month_key(date);
            let rate = rates
                .get(source, &self.account.currency, &month)?
                .ok_or_else(|| TrackitError::RateMissing {
                    currency: self.account.currency.clone(),
                    base: self.base_currency.to_string(),
                    month: month.clone(),
                    path: self.path.to_path_buf(),
                })?;
            amount = amount
                .checked_mul(rate)
                .ok_or_else(|| self.out_of_range(line, amount, rate))?;
        }
        let amount = round_cents(amount);

        let counter_party = self.cell(record, LogicalField::CounterParty, line)?.trim().to_string();
        let category = self.categories.categorize(&counter_party).map(str::to_string);

        Ok(NormalizedRow {
            date,
            counter_party,
            amount,
            category,
        })
    }

    fn cell<'r>(&self, record: &'r StringRecord, field: LogicalField, line: u64) -> Result<&'r str> {
        match self.account.column_map.get(field) {
            Some(idx) => self.cell_at(record, idx, field, line),
            None => Err(TrackitError::FileShape {
                path: self.path.to_path_buf(),
                reason: format!("account {} has no '{field}' column", self.account.key),
            }),
        }
    }

    fn cell_at<'r>(&self, record: &'r StringRecord, idx: usize, field: LogicalField, line: u64) -> Result<&'r str> {
        record.get(idx).ok_or_else(|| TrackitError::FileShape {
            path: self.path.to_path_buf(),
            reason: format!("line {line} has no '{field}' column ({} cells)", record.len()),
        })
    }

    fn amount(&self, raw: &str, line: u64, what: &str) -> Result<Decimal> {
        parse_amount(raw, self.account.thousands_separator.as_deref())
            .ok_or_else(|| self.parse_error(line, format!("could not parse {what} '{raw}'")))
    }

    /// Deposit/withdrawal cells are commonly blank on the side that does not
    /// apply; blank counts as zero.
    fn optional_amount(&self, raw: &str, line: u64, what: &str) -> Result<Decimal> {
        if raw.trim().is_empty() {
            return Ok(Decimal::ZERO);
        }
        self.amount(raw, line, what)
    }

    fn out_of_range(&self, line: u64, lhs: Decimal, rhs: Decimal) -> TrackitError {
        self.parse_error(line, format!("amount out of range ({lhs}, {rhs})"))
    }

    fn parse_error(&self, line: u64, reason: String) -> TrackitError {
        TrackitError::Parse {
            path: self.path.to_path_buf(),
            line,
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use chrono::NaiveDate;

    const CONFIG: &str = r#"
base_currency: USD
accounts:
  checking:
    currency: USD
    date_layout: 01/02/2006
    thousands_separator: ","
    headers:
      - Date: transaction_date
      - Payee: counter_party
      - Amount: amount
  savings:
    currency: USD
    date_layout: 2006-01-02
    headers:
      - Date: transaction_date
      - Description: counter_party
      - Deposit: deposit
      - Withdrawal: withdrawal
  euro_card:
    currency: EUR
    date_layout: 02.01.2006
    debit_as_positive: true
    headers:
      - Datum: transaction_date
      - Empfaenger: counter_party
      - Betrag: amount
categories:
  groceries: ["(?i)market"]
  dining: ["(?i)cafe", "(?i)market"]
"#;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn record(cells: &[&str]) -> StringRecord {
        StringRecord::from(cells.to_vec())
    }

    fn eur_rates() -> HashMap<(String, String), Decimal> {
        let mut rates = HashMap::new();
        rates.insert(("EUR".to_string(), "2024-03".to_string()), dec("1.1"));
        rates
    }

    fn normalize(account: &str, cells: &[&str]) -> Result<NormalizedRow> {
        let config = Config::from_yaml(CONFIG).unwrap();
        let acct = config.account(account).unwrap();
        let path = Path::new("data/file.csv");
        let normalizer = RowNormalizer::new(&config, acct, path);
        normalizer.normalize(&record(cells), 2, &mut RateCache::new(), &eur_rates())
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("1,234.56", Some(",")), Some(dec("1234.56")));
        assert_eq!(parse_amount("-42.50", None), Some(dec("-42.50")));
        assert_eq!(parse_amount(" 7 ", None), Some(dec("7")));
        assert_eq!(parse_amount("1.234,56", Some(".")), None);
        assert_eq!(parse_amount("abc", None), None);
        assert_eq!(parse_amount("", None), None);
    }

    #[test]
    fn test_parse_amount_removes_only_first_separator() {
        assert_eq!(parse_amount("1,234,567.89", Some(",")), None);
        assert_eq!(parse_amount("1'234", Some("'")), Some(dec("1234")));
    }

    #[test]
    fn test_round_cents_half_away_from_zero() {
        assert_eq!(round_cents(dec("11.0055")), dec("11.01"));
        assert_eq!(round_cents(dec("-11.0055")), dec("-11.01"));
        assert_eq!(round_cents(dec("2.345")), dec("2.35"));
        assert_eq!(round_cents(dec("2.344")), dec("2.34"));
    }

    #[test]
    fn test_single_amount_column() {
        let row = normalize("checking", &["03/15/2024", "Corner Market", "-1,250.00"]).unwrap();
        assert_eq!(row.date, NaiveDate::from_ymd_opt(2024, 3, 15).unwrap());
        assert_eq!(row.amount, dec("-1250.00"));
        assert_eq!(row.counter_party, "Corner Market");
        assert_eq!(row.category.as_deref(), Some("groceries"));
    }

    #[test]
    fn test_deposit_minus_withdrawal() {
        let row = normalize("savings", &["2024-03-01", "Transfer", "120.00", "20.00"]).unwrap();
        assert_eq!(row.amount, dec("100.00"));
    }

    #[test]
    fn test_blank_withdrawal_counts_as_zero() {
        let row = normalize("savings", &["2024-03-01", "Salary", "500", ""]).unwrap();
        assert_eq!(row.amount, dec("500"));
        let row = normalize("savings", &["2024-03-02", "Rent", "", "800"]).unwrap();
        assert_eq!(row.amount, dec("-800"));
    }

    #[test]
    fn test_conversion_rounds_converted_value() {
        // debit_as_positive flips 10.005 to -10.005, then * 1.1 = -11.0055
        let row = normalize("euro_card", &["15.03.2024", "Cafe Central", "10.005"]).unwrap();
        assert_eq!(row.amount, dec("-11.01"));
        assert_eq!(row.category.as_deref(), Some("dining"));
    }

    #[test]
    fn test_conversion_without_sign_flip() {
        let config = Config::from_yaml(&CONFIG.replace("debit_as_positive: true", "debit_as_positive: false")).unwrap();
        let acct = config.account("euro_card").unwrap();
        let normalizer = RowNormalizer::new(&config, acct, Path::new("x.csv"));
        let row = normalizer
            .normalize(&record(&["15.03.2024", "Shop", "10.005"]), 2, &mut RateCache::new(), &eur_rates())
            .unwrap();
        assert_eq!(row.amount, dec("11.01"));
        assert_eq!(row.category, None);
    }

    #[test]
    fn test_missing_rate_is_fatal() {
        let err = normalize("euro_card", &["15.04.2024", "Shop", "10.00"]).unwrap_err();
        match err {
            TrackitError::RateMissing { currency, base, month, .. } => {
                assert_eq!(currency, "EUR");
                assert_eq!(base, "USD");
                assert_eq!(month, "2024-04");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_bad_date_is_parse_error() {
        let err = normalize("checking", &["2024-03-15", "Shop", "1.00"]).unwrap_err();
        assert!(matches!(err, TrackitError::Parse { line: 2, .. }), "{err}");
    }

    #[test]
    fn test_bad_amount_is_parse_error() {
        let err = normalize("checking", &["03/15/2024", "Shop", "twelve"]).unwrap_err();
        assert!(matches!(err, TrackitError::Parse { .. }), "{err}");
    }

    #[test]
    fn test_short_row_is_file_shape_error() {
        let err = normalize("checking", &["03/15/2024", "Shop"]).unwrap_err();
        assert!(matches!(err, TrackitError::FileShape { .. }), "{err}");
    }

    #[test]
    fn test_base_currency_amount_is_rounded_to_cents() {
        let row = normalize("checking", &["03/15/2024", "Shop", "10.005"]).unwrap();
        assert_eq!(row.amount, dec("10.01"));
        let row = normalize("savings", &["2024-03-01", "Split", "0.004", "0.001"]).unwrap();
        assert_eq!(row.amount, dec("0.00"));
    }

    #[test]
    fn test_conversion_overflow_is_parse_error() {
        let mut rates = HashMap::new();
        rates.insert(("EUR".to_string(), "2024-03".to_string()), dec("2"));
        let config = Config::from_yaml(CONFIG).unwrap();
        let acct = config.account("euro_card").unwrap();
        let normalizer = RowNormalizer::new(&config, acct, Path::new("x.csv"));
        let err = normalizer
            .normalize(
                &record(&["15.03.2024", "Shop", "79228162514264337593543950335"]),
                7,
                &mut RateCache::new(),
                &rates,
            )
            .unwrap_err();
        assert!(
            matches!(err, TrackitError::Parse { line: 7, ref reason, .. } if reason.contains("out of range")),
            "{err}"
        );
    }

    #[test]
    fn test_deposit_withdrawal_overflow_is_parse_error() {
        let err = normalize("savings", &["2024-03-01", "Huge", "79228162514264337593543950335", "-1"]).unwrap_err();
        assert!(
            matches!(err, TrackitError::Parse { line: 2, ref reason, .. } if reason.contains("out of range")),
            "{err}"
        );
    }

    #[test]
    fn test_rate_cache_is_shared_across_rows() {
        let config = Config::from_yaml(CONFIG).unwrap();
        let acct = config.account("euro_card").unwrap();
        let normalizer = RowNormalizer::new(&config, acct, Path::new("x.csv"));
        let mut cache = RateCache::new();
        let rates = eur_rates();
        for day in ["01", "02", "03"] {
            let date = format!("{day}.03.2024");
            normalizer
                .normalize(&record(&[date.as_str(), "Shop", "1.00"]), 2, &mut cache, &rates)
                .unwrap();
        }
        assert_eq!(cache.lookups(), 1);
    }
}

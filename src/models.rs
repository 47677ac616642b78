use chrono::NaiveDate;
use rust_decimal::Decimal;

#[derive(Debug, Clone)]
pub struct Category {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct CurrencyRate {
    pub id: i64,
    pub from_symbol: String,
    pub month: String,
    pub rate: Decimal,
}

/// A transaction row as shown by listings, joined with its account and
/// category names.
#[derive(Debug, Clone)]
pub struct Transaction {
    pub id: i64,
    pub date: String,
    pub counter_party: String,
    pub account: String,
    pub category: Option<String>,
    pub amount: f64,
    pub ignore_when_summing: bool,
}

/// One CSV row after normalization, ready to insert.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRow {
    pub date: NaiveDate,
    pub counter_party: String,
    /// Signed, in the base currency.
    pub amount: Decimal,
    pub category: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CategoryTotal {
    pub category: String,
    pub total: f64,
}

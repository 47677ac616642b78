use std::collections::HashMap;
use std::str::FromStr;

use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension};
use rust_decimal::Decimal;

use crate::error::{Result, TrackitError};
use crate::models::CurrencyRate;

/// `YYYY-MM` key a rate is defined for.
pub fn month_key(date: NaiveDate) -> String {
    date.format("%Y-%m").to_string()
}

pub fn is_valid_month(month: &str) -> bool {
    NaiveDate::parse_from_str(&format!("{month}-01"), "%Y-%m-%d").is_ok() && month.len() == 7
}

/// Somewhere conversion rates into the base currency can be read from.
pub trait RateSource {
    fn rate(&self, currency: &str, month: &str) -> Result<Option<Decimal>>;
}

impl RateSource for Connection {
    fn rate(&self, currency: &str, month: &str) -> Result<Option<Decimal>> {
        let raw: Option<String> = self
            .query_row(
                "SELECT rate FROM rates WHERE from_symbol = ?1 AND month = ?2",
                [currency, month],
                |r| r.get(0),
            )
            .optional()?;
        raw.map(|s| parse_rate(&s)).transpose()
    }
}

impl RateSource for HashMap<(String, String), Decimal> {
    fn rate(&self, currency: &str, month: &str) -> Result<Option<Decimal>> {
        Ok(self.get(&(currency.to_string(), month.to_string())).copied())
    }
}

pub fn parse_rate(raw: &str) -> Result<Decimal> {
    Decimal::from_str(raw.trim()).map_err(|e| TrackitError::Other(format!("invalid rate '{raw}': {e}")))
}

/// Read-through cache of rates for one import run, keyed by (month, currency).
/// Misses are looked up in the source and remembered; absent rates are not.
#[derive(Debug, Default)]
pub struct RateCache {
    rates: HashMap<(String, String), Decimal>,
    lookups: usize,
}

impl RateCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&mut self, source: &dyn RateSource, currency: &str, month: &str) -> Result<Option<Decimal>> {
        let key = (month.to_string(), currency.to_string());
        if let Some(rate) = self.rates.get(&key) {
            return Ok(Some(*rate));
        }
        self.lookups += 1;
        let rate = source.rate(currency, month)?;
        if let Some(rate) = rate {
            log::debug!("loaded rate {currency} {month} = {rate}");
            self.rates.insert(key, rate);
        }
        Ok(rate)
    }

    /// Number of times the cache had to go to its source.
    pub fn lookups(&self) -> usize {
        self.lookups
    }
}

// ---------------------------------------------------------------------------
// Currency and rate rows
// ---------------------------------------------------------------------------

pub fn create_currency(conn: &Connection, symbol: &str) -> Result<String> {
    let symbol = symbol.trim().to_ascii_uppercase();
    if symbol.len() != 3 || !symbol.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(TrackitError::Other(format!("currency symbol '{symbol}' must be 3 letters")));
    }
    conn.execute("INSERT INTO currencies (symbol) VALUES (?1)", [&symbol])?;
    Ok(symbol)
}

pub fn list_currencies(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare("SELECT symbol FROM currencies ORDER BY symbol")?;
    let rows = stmt
        .query_map([], |r| r.get(0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn delete_currency(conn: &Connection, symbol: &str) -> Result<bool> {
    let n = conn.execute(
        "DELETE FROM currencies WHERE symbol = ?1",
        [symbol.trim().to_ascii_uppercase()],
    )?;
    Ok(n > 0)
}

/// Renames a currency symbol. Its rates follow the new symbol.
pub fn update_currency(conn: &Connection, old: &str, new: &str) -> Result<String> {
    let old = old.trim().to_ascii_uppercase();
    let new = new.trim().to_ascii_uppercase();
    for symbol in [&old, &new] {
        if symbol.len() != 3 || !symbol.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(TrackitError::Other(format!("currency symbol '{symbol}' must be 3 letters")));
        }
    }
    let n = conn.execute("UPDATE currencies SET symbol = ?1 WHERE symbol = ?2", [&new, &old])?;
    if n == 0 {
        return Err(TrackitError::Other(format!("currency '{old}' not found")));
    }
    Ok(new)
}

pub fn create_rate(conn: &Connection, from_symbol: &str, month: &str, rate: Decimal) -> Result<()> {
    if !is_valid_month(month) {
        return Err(TrackitError::Other(format!("month '{month}' must be in YYYY-MM format")));
    }
    if rate <= Decimal::ZERO {
        return Err(TrackitError::Other(format!("rate {rate} must be positive")));
    }
    let symbol = from_symbol.trim().to_ascii_uppercase();
    let known: bool = conn
        .prepare_cached("SELECT 1 FROM currencies WHERE symbol = ?1")?
        .exists([&symbol])?;
    if !known {
        return Err(TrackitError::Other(format!(
            "currency '{symbol}' not found. Create it first with `trackit currency create`"
        )));
    }
    conn.execute(
        "INSERT INTO rates (from_symbol, month, rate) VALUES (?1, ?2, ?3) \
         ON CONFLICT (from_symbol, month) DO UPDATE SET rate = excluded.rate",
        rusqlite::params![symbol, month, rate.to_string()],
    )?;
    Ok(())
}

pub fn list_rates(conn: &Connection) -> Result<Vec<CurrencyRate>> {
    let mut stmt = conn.prepare("SELECT id, from_symbol, month, rate FROM rates ORDER BY month, from_symbol")?;
    let raw: Vec<(i64, String, String, String)> = stmt
        .query_map([], |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?)))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    raw.into_iter()
        .map(|(id, from_symbol, month, rate)| {
            Ok(CurrencyRate {
                id,
                from_symbol,
                month,
                rate: parse_rate(&rate)?,
            })
        })
        .collect()
}

pub fn delete_rate(conn: &Connection, id: i64) -> Result<bool> {
    Ok(conn.execute("DELETE FROM rates WHERE id = ?1", [id])? > 0)
}

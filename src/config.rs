use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::path::Path;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer};

use crate::categorizer::CategoryMatcher;
use crate::error::{Result, TrackitError};

pub const CONFIG_FILE_NAME: &str = "trackit.yaml";

// ---------------------------------------------------------------------------
// Logical fields
// ---------------------------------------------------------------------------

/// The canonical transaction attributes a CSV column can feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogicalField {
    TransactionDate,
    CounterParty,
    Amount,
    Deposit,
    Withdrawal,
}

impl LogicalField {
    pub fn key(&self) -> &'static str {
        match self {
            Self::TransactionDate => "transaction_date",
            Self::CounterParty => "counter_party",
            Self::Amount => "amount",
            Self::Deposit => "deposit",
            Self::Withdrawal => "withdrawal",
        }
    }
}

impl FromStr for LogicalField {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim() {
            "transaction_date" => Ok(Self::TransactionDate),
            "counter_party" => Ok(Self::CounterParty),
            "amount" => Ok(Self::Amount),
            "deposit" => Ok(Self::Deposit),
            // "withdrawl" is the spelling older config files use
            "withdrawal" | "withdrawl" => Ok(Self::Withdrawal),
            other => Err(format!("unknown logical field '{other}'")),
        }
    }
}

impl fmt::Display for LogicalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

// ---------------------------------------------------------------------------
// Column resolver
// ---------------------------------------------------------------------------

/// One configured CSV column and the logical field it feeds, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct HeaderColumn {
    pub name: String,
    pub field: Option<LogicalField>,
}

/// How an account expresses the signed amount of a row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AmountColumns {
    Single(usize),
    Split { deposit: usize, withdrawal: usize },
}

/// Logical field -> zero-based column position, derived from the configured
/// header order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnMap {
    indices: HashMap<LogicalField, usize>,
}

impl ColumnMap {
    pub fn resolve(headers: &[HeaderColumn]) -> Self {
        let indices = headers
            .iter()
            .enumerate()
            .filter_map(|(i, h)| h.field.map(|field| (field, i)))
            .collect();
        Self { indices }
    }

    pub fn get(&self, field: LogicalField) -> Option<usize> {
        self.indices.get(&field).copied()
    }

    pub fn contains(&self, field: LogicalField) -> bool {
        self.indices.contains_key(&field)
    }

    /// A single amount column wins over a deposit/withdrawal pair.
    pub fn amount_columns(&self) -> Option<AmountColumns> {
        if let Some(idx) = self.get(LogicalField::Amount) {
            return Some(AmountColumns::Single(idx));
        }
        match (self.get(LogicalField::Deposit), self.get(LogicalField::Withdrawal)) {
            (Some(deposit), Some(withdrawal)) => Some(AmountColumns::Split { deposit, withdrawal }),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Date layouts
// ---------------------------------------------------------------------------

// Longest tokens first so "2006" is not read as "2" followed by "006".
const REFERENCE_TOKENS: &[(&str, &str)] = &[
    ("January", "%B"),
    ("Monday", "%A"),
    ("2006", "%Y"),
    ("Jan", "%b"),
    ("Mon", "%a"),
    ("_2", "%e"),
    ("01", "%m"),
    ("02", "%d"),
    ("06", "%y"),
    ("1", "%m"),
    ("2", "%d"),
];

/// A date layout as written in the config, plus the chrono format it maps to.
///
/// Layouts containing `%` are taken as chrono format strings. Anything else is
/// read as a reference-date layout where `2006-01-02` stands for year, month
/// and day.
#[derive(Debug, Clone, PartialEq)]
pub struct DateLayout {
    raw: String,
    format: String,
}

impl DateLayout {
    pub fn new(raw: &str) -> Self {
        let format = if raw.contains('%') {
            raw.to_string()
        } else {
            translate_reference_layout(raw)
        };
        Self {
            raw: raw.to_string(),
            format,
        }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn format(&self) -> &str {
        &self.format
    }

    pub fn parse(&self, value: &str) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(value.trim(), &self.format).ok()
    }
}

fn translate_reference_layout(layout: &str) -> String {
    let mut out = String::with_capacity(layout.len() * 2);
    let mut rest = layout;
    'outer: while !rest.is_empty() {
        for (token, spec) in REFERENCE_TOKENS {
            if let Some(tail) = rest.strip_prefix(token) {
                out.push_str(spec);
                rest = tail;
                continue 'outer;
            }
        }
        let mut chars = rest.chars();
        if let Some(c) = chars.next() {
            if c == '%' {
                out.push_str("%%");
            } else {
                out.push(c);
            }
        }
        rest = chars.as_str();
    }
    out
}

// ---------------------------------------------------------------------------
// Raw document
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(default)]
    base_currency: Option<String>,
    #[serde(deserialize_with = "ordered_map")]
    accounts: Vec<(String, RawAccount)>,
    #[serde(default, deserialize_with = "ordered_map")]
    categories: Vec<(String, Vec<String>)>,
}

#[derive(Debug, Deserialize)]
struct RawAccount {
    currency: String,
    date_layout: String,
    #[serde(default)]
    thousands_separator: Option<String>,
    #[serde(default)]
    debit_as_positive: bool,
    headers: Vec<RawHeader>,
}

/// A header entry is either `{column: field}` or `{name: column, table: field}`.
/// Only a map with exactly the `name` and `table` keys is the long form, so a
/// CSV column that is itself called `name` still works in the short form.
#[derive(Debug, Deserialize)]
#[serde(from = "HashMap<String, Option<String>>")]
enum RawHeader {
    Named { name: String, table: Option<String> },
    Pair(HashMap<String, Option<String>>),
}

impl From<HashMap<String, Option<String>>> for RawHeader {
    fn from(mut map: HashMap<String, Option<String>>) -> Self {
        let long_form = map.len() == 2
            && matches!(map.get("name"), Some(Some(_)))
            && map.contains_key("table");
        if !long_form {
            return Self::Pair(map);
        }
        match (map.remove("name").flatten(), map.remove("table")) {
            (Some(name), Some(table)) => Self::Named { name, table },
            _ => Self::Pair(map),
        }
    }
}

/// Deserializes a YAML mapping keeping document order.
fn ordered_map<'de, D, V>(deserializer: D) -> std::result::Result<Vec<(String, V)>, D::Error>
where
    D: Deserializer<'de>,
    V: Deserialize<'de>,
{
    struct OrderedVisitor<V>(PhantomData<V>);

    impl<'de, V: Deserialize<'de>> Visitor<'de> for OrderedVisitor<V> {
        type Value = Vec<(String, V)>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a mapping")
        }

        fn visit_unit<E: serde::de::Error>(self) -> std::result::Result<Self::Value, E> {
            Ok(Vec::new())
        }

        fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> std::result::Result<Self::Value, A::Error> {
            let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
            while let Some((key, value)) = map.next_entry::<String, V>()? {
                entries.push((key, value));
            }
            Ok(entries)
        }
    }

    deserializer.deserialize_map(OrderedVisitor(PhantomData))
}

// ---------------------------------------------------------------------------
// Validated model
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct AccountConfig {
    pub key: String,
    pub currency: String,
    pub date_layout: DateLayout,
    pub thousands_separator: Option<String>,
    pub debit_as_positive: bool,
    pub columns: Vec<HeaderColumn>,
    pub column_map: ColumnMap,
}

impl AccountConfig {
    /// Every CSV column name a file for this account must contain.
    pub fn headers(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }
}

#[derive(Debug)]
pub struct Config {
    pub base_currency: String,
    pub accounts: Vec<AccountConfig>,
    pub categories: CategoryMatcher,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            TrackitError::Config(format!("could not read config file at {}: {e}", path.display()))
        })?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let raw: RawConfig = serde_yaml::from_str(content)?;
        Self::validate(raw)
    }

    fn validate(raw: RawConfig) -> Result<Self> {
        let base_currency = match raw.base_currency.as_deref() {
            Some(code) => normalize_currency(code)
                .ok_or_else(|| TrackitError::Config(format!("base_currency '{code}' is not a 3-letter code")))?,
            None => return Err(TrackitError::Config("base_currency is required".to_string())),
        };

        if raw.accounts.is_empty() {
            return Err(TrackitError::Config("no accounts defined".to_string()));
        }

        let mut accounts = Vec::with_capacity(raw.accounts.len());
        for (key, account) in raw.accounts {
            accounts.push(validate_account(key, account)?);
        }

        let categories = CategoryMatcher::compile(raw.categories)?;

        Ok(Self {
            base_currency,
            accounts,
            categories,
        })
    }

    pub fn account(&self, key: &str) -> Option<&AccountConfig> {
        self.accounts.iter().find(|a| a.key == key)
    }

    /// Like `account`, but an unknown key is an error naming the valid ones.
    pub fn require_account(&self, key: &str) -> Result<&AccountConfig> {
        self.account(key).ok_or_else(|| {
            let known: Vec<&str> = self.accounts.iter().map(|a| a.key.as_str()).collect();
            TrackitError::Config(format!(
                "invalid account specified: {key}. Valid account keys are: {}",
                known.join(", ")
            ))
        })
    }
}

fn normalize_currency(code: &str) -> Option<String> {
    let code = code.trim();
    if code.len() == 3 && code.chars().all(|c| c.is_ascii_alphabetic()) {
        Some(code.to_ascii_uppercase())
    } else {
        None
    }
}

fn validate_account(key: String, raw: RawAccount) -> Result<AccountConfig> {
    let err = |msg: String| TrackitError::Config(format!("account '{key}': {msg}"));

    let currency = normalize_currency(&raw.currency)
        .ok_or_else(|| err(format!("currency '{}' is not a 3-letter code", raw.currency)))?;

    if raw.date_layout.trim().is_empty() {
        return Err(err("date_layout is empty".to_string()));
    }

    let mut columns = Vec::with_capacity(raw.headers.len());
    for header in raw.headers {
        let (name, table) = match header {
            RawHeader::Named { name, table } => (name, table),
            RawHeader::Pair(map) => {
                if map.len() != 1 {
                    return Err(err(format!(
                        "header entries must map exactly one column, found {}",
                        map.len()
                    )));
                }
                match map.into_iter().next() {
                    Some(entry) => entry,
                    None => continue,
                }
            }
        };
        let field = match table.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(t) => Some(t.parse::<LogicalField>().map_err(&err)?),
        };
        if let Some(f) = field {
            if columns.iter().any(|c: &HeaderColumn| c.field == Some(f)) {
                return Err(err(format!("logical field '{f}' is mapped more than once")));
            }
        }
        columns.push(HeaderColumn { name, field });
    }

    let column_map = ColumnMap::resolve(&columns);
    for required in [LogicalField::TransactionDate, LogicalField::CounterParty] {
        if !column_map.contains(required) {
            return Err(err(format!("missing a column for '{required}'")));
        }
    }
    if column_map.amount_columns().is_none() {
        return Err(err(
            "must define an 'amount' column or both 'deposit' and 'withdrawal' columns".to_string(),
        ));
    }

    let thousands_separator = raw.thousands_separator.filter(|s| !s.is_empty());

    Ok(AccountConfig {
        date_layout: DateLayout::new(raw.date_layout.trim()),
        key,
        currency,
        thousands_separator,
        debit_as_positive: raw.debit_as_positive,
        columns,
        column_map,
    })
}

use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use csv::StringRecord;
use rusqlite::Connection;
use rust_decimal::prelude::ToPrimitive;

use crate::checksum::{file_digest, should_process, stored_digest};
use crate::config::{AccountConfig, Config};
use crate::db::{ensure_account, ensure_categories, ensure_category};
use crate::error::{Result, TrackitError};
use crate::models::NormalizedRow;
use crate::normalizer::RowNormalizer;
use crate::rates::RateCache;

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum FileOutcome {
    /// Content hash matches the last import.
    Skipped,
    /// Rows were committed. `replaced` counts rows from an earlier version of
    /// the same file that were removed first.
    Imported { rows: usize, replaced: usize },
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct ImportSummary {
    pub imported_files: usize,
    pub skipped_files: usize,
    pub rows: usize,
}

// ---------------------------------------------------------------------------
// Directory walk
// ---------------------------------------------------------------------------

/// Imports every CSV file under `data_dir`, one database transaction per file.
/// Stops at the first error; files committed before it stay committed.
pub fn import_dir(conn: &mut Connection, config: &Config, data_dir: &Path) -> Result<ImportSummary> {
    ensure_categories(conn, &config.categories.names())?;

    log::info!("walking {}", data_dir.display());
    let files = collect_csv_files(data_dir)?;

    let mut rates = RateCache::new();
    let mut summary = ImportSummary::default();
    for path in files {
        let account = account_for_file(config, &path)?;
        let identity = file_identity(data_dir, &path);
        log::debug!("found CSV file {identity} for account {}", account.key);

        match import_file(conn, config, account, &mut rates, &identity, &path)? {
            FileOutcome::Skipped => summary.skipped_files += 1,
            FileOutcome::Imported { rows, replaced } => {
                if replaced > 0 {
                    log::debug!("{identity}: {replaced} rows replaced by {rows}");
                }
                summary.imported_files += 1;
                summary.rows += rows;
            }
        }
    }
    Ok(summary)
}

/// All `.csv` files below `dir`, depth first, sorted by name at each level.
/// Hidden entries are not visited.
pub fn collect_csv_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = std::fs::read_dir(dir)?
        .map(|e| e.map(|e| e.path()))
        .collect::<std::result::Result<Vec<_>, _>>()?;
    entries.sort();

    let mut files = Vec::new();
    for path in entries {
        let hidden = path
            .file_name()
            .and_then(|n| n.to_str())
            .map_or(false, |n| n.starts_with('.'));
        if hidden {
            continue;
        }
        if path.is_dir() {
            files.extend(collect_csv_files(&path)?);
        } else if is_csv(&path) {
            files.push(path);
        }
    }
    Ok(files)
}

fn is_csv(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map_or(false, |e| e.eq_ignore_ascii_case("csv"))
}

/// The configured account whose key equals the file stem.
pub fn account_for_file<'c>(config: &'c Config, path: &Path) -> Result<&'c AccountConfig> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .and_then(|stem| config.account(stem))
        .ok_or_else(|| TrackitError::FileShape {
            path: path.to_path_buf(),
            reason: "file name must be the name of an account defined in trackit.yaml with a .csv extension"
                .to_string(),
        })
}

/// Path relative to the data directory, `/`-separated.
fn file_identity(data_dir: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(data_dir).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

// ---------------------------------------------------------------------------
// import_file
// ---------------------------------------------------------------------------

/// Imports one file inside a single database transaction. Any error drops the
/// transaction, which rolls back every row and leaves the stored hash as it was.
pub fn import_file(
    conn: &mut Connection,
    config: &Config,
    account: &AccountConfig,
    rates: &mut RateCache,
    identity: &str,
    path: &Path,
) -> Result<FileOutcome> {
    let mut file = File::open(path)?;
    let digest = file_digest(&mut file)?;

    let tx = conn.transaction()?;
    let stored = stored_digest(&tx, identity)?;
    if !should_process(stored.as_deref(), &digest) {
        log::info!("{identity} has not changed, skipping");
        return Ok(FileOutcome::Skipped);
    }

    let records = read_records(file)?;
    check_header(&records, account, path)?;

    let (account_id, created) = ensure_account(&tx, &account.key, &account.currency)?;
    if created {
        log::info!("created account {} ({}) with id {account_id}", account.key, account.currency);
    }

    // Ignore flags set on the previous version's rows carry over to matching new rows.
    let (replaced, mut carried) = if stored.is_some() {
        let carried = ignored_rows(&tx, identity)?;
        let n = tx.execute(
            "DELETE FROM transactions WHERE file_id = (SELECT id FROM files WHERE name = ?1)",
            [identity],
        )?;
        log::info!("{identity} changed, replacing {n} earlier rows");
        (n, carried)
    } else {
        log::info!("{identity} has never been imported");
        (0, HashMap::new())
    };

    // Nothing below is visible to other connections until commit.
    tx.execute(
        "INSERT INTO files (name, hash) VALUES (?1, ?2) \
         ON CONFLICT (name) DO UPDATE SET hash = excluded.hash, updated_at = datetime('now')",
        [identity, digest.as_str()],
    )?;
    let file_id: i64 = tx.query_row("SELECT id FROM files WHERE name = ?1", [identity], |r| r.get(0))?;

    let normalizer = RowNormalizer::new(config, account, path);
    let mut category_ids: HashMap<String, i64> = HashMap::new();
    let mut rows = 0usize;
    for (i, record) in records.iter().enumerate().skip(1) {
        let line = record.position().map_or(i as u64 + 1, |p| p.line());
        let row = normalizer.normalize(record, line, rates, &*tx)?;
        let category_id = match &row.category {
            Some(name) => Some(match category_ids.get(name) {
                Some(id) => *id,
                None => {
                    let id = ensure_category(&tx, name)?;
                    category_ids.insert(name.clone(), id);
                    id
                }
            }),
            None => None,
        };
        let amount = row.amount.to_f64().ok_or_else(|| TrackitError::Parse {
            path: path.to_path_buf(),
            line,
            reason: format!("amount {} is out of range", row.amount),
        })?;
        let key = row_key(&row.date.format("%Y-%m-%d").to_string(), amount, &row.counter_party);
        let ignored = match carried.get_mut(&key) {
            Some(left) if *left > 0 => {
                *left -= 1;
                true
            }
            _ => false,
        };
        insert_transaction(&tx, account_id, category_id, file_id, &row, amount, ignored)?;
        rows += 1;
    }

    tx.commit()?;
    log::info!("committed {rows} rows from {identity}");
    Ok(FileOutcome::Imported { rows, replaced })
}

fn read_records(file: File) -> Result<Vec<StringRecord>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(BufReader::new(file));
    let records = rdr.records().collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(records)
}

/// Checks that the file has a header row plus data, and that every configured
/// column name appears in the header row.
fn check_header(records: &[StringRecord], account: &AccountConfig, path: &Path) -> Result<()> {
    if records.len() < 2 {
        return Err(TrackitError::FileShape {
            path: path.to_path_buf(),
            reason: format!("expected a header row and at least one data row, found {} rows", records.len()),
        });
    }
    let in_file: Vec<&str> = records[0]
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim())
        .collect();
    for expected in account.headers() {
        if !in_file.contains(&expected.trim()) {
            return Err(TrackitError::FileShape {
                path: path.to_path_buf(),
                reason: format!("header '{expected}' of account {} is missing; check trackit.yaml", account.key),
            });
        }
    }
    Ok(())
}

type RowKey = (String, String, String);

fn row_key(date: &str, amount: f64, counter_party: &str) -> RowKey {
    (date.to_string(), format!("{amount:.2}"), counter_party.to_string())
}

/// Rows of the previous version of a file that the user marked as ignored,
/// counted by (date, amount, counter party).
fn ignored_rows(conn: &Connection, identity: &str) -> Result<HashMap<RowKey, usize>> {
    let mut stmt = conn.prepare(
        "SELECT t.date, t.amount, t.counter_party FROM transactions t \
         JOIN files f ON t.file_id = f.id \
         WHERE f.name = ?1 AND t.ignore_when_summing = 1",
    )?;
    let rows: Vec<(String, f64, String)> = stmt
        .query_map([identity], |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)))?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut keys = HashMap::new();
    for (date, amount, counter_party) in rows {
        *keys.entry(row_key(&date, amount, &counter_party)).or_insert(0) += 1;
    }
    Ok(keys)
}

fn insert_transaction(
    conn: &Connection,
    account_id: i64,
    category_id: Option<i64>,
    file_id: i64,
    row: &NormalizedRow,
    amount: f64,
    ignored: bool,
) -> Result<()> {
    log::debug!("inserting {amount:.2} {} for account id {account_id}", row.counter_party);
    conn.prepare_cached(
        "INSERT INTO transactions \
         (account_id, category_id, file_id, date, amount, counter_party, ignore_when_summing) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
    )?
    .execute(rusqlite::params![
        account_id,
        category_id,
        file_id,
        row.date.format("%Y-%m-%d").to_string(),
        amount,
        row.counter_party,
        ignored,
    ])?;
    Ok(())
}

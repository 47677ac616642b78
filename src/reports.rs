use rusqlite::Connection;

use crate::error::{Result, TrackitError};
use crate::models::{CategoryTotal, Transaction};
use crate::rates::is_valid_month;

// ---------------------------------------------------------------------------
// Filter helper
// ---------------------------------------------------------------------------

fn transaction_filter(
    account: Option<&str>,
    month: Option<&str>,
    search: Option<&str>,
) -> Result<(String, Vec<String>)> {
    let mut clauses = Vec::new();
    let mut params = Vec::new();
    if let Some(text) = search {
        params.push(format!("%{}%", escape_like(text)));
        clauses.push(format!("t.counter_party LIKE ?{} ESCAPE '\\'", params.len()));
    }
    if let Some(m) = month {
        if !is_valid_month(m) {
            return Err(TrackitError::Other(format!("month '{m}' must be in YYYY-MM format")));
        }
        params.push(format!("{m}%"));
        clauses.push(format!("t.date LIKE ?{}", params.len()));
    }
    if let Some(a) = account {
        params.push(a.to_string());
        clauses.push(format!("a.name = ?{}", params.len()));
    }
    let clause = if clauses.is_empty() {
        "1 = 1".to_string()
    } else {
        clauses.join(" AND ")
    };
    Ok((clause, params))
}

fn escape_like(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn as_sql(params: &[String]) -> Vec<&dyn rusqlite::types::ToSql> {
    params.iter().map(|p| p as &dyn rusqlite::types::ToSql).collect()
}

// ---------------------------------------------------------------------------
// Listing
// ---------------------------------------------------------------------------

pub struct TransactionList {
    pub rows: Vec<Transaction>,
    /// Sum of rows not marked `ignore_when_summing`.
    pub total: f64,
}

pub fn list_transactions(conn: &Connection, account: Option<&str>, month: Option<&str>) -> Result<TransactionList> {
    query_transactions(conn, account, month, None)
}

/// Transactions whose counter party contains `text` (ASCII case-insensitive).
pub fn search_transactions(
    conn: &Connection,
    text: &str,
    account: Option<&str>,
    month: Option<&str>,
) -> Result<TransactionList> {
    query_transactions(conn, account, month, Some(text))
}

fn query_transactions(
    conn: &Connection,
    account: Option<&str>,
    month: Option<&str>,
    search: Option<&str>,
) -> Result<TransactionList> {
    let (clause, params) = transaction_filter(account, month, search)?;
    let sql = format!(
        "SELECT t.id, t.date, t.counter_party, a.name, c.name, t.amount, t.ignore_when_summing \
         FROM transactions t \
         JOIN accounts a ON t.account_id = a.id \
         LEFT JOIN categories c ON t.category_id = c.id \
         WHERE {clause} \
         ORDER BY t.date, t.id"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows: Vec<Transaction> = stmt
        .query_map(as_sql(&params).as_slice(), |row| {
            Ok(Transaction {
                id: row.get(0)?,
                date: row.get(1)?,
                counter_party: row.get(2)?,
                account: row.get(3)?,
                category: row.get(4)?,
                amount: row.get(5)?,
                ignore_when_summing: row.get(6)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let total = rows.iter().filter(|t| !t.ignore_when_summing).map(|t| t.amount).sum();
    Ok(TransactionList { rows, total })
}

// ---------------------------------------------------------------------------
// Aggregate
// ---------------------------------------------------------------------------

pub fn aggregate_by_category(
    conn: &Connection,
    account: Option<&str>,
    month: Option<&str>,
) -> Result<Vec<CategoryTotal>> {
    let (clause, params) = transaction_filter(account, month, None)?;
    let sql = format!(
        "SELECT COALESCE(c.name, 'uncategorized') AS category, SUM(t.amount) AS total \
         FROM transactions t \
         JOIN accounts a ON t.account_id = a.id \
         LEFT JOIN categories c ON t.category_id = c.id \
         WHERE {clause} AND t.ignore_when_summing = 0 \
         GROUP BY category ORDER BY total ASC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let totals = stmt
        .query_map(as_sql(&params).as_slice(), |row| {
            Ok(CategoryTotal {
                category: row.get(0)?,
                total: row.get(1)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(totals)
}

/// Marks a transaction as excluded from (or, with `ignored = false`, included
/// back into) totals.
pub fn set_ignored(conn: &Connection, id: i64, ignored: bool) -> Result<()> {
    let n = conn.execute(
        "UPDATE transactions SET ignore_when_summing = ?1 WHERE id = ?2",
        rusqlite::params![ignored, id],
    )?;
    if n == 0 {
        return Err(TrackitError::Other(format!("transaction {id} not found")));
    }
    Ok(())
}

pub fn delete_transaction(conn: &Connection, id: i64) -> Result<()> {
    if conn.execute("DELETE FROM transactions WHERE id = ?1", [id])? == 0 {
        return Err(TrackitError::Other(format!("transaction {id} not found")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{ensure_account, ensure_category, get_connection, init_db};

    fn test_db() -> (tempfile::TempDir, Connection) {
        let dir = tempfile::tempdir().unwrap();
        let conn = get_connection(&dir.path().join("test.db")).unwrap();
        init_db(&conn).unwrap();

        let (checking, _) = ensure_account(&conn, "checking", "USD").unwrap();
        let (card, _) = ensure_account(&conn, "card", "USD").unwrap();
        let groceries = ensure_category(&conn, "groceries").unwrap();
        let rent = ensure_category(&conn, "rent").unwrap();

        let rows: Vec<(i64, Option<i64>, &str, f64, &str)> = vec![
            (checking, Some(rent), "2025-01-01", -1500.0, "LANDLORD"),
            (checking, Some(groceries), "2025-01-10", -80.0, "MARKET"),
            (card, Some(groceries), "2025-01-12", -20.0, "MARKET"),
            (card, None, "2025-01-15", -9.99, "UNKNOWN SHOP"),
            (checking, None, "2025-02-01", 3000.0, "PAYROLL"),
        ];
        for (account_id, category_id, date, amount, cp) in rows {
            conn.execute(
                "INSERT INTO transactions (account_id, category_id, date, amount, counter_party) \
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![account_id, category_id, date, amount, cp],
            )
            .unwrap();
        }
        (dir, conn)
    }

    fn id_of(conn: &Connection, counter_party: &str) -> i64 {
        conn.query_row(
            "SELECT id FROM transactions WHERE counter_party = ?1",
            [counter_party],
            |r| r.get(0),
        )
        .unwrap()
    }

    #[test]
    fn test_list_returns_all_transactions() {
        let (_dir, conn) = test_db();
        let list = list_transactions(&conn, None, None).unwrap();
        assert_eq!(list.rows.len(), 5);
        assert_eq!(list.rows[0].counter_party, "LANDLORD");
        assert!((list.total - 1390.01).abs() < 0.001);
    }

    #[test]
    fn test_list_filters_by_month_and_account() {
        let (_dir, conn) = test_db();
        let jan = list_transactions(&conn, None, Some("2025-01")).unwrap();
        assert_eq!(jan.rows.len(), 4);
        let card = list_transactions(&conn, Some("card"), Some("2025-01")).unwrap();
        assert_eq!(card.rows.len(), 2);
        assert!(card.rows.iter().all(|t| t.account == "card"));
        assert_eq!(card.rows[1].category, None);
    }

    #[test]
    fn test_list_rejects_bad_month() {
        let (_dir, conn) = test_db();
        assert!(list_transactions(&conn, None, Some("January")).is_err());
    }

    #[test]
    fn test_aggregate_groups_uncategorized() {
        let (_dir, conn) = test_db();
        let totals = aggregate_by_category(&conn, None, Some("2025-01")).unwrap();
        let get = |name: &str| totals.iter().find(|t| t.category == name).map(|t| t.total);
        assert_eq!(get("rent"), Some(-1500.0));
        assert_eq!(get("groceries"), Some(-100.0));
        assert_eq!(get("uncategorized"), Some(-9.99));
        assert_eq!(totals[0].category, "rent");
    }

    #[test]
    fn test_ignored_rows_excluded_from_sums() {
        let (_dir, conn) = test_db();
        set_ignored(&conn, id_of(&conn, "LANDLORD"), true).unwrap();

        let totals = aggregate_by_category(&conn, None, None).unwrap();
        assert!(totals.iter().all(|t| t.category != "rent"));
        let list = list_transactions(&conn, None, None).unwrap();
        assert_eq!(list.rows.len(), 5);
        assert!((list.total - 2890.01).abs() < 0.001);

        set_ignored(&conn, id_of(&conn, "LANDLORD"), false).unwrap();
        let totals = aggregate_by_category(&conn, None, None).unwrap();
        assert!(totals.iter().any(|t| t.category == "rent"));
    }

    #[test]
    fn test_set_ignored_unknown_id() {
        let (_dir, conn) = test_db();
        assert!(set_ignored(&conn, 9999, true).is_err());
    }

    #[test]
    fn test_search_matches_counter_party_substring() {
        let (_dir, conn) = test_db();
        let found = search_transactions(&conn, "market", None, None).unwrap();
        assert_eq!(found.rows.len(), 2);
        assert!((found.total + 100.0).abs() < 0.001);

        let card = search_transactions(&conn, "MARKET", Some("card"), Some("2025-01")).unwrap();
        assert_eq!(card.rows.len(), 1);
        assert_eq!(card.rows[0].account, "card");

        assert!(search_transactions(&conn, "market", None, Some("2025-02")).unwrap().rows.is_empty());
    }

    #[test]
    fn test_search_treats_wildcards_literally() {
        let (_dir, conn) = test_db();
        assert!(search_transactions(&conn, "%", None, None).unwrap().rows.is_empty());
        assert!(search_transactions(&conn, "UNKNOWN_SHOP", None, None).unwrap().rows.is_empty());
        assert_eq!(search_transactions(&conn, "N SH", None, None).unwrap().rows.len(), 1);
    }

    #[test]
    fn test_delete_transaction() {
        let (_dir, conn) = test_db();
        delete_transaction(&conn, id_of(&conn, "PAYROLL")).unwrap();
        assert_eq!(list_transactions(&conn, None, None).unwrap().rows.len(), 4);
        assert!(delete_transaction(&conn, 9999).is_err());
    }
}

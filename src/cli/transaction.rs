use comfy_table::{Cell, CellAlignment, Table};

use super::check_account;
use crate::db::get_connection;
use crate::error::Result;
use crate::fmt::amount;
use crate::reports::{
    aggregate_by_category, delete_transaction, list_transactions, search_transactions, set_ignored, TransactionList,
};
use crate::settings::db_path;

pub fn list(account: Option<&str>, month: Option<&str>) -> Result<()> {
    check_account(account)?;
    let conn = get_connection(&db_path())?;
    print_transactions(&list_transactions(&conn, account, month)?);
    Ok(())
}

pub fn search(text: &str, account: Option<&str>, month: Option<&str>) -> Result<()> {
    check_account(account)?;
    let conn = get_connection(&db_path())?;
    print_transactions(&search_transactions(&conn, text, account, month)?);
    Ok(())
}

pub fn delete(id: i64) -> Result<()> {
    let conn = get_connection(&db_path())?;
    delete_transaction(&conn, id)?;
    println!("Deleted transaction {id}");
    Ok(())
}

fn print_transactions(report: &TransactionList) {
    let mut table = Table::new();
    table.set_header(vec!["ID", "Date", "Account", "Counter Party", "Category", "Amount", "Ignored"]);
    for t in &report.rows {
        table.add_row(vec![
            Cell::new(t.id),
            Cell::new(&t.date),
            Cell::new(&t.account),
            Cell::new(&t.counter_party),
            Cell::new(t.category.as_deref().unwrap_or("")),
            Cell::new(amount(t.amount)).set_alignment(CellAlignment::Right),
            Cell::new(if t.ignore_when_summing { "yes" } else { "" }),
        ]);
    }
    println!("{table}");
    println!("{} transactions, total {}", report.rows.len(), amount(report.total));
}

pub fn ignore(id: i64, undo: bool) -> Result<()> {
    let conn = get_connection(&db_path())?;
    set_ignored(&conn, id, !undo)?;
    if undo {
        println!("Transaction {id} is counted in totals again");
    } else {
        println!("Transaction {id} is ignored in totals");
    }
    Ok(())
}

pub fn aggregate(account: Option<&str>, month: Option<&str>) -> Result<()> {
    check_account(account)?;
    let conn = get_connection(&db_path())?;
    let totals = aggregate_by_category(&conn, account, month)?;

    let mut table = Table::new();
    table.set_header(vec!["Category", "Total"]);
    for t in &totals {
        table.add_row(vec![
            Cell::new(&t.category),
            Cell::new(amount(t.total)).set_alignment(CellAlignment::Right),
        ]);
    }
    let sum: f64 = totals.iter().map(|t| t.total).sum();
    println!("{table}");
    println!("Total {}", amount(sum));
    Ok(())
}

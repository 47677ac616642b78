use comfy_table::{Cell, Table};
use rust_decimal::Decimal;

use crate::db::get_connection;
use crate::error::{Result, TrackitError};
use crate::rates::{create_rate, delete_rate, list_rates};
use crate::settings::db_path;

pub fn create(month: &str, from_symbol: &str, rate: Decimal) -> Result<()> {
    let conn = get_connection(&db_path())?;
    create_rate(&conn, from_symbol, month, rate)?;
    println!("Rate for {} in {month}: {rate}", from_symbol.to_ascii_uppercase());
    Ok(())
}

pub fn list() -> Result<()> {
    let conn = get_connection(&db_path())?;
    let mut table = Table::new();
    table.set_header(vec!["ID", "Month", "From", "Rate"]);
    for r in list_rates(&conn)? {
        table.add_row(vec![
            Cell::new(r.id),
            Cell::new(r.month),
            Cell::new(r.from_symbol),
            Cell::new(r.rate),
        ]);
    }
    println!("Rates\n{table}");
    Ok(())
}

pub fn delete(id: i64) -> Result<()> {
    let conn = get_connection(&db_path())?;
    if !delete_rate(&conn, id)? {
        return Err(TrackitError::Other(format!("rate {id} not found")));
    }
    println!("Deleted rate {id}");
    Ok(())
}

use comfy_table::Table;

use crate::db::get_connection;
use crate::error::{Result, TrackitError};
use crate::rates::{create_currency, delete_currency, list_currencies, update_currency};
use crate::settings::db_path;

pub fn create(symbol: &str) -> Result<()> {
    let conn = get_connection(&db_path())?;
    let symbol = create_currency(&conn, symbol)?;
    println!("Added currency: {symbol}");
    Ok(())
}

pub fn list() -> Result<()> {
    let conn = get_connection(&db_path())?;
    let mut table = Table::new();
    table.set_header(vec!["Symbol"]);
    for symbol in list_currencies(&conn)? {
        table.add_row(vec![symbol]);
    }
    println!("Currencies\n{table}");
    Ok(())
}

pub fn update(old: &str, new: &str) -> Result<()> {
    let conn = get_connection(&db_path())?;
    let symbol = update_currency(&conn, old, new)?;
    println!("Renamed currency {} to {symbol}", old.to_ascii_uppercase());
    Ok(())
}

pub fn delete(symbol: &str) -> Result<()> {
    let conn = get_connection(&db_path())?;
    if !delete_currency(&conn, symbol)? {
        return Err(TrackitError::Other(format!("currency '{symbol}' not found")));
    }
    println!("Deleted currency: {}", symbol.to_ascii_uppercase());
    Ok(())
}

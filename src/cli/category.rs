use comfy_table::{Cell, Table};

use crate::db::{create_category, delete_category, get_connection, list_categories, rename_category};
use crate::error::Result;
use crate::settings::db_path;

pub fn create(name: &str) -> Result<()> {
    let conn = get_connection(&db_path())?;
    let id = create_category(&conn, name)?;
    println!("Added category {} (id {id})", name.trim());
    Ok(())
}

pub fn list() -> Result<()> {
    let conn = get_connection(&db_path())?;
    let mut table = Table::new();
    table.set_header(vec!["ID", "Name"]);
    for c in list_categories(&conn)? {
        table.add_row(vec![Cell::new(c.id), Cell::new(c.name)]);
    }
    println!("Categories\n{table}");
    Ok(())
}

pub fn update(id: i64, name: &str) -> Result<()> {
    let conn = get_connection(&db_path())?;
    rename_category(&conn, id, name)?;
    println!("Renamed category {id} to {}", name.trim());
    Ok(())
}

pub fn delete(id: i64) -> Result<()> {
    let mut conn = get_connection(&db_path())?;
    delete_category(&mut conn, id)?;
    println!("Deleted category {id}");
    Ok(())
}

use comfy_table::{Cell, Table};

use crate::db::get_connection;
use crate::error::Result;
use crate::invoice::{delete_invoice, list_invoices};
use crate::settings::db_path;

pub fn list() -> Result<()> {
    let conn = get_connection(&db_path())?;
    let invoices = list_invoices(&conn)?;

    let mut table = Table::new();
    table.set_header(vec!["ID", "Program", "Period", "File", "Current", "Lines", "Uploaded"]);
    for inv in invoices {
        table.add_row(vec![
            Cell::new(inv.id),
            Cell::new(&inv.program),
            Cell::new(&inv.period),
            Cell::new(&inv.file_name),
            Cell::new(if inv.is_current { "yes" } else { "" }),
            Cell::new(inv.line_count),
            Cell::new(&inv.created_at),
        ]);
    }
    println!("Invoices\n{table}");
    Ok(())
}

pub fn delete(id: i64) -> Result<()> {
    let conn = get_connection(&db_path())?;
    delete_invoice(&conn, id)?;
    println!("Deleted invoice #{id} and its lines");
    Ok(())
}

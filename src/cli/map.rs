use comfy_table::{Cell, Table};

use crate::db::get_connection;
use crate::error::Result;
use crate::fmt::money;
use crate::mappings::{self, MappingFilter, MappingPatch};
use crate::models::Program;
use crate::settings::db_path;

pub fn list(code: Option<String>, canonical: Option<String>, program: Option<String>) -> Result<()> {
    let program = program.map(|p| p.parse::<Program>()).transpose()?;
    let conn = get_connection(&db_path())?;
    let rows = mappings::list(&conn, &MappingFilter { product_code: code, canonical, program })?;

    let mut table = Table::new();
    table.set_header(vec!["Product Code", "Canonical", "Program", "Std Price", "Active"]);
    for m in rows {
        table.add_row(vec![
            Cell::new(&m.product_code),
            Cell::new(&m.canonical),
            Cell::new(&m.program),
            Cell::new(money(m.standard_price)),
            Cell::new(if m.is_active { "yes" } else { "" }),
        ]);
    }
    println!("Mappings\n{table}");
    Ok(())
}

pub fn add(code: &str, canonical: &str, program: &str, price: i64) -> Result<()> {
    let program: Program = program.parse()?;
    let conn = get_connection(&db_path())?;
    mappings::create(&conn, code, canonical, program, price)?;
    println!("Added mapping {code} -> {canonical} ({program})");
    Ok(())
}

pub fn update(
    code: &str,
    canonical: Option<String>,
    program: Option<String>,
    price: Option<i64>,
    active: Option<bool>,
) -> Result<()> {
    let program = program.map(|p| p.parse::<Program>()).transpose()?;
    let conn = get_connection(&db_path())?;
    mappings::update(
        &conn,
        code,
        &MappingPatch { canonical, program, standard_price: price, is_active: active },
    )?;
    println!("Updated mapping {code}");
    Ok(())
}

pub fn remove(code: &str) -> Result<()> {
    let conn = get_connection(&db_path())?;
    mappings::delete(&conn, code)?;
    println!("Removed mapping {code}");
    Ok(())
}

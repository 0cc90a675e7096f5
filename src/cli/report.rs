use std::path::PathBuf;

use comfy_table::{Cell, Table};

use crate::db::get_connection;
use crate::error::Result;
use crate::models::Program;
use crate::reports::{self, EntryPatch, NewEntry};
use crate::settings::{db_path, get_data_dir, load_settings};

pub fn create(name: &str, program: &str, period: &str) -> Result<()> {
    let program: Program = program.parse()?;
    let conn = get_connection(&db_path())?;
    let created_by = load_settings().user_name;
    let id = reports::create_report(&conn, name, program, period, &created_by)?;
    println!("Created report #{id}: {name} ({program} {period})");
    Ok(())
}

pub fn list() -> Result<()> {
    let conn = get_connection(&db_path())?;
    let rows = reports::list_reports(&conn)?;

    let mut table = Table::new();
    table.set_header(vec!["ID", "Name", "Program", "Period", "Entries", "Created By", "Created"]);
    for r in rows {
        table.add_row(vec![
            Cell::new(r.id),
            Cell::new(&r.name),
            Cell::new(&r.program),
            Cell::new(&r.period),
            Cell::new(r.entry_count),
            Cell::new(&r.created_by),
            Cell::new(&r.created_at),
        ]);
    }
    println!("Reports\n{table}");
    Ok(())
}

pub fn show(program: &str, period: &str) -> Result<()> {
    let program: Program = program.parse()?;
    let conn = get_connection(&db_path())?;
    match reports::find_by_period(&conn, program, period)? {
        Some(r) => println!(
            "Report #{}: {} ({} {}) — {} entries, created by {} at {}",
            r.id, r.name, r.program, r.period, r.entry_count, r.created_by, r.created_at
        ),
        None => println!("No report for {program} {period}"),
    }
    Ok(())
}

pub fn add(
    id: i64,
    discrepancy_ids: &[i64],
    account_name: Option<String>,
    sfid: Option<String>,
    primary: Option<bool>,
) -> Result<()> {
    let mut conn = get_connection(&db_path())?;
    let entries: Vec<NewEntry> = discrepancy_ids
        .iter()
        .map(|&discrepancy_id| NewEntry {
            discrepancy_id,
            specific_account_name: account_name.clone(),
            specific_salesforce_id: sfid.clone(),
            is_primary: primary,
        })
        .collect();
    let added = reports::add_entries(&mut conn, id, &entries)?;
    let skipped = entries.len() - added;
    println!("Added {added} entries to report #{id} ({skipped} already present)");
    Ok(())
}

pub fn update_entry(
    entry_id: i64,
    category: Option<String>,
    notes: Option<String>,
    account_name: Option<String>,
    sfid: Option<String>,
    primary: Option<bool>,
) -> Result<()> {
    let conn = get_connection(&db_path())?;
    reports::update_entry(
        &conn,
        entry_id,
        &EntryPatch {
            category,
            notes,
            specific_account_name: account_name,
            specific_salesforce_id: sfid,
            is_primary: primary,
        },
    )?;
    println!("Updated entry #{entry_id}");
    Ok(())
}

pub fn remove_entry(entry_id: i64) -> Result<()> {
    let conn = get_connection(&db_path())?;
    reports::remove_entry(&conn, entry_id)?;
    println!("Removed entry #{entry_id}");
    Ok(())
}

pub fn clear(id: i64) -> Result<()> {
    let conn = get_connection(&db_path())?;
    let removed = reports::clear_report(&conn, id)?;
    println!("Cleared {removed} entries from report #{id}");
    Ok(())
}

pub fn delete(id: i64) -> Result<()> {
    let conn = get_connection(&db_path())?;
    reports::delete_report(&conn, id)?;
    println!("Deleted report #{id}");
    Ok(())
}

pub fn export(id: i64, output: Option<String>) -> Result<()> {
    let conn = get_connection(&db_path())?;
    let bytes = reports::export_report(&conn, id)?;

    let path = match output {
        Some(p) => PathBuf::from(p),
        None => {
            let name: String = conn.query_row(
                "SELECT name FROM reports WHERE id = ?1",
                [id],
                |r| r.get(0),
            )?;
            let date = chrono::Local::now().format("%Y-%m-%d");
            get_data_dir()
                .join("exports")
                .join(format!("{}-{date}.csv", name.replace(char::is_whitespace, "_")))
        }
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, &bytes)?;
    println!("Wrote {}", path.display());
    Ok(())
}

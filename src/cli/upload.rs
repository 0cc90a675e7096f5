use std::path::Path;

use crate::db::get_connection;
use crate::error::Result;
use crate::ingest::{import_accounts, import_pricing, import_subscriptions, UploadSummary};
use crate::invoice::import_invoice;
use crate::models::Program;
use crate::settings::db_path;

fn print_summary(what: &str, summary: &UploadSummary) {
    if summary.duplicate_file {
        println!("This file has already been uploaded (duplicate checksum).");
        return;
    }
    println!("{what}: {} created, {} skipped", summary.created, summary.skipped);
}

pub fn accounts(file: &str) -> Result<()> {
    let mut conn = get_connection(&db_path())?;
    let prior_subs: i64 = conn.query_row("SELECT count(*) FROM subscriptions", [], |r| r.get(0))?;
    let summary = import_accounts(&mut conn, Path::new(file))?;
    print_summary("Accounts", &summary);
    if !summary.duplicate_file && prior_subs > 0 {
        println!(
            "Note: {prior_subs} subscription(s) were cleared; re-upload the subscription export."
        );
    }
    Ok(())
}

pub fn subscriptions(file: &str) -> Result<()> {
    let mut conn = get_connection(&db_path())?;
    let summary = import_subscriptions(&mut conn, Path::new(file))?;
    print_summary("Subscriptions", &summary);
    Ok(())
}

pub fn pricing(file: &str) -> Result<()> {
    let mut conn = get_connection(&db_path())?;
    let summary = import_pricing(&mut conn, Path::new(file))?;
    print_summary("Pricing mappings", &summary);
    Ok(())
}

pub fn invoice(file: &str, program: &str, period: &str) -> Result<()> {
    let program: Program = program.parse()?;
    let mut conn = get_connection(&db_path())?;
    let summary = import_invoice(&mut conn, Path::new(file), program, period)?;
    println!(
        "Invoice #{} ingested for {program} {period}: {} lines from {} rows",
        summary.id, summary.lines, summary.rows
    );
    Ok(())
}

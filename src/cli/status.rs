use crate::db::get_connection;
use crate::error::Result;
use crate::fmt::money;
use crate::query;
use crate::settings::load_settings;

pub fn run() -> Result<()> {
    let settings = load_settings();
    let data_dir = std::path::PathBuf::from(&settings.data_dir);
    let db_path = data_dir.join("brecon.db");

    println!("User:       {}", settings.user_name);
    println!("Data dir:   {}", data_dir.display());
    println!("Database:   {}", db_path.display());

    if !db_path.exists() {
        println!();
        println!("Database not found. Run `brecon init` to set up.");
        return Ok(());
    }

    let conn = get_connection(&db_path)?;
    let accounts: i64 = conn.query_row("SELECT count(*) FROM accounts", [], |r| r.get(0))?;
    let subscriptions: i64 = conn.query_row("SELECT count(*) FROM subscriptions", [], |r| r.get(0))?;
    let mappings: i64 = conn.query_row("SELECT count(*) FROM pricing", [], |r| r.get(0))?;
    let invoices: i64 = conn.query_row("SELECT count(*) FROM invoices", [], |r| r.get(0))?;
    let stats = query::stats(&conn)?;

    println!();
    println!("Accounts:        {accounts}");
    println!("Subscriptions:   {subscriptions}");
    println!("Mappings:        {mappings}");
    println!("Invoices:        {invoices}");
    println!();
    println!("Discrepancies:   {}", stats.total_discrepancies);
    println!("Total variance:  {}", money(stats.total_variance));
    println!("  Open:          {}", stats.open);
    println!("  In review:     {}", stats.in_review);
    println!("  Resolved:      {}", stats.resolved);

    if !stats.recent_invoices.is_empty() {
        println!();
        println!("Recent invoices:");
        for inv in &stats.recent_invoices {
            let marker = if inv.is_current { "*" } else { " " };
            println!(
                "  {marker} #{} {} {} {} ({} lines)",
                inv.id, inv.program, inv.period, inv.file_name, inv.line_count
            );
        }
    }
    if !stats.recent_reports.is_empty() {
        println!();
        println!("Recent reports:");
        for rep in &stats.recent_reports {
            println!(
                "    #{} {} {} {} ({} entries)",
                rep.id, rep.name, rep.program, rep.period, rep.entry_count
            );
        }
    }
    Ok(())
}

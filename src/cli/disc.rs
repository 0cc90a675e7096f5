use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::db::get_connection;
use crate::error::Result;
use crate::fmt::money;
use crate::models::DiscrepancyStatus;
use crate::query::{self, ListFilter};
use crate::settings::db_path;

fn colored_money(val: i64) -> String {
    let s = money(val);
    if val < 0 {
        s.red().to_string()
    } else {
        s.green().to_string()
    }
}

#[allow(clippy::too_many_arguments)]
pub fn list(
    program: Option<String>,
    period: Option<String>,
    status: Option<String>,
    bac: Option<String>,
    page: usize,
    page_size: usize,
    sort_by: Option<String>,
    asc: bool,
) -> Result<()> {
    let conn = get_connection(&db_path())?;
    let filter = ListFilter {
        program,
        period,
        status,
        bac,
        page,
        page_size,
        sort_by,
        ascending: asc,
    };
    let result = query::list(&conn, &filter)?;

    let mut table = Table::new();
    table.set_header(vec![
        "ID", "BAC", "Program", "Period", "Accounts", "SF Total", "GM Total", "Variance", "Status",
    ]);
    for d in &result.rows {
        table.add_row(vec![
            Cell::new(d.id),
            Cell::new(&d.bac),
            Cell::new(&d.program),
            Cell::new(&d.period),
            Cell::new(&d.sf_name),
            Cell::new(money(d.sf_total)),
            Cell::new(money(d.gm_total)),
            Cell::new(colored_money(d.variance)),
            Cell::new(&d.status),
        ]);
    }
    println!("{table}");
    println!("{} of {} discrepancies (page {})", result.rows.len(), result.total, page.max(1));
    Ok(())
}

pub fn details(id: i64) -> Result<()> {
    let conn = get_connection(&db_path())?;
    let details = query::get_details(&conn, id)?;
    let d = &details.discrepancy;

    println!("Discrepancy #{} — BAC {} ({} {})", d.id, d.bac, d.program, d.period);
    println!("Accounts:  {} ({})", d.sf_name, d.account_count);
    println!("SF total:  {}", money(d.sf_total));
    println!("GM total:  {}", money(d.gm_total));
    println!("Variance:  {}", colored_money(d.variance));
    println!("Status:    {}", d.status);

    let mut table = Table::new();
    table.set_header(vec!["Side", "Account / Line", "Code", "Qty", "Unit Price"]);
    for line in details.sf_lines.iter().chain(details.gm_lines.iter()) {
        table.add_row(vec![
            Cell::new(&line.source),
            Cell::new(&line.account_name),
            Cell::new(&line.product_code),
            Cell::new(line.qty),
            Cell::new(money(line.unit_price)),
        ]);
    }
    println!("{table}");
    Ok(())
}

pub fn set_status(id: i64, status: &str) -> Result<()> {
    let status: DiscrepancyStatus = status.parse()?;
    let conn = get_connection(&db_path())?;
    query::set_status(&conn, id, status)?;
    println!("Discrepancy #{id} set to {status}");
    Ok(())
}

pub fn accounts(bac: &str) -> Result<()> {
    let conn = get_connection(&db_path())?;
    let accounts = query::accounts_by_bac(&conn, &crate::normalize::normalize_bac(bac))?;

    let mut table = Table::new();
    table.set_header(vec!["Salesforce ID", "Name", "BAC", "Primary"]);
    for a in accounts {
        table.add_row(vec![
            Cell::new(&a.salesforce_id),
            Cell::new(&a.name),
            Cell::new(&a.bac),
            Cell::new(if a.is_primary { "yes" } else { "" }),
        ]);
    }
    println!("{table}");
    Ok(())
}

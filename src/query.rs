use rusqlite::Connection;

use crate::error::{ReconError, Result};
use crate::models::{Account, DetailLine, Discrepancy, DiscrepancyStatus, Invoice, Report};

/// Filters and paging for the discrepancy listing. All predicates are
/// conjunctive; `bac` is a case-insensitive substring, the rest exact.
#[derive(Debug, Default, Clone)]
pub struct ListFilter {
    pub program: Option<String>,
    pub period: Option<String>,
    pub status: Option<String>,
    pub bac: Option<String>,
    pub page: usize,
    pub page_size: usize,
    pub sort_by: Option<String>,
    pub ascending: bool,
}

pub struct ListPage {
    pub rows: Vec<Discrepancy>,
    pub total: usize,
}

// Whitelisted sort keys; anything else falls back to the default
// variance-descending rather than erroring.
fn sort_column(sort_by: Option<&str>) -> &'static str {
    match sort_by.unwrap_or("variance") {
        "bac" => "bac",
        "name" => "sf_name",
        "sfTotal" => "sf_total",
        "gmTotal" => "gm_total",
        "status" => "status",
        "updatedAt" => "updated_at",
        _ => "variance",
    }
}

pub fn list(conn: &Connection, filter: &ListFilter) -> Result<ListPage> {
    let mut clauses: Vec<&str> = Vec::new();
    let mut params: Vec<String> = Vec::new();
    if let Some(program) = &filter.program {
        params.push(program.clone());
        clauses.push("program = ?");
    }
    if let Some(period) = &filter.period {
        params.push(period.clone());
        clauses.push("period = ?");
    }
    if let Some(status) = &filter.status {
        params.push(status.clone());
        clauses.push("status = ?");
    }
    if let Some(bac) = &filter.bac {
        params.push(format!("%{bac}%"));
        clauses.push("bac LIKE ?");
    }
    let where_clause = if clauses.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", clauses.join(" AND "))
    };

    let param_refs: Vec<&dyn rusqlite::types::ToSql> =
        params.iter().map(|p| p as &dyn rusqlite::types::ToSql).collect();

    let total: i64 = conn.query_row(
        &format!("SELECT count(*) FROM discrepancies {where_clause}"),
        param_refs.as_slice(),
        |r| r.get(0),
    )?;

    let page = filter.page.max(1);
    let page_size = if filter.page_size == 0 { 50 } else { filter.page_size };
    let order = if filter.ascending { "ASC" } else { "DESC" };
    let column = sort_column(filter.sort_by.as_deref());
    let sql = format!(
        "SELECT id, bac, program, period, sf_name, account_count, sf_total, gm_total, variance, status, updated_at \
         FROM discrepancies {where_clause} ORDER BY {column} {order}, id ASC LIMIT {page_size} OFFSET {offset}",
        offset = (page - 1) * page_size,
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(param_refs.as_slice(), |row| {
        Ok(Discrepancy {
            id: row.get(0)?,
            bac: row.get(1)?,
            program: row.get(2)?,
            period: row.get(3)?,
            sf_name: row.get(4)?,
            account_count: row.get(5)?,
            sf_total: row.get(6)?,
            gm_total: row.get(7)?,
            variance: row.get(8)?,
            status: row.get(9)?,
            updated_at: row.get(10)?,
        })
    })?;
    Ok(ListPage {
        rows: rows.collect::<std::result::Result<Vec<_>, _>>()?,
        total: total as usize,
    })
}

pub struct DiscrepancyDetails {
    pub discrepancy: Discrepancy,
    pub sf_lines: Vec<DetailLine>,
    pub gm_lines: Vec<DetailLine>,
}

fn get_discrepancy(conn: &Connection, id: i64) -> Result<Discrepancy> {
    let mut stmt = conn.prepare(
        "SELECT id, bac, program, period, sf_name, account_count, sf_total, gm_total, variance, status, updated_at \
         FROM discrepancies WHERE id = ?1",
    )?;
    stmt.query_row([id], |row| {
        Ok(Discrepancy {
            id: row.get(0)?,
            bac: row.get(1)?,
            program: row.get(2)?,
            period: row.get(3)?,
            sf_name: row.get(4)?,
            account_count: row.get(5)?,
            sf_total: row.get(6)?,
            gm_total: row.get(7)?,
            variance: row.get(8)?,
            status: row.get(9)?,
            updated_at: row.get(10)?,
        })
    })
    .map_err(|e| match e {
        rusqlite::Error::QueryReturnedNoRows => ReconError::NotFound("Discrepancy", id.to_string()),
        other => other.into(),
    })
}

/// Drill-down for one discrepancy: its constituent live SF subscription
/// lines and the GM lines of the current invoice for the same scope. Lines
/// are looked up directly against the underlying tables, not read back from
/// the aggregate, so they reflect current data even between recalculations.
pub fn get_details(conn: &Connection, id: i64) -> Result<DiscrepancyDetails> {
    let discrepancy = get_discrepancy(conn, id)?;

    let mut stmt = conn.prepare(
        "SELECT a.name, s.product_code, s.qty, s.unit_price \
         FROM subscriptions s JOIN accounts a ON s.account_id = a.id \
         WHERE a.bac = ?1 AND s.program = ?2 AND s.is_live = 1 \
         ORDER BY s.unit_price DESC, s.id ASC",
    )?;
    let sf_lines = stmt
        .query_map(rusqlite::params![discrepancy.bac, discrepancy.program], |row| {
            Ok(DetailLine {
                source: "SF".to_string(),
                account_name: row.get(0)?,
                product_code: row.get(1)?,
                qty: row.get(2)?,
                unit_price: row.get(3)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut stmt = conn.prepare(
        "SELECT l.name, l.product_code, l.qty, l.unit_price \
         FROM invoice_lines l JOIN invoices i ON l.invoice_id = i.id \
         WHERE l.bac = ?1 AND i.program = ?2 AND i.period = ?3 AND i.is_current = 1 \
         ORDER BY l.unit_price DESC, l.id ASC",
    )?;
    let gm_lines = stmt
        .query_map(
            rusqlite::params![discrepancy.bac, discrepancy.program, discrepancy.period],
            |row| {
                Ok(DetailLine {
                    source: "GM".to_string(),
                    account_name: row.get(0)?,
                    product_code: row.get(1)?,
                    qty: row.get(2)?,
                    unit_price: row.get(3)?,
                })
            },
        )?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(DiscrepancyDetails { discrepancy, sf_lines, gm_lines })
}

/// User-facing review state. Clobbered by the next recalculation.
pub fn set_status(conn: &Connection, id: i64, status: DiscrepancyStatus) -> Result<()> {
    let affected = conn.execute(
        "UPDATE discrepancies SET status = ?1, updated_at = datetime('now') WHERE id = ?2",
        rusqlite::params![status.as_str(), id],
    )?;
    if affected == 0 {
        return Err(ReconError::NotFound("Discrepancy", id.to_string()));
    }
    Ok(())
}

/// The constituent accounts behind a group key, for pinning a report entry
/// to a specific account when a BAC maps to several.
pub fn accounts_by_bac(conn: &Connection, bac: &str) -> Result<Vec<Account>> {
    let mut stmt = conn.prepare(
        "SELECT id, salesforce_id, name, bac, is_primary, is_chevrolet, is_buick, is_gmc, is_cadillac \
         FROM accounts WHERE bac = ?1 ORDER BY is_primary DESC, name ASC",
    )?;
    let rows = stmt.query_map([bac], |row| {
        Ok(Account {
            id: row.get(0)?,
            salesforce_id: row.get(1)?,
            name: row.get(2)?,
            bac: row.get(3)?,
            is_primary: row.get(4)?,
            is_chevrolet: row.get(5)?,
            is_buick: row.get(6)?,
            is_gmc: row.get(7)?,
            is_cadillac: row.get(8)?,
        })
    })?;
    Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
}

pub struct Stats {
    pub total_discrepancies: i64,
    pub total_variance: i64,
    pub open: i64,
    pub in_review: i64,
    pub resolved: i64,
    pub recent_invoices: Vec<Invoice>,
    pub recent_reports: Vec<Report>,
}

/// Dashboard rollup: discrepancy counts and variance sum plus the five most
/// recent invoices and reports.
pub fn stats(conn: &Connection) -> Result<Stats> {
    let (total_discrepancies, total_variance): (i64, i64) = conn.query_row(
        "SELECT count(*), COALESCE(SUM(variance), 0) FROM discrepancies",
        [],
        |r| Ok((r.get(0)?, r.get(1)?)),
    )?;
    let count_status = |status: &str| -> Result<i64> {
        Ok(conn.query_row(
            "SELECT count(*) FROM discrepancies WHERE status = ?1",
            [status],
            |r| r.get(0),
        )?)
    };
    let mut stmt = conn.prepare(
        "SELECT i.id, i.program, i.period, i.file_name, i.is_current, i.created_at, \
                (SELECT count(*) FROM invoice_lines l WHERE l.invoice_id = i.id) \
         FROM invoices i ORDER BY i.created_at DESC, i.id DESC LIMIT 5",
    )?;
    let recent_invoices = stmt
        .query_map([], |row| {
            Ok(Invoice {
                id: row.get(0)?,
                program: row.get(1)?,
                period: row.get(2)?,
                file_name: row.get(3)?,
                is_current: row.get(4)?,
                created_at: row.get(5)?,
                line_count: row.get(6)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    let mut stmt = conn.prepare(
        "SELECT r.id, r.name, r.program, r.period, r.created_by, r.created_at, \
                (SELECT count(*) FROM report_entries e WHERE e.report_id = r.id) \
         FROM reports r ORDER BY r.created_at DESC, r.id DESC LIMIT 5",
    )?;
    let recent_reports = stmt
        .query_map([], |row| {
            Ok(Report {
                id: row.get(0)?,
                name: row.get(1)?,
                program: row.get(2)?,
                period: row.get(3)?,
                created_by: row.get(4)?,
                created_at: row.get(5)?,
                entry_count: row.get(6)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(Stats {
        total_discrepancies,
        total_variance,
        open: count_status("OPEN")?,
        in_review: count_status("IN_REVIEW")?,
        resolved: count_status("RESOLVED")?,
        recent_invoices,
        recent_reports,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_connection;

    fn add_discrepancy(conn: &Connection, bac: &str, program: &str, period: &str, variance: i64, status: &str) {
        conn.execute(
            "INSERT INTO discrepancies (bac, program, period, sf_name, account_count, sf_total, gm_total, variance, status) \
             VALUES (?1, ?2, ?3, 'Dealer', 1, ?4, 0, ?4, ?5)",
            rusqlite::params![bac, program, period, variance, status],
        )
        .unwrap();
    }

    fn seed(conn: &Connection) {
        add_discrepancy(conn, "001234", "SITE", "2025-08", 750, "OPEN");
        add_discrepancy(conn, "004521", "SITE", "2025-08", -300, "IN_REVIEW");
        add_discrepancy(conn, "007777", "CHAT", "2025-08", 120, "OPEN");
        add_discrepancy(conn, "001234", "SITE", "2025-07", 10, "RESOLVED");
    }

    #[test]
    fn test_list_filters_are_conjunctive() {
        let conn = test_connection();
        seed(&conn);
        let page = list(
            &conn,
            &ListFilter {
                program: Some("SITE".to_string()),
                period: Some("2025-08".to_string()),
                status: Some("OPEN".to_string()),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.rows[0].bac, "001234");
        assert_eq!(page.rows[0].variance, 750);
    }

    #[test]
    fn test_list_bac_substring_filter() {
        let conn = test_connection();
        seed(&conn);
        let page = list(
            &conn,
            &ListFilter { bac: Some("45".to_string()), ..Default::default() },
        )
        .unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.rows[0].bac, "004521");
    }

    #[test]
    fn test_list_default_sort_variance_desc() {
        let conn = test_connection();
        seed(&conn);
        let page = list(&conn, &ListFilter::default()).unwrap();
        let variances: Vec<i64> = page.rows.iter().map(|d| d.variance).collect();
        assert_eq!(variances, vec![750, 120, 10, -300]);
    }

    #[test]
    fn test_list_unknown_sort_key_falls_back() {
        let conn = test_connection();
        seed(&conn);
        let page = list(
            &conn,
            &ListFilter { sort_by: Some("evil; DROP TABLE".to_string()), ..Default::default() },
        )
        .unwrap();
        let variances: Vec<i64> = page.rows.iter().map(|d| d.variance).collect();
        assert_eq!(variances, vec![750, 120, 10, -300]);
    }

    #[test]
    fn test_list_sort_by_bac_ascending() {
        let conn = test_connection();
        seed(&conn);
        let page = list(
            &conn,
            &ListFilter {
                sort_by: Some("bac".to_string()),
                ascending: true,
                period: Some("2025-08".to_string()),
                ..Default::default()
            },
        )
        .unwrap();
        let bacs: Vec<&str> = page.rows.iter().map(|d| d.bac.as_str()).collect();
        assert_eq!(bacs, vec!["001234", "004521", "007777"]);
    }

    #[test]
    fn test_list_pagination_and_total() {
        let conn = test_connection();
        seed(&conn);
        let page = list(
            &conn,
            &ListFilter { page: 2, page_size: 3, ..Default::default() },
        )
        .unwrap();
        assert_eq!(page.total, 4);
        assert_eq!(page.rows.len(), 1);
        assert_eq!(page.rows[0].variance, -300);
    }

    #[test]
    fn test_get_details_resolves_lines_directly() {
        let conn = test_connection();
        conn.execute(
            "INSERT INTO accounts (salesforce_id, name, bac) VALUES ('001A', 'Acme Buick', '001234')",
            [],
        )
        .unwrap();
        let acct = conn.last_insert_rowid();
        for price in [300, 450] {
            conn.execute(
                "INSERT INTO subscriptions (account_id, product_code, program, unit_price, qty, is_live) \
                 VALUES (?1, 'P1', 'SITE', ?2, 1, 1)",
                rusqlite::params![acct, price],
            )
            .unwrap();
        }
        conn.execute(
            "INSERT INTO invoices (program, period, file_name, is_current) VALUES ('SITE', '2025-08', 'inv.xlsx', 1)",
            [],
        )
        .unwrap();
        let inv = conn.last_insert_rowid();
        conn.execute(
            "INSERT INTO invoice_lines (invoice_id, bac, product_code, name, qty, unit_price) \
             VALUES (?1, '001234', 'G1', 'Site Pkg', 1, 500)",
            [inv],
        )
        .unwrap();
        add_discrepancy(&conn, "001234", "SITE", "2025-08", 250, "OPEN");
        let id: i64 = conn.query_row("SELECT id FROM discrepancies", [], |r| r.get(0)).unwrap();

        let details = get_details(&conn, id).unwrap();
        assert_eq!(details.sf_lines.len(), 2);
        // unit_price descending
        assert_eq!(details.sf_lines[0].unit_price, 450);
        assert_eq!(details.sf_lines[1].unit_price, 300);
        assert_eq!(details.gm_lines.len(), 1);
        assert_eq!(details.gm_lines[0].account_name, "Site Pkg");
        assert_eq!(details.gm_lines[0].unit_price, 500);
    }

    #[test]
    fn test_get_details_unknown_id_is_not_found() {
        let conn = test_connection();
        assert!(matches!(get_details(&conn, 999), Err(ReconError::NotFound(_, _))));
    }

    #[test]
    fn test_set_status() {
        let conn = test_connection();
        seed(&conn);
        let id: i64 = conn
            .query_row("SELECT id FROM discrepancies WHERE bac = '001234' AND period = '2025-08'", [], |r| r.get(0))
            .unwrap();
        set_status(&conn, id, DiscrepancyStatus::Resolved).unwrap();
        let status: String = conn
            .query_row("SELECT status FROM discrepancies WHERE id = ?1", [id], |r| r.get(0))
            .unwrap();
        assert_eq!(status, "RESOLVED");
        assert!(matches!(
            set_status(&conn, 999, DiscrepancyStatus::Open),
            Err(ReconError::NotFound(_, _))
        ));
    }

    #[test]
    fn test_accounts_by_bac_primary_first() {
        let conn = test_connection();
        conn.execute(
            "INSERT INTO accounts (salesforce_id, name, bac, is_primary) VALUES \
             ('001A', 'Zenith Buick', '001234', 0), ('001B', 'Acme GMC', '001234', 1), ('001C', 'Other', '009999', 0)",
            [],
        )
        .unwrap();
        let accounts = accounts_by_bac(&conn, "001234").unwrap();
        assert_eq!(accounts.len(), 2);
        assert_eq!(accounts[0].name, "Acme GMC");
        assert!(accounts[0].is_primary);
    }

    #[test]
    fn test_stats() {
        let conn = test_connection();
        seed(&conn);
        let s = stats(&conn).unwrap();
        assert_eq!(s.total_discrepancies, 4);
        assert_eq!(s.total_variance, 750 - 300 + 120 + 10);
        assert_eq!(s.open, 2);
        assert_eq!(s.in_review, 1);
        assert_eq!(s.resolved, 1);
        assert!(s.recent_invoices.is_empty());
        assert!(s.recent_reports.is_empty());
    }

    #[test]
    fn test_stats_recent_lists_cap_at_five() {
        let conn = test_connection();
        for n in 0..7 {
            conn.execute(
                "INSERT INTO invoices (program, period, file_name, is_current, created_at) \
                 VALUES ('SITE', '2025-08', ?1, 0, datetime('now', ?2))",
                rusqlite::params![format!("inv{n}.xlsx"), format!("-{} minutes", 7 - n)],
            )
            .unwrap();
        }
        conn.execute(
            "INSERT INTO reports (name, program, period, created_by) VALUES ('August review', 'SITE', '2025-08', 'x')",
            [],
        )
        .unwrap();
        let s = stats(&conn).unwrap();
        assert_eq!(s.recent_invoices.len(), 5);
        // Newest first.
        assert_eq!(s.recent_invoices[0].file_name, "inv6.xlsx");
        assert_eq!(s.recent_reports.len(), 1);
        assert_eq!(s.recent_reports[0].name, "August review");
    }
}

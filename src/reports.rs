use rusqlite::Connection;

use crate::error::{ReconError, Result};
use crate::models::{Program, Report};

pub fn create_report(
    conn: &Connection,
    name: &str,
    program: Program,
    period: &str,
    created_by: &str,
) -> Result<i64> {
    if name.trim().is_empty() {
        return Err(ReconError::Validation("report name must not be empty".to_string()));
    }
    conn.execute(
        "INSERT INTO reports (name, program, period, created_by) VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![name.trim(), program.as_str(), period, created_by],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn list_reports(conn: &Connection) -> Result<Vec<Report>> {
    let mut stmt = conn.prepare(
        "SELECT r.id, r.name, r.program, r.period, r.created_by, r.created_at, \
                (SELECT count(*) FROM report_entries e WHERE e.report_id = r.id) \
         FROM reports r ORDER BY r.created_at DESC, r.id DESC",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok(Report {
            id: row.get(0)?,
            name: row.get(1)?,
            program: row.get(2)?,
            period: row.get(3)?,
            created_by: row.get(4)?,
            created_at: row.get(5)?,
            entry_count: row.get(6)?,
        })
    })?;
    Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
}

pub fn find_by_period(conn: &Connection, program: Program, period: &str) -> Result<Option<Report>> {
    let mut stmt = conn.prepare(
        "SELECT r.id, r.name, r.program, r.period, r.created_by, r.created_at, \
                (SELECT count(*) FROM report_entries e WHERE e.report_id = r.id) \
         FROM reports r WHERE r.program = ?1 AND r.period = ?2 ORDER BY r.id ASC LIMIT 1",
    )?;
    let mut rows = stmt.query_map(rusqlite::params![program.as_str(), period], |row| {
        Ok(Report {
            id: row.get(0)?,
            name: row.get(1)?,
            program: row.get(2)?,
            period: row.get(3)?,
            created_by: row.get(4)?,
            created_at: row.get(5)?,
            entry_count: row.get(6)?,
        })
    })?;
    rows.next().transpose().map_err(Into::into)
}

fn report_exists(conn: &Connection, report_id: i64) -> Result<()> {
    let mut stmt = conn.prepare("SELECT 1 FROM reports WHERE id = ?1")?;
    if !stmt.exists([report_id])? {
        return Err(ReconError::NotFound("Report", report_id.to_string()));
    }
    Ok(())
}

pub struct NewEntry {
    pub discrepancy_id: i64,
    pub specific_account_name: Option<String>,
    pub specific_salesforce_id: Option<String>,
    pub is_primary: Option<bool>,
}

/// Bulk-attach discrepancies to a report. A (report, discrepancy) pair that
/// is already present is silently skipped, not an error. Returns the number
/// of entries actually added.
pub fn add_entries(conn: &mut Connection, report_id: i64, entries: &[NewEntry]) -> Result<usize> {
    report_exists(conn, report_id)?;
    let tx = conn.transaction()?;
    let mut added = 0usize;
    {
        let mut stmt = tx.prepare(
            "INSERT OR IGNORE INTO report_entries \
             (report_id, discrepancy_id, specific_account_name, specific_salesforce_id, is_primary) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )?;
        for entry in entries {
            added += stmt.execute(rusqlite::params![
                report_id,
                entry.discrepancy_id,
                entry.specific_account_name,
                entry.specific_salesforce_id,
                entry.is_primary,
            ])?;
        }
    }
    tx.commit()?;
    Ok(added)
}

#[derive(Default)]
pub struct EntryPatch {
    pub category: Option<String>,
    pub notes: Option<String>,
    pub specific_account_name: Option<String>,
    pub specific_salesforce_id: Option<String>,
    pub is_primary: Option<bool>,
}

pub fn update_entry(conn: &Connection, entry_id: i64, patch: &EntryPatch) -> Result<()> {
    let affected = conn.execute(
        "UPDATE report_entries SET \
            category = COALESCE(?1, category), \
            notes = COALESCE(?2, notes), \
            specific_account_name = COALESCE(?3, specific_account_name), \
            specific_salesforce_id = COALESCE(?4, specific_salesforce_id), \
            is_primary = COALESCE(?5, is_primary) \
         WHERE id = ?6",
        rusqlite::params![
            patch.category,
            patch.notes,
            patch.specific_account_name,
            patch.specific_salesforce_id,
            patch.is_primary,
            entry_id,
        ],
    )?;
    if affected == 0 {
        return Err(ReconError::NotFound("Report entry", entry_id.to_string()));
    }
    Ok(())
}

pub fn remove_entry(conn: &Connection, entry_id: i64) -> Result<()> {
    let affected = conn.execute("DELETE FROM report_entries WHERE id = ?1", [entry_id])?;
    if affected == 0 {
        return Err(ReconError::NotFound("Report entry", entry_id.to_string()));
    }
    Ok(())
}

/// Remove every entry from a report; the report itself survives.
pub fn clear_report(conn: &Connection, report_id: i64) -> Result<usize> {
    report_exists(conn, report_id)?;
    Ok(conn.execute("DELETE FROM report_entries WHERE report_id = ?1", [report_id])?)
}

pub fn delete_report(conn: &Connection, report_id: i64) -> Result<()> {
    let affected = conn.execute("DELETE FROM reports WHERE id = ?1", [report_id])?;
    if affected == 0 {
        return Err(ReconError::NotFound("Report", report_id.to_string()));
    }
    Ok(())
}

/// Export a report as CSV bytes, one row per entry joined back to its
/// discrepancy. The entry's pinned account name wins over the aggregate name
/// when present.
pub fn export_report(conn: &Connection, report_id: i64) -> Result<Vec<u8>> {
    report_exists(conn, report_id)?;

    let mut stmt = conn.prepare(
        "SELECT d.bac, COALESCE(NULLIF(e.specific_account_name, ''), d.sf_name), \
                e.specific_salesforce_id, e.is_primary, \
                d.sf_total, d.gm_total, d.variance, d.status, \
                e.category, e.notes, d.period, d.program \
         FROM report_entries e JOIN discrepancies d ON e.discrepancy_id = d.id \
         WHERE e.report_id = ?1 ORDER BY d.variance DESC, d.bac ASC",
    )?;
    let rows = stmt.query_map([report_id], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, Option<String>>(2)?,
            row.get::<_, Option<bool>>(3)?,
            row.get::<_, i64>(4)?,
            row.get::<_, i64>(5)?,
            row.get::<_, i64>(6)?,
            row.get::<_, String>(7)?,
            row.get::<_, Option<String>>(8)?,
            row.get::<_, Option<String>>(9)?,
            row.get::<_, String>(10)?,
            row.get::<_, String>(11)?,
        ))
    })?;

    let mut wtr = csv::Writer::from_writer(Vec::new());
    wtr.write_record([
        "BAC", "SF_Name", "SFID", "Is_Primary", "SF_Total", "GM_Total",
        "Variance", "Status", "Category", "Notes", "Period", "Program",
    ])?;
    for row in rows {
        let (bac, name, sfid, is_primary, sf_total, gm_total, variance, status, category, notes, period, program) =
            row?;
        wtr.write_record([
            bac,
            name,
            sfid.unwrap_or_default(),
            is_primary.map(|p| p.to_string()).unwrap_or_else(|| "N/A".to_string()),
            sf_total.to_string(),
            gm_total.to_string(),
            variance.to_string(),
            status,
            category.unwrap_or_default(),
            notes.unwrap_or_default(),
            period,
            program,
        ])?;
    }
    wtr.flush()?;
    wtr.into_inner()
        .map_err(|e| ReconError::Other(format!("export buffer error: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_connection;

    fn add_discrepancy(conn: &Connection, bac: &str, variance: i64) -> i64 {
        conn.execute(
            "INSERT INTO discrepancies (bac, program, period, sf_name, account_count, sf_total, gm_total, variance) \
             VALUES (?1, 'SITE', '2025-08', 'Acme Buick, Acme GMC', 2, ?2, 0, ?2)",
            rusqlite::params![bac, variance],
        )
        .unwrap();
        conn.last_insert_rowid()
    }

    fn entry(discrepancy_id: i64) -> NewEntry {
        NewEntry {
            discrepancy_id,
            specific_account_name: None,
            specific_salesforce_id: None,
            is_primary: None,
        }
    }

    #[test]
    fn test_create_and_list_reports() {
        let mut conn = test_connection();
        let d = add_discrepancy(&conn, "001234", 750);
        let id = create_report(&conn, "August review", Program::Site, "2025-08", "billing.ops").unwrap();
        add_entries(&mut conn, id, &[entry(d)]).unwrap();

        let reports = list_reports(&conn).unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].name, "August review");
        assert_eq!(reports[0].created_by, "billing.ops");
        assert_eq!(reports[0].entry_count, 1);
    }

    #[test]
    fn test_create_report_rejects_blank_name() {
        let conn = test_connection();
        assert!(matches!(
            create_report(&conn, "   ", Program::Site, "2025-08", "x"),
            Err(ReconError::Validation(_))
        ));
    }

    #[test]
    fn test_find_by_period() {
        let conn = test_connection();
        create_report(&conn, "August review", Program::Site, "2025-08", "x").unwrap();
        assert!(find_by_period(&conn, Program::Site, "2025-08").unwrap().is_some());
        assert!(find_by_period(&conn, Program::Chat, "2025-08").unwrap().is_none());
    }

    #[test]
    fn test_add_entries_skips_duplicates_silently() {
        let mut conn = test_connection();
        let d1 = add_discrepancy(&conn, "001234", 750);
        let d2 = add_discrepancy(&conn, "004521", -300);
        let id = create_report(&conn, "August review", Program::Site, "2025-08", "x").unwrap();

        assert_eq!(add_entries(&mut conn, id, &[entry(d1), entry(d2)]).unwrap(), 2);
        assert_eq!(add_entries(&mut conn, id, &[entry(d1)]).unwrap(), 0);
        let count: i64 = conn.query_row("SELECT count(*) FROM report_entries", [], |r| r.get(0)).unwrap();
        assert_eq!(count, 2);
    }

    #[test]
    fn test_add_entries_unknown_report() {
        let mut conn = test_connection();
        let d = add_discrepancy(&conn, "001234", 750);
        assert!(matches!(
            add_entries(&mut conn, 999, &[entry(d)]),
            Err(ReconError::NotFound(_, _))
        ));
    }

    #[test]
    fn test_update_and_remove_entry() {
        let mut conn = test_connection();
        let d = add_discrepancy(&conn, "001234", 750);
        let id = create_report(&conn, "August review", Program::Site, "2025-08", "x").unwrap();
        add_entries(&mut conn, id, &[entry(d)]).unwrap();
        let entry_id: i64 = conn.query_row("SELECT id FROM report_entries", [], |r| r.get(0)).unwrap();

        update_entry(
            &conn,
            entry_id,
            &EntryPatch { category: Some("Pricing".to_string()), notes: Some("check tier".to_string()), ..Default::default() },
        )
        .unwrap();
        let (category, notes): (String, String) = conn
            .query_row("SELECT category, notes FROM report_entries WHERE id = ?1", [entry_id], |r| {
                Ok((r.get(0)?, r.get(1)?))
            })
            .unwrap();
        assert_eq!(category, "Pricing");
        assert_eq!(notes, "check tier");

        remove_entry(&conn, entry_id).unwrap();
        assert!(matches!(remove_entry(&conn, entry_id), Err(ReconError::NotFound(_, _))));
    }

    #[test]
    fn test_clear_report_keeps_report() {
        let mut conn = test_connection();
        let d = add_discrepancy(&conn, "001234", 750);
        let id = create_report(&conn, "August review", Program::Site, "2025-08", "x").unwrap();
        add_entries(&mut conn, id, &[entry(d)]).unwrap();

        assert_eq!(clear_report(&conn, id).unwrap(), 1);
        assert_eq!(list_reports(&conn).unwrap().len(), 1);
        assert_eq!(list_reports(&conn).unwrap()[0].entry_count, 0);
    }

    #[test]
    fn test_delete_report_cascades_entries() {
        let mut conn = test_connection();
        let d = add_discrepancy(&conn, "001234", 750);
        let id = create_report(&conn, "August review", Program::Site, "2025-08", "x").unwrap();
        add_entries(&mut conn, id, &[entry(d)]).unwrap();

        delete_report(&conn, id).unwrap();
        let count: i64 = conn.query_row("SELECT count(*) FROM report_entries", [], |r| r.get(0)).unwrap();
        assert_eq!(count, 0);
        assert!(matches!(delete_report(&conn, id), Err(ReconError::NotFound(_, _))));
    }

    #[test]
    fn test_export_round_trip() {
        let mut conn = test_connection();
        let d1 = add_discrepancy(&conn, "001234", 750);
        let d2 = add_discrepancy(&conn, "004521", -300);
        let id = create_report(&conn, "August review", Program::Site, "2025-08", "x").unwrap();
        add_entries(
            &mut conn,
            id,
            &[
                NewEntry {
                    discrepancy_id: d1,
                    specific_account_name: Some("Acme Buick".to_string()),
                    specific_salesforce_id: Some("001A".to_string()),
                    is_primary: Some(true),
                },
                entry(d2),
            ],
        )
        .unwrap();

        let bytes = export_report(&conn, id).unwrap();
        let mut rdr = csv::Reader::from_reader(bytes.as_slice());
        let headers = rdr.headers().unwrap().clone();
        assert_eq!(&headers[0], "BAC");
        assert_eq!(&headers[6], "Variance");
        let records: Vec<csv::StringRecord> = rdr.records().map(|r| r.unwrap()).collect();
        assert_eq!(records.len(), 2);
        // variance DESC: the pinned entry first
        assert_eq!(&records[0][0], "001234");
        assert_eq!(&records[0][1], "Acme Buick");
        assert_eq!(&records[0][2], "001A");
        assert_eq!(&records[0][3], "true");
        assert_eq!(&records[0][6], "750");
        // fallback to the aggregate name, N/A primary
        assert_eq!(&records[1][1], "Acme Buick, Acme GMC");
        assert_eq!(&records[1][3], "N/A");
        assert_eq!(&records[1][6], "-300");
    }

    #[test]
    fn test_export_unknown_report_is_not_found() {
        let conn = test_connection();
        assert!(matches!(export_report(&conn, 999), Err(ReconError::NotFound(_, _))));
    }
}

use std::path::Path;

use rusqlite::Connection;

use crate::error::Result;

pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS accounts (
    id INTEGER PRIMARY KEY,
    salesforce_id TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL,
    bac TEXT NOT NULL,
    is_primary INTEGER DEFAULT 0,
    is_chevrolet INTEGER DEFAULT 0,
    is_buick INTEGER DEFAULT 0,
    is_gmc INTEGER DEFAULT 0,
    is_cadillac INTEGER DEFAULT 0
);
CREATE INDEX IF NOT EXISTS idx_accounts_bac ON accounts(bac);

CREATE TABLE IF NOT EXISTS subscriptions (
    id INTEGER PRIMARY KEY,
    account_id INTEGER NOT NULL,
    product_code TEXT NOT NULL,
    program TEXT NOT NULL,
    unit_price INTEGER NOT NULL,
    qty INTEGER NOT NULL DEFAULT 1,
    is_live INTEGER NOT NULL DEFAULT 0,
    FOREIGN KEY (account_id) REFERENCES accounts(id) ON DELETE CASCADE
);
CREATE INDEX IF NOT EXISTS idx_subscriptions_program ON subscriptions(program, is_live);

CREATE TABLE IF NOT EXISTS pricing (
    product_code TEXT PRIMARY KEY,
    canonical TEXT NOT NULL,
    program TEXT NOT NULL,
    standard_price INTEGER NOT NULL,
    is_active INTEGER NOT NULL DEFAULT 1
);

CREATE TABLE IF NOT EXISTS invoices (
    id INTEGER PRIMARY KEY,
    program TEXT NOT NULL,
    period TEXT NOT NULL,
    file_name TEXT NOT NULL,
    is_current INTEGER NOT NULL DEFAULT 1,
    created_at TEXT DEFAULT (datetime('now'))
);
CREATE INDEX IF NOT EXISTS idx_invoices_scope ON invoices(program, period, is_current);

CREATE TABLE IF NOT EXISTS invoice_lines (
    id INTEGER PRIMARY KEY,
    invoice_id INTEGER NOT NULL,
    bac TEXT NOT NULL,
    product_code TEXT NOT NULL,
    name TEXT NOT NULL DEFAULT '',
    qty INTEGER NOT NULL DEFAULT 1,
    unit_price INTEGER NOT NULL,
    FOREIGN KEY (invoice_id) REFERENCES invoices(id) ON DELETE CASCADE
);
CREATE INDEX IF NOT EXISTS idx_invoice_lines_bac ON invoice_lines(invoice_id, bac);

CREATE TABLE IF NOT EXISTS discrepancies (
    id INTEGER PRIMARY KEY,
    bac TEXT NOT NULL,
    program TEXT NOT NULL,
    period TEXT NOT NULL,
    sf_name TEXT NOT NULL DEFAULT '',
    account_count INTEGER NOT NULL DEFAULT 0,
    sf_total INTEGER NOT NULL DEFAULT 0,
    gm_total INTEGER NOT NULL DEFAULT 0,
    variance INTEGER NOT NULL DEFAULT 0,
    status TEXT NOT NULL DEFAULT 'OPEN',
    updated_at TEXT DEFAULT (datetime('now'))
);
CREATE INDEX IF NOT EXISTS idx_discrepancies_scope ON discrepancies(program, period);

CREATE TABLE IF NOT EXISTS reports (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    program TEXT NOT NULL,
    period TEXT NOT NULL,
    created_by TEXT NOT NULL DEFAULT '',
    created_at TEXT DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS report_entries (
    id INTEGER PRIMARY KEY,
    report_id INTEGER NOT NULL,
    discrepancy_id INTEGER NOT NULL,
    specific_account_name TEXT,
    specific_salesforce_id TEXT,
    is_primary INTEGER,
    category TEXT,
    notes TEXT,
    UNIQUE (report_id, discrepancy_id),
    FOREIGN KEY (report_id) REFERENCES reports(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS uploads (
    id INTEGER PRIMARY KEY,
    kind TEXT NOT NULL,
    filename TEXT NOT NULL,
    checksum TEXT,
    created INTEGER NOT NULL DEFAULT 0,
    skipped INTEGER NOT NULL DEFAULT 0,
    created_at TEXT DEFAULT (datetime('now'))
);
";

pub fn get_connection(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

#[cfg(test)]
pub fn test_connection() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch("PRAGMA foreign_keys=ON;").unwrap();
    init_db(&conn).unwrap();
    conn
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_db_creates_tables() {
        let conn = test_connection();
        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();
        for expected in &[
            "accounts", "subscriptions", "pricing", "invoices", "invoice_lines",
            "discrepancies", "reports", "report_entries", "uploads",
        ] {
            assert!(tables.contains(&expected.to_string()), "missing table: {expected}");
        }
    }

    #[test]
    fn test_init_db_is_idempotent() {
        let conn = test_connection();
        init_db(&conn).unwrap();
    }

    #[test]
    fn test_invoice_lines_cascade_on_invoice_delete() {
        let conn = test_connection();
        conn.execute(
            "INSERT INTO invoices (program, period, file_name) VALUES ('SITE', '2025-08', 'inv.xlsx')",
            [],
        )
        .unwrap();
        let invoice_id = conn.last_insert_rowid();
        conn.execute(
            "INSERT INTO invoice_lines (invoice_id, bac, product_code, unit_price) VALUES (?1, '001234', 'P1', 100)",
            [invoice_id],
        )
        .unwrap();
        conn.execute("DELETE FROM invoices WHERE id = ?1", [invoice_id]).unwrap();
        let count: i64 = conn.query_row("SELECT count(*) FROM invoice_lines", [], |r| r.get(0)).unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_report_entries_unique_per_discrepancy() {
        let conn = test_connection();
        conn.execute(
            "INSERT INTO reports (name, program, period) VALUES ('August', 'SITE', '2025-08')",
            [],
        )
        .unwrap();
        let report_id = conn.last_insert_rowid();
        conn.execute(
            "INSERT INTO report_entries (report_id, discrepancy_id) VALUES (?1, 42)",
            [report_id],
        )
        .unwrap();
        let dup = conn.execute(
            "INSERT INTO report_entries (report_id, discrepancy_id) VALUES (?1, 42)",
            [report_id],
        );
        assert!(dup.is_err());
    }
}

use std::path::Path;

use calamine::{Data, Reader};
use rusqlite::Connection;

use crate::error::{ReconError, Result};
use crate::ingest::{compute_checksum, record_upload};
use crate::models::{Invoice, InvoiceLineRow, Program};
use crate::normalize::{float_to_whole_dollars, normalize_bac, to_whole_dollars};

// Header spellings observed across historical GM invoice files.
const BAC_HEADERS: &[&str] = &["BAC", "Dealer BAC", "BAC Code"];
const PRICE_HEADERS: &[&str] = &["Unit_Price", "UnitPrice", "Price", "Amount", "Dealer Cost"];
const QTY_HEADERS: &[&str] = &["Qty", "Quantity"];
const CODE_HEADERS: &[&str] = &["Product_Code__c", "Code", "ProductCode"];
const NAME_HEADERS: &[&str] = &["Product_Name", "Name", "Product Selection"];

pub struct InvoiceSummary {
    pub id: i64,
    /// Total data rows seen in the sheet, accepted or not.
    pub rows: usize,
    pub lines: usize,
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        Data::Float(f) if f.fract() == 0.0 => format!("{:.0}", f),
        other => other.to_string().trim().to_string(),
    }
}

fn cell_whole_dollars(cell: &Data) -> Option<i64> {
    match cell {
        Data::Int(i) => Some(*i),
        Data::Float(f) => float_to_whole_dollars(*f),
        Data::String(s) => to_whole_dollars(s),
        _ => None,
    }
}

fn cell_qty(cell: &Data) -> Option<i64> {
    cell_whole_dollars(cell)
}

fn find_header(headers: &[Data], aliases: &[&str]) -> Option<usize> {
    headers.iter().position(|h| {
        let h = cell_text(h);
        aliases.iter().any(|a| h.eq_ignore_ascii_case(a))
    })
}

/// Parse the first worksheet of a GM vendor invoice into line rows.
/// Returns the accepted lines plus the total number of data rows seen.
pub fn parse_invoice_sheet(path: &Path) -> Result<(Vec<InvoiceLineRow>, usize)> {
    let mut workbook = calamine::open_workbook_auto(path)?;
    let sheet = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| ReconError::Validation("workbook has no sheets".to_string()))?;
    let range = workbook.worksheet_range(&sheet)?;
    let mut rows_iter = range.rows();
    let headers: Vec<Data> = rows_iter
        .next()
        .ok_or_else(|| ReconError::Validation("invoice sheet is empty".to_string()))?
        .to_vec();

    let idx_bac = find_header(&headers, BAC_HEADERS)
        .ok_or_else(|| ReconError::Validation("missing BAC column".to_string()))?;
    let idx_price = find_header(&headers, PRICE_HEADERS)
        .ok_or_else(|| ReconError::Validation("missing unit price column".to_string()))?;
    let idx_qty = find_header(&headers, QTY_HEADERS);
    let idx_code = find_header(&headers, CODE_HEADERS);
    let idx_name = find_header(&headers, NAME_HEADERS);

    let cell = |row: &[Data], idx: usize| row.get(idx).cloned().unwrap_or(Data::Empty);

    let mut lines = Vec::new();
    let mut total = 0usize;
    for row in rows_iter {
        if row.iter().all(|c| matches!(c, Data::Empty)) {
            continue;
        }
        total += 1;
        // A non-integer price rejects the row; everything else gets a default.
        let Some(unit_price) = cell_whole_dollars(&cell(row, idx_price)) else {
            continue;
        };
        let qty = idx_qty.and_then(|i| cell_qty(&cell(row, i))).unwrap_or(1);
        let code = idx_code.map(|i| cell_text(&cell(row, i))).unwrap_or_default();
        let name = idx_name.map(|i| cell_text(&cell(row, i))).unwrap_or_default();
        lines.push(InvoiceLineRow {
            bac: normalize_bac(&cell_text(&cell(row, idx_bac))),
            product_code: if code.is_empty() { "UNKNOWN".to_string() } else { code },
            name,
            qty,
            unit_price,
        });
    }
    Ok((lines, total))
}

/// Ingest a vendor invoice for one (program, period). Creates the invoice as
/// current, bulk-inserts its accepted lines, and demotes every other invoice
/// for the same scope, all in one transaction.
pub fn import_invoice(
    conn: &mut Connection,
    path: &Path,
    program: Program,
    period: &str,
) -> Result<InvoiceSummary> {
    let (lines, total) = parse_invoice_sheet(path)?;
    let checksum = compute_checksum(path)?;
    let file_name = path.file_name().and_then(|n| n.to_str()).unwrap_or("").to_string();

    let tx = conn.transaction()?;
    tx.execute(
        "INSERT INTO invoices (program, period, file_name, is_current) VALUES (?1, ?2, ?3, 1)",
        rusqlite::params![program.as_str(), period, file_name],
    )?;
    let invoice_id = tx.last_insert_rowid();
    {
        let mut stmt = tx.prepare(
            "INSERT INTO invoice_lines (invoice_id, bac, product_code, name, qty, unit_price) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )?;
        for line in &lines {
            stmt.execute(rusqlite::params![
                invoice_id,
                line.bac,
                line.product_code,
                line.name,
                line.qty,
                line.unit_price,
            ])?;
        }
    }
    tx.execute(
        "UPDATE invoices SET is_current = 0 WHERE program = ?1 AND period = ?2 AND id != ?3",
        rusqlite::params![program.as_str(), period, invoice_id],
    )?;
    record_upload(&tx, "invoice", path, &checksum, lines.len(), total - lines.len())?;
    tx.commit()?;

    Ok(InvoiceSummary { id: invoice_id, rows: total, lines: lines.len() })
}

pub fn list_invoices(conn: &Connection) -> Result<Vec<Invoice>> {
    let mut stmt = conn.prepare(
        "SELECT i.id, i.program, i.period, i.file_name, i.is_current, i.created_at, \
                (SELECT count(*) FROM invoice_lines l WHERE l.invoice_id = i.id) \
         FROM invoices i ORDER BY i.created_at DESC, i.id DESC",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok(Invoice {
            id: row.get(0)?,
            program: row.get(1)?,
            period: row.get(2)?,
            file_name: row.get(3)?,
            is_current: row.get(4)?,
            created_at: row.get(5)?,
            line_count: row.get(6)?,
        })
    })?;
    Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
}

/// Delete an invoice and (via cascade) its lines.
pub fn delete_invoice(conn: &Connection, id: i64) -> Result<()> {
    let affected = conn.execute("DELETE FROM invoices WHERE id = ?1", [id])?;
    if affected == 0 {
        return Err(ReconError::NotFound("Invoice", id.to_string()));
    }
    Ok(())
}

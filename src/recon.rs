use std::collections::{BTreeMap, BTreeSet};

use rusqlite::Connection;

use crate::error::Result;
use crate::models::Program;

/// SF-side aggregate for one dealer group key.
#[derive(Debug, Default)]
struct SfGroup {
    total: i64,
    names: BTreeSet<String>,
    account_ids: BTreeSet<i64>,
}

pub struct RecalcSummary {
    pub inserted: usize,
}

/// Recompute the discrepancy set for one (program, period).
///
/// Aggregates live subscriptions by dealer group key on the SF side and the
/// current invoice's lines on the GM side, diffs the union of keys, and
/// replaces the stored discrepancy scope with the nonzero-variance rows.
/// The delete and insert share one transaction, so readers see either the
/// prior set or the new one, never a partial state. Re-running on unchanged
/// inputs yields the same set; user-edited statuses reset to OPEN.
pub fn recalculate(conn: &mut Connection, program: Program, period: &str) -> Result<RecalcSummary> {
    // SF side: live subscriptions joined to their accounts.
    let mut sf_by_bac: BTreeMap<String, SfGroup> = BTreeMap::new();
    {
        let mut stmt = conn.prepare(
            "SELECT a.bac, a.id, a.name, s.unit_price * s.qty \
             FROM subscriptions s JOIN accounts a ON s.account_id = a.id \
             WHERE s.program = ?1 AND s.is_live = 1",
        )?;
        let rows = stmt.query_map([program.as_str()], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, i64>(3)?,
            ))
        })?;
        for row in rows {
            let (bac, account_id, name, amount) = row?;
            let group = sf_by_bac.entry(bac).or_default();
            group.total += amount;
            group.names.insert(name);
            group.account_ids.insert(account_id);
        }
    }

    // GM side: lines of the current invoice, if one exists. No invoice yet
    // is the normal state before the vendor file arrives, not an error.
    let mut gm_by_bac: BTreeMap<String, i64> = BTreeMap::new();
    {
        let mut stmt = conn.prepare(
            "SELECT l.bac, l.unit_price * l.qty \
             FROM invoice_lines l JOIN invoices i ON l.invoice_id = i.id \
             WHERE i.program = ?1 AND i.period = ?2 AND i.is_current = 1",
        )?;
        let rows = stmt.query_map(rusqlite::params![program.as_str(), period], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;
        for row in rows {
            let (bac, amount) = row?;
            *gm_by_bac.entry(bac).or_default() += amount;
        }
    }

    // Union the key sets and keep only nonzero variances.
    let mut all_bacs: BTreeSet<&String> = sf_by_bac.keys().collect();
    all_bacs.extend(gm_by_bac.keys());

    struct NewRow {
        bac: String,
        sf_name: String,
        account_count: i64,
        sf_total: i64,
        gm_total: i64,
        variance: i64,
    }
    let mut new_rows = Vec::new();
    for bac in all_bacs {
        let sf = sf_by_bac.get(bac);
        let sf_total = sf.map(|g| g.total).unwrap_or(0);
        let gm_total = gm_by_bac.get(bac).copied().unwrap_or(0);
        let variance = sf_total - gm_total;
        if variance == 0 {
            continue;
        }
        new_rows.push(NewRow {
            bac: bac.clone(),
            sf_name: sf
                .map(|g| g.names.iter().cloned().collect::<Vec<_>>().join(", "))
                .unwrap_or_default(),
            account_count: sf.map(|g| g.account_ids.len() as i64).unwrap_or(0),
            sf_total,
            gm_total,
            variance,
        });
    }

    // Full replace of the scope: no stale row survives, no partial set is
    // ever visible, and a failure rolls back to the prior set.
    let tx = conn.transaction()?;
    tx.execute(
        "DELETE FROM discrepancies WHERE program = ?1 AND period = ?2",
        rusqlite::params![program.as_str(), period],
    )?;
    {
        let mut stmt = tx.prepare(
            "INSERT INTO discrepancies \
             (bac, program, period, sf_name, account_count, sf_total, gm_total, variance, status, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 'OPEN', datetime('now'))",
        )?;
        for row in &new_rows {
            stmt.execute(rusqlite::params![
                row.bac,
                program.as_str(),
                period,
                row.sf_name,
                row.account_count,
                row.sf_total,
                row.gm_total,
                row.variance,
            ])?;
        }
    }
    tx.commit()?;

    Ok(RecalcSummary { inserted: new_rows.len() })
}

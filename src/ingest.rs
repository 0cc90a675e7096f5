use std::collections::HashMap;
use std::path::Path;

use rusqlite::Connection;
use sha2::{Digest, Sha256};

use crate::error::{ReconError, Result};
use crate::models::{parse_boolish, AccountRow, MappingRow, Program, SubscriptionRow};
use crate::normalize::{normalize_bac, to_whole_dollars};

// ---------------------------------------------------------------------------
// Header-keyed field lookup with aliases
// ---------------------------------------------------------------------------

// Historical exports disagree on header spelling; each field accepts every
// spelling seen in production files.
const ACCOUNT_ID_HEADERS: &[&str] = &["Id", "Account ID", "AccountId", "Salesforce ID"];
const ACCOUNT_NAME_HEADERS: &[&str] = &["Name", "Account Name"];
const ACCOUNT_BAC_HEADERS: &[&str] = &["BAC_Code__c", "BAC", "Dealer BAC", "BAC Code"];
const ACCOUNT_OEM_HEADERS: &[&str] = &["OEM__c", "OEM", "Franchise", "Brands"];
const ACCOUNT_PRIMARY_HEADERS: &[&str] = &["Primary__c", "Primary", "Is Primary"];

const SUB_ACCOUNT_HEADERS: &[&str] = &["Account__c", "AccountId", "Account ID", "Account"];
const SUB_BRAND_HEADERS: &[&str] = &["Product_Brand__c", "Brand", "Product Brand", "Canonical"];
const SUB_PRICE_HEADERS: &[&str] = &["Dealer_Price__c", "Dealer Price", "Price"];
const SUB_LIVE_HEADERS: &[&str] = &["Is_Live__c", "Is Live", "Live", "Active"];

const PRICING_CODE_HEADERS: &[&str] = &["Product_Code__c", "Product Code", "Code"];
const PRICING_CANONICAL_HEADERS: &[&str] = &["Canonical", "Canonical Name", "Brand"];
const PRICING_PROGRAM_HEADERS: &[&str] = &["Program", "Program__c"];
const PRICING_PRICE_HEADERS: &[&str] = &["Price", "Standard Price", "Standard_Price__c"];
const PRICING_TIER_HEADERS: &[&str] = &["Tier", "Price Tier"];

fn header_index(headers: &csv::StringRecord, aliases: &[&str]) -> Option<usize> {
    headers.iter().position(|h| {
        let h = h.trim();
        aliases.iter().any(|a| h.eq_ignore_ascii_case(a))
    })
}

fn require_index(headers: &csv::StringRecord, aliases: &[&str], what: &str) -> Result<usize> {
    header_index(headers, aliases).ok_or_else(|| {
        ReconError::Validation(format!("missing {what} column (expected one of {aliases:?})"))
    })
}

fn get(record: &csv::StringRecord, idx: usize) -> &str {
    record.get(idx).unwrap_or("").trim()
}

fn open_csv(path: &Path) -> Result<csv::Reader<std::io::BufReader<std::fs::File>>> {
    let file = std::fs::File::open(path)?;
    Ok(csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(std::io::BufReader::new(file)))
}

// ---------------------------------------------------------------------------
// Upload ledger
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct UploadSummary {
    pub created: usize,
    pub skipped: usize,
    pub duplicate_file: bool,
}

pub fn compute_checksum(path: &Path) -> Result<String> {
    let data = std::fs::read(path)?;
    let mut hasher = Sha256::new();
    hasher.update(&data);
    Ok(hex::encode(hasher.finalize()))
}

pub fn is_duplicate_upload(conn: &Connection, kind: &str, checksum: &str) -> Result<bool> {
    let mut stmt = conn.prepare("SELECT 1 FROM uploads WHERE kind = ?1 AND checksum = ?2")?;
    Ok(stmt.exists(rusqlite::params![kind, checksum])?)
}

pub fn record_upload(
    conn: &Connection,
    kind: &str,
    path: &Path,
    checksum: &str,
    created: usize,
    skipped: usize,
) -> Result<()> {
    conn.execute(
        "INSERT INTO uploads (kind, filename, checksum, created, skipped) VALUES (?1, ?2, ?3, ?4, ?5)",
        rusqlite::params![
            kind,
            path.file_name().and_then(|n| n.to_str()).unwrap_or(""),
            checksum,
            created as i64,
            skipped as i64,
        ],
    )?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Accounts
// ---------------------------------------------------------------------------

fn parse_account_record(
    record: &csv::StringRecord,
    idx_id: usize,
    idx_name: usize,
    idx_bac: usize,
    idx_oem: Option<usize>,
    idx_primary: Option<usize>,
) -> Option<AccountRow> {
    let salesforce_id = get(record, idx_id);
    let name = get(record, idx_name);
    let raw_bac = get(record, idx_bac);
    if salesforce_id.is_empty() || name.is_empty() || raw_bac.is_empty() {
        return None;
    }
    // Brand flags come from a free-text OEM column; production values carry
    // the brand names verbatim, so this is a literal containment test.
    let oem = idx_oem.map(|i| get(record, i)).unwrap_or("");
    Some(AccountRow {
        salesforce_id: salesforce_id.to_string(),
        name: name.to_string(),
        bac: normalize_bac(raw_bac),
        is_primary: idx_primary.map(|i| parse_boolish(get(record, i))).unwrap_or(false),
        is_chevrolet: oem.contains("Chevrolet"),
        is_buick: oem.contains("Buick"),
        is_gmc: oem.contains("GMC"),
        is_cadillac: oem.contains("Cadillac"),
    })
}

/// Replace the accounts table wholesale from a Salesforce account export.
/// Rows missing id, name or BAC are skipped, never fatal.
///
/// Subscriptions are cleared in the same transaction: they key on account
/// ids, and a replace regenerates every id. Re-upload the subscription
/// export after a new account file.
pub fn import_accounts(conn: &mut Connection, path: &Path) -> Result<UploadSummary> {
    let checksum = compute_checksum(path)?;
    if is_duplicate_upload(conn, "accounts", &checksum)? {
        return Ok(UploadSummary { created: 0, skipped: 0, duplicate_file: true });
    }

    let mut rdr = open_csv(path)?;
    let headers = rdr.headers()?.clone();
    let idx_id = require_index(&headers, ACCOUNT_ID_HEADERS, "account id")?;
    let idx_name = require_index(&headers, ACCOUNT_NAME_HEADERS, "account name")?;
    let idx_bac = require_index(&headers, ACCOUNT_BAC_HEADERS, "BAC")?;
    let idx_oem = header_index(&headers, ACCOUNT_OEM_HEADERS);
    let idx_primary = header_index(&headers, ACCOUNT_PRIMARY_HEADERS);

    let mut rows: Vec<AccountRow> = Vec::new();
    let mut skipped = 0usize;
    for result in rdr.records() {
        let Ok(record) = result else {
            skipped += 1;
            continue;
        };
        match parse_account_record(&record, idx_id, idx_name, idx_bac, idx_oem, idx_primary) {
            Some(row) => rows.push(row),
            None => skipped += 1,
        }
    }

    let tx = conn.transaction()?;
    tx.execute("DELETE FROM subscriptions", [])?;
    tx.execute("DELETE FROM accounts", [])?;
    {
        let mut stmt = tx.prepare(
            "INSERT INTO accounts (salesforce_id, name, bac, is_primary, is_chevrolet, is_buick, is_gmc, is_cadillac) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )?;
        for row in &rows {
            stmt.execute(rusqlite::params![
                row.salesforce_id,
                row.name,
                row.bac,
                row.is_primary,
                row.is_chevrolet,
                row.is_buick,
                row.is_gmc,
                row.is_cadillac,
            ])?;
        }
    }
    record_upload(&tx, "accounts", path, &checksum, rows.len(), skipped)?;
    tx.commit()?;

    Ok(UploadSummary { created: rows.len(), skipped, duplicate_file: false })
}

// ---------------------------------------------------------------------------
// Subscriptions
// ---------------------------------------------------------------------------

/// Replace the subscriptions table wholesale from a Salesforce line-item
/// export. The account column must resolve against already-loaded accounts
/// and the brand column against the pricing map (which supplies product code
/// and program); the dealer price column is the transactional unit price.
pub fn import_subscriptions(conn: &mut Connection, path: &Path) -> Result<UploadSummary> {
    let checksum = compute_checksum(path)?;
    if is_duplicate_upload(conn, "subscriptions", &checksum)? {
        return Ok(UploadSummary { created: 0, skipped: 0, duplicate_file: true });
    }

    let accounts_by_sfid: HashMap<String, i64> = {
        let mut stmt = conn.prepare("SELECT salesforce_id, id FROM accounts")?;
        let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
        rows.collect::<std::result::Result<_, _>>()?
    };
    let mappings_by_canonical: HashMap<String, (String, String)> = {
        let mut stmt =
            conn.prepare("SELECT canonical, product_code, program FROM pricing WHERE is_active = 1")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                (row.get::<_, String>(1)?, row.get::<_, String>(2)?),
            ))
        })?;
        rows.collect::<std::result::Result<_, _>>()?
    };

    let mut rdr = open_csv(path)?;
    let headers = rdr.headers()?.clone();
    let idx_account = require_index(&headers, SUB_ACCOUNT_HEADERS, "account reference")?;
    let idx_brand = require_index(&headers, SUB_BRAND_HEADERS, "product brand")?;
    let idx_price = require_index(&headers, SUB_PRICE_HEADERS, "dealer price")?;
    let idx_live = header_index(&headers, SUB_LIVE_HEADERS);

    let mut rows: Vec<SubscriptionRow> = Vec::new();
    let mut skipped = 0usize;
    for result in rdr.records() {
        let Ok(record) = result else {
            skipped += 1;
            continue;
        };
        let Some(&account_id) = accounts_by_sfid.get(get(&record, idx_account)) else {
            skipped += 1;
            continue;
        };
        let Some((product_code, program)) = mappings_by_canonical.get(get(&record, idx_brand)) else {
            skipped += 1;
            continue;
        };
        let Some(unit_price) = to_whole_dollars(get(&record, idx_price)) else {
            skipped += 1;
            continue;
        };
        let Some(program) = Program::parse(program) else {
            skipped += 1;
            continue;
        };
        rows.push(SubscriptionRow {
            account_id,
            product_code: product_code.clone(),
            program,
            unit_price,
            qty: 1,
            is_live: idx_live.map(|i| parse_boolish(get(&record, i))).unwrap_or(false),
        });
    }

    let tx = conn.transaction()?;
    tx.execute("DELETE FROM subscriptions", [])?;
    {
        let mut stmt = tx.prepare(
            "INSERT INTO subscriptions (account_id, product_code, program, unit_price, qty, is_live) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )?;
        for row in &rows {
            stmt.execute(rusqlite::params![
                row.account_id,
                row.product_code,
                row.program.as_str(),
                row.unit_price,
                row.qty,
                row.is_live,
            ])?;
        }
    }
    record_upload(&tx, "subscriptions", path, &checksum, rows.len(), skipped)?;
    tx.commit()?;

    Ok(UploadSummary { created: rows.len(), skipped, duplicate_file: false })
}

// ---------------------------------------------------------------------------
// Pricing map
// ---------------------------------------------------------------------------

/// Replace the pricing map wholesale. An optional tier column differentiates
/// otherwise-duplicate codes (`CODE-TIER`); remaining duplicates are
/// collapsed last-row-wins.
pub fn import_pricing(conn: &mut Connection, path: &Path) -> Result<UploadSummary> {
    let checksum = compute_checksum(path)?;
    if is_duplicate_upload(conn, "pricing", &checksum)? {
        return Ok(UploadSummary { created: 0, skipped: 0, duplicate_file: true });
    }

    let mut rdr = open_csv(path)?;
    let headers = rdr.headers()?.clone();
    let idx_code = require_index(&headers, PRICING_CODE_HEADERS, "product code")?;
    let idx_canonical = require_index(&headers, PRICING_CANONICAL_HEADERS, "canonical name")?;
    let idx_program = require_index(&headers, PRICING_PROGRAM_HEADERS, "program")?;
    let idx_price = require_index(&headers, PRICING_PRICE_HEADERS, "price")?;
    let idx_tier = header_index(&headers, PRICING_TIER_HEADERS);

    let mut by_code: HashMap<String, MappingRow> = HashMap::new();
    let mut skipped = 0usize;
    for result in rdr.records() {
        let Ok(record) = result else {
            skipped += 1;
            continue;
        };
        let code = get(&record, idx_code);
        let canonical = get(&record, idx_canonical);
        if code.is_empty() || canonical.is_empty() {
            skipped += 1;
            continue;
        }
        let Some(program) = Program::parse(get(&record, idx_program)) else {
            skipped += 1;
            continue;
        };
        let Some(standard_price) = to_whole_dollars(get(&record, idx_price)) else {
            skipped += 1;
            continue;
        };
        if standard_price < 0 {
            skipped += 1;
            continue;
        }
        let tier = idx_tier.map(|i| get(&record, i)).unwrap_or("");
        let product_code = if tier.is_empty() {
            code.to_string()
        } else {
            format!("{code}-{tier}")
        };
        if by_code
            .insert(
                product_code.clone(),
                MappingRow {
                    product_code,
                    canonical: canonical.to_string(),
                    program,
                    standard_price,
                },
            )
            .is_some()
        {
            skipped += 1;
        }
    }

    let tx = conn.transaction()?;
    tx.execute("DELETE FROM pricing", [])?;
    {
        let mut stmt = tx.prepare(
            "INSERT INTO pricing (product_code, canonical, program, standard_price, is_active) \
             VALUES (?1, ?2, ?3, ?4, 1)",
        )?;
        for row in by_code.values() {
            stmt.execute(rusqlite::params![
                row.product_code,
                row.canonical,
                row.program.as_str(),
                row.standard_price,
            ])?;
        }
    }
    record_upload(&tx, "pricing", path, &checksum, by_code.len(), skipped)?;
    tx.commit()?;

    Ok(UploadSummary { created: by_code.len(), skipped, duplicate_file: false })
}

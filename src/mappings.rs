use rusqlite::Connection;

use crate::error::{ReconError, Result};
use crate::models::{Mapping, Program};

pub fn create(
    conn: &Connection,
    product_code: &str,
    canonical: &str,
    program: Program,
    standard_price: i64,
) -> Result<()> {
    if standard_price < 0 {
        return Err(ReconError::Validation("price must be non-negative".to_string()));
    }
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO pricing (product_code, canonical, program, standard_price, is_active) \
         VALUES (?1, ?2, ?3, ?4, 1)",
        rusqlite::params![product_code, canonical, program.as_str(), standard_price],
    )?;
    if inserted == 0 {
        return Err(ReconError::Validation(format!(
            "mapping already exists for product code {product_code}"
        )));
    }
    Ok(())
}

pub struct MappingFilter {
    pub product_code: Option<String>,
    pub canonical: Option<String>,
    pub program: Option<Program>,
}

pub fn list(conn: &Connection, filter: &MappingFilter) -> Result<Vec<Mapping>> {
    let mut clauses: Vec<&str> = Vec::new();
    let mut params: Vec<String> = Vec::new();
    if let Some(code) = &filter.product_code {
        params.push(format!("%{code}%"));
        clauses.push("product_code LIKE ?");
    }
    if let Some(canonical) = &filter.canonical {
        params.push(format!("%{canonical}%"));
        clauses.push("canonical LIKE ?");
    }
    if let Some(program) = filter.program {
        params.push(program.as_str().to_string());
        clauses.push("program = ?");
    }
    let where_clause = if clauses.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", clauses.join(" AND "))
    };
    let sql = format!(
        "SELECT product_code, canonical, program, standard_price, is_active \
         FROM pricing {where_clause} ORDER BY product_code ASC"
    );
    let param_refs: Vec<&dyn rusqlite::types::ToSql> =
        params.iter().map(|p| p as &dyn rusqlite::types::ToSql).collect();
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(param_refs.as_slice(), |row| {
        Ok(Mapping {
            product_code: row.get(0)?,
            canonical: row.get(1)?,
            program: row.get(2)?,
            standard_price: row.get(3)?,
            is_active: row.get(4)?,
        })
    })?;
    Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
}

pub struct MappingPatch {
    pub canonical: Option<String>,
    pub program: Option<Program>,
    pub standard_price: Option<i64>,
    pub is_active: Option<bool>,
}

pub fn update(conn: &Connection, product_code: &str, patch: &MappingPatch) -> Result<()> {
    if let Some(price) = patch.standard_price {
        if price < 0 {
            return Err(ReconError::Validation("price must be non-negative".to_string()));
        }
    }
    let affected = conn.execute(
        "UPDATE pricing SET \
            canonical = COALESCE(?1, canonical), \
            program = COALESCE(?2, program), \
            standard_price = COALESCE(?3, standard_price), \
            is_active = COALESCE(?4, is_active) \
         WHERE product_code = ?5",
        rusqlite::params![
            patch.canonical,
            patch.program.map(|p| p.as_str()),
            patch.standard_price,
            patch.is_active,
            product_code,
        ],
    )?;
    if affected == 0 {
        return Err(ReconError::NotFound("Mapping", product_code.to_string()));
    }
    Ok(())
}

pub fn delete(conn: &Connection, product_code: &str) -> Result<()> {
    let affected = conn.execute("DELETE FROM pricing WHERE product_code = ?1", [product_code])?;
    if affected == 0 {
        return Err(ReconError::NotFound("Mapping", product_code.to_string()));
    }
    Ok(())
}

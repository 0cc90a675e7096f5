use std::fmt;
use std::str::FromStr;

use crate::error::ReconError;

/// Billing channel. Every subscription, invoice and discrepancy belongs to
/// exactly one program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Program {
    Site,
    Chat,
    Trade,
}

impl Program {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Site => "SITE",
            Self::Chat => "CHAT",
            Self::Trade => "TRADE",
        }
    }

    /// Parse a program cell, accepting the legacy abbreviations that still
    /// show up in older pricing sheets (WEB, CHT, TRD).
    pub fn parse(raw: &str) -> Option<Program> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "SITE" | "WEB" => Some(Self::Site),
            "CHAT" | "CHT" => Some(Self::Chat),
            "TRADE" | "TRD" => Some(Self::Trade),
            _ => None,
        }
    }
}

impl FromStr for Program {
    type Err = ReconError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| ReconError::UnknownProgram(s.to_string()))
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscrepancyStatus {
    Open,
    InReview,
    Resolved,
}

impl DiscrepancyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "OPEN",
            Self::InReview => "IN_REVIEW",
            Self::Resolved => "RESOLVED",
        }
    }
}

impl FromStr for DiscrepancyStatus {
    type Err = ReconError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "OPEN" => Ok(Self::Open),
            "IN_REVIEW" => Ok(Self::InReview),
            "RESOLVED" => Ok(Self::Resolved),
            _ => Err(ReconError::UnknownStatus(s.to_string())),
        }
    }
}

impl fmt::Display for DiscrepancyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[allow(dead_code)]
#[derive(Debug, Clone)]
pub struct Account {
    pub id: i64,
    pub salesforce_id: String,
    pub name: String,
    pub bac: String,
    pub is_primary: bool,
    pub is_chevrolet: bool,
    pub is_buick: bool,
    pub is_gmc: bool,
    pub is_cadillac: bool,
}

#[allow(dead_code)]
#[derive(Debug, Clone)]
pub struct Mapping {
    pub product_code: String,
    pub canonical: String,
    pub program: String,
    pub standard_price: i64,
    pub is_active: bool,
}

#[allow(dead_code)]
#[derive(Debug, Clone)]
pub struct Invoice {
    pub id: i64,
    pub program: String,
    pub period: String,
    pub file_name: String,
    pub is_current: bool,
    pub created_at: String,
    pub line_count: i64,
}

#[derive(Debug, Clone)]
pub struct Discrepancy {
    pub id: i64,
    pub bac: String,
    pub program: String,
    pub period: String,
    pub sf_name: String,
    pub account_count: i64,
    pub sf_total: i64,
    pub gm_total: i64,
    pub variance: i64,
    pub status: String,
    pub updated_at: String,
}

#[allow(dead_code)]
#[derive(Debug, Clone)]
pub struct Report {
    pub id: i64,
    pub name: String,
    pub program: String,
    pub period: String,
    pub created_by: String,
    pub created_at: String,
    pub entry_count: i64,
}

/// A subscription or invoice line shown in discrepancy drill-down.
#[derive(Debug, Clone)]
pub struct DetailLine {
    pub source: String,
    pub account_name: String,
    pub product_code: String,
    pub qty: i64,
    pub unit_price: i64,
}

// ---------------------------------------------------------------------------
// Validated ingestion rows. Parsers turn raw header-keyed records into these,
// or into a skip tally; nothing downstream ever sees a half-valid row.
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct AccountRow {
    pub salesforce_id: String,
    pub name: String,
    pub bac: String,
    pub is_primary: bool,
    pub is_chevrolet: bool,
    pub is_buick: bool,
    pub is_gmc: bool,
    pub is_cadillac: bool,
}

#[derive(Debug, Clone)]
pub struct SubscriptionRow {
    pub account_id: i64,
    pub product_code: String,
    pub program: Program,
    pub unit_price: i64,
    pub qty: i64,
    pub is_live: bool,
}

#[derive(Debug, Clone)]
pub struct MappingRow {
    pub product_code: String,
    pub canonical: String,
    pub program: Program,
    pub standard_price: i64,
}

#[derive(Debug, Clone)]
pub struct InvoiceLineRow {
    pub bac: String,
    pub product_code: String,
    pub name: String,
    pub qty: i64,
    pub unit_price: i64,
}

/// Parse a boolean-like spreadsheet cell ("TRUE", "Yes", "1", "live"...).
pub fn parse_boolish(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "true" | "t" | "yes" | "y" | "1" | "live" | "active"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_program_parse_canonical_and_legacy() {
        assert_eq!(Program::parse("SITE"), Some(Program::Site));
        assert_eq!(Program::parse("chat"), Some(Program::Chat));
        assert_eq!(Program::parse(" Trade "), Some(Program::Trade));
        assert_eq!(Program::parse("WEB"), Some(Program::Site));
        assert_eq!(Program::parse("cht"), Some(Program::Chat));
        assert_eq!(Program::parse("TRD"), Some(Program::Trade));
        assert_eq!(Program::parse("EMAIL"), None);
    }

    #[test]
    fn test_status_round_trip() {
        for s in ["OPEN", "IN_REVIEW", "RESOLVED"] {
            assert_eq!(s.parse::<DiscrepancyStatus>().unwrap().as_str(), s);
        }
        assert!("CLOSED".parse::<DiscrepancyStatus>().is_err());
    }

    #[test]
    fn test_parse_boolish() {
        assert!(parse_boolish("TRUE"));
        assert!(parse_boolish("Yes"));
        assert!(parse_boolish(" 1 "));
        assert!(parse_boolish("Live"));
        assert!(!parse_boolish("FALSE"));
        assert!(!parse_boolish(""));
        assert!(!parse_boolish("0"));
    }
}

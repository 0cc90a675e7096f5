pub mod disc;
pub mod init;
pub mod invoices;
pub mod map;
pub mod recalculate;
pub mod report;
pub mod status;
pub mod upload;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "brecon", about = "Dealer billing reconciliation: SF subscription exports vs GM vendor invoices.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Set up brecon: choose a data directory and initialize the database.
    Init {
        /// Path for brecon data (default: ~/Documents/brecon)
        #[arg(long = "data-dir")]
        data_dir: Option<String>,
    },
    /// Upload source files (wholesale replace per entity).
    Upload {
        #[command(subcommand)]
        command: UploadCommands,
    },
    /// List or delete uploaded GM invoices.
    Invoices {
        #[command(subcommand)]
        command: InvoiceCommands,
    },
    /// Recompute the discrepancy set for one program and period.
    Recalculate {
        /// Program: SITE, CHAT or TRADE
        #[arg(long)]
        program: String,
        /// Billing period: YYYY-MM
        #[arg(long)]
        period: String,
    },
    /// Browse and review discrepancies.
    Disc {
        #[command(subcommand)]
        command: DiscCommands,
    },
    /// Manage product-code-to-program price mappings.
    Map {
        #[command(subcommand)]
        command: MapCommands,
    },
    /// Curate and export discrepancy reports.
    Report {
        #[command(subcommand)]
        command: ReportCommands,
    },
    /// Show database location and summary statistics.
    Status,
}

#[derive(Subcommand)]
pub enum UploadCommands {
    /// Replace all accounts from a Salesforce account export (CSV).
    Accounts { file: String },
    /// Replace all subscriptions from a Salesforce line-item export (CSV).
    Subscriptions { file: String },
    /// Replace the pricing map from a pricing sheet (CSV).
    Pricing { file: String },
    /// Ingest a GM vendor invoice (XLSX) as current for a program/period.
    Invoice {
        file: String,
        /// Program: SITE, CHAT or TRADE
        #[arg(long)]
        program: String,
        /// Billing period: YYYY-MM
        #[arg(long)]
        period: String,
    },
}

#[derive(Subcommand)]
pub enum InvoiceCommands {
    /// List uploaded invoices, newest first.
    List,
    /// Delete an invoice and its lines.
    Delete { id: i64 },
}

#[derive(Subcommand)]
pub enum DiscCommands {
    /// List discrepancies with filters, paging and sorting.
    List {
        #[arg(long)]
        program: Option<String>,
        #[arg(long)]
        period: Option<String>,
        /// OPEN, IN_REVIEW or RESOLVED
        #[arg(long)]
        status: Option<String>,
        /// BAC substring filter
        #[arg(long)]
        bac: Option<String>,
        #[arg(long, default_value_t = 1)]
        page: usize,
        #[arg(long = "page-size", default_value_t = 50)]
        page_size: usize,
        /// bac | name | sfTotal | gmTotal | variance | status | updatedAt
        #[arg(long = "sort-by")]
        sort_by: Option<String>,
        /// Sort ascending instead of descending
        #[arg(long)]
        asc: bool,
    },
    /// Show one discrepancy with its SF and GM constituent lines.
    Details { id: i64 },
    /// Set the review status of a discrepancy.
    SetStatus {
        id: i64,
        /// OPEN, IN_REVIEW or RESOLVED
        status: String,
    },
    /// List the accounts behind a dealer group key.
    Accounts { bac: String },
}

#[derive(Subcommand)]
pub enum MapCommands {
    /// List mappings, optionally filtered.
    List {
        /// Product code substring
        #[arg(long)]
        code: Option<String>,
        /// Canonical name substring
        #[arg(long)]
        canonical: Option<String>,
        #[arg(long)]
        program: Option<String>,
    },
    /// Add a mapping.
    Add {
        code: String,
        canonical: String,
        program: String,
        price: i64,
    },
    /// Update fields of a mapping.
    Update {
        code: String,
        #[arg(long)]
        canonical: Option<String>,
        #[arg(long)]
        program: Option<String>,
        #[arg(long)]
        price: Option<i64>,
        #[arg(long)]
        active: Option<bool>,
    },
    /// Remove a mapping.
    Remove { code: String },
}

#[derive(Subcommand)]
pub enum ReportCommands {
    /// Create a named report for a program/period.
    Create {
        name: String,
        #[arg(long)]
        program: String,
        #[arg(long)]
        period: String,
    },
    /// List reports, newest first.
    List,
    /// Show the report for a program/period, if any.
    Show {
        #[arg(long)]
        program: String,
        #[arg(long)]
        period: String,
    },
    /// Attach discrepancies to a report.
    Add {
        id: i64,
        /// Discrepancy ids to attach
        #[arg(required = true)]
        discrepancy_ids: Vec<i64>,
        /// Pin a specific account name for these entries
        #[arg(long = "account-name")]
        account_name: Option<String>,
        /// Pin a specific Salesforce id for these entries
        #[arg(long)]
        sfid: Option<String>,
        #[arg(long)]
        primary: Option<bool>,
    },
    /// Update category/notes/pinned account of an entry.
    UpdateEntry {
        entry_id: i64,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        notes: Option<String>,
        #[arg(long = "account-name")]
        account_name: Option<String>,
        #[arg(long)]
        sfid: Option<String>,
        #[arg(long)]
        primary: Option<bool>,
    },
    /// Remove one entry.
    RemoveEntry { entry_id: i64 },
    /// Remove all entries, keeping the report.
    Clear { id: i64 },
    /// Delete a report and its entries.
    Delete { id: i64 },
    /// Export a report as CSV.
    Export {
        id: i64,
        /// Output path (default: <data_dir>/exports/<name>-YYYY-MM-DD.csv)
        #[arg(long)]
        output: Option<String>,
    },
}

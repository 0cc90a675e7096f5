mod cli;
mod db;
mod error;
mod fmt;
mod ingest;
mod invoice;
mod mappings;
mod models;
mod normalize;
mod query;
mod recon;
mod reports;
mod settings;

use clap::Parser;

use cli::{Cli, Commands, DiscCommands, InvoiceCommands, MapCommands, ReportCommands, UploadCommands};

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Init { data_dir } => cli::init::run(data_dir),
        Commands::Upload { command } => match command {
            UploadCommands::Accounts { file } => cli::upload::accounts(&file),
            UploadCommands::Subscriptions { file } => cli::upload::subscriptions(&file),
            UploadCommands::Pricing { file } => cli::upload::pricing(&file),
            UploadCommands::Invoice { file, program, period } => {
                cli::upload::invoice(&file, &program, &period)
            }
        },
        Commands::Invoices { command } => match command {
            InvoiceCommands::List => cli::invoices::list(),
            InvoiceCommands::Delete { id } => cli::invoices::delete(id),
        },
        Commands::Recalculate { program, period } => cli::recalculate::run(&program, &period),
        Commands::Disc { command } => match command {
            DiscCommands::List {
                program,
                period,
                status,
                bac,
                page,
                page_size,
                sort_by,
                asc,
            } => cli::disc::list(program, period, status, bac, page, page_size, sort_by, asc),
            DiscCommands::Details { id } => cli::disc::details(id),
            DiscCommands::SetStatus { id, status } => cli::disc::set_status(id, &status),
            DiscCommands::Accounts { bac } => cli::disc::accounts(&bac),
        },
        Commands::Map { command } => match command {
            MapCommands::List { code, canonical, program } => cli::map::list(code, canonical, program),
            MapCommands::Add { code, canonical, program, price } => {
                cli::map::add(&code, &canonical, &program, price)
            }
            MapCommands::Update { code, canonical, program, price, active } => {
                cli::map::update(&code, canonical, program, price, active)
            }
            MapCommands::Remove { code } => cli::map::remove(&code),
        },
        Commands::Report { command } => match command {
            ReportCommands::Create { name, program, period } => {
                cli::report::create(&name, &program, &period)
            }
            ReportCommands::List => cli::report::list(),
            ReportCommands::Show { program, period } => cli::report::show(&program, &period),
            ReportCommands::Add { id, discrepancy_ids, account_name, sfid, primary } => {
                cli::report::add(id, &discrepancy_ids, account_name, sfid, primary)
            }
            ReportCommands::UpdateEntry { entry_id, category, notes, account_name, sfid, primary } => {
                cli::report::update_entry(entry_id, category, notes, account_name, sfid, primary)
            }
            ReportCommands::RemoveEntry { entry_id } => cli::report::remove_entry(entry_id),
            ReportCommands::Clear { id } => cli::report::clear(id),
            ReportCommands::Delete { id } => cli::report::delete(id),
            ReportCommands::Export { id, output } => cli::report::export(id, output),
        },
        Commands::Status => cli::status::run(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

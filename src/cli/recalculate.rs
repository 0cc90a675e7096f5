use crate::db::get_connection;
use crate::error::Result;
use crate::models::Program;
use crate::recon;
use crate::settings::db_path;

pub fn run(program: &str, period: &str) -> Result<()> {
    let program: Program = program.parse()?;
    let mut conn = get_connection(&db_path())?;
    let summary = recon::recalculate(&mut conn, program, period)?;
    println!("Recalculated {program} {period}: {} discrepancies", summary.inserted);
    Ok(())
}

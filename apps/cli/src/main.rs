//! payslip CLI: split payroll PDFs per employee.
//!
//! Reads a multi-employee payroll PDF, writes one document per employee,
//! and moves source and result files through Google Drive.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}

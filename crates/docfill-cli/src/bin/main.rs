//! docfill CLI binary entry point

use anyhow::Result;
use docfill_cli::run_cli;

fn main() -> Result<()> {
    run_cli()
}

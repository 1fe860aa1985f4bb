//! forge - build a platform-specific agent release artifact.
//!
//! Run from the agent's devtools directory:
//!
//! ```text
//! forge 2.2.8 rpm      # -> VFAgent_2_2_8-rpm5_64.tar.gz
//! forge 2.2.8 mac      # -> VFAgent_2_2_8.dmg
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use std::process::ExitCode;

use agent_forge::config::ForgeConfig;
use agent_forge::forge::Forge;
use agent_forge::platform::Platform;
use agent_forge::preflight;
use agent_forge::release::ReleaseDescriptor;

#[derive(Parser)]
#[command(name = "forge")]
#[command(about = "Package the agent for one platform")]
#[command(after_help = format!("PLATFORMS:\n  {}", Platform::supported_list()))]
struct Cli {
    /// Release version, x.x.x
    version: String,

    /// Target platform
    platform: String,

    /// Only run preflight checks
    #[arg(long)]
    preflight: bool,

    /// Print the resolved configuration before building
    #[arg(long)]
    show_config: bool,

    /// More diagnostics (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    agent_forge::logging::init(cli.verbose);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    // Nothing is touched until the release is known to be valid.
    let release = ReleaseDescriptor::parse(&cli.version, &cli.platform)?;

    let base_dir = std::env::current_dir().context("Failed to read the current directory")?;
    let config = ForgeConfig::load(&base_dir)?;
    if cli.show_config {
        config.print();
        println!();
    }

    if cli.preflight {
        let report = preflight::run_preflight(&config, release.platform);
        report.print();
        if !report.all_passed() {
            anyhow::bail!("{} preflight check(s) failed", report.fail_count());
        }
        return Ok(());
    }

    Forge::new(config).build(&release)?;
    Ok(())
}

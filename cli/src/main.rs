//! Dutch auction simulator and inspection tool

mod script;

use clap::{Parser, Subcommand};
use dutch_auction::units::format_units;
use dutch_auction::{AuctionFile, PricingEngine, DECIMALS};
use owo_colors::OwoColorize;
use std::path::PathBuf;

use script::{Script, SimulationReport};

#[derive(Parser)]
#[command(name = "dutch-auction")]
#[command(about = "Dutch auction price curve and settlement simulator")]
#[command(version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("GIT_HASH"), ")"))]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate an auction config
    Check {
        /// Path to the auction TOML file
        #[arg(short, long, value_name = "FILE")]
        config: PathBuf,
    },

    /// Print the price curve across the sale
    Price {
        #[arg(short, long, value_name = "FILE")]
        config: PathBuf,

        /// Seconds between samples
        #[arg(short, long, default_value = "86400")]
        step: u64,
    },

    /// Replay a bid script against the auction
    Simulate {
        #[arg(short, long, value_name = "FILE")]
        config: PathBuf,

        /// JSON step script
        #[arg(short, long, value_name = "FILE")]
        script: PathBuf,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
}

fn units(value: u128) -> String {
    format_units(value, DECIMALS)
}

fn check(file: &AuctionFile) -> Result<(), Box<dyn std::error::Error>> {
    let config = file.auction_config()?;
    println!("{}", "✓ Auction config valid".green());
    println!("  Owner:       {}", config.owner);
    println!("  Beneficiary: {}", config.beneficiary);
    println!("  Ceiling:     {}", units(config.ceiling));

    match file.sale_parameters()? {
        Some(sale) => {
            println!("{}", "✓ Sale parameters valid".green());
            println!("  Duration:    {} days", sale.duration_days);
            println!("  Start price: {}", units(sale.initial_unit_price));
            println!("  Decay:       {}/s", units(sale.decay_rate_per_second));
            println!("  Floor price: {}", units(sale.floor_price()).bright_blue());
        }
        None => println!("{}", "⚠ No [sale] section".yellow()),
    }
    Ok(())
}

fn price(file: &AuctionFile, step: u64) -> Result<(), Box<dyn std::error::Error>> {
    let sale = file
        .sale_parameters()?
        .ok_or("config has no [sale] section")?;
    let engine = PricingEngine::new(&sale);

    println!("\n📉 Price curve");
    println!("═══════════════════════════════════");
    for (elapsed, value) in engine.curve(step)? {
        println!("{:>10}s  {}", elapsed, units(value));
    }
    println!();
    Ok(())
}

fn print_report(report: &SimulationReport) {
    println!("\n🔨 Simulation");
    println!("═══════════════════════════════════");
    for outcome in &report.outcomes {
        let marker = if outcome.ok {
            "✓".green().to_string()
        } else {
            "✗".red().to_string()
        };
        println!(
            "{} [+{:>7}s] {}",
            marker,
            outcome.elapsed,
            outcome.message
        );
    }

    let snapshot = &report.snapshot;
    println!("\n{}", "Final state".yellow().bold());
    println!("  Stage:          {}", snapshot.stage);
    println!("  Total received: {}", units(snapshot.total_received));
    println!("  Forwarded:      {}", report.forwarded);
    if let Some(price) = snapshot.closing_price {
        println!("  Closing price:  {}", units(price).bright_blue());
    }
    if let Some(reason) = snapshot.close_reason {
        println!("  Closed by:      {:?}", reason);
    }
    println!("  Escrow supply:  {}", units(snapshot.escrow_supply));
    println!("  Claimed:        {} ({} accounts)", units(snapshot.claimed_total), snapshot.claimed);

    if !report.balances.is_empty() {
        println!("\n{}", "Token balances".yellow().bold());
        for (holder, balance) in &report.balances {
            println!("  {:<48} {}", holder.to_string(), balance.green());
        }
    }
    println!();
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Check { config } => {
            let file = AuctionFile::load(&config)?;
            check(&file)?;
        }

        Commands::Price { config, step } => {
            let file = AuctionFile::load(&config)?;
            price(&file, step)?;
        }

        Commands::Simulate {
            config,
            script: script_path,
            json,
        } => {
            let file = AuctionFile::load(&config)?;
            let steps = Script::load(&script_path)?;
            let report = script::run(&file, &steps)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_report(&report);
            }
        }
    }

    Ok(())
}

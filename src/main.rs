use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};

use magazine_invoice::config::BrandingConfig;
use magazine_invoice::currency::money;
use magazine_invoice::model::today;
use magazine_invoice::{Error, Invoice, totals};

#[derive(Parser)]
#[command(name = "magazine-invoice", version, about = "Build magazine invoices as PDF")]
struct Cli {
    /// Log debug output (phase timings, layout decisions)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Export an invoice JSON file as PDF
    Export {
        #[arg(long)]
        invoice: PathBuf,
        /// Branding JSON (magazine name, logos, payment details, fonts, page setup)
        #[arg(long)]
        branding: Option<PathBuf>,
        /// Defaults to Invoice_<client>.pdf
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print per-row and aggregate totals
    Totals {
        #[arg(long)]
        invoice: PathBuf,
    },
    /// Recover an invoice from an exported PDF or extracted text
    Import {
        file: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Write a blank invoice dated today
    New {
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn write_json(invoice: &Invoice, output: Option<&Path>) -> Result<(), Error> {
    let json = serde_json::to_string_pretty(invoice)?;
    match output {
        Some(path) => std::fs::write(path, json).map_err(|e| Error::Io {
            path: path.to_path_buf(),
            source: e,
        }),
        None => {
            println!("{json}");
            Ok(())
        }
    }
}

fn run(command: Command) -> Result<(), Error> {
    match command {
        Command::Export {
            invoice,
            branding,
            output,
        } => {
            let invoice = magazine_invoice::read_invoice(&invoice)?;
            let mut cfg = match branding {
                Some(path) => BrandingConfig::from_file(&path)?,
                None => BrandingConfig::default(),
            };
            cfg.apply_env();
            let session_cfg = cfg.load()?;
            let output = output
                .unwrap_or_else(|| PathBuf::from(magazine_invoice::suggested_file_name(&invoice)));
            let doc = magazine_invoice::export_invoice_to_file(
                &invoice,
                &session_cfg.branding,
                &session_cfg.options,
                &output,
            )?;
            for omitted in &doc.omitted_images {
                eprintln!("warning: {:?} image {} omitted: {}", omitted.role, omitted.name, omitted.error);
            }
            println!("{} ({} pages)", output.display(), doc.pages);
        }
        Command::Totals { invoice } => {
            let invoice = magazine_invoice::read_invoice(&invoice)?;
            let items: Vec<_> = invoice.exportable_items().collect();
            let t = totals::compute(items.iter().copied());
            for (item, row) in items.iter().zip(&t.rows) {
                println!(
                    "{:>4}  {:<32} {:>6} {:>14} {:>14} {:>14}",
                    item.page_ref,
                    item.product_name.trim(),
                    item.quantity(),
                    money(row.catalog_total),
                    money(row.list_total),
                    money(row.profit),
                );
            }
            println!(
                "{:>4}  {:<32} {:>6} {:>14} {:>14} {:>14}",
                "",
                "TOTALS",
                "",
                money(t.catalog_sum),
                money(t.list_sum),
                money(t.profit_sum),
            );
        }
        Command::Import { file, output } => {
            let report = magazine_invoice::import_file(&file)?;
            for warning in &report.warnings {
                eprintln!("warning: {warning}");
            }
            write_json(&report.invoice, output.as_deref())?;
        }
        Command::New { output } => {
            write_json(&Invoice::new(today()), output.as_deref())?;
        }
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    if let Err(e) = run(cli.command) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

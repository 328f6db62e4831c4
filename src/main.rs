use std::error::Error;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use chrono::{Datelike, NaiveDate};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use facturx::cii::ConformanceLevel;
use facturx::compliance::ComplianceValidator;
use facturx::config::Settings;
use facturx::core::{InvoiceCreateRequest, create_invoice, sample_request};
use facturx::facturx::{
    DocumentMetadata, SummaryPdfRenderer, extract_xml, generate_facturx, inspect,
};

/// Generate, validate and inspect Factur-X invoices
#[derive(Parser, Debug)]
#[command(name = "facturx")]
#[command(version)]
struct Cli {
    /// Settings file (TOML)
    #[arg(short = 'c', long = "config", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build an invoice from a JSON request and write the Factur-X PDF
    Generate {
        /// Invoice request (JSON); the built-in sample when omitted
        #[arg(short = 'r', long = "request")]
        request: Option<PathBuf>,

        /// Conformance level, defaults to the configured profile
        #[arg(short = 'l', long = "level")]
        level: Option<ConformanceLevel>,

        /// Invoice number, defaults to the next number of the configured sequence
        #[arg(short = 'n', long = "number")]
        number: Option<String>,

        /// Issue date (YYYY-MM-DD), defaults to today
        #[arg(long = "issue-date")]
        issue_date: Option<NaiveDate>,

        /// Output PDF path
        #[arg(short = 'o', long = "output")]
        output: PathBuf,

        /// Also write the CII XML here
        #[arg(long = "xml")]
        xml: Option<PathBuf>,
    },
    /// Validate a PDF and print the report as JSON
    Validate { pdf: PathBuf },
    /// Write the embedded invoice XML to stdout or a file
    Extract {
        pdf: PathBuf,
        #[arg(short = 'o', long = "output")]
        output: Option<PathBuf>,
    },
    /// Print a Factur-X summary of a PDF as JSON
    Inspect { pdf: PathBuf },
    /// Show which validation backends are available
    Info,
}

fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn print_json(value: &impl Serialize) -> Result<(), Box<dyn Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn read_file(path: &Path) -> Result<Vec<u8>, Box<dyn Error>> {
    std::fs::read(path).map_err(|e| format!("cannot read {}: {e}", path.display()).into())
}

fn run(cli: Cli, settings: Settings) -> Result<ExitCode, Box<dyn Error>> {
    match cli.command {
        Command::Generate {
            request,
            level,
            number,
            issue_date,
            output,
            xml,
        } => {
            let request: InvoiceCreateRequest = match request {
                Some(path) => serde_json::from_slice(&read_file(&path)?)?,
                None => sample_request(),
            };
            let issue_date = issue_date.unwrap_or_else(|| chrono::Local::now().date_naive());
            let number = match number {
                Some(n) => n,
                None => {
                    let mut seq = settings.business.number_sequence(issue_date.year())?;
                    seq.next_number()
                }
            };
            let level = match level {
                Some(l) => l,
                None => settings.profile()?,
            };

            let invoice = create_invoice(&request, &settings.business, number, issue_date)?;
            let meta = DocumentMetadata::for_business(&settings.business)
                .with_invoice_number(&invoice.number);
            let validator = ComplianceValidator::from_settings(&settings.compliance);
            let generated = generate_facturx(
                &invoice,
                &SummaryPdfRenderer::default(),
                level,
                &meta,
                &validator,
            )?;

            std::fs::write(&output, &generated.pdf)?;
            if let Some(path) = xml {
                std::fs::write(path, &generated.xml)?;
            }
            info!(path = %output.display(), number = %invoice.number, "wrote Factur-X PDF");
            print_json(&generated.validation)?;
            Ok(if generated.validation.is_valid {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(2)
            })
        }
        Command::Validate { pdf } => {
            let validator = ComplianceValidator::from_settings(&settings.compliance);
            let report = validator.validate(&read_file(&pdf)?);
            print_json(&report)?;
            Ok(if report.is_valid {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(2)
            })
        }
        Command::Extract { pdf, output } => {
            let Some(embedded) = extract_xml(&read_file(&pdf)?) else {
                return Err(format!("no Factur-X XML found in {}", pdf.display()).into());
            };
            match output {
                Some(path) => std::fs::write(path, &embedded.content)?,
                None => {
                    use std::io::Write;
                    std::io::stdout().write_all(&embedded.content)?;
                }
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Inspect { pdf } => {
            let validator = ComplianceValidator::from_settings(&settings.compliance);
            print_json(&inspect(&read_file(&pdf)?, &validator))?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Info => {
            let validator = ComplianceValidator::from_settings(&settings.compliance);
            print_json(&validator.validation_info())?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let settings = match Settings::load(cli.config.as_deref()) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };
    init_tracing(&settings.logging.level);

    match run(cli, settings) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

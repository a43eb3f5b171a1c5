use anyhow::{bail, Context, Result};
use bursar_core::utils::money::{format_brl, parse_amount};
use bursar_core::{
    BankSlipDesk, BankSlipStatus, BatchForm, BatchId, BulkImporter, CsvTemplate,
    FinancialPlatform, ImportKind, PlatformConfig, ReportRequest, RestPlatform,
    ScholarshipDefaults, SlipFilter,
};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "bursar", version, about = "School back-office finance operations")]
struct Cli {
    /// TOML settings file; BURSAR_* environment variables are used when absent
    #[arg(short = 'c', long = "config", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write a CSV import template
    Template {
        #[arg(long, default_value = "students")]
        kind: ImportKind,
        #[arg(long, default_value = ".")]
        dir: PathBuf,
    },
    /// Import a CSV file of student financial data or scholarships
    Import {
        #[arg(long)]
        kind: ImportKind,
        #[arg(long)]
        file: PathBuf,
        /// Scholarship applied to rows that have none
        #[arg(long)]
        scholarship_id: Option<String>,
        #[arg(long)]
        start_date: Option<NaiveDate>,
        #[arg(long)]
        end_date: Option<NaiveDate>,
    },
    /// List students that can receive bank slips
    Students,
    /// Generate one bank slip per student
    Generate {
        #[arg(long = "student", required = true)]
        students: Vec<String>,
        #[arg(long)]
        amount: String,
        /// YYYY-MM-DD
        #[arg(long)]
        due_date: String,
        #[arg(long, default_value = "")]
        description: String,
    },
    /// Email a generated batch
    Send {
        #[arg(long)]
        batch: String,
        #[arg(long)]
        template: String,
    },
    /// List bank slips with their current amount due
    Slips {
        #[arg(long)]
        status: Option<BankSlipStatus>,
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        from: Option<NaiveDate>,
        #[arg(long)]
        to: Option<NaiveDate>,
    },
    /// Record a payment; the amount defaults to what is due today
    Pay {
        #[arg(long)]
        slip: String,
        #[arg(long)]
        amount: Option<String>,
    },
    /// Print the financial dashboard rows
    Dashboard,
}

fn load_config(path: Option<&PathBuf>) -> Result<PlatformConfig> {
    let config = match path {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            PlatformConfig::from_toml_str(&text)?
        }
        None => PlatformConfig::from_env()?,
    };
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    // Templates need no platform
    if let Command::Template { kind, dir } = &cli.command {
        let path = CsvTemplate::new(*kind).write_to(dir)?;
        println!("{}", path.display());
        return Ok(());
    }

    let config = load_config(cli.config.as_ref())?;
    info!(base_url = %config.base_url, "using platform");
    let platform = RestPlatform::new(config.clone())?;
    let desk = BankSlipDesk::from_config(platform.clone(), &config)?;
    let today = Utc::now().date_naive();

    match cli.command {
        Command::Template { .. } => {}
        Command::Import {
            kind,
            file,
            scholarship_id,
            start_date,
            end_date,
        } => {
            let text = std::fs::read_to_string(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            let defaults = ScholarshipDefaults {
                scholarship_id,
                start_date,
                end_date,
            };
            let mut importer = BulkImporter::new(platform);
            importer.import_csv(kind, &text, &defaults).await?;
            if let Some(view) = importer.view() {
                print!("{}", view.render());
                if view.has_failures() {
                    bail!("{} rows failed", view.failed);
                }
            }
        }
        Command::Students => {
            for user in desk.eligible_recipients().await? {
                println!("{}\t{}\t{}", user.id, user.name, user.email);
            }
        }
        Command::Generate {
            students,
            amount,
            due_date,
            description,
        } => {
            let batch = desk
                .generate_from_form(BatchForm {
                    selected_students: students,
                    amount,
                    due_date,
                    description,
                })
                .await?;
            println!("{}", batch);
        }
        Command::Send { batch, template } => {
            desk.send_batch(&BatchId(batch), &template).await?;
        }
        Command::Slips {
            status,
            search,
            from,
            to,
        } => {
            let filter = SlipFilter {
                status,
                search,
                due_from: from,
                due_to: to,
            };
            let rows = desk
                .list_with_amount_due(&filter, today)
                .await
                .context("assessing amounts due")?;
            for (slip, due) in rows {
                println!(
                    "{}\t{}\t{}\t{}\t{}",
                    slip.id,
                    slip.student_id,
                    slip.due_date,
                    slip.status.label(),
                    due.as_ref().map(format_brl).unwrap_or_else(|| "-".to_string())
                );
            }
        }
        Command::Pay { slip, amount } => {
            let amount = amount.as_deref().map(parse_amount).transpose()?;
            let receipt = desk.pay(&slip, amount, None).await?;
            println!(
                "{} {}",
                receipt.outcome.message,
                receipt.transaction_id().unwrap_or("")
            );
        }
        Command::Dashboard => {
            let rows = platform.run_report(&ReportRequest::Dashboard).await?;
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }
    }

    Ok(())
}

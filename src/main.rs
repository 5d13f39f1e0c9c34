use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{ArgGroup, Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod backend;
mod classes;
mod config;
mod db;
mod gemini;
mod intake;
mod lifecycle;
mod models;
mod prompts;
mod report;
mod retry;
mod routes;

use crate::lifecycle::{PackageTier, StatusFilter, Transition, DEFAULT_REVIEWER};
use crate::models::{ApplicationForm, BillingInfo, Language, StudentDataForReport};
use crate::report::ReportFormat;

#[derive(Parser)]
#[command(name = "kinekids-ambassador")]
#[command(about = "Ambassador application workflow and AI student reports for KineKids", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load sample applications
    Seed,
    /// Submit an application from a JSON form file
    Submit {
        #[arg(long)]
        json: PathBuf,
    },
    /// List applications, newest first
    List {
        /// Exact status such as `approved`; any `*-pending` value selects every awaiting-payment status
        #[arg(long)]
        status: Option<String>,
        #[arg(long, default_value = "tr")]
        lang: String,
    },
    /// Show one application
    Show { id: String },
    /// Pre-approve a pending application
    Approve {
        id: String,
        #[arg(long, default_value = DEFAULT_REVIEWER)]
        reviewer: String,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Reject a pending application
    Reject {
        id: String,
        #[arg(long, default_value = DEFAULT_REVIEWER)]
        reviewer: String,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Record a package choice and declared bank transfer
    DeclarePayment {
        id: String,
        #[arg(long)]
        package: String,
        #[arg(long)]
        billing_name: String,
        #[arg(long)]
        billing_address: String,
        #[arg(long)]
        tax_office: String,
        #[arg(long)]
        tax_number: String,
    },
    /// Confirm a received payment and activate the ambassador panel
    ConfirmPayment {
        id: String,
        #[arg(long, default_value = DEFAULT_REVIEWER)]
        reviewer: String,
    },
    /// Delete an application and its panel
    Delete { id: String },
    /// Show the ambassador panel opened on activation
    Panel { id: String },
    /// Show ambassador package prices and capacities
    Packages,
    /// Export applications as CSV
    Export {
        #[arg(long)]
        status: Option<String>,
        #[arg(long, default_value = "applications.csv")]
        csv: PathBuf,
    },
    /// Run the HTTP API
    Serve {
        #[arg(long)]
        addr: Option<String>,
    },
    /// Generate an AI progress report from a student data JSON file
    Report {
        #[arg(long)]
        student: PathBuf,
        #[arg(long, default_value = "en")]
        language: String,
        #[arg(long, value_enum, default_value_t = ReportFormat::Summary)]
        format: ReportFormat,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Merge backend classes with locally kept class names
    #[command(group(
        ArgGroup::new("source")
            .args(["server", "school_id"])
            .required(true)
            .multiple(false)
    ))]
    MergeClasses {
        #[arg(long)]
        local: PathBuf,
        #[arg(long)]
        server: Option<PathBuf>,
        #[arg(long)]
        school_id: Option<i64>,
    },
}

async fn connect() -> anyhow::Result<PgPool> {
    let database_url = config::database_url()?;
    PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("failed to parse {}", path.display()))
}

fn parse_filter(status: Option<&str>) -> anyhow::Result<Option<StatusFilter>> {
    status.map(StatusFilter::parse).transpose().map_err(Into::into)
}

fn print_application(application: &models::AmbassadorApplication, language: Language) {
    let status = application.status;
    println!("{} {}", application.id, application.full_name());
    println!("  email:     {}", application.email);
    println!("  phone:     {}", application.phone);
    println!(
        "  school:    {} ({}, {})",
        application.school, application.city, application.district
    );
    println!("  status:    {} [{}]", status.label(language), status.badge().as_str());
    if let Some(package) = application.package_name {
        println!(
            "  package:   {package} {} TL",
            application.price.unwrap_or_else(|| package.price())
        );
    }
    if let Some(billing) = &application.billing_info {
        println!(
            "  billing:   {}, {} ({} / {})",
            billing.name, billing.address, billing.tax_office, billing.tax_number
        );
    }
    if let Some(reviewed_by) = &application.reviewed_by {
        println!("  reviewer:  {reviewed_by}");
    }
    if let Some(notes) = &application.notes {
        println!("  notes:     {notes}");
    }
    println!("  submitted: {}", application.submitted_at.to_rfc3339());
}

async fn transition(pool: &PgPool, id: &str, transition: Transition) -> anyhow::Result<()> {
    let application = db::apply_transition(pool, id, &transition).await?;
    println!(
        "{} is now {}.",
        application.id,
        application.status.label(Language::En)
    );
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kinekids_ambassador=info,tower_http=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::InitDb => {
            db::init_db(&connect().await?).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            db::seed(&connect().await?).await?;
            println!("Seed data inserted.");
        }
        Commands::Submit { json } => {
            let form: ApplicationForm = read_json(&json)?;
            let application =
                intake::build_application(&form, chrono::Utc::now(), &mut rand::thread_rng())?;
            db::insert_application(&connect().await?, &application).await?;
            println!(
                "Application {} submitted at {}.",
                application.id,
                application.submitted_at.to_rfc3339()
            );
        }
        Commands::List { status, lang } => {
            let filter = parse_filter(status.as_deref())?;
            let applications = db::list_applications(&connect().await?, filter).await?;
            if applications.is_empty() {
                println!("No applications found.");
                return Ok(());
            }

            let language = Language::from_code(&lang);
            for application in &applications {
                println!(
                    "- {} {} <{}> {} [{}]",
                    application.id,
                    application.full_name(),
                    application.email,
                    application.status.label(language),
                    application.status.badge().as_str()
                );
            }
        }
        Commands::Show { id } => {
            let application = db::fetch_application(&connect().await?, &id).await?;
            print_application(&application, Language::Tr);
        }
        Commands::Approve { id, reviewer, notes } => {
            let pool = connect().await?;
            transition(
                &pool,
                &id,
                Transition::Approve {
                    reviewed_by: reviewer,
                    notes,
                },
            )
            .await?;
        }
        Commands::Reject { id, reviewer, notes } => {
            let pool = connect().await?;
            transition(
                &pool,
                &id,
                Transition::Reject {
                    reviewed_by: reviewer,
                    notes,
                },
            )
            .await?;
        }
        Commands::DeclarePayment {
            id,
            package,
            billing_name,
            billing_address,
            tax_office,
            tax_number,
        } => {
            let Some(package) = PackageTier::parse(&package) else {
                bail!("unknown package `{package}`; expected Bronze, Silver, Gold or Diamond");
            };
            let pool = connect().await?;
            transition(
                &pool,
                &id,
                Transition::DeclarePayment {
                    package,
                    billing: BillingInfo {
                        name: billing_name,
                        address: billing_address,
                        tax_office,
                        tax_number,
                    },
                },
            )
            .await?;
        }
        Commands::ConfirmPayment { id, reviewer } => {
            let pool = connect().await?;
            transition(
                &pool,
                &id,
                Transition::ConfirmPayment {
                    reviewed_by: reviewer,
                },
            )
            .await?;
        }
        Commands::Delete { id } => {
            db::delete_application(&connect().await?, &id).await?;
            println!("Application {id} deleted.");
        }
        Commands::Panel { id } => {
            let panel = db::fetch_panel(&connect().await?, &id).await?;
            println!(
                "{} panel: {} package, activated {} by {}",
                panel.application_id,
                panel.package_name,
                panel.activated_at.to_rfc3339(),
                panel.reviewed_by
            );
        }
        Commands::Packages => {
            for tier in PackageTier::ALL {
                println!(
                    "- {tier}: {} TL, up to {} students ({} USD per student)",
                    tier.price(),
                    tier.student_capacity(),
                    tier.per_student_rate()
                );
            }
        }
        Commands::Export { status, csv } => {
            let filter = parse_filter(status.as_deref())?;
            let applications = db::list_applications(&connect().await?, filter).await?;
            let file = std::fs::File::create(&csv)
                .with_context(|| format!("failed to create {}", csv.display()))?;
            let written = db::export_csv(&applications, file)?;
            println!("Exported {written} applications to {}.", csv.display());
        }
        Commands::Serve { addr } => {
            let gemini_config = config::GeminiConfig::from_env()?;
            let pool = connect().await?;
            db::init_db(&pool).await?;

            let state = Arc::new(routes::AppState {
                db: pool,
                generator: Arc::new(gemini::GeminiClient::new(&gemini_config)?),
            });
            let addr = addr.unwrap_or_else(config::bind_addr);
            let listener = tokio::net::TcpListener::bind(&addr)
                .await
                .with_context(|| format!("failed to bind {addr}"))?;

            info!(%addr, model = %gemini_config.model, "API listening");
            axum::serve(listener, routes::router(state)).await?;
        }
        Commands::Report {
            student,
            language,
            format,
            out,
        } => {
            let gemini_config = config::GeminiConfig::from_env()?;
            let client = gemini::GeminiClient::new(&gemini_config)?;
            let data: StudentDataForReport = read_json(&student)?;
            let language = Language::from_code(&language);

            let output = match format {
                ReportFormat::Summary => {
                    report::generate_student_report_summary(&client, &data, language).await?
                }
                ReportFormat::Json => {
                    let report =
                        report::generate_student_report_json(&client, &data, language).await?;
                    match &out {
                        Some(path) if path.extension().is_some_and(|ext| ext == "md") => {
                            report::render_markdown(&data.name, &report)
                        }
                        _ => serde_json::to_string_pretty(&report)?,
                    }
                }
            };

            match out {
                Some(path) => {
                    std::fs::write(&path, output)?;
                    println!("Report written to {}.", path.display());
                }
                None => println!("{output}"),
            }
        }
        Commands::MergeClasses {
            local,
            server,
            school_id,
        } => {
            let local: Vec<classes::LocalClass> = read_json(&local)?;
            let server: Vec<classes::ClassRecord> = match (server, school_id) {
                (Some(path), _) => read_json(&path)?,
                (None, Some(school_id)) => {
                    let client = backend::BackendClient::new(&config::backend_base_url())?;
                    client.fetch_classes(school_id).await?
                }
                (None, None) => bail!("either --server or --school-id is required"),
            };

            let merged = classes::merge_classes(&server, &local);
            println!("{}", serde_json::to_string_pretty(&merged)?);
        }
    }

    Ok(())
}

// docvault - document management client
// Entry point and command-line shell

use anyhow::{bail, Context};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use docvault::models::MajorHead;
use docvault::services::{preview_kind, LoadMoreOutcome, SearchFilter, SearchOutcome, UploadForm};
use docvault::{AppContext, ClientConfig, SessionContext};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "docvault")]
#[command(about = "Upload, search and download documents")]
#[command(version)]
struct Cli {
    /// Data directory (overrides DOCVAULT_DATA_DIR)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Request an OTP, or sign in when --otp is given
    Login {
        /// 10-digit mobile number
        mobile: String,
        #[arg(long)]
        otp: Option<String>,
    },

    /// Sign out and clear local data
    Logout,

    /// Show the signed-in user
    Whoami,

    /// Upload an image or PDF
    Upload {
        file: PathBuf,
        #[arg(short, long)]
        category: MajorHead,
        #[arg(short, long)]
        subcategory: String,
        /// Tag (repeatable)
        #[arg(short, long = "tag", required = true)]
        tags: Vec<String>,
        #[arg(short, long, default_value = "")]
        remarks: String,
        /// Document date, YYYY-MM-DD (defaults to today)
        #[arg(short, long)]
        date: Option<NaiveDate>,
        #[arg(long)]
        title: Option<String>,
    },

    /// Search documents
    Search {
        #[arg(short, long)]
        category: Option<MajorHead>,
        #[arg(short, long)]
        subcategory: Option<String>,
        /// Required tag (repeatable)
        #[arg(short, long = "tag")]
        tags: Vec<String>,
        /// From date, YYYY-MM-DD
        #[arg(long)]
        from: Option<NaiveDate>,
        /// To date, YYYY-MM-DD
        #[arg(long)]
        to: Option<NaiveDate>,
        /// Free-text search
        #[arg(short = 'q', long, default_value = "")]
        text: String,
        /// Number of pages to fetch
        #[arg(short, long, default_value = "1")]
        pages: usize,
    },

    /// Suggest tags matching a term
    Tags {
        #[arg(default_value = "")]
        term: String,
    },

    /// Download one or more documents into the local file cache
    Download {
        #[arg(required = true)]
        ids: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "docvault=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let mut config = ClientConfig::from_env().context("Invalid configuration")?;
    if let Some(data_dir) = cli.data_dir {
        config.data_dir = data_dir;
    }

    tracing::info!("Starting docvault");
    let ctx = AppContext::bootstrap(config).await?;

    match cli.command {
        Commands::Login { mobile, otp } => match otp {
            None => {
                let challenge = ctx.auth().request_otp(&mobile).await?;
                println!(
                    "OTP sent to {}. Run `docvault login {} --otp <code>` to sign in (resend available in {}s).",
                    challenge.mobile_number,
                    challenge.mobile_number,
                    challenge.seconds_until_resend(chrono::Utc::now())
                );
            }
            Some(otp) => {
                let session = ctx.login(&mobile, &otp).await?;
                println!("Signed in as {}", session.user.user_name);
            }
        },

        Commands::Logout => match ctx.restore_session().await {
            Some(session) => {
                ctx.logout(session).await?;
                println!("Signed out");
            }
            None => println!("Not signed in"),
        },

        Commands::Whoami => match ctx.restore_session().await {
            Some(session) => println!("{} ({})", session.user.user_name, session.user.user_id),
            None => println!("Not signed in"),
        },

        Commands::Upload {
            file,
            category,
            subcategory,
            tags,
            remarks,
            date,
            title,
        } => {
            let session = require_session(&ctx).await?;

            let mut form = UploadForm::new(date.unwrap_or_else(|| Local::now().date_naive()));
            form.set_major_head(Some(category));
            form.minor_head = Some(subcategory);
            for tag in &tags {
                form.add_tag(tag);
            }
            form.remarks = remarks;
            form.title = title;
            form.attach_path(&file);

            let record = session.upload.upload(&form).await?;
            println!("Uploaded {} as document {}", record.display_name(), record.id);
        }

        Commands::Search {
            category,
            subcategory,
            tags,
            from,
            to,
            text,
            pages,
        } => {
            let session = require_session(&ctx).await?;
            let search = session.search_session();

            let mut filter = SearchFilter::with_page_size(ctx.config().page_size);
            filter.set_major_head(category);
            filter.set_minor_head(subcategory.as_deref());
            filter.tags = tags;
            filter.from_date = from;
            filter.to_date = to;
            filter.free_text = text;

            if let SearchOutcome::Superseded = search.search(filter).await? {
                bail!("Search was superseded");
            }
            for _ in 1..pages {
                if let LoadMoreOutcome::Exhausted = search.load_more().await? {
                    break;
                }
            }

            let snapshot = search.snapshot();
            for record in &snapshot.results.records {
                println!(
                    "{:>14}  {}  {}/{}  [{}]  {}  ({:?})",
                    record.id,
                    record.date,
                    record.major_head,
                    record.minor_head,
                    record.tags.join(", "),
                    record.display_name(),
                    preview_kind(record)
                );
            }
            println!(
                "Showing {} of {} documents",
                snapshot.results.records.len(),
                snapshot.results.total_count
            );
        }

        Commands::Tags { term } => {
            let session = require_session(&ctx).await?;
            for tag in session.tags.suggestions(&term).await? {
                println!("{:>6}  {}", tag.id, tag.name);
            }
        }

        Commands::Download { ids } => {
            let session = require_session(&ctx).await?;

            let file = if let [id] = ids.as_slice() {
                let known = ctx.index().load_all().await?;
                match known.iter().find(|record| &record.id == id) {
                    Some(record) => session.downloads.download(record).await?,
                    None => session.downloads.download_by_id(id).await?,
                }
            } else {
                session.downloads.download_selected(&ids).await?
            };

            println!("Saved {} to {}", file.name, file.path.display());
        }
    }

    Ok(())
}

async fn require_session(ctx: &AppContext) -> anyhow::Result<SessionContext> {
    match ctx.restore_session().await {
        Some(session) => Ok(session),
        None => bail!("Not signed in. Run `docvault login <mobile>` first."),
    }
}

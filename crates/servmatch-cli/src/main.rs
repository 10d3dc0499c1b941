use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use servmatch_core::regions;
use servmatch_store::{MarketplaceSession, StoreConfig, TracingNotifier};
use uuid::Uuid;

#[derive(Debug, Parser)]
#[command(name = "servmatch", version)]
#[command(about = "Service request marketplace command-line interface")]
struct Cli {
    /// Verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Acting user; overrides SERVMATCH_USER_ID
    #[arg(short, long, global = true)]
    user: Option<Uuid>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// List the user's requests in display order (default)
    Requests,
    /// Show the quotes for one request
    Quotes { request_id: Uuid },
    /// Accept a quote on one of the user's requests
    Accept { request_id: Uuid, quote_id: Uuid },
    /// Show a professional's normalized profile
    Professional { id: Uuid },
    /// List the regions
    Regions,
    /// List known cities, optionally only those in one region
    Cities { region: Option<String> },
    /// Print the region a city belongs to
    Region { city: String },
    /// Run the JSON API
    Serve,
}

fn setup_logging(verbosity: u8) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let level = match verbosity {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into());

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_thread_names(false)
        .with_line_number(false);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}

fn load_config(user: Option<Uuid>) -> Result<StoreConfig> {
    let mut config = StoreConfig::from_env()?;
    if user.is_some() {
        config.user_id = user;
    }
    Ok(config)
}

async fn open_session(user: Option<Uuid>) -> Result<MarketplaceSession> {
    MarketplaceSession::from_config(&load_config(user)?, Arc::new(TracingNotifier)).await
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    match cli.command.unwrap_or(Commands::Requests) {
        Commands::Requests => {
            let session = open_session(cli.user).await?;
            if session.requests().user_id().is_none() {
                bail!("no user: pass --user or set SERVMATCH_USER_ID");
            }
            for request in session.requests().requests() {
                println!(
                    "{}  {:<18} {}  quotes={}  {}",
                    request.id,
                    request.status.as_str(),
                    request.date,
                    request.quotes_count,
                    request.title
                );
            }
        }
        Commands::Quotes { request_id } => {
            let mut session = open_session(cli.user).await?;
            session
                .quotes_mut()
                .select_request(Some(request_id))
                .await
                .with_context(|| format!("loading quotes for {request_id}"))?;
            print_json(session.quotes().quotes())?;
        }
        Commands::Accept { request_id, quote_id } => {
            let mut session = open_session(cli.user).await?;
            let quotes = session.quotes_mut();
            quotes.refresh_quotes(Some(request_id)).await?;
            quotes.accept_quote(quote_id).await?;
            println!("accepted quote {quote_id} for request {request_id}");
        }
        Commands::Professional { id } => {
            let session = open_session(cli.user).await?;
            match session.fetch_professional(id).await? {
                Some(view) => print_json(&view)?,
                None => bail!("professional {id} not found"),
            }
        }
        Commands::Regions => {
            for region in regions::all_regions() {
                println!("{region}");
            }
        }
        Commands::Cities { region } => {
            let cities: Vec<&str> = match region.as_deref() {
                Some(region) => regions::cities_of(region).into_iter().collect(),
                None => regions::all_cities(),
            };
            for city in cities {
                println!("{city}");
            }
        }
        Commands::Region { city } => match regions::region_of(&city) {
            Some(region) => println!("{region}"),
            None => bail!("no region known for {city}"),
        },
        Commands::Serve => {
            servmatch_web::serve(load_config(cli.user)?).await?;
        }
    }

    Ok(())
}

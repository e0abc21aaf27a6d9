mod config;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use color_eyre::{eyre::eyre, Result};
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use sitedesk::access::{Gated, Page, Role};
use sitedesk::cache::{CacheLayer, DataSource};
use sitedesk::domain::Report;
use sitedesk::navigation::{pages_for, resolve_page};
use sitedesk::remote::{HttpRemote, NoRemote, RemoteSource};
use sitedesk::render::render_view;
use sitedesk::session::{Filter, Identity, Session};
use sitedesk::store::SqliteStore;

#[derive(Parser, Debug)]
#[command(name = "sitedesk")]
#[command(about = "Construction back office from the terminal")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/sitedesk/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Start a session. Without --role the API is asked who we are.
  Login {
    #[arg(long)]
    username: Option<String>,
    #[arg(long)]
    role: Option<String>,
    /// Display name (defaults to the username)
    #[arg(long)]
    name: Option<String>,
  },
  /// Forget the current session
  Logout,
  /// Show the signed-in identity and the pages it can open
  Whoami,
  /// List the pages the current role can open, with their aliases
  Pages,
  /// Show a page (the role's landing page by default)
  Open { page: Option<String> },
  /// List the records of a page matching a query
  Search {
    page: String,
    query: Option<String>,
    #[arg(long)]
    status: Option<String>,
  },
  /// Delete a record from a page
  Remove { page: String, id: String },
  /// File a daily report
  Report {
    #[arg(long)]
    worksite: String,
    #[arg(long)]
    title: String,
    /// Defaults to the signed-in user's name
    #[arg(long)]
    author: Option<String>,
    #[arg(long, default_value = "")]
    summary: String,
    /// YYYY-MM-DD, today if omitted
    #[arg(long)]
    date: Option<NaiveDate>,
  },
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // Load configuration
  let config = config::Config::load(args.config.as_deref())?;
  let _log_guard = init_logging()?;

  let store = match &config.store.path {
    Some(path) => SqliteStore::open(path)?,
    None => SqliteStore::open_default()?,
  };
  let store = match config.store.quota_bytes {
    Some(limit) => store.with_quota(limit),
    None => store,
  };

  match (&config.api, config.data_source) {
    (_, DataSource::Offline) => run(NoRemote, store, &config, args.command).await,
    (Some(api), _) => {
      let session_id = config::Config::session_id();
      let remote = HttpRemote::new(&api.url, api.timeout(), session_id.as_deref())
        .map_err(|e| eyre!("Failed to create API client: {}", e))?;
      run(remote, store, &config, args.command).await
    }
    (None, source) => Err(eyre!("data_source {:?} needs an API url", source)),
  }
}

/// Log to a daily file in the data directory; stdout is for output.
fn init_logging() -> Result<WorkerGuard> {
  let log_dir = dirs::data_dir()
    .unwrap_or_else(std::env::temp_dir)
    .join("sitedesk")
    .join("logs");
  std::fs::create_dir_all(&log_dir)
    .map_err(|e| eyre!("Failed to create log directory {}: {}", log_dir.display(), e))?;

  let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::daily(
    &log_dir,
    "sitedesk.log",
  ));
  let filter =
    EnvFilter::try_from_env("SITEDESK_LOG").unwrap_or_else(|_| EnvFilter::new("sitedesk=info"));

  tracing_subscriber::registry()
    .with(filter)
    .with(fmt::layer().with_writer(writer).with_ansi(false))
    .try_init()
    .map_err(|e| eyre!("Failed to initialise logging: {}", e))?;

  Ok(guard)
}

fn page_arg(input: &str) -> Result<Page> {
  resolve_page(input).map_err(|err| {
    if err.suggestions.is_empty() {
      eyre!("{}", err)
    } else {
      let names: Vec<&str> = err.suggestions.iter().map(|p| p.key()).collect();
      eyre!("{} (did you mean: {}?)", err, names.join(", "))
    }
  })
}

fn print_denied<T>(gated: Gated<T>) -> Option<T> {
  match gated {
    Gated::Granted(value) => Some(value),
    Gated::Denied(denied) => {
      eprintln!("{}", denied);
      None
    }
  }
}

async fn run<R: RemoteSource>(
  remote: R,
  store: SqliteStore,
  config: &config::Config,
  command: Command,
) -> Result<()> {
  let cache = CacheLayer::new(remote, store, config.data_source)
    .with_freshness(config.cache.freshness());

  if let Command::Login {
    username,
    role,
    name,
  } = command
  {
    let session = match role {
      Some(role) => {
        let username = username.unwrap_or_else(|| "local".to_string());
        let display_name = name.unwrap_or_else(|| username.clone());
        Session::start(cache, Identity::new(username, display_name, Role::parse(&role)))?
      }
      None => Session::start_remote(cache)
        .await
        .map_err(|e| eyre!("{} (try --role)", e))?,
    };

    let who = session.identity();
    println!("Connecté : {} ({})", who.display_name, who.role.label());
    println!("Page d'accueil : {}", session.landing_page());
    return Ok(());
  }

  let session = Session::restore(cache)?
    .ok_or_else(|| eyre!("Not logged in. Run `sitedesk login` first."))?;

  match command {
    Command::Login { .. } => {}
    Command::Logout => {
      session.logout()?;
      println!("Déconnecté.");
    }
    Command::Whoami => {
      let who = session.identity();
      let pages: Vec<&str> = session.gate().allowed_pages().iter().map(|p| p.key()).collect();
      println!("{} <{}>", who.display_name, who.username);
      println!("Rôle  : {}", who.role.label());
      println!("Pages : {}", pages.join(", "));
    }
    Command::Pages => {
      for entry in pages_for(session.gate()) {
        println!(
          "{:<16} {:<38} {}",
          entry.name(),
          entry.description,
          entry.aliases.join(", ")
        );
      }
    }
    Command::Open { page } => {
      let page = match page {
        Some(input) => page_arg(&input)?,
        None => session.landing_page(),
      };
      if let Some(view) = print_denied(session.open(page).await?) {
        println!("{}", render_view(&view));
      }
    }
    Command::Search {
      page,
      query,
      status,
    } => {
      let page = page_arg(&page)?;
      let filter = Filter::new(query.unwrap_or_default(), status);
      if let Some(view) = print_denied(session.open_filtered(page, Some(&filter)).await?) {
        println!("{}", render_view(&view));
      }
    }
    Command::Remove { page, id } => {
      let page = page_arg(&page)?;
      let collection = page
        .collection()
        .ok_or_else(|| eyre!("Nothing can be removed from {}", page))?;
      match print_denied(session.remove_from(collection, &id).await?) {
        Some(true) => println!("Supprimé : {}", id),
        Some(false) => println!("Aucun enregistrement {} dans {}", id, page),
        None => {}
      }
    }
    Command::Report {
      worksite,
      title,
      author,
      summary,
      date,
    } => {
      let author = author.unwrap_or_else(|| session.identity().display_name.clone());
      let date = date.unwrap_or_else(|| chrono::Local::now().date_naive());
      let report = Report::new(title, date, worksite, author, summary);
      if let Some(report) = print_denied(session.add(report).await?) {
        println!("Rapport enregistré : {}", report.id);
      }
    }
  }

  Ok(())
}

use anyhow::{Context, Result};
use clap::Parser;
use lurk::app::{App, AppEvent};
use lurk::config::{Config, Paths};
use lurk::discourse::{ClientOptions, DiscourseClient};
use lurk::session::{SessionError, SessionStore};
use lurk::storage::InstanceCache;
use lurk::{export, ui};
use secrecy::SecretString;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;

/// Environment variable holding the cookie-file passphrase.
const PASSPHRASE_ENV: &str = "LURK_PASSPHRASE";

#[derive(Parser, Debug)]
#[command(name = "lurk", version, about = "Terminal Discourse client")]
struct Args {
    /// Forum base URL (e.g. forum.example.com)
    #[arg(short, long)]
    url: Option<String>,

    /// Cookie file to use instead of the default
    #[arg(short, long, value_name = "FILE")]
    cookies: Option<PathBuf>,

    /// Delete the stored session and exit
    #[arg(short, long)]
    logout: bool,

    /// Delete the cache for all instances and exit
    #[arg(short, long)]
    reset_cache: bool,

    /// Export topics with their posts to FILE (.json, .txt or .html) and exit
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Pause between paginated requests, in milliseconds
    #[arg(long, value_name = "MS")]
    cooldown_ms: Option<u64>,

    /// Page cap for "load all"
    #[arg(long, value_name = "N")]
    max_pages: Option<usize>,

    /// Encrypt the cookie file with the passphrase in LURK_PASSPHRASE
    #[arg(long)]
    encrypt: bool,

    /// Write debug logs to the cache directory (also enabled by RUST_LOG)
    #[arg(short, long)]
    debug: bool,

    /// Config file to use instead of the default
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
}

/// Whether logs go to the log file. `--debug` or a set `RUST_LOG` turns
/// file logging on. Nothing is ever written to the terminal the UI owns.
fn logs_to_file(debug: bool, rust_log: Option<&std::ffi::OsStr>) -> bool {
    debug || rust_log.is_some_and(|v| !v.is_empty())
}

/// Send logs to the private log file, or install no subscriber at all.
fn init_tracing(debug: bool, log_file: &Path) -> Result<()> {
    use tracing_subscriber::EnvFilter;

    if !logs_to_file(debug, std::env::var_os("RUST_LOG").as_deref()) {
        return Ok(());
    }

    if let Some(dir) = log_file.parent() {
        lurk::util::ensure_private_dir(dir)
            .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
    }
    let mut options = std::fs::OpenOptions::new();
    options.create(true).append(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let file = options
        .open(log_file)
        .with_context(|| format!("Failed to open log file {}", log_file.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("lurk=debug")),
        )
        .with_ansi(false)
        .with_writer(std::sync::Mutex::new(file))
        .init();
    Ok(())
}

/// Build the session store, attaching the passphrase when encryption is on.
fn session_store(path: &Path, encrypt: bool) -> Result<SessionStore> {
    let store = SessionStore::new(path);
    if !encrypt {
        return Ok(store);
    }
    let passphrase = std::env::var(PASSPHRASE_ENV)
        .ok()
        .filter(|p| !p.is_empty())
        .with_context(|| format!("Session encryption is enabled but {} is not set", PASSPHRASE_ENV))?;
    Ok(store.with_passphrase(SecretString::from(passphrase)))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let paths = Paths::discover().context("Failed to locate config and cache directories")?;
    init_tracing(args.debug, &paths.log_file())?;

    let config_file = args.config.clone().unwrap_or_else(|| paths.config_file());
    let mut config = Config::load(&config_file)
        .with_context(|| format!("Failed to load {}", config_file.display()))?;
    if let Some(ms) = args.cooldown_ms {
        config.page_cooldown_ms = ms;
    }
    if let Some(n) = args.max_pages {
        config.max_pages = n;
    }

    // Reject unknown export formats before any network traffic.
    if let Some(output) = &args.output {
        export::formatter_for(output)?;
    }

    let session_path = args.cookies.clone().unwrap_or_else(|| paths.session_file());
    let encrypt = args.encrypt || config.encrypt_session;

    // 1-2. One-shot maintenance flags.
    if args.reset_cache {
        let removed = InstanceCache::invalidate_all(&paths.cache_root())
            .context("Failed to delete cache")?;
        println!("{}", if removed { "Cache cleared." } else { "No cache to clear." });
        return Ok(());
    }
    if args.logout {
        let removed = session_store(&session_path, false)?
            .remove()
            .context("Failed to delete session")?;
        println!("{}", if removed { "Logged out." } else { "No stored session." });
        return Ok(());
    }

    let options = ClientOptions {
        timeout: Duration::from_secs(config.request_timeout_secs.max(1)),
        page_cooldown: Duration::from_millis(config.page_cooldown_ms),
    };
    let make_client = |url: &str| -> Result<DiscourseClient> {
        let store = session_store(&session_path, encrypt)?;
        Ok(DiscourseClient::with_options(url, store, paths.cache_root(), options.clone())?)
    };

    // 3. Instance: flag, remembered, configured.
    let instance = args
        .url
        .clone()
        .or_else(|| paths.load_instance())
        .or_else(|| config.instance.clone());

    // 4-5. Sign in when there is no stored session, otherwise load it.
    let client = match instance {
        Some(url) if session_path.exists() => {
            let client = make_client(&url)?;
            match client.load_session() {
                Ok(count) => tracing::info!(cookies = count, "Loaded session"),
                Err(lurk::discourse::ClientError::Session(SessionError::AuthFailed)) => {
                    anyhow::bail!(
                        "Could not decrypt {} (wrong {}?)",
                        session_path.display(),
                        PASSPHRASE_ENV
                    );
                }
                Err(e) => return Err(e).context("Failed to load session"),
            }
            client
        }
        instance => {
            // Surface passphrase problems before the form opens.
            session_store(&session_path, encrypt)?;
            let factory = |url: &str| {
                make_client(url).map_err(|e| lurk::discourse::ClientError::Config(format!("{:#}", e)))
            };
            let Some(client) = ui::run_login(instance, factory).await? else {
                println!("Login cancelled.");
                return Ok(());
            };
            paths
                .save_instance(client.base())
                .context("Failed to remember the forum URL")?;
            if let Err(e) = client.categories().await {
                tracing::warn!(error = %e, "Category prefetch failed");
            }
            client
        }
    };

    // 6. Cached topics first, network otherwise.
    let topics = match client.cached_topics().await {
        Some(page) => page,
        None => client
            .latest_topics()
            .await
            .with_context(|| format!("Failed to fetch topics from {}", client.base()))?,
    };
    if topics.topics.is_empty() {
        eprintln!("No topics found on {}.", client.base());
        std::process::exit(1);
    }

    // 7. Export mode.
    if let Some(output) = &args.output {
        let count = export::write_export(&client, &topics, output)
            .await
            .with_context(|| format!("Failed to export to {}", output.display()))?;
        println!("Exported {} topics to {}", count, output.display());
        return Ok(());
    }

    // 8. Interactive mode.
    let mut app = App::new(client, topics, &config);

    let (event_tx, event_rx) = mpsc::channel::<AppEvent>(32);
    ui::run(&mut app, event_tx, event_rx).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsStr;

    #[test]
    fn test_rust_log_routes_logs_to_file() {
        assert!(logs_to_file(true, None));
        assert!(logs_to_file(false, Some(OsStr::new("lurk=trace"))));
        assert!(logs_to_file(true, Some(OsStr::new("info"))));
    }

    #[test]
    fn test_no_logging_without_debug_or_rust_log() {
        assert!(!logs_to_file(false, None));
        assert!(!logs_to_file(false, Some(OsStr::new(""))));
    }
}

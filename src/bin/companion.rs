use anyhow::Result;
use dotenvy::dotenv;
use log::{error, info, warn};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use companion::backend::BackendClient;
use companion::core::config::IN_MEMORY_DATABASE;
use companion::core::{Clock, Config, SystemClock};
use companion::features::delivery::{DeliveryTokenManager, StaticPermissions, StaticTokenSource};
use companion::features::intent::IntentRouter;
use companion::features::reminders::{ReminderScheduler, ReminderStore};
use companion::features::settings::Settings;
use companion::storage::{KeyValueStore, MemoryStore, SqliteStore};

struct App {
    router: IntentRouter,
    scheduler: Arc<ReminderScheduler>,
    tokens: Arc<DeliveryTokenManager>,
    settings: Arc<Settings>,
    clock: Arc<dyn Clock>,
}

impl App {
    async fn dispatch(&self, line: &str) -> String {
        let (command, arg) = match line.split_once(char::is_whitespace) {
            Some((command, arg)) => (command, arg.trim()),
            None => (line, ""),
        };

        match command {
            "/list" => self.list().await,
            "/cancel" if !arg.is_empty() => match self.scheduler.cancel(arg).await {
                Ok(result) => result.message,
                Err(e) => e.user_message(),
            },
            "/status" if !arg.is_empty() => match self.scheduler.status(arg).await {
                Ok(report) => {
                    let mut out = format!(
                        "{} at {} via {} (scheduled: {})",
                        report.reminder.text,
                        report.reminder.time,
                        report.reminder.method,
                        report.reminder.scheduled
                    );
                    if let Some(remote) = report.remote {
                        out.push_str(&format!(
                            "\nremote: {} (delivered: {})",
                            remote.status.unwrap_or_else(|| "unknown".to_string()),
                            remote.delivered.unwrap_or(false)
                        ));
                    }
                    if let Some(err) = report.remote_error {
                        out.push_str(&format!("\nremote status unavailable: {err}"));
                    }
                    out
                }
                Err(e) => e.user_message(),
            },
            "/refresh" if !arg.is_empty() => {
                match self.tokens.on_refresh(arg, self.clock.now()).await {
                    Ok(()) => "🔄 Delivery token refreshed.".to_string(),
                    Err(e) => e.user_message(),
                }
            }
            "/websearch" => {
                let enabled = match arg {
                    "on" => true,
                    "off" => false,
                    _ => return "Usage: /websearch on|off".to_string(),
                };
                match self.settings.set_web_search(enabled).await {
                    Ok(()) => format!("🔎 Web search {}.", if enabled { "enabled" } else { "disabled" }),
                    Err(e) => e.user_message(),
                }
            }
            "/cancel" | "/status" | "/refresh" => format!("Usage: {command} <value>"),
            _ => self.router.handle(line).await.message(),
        }
    }

    async fn list(&self) -> String {
        match self.scheduler.list().await {
            Ok(reminders) if reminders.is_empty() => "No upcoming reminders.".to_string(),
            Ok(reminders) => reminders
                .iter()
                .map(|r| format!("{}  {}  {}  [{}]", r.id, r.time, r.text, r.method))
                .collect::<Vec<_>>()
                .join("\n"),
            Err(e) => e.user_message(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    let config = Config::from_env()?;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.log_level))
        .init();

    info!("Starting companion reminder pipeline...");

    let kv: Arc<dyn KeyValueStore> = if config.database_path == IN_MEMORY_DATABASE {
        info!("Using in-memory storage; nothing will survive a restart");
        Arc::new(MemoryStore::new())
    } else {
        Arc::new(SqliteStore::open(&config.database_path)?)
    };

    let settings = Arc::new(Settings::new(kv.clone()));
    let user_id = settings.user_id().await?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let backend = Arc::new(BackendClient::new(&config.backend_url, config.request_timeout())?);

    let tokens = Arc::new(DeliveryTokenManager::new(
        Arc::new(StaticPermissions::new(config.notifications_enabled)),
        Arc::new(StaticTokenSource::new(config.device_token.clone())),
        backend.clone(),
        kv.clone(),
        user_id.as_str(),
        config.platform,
    ));
    if let Err(e) = tokens.restore().await {
        warn!("Could not restore cached delivery token: {e}");
    }
    match tokens.initialize(clock.now()).await {
        Ok(()) => info!("📲 Push delivery ready"),
        Err(e) => warn!("Push delivery unavailable, reminders stay on this device: {e}"),
    }

    let scheduler = Arc::new(
        ReminderScheduler::new(
            Arc::new(ReminderStore::new(kv.clone())),
            tokens.clone(),
            backend.clone(),
            clock.clone(),
            user_id.as_str(),
        )
        .with_push_timeout(config.request_timeout()),
    );
    let router = IntentRouter::new(
        backend.clone(),
        backend,
        scheduler.clone(),
        settings.clone(),
        user_id.as_str(),
    );

    let app = App {
        router,
        scheduler,
        tokens,
        settings,
        clock,
    };

    info!("✅ Ready as {user_id}; type a message, /list, /cancel <id>, /status <id>, /refresh <token> or /websearch on|off");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let reply = app.dispatch(line).await;
        if let Err(e) = stdout.write_all(format!("{reply}\n").as_bytes()).await {
            error!("Failed to write reply: {e}");
            break;
        }
        stdout.flush().await?;
    }

    info!("Input closed, shutting down");
    Ok(())
}

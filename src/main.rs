use anyhow::{Context, Result};
use calsync::{
    auth::{OAuthFlow, TokenStore},
    CalendarClient, Config, EventPatch,
};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const USAGE: &str = "\
Usage: calsync [--calendar <id>] <command>

Commands:
  login               Authorize in the browser and cache the token
  update <event-id>   Rewrite the event's title, location, description and time slot
  delete <event-id>   Delete the event
  run <event-id>      Update, then delete the event
  status              Show the cached token
  help                Show this message";

#[derive(Debug, PartialEq)]
enum Command {
    Login,
    Update(String),
    Delete(String),
    Run(String),
    Status,
    Help,
}

#[derive(Debug, PartialEq)]
struct Cli {
    calendar: Option<String>,
    command: Command,
}

impl Cli {
    fn parse(args: &[String]) -> Result<Self, String> {
        let mut calendar = None;
        let mut positional = Vec::new();

        let mut iter = args.iter();
        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--calendar" | "-c" => {
                    let id = iter.next().ok_or("--calendar requires a value")?;
                    calendar = Some(id.clone());
                }
                "--help" | "-h" => positional.push("help".to_string()),
                flag if flag.starts_with('-') => return Err(format!("Unknown option: {}", flag)),
                _ => positional.push(arg.clone()),
            }
        }

        let event_id = |name: &str| -> Result<String, String> {
            positional
                .get(1)
                .cloned()
                .ok_or_else(|| format!("{} requires an event id", name))
        };

        let command = match positional.first().map(String::as_str) {
            None | Some("help") => Command::Help,
            Some("login") => Command::Login,
            Some("status") => Command::Status,
            Some("update") => Command::Update(event_id("update")?),
            Some("delete") => Command::Delete(event_id("delete")?),
            Some("run") => Command::Run(event_id("run")?),
            Some(other) => return Err(format!("Unknown command: {}", other)),
        };

        Ok(Self { calendar, command })
    }
}

#[tokio::main]
async fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();

    let cli = match Cli::parse(&args) {
        Ok(cli) => cli,
        Err(msg) => {
            eprintln!("{}\n\n{}", msg, USAGE);
            std::process::exit(2);
        }
    };

    if cli.command == Command::Help {
        println!("{}", USAGE);
        return;
    }

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Unable to load configuration: {:#}", e);
            std::process::exit(1);
        }
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .init();

    if let Err(e) = run(cli, config).await {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: Config) -> Result<()> {
    let calendar_id = cli
        .calendar
        .unwrap_or_else(|| config.calendar.calendar_id.clone());

    match cli.command {
        Command::Help => {}

        Command::Status => {
            let store = TokenStore::from_config(&config.oauth)?;
            match store.load()? {
                Some(token) => {
                    println!("Token cache: {}", store.path().display());
                    println!("Refresh token: {}", if token.refresh_token.is_some() { "yes" } else { "no" });
                    match token.expiry {
                        Some(expiry) if token.is_expired(chrono::Utc::now()) => {
                            println!("Access token: expired at {}", expiry);
                        }
                        Some(expiry) => println!("Access token: valid until {}", expiry),
                        None => println!("Access token: no expiry recorded"),
                    }
                }
                None => println!("No cached token at {}", store.path().display()),
            }
        }

        Command::Login => {
            login(&config).await?;
        }

        Command::Update(event_id) => {
            let calendar = login(&config).await?;
            update_event(&calendar, &config, &calendar_id, &event_id).await?;
        }

        Command::Delete(event_id) => {
            let calendar = login(&config).await?;
            delete_event(&calendar, &calendar_id, &event_id).await?;
        }

        Command::Run(event_id) => {
            let calendar = login(&config).await?;
            update_event(&calendar, &config, &calendar_id, &event_id).await?;
            delete_event(&calendar, &calendar_id, &event_id).await?;
        }
    }

    Ok(())
}

async fn login(config: &Config) -> Result<CalendarClient> {
    let flow = OAuthFlow::from_config(&config.oauth)?;
    let client = flow
        .acquire_client(&config.oauth.redirect_bind)
        .await
        .context("OAuth login failed")?;

    info!("Authenticated");
    Ok(CalendarClient::new(client, config.calendar.base_url.clone()))
}

async fn update_event(
    calendar: &CalendarClient,
    config: &Config,
    calendar_id: &str,
    event_id: &str,
) -> Result<()> {
    let patch = EventPatch::from_config(&config.calendar).context("Unable to build event patch")?;

    let mut event = calendar
        .get_event(calendar_id, event_id)
        .await
        .context("Unable to retrieve event")?;

    patch
        .apply(&mut event, chrono::Utc::now())
        .context("Unable to patch event")?;

    let target_id = event.id.clone().unwrap_or_else(|| event_id.to_string());
    let updated = calendar
        .update_event(calendar_id, &target_id, &event)
        .await
        .context("Unable to update event")?;

    println!(
        "Event updated: {}",
        updated.html_link.as_deref().unwrap_or(target_id.as_str())
    );
    Ok(())
}

async fn delete_event(calendar: &CalendarClient, calendar_id: &str, event_id: &str) -> Result<()> {
    calendar
        .delete_event(calendar_id, event_id)
        .await
        .context("Failed to delete event")?;

    println!("Event deleted successfully.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(Cli::parse(&args(&[])).unwrap().command, Command::Help);
        assert_eq!(Cli::parse(&args(&["login"])).unwrap().command, Command::Login);
        assert_eq!(
            Cli::parse(&args(&["update", "evt1"])).unwrap().command,
            Command::Update("evt1".to_string())
        );
        assert_eq!(
            Cli::parse(&args(&["run", "evt1"])).unwrap().command,
            Command::Run("evt1".to_string())
        );
    }

    #[test]
    fn test_parse_calendar_flag() {
        let cli = Cli::parse(&args(&["--calendar", "team", "delete", "evt1"])).unwrap();
        assert_eq!(cli.calendar.as_deref(), Some("team"));
        assert_eq!(cli.command, Command::Delete("evt1".to_string()));
    }

    #[test]
    fn test_parse_errors() {
        assert!(Cli::parse(&args(&["update"])).unwrap_err().contains("event id"));
        assert!(Cli::parse(&args(&["frobnicate"])).unwrap_err().contains("Unknown command"));
        assert!(Cli::parse(&args(&["--calendar"])).is_err());
        assert!(Cli::parse(&args(&["--verbose", "status"])).is_err());
    }
}

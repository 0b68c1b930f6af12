mod backend;
mod config;
mod display;
mod eligibility;
mod error;
mod form;
mod notify;
mod roster;
mod session;
mod web;

use anyhow::{bail, Context};
use tracing_subscriber::{fmt, EnvFilter};

use backend::{Backend, HttpBackend};
use config::Config;
use display::{describe_gate, print_roster};
use eligibility::check_eligibility;
use roster::Roster;
use session::{Role, UserSession};

const USAGE: &str = "usage: event-desk web [port]
       event-desk eligibility <user-id> <event-id>
       event-desk roster <event-id>";

fn cli_session(config: &Config, user_id: u64, role: Role) -> anyhow::Result<UserSession> {
    let token = config
        .cli_token
        .clone()
        .context("EVENT_DESK_TOKEN must hold a backend token in CLI mode")?;
    Ok(UserSession::new(user_id, String::new(), String::new(), role, token))
}

fn parse_id(raw: Option<&String>, what: &str) -> anyhow::Result<u64> {
    let raw = raw.with_context(|| format!("missing {what}\n{USAGE}"))?;
    raw.parse()
        .with_context(|| format!("{what} must be a number, got '{raw}'"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let args: Vec<String> = std::env::args().collect();
    let mut config = Config::load()?;

    match args.get(1).map(String::as_str) {
        Some("web") => {
            if let Some(port) = args.get(2).and_then(|p| p.parse::<u16>().ok()) {
                config.port = port;
            }
            let scheme = if config.cookie_secure { "https" } else { "http" };
            println!("Access the desk at {scheme}://localhost:{}", config.port);
            web::start_server(config).await
        }
        Some("eligibility") => {
            let user_id = parse_id(args.get(2), "user id")?;
            let event_id = parse_id(args.get(3), "event id")?;
            let user = cli_session(&config, user_id, Role::Student)?;
            let backend = HttpBackend::new(&config)?;

            let view = check_eligibility(&backend, &user, event_id, config.gate_failure).await;
            println!("{}", describe_gate(&view));
            Ok(())
        }
        Some("roster") => {
            let event_id = parse_id(args.get(2), "event id")?;
            let user = cli_session(&config, 0, Role::Manager)?;
            let backend = HttpBackend::new(&config)?;

            let snapshot = backend
                .event_roster(&user, event_id)
                .await
                .with_context(|| format!("loading roster for event {event_id}"))?;
            let mut roster = Roster::new();
            roster.replace(snapshot.applicants);
            print_roster(&snapshot.event, &roster);
            Ok(())
        }
        _ => bail!("{USAGE}"),
    }
}

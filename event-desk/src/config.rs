use std::{env, fmt::Display, path::PathBuf, str::FromStr, time::Duration};

use tracing::{info, warn};

use crate::eligibility::FailurePolicy;
use crate::error::AppError;

/// Smallest key the cookie session middleware accepts
const MIN_SESSION_KEY_LEN: usize = 64;

pub struct Config {
    pub port: u16,
    pub backend_url: String,
    pub session_key: Option<Vec<u8>>,
    /// Sets the `Secure` flag on the session cookie; needs HTTPS in front
    pub cookie_secure: bool,
    pub static_dir: PathBuf,
    pub gate_failure: FailurePolicy,
    pub backend_timeout: Option<Duration>,
    pub cli_token: Option<String>,
    /// Roster desks untouched for this long are evicted
    pub desk_idle: Duration,
}

impl Config {
    pub fn load() -> Result<Self, AppError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let session_key = match lookup("EVENT_DESK_SESSION_KEY") {
            Some(key) if key.len() >= MIN_SESSION_KEY_LEN => Some(key.into_bytes()),
            Some(_) => {
                return Err(AppError::Config(format!(
                    "EVENT_DESK_SESSION_KEY must be at least {MIN_SESSION_KEY_LEN} bytes"
                )))
            }
            None => {
                warn!("EVENT_DESK_SESSION_KEY not set, sessions will not survive a restart");
                None
            }
        };

        let backend_timeout = lookup("EVENT_DESK_BACKEND_TIMEOUT_SECS")
            .map(|raw| parse::<u64>("EVENT_DESK_BACKEND_TIMEOUT_SECS", &raw))
            .transpose()?
            .map(Duration::from_secs);

        Ok(Self {
            port: try_load(&lookup, "EVENT_DESK_PORT", "8080")?,
            backend_url: try_load(&lookup, "EVENT_DESK_BACKEND_URL", "http://localhost:8081")?,
            session_key,
            cookie_secure: try_load(&lookup, "EVENT_DESK_COOKIE_SECURE", "false")?,
            static_dir: try_load(&lookup, "EVENT_DESK_STATIC_DIR", "static")?,
            gate_failure: try_load(&lookup, "EVENT_DESK_GATE_FAILURE", "closed")?,
            backend_timeout,
            cli_token: lookup("EVENT_DESK_TOKEN"),
            desk_idle: Duration::from_secs(
                60 * try_load::<_, u64>(&lookup, "EVENT_DESK_DESK_IDLE_MINUTES", "120")?,
            ),
        })
    }
}

fn try_load<F, T>(lookup: &F, key: &str, default: &str) -> Result<T, AppError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: Display,
{
    let raw = lookup(key).unwrap_or_else(|| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });
    parse(key, &raw)
}

fn parse<T>(key: &str, raw: &str) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: Display,
{
    raw.trim()
        .parse()
        .map_err(|e| AppError::Config(format!("invalid {key} value '{raw}': {e}")))
}

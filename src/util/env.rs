use thiserror::Error;

use crate::constants::SERVER_PORT;

#[derive(Debug, Error)]
pub enum EnvErr {
    #[error("missing required variable '{0}'")]
    Missing(&'static str),

    #[error("could not parse '{0}' as a port number")]
    BadPort(String),
}

pub type EnvResult<T> = core::result::Result<T, EnvErr>;

/// Process configuration, resolved once at startup and handed to each
/// component at construction. Components never read the environment ad hoc,
/// so tests can inject a fake `Env` directly.
#[derive(Debug, Clone)]
pub struct Env {
    pub client_id: String,
    pub client_secret: String,
    pub gemini_api_key: Option<String>,
    pub server_port: u16,
}

impl Env {
    pub fn init() -> EnvResult<Self> {
        Ok(Self {
            client_id: require("TWITCH_CLIENT_ID")?,
            client_secret: require("TWITCH_CLIENT_SECRET")?,
            // optional at startup; checked per request so the Twitch routes
            // keep working on a box with no Gemini key configured
            gemini_api_key: dotenvy::var("GEMINI_API_KEY").ok(),
            server_port: match dotenvy::var("SERVER_API_PORT") {
                Ok(raw) => raw.parse::<u16>().map_err(|_| EnvErr::BadPort(raw))?,
                Err(_) => SERVER_PORT,
            },
        })
    }
}

fn require(name: &'static str) -> EnvResult<String> {
    dotenvy::var(name).map_err(|_| EnvErr::Missing(name))
}

pub const API_HELIX_URL: &str = "https://api.twitch.tv/helix";
pub const API_OAUTH_URL: &str = "https://id.twitch.tv/oauth2/token";
pub const API_GEMINI_URL: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash-preview-09-2025:generateContent";

pub const CHANNEL_URL_BASE: &str = "https://twitch.tv";

/// Language tag applied to every `/streams` listing request.
pub const STREAMS_LANGUAGE: &str = "fr";

pub const STREAMS_PAGE_SIZE: usize = 100;
pub const STREAMS_MAX_PAGES: usize = 2;

/// Helix caps `/games` at 100 ids per request; the reference dashboard only
/// ever resolves the first 50 distinct games it sees.
pub const GAMES_BATCH_SIZE: usize = 50;
pub const GAMES_MAX_DISTINCT: usize = 50;

pub const USERS_BATCH_SIZE: usize = 100;

pub const TOP_LIST_LEN: usize = 10;

/// Upper bound on in-flight per-channel enrichment tasks.
pub const MAX_ENRICH_CONCURRENCY: usize = 8;

pub const SERVER_PORT: u16 = 3000;

pub const REQUEST_TIMEOUT_SECS: u64 = 10;

pub const GEMINI_EMPTY_RESPONSE: &str = "Aucune réponse.";

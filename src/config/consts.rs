// src/config/consts.rs

// Guild
pub const DEFAULT_GUILD: &str = "Resonance Remain";
pub const DEFAULT_SHEET_ID: &str = "Test resonance";

// Net config
pub const GUILD_URL_BASE: &str = "https://rubinot.com.br/?subtopic=guilds&page=view&GuildName=";
pub const USER_AGENT: &str = concat!("guild_tracker/", env!("CARGO_PKG_VERSION"));
pub const HTTP_TIMEOUT_SECS: u64 = 20;

// Local store
pub const STORE_DIR: &str = ".store";
pub const FALLBACK_SUBDIR: &str = "fallback";
pub const LOG_FILE: &str = "debug.log";
pub const CONFIG_FILE: &str = "guild_tracker.json";

// Sheets
pub const ARCHIVE_SUFFIX: &str = "_Archive";
pub const HISTORY_SUFFIX: &str = "_History";

// Logging
pub const LOG_ENV: &str = "GUILD_TRACKER_LOG";

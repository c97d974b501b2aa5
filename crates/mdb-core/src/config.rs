//! Configuration loading and resolution.
//!
//! One env file is discovered from a fixed candidate list and parsed into a
//! flat mapping. Keys resolve against that mapping first, the process
//! environment second, and a caller default last. The typed [`Config`] is
//! built once at startup and shared read-only behind an `Arc`.

use std::{
    collections::HashMap,
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

// ============== Env File Discovery ==============

/// Candidate env-file locations, highest priority first.
///
/// The `DOCUMENT_ROOT` entries cover FastCGI-style hosts where the process
/// working directory is not the project checkout.
pub fn candidate_paths() -> Vec<PathBuf> {
    let cwd = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));

    let mut candidates = vec![
        cwd.join("config").join("..").join(".env"),
        cwd.join("..").join(".env"),
    ];

    if let Some(root) = env::var_os("DOCUMENT_ROOT").map(PathBuf::from) {
        candidates.push(root.join(".env"));
        candidates.push(root.join("..").join(".env"));
    }

    candidates
}

/// KEY=VALUE mapping parsed from the first readable env file.
///
/// Values are never written back to the process environment; this mapping is
/// the single explicit configuration source.
#[derive(Clone, Debug, Default)]
pub struct EnvFile {
    values: HashMap<String, String>,
    source: Option<PathBuf>,
}

impl EnvFile {
    /// Load the first readable candidate. No readable file yields an empty
    /// mapping, not an error.
    pub fn discover() -> Self {
        Self::from_candidates(&candidate_paths())
    }

    pub fn from_candidates(candidates: &[PathBuf]) -> Self {
        for path in candidates {
            let Ok(contents) = fs::read_to_string(path) else {
                continue;
            };
            return Self {
                values: parse_env_lines(&contents),
                source: Some(path.clone()),
            };
        }

        Self::default()
    }

    /// The file the mapping was parsed from, if any candidate was readable.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    // ============== Key Resolution ==============

    /// File mapping first, process environment second. Presence wins even
    /// when the value is an empty string.
    pub fn resolve_opt(&self, key: &str) -> Option<String> {
        if let Some(v) = self.values.get(key) {
            return Some(v.clone());
        }
        env::var(key).ok()
    }

    pub fn resolve(&self, key: &str, default: &str) -> String {
        self.resolve_opt(key).unwrap_or_else(|| default.to_string())
    }

    /// Integer resolve. A present but non-numeric value coerces to 0; only an
    /// absent key takes the default.
    pub fn resolve_u64(&self, key: &str, default: u64) -> u64 {
        match self.resolve_opt(key) {
            Some(s) => s.trim().parse::<u64>().unwrap_or(0),
            None => default,
        }
    }
}

fn parse_env_lines(contents: &str) -> HashMap<String, String> {
    let mut values = HashMap::new();

    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        // Split at the first '='; a '#' inside the value is data, not a comment.
        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }

        let mut val = v.trim().to_string();
        // Strip one pair of surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        values.insert(key.to_string(), val);
    }

    values
}

// ============== Version Sanitizing ==============

/// Normalize a version-like value: drop an inline `#` comment, trim, and fall
/// back to `default` when nothing usable remains. Idempotent.
pub fn sanitize_version(raw: Option<&str>, default: &str) -> String {
    let Some(raw) = raw else {
        return default.to_string();
    };

    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return default.to_string();
    }

    let cleaned = match trimmed.find('#') {
        Some(idx) => trimmed[..idx].trim_end(),
        None => trimmed,
    };

    if cleaned.is_empty() {
        return default.to_string();
    }
    cleaned.to_string()
}

// ============== Typed Config ==============

/// Typed configuration for the bot, resolved once at startup.
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    // Credentials
    pub bot_token: String,
    pub webhook_url: String,
    pub secret_key: String,
    pub default_encryption_key: String,
    pub rapidapi_key: String,

    // Versioned provider endpoints
    pub youtube_api_version: String,
    pub tiktok_api_version: String,
    pub instagram_api_version: String,

    // Admins
    pub admin_ids: Vec<i64>,

    // Storage layout
    pub project_root: PathBuf,
    pub downloads_dir: PathBuf,
    pub sessions_dir: PathBuf,
    pub logs_dir: PathBuf,
    pub temp_dir: PathBuf,
    pub cache_dir: PathBuf,

    // Transfer limits (bytes)
    pub max_download_bytes: u64,
    pub max_upload_bytes: u64,

    // Session lifecycle
    pub session_timeout: Duration,
    pub session_cleanup_interval: Duration,
}

impl Config {
    /// Build the full configuration from the discovered env file.
    ///
    /// Resolution never fails: missing keys fall back to defaults and the
    /// binary decides which fields are actually required.
    pub fn load() -> Self {
        Self::from_env_file(&EnvFile::discover())
    }

    pub fn from_env_file(env_file: &EnvFile) -> Self {
        let bot_token = env_file.resolve("BOT_TOKEN", "");
        let webhook_url = env_file.resolve("WEBHOOK_URL", "");
        let secret_key = env_file.resolve("SECRET_KEY", "");
        let default_encryption_key = env_file.resolve("DEFAULT_ENCRYPTION_KEY", "");
        // Honored for older deployments that still route through RapidAPI.
        let rapidapi_key = env_file.resolve("RAPIDAPI_KEY", "");

        let youtube_api_version =
            sanitize_version(env_file.resolve_opt("YOUTUBE_API_VERSION").as_deref(), "v2");
        let tiktok_api_version =
            sanitize_version(env_file.resolve_opt("TIKTOK_API_VERSION").as_deref(), "v1");
        let instagram_api_version = sanitize_version(
            env_file.resolve_opt("INSTAGRAM_API_VERSION").as_deref(),
            "v1",
        );

        let admin_ids = parse_csv_i64(env_file.resolve_opt("ADMIN_IDS"));

        let project_root = env_file
            .resolve_opt("PROJECT_ROOT")
            .map(PathBuf::from)
            .unwrap_or_else(|| env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

        let downloads_dir = project_root.join(env_file.resolve("DOWNLOAD_DIR", "downloads"));
        let sessions_dir = project_root.join(env_file.resolve("SESSION_DIR", "sessions"));
        let logs_dir = project_root.join(env_file.resolve("LOG_DIR", "logs"));
        let temp_dir = project_root.join(env_file.resolve("TEMP_DIR", "tmp"));
        let cache_dir = project_root.join(env_file.resolve("CACHE_DIR", "cache"));

        let max_download_bytes = env_file.resolve_u64("MAX_DOWNLOAD_BYTES", 2_147_483_648);
        let max_upload_bytes = env_file.resolve_u64("MAX_UPLOAD_BYTES", 52_428_800);

        let session_timeout = Duration::from_secs(env_file.resolve_u64("SESSION_TIMEOUT", 3600));
        let session_cleanup_interval =
            Duration::from_secs(env_file.resolve_u64("SESSION_CLEANUP_INTERVAL", 600));

        Self {
            bot_token,
            webhook_url,
            secret_key,
            default_encryption_key,
            rapidapi_key,
            youtube_api_version,
            tiktok_api_version,
            instagram_api_version,
            admin_ids,
            project_root,
            downloads_dir,
            sessions_dir,
            logs_dir,
            temp_dir,
            cache_dir,
            max_download_bytes,
            max_upload_bytes,
            session_timeout,
            session_cleanup_interval,
        }
    }

    /// All directories the bot owns and may create at startup.
    pub fn storage_dirs(&self) -> [&Path; 5] {
        [
            &self.downloads_dir,
            &self.sessions_dir,
            &self.logs_dir,
            &self.temp_dir,
            &self.cache_dir,
        ]
    }
}

fn parse_csv_i64(v: Option<String>) -> Vec<i64> {
    v.unwrap_or_default()
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<i64>().unwrap_or(0))
        .filter(|id| *id != 0)
        .collect()
}

use std::path::PathBuf;

use tunegrab_core::dependencies::{ToolCommand, Toolchain, FFMPEG, YT_DLP};
use tunegrab_core::sweep::{DEFAULT_EXPIRY_SECS, DEFAULT_INTERVAL_SECS};

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Where converted artifacts are written (default: `downloads`).
    pub downloads_dir: PathBuf,
    /// Static front-end assets served for unmatched `GET`s (default: `public`).
    pub static_dir: PathBuf,
    /// Converter and ffmpeg commands.
    pub toolchain: Toolchain,
    /// Age after which jobs and files are reclaimed (default: `3600`).
    pub job_expiry_secs: u64,
    /// Interval between sweeps (default: `600`).
    pub sweep_interval_secs: u64,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                    |
    /// |------------------------|----------------------------|
    /// | `HOST`                 | `0.0.0.0`                  |
    /// | `PORT`                 | `3000`                     |
    /// | `CORS_ORIGINS`         | `http://localhost:3000`    |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                       |
    /// | `DOWNLOADS_DIR`        | `downloads`                |
    /// | `STATIC_DIR`           | `public`                   |
    /// | `YTDLP_COMMAND`        | `yt-dlp`                   |
    /// | `FFMPEG_COMMAND`       | `ffmpeg`                   |
    /// | `JOB_EXPIRY_SECS`      | `3600`                     |
    /// | `SWEEP_INTERVAL_SECS`  | `600`                      |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:3000".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs = env_u64("REQUEST_TIMEOUT_SECS", 30);

        let downloads_dir =
            PathBuf::from(std::env::var("DOWNLOADS_DIR").unwrap_or_else(|_| "downloads".into()));
        let static_dir =
            PathBuf::from(std::env::var("STATIC_DIR").unwrap_or_else(|_| "public".into()));

        let toolchain = Toolchain {
            converter: env_command("YTDLP_COMMAND", YT_DLP),
            ffmpeg: env_command("FFMPEG_COMMAND", FFMPEG),
        };

        let job_expiry_secs = env_u64("JOB_EXPIRY_SECS", DEFAULT_EXPIRY_SECS);
        let sweep_interval_secs = env_u64("SWEEP_INTERVAL_SECS", DEFAULT_INTERVAL_SECS);
        assert!(sweep_interval_secs > 0, "SWEEP_INTERVAL_SECS must be positive");

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            downloads_dir,
            static_dir,
            toolchain,
            job_expiry_secs,
            sweep_interval_secs,
        }
    }
}

fn env_u64(name: &str, default: u64) -> u64 {
    match std::env::var(name) {
        Ok(value) => value
            .parse()
            .unwrap_or_else(|_| panic!("{name} must be a valid u64")),
        Err(_) => default,
    }
}

fn env_command(name: &str, default: &str) -> ToolCommand {
    match std::env::var(name) {
        Ok(value) => ToolCommand::parse(&value)
            .unwrap_or_else(|e| panic!("{name} is not a valid command: {e}")),
        Err(_) => ToolCommand::new(default),
    }
}

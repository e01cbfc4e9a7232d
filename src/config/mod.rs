//! Configuration layer: typed settings with layered precedence (file → env → CLI).

mod cli;
#[cfg(test)]
mod tests;

use std::{
    net::SocketAddr,
    num::{NonZeroU32, NonZeroU64, NonZeroUsize},
    path::PathBuf,
    str::FromStr,
    time::Duration,
};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

pub use cli::{CliArgs, Command, ServeArgs, ServeOverrides};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "solar-leveling";
const ENV_PREFIX: &str = "SOLAR_LEVELING";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_GRACEFUL_SHUTDOWN_SECS: u64 = 30;
const DEFAULT_STORE_TIMEOUT_SECS: u64 = 10;
const DEFAULT_UPLOAD_DIR: &str = "uploads";
const DEFAULT_UPLOAD_REQUEST_LIMIT_BYTES: u64 = 10 * 1024 * 1024;
const DEFAULT_MAIL_RELAY_URL: &str = "https://api.resend.com/emails";
const DEFAULT_MAIL_FROM: &str = "Solar Leveling <onboarding@resend.dev>";
const DEFAULT_MAIL_TIMEOUT_SECS: u64 = 10;
const DEFAULT_SESSION_TTL_HOURS: u32 = 24;
const DEFAULT_SITE_NAME: &str = "Solar Leveling";
const DEFAULT_PREVIEW_CHARS: usize = 150;

/// Fully-resolved deployment settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub store: StoreSettings,
    pub storage: StorageSettings,
    pub mail: MailSettings,
    pub admin: AdminSettings,
    pub site: SiteSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub addr: SocketAddr,
    pub graceful_shutdown: Duration,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct StoreSettings {
    pub backend: StoreBackend,
    pub timeout: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    /// Process-local tree; contents vanish on restart.
    Memory,
    Rest {
        base_url: Url,
        auth: Option<String>,
    },
}

#[derive(Debug, Clone)]
pub struct StorageSettings {
    pub backend: StorageBackend,
    pub max_request_bytes: NonZeroU64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackend {
    Local { directory: PathBuf },
    Rest { bucket_url: Url, token: Option<String> },
}

#[derive(Debug, Clone)]
pub struct MailSettings {
    pub relay_url: Url,
    pub api_key: Option<String>,
    pub from: String,
    pub to: Option<String>,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct AdminSettings {
    pub password: Option<String>,
    pub session_secret: Option<String>,
    pub session_ttl_hours: NonZeroU32,
}

#[derive(Debug, Clone)]
pub struct SiteSettings {
    pub name: String,
    pub base_url: Option<Url>,
    pub preview_chars: NonZeroUsize,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match cli.command.as_ref() {
        Some(Command::Serve(args)) => raw.apply_serve_overrides(&args.overrides),
        None => raw.apply_serve_overrides(&ServeOverrides::default()),
    }

    Settings::from_raw(raw)
}

/// Resolve configuration using the process arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    store: RawStoreSettings,
    storage: RawStorageSettings,
    mail: RawMailSettings,
    admin: RawAdminSettings,
    site: RawSiteSettings,
}

impl RawSettings {
    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        if let Some(host) = overrides.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(port) = overrides.server_port {
            self.server.port = Some(port);
        }
        if let Some(seconds) = overrides.server_graceful_shutdown_seconds {
            self.server.graceful_shutdown_seconds = Some(seconds);
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(backend) = overrides.store_backend.as_ref() {
            self.store.backend = Some(backend.clone());
        }
        if let Some(url) = overrides.store_url.as_ref() {
            self.store.url = Some(url.clone());
        }
        if let Some(seconds) = overrides.store_timeout_seconds {
            self.store.timeout_seconds = Some(seconds);
        }
        if let Some(directory) = overrides.storage_directory.as_ref() {
            self.storage.directory = Some(directory.clone());
        }
        if let Some(limit) = overrides.storage_max_request_bytes {
            self.storage.max_request_bytes = Some(limit);
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            store,
            storage,
            mail,
            admin,
            site,
        } = raw;

        Ok(Self {
            server: build_server_settings(server)?,
            logging: build_logging_settings(logging)?,
            store: build_store_settings(store)?,
            storage: build_storage_settings(storage)?,
            mail: build_mail_settings(mail)?,
            admin: build_admin_settings(admin)?,
            site: build_site_settings(site)?,
        })
    }
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let host = server.host.unwrap_or_else(|| DEFAULT_HOST.to_string());

    let port = server.port.unwrap_or(DEFAULT_PORT);
    if port == 0 {
        return Err(LoadError::invalid(
            "server.port",
            "port must be greater than zero",
        ));
    }

    let addr = parse_socket_addr(&host, port)
        .map_err(|reason| LoadError::invalid("server.addr", reason))?;

    let graceful_secs = server
        .graceful_shutdown_seconds
        .unwrap_or(DEFAULT_GRACEFUL_SHUTDOWN_SECS);
    if graceful_secs == 0 {
        return Err(LoadError::invalid(
            "server.graceful_shutdown_seconds",
            "must be greater than zero",
        ));
    }

    Ok(ServerSettings {
        addr,
        graceful_shutdown: Duration::from_secs(graceful_secs),
    })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_store_settings(store: RawStoreSettings) -> Result<StoreSettings, LoadError> {
    let url = non_blank(store.url);
    let auth = non_blank(store.auth);
    let backend_name = non_blank(store.backend).unwrap_or_else(|| {
        if url.is_some() {
            "rest".to_string()
        } else {
            "memory".to_string()
        }
    });

    let backend = match backend_name.to_ascii_lowercase().as_str() {
        "memory" => StoreBackend::Memory,
        "rest" => {
            let raw_url = url.ok_or_else(|| {
                LoadError::invalid("store.url", "required when store.backend is `rest`")
            })?;
            StoreBackend::Rest {
                base_url: parse_base_url(&raw_url, "store.url")?,
                auth,
            }
        }
        other => {
            return Err(LoadError::invalid(
                "store.backend",
                format!("unknown backend `{other}` (expected `rest` or `memory`)"),
            ));
        }
    };

    let timeout_secs = store.timeout_seconds.unwrap_or(DEFAULT_STORE_TIMEOUT_SECS);
    if timeout_secs == 0 {
        return Err(LoadError::invalid(
            "store.timeout_seconds",
            "must be greater than zero",
        ));
    }

    Ok(StoreSettings {
        backend,
        timeout: Duration::from_secs(timeout_secs),
    })
}

fn build_storage_settings(storage: RawStorageSettings) -> Result<StorageSettings, LoadError> {
    let backend = match non_blank(storage.bucket_url) {
        Some(raw_url) => StorageBackend::Rest {
            bucket_url: parse_base_url(&raw_url, "storage.bucket_url")?,
            token: non_blank(storage.token),
        },
        None => StorageBackend::Local {
            directory: storage
                .directory
                .unwrap_or_else(|| PathBuf::from(DEFAULT_UPLOAD_DIR)),
        },
    };

    let max_request_bytes_value = storage
        .max_request_bytes
        .unwrap_or(DEFAULT_UPLOAD_REQUEST_LIMIT_BYTES);
    let max_request_bytes = NonZeroU64::new(max_request_bytes_value).ok_or_else(|| {
        LoadError::invalid("storage.max_request_bytes", "must be greater than zero")
    })?;
    usize::try_from(max_request_bytes_value).map_err(|_| {
        LoadError::invalid(
            "storage.max_request_bytes",
            "value exceeds supported range for usize",
        )
    })?;

    Ok(StorageSettings {
        backend,
        max_request_bytes,
    })
}

fn build_mail_settings(mail: RawMailSettings) -> Result<MailSettings, LoadError> {
    let relay_url = non_blank(mail.relay_url).unwrap_or_else(|| DEFAULT_MAIL_RELAY_URL.to_string());
    let relay_url = Url::parse(&relay_url)
        .map_err(|err| LoadError::invalid("mail.relay_url", err.to_string()))?;

    let timeout_secs = mail.timeout_seconds.unwrap_or(DEFAULT_MAIL_TIMEOUT_SECS);
    if timeout_secs == 0 {
        return Err(LoadError::invalid(
            "mail.timeout_seconds",
            "must be greater than zero",
        ));
    }

    Ok(MailSettings {
        relay_url,
        api_key: non_blank(mail.api_key),
        from: non_blank(mail.from).unwrap_or_else(|| DEFAULT_MAIL_FROM.to_string()),
        to: non_blank(mail.to),
        timeout: Duration::from_secs(timeout_secs),
    })
}

fn build_admin_settings(admin: RawAdminSettings) -> Result<AdminSettings, LoadError> {
    let ttl = admin
        .session_ttl_hours
        .unwrap_or(u64::from(DEFAULT_SESSION_TTL_HOURS));
    Ok(AdminSettings {
        password: non_blank(admin.password),
        session_secret: non_blank(admin.session_secret),
        session_ttl_hours: non_zero_u32(ttl, "admin.session_ttl_hours")?,
    })
}

fn build_site_settings(site: RawSiteSettings) -> Result<SiteSettings, LoadError> {
    let base_url = non_blank(site.base_url)
        .map(|raw| parse_base_url(&raw, "site.base_url"))
        .transpose()?;
    let preview_chars = NonZeroUsize::new(site.preview_chars.unwrap_or(DEFAULT_PREVIEW_CHARS))
        .ok_or_else(|| LoadError::invalid("site.preview_chars", "must be greater than zero"))?;

    Ok(SiteSettings {
        name: non_blank(site.name).unwrap_or_else(|| DEFAULT_SITE_NAME.to_string()),
        base_url,
        preview_chars,
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    port: Option<u16>,
    graceful_shutdown_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawStoreSettings {
    backend: Option<String>,
    url: Option<String>,
    auth: Option<String>,
    timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawStorageSettings {
    directory: Option<PathBuf>,
    bucket_url: Option<String>,
    token: Option<String>,
    max_request_bytes: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawMailSettings {
    relay_url: Option<String>,
    api_key: Option<String>,
    from: Option<String>,
    to: Option<String>,
    timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawAdminSettings {
    password: Option<String>,
    session_secret: Option<String>,
    session_ttl_hours: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSiteSettings {
    name: Option<String>,
    base_url: Option<String>,
    preview_chars: Option<usize>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

/// Parse a base URL, normalizing it to end with `/` so relative joins append instead of replace.
fn parse_base_url(raw: &str, key: &'static str) -> Result<Url, LoadError> {
    let mut url = Url::parse(raw).map_err(|err| LoadError::invalid(key, err.to_string()))?;
    if url.cannot_be_a_base() {
        return Err(LoadError::invalid(key, "must be an absolute http(s) URL"));
    }
    if !matches!(url.scheme(), "http" | "https") {
        return Err(LoadError::invalid(key, "scheme must be http or https"));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let candidate = format!("{host}:{port}");
    candidate
        .parse()
        .map_err(|err| format!("invalid address `{candidate}`: {err}"))
}

fn non_zero_u32(value: u64, key: &'static str) -> Result<NonZeroU32, LoadError> {
    if value == 0 {
        return Err(LoadError::invalid(key, "must be greater than zero"));
    }
    let value_u32: u32 = value
        .try_into()
        .map_err(|_| LoadError::invalid(key, "value exceeds supported range for u32"))?;
    NonZeroU32::new(value_u32).ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))
}

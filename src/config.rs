use std::path::PathBuf;
use std::time::Duration;

use actix_web::cookie::SameSite;
use thiserror::Error;

const DEFAULT_FRONT_ORIGIN: &str = "https://cnrkddl.github.io";
const DEFAULT_SCOPE: &str = "profile_nickname,account_email";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("invalid value for {key}: {message}")]
    Invalid { key: &'static str, message: String },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub http: HttpConfig,
    pub database: DatabaseConfig,
    pub kakao: KakaoConfig,
    pub frontend: FrontendConfig,
    pub cookies: CookieConfig,
    pub chatbot: ChatbotConfig,
    pub records: RecordsConfig,
    pub log_level: String,
}

#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub host: String,
    pub port: u16,
    pub backend_base: String,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub pool_size: u32,
    pub seed_sample_data: bool,
}

#[derive(Debug, Clone)]
pub struct KakaoConfig {
    pub client_id: String,
    pub client_secret: Option<String>,
    pub admin_key: Option<String>,
    pub redirect_uri: String,
    pub default_scope: String,
    pub auth_host: String,
    pub api_host: String,
}

#[derive(Debug, Clone)]
pub struct FrontendConfig {
    pub base: String,
    pub use_hash_router: bool,
    /// Origins allowed for CORS and for absolute `next` redirects.
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct CookieConfig {
    pub domain: Option<String>,
    pub secure: bool,
    pub same_site: SameSite,
    /// Base64 AES-256 key for sealing token cookies.
    pub secret: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ChatbotConfig {
    pub url: Option<String>,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct RecordsConfig {
    pub analyze_pdf_path: PathBuf,
    pub registry_file: Option<PathBuf>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let backend_base = get("BACKEND_BASE")
            .unwrap_or_else(|| "http://localhost:8000".to_string())
            .trim_end_matches('/')
            .to_string();

        let http = HttpConfig {
            host: get("HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            port: parse_or("PORT", get("PORT"), 8000)?,
            backend_base: backend_base.clone(),
        };

        let database = DatabaseConfig {
            url: get("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?,
            pool_size: parse_or("DATABASE_POOL_SIZE", get("DATABASE_POOL_SIZE"), 5)?,
            seed_sample_data: parse_bool("SEED_SAMPLE_DATA", get("SEED_SAMPLE_DATA"), false)?,
        };

        let kakao = KakaoConfig {
            client_id: get("KAKAO_CLIENT_ID").ok_or(ConfigError::Missing("KAKAO_CLIENT_ID"))?,
            client_secret: get("KAKAO_CLIENT_SECRET"),
            admin_key: get("KAKAO_ADMIN_KEY"),
            redirect_uri: get("KAKAO_REDIRECT_URI")
                .unwrap_or_else(|| format!("{backend_base}/auth/kakao/callback")),
            default_scope: get("KAKAO_SCOPE").unwrap_or_else(|| DEFAULT_SCOPE.to_string()),
            auth_host: host_or(get("KAKAO_AUTH_HOST"), "https://kauth.kakao.com"),
            api_host: host_or(get("KAKAO_API_HOST"), "https://kapi.kakao.com"),
        };

        let mut allowed_origins = vec![
            get("FRONT_ORIGIN")
                .unwrap_or_else(|| DEFAULT_FRONT_ORIGIN.to_string())
                .trim_end_matches('/')
                .to_string(),
            "http://localhost:3000".to_string(),
            "http://127.0.0.1:3000".to_string(),
        ];
        if let Some(extra) = get("CORS_ORIGINS") {
            allowed_origins.extend(
                extra
                    .split(',')
                    .map(|o| o.trim().trim_end_matches('/').to_string())
                    .filter(|o| !o.is_empty()),
            );
        }
        allowed_origins.dedup();

        let frontend = FrontendConfig {
            base: get("FRONTEND_BASE")
                .unwrap_or_else(|| "http://localhost:3000".to_string())
                .trim_end_matches('/')
                .to_string(),
            use_hash_router: parse_bool("USE_HASH_ROUTER", get("USE_HASH_ROUTER"), true)?,
            allowed_origins,
        };

        let cookies = CookieConfig {
            domain: get("COOKIE_DOMAIN"),
            secure: parse_bool("COOKIE_SECURE", get("COOKIE_SECURE"), true)?,
            same_site: parse_same_site(get("COOKIE_SAMESITE"))?,
            secret: get("COOKIE_SECRET"),
        };

        let chatbot = ChatbotConfig {
            url: get("CHATBOT_URL"),
            timeout: Duration::from_secs(parse_or(
                "CHATBOT_TIMEOUT_SECS",
                get("CHATBOT_TIMEOUT_SECS"),
                30,
            )?),
        };

        let records = RecordsConfig {
            analyze_pdf_path: get("ANALYZE_PDF_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("uploads/nursing-record.pdf")),
            registry_file: get("PATIENT_PDFS_FILE").map(PathBuf::from),
        };

        Ok(Self {
            http,
            database,
            kakao,
            frontend,
            cookies,
            chatbot,
            records,
            log_level: get("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        })
    }
}

fn host_or(value: Option<String>, default: &str) -> String {
    value
        .unwrap_or_else(|| default.to_string())
        .trim_end_matches('/')
        .to_string()
}

fn parse_or<T>(key: &'static str, value: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match value {
        Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            message: e.to_string(),
        }),
        None => Ok(default),
    }
}

fn parse_bool(key: &'static str, value: Option<String>, default: bool) -> Result<bool, ConfigError> {
    match value.as_deref().map(str::to_ascii_lowercase).as_deref() {
        None => Ok(default),
        Some("true" | "1" | "yes" | "on") => Ok(true),
        Some("false" | "0" | "no" | "off") => Ok(false),
        Some(other) => Err(ConfigError::Invalid {
            key,
            message: format!("expected a boolean, got {other:?}"),
        }),
    }
}

fn parse_same_site(value: Option<String>) -> Result<SameSite, ConfigError> {
    match value.as_deref().map(str::to_ascii_lowercase).as_deref() {
        None | Some("none") => Ok(SameSite::None),
        Some("lax") => Ok(SameSite::Lax),
        Some("strict") => Ok(SameSite::Strict),
        Some(other) => Err(ConfigError::Invalid {
            key: "COOKIE_SAMESITE",
            message: format!("expected lax, strict or none, got {other:?}"),
        }),
    }
}

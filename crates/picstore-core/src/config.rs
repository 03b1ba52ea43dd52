//! Configuration module
//!
//! Environment-based configuration for the upload gateway: HTTP server, Spaces
//! (S3-compatible) replication set, transform provider credentials, store-API
//! authentication, and pipeline tuning knobs.

use std::env;

// Common constants
const DEFAULT_PORT: u16 = 4000;
const DEFAULT_BASE_URI: &str = "/v1/";
const MAX_UPLOAD_SIZE_MB: usize = 2;
const TRANSFORM_TIMEOUT_SECS: u64 = 20;
const VARIANT_RETRY_DELAY_MS: u64 = 1000;
const PENDING_TTL_SECS: u64 = 600;
const AUTH_PACE_MS: u64 = 500;
const DEFAULT_STORE_API_URL: &str = "https://api.e-com.plus/v1/(auth).json";

/// Store ids below this threshold are rejected before authentication, and ids
/// above it get tenant-scoped key/prefix rewriting on the S3 passthrough.
pub const STORE_ID_THRESHOLD: u64 = 100;

/// Content types the transform provider can derive size variants from.
/// Anything else is stored as-is and answered with a zoom-only picture map.
pub const TRANSFORMABLE_CONTENT_TYPES: [&str; 6] = [
    "image/jpeg",
    "image/jpg",
    "image/png",
    "image/webp",
    "image/gif",
    "image/bmp",
];

/// Variant derivation strategy (see the pipeline orchestrator).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformStrategy {
    /// Request and store each size before requesting the next.
    Sequential,
    /// Request all sizes in one provider call; each completion writes independently.
    FanOut,
}

/// Which external transform provider to drive the pipeline with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    /// Synchronous: variant bytes come back inline.
    Cloudflare,
    /// Asynchronous: an opaque id now, bytes later via callback.
    Kraken,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub server_port: u16,
    pub cors_origins: Vec<String>,
    pub environment: String,
    /// URI segment between `/:store` and the operation, e.g. `/v1/`.
    pub base_uri: String,

    // Spaces replication set
    pub space_name: String,
    /// Regional datacenters; the first is the primary, the rest are mirrors.
    pub datacenters: Vec<String>,
    pub space_endpoint_suffix: String,
    /// Optional CDN host override used when mounting public URIs.
    pub cdn_host: Option<String>,

    // Upload limits and variant sizes
    pub max_upload_size_bytes: usize,
    /// Pixel sizes for the derived variants, largest first.
    pub picture_sizes: Vec<u32>,

    // Transform provider
    pub provider: ProviderKind,
    pub transform_strategy: TransformStrategy,
    pub transform_timeout_secs: u64,
    pub variant_retry_delay_ms: u64,
    pub cloudflare_account_id: Option<String>,
    pub cloudflare_api_key: Option<String>,
    pub kraken_api_key: Option<String>,
    pub kraken_api_secret: Option<String>,
    /// Public base URL the async provider calls back to, e.g. `https://gw.example.com`.
    pub callback_base_url: Option<String>,
    pub pending_ttl_secs: u64,

    // Store API authentication
    pub store_api_url: String,
    pub auth_pace_ms: u64,
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let cors_origins: Vec<String> = env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .collect();

        let datacenters: Vec<String> = env::var("SPACE_DATACENTERS")
            .unwrap_or_else(|_| "nyc3".to_string())
            .split(',')
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect();

        let picture_sizes: Vec<u32> = env::var("PICTURE_SIZES")
            .unwrap_or_else(|_| "700,350".to_string())
            .split(',')
            .filter_map(|s| s.trim().parse().ok())
            .collect();

        let max_upload_size_mb = env::var("MAX_UPLOAD_SIZE_MB")
            .unwrap_or_else(|_| MAX_UPLOAD_SIZE_MB.to_string())
            .parse::<usize>()
            .unwrap_or(MAX_UPLOAD_SIZE_MB);

        let provider = match env::var("TRANSFORM_PROVIDER")
            .unwrap_or_else(|_| "cloudflare".to_string())
            .to_lowercase()
            .as_str()
        {
            "kraken" => ProviderKind::Kraken,
            _ => ProviderKind::Cloudflare,
        };

        let transform_strategy = match env::var("TRANSFORM_STRATEGY")
            .unwrap_or_else(|_| "fanout".to_string())
            .to_lowercase()
            .as_str()
        {
            "sequential" => TransformStrategy::Sequential,
            _ => TransformStrategy::FanOut,
        };

        let config = Config {
            server_port: env::var("PORT")
                .unwrap_or_else(|_| DEFAULT_PORT.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?,
            cors_origins,
            environment,
            base_uri: env::var("BASE_URI").unwrap_or_else(|_| DEFAULT_BASE_URI.to_string()),
            space_name: env::var("SPACE_NAME")
                .map_err(|_| anyhow::anyhow!("SPACE_NAME must be set"))?,
            datacenters,
            space_endpoint_suffix: env::var("SPACE_ENDPOINT_SUFFIX")
                .unwrap_or_else(|_| "digitaloceanspaces.com".to_string()),
            cdn_host: env::var("CDN_HOST").ok(),
            max_upload_size_bytes: max_upload_size_mb * 1024 * 1024,
            picture_sizes,
            provider,
            transform_strategy,
            transform_timeout_secs: env::var("TRANSFORM_TIMEOUT_SECS")
                .unwrap_or_else(|_| TRANSFORM_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(TRANSFORM_TIMEOUT_SECS),
            variant_retry_delay_ms: env::var("VARIANT_RETRY_DELAY_MS")
                .unwrap_or_else(|_| VARIANT_RETRY_DELAY_MS.to_string())
                .parse()
                .unwrap_or(VARIANT_RETRY_DELAY_MS),
            cloudflare_account_id: env::var("CLOUDFLARE_ACCOUNT_ID").ok(),
            cloudflare_api_key: env::var("CLOUDFLARE_API_KEY").ok(),
            kraken_api_key: env::var("KRAKEN_API_KEY").ok(),
            kraken_api_secret: env::var("KRAKEN_API_SECRET").ok(),
            callback_base_url: env::var("CALLBACK_BASE_URL").ok(),
            pending_ttl_secs: env::var("PENDING_TTL_SECS")
                .unwrap_or_else(|_| PENDING_TTL_SECS.to_string())
                .parse()
                .unwrap_or(PENDING_TTL_SECS),
            store_api_url: env::var("STORE_API_URL")
                .unwrap_or_else(|_| DEFAULT_STORE_API_URL.to_string()),
            auth_pace_ms: env::var("AUTH_PACE_MS")
                .unwrap_or_else(|_| AUTH_PACE_MS.to_string())
                .parse()
                .unwrap_or(AUTH_PACE_MS),
        };

        Ok(config)
    }

    /// Validate configuration - fail fast on misconfiguration.
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if !self.base_uri.starts_with('/') || !self.base_uri.ends_with('/') {
            return Err(anyhow::anyhow!(
                "BASE_URI must start and end with '/' (got '{}')",
                self.base_uri
            ));
        }
        if self.datacenters.is_empty() {
            return Err(anyhow::anyhow!("SPACE_DATACENTERS must name at least one datacenter"));
        }
        if self.picture_sizes.is_empty() {
            return Err(anyhow::anyhow!("PICTURE_SIZES must name at least one size"));
        }
        if self.is_production() && self.cors_origins.iter().any(|o| o == "*") {
            return Err(anyhow::anyhow!(
                "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
            ));
        }
        match self.provider {
            ProviderKind::Cloudflare => {
                if self.cloudflare_account_id.is_none() || self.cloudflare_api_key.is_none() {
                    return Err(anyhow::anyhow!(
                        "CLOUDFLARE_ACCOUNT_ID and CLOUDFLARE_API_KEY must be set for the cloudflare provider"
                    ));
                }
            }
            ProviderKind::Kraken => {
                if self.kraken_api_key.is_none() || self.kraken_api_secret.is_none() {
                    return Err(anyhow::anyhow!(
                        "KRAKEN_API_KEY and KRAKEN_API_SECRET must be set for the kraken provider"
                    ));
                }
                if self.callback_base_url.is_none() {
                    return Err(anyhow::anyhow!(
                        "CALLBACK_BASE_URL must be set for the kraken provider"
                    ));
                }
            }
        }
        Ok(())
    }

    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    /// Bucket name for one datacenter: `{space_name}-{datacenter}`.
    pub fn bucket_for(&self, datacenter: &str) -> String {
        format!("{}-{}", self.space_name, datacenter)
    }

    /// S3 endpoint URL for one datacenter.
    pub fn endpoint_for(&self, datacenter: &str) -> String {
        format!("https://{}.{}", datacenter, self.space_endpoint_suffix)
    }

    /// CDN host serving one datacenter's bucket.
    pub fn host_for(&self, datacenter: &str) -> String {
        format!(
            "{}.{}.cdn.{}",
            self.bucket_for(datacenter),
            datacenter,
            self.space_endpoint_suffix
        )
    }

    /// Primary datacenter (first configured).
    pub fn primary_datacenter(&self) -> &str {
        &self.datacenters[0]
    }

    /// Host used when mounting public URIs: CDN override, or the primary's host.
    pub fn public_host(&self) -> String {
        self.cdn_host
            .clone()
            .unwrap_or_else(|| self.host_for(self.primary_datacenter()))
    }

    pub fn is_transformable(content_type: &str) -> bool {
        TRANSFORMABLE_CONTENT_TYPES.contains(&content_type.to_lowercase().as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> Config {
        Config {
            server_port: 4000,
            cors_origins: vec!["*".to_string()],
            environment: "development".to_string(),
            base_uri: "/v1/".to_string(),
            space_name: "mystore".to_string(),
            datacenters: vec!["nyc3".to_string(), "ams3".to_string()],
            space_endpoint_suffix: "digitaloceanspaces.com".to_string(),
            cdn_host: None,
            max_upload_size_bytes: 2 * 1024 * 1024,
            picture_sizes: vec![700, 350],
            provider: ProviderKind::Cloudflare,
            transform_strategy: TransformStrategy::FanOut,
            transform_timeout_secs: 20,
            variant_retry_delay_ms: 1000,
            cloudflare_account_id: Some("acct".to_string()),
            cloudflare_api_key: Some("key".to_string()),
            kraken_api_key: None,
            kraken_api_secret: None,
            callback_base_url: None,
            pending_ttl_secs: 600,
            store_api_url: DEFAULT_STORE_API_URL.to_string(),
            auth_pace_ms: 500,
        }
    }

    #[test]
    fn bucket_endpoint_and_host_follow_datacenter() {
        let config = base_config();
        assert_eq!(config.bucket_for("nyc3"), "mystore-nyc3");
        assert_eq!(
            config.endpoint_for("nyc3"),
            "https://nyc3.digitaloceanspaces.com"
        );
        assert_eq!(
            config.host_for("nyc3"),
            "mystore-nyc3.nyc3.cdn.digitaloceanspaces.com"
        );
        assert_eq!(config.primary_datacenter(), "nyc3");
    }

    #[test]
    fn cdn_host_overrides_public_host() {
        let mut config = base_config();
        assert_eq!(
            config.public_host(),
            "mystore-nyc3.nyc3.cdn.digitaloceanspaces.com"
        );
        config.cdn_host = Some("cdn.example.com".to_string());
        assert_eq!(config.public_host(), "cdn.example.com");
    }

    #[test]
    fn validate_rejects_wildcard_cors_in_production() {
        let mut config = base_config();
        config.environment = "production".to_string();
        assert!(config.validate().is_err());
        config.cors_origins = vec!["https://admin.example.com".to_string()];
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_requires_provider_credentials() {
        let mut config = base_config();
        config.provider = ProviderKind::Kraken;
        assert!(config.validate().is_err());
        config.kraken_api_key = Some("k".to_string());
        config.kraken_api_secret = Some("s".to_string());
        config.callback_base_url = Some("https://gw.example.com".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn transformable_content_types() {
        assert!(Config::is_transformable("image/jpeg"));
        assert!(Config::is_transformable("IMAGE/PNG"));
        assert!(!Config::is_transformable("application/pdf"));
    }
}

use std::sync::Arc;
use std::time::Duration;

use crate::rewrite::{DevProxyRewrite, PassThrough, SourceRewrite};
use crate::{LoadError, LoadResult};

/// Where the loader is running. Decides how source URLs are routed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ExecutionMode {
    /// Source URLs are fetched as given
    #[default]
    Production,

    /// Source URLs under `genomeark/` are routed through the dev proxy
    /// served at `origin` (empty for a same-origin relative path)
    Development { origin: String },
}

impl ExecutionMode {
    /// Parse a mode name (`development`/`dev` or `production`/`prod`)
    pub fn parse(mode: &str, origin: Option<String>) -> LoadResult<Self> {
        match mode.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Ok(Self::Production),
            "development" | "dev" => Ok(Self::Development {
                origin: origin.unwrap_or_default(),
            }),
            other => Err(LoadError::invalid(format!("unknown execution mode: {other}"))),
        }
    }

    /// Reject development mode without an absolute proxy origin.
    ///
    /// An empty origin yields relative `/dev-proxy/...` paths, which only a
    /// fetcher that resolves them itself can use.
    pub fn require_origin(&self) -> LoadResult<()> {
        match self {
            Self::Development { origin } if origin.trim().is_empty() => Err(LoadError::invalid(
                "DOG_LOADER_DEV_ORIGIN is required in development mode",
            )),
            _ => Ok(()),
        }
    }

    /// The rewrite strategy this mode implies
    pub fn rewrite(&self) -> Arc<dyn SourceRewrite> {
        match self {
            Self::Production => Arc::new(PassThrough),
            Self::Development { origin } => Arc::new(DevProxyRewrite::new(origin.clone())),
        }
    }
}

/// Configuration for a loader
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    /// Routing mode for source URLs
    pub mode: ExecutionMode,

    /// Content type recorded against each decompressed object
    pub content_type: String,

    /// Upper bound on inflated size (guards against decompression bombs)
    pub max_decompressed_bytes: u64,

    /// Per-request timeout for the HTTP fetcher; `None` waits indefinitely
    pub request_timeout: Option<Duration>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            mode: ExecutionMode::Production,
            content_type: "image/png".to_string(),
            max_decompressed_bytes: 128 * 1024 * 1024, // 128MB
            request_timeout: Some(Duration::from_secs(30)),
        }
    }
}

impl LoaderConfig {
    /// Create a new config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a config from `DOG_LOADER_*` environment variables.
    ///
    /// - `DOG_LOADER_MODE`: `development` or `production` (default)
    /// - `DOG_LOADER_DEV_ORIGIN`: origin serving `/dev-proxy/`, required in development
    /// - `DOG_LOADER_TIMEOUT_SECS`: request timeout, `0` disables it
    /// - `DOG_LOADER_MAX_BYTES`: inflated size limit
    pub fn from_env() -> LoadResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`LoaderConfig::from_env`] with an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> LoadResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(mode) = lookup("DOG_LOADER_MODE") {
            config.mode = ExecutionMode::parse(&mode, lookup("DOG_LOADER_DEV_ORIGIN"))?;
            config.mode.require_origin()?;
        }

        if let Some(secs) = lookup("DOG_LOADER_TIMEOUT_SECS") {
            let secs: u64 = secs
                .trim()
                .parse()
                .map_err(|_| LoadError::invalid(format!("DOG_LOADER_TIMEOUT_SECS: {secs}")))?;
            config.request_timeout = (secs > 0).then(|| Duration::from_secs(secs));
        }

        if let Some(bytes) = lookup("DOG_LOADER_MAX_BYTES") {
            config.max_decompressed_bytes = bytes
                .trim()
                .parse()
                .map_err(|_| LoadError::invalid(format!("DOG_LOADER_MAX_BYTES: {bytes}")))?;
        }

        Ok(config)
    }

    /// Set execution mode
    pub fn with_mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = mode;
        self
    }

    /// Route `genomeark/` sources through the dev proxy at `origin`
    pub fn development<S: Into<String>>(self, origin: S) -> Self {
        self.with_mode(ExecutionMode::Development {
            origin: origin.into(),
        })
    }

    /// Set content type for decompressed objects
    pub fn with_content_type<S: Into<String>>(mut self, content_type: S) -> Self {
        self.content_type = content_type.into();
        self
    }

    /// Set inflated size limit
    pub fn with_max_decompressed_bytes(mut self, bytes: u64) -> Self {
        self.max_decompressed_bytes = bytes;
        self
    }

    /// Set request timeout
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Disable the request timeout
    pub fn without_request_timeout(mut self) -> Self {
        self.request_timeout = None;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = LoaderConfig::default();
        assert_eq!(config.mode, ExecutionMode::Production);
        assert_eq!(config.content_type, "image/png");
        assert_eq!(config.request_timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_from_lookup_development() {
        let config = LoaderConfig::from_lookup(lookup_from(&[
            ("DOG_LOADER_MODE", "development"),
            ("DOG_LOADER_DEV_ORIGIN", "http://localhost:3000"),
            ("DOG_LOADER_TIMEOUT_SECS", "0"),
            ("DOG_LOADER_MAX_BYTES", "1024"),
        ]))
        .unwrap();

        assert_eq!(
            config.mode,
            ExecutionMode::Development {
                origin: "http://localhost:3000".to_string()
            }
        );
        assert_eq!(config.request_timeout, None);
        assert_eq!(config.max_decompressed_bytes, 1024);
    }

    #[test]
    fn test_from_lookup_rejects_garbage() {
        let result = LoaderConfig::from_lookup(lookup_from(&[("DOG_LOADER_MODE", "staging")]));
        assert!(matches!(result, Err(LoadError::Invalid { .. })));

        let result = LoaderConfig::from_lookup(lookup_from(&[("DOG_LOADER_MAX_BYTES", "lots")]));
        assert!(matches!(result, Err(LoadError::Invalid { .. })));
    }

    #[test]
    fn test_from_lookup_development_requires_origin() {
        let result = LoaderConfig::from_lookup(lookup_from(&[("DOG_LOADER_MODE", "development")]));
        let err = result.unwrap_err();
        assert!(matches!(err, LoadError::Invalid { .. }));
        assert!(err.to_string().contains("DOG_LOADER_DEV_ORIGIN"));

        let result = LoaderConfig::from_lookup(lookup_from(&[
            ("DOG_LOADER_MODE", "dev"),
            ("DOG_LOADER_DEV_ORIGIN", "  "),
        ]));
        assert!(matches!(result, Err(LoadError::Invalid { .. })));

        // Production never needs an origin
        assert!(ExecutionMode::Production.require_origin().is_ok());
    }

    #[test]
    fn test_mode_rewrite() {
        let url = "https://s3.amazonaws.com/genomeark/species/contact.png.gz";
        assert_eq!(ExecutionMode::Production.rewrite().rewrite(url), url);

        let dev = ExecutionMode::Development {
            origin: String::new(),
        };
        assert_eq!(
            dev.rewrite().rewrite(url),
            "/dev-proxy/genomeark/species/contact.png.gz"
        );
    }
}

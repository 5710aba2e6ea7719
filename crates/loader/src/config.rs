use crate::error::{LoadError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use wsmeta_location::NamingStrategy;
use std::sync::Arc;
use wsmeta_transport::{
    EndpointResolver, HttpTransport, ResolverOptions, TransportFault, DEFAULT_MAX_DOCUMENT_BYTES,
};

/// Environment variable naming a configuration file.
pub const CONFIG_ENV: &str = "WSMETA_CONFIG";

/// Engine settings, read from TOML. Every field has a default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    pub poll_interval_ms: u64,
    pub user_agent: String,
    pub max_document_bytes: usize,
    /// Directory holding previously saved documents; searched before
    /// downloading imports of remote documents.
    pub local_cache_dir: Option<PathBuf>,
    pub naming: NamingStrategy,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 100,
            user_agent: format!("wsmeta/{}", env!("CARGO_PKG_VERSION")),
            max_document_bytes: DEFAULT_MAX_DOCUMENT_BYTES,
            local_cache_dir: None,
            naming: NamingStrategy::ByNamespace,
        }
    }
}

impl ResolverConfig {
    /// Load from `explicit`, else from the file named by `WSMETA_CONFIG`,
    /// else fall back to defaults.
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        match std::env::var_os(CONFIG_ENV) {
            Some(path) if !path.is_empty() => Self::from_file(Path::new(&path)),
            _ => Ok(Self::default()),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml(&raw).map_err(|message| LoadError::Config {
            path: path.to_path_buf(),
            message,
        })?;
        log::debug!("loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn from_toml(raw: &str) -> std::result::Result<Self, String> {
        toml::from_str(raw).map_err(|err| err.to_string())
    }

    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    #[must_use]
    pub fn resolver_options(&self) -> ResolverOptions {
        ResolverOptions {
            poll_interval: self.poll_interval(),
            max_document_bytes: self.max_document_bytes,
        }
    }

    /// Resolver over an HTTP transport without a request timeout; callers
    /// cancel instead. Providers are added on the returned value.
    pub fn endpoint_resolver(&self) -> std::result::Result<EndpointResolver, TransportFault> {
        let transport = HttpTransport::new(&self.user_agent, None)?;
        Ok(EndpointResolver::new(Arc::new(transport)).with_options(self.resolver_options()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn missing_fields_take_defaults() {
        let config = ResolverConfig::from_toml("naming = \"by_source_file_name\"").unwrap();
        assert_eq!(config.naming, NamingStrategy::BySourceFileName);
        assert_eq!(config.poll_interval_ms, 100);
        assert_eq!(config.max_document_bytes, 16 * 1024 * 1024);
        assert_eq!(config.local_cache_dir, None);
    }

    #[test]
    fn unknown_naming_is_rejected() {
        assert!(ResolverConfig::from_toml("naming = \"random\"").is_err());
    }

    #[test]
    fn explicit_file_is_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wsmeta.toml");
        std::fs::write(
            &path,
            "poll_interval_ms = 25\nlocal_cache_dir = \"/var/cache/wsmeta\"\n",
        )
        .unwrap();

        let config = ResolverConfig::discover(Some(&path)).unwrap();
        assert_eq!(config.poll_interval(), Duration::from_millis(25));
        assert_eq!(
            config.local_cache_dir,
            Some(PathBuf::from("/var/cache/wsmeta"))
        );
    }

    #[test]
    fn resolver_takes_configured_options() {
        let config = ResolverConfig::from_toml("poll_interval_ms = 0\nmax_document_bytes = 1024")
            .unwrap();
        let resolver = config.endpoint_resolver().unwrap();
        assert_eq!(
            resolver.options(),
            ResolverOptions {
                poll_interval: Duration::from_millis(1),
                max_document_bytes: 1024,
            }
        );
    }

    #[test]
    fn unreadable_file_is_an_error() {
        let err = ResolverConfig::from_file(Path::new("/nonexistent/wsmeta.toml")).unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
    }
}

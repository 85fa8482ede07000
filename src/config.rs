//! Client configuration: proxy endpoint, connect timeout and cache limits.

use std::path::{Path, PathBuf};

use crate::defaults;
use crate::time::Milliseconds;

#[derive(Clone, Debug)]
pub struct Config {
    proxy_host: String,
    proxy_port: u16,
    timeout: Milliseconds,
    cache_location: Option<PathBuf>,
    cache_max_size: u64,
}

impl Config {
    pub fn new(proxy_host: &str, proxy_port: u16) -> Self {
        Config {
            proxy_host: proxy_host.to_string(),
            proxy_port,
            timeout: Milliseconds::new(defaults::DEFAULT_TIMEOUT_MILLISECONDS),
            cache_location: None,
            cache_max_size: defaults::DEFAULT_CACHE_MAX_SIZE_BYTES,
        }
    }

    pub fn set_timeout(&mut self, timeout: Milliseconds) {
        self.timeout = timeout;
    }

    pub fn set_cache(&mut self, location: impl Into<PathBuf>, max_size: u64) {
        self.cache_location = Some(location.into());
        self.cache_max_size = max_size;
    }

    pub fn proxy_host(&self) -> &str {
        &self.proxy_host
    }

    pub fn proxy_port(&self) -> u16 {
        self.proxy_port
    }

    pub fn timeout(&self) -> Milliseconds {
        self.timeout
    }

    pub fn cache_location(&self) -> Option<&Path> {
        self.cache_location.as_deref()
    }

    pub fn cache_max_size(&self) -> u64 {
        self.cache_max_size
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::new("127.0.0.1", defaults::DEFAULT_PROXY_PORT);
        assert_eq!("127.0.0.1", config.proxy_host());
        assert_eq!(9050, config.proxy_port());
        assert_eq!(Milliseconds::new(60_000), config.timeout());
        assert_eq!(None, config.cache_location());
        assert_eq!(defaults::DEFAULT_CACHE_MAX_SIZE_BYTES, config.cache_max_size());
    }

    #[test]
    fn test_set_cache() {
        let mut config = Config::new("127.0.0.1", 9050);
        config.set_cache("/var/cache/torhttp", 1024);
        assert_eq!(
            Some(Path::new("/var/cache/torhttp")),
            config.cache_location()
        );
        assert_eq!(1024, config.cache_max_size());
    }

    #[test]
    fn test_set_timeout() {
        let mut config = Config::new("127.0.0.1", 9050);
        config.set_timeout(Milliseconds::new(5000));
        assert_eq!(Milliseconds::new(5000), config.timeout());
    }
}

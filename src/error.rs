use std::fmt::Display;

use anyhow::{anyhow, Context, Result};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum THError {
    #[error("Proxy connect error: {0}")]
    Connect(String),
    #[error("SOCKS4a connect failed, got {status:#04x} - {result:#04x}, but expected 0x00 - 0x5a")]
    Handshake { status: u8, result: u8 },
    #[error("TLS error: {0}")]
    Tls(String),
    #[error("Malformed HTTP response: {0}")]
    MalformedResponse(String),
    #[error("Insecure request: {0}")]
    SecurityPolicy(String),
    #[error("Cache I/O error: {0}")]
    CacheIO(String),
    #[error("Cache location does not exist: {0}")]
    CacheLocationDoesNotExist(String),
    #[error("Cache location is not a directory: {0}")]
    CacheLocationIsNotADirectory(String),
    #[error("Cache location is not writeable: {0}")]
    CacheLocationIsNotWriteable(String),
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
}

pub trait AddContext<T, E>: Context<T, E> {
    fn err_context<C: Display + Send + Sync + 'static>(self, msg: C) -> Result<T, anyhow::Error>
    where
        Self: Sized,
    {
        self.with_context(|| msg.to_string())
    }
}

impl<U, T, E> AddContext<T, E> for U where U: Context<T, E> {}

pub fn gen<T: AsRef<str>>(msg: T) -> anyhow::Error {
    anyhow!(msg.as_ref().to_string())
}

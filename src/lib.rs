pub mod cache;
pub mod codec;
pub mod config;
pub mod defaults;
pub mod error;
pub mod form;
pub mod http;
pub mod io;
pub mod logging;
pub mod proxy;
pub mod time;
pub mod tls;

pub type Result<T> = anyhow::Result<T>;
pub type Error = anyhow::Error;

#[macro_use]
extern crate log;

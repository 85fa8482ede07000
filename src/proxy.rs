//! SOCKS4a proxy handshake. The client hands the proxy a hostname rather
//! than a resolved address, so name resolution stays inside the anonymity
//! network.

use std::io::{Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use crate::config::Config;
use crate::error::{AddContext, THError};
use crate::io::{ProxyConnector, Stream};
use crate::time::Milliseconds;
use crate::Result;

const NULL_BYTE: u8 = 0x00;
const SOCKS4A_VERSION: u8 = 0x04;
const STREAM_CONNECTION: u8 = 0x01;
const REQUEST_GRANTED: u8 = 0x5a;

// Invalid IPv4 placeholder 0.0.0.1. Signals the proxy to resolve the
// hostname itself.
const UNRESOLVED_IP: [u8; 4] = [0x00, 0x00, 0x00, 0x01];

pub struct Socks4aProxy {
    host: String,
    port: u16,
}

impl Socks4aProxy {
    pub fn new(host: &str, port: u16) -> Self {
        Socks4aProxy {
            host: host.to_string(),
            port,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Socks4aProxy::new(config.proxy_host(), config.proxy_port())
    }
}

impl ProxyConnector for Socks4aProxy {
    fn connect(
        &self,
        destination_host: &str,
        destination_port: u16,
        timeout: Milliseconds,
    ) -> Result<Box<dyn Stream>> {
        let address = (self.host.as_str(), self.port)
            .to_socket_addrs()
            .map_err(|err| {
                THError::Connect(format!(
                    "cannot resolve proxy address {}:{}: {}",
                    self.host, self.port, err
                ))
            })?
            .next()
            .ok_or_else(|| {
                THError::Connect(format!(
                    "proxy address {}:{} did not resolve",
                    self.host, self.port
                ))
            })?;
        let mut socket = TcpStream::connect_timeout(&address, Duration::from_millis(*timeout))
            .map_err(|err| {
                THError::Connect(format!(
                    "cannot connect to proxy {}:{}: {}",
                    self.host, self.port, err
                ))
            })?;
        // a failed handshake drops, and therefore closes, the socket
        handshake(&mut socket, destination_host, destination_port)?;
        Ok(Box::new(socket))
    }
}

/// Performs the SOCKS4a connect handshake on a freshly connected stream.
/// On success the stream carries application data only.
pub fn handshake<S: Read + Write>(
    stream: &mut S,
    destination_host: &str,
    destination_port: u16,
) -> Result<()> {
    init(stream, destination_host, destination_port)?;
    verify(stream)
}

fn init<S: Write>(stream: &mut S, destination_host: &str, destination_port: u16) -> Result<()> {
    // handshake according to https://en.wikipedia.org/wiki/SOCKS
    let mut request = Vec::with_capacity(10 + destination_host.len());
    request.push(SOCKS4A_VERSION);
    request.push(STREAM_CONNECTION);
    request.extend_from_slice(&destination_port.to_be_bytes());
    request.extend_from_slice(&UNRESOLVED_IP);
    // user id not applicable
    request.push(NULL_BYTE);
    request.extend_from_slice(destination_host.as_bytes());
    request.push(NULL_BYTE);
    stream
        .write_all(&request)
        .err_context("sending SOCKS4a connect request")?;
    stream
        .flush()
        .err_context("sending SOCKS4a connect request")?;
    Ok(())
}

fn verify<S: Read>(stream: &mut S) -> Result<()> {
    let mut reply = [0u8; 2];
    stream
        .read_exact(&mut reply)
        .err_context("reading SOCKS4a reply")?;
    let [status, result] = reply;
    if status != NULL_BYTE || result != REQUEST_GRANTED {
        return Err(THError::Handshake { status, result }.into());
    }
    // drain the unused port and address fields so the stream produces
    // application data only
    let mut remainder = [0u8; 6];
    stream
        .read_exact(&mut remainder)
        .err_context("reading SOCKS4a reply")?;
    Ok(())
}

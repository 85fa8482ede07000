use std::io::{Read, Write};

use crate::codec;
use crate::http::Headers;
use crate::time::Milliseconds;
use crate::Result;

/// A byte stream carrying application data once the proxy handshake and the
/// optional TLS upgrade have completed.
pub trait Stream: Read + Write + Send {}

impl<T: Read + Write + Send> Stream for T {}

/// A trait for connectors that produce application-ready byte streams to a
/// destination reached through a proxy. Implementors perform whatever wire
/// handshake their proxy protocol requires before handing the stream over.
/// Clients can go through a real SOCKS proxy or script the stream for
/// testing purposes.
pub trait ProxyConnector {
    fn connect(
        &self,
        destination_host: &str,
        destination_port: u16,
        timeout: Milliseconds,
    ) -> Result<Box<dyn Stream>>;
}

/// A decoded HTTP/1.1 response. The body is kept as raw bytes; header text
/// is Latin-1 decoded.
#[derive(Clone, Debug, PartialEq)]
pub struct Response {
    pub http_version: String,
    pub status: i32,
    pub status_text: String,
    pub headers: Headers,
    pub body: Vec<u8>,
}

impl Response {
    pub fn new(
        http_version: &str,
        status: i32,
        status_text: &str,
        headers: Headers,
        body: Vec<u8>,
    ) -> Self {
        Response {
            http_version: http_version.to_string(),
            status,
            status_text: status_text.to_string(),
            headers,
            body,
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    /// Serialized byte size of the response: status line, headers, the blank
    /// line ending the metadata, and the raw body. Used for cache space
    /// accounting only, never for I/O framing.
    pub fn length(&self) -> u64 {
        let status_line = format!("{} {} {}", self.http_version, self.status, self.status_text);
        let mut length = codec::latin1_bytes(&status_line).len() as u64 + 2;
        for (name, value) in self.headers.iter() {
            length +=
                codec::latin1_bytes(name).len() as u64 + 2 + codec::latin1_bytes(value).len() as u64 + 2;
        }
        // CRLF after headers finish
        length += 2;
        length + self.body.len() as u64
    }

    /// Body decoded as text. The charset hinted by `Content-type` decides:
    /// ISO-8859-1 decodes as Latin-1, everything else (including a missing
    /// header) as lossy UTF-8.
    pub fn text(&self) -> String {
        match self.header("content-type") {
            Some(content_type) if content_type.to_lowercase().contains("iso-8859-1") => {
                codec::latin1_string(&self.body)
            }
            _ => String::from_utf8_lossy(&self.body).into_owned(),
        }
    }
}

use std::fmt::{self, Display, Formatter};

use url::Url;

use crate::cache::Cache;
use crate::codec;
use crate::defaults;
use crate::error::THError;
use crate::form::RequestBody;
use crate::io::{ProxyConnector, Response, Stream};
use crate::time::Milliseconds;
use crate::tls;
use crate::{log_debug, log_warn};
use crate::Result;

pub struct Client<C, P> {
    cache: C,
    connector: P,
}

impl<C, P> Client<C, P> {
    pub fn new(cache: C, connector: P) -> Self {
        Client { cache, connector }
    }
}

impl<C: Cache, P: ProxyConnector> Client<C, P> {
    /// Executes a request: cache lookup first; on a miss, connect through
    /// the proxy, write the request, read the response until the peer closes
    /// the stream and offer the result to the cache. One socket per request,
    /// no reuse.
    pub fn run(&self, request: &Request) -> Result<Response> {
        let fingerprint = request.fingerprint();
        match self.cache.lookup(&fingerprint) {
            Ok(Some(response)) => {
                log_debug!("cache hit for {}", fingerprint);
                return Ok(response);
            }
            Ok(None) => {}
            // a broken cache must not fail the request
            Err(err) => log_warn!("cache lookup for {} failed: {}", fingerprint, err),
        }
        let mut stream = self.connect(request)?;
        codec::write_request(request, &mut stream)?;
        let response = codec::read_response(&mut stream)?;
        drop(stream);
        if should_cache(&response) {
            if let Err(err) = self.cache.offer(&fingerprint, &response) {
                log_warn!("failed to cache response for {}: {}", request.url(), err);
            }
        }
        Ok(response)
    }

    fn connect(&self, request: &Request) -> Result<Box<dyn Stream>> {
        let stream = self
            .connector
            .connect(request.host(), request.port(), request.timeout())?;
        if request.port() == defaults::TLS_PORT {
            return tls::upgrade(stream, request.host());
        }
        Ok(stream)
    }
}

/// A response is offered to the cache only when the origin marked it
/// cacheable. The cache re-checks admission (max-age, size budget, and a
/// concurrent insert for the same fingerprint) under its own lock.
fn should_cache(response: &Response) -> bool {
    match response.header("cache-control") {
        Some(value) => {
            let value = value.to_lowercase();
            value.starts_with("public") || value.starts_with("private")
        }
        None => false,
    }
}

/// Ordered collection of header name/value pairs. Names are matched
/// case-insensitively on lookup; insertion order is preserved on the wire.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Headers(Vec<(String, String)>);

impl Headers {
    pub fn new() -> Self {
        Headers(Vec::new())
    }

    pub fn add<K: Into<String>, V: Into<String>>(&mut self, name: K, value: V) {
        self.0.push((name.into(), value.into()));
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(candidate, _)| candidate.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, (String, String)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum Method {
    #[default]
    GET,
    POST,
    PUT,
    DELETE,
}

impl Display for Method {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let method = match self {
            Method::GET => "GET",
            Method::POST => "POST",
            Method::PUT => "PUT",
            Method::DELETE => "DELETE",
        };
        write!(f, "{}", method)
    }
}

pub struct Request {
    url: Url,
    host: String,
    port: u16,
    method: Method,
    headers: Headers,
    body: Option<Box<dyn RequestBody + Send + Sync>>,
    timeout: Milliseconds,
}

impl std::fmt::Debug for Request {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Request")
            .field("url", &self.url)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("method", &self.method)
            .field("headers", &self.headers)
            .field("body", &self.body.as_ref().map(|_| "<body>"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Request {
    /// Builds a request for `url`. Plaintext HTTP to destinations outside
    /// the anonymity network is rejected here, before any connection is
    /// attempted: exit relays could otherwise observe or rewrite the
    /// exchange.
    pub fn new(url: &str, method: Method) -> Result<Self> {
        let url = Url::parse(url)
            .map_err(|err| THError::ConfigurationError(format!("invalid url {url}: {err}")))?;
        let scheme = url.scheme().to_lowercase();
        if scheme != "http" && scheme != "https" {
            return Err(
                THError::ConfigurationError(format!("unsupported url scheme {scheme}")).into(),
            );
        }
        let host = url
            .host_str()
            .ok_or_else(|| THError::ConfigurationError(format!("url {url} has no host")))?
            .to_string();
        if scheme == "http" && !host.to_lowercase().ends_with(".onion") {
            return Err(THError::SecurityPolicy(format!(
                "{host} is not hosted over HTTPS and is outside of the Tor network. \
                 It is vulnerable to interception and/or manipulation. See \
                 https://www.torproject.org/docs/faq.html.en#CanExitNodesEavesdrop"
            ))
            .into());
        }
        let port = url.port_or_known_default().unwrap_or(defaults::HTTP_PORT);
        Ok(Request {
            url,
            host,
            port,
            method,
            headers: Headers::new(),
            body: None,
            timeout: Milliseconds::new(defaults::DEFAULT_TIMEOUT_MILLISECONDS),
        })
    }

    pub fn with_body<B: RequestBody + Send + Sync + 'static>(mut self, body: B) -> Self {
        self.body = Some(Box::new(body));
        self
    }

    pub fn set_header(&mut self, name: &str, value: &str) {
        self.headers.add(name, value);
    }

    pub fn set_timeout(&mut self, timeout: Milliseconds) {
        self.timeout = timeout;
    }

    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn body(&self) -> Option<&(dyn RequestBody + Send + Sync)> {
        self.body.as_deref()
    }

    pub fn timeout(&self) -> Milliseconds {
        self.timeout
    }

    /// Request target as sent on the request line: path plus query.
    pub fn target(&self) -> String {
        match self.url.query() {
            Some(query) => format!("{}?{}", self.url.path(), query),
            None => self.url.path().to_string(),
        }
    }

    /// Cache key: HTTP method concatenated with the full URL.
    pub fn fingerprint(&self) -> String {
        format!("{}{}", self.method, self.url)
    }
}

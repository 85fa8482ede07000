// Tor's default SocksPort.
pub const DEFAULT_PROXY_PORT: u16 = 9050;

// Connect timeout for reaching the proxy. Building a circuit through the
// network can take a while, so this is deliberately generous.
pub const DEFAULT_TIMEOUT_MILLISECONDS: u64 = 60_000;

pub const HTTP_PORT: u16 = 80;

// Destinations on this port get a TLS client handshake layered on top of the
// proxy stream.
pub const TLS_PORT: u16 = 443;

// Cache budget applied when the caller configures a cache directory without
// an explicit size.
pub const DEFAULT_CACHE_MAX_SIZE_BYTES: u64 = 5 * 1024 * 1024;

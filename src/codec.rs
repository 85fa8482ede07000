//! Byte-level HTTP/1.1 framing.
//!
//! Requests are written and responses parsed manually instead of delegating
//! to a platform HTTP stack. The only framing relied upon is
//! `Connection: close`: a response is everything the peer sends until it
//! closes the stream, so there is no Content-Length aware early stop and no
//! chunked transfer decoding.

use std::io::{Read, Write};

use crate::error::{AddContext, THError};
use crate::http::{Headers, Request};
use crate::io::Response;
use crate::Result;

pub const CRLF: &str = "\r\n";

const CARRIAGE_RETURN: u8 = 0x0d;
const LINE_FEED: u8 = 0x0a;

/// Encodes header text as single-byte Latin-1 octets as HTTP/1.1 wire
/// conventions require. Code points beyond U+00FF cannot be represented and
/// are replaced with `?`.
pub fn latin1_bytes(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| if (c as u32) <= 0xff { c as u8 } else { b'?' })
        .collect()
}

/// Decodes single-byte Latin-1 octets back into text.
pub fn latin1_string(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

/// Writes the request to the stream: request line, the forced
/// `Connection: close` and `Host` headers, caller headers in insertion
/// order, and the body with its `Content-type`/`Content-length` headers when
/// one is present.
pub fn write_request<W: Write>(request: &Request, writer: &mut W) -> Result<()> {
    let mut target = request.target();
    if target.is_empty() {
        target = "/".to_string();
    }
    writer.write_all(&latin1_bytes(&format!(
        "{} {} HTTP/1.1{}",
        request.method(),
        target,
        CRLF
    )))?;
    // explicitly avoid keep-alive (not supported)
    writer.write_all(&latin1_bytes(&format!("Connection: close{CRLF}")))?;
    writer.write_all(&latin1_bytes(&format!("Host: {}{}", request.host(), CRLF)))?;
    for (name, value) in request.headers().iter() {
        writer.write_all(&latin1_bytes(&format!("{name}: {value}{CRLF}")))?;
    }
    if let Some(body) = request.body() {
        let payload = body.encode();
        writer.write_all(&latin1_bytes(&format!(
            "Content-type: {}{}",
            body.content_type(),
            CRLF
        )))?;
        writer.write_all(&latin1_bytes(&format!(
            "Content-length: {}{}",
            payload.len(),
            CRLF
        )))?;
        writer.write_all(&latin1_bytes(CRLF))?;
        writer.write_all(&payload)?;
    } else {
        writer.write_all(&latin1_bytes(CRLF))?;
    }
    writer.flush()?;
    Ok(())
}

/// Reads the peer's bytes until it closes the stream and decodes them into a
/// `Response`.
pub fn read_response<R: Read>(reader: &mut R) -> Result<Response> {
    let mut raw = Vec::with_capacity(10 * 1024);
    reader
        .read_to_end(&mut raw)
        .err_context("reading HTTP response")?;
    decode_response(&raw)
}

/// Decodes a fully-buffered response. The metadata/body boundary is the
/// first CRLFCRLF; everything after it is body bytes, copied verbatim.
pub fn decode_response(raw: &[u8]) -> Result<Response> {
    let boundary = find_metadata_boundary(raw).ok_or_else(|| {
        THError::MalformedResponse(
            "no CRLFCRLF metadata boundary before end of stream".to_string(),
        )
    })?;
    let metadata = latin1_string(&raw[..boundary]);
    let body = raw[boundary + 4..].to_vec();

    let mut lines = metadata.split(CRLF);
    let status_line = lines.next().unwrap_or_default();
    let (http_version, status, status_text) = parse_status_line(status_line)?;
    let mut headers = Headers::new();
    for line in lines {
        let (name, value) = line.split_once(": ").ok_or_else(|| {
            THError::MalformedResponse(format!("header line without name/value separator: {line}"))
        })?;
        headers.add(name, value);
    }
    Ok(Response::new(&http_version, status, &status_text, headers, body))
}

/// Serializes a decoded response back to its wire form: status line,
/// headers, blank line, raw body. Cached payload files use exactly this
/// layout so a cache hit decodes through the same path as a live response.
pub fn write_response<W: Write>(response: &Response, writer: &mut W) -> Result<()> {
    writer.write_all(&latin1_bytes(&format!(
        "{} {} {}{}",
        response.http_version, response.status, response.status_text, CRLF
    )))?;
    for (name, value) in response.headers.iter() {
        writer.write_all(&latin1_bytes(&format!("{name}: {value}{CRLF}")))?;
    }
    writer.write_all(&latin1_bytes(CRLF))?;
    writer.write_all(&response.body)?;
    writer.flush()?;
    Ok(())
}

fn find_metadata_boundary(raw: &[u8]) -> Option<usize> {
    raw.windows(4)
        .position(|window| window == [CARRIAGE_RETURN, LINE_FEED, CARRIAGE_RETURN, LINE_FEED])
}

fn parse_status_line(line: &str) -> Result<(String, i32, String)> {
    let mut parts = line.splitn(3, ' ');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(version), Some(code), Some(text)) => {
            let status = code.parse::<i32>().map_err(|err| {
                THError::MalformedResponse(format!("status code {code} is not numeric: {err}"))
            })?;
            Ok((version.to_string(), status, text.to_string()))
        }
        _ => Err(THError::MalformedResponse(format!(
            "status line has fewer than 3 space-separated tokens: {line}"
        ))
        .into()),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    use crate::form::UrlEncodedForm;
    use crate::http::Method;

    fn request(url: &str, method: Method) -> Request {
        Request::new(url, method).unwrap()
    }

    #[test]
    fn test_write_request_get_no_body() {
        let mut request = request("http://duskgytldkxiuqc6.onion/comms/index.html", Method::GET);
        request.set_header("Accept", "text/html");
        let mut written = Vec::new();
        write_request(&request, &mut written).unwrap();
        let expected = "GET /comms/index.html HTTP/1.1\r\n\
                        Connection: close\r\n\
                        Host: duskgytldkxiuqc6.onion\r\n\
                        Accept: text/html\r\n\
                        \r\n";
        assert_eq!(expected.as_bytes(), &written[..]);
    }

    #[test]
    fn test_write_request_root_path_defaults_to_slash() {
        let request = request("http://duskgytldkxiuqc6.onion", Method::GET);
        let mut written = Vec::new();
        write_request(&request, &mut written).unwrap();
        assert!(written.starts_with(b"GET / HTTP/1.1\r\n"));
    }

    #[test]
    fn test_write_request_keeps_query_in_target() {
        let request = request("http://duskgytldkxiuqc6.onion/search?q=tor&page=2", Method::GET);
        let mut written = Vec::new();
        write_request(&request, &mut written).unwrap();
        assert!(written.starts_with(b"GET /search?q=tor&page=2 HTTP/1.1\r\n"));
    }

    #[test]
    fn test_write_request_headers_keep_insertion_order() {
        let mut request = request("http://duskgytldkxiuqc6.onion/", Method::GET);
        request.set_header("X-Second", "2");
        request.set_header("X-First", "1");
        let mut written = Vec::new();
        write_request(&request, &mut written).unwrap();
        let text = latin1_string(&written);
        let second = text.find("X-Second").unwrap();
        let first = text.find("X-First").unwrap();
        assert!(second < first);
    }

    #[test]
    fn test_write_request_with_form_body() {
        let mut form = UrlEncodedForm::new();
        form.add("q", "tor");
        let request = request("http://duskgytldkxiuqc6.onion/search", Method::POST).with_body(form);
        let mut written = Vec::new();
        write_request(&request, &mut written).unwrap();
        let text = latin1_string(&written);
        assert!(text.starts_with("POST /search HTTP/1.1\r\n"));
        assert!(text.contains("Content-type: application/x-www-form-urlencoded; charset=UTF-8\r\n"));
        assert!(text.contains("Content-length: 5\r\n"));
        assert!(text.ends_with("\r\n\r\nq=tor"));
    }

    #[test]
    fn test_write_request_latin1_header_value() {
        let mut request = request("http://duskgytldkxiuqc6.onion/", Method::GET);
        request.set_header("X-Accent", "café");
        let mut written = Vec::new();
        write_request(&request, &mut written).unwrap();
        // é is a single 0xe9 octet on the wire, not the two-byte UTF-8 form
        let needle: &[u8] = &[b'c', b'a', b'f', 0xe9, 0x0d, 0x0a];
        assert!(written.windows(needle.len()).any(|window| window == needle));
    }

    #[test]
    fn test_decode_response_with_headers_and_body() {
        let raw = b"HTTP/1.1 200 OK\r\n\
                    Content-type: text/plain\r\n\
                    Cache-Control: public, max-age=60\r\n\
                    \r\n\
                    hello onion";
        let response = decode_response(raw).unwrap();
        assert_eq!("HTTP/1.1", response.http_version);
        assert_eq!(200, response.status);
        assert_eq!("OK", response.status_text);
        assert_eq!(2, response.headers.len());
        assert_eq!(Some("text/plain"), response.header("content-type"));
        assert_eq!(b"hello onion".to_vec(), response.body);
    }

    #[test]
    fn test_decode_response_zero_headers() {
        let response = decode_response(b"HTTP/1.1 204 No Content\r\n\r\n").unwrap();
        assert_eq!(204, response.status);
        assert_eq!("No Content", response.status_text);
        assert!(response.headers.is_empty());
        assert!(response.body.is_empty());
    }

    #[test]
    fn test_decode_response_reason_phrase_keeps_spaces() {
        let response = decode_response(b"HTTP/1.1 500 Internal Server Error\r\n\r\n").unwrap();
        assert_eq!("Internal Server Error", response.status_text);
    }

    #[test]
    fn test_decode_response_missing_boundary_is_error() {
        let err = decode_response(b"HTTP/1.1 200 OK\r\nContent-type: text/plain\r\n").unwrap_err();
        match err.downcast_ref::<THError>() {
            Some(THError::MalformedResponse(_)) => (),
            _ => panic!("Expected MalformedResponse error"),
        }
    }

    #[test]
    fn test_decode_response_empty_stream_is_error() {
        assert!(decode_response(b"").is_err());
    }

    #[test]
    fn test_decode_response_non_numeric_status_is_error() {
        let err = decode_response(b"HTTP/1.1 abc OK\r\n\r\n").unwrap_err();
        match err.downcast_ref::<THError>() {
            Some(THError::MalformedResponse(msg)) => assert!(msg.contains("abc")),
            _ => panic!("Expected MalformedResponse error"),
        }
    }

    #[test]
    fn test_decode_response_short_status_line_is_error() {
        let err = decode_response(b"HTTP/1.1 200\r\n\r\n").unwrap_err();
        match err.downcast_ref::<THError>() {
            Some(THError::MalformedResponse(_)) => (),
            _ => panic!("Expected MalformedResponse error"),
        }
    }

    #[test]
    fn test_decode_response_header_without_separator_is_error() {
        let err = decode_response(b"HTTP/1.1 200 OK\r\nbroken-header\r\n\r\n").unwrap_err();
        match err.downcast_ref::<THError>() {
            Some(THError::MalformedResponse(msg)) => assert!(msg.contains("broken-header")),
            _ => panic!("Expected MalformedResponse error"),
        }
    }

    #[test]
    fn test_response_round_trip_preserves_headers_in_order() {
        let mut headers = Headers::new();
        headers.add("Content-Type", "text/html");
        headers.add("X-Zebra", "last");
        headers.add("Cache-Control", "private, max-age=120");
        let response = Response::new("HTTP/1.1", 200, "OK", headers, b"<html></html>".to_vec());

        let mut written = Vec::new();
        write_response(&response, &mut written).unwrap();
        let decoded = decode_response(&written).unwrap();

        assert_eq!(response, decoded);
        let names: Vec<&str> = decoded
            .headers
            .iter()
            .map(|(name, _)| name.as_str())
            .collect();
        assert_eq!(vec!["Content-Type", "X-Zebra", "Cache-Control"], names);
        // case-insensitively addressable after the round trip
        assert_eq!(Some("private, max-age=120"), decoded.header("cache-control"));
    }

    #[test]
    fn test_write_response_length_matches_accounting() {
        let mut headers = Headers::new();
        headers.add("Content-type", "application/json");
        let response = Response::new("HTTP/1.1", 200, "OK", headers, b"{}".to_vec());
        let mut written = Vec::new();
        write_response(&response, &mut written).unwrap();
        assert_eq!(response.length(), written.len() as u64);
    }

    #[test]
    fn test_read_response_consumes_reader_until_eof() {
        let raw = b"HTTP/1.1 200 OK\r\n\r\nbody bytes".to_vec();
        let mut reader = std::io::Cursor::new(raw);
        let response = read_response(&mut reader).unwrap();
        assert_eq!(b"body bytes".to_vec(), response.body);
    }

    #[test]
    fn test_latin1_round_trip() {
        let text = "caf\u{e9}";
        assert_eq!(text, latin1_string(&latin1_bytes(text)));
    }

    #[test]
    fn test_latin1_replaces_unmappable_code_points() {
        assert_eq!(vec![b'?'], latin1_bytes("\u{20ac}"));
    }
}

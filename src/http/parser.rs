use std::collections::HashMap;

use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};

use crate::http::request::{find_ignore_case, Method, Request};

/// Upper bound on the request line plus all header lines.
pub const MAX_HEAD_BYTES: usize = 64 * 1024;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("malformed request line: {0:?}")]
    MalformedRequestLine(String),
    #[error("stream ended before the end of the headers")]
    TruncatedHeaders,
    #[error("invalid Content-Length: {0:?}")]
    InvalidContentLength(String),
    #[error("body truncated: expected {expected} bytes, received {received}")]
    TruncatedBody { expected: usize, received: usize },
    #[error("request head exceeds {} bytes", MAX_HEAD_BYTES)]
    HeadTooLarge,
    #[error("unsupported Transfer-Encoding: {0}")]
    UnsupportedTransferEncoding(String),
    #[error("i/o error while reading request: {0}")]
    Io(#[from] std::io::Error),
}

enum Line {
    Complete(String),
    Eof,
}

/// Reads exactly one request off a buffered stream.
///
/// Consumes the request line, the headers up to the blank line and, when
/// `Content-Length` is positive, exactly that many body bytes. Nothing past
/// the body is read, so the stream is positioned at the next request.
pub async fn read_request<R>(reader: &mut R) -> Result<Request, ParseError>
where
    R: AsyncBufRead + Unpin,
{
    let mut budget = MAX_HEAD_BYTES;

    // Request line
    let request_line = match next_line(reader, &mut budget).await? {
        Line::Complete(line) => line,
        Line::Eof => return Err(ParseError::MalformedRequestLine(String::new())),
    };

    let mut parts = request_line.split(' ');
    let (Some(method), Some(path), Some(version), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(ParseError::MalformedRequestLine(request_line.clone()));
    };

    let method = Method::from_token(method);
    let path = path.to_string();
    let version = version.to_string();

    // Headers
    let mut headers = HashMap::new();

    loop {
        let line = match next_line(reader, &mut budget).await? {
            Line::Complete(line) => line,
            Line::Eof => return Err(ParseError::TruncatedHeaders),
        };

        if line.is_empty() {
            break;
        }

        // Lines without a colon are skipped rather than rejected.
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };

        headers.insert(key.trim().to_string(), value.trim().to_string());
    }

    if let Some(encoding) = find_ignore_case(&headers, "Transfer-Encoding") {
        return Err(ParseError::UnsupportedTransferEncoding(encoding.to_string()));
    }

    // Body
    let content_length = match content_length_value(&headers)? {
        Some(v) => v
            .parse::<usize>()
            .map_err(|_| ParseError::InvalidContentLength(v.to_string()))?,
        None => 0,
    };

    let mut body = Vec::new();
    if content_length > 0 {
        // Grows with the data actually received instead of trusting the header.
        let received = (&mut *reader)
            .take(content_length as u64)
            .read_to_end(&mut body)
            .await?;

        if received < content_length {
            return Err(ParseError::TruncatedBody {
                expected: content_length,
                received,
            });
        }
    }

    Ok(Request {
        method,
        path,
        version,
        headers,
        body,
    })
}

/// Finds the `Content-Length` value under any casing of the name.
///
/// Differently cased copies of the header are separate map entries; they
/// must all agree or the request is rejected.
fn content_length_value(headers: &HashMap<String, String>) -> Result<Option<&str>, ParseError> {
    let mut values = headers
        .iter()
        .filter(|(k, _)| k.eq_ignore_ascii_case("Content-Length"))
        .map(|(_, v)| v.as_str());

    let Some(first) = values.next() else {
        return Ok(None);
    };
    if let Some(other) = values.find(|v| *v != first) {
        let mut conflicting = [first, other];
        conflicting.sort_unstable();
        return Err(ParseError::InvalidContentLength(conflicting.join(", ")));
    }
    Ok(Some(first))
}

async fn next_line<R>(reader: &mut R, budget: &mut usize) -> Result<Line, ParseError>
where
    R: AsyncBufRead + Unpin,
{
    let mut buf = Vec::new();
    let n = (&mut *reader)
        .take(*budget as u64)
        .read_until(b'\n', &mut buf)
        .await?;
    *budget -= n;

    if buf.last() != Some(&b'\n') {
        if *budget == 0 {
            return Err(ParseError::HeadTooLarge);
        }
        return Ok(Line::Eof);
    }

    Ok(Line::Complete(String::from_utf8_lossy(&buf).trim().to_string()))
}

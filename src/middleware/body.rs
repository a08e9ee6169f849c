//! Body classification and rendering.
//!
//! Turns raw body bytes into text segments that are safe to log:
//!
//! - multipart bodies are split per part, binary parts keep their headers
//!   but lose their payload to [`BINARY_PLACEHOLDER`];
//! - urlencoded bodies are percent-decoded;
//! - everything else is decoded as UTF-8 whatever its content type, and
//!   becomes [`BINARY_PLACEHOLDER`] when that fails;
//! - everything is cut to the configured maximum length.
//!
//! Rendering never fails. The worst outcome is a placeholder.

use std::borrow::Cow;
use std::sync::LazyLock;

use percent_encoding::percent_decode;
use regex::Regex;

pub const BINARY_PLACEHOLDER: &str = "(binary data)";
pub const MULTIPART_PLACEHOLDER: &str = "(multipart/form)";
pub const STREAM_PLACEHOLDER: &str = "(data_stream)";
pub const TRUNCATED_NOTICE: &str = "(truncated)";

/// Main types whose multipart payload is replaced.
const BINARY_MAIN_TYPES: [&str; 2] = ["image", "application"];

/// Header block (group 1), main type, sub type, payload (group 4) of one
/// multipart part.
static BINARY_PART: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?si)(.+Content-Type:.*?)(\S+)/(\S+)(?:\r\n)*(.+)").expect("valid multipart regex")
});

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BodyKind {
    Plain,
    UrlEncoded,
    Multipart,
    Json,
}

impl BodyKind {
    pub fn classify(content_type: &str) -> Self {
        let essence = essence(content_type);
        match essence.split_once('/') {
            Some(("multipart", "form-data")) => Self::Multipart,
            Some(("application", "x-www-form-urlencoded")) => Self::UrlEncoded,
            Some(("application", sub)) if sub == "json" || sub.ends_with("+json") => Self::Json,
            _ => Self::Plain,
        }
    }
}

/// Text segments of a rendered body. Multipart bodies yield one segment per
/// part; everything else yields one.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct RenderedBody {
    segments: Vec<String>,
    truncated: bool,
}

impl RenderedBody {
    fn single(text: impl Into<String>, truncated: bool) -> Self {
        Self { segments: vec![text.into()], truncated }
    }

    pub fn segments(&self) -> &[String] { &self.segments }

    /// `true` when the input was longer than the maximum length.
    pub fn is_truncated(&self) -> bool { self.truncated }

    /// All segments joined, as they would read in the log.
    pub fn text(&self) -> String { self.segments.concat() }
}

/// Renders `body` for logging. `max_len` counts characters, or bytes for
/// multipart bodies.
pub fn render(body: &[u8], content_type: &str, max_len: usize) -> RenderedBody {
    if body.is_empty() {
        return RenderedBody::default();
    }

    match BodyKind::classify(content_type) {
        BodyKind::Multipart => match boundary(content_type) {
            Some(boundary) => render_multipart(body, boundary, max_len),
            None => render_text(body, max_len),
        },
        BodyKind::UrlEncoded => {
            let decoded = percent_decode(body).decode_utf8_lossy();
            let (text, truncated) = truncate_chars(&decoded, max_len);
            RenderedBody::single(text, truncated)
        }
        BodyKind::Json | BodyKind::Plain => render_text(body, max_len),
    }
}

fn render_text(body: &[u8], max_len: usize) -> RenderedBody {
    match std::str::from_utf8(body) {
        Ok(text) => {
            let (text, truncated) = truncate_chars(text, max_len);
            RenderedBody::single(text, truncated)
        }
        Err(_) => RenderedBody::single(BINARY_PLACEHOLDER, false),
    }
}

fn render_multipart(body: &[u8], boundary: &str, max_len: usize) -> RenderedBody {
    let truncated = body.len() > max_len;
    let clipped = &body[..body.len().min(max_len)];

    let Some(text) = decode_clipped(clipped, truncated) else {
        return RenderedBody::single(MULTIPART_PLACEHOLDER, truncated);
    };

    let delimiter = format!("--{boundary}");
    let parts: Vec<&str> = text.split(delimiter.as_str()).collect();
    let last = parts.len() - 1;
    let segments = parts
        .into_iter()
        .enumerate()
        .map(|(i, part)| {
            let mut part = mask_binary_part(part).into_owned();
            if i != last {
                part.push_str(&delimiter);
            }
            part
        })
        .collect();

    RenderedBody { segments, truncated }
}

/// Strict UTF-8 decoding. A clipped body may end inside a multi-byte
/// sequence; that tail alone is dropped.
fn decode_clipped(bytes: &[u8], clipped: bool) -> Option<&str> {
    match std::str::from_utf8(bytes) {
        Ok(text) => Some(text),
        Err(e) if clipped && e.error_len().is_none() => std::str::from_utf8(&bytes[..e.valid_up_to()]).ok(),
        Err(_) => None,
    }
}

fn mask_binary_part(part: &str) -> Cow<'_, str> {
    if !part.contains("Content-Type:") {
        return Cow::Borrowed(part);
    }
    let Some(caps) = BINARY_PART.captures(part) else {
        return Cow::Borrowed(part);
    };

    let main = &caps[2];
    let payload = &caps[4];
    let binary = BINARY_MAIN_TYPES.iter().any(|t| main.eq_ignore_ascii_case(t));
    if binary && !payload.is_empty() && payload != "\r\n" {
        Cow::Owned(format!("{}{main}/{}\r\n\r\n{BINARY_PLACEHOLDER}\r\n", &caps[1], &caps[3]))
    } else {
        Cow::Borrowed(part)
    }
}

/// The `boundary=` parameter of a multipart content type, unquoted.
fn boundary(content_type: &str) -> Option<&str> {
    let start = content_type.to_ascii_lowercase().find("boundary=")? + "boundary=".len();
    let value = content_type[start..].split(';').next()?.trim().trim_matches('"');
    (!value.is_empty()).then_some(value)
}

fn essence(content_type: &str) -> String {
    content_type.split(';').next().unwrap_or("").trim().to_ascii_lowercase()
}

fn truncate_chars(text: &str, max_len: usize) -> (&str, bool) {
    match text.char_indices().nth(max_len) {
        Some((end, _)) => (&text[..end], true),
        None => (text, false),
    }
}

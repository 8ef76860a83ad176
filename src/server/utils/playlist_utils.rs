use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};
use url::Url;

/// path every rewritten playlist entry points back at
pub const RELAY_ENDPOINT: &str = "/proxy";

pub const HLS_PLAYLIST_CONTENT_TYPE: &str = "application/vnd.apple.mpegurl";

static ABSOLUTE_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^https?://").expect("static regex should compile"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UriReference {
    Absolute,
    RootRelative,
    Relative,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaylistLine {
    /// `#EXTM3U`, `#EXTINF:...` and friends
    Directive,
    Blank,
    Uri(UriReference),
}

impl PlaylistLine {
    pub fn classify(line: &str) -> Self {
        let trimmed = line.trim();

        if trimmed.is_empty() {
            Self::Blank
        } else if trimmed.starts_with('#') {
            Self::Directive
        } else if ABSOLUTE_URL.is_match(trimmed) {
            Self::Uri(UriReference::Absolute)
        } else if trimmed.starts_with('/') {
            Self::Uri(UriReference::RootRelative)
        } else {
            Self::Uri(UriReference::Relative)
        }
    }
}

pub struct PlaylistUtil;

impl PlaylistUtil {
    /// does the target look like a playlist, only the path suffix counts
    pub fn is_playlist_url(target: &Url) -> bool {
        target.path().ends_with(".m3u8")
    }

    /// `/proxy?url=<percent encoded target>`
    pub fn relay_reference(target: &str) -> String {
        format!("{}?url={}", RELAY_ENDPOINT, urlencoding::encode(target))
    }

    /// resolves one uri line against the playlist it came from, `None` means leave it alone
    pub fn resolve(line: &str, kind: UriReference, original: &Url) -> Option<String> {
        let trimmed = line.trim();

        match kind {
            // kept as written, no normalization
            UriReference::Absolute => Some(trimmed.to_string()),
            // join keeps the original scheme, host and port and swaps the path out
            UriReference::RootRelative | UriReference::Relative => match original.join(trimmed) {
                Ok(resolved) => Some(resolved.to_string()),
                Err(e) => {
                    warn!("Failed to resolve playlist entry '{}' against {}: {}", trimmed, original, e);
                    None
                }
            },
        }
    }

    pub fn rewrite_line(line: &str, original: &Url) -> String {
        match PlaylistLine::classify(line) {
            PlaylistLine::Directive | PlaylistLine::Blank => line.to_string(),
            PlaylistLine::Uri(kind) => match Self::resolve(line, kind, original) {
                Some(resolved) => Self::relay_reference(&resolved),
                None => line.to_string(),
            },
        }
    }

    /// rewrites every uri line so it goes back through the relay
    ///
    /// line endings (`\n` or `\r\n`) are kept exactly as the upstream sent them, including a
    /// missing newline at the end of the body
    pub fn rewrite(body: &str, original: &Url) -> String {
        let mut output = String::with_capacity(body.len() + body.len() / 2);
        let mut rewritten = 0usize;

        for chunk in body.split_inclusive('\n') {
            let (content, terminator) = if let Some(content) = chunk.strip_suffix("\r\n") {
                (content, "\r\n")
            } else if let Some(content) = chunk.strip_suffix('\n') {
                (content, "\n")
            } else {
                (chunk, "")
            };

            let line = Self::rewrite_line(content, original);
            if line != content {
                rewritten += 1;
            }

            output.push_str(&line);
            output.push_str(terminator);
        }

        debug!("Rewrote {} playlist entries from {}", rewritten, original);
        output
    }
}

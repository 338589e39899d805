//! Viewer URLs for remote files, and the reverse: pulling a file id back out
//! of a pasted Drive link.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::{DriveError, Result};

const VIEWER_URL_PREFIX: &str = "https://drive.google.com/open?id=";

/// Link shapes Drive hands out; capture group 1 is the id.
static LINK_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"^https?://drive\.google\.com/open\?id=([a-zA-Z0-9_-]+)",
        r"^https?://drive\.google\.com/file/d/([a-zA-Z0-9_-]+)",
        r"^https?://docs\.google\.com/(?:spreadsheets|document|presentation)/d/([a-zA-Z0-9_-]+)",
        r"^https?://drive\.google\.com/drive/(?:u/\d+/)?folders/([a-zA-Z0-9_-]+)",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("Invalid Drive link regex"))
    .collect()
});

static RAW_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_-]+$").expect("Invalid ID regex"));

/// Browser URL for a file. Constructed locally, never fetched.
pub fn viewer_url(file_id: &str) -> String {
    format!("{}{}", VIEWER_URL_PREFIX, file_id)
}

/// Extract a file id from a Drive/Docs link, or validate a raw id.
///
/// ```
/// use drive_catalog::file_ref::{parse_file_ref, viewer_url};
///
/// let url = viewer_url("1abc");
/// assert_eq!(url, "https://drive.google.com/open?id=1abc");
/// assert_eq!(parse_file_ref(&url).unwrap(), "1abc");
/// ```
pub fn parse_file_ref(url_or_id: &str) -> Result<String> {
    let trimmed = url_or_id.trim();

    let from_link = LINK_PATTERNS
        .iter()
        .find_map(|re| re.captures(trimmed))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string());

    match from_link {
        Some(id) => Ok(id),
        None if RAW_ID.is_match(trimmed) => Ok(trimmed.to_string()),
        None => Err(DriveError::InvalidUrlOrId(url_or_id.to_string())),
    }
}

use crate::UrlError;
use url::Url;

/// Parses and validates one input URL
///
/// # Validation Steps
///
/// 1. Trim surrounding whitespace
/// 2. Parse the URL; reject if malformed
/// 3. Only `http` and `https` schemes are accepted
/// 4. The URL must carry a host
///
/// The URL is otherwise kept as given. Query strings and fragments are part
/// of what the caller asked for and are not rewritten.
///
/// # Examples
///
/// ```
/// use ld_harvest::url::parse_input_url;
///
/// let url = parse_input_url("  https://EXAMPLE.com/hotel?id=4 ").unwrap();
/// assert_eq!(url.as_str(), "https://example.com/hotel?id=4");
/// ```
pub fn parse_input_url(url_str: &str) -> Result<Url, UrlError> {
    let trimmed = url_str.trim();
    let url = Url::parse(trimmed).map_err(|e| UrlError::Parse(format!("{}: {}", trimmed, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(UrlError::MissingHost);
    }

    Ok(url)
}

/// Validates a list of raw input URLs, preserving their order
///
/// Entries that fail validation are logged and dropped. The returned strings
/// are the trimmed originals, so the recorded `url` of each result matches
/// what the user supplied.
pub fn collect_input_urls<S: AsRef<str>>(raw: &[S]) -> Vec<String> {
    let mut urls = Vec::with_capacity(raw.len());

    for entry in raw {
        let entry = entry.as_ref();
        match parse_input_url(entry) {
            Ok(_) => urls.push(entry.trim().to_string()),
            Err(e) => tracing::warn!("Skipping input URL {:?}: {}", entry, e),
        }
    }

    urls
}

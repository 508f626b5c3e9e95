//! URL helpers for building backend endpoints from a configured base URL.

/// Strip trailing slashes so endpoints can be appended without producing
/// `//`.
///
/// ```
/// use cortex_client::utils::url::normalize_base_url;
///
/// assert_eq!(normalize_base_url("https://cortex.example.com/"), "https://cortex.example.com");
/// ```
pub fn normalize_base_url(base_url: &str) -> String {
    base_url.trim().trim_end_matches('/').to_string()
}

/// Join a base URL and an endpoint path with exactly one slash.
///
/// ```
/// use cortex_client::utils::url::construct_api_url;
///
/// assert_eq!(
///     construct_api_url("https://cortex.example.com/", "/v1/chat/completions"),
///     "https://cortex.example.com/v1/chat/completions"
/// );
/// ```
pub fn construct_api_url(base_url: &str, endpoint: &str) -> String {
    let normalized_base = normalize_base_url(base_url);
    let endpoint = endpoint.trim_start_matches('/');
    format!("{normalized_base}/{endpoint}")
}

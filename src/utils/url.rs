//! Endpoint URL construction

/// Builds the chat completions URL from a configured base URL, tolerating
/// trailing slashes and bases that already name the endpoint.
///
/// # Examples
///
/// ```
/// use confab::utils::url::completions_url;
///
/// assert_eq!(
///     completions_url("https://api.siliconflow.cn/v1"),
///     "https://api.siliconflow.cn/v1/chat/completions"
/// );
/// assert_eq!(
///     completions_url("https://api.siliconflow.cn/v1/"),
///     "https://api.siliconflow.cn/v1/chat/completions"
/// );
/// ```
pub fn completions_url(base_url: &str) -> String {
    let trimmed = base_url.trim_end_matches('/');
    if trimmed.ends_with("/chat/completions") {
        return trimmed.to_string();
    }
    format!("{trimmed}/chat/completions")
}

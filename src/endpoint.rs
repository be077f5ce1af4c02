use reqwest::Url;

/// Strips trailing slashes so every join inserts exactly one separator.
pub(crate) fn normalize_base_url(base_url: &str) -> String {
    base_url.trim().trim_end_matches('/').to_owned()
}

/// Joins `endpoint` onto `base_url`.
///
/// A leading slash on the endpoint stays inside the base path, and an
/// endpoint that is already an absolute URL is returned unchanged, so
/// joining a previous result again is a no-op.
pub(crate) fn join_url(base_url: &str, endpoint: &str) -> String {
    if is_absolute(endpoint) {
        return endpoint.to_owned();
    }
    let base = base_url.trim_end_matches('/');
    let path = endpoint.trim_start_matches('/');
    format!("{base}/{path}")
}

fn is_absolute(endpoint: &str) -> bool {
    Url::parse(endpoint).is_ok_and(|url| url.has_host())
}

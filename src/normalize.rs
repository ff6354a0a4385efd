use url::Url;

/// Normalize a URL for visited-set membership and for fetching.
///
/// - Lowercases scheme and host.
/// - Strips default ports (`:80` for http, `:443` for https).
/// - Removes the fragment.
/// - Collapses repeated slashes in the path (keeping a leading `/`).
/// - Leaves query-parameter order untouched: some sites are order-sensitive,
///   so normalization never reorders or sorts them.
/// - Preserves a trailing slash on bare-host URLs exactly as provided.
pub fn normalize_url(url: &Url) -> String {
    let mut normalized = url.clone();
    let _ = normalized.set_scheme(&url.scheme().to_ascii_lowercase());
    if let Some(host) = url.host_str() {
        let _ = normalized.set_host(Some(&host.to_ascii_lowercase()));
    }
    normalized.set_fragment(None);

    let is_default_port = matches!(
        (normalized.scheme(), normalized.port()),
        ("http", Some(80)) | ("https", Some(443))
    );
    if is_default_port {
        let _ = normalized.set_port(None);
    }

    let collapsed_path = collapse_slashes(normalized.path());
    normalized.set_path(&collapsed_path);

    normalized.to_string()
}

/// Parse, resolve against `base` when relative, and normalize. Returns `None`
/// for anything that isn't an absolute http/https URL after resolution.
pub fn resolve_and_normalize(base: &Url, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }
    if href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("data:")
        || href.starts_with("tel:")
    {
        return None;
    }

    let resolved = base.join(href).ok()?;
    if resolved.scheme() != "http" && resolved.scheme() != "https" {
        return None;
    }
    Some(normalize_url(&resolved))
}

fn collapse_slashes(path: &str) -> String {
    if path.is_empty() {
        return "/".to_string();
    }
    let mut out = String::with_capacity(path.len());
    let mut prev_was_slash = false;
    for c in path.chars() {
        if c == '/' {
            if prev_was_slash {
                continue;
            }
            prev_was_slash = true;
        } else {
            prev_was_slash = false;
        }
        out.push(c);
    }
    if !out.starts_with('/') {
        out.insert(0, '/');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn n(s: &str) -> String {
        normalize_url(&Url::parse(s).unwrap())
    }

    #[test]
    fn strips_default_ports() {
        assert_eq!(n("http://Example.com:80/a"), "http://example.com/a");
        assert_eq!(n("https://Example.com:443/a"), "https://example.com/a");
    }

    #[test]
    fn keeps_nondefault_port() {
        assert_eq!(n("http://example.com:8080/a"), "http://example.com:8080/a");
    }

    #[test]
    fn strips_fragment() {
        assert_eq!(n("http://example.com/a#section"), "http://example.com/a");
    }

    #[test]
    fn collapses_repeated_slashes() {
        assert_eq!(n("http://example.com//a///b"), "http://example.com/a/b");
    }

    #[test]
    fn retains_query_param_order() {
        assert_eq!(
            n("http://example.com/a?b=2&a=1"),
            "http://example.com/a?b=2&a=1"
        );
    }

    #[test]
    fn trailing_slash_on_bare_host_preserved() {
        assert_eq!(n("http://example.com/"), "http://example.com/");
    }

    #[test]
    fn resolve_relative_against_base() {
        let base = Url::parse("http://example.com/dir/page.html").unwrap();
        assert_eq!(
            resolve_and_normalize(&base, "other.html"),
            Some("http://example.com/dir/other.html".to_string())
        );
    }

    #[test]
    fn resolve_rejects_fragment_only() {
        let base = Url::parse("http://example.com/dir/page.html").unwrap();
        assert_eq!(resolve_and_normalize(&base, "#top"), None);
    }

    #[test]
    fn resolve_rejects_non_http_schemes() {
        let base = Url::parse("http://example.com/dir/page.html").unwrap();
        assert_eq!(
            resolve_and_normalize(&base, "mailto:a@example.com"),
            None
        );
        assert_eq!(resolve_and_normalize(&base, "javascript:void(0)"), None);
        assert_eq!(resolve_and_normalize(&base, "tel:+123456"), None);
        assert_eq!(
            resolve_and_normalize(&base, "data:text/plain,hi"),
            None
        );
    }
}

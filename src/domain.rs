use url::Url;

/// Two-label compound suffixes common enough to special-case without pulling
/// in a full public-suffix-list crate. Not exhaustive — falls back to the
/// plain last-two-labels heuristic for anything not listed here.
const COMPOUND_SUFFIXES: &[&str] = &[
    "co.uk", "org.uk", "ac.uk", "gov.uk", "com.au", "net.au", "org.au", "co.jp",
    "co.nz", "co.in", "com.br", "com.cn", "com.mx",
];

/// Best-effort eTLD+1 (registrable domain) for a host, e.g. `b.example` from
/// `sub.b.example`, or `example.co.uk` from `www.example.co.uk`. Falls back
/// to the host itself when it has fewer than two labels.
pub fn registrable_domain(host: &str) -> String {
    let host = host.trim_end_matches('.');
    let labels: Vec<&str> = host.split('.').collect();
    if labels.len() <= 2 {
        return host.to_string();
    }

    let last_two = labels[labels.len() - 2..].join(".");
    if COMPOUND_SUFFIXES.contains(&last_two.as_str()) && labels.len() >= 3 {
        return labels[labels.len() - 3..].join(".");
    }

    last_two
}

/// Convenience wrapper over [`registrable_domain`] for a parsed URL, falling
/// back to the raw host when the URL has no discernible domain structure.
pub fn registrable_domain_for_url(url: &Url) -> Option<String> {
    url.host_str().map(registrable_domain)
}

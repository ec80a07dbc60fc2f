//! Upstream path rewriting.

/// Prefix rewrites applied before forwarding, first match wins.
const REWRITES: &[(&str, &str)] = &[
    ("/api/embeddings", "/api/embed"),
    ("/api/chat", "/api/generate"),
];

const API_PREFIX: &str = "/api";

/// Map a client path onto the upstream path.
///
/// Only `/api` paths are forwarded; anything else yields `None`. Paths that
/// start with a rewritten prefix keep their remainder.
pub fn rewrite_path(path: &str) -> Option<String> {
    if path != API_PREFIX && !path.starts_with("/api/") {
        return None;
    }

    for (from, to) in REWRITES {
        if let Some(rest) = path.strip_prefix(from) {
            return Some(format!("{}{}", to, rest));
        }
    }

    Some(path.to_string())
}

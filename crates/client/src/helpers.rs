//! Small URL helpers used by the session and the CLI renderer.

/// Append a unique `t=<token>` query parameter so that a browser (or any
/// other URL-keyed cache) never serves a stale preview image.
/// A fragment, if present, stays at the end.
pub fn cache_bust(url: &str) -> String {
    let token = uuid::Uuid::new_v4().simple();
    let (base, fragment) = match url.find('#') {
        Some(pos) => url.split_at(pos),
        None => (url, ""),
    };
    let sep = if base.contains('?') { '&' } else { '?' };
    format!("{base}{sep}t={token}{fragment}")
}

/// Short, display-friendly form of an id
pub fn short_id(id: &str) -> &str {
    match id.char_indices().nth(12) {
        Some((idx, _)) => &id[..idx],
        None => id,
    }
}

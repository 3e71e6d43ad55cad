// src/utils/html.rs

/// Sanitizes user supplied text before it is stored.
///
/// Whitelist based: harmless inline markup survives, scripts, iframes and
/// event-handler attributes are dropped.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}

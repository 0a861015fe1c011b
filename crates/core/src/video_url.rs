use url::Url;

/// Cache key for a video page: origin + path + `v` parameter only.
///
/// URLs that fail to parse, or carry no `v` parameter, are returned as-is.
pub fn normalize_video_url(raw: &str) -> String {
    let Ok(url) = Url::parse(raw) else {
        tracing::debug!(url = raw, "unparsable video url, using it verbatim");
        return raw.to_string();
    };

    match video_id_of(&url) {
        Some(id) => format!(
            "{}{}?v={}",
            url.origin().ascii_serialization(),
            url.path(),
            id
        ),
        None => raw.to_string(),
    }
}

/// The `v` query parameter, if present and non-empty.
pub fn video_id(raw: &str) -> Option<String> {
    Url::parse(raw).ok().as_ref().and_then(video_id_of)
}

fn video_id_of(url: &Url) -> Option<String> {
    url.query_pairs()
        .find(|(k, _)| k == "v")
        .map(|(_, v)| v.into_owned())
        .filter(|v| !v.is_empty())
}

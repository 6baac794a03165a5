use url::Url;

use crate::locator::strip_query;

/// Used when neither the extension nor the server tell us anything.
pub const FALLBACK_MEDIA_TYPE: &str = "image/png";

pub const HTML_MEDIA_TYPE: &str = "text/html";

const EXTENSION_TABLE: &[(&str, &str)] = &[
    ("png", "image/png"),
    ("gif", "image/gif"),
    ("ico", "image/x-icon"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("webp", "image/webp"),
    ("svg", "image/svg+xml"),
    ("ttf", "application/x-font-ttf"),
    ("otf", "application/x-font-opentype"),
    ("woff", "application/font-woff"),
    ("woff2", "application/font-woff2"),
    ("eot", "application/vnd.ms-fontobject"),
    ("sfnt", "application/font-sfnt"),
    ("css", "text/css"),
    ("less", "text/css"),
    ("js", "application/javascript"),
    ("html", "text/html"),
    ("htm", "text/html"),
    ("txt", "text/text"),
    ("md", "text/text"),
    ("json", "application/json"),
];

/// Media type for `locator`, preferring a content type reported by the fetch.
pub fn classify(locator: &str, reported: Option<&str>) -> String {
    match reported.map(compact).filter(|value| !value.is_empty()) {
        Some(value) => normalize(value),
        None => from_extension(locator).to_string(),
    }
}

/// Media type guessed from the locator's extension alone.
pub fn from_extension(locator: &str) -> &'static str {
    let trimmed = locator.trim();
    if trimmed.starts_with("https://fonts.googleapis.com/css") {
        return "text/css";
    }

    let path = match Url::parse(trimmed) {
        Ok(url) => url.path().to_string(),
        Err(_) => strip_query(trimmed).to_string(),
    }
    .to_ascii_lowercase();

    let file_name = path.rsplit('/').next().unwrap_or_default();
    file_name
        .rsplit_once('.')
        .and_then(|(_, extension)| {
            EXTENSION_TABLE
                .iter()
                .find(|(known, _)| *known == extension)
                .map(|(_, media_type)| *media_type)
        })
        .unwrap_or(FALLBACK_MEDIA_TYPE)
}

pub fn is_html(media_type: &str) -> bool {
    media_type
        .split(';')
        .next()
        .is_some_and(|essence| essence.trim().eq_ignore_ascii_case(HTML_MEDIA_TYPE))
}

fn compact(value: &str) -> String {
    value.chars().filter(|c| !c.is_whitespace()).collect()
}

fn normalize(value: String) -> String {
    match value.strip_prefix("image/jpg") {
        Some(rest) if rest.is_empty() || rest.starts_with(';') => format!("image/jpeg{rest}"),
        _ => value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_table() {
        let cases = [
            ("https://example.com/a/logo.PNG", "image/png"),
            ("img/photo.jpg?size=large#x", "image/jpeg"),
            ("favicon.ico", "image/x-icon"),
            ("fonts/icons.woff2", "application/font-woff2"),
            ("fonts/icons.woff", "application/font-woff"),
            ("theme.less", "text/css"),
            ("frame.htm", "text/html"),
            ("README.md", "text/text"),
            ("data.json", "application/json"),
            ("https://fonts.googleapis.com/css?family=Roboto", "text/css"),
        ];
        for (locator, expected) in cases {
            assert_eq!(classify(locator, None), expected, "for {locator}");
        }
    }

    #[test]
    fn test_unknown_extension_falls_back_to_png() {
        assert_eq!(classify("https://example.com/image", None), "image/png");
        assert_eq!(classify("pixel.bmp", None), "image/png");
        assert_eq!(classify("https://example.com/", Some("")), "image/png");
    }

    #[test]
    fn test_reported_type_overrides_extension() {
        assert_eq!(classify("a.png", Some("image/gif")), "image/gif");
        assert_eq!(classify("a.css", Some("text/css; charset=utf-8")), "text/css;charset=utf-8");
    }

    #[test]
    fn test_reported_jpg_is_normalized() {
        assert_eq!(classify("a.png", Some("image/jpg")), "image/jpeg");
        assert_eq!(classify("a", Some("image/jpg; q=1")), "image/jpeg;q=1");
        assert_eq!(classify("a", Some("image/jpgx")), "image/jpgx");
    }

    #[test]
    fn test_is_html() {
        assert!(is_html("text/html"));
        assert!(is_html("TEXT/HTML; charset=utf-8"));
        assert!(!is_html("text/css"));
    }
}

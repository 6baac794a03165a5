use encoding_rs::Encoding;
use regex::Regex;
use tracing::warn;

use crate::engine::{Engine, RunContext};
use crate::fetcher::Content;
use crate::locator::ResolutionContext;
use crate::render::DocumentRenderer;

const CHARSET_PATTERN: &str = r#"(?i)@charset\s+["']([-_a-zA-Z0-9]+)["'];"#;

/// One `url(...)` occurrence: byte span of the whole token and the bare reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UrlToken<'a> {
    pub start: usize,
    pub end: usize,
    pub reference: &'a str,
}

/// Stylesheet text from fetched content, honouring an `@charset` rule on
/// binary input.
pub fn decode_stylesheet(content: &Content) -> String {
    match content {
        Content::Text(text) => text.clone(),
        Content::Bytes(bytes) => decode_bytes(bytes),
    }
}

fn decode_bytes(bytes: &[u8]) -> String {
    let sniffed = String::from_utf8_lossy(bytes);
    let label = Regex::new(CHARSET_PATTERN)
        .ok()
        .and_then(|re| re.captures(&sniffed).map(|caps| caps[1].to_string()));

    let Some(label) = label else {
        return sniffed.into_owned();
    };
    match Encoding::for_label(label.as_bytes()) {
        Some(encoding) => {
            let (decoded, _, had_errors) = encoding.decode(bytes);
            if had_errors {
                warn!("[WARN]\tmalformed {} sequences in stylesheet", encoding.name());
            }
            decoded.into_owned()
        }
        None => {
            warn!("[WARN]\tfailed to convert css to encoding {}: unknown charset", label);
            sniffed.into_owned()
        }
    }
}

/// Find every `url(...)` token in one pass.
///
/// The reference runs to the first `)` on the same line, so URLs containing
/// parentheses are not supported; CSS itself cannot express them unquoted.
pub fn find_url_tokens(css: &str) -> Vec<UrlToken<'_>> {
    let bytes = css.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while let Some(offset) = css[pos..].find("url") {
        let start = pos + offset;
        pos = start + 3;
        if start > 0 && is_ident_byte(bytes[start - 1]) {
            continue;
        }

        let mut cursor = start + 3;
        while cursor < bytes.len() && bytes[cursor].is_ascii_whitespace() {
            cursor += 1;
        }
        if bytes.get(cursor) != Some(&b'(') {
            continue;
        }

        let inner_start = cursor + 1;
        let Some(close) = css[inner_start..].find([')', '\n']).map(|i| inner_start + i) else {
            break;
        };
        if bytes[close] != b')' {
            pos = close;
            continue;
        }

        let reference = css[inner_start..close]
            .trim_matches(|c: char| c.is_whitespace() || c == '\'' || c == '"');
        if !reference.is_empty() {
            tokens.push(UrlToken {
                start,
                end: close + 1,
                reference,
            });
        }
        pos = close + 1;
    }
    tokens
}

fn is_ident_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_'
}

impl<R: DocumentRenderer> Engine<R> {
    /// Replace every `url(...)` in `css` with an embedded `url("data:...")`.
    pub async fn rewrite_css(
        &self,
        run: &mut RunContext,
        ctx: &ResolutionContext,
        css: &str,
    ) -> String {
        let tokens = find_url_tokens(css);
        if tokens.is_empty() {
            return css.to_string();
        }

        let mut rewritten = String::with_capacity(css.len());
        let mut last = 0;
        for token in tokens {
            rewritten.push_str(&css[last..token.start]);
            let embedded = self.embed(run, ctx, token.reference).await;
            rewritten.push_str("url(\"");
            rewritten.push_str(&embedded);
            rewritten.push_str("\")");
            last = token.end;
        }
        rewritten.push_str(&css[last..]);
        rewritten
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn references(css: &str) -> Vec<&str> {
        find_url_tokens(css).iter().map(|t| t.reference).collect()
    }

    #[test]
    fn test_finds_quoted_and_bare_urls() {
        let css = r#"a{background:url(bg.png)} b{background: url( "x/y.gif" )} @font-face{src:url('f.woff2') format("woff2")}"#;
        assert_eq!(references(css), ["bg.png", "x/y.gif", "f.woff2"]);
    }

    #[test]
    fn test_token_spans_cover_whole_construct() {
        let css = "p{background:url (a.png) no-repeat}";
        let tokens = find_url_tokens(css);
        assert_eq!(tokens.len(), 1);
        assert_eq!(&css[tokens[0].start..tokens[0].end], "url (a.png)");
    }

    #[test]
    fn test_skips_non_tokens() {
        assert!(references("p{content:'curl(x)'} .url{color:red} url()").is_empty());
        assert!(references("p{background:url(a.png").is_empty());
        assert!(references("p{background:url(a\n.png)}").is_empty());
    }

    #[test]
    fn test_parentheses_in_url_are_cut_at_first_close() {
        assert_eq!(references("p{background:url(a(1).png)}"), ["a(1"]);
    }

    #[test]
    fn test_data_uris_are_found_untouched() {
        let css = r#"i{background:url("data:image/png;base64,AAAA")}"#;
        assert_eq!(references(css), ["data:image/png;base64,AAAA"]);
    }

    #[test]
    fn test_decode_declared_charset() {
        let mut bytes = br#"@charset "iso-8859-1"; p:before{content:""#.to_vec();
        bytes.push(0xE9);
        bytes.extend_from_slice(br#""}"#);
        let css = decode_stylesheet(&Content::Bytes(bytes));
        assert!(css.ends_with("content:\"\u{e9}\"}"));
    }

    #[test]
    fn test_unknown_charset_falls_back_to_utf8() {
        let bytes = "@charset 'no-such-charset'; p{content:'é'}".as_bytes().to_vec();
        let css = decode_stylesheet(&Content::Bytes(bytes));
        assert_eq!(css, "@charset 'no-such-charset'; p{content:'é'}");
    }

    #[test]
    fn test_text_content_is_used_as_is() {
        let css = decode_stylesheet(&Content::Text("body{}".into()));
        assert_eq!(css, "body{}");
    }
}

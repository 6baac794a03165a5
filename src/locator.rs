use std::fmt;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use url::Url;

/// Characters left untouched when quoting a request URL.
const URL_SAFE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'%')
    .remove(b'/')
    .remove(b':')
    .remove(b'=')
    .remove(b'&')
    .remove(b'?')
    .remove(b'~')
    .remove(b'#')
    .remove(b'+')
    .remove(b'!')
    .remove(b'$')
    .remove(b',')
    .remove(b';')
    .remove(b'\'')
    .remove(b'@')
    .remove(b'(')
    .remove(b')')
    .remove(b'*')
    .remove(b'[')
    .remove(b']');

/// An absolute URL or a filesystem path, normalized so it can key the cache.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Locator(String);

impl Locator {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_network(&self) -> bool {
        is_network(&self.0)
    }

    /// Percent-encoded form used for requests and cache lookups.
    pub fn quoted(&self) -> String {
        utf8_percent_encode(&self.0, URL_SAFE).to_string()
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Locator {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

pub fn is_network(reference: &str) -> bool {
    reference
        .get(..4)
        .is_some_and(|scheme| scheme.eq_ignore_ascii_case("http"))
}

pub fn strip_query(reference: &str) -> &str {
    let end = reference.find(['?', '#']).unwrap_or(reference.len());
    &reference[..end]
}

/// Where relative references in one document resolve from.
///
/// Built once per document (the top-level page or a nested frame) and never
/// mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionContext {
    pub base: Locator,
    pub referer: Option<Locator>,
    pub depth: usize,
}

impl ResolutionContext {
    pub fn new(base: Locator, referer: Option<Locator>, depth: usize) -> Self {
        Self { base, referer, depth }
    }

    /// Context for a resource (e.g. a stylesheet) whose own references
    /// resolve against `base` but which belongs to the same document.
    pub fn nested(&self, base: Locator) -> Self {
        Self {
            base,
            referer: self.referer.clone(),
            depth: self.depth,
        }
    }

    pub fn resolve(&self, relative: &str) -> Locator {
        resolve(self.base.as_str(), relative)
    }

    pub fn referer(&self) -> Option<&str> {
        self.referer.as_ref().map(Locator::as_str)
    }
}

/// Resolve `relative` against `base`. An empty `relative` means "the base itself".
pub fn resolve(base: &str, relative: &str) -> Locator {
    resolve_with(base, relative, |path| path.to_string())
}

/// Like [`resolve`], applying `normalize` to the path component of network URLs.
pub fn resolve_with<F>(base: &str, relative: &str, normalize: F) -> Locator
where
    F: Fn(&str) -> String,
{
    if is_network(base) || is_network(relative) {
        return match join_url(base, relative) {
            Some(mut url) => {
                url.set_fragment(None);
                let path = normalize(url.path());
                url.set_path(&path);
                Locator(url.to_string())
            }
            None => {
                tracing::debug!(base, relative, "unresolvable reference");
                Locator(if relative.is_empty() { base } else { relative }.to_string())
            }
        };
    }

    if relative.is_empty() {
        return Locator(base.to_string());
    }
    let joined = if relative.starts_with('/') {
        relative.to_string()
    } else {
        match parent_dir(base) {
            "" => relative.to_string(),
            dir => format!("{dir}/{relative}"),
        }
    };
    Locator(normalize(&normalize_path(&joined)))
}

fn join_url(base: &str, relative: &str) -> Option<Url> {
    if let Ok(url) = Url::parse(relative) {
        if is_network(url.scheme()) {
            return Some(url);
        }
    }
    let base = Url::parse(base).ok()?;
    base.join(relative).ok()
}

/// Everything before the last `/`, so `dir/a/` yields `dir/a`.
fn parent_dir(path: &str) -> &str {
    match path.rfind('/') {
        Some(0) => "/",
        Some(i) => &path[..i],
        None => "",
    }
}

/// Lexically collapse `.` and `..` segments, keeping a trailing slash.
fn normalize_path(path: &str) -> String {
    let absolute = path.starts_with('/');
    let trailing = path.len() > 1 && path.ends_with('/');
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => match segments.last() {
                Some(&last) if last != ".." => {
                    segments.pop();
                }
                _ if absolute => {}
                _ => segments.push(".."),
            },
            other => segments.push(other),
        }
    }

    let mut normalized = segments.join("/");
    if absolute {
        normalized.insert(0, '/');
    }
    if normalized.is_empty() {
        normalized.push('.');
    }
    if trailing && !normalized.ends_with('/') {
        normalized.push('/');
    }
    normalized
}

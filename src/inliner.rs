//! Per-tag inlining policy.
//!
//! Every element of a parsed document is visited once, in document order.
//! Each is sorted into a [`TagKind`] and handed to the handler for that
//! kind; afterwards any inline `style` attribute on the surviving element is
//! rewritten.

use markup5ever_rcdom::{Handle, RcDom};
use tracing::{debug, error, warn};

use crate::css::decode_stylesheet;
use crate::dom::{
    collect_elements, create_element, get_node_attr, get_node_name, get_text, has_node_attr,
    node_attrs, remove_node, replace_node, set_node_attr, set_text,
};
use crate::embed::{data_uri, is_passthrough};
use crate::engine::{Engine, RunContext};
use crate::error::{InlineError, Result};
use crate::fetcher::Content;
use crate::locator::ResolutionContext;
use crate::render::DocumentRenderer;

const ICON_RELS: &[&str] = &[
    "icon",
    "mask-icon",
    "apple-touch-icon",
    "apple-touch-icon-precomposed",
];

const SWAP_HANDLERS: &[&str] = &["onerror", "onmouseover", "onmouseout"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagKind {
    Link,
    Script,
    Image,
    Anchor,
    Frame,
    Style,
    Meta,
    Other,
}

impl TagKind {
    pub fn of(tag_name: &str) -> Self {
        match tag_name {
            "link" => TagKind::Link,
            "script" => TagKind::Script,
            "img" => TagKind::Image,
            "a" => TagKind::Anchor,
            "iframe" | "frame" => TagKind::Frame,
            "style" => TagKind::Style,
            "meta" => TagKind::Meta,
            _ => TagKind::Other,
        }
    }
}

/// What a handler did with the element it was given.
enum Outcome {
    Kept,
    Replaced(Handle),
    Removed,
}

impl<R: DocumentRenderer> Engine<R> {
    pub(crate) async fn inline_document(
        &self,
        run: &mut RunContext,
        ctx: &ResolutionContext,
        dom: &RcDom,
    ) -> Result<()> {
        for node in collect_elements(&dom.document) {
            let Some(tag_name) = get_node_name(&node) else {
                continue;
            };

            let outcome = match TagKind::of(&tag_name) {
                TagKind::Link => self.inline_link(run, ctx, &node).await,
                TagKind::Script => self.inline_script(run, ctx, &node).await?,
                TagKind::Image => {
                    self.inline_image(run, ctx, &node).await;
                    Outcome::Kept
                }
                TagKind::Anchor => {
                    self.absolutize_anchor(run, ctx, &node);
                    Outcome::Kept
                }
                TagKind::Frame => {
                    self.inline_frame(run, ctx, &node).await?;
                    Outcome::Kept
                }
                TagKind::Style => {
                    self.inline_style_text(run, ctx, &node).await;
                    Outcome::Kept
                }
                TagKind::Meta => {
                    normalize_meta(&node);
                    Outcome::Kept
                }
                TagKind::Other => Outcome::Kept,
            };

            match outcome {
                Outcome::Kept => self.inline_style_attr(run, ctx, &node).await,
                Outcome::Replaced(replacement) => {
                    self.inline_style_attr(run, ctx, &replacement).await
                }
                Outcome::Removed => {}
            }
        }
        Ok(())
    }

    async fn inline_link(
        &self,
        run: &mut RunContext,
        ctx: &ResolutionContext,
        node: &Handle,
    ) -> Outcome {
        let link_type = get_node_attr(node, "type").unwrap_or_default();
        let Some(href) = get_node_attr(node, "href").filter(|h| !h.is_empty()) else {
            if link_type.eq_ignore_ascii_case("text/css") {
                self.inline_style_text(run, ctx, node).await;
            }
            return Outcome::Kept;
        };

        let rel: Vec<String> = get_node_attr(node, "rel")
            .unwrap_or_default()
            .split_ascii_whitespace()
            .map(str::to_ascii_lowercase)
            .collect();

        if rel.iter().any(|token| ICON_RELS.contains(&token.as_str())) {
            let embedded = self.embed(run, ctx, &href).await;
            set_node_attr(node, "data-href", Some(href));
            set_node_attr(node, "href", Some(embedded));
            return Outcome::Kept;
        }

        let is_stylesheet = link_type.eq_ignore_ascii_case("text/css")
            || href.to_ascii_lowercase().ends_with(".css")
            || rel.iter().any(|token| token == "stylesheet");
        if is_stylesheet {
            let options = self.fetch_options(ctx.referer());
            let fetched = self
                .fetcher
                .fetch(&mut run.cache, ctx, &href, &options)
                .await;
            if fetched.is_empty() {
                warn!("[WARN]\tstylesheet {} could not be fetched; keeping the link", href);
                set_node_attr(node, "data-href", Some(href.clone()));
                set_node_attr(node, "href", Some(ctx.resolve(&href).to_string()));
                return Outcome::Kept;
            }

            let css_ctx = ctx.nested(ctx.resolve(&href));
            let css = decode_stylesheet(&fetched.content);
            let css = self.rewrite_css(run, &css_ctx, &css).await;

            let style_type = if link_type.is_empty() {
                "text/css".to_string()
            } else {
                link_type
            };
            let mut attrs = vec![
                ("type".to_string(), style_type),
                ("data-href".to_string(), href),
            ];
            attrs.extend(
                node_attrs(node)
                    .into_iter()
                    .filter(|(name, _)| name != "href" && name != "type" && name != "data-href"),
            );

            let style = create_element("style", &attrs);
            set_text(&style, &css);
            replace_node(node, &style);
            return Outcome::Replaced(style);
        }

        if self.options.full_url {
            set_node_attr(node, "data-href", Some(href.clone()));
            set_node_attr(node, "href", Some(ctx.resolve(&href).to_string()));
        }
        Outcome::Kept
    }

    async fn inline_script(
        &self,
        run: &mut RunContext,
        ctx: &ResolutionContext,
        node: &Handle,
    ) -> Result<Outcome> {
        if !self.options.keep_script {
            remove_node(node);
            return Ok(Outcome::Removed);
        }
        let Some(src) = get_node_attr(node, "src").filter(|s| !s.is_empty()) else {
            return Ok(Outcome::Kept);
        };

        let script_type = get_node_attr(node, "type")
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| "text/javascript".to_string());
        let options = self.fetch_options(ctx.referer());
        let fetched = self
            .fetcher
            .fetch(&mut run.cache, ctx, &src, &options)
            .await;
        if fetched.is_empty() {
            warn!("[WARN]\tscript {} could not be fetched", src);
        }

        let code = match fetched.content {
            Content::Text(text) => text,
            Content::Bytes(bytes) => String::from_utf8(bytes).map_err(|source| {
                error!("[ERROR]\t{}: {}", src, source);
                InlineError::ScriptText {
                    url: fetched.locator.to_string(),
                    source,
                }
            })?,
        };

        let script = create_element(
            "script",
            &[
                ("type".to_string(), script_type),
                ("data-src".to_string(), src.clone()),
            ],
        );
        if code.contains("</script>") {
            debug!("script {} contains a closing tag; embedding as data URI", src);
            set_node_attr(
                &script,
                "src",
                Some(data_uri("text/javascript", code.as_bytes())),
            );
        } else if !code.contains("]]>") {
            set_text(
                &script,
                &format!("<!--//--><![CDATA[//><!--\n{}\n//--><!]]>", code),
            );
        } else {
            warn!("[WARN]\tscript {} contains ']]>' and is inlined verbatim", src);
            set_text(&script, &code);
        }

        replace_node(node, &script);
        Ok(Outcome::Replaced(script))
    }

    async fn inline_frame(
        &self,
        run: &mut RunContext,
        ctx: &ResolutionContext,
        node: &Handle,
    ) -> Result<()> {
        let Some(src) = get_node_attr(node, "src").filter(|s| !s.is_empty()) else {
            return Ok(());
        };
        debug!("[ DEBUG ] found frame {}", src);

        set_node_attr(node, "data-src", Some(src.clone()));
        if is_self_contained_frame(&src) {
            return Ok(());
        }
        let html = self.frame_html(run, ctx, &src).await?;
        set_node_attr(node, "src", Some(data_uri("text/html", html.as_bytes())));
        Ok(())
    }

    async fn inline_image(&self, run: &mut RunContext, ctx: &ResolutionContext, node: &Handle) {
        let Some(src) = get_node_attr(node, "src").filter(|s| !s.is_empty()) else {
            return;
        };

        let embedded = self.embed(run, ctx, &src).await;
        set_node_attr(node, "data-src", Some(src.clone()));
        set_node_attr(node, "src", Some(embedded));

        // Only `src` is embedded; the alternatives are kept for reference.
        if let Some(srcset) = get_node_attr(node, "srcset").filter(|s| !s.is_empty()) {
            set_node_attr(node, "data-srcset", Some(srcset));
            set_node_attr(node, "srcset", None);
            if self.options.verbose {
                warn!("[ WARN ] srcset found in img tag. Attribute will be cleared. File src => {}", src);
            }
        }

        for handler in SWAP_HANDLERS {
            let swaps_source = get_node_attr(node, handler)
                .is_some_and(|value| value.trim_start().starts_with("this.src="));
            if swaps_source && self.options.verbose {
                warn!("[ WARN ] {} found in img tag and unhandled, which may break page", handler);
            }
        }
    }

    fn absolutize_anchor(&self, run: &mut RunContext, ctx: &ResolutionContext, node: &Handle) {
        if !self.options.full_url {
            return;
        }
        let Some(href) = get_node_attr(node, "href") else {
            return;
        };
        if href.starts_with('#') {
            return;
        }

        let absolute = ctx.resolve(&href);
        set_node_attr(node, "data-href", Some(href));
        set_node_attr(node, "href", Some(absolute.to_string()));
        run.links.add(absolute.as_str(), &run.base_url);
    }

    async fn inline_style_text(
        &self,
        run: &mut RunContext,
        ctx: &ResolutionContext,
        node: &Handle,
    ) {
        let css = get_text(node);
        if css.is_empty() {
            return;
        }
        let rewritten = self.rewrite_css(run, ctx, &css).await;
        set_text(node, &rewritten);
    }

    async fn inline_style_attr(
        &self,
        run: &mut RunContext,
        ctx: &ResolutionContext,
        node: &Handle,
    ) {
        if let Some(style) = get_node_attr(node, "style").filter(|s| !s.is_empty()) {
            let rewritten = self.rewrite_css(run, ctx, &style).await;
            set_node_attr(node, "style", Some(rewritten));
        }
    }
}

/// Frame sources that need no fetch: inline data, script URLs, `about:` pages.
fn is_self_contained_frame(src: &str) -> bool {
    is_passthrough(src)
        || src
            .trim_start()
            .get(..6)
            .is_some_and(|scheme| scheme.eq_ignore_ascii_case("about:"))
}

fn normalize_meta(node: &Handle) {
    if has_node_attr(node, "charset") {
        set_node_attr(node, "charset", Some("UTF-8".to_string()));
    } else if get_node_attr(node, "http-equiv")
        .is_some_and(|value| value.eq_ignore_ascii_case("content-type"))
        && has_node_attr(node, "content")
    {
        set_node_attr(node, "content", Some("text/html; charset=UTF-8".to_string()));
    }
}

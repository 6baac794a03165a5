use base64::{prelude::BASE64_STANDARD, Engine as _};

use crate::engine::{Engine, RunContext};
use crate::locator::ResolutionContext;
use crate::media_type;
use crate::render::DocumentRenderer;

pub fn data_uri(media_type: &str, data: &[u8]) -> String {
    format!("data:{};base64,{}", media_type, BASE64_STANDARD.encode(data))
}

/// References that already carry their content, or carry none.
pub fn is_passthrough(reference: &str) -> bool {
    let trimmed = reference.trim_start();
    trimmed.starts_with("data:") || trimmed.starts_with("javascript:")
}

impl<R: DocumentRenderer> Engine<R> {
    /// Turn `reference` into a data URI, or its absolute locator when the
    /// content cannot be fetched.
    pub async fn embed(
        &self,
        run: &mut RunContext,
        ctx: &ResolutionContext,
        reference: &str,
    ) -> String {
        if is_passthrough(reference) {
            return reference.to_string();
        }

        let reference = reference.trim();
        let locator = ctx.resolve(reference);
        let fetched = if media_type::is_html(media_type::from_extension(reference)) {
            self.load_document(run, &locator, ctx.referer(), false).await
        } else {
            let options = self.fetch_options(ctx.referer());
            self.fetcher
                .fetch(&mut run.cache, ctx, reference, &options)
                .await
        };

        if fetched.is_empty() {
            return locator.to_string();
        }
        let media_type = media_type::classify(reference, fetched.content_type.as_deref());
        data_uri(&media_type, fetched.content.as_bytes())
    }
}

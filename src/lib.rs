pub mod artifacts;
pub mod cli;
pub mod config;
pub mod css;
pub mod dom;
pub mod embed;
pub mod engine;
pub mod error;
pub mod fetcher;
pub mod frame;
pub mod inliner;
pub mod links;
pub mod locator;
pub mod media_type;
pub mod render;

// Re-export main types for convenience
pub use artifacts::ArtifactStore;
pub use cli::InlineCommand;
pub use config::{FetchOptions, GenerateOptions};
pub use engine::{site_identity, Engine, GeneratedPage, RunContext};
pub use error::{InlineError, RenderError, Result};
pub use fetcher::{Content, FetchResult, ResolutionCache, ResourceFetcher};
pub use frame::{FRAME_PLACEHOLDER, MAX_FRAME_DEPTH};
pub use links::{LinkScope, LinkSet};
pub use locator::{resolve, Locator, ResolutionContext};
#[cfg(feature = "chrome")]
pub use render::ChromeRenderer;
pub use render::{DocumentRenderer, FetchOnlyRenderer, RenderedPage};

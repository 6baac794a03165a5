use anyhow::{Context, Result};
use clap::Parser;
use colored::*;
use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;

use webpage_inliner::{ArtifactStore, DocumentRenderer, Engine, GeneratedPage, InlineCommand};

#[tokio::main]
async fn main() -> Result<()> {
    let args = InlineCommand::parse();
    init_logging(args.verbose);

    let options = args.to_options()?;
    if args.stdout && args.urls.len() != 1 {
        anyhow::bail!("--stdout takes exactly one URL, got {}", args.urls.len());
    }

    #[cfg(feature = "chrome")]
    let renderer = webpage_inliner::ChromeRenderer::new(&options);
    #[cfg(not(feature = "chrome"))]
    let renderer = webpage_inliner::FetchOnlyRenderer;

    let engine = Engine::new(options, renderer).context("Failed to build HTTP client")?;
    let failed = run(&engine, &args).await?;

    #[cfg(feature = "chrome")]
    engine.renderer().shutdown().await;

    if failed > 0 {
        anyhow::bail!("{} of {} page(s) failed", failed, args.urls.len());
    }
    Ok(())
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Generate every URL, at most `max_concurrent` at a time. Returns the
/// number of failed pages.
async fn run<R: DocumentRenderer>(engine: &Engine<R>, args: &InlineCommand) -> Result<usize> {
    if args.stdout {
        let page = engine.generate(&args.urls[0]).await?;
        println!("{}", page.html);
        return Ok(0);
    }

    let store = ArtifactStore::new(&args.output_dir)?;
    println!("📁 Output directory: {:?}", store.base_dir());
    println!("⚡ Max concurrent pages: {}", args.max_concurrent);

    let progress_bar = ProgressBar::new(args.urls.len() as u64);
    progress_bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner} [{bar:30}] {pos}/{len} {msg}")
            .context("Invalid progress template")?,
    );

    let outcomes: Vec<(String, Result<GeneratedPage>)> = stream::iter(args.urls.iter())
        .map(|url| {
            let progress_bar = &progress_bar;
            async move {
                progress_bar.set_message(url.clone());
                let outcome = engine.generate(url).await.map_err(anyhow::Error::from);
                progress_bar.inc(1);
                (url.clone(), outcome)
            }
        })
        .buffer_unordered(usize::from(args.max_concurrent))
        .collect()
        .await;
    progress_bar.finish_and_clear();

    let mut failed = 0;
    for (url, outcome) in outcomes {
        match outcome.and_then(|page| store.save(&page)) {
            Ok(path) => println!("✅ {} -> {:?}", url.blue(), path),
            Err(e) => {
                failed += 1;
                eprintln!("❌ Error generating {}: {:#}", url, e);
            }
        }
    }

    println!("📊 Pages saved: {}", args.urls.len() - failed);
    Ok(failed)
}

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use crate::config::GenerateOptions;

#[derive(Parser, Debug)]
#[command(
    name = "webpage-inliner",
    about = "Save web pages as single self-contained HTML files",
    version,
    long_about = "Fetches each page, embeds its stylesheets, images, fonts and frames as data URIs, and writes one standalone HTML document per page together with its link list and an optional screenshot."
)]
pub struct InlineCommand {
    /// Pages to save (http(s) URLs or local file paths)
    #[arg(required = true)]
    pub urls: Vec<String>,

    /// Output directory for html/, link/ and image/
    #[arg(short, long, default_value = "./download")]
    pub output_dir: PathBuf,

    /// Maximum pages generated at the same time
    #[arg(short = 'c', long, default_value = "4", value_parser = clap::value_parser!(u16).range(1..))]
    pub max_concurrent: u16,

    /// JSON file with generation options; flags below override it
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Do not log individual fetches
    #[arg(short, long)]
    pub quiet: bool,

    /// Debug logging
    #[arg(short, long, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Inline scripts instead of removing them
    #[arg(long)]
    pub keep_script: bool,

    /// Leave anchors and other links as written
    #[arg(long)]
    pub no_full_url: bool,

    /// Accept invalid TLS certificates
    #[arg(short = 'k', long)]
    pub insecure: bool,

    /// Keep content of error responses (4xx/5xx)
    #[arg(long)]
    pub errorpage: bool,

    /// Basic-auth user name
    #[arg(short = 'u', long)]
    pub username: Option<String>,

    /// Basic-auth password
    #[arg(short = 'p', long)]
    pub password: Option<String>,

    /// Referer for the top-level request
    #[arg(long)]
    pub referer: Option<String>,

    /// User agent string to use for requests
    #[arg(long)]
    pub user_agent: Option<String>,

    /// Timeout for requests in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    #[arg(long)]
    pub window_width: Option<u32>,

    #[arg(long)]
    pub window_height: Option<u32>,

    /// Skip the full-page screenshot
    #[arg(long)]
    pub no_screenshot: bool,

    /// Print the document to stdout instead of writing artifacts (single URL)
    #[arg(long)]
    pub stdout: bool,
}

impl InlineCommand {
    /// Options from `--config` (or defaults), with flags applied on top.
    pub fn to_options(&self) -> Result<GenerateOptions> {
        let mut options = match &self.config {
            Some(path) => GenerateOptions::from_json_file(path)?,
            None => GenerateOptions::default(),
        };

        if self.quiet {
            options.verbose = false;
        }
        if self.verbose {
            options.verbose = true;
        }
        if self.keep_script {
            options.keep_script = true;
        }
        if self.no_full_url {
            options.full_url = false;
        }
        if self.insecure {
            options.verify_tls = false;
        }
        if self.errorpage {
            options.ignore_http_errors = true;
        }
        if self.no_screenshot || self.stdout {
            options.screenshot = false;
        }
        if let Some(username) = &self.username {
            options.username = Some(username.clone());
        }
        if let Some(password) = &self.password {
            options.password = Some(password.clone());
        }
        if let Some(referer) = &self.referer {
            options.referer = Some(referer.clone());
        }
        if let Some(user_agent) = &self.user_agent {
            options.user_agent = user_agent.clone();
        }
        if let Some(timeout) = self.timeout {
            options.timeout_secs = timeout;
        }
        if let Some(width) = self.window_width {
            options.window_width = width;
        }
        if let Some(height) = self.window_height {
            options.window_height = height;
        }

        Ok(options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_basic_args() {
        let args = InlineCommand::try_parse_from(&[
            "webpage-inliner",
            "https://example.com",
            "-o", "./output"
        ]).unwrap();

        assert_eq!(args.urls, ["https://example.com"]);
        assert_eq!(args.output_dir, PathBuf::from("./output"));
        assert_eq!(args.max_concurrent, 4);
        assert!(!args.keep_script);
        assert!(!args.stdout);
    }

    #[test]
    fn test_parse_all_args() {
        let args = InlineCommand::try_parse_from(&[
            "webpage-inliner",
            "https://example.com",
            "https://example.org/page",
            "-o", "./output",
            "-c", "8",
            "-q",
            "--keep-script",
            "--no-full-url",
            "--insecure",
            "--errorpage",
            "-u", "alice",
            "-p", "secret",
            "--referer", "https://ref.example/",
            "--user-agent", "Inliner/1.0",
            "--timeout", "5",
            "--window-width", "800",
            "--window-height", "600",
            "--no-screenshot",
        ]).unwrap();

        assert_eq!(args.urls.len(), 2);
        assert_eq!(args.max_concurrent, 8);

        let options = args.to_options().unwrap();
        assert!(!options.verbose);
        assert!(options.keep_script);
        assert!(!options.full_url);
        assert!(!options.verify_tls);
        assert!(options.ignore_http_errors);
        assert_eq!(options.username.as_deref(), Some("alice"));
        assert_eq!(options.password.as_deref(), Some("secret"));
        assert_eq!(options.referer.as_deref(), Some("https://ref.example/"));
        assert_eq!(options.user_agent, "Inliner/1.0");
        assert_eq!(options.timeout_secs, 5);
        assert_eq!(options.window_width, 800);
        assert_eq!(options.window_height, 600);
        assert!(!options.screenshot);
    }

    #[test]
    fn test_defaults_when_no_flags() {
        let args = InlineCommand::try_parse_from(&["webpage-inliner", "page.html"]).unwrap();
        assert_eq!(args.to_options().unwrap(), GenerateOptions::default());
    }

    #[test]
    fn test_flags_override_config_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"keep-script": true, "timeout-secs": 90, "full-url": false}}"#).unwrap();

        let args = InlineCommand::try_parse_from(&[
            "webpage-inliner",
            "https://example.com",
            "--config", file.path().to_str().unwrap(),
            "--timeout", "10",
        ]).unwrap();
        let options = args.to_options().unwrap();

        assert!(options.keep_script);
        assert!(!options.full_url);
        assert_eq!(options.timeout_secs, 10);
    }

    #[test]
    fn test_stdout_disables_screenshot() {
        let args = InlineCommand::try_parse_from(&[
            "webpage-inliner",
            "https://example.com",
            "--stdout",
        ]).unwrap();
        assert!(!args.to_options().unwrap().screenshot);
    }

    #[test]
    fn test_parse_missing_url() {
        let result = InlineCommand::try_parse_from(&[
            "webpage-inliner",
            "-o", "./output"
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_invalid_concurrent() {
        let result = InlineCommand::try_parse_from(&[
            "webpage-inliner",
            "https://example.com",
            "-c", "0"
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        let result = InlineCommand::try_parse_from(&[
            "webpage-inliner",
            "https://example.com",
            "-q",
            "-v",
        ]);
        assert!(result.is_err());
    }
}

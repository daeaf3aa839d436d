use clap::Parser;
use regex::{Regex, RegexBuilder};
use std::time::Duration;

use crate::io::HttpOptions;
use crate::zip::ResolverOptions;

/// Default pattern for the inner archive: any path containing "image" and ending ".zip"
pub const DEFAULT_PATTERN: &str = r".*image.*\.zip$";

#[derive(Parser, Debug)]
#[command(name = "nestzip")]
#[command(version)]
#[command(about = "Extract a file from a ZIP nested inside a remote ZIP", long_about = None)]
#[command(after_help = "Examples:\n  \
  nestzip https://example.com/factory.zip                     extract boot.img from the *image*.zip inside\n  \
  nestzip https://example.com/factory.zip '.*img.*' vendor.img pick another inner archive and file\n  \
  nestzip -l https://example.com/factory.zip                  list the inner archive")]
pub struct Cli {
    /// Outer ZIP file: HTTP URL or local path
    #[arg(value_name = "URL")]
    pub url: String,

    /// Case-insensitive regex selecting the inner archive, matched from the start of the entry name
    #[arg(value_name = "PATTERN", default_value = DEFAULT_PATTERN)]
    pub pattern: String,

    /// File to extract from the inner archive
    #[arg(value_name = "FILENAME", default_value = "boot.img")]
    pub filename: String,

    /// List the inner archive (short format)
    #[arg(short = 'l')]
    pub list: bool,

    /// List the inner archive with sizes and dates
    #[arg(short = 'L', long = "long")]
    pub long: bool,

    /// Extract to stdout, no messages
    #[arg(short = 'p')]
    pub pipe: bool,

    /// Extract under this directory
    #[arg(short = 'd', value_name = "DIR")]
    pub extract_dir: Option<String>,

    /// Never overwrite an existing output file
    #[arg(short = 'n')]
    pub never_overwrite: bool,

    /// Quiet mode (-qq => quieter)
    #[arg(short = 'q', action = clap::ArgAction::Count)]
    pub quiet: u8,

    /// Log more (-v info, -vv debug, -vvv trace); RUST_LOG overrides
    #[arg(short = 'v', action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// HTTP request timeout in seconds
    #[arg(long, value_name = "SECS", default_value_t = 30)]
    pub timeout: u64,

    /// Retries on HTTP timeouts and connection errors
    #[arg(long, value_name = "N", default_value_t = 10)]
    pub retries: u32,

    /// Initial trailing window searched for the outer end record, in bytes
    #[arg(long, value_name = "BYTES", default_value_t = 64 * 1024)]
    pub eocd_window: u64,

    /// Initial trailing window searched for the inner end record, in bytes
    #[arg(long, value_name = "BYTES", default_value_t = 64 * 1024)]
    pub inner_window: u64,

    /// Largest window the end record search grows to, in bytes
    #[arg(long, value_name = "BYTES", default_value_t = 65535 + 22)]
    pub max_window: u64,
}

impl Cli {
    pub fn is_http_url(&self) -> bool {
        self.url.starts_with("http://") || self.url.starts_with("https://")
    }

    pub fn is_quiet(&self) -> bool {
        self.quiet > 0 || self.pipe
    }

    pub fn is_very_quiet(&self) -> bool {
        self.quiet > 1
    }

    /// Compile the inner archive pattern, anchored at the start of the name
    pub fn pattern(&self) -> Result<Regex, regex::Error> {
        RegexBuilder::new(&format!("^(?:{})", self.pattern))
            .case_insensitive(true)
            .build()
    }

    pub fn resolver_options(&self) -> ResolverOptions {
        ResolverOptions {
            eocd_window: self.eocd_window,
            inner_eocd_window: self.inner_window,
            max_eocd_window: self.max_window,
        }
    }

    pub fn http_options(&self) -> HttpOptions {
        HttpOptions {
            timeout: Duration::from_secs(self.timeout),
            max_retry: self.retries,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cli = Cli::parse_from(["nestzip", "https://example.com/a.zip"]);
        assert!(cli.is_http_url());
        assert_eq!(cli.filename, "boot.img");
        assert_eq!(cli.pattern, DEFAULT_PATTERN);
        assert_eq!(cli.resolver_options().max_eocd_window, 65557);
        assert_eq!(cli.http_options().max_retry, 10);
        assert!(!cli.is_quiet());
    }

    #[test]
    fn default_pattern_matching() {
        let cli = Cli::parse_from(["nestzip", "factory.zip"]);
        assert!(!cli.is_http_url());
        let re = cli.pattern().unwrap();
        assert!(re.is_match("picture_image.zip"));
        assert!(re.is_match("dir/Device-IMAGE-123.ZIP"));
        assert!(!re.is_match("image.zip.sig"));
        assert!(!re.is_match("radio.zip"));
    }

    #[test]
    fn custom_pattern_is_anchored() {
        let cli = Cli::parse_from(["nestzip", "f.zip", "inner", "vendor.img", "-p"]);
        let re = cli.pattern().unwrap();
        assert!(re.is_match("inner.zip"));
        assert!(!re.is_match("dir/inner.zip"));
        assert_eq!(cli.filename, "vendor.img");
        assert!(cli.is_quiet());
    }

    #[test]
    fn invalid_pattern() {
        let cli = Cli::parse_from(["nestzip", "f.zip", "(unclosed"]);
        assert!(cli.pattern().is_err());
    }
}

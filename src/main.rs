//! Main entry point for the nestzip CLI application.
//!
//! Resolves a file inside a ZIP nested in an outer ZIP, reading the outer
//! archive by HTTP Range requests (or positional reads for a local path).

use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

use nestzip::zip::CentralDirectoryEntry;
use nestzip::{Cli, HttpRangeSource, LocalFileSource, NestedExtractor, RangeSource};

mod logs;

/// Application entry point.
///
/// Any error aborts before output is written and is reported on stderr.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logs::init(&cli);
    debug!(?cli, "got arguments");

    if cli.is_http_url() {
        let source = HttpRangeSource::with_options(cli.url.clone(), cli.http_options()).await?;
        let source = Arc::new(source);

        process(source.clone(), &cli).await?;

        // Display network transfer statistics for HTTP sources
        if !cli.is_quiet() {
            eprintln!(
                "\nTotal bytes transferred: {} of {}",
                format_size(source.transferred_bytes()),
                format_size(source.size())
            );
        }
    } else {
        let source = Arc::new(LocalFileSource::new(Path::new(&cli.url))?);
        process(source, &cli).await?;
    }

    Ok(())
}

/// Locate the inner archive, then either list it or extract the target file.
async fn process<R: RangeSource + 'static>(source: Arc<R>, cli: &Cli) -> Result<()> {
    let pattern = cli
        .pattern()
        .with_context(|| format!("invalid pattern {:?}", cli.pattern))?;
    let extractor = NestedExtractor::with_options(source, cli.resolver_options());
    let resolver = extractor.resolver();

    let inner = resolver
        .locate_intermediate(|name| pattern.is_match(name))
        .await?;
    if !cli.is_quiet() {
        println!(
            "Inner archive: {} at offset {}",
            inner.entry.file_name, inner.base
        );
    }

    if cli.list || cli.long {
        let entries = resolver.list_inner(&inner).await?;
        list_files(&entries, cli.long);
        return Ok(());
    }

    let payload = resolver.resolve_leaf(&inner, &cli.filename).await?;

    if cli.pipe {
        extractor.extract_to_stdout(&payload).await?;
        return Ok(());
    }

    let output_path = match cli.extract_dir {
        Some(ref dir) => PathBuf::from(dir).join(payload.output_path()),
        None => payload.output_path(),
    };

    if output_path.exists() && cli.never_overwrite {
        if !cli.is_quiet() {
            eprintln!("Skipping: {} (file exists)", output_path.display());
        }
        return Ok(());
    }

    if !cli.is_quiet() {
        println!(
            "  extracting: {} ({}, crc32 {:08x})",
            output_path.display(),
            format_size(payload.uncompressed_size),
            payload.crc32
        );
    }

    extractor.extract_to_file(&payload, &output_path).await?;

    Ok(())
}

/// Print inner archive entries, as names only or as a table.
fn list_files(entries: &[CentralDirectoryEntry], verbose: bool) {
    if verbose {
        println!(
            "{:>10}  {:>10}  {:>5}  {:>10}  {:>5}  Name",
            "Length", "Size", "Cmpr", "Date", "Time"
        );
        println!("{}", "-".repeat(70));
    }

    let mut total_uncompressed = 0u64;
    let mut total_compressed = 0u64;
    let mut file_count = 0usize;

    for entry in entries {
        if !verbose {
            println!("{}", entry.file_name);
            continue;
        }

        let (year, month, day) = entry.mod_date();
        let (hour, minute, _second) = entry.mod_time();
        println!(
            "{:>10}  {:>10}  {}  {:04}-{:02}-{:02}  {:02}:{:02}  {}",
            entry.uncompressed_size(),
            entry.compressed_size(),
            ratio(entry.compressed_size(), entry.uncompressed_size()),
            year,
            month,
            day,
            hour,
            minute,
            entry.file_name
        );

        if !entry.is_directory() {
            total_uncompressed += entry.uncompressed_size();
            total_compressed += entry.compressed_size();
            file_count += 1;
        }
    }

    if verbose {
        println!("{}", "-".repeat(70));
        println!(
            "{:>10}  {:>10}  {}  {:>21}  {} files",
            total_uncompressed,
            total_compressed,
            ratio(total_compressed, total_uncompressed),
            "",
            file_count
        );
    }
}

/// Space saved by compression, as a right-aligned percentage.
fn ratio(compressed: u64, uncompressed: u64) -> String {
    if uncompressed > 0 && compressed <= uncompressed {
        format!("{:>4}%", 100 - (compressed * 100 / uncompressed))
    } else {
        "  0%".to_string()
    }
}

/// Format a byte size into a human-readable string.
fn format_size(size: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if size >= GB {
        format!("{:.2} GB", size as f64 / GB as f64)
    } else if size >= MB {
        format!("{:.2} MB", size as f64 / MB as f64)
    } else if size >= KB {
        format!("{:.2} KB", size as f64 / KB as f64)
    } else {
        format!("{} bytes", size)
    }
}

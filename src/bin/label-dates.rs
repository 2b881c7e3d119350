//! Label Dates CLI tool
//!
//! A command-line tool for rewriting best-by dates on PDF product labels.

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use glob::glob;
use lopdf::Document;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use label_dates::batch::{run_all, RunReport};
use label_dates::config::{load_products, CONFIG_ENV_VAR, DEFAULT_CONFIG_FILE};
use label_dates::date::{check_shelf_life, compute_best_by, format_best_by, parse_date_expression, resolve_date};
use label_dates::pdf::{extract_metadata, find_matches, rewrite_pdf, LEAD_IN_PHRASES};
use label_dates::store::DirectoryStore;

/// Label Dates - Rewrite "Best if used by" dates on PDF labels
#[derive(Parser)]
#[command(name = "label-dates")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "EXAMPLES:
    # Rewrite every configured product under /srv/labels
    label-dates run --config products.toml --root /srv/labels

    # Rewrite local files for a 75 day shelf life
    label-dates rewrite -o out --shelf-life 75 \"labels/*.pdf\"

    # Show where the best-by labels are
    label-dates scan label.pdf

    # What date would be printed on 2024-01-01?
    label-dates best-by --shelf-life 75 --date 2024-01-01")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Archive, rewrite and republish the labels of every configured product
    Run {
        /// Product configuration file
        #[arg(short, long, env = CONFIG_ENV_VAR, default_value = DEFAULT_CONFIG_FILE)]
        config: PathBuf,

        /// Directory holding the source and archive locations
        #[arg(long)]
        root: PathBuf,

        /// Processing date (e.g., "today", "2024-01-01", "01/01/2024")
        #[arg(long)]
        date: Option<String>,
    },

    /// Rewrite local PDF files into an output directory
    Rewrite {
        /// Input PDF files. Supports glob patterns like "*.pdf"
        #[arg(required = true)]
        inputs: Vec<String>,

        /// Shelf life in days
        #[arg(long)]
        shelf_life: u32,

        /// Output directory
        #[arg(short, long)]
        output: PathBuf,

        /// Processing date (e.g., "today", "2024-01-01", "01/01/2024")
        #[arg(long)]
        date: Option<String>,
    },

    /// List the best-by labels found in a PDF file
    Scan {
        /// PDF file to inspect
        input: PathBuf,
    },

    /// Print the best-by date for a shelf life
    BestBy {
        /// Shelf life in days
        #[arg(long)]
        shelf_life: u32,

        /// Processing date (e.g., "today", "2024-01-01", "01/01/2024")
        #[arg(long)]
        date: Option<String>,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run { config, root, date } => cmd_run(&config, root, date),
        Commands::Rewrite { inputs, shelf_life, output, date } => {
            cmd_rewrite(inputs, shelf_life, &output, date)
        }
        Commands::Scan { input } => cmd_scan(&input),
        Commands::BestBy { shelf_life, date } => cmd_best_by(shelf_life, date),
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

/// Resolve the `--date` option, defaulting to today
fn processing_date(date: Option<String>) -> Result<NaiveDate> {
    let expr = parse_date_expression(date.as_deref().unwrap_or("today"))?;
    Ok(resolve_date(&expr))
}

/// Expand glob patterns in input paths
fn expand_globs(patterns: Vec<String>) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();

    for pattern in patterns {
        // Check if pattern contains glob characters
        if pattern.contains('*') || pattern.contains('?') || pattern.contains('[') {
            let mut matched = false;
            for entry in glob(&pattern)? {
                match entry {
                    Ok(path) => {
                        paths.push(path);
                        matched = true;
                    }
                    Err(e) => eprintln!("Warning: glob error for {}: {}", pattern, e),
                }
            }
            if !matched {
                bail!("No files matched pattern: {}", pattern);
            }
        } else {
            // No glob characters, treat as literal path
            paths.push(PathBuf::from(pattern));
        }
    }

    // Sort paths for consistent ordering
    paths.sort();

    Ok(paths)
}

/// Run every configured product against a directory store
fn cmd_run(config: &Path, root: PathBuf, date: Option<String>) -> Result<()> {
    let products = load_products(config)?;
    let today = processing_date(date)?;

    if !root.is_dir() {
        bail!("Store root not found: {}", root.display());
    }

    eprintln!("Processing {} products for {}...", products.len(), today);
    let mut store = DirectoryStore::new(root);
    let report = run_all(&mut store, &products, today)?;

    print_report(&report);

    if !report.is_success() {
        bail!("one or more products could not be processed");
    }
    Ok(())
}

fn print_report(report: &RunReport) {
    for product in &report.products {
        println!("{} (best-by {})", product.product, format_best_by(&product.best_by));
        if let Some(error) = &product.error {
            println!("  error: {}", error);
            continue;
        }
        for outcome in &product.outcomes {
            println!("  {}", outcome);
        }
        println!(
            "  {} updated, {} unchanged, {} failed",
            product.updated(),
            product.unchanged(),
            product.failed()
        );
    }
}

/// Rewrite local files, writing the results into `output`
fn cmd_rewrite(inputs: Vec<String>, shelf_life: u32, output: &Path, date: Option<String>) -> Result<()> {
    check_shelf_life(shelf_life).context("--shelf-life")?;
    let today = processing_date(date)?;
    let best_by = compute_best_by(today, shelf_life)?;

    // Expand glob patterns
    let inputs = expand_globs(inputs)?;

    // Validate inputs exist
    for path in &inputs {
        if !path.exists() {
            bail!("Input file not found: {}", path.display());
        }
    }

    fs::create_dir_all(output)
        .with_context(|| format!("cannot create {}", output.display()))?;

    eprintln!(
        "Rewriting {} PDF files (best-by {})...",
        inputs.len(),
        format_best_by(&best_by)
    );

    let mut failures = 0;
    for path in &inputs {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let target = output.join(&name);

        let result = fs::read(path)
            .with_context(|| format!("cannot read {}", path.display()))
            .and_then(|bytes| Ok(rewrite_pdf(&bytes, &name, today, shelf_life)?))
            .and_then(|rewrite| {
                fs::write(&target, &rewrite.content)
                    .with_context(|| format!("cannot write {}", target.display()))?;
                Ok(rewrite)
            });

        match result {
            Ok(rewrite) if rewrite.changed => {
                eprintln!("  {}: {} label(s) updated", name, rewrite.replaced);
            }
            Ok(_) => eprintln!("  {}: no best-by label, copied unchanged", name),
            Err(e) => {
                eprintln!("  {}: failed: {:#}", name, e);
                failures += 1;
            }
        }
    }

    eprintln!("Output: {}", output.display());

    if failures > 0 {
        bail!("{} of {} files failed", failures, inputs.len());
    }
    Ok(())
}

/// Print every best-by label in a PDF
fn cmd_scan(input: &Path) -> Result<()> {
    if !input.exists() {
        bail!("Input file not found: {}", input.display());
    }

    let doc = Document::load(input)
        .with_context(|| format!("cannot load {}", input.display()))?;
    let metadata = extract_metadata(&doc, &input.display().to_string())?;

    println!("File: {}", input.display());
    println!("Pages: {}", metadata.page_count);
    if let Some(title) = &metadata.title {
        println!("Title: {}", title);
    }

    let mut found = 0;
    for span in find_matches(&doc, &LEAD_IN_PHRASES) {
        let span = span?;
        found += 1;
        println!(
            "  page {} {} size {:.1} rotation {}: {}",
            span.page_index + 1,
            span.bbox,
            span.font_size,
            span.orientation.degrees(),
            span.original_text
        );
    }
    if found == 0 {
        println!("No best-by labels found");
    }

    Ok(())
}

/// Print the best-by date for a shelf life
fn cmd_best_by(shelf_life: u32, date: Option<String>) -> Result<()> {
    check_shelf_life(shelf_life).context("--shelf-life")?;
    let today = processing_date(date)?;
    println!("{}", format_best_by(&compute_best_by(today, shelf_life)?));
    Ok(())
}

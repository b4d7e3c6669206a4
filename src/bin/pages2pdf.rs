//! CLI binary for pages2pdf.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `AssemblerConfig`, runs one assembly and maps the outcome to an exit code:
//! 0 written, 1 pages need re-fetching, 2 fatal error.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use pages2pdf::{
    AssemblerConfig, AssemblyProgressCallback, ConversionResult, Document, FsStore, PageAssembler,
    PageError, ProgressCallback,
};
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

/// Short status for a bad page. Corrupt pages are only reported as removed
/// when the run actually deletes them.
fn page_error_label(error: &PageError, delete_corrupt: bool) -> &'static str {
    match error {
        PageError::Corrupt { .. } if delete_corrupt => "corrupt, removed",
        PageError::Corrupt { .. } => "corrupt, kept",
        PageError::Missing { .. } => "missing",
    }
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a bar across all pages plus one log line per
/// bad page.
struct CliProgressCallback {
    bar: ProgressBar,
    errors: AtomicUsize,
    delete_corrupt: bool,
}

impl CliProgressCallback {
    fn new(delete_corrupt: bool) -> Arc<Self> {
        let bar = ProgressBar::new(0); // length set in on_assembly_start
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} pages  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(style);
        bar.set_prefix("Scanning");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            errors: AtomicUsize::new(0),
            delete_corrupt,
        })
    }
}

impl AssemblyProgressCallback for CliProgressCallback {
    fn on_assembly_start(&self, total_pages: usize) {
        self.bar.set_length(total_pages as u64);
        self.bar.reset_eta();
    }

    fn on_page_start(&self, page_num: usize, _total: usize) {
        self.bar.set_message(format!("page {page_num}"));
    }

    fn on_page_complete(&self, _page_num: usize, _total: usize) {
        self.bar.inc(1);
    }

    fn on_page_error(&self, page_num: usize, total: usize, error: &PageError) {
        self.errors.fetch_add(1, Ordering::SeqCst);
        let what = page_error_label(error, self.delete_corrupt);
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}  {}",
            red("✗"),
            page_num,
            total,
            red(what),
            dim(&error.path().display().to_string()),
        ));
        self.bar.inc(1);
    }

    fn on_save_start(&self, output_path: &Path) {
        self.bar.set_prefix("Saving");
        self.bar
            .set_message(output_path.display().to_string());
    }

    fn on_assembly_complete(&self, total_pages: usize, success_count: usize) {
        self.bar.finish_and_clear();
        let failed = self.errors.load(Ordering::SeqCst);
        if failed == 0 {
            eprintln!(
                "{} {} pages assembled",
                green("✔"),
                bold(&success_count.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} pages usable  ({} to re-fetch)",
                cyan("⚠"),
                bold(&success_count.to_string()),
                total_pages,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Pages in ./42/42-1.jpg … ./42/42-20.jpg → "./42 Sample.pdf"
  pages2pdf 42 Sample 20

  # Pages stored elsewhere, PDF written next to them
  pages2pdf --working-dir ~/downloads 42 Sample 20

  # List pages that still need fetching, without assembling
  pages2pdf --pending 42 Sample 20

  # Machine-readable outcome
  pages2pdf --json 42 Sample 20 > result.json

OUTPUT DIRECTORY:
  Unless --output-dir is given, the PDF goes to <working-dir>/<alternate-dir>
  when that directory exists, otherwise to <working-dir>.

EXIT STATUS:
  0  PDF written (or, with --pending, nothing pending)
  1  one or more pages corrupt or missing; their numbers are printed
  2  fatal error
"#;

/// Assemble numbered page images into one PDF.
#[derive(Parser, Debug)]
#[command(
    name = "pages2pdf",
    version,
    about = "Assemble numbered page images into one PDF",
    long_about = "Assemble <ID>/<ID>-1.<ext> … <ID>/<ID>-<PAGES>.<ext> into '<ID> <TITLE>.pdf'. \
Pages that fail to decode are deleted so the next download pass fetches them again; \
no PDF is written unless every page is valid.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Document identifier; also the name of the page directory.
    id: String,

    /// Title used verbatim in the output file name.
    title: String,

    /// Number of pages.
    pages: usize,

    /// Directory containing the <ID> page directory.
    #[arg(long, env = "PAGES2PDF_WORKING_DIR", default_value = ".")]
    working_dir: PathBuf,

    /// Write the PDF here instead of resolving the output directory.
    #[arg(short, long, env = "PAGES2PDF_OUTPUT_DIR")]
    output_dir: Option<PathBuf>,

    /// Sub-directory of the working directory that receives PDFs when it
    /// exists. Empty disables the lookup.
    #[arg(long, env = "PAGES2PDF_ALTERNATE_DIR", default_value = pages2pdf::DEFAULT_ALTERNATE_DIR)]
    alternate_dir: String,

    /// Page file extension.
    #[arg(long, env = "PAGES2PDF_EXT", default_value = "jpg")]
    ext: String,

    /// JPEG quality for embedded pages (1–100).
    #[arg(long, env = "PAGES2PDF_QUALITY", default_value_t = 90,
          value_parser = clap::value_parser!(u8).range(1..=100))]
    quality: u8,

    /// Pixel density used to size pages (36–600).
    #[arg(long, env = "PAGES2PDF_DPI", default_value_t = 72,
          value_parser = clap::value_parser!(u32).range(36..=600))]
    dpi: u32,

    /// Background for transparent pixels, as RRGGBB hex.
    #[arg(long, env = "PAGES2PDF_BACKGROUND", default_value = "FFFFFF", value_parser = parse_hex_color)]
    background: [u8; 3],

    /// Leave corrupt page files in place.
    #[arg(long, env = "PAGES2PDF_KEEP_CORRUPT")]
    keep_corrupt: bool,

    /// Fail instead of replacing an existing PDF.
    #[arg(long, env = "PAGES2PDF_NO_CLOBBER")]
    no_clobber: bool,

    /// Do not write a PDF Info dictionary.
    #[arg(long, env = "PAGES2PDF_NO_METADATA")]
    no_metadata: bool,

    /// Only list pages whose files are absent.
    #[arg(long)]
    pending: bool,

    /// Print the outcome as JSON on stdout.
    #[arg(long, env = "PAGES2PDF_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "PAGES2PDF_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PAGES2PDF_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PAGES2PDF_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // INFO lines duplicate what the progress bar shows, so they are hidden
    // while it is active.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.pending;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    match run(&cli, show_progress).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {:#}", red("error:"), e);
            ExitCode::from(2)
        }
    }
}

async fn run(cli: &Cli, show_progress: bool) -> Result<ExitCode> {
    let document =
        Document::new(cli.id.as_str(), cli.title.as_str(), cli.pages).context("Invalid document")?;

    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new(!cli.keep_corrupt) as Arc<dyn AssemblyProgressCallback>)
    } else {
        None
    };
    let assembler = PageAssembler::new(build_config(cli, progress_cb)?);

    // ── Pending-only mode ────────────────────────────────────────────────
    if cli.pending {
        let pending = assembler.pending_pages(&document);
        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&pending).context("Failed to serialise pages")?
            );
        } else if !pending.is_empty() {
            println!("{}", join_pages(&pending));
        }
        return Ok(if pending.is_empty() {
            ExitCode::SUCCESS
        } else {
            ExitCode::from(1)
        });
    }

    // ── Run assembly ─────────────────────────────────────────────────────
    let result = assembler
        .convert_async(document)
        .await
        .context("Assembly failed")?;

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&result).context("Failed to serialise result")?
        );
    }

    match result {
        ConversionResult::Success(report) => {
            if !cli.quiet && !cli.json {
                eprintln!(
                    "{}  {} pages  {}  {}ms  →  {}",
                    green("✔"),
                    report.page_count,
                    dim(&format!("{} bytes", report.bytes_written)),
                    report.total_duration_ms,
                    bold(&report.output_path.display().to_string()),
                );
            }
            Ok(ExitCode::SUCCESS)
        }
        ConversionResult::Failure(failures) => {
            if !cli.json {
                // Stdout carries only the page list so scripts can feed it
                // straight back to the fetcher.
                println!("{}", join_pages(&failures.pages_to_refetch()));
                if !cli.quiet {
                    eprintln!(
                        "{}  no PDF written: {} corrupt, {} missing",
                        red("✘"),
                        failures.corrupt_pages().len(),
                        failures.missing_pages().len(),
                    );
                }
            }
            Ok(ExitCode::from(1))
        }
    }
}

/// Map CLI args to `AssemblerConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<AssemblerConfig> {
    let mut builder = AssemblerConfig::builder()
        .working_dir(&cli.working_dir)
        .image_extension(cli.ext.as_str())
        .jpeg_quality(cli.quality)
        .dpi(cli.dpi)
        .background(cli.background)
        .delete_corrupt(!cli.keep_corrupt)
        .overwrite(!cli.no_clobber)
        .write_metadata(!cli.no_metadata);

    builder = match cli.output_dir {
        Some(ref dir) => builder.output_dir(dir),
        None => builder.resolve_output_dir(&FsStore, &cli.alternate_dir),
    };

    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Parse `RRGGBB` (optionally `#`-prefixed) into an RGB triple.
fn parse_hex_color(s: &str) -> Result<[u8; 3]> {
    let hex = s.trim().trim_start_matches('#');
    if hex.len() != 6 || !hex.is_ascii() {
        anyhow::bail!("Expected RRGGBB, got '{}'", s);
    }
    let channel = |i: usize| {
        u8::from_str_radix(&hex[i..i + 2], 16)
            .with_context(|| format!("Invalid hex colour '{}'", s))
    };
    Ok([channel(0)?, channel(2)?, channel(4)?])
}

fn join_pages(pages: &[usize]) -> String {
    pages
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corrupt_label_follows_keep_corrupt() {
        let corrupt = PageError::Corrupt {
            page: 2,
            path: PathBuf::from("9/9-2.jpg"),
            detail: "bad".into(),
        };
        let missing = PageError::Missing {
            page: 3,
            path: PathBuf::from("9/9-3.jpg"),
        };

        assert_eq!(page_error_label(&corrupt, true), "corrupt, removed");
        assert_eq!(page_error_label(&corrupt, false), "corrupt, kept");
        assert_eq!(page_error_label(&missing, true), "missing");
        assert_eq!(page_error_label(&missing, false), "missing");
    }

    #[test]
    fn hex_colour_parsing() {
        assert_eq!(parse_hex_color("#ff8000").unwrap(), [255, 128, 0]);
        assert_eq!(parse_hex_color("FFFFFF").unwrap(), [255, 255, 255]);
        assert!(parse_hex_color("fff").is_err());
        assert!(parse_hex_color("gg0000").is_err());
    }

    #[test]
    fn pages_joined_with_spaces() {
        assert_eq!(join_pages(&[2, 5, 9]), "2 5 9");
        assert_eq!(join_pages(&[]), "");
    }
}

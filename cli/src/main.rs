//! djvu2pdf CLI - DjVu to searchable PDF converter

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use djvu2pdf::convert::extract_text;
use djvu2pdf::render::to_json;
use djvu2pdf::{
    detect_format_from_path, open, ConvertOptions, Converter, DocumentSource, ImageMode,
    JsonFormat, OutlineItem, PageRefPolicy, PageSelection, WithBackgrounds,
};

#[derive(Parser)]
#[command(name = "djvu2pdf")]
#[command(version)]
#[command(about = "Convert DjVu documents to PDF with a text layer and bookmarks", long_about = None)]
struct Cli {
    #[command(flatten)]
    convert: ConvertArgs,

    /// Display debug messages
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a DjVu file to PDF
    Convert {
        #[command(flatten)]
        args: ConvertArgs,
    },

    /// Print the hidden text of a DjVu file
    Text {
        /// Input DjVu file
        #[arg(value_name = "SRC")]
        input: PathBuf,

        /// Output file (stdout if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Page range (e.g., "1-10", "1,3,5")
        #[arg(long)]
        pages: Option<String>,
    },

    /// Print the outline of a DjVu file as JSON
    Outline {
        /// Input DjVu file
        #[arg(value_name = "SRC")]
        input: PathBuf,

        /// Output compact JSON
        #[arg(long)]
        compact: bool,

        /// Offset added to every bookmark target
        #[arg(long, default_value = "0", allow_hyphen_values = true)]
        toc_offset: i64,

        /// How to read page references
        #[arg(long, value_enum, default_value = "hash-number")]
        page_ref: PageRef,
    },

    /// Show document information
    Info {
        /// Input DjVu file
        #[arg(value_name = "SRC")]
        input: PathBuf,
    },

    /// Show version information
    Version,
}

#[derive(Args)]
struct ConvertArgs {
    /// Input DjVu file
    #[arg(value_name = "SRC")]
    input: Option<PathBuf>,

    /// Output PDF file (defaults to SRC with a .pdf extension)
    #[arg(value_name = "DEST")]
    output: Option<PathBuf>,

    /// Overwrite the destination file
    #[arg(short, long)]
    overwrite: bool,

    /// Offset added to every bookmark target
    #[arg(long, default_value = "0", allow_hyphen_values = true)]
    toc_offset: i64,

    /// How to read page references
    #[arg(long, value_enum, default_value = "hash-number")]
    page_ref: PageRef,

    /// How page images are rendered with ddjvu
    #[arg(short = 'm', long, value_enum, default_value = "rgb")]
    mode: Mode,

    /// Directory holding page_bg_<n>.jpg backgrounds, used before rendering
    #[arg(long, value_name = "DIR")]
    backgrounds: Option<PathBuf>,

    /// Process pages one at a time
    #[arg(long)]
    sequential: bool,

    /// Number of worker threads (0 = one per CPU)
    #[arg(short, long, default_value = "0", env = "DJVU2PDF_JOBS")]
    jobs: usize,

    /// Page range (e.g., "1-10", "1,3,5")
    #[arg(long)]
    pages: Option<String>,

    /// Do not write the text layer
    #[arg(long)]
    no_text: bool,

    /// Do not write the outline
    #[arg(long)]
    no_outline: bool,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum PageRef {
    /// Only references of the form "#<number>"
    HashNumber,
    /// First run of digits anywhere in the reference
    FirstDigits,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Color page images
    Rgb,
    /// Grayscale page images
    Grayscale,
    /// Text and bookmarks only
    #[value(name = "none")]
    TextOnly,
}

impl From<Mode> for Option<ImageMode> {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Rgb => Some(ImageMode::Rgb),
            Mode::Grayscale => Some(ImageMode::Grayscale),
            Mode::TextOnly => None,
        }
    }
}

impl From<PageRef> for PageRefPolicy {
    fn from(page_ref: PageRef) -> Self {
        match page_ref {
            PageRef::FirstDigits => PageRefPolicy::FirstDigitRun,
            PageRef::HashNumber => PageRefPolicy::HashNumber,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Convert { args }) => cmd_convert(&args),
        Some(Commands::Text {
            input,
            output,
            pages,
        }) => cmd_text(&input, output.as_deref(), pages.as_deref()),
        Some(Commands::Outline {
            input,
            compact,
            toc_offset,
            page_ref,
        }) => cmd_outline(&input, compact, toc_offset, page_ref),
        Some(Commands::Info { input }) => cmd_info(&input),
        Some(Commands::Version) => {
            cmd_version();
            Ok(())
        }
        None => {
            // Default behavior: convert if input is provided
            if cli.convert.input.is_some() {
                cmd_convert(&cli.convert)
            } else {
                println!("{}", "Usage: djvu2pdf <SRC> [DEST]".yellow());
                println!("       djvu2pdf --help for more information");
                Ok(())
            }
        }
    };

    if let Err(e) = result {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

fn parse_pages(pages: Option<&str>) -> Result<PageSelection, Box<dyn std::error::Error>> {
    Ok(match pages {
        Some(p) => PageSelection::parse(p)?,
        None => PageSelection::All,
    })
}

/// Destination for `input` when none is given: same name, `.pdf`, current directory.
fn default_output(input: &Path) -> PathBuf {
    let name = input.file_name().map(PathBuf::from).unwrap_or_default();
    name.with_extension("pdf")
}

fn cmd_convert(args: &ConvertArgs) -> Result<(), Box<dyn std::error::Error>> {
    let input = args.input.as_deref().ok_or("No input file given")?;
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| default_output(input));

    if output.exists() && !args.overwrite {
        return Err(format!(
            "File {} already exists (use --overwrite to replace it)",
            output.display()
        )
        .into());
    }

    let options = ConvertOptions::new()
        .with_toc_page_offset(args.toc_offset)
        .with_page_ref_policy(args.page_ref.into())
        .with_parallel(!args.sequential)
        .with_text_layer(!args.no_text)
        .with_outline(!args.no_outline)
        .with_pages(parse_pages(args.pages.as_deref())?);

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(args.jobs)
        .build()?;

    let source = open(input)?.with_image_mode(args.mode.into());
    let pb = spinner();
    pb.set_message(format!("Converting {}...", input.display()));
    let start = Instant::now();

    let converter = Converter::new(options);
    let result = match &args.backgrounds {
        Some(dir) => {
            let source = WithBackgrounds::new(&source, dir);
            pool.install(|| converter.convert(&source))
        }
        None => pool.install(|| converter.convert(&source)),
    };
    let result = match result {
        Ok(result) => result,
        Err(e) => {
            pb.finish_and_clear();
            return Err(e.into());
        }
    };

    fs::write(&output, &result.pdf)?;
    pb.finish_and_clear();

    println!(
        "{} {} ({}) in {:.2}s",
        "Saved to".green(),
        output.display(),
        human_readable_size(result.len() as u64),
        start.elapsed().as_secs_f64()
    );
    println!(
        "  {} {} pages, {} text runs",
        "├─".dimmed(),
        result.page_count,
        result.stats.text_runs
    );
    if result.stats.pages_without_text > 0 {
        println!(
            "  {} {}",
            "├─".dimmed(),
            format!("{} pages without text", result.stats.pages_without_text).yellow()
        );
    }
    println!("  {} {} bookmarks", "└─".dimmed(), result.outline_items);

    Ok(())
}

fn spinner() -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg} [{elapsed}]")
            .unwrap(),
    );
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

fn cmd_text(
    input: &Path,
    output: Option<&Path>,
    pages: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let source = open(input)?;
    let text = extract_text(&source, &parse_pages(pages)?)?;

    if let Some(path) = output {
        fs::write(path, &text)?;
        println!("{} {}", "Saved to".green(), path.display());
    } else {
        println!("{}", text);
    }

    Ok(())
}

fn cmd_outline(
    input: &Path,
    compact: bool,
    toc_offset: i64,
    page_ref: PageRef,
) -> Result<(), Box<dyn std::error::Error>> {
    let source = open(input)?;
    let options = ConvertOptions::new()
        .with_toc_page_offset(toc_offset)
        .with_page_ref_policy(page_ref.into());
    let items = Converter::new(options).outline_items(&source)?;

    let format = if compact {
        JsonFormat::Compact
    } else {
        JsonFormat::Pretty
    };
    println!("{}", to_json(&items, format)?);

    Ok(())
}

fn cmd_info(input: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let format = detect_format_from_path(input)?;
    let source = open(input)?;
    let pages = source.page_count()?;
    let bookmarks: usize = Converter::default()
        .outline_items(&source)?
        .iter()
        .map(OutlineItem::total_items)
        .sum();

    println!("{}", "Document Information".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());

    println!("{}: {}", "File".bold(), input.display());
    println!("{}: {}", "Format".bold(), format);
    println!(
        "{}: {}",
        "Size".bold(),
        human_readable_size(fs::metadata(input)?.len())
    );
    println!("{}: {}", "Pages".bold(), pages);
    if pages > 0 {
        let (width, height) = source.page_size(0)?;
        println!("{}: {}x{}", "First page".bold(), width, height);
    }
    println!("{}: {}", "Bookmarks".bold(), bookmarks);

    Ok(())
}

fn cmd_version() {
    println!("{} {}", "djvu2pdf".cyan().bold(), env!("CARGO_PKG_VERSION"));
    println!("DjVu to searchable PDF converter");
    println!();
    println!("Requires: djvused (djvulibre)");
    println!("License: MIT");
}

/// Format a byte count as bytes, KiB or MiB.
fn human_readable_size(size: u64) -> String {
    const KIB: u64 = 1024;
    const MIB: u64 = 1024 * KIB;

    if size < KIB {
        format!("{} bytes", size)
    } else if size < MIB {
        format!("{:.2} KiB", size as f64 / KIB as f64)
    } else {
        format!("{:.2} MiB", size as f64 / MIB as f64)
    }
}

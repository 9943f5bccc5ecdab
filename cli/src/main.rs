//! pdfparts CLI - raw PDF element extraction tool

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::thread;

use clap::{Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use pdfparts::{
    parse_document_with_options, parse_documents_with_progress, save_json, to_json, BatchEvent,
    ExtractSet, ImageOutput, JsonFormat, PageSelection, ParseOptions,
};

type CliResult = Result<(), Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(name = "pdfparts")]
#[command(version)]
#[command(about = "Extract text blocks, tables and image references from PDF files", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a PDF and print or save the raw elements as JSON
    Parse {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output file (stdout if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Output compact JSON
        #[arg(long)]
        compact: bool,

        /// Page range (e.g., "1-10", "1,3,5")
        #[arg(long)]
        pages: Option<String>,

        /// Write images into this directory
        #[arg(long, value_name = "DIR", conflicts_with = "temp_images")]
        images: Option<PathBuf>,

        /// Write images into a temporary directory (removed on exit)
        #[arg(long)]
        temp_images: bool,

        /// Extract text blocks only
        #[arg(long)]
        text_only: bool,

        /// Skip pages whose content cannot be read instead of failing
        #[arg(long)]
        lenient: bool,
    },

    /// Show document information
    Info {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Print the information as JSON
        #[arg(long)]
        json: bool,
    },

    /// Extract images from PDF
    Extract {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output directory
        #[arg(short, long, value_name = "DIR")]
        output: Option<PathBuf>,

        /// Page range (e.g., "1-10", "1,3,5")
        #[arg(long)]
        pages: Option<String>,
    },

    /// Parse several PDFs in parallel, one JSON file per input
    Batch {
        /// Input PDF files
        #[arg(value_name = "FILE", required = true)]
        inputs: Vec<PathBuf>,

        /// Output directory
        #[arg(short, long, value_name = "DIR")]
        output: PathBuf,

        /// Output compact JSON
        #[arg(long)]
        compact: bool,

        /// Extract text blocks only
        #[arg(long)]
        text_only: bool,

        /// Skip pages whose content cannot be read instead of failing
        #[arg(long)]
        lenient: bool,
    },

    /// Show version information
    Version,
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Parse {
            input,
            output,
            compact,
            pages,
            images,
            temp_images,
            text_only,
            lenient,
        } => {
            let image_output = match (images, temp_images) {
                (Some(dir), _) => ImageOutput::Directory(dir),
                (None, true) => ImageOutput::TempDir,
                (None, false) => ImageOutput::None,
            };
            build_options(pages.as_deref(), text_only, lenient)
                .map(|options| options.with_image_output(image_output))
                .and_then(|options| cmd_parse(&input, output.as_deref(), compact, options))
        }
        Commands::Info { input, json } => cmd_info(&input, json),
        Commands::Extract {
            input,
            output,
            pages,
        } => cmd_extract(&input, output.as_deref(), pages.as_deref()),
        Commands::Batch {
            inputs,
            output,
            compact,
            text_only,
            lenient,
        } => build_options(None, text_only, lenient)
            .and_then(|options| cmd_batch(&inputs, &output, compact, options)),
        Commands::Version => {
            cmd_version();
            Ok(())
        }
    };

    if let Err(e) = result {
        match e.downcast_ref::<pdfparts::Error>() {
            Some(err) => eprintln!("{} ({}): {}", "Error".red().bold(), err.kind(), err),
            None => eprintln!("{}: {}", "Error".red().bold(), e),
        }
        std::process::exit(1);
    }
}

fn page_selection(pages: Option<&str>) -> Result<PageSelection, Box<dyn std::error::Error>> {
    match pages {
        Some(p) => Ok(PageSelection::parse(p)?),
        None => Ok(PageSelection::All),
    }
}

fn build_options(
    pages: Option<&str>,
    text_only: bool,
    lenient: bool,
) -> Result<ParseOptions, Box<dyn std::error::Error>> {
    let mut options = ParseOptions::new().with_pages(page_selection(pages)?);
    if text_only {
        options = options.text_only();
    }
    if lenient {
        options = options.lenient();
    }
    Ok(options)
}

fn json_format(compact: bool) -> JsonFormat {
    if compact {
        JsonFormat::Compact
    } else {
        JsonFormat::Pretty
    }
}

fn cmd_parse(input: &Path, output: Option<&Path>, compact: bool, options: ParseOptions) -> CliResult {
    let result = parse_document_with_options(input, options)?;
    let format = json_format(compact);

    if let Some(path) = output {
        save_json(&result, path, format)?;
        let counts = result.counts();
        println!(
            "{} {} ({} text, {} tables, {} images)",
            "Saved to".green(),
            path.display(),
            counts.text,
            counts.tables,
            counts.images
        );
    } else {
        println!("{}", to_json(&result, format)?);
    }

    Ok(())
}

fn cmd_info(input: &Path, json: bool) -> CliResult {
    // Show metadata even if some page content cannot be read
    let options = ParseOptions::new().lenient();
    let doc = parse_document_with_options(input, options)?;
    let counts = doc.counts();

    if json {
        let value = serde_json::json!({
            "metadata": doc.metadata,
            "counts": counts,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    let meta = &doc.metadata;
    println!("{}", "Document Information".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());

    println!("{}: {}", "File".bold(), input.display());
    println!("{}: PDF {}", "Format".bold(), meta.pdf_version);
    println!("{}: {}", "Pages".bold(), meta.page_count);
    println!(
        "{}: {}",
        "Encrypted".bold(),
        if meta.encrypted { "Yes" } else { "No" }
    );

    let fields = [
        ("Title", &meta.title),
        ("Author", &meta.author),
        ("Subject", &meta.subject),
        ("Keywords", &meta.keywords),
        ("Creator", &meta.creator),
        ("Producer", &meta.producer),
    ];
    for (label, value) in fields {
        if let Some(value) = value {
            println!("{}: {}", label.bold(), value);
        }
    }
    if let Some(ref created) = meta.created {
        println!("{}: {}", "Created".bold(), created);
    }
    if let Some(ref modified) = meta.modified {
        println!("{}: {}", "Modified".bold(), modified);
    }

    println!();
    println!("{}", "Raw Elements".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());

    let text = doc.plain_text();
    println!("{}: {}", "Text blocks".bold(), counts.text);
    println!("{}: {}", "Tables".bold(), counts.tables);
    println!("{}: {}", "Images".bold(), counts.images);
    println!("{}: {}", "Words".bold(), text.split_whitespace().count());

    Ok(())
}

fn cmd_extract(input: &Path, output: Option<&Path>, pages: Option<&str>) -> CliResult {
    let output_dir = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));

    let options = ParseOptions::new()
        .with_pages(page_selection(pages)?)
        .with_extract(ExtractSet {
            text: false,
            tables: false,
            images: true,
        })
        .with_image_dir(&output_dir);
    let doc = parse_document_with_options(input, options)?;

    let mut count = 0;
    for (name, meta) in doc.images() {
        println!("{} {} ({})", "Extracted".green(), name, meta.format.mime_type());
        count += 1;
    }

    println!(
        "\n{} {} images extracted to {}",
        "Done!".green().bold(),
        count,
        output_dir.display()
    );

    Ok(())
}

/// Output file name for an input, unique within the batch.
fn batch_output_name(input: &Path, used: &mut HashSet<String>) -> String {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "document".to_string());
    let mut name = format!("{stem}.json");
    let mut n = 1;
    while !used.insert(name.clone()) {
        name = format!("{stem}_{n}.json");
        n += 1;
    }
    name
}

fn cmd_batch(inputs: &[PathBuf], output: &Path, compact: bool, options: ParseOptions) -> CliResult {
    fs::create_dir_all(output)?;

    let pb = ProgressBar::new(inputs.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("#>-"),
    );

    let (tx, rx) = crossbeam_channel::unbounded();
    let items = thread::scope(|scope| {
        let worker = scope.spawn(|| {
            let items = parse_documents_with_progress(inputs, &options, &tx);
            drop(tx);
            items
        });

        for event in rx.iter() {
            match event {
                BatchEvent::Parsed { path, .. } => {
                    pb.set_message(path.display().to_string());
                }
                BatchEvent::Failed { path, kind, .. } => {
                    pb.println(format!("{} {} ({})", "Failed".red(), path.display(), kind));
                }
            }
            pb.inc(1);
        }

        worker.join()
    })
    .map_err(|_| "batch worker panicked")?;
    pb.finish_with_message("Done!");

    let format = json_format(compact);
    let mut used = HashSet::new();
    let mut failed = 0;
    for item in &items {
        let name = batch_output_name(&item.path, &mut used);
        match &item.result {
            Ok(result) => {
                save_json(result, output.join(&name), format)?;
                println!("  {} {}", "├─".dimmed(), name);
            }
            Err(e) => {
                failed += 1;
                eprintln!("  {} {}: {}", "✗".red(), item.path.display(), e);
            }
        }
    }

    println!(
        "\n{} {} parsed, {} failed",
        "Done!".green().bold(),
        items.len() - failed,
        failed
    );

    if failed > 0 {
        return Err(format!("{failed} of {} documents failed", items.len()).into());
    }
    Ok(())
}

fn cmd_version() {
    println!("{} {}", "pdfparts".cyan().bold(), env!("CARGO_PKG_VERSION"));
    println!("Raw element extraction from PDF documents");
    println!();
    println!("License: MIT");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_output_name_unique() {
        let mut used = HashSet::new();
        assert_eq!(batch_output_name(Path::new("a/report.pdf"), &mut used), "report.json");
        assert_eq!(batch_output_name(Path::new("b/report.pdf"), &mut used), "report_1.json");
        assert_eq!(batch_output_name(Path::new("c/report.pdf"), &mut used), "report_2.json");
    }

    #[test]
    fn test_build_options() {
        let options = build_options(Some("2-4"), true, true).unwrap();
        assert_eq!(options.pages, PageSelection::Range(2..=4));
        assert!(!options.extract.images);
        assert_eq!(options.error_mode, pdfparts::ErrorMode::Lenient);

        assert!(build_options(Some("0"), false, false).is_err());
    }

    #[test]
    fn test_cli_parses_subcommands() {
        let cli = Cli::try_parse_from(["pdfparts", "parse", "in.pdf", "--temp-images", "--compact"])
            .unwrap();
        assert!(matches!(
            cli.command,
            Commands::Parse {
                temp_images: true,
                compact: true,
                ..
            }
        ));

        let cli = Cli::try_parse_from(["pdfparts", "batch", "a.pdf", "b.pdf", "-o", "out"]).unwrap();
        match cli.command {
            Commands::Batch { inputs, output, .. } => {
                assert_eq!(inputs.len(), 2);
                assert_eq!(output, PathBuf::from("out"));
            }
            _ => panic!("expected batch"),
        }

        assert!(Cli::try_parse_from(["pdfparts", "parse", "in.pdf", "--images", "d", "--temp-images"])
            .is_err());
    }
}

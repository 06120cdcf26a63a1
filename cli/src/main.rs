//! docmark CLI - Word/PDF to Markdown conversion tool

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use docmark::render::{full_text, to_json};
use docmark::{
    ConversionResult, ConvertOptions, Converter, ErrorMode, ExtractionStats, ImageLayout,
    JsonFormat, OutlineTree,
};

#[derive(Parser)]
#[command(name = "docmark")]
#[command(version)]
#[command(about = "Convert Word and PDF documents to Markdown bundles", long_about = None)]
struct Cli {
    /// Input document
    #[arg(value_name = "FILE")]
    input: Option<PathBuf>,

    /// Output directory
    #[arg(short, long, value_name = "DIR", env = "DOCMARK_OUTPUT_DIR")]
    output: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert documents to Markdown with extracted images
    Convert {
        /// Input documents (.docx, .doc, .pdf)
        #[arg(value_name = "FILE", required = true)]
        inputs: Vec<PathBuf>,

        /// Output directory
        #[arg(short, long, value_name = "DIR", env = "DOCMARK_OUTPUT_DIR")]
        output: Option<PathBuf>,

        /// Write images to {base}_images/ instead of images/
        #[arg(long)]
        per_document_images: bool,

        /// Keep images in their source encoding
        #[arg(long)]
        no_transcode: bool,

        /// Skip unreadable pages instead of failing
        #[arg(long)]
        lenient: bool,

        /// Include YAML frontmatter with metadata and outline
        #[arg(short, long)]
        frontmatter: bool,

        /// Print the conversion results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the document outline
    Outline {
        /// Input document
        #[arg(value_name = "FILE")]
        input: PathBuf,
    },

    /// Print the document text (headings and paragraphs)
    Text {
        /// Input document
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output file (stdout if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Show document information
    Info {
        /// Input document
        #[arg(value_name = "FILE")]
        input: PathBuf,
    },

    /// Show version information
    Version,
}

struct ConvertFlags {
    per_document_images: bool,
    no_transcode: bool,
    lenient: bool,
    frontmatter: bool,
    json: bool,
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let result = match cli.command {
        Some(Commands::Convert {
            inputs,
            output,
            per_document_images,
            no_transcode,
            lenient,
            frontmatter,
            json,
        }) => cmd_convert(
            &inputs,
            output.as_deref(),
            ConvertFlags {
                per_document_images,
                no_transcode,
                lenient,
                frontmatter,
                json,
            },
        ),
        Some(Commands::Outline { input }) => cmd_outline(&input),
        Some(Commands::Text { input, output }) => cmd_text(&input, output.as_deref()),
        Some(Commands::Info { input }) => cmd_info(&input),
        Some(Commands::Version) => {
            cmd_version();
            Ok(())
        }
        None => {
            // Default behavior: convert if input is provided
            if let Some(input) = cli.input {
                cmd_convert(
                    &[input],
                    cli.output.as_deref(),
                    ConvertFlags {
                        per_document_images: false,
                        no_transcode: false,
                        lenient: false,
                        frontmatter: false,
                        json: false,
                    },
                )
            } else {
                println!("{}", "Usage: docmark <FILE> [-o DIR]".yellow());
                println!("       docmark --help for more information");
                Ok(())
            }
        }
    };

    if let Err(e) = result {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn cmd_convert(
    inputs: &[PathBuf],
    output: Option<&Path>,
    flags: ConvertFlags,
) -> Result<(), Box<dyn std::error::Error>> {
    let output_dir = output
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."));

    let mut options = ConvertOptions::new(&output_dir)
        .with_frontmatter(flags.frontmatter)
        .with_transcoding(!flags.no_transcode);
    if flags.per_document_images {
        options = options.with_image_layout(ImageLayout::PerDocument);
    }
    if flags.lenient {
        options = options.with_error_mode(ErrorMode::Lenient);
    }
    let converter = Converter::new(options);
    log::debug!("Converting {} input(s) into {}", inputs.len(), output_dir.display());

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap(),
    );
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_message(format!("Converting {} document(s)...", inputs.len()));

    let results = converter.convert_many(inputs);
    pb.finish_and_clear();

    let mut converted: Vec<ConversionResult> = Vec::new();
    let mut failures = 0usize;
    for (input, result) in inputs.iter().zip(results) {
        match result {
            Ok(result) => converted.push(result),
            Err(e) => {
                failures += 1;
                eprintln!("{} {}: {}", "Failed".red().bold(), input.display(), e);
            }
        }
    }

    if flags.json {
        for result in &converted {
            println!("{}", to_json(result, JsonFormat::Pretty)?);
        }
    } else {
        println!("{}", "Output files:".green().bold());
        for result in &converted {
            println!("  {} {}", "├─".dimmed(), result.markdown_path.display());
            for image in &result.image_files {
                println!("  {}   {}", "│".dimmed(), image.dimmed());
            }
        }
        println!(
            "  {} {} converted, {} failed",
            "└─".dimmed(),
            converted.len(),
            failures
        );
    }

    if failures > 0 {
        return Err(format!("{} of {} documents failed", failures, inputs.len()).into());
    }
    Ok(())
}

fn cmd_outline(input: &Path) -> Result<(), Box<dyn std::error::Error>> {
    // Outline only needs structure; keep going past unreadable pages
    let extraction = docmark::extract(input, ErrorMode::Lenient)?;
    let tree = OutlineTree::build(&extraction.outline);

    if tree.is_empty() {
        println!("{}", "No outline".dimmed());
        return Ok(());
    }

    for (depth, title) in tree.flatten() {
        println!("{}{} {}", "  ".repeat(depth - 1), "•".cyan(), title);
    }
    Ok(())
}

fn cmd_text(input: &Path, output: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let extraction = docmark::extract(input, ErrorMode::Lenient)?;
    let text = full_text(&extraction.blocks);

    if let Some(path) = output {
        fs::write(path, &text)?;
        println!("{} {}", "Saved to".green(), path.display());
    } else {
        print!("{}", text);
    }

    Ok(())
}

fn cmd_info(input: &Path) -> Result<(), Box<dyn std::error::Error>> {
    // Show metadata even if some pages fail
    let extraction = docmark::extract(input, ErrorMode::Lenient)?;
    let metadata = &extraction.metadata;

    println!("{}", "Document Information".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());

    println!("{}: {}", "File".bold(), input.display());
    if let Some(format) = metadata.format {
        println!("{}: {:?}", "Format".bold(), format);
    }
    if let Some(pages) = metadata.page_count {
        println!("{}: {}", "Pages".bold(), pages);
    }
    if let Some(ref title) = metadata.title {
        println!("{}: {}", "Title".bold(), title);
    }
    if let Some(ref author) = metadata.author {
        println!("{}: {}", "Author".bold(), author);
    }
    if let Some(ref created) = metadata.created {
        println!("{}: {}", "Created".bold(), created);
    }
    if let Some(ref modified) = metadata.modified {
        println!("{}: {}", "Modified".bold(), modified);
    }

    let mut stats = ExtractionStats::from_blocks(&extraction.blocks);
    stats.merge(&extraction.stats);

    println!();
    println!("{}", "Content Statistics".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());
    println!("{}: {}", "Headings".bold(), stats.heading_count);
    println!("{}: {}", "Paragraphs".bold(), stats.paragraph_count);
    println!("{}: {}", "Tables".bold(), stats.table_count);
    println!("{}: {}", "Images".bold(), stats.image_count);
    if stats.skipped_images > 0 {
        println!("{}: {}", "Skipped images".bold(), stats.skipped_images);
    }
    println!("{}: {}", "Words".bold(), stats.word_count);
    println!("{}: {}", "Characters".bold(), stats.char_count);
    println!("{}: {}", "Outline entries".bold(), extraction.outline.len());

    if !extraction.warnings.is_empty() {
        println!("{}: {}", "Warnings".yellow().bold(), extraction.warnings.len());
    }

    Ok(())
}

fn cmd_version() {
    println!("{} {}", "docmark".cyan().bold(), env!("CARGO_PKG_VERSION"));
    println!("Word and PDF to Markdown conversion tool");
    println!();
    println!("License: MIT");
}

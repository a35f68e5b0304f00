//! md2hwpx CLI - document AST to HWPX converter

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use colored::Colorize;

use md2hwpx::{Block, ConvertOptions, Document, Inline, Md2Hwpx};

#[derive(Parser)]
#[command(name = "md2hwpx")]
#[command(author = "iyulab")]
#[command(version)]
#[command(about = "Convert document ASTs to HWPX packages", long_about = None)]
struct Cli {
    /// Input document AST (JSON)
    #[arg(value_name = "FILE")]
    input: Option<PathBuf>,

    /// Output package path
    #[arg(value_name = "OUTPUT")]
    output: Option<PathBuf>,

    /// Reference package supplying styles and page setup
    #[arg(long, value_name = "FILE")]
    reference_doc: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a document AST to an HWPX package
    Convert {
        /// Input document AST (JSON)
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output package path (input name with .hwpx if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Reference package supplying styles and page setup
        #[arg(long, value_name = "FILE")]
        reference_doc: Option<PathBuf>,

        /// Package title (the document's own title if not specified)
        #[arg(long, value_name = "TITLE")]
        title: Option<String>,

        /// Base directory for relative image paths (the input's directory
        /// if not specified)
        #[arg(long, value_name = "DIR")]
        resource_dir: Option<PathBuf>,
    },

    /// Validate a document AST and print its normalized form
    Dump {
        /// Input document AST (JSON)
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output file (stdout if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Output compact JSON
        #[arg(long)]
        compact: bool,
    },

    /// Show document information
    Info {
        /// Input document AST (JSON)
        #[arg(value_name = "FILE")]
        input: PathBuf,
    },

    /// Show version information
    Version,
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let result = match cli.command {
        Some(Commands::Convert {
            input,
            output,
            reference_doc,
            title,
            resource_dir,
        }) => cmd_convert(
            &input,
            output.as_deref(),
            reference_doc.as_deref(),
            title.as_deref(),
            resource_dir,
        ),
        Some(Commands::Dump {
            input,
            output,
            compact,
        }) => cmd_dump(&input, output.as_deref(), compact),
        Some(Commands::Info { input }) => cmd_info(&input),
        Some(Commands::Version) => {
            cmd_version();
            Ok(())
        }
        None => {
            // Default behavior: convert if input is provided
            if let Some(input) = cli.input {
                cmd_convert(
                    &input,
                    cli.output.as_deref(),
                    cli.reference_doc.as_deref(),
                    None,
                    None,
                )
            } else {
                println!("{}", "Usage: md2hwpx <FILE> [OUTPUT]".yellow());
                println!("       md2hwpx --help for more information");
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
    input: &Path,
    output: Option<&Path>,
    reference: Option<&Path>,
    title: Option<&str>,
    resource_dir: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let output_path = output
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| input.with_extension("hwpx"));

    let mut options = ConvertOptions::new();
    if let Some(dir) = resource_dir {
        options = options.with_resource_dir(dir);
    } else if let Some(parent) = input.parent().filter(|p| !p.as_os_str().is_empty()) {
        options = options.with_resource_dir(parent);
    }

    let mut converter = Md2Hwpx::new().with_options(options);
    if let Some(path) = reference {
        converter = converter.with_reference_doc(path);
    }
    if let Some(title) = title {
        converter = converter.with_title(title);
    }

    log::debug!("converting {} -> {}", input.display(), output_path.display());
    converter.convert_file(input, &output_path)?;

    println!("{} {}", "Saved to".green(), output_path.display());
    Ok(())
}

fn cmd_dump(
    input: &Path,
    output: Option<&Path>,
    compact: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let json = fs::read_to_string(input)?;
    let document = Document::from_json(&json)?;

    let normalized = if compact {
        serde_json::to_string(&document)?
    } else {
        document.to_json()?
    };

    if let Some(path) = output {
        fs::write(path, &normalized)?;
        println!("{} {}", "Saved to".green(), path.display());
    } else {
        println!("{}", normalized);
    }

    Ok(())
}

fn cmd_info(input: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let json = fs::read_to_string(input)?;
    let document = Document::from_json(&json)?;

    println!("{}", "Document Information".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());

    println!("{}: {}", "File".bold(), input.display());
    if let Some(ref title) = document.title {
        println!("{}: {}", "Title".bold(), title);
    }
    println!("{}: {}", "Top-level blocks".bold(), document.blocks.len());
    println!("{}: {}", "Footnotes".bold(), document.footnotes.len());

    println!();
    println!("{}", "Content Statistics".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());

    let mut stats = Stats::default();
    stats.collect_blocks(&document.blocks);
    for body in document.footnotes.values() {
        stats.collect_blocks(body);
    }

    println!("{}: {}", "Headings".bold(), stats.headings);
    println!("{}: {}", "Paragraphs".bold(), stats.paragraphs);
    println!("{}: {}", "Tables".bold(), stats.tables);
    println!("{}: {}", "Lists".bold(), stats.lists);
    println!("{}: {}", "Code blocks".bold(), stats.code_blocks);
    println!("{}: {}", "Images".bold(), stats.images);

    Ok(())
}

fn cmd_version() {
    println!("{} {}", "md2hwpx".cyan().bold(), env!("CARGO_PKG_VERSION"));
    println!("Document AST to HWPX converter");
    println!();
    println!(
        "Repository: {}",
        "https://github.com/iyulab/md2hwpx".dimmed()
    );
    println!("License: MIT");
}

#[derive(Default)]
struct Stats {
    headings: usize,
    paragraphs: usize,
    tables: usize,
    lists: usize,
    code_blocks: usize,
    images: usize,
}

impl Stats {
    fn collect_blocks(&mut self, blocks: &[Block]) {
        for block in blocks {
            match block {
                Block::Header(header) => {
                    self.headings += 1;
                    self.collect_inlines(&header.content);
                }
                Block::Paragraph(content) => {
                    self.paragraphs += 1;
                    self.collect_inlines(content);
                }
                Block::CodeBlock(_) => self.code_blocks += 1,
                Block::BlockQuote(body) => self.collect_blocks(body),
                Block::HorizontalRule => {}
                Block::BulletList(list) => {
                    self.lists += 1;
                    for item in &list.items {
                        self.collect_blocks(item);
                    }
                }
                Block::OrderedList(list) => {
                    self.lists += 1;
                    for item in &list.items {
                        self.collect_blocks(item);
                    }
                }
                Block::Table(table) => {
                    self.tables += 1;
                    for row in &table.rows {
                        for cell in &row.cells {
                            self.collect_blocks(&cell.content);
                        }
                    }
                }
                Block::Image(_) => self.images += 1,
            }
        }
    }

    fn collect_inlines(&mut self, inlines: &[Inline]) {
        for inline in inlines {
            match inline {
                Inline::Strong(children)
                | Inline::Emphasis(children)
                | Inline::Strikethrough(children)
                | Inline::Underline(children)
                | Inline::Superscript(children)
                | Inline::Subscript(children) => self.collect_inlines(children),
                Inline::Link(link) => self.collect_inlines(&link.children),
                Inline::InlineImage(_) => self.images += 1,
                _ => {}
            }
        }
    }
}

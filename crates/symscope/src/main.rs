use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use symscope_core::prelude::*;
use symscope_utils::{LogFormat, LogLevel, LoggingGuard, LoggingError, debug, info, init_logging, init_logging_with_level};

/// Firmware symbol size analysis from ELF images and linker MAP files.
#[derive(Parser, Debug)]
#[command(name = "symscope")]
#[command(version)]
#[command(about = "Firmware symbol size analysis from ELF images and linker MAP files", long_about = None)]
struct Cli
{
    /// ELF image to analyze
    #[arg(long, global = true, env = "SYMSCOPE_ELF")]
    elf: Option<PathBuf>,

    /// GNU ld MAP file produced alongside the image
    #[arg(long, global = true, env = "SYMSCOPE_MAP")]
    map: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace); overrides RUST_LOG
    #[arg(long, global = true)]
    log_level: Option<LogLevel>,

    /// Log format (pretty or json); overrides SYMSCOPE_LOG_FORMAT
    #[arg(long, global = true)]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands
{
    /// List ELF sections
    Sections
    {
        /// Include sections that own no symbols
        #[arg(long, default_value_t = false)]
        all: bool,
    },
    /// List symbols, largest first
    Symbols
    {
        /// Only symbols placed in this section (e.g. .text)
        #[arg(short, long)]
        section: Option<String>,
        /// Only symbols the linker attributed to this object file
        #[arg(short, long)]
        object: Option<String>,
        /// Maximum number of rows to print
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// List object files known from the MAP file
    Objects,
    /// Show a symbol and its source location
    Lookup
    {
        /// Exact (mangled) symbol name
        name: String,
    },
    /// Dump the decoded DWARF line table
    Lines
    {
        /// Maximum number of rows to print
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
}

fn main()
{
    let cli = Cli::parse();

    let _guard = match setup_logging(cli.log_level, cli.log_format) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            process::exit(1);
        }
    };

    if let Err(e) = run_command(cli) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn setup_logging(
    level: Option<LogLevel>,
    format: Option<LogFormat>,
) -> std::result::Result<LoggingGuard, LoggingError>
{
    match (level, format) {
        (None, None) => init_logging(),
        (level, format) => init_logging_with_level(level.unwrap_or(LogLevel::Info), format.unwrap_or_default()),
    }
}

fn run_command(cli: Cli) -> Result<()>
{
    let mut builder = SymbolAnalyzer::builder();
    if let Some(path) = &cli.elf {
        info!("Loading ELF image {}", path.display());
        builder = builder.elf_path(path);
    }
    if let Some(path) = &cli.map {
        info!("Loading MAP file {}", path.display());
        builder = builder.map_path(path);
    }
    let analyzer = builder.build()?;

    match cli.command {
        Commands::Sections { all } => {
            let sections = if all {
                analyzer.sections()?
            } else {
                analyzer.sections_with_symbols()?
            };
            print_sections(&sections);
        }
        Commands::Symbols { section, object, limit } => {
            let symbols = match (section.as_deref(), object.as_deref()) {
                (Some(section), None) => analyzer.symbols_in_section(section)?,
                (None, Some(object)) => analyzer.symbols_for_object(object)?,
                (section, object) => analyzer
                    .all_symbols()?
                    .into_iter()
                    .filter(|symbol| section.is_none_or(|s| symbol.section.as_deref() == Some(s)))
                    .filter(|symbol| object.is_none_or(|o| symbol.object.as_deref() == Some(o)))
                    .collect(),
            };
            print_symbols(&symbols, limit);
        }
        Commands::Objects => {
            if !analyzer.has_map() {
                eprintln!("Note: object files are only known when a MAP file is given (--map).");
            }
            for object in analyzer.objects() {
                let symbols = analyzer.symbols_for_object(&object)?;
                let total: u64 = symbols.iter().map(|symbol| symbol.size).sum();
                println!("{total:>10}  {:>6}  {object}", symbols.len());
            }
        }
        Commands::Lookup { name } => {
            let Some(symbol) = analyzer.symbol_with_debug_info(&name)? else {
                println!("Symbol not found: {name}");
                return Ok(());
            };
            print_symbol_details(&symbol);
        }
        Commands::Lines { limit } => {
            let elf = analyzer.elf().ok_or(Error::ElfNotLoaded)?;
            let table = elf.line_table();
            debug!("Line table has {} rows", table.len());
            for row in table.rows().take(limit.unwrap_or(usize::MAX)) {
                let marker = if row.end_sequence { " end" } else { "" };
                println!("0x{:08x}  {}:{}{marker}", row.address, row.file, row.line);
            }
        }
    }

    Ok(())
}

fn print_sections(sections: &[Section])
{
    println!("{:<24} {:>12} {:>10}  load", "name", "address", "size");
    for section in sections {
        println!(
            "{:<24} {:>12} {:>10}  {}",
            section.name,
            format!("0x{:x}", section.address),
            section.size,
            if section.needs_load { "yes" } else { "no" }
        );
    }
}

fn print_symbols(symbols: &[Symbol], limit: Option<usize>)
{
    let total: u64 = symbols.iter().map(|symbol| symbol.size).sum();
    let shown = limit.unwrap_or(symbols.len()).min(symbols.len());

    println!("{:>10} {:>12} {:<8} {:<16} name", "size", "address", "kind", "section");
    for symbol in &symbols[..shown] {
        println!(
            "{:>10} {:>12} {:<8} {:<16} {}{}",
            symbol.size,
            symbol.hex_address(),
            symbol.kind,
            symbol.section.as_deref().unwrap_or("-"),
            symbol.display_name(),
            symbol.object.as_deref().map(|o| format!("  [{o}]")).unwrap_or_default()
        );
    }
    println!("\n{shown} of {} symbols shown, {total} bytes total", symbols.len());
}

fn print_symbol_details(symbol: &Symbol)
{
    println!("\nSymbol Information:");
    println!("  Name: {}", symbol.name);
    if let Some(demangled) = symbol.demangled() {
        println!("  Demangled: {demangled}");
    }
    println!("  Language: {}", symbol.language());
    println!("  Kind: {}", symbol.kind);
    println!("  Address: {}", symbol.hex_address());
    println!("  Size: {} bytes", symbol.size);
    println!("  Section: {}", symbol.section.as_deref().unwrap_or("-"));
    println!("  Object: {}", symbol.object.as_deref().unwrap_or("-"));
    match symbol.source_location() {
        Some(location) => println!("  Source: {location}"),
        None => println!("  Source: no debug info available"),
    }
}

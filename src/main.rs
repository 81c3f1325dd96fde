use amalgamate::fs_utils::{read_source, resolve_include_path};
use amalgamate::{AmalgamConfig, DEFAULT_MARKER, IncludeReference, Result, find_directives};
use clap::{Parser, ValueEnum};
use serde::Serialize;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

const LONG_HELP: &str = r#"
Directives:
  #include "path"       - Local include, replaced by the expanded file
  #include <path>       - External include, dropped (see --keep-external)
  #include              - Malformed, aborts with the line number

Local paths are resolved against the base directory, not against the
including file. Nothing is written unless the whole expansion succeeds.

Examples:
  # Amalgamate audit/main.c into audit.h
  amalgamate main.c --base-dir audit -o audit.h
  # Print to stdout, keeping system includes
  amalgamate main.c -b audit --keep-external
  # Check that every local include resolves
  amalgamate main.c -b audit --dry-run
  # List the includes of the entry file
  amalgamate main.c -b audit --list=detailed
  # Output as JSON for scripting
  amalgamate main.c -b audit --list=json
"#;

/// Flatten a C source tree into a single file.
#[derive(Parser, Debug)]
#[command(
    name = "amalgamate",
    version,
    about = "Flatten a C source tree into a single file by inlining local includes.",
    after_long_help = LONG_HELP
)]
struct Cli {
    /// Entry source file, relative to the base directory
    #[arg(value_name = "ENTRY")]
    entry: PathBuf,

    /// Base directory for resolving the entry file and local includes
    #[arg(
        short,
        long,
        value_name = "DIR",
        env = "AMALGAMATE_BASE_DIR",
        default_value = "."
    )]
    base_dir: PathBuf,

    /// Output file, overwritten if present (defaults to stdout)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Token that opens an include directive line
    #[arg(
        long,
        value_name = "MARKER",
        default_value = DEFAULT_MARKER,
        value_parser = clap::builder::NonEmptyStringValueParser::new()
    )]
    marker: String,

    /// Copy external includes to the output instead of dropping them
    #[arg(long)]
    keep_external: bool,

    /// Don't check for include cycles
    #[arg(long)]
    no_cycle_check: bool,

    /// Expand everything and report, without writing output
    #[arg(long, conflicts_with = "list")]
    dry_run: bool,

    /// List the entry file's includes (optionally with format: plain, detailed, json)
    #[arg(long, value_name = "FORMAT", num_args = 0..=1, default_missing_value = "plain", conflicts_with = "dry_run")]
    list: Option<ListFormat>,

    /// Increase verbosity (can be used multiple times)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum, PartialEq)]
enum ListFormat {
    /// Directive lines only
    Plain,
    /// Line, kind and resolved path of each directive
    Detailed,
    /// JSON output for scripting
    Json,
}

#[derive(Serialize)]
struct DirectiveInfo {
    directive: String,
    line: usize,
    kind: amalgamate::IncludeKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    exists: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl Cli {
    fn config(&self) -> AmalgamConfig {
        AmalgamConfig {
            base_dir: self.base_dir.clone(),
            marker: self.marker.clone(),
            keep_external: self.keep_external,
            detect_cycles: !self.no_cycle_check,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.quiet, cli.verbose);

    let config = cli.config();
    let result = if cli.dry_run {
        dry_run(&cli.entry, &config)
    } else if let Some(list_format) = cli.list {
        list_directives(&cli.entry, list_format, &config)
    } else {
        write_amalgamation(&cli.entry, cli.output.as_deref(), &config)
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

/// `RUST_LOG` wins over the verbosity flags when set
fn init_logging(quiet: bool, verbose: u8) {
    let level = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, 2) => "debug",
        (false, _) => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .compact()
        .init();
}

fn write_amalgamation(entry: &Path, output: Option<&Path>, config: &AmalgamConfig) -> Result<()> {
    info!(
        "Amalgamating {} from {}",
        entry.display(),
        config.base_dir.display()
    );
    let amalgamation = amalgamate::amalgamate(entry, config)?;
    debug!(
        inlined = amalgamation.inlined.len(),
        dropped = amalgamation.dropped.len(),
        "expansion finished"
    );

    // Only reached once the whole expansion succeeded
    if let Some(output_path) = output {
        info!("Writing output to {}", output_path.display());
        std::fs::write(output_path, &amalgamation.text)?;
    } else {
        print!("{}", amalgamation.text);
        io::stdout().flush()?;
    }

    info!("Amalgamation complete!");
    Ok(())
}

fn dry_run(entry: &Path, config: &AmalgamConfig) -> Result<()> {
    info!("Performing dry run - expanding without writing...");

    let amalgamation = amalgamate::amalgamate(entry, config)?;

    for path in &amalgamation.inlined {
        info!("✓ {}", path.display());
    }
    for directive in &amalgamation.dropped {
        info!("- {directive}");
    }

    println!(
        "\nSummary: {} bytes from {}",
        amalgamation.text.len(),
        entry.display()
    );
    println!("  ✓ {} local includes inlined", amalgamation.inlined.len());
    let verb = if config.keep_external { "kept" } else { "dropped" };
    println!(
        "  - {} external includes {verb}",
        amalgamation.dropped.len()
    );

    Ok(())
}

fn list_directives(entry: &Path, format: ListFormat, config: &AmalgamConfig) -> Result<()> {
    debug!("Listing include directives...");

    let entry_path = config.base_dir.join(entry);
    let text = read_source(&entry_path)?;
    let directives = find_directives(&text, &config.marker, entry)?;

    match format {
        ListFormat::Plain => {
            for directive in &directives {
                println!("{}", directive.raw);
            }
        }
        ListFormat::Detailed => {
            for directive in &directives {
                let info = describe(directive, config);
                println!("Directive: {}", info.directive);
                println!("  Line: {}", info.line);
                println!("  Kind: {:?}", info.kind);
                if let Some(path) = &info.path {
                    println!("  Path: {path}");
                }
                if let Some(exists) = info.exists {
                    println!("  Exists: {}", if exists { "yes" } else { "no" });
                }
                if let Some(error) = &info.error {
                    println!("  Error: {error}");
                }
                println!();
            }
        }
        ListFormat::Json => {
            let infos: Vec<DirectiveInfo> = directives.iter().map(|d| describe(d, config)).collect();
            let json = serde_json::to_string_pretty(&infos)?;
            println!("{json}");
        }
    }

    Ok(())
}

fn describe(directive: &IncludeReference, config: &AmalgamConfig) -> DirectiveInfo {
    let mut info = DirectiveInfo {
        directive: directive.raw.clone(),
        line: directive.line,
        kind: directive.kind,
        path: None,
        exists: None,
        error: None,
    };

    if let Some(include) = directive.local_path() {
        match resolve_include_path(&include, &config.base_dir) {
            Ok(p) => {
                info.exists = Some(p.is_file());
                if !p.is_file() {
                    warn!("{} -> {} (not found)", directive.raw, p.display());
                }
                info.path = Some(p.display().to_string());
            }
            Err(e) => {
                info.error = Some(e.to_string());
            }
        }
    }

    info
}

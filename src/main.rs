use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process;

use tracing_subscriber::EnvFilter;

use ccc::builder::CorpusBuilder;
use ccc::errors::{CorpusError, Result};
use ccc::extract::CommentExtractor;
use ccc::language::detect_language;
use ccc::repo::GitRepository;
use ccc::types::NoteKind;

/// Builds a corpus of code comments and commit messages.
#[derive(Parser)]
#[command(name = "ccc", about = "Code comment corpus builder")]
struct Cli {
    #[command(flatten)]
    verbosity: Verbosity,

    /// Workspace path (default: current directory)
    #[arg(short, long, global = true)]
    workspace: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct Verbosity {
    /// Log debug messages
    #[arg(short, long, global = true)]
    verbose: bool,
    /// Log debug messages with timestamps and source locations
    #[arg(short, long, global = true)]
    debug: bool,
    /// Log warnings only
    #[arg(short = 'V', long, global = true)]
    very_quiet: bool,
    /// Disable logging
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a corpus workspace
    Init,
    /// Extract notes from every repository in the repository list
    Extract {
        /// Note kinds to extract (default: configured kinds)
        #[arg(short, long = "kind")]
        kinds: Vec<String>,
        /// Write audit logs of classifier decisions
        #[arg(long)]
        build_notes: bool,
    },
    /// Extract the comments of one local repository and print them as JSON
    Repo {
        /// Path to a git checkout
        path: String,
        /// Revision to attribute comments at
        #[arg(short, long, default_value = "HEAD")]
        revision: String,
        /// Write audit logs of classifier decisions
        #[arg(long)]
        build_notes: bool,
    },
    /// Print the detected language of a file
    Detect {
        /// File to inspect
        file: String,
    },
    /// Show corpus statistics
    Stats {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = init_logging(&cli.verbosity) {
        eprintln!("Error: {}", e);
        process::exit(2);
    }
    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Installs the global subscriber. `RUST_LOG` wins over the flags.
fn init_logging(v: &Verbosity) -> Result<()> {
    if (v.verbose || v.debug) && (v.very_quiet || v.quiet) {
        return Err(CorpusError::Config {
            message: "-v/-d cannot be combined with -V/-q".to_string(),
        });
    }
    let level = if v.quiet {
        "off"
    } else if v.very_quiet {
        "warn"
    } else if v.verbose || v.debug {
        "debug"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if v.debug {
        builder.with_file(true).with_line_number(true).init();
    } else {
        builder.without_time().with_target(false).init();
    }
    Ok(())
}

fn run(cli: Cli) -> Result<()> {
    let workspace = resolve_path(cli.workspace);
    match cli.command {
        Commands::Init => {
            let builder = CorpusBuilder::init(&workspace)?;
            println!("Initialized corpus workspace at {}", workspace.display());
            println!(
                "  List repositories in {} and check them out under {}",
                builder.config().repolist,
                builder.repos_dir().display()
            );
        }
        Commands::Extract { kinds, build_notes } => {
            let builder = CorpusBuilder::open(&workspace)?;
            let kinds = parse_kinds(&kinds)?;
            let summary = builder.extract(&kinds, build_notes)?;
            for file in &summary.files {
                println!("{} {}: {} records", file.repo, file.note_kind, file.records);
            }
            for name in &summary.skipped {
                println!("{}: skipped (no checkout)", name);
            }
            println!(
                "Extracted {} records from {} repositories in {}ms",
                summary.total_records(),
                summary.repos,
                summary.duration_ms
            );
        }
        Commands::Repo {
            path,
            revision,
            build_notes,
        } => {
            let mut config = if CorpusBuilder::is_initialized(&workspace) {
                CorpusBuilder::open(&workspace)?.config().clone()
            } else {
                Default::default()
            };
            config.revision = revision;
            let builder = CorpusBuilder::with_config(&workspace, config.clone());
            let repo = GitRepository::open_dir(Path::new(&path))?;
            let extractor = CommentExtractor::new(config, &builder.build_notes_dir());
            if build_notes {
                extractor.audit_log().reset()?;
            }
            let records = extractor.extract_repository_comments(&repo, build_notes)?;
            println!("{}", serde_json::to_string_pretty(&records)?);
        }
        Commands::Detect { file } => match detect_language(Path::new(&file)) {
            Some(language) => println!("{}", language),
            None => println!("unknown"),
        },
        Commands::Stats { json } => {
            let builder = CorpusBuilder::open(&workspace)?;
            let stats = builder.stats()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                println!("Corpus Statistics");
                for row in &stats {
                    let repo = row.repo.as_deref().unwrap_or("*");
                    let kind = row.kind.map(|k| k.as_str()).unwrap_or("*");
                    println!(
                        "  {:<24} {:<16} notes: {:>6}  sents: {:>7}  words: {:>8}",
                        repo, kind, row.notes, row.sents, row.words
                    );
                }
            }
        }
    }
    Ok(())
}

fn parse_kinds(kinds: &[String]) -> Result<Vec<NoteKind>> {
    kinds
        .iter()
        .map(|k| {
            NoteKind::from_str(k).ok_or_else(|| CorpusError::Config {
                message: format!("unknown note kind '{}'", k),
            })
        })
        .collect()
}

/// Resolves an optional path argument to a `PathBuf`.
///
/// Defaults to the current working directory if no path is provided.
fn resolve_path(path: Option<String>) -> PathBuf {
    match path {
        Some(p) => PathBuf::from(p),
        None => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}

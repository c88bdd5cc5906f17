use std::collections::HashSet;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use miette::{IntoDiagnostic, Result};

use codemap_core::{CodemapConfig, OutputFormat, TokenizerKind};
use codemap_graph::changes::ChangeSet;
use codemap_repomap::MapRequest;

#[derive(Parser)]
#[command(
    name = "codemap",
    version,
    about = "Ranked repository maps and whole-codebase graphs",
    long_about = "codemap summarizes a repository for a limited context window.\n\n\
                   It ranks files and definitions by how much the rest of the code refers\n\
                   to them, and builds a FILE/CLASS/INTERFACE/FUNCTION graph for storage.\n\n\
                   Examples:\n  \
                     codemap map --path .                      Ranked map within 1024 tokens\n  \
                     codemap map --chat src/lib.rs             Map the rest around a file\n  \
                     codemap graph --path . --format json      Full code graph as JSON\n  \
                     codemap graph --last-commit               Graph of the last commit's files\n  \
                     codemap init                              Write a default .codemap.toml"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to configuration file (default: .codemap.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        global = true,
        default_value = "text",
        long_help = "Output format for command results.\n\n\
                       Formats:\n  \
                         text      The map itself, or a graph summary (default)\n  \
                         json      Machine-readable JSON with camelCase keys\n  \
                         markdown  GitHub-flavored Markdown"
    )]
    format: OutputFormat,

    /// Enable verbose output
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Generate a ranked map of the codebase structure
    #[command(long_about = "Generate a ranked map of the codebase structure.\n\n\
        Uses tree-sitter tags to link files through shared identifiers and personalized\n\
        PageRank to rank definitions. The largest map under the token budget is printed.\n\n\
        Examples:\n  codemap map --path .\n  codemap map --max-tokens 2048 --chat src/main.rs --mention-ident parse")]
    Map {
        /// Repository path (default: current directory)
        #[arg(long, default_value = ".")]
        path: PathBuf,

        /// Maximum tokens for the map (default: from config, else 1024)
        #[arg(long)]
        max_tokens: Option<usize>,

        /// Token counter
        #[arg(long)]
        tokenizer: Option<Tokenizer>,

        /// Files already visible in full; left out of the map but boosted in ranking
        #[arg(long)]
        chat: Vec<PathBuf>,

        /// Candidate files for the map (default: every source file not in --chat)
        #[arg(long)]
        other: Vec<PathBuf>,

        /// Boost files with this relative path
        #[arg(long)]
        mention_file: Vec<String>,

        /// Boost references to this identifier
        #[arg(long)]
        mention_ident: Vec<String>,
    },
    /// Build the whole-codebase graph
    #[command(long_about = "Build the whole-codebase graph.\n\n\
        Every text file becomes a FILE node; its classes, interfaces and functions become\n\
        nodes linked by CONTAINS edges, and references between them REFERENCES edges.\n\
        With --changed or --last-commit only those files are rebuilt; a single\n\
        '--changed -1' asks for a full build.\n\n\
        Examples:\n  codemap graph --path .\n  codemap graph --changed src/Bank.java --format json\n  codemap graph --last-commit")]
    Graph {
        /// Repository path (default: current directory)
        #[arg(long, default_value = ".")]
        path: PathBuf,

        /// Sub-directory to walk (default: from config, else the repository root)
        #[arg(long)]
        source_root: Option<PathBuf>,

        /// Changed file, relative to the repository root
        #[arg(long, conflicts_with = "last_commit")]
        changed: Vec<String>,

        /// Rebuild only the files touched by the HEAD commit
        #[arg(long)]
        last_commit: bool,
    },
    /// Create default configuration file (.codemap.toml)
    Init,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Tokenizer {
    /// Whitespace-separated words
    Words,
    /// OpenAI cl100k_base BPE tokens
    Cl100k,
}

impl From<Tokenizer> for TokenizerKind {
    fn from(t: Tokenizer) -> Self {
        match t {
            Tokenizer::Words => TokenizerKind::Words,
            Tokenizer::Cl100k => TokenizerKind::Cl100k,
        }
    }
}

const CONFIG_FILE: &str = ".codemap.toml";

const DEFAULT_CONFIG: &str = r#"# codemap configuration

[map]
# Token budget for the rendered map.
max_tokens = 1024
# Model context window; with no chat files the budget may grow up to this minus 4096.
# max_context_window = 128000
# Budget multiplier applied when no chat files are given.
map_mul_no_files = 8
# "words" or "cl100k"
tokenizer = "words"
# Longer map lines are cut to this many characters.
max_line_width = 100
# Text printed before the map; "{other}" becomes "other " when chat files exist.
# repo_content_prefix = "Here are summaries of some {other}files in the repository:\n"
# Repositories with more candidate files than this get no map.
max_files = 20000

[graph]
# Sub-directory to walk instead of the repository root.
# source_root = "src"
# Methods of classes named with this suffix may point at the interface they implement.
impl_suffix = "Impl"
# Extra extensions to skip as binary.
exclude_extensions = []
"#;

fn load_config(path: Option<&Path>) -> Result<CodemapConfig> {
    let config = match path {
        Some(path) => CodemapConfig::from_file(path).into_diagnostic()?,
        None => {
            let default_path = Path::new(CONFIG_FILE);
            if default_path.exists() {
                CodemapConfig::from_file(default_path).into_diagnostic()?
            } else {
                CodemapConfig::default()
            }
        }
    };
    Ok(config)
}

fn init_logging(verbose: bool) {
    let level = if verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

fn spinner(message: &str) -> Option<indicatif::ProgressBar> {
    if !std::io::stderr().is_terminal() {
        return None;
    }
    let pb = indicatif::ProgressBar::new_spinner();
    if let Ok(style) = indicatif::ProgressStyle::with_template("{spinner:.cyan} {msg} ({elapsed})")
    {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(120));
    Some(pb)
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .build(),
        )
    }))
    .into_diagnostic()?;
    human_panic::setup_panic!();

    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = load_config(cli.config.as_deref())?;
    log::debug!("format: {}", cli.format);

    match cli.command {
        None => {
            println!(
                "codemap v{}: ranked repository maps and code graphs\n",
                env!("CARGO_PKG_VERSION")
            );
            println!("  codemap map     Ranked map of the most important code");
            println!("  codemap graph   FILE/CLASS/INTERFACE/FUNCTION graph");
            println!("  codemap init    Create default configuration\n");
            println!("Run 'codemap <command> --help' for details.");
        }
        Some(Command::Map {
            ref path,
            max_tokens,
            tokenizer,
            ref chat,
            ref other,
            ref mention_file,
            ref mention_ident,
        }) => {
            if let Some(max_tokens) = max_tokens {
                config.map.max_tokens = max_tokens;
            }
            if let Some(tokenizer) = tokenizer {
                config.map.tokenizer = tokenizer.into();
            }
            let request = MapRequest {
                chat_files: chat.clone(),
                other_files: (!other.is_empty()).then(|| other.clone()),
                mentioned_files: mention_file.iter().cloned().collect::<HashSet<_>>(),
                mentioned_idents: mention_ident.iter().cloned().collect::<HashSet<_>>(),
                verbose: cli.verbose,
            };
            let output = codemap_repomap::render_map(path, &config.map, &request, cli.format)
                .into_diagnostic()?;
            if output.is_empty() {
                log::warn!("no map fits within {} tokens", config.map.max_tokens);
            }
            print!("{output}");
        }
        Some(Command::Graph {
            ref path,
            ref source_root,
            ref changed,
            last_commit,
        }) => {
            if let Some(source_root) = source_root {
                config.graph.source_root = Some(source_root.clone());
            }
            let changes = if last_commit {
                ChangeSet::from_last_commit(path).into_diagnostic()?
            } else {
                ChangeSet::from_list(changed)
            };
            if let ChangeSet::Files(files) = &changes {
                log::info!("incremental build over {} changed files", files.len());
            }

            let pb = spinner("Building code graph...");
            let result = codemap_graph::generate_graph(path, &config.graph, &changes, cli.format);
            if let Some(pb) = pb {
                pb.finish_and_clear();
            }
            let output = result.into_diagnostic()?;
            print!("{output}");
        }
        Some(Command::Init) => {
            let path = Path::new(CONFIG_FILE);
            if path.exists() {
                miette::bail!("{CONFIG_FILE} already exists");
            }
            std::fs::write(path, DEFAULT_CONFIG).into_diagnostic()?;
            println!("Created {CONFIG_FILE} with default configuration");
        }
    }

    Ok(())
}

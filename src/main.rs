use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use similar::{ChangeTag, TextDiff};
use std::collections::BTreeMap;
use std::env;
use std::io::Read;
use std::path::{Path, PathBuf};
use symbol_refactor::config::{load_from_path, parse_request, BatchRequest};
use symbol_refactor::engine::{run_atomic, BatchResult, MemoryCheckpointStore, RefactorEngine};
use symbol_refactor::project::{ProjectModel, ProjectOptions};
use symbol_refactor::safety::WorkspaceGuard;
use tracing_subscriber::filter::{EnvFilter, LevelFilter};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
#[command(name = "symbol-refactor")]
#[command(about = "Batch rename, move and remove of TypeScript symbols", long_about = None)]
#[command(version)]
struct Cli {
    /// Log engine internals to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply a batch of refactor operations to a workspace
    Apply {
        /// Path to workspace root (auto-detected if not specified)
        #[arg(short, long)]
        workspace: Option<PathBuf>,

        /// Operations file (JSON or TOML), or `-` for stdin
        #[arg(short, long, default_value = "-")]
        operations: PathBuf,

        /// Keep going after a failed operation (the batch still rolls back)
        #[arg(long)]
        continue_on_error: bool,

        /// Dry run - show what would be changed without modifying files
        #[arg(short = 'n', long)]
        dry_run: bool,

        /// Show unified diff of changes
        #[arg(short, long)]
        diff: bool,

        /// Print the batch result as JSON instead of the human report
        #[arg(long)]
        json: bool,
    },

    /// Parse an operations file and describe what it would do
    Plan {
        /// Operations file (JSON or TOML), or `-` for stdin
        #[arg(short, long, default_value = "-")]
        operations: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Apply {
            workspace,
            operations,
            continue_on_error,
            dry_run,
            diff,
            json,
        } => cmd_apply(workspace, &operations, continue_on_error, dry_run, diff, json),

        Commands::Plan { operations } => cmd_plan(&operations),
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::WARN
    };
    let filter = EnvFilter::builder()
        .with_default_directive(default.into())
        .from_env_lossy();

    // A second init (tests driving main twice) is harmless
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .try_init();
}

/// Read a request from a file, or from stdin when `path` is `-`.
fn read_request(path: &Path) -> Result<BatchRequest> {
    if path == Path::new("-") {
        let mut raw = String::new();
        std::io::stdin()
            .read_to_string(&mut raw)
            .context("failed to read operations from stdin")?;
        return Ok(parse_request(&raw)?);
    }
    Ok(load_from_path(path)?)
}

/// Resolve workspace path using multiple detection strategies
///
/// Priority order:
/// 1. Explicit --workspace flag
/// 2. REFACTOR_WORKSPACE environment variable
/// 3. Nearest ancestor of the current directory with tsconfig.json or package.json
fn resolve_workspace(cli_workspace: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(path) = cli_workspace {
        return path
            .canonicalize()
            .with_context(|| format!("workspace {} does not exist", path.display()));
    }

    if let Ok(env_path) = env::var("REFACTOR_WORKSPACE") {
        let path = PathBuf::from(&env_path);
        if path.exists() {
            return Ok(path.canonicalize()?);
        }
        eprintln!(
            "{}",
            format!(
                "Warning: REFACTOR_WORKSPACE is set but path doesn't exist: {}",
                env_path
            )
            .yellow()
        );
    }

    if let Some(path) = auto_detect_workspace() {
        eprintln!(
            "{}",
            format!("Auto-detected workspace: {}", path.display()).dimmed()
        );
        return Ok(path);
    }

    anyhow::bail!(
        "{}\n{}\n  {}\n  {}\n  {}",
        "Could not find a TypeScript workspace.".red(),
        "Try one of:".bold(),
        "1. cd into a directory containing tsconfig.json or package.json",
        "2. Specify explicitly: symbol-refactor apply --workspace /path/to/project",
        "3. Set environment variable: export REFACTOR_WORKSPACE=/path/to/project"
    )
}

fn auto_detect_workspace() -> Option<PathBuf> {
    let current = env::current_dir().ok()?;
    current
        .ancestors()
        .find(|dir| dir.join("tsconfig.json").exists() || dir.join("package.json").exists())
        .map(Path::to_path_buf)
}

/// Helper: Show unified diff between original and modified content
fn display_diff(file: &str, original: &str, modified: &str) {
    println!("\n{}", format!("--- {} (original)", file).dimmed());
    println!("{}", format!("+++ {} (refactored)", file).dimmed());

    let diff = TextDiff::from_lines(original, modified);

    for change in diff.iter_all_changes() {
        let sign = match change.tag() {
            ChangeTag::Delete => format!("-{}", change).red(),
            ChangeTag::Insert => format!("+{}", change).green(),
            ChangeTag::Equal => format!(" {}", change).normal(),
        };
        print!("{}", sign);
    }
}

fn print_report(request: &BatchRequest, result: &BatchResult) {
    for (operation, outcome) in request.operations.iter().zip(&result.results) {
        if outcome.success {
            println!("{} {}", "✓".green(), operation.describe_done());
        } else {
            println!(
                "{} {}: {}",
                "✗".red(),
                operation.describe(),
                outcome.error.as_deref().unwrap_or("failed")
            );
        }
        for warning in &outcome.warnings {
            println!("    {} {}", "!".yellow(), warning.yellow());
        }
    }

    for operation in request.operations.iter().skip(result.results.len()) {
        println!("{} {} (not attempted)", "⊘".cyan(), operation.describe());
    }
}

fn cmd_apply(
    workspace: Option<PathBuf>,
    operations: &Path,
    continue_on_error: bool,
    dry_run: bool,
    show_diff: bool,
    json: bool,
) -> Result<()> {
    // 1. Resolve workspace path
    let workspace = resolve_workspace(workspace)?;

    // 2. Load and authorize the request
    let mut request = read_request(operations)?;
    if continue_on_error {
        request.options.stop_on_error = false;
    }

    let guard = WorkspaceGuard::new(&workspace)?;
    for operation in &request.operations {
        for path in operation.paths() {
            if !guard.validate_access(&path) {
                anyhow::bail!(
                    "{} is not an editable path in {}",
                    path,
                    workspace.display()
                );
            }
        }
    }

    if !json {
        println!("Workspace: {}", workspace.display());
        println!("Operations: {}", request.operations.len());
        println!();
    }

    // 3. Execute the batch all-or-nothing against the in-memory project
    let mut project = ProjectModel::open(&workspace, ProjectOptions::default())?;
    let before: BTreeMap<String, String> = if show_diff {
        project
            .files()
            .map(|file| (file.path().to_string(), file.text().to_string()))
            .collect()
    } else {
        BTreeMap::new()
    };

    let mut store = MemoryCheckpointStore::new();
    let result = {
        let mut engine = RefactorEngine::new(&mut project);
        run_atomic(&mut engine, &mut store, &request)?
    };

    // 4. Report
    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_report(&request, &result);
    }

    if !result.success {
        eprintln!();
        eprintln!(
            "{} {}",
            "Rolled back:".red().bold(),
            result.error.as_deref().unwrap_or("batch failed")
        );
        eprintln!("  No files were changed.");
        std::process::exit(1);
    }

    if show_diff && !json {
        for path in result.affected_files() {
            let original = before.get(&path).map(String::as_str).unwrap_or("");
            let modified = project.file(&path).map(|f| f.text()).unwrap_or("");
            if original != modified {
                display_diff(&path, original, modified);
            }
        }
    }

    // 5. Write
    if dry_run {
        if !json {
            println!();
            println!(
                "{}",
                format!(
                    "[DRY RUN] {} file(s) would change",
                    result.affected_files().len()
                )
                .cyan()
            );
        }
        return Ok(());
    }

    let written = project.persist()?;
    if !json {
        println!();
        println!("{}", "Committed:".green().bold());
        for path in &written {
            println!("  {}", path);
        }
    }

    Ok(())
}

fn cmd_plan(operations: &Path) -> Result<()> {
    let request = read_request(operations)?;

    println!("{}", "Refactor plan".bold());
    println!(
        "Stop on error: {}",
        if request.options.stop_on_error { "yes" } else { "no" }
    );
    println!();
    for (index, operation) in request.operations.iter().enumerate() {
        println!("  {}. {}", index + 1, operation.describe());
    }

    Ok(())
}

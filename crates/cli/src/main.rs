//! mergebench command-line workbench.
//!
//! Provides subcommands for inspecting merge state, starting a merge,
//! listing and viewing conflicts, applying resolutions, and aborting or
//! completing an in-progress merge.

mod style;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};
use tracing_subscriber::EnvFilter;

use mergebench_core::backend::{GitBackend, MergeOutcome};
use mergebench_core::conflict::{
    ConflictParser, MergePhase, MergeStateTracker, ResolutionApplicator, ResolutionChoice,
};
use mergebench_core::config::WorkbenchConfig;

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

/// Merge-conflict workbench for local Git repositories.
#[derive(Parser, Debug)]
#[command(
    name = "mergebench",
    version,
    about = "Inspect, resolve, and complete Git merge conflicts from the terminal"
)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Repository path (overrides the configured default).
    #[arg(short, long, global = true)]
    repo: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show current merge state and conflicting files.
    Status {
        /// Emit machine-readable JSON instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// Merge a branch or ref into the current branch.
    Merge {
        /// Branch name or ref to merge.
        target: String,

        /// Refuse the merge unless it can fast-forward.
        #[arg(long)]
        ff_only: bool,

        /// Commit message for the merge commit.
        #[arg(short, long)]
        message: Option<String>,
    },

    /// Inspect conflicting files.
    Conflicts {
        #[command(subcommand)]
        action: ConflictsAction,
    },

    /// Resolve one conflicting file.
    Resolve {
        /// Repository-relative path of the conflicting file.
        path: String,

        /// Side to accept: ours or theirs.
        #[arg(long, conflicts_with = "edited")]
        accept: Option<String>,

        /// Use the contents of this file as a manual resolution.
        #[arg(long)]
        edited: Option<PathBuf>,
    },

    /// Abort the in-progress merge (destructive: discards all merge edits).
    Abort {
        /// Skip the confirmation prompt.
        #[arg(short, long)]
        yes: bool,
    },

    /// Create the merge commit once all conflicts are resolved.
    Complete {
        /// Commit message (defaults to the configured merge message).
        #[arg(short, long)]
        message: Option<String>,
    },

    /// Generate a default configuration file.
    Init {
        /// Output path for the generated config file.
        #[arg(short, long, default_value = "./mergebench.toml")]
        output: PathBuf,
    },

    /// Validate a configuration file.
    Validate,
}

#[derive(Subcommand, Debug)]
enum ConflictsAction {
    /// List all conflicting paths.
    List,
    /// Show the conflict regions of one file.
    Show {
        /// Repository-relative path.
        path: String,
    },
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> ExitCode {
    // Minimal logging for CLI
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("warn"))
        .with_target(false)
        .without_time()
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", style::error(&format!("{:#}", e)));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.clone().unwrap_or_else(default_config_path);

    match cli.command {
        Commands::Init { output } => return cmd_init(&output),
        Commands::Validate => return cmd_validate(&config_path),
        _ => {}
    }

    tracing::debug!(path = %config_path.display(), "using configuration path");
    let config =
        WorkbenchConfig::load_or_default(&config_path).context("failed to load configuration")?;
    let repo_path = cli
        .repo
        .clone()
        .unwrap_or_else(|| config.workbench.repository.clone());
    let backend = GitBackend::open(&repo_path, &config.author.name, &config.author.email)
        .with_context(|| format!("failed to open repository at '{}'", repo_path.display()))?;

    match cli.command {
        Commands::Status { json } => cmd_status(&backend, json),
        Commands::Merge {
            target,
            ff_only,
            message,
        } => cmd_merge(&backend, &config, &target, ff_only, message.as_deref()),
        Commands::Conflicts { action } => match action {
            ConflictsAction::List => cmd_conflicts_list(&backend),
            ConflictsAction::Show { path } => cmd_conflicts_show(&backend, &path),
        },
        Commands::Resolve {
            path,
            accept,
            edited,
        } => cmd_resolve(&backend, &path, accept.as_deref(), edited.as_deref()),
        Commands::Abort { yes } => cmd_abort(&backend, yes),
        Commands::Complete { message } => cmd_complete(&backend, &config, message.as_deref()),
        Commands::Init { .. } | Commands::Validate => unreachable!(),
    }
}

fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mergebench")
        .join("config.toml")
}

/// Abbreviate a commit sha for display. Tolerates shas shorter than the
/// abbreviation width.
fn short_sha(sha: &str) -> &str {
    &sha[..12.min(sha.len())]
}

// ---------------------------------------------------------------------------
// Subcommand implementations
// ---------------------------------------------------------------------------

fn cmd_status(backend: &GitBackend, json: bool) -> Result<()> {
    let mut tracker = MergeStateTracker::new(backend);
    let state = tracker.refresh().context("failed to query merge state")?;

    if json {
        println!("{}", serde_json::to_string_pretty(state)?);
        return Ok(());
    }

    let branch = backend
        .current_branch()
        .unwrap_or(None)
        .unwrap_or_else(|| "(detached)".into());

    println!();
    println!("{}", style::header("Repository"));
    println!("  branch: {}", branch);
    if let Ok(sha) = backend.head_sha() {
        println!("  head:   {}", style::dim(short_sha(&sha)));
    }
    println!();

    match state.phase() {
        MergePhase::NotMerging => println!("{}", style::status_idle()),
        MergePhase::MergingResolved => {
            println!("{}", style::status_merging());
            println!(
                "{}",
                style::success("All conflicts resolved — run 'mergebench complete'")
            );
        }
        MergePhase::MergingWithConflicts => {
            println!("{}", style::status_merging());
            println!();
            print_conflict_table(backend, &state.conflicting_paths.iter().cloned().collect::<Vec<_>>())?;
        }
    }
    println!();
    Ok(())
}

fn print_conflict_table(backend: &GitBackend, paths: &[String]) -> Result<()> {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["File", "Regions"]);

    for path in paths {
        let regions = match ConflictParser::load(backend, path)? {
            Some(file) => file.conflict_markers.len().to_string(),
            None => "—".to_string(),
        };
        table.add_row(vec![Cell::new(path), Cell::new(&regions)]);
    }

    println!("{}", table);
    Ok(())
}

fn cmd_merge(
    backend: &GitBackend,
    config: &WorkbenchConfig,
    target: &str,
    ff_only: bool,
    message: Option<&str>,
) -> Result<()> {
    let mut tracker = MergeStateTracker::new(backend);
    tracker.refresh().context("failed to query merge state")?;

    if tracker.state().is_merging {
        anyhow::bail!("a merge is already in progress; resolve it or run 'mergebench abort'");
    }

    let ff_only = ff_only || config.merge.fast_forward_only;
    let outcome = tracker
        .begin_merge(target, ff_only, message)
        .context("merge failed")?;

    match outcome {
        MergeOutcome::AlreadyUpToDate => {
            println!("{}", style::success("Already up to date"));
        }
        MergeOutcome::FastForward { new_head } => {
            println!(
                "{}",
                style::success(&format!("Fast-forwarded to {}", short_sha(&new_head)))
            );
        }
        MergeOutcome::Success { new_head } => {
            println!(
                "{}",
                style::success(&format!("Merge commit created: {}", short_sha(&new_head)))
            );
        }
        MergeOutcome::Conflicting { paths } => {
            println!(
                "{}",
                style::warn(&format!("Merge has {} conflicting file(s):", paths.len()))
            );
            println!();
            print_conflict_table(backend, &paths)?;
            println!();
            println!(
                "{}",
                style::dim("Resolve each with 'mergebench resolve', then 'mergebench complete'")
            );
        }
        MergeOutcome::Failed { reason } => {
            anyhow::bail!("merge failed: {}", reason);
        }
    }
    Ok(())
}

fn cmd_conflicts_list(backend: &GitBackend) -> Result<()> {
    let mut tracker = MergeStateTracker::new(backend);
    let state = tracker.refresh().context("failed to query merge state")?;

    if state.conflicting_paths.is_empty() {
        println!("{}", style::success("No conflicting files"));
        return Ok(());
    }

    println!();
    println!(
        "{}",
        style::header(&format!(
            "Conflicting files ({})",
            state.conflicting_paths.len()
        ))
    );
    println!();
    print_conflict_table(backend, &state.conflicting_paths.iter().cloned().collect::<Vec<_>>())?;
    println!();
    Ok(())
}

fn cmd_conflicts_show(backend: &GitBackend, path: &str) -> Result<()> {
    let conflict = match ConflictParser::load(backend, path)? {
        Some(file) => file,
        None => {
            println!(
                "{}",
                style::warn(&format!("'{}' is missing — nothing to resolve", path))
            );
            return Ok(());
        }
    };

    if conflict.conflict_markers.is_empty() {
        println!(
            "{}",
            style::success(&format!("'{}' contains no conflict markers", path))
        );
        return Ok(());
    }

    println!();
    println!(
        "{}",
        style::header(&format!(
            "{} — {} region(s)",
            path,
            conflict.conflict_markers.len()
        ))
    );

    for (i, region) in conflict.conflict_markers.iter().enumerate() {
        println!();
        println!(
            "{}",
            style::dim(&format!(
                "Region {} (lines {}-{})",
                i + 1,
                region.start_line + 1,
                region.end_line + 1
            ))
        );
        println!("{}", style::ours_label("  ours:"));
        for line in &region.ours_lines {
            println!("    {}", line);
        }
        println!("{}", style::theirs_label("  theirs:"));
        for line in &region.theirs_lines {
            println!("    {}", line);
        }
    }
    println!();
    Ok(())
}

fn cmd_resolve(
    backend: &GitBackend,
    path: &str,
    accept: Option<&str>,
    edited: Option<&std::path::Path>,
) -> Result<()> {
    let choice = match (accept, edited) {
        (Some("ours"), None) => ResolutionChoice::UseOurs,
        (Some("theirs"), None) => ResolutionChoice::UseTheirs,
        (Some(other), None) => {
            anyhow::bail!("invalid resolution '{}': use 'ours' or 'theirs'", other)
        }
        (None, Some(file)) => {
            let text = std::fs::read_to_string(file)
                .with_context(|| format!("failed to read '{}'", file.display()))?;
            ResolutionChoice::ManualEdit(text)
        }
        (None, None) => anyhow::bail!("specify --accept ours|theirs or --edited <file>"),
        (Some(_), Some(_)) => unreachable!(),
    };

    let conflict = match ConflictParser::load(backend, path)? {
        Some(file) => file,
        None => {
            println!(
                "{}",
                style::warn(&format!("'{}' is missing — nothing to resolve", path))
            );
            return Ok(());
        }
    };

    ResolutionApplicator::apply(backend, &conflict, &choice)
        .with_context(|| format!("failed to apply resolution for '{}'", path))?;

    let mut tracker = MergeStateTracker::new(backend);
    let state = tracker.refresh().context("failed to refresh merge state")?;

    println!("{}", style::success(&format!("Resolved '{}'", path)));
    match state.phase() {
        MergePhase::MergingResolved => println!(
            "{}",
            style::success("All conflicts resolved — run 'mergebench complete'")
        ),
        MergePhase::MergingWithConflicts => println!(
            "{}",
            style::dim(&format!(
                "{} conflicting file(s) remaining",
                state.conflicting_paths.len()
            ))
        ),
        MergePhase::NotMerging => {}
    }
    Ok(())
}

fn cmd_abort(backend: &GitBackend, yes: bool) -> Result<()> {
    let mut tracker = MergeStateTracker::new(backend);
    tracker.refresh().context("failed to query merge state")?;

    if !tracker.state().is_merging {
        anyhow::bail!("no merge is in progress");
    }

    if !yes {
        let confirmed = dialoguer::Confirm::new()
            .with_prompt("Abort the merge and discard ALL merge-in-progress edits?")
            .default(false)
            .interact()
            .context("confirmation prompt failed")?;
        if !confirmed {
            println!("{}", style::dim("Abort cancelled"));
            return Ok(());
        }
    }

    tracker.abort().context("failed to abort merge")?;
    println!("{}", style::success("Merge aborted, working tree reset to HEAD"));
    Ok(())
}

fn cmd_complete(
    backend: &GitBackend,
    config: &WorkbenchConfig,
    message: Option<&str>,
) -> Result<()> {
    let mut tracker = MergeStateTracker::new(backend);
    tracker.refresh().context("failed to query merge state")?;

    let message = message.unwrap_or(&config.merge.default_message);
    let sha = tracker
        .complete(message)
        .context("failed to complete merge")?;

    println!(
        "{}",
        style::success(&format!("Merge commit created: {}", short_sha(&sha)))
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// Config commands
// ---------------------------------------------------------------------------

fn cmd_init(output: &PathBuf) -> Result<()> {
    if output.exists() {
        anyhow::bail!("'{}' already exists, refusing to overwrite", output.display());
    }
    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create '{}'", parent.display()))?;
        }
    }
    std::fs::write(output, WorkbenchConfig::default_template())
        .with_context(|| format!("failed to write '{}'", output.display()))?;
    println!(
        "{}",
        style::success(&format!("Wrote config template to '{}'", output.display()))
    );
    Ok(())
}

fn cmd_validate(config_path: &PathBuf) -> Result<()> {
    let config = WorkbenchConfig::load_from_file(config_path)
        .with_context(|| format!("failed to load '{}'", config_path.display()))?;
    config.validate().context("configuration is invalid")?;
    println!(
        "{}",
        style::success(&format!("'{}' is valid", config_path.display()))
    );
    Ok(())
}

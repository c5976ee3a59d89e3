use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use similar::{ChangeTag, TextDiff};
use source_patcher::config::{
    check_jobs, discover_job_files, load_from_path, read_project_version, run_jobs, JobOutcome,
    JobReport, RunError, RunMode,
};
use source_patcher::logging::init_cli_logger;
use source_patcher::patcher::PatchReason;
use source_patcher::presets::{self, PRESETS};
use std::env;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "source-patcher")]
#[command(about = "Idempotent text patching for TypeScript/TSX components", long_about = None)]
#[command(version)]
struct Cli {
    /// Log rule-by-rule progress to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply job files to a workspace
    Apply {
        /// Path to workspace root (auto-detected if not specified)
        #[arg(short, long)]
        workspace: Option<PathBuf>,

        /// Specific job file to apply (otherwise applies all in patches/)
        #[arg(short, long)]
        patches: Option<PathBuf>,

        /// Dry run - show what would be changed without modifying files
        #[arg(short = 'n', long)]
        dry_run: bool,

        /// Show unified diff of changes
        #[arg(short, long)]
        diff: bool,
    },

    /// Run one built-in preset
    Run {
        /// Preset name (see `list`)
        preset: String,

        /// Path to workspace root (auto-detected if not specified)
        #[arg(short, long)]
        workspace: Option<PathBuf>,

        /// Dry run - show what would be changed without modifying files
        #[arg(short = 'n', long)]
        dry_run: bool,

        /// Show unified diff of changes
        #[arg(short, long)]
        diff: bool,
    },

    /// Check status of job files without applying
    Status {
        /// Path to workspace root (auto-detected if not specified)
        #[arg(short, long)]
        workspace: Option<PathBuf>,

        /// Specific job file to check (otherwise checks all in patches/)
        #[arg(short, long)]
        patches: Option<PathBuf>,
    },

    /// List built-in presets and discovered job files
    List {
        /// Path to workspace root (auto-detected if not specified)
        #[arg(short, long)]
        workspace: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_cli_logger(cli.verbose);

    match cli.command {
        Commands::Apply {
            workspace,
            patches,
            dry_run,
            diff,
        } => cmd_apply(workspace, patches, dry_run, diff),

        Commands::Run {
            preset,
            workspace,
            dry_run,
            diff,
        } => cmd_run(&preset, workspace, dry_run, diff),

        Commands::Status { workspace, patches } => cmd_status(workspace, patches),

        Commands::List { workspace } => cmd_list(workspace),
    }
}

/// Resolve workspace path using multiple detection strategies
///
/// Priority order:
/// 1. Explicit --workspace flag
/// 2. SOURCE_PATCHER_WORKSPACE environment variable
/// 3. Nearest ancestor of the current directory holding a package.json
/// 4. The current directory itself
fn resolve_workspace(cli_workspace: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(path) = cli_workspace {
        return path
            .canonicalize()
            .with_context(|| format!("workspace {} does not exist", path.display()));
    }

    if let Ok(env_path) = env::var("SOURCE_PATCHER_WORKSPACE") {
        let path = PathBuf::from(&env_path);
        if path.exists() {
            return Ok(path.canonicalize()?);
        }
        eprintln!(
            "{}",
            format!(
                "Warning: SOURCE_PATCHER_WORKSPACE is set but path doesn't exist: {}",
                env_path
            )
            .yellow()
        );
    }

    let current = env::current_dir()?;
    if let Some(root) = current
        .ancestors()
        .find(|dir| dir.join("package.json").is_file())
    {
        tracing::debug!(workspace = %root.display(), "auto-detected workspace");
        return Ok(root.to_path_buf());
    }

    tracing::debug!(workspace = %current.display(), "no package.json found, using current directory");
    Ok(current)
}

/// Job files from `<workspace>/patches`, falling back to `./patches`.
fn discover_patch_files(workspace: &Path) -> Result<Vec<PathBuf>> {
    let mut candidates = vec![workspace.join("patches")];
    if let Ok(cwd) = env::current_dir() {
        candidates.push(cwd.join("patches"));
    }

    for dir in candidates {
        let files = discover_job_files(&dir)?;
        if !files.is_empty() {
            return Ok(files);
        }
    }

    Ok(Vec::new())
}

fn job_files(workspace: &Path, explicit: Option<PathBuf>) -> Result<Vec<PathBuf>> {
    if let Some(path) = explicit {
        return Ok(vec![path]);
    }
    let files = discover_patch_files(workspace)?;
    if files.is_empty() {
        anyhow::bail!(
            "No .toml job files found in either ./patches or {}/patches",
            workspace.display()
        );
    }
    Ok(files)
}

fn project_version(workspace: &Path, warn: bool) -> String {
    read_project_version(workspace).unwrap_or_else(|e| {
        if warn {
            eprintln!(
                "{}",
                format!("Warning: {e}; using 0.0.0 as the project version").yellow()
            );
        }
        "0.0.0".to_string()
    })
}

/// Helper: Show unified diff between original and modified content
fn display_diff(file: &str, original: &str, modified: &str) {
    println!("\n{}", format!("--- {} (original)", file).dimmed());
    println!("{}", format!("+++ {} (patched)", file).dimmed());

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

#[derive(Default)]
struct Totals {
    applied: usize,
    already: usize,
    skipped: usize,
    not_found: usize,
    failed: usize,
}

fn print_report(report: &JobReport, show_diff: bool, totals: &mut Totals) {
    let id = &report.id;
    match &report.outcome {
        Ok(JobOutcome::Patched {
            result,
            before,
            after,
            written,
        }) => {
            match &result.reason {
                PatchReason::Applied { rules_applied } => {
                    let verb = if *written { "Applied" } else { "Would apply" };
                    println!(
                        "{} {}: {} {} rule(s) to {}",
                        "✓".green(),
                        id,
                        verb,
                        rules_applied,
                        report.file
                    );
                    totals.applied += 1;
                    if show_diff {
                        display_diff(&report.file, before, after);
                    }
                }
                PatchReason::AlreadyPatched { .. } => {
                    println!("{} {}: Already patched {}", "⊙".yellow(), id, report.file);
                    totals.already += 1;
                }
                PatchReason::PatternNotFound {
                    rule,
                    kind,
                    pattern,
                    closest,
                } => {
                    eprintln!("{} {}: Pattern not found", "✗".red(), id);
                    eprintln!("  File: {}", report.file);
                    eprintln!("  Rule: #{} {}", rule + 1, kind);
                    eprintln!("  Looking for: {:?}", pattern);
                    if let Some(line) = closest {
                        eprintln!("  Closest line: {:?}", line);
                    }
                    eprintln!("  File left unchanged; it needs manual attention");
                    totals.not_found += 1;
                }
            }

            if let Some(messages) = &report.messages {
                for line in messages.render(result, &report.file) {
                    println!("  {}", line.dimmed());
                }
            }
        }
        Ok(JobOutcome::Skipped { reason }) => {
            println!("{} {}: Skipped ({})", "⊘".cyan(), id, reason);
            totals.skipped += 1;
        }
        Err(e) => {
            eprintln!("{} {}: Error - {}", "✗".red(), id, e);
            totals.failed += 1;

            if let RunError::MissingFile { file } = e {
                eprintln!("  File: {}", file.display());
                eprintln!("  Possible causes:");
                eprintln!("    - Component was renamed or moved");
                eprintln!("    - Wrong workspace (try --workspace)");
            }
        }
    }
}

fn cmd_apply(
    workspace: Option<PathBuf>,
    patches: Option<PathBuf>,
    dry_run: bool,
    show_diff: bool,
) -> Result<()> {
    let workspace = resolve_workspace(workspace)?;
    let files = job_files(&workspace, patches)?;
    let version = project_version(&workspace, true);

    println!("Workspace: {}", workspace.display());
    println!("Version: {}", version);
    println!();

    let mode = if dry_run { RunMode::Check } else { RunMode::Apply };
    let mut totals = Totals::default();

    for job_file in files {
        println!("Loading jobs from {}...", job_file.display());
        let config = load_from_path(&job_file)?;

        if dry_run {
            println!("{}", "  [DRY RUN - showing what would be applied]".cyan());
        }

        for report in run_jobs(&config, &workspace, &version, mode) {
            print_report(&report, show_diff, &mut totals);
        }

        println!();
    }

    println!("{}", "Summary:".bold());
    println!("  {} applied", format!("{}", totals.applied).green());
    println!(
        "  {} already patched",
        format!("{}", totals.already).yellow()
    );
    println!("  {} skipped", format!("{}", totals.skipped).cyan());
    println!("  {} pattern not found", format!("{}", totals.not_found).red());
    println!("  {} failed", format!("{}", totals.failed).red());

    if totals.failed > 0 || totals.not_found > 0 {
        std::process::exit(1);
    }

    Ok(())
}

fn cmd_run(name: &str, workspace: Option<PathBuf>, dry_run: bool, show_diff: bool) -> Result<()> {
    let preset = presets::find(name).with_context(|| {
        format!("unknown preset '{name}' (run `source-patcher list` to see them)")
    })?;
    let config = preset.config()?;
    let workspace = resolve_workspace(workspace)?;
    let version = project_version(&workspace, false);
    let mode = if dry_run { RunMode::Check } else { RunMode::Apply };

    for report in run_jobs(&config, &workspace, &version, mode) {
        match report.outcome {
            Ok(JobOutcome::Patched {
                result,
                before,
                after,
                ..
            }) => {
                let lines = report
                    .messages
                    .as_ref()
                    .map(|m| m.render(&result, &report.file))
                    .unwrap_or_default();

                if result.is_not_found() && lines.is_empty() {
                    eprintln!("{}", result.to_string().yellow());
                }
                for line in lines {
                    println!("{line}");
                }
                if show_diff && before != after {
                    display_diff(&report.file, &before, &after);
                }
            }
            Ok(JobOutcome::Skipped { reason }) => println!("Skipped ({reason})"),
            Err(e) => {
                return Err(anyhow::Error::new(e)
                    .context(format!("{} failed on {}", preset.name, report.file)));
            }
        }
    }

    Ok(())
}

fn cmd_status(workspace: Option<PathBuf>, patches: Option<PathBuf>) -> Result<()> {
    let workspace = resolve_workspace(workspace)?;
    let files = job_files(&workspace, patches)?;
    let version = project_version(&workspace, true);

    println!("{}", "Job Status Report".bold());
    println!("Workspace: {}", workspace.display());
    println!("Version: {}", version);
    println!();

    let mut applied = Vec::new();
    let mut not_applied = Vec::new();
    let mut skipped = Vec::new();

    for job_file in files {
        let config = load_from_path(&job_file)?;

        for report in check_jobs(&config, &workspace, &version) {
            match report.outcome {
                Ok(JobOutcome::Patched { result, .. }) => match result.reason {
                    PatchReason::AlreadyPatched { .. } => applied.push(report.id),
                    PatchReason::Applied { .. } => {
                        not_applied.push((report.id, "would change file".to_string()))
                    }
                    PatchReason::PatternNotFound { .. } => {
                        not_applied.push((report.id, result.to_string()))
                    }
                },
                Ok(JobOutcome::Skipped { reason }) => skipped.push((report.id, reason)),
                Err(e) => not_applied.push((report.id, e.to_string())),
            }
        }
    }

    if !applied.is_empty() {
        println!(
            "{} {} ({} jobs)",
            "✓".green(),
            "APPLIED".green().bold(),
            applied.len()
        );
        for id in &applied {
            println!("  - {}", id);
        }
        println!();
    }

    if !not_applied.is_empty() {
        println!(
            "{} {} ({} jobs)",
            "⊙".yellow(),
            "NOT APPLIED".yellow().bold(),
            not_applied.len()
        );
        for (id, reason) in &not_applied {
            println!("  - {} ({})", id, reason.dimmed());
        }
        println!();
    }

    if !skipped.is_empty() {
        println!(
            "{} {} ({} jobs)",
            "⊘".cyan(),
            "SKIPPED".cyan().bold(),
            skipped.len()
        );
        for (id, reason) in &skipped {
            println!("  - {} ({})", id, reason.dimmed());
        }
        println!();
    }

    Ok(())
}

fn cmd_list(workspace: Option<PathBuf>) -> Result<()> {
    println!("{}", "Presets:".bold());
    for preset in PRESETS {
        println!("  {:<28} {}", preset.name, preset.summary.dimmed());
    }

    let workspace = resolve_workspace(workspace)?;
    let files = discover_patch_files(&workspace)?;

    println!();
    println!("{}", "Job files:".bold());
    if files.is_empty() {
        println!("  {}", "(none found in patches/)".dimmed());
    }
    for file in files {
        match load_from_path(&file) {
            Ok(config) => {
                let range = config.meta.version_range.as_deref().unwrap_or("*");
                println!(
                    "  {} ({} jobs, version {})",
                    file.display(),
                    config.jobs.len(),
                    range
                );
            }
            Err(e) => println!("  {} {}", file.display(), format!("invalid: {e}").red()),
        }
    }

    Ok(())
}

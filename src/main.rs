use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use forwarder_patcher::{
    forwarder_catalog, glob_rules, run_explicit, run_glob, ApplyResult, BatchOptions, BatchReport,
    PatchRule, DEFAULT_TEST_DIR, TEST_FILE_SUFFIX,
};
use similar::{ChangeTag, TextDiff};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "forwarder-patcher")]
#[command(about = "Retrofit EIP-2771 forwarder wiring into Foundry test suites", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply the per-file constructor substitution catalog
    Apply {
        /// Base directory containing the test files
        #[arg(short, long, default_value = DEFAULT_TEST_DIR)]
        dir: PathBuf,

        /// Dry run - show what would be changed without modifying files
        #[arg(short = 'n', long)]
        dry_run: bool,

        /// Show unified diff of changes
        #[arg(long)]
        diff: bool,
    },

    /// Apply the shared forwarder rules to every *.t.sol file
    Scan {
        /// Base directory containing the test files
        #[arg(short, long, default_value = DEFAULT_TEST_DIR)]
        dir: PathBuf,

        /// Dry run - show what would be changed without modifying files
        #[arg(short = 'n', long)]
        dry_run: bool,

        /// Show unified diff of changes
        #[arg(long)]
        diff: bool,
    },

    /// List catalog targets and their rule counts
    List,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Apply { dir, dry_run, diff } => cmd_apply(dir, dry_run, diff),
        Commands::Scan { dir, dry_run, diff } => cmd_scan(dir, dry_run, diff),
        Commands::List => cmd_list(),
    }
}

fn cmd_apply(dir: PathBuf, dry_run: bool, diff: bool) -> Result<()> {
    ensure_dir(&dir)?;
    let catalog = forwarder_catalog();
    let report = run_explicit(&dir, &catalog, BatchOptions { dry_run });
    print_report(&report, dry_run, diff);
    finish(&report)
}

fn cmd_scan(dir: PathBuf, dry_run: bool, diff: bool) -> Result<()> {
    ensure_dir(&dir)?;
    let report = run_glob(&dir, TEST_FILE_SUFFIX, &glob_rules(), BatchOptions { dry_run });
    print_report(&report, dry_run, diff);
    finish(&report)
}

fn cmd_list() -> Result<()> {
    let catalog = forwarder_catalog();
    println!("{}", "Catalog targets:".bold());
    for target in &catalog.targets {
        println!(
            "  {} ({} rule{})",
            target.file,
            target.rules.len(),
            if target.rules.len() == 1 { "" } else { "s" }
        );
    }

    let shared = glob_rules();
    println!();
    println!(
        "{} {} rules for *{} files",
        "Shared scan set:".bold(),
        shared.len(),
        TEST_FILE_SUFFIX
    );
    for rule in &shared {
        match rule {
            PatchRule::Literal { old, .. } => println!("  literal: {}", old.dimmed()),
            PatchRule::Insert(insert) => {
                println!("  insert: {}", insert.locator.as_str().dimmed())
            }
        }
    }

    Ok(())
}

fn ensure_dir(dir: &Path) -> Result<()> {
    if !dir.is_dir() {
        anyhow::bail!("test directory not found: {}", dir.display());
    }
    Ok(())
}

fn print_report(report: &BatchReport, dry_run: bool, show_diff: bool) {
    if dry_run {
        println!("{}", "[DRY RUN - no files will be modified]".cyan());
    }

    for file in &report.files {
        match &file.result {
            Ok(ApplyResult::Updated { before, after }) => {
                if dry_run {
                    println!("{} Would update {}", "✓".green(), file.name);
                } else {
                    println!("{} Updated {}", "✓".green(), file.name);
                }
                if show_diff {
                    print_diff(&file.name, before, after);
                }
            }
            Ok(ApplyResult::Skipped) => {
                println!(
                    "{} Skipped {} {}",
                    "-".dimmed(),
                    file.name,
                    "(no changes needed)".dimmed()
                );
            }
            Ok(ApplyResult::Missing) => {
                println!("{} Not found: {}", "✗".red(), file.name);
            }
            Err(e) => {
                eprintln!("{} Failed {}: {}", "✗".red(), file.name, e);
            }
        }
    }

    println!();
    println!(
        "{} Updated {}/{} test files",
        "✓".green(),
        report.updated(),
        report.total()
    );

    let updated = report.updated_names();
    if !updated.is_empty() {
        println!("Updated files:");
        for name in updated {
            println!("  - {}", name);
        }
    }
}

fn print_diff(name: &str, before: &str, after: &str) {
    println!("{}", format!("--- {} (original)", name).dimmed());
    println!("{}", format!("+++ {} (patched)", name).dimmed());

    let diff = TextDiff::from_lines(before, after);
    for change in diff.iter_all_changes() {
        let line = match change.tag() {
            ChangeTag::Delete => format!("-{}", change).red(),
            ChangeTag::Insert => format!("+{}", change).green(),
            ChangeTag::Equal => format!(" {}", change).normal(),
        };
        print!("{}", line);
    }
}

/// Missing files do not affect the exit code; per-file I/O failures do.
fn finish(report: &BatchReport) -> Result<()> {
    if report.failed() > 0 {
        std::process::exit(1);
    }
    Ok(())
}

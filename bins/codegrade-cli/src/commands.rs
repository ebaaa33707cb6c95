// CLI commands for operating CodeGrade
use anyhow::{bail, Context, Result};
use codegrade_common::config::{AppConfig, LanguageEntry, LanguageTable};
use codegrade_common::types::{Aggregate, ExecutionResult, ProblemDraft};
use codegrade_engine::orchestrator::{self_test_passed, SELF_TEST_LANGUAGE, SELF_TEST_SOURCE};
use codegrade_engine::{execute_test_cases, run_once, CodeExecutor, Judge0Engine};
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

/// Load the language table, falling back to the built-in one
fn load_table(path: &Path) -> Result<LanguageTable> {
    LanguageTable::load_or_builtin(path)
        .with_context(|| format!("Failed to load language table from {}", path.display()))
}

fn save_table(path: &Path, table: &LanguageTable) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let json_content = table.to_json_pretty().context("Failed to serialize languages.json")?;
    fs::write(path, json_content).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

/// Execution client configured from the environment
fn connect_engine() -> Result<Judge0Engine> {
    let config = AppConfig::from_env().context("Failed to read configuration")?;
    let judge = config.require_judge()?;
    Ok(Judge0Engine::new(judge)?)
}

fn read_source(file: &Path) -> Result<String> {
    fs::read_to_string(file).with_context(|| format!("Failed to read source file {}", file.display()))
}

fn print_result(result: &ExecutionResult) {
    if let Some(status) = result.get("status").and_then(|s| s.get("description")) {
        println!("Status: {}", status.as_str().unwrap_or_default());
    }
    println!("--- stdout ---");
    println!("{}", result.stdout());
    if !result.stderr().is_empty() {
        println!("--- stderr ---");
        println!("{}", result.stderr());
    }
}

/// Write the default language table
pub fn init_languages(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }

    save_table(path, &LanguageTable::builtin())?;
    println!("✓ Wrote default language table to {}", path.display());
    Ok(())
}

pub fn list_languages(path: &Path) -> Result<()> {
    let table = load_table(path)?;
    for entry in table.entries() {
        println!("{:<12} {}", entry.name, entry.language_id);
    }
    Ok(())
}

/// Add a language to the table on disk
pub fn add_language(path: &Path, name: &str, language_id: u32) -> Result<()> {
    if name.trim().is_empty() {
        bail!("Language name cannot be empty");
    }

    let table = load_table(path)?;
    if table.resolve(name).is_ok() {
        bail!("Language '{}' already exists in config", name);
    }

    let mut entries = table.entries();
    entries.push(LanguageEntry {
        name: name.to_string(),
        language_id,
    });
    let updated = LanguageTable::from_entries(entries)?;

    save_table(path, &updated)?;
    println!("✓ Added language '{}' (id {})", name, language_id);
    Ok(())
}

/// Run a source file once with the given stdin
pub async fn run_file(languages: &Path, language: &str, file: &Path, stdin: &str) -> Result<()> {
    let table = load_table(languages)?;
    let engine = connect_engine()?;

    let result = run_file_with(&engine, &table, language, file, stdin).await?;
    print_result(&result);
    Ok(())
}

async fn run_file_with(
    executor: &dyn CodeExecutor,
    table: &LanguageTable,
    language: &str,
    file: &Path,
    stdin: &str,
) -> Result<ExecutionResult> {
    let source_code = read_source(file)?;
    Ok(run_once(executor, table, &source_code, language, stdin).await?)
}

/// Evaluate a file against every test case of a local problem definition
pub async fn preview_problem(languages: &Path, problem: &Path, language: &str, file: &Path) -> Result<()> {
    let table = load_table(languages)?;
    let engine = connect_engine()?;

    let report = preview_problem_with(&engine, &table, problem, language, file).await?;
    print!("{}", report);
    Ok(())
}

async fn preview_problem_with(
    executor: &dyn CodeExecutor,
    table: &LanguageTable,
    problem: &Path,
    language: &str,
    file: &Path,
) -> Result<String> {
    let language_id = table.resolve(language)?;

    let content = fs::read_to_string(problem)
        .with_context(|| format!("Failed to read problem file {}", problem.display()))?;
    let draft: ProblemDraft = serde_json::from_str(&content).context("Failed to parse problem file")?;
    let source_code = read_source(file)?;

    let aggregate = execute_test_cases(executor, &source_code, language_id, &draft.test_cases).await?;
    Ok(format_preview(&draft.title, &aggregate))
}

fn format_preview(title: &str, aggregate: &Aggregate) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "→ Evaluating '{}' ({} test cases)", title, aggregate.total);
    for (idx, outcome) in aggregate.details.iter().enumerate() {
        if outcome.ok {
            let _ = writeln!(out, "  Test {} ✓", idx + 1);
        } else {
            let _ = writeln!(out, "  Test {} ✗", idx + 1);
            let _ = writeln!(out, "    Expected: \"{}\"", outcome.expected);
            let _ = writeln!(out, "    Got:      \"{}\"", outcome.actual);
        }
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "Passed {} / {}", aggregate.passed, aggregate.total);
    out
}

/// Round trip a trivial program through the execution service
pub async fn selftest(languages: &Path) -> Result<()> {
    let table = load_table(languages)?;
    let engine = connect_engine()?;

    let result = selftest_with(&engine, &table).await?;
    print_result(&result);
    println!("✓ Execution service reachable");
    Ok(())
}

async fn selftest_with(executor: &dyn CodeExecutor, table: &LanguageTable) -> Result<ExecutionResult> {
    let result = run_once(executor, table, SELF_TEST_SOURCE, SELF_TEST_LANGUAGE, "")
        .await
        .context("Self-test needs python in the language table and a reachable service")?;

    if !self_test_passed(&result) {
        bail!("Unexpected self-test output: {:?}", result.stdout());
    }
    Ok(result)
}

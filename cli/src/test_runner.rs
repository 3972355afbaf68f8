use std::collections::BTreeMap;
use std::ops::Range;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use outline::parser::Parser;
use outline::render::render_markdown_with;
use outline::toc::TocEntry;
use reorder::{EmptyTargetPolicy, ExtraSectionPolicy, MissingTargetPolicy, ReorgConfig};

#[derive(Debug, Deserialize)]
pub struct ExpectedWarning {
    /// Substring that must appear in the warning message.
    pub contains: String,

    /// If set, the warning's span must start on this 1-based source line.
    #[serde(default)]
    pub line: Option<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TestConfig {
    /// Human-readable test description.
    #[serde(default)]
    pub description: Option<String>,

    /// Table of contents to reorganize against, in the same shape as the YAML file.
    pub toc: Vec<TocEntry>,

    #[serde(default)]
    pub missing: MissingTargetPolicy,

    #[serde(default)]
    pub unmatched: ExtraSectionPolicy,

    #[serde(default)]
    pub empty_toc: EmptyTargetPolicy,

    /// Deepest heading level that opens a section. Defaults to 6.
    #[serde(default)]
    pub max_level: Option<u8>,

    /// Expected reorganized Markdown (trimmed comparison).
    #[serde(default)]
    pub expect_output: Option<String>,

    /// Expected fatal error: the error's Display string must contain this substring.
    #[serde(default)]
    pub expect_error: Option<String>,

    /// Expected warnings. If present (even empty), warning count and content are checked.
    /// Each entry checks message substring and optionally the source line.
    #[serde(default)]
    pub expect_warnings: Option<Vec<ExpectedWarning>>,
}

impl TestConfig {
    fn reorg_config(&self) -> ReorgConfig {
        ReorgConfig::default()
            .with_missing_target(self.missing)
            .with_extra_section(self.unmatched)
            .with_empty_target(self.empty_toc)
    }
}

/// A warning from either the reader or the reorganizer, flattened for comparison.
struct Warning {
    message: String,
    span: Option<Range<usize>>,
}

/// Parse a `.test.md` file into its TOML config and Markdown source.
fn parse_test_file(content: &str) -> Result<(TestConfig, &str), String> {
    let content = content.trim_start_matches('\u{feff}'); // strip BOM

    if !content.starts_with("---") {
        return Err("missing opening --- frontmatter delimiter".into());
    }

    let after_open = &content[3..];
    let after_open = after_open
        .strip_prefix('\n')
        .or_else(|| after_open.strip_prefix("\r\n"))
        .unwrap_or(after_open);

    let close_pos = after_open
        .find("\n---")
        .ok_or("missing closing --- frontmatter delimiter")?;

    let toml_str = after_open[..close_pos].trim_end_matches('\r');
    let rest_start = close_pos + 4; // skip \n---
    let source = after_open[rest_start..]
        .strip_prefix("\r\n")
        .or_else(|| after_open[rest_start..].strip_prefix('\n'))
        .unwrap_or(&after_open[rest_start..]);

    let config: TestConfig =
        toml::from_str(toml_str).map_err(|e| format!("TOML parse error: {}", e))?;

    Ok((config, source))
}

pub enum TestOutcome {
    Pass,
    Fail(String),
}

pub struct TestResult {
    pub path: PathBuf,
    pub description: Option<String>,
    pub outcome: TestOutcome,
}

fn run_single_test(path: &Path) -> TestResult {
    // 1. Read file
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            return TestResult {
                path: path.to_path_buf(),
                description: None,
                outcome: TestOutcome::Fail(format!("cannot read file: {}", e)),
            };
        }
    };

    // 2. Parse frontmatter
    let (config, source) = match parse_test_file(&content) {
        Ok(pair) => pair,
        Err(e) => {
            return TestResult {
                path: path.to_path_buf(),
                description: None,
                outcome: TestOutcome::Fail(format!("frontmatter error: {}", e)),
            };
        }
    };

    let description = config.description.clone();
    let outcome = match check(&config, source) {
        None => TestOutcome::Pass,
        Some(reason) => TestOutcome::Fail(reason),
    };
    TestResult {
        path: path.to_path_buf(),
        description,
        outcome,
    }
}

/// Run one fixture. Returns `Some(reason)` on failure.
fn check(config: &TestConfig, source: &str) -> Option<String> {
    // 1. Read the Markdown
    let mut parser = Parser::new(source.to_string(), 0);
    if let Some(max_level) = config.max_level {
        parser = parser.with_max_level(max_level);
    }
    let stream = parser.parse();
    let mut warnings: Vec<Warning> = stream
        .warnings
        .iter()
        .map(|w| Warning {
            message: w.message.clone(),
            span: Some(w.span.clone()),
        })
        .collect();

    // 2. Reorganize
    let line_ending = stream.line_ending;
    let result = reorder::reorganize_with_toc(stream.blocks, &config.toc, &config.reorg_config());

    // 3. Check error/output expectations
    let result = match (&config.expect_error, result) {
        (Some(expected_err), Err(err)) => {
            let err_str = err.to_string();
            return if err_str.contains(expected_err.as_str()) {
                None
            } else {
                Some(format!(
                    "expected error containing \"{}\", got: {}",
                    expected_err, err_str
                ))
            };
        }
        (Some(expected_err), Ok(_)) => {
            return Some(format!(
                "expected error containing \"{}\", but reorganization succeeded",
                expected_err
            ));
        }
        (None, Err(err)) => return Some(format!("unexpected error: {}", err)),
        (None, Ok(result)) => result,
    };

    if let Some(expected_output) = &config.expect_output {
        let actual = render_markdown_with(&result.blocks, line_ending);
        let actual_trimmed = actual.trim();
        let expected_trimmed = expected_output.trim();
        if actual_trimmed != expected_trimmed {
            return Some(format!(
                "output mismatch\n  expected:\n{}\n  actual:\n{}",
                indent(expected_trimmed),
                indent(actual_trimmed)
            ));
        }
    }

    // 4. Check warning expectations
    warnings.extend(result.diagnostics.warnings().map(|d| Warning {
        message: d.to_string(),
        span: d.span.clone(),
    }));
    let expected_warnings = config.expect_warnings.as_ref()?;
    check_warnings(source, &warnings, expected_warnings)
}

fn indent(text: &str) -> String {
    text.lines()
        .map(|line| format!("    {}", line))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Convert a byte offset in `source` to a 1-based line number.
fn byte_offset_to_line(source: &str, offset: usize) -> usize {
    source[..offset.min(source.len())]
        .bytes()
        .filter(|&b| b == b'\n')
        .count()
        + 1
}

/// Check that actual warnings match expectations. Returns `Some(reason)` on mismatch.
fn check_warnings(source: &str, actual_warnings: &[Warning], expected: &[ExpectedWarning]) -> Option<String> {
    if actual_warnings.len() != expected.len() {
        let actual_msgs: Vec<String> = actual_warnings
            .iter()
            .map(|w| format!("  - {}", w.message))
            .collect();
        return Some(format!(
            "expected {} warning(s), got {}\n  actual warnings:\n{}",
            expected.len(),
            actual_warnings.len(),
            if actual_msgs.is_empty() {
                "    (none)".to_string()
            } else {
                actual_msgs.join("\n")
            }
        ));
    }

    for (i, (actual, expected)) in actual_warnings.iter().zip(expected.iter()).enumerate() {
        if !actual.message.contains(&expected.contains) {
            return Some(format!(
                "warning[{}]: expected message containing \"{}\", got: {}",
                i, expected.contains, actual.message
            ));
        }

        if let Some(expected_line) = expected.line {
            if let Some(span) = &actual.span {
                let actual_line = byte_offset_to_line(source, span.start);
                if actual_line != expected_line {
                    return Some(format!(
                        "warning[{}]: expected on line {}, but span is on line {}",
                        i, expected_line, actual_line
                    ));
                }
            } else {
                return Some(format!(
                    "warning[{}]: expected on line {}, but warning has no span",
                    i, expected_line
                ));
            }
        }
    }

    None
}

/// Fixture files grouped by category: the subfolder path relative to the
/// root, "" for files directly in it. Sorted by category, then by path.
type Suite = BTreeMap<String, Vec<PathBuf>>;

fn discover(root: &Path) -> Suite {
    let mut suite = Suite::new();
    collect_tests(root, root, &mut suite);
    for files in suite.values_mut() {
        files.sort();
    }
    suite
}

fn collect_tests(dir: &Path, root: &Path, suite: &mut Suite) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for path in entries.flatten().map(|e| e.path()) {
        if path.is_dir() {
            collect_tests(&path, root, suite);
            continue;
        }
        let is_fixture = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.ends_with(".test.md"));
        if is_fixture {
            let category = path
                .parent()
                .and_then(|p| p.strip_prefix(root).ok())
                .map(|p| p.to_string_lossy().replace('\\', "/"))
                .unwrap_or_default();
            suite.entry(category).or_default().push(path);
        }
    }
}

fn category_label(category: &str) -> &str {
    if category.is_empty() { "(root)" } else { category }
}

/// List available categories for the given test path.
pub fn list_categories(path: &Path) {
    if path.is_file() {
        eprintln!("(single file, no categories)");
        return;
    }

    let suite = discover(path);
    if suite.is_empty() {
        eprintln!("no .test.md files found in {}", path.display());
        return;
    }

    eprintln!("available categories:");
    for (category, files) in &suite {
        eprintln!("  {} ({} tests)", category_label(category), files.len());
    }
}

/// Keep the categories named in `requested`, including their subcategories.
fn select(suite: Suite, requested: &[String]) -> Suite {
    if requested.is_empty() {
        return suite;
    }
    let mut selected = Suite::new();
    for name in requested {
        let name = name.trim_matches('/');
        let prefix = format!("{}/", name);
        let matching: Vec<&String> = suite
            .keys()
            .filter(|c| c.as_str() == name || c.starts_with(&prefix))
            .collect();
        if matching.is_empty() {
            let available: Vec<&str> = suite.keys().map(|c| category_label(c)).collect();
            eprintln!(
                "warning: category '{}' not found (available: {})",
                name,
                available.join(", ")
            );
        }
        for category in matching {
            selected.insert(category.clone(), suite[category].clone());
        }
    }
    selected
}

struct Style {
    no_color: bool,
}

impl Style {
    fn paint(&self, text: &str, code: &str) -> String {
        if self.no_color {
            text.to_string()
        } else {
            format!("\x1b[{}m{}\x1b[0m", code, text)
        }
    }

    fn pass(&self) -> String {
        self.paint("PASS", "32")
    }

    fn fail(&self) -> String {
        self.paint("FAIL", "31")
    }

    fn bold(&self, text: &str) -> String {
        self.paint(text, "1")
    }
}

/// Run all `.test.md` files under `path` (or a single file).
/// If `categories` is non-empty, only run tests in those categories.
/// Returns exit code: 0 = all pass, 1 = any failure.
pub fn run_tests(path: &Path, no_color: bool, categories: &[String]) -> i32 {
    let style = Style { no_color };

    // A single file runs on its own, without a category header.
    let single = path.is_file();
    let suite = if single {
        Suite::from([(String::new(), vec![path.to_path_buf()])])
    } else {
        let all = discover(path);
        if all.is_empty() {
            eprintln!("no .test.md files found in {}", path.display());
            return 1;
        }
        let selected = select(all, categories);
        if selected.is_empty() {
            eprintln!("no matching categories found");
            return 1;
        }
        selected
    };

    let mut passed = 0usize;
    let mut failures: Vec<TestResult> = Vec::new();

    for (category, files) in &suite {
        if !single {
            eprintln!();
            eprintln!("{}", style.bold(category_label(category)));
        }

        for file in files {
            let result = run_single_test(file);
            let label = result.description.clone().unwrap_or_else(|| {
                file.file_stem()
                    .and_then(|s| s.to_str())
                    .unwrap_or("?")
                    .trim_end_matches(".test")
                    .to_string()
            });
            match &result.outcome {
                TestOutcome::Pass => {
                    passed += 1;
                    eprintln!("  {}  {}", style.pass(), label);
                }
                TestOutcome::Fail(_) => {
                    eprintln!("  {}  {}", style.fail(), label);
                    failures.push(result);
                }
            }
        }
    }

    if !failures.is_empty() {
        eprintln!();
        eprintln!("failures:");
        for failure in &failures {
            eprintln!();
            eprintln!("  --- {} ---", failure.path.display());
            if let TestOutcome::Fail(reason) = &failure.outcome {
                for line in reason.lines() {
                    eprintln!("  {}", line);
                }
            }
        }
    }

    eprintln!();
    let failed = failures.len();
    if failed == 0 {
        eprintln!("test result: {}. {} passed, 0 failed", style.paint("ok", "32"), passed);
        0
    } else {
        eprintln!(
            "test result: {}. {} passed, {} failed (of {})",
            style.paint("FAILED", "31"),
            passed,
            failed,
            passed + failed
        );
        1
    }
}

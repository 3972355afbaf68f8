mod test_runner;

use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use codespan_reporting::diagnostic::Diagnostic;
use codespan_reporting::files::SimpleFiles;
use codespan_reporting::term;
use codespan_reporting::term::termcolor::{ColorChoice, StandardStream};

use outline::BlockStream;
use outline::block::Block;
use outline::parser::MAX_HEADING_LEVEL;
use outline::render::render_markdown_with;
use outline::toc::TocFile;
use reorder::{
    Diagnostics, EmptyTargetPolicy, ExtraSectionPolicy, MissingTargetPolicy, Planned,
    ReconciliationPlan, ReorgConfig, SectionTree, TargetTree,
};

#[derive(Parser)]
#[command(
    name = "mdreorg",
    version,
    about = "Reorder the sections of a Markdown document to follow a table of contents"
)]
struct Cli {
    /// Disable colored diagnostic output
    #[arg(long, global = true)]
    no_color: bool,

    /// Log pipeline progress (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write the table of contents of a document as YAML
    Generate(GenerateArgs),

    /// Reorder a document's sections to follow a YAML table of contents
    Reorganize(ReorganizeArgs),

    /// List the section tree of a document
    Sections(SectionsArgs),

    /// Run .test.md fixture files
    Test(TestArgs),
}

#[derive(clap::Args)]
struct GenerateArgs {
    /// Markdown document to read
    #[arg(short, long)]
    input: PathBuf,

    /// Where to write the YAML (stdout when omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Deepest heading level that opens a section
    #[arg(short = 'l', long, default_value_t = MAX_HEADING_LEVEL)]
    max_level: u8,
}

#[derive(clap::Args)]
struct ReorganizeArgs {
    /// Markdown document to read
    #[arg(short, long)]
    input: PathBuf,

    /// YAML table of contents
    #[arg(short, long)]
    toc: PathBuf,

    /// Where to write the reordered document (stdout when omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Sections not in the table of contents: append, delete or warn
    #[arg(short = 'u', long, default_value_t = ExtraSectionPolicy::Warn)]
    unmatched: ExtraSectionPolicy,

    /// Entries not in the document: error, warn or ignore
    #[arg(short = 'm', long, default_value_t = MissingTargetPolicy::Warn)]
    missing: MissingTargetPolicy,

    /// Meaning of an empty table of contents: preamble-only or unchanged
    #[arg(long, default_value_t = EmptyTargetPolicy::PreambleOnly)]
    empty_toc: EmptyTargetPolicy,

    /// Deepest heading level that opens a section
    #[arg(short = 'l', long, default_value_t = MAX_HEADING_LEVEL)]
    max_level: u8,

    /// Print the placement plan instead of writing the document
    #[arg(long)]
    dry_run: bool,
}

#[derive(clap::Args)]
struct SectionsArgs {
    /// Markdown document to read
    input: PathBuf,

    /// Deepest heading level that opens a section
    #[arg(short = 'l', long, default_value_t = MAX_HEADING_LEVEL)]
    max_level: u8,
}

#[derive(clap::Args)]
struct TestArgs {
    /// Path to a .test.md file or directory containing them
    path: String,

    /// Run only tests in these categories (subfolder names). Repeatable.
    #[arg(short, long)]
    category: Vec<String>,

    /// List available categories and exit
    #[arg(long)]
    list_categories: bool,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Generate(args) => do_generate(args, cli.no_color),
        Command::Reorganize(args) => do_reorganize(args, cli.no_color),
        Command::Sections(args) => do_sections(args, cli.no_color),
        Command::Test(test_args) => {
            let path = Path::new(&test_args.path);
            if test_args.list_categories {
                test_runner::list_categories(path);
                return;
            }
            let exit_code = test_runner::run_tests(path, cli.no_color, &test_args.category);
            process::exit(exit_code);
        }
    }
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .init();
}

/// Terminal output for diagnostics, with the files they point into.
struct Reporter {
    files: SimpleFiles<String, String>,
    writer: StandardStream,
    config: term::Config,
}

impl Reporter {
    fn new(no_color: bool) -> Self {
        let color_choice = if no_color {
            ColorChoice::Never
        } else {
            ColorChoice::Auto
        };
        Reporter {
            files: SimpleFiles::new(),
            writer: StandardStream::stderr(color_choice),
            config: term::Config::default(),
        }
    }

    fn emit(&self, diagnostic: &Diagnostic<usize>) {
        let _ = term::emit_to_write_style(
            &mut self.writer.lock(),
            &self.config,
            &self.files,
            diagnostic,
        );
    }

    fn emit_all(&self, diagnostics: &Diagnostics, file_id: usize) {
        for diagnostic in diagnostics {
            self.emit(&diagnostic.to_codespan(file_id));
        }
    }

    /// Read and parse a Markdown document, reporting reader warnings.
    fn load_document(&mut self, path: &Path, max_level: u8) -> BlockStream {
        let source = read_file(path);
        let file_id = self.files.add(path.display().to_string(), source.clone());
        let stream = outline::parser::Parser::new(source, file_id)
            .with_max_level(max_level)
            .parse();
        for warning in &stream.warnings {
            self.emit(&warning.to_diagnostic());
        }
        log::info!(
            "read {}: {} blocks, {} headings",
            path.display(),
            stream.blocks.len(),
            stream.heading_count()
        );
        stream
    }

    fn fail(&self, message: impl Into<String>) -> ! {
        self.emit(&Diagnostic::error().with_message(message.into()));
        process::exit(1);
    }
}

fn read_file(path: &Path) -> String {
    match fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: cannot read '{}': {}", path.display(), e);
            process::exit(1);
        }
    }
}

/// Exit unless `path` names an existing regular file.
fn require_file(path: &Path, what: &str) {
    if !path.exists() {
        eprintln!("error: {} not found: {}", what, path.display());
        process::exit(1);
    }
    if path.is_dir() {
        eprintln!("error: {} is a directory: {}", what, path.display());
        process::exit(1);
    }
}

fn reject_directory(output: Option<&Path>) {
    if let Some(path) = output.filter(|p| p.is_dir()) {
        eprintln!("error: output path is a directory: {}", path.display());
        process::exit(1);
    }
}

/// Write to `output`, creating missing parent directories, or to stdout.
fn write_output(output: Option<&Path>, text: &str) {
    let Some(path) = output else {
        print!("{}", text);
        return;
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if let Err(e) = fs::create_dir_all(parent) {
            eprintln!("error: cannot create '{}': {}", parent.display(), e);
            process::exit(1);
        }
    }
    if let Err(e) = fs::write(path, text) {
        eprintln!("error: cannot write '{}': {}", path.display(), e);
        process::exit(1);
    }
    eprintln!("ok: wrote {}", path.display());
}

fn do_generate(args: GenerateArgs, no_color: bool) {
    require_file(&args.input, "input file");
    reject_directory(args.output.as_deref());

    let mut reporter = Reporter::new(no_color);
    let stream = reporter.load_document(&args.input, args.max_level);

    let targets = reorder::build_target_order_from_source(&stream.blocks);
    if targets.is_empty() {
        log::warn!("{} has no headings; the table of contents is empty", args.input.display());
    }
    let file = TocFile {
        toc: targets.to_toc(),
    };
    let yaml = match file.to_yaml() {
        Ok(yaml) => yaml,
        Err(e) => reporter.fail(e.to_string()),
    };
    write_output(args.output.as_deref(), &yaml);
}

fn do_reorganize(args: ReorganizeArgs, no_color: bool) {
    require_file(&args.input, "input file");
    require_file(&args.toc, "table of contents file");
    reject_directory(args.output.as_deref());

    let mut reporter = Reporter::new(no_color);
    let toc = match TocFile::from_yaml(&read_file(&args.toc)) {
        Ok(toc) => toc,
        Err(e) => reporter.fail(format!("{}: {}", args.toc.display(), e)),
    };
    log::info!(
        "read {}: {} table of contents entries",
        args.toc.display(),
        toc.entry_count()
    );
    let stream = reporter.load_document(&args.input, args.max_level);
    let file_id = stream.source_id;
    let line_ending = stream.line_ending;

    let mut diagnostics = Diagnostics::new();
    let targets = match TargetTree::from_toc(&toc.toc, &mut diagnostics) {
        Ok(targets) => targets,
        Err(e) => {
            reporter.emit_all(&diagnostics, file_id);
            reporter.fail(format!("{}: {}", args.toc.display(), e))
        }
    };

    let config = ReorgConfig::default()
        .with_missing_target(args.missing)
        .with_extra_section(args.unmatched)
        .with_empty_target(args.empty_toc);
    let planned = reorder::plan(stream.blocks, &targets, &config);
    let Planned {
        tree,
        plan,
        diagnostics: found,
    } = match planned {
        Ok(planned) => planned,
        Err(e) => {
            reporter.emit_all(&diagnostics, file_id);
            reporter.fail(e.to_string())
        }
    };
    diagnostics.extend(found);
    reporter.emit_all(&diagnostics, file_id);

    if args.dry_run {
        print_plan(&tree, &plan, &targets);
        return;
    }
    let blocks = reorder::linearize(tree, plan);
    write_output(
        args.output.as_deref(),
        &render_markdown_with(&blocks, line_ending),
    );
}

fn heading_line(level: u8, text: &str) -> String {
    format!("{} {}", "#".repeat(level as usize), text)
}

/// `[N blocks: kind, kind]`, or `[0 blocks]`.
fn block_summary(blocks: &[Block]) -> String {
    if blocks.is_empty() {
        return "[0 blocks]".to_string();
    }
    let kinds: Vec<String> = blocks.iter().map(|b| b.kind.to_string()).collect();
    format!("[{} blocks: {}]", blocks.len(), kinds.join(", "))
}

fn print_plan(tree: &SectionTree, plan: &ReconciliationPlan, targets: &TargetTree) {
    if !tree.preamble().is_empty() {
        println!("(preamble) {}", block_summary(tree.preamble()));
    }
    for (depth, entry) in plan.walk() {
        let heading = match (entry.source, entry.target) {
            (Some(s), _) => {
                let section = tree.get(s);
                heading_line(section.level, &section.heading_text)
            }
            (None, Some(t)) => {
                let node = targets.get(t);
                heading_line(node.level, &node.heading_text)
            }
            (None, None) => continue,
        };
        println!("{}{}  [{}]", "  ".repeat(depth), heading, entry.action.as_str());
    }
}

fn do_sections(args: SectionsArgs, no_color: bool) {
    require_file(&args.input, "input file");

    let mut reporter = Reporter::new(no_color);
    let stream = reporter.load_document(&args.input, args.max_level);
    let (tree, duplicates) = SectionTree::build(stream.blocks);
    for duplicate in &duplicates {
        reporter.emit(&duplicate.to_diagnostic(&tree).to_codespan(stream.source_id));
    }

    if !tree.preamble().is_empty() {
        println!("(preamble) {}", block_summary(tree.preamble()));
    }
    for section in tree.sections() {
        let repeated = tree.occurrences(&section.key()).len() > 1;
        let occurrence = if repeated {
            format!(" (occurrence {})", section.occurrence_index)
        } else {
            String::new()
        };
        println!(
            "{}{}{} {}",
            "  ".repeat(tree.depth(section.id)),
            heading_line(section.level, &section.heading_text),
            occurrence,
            block_summary(&section.content_blocks)
        );
    }
}

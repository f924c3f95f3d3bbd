//! phonejs CLI

use std::env;
use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;

use anyhow::{anyhow, Result};
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum, ValueHint};
use tracing::warn;

use phonejs_core::config::{BuildConfig, FailurePolicy};
use phonejs_core::output::{write_json_pretty, write_ndjson};
use phonejs_core::pipeline::{build, BuildReport};
use phonejs_core::plan::{plan, Step};
use phonejs_core::runner::SystemRunner;
use phonejs_core::scratch::reset_dir;

pub mod logging;

use logging::Verbosity;

/// CLI entrypoint for phonejs.
#[derive(Debug, Parser)]
#[command(
    name = "phonejs",
    about = "Fetch libphonenumber and the Closure tools, then compile libphonenumber.js"
)]
pub struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Fetch sources, compile, and remove the scratch directory
    Build(BuildArgs),
    /// Print the commands a build would run, without running them
    Plan(PlanArgs),
    /// Remove a scratch directory left behind by an interrupted build
    Clean,
}

#[derive(Debug, Args)]
struct GlobalArgs {
    /// Directory holding the scratch directory and, by default, the output file
    #[arg(long = "work-dir", global = true, env = "PHONEJS_WORK_DIR", value_hint = ValueHint::DirPath)]
    work_dir: Option<PathBuf>,

    /// Output file (relative paths resolve against the work directory)
    #[arg(short = 'o', long = "output", global = true, env = "PHONEJS_OUTPUT", value_hint = ValueHint::FilePath)]
    output: Option<PathBuf>,

    /// Subversion URL of the libphonenumber trunk
    #[arg(long = "libphonenumber-url", global = true, env = "PHONEJS_LIBPHONENUMBER_URL", value_hint = ValueHint::Url)]
    libphonenumber_url: Option<String>,

    /// Git URL of the Closure Library
    #[arg(long = "closure-library-url", global = true, env = "PHONEJS_CLOSURE_LIBRARY_URL", value_hint = ValueHint::Url)]
    closure_library_url: Option<String>,

    /// Download URL of the Closure Compiler zip
    #[arg(long = "compiler-url", global = true, env = "PHONEJS_COMPILER_URL", value_hint = ValueHint::Url)]
    compiler_url: Option<String>,

    /// Subversion client
    #[arg(long = "svn", global = true, env = "PHONEJS_SVN", value_hint = ValueHint::CommandName)]
    svn: Option<String>,

    /// Git client
    #[arg(long = "git", global = true, env = "PHONEJS_GIT", value_hint = ValueHint::CommandName)]
    git: Option<String>,

    /// curl binary used for the compiler download
    #[arg(long = "curl", global = true, env = "PHONEJS_CURL", value_hint = ValueHint::CommandName)]
    curl: Option<String>,

    /// unzip binary
    #[arg(long = "unzip", global = true, env = "PHONEJS_UNZIP", value_hint = ValueHint::CommandName)]
    unzip: Option<String>,

    /// Python interpreter that runs closurebuilder.py
    #[arg(long = "python", global = true, env = "PHONEJS_PYTHON", value_hint = ValueHint::CommandName)]
    python: Option<String>,

    /// Closure namespace to compile (repeatable or comma-separated; replaces the default pair)
    #[arg(long = "namespace", global = true, env = "PHONEJS_NAMESPACE", value_delimiter = ',', value_hint = ValueHint::Other)]
    namespaces: Vec<String>,

    /// Log debug detail to stderr
    #[arg(short = 'v', long = "verbose", global = true, action = ArgAction::SetTrue)]
    verbose: bool,

    /// Only log warnings and errors
    #[arg(short = 'q', long = "quiet", global = true, action = ArgAction::SetTrue, conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(Debug, Args)]
struct BuildArgs {
    /// Print the build report as JSON on stdout
    #[arg(long = "json", action = ArgAction::SetTrue)]
    json: bool,

    /// Run every step even if an earlier one fails; still exits non-zero afterwards
    #[arg(short = 'k', long = "keep-going", action = ArgAction::SetTrue)]
    keep_going: bool,
}

#[derive(Debug, Args)]
struct PlanArgs {
    /// Emit a single JSON array
    #[arg(long = "json", action = ArgAction::SetTrue, conflicts_with = "ndjson")]
    json: bool,

    /// Emit newline-delimited JSON
    #[arg(long = "ndjson", action = ArgAction::SetTrue)]
    ndjson: bool,

    /// Control colorized output (auto|always|never)
    #[arg(long = "color", default_value_t = ColorChoice::Auto, value_enum)]
    color: ColorChoice,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum ColorChoice {
    Auto,
    Always,
    Never,
}

/// Parse CLI args and execute the selected command.
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    logging::init(Verbosity::from_flags(cli.global.verbose, cli.global.quiet));

    let config = build_config(&cli.global)?;

    match cli.command {
        Command::Build(args) => run_build(config, args),
        Command::Plan(args) => run_plan(&config, args),
        Command::Clean => run_clean(&config),
    }
}

fn build_config(args: &GlobalArgs) -> Result<BuildConfig> {
    let cwd = env::current_dir().map_err(|e| anyhow!("cannot read current directory: {e}"))?;
    let base = match &args.work_dir {
        Some(dir) => cwd.join(dir),
        None => cwd,
    };

    let mut config = BuildConfig::new(base);

    if let Some(output) = &args.output {
        config = config.with_output(output);
    }
    if !args.namespaces.is_empty() {
        config = config.with_namespaces(args.namespaces.iter().cloned());
    }

    let urls = &mut config.sources;
    override_with(&mut urls.libphonenumber, &args.libphonenumber_url);
    override_with(&mut urls.closure_library, &args.closure_library_url);
    override_with(&mut urls.closure_compiler, &args.compiler_url);

    let tools = &mut config.tools;
    override_with(&mut tools.svn, &args.svn);
    override_with(&mut tools.git, &args.git);
    override_with(&mut tools.curl, &args.curl);
    override_with(&mut tools.unzip, &args.unzip);
    override_with(&mut tools.python, &args.python);

    config.validate()?;
    Ok(config)
}

fn override_with(slot: &mut String, value: &Option<String>) {
    if let Some(v) = value {
        slot.clone_from(v);
    }
}

fn run_build(config: BuildConfig, args: BuildArgs) -> Result<()> {
    let policy = if args.keep_going {
        FailurePolicy::Continue
    } else {
        FailurePolicy::Abort
    };
    let config = config.with_policy(policy);

    let report = build(&config, &mut SystemRunner)?;

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    if args.json {
        write_json_pretty(&report, &mut handle)?;
    } else {
        write_summary(&report, &mut handle)?;
    }

    let failed = report.steps.iter().filter(|s| !s.succeeded()).count();
    if failed > 0 {
        return Err(anyhow!("{failed} step(s) failed"));
    }

    Ok(())
}

fn run_plan(config: &BuildConfig, args: PlanArgs) -> Result<()> {
    let steps = plan(config);

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    let use_color = match args.color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => handle.is_terminal(),
    };

    if args.ndjson {
        write_ndjson(&steps, &mut handle)?;
    } else if args.json {
        write_json_pretty(&steps, &mut handle)?;
    } else {
        write_plan(&steps, &mut handle, use_color)?;
    }

    Ok(())
}

fn run_clean(config: &BuildConfig) -> Result<()> {
    let scratch = config.paths().build_dir;
    let removed = reset_dir(&scratch)?;

    let mut out = io::stdout().lock();
    if removed {
        writeln!(out, "removed {}", scratch.display())?;
    } else {
        writeln!(out, "nothing to remove at {}", scratch.display())?;
    }
    Ok(())
}

fn write_summary(report: &BuildReport, mut w: impl Write) -> Result<()> {
    for step in report.steps.iter().filter(|s| !s.succeeded()) {
        let reason = step.error.as_deref().unwrap_or("failed");
        warn!(step = %step.kind, "{reason}");
    }

    match report.output_bytes {
        Some(bytes) => writeln!(w, "wrote {} ({bytes} bytes)", report.output_file.display())?,
        None => writeln!(w, "no output written to {}", report.output_file.display())?,
    }
    Ok(())
}

fn write_plan(steps: &[Step], mut w: impl Write, color: bool) -> Result<()> {
    let width = steps
        .iter()
        .map(|s| s.kind.as_str().len())
        .max()
        .unwrap_or(0);

    for step in steps {
        let label = format!("{:<width$}", step.kind.as_str());
        let label = apply_color(&label, color, label_color(step));

        let mut line = String::new();
        if let Some(dir) = &step.invocation.cwd {
            line.push_str(&format!("cd {} && ", dir.display()));
        }
        line.push_str(&step.invocation.command_line());

        writeln!(w, "{label}  {line}")?;
    }
    Ok(())
}

#[derive(Copy, Clone)]
enum AnsiColor {
    Cyan,
    Green,
}

fn label_color(step: &Step) -> AnsiColor {
    if step.kind.is_fetch() {
        AnsiColor::Cyan
    } else {
        AnsiColor::Green
    }
}

fn apply_color(text: &str, color: bool, code: AnsiColor) -> String {
    if !color {
        return text.to_string();
    }

    let code_str = match code {
        AnsiColor::Cyan => "36",
        AnsiColor::Green => "32",
    };

    format!("\u{1b}[{}m{}\u{1b}[0m", code_str, text)
}

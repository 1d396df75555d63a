use ariadne::{Color, Label, Report, ReportKind, Source};
use clap::{ArgAction, CommandFactory, Parser as ClapParser, Subcommand};
use log::{LevelFilter, debug, info};
use pallang::ast::{Program, SourceLoc};
use pallang::parser::Parser;
use pallang::printer::{self, DEFAULT_LINE_LENGTH, PrintOptions};
use pallang::typechecker::TypeChecker;
use std::fs;
use std::ops::Range;
use std::process;

/// Pal - A small dependently typed language
#[derive(ClapParser)]
#[command(name = "pal")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Increase log output (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reformat a Pal source file in place
    Fmt {
        /// Input Pal source file
        #[arg(value_name = "INPUT")]
        input: String,

        /// Column limit before expressions are broken over lines
        #[arg(long, value_name = "COLUMNS", default_value_t = DEFAULT_LINE_LENGTH)]
        line_length: usize,

        /// Fail instead of rewriting when the file is not formatted
        #[arg(long)]
        check: bool,

        /// Print to stdout with numbered holes instead of rewriting the file
        #[arg(long)]
        full_hole_names: bool,
    },

    /// Type check a Pal source file
    Check {
        /// Input Pal source file
        #[arg(value_name = "INPUT")]
        input: String,

        /// Print the resulting global context
        #[arg(long)]
        print_ctx: bool,
    },

    /// Generate shell completions for bash, zsh, fish, or powershell
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Fmt {
            input,
            line_length,
            check,
            full_hole_names,
        } => {
            let options = PrintOptions {
                line_length,
                full_hole_names,
            };
            fmt_command(&input, &options, check)
        }
        Commands::Check { input, print_ctx } => check_command(&input, print_ctx),
        Commands::Completions { shell } => {
            generate_completions(shell);
            Ok(())
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn fmt_command(
    input_file: &str,
    options: &PrintOptions,
    check: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let (source, program) = load(input_file)?;
    let formatted = printer::serialize_program(&program, options);

    if options.full_hole_names {
        print!("{formatted}");
        return Ok(());
    }

    if formatted == source {
        info!("{input_file} is already formatted");
        return Ok(());
    }
    if check {
        return Err(format!("{input_file} is not formatted").into());
    }

    fs::write(input_file, &formatted)
        .map_err(|e| format!("Failed to write {input_file}: {e}"))?;
    info!("formatted {input_file}");
    Ok(())
}

fn check_command(input_file: &str, print_ctx: bool) -> Result<(), Box<dyn std::error::Error>> {
    let (source, program) = load(input_file)?;

    let mut checker = TypeChecker::new();
    if let Err(err) = checker.check_program(&program) {
        debug!("check failed: {err:?}");
        report(
            input_file,
            &source,
            err.error.loc(),
            &err.to_string(),
            &err.error.reason(),
        );
        process::exit(1);
    }

    if print_ctx {
        print!(
            "{}",
            printer::serialize_ctx(checker.global(), &PrintOptions::default())
        );
    }
    Ok(())
}

/// Read and parse a source file, reporting parse errors against the source
fn load(input_file: &str) -> Result<(String, Program), Box<dyn std::error::Error>> {
    let source = fs::read_to_string(input_file)
        .map_err(|e| format!("Failed to read {input_file}: {e}"))?;

    let mut parser = Parser::new(&source);
    match parser.parse() {
        Ok(program) => Ok((source, program)),
        Err(err) => {
            report(
                input_file,
                &source,
                Some(err.loc()),
                "parse error",
                &err.message,
            );
            process::exit(1);
        }
    }
}

fn report(input_file: &str, source: &str, loc: Option<SourceLoc>, message: &str, label: &str) {
    let span = loc.map(|loc| span_at(source, loc)).unwrap_or(0..0);
    let name = input_file.to_string();

    let printed = Report::build(ReportKind::Error, (name.clone(), span.clone()))
        .with_message(message)
        .with_label(
            Label::new((name.clone(), span))
                .with_message(label)
                .with_color(Color::Red),
        )
        .finish()
        .eprint((name, Source::from(source)));
    if let Err(e) = printed {
        eprintln!("{message}: {label} ({e})");
    }
}

/// One-character span at a 0-based line and column
fn span_at(source: &str, loc: SourceLoc) -> Range<usize> {
    let line_start: usize = source
        .split('\n')
        .take(loc.line)
        .map(|line| line.chars().count() + 1)
        .sum();
    let start = line_start + loc.column;
    start..start + 1
}

fn generate_completions(shell: clap_complete::Shell) {
    let mut cmd = Cli::command();
    let bin_name = cmd.get_name().to_string();
    clap_complete::generate(shell, &mut cmd, bin_name, &mut std::io::stdout());
}

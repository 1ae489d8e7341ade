use anyhow::{bail, Result};
use clap::Parser;
use std::path::PathBuf;
use std::process;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use md2docx::batch::{run_batch, BatchReport};
use md2docx::config::{ConvertOptions, DEFAULT_IMAGE_TIMEOUT, DEFAULT_MAX_IMAGE_WIDTH_IN};

#[derive(Parser, Debug)]
#[command(author, version, about = "Convert Markdown files to Word documents")]
struct Args {
    /// Markdown files to convert.
    #[arg(required = true, value_name = "INPUT")]
    inputs: Vec<PathBuf>,

    /// Output .docx path (single input only).
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Log every conversion stage.
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log warnings and errors.
    #[arg(short, long)]
    quiet: bool,

    /// Widest an embedded image may be, in inches.
    #[arg(long, env = "MD2DOCX_MAX_IMAGE_WIDTH", default_value_t = DEFAULT_MAX_IMAGE_WIDTH_IN)]
    max_image_width: f64,

    /// Timeout for downloading a remote image, in seconds.
    #[arg(long, env = "MD2DOCX_IMAGE_TIMEOUT", default_value_t = DEFAULT_IMAGE_TIMEOUT.as_secs())]
    image_timeout: u64,
}

fn init_logging(args: &Args) {
    let level = if args.verbose {
        "debug"
    } else if args.quiet {
        "warn"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn print_summary(report: &BatchReport) {
    println!();
    println!(
        "Converted {} of {} files.",
        report.succeeded(),
        report.outcomes.len()
    );
    let mut failures = report.failures().peekable();
    if failures.peek().is_some() {
        println!("Failed:");
        for (input, cause) in failures {
            println!("  {}: {cause}", input.display());
        }
    }
}

fn run(args: Args) -> Result<i32> {
    if args.output.is_some() && args.inputs.len() > 1 {
        bail!("--output can only be used with a single input file");
    }
    if !(args.max_image_width.is_finite() && args.max_image_width > 0.0) {
        bail!("--max-image-width must be a positive number of inches");
    }

    let opts = ConvertOptions {
        max_image_width_in: args.max_image_width,
        image_timeout: Duration::from_secs(args.image_timeout.max(1)),
    };
    let single = args.inputs.len() == 1;

    let report = run_batch(&args.inputs, args.output.as_deref(), &opts, |outcome| {
        let name = outcome
            .input
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| outcome.input.display().to_string());
        match &outcome.result {
            Ok(out) => {
                println!("Converting '{name}'... [OK]");
                if single {
                    println!("Output: {}", out.display());
                }
            }
            Err(cause) => {
                println!("Converting '{name}'... [FAILED]");
                eprintln!("  {cause}");
            }
        }
    });

    if !single {
        print_summary(&report);
    }
    Ok(report.exit_code())
}

/// Help and version requests exit 0; any other clap error is a usage error.
fn usage_exit_code(err: &clap::Error) -> i32 {
    if err.use_stderr() {
        1
    } else {
        0
    }
}

fn main() {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            process::exit(usage_exit_code(&e));
        }
    };
    init_logging(&args);

    let code = match run(args) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            1
        }
    };
    process::exit(code);
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn parse(argv: &[&str]) -> Result<Args, clap::Error> {
        Args::try_parse_from(std::iter::once("md2docx").chain(argv.iter().copied()))
    }

    #[test]
    fn command_is_well_formed() {
        Args::command().debug_assert();
    }

    #[test]
    fn verbose_and_quiet_conflict_with_exit_one() {
        let err = parse(&["-v", "-q", "a.md"]).unwrap_err();
        assert_eq!(usage_exit_code(&err), 1);
    }

    #[test]
    fn missing_input_is_a_usage_error() {
        let err = parse(&[]).unwrap_err();
        assert_eq!(usage_exit_code(&err), 1);
    }

    #[test]
    fn help_and_version_exit_zero() {
        assert_eq!(usage_exit_code(&parse(&["--help"]).unwrap_err()), 0);
        assert_eq!(usage_exit_code(&parse(&["--version"]).unwrap_err()), 0);
    }

    #[test]
    fn output_with_several_inputs_is_rejected() {
        let args = parse(&["-o", "out.docx", "a.md", "b.md"]).unwrap();
        assert!(run(args).is_err());
    }
}

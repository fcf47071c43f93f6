//! `sparseqc`: the reference command-line driver for the middle end
//! (spec.md §6). Parses argv with [`sparseq::cli`], renders diagnostics
//! with `ariadne`, and exits with the code spec.md §6 assigns each
//! failure kind.

use ariadne::{Color, Label, Report, ReportKind, Source};
use sparseq::cli::{run, CliError};
use std::process::ExitCode;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();

    match run(&args) {
        Ok(rendered) => {
            print!("{rendered}");
            ExitCode::from(0)
        }
        Err(err) => {
            report_error(&args, &err);
            ExitCode::from(err.exit_code() as u8)
        }
    }
}

/// Render a `CliError` with `ariadne`, pointing at the expression source
/// when one was supplied, matching the teacher's split of a plain
/// `thiserror` reason string (library) from a rendered diagnostic (binary).
fn report_error(args: &[String], err: &CliError) {
    let source = args
        .iter()
        .find(|a| !a.starts_with('-'))
        .cloned()
        .unwrap_or_default();

    let report = Report::build(ReportKind::Error, (), 0)
        .with_message(err.to_string())
        .with_label(Label::new(0..source.len().max(1)).with_color(Color::Red))
        .finish();

    let _ = report.eprint(Source::from(source));
}

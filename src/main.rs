mod cli;
mod color;
mod data;
mod error;
mod extract;
mod pipeline;
mod render;

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;

use cli::{Cli, Command, x_axis_config};
use pipeline::{CompareJob, FilterJob, PlotJob};
use render::PlottersRenderer;

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            // --help and --version are not failures
            return if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    init_logging(cli.verbose);

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default)).init();
}

fn run(command: Command) -> Result<()> {
    match command {
        Command::Normalize { input, output } => {
            let report = pipeline::run_normalize(&input, &output)?;
            println!("Number of sets  = {}", report.n_sets);
            println!("Data per set    = {}", report.n_data);
            for (set, range) in report.ranges.iter().enumerate() {
                println!("Set {set} : Min = {}  Max = {}", range.min, range.max);
            }
            println!("\nNormalized output written to: {}", report.output.display());
        }

        Command::Plot(args) => {
            let renderer = PlottersRenderer::new(args.format);
            let job = PlotJob {
                x_axis: x_axis_config(args.xvalues, args.range.as_deref()),
                input: args.input,
                parameter: args.parameter.join(" "),
                mode: args.mode,
                names: args.names,
                output_dir: args.output,
            };
            let report = pipeline::run_plot(&job, &renderer)?;
            for fig in &report.figures {
                println!("Saved {}", fig.display());
            }
            if let Some((files, count)) = &report.refined {
                println!("Refined curves: {count}");
                println!("Saved refined plot list → {}", files.labels.display());
                println!("Saved refined normalized values → {}", files.values.display());
            }
        }

        Command::Compare(args) => {
            let renderer = PlottersRenderer::new(args.format);
            let job = CompareJob {
                x_a: x_axis_config(args.xvalues_a, args.range_a.as_deref()),
                x_b: x_axis_config(args.xvalues_b, args.range_b.as_deref()),
                dir_a: args.input1,
                dir_b: args.input2,
                mode: args.mode,
                parameter: args.parameter.join(" "),
                output_dir: args.output,
            };
            let report = pipeline::run_compare(&job, &renderer)?;
            if job.mode == pipeline::CompareMode::Individual {
                println!("Matched pairs: {}", report.matched);
            }
            println!("Saved {} figure(s) to {}", report.figures.len(), job.output_dir.display());
        }

        Command::Filter {
            records,
            refined_a,
            refined_b,
            output,
        } => {
            let job = FilterJob {
                records,
                refined_a,
                refined_b,
                output,
            };
            let report = pipeline::run_filter(&job)?;
            println!("Refined-A IDs: {}", report.ids_a);
            println!("Refined-B IDs: {}", report.ids_b);
            println!("Union IDs    : {}", report.union);
            println!("Total lines read : {}", report.total);
            println!("Total lines kept : {}", report.kept);
            println!("Saved to         : {}", job.output.display());
        }

        Command::Extract { input, output } => {
            let report = extract::run_extract(&input, output.as_deref())?;
            println!("Found {} file(s)", report.files);
            println!("Each plot contains {} chi-squared value(s)", report.values_per_plot);
            println!("Saved name+chi2 → {}", report.histo_file.display());
            println!("Saved chi2 only → {}", report.values_file.display());
        }
    }
    Ok(())
}

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::data::axis::{XAxisConfig, XRange};
use crate::pipeline::{CompareMode, PlotMode};
use crate::render::ImageFormat;

#[derive(Parser, Debug)]
#[command(author, version, about = "Normalize, refine and compare chi2 parameter scans")]
pub struct Cli {
    /// Raise log verbosity (-v info, -vv debug) when RUST_LOG is unset
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Rescale every set of a raw scan file to [0, 10]
    Normalize {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        output: PathBuf,
    },

    /// Plot normalized curves (combined, one per set, or refined only)
    Plot(PlotArgs),

    /// Compare the refined sets of two runs
    Compare(CompareArgs),

    /// Keep only records whose histogram survived refinement in either run
    Filter {
        /// Records keyed by their first column
        records: PathBuf,
        /// refined_plots.txt of run A
        refined_a: PathBuf,
        /// refined_plots.txt of run B
        refined_b: PathBuf,
        output: PathBuf,
    },

    /// Collect chi2/n values from rendered plots
    Extract {
        /// A PDF, a directory of PDFs, or a glob pattern such as 'plots/*.pdf'.
        /// Extracted text layers (*.txt) are accepted too
        #[arg(long)]
        input: PathBuf,
        /// Output directory (default: <input>_output)
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[derive(Args, Debug)]
pub struct PlotArgs {
    /// Normalized values (.txt, .json, .csv or .parquet)
    pub input: PathBuf,

    /// X-axis title; may span several words
    #[arg(long, num_args = 1.., default_value = "Scan parameter")]
    pub parameter: Vec<String>,

    #[arg(long, value_enum)]
    pub mode: PlotMode,

    /// Names file (two header lines, then one name per line)
    #[arg(long)]
    pub names: Option<PathBuf>,

    #[arg(long)]
    pub output: Option<PathBuf>,

    /// X values: xmin xmax step
    #[arg(
        long,
        num_args = 3,
        value_names = ["XMIN", "XMAX", "STEP"],
        allow_negative_numbers = true
    )]
    pub range: Option<Vec<f64>>,

    /// File whose first non-empty line holds the x values
    #[arg(long)]
    pub xvalues: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = ImageFormat::Png)]
    pub format: ImageFormat,
}

#[derive(Args, Debug)]
pub struct CompareArgs {
    /// Directory holding refined set A
    #[arg(long)]
    pub input1: PathBuf,

    /// Directory holding refined set B
    #[arg(long)]
    pub input2: PathBuf,

    #[arg(long, value_enum)]
    pub mode: CompareMode,

    #[arg(long)]
    pub output: PathBuf,

    /// X-axis title; may span several words
    #[arg(long, num_args = 1.., default_value = "Scan parameter")]
    pub parameter: Vec<String>,

    #[arg(long = "xvaluesA")]
    pub xvalues_a: Option<PathBuf>,

    #[arg(
        long = "rangeA",
        num_args = 3,
        value_names = ["XMIN", "XMAX", "STEP"],
        allow_negative_numbers = true
    )]
    pub range_a: Option<Vec<f64>>,

    #[arg(long = "xvaluesB")]
    pub xvalues_b: Option<PathBuf>,

    #[arg(
        long = "rangeB",
        num_args = 3,
        value_names = ["XMIN", "XMAX", "STEP"],
        allow_negative_numbers = true
    )]
    pub range_b: Option<Vec<f64>>,

    #[arg(long, value_enum, default_value_t = ImageFormat::Png)]
    pub format: ImageFormat,
}

/// Combine the file and range flags of one axis.
pub fn x_axis_config(file: Option<PathBuf>, range: Option<&[f64]>) -> XAxisConfig {
    XAxisConfig {
        file,
        range: range.and_then(|r| match *r {
            [min, max, step] => Some(XRange { min, max, step }),
            _ => None,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plot_accepts_multi_word_parameter_and_range() {
        let cli = Cli::parse_from([
            "chi2scan",
            "plot",
            "normalized.txt",
            "--parameter",
            "aLund",
            "Fragmentation",
            "function",
            "--mode",
            "refined",
            "--range",
            "-1",
            "1",
            "0.5",
        ]);
        let Command::Plot(args) = cli.command else {
            panic!("expected plot");
        };
        assert_eq!(args.parameter.join(" "), "aLund Fragmentation function");
        assert_eq!(args.mode, PlotMode::Refined);

        let axis = x_axis_config(args.xvalues, args.range.as_deref());
        assert_eq!(
            axis.range,
            Some(XRange {
                min: -1.0,
                max: 1.0,
                step: 0.5
            })
        );
    }

    #[test]
    fn compare_takes_per_source_axes() {
        let cli = Cli::parse_from([
            "chi2scan",
            "compare",
            "--input1",
            "refined-A",
            "--input2",
            "refined-B",
            "--mode",
            "individual",
            "--output",
            "cmp",
            "--xvaluesA",
            "xa.txt",
            "--rangeB",
            "0",
            "4",
            "1",
        ]);
        let Command::Compare(args) = cli.command else {
            panic!("expected compare");
        };
        assert_eq!(args.mode, CompareMode::Individual);
        assert_eq!(args.xvalues_a, Some(PathBuf::from("xa.txt")));
        assert_eq!(args.range_b, Some(vec![0.0, 4.0, 1.0]));
        assert_eq!(args.parameter, vec!["Scan parameter"]);
    }

    #[test]
    fn unknown_mode_is_rejected() {
        let parsed = Cli::try_parse_from(["chi2scan", "plot", "n.txt", "--mode", "sideways"]);
        assert!(parsed.is_err());
    }
}

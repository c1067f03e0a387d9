//! CLI argument parsing for the weavelog demo

use crate::logger::{LogLevel, TraceMode};
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "weavelog")]
#[command(version)]
#[command(
    about = "Trace the calls of a small sample application through weavelog",
    long_about = None
)]
pub struct Cli {
    /// Logger options file (TOML)
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Trace events to record when the options declare no call rules
    #[arg(short = 'm', long = "mode", value_enum, default_value = "calls")]
    pub mode: TraceMode,

    /// Do not report call durations
    #[arg(long = "no-timing")]
    pub no_timing: bool,

    /// Default class log level (overrides the options file)
    #[arg(short = 'l', long = "level", value_name = "LEVEL")]
    pub level: Option<LogLevel>,

    /// Indent nested calls instead of grouping them in spans
    #[arg(long = "no-groups")]
    pub no_groups: bool,

    /// Look up a key the sample store does not have
    #[arg(long = "fail")]
    pub fail: bool,

    /// Show weavelog's own diagnostics
    #[arg(short = 'd', long = "debug")]
    pub debug: bool,

    /// Keys the sample application loads
    #[arg(value_name = "KEY", default_values_t = [String::from("alpha"), String::from("beta")])]
    pub keys: Vec<String>,
}

use anyhow::{Context, Result};
use clap::Parser;
use regex::Regex;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use weavelog::cli::Cli;
use weavelog::{ClassBody, ClassManager, Interceptor, Logger, LoggerOptions, Object};

/// Initialize the subscriber that renders call traces (and, with --debug,
/// weavelog's own diagnostics)
fn init_tracing(debug: bool) {
    let level = if debug {
        tracing::Level::TRACE
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(std::io::stdout)
        .with_target(false)
        .without_time()
        .with_ansi(false)
        .init();
}

/// Options file (or defaults) with the command-line overrides applied
fn load_options(args: &Cli) -> Result<LoggerOptions> {
    let mut options = match &args.config {
        Some(path) => LoggerOptions::from_toml(path)?,
        None => LoggerOptions::default(),
    };
    if let Some(level) = args.level {
        options.default_log_level = level;
    }
    if args.no_groups {
        options.use_groups = false;
    }
    Ok(options)
}

fn demo_store() -> ClassBody {
    ClassBody::new()
        .with_log()
        .with_field("entries", json!({ "alpha": 1, "beta": 2, "gamma": 3 }))
        .with_method("load", |this, args| {
            let entry = this.call("fetch", args)?;
            if let Some(log) = this.log() {
                log.debug(&[json!("loaded"), entry.clone()]);
            }
            Ok(entry)
        })
        .with_method("fetch", |this, args| {
            let key = args.first().and_then(Value::as_str).unwrap_or_default();
            this.get("entries")
                .and_then(|entries| entries.get(key))
                .map(|value| json!({ "key": key, "value": value }))
                .with_context(|| format!("no value for key `{}`", key))
        })
}

fn demo_app(store: Object) -> ClassBody {
    ClassBody::new()
        .with_log()
        .with_field("name", json!("Demo.Main"))
        .with_method("launch", move |this, args| {
            let mut loaded = Vec::with_capacity(args.len());
            for key in args {
                loaded.push(store.call("load", std::slice::from_ref(key))?);
            }
            if let Some(log) = this.log() {
                log.info(&[json!("loaded"), json!(loaded.len()), json!("entries")]);
            }
            Ok(Value::Array(loaded))
        })
}

/// Declare the sample classes under tracing and run them
fn run_demo(args: &Cli, logger: &Arc<Logger>) -> Result<Value> {
    let options = logger.options()?;
    if options.log_calls.is_empty() {
        let demo_classes = Regex::new(r"^Demo\.")?;
        logger.trace_calls(demo_classes, true, args.mode, !args.no_timing)?;
    }

    let classes = ClassManager::new();
    logger.attach(&classes);

    classes.define("Demo.Store", demo_store())?;
    let store = classes.create("Demo.Store")?;
    let app = classes.application(demo_app(store))?;

    let mut keys: Vec<Value> = args.keys.iter().map(|k| json!(k)).collect();
    if args.fail {
        keys.push(json!("missing"));
    }
    app.call("launch", &keys)
}

fn main() -> Result<()> {
    let args = Cli::parse();

    init_tracing(args.debug);

    let options = load_options(&args)?;
    let logger = Logger::new(Arc::new(Interceptor::new()));
    logger.init(options)?;

    let result = run_demo(&args, &logger)?;
    println!("{}", result);

    Ok(())
}

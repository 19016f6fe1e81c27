//! CLI command definitions, routing, and tracing setup.

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use filterchain_core::{LinearPipeline, Pipeline};
use filterchain_filters::{FilterRegistry, render};
use filterchain_shared::{
    AppConfig, PipelineState, Value, config_file_path, init_config, load_config, render_config,
};
use tracing::info;

use crate::input::{InputKind, parse_input};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// filterchain: run values through typed filter chains.
#[derive(Parser)]
#[command(
    name = "filterchain",
    version,
    about = "Assemble type-checked filter chains and run values through them.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Where the filter names of a chain come from.
#[derive(clap::Args, Debug)]
pub(crate) struct ChainArgs {
    /// Filter to append to the chain (repeatable, in execution order).
    #[arg(short, long = "filter", value_name = "NAME")]
    pub filters: Vec<String>,

    /// Named chain from the config file (ignored when --filter is given).
    #[arg(short, long)]
    pub chain: Option<String>,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Run one input value through a chain.
    Run {
        #[command(flatten)]
        chain: ChainArgs,

        /// How to interpret INPUT (defaults to the config's input_kind).
        #[arg(long = "as", value_name = "KIND")]
        kind: Option<InputKind>,

        /// Print the result as JSON.
        #[arg(long)]
        json: bool,

        /// Input literal. Omit to feed the absent value.
        input: Option<String>,
    },

    /// Assemble a chain without running it and print its types.
    Check {
        #[command(flatten)]
        chain: ChainArgs,
    },

    /// List the available filters.
    Filters,

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init {
        /// Overwrite an existing config file.
        #[arg(long)]
        force: bool,
    },
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let directives = ["filterchain", "filterchain_core", "filterchain_filters", "filterchain_shared"]
        .map(|target| format!("{target}={level}"))
        .join(",");

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directives));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Run {
            chain,
            kind,
            json,
            input,
        } => cmd_run(&chain, kind, json, input.as_deref()),
        Command::Check { chain } => cmd_check(&chain),
        Command::Filters => cmd_filters(),
        Command::Config { action } => match action {
            ConfigAction::Init { force } => cmd_config_init(force),
            ConfigAction::Show => cmd_config_show(),
        },
    }
}

/// Resolve filter names (flags > named chain > config default) and assemble.
fn assemble(chain: &ChainArgs, config: &AppConfig) -> Result<LinearPipeline> {
    let names: &[String] = if chain.filters.is_empty() {
        config.resolve_chain(chain.chain.as_deref())?
    } else {
        &chain.filters
    };

    let registry = FilterRegistry::with_builtins();
    let filters = registry.resolve(names)?;
    let pipeline = LinearPipeline::new(filters)?;

    info!(filters = ?names, "assembled chain");
    Ok(pipeline)
}

fn cmd_run(chain: &ChainArgs, kind: Option<InputKind>, json: bool, input: Option<&str>) -> Result<()> {
    let config = load_config()?;
    let pipeline = assemble(chain, &config)?;

    let kind = match kind {
        Some(kind) => kind,
        None => config.defaults.input_kind.parse()?,
    };
    let value = parse_input(input, kind)?;
    info!(input = value.type_name(), ?kind, "running chain");

    pipeline.execute(value)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report(&pipeline)?)?);
    }

    match pipeline.state() {
        PipelineState::Success => {
            if !json {
                println!("{}", output_text(&pipeline)?);
            }
            Ok(())
        }
        _ => {
            let err = pipeline.error()?;
            Err(eyre!("pipeline failed: {err}"))
        }
    }
}

/// JSON summary of a finished execution.
fn report(pipeline: &LinearPipeline) -> Result<serde_json::Value> {
    let mut doc = serde_json::json!({
        "state": pipeline.state(),
        "input_type": pipeline.input_type().name(),
        "output_type": pipeline.output_type().name(),
    });
    match pipeline.state() {
        PipelineState::Success => {
            doc["output"] = output_text(pipeline)?.into();
        }
        PipelineState::Error => {
            doc["error"] = pipeline.error()?.to_string().into();
        }
        _ => {}
    }
    Ok(doc)
}

/// Display text of the last successful output.
fn output_text(pipeline: &LinearPipeline) -> Result<String> {
    let output = pipeline.output()?;
    Ok(describe(&output))
}

/// Text form of a value for display.
fn describe(value: &Value) -> String {
    if value.is_null() {
        return "null".to_string();
    }
    render(value).unwrap_or_else(|| format!("<{}>", value.type_name()))
}

fn cmd_check(chain: &ChainArgs) -> Result<()> {
    let config = load_config()?;
    let pipeline = assemble(chain, &config)?;

    println!("  Filters: {}", pipeline.len());
    for (position, filter) in pipeline.iter().enumerate() {
        println!(
            "    {position}. {} ({} -> {})",
            filter.name(),
            filter.input_type(),
            filter.output_type()
        );
    }
    println!("  Input:   {}", pipeline.input_type());
    println!("  Output:  {}", pipeline.output_type());
    Ok(())
}

fn cmd_filters() -> Result<()> {
    let registry = FilterRegistry::with_builtins();
    for name in registry.names() {
        if let Some(filter) = registry.get(name) {
            println!(
                "  {name:<12} {} -> {}",
                filter.input_type(),
                filter.output_type()
            );
        }
    }
    Ok(())
}

fn cmd_config_init(force: bool) -> Result<()> {
    let path = init_config(force)?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = render_config(&config)?;
    println!("# {}", config_file_path()?.display());
    println!("{toml_str}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_run_with_filters() {
        let cli = Cli::try_parse_from([
            "filterchain", "run", "-f", "to-string", "-f", "length", "--as", "int", "123",
        ])
        .expect("parse");
        match cli.command {
            Command::Run {
                chain, kind, input, json,
            } => {
                assert_eq!(chain.filters, ["to-string", "length"]);
                assert_eq!(kind, Some(InputKind::Int));
                assert_eq!(input.as_deref(), Some("123"));
                assert!(!json);
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn parses_config_init_force() {
        let cli = Cli::try_parse_from(["filterchain", "config", "init", "--force"]).expect("parse");
        assert!(matches!(
            cli.command,
            Command::Config {
                action: ConfigAction::Init { force: true }
            }
        ));
    }

    #[test]
    fn flags_override_config_chain() {
        let config = AppConfig::default();
        let args = ChainArgs {
            filters: vec!["trim".into()],
            chain: Some("ignored".into()),
        };
        let pipeline = assemble(&args, &config).expect("assemble");
        assert_eq!(pipeline.len(), 1);

        let args = ChainArgs {
            filters: vec![],
            chain: None,
        };
        let pipeline = assemble(&args, &config).expect("assemble default");
        assert_eq!(pipeline.len(), 2);
    }

    #[test]
    fn report_includes_output() {
        let config = AppConfig::default();
        let args = ChainArgs {
            filters: vec![],
            chain: None,
        };
        let pipeline = assemble(&args, &config).expect("assemble");
        pipeline.execute(Value::new(123_i64)).expect("execute");

        let doc = report(&pipeline).expect("report");
        assert_eq!(doc["state"], "success");
        assert_eq!(doc["output"], "3");
        assert_eq!(doc["input_type"], "any");
    }

    #[test]
    fn output_text_follows_state() {
        let config = AppConfig::default();
        let args = ChainArgs {
            filters: vec!["trim".into(), "uppercase".into()],
            chain: None,
        };
        let pipeline = assemble(&args, &config).expect("assemble");
        assert!(output_text(&pipeline).is_err());

        pipeline.execute(Value::new(" abc ".to_string())).expect("execute");
        assert_eq!(output_text(&pipeline).expect("output"), "ABC");

        pipeline.execute(Value::new(7_i64)).expect("execute");
        assert_eq!(pipeline.state(), PipelineState::Error);
        assert!(output_text(&pipeline).is_err());
    }

    #[test]
    fn report_includes_error() {
        let config = AppConfig::default();
        let args = ChainArgs {
            filters: vec![],
            chain: None,
        };
        let pipeline = assemble(&args, &config).expect("assemble");
        pipeline.execute(Value::null()).expect("execute");

        let doc = report(&pipeline).expect("report");
        assert_eq!(doc["state"], "error");
        assert!(doc["error"].as_str().is_some_and(|e| e.contains("to-string")));
    }
}

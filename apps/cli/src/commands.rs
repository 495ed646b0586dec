//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use outputkit_core::{
    ConsolidationStrategy, PipelineConfig, PipelineResult, ProgressReporter,
    generate_comparison_report, run_pipeline,
};
use outputkit_formatter::{FormatOptions, OutputFormatter, TargetFormat, escape_html};
use outputkit_shared::{AppConfig, SchemaPreset, init_config, load_config, load_config_from};
use serde_json::json;
use tracing::info;

use crate::inputs::{InputSource, load_inputs, load_templates};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// OutputKit: process, validate, format, and aggregate agent outputs.
#[derive(Parser)]
#[command(
    name = "outputkit",
    version,
    about = "Turn raw agent outputs into validated, formatted, and aggregated reports.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file to use instead of ~/.outputkit/outputkit.toml.
    #[arg(long, global = true, env = "OUTPUTKIT_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Inputs and validation settings shared by every pipeline command.
#[derive(Args, Debug)]
pub(crate) struct InputArgs {
    /// Agent outputs as PATH or ROLE=PATH (role defaults to the file stem).
    #[arg(required = true, num_args = 1..)]
    pub inputs: Vec<InputSource>,

    /// Treat each input as a JSON crew result and expand its task outputs.
    #[arg(long)]
    pub crew: bool,

    /// Schema preset: research, content, or analysis.
    #[arg(long)]
    pub schema: Option<String>,

    /// Escalate warning-only rule failures to errors.
    #[arg(long)]
    pub strict: bool,

    /// Workflow name used in reports.
    #[arg(long)]
    pub name: Option<String>,
}

/// Rendering settings shared by the commands that print documents.
#[derive(Args, Debug)]
pub(crate) struct RenderArgs {
    /// Output format: json, html, markdown, csv, xml, summary, or template.
    #[arg(short, long)]
    pub format: Option<String>,

    /// Template name (implies --format template).
    #[arg(long)]
    pub template: Option<String>,

    /// Document title for aggregated formats.
    #[arg(long)]
    pub title: Option<String>,

    /// Write to a file instead of stdout.
    #[arg(short, long)]
    pub out: Option<PathBuf>,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Process and validate outputs, rendering each one.
    Process {
        #[command(flatten)]
        input: InputArgs,
        #[command(flatten)]
        render: RenderArgs,
    },

    /// Aggregate outputs into a single document with insights.
    Report {
        #[command(flatten)]
        input: InputArgs,
        #[command(flatten)]
        render: RenderArgs,
    },

    /// Consolidate outputs into one.
    Consolidate {
        #[command(flatten)]
        input: InputArgs,
        #[command(flatten)]
        render: RenderArgs,

        /// Strategy: merge, summary, or best (defaults to the config value).
        #[arg(short, long)]
        strategy: Option<String>,

        /// Agent role of the consolidated output.
        #[arg(long)]
        role: Option<String>,
    },

    /// Rank outputs and compare them criterion by criterion (JSON).
    Compare {
        #[command(flatten)]
        input: InputArgs,

        /// Comma-separated criteria (defaults to the standard set).
        #[arg(long, value_delimiter = ',')]
        criteria: Vec<String>,

        /// Write to a file instead of stdout.
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

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
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

const LOG_TARGETS: &[&str] = &[
    "outputkit",
    "outputkit_shared",
    "outputkit_processor",
    "outputkit_validator",
    "outputkit_formatter",
    "outputkit_core",
];

/// Initialize tracing based on CLI flags. Logs go to stderr so rendered
/// documents on stdout stay clean.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = LOG_TARGETS
        .iter()
        .map(|target| format!("{target}={level}"))
        .collect::<Vec<_>>()
        .join(",");

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

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
    let config_path = cli.config;
    match cli.command {
        Command::Process { input, render } => cmd_process(&resolve(config_path.as_deref())?, &input, &render),
        Command::Report { input, render } => cmd_report(&resolve(config_path.as_deref())?, &input, &render),
        Command::Consolidate {
            input,
            render,
            strategy,
            role,
        } => cmd_consolidate(
            &resolve(config_path.as_deref())?,
            &input,
            &render,
            strategy.as_deref(),
            role.as_deref(),
        ),
        Command::Compare {
            input,
            criteria,
            out,
        } => cmd_compare(&resolve(config_path.as_deref())?, &input, &criteria, out.as_deref()),
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(config_path.as_deref()),
        },
    }
}

fn resolve(path: Option<&Path>) -> Result<AppConfig> {
    let config = match path {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };
    Ok(config)
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

fn cmd_process(config: &AppConfig, input: &InputArgs, render: &RenderArgs) -> Result<()> {
    let result = execute(config, input, None)?;
    let (formatter, target, options) = renderer(config, render)?;
    let outputs = result.workflow.outputs();

    let document = match outputs {
        [single] => formatter.render(single, target, &options)?,
        _ => formatter.format_multiple_outputs(outputs, target.as_str(), false, &options),
    };

    info!(outputs = outputs.len(), format = %target, "processed outputs");
    emit(render.out.as_deref(), &document)
}

fn cmd_report(config: &AppConfig, input: &InputArgs, render: &RenderArgs) -> Result<()> {
    let result = execute(config, input, None)?;
    let (formatter, target, mut options) = renderer(config, render)?;
    if options.title.is_none() {
        options.title = Some(result.workflow.workflow_name().to_string());
    }

    let workflow = &result.workflow;
    let insights = workflow.insights();
    let document = match target {
        TargetFormat::Json => {
            let outputs = workflow
                .outputs()
                .iter()
                .map(|o| o.to_dict())
                .collect::<outputkit_shared::Result<Vec<_>>>()?;
            let report = json!({
                "summary": workflow.summary(),
                "analytics": workflow.analytics(),
                "insights": insights,
                "outputs": outputs,
            });
            outputkit_shared::to_json_indented(&report, options.indent)?
        }
        _ => {
            let mut document =
                formatter.format_multiple_outputs(workflow.outputs(), target.as_str(), true, &options);
            document.push_str(&insight_block(target, insights));
            document
        }
    };

    info!(
        outputs = workflow.outputs().len(),
        success_rate = workflow.summary().success_rate,
        "workflow report generated"
    );
    emit(render.out.as_deref(), &document)
}

fn cmd_consolidate(
    config: &AppConfig,
    input: &InputArgs,
    render: &RenderArgs,
    strategy: Option<&str>,
    role: Option<&str>,
) -> Result<()> {
    let strategy = match strategy {
        Some(name) => name.parse::<ConsolidationStrategy>()?,
        None => config.aggregation.strategy.parse::<ConsolidationStrategy>()?,
    };
    let result = execute(config, input, Some((strategy, role)))?;
    let consolidated = result
        .consolidated
        .as_ref()
        .ok_or_else(|| eyre!("no consolidated output was produced"))?;

    let (formatter, target, options) = renderer(config, render)?;
    let document = formatter.render(consolidated, target, &options)?;

    info!(%strategy, status = %consolidated.status(), "outputs consolidated");
    emit(render.out.as_deref(), &document)
}

fn cmd_compare(
    config: &AppConfig,
    input: &InputArgs,
    criteria: &[String],
    out: Option<&Path>,
) -> Result<()> {
    let result = execute(config, input, None)?;
    let criteria = (!criteria.is_empty()).then_some(criteria);
    let outcome = generate_comparison_report(result.workflow.outputs(), criteria);
    let document = outputkit_shared::to_json_indented(&outcome, config.formatter.indent)?;
    emit(out, &document)
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(path: Option<&Path>) -> Result<()> {
    let config = resolve(path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Load inputs and run the pipeline with config values overridden by flags.
fn execute(
    config: &AppConfig,
    input: &InputArgs,
    consolidate: Option<(ConsolidationStrategy, Option<&str>)>,
) -> Result<PipelineResult> {
    let mut pipeline = PipelineConfig::from_app_config(config);
    if let Some(name) = &input.schema {
        pipeline.schema = Some(name.parse::<SchemaPreset>()?.schema());
    }
    if input.strict {
        pipeline.strict_mode = true;
    }
    if let Some(name) = &input.name {
        pipeline.workflow_name = name.clone();
    }
    if let Some((strategy, role)) = consolidate {
        pipeline.consolidate = Some(strategy);
        if let Some(role) = role {
            pipeline.target_role = role.to_string();
        }
    }

    let inputs = load_inputs(&input.inputs, input.crew)?;
    let reporter = CliProgress::new()?;
    let result = run_pipeline(inputs, &pipeline, &reporter)?;
    Ok(result)
}

/// Formatter with templates loaded, the resolved target, and options.
fn renderer(
    config: &AppConfig,
    render: &RenderArgs,
) -> Result<(OutputFormatter, TargetFormat, FormatOptions)> {
    let mut formatter = OutputFormatter::new();
    if let Some(dir) = &config.formatter.template_dir {
        load_templates(&mut formatter, Path::new(dir))?;
    }

    let target = match (&render.template, &render.format) {
        (Some(_), _) => TargetFormat::Template,
        (None, Some(format)) => format.parse()?,
        (None, None) => config.defaults.format.parse()?,
    };

    let mut options = FormatOptions::from(&config.formatter);
    options.preview_length = config.defaults.preview_length;
    options.title = render.title.clone();
    options.template_name = render.template.clone();
    if target == TargetFormat::Template && options.template_name.is_none() {
        return Err(eyre!(
            "format 'template' needs --template (available: {})",
            formatter.template_names().join(", ")
        ));
    }

    Ok((formatter, target, options))
}

/// Insights appended to an aggregated document in the document's own syntax.
fn insight_block(target: TargetFormat, insights: &[String]) -> String {
    if insights.is_empty() {
        return String::new();
    }
    match target {
        TargetFormat::Markdown => {
            let items: Vec<String> = insights.iter().map(|i| format!("- {i}")).collect();
            format!("\n## Insights\n\n{}\n", items.join("\n"))
        }
        TargetFormat::Html => {
            let items: Vec<String> = insights
                .iter()
                .map(|i| format!("<li>{}</li>", escape_html(i)))
                .collect();
            format!(
                "\n<div class=\"insights\">\n<h2>Insights</h2>\n<ul>\n{}\n</ul>\n</div>\n",
                items.join("\n")
            )
        }
        _ => {
            let items: Vec<String> = insights.iter().map(|i| format!("* {i}")).collect();
            format!("\nINSIGHTS\n{}\n", items.join("\n"))
        }
    }
}

fn emit(out: Option<&Path>, document: &str) -> Result<()> {
    match out {
        Some(path) => {
            std::fs::write(path, document)
                .map_err(|e| eyre!("cannot write '{}': {e}", path.display()))?;
            info!(path = %path.display(), "wrote document");
        }
        None => println!("{document}"),
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Result<Self> {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")?
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Ok(Self { spinner })
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn output_processed(&self, agent_role: &str, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Processing [{current}/{total}] {agent_role}"));
    }

    fn done(&self, _result: &PipelineResult) {
        self.spinner.finish_and_clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_pipeline_flags() {
        let cli = Cli::try_parse_from([
            "outputkit",
            "consolidate",
            "Writer=draft.md",
            "notes.txt",
            "--strategy",
            "best",
            "--schema",
            "research",
            "-f",
            "html",
        ])
        .unwrap();

        let Command::Consolidate {
            input,
            render,
            strategy,
            ..
        } = cli.command
        else {
            panic!("expected consolidate");
        };
        assert_eq!(input.inputs.len(), 2);
        assert_eq!(input.inputs[0].role.as_deref(), Some("Writer"));
        assert_eq!(strategy.as_deref(), Some("best"));
        assert_eq!(input.schema.as_deref(), Some("research"));
        assert_eq!(render.format.as_deref(), Some("html"));
    }

    #[test]
    fn inputs_are_required() {
        assert!(Cli::try_parse_from(["outputkit", "report"]).is_err());
    }

    #[test]
    fn compare_splits_criteria() {
        let cli = Cli::try_parse_from(["outputkit", "compare", "a.md", "b.md", "--criteria", "word_count,status"])
            .unwrap();
        let Command::Compare { criteria, .. } = cli.command else {
            panic!("expected compare");
        };
        assert_eq!(criteria, ["word_count", "status"]);
    }

    #[test]
    fn template_flag_selects_template_format() {
        let render = RenderArgs {
            format: Some("json".into()),
            template: Some("card.j2".into()),
            title: None,
            out: None,
        };
        let (_, target, options) = renderer(&AppConfig::default(), &render).unwrap();
        assert_eq!(target, TargetFormat::Template);
        assert_eq!(options.template_name.as_deref(), Some("card.j2"));
    }

    #[test]
    fn markdown_insights_are_listed() {
        let block = insight_block(TargetFormat::Markdown, &["Fast execution time".to_string()]);
        assert_eq!(block, "\n## Insights\n\n- Fast execution time\n");
        assert!(insight_block(TargetFormat::Csv, &[]).is_empty());
    }
}

//! CLI interface for Debrief.

pub mod handlers;
pub mod output;

use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::services::ExecutionModeKind;
use output::OutputMode;

/// Debrief - tool compatibility, parameter injection and command processing
#[derive(Parser)]
#[command(name = "debrief", version, about, long_about = None)]
pub struct Cli {
    /// Override data directory (default: ~/.debrief)
    #[arg(long, env = "DEBRIEF_DATA_PATH", global = true)]
    pub data_path: Option<PathBuf>,

    /// Output as JSON instead of human-readable format
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the tools applicable to a feature selection
    Tools {
        /// Tool catalogue JSON (`{"tools": [...]}` or a bare array)
        #[arg(long)]
        catalogue: PathBuf,
        /// FeatureCollection JSON
        #[arg(long)]
        features: PathBuf,
        /// Restrict the selection to these feature ids (default: all features)
        #[arg(long, value_delimiter = ',')]
        select: Vec<String>,
        /// Show per-tool validation details, rejected tools included
        #[arg(long)]
        details: bool,
    },

    /// Resolve the parameters a tool would be invoked with
    Inject {
        /// Tool catalogue JSON
        #[arg(long)]
        catalogue: PathBuf,
        /// Tool name
        #[arg(long)]
        tool: String,
        /// FeatureCollection JSON (replaces the editor state's collection)
        #[arg(long)]
        features: Option<PathBuf>,
        /// EditorState JSON
        #[arg(long)]
        state: Option<PathBuf>,
        /// Selected feature ids (default: the editor state's selection)
        #[arg(long, value_delimiter = ',')]
        select: Vec<String>,
        /// Caller-supplied parameters as a JSON object
        #[arg(long)]
        params: Option<String>,
        /// Execution mode used to plan invocations
        #[arg(long, value_enum, default_value = "single")]
        mode: ModeArg,
    },

    /// Apply tool output commands to a feature collection
    Apply {
        /// Command JSON (a single command or an array)
        #[arg(long)]
        commands: PathBuf,
        /// Starting FeatureCollection JSON
        #[arg(long)]
        collection: Option<PathBuf>,
        /// EditorState JSON
        #[arg(long)]
        state: Option<PathBuf>,
        /// Write the resulting collection here
        #[arg(long, short)]
        output: Option<PathBuf>,
        /// Directory for decoded showImage payloads
        #[arg(long)]
        image_dir: Option<PathBuf>,
    },

    /// Print the JSON Schema of a data shape
    Schema {
        #[arg(value_enum, default_value = "command")]
        target: SchemaTarget,
    },

    /// Generate shell completions
    Completions {
        /// Shell type (bash, zsh, fish, elvish, powershell)
        shell: clap_complete::Shell,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    Single,
    Multiple,
    Batch,
}

impl From<ModeArg> for ExecutionModeKind {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Single => ExecutionModeKind::Single,
            ModeArg::Multiple => ExecutionModeKind::Multiple,
            ModeArg::Batch => ExecutionModeKind::Batch,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SchemaTarget {
    Command,
    Tool,
    Catalogue,
    Feature,
    State,
}

/// Execute a CLI command, dispatching to the appropriate handler.
pub async fn execute(
    command: &Commands,
    ctx: &crate::init::AppContext,
    mode: OutputMode,
) -> anyhow::Result<()> {
    match command {
        Commands::Tools {
            catalogue,
            features,
            select,
            details,
        } => handlers::tools::handle_tools(ctx, catalogue, features, select, *details, mode)?,

        Commands::Inject {
            catalogue,
            tool,
            features,
            state,
            select,
            params,
            mode: invocation_mode,
        } => handlers::inject::handle_inject(
            ctx,
            handlers::inject::InjectArgs {
                catalogue,
                tool,
                features: features.as_deref(),
                state: state.as_deref(),
                select,
                params: params.as_deref(),
                invocation_mode: (*invocation_mode).into(),
            },
            mode,
        )?,

        Commands::Apply {
            commands,
            collection,
            state,
            output,
            image_dir,
        } => {
            handlers::apply::handle_apply(
                ctx,
                handlers::apply::ApplyArgs {
                    commands,
                    collection: collection.as_deref(),
                    state: state.as_deref(),
                    output: output.as_deref(),
                    image_dir: image_dir.as_deref(),
                },
                mode,
            )
            .await?
        }

        Commands::Schema { target } => handlers::schema::handle_schema(*target)?,

        Commands::Completions { shell } => {
            clap_complete::generate(*shell, &mut Cli::command(), "debrief", &mut std::io::stdout());
        }
    }

    Ok(())
}

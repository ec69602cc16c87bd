//! Debrief - tool compatibility and command processing engine
//!
//! Usage:
//!   debrief tools --catalogue tools.json --features fc.json
//!   debrief inject --catalogue tools.json --tool track_speed_filter --state state.json
//!   debrief apply --commands result.json --collection fc.json
//!   debrief schema command
//!   debrief --help

use anyhow::Result;
use clap::Parser;

use debrief::cli::output::{print_error, OutputMode};
use debrief::cli::{Cli, Commands};
use debrief::init::AppContext;
use debrief::DebriefError;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Tracing to stderr so stdout stays clean for --json
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("debrief=info".parse()?),
        )
        .init();

    let mode = OutputMode::from_json_flag(cli.json);

    let outcome = match &cli.command {
        Commands::Schema { .. } | Commands::Completions { .. } => {
            let ctx = AppContext::with_config(Default::default(), Default::default());
            debrief::cli::execute(&cli.command, &ctx, mode).await
        }
        cmd => match AppContext::new(cli.data_path.clone()) {
            Ok(ctx) => debrief::cli::execute(cmd, &ctx, mode).await,
            Err(e) => Err(e),
        },
    };

    if let Err(e) = outcome {
        report_error(&e, mode);
        std::process::exit(1);
    }

    Ok(())
}

fn report_error(error: &anyhow::Error, mode: OutputMode) {
    if mode == OutputMode::Json {
        let code = error
            .downcast_ref::<DebriefError>()
            .map(DebriefError::code)
            .unwrap_or("ERROR");
        println!(
            "{}",
            serde_json::json!({ "error": format!("{:#}", error), "code": code })
        );
    } else {
        print_error(&format!("{:#}", error));
    }
}

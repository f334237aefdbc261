use std::path::PathBuf;

use tracing::info;

use crate::cli::commands::CollectArgs;
use crate::cli::progress::CollectionSpinner;
use crate::cli::summary;
use crate::config::{self, AdvisorConfig, OutputFormat};
use crate::errors::AdvisorError;
use crate::pipeline::{PostureOrchestrator, RunOptions};

pub async fn handle_collect(args: CollectArgs, quiet: bool, colored: bool) -> Result<(), AdvisorError> {
    let file_config = match &args.config {
        Some(path) => config::parse_config(&PathBuf::from(path)).await?,
        None => AdvisorConfig::default(),
    };

    let options = RunOptions {
        tenant_id: args.tenant_id.clone(),
        services: args.services.clone(),
        defender_data: args.defender_data.clone(),
    };
    let orchestrator = PostureOrchestrator::new(&file_config, options)?;
    info!(tenant = %orchestrator.tenant_id(), "Collecting tenant posture");

    let spinner = (!quiet).then(|| CollectionSpinner::start(orchestrator.services()));
    let result = orchestrator.run().await;
    if let Some(spinner) = spinner {
        spinner.finish(result.is_ok());
    }
    let report = result?;

    let output = file_config.output.unwrap_or_default();
    let format = args.format.or(output.format).unwrap_or_default();
    let path = args.output.or(output.path);
    let rendered = match format {
        OutputFormat::Json => serde_json::to_string_pretty(&report)?,
        OutputFormat::Summary => summary::render(&report, colored && path.is_none()),
    };

    match path {
        Some(path) => {
            tokio::fs::write(&path, rendered).await?;
            info!(path = %path, advisories = report.advisories().count(), "Report written");
        }
        None => println!("{}", rendered),
    }
    Ok(())
}

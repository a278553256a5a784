//! Deploy command handler.

use surfcontrol_core::{Controller, DeployFailure, DeploymentRecord, MobileCore, Outcome};

use crate::cli::{GlobalOpts, IntentArgs};
use crate::error::CliError;
use crate::output;

use super::intent;

fn detail(r: &DeploymentRecord) -> String {
    let mut lines = vec![
        format!("Deployment: {}", r.id),
        format!("Generation: {}", r.generation),
        format!("Outcome:    {}", r.outcome),
        format!(
            "Backup:     {}",
            r.backup.as_ref().map_or_else(|| "-".into(), ToString::to_string)
        ),
        format!("Artifacts:  {}", r.artifacts.join(", ")),
        format!(
            "Duration:   {}ms",
            (r.finished_at - r.started_at).num_milliseconds()
        ),
    ];
    if let Some(failure) = &r.failure {
        lines.push(format!("Failure:    {failure}"));
    }
    lines.join("\n")
}

pub async fn handle(
    controller: &Controller,
    args: &IntentArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let intent = intent::read_intent(&args.intent)?;

    if controller.orchestrator().recover().await? {
        tracing::info!("reinstated artifact directory after interrupted deployment");
    }

    let record = controller.deploy(intent).await?;
    let out = output::render_single(&global.output, &record, detail, |r| r.outcome.to_string())?;
    output::print_output(&out, global.quiet);

    match (record.outcome, record.failure) {
        (Outcome::Succeeded, _) => Ok(()),
        (_, Some(DeployFailure::Validation { reasons })) => {
            Err(CliError::IntentRejected { reasons })
        }
        (outcome, failure) => Err(CliError::DeployFailed {
            outcome: outcome.to_string().replace('_', " "),
            reason: failure.map_or_else(|| "unknown failure".into(), |f| f.to_string()),
        }),
    }
}

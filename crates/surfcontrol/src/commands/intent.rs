//! `validate` and `render`: intent handling that never touches the core.

use std::path::Path;

use serde::Serialize;
use tabled::Tabled;

use surfcontrol_core::model::service_table;
use surfcontrol_core::{ComponentArtifact, GeneratorOptions, NetworkIntent, generate_with};

use crate::cli::{GlobalOpts, IntentArgs, OutputFormat, RenderArgs};
use crate::error::CliError;
use crate::output;

/// Read and parse an intent document.
pub fn read_intent(path: &Path) -> Result<NetworkIntent, CliError> {
    let unreadable = |source: Box<dyn std::error::Error + Send + Sync>| CliError::IntentUnreadable {
        path: path.display().to_string(),
        source,
    };
    let text = std::fs::read_to_string(path).map_err(|e| unreadable(Box::new(e)))?;
    NetworkIntent::from_yaml(&text).map_err(|e| unreadable(Box::new(e)))
}

/// Parse and validate, turning rejection into an error.
pub fn load_valid_intent(path: &Path) -> Result<NetworkIntent, CliError> {
    let intent = read_intent(path)?;
    let result = surfcontrol_core::validate(&intent);
    if result.ok() {
        Ok(intent)
    } else {
        Err(CliError::IntentRejected {
            reasons: result.reasons,
        })
    }
}

// ── validate ────────────────────────────────────────────────────────

#[derive(Serialize)]
struct IntentSummary {
    valid: bool,
    generation: String,
    plmn: String,
    network_name: String,
    components: Vec<String>,
}

fn summary_line(intent: &NetworkIntent) -> String {
    format!(
        "{} network '{}' (PLMN {}) is valid",
        intent.generation,
        intent.identity.network_name,
        intent.identity.plmn()
    )
}

pub fn validate(args: &IntentArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let intent = load_valid_intent(&args.intent)?;
    let summary = IntentSummary {
        valid: true,
        generation: intent.generation.to_string(),
        plmn: intent.identity.plmn(),
        network_name: intent.identity.network_name.clone(),
        components: service_table(intent.generation)
            .iter()
            .map(|s| s.component.to_string())
            .collect(),
    };
    let out = output::render_single(
        &global.output,
        &summary,
        |_| summary_line(&intent),
        |s| s.plmn.clone(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}

// ── render ──────────────────────────────────────────────────────────

#[derive(Serialize)]
struct RenderedArtifact {
    component: String,
    file: String,
    bytes: usize,
    sha256: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
}

#[derive(Tabled)]
struct ArtifactRow {
    #[tabled(rename = "Component")]
    component: String,
    #[tabled(rename = "File")]
    file: String,
    #[tabled(rename = "Bytes")]
    bytes: usize,
    #[tabled(rename = "SHA-256")]
    sha256: String,
}

impl From<&RenderedArtifact> for ArtifactRow {
    fn from(a: &RenderedArtifact) -> Self {
        Self {
            component: a.component.clone(),
            file: a.file.clone(),
            bytes: a.bytes,
            sha256: a.sha256.chars().take(12).collect(),
        }
    }
}

fn describe(artifact: &ComponentArtifact, with_content: bool) -> RenderedArtifact {
    RenderedArtifact {
        component: artifact.component.to_string(),
        file: artifact.file_name.clone(),
        bytes: artifact.content.len(),
        sha256: artifact.digest(),
        content: with_content.then(|| String::from_utf8_lossy(&artifact.content).into_owned()),
    }
}

pub fn render(
    args: &RenderArgs,
    generator: &GeneratorOptions,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let intent = load_valid_intent(&args.intent)?;
    let artifacts = generate_with(&intent, generator).map_err(|e| CliError::Generation {
        message: e.to_string(),
    })?;

    let Some(dir) = &args.out else {
        // Straight to stdout: YAML documents for table/plain, structured
        // records otherwise.
        let described: Vec<_> = artifacts.values().map(|a| describe(a, true)).collect();
        let out = match global.output {
            OutputFormat::Table | OutputFormat::Plain => described
                .iter()
                .map(|a| format!("# {}\n{}", a.file, a.content.as_deref().unwrap_or_default()))
                .collect::<Vec<_>>()
                .join("---\n"),
            _ => output::render_list(&global.output, &described, |a| ArtifactRow::from(a), |a| {
                a.file.clone()
            })?,
        };
        output::print_output(out.trim_end(), global.quiet);
        return Ok(());
    };

    std::fs::create_dir_all(dir)?;
    for artifact in artifacts.values() {
        std::fs::write(dir.join(&artifact.file_name), &artifact.content)?;
    }
    let described: Vec<_> = artifacts.values().map(|a| describe(a, false)).collect();
    let out = output::render_list(&global.output, &described, |a| ArtifactRow::from(a), |a| {
        dir.join(&a.file).display().to_string()
    })?;
    output::print_output(&out, global.quiet);
    Ok(())
}

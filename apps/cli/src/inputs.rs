//! Reading agent outputs and templates from disk.

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use color_eyre::eyre::{Result, WrapErr};
use outputkit_core::PipelineInput;
use outputkit_formatter::OutputFormatter;
use outputkit_processor::CrewResult;
use outputkit_shared::OutputKitError;
use serde_json::Value;
use tracing::debug;

/// `PATH` or `ROLE=PATH`.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct InputSource {
    pub role: Option<String>,
    pub path: PathBuf,
}

impl FromStr for InputSource {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (role, path) = match s.split_once('=') {
            Some((role, path)) if !role.trim().is_empty() => (Some(role.trim().to_string()), path),
            Some((_, path)) => (None, path),
            None => (None, s),
        };
        if path.trim().is_empty() {
            return Err(format!("missing path in '{s}'"));
        }
        Ok(Self {
            role,
            path: PathBuf::from(path),
        })
    }
}

impl InputSource {
    /// Explicit role, else the file stem.
    fn role(&self) -> String {
        self.role.clone().unwrap_or_else(|| {
            self.path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "Unknown".to_string())
        })
    }
}

fn read(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| OutputKitError::io(path, e).into())
}

/// Load every input. With `crew`, each file holds a JSON crew result whose
/// task outputs become separate inputs.
pub(crate) fn load_inputs(sources: &[InputSource], crew: bool) -> Result<Vec<PipelineInput>> {
    let mut inputs = Vec::new();
    for source in sources {
        let text = read(&source.path)?;
        let role = source.role();

        if !crew {
            inputs.push(PipelineInput::new(role, text));
            continue;
        }

        let value: Value = serde_json::from_str(&text)
            .wrap_err_with(|| format!("'{}' is not a JSON crew result", source.path.display()))?;
        match CrewResult::from_value(value) {
            CrewResult::Tasks(tasks) => inputs.extend(tasks.into_iter().map(|task| {
                PipelineInput::new(task.agent_role.unwrap_or_else(|| role.clone()), task.raw)
            })),
            CrewResult::Outputs(items) => {
                inputs.extend(items.into_iter().map(|raw| PipelineInput::new(role.clone(), raw)));
            }
            CrewResult::Single(raw) => inputs.push(PipelineInput::new(role, raw)),
        }
    }
    debug!(count = inputs.len(), "loaded inputs");
    Ok(inputs)
}

/// Register every file in `dir` as a template named after its file name.
pub(crate) fn load_templates(formatter: &mut OutputFormatter, dir: &Path) -> Result<usize> {
    let entries = fs::read_dir(dir).map_err(|e| OutputKitError::io(dir, e))?;
    let mut count = 0;
    for entry in entries {
        let path = entry.map_err(|e| OutputKitError::io(dir, e))?.path();
        if !path.is_file() {
            continue;
        }
        let Some(name) = path.file_name().map(|n| n.to_string_lossy().into_owned()) else {
            continue;
        };
        formatter.add_template(name, read(&path)?)?;
        count += 1;
    }
    debug!(dir = %dir.display(), count, "loaded templates");
    Ok(count)
}

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::core::types::{validate_grid, Grid, TrainingPair};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArcTask {
    #[serde(default)]
    pub id: String,
    pub train: Vec<ArcExample>,
    pub test: Vec<TestCase>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArcExample {
    pub input: Grid,
    pub output: Grid,
}

/// Test inputs; the expected output is only present in evaluation data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestCase {
    pub input: Grid,
    #[serde(default)]
    pub output: Option<Grid>,
}

impl ArcTask {
    pub fn training_pairs(&self) -> Vec<TrainingPair> {
        self.train.iter().map(|ex| (ex.input.clone(), ex.output.clone())).collect()
    }

    /// Every grid in the task must be a legal puzzle grid.
    pub fn validate(&self) -> anyhow::Result<()> {
        for (i, ex) in self.train.iter().enumerate() {
            validate_grid(&ex.input).with_context(|| format!("task {} train {} input", self.id, i))?;
            validate_grid(&ex.output).with_context(|| format!("task {} train {} output", self.id, i))?;
        }
        for (i, case) in self.test.iter().enumerate() {
            validate_grid(&case.input).with_context(|| format!("task {} test {} input", self.id, i))?;
            if let Some(output) = &case.output {
                validate_grid(output).with_context(|| format!("task {} test {} output", self.id, i))?;
            }
        }
        Ok(())
    }
}

pub fn parse_task(id: &str, json: &str) -> anyhow::Result<ArcTask> {
    let mut task: ArcTask = serde_json::from_str(json)
        .with_context(|| format!("task {} is not valid task JSON", id))?;
    task.id = id.to_string();
    task.validate()?;
    Ok(task)
}

/// One task per file; the id is the file stem.
pub fn load_arc_task(path: impl AsRef<Path>) -> anyhow::Result<ArcTask> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read {}", path.display()))?;
    let id = path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("unknown");
    parse_task(id, &content)
}

/// Combined form: `{ "<task id>": { "train": [...], "test": [...] }, ... }`.
/// Tasks come back sorted by id.
pub fn parse_challenges(json: &str) -> anyhow::Result<Vec<ArcTask>> {
    let raw: BTreeMap<String, ArcTask> = serde_json::from_str(json)
        .context("challenge file is not an id -> task map")?;
    raw.into_iter()
        .map(|(id, mut task)| -> anyhow::Result<ArcTask> {
            task.id = id;
            task.validate()?;
            Ok(task)
        })
        .collect()
}

pub fn load_challenges(path: impl AsRef<Path>) -> anyhow::Result<Vec<ArcTask>> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read {}", path.display()))?;
    parse_challenges(&content)
}

pub fn grid_to_string(grid: &Grid) -> String {
    grid.iter()
        .map(|row| row.iter().map(|c| c.to_string()).collect::<Vec<_>>().join(" "))
        .collect::<Vec<_>>()
        .join("\n")
}

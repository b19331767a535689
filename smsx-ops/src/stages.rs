//! File-to-file stage runners
//!
//! Each stage reads the previous stage's table from the data folder, runs
//! one component and writes its own table. File names follow the
//! numbered convention of the experiment's data folder. Labels and names
//! keep their case in file names, so runs `A` and `a` never share a file.

use crate::models::{Assignment, BroadcastResult, DeliveryResult, SubjectTable};
use crate::services::{
    AggregateReport, ClickAggregator, ContactNormalizer, LinkProvisioner, MessageDispatcher,
    NormalizeOutcome, RawLayout, SendConfirmation,
};
use anyhow::{bail, Context, Result};
use smsx_common::table::RecordWriter;
use rand::Rng;
use smsx_common::table;
use std::path::{Path, PathBuf};
use tracing::info;

/// Standard table locations inside a data folder
#[derive(Debug, Clone)]
pub struct StagePaths {
    root: PathBuf,
}

impl StagePaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn raw_responses(&self) -> PathBuf {
        self.root.join("01_responses.csv")
    }

    pub fn subjects(&self) -> PathBuf {
        self.root.join("02_responses_cleaned.csv")
    }

    pub fn assignments(&self, label: &str) -> PathBuf {
        self.root.join(format!("03_assignments_{}.csv", label))
    }

    pub fn deliveries(&self, label: &str) -> PathBuf {
        self.root.join(format!("04_assignments_sent_{}.csv", label))
    }

    pub fn broadcast(&self, name: &str) -> PathBuf {
        self.root.join(format!("04_broadcast_{}.csv", name))
    }

    pub fn clicks(&self) -> PathBuf {
        self.root.join("05_clicks.csv")
    }
}

/// Stage 1: raw survey export → subject table
///
/// `layout` defaults to the survey form export layout for the file's
/// column count.
pub fn run_normalize(
    input: &Path,
    output: &Path,
    layout: Option<RawLayout>,
) -> Result<NormalizeOutcome> {
    let raw = table::read_raw(input)
        .with_context(|| format!("Failed to read raw responses {}", input.display()))?;
    let layout = layout.unwrap_or_else(|| RawLayout::survey_export(raw.headers.len()));

    let outcome = ContactNormalizer::new(layout).normalize(&raw)?;
    table::write_raw(output, &outcome.table.to_raw())
        .with_context(|| format!("Failed to write subjects {}", output.display()))?;

    info!(output = %output.display(), subjects = outcome.table.len(), "Stage 1 written");
    Ok(outcome)
}

/// Stage 2: subject table → assignments for one experiment run
///
/// Refuses to run when `output` exists unless `force` is set: messages and
/// clicks are attributed through the links already in that table, and a
/// second run would also create a second batch of links at the provider.
#[allow(clippy::too_many_arguments)]
pub async fn run_provision<R: Rng + ?Sized>(
    provisioner: &LinkProvisioner,
    input: &Path,
    output: &Path,
    destination_url: &str,
    p: f64,
    experiment_label: &str,
    rng: &mut R,
    force: bool,
) -> Result<Vec<Assignment>> {
    guard_existing(
        output,
        force,
        "this run was provisioned before and its links may already be in use",
    )?;
    let subjects = read_subjects(input)?;

    let assignments = provisioner
        .provision(&subjects.subjects, destination_url, p, experiment_label, rng)
        .await?;
    table::write_records(output, &assignments)
        .with_context(|| format!("Failed to write assignments {}", output.display()))?;

    info!(output = %output.display(), rows = assignments.len(), "Stage 2 written");
    Ok(assignments)
}

/// Stage 3: assignments → delivery results
///
/// Refuses to run when `output` exists unless `force` is set: an existing
/// results file means this batch was probably sent already. Each row is
/// written as soon as its send completes, so a run killed mid-batch
/// still leaves the file (and the rows already sent) behind.
pub async fn run_dispatch(
    dispatcher: &MessageDispatcher,
    input: &Path,
    output: &Path,
    message_body: &str,
    media_url: &str,
    confirmation: SendConfirmation,
    force: bool,
) -> Result<Vec<DeliveryResult>> {
    guard_existing(output, force, "these messages were likely sent before")?;

    let assignments: Vec<Assignment> = table::read_records(input)
        .with_context(|| format!("Failed to read assignments {}", input.display()))?;
    confirmation.check(assignments.len())?;

    let mut writer = RecordWriter::create(output)
        .with_context(|| format!("Failed to create delivery results {}", output.display()))?;
    let results = dispatcher
        .dispatch_recording(&assignments, message_body, media_url, confirmation, |row| {
            writer.append(row)
        })
        .await
        .with_context(|| format!("Dispatch stopped; sent rows are in {}", output.display()))?;
    writer.finish()?;

    info!(output = %output.display(), rows = results.len(), "Stage 3 written");
    Ok(results)
}

/// Plain message to every subject in the subject table
pub async fn run_broadcast(
    dispatcher: &MessageDispatcher,
    input: &Path,
    output: &Path,
    message_body: &str,
    confirmation: SendConfirmation,
    force: bool,
) -> Result<Vec<BroadcastResult>> {
    guard_existing(output, force, "this message was likely sent before")?;

    let subjects = read_subjects(input)?;
    confirmation.check(subjects.len())?;

    let mut writer = RecordWriter::create(output)
        .with_context(|| format!("Failed to create broadcast results {}", output.display()))?;
    let results = dispatcher
        .broadcast_recording(&subjects.ids(), message_body, confirmation, |row| {
            writer.append(row)
        })
        .await
        .with_context(|| format!("Broadcast stopped; sent rows are in {}", output.display()))?;
    writer.finish()?;

    Ok(results)
}

/// Stage 4: provider link inventory → click table
pub async fn run_aggregate(
    aggregator: &ClickAggregator,
    output: &Path,
    expected_total: Option<u64>,
    page_size: u32,
) -> Result<AggregateReport> {
    let report = aggregator.aggregate(expected_total, page_size).await?;
    table::write_records(output, &report.links)
        .with_context(|| format!("Failed to write clicks {}", output.display()))?;

    info!(output = %output.display(), links = report.links.len(), "Stage 4 written");
    Ok(report)
}

fn read_subjects(input: &Path) -> Result<SubjectTable> {
    let raw = table::read_raw(input)
        .with_context(|| format!("Failed to read subjects {}", input.display()))?;
    Ok(SubjectTable::from_raw(&raw)?)
}

fn guard_existing(output: &Path, force: bool, consequence: &str) -> Result<()> {
    if output.exists() && !force {
        bail!(
            "{} already exists; {}. Re-run with --force to replace it.",
            output.display(),
            consequence
        );
    }
    Ok(())
}

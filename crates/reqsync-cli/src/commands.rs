//! Subcommand implementations

use anyhow::Context;
use reqsync_document::{analyze_document, DocumentAnalysis, SourceRef};
use reqsync_sync::{
    plan_user_stories, BatchOptions, BatchSynchronizer, FailureCategory, FailureReport,
    SharedResilience, SimulatedAuthProvider, SimulatedTaskApi, SyncConfig, SyncError,
    SyncPipeline, TaskDraft,
};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::debug;

pub(crate) struct SyncArgs {
    pub(crate) file: PathBuf,
    pub(crate) config: Option<PathBuf>,
    pub(crate) fail_every: u64,
    pub(crate) fail_status: u16,
    pub(crate) json: bool,
}

fn analyze(path: &Path) -> anyhow::Result<DocumentAnalysis> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read {}", path.display()))?;
    Ok(analyze_document(&text, SourceRef::new(path.display().to_string())))
}

fn print_analysis(analysis: &DocumentAnalysis) {
    for err in &analysis.extraction_errors {
        println!("extraction: {err}");
    }
    println!("{}", analysis.validation);
}

pub(crate) fn validate(path: &Path, json: bool) -> anyhow::Result<ExitCode> {
    let analysis = analyze(path)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&analysis)?);
    } else {
        println!("{}: {}", path.display(), analysis.record.title);
        println!("  stakeholders: {}", analysis.record.stakeholders.len());
        println!(
            "  functional requirements: {}",
            analysis.record.functional_requirements.len()
        );
        print_analysis(&analysis);
    }
    Ok(exit_code(analysis.is_submittable()))
}

pub(crate) fn plan(path: &Path, json: bool) -> anyhow::Result<ExitCode> {
    let analysis = analyze(path)?;
    if !analysis.is_submittable() {
        print_analysis(&analysis);
        return Ok(ExitCode::FAILURE);
    }

    let drafts: Vec<TaskDraft> = plan_user_stories(&analysis.record)
        .iter()
        .map(TaskDraft::from_story)
        .collect();
    if json {
        println!("{}", serde_json::to_string_pretty(&drafts)?);
        return Ok(ExitCode::SUCCESS);
    }

    println!("{} task(s) planned from {}", drafts.len(), path.display());
    for (n, draft) in drafts.iter().enumerate() {
        println!(
            "{:>3}. {} [{} | rank {} | {}h | {} pts | {}]",
            n + 1,
            draft.title,
            draft.priority,
            draft.priority_rank,
            draft.estimated_hours,
            draft.story_points,
            draft.complexity
        );
        for item in &draft.checklist {
            println!("       [ ] {}", item.text);
        }
    }
    Ok(ExitCode::SUCCESS)
}

pub(crate) async fn sync(args: &SyncArgs) -> anyhow::Result<ExitCode> {
    let config = match &args.config {
        Some(path) => match SyncConfig::load(path) {
            Ok(config) => {
                debug!(path = %path.display(), "configuration loaded");
                config
            }
            Err(err) => {
                eprintln!("{}", FailureReport::from_config_error(&err));
                return Ok(ExitCode::FAILURE);
            }
        },
        None => {
            debug!("using default configuration");
            SyncConfig::default()
        }
    };
    let analysis = analyze(&args.file)?;

    let api = Arc::new(SimulatedTaskApi::new().with_failure_every(args.fail_every, args.fail_status));
    let shared = SharedResilience::from_config(&config);
    let synchronizer = BatchSynchronizer::new(
        &config,
        api,
        Arc::new(SimulatedAuthProvider::default()),
        &shared,
    );
    let pipeline = SyncPipeline::new(synchronizer);

    let options = BatchOptions::from_config(&config).with_progress(|progress| {
        eprintln!(
            "  {}/{} ({:.0}%)",
            progress.completed, progress.total, progress.percentage
        );
    });

    let outcome = match pipeline.synchronize(&analysis.record, &options).await {
        Ok(outcome) => outcome,
        Err(err @ SyncError::ValidationFailed(_)) => {
            print_analysis(&analysis);
            eprintln!("{}", FailureReport::from_sync_error(&err));
            return Ok(ExitCode::FAILURE);
        }
        Err(err) => {
            eprintln!("{}", FailureReport::from_sync_error(&err));
            return Ok(ExitCode::FAILURE);
        }
    };

    debug!(
        created = outcome.batch.tasks_created,
        failed = outcome.batch.failures.len(),
        batches = outcome.batch.batches,
        "synchronization finished"
    );
    if args.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        for warning in &outcome.warnings {
            println!("warning [{}]: {}", warning.field, warning.message);
        }
        for task in &outcome.batch.created {
            println!("created {} ← {}", task.task_id, task.title);
        }
        for failure in &outcome.batch.failures {
            println!("{}", failure.report);
        }
        println!(
            "{} created, {} failed, {} batch(es) in {:.1}s",
            outcome.batch.tasks_created,
            outcome.batch.failures.len(),
            outcome.batch.batches,
            outcome.batch.total_time.as_secs_f64()
        );
    }
    Ok(exit_code(outcome.batch.is_complete()))
}

/// Report for an error that aborted a subcommand
pub(crate) fn failure_report(err: &anyhow::Error, input: Option<&Path>) -> FailureReport {
    let item = input.map(|path| path.display().to_string()).unwrap_or_default();
    let report = if err.chain().any(|cause| cause.is::<std::io::Error>()) {
        FailureReport::new(
            FailureCategory::Configuration,
            format!("{err:#}"),
            "Check that the path exists and is readable",
        )
        .with_operation("read input")
    } else {
        FailureReport::new(
            FailureCategory::Configuration,
            format!("{err:#}"),
            "Re-run with --verbose for more detail",
        )
        .with_operation("reqsync")
    };
    report.with_item(item)
}

fn exit_code(success: bool) -> ExitCode {
    if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const DOC: &str = "# Portal\n## Summary\nPortal\n## Objectives\n- Fewer calls\n\
                       ## Functional Requirements\n- Login\n- Export\n\
                       ## Acceptance Criteria\n- Fast\n## Stakeholders\n@alice\n";

    fn write_doc(text: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(text.as_bytes()).unwrap();
        file
    }

    #[test]
    fn validate_reports_invalid_document() {
        let file = write_doc("# Draft\n");
        assert_eq!(validate(file.path(), true).unwrap(), ExitCode::FAILURE);
        let good = write_doc(DOC);
        assert_eq!(validate(good.path(), false).unwrap(), ExitCode::SUCCESS);
    }

    #[test]
    fn missing_file_is_reported_with_suggestion() {
        let path = Path::new("/nonexistent/doc.md");
        let err = validate(path, false).unwrap_err();
        let report = failure_report(&err, Some(path));
        assert_eq!(report.category, FailureCategory::Configuration);
        assert_eq!(report.operation, "read input");
        let line = report.to_string();
        assert!(line.starts_with("[configuration] read input failed for '/nonexistent/doc.md': cannot read"));
        assert!(line.ends_with("Suggestion: Check that the path exists and is readable"));
    }

    #[tokio::test(start_paused = true)]
    async fn sync_with_injected_failures_still_completes() {
        let file = write_doc(DOC);
        let args = SyncArgs {
            file: file.path().to_path_buf(),
            config: None,
            fail_every: 2,
            fail_status: 503,
            json: false,
        };
        assert_eq!(sync(&args).await.unwrap(), ExitCode::SUCCESS);
    }

    #[tokio::test(start_paused = true)]
    async fn sync_refuses_bad_config() {
        let doc = write_doc(DOC);
        let config = write_doc("[batch]\nsize = 0\n");
        let args = SyncArgs {
            file: doc.path().to_path_buf(),
            config: Some(config.path().to_path_buf()),
            fail_every: 0,
            fail_status: 503,
            json: true,
        };
        assert_eq!(sync(&args).await.unwrap(), ExitCode::FAILURE);
    }
}

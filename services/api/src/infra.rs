use form_runner::error::AppError;
use form_runner::forms::{
    load_form_file, load_forms_dir, Form, HandlerRegistry, InMemoryFormRepository,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Expands directories into their `*.json` files; plain paths are kept as given.
pub(crate) fn collect_form_files(paths: &[PathBuf]) -> Result<Vec<PathBuf>, AppError> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            let mut entries: Vec<PathBuf> = std::fs::read_dir(path)?
                .filter_map(|entry| entry.ok().map(|entry| entry.path()))
                .filter(|entry| entry.extension().is_some_and(|ext| ext == "json"))
                .collect();
            entries.sort();
            files.extend(entries);
        } else {
            files.push(path.clone());
        }
    }
    Ok(files)
}

pub(crate) fn load_forms(files: &[PathBuf]) -> Result<Vec<Form>, AppError> {
    files
        .iter()
        .map(|path| load_form_file(path).map_err(AppError::from))
        .collect()
}

/// Builds the form store, seeding it from `forms_dir` when one is configured.
///
/// Definitions that fail the checker are logged and left out so a broken form
/// never reaches applicants.
pub(crate) fn seed_form_repository(
    forms_dir: Option<&Path>,
    registry: &HandlerRegistry,
) -> Result<InMemoryFormRepository, AppError> {
    let Some(dir) = forms_dir else {
        warn!("no forms directory configured; serving an empty form store");
        return Ok(InMemoryFormRepository::default());
    };

    let mut accepted = Vec::new();
    for form in load_forms_dir(dir)? {
        let issues = form.check(registry);
        if issues.is_empty() {
            accepted.push(form);
            continue;
        }
        for issue in &issues {
            warn!(form_id = %form.id, %issue, "form definition issue");
        }
        warn!(form_id = %form.id, issues = issues.len(), "skipping form definition");
    }

    info!(dir = %dir.display(), forms = accepted.len(), "seeded form store");
    Ok(InMemoryFormRepository::with_forms(accepted))
}

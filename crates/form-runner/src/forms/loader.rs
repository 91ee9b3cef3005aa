use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::domain::Form;

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse form definition {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Parses one JSON form definition.
pub fn parse_form(json: &str) -> Result<Form, serde_json::Error> {
    serde_json::from_str(json)
}

pub fn load_form_file(path: &Path) -> Result<Form, LoadError> {
    let json = fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_form(&json).map_err(|source| LoadError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Loads every `*.json` file in `dir`, in file-name order.
pub fn load_forms_dir(dir: &Path) -> Result<Vec<Form>, LoadError> {
    let io_error = |source| LoadError::Io {
        path: dir.to_path_buf(),
        source,
    };

    let mut paths = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_error)? {
        let path = entry.map_err(io_error)?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
            paths.push(path);
        }
    }
    paths.sort();

    paths
        .iter()
        .map(|path| {
            let form = load_form_file(path)?;
            debug!(path = %path.display(), form_id = %form.id, "loaded form definition");
            Ok(form)
        })
        .collect()
}

use anyhow::Context;
use conocer_core::models::{UploadBatch, UploadLog};
use serde::Serialize;
use std::path::Path;

/// Initialize tracing for the CLI. `LOG_FORMAT=json` switches to JSON lines.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

pub fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize output")?;
    println!("{}", out);
    Ok(())
}

/// Name a submitted archive is stored under: the file name of `path`, or
/// `upload.zip` when the path has none.
pub fn archive_filename(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "upload.zip".to_string())
}

/// A batch as printed by `status`, with its log rows when requested.
#[derive(Debug, Serialize)]
pub struct BatchReport {
    pub batch: UploadBatch,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logs: Option<Vec<UploadLog>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn archive_filename_uses_last_component() {
        assert_eq!(archive_filename(&PathBuf::from("/tmp/lotes/enero.zip")), "enero.zip");
        assert_eq!(archive_filename(&PathBuf::from("febrero.zip")), "febrero.zip");
    }

    #[test]
    fn archive_filename_falls_back() {
        assert_eq!(archive_filename(&PathBuf::from("/")), "upload.zip");
        assert_eq!(archive_filename(&PathBuf::from("..")), "upload.zip");
    }
}

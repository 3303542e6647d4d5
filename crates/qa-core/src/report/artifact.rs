//! Persisted report artifacts.
//!
//! Layout under the output directory:
//! - `qa-report.<ext>` for every rendered format
//! - `qa-report.digest`: SHA-256 hex of the JSON bytes

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::domain::ReportRenderError;
use crate::report::{QAReport, RenderOutput, ReportFormat};

pub const REPORT_STEM: &str = "qa-report";
pub const REPORT_DIGEST_FILE: &str = "qa-report.digest";

pub fn report_path(dir: &Path, format: ReportFormat) -> PathBuf {
    dir.join(format!("{REPORT_STEM}.{}", format.extension()))
}

fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Write every rendered format in `output` into `dir`, creating it if needed.
///
/// The digest file is written only when JSON was rendered. Returns the paths
/// written, in format order.
pub fn write_report_artifacts(
    dir: &Path,
    output: &RenderOutput,
) -> Result<Vec<PathBuf>, ReportRenderError> {
    std::fs::create_dir_all(dir)?;

    let mut written = Vec::new();
    for (format, text) in &output.rendered {
        let path = report_path(dir, *format);
        std::fs::write(&path, text.as_bytes())?;
        written.push(path);
    }

    if let Some(json) = output.get(ReportFormat::Json) {
        let digest_path = dir.join(REPORT_DIGEST_FILE);
        std::fs::write(&digest_path, sha256_hex(json.as_bytes()))?;
        written.push(digest_path);
    }

    tracing::debug!(dir = %dir.display(), files = written.len(), "report artifacts written");
    Ok(written)
}

/// Read `qa-report.json` from `dir` after verifying it against the digest.
pub fn read_report_artifact(dir: &Path) -> Result<QAReport, ReportRenderError> {
    let json = std::fs::read(report_path(dir, ReportFormat::Json))?;
    let expected = std::fs::read_to_string(dir.join(REPORT_DIGEST_FILE))?;
    let actual = sha256_hex(&json);
    if expected.trim() != actual {
        return Err(ReportRenderError::DigestMismatch {
            expected: expected.trim().to_string(),
            actual,
        });
    }
    Ok(serde_json::from_slice(&json)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::test_support::sample_report;
    use crate::report::ReportGenerator;

    #[test]
    fn artifacts_round_trip_with_digest() {
        let dir = tempfile::tempdir().expect("tempdir");
        let report = sample_report(87.3);
        let output = ReportGenerator::standard()
            .render(&report, &[ReportFormat::Json, ReportFormat::Xml]);

        let written = write_report_artifacts(dir.path(), &output).expect("write artifacts");
        assert_eq!(written.len(), 3);
        assert!(dir.path().join("qa-report.json").exists());
        assert!(dir.path().join("qa-report.xml").exists());
        assert!(!dir.path().join("qa-report.html").exists());

        let back = read_report_artifact(dir.path()).expect("read artifact");
        assert_eq!(back.run_id, report.run_id);
        assert_eq!(back.outcomes, report.outcomes);
    }

    #[test]
    fn tampered_report_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let output = ReportGenerator::standard().render(&sample_report(70.0), &[ReportFormat::Json]);
        write_report_artifacts(dir.path(), &output).expect("write artifacts");

        let path = dir.path().join("qa-report.json");
        let tampered = std::fs::read_to_string(&path)
            .unwrap()
            .replace("\"reject\"", "\"accept\"");
        std::fs::write(&path, tampered).unwrap();

        let err = read_report_artifact(dir.path()).unwrap_err();
        assert!(matches!(err, ReportRenderError::DigestMismatch { .. }));
    }

    #[test]
    fn digest_is_sha256_hex() {
        let digest = sha256_hex(b"abc");
        assert_eq!(
            digest,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}

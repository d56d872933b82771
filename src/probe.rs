use std::{
    path::Path,
    process::{Command, Stdio},
};

use crate::error::{BumpgenError, BumpgenResult};

/// Capability for determining the playable length of a media file.
///
/// A trait so background selection can be tested without ffprobe and so
/// probing stays mockable at the pipeline seam.
pub trait DurationProbe {
    fn duration_seconds(&self, path: &Path) -> BumpgenResult<f64>;
}

/// Probes durations by shelling out to the system `ffprobe` binary.
pub struct FfprobeDurationProbe;

pub fn is_ffprobe_on_path() -> bool {
    Command::new("ffprobe")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

impl DurationProbe for FfprobeDurationProbe {
    fn duration_seconds(&self, path: &Path) -> BumpgenResult<f64> {
        let output = Command::new("ffprobe")
            .args(["-v", "quiet", "-print_format", "json", "-show_format"])
            .arg(path)
            .output()
            .map_err(|e| {
                BumpgenError::probe(format!(
                    "failed to run ffprobe (is it installed and on PATH?): {e}"
                ))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(BumpgenError::probe(format!(
                "ffprobe failed for '{}': {}",
                path.display(),
                stderr.trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_format_duration(&stdout).map_err(|e| {
            BumpgenError::probe(format!("ffprobe output for '{}': {e}", path.display()))
        })
    }
}

#[derive(Debug, serde::Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

#[derive(Debug, serde::Deserialize)]
struct FfprobeOutput {
    format: Option<FfprobeFormat>,
}

/// Parse `format.duration` out of ffprobe's `-print_format json` output.
fn parse_format_duration(stdout: &str) -> BumpgenResult<f64> {
    let probe: FfprobeOutput = serde_json::from_str(stdout)
        .map_err(|e| BumpgenError::probe(format!("unparseable json: {e}")))?;

    let duration = probe
        .format
        .and_then(|f| f.duration)
        .ok_or_else(|| BumpgenError::probe("no format.duration field"))?;

    let seconds: f64 = duration
        .parse()
        .map_err(|e| BumpgenError::probe(format!("bad duration '{duration}': {e}")))?;

    if !seconds.is_finite() || seconds < 0.0 {
        return Err(BumpgenError::probe(format!(
            "nonsensical duration {seconds}"
        )));
    }
    Ok(seconds)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_duration_from_format_block() {
        let json = r#"{"format":{"filename":"bg.mp4","duration":"63.433333","size":"1024"}}"#;
        let d = parse_format_duration(json).unwrap();
        assert!((d - 63.433333).abs() < 1e-9);
    }

    #[test]
    fn missing_duration_is_a_probe_error() {
        let json = r#"{"format":{"filename":"bg.mp4"}}"#;
        let err = parse_format_duration(json).unwrap_err();
        assert!(matches!(err, BumpgenError::Probe(_)));
    }

    #[test]
    fn garbage_json_is_a_probe_error() {
        assert!(matches!(
            parse_format_duration("not json"),
            Err(BumpgenError::Probe(_))
        ));
    }

    #[test]
    fn negative_duration_is_rejected() {
        let json = r#"{"format":{"duration":"-3.0"}}"#;
        assert!(parse_format_duration(json).is_err());
    }
}

//! Source probing via ffprobe.

use std::path::Path;
use tokio::process::Command;

use crate::error::TranscodeError;

/// Metadata extracted from the source container's first video stream.
#[derive(Debug, Clone)]
pub struct SourceProbe {
    pub duration: f64,
    pub width: u32,
    pub height: u32,
    pub codec: String,
    pub fps: Option<f32>,
    pub bitrate: Option<u64>,
    pub container: String,
}

/// Reject binary paths with shell metacharacters before they reach Command.
pub(crate) fn validate_binary_path(path: &str) -> Result<(), TranscodeError> {
    let dangerous_chars = [';', '|', '&', '$', '`', '(', ')', '<', '>', '\n', '\r'];
    if path.chars().any(|c| dangerous_chars.contains(&c)) || path.contains("..") {
        return Err(TranscodeError::InvalidBinaryPath(path.to_string()));
    }
    Ok(())
}

#[tracing::instrument(skip(source), fields(ffmpeg.operation = "probe"))]
pub(crate) async fn run(ffprobe_path: &str, source: &Path) -> Result<SourceProbe, TranscodeError> {
    let start = std::time::Instant::now();

    let output = Command::new(ffprobe_path)
        .args([
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
            "-select_streams",
            "v:0",
        ])
        .arg(source)
        .output()
        .await
        .map_err(|e| TranscodeError::Probe(format!("Failed to execute ffprobe: {}", e)))?;

    if !output.status.success() {
        return Err(TranscodeError::Probe(
            String::from_utf8_lossy(&output.stderr).to_string(),
        ));
    }

    let probe = parse_output(&output.stdout)?;

    tracing::info!(
        duration_ms = start.elapsed().as_millis() as u64,
        video_duration = probe.duration,
        width = probe.width,
        height = probe.height,
        codec = %probe.codec,
        "Video probe completed"
    );

    Ok(probe)
}

fn parse_output(stdout: &[u8]) -> Result<SourceProbe, TranscodeError> {
    let probe_data: serde_json::Value = serde_json::from_slice(stdout)
        .map_err(|e| TranscodeError::Probe(format!("Failed to parse ffprobe output: {}", e)))?;

    let stream = probe_data["streams"]
        .get(0)
        .ok_or(TranscodeError::NoVideoStream)?;

    let format = &probe_data["format"];

    let duration = format["duration"]
        .as_str()
        .and_then(|d| d.parse::<f64>().ok())
        .ok_or_else(|| TranscodeError::Probe("Could not parse duration".to_string()))?;

    let width = stream["width"]
        .as_u64()
        .ok_or_else(|| TranscodeError::Probe("Could not parse width".to_string()))?
        as u32;

    let height = stream["height"]
        .as_u64()
        .ok_or_else(|| TranscodeError::Probe("Could not parse height".to_string()))?
        as u32;

    let codec = stream["codec_name"]
        .as_str()
        .unwrap_or("unknown")
        .to_string();

    let container = format["format_name"]
        .as_str()
        .unwrap_or("unknown")
        .to_string();

    let bitrate = format["bit_rate"]
        .as_str()
        .and_then(|b| b.parse::<u64>().ok());

    let fps = stream["r_frame_rate"].as_str().and_then(|r| {
        let parts: Vec<&str> = r.split('/').collect();
        if parts.len() == 2 {
            let num: f32 = parts[0].parse().ok()?;
            let den: f32 = parts[1].parse().ok()?;
            if den != 0.0 {
                Some(num / den)
            } else {
                None
            }
        } else {
            None
        }
    });

    Ok(SourceProbe {
        duration,
        width,
        height,
        codec,
        fps,
        bitrate,
        container,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_probe_output() {
        let json = br#"{
            "streams": [{
                "codec_name": "h264",
                "width": 1920,
                "height": 1080,
                "r_frame_rate": "30000/1001"
            }],
            "format": {
                "format_name": "mov,mp4,m4a,3gp,3g2,mj2",
                "duration": "30.033000",
                "bit_rate": "5240000"
            }
        }"#;

        let probe = parse_output(json).unwrap();
        assert_eq!(probe.width, 1920);
        assert_eq!(probe.height, 1080);
        assert!((probe.duration - 30.033).abs() < 1e-6);
        assert_eq!(probe.codec, "h264");
        assert_eq!(probe.bitrate, Some(5240000));
        let fps = probe.fps.unwrap();
        assert!((fps - 29.97).abs() < 0.01);
    }

    #[test]
    fn test_parse_rejects_audio_only_source() {
        let json = br#"{"streams": [], "format": {"duration": "12.0"}}"#;
        assert!(matches!(
            parse_output(json),
            Err(TranscodeError::NoVideoStream)
        ));
    }

    #[test]
    fn test_parse_rejects_missing_duration() {
        let json = br#"{
            "streams": [{"codec_name": "h264", "width": 640, "height": 480}],
            "format": {}
        }"#;
        assert!(matches!(parse_output(json), Err(TranscodeError::Probe(_))));
    }

    #[test]
    fn test_zero_denominator_frame_rate_is_none() {
        let json = br#"{
            "streams": [{
                "codec_name": "h264",
                "width": 640,
                "height": 480,
                "r_frame_rate": "30/0"
            }],
            "format": {"duration": "1.0"}
        }"#;
        let probe = parse_output(json).unwrap();
        assert!(probe.fps.is_none());
    }

    #[test]
    fn test_validate_binary_path() {
        assert!(validate_binary_path("/usr/bin/ffprobe").is_ok());
        assert!(validate_binary_path("ffprobe").is_ok());
        assert!(validate_binary_path("ffprobe; rm -rf /").is_err());
        assert!(validate_binary_path("../bin/ffprobe").is_err());
    }
}

//! FfmpegTranscoder - HLS encoding and thumbnail generation.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

use crate::error::TranscodeError;
use crate::ladder::Rendition;
use crate::probe::{self, SourceProbe};

/// Closed-GOP keyframe interval: two seconds at the nominal 24 fps.
const GOP_SIZE: u32 = 48;

pub struct FfmpegTranscoder {
    ffmpeg_path: String,
    ffprobe_path: String,
    segment_duration: u64,
    rendition_timeout: Duration,
}

impl FfmpegTranscoder {
    pub fn new(
        ffmpeg_path: String,
        ffprobe_path: String,
        segment_duration: u64,
        rendition_timeout: Duration,
    ) -> Result<Self, TranscodeError> {
        probe::validate_binary_path(&ffmpeg_path)?;
        probe::validate_binary_path(&ffprobe_path)?;

        Ok(Self {
            ffmpeg_path,
            ffprobe_path,
            segment_duration,
            rendition_timeout,
        })
    }

    /// Extract metadata from the source file.
    pub async fn probe(&self, source: &Path) -> Result<SourceProbe, TranscodeError> {
        probe::run(&self.ffprobe_path, source).await
    }

    /// Encode one rendition into `<out_dir>/<name>.m3u8` plus
    /// `<out_dir>/<name>_NNN.ts` segments.
    #[tracing::instrument(skip(self, input, out_dir), fields(rendition = %rendition.name))]
    pub async fn encode_rendition(
        &self,
        input: &Path,
        out_dir: &Path,
        rendition: &Rendition,
    ) -> Result<(), TranscodeError> {
        let playlist_path = out_dir.join(rendition.playlist_name());
        let segment_pattern = out_dir.join(format!("{}_%03d.ts", rendition.name));
        let bitrate = rendition.bitrate_kbps;

        let args = vec![
            "-y".to_string(),
            "-i".to_string(),
            input.to_string_lossy().to_string(),
            "-c:v".to_string(),
            "libx264".to_string(),
            "-preset".to_string(),
            "fast".to_string(),
            "-profile:v".to_string(),
            "main".to_string(),
            // -2 keeps the width even while preserving aspect ratio
            "-vf".to_string(),
            format!("scale=-2:{}", rendition.height),
            "-b:v".to_string(),
            format!("{}k", bitrate),
            "-maxrate".to_string(),
            format!("{}k", (bitrate as f32 * 1.2) as u32),
            "-bufsize".to_string(),
            format!("{}k", bitrate * 2),
            "-g".to_string(),
            GOP_SIZE.to_string(),
            "-keyint_min".to_string(),
            GOP_SIZE.to_string(),
            "-sc_threshold".to_string(),
            "0".to_string(),
            "-c:a".to_string(),
            "aac".to_string(),
            "-b:a".to_string(),
            "128k".to_string(),
            "-ac".to_string(),
            "2".to_string(),
            "-ar".to_string(),
            "48000".to_string(),
            "-f".to_string(),
            "hls".to_string(),
            "-hls_time".to_string(),
            self.segment_duration.to_string(),
            "-hls_playlist_type".to_string(),
            "vod".to_string(),
            "-hls_segment_filename".to_string(),
            segment_pattern.to_string_lossy().to_string(),
            playlist_path.to_string_lossy().to_string(),
        ];

        let output_future = Command::new(&self.ffmpeg_path)
            .args(&args)
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(self.rendition_timeout, output_future)
            .await
            .map_err(|_| TranscodeError::EncoderTimeout {
                rendition: rendition.name.clone(),
                seconds: self.rendition_timeout.as_secs(),
            })?
            .map_err(|e| TranscodeError::Encoder {
                rendition: rendition.name.clone(),
                stderr: format!("Failed to execute ffmpeg: {}", e),
            })?;

        if !output.status.success() {
            return Err(TranscodeError::Encoder {
                rendition: rendition.name.clone(),
                stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            });
        }

        Ok(())
    }

    /// Encode the ladder sequentially against the same source file.
    /// Per-rendition failures are logged and skipped; only an empty success
    /// set is fatal.
    pub async fn encode_ladder(
        &self,
        input: &Path,
        out_dir: &Path,
        ladder: &[Rendition],
    ) -> Result<Vec<Rendition>, TranscodeError> {
        let mut succeeded = Vec::with_capacity(ladder.len());

        for rendition in ladder {
            match self.encode_rendition(input, out_dir, rendition).await {
                Ok(()) => {
                    tracing::info!(rendition = %rendition.name, "Rendition encoded");
                    succeeded.push(rendition.clone());
                }
                Err(e) => {
                    tracing::warn!(
                        rendition = %rendition.name,
                        error = %e,
                        "Rendition failed, continuing with remaining ladder"
                    );
                }
            }
        }

        if succeeded.is_empty() {
            return Err(TranscodeError::AllRenditionsFailed);
        }

        Ok(succeeded)
    }

    /// Render the master playlist for the succeeded renditions, in ladder
    /// order.
    pub fn master_playlist(&self, renditions: &[Rendition]) -> String {
        let mut playlist = String::from("#EXTM3U\n#EXT-X-VERSION:3\n\n");

        for rendition in renditions {
            playlist.push_str(&format!(
                "#EXT-X-STREAM-INF:BANDWIDTH={},RESOLUTION={}x{}\n{}\n\n",
                rendition.bitrate_kbps as u64 * 1000,
                display_width(rendition.height),
                rendition.height,
                rendition.playlist_name(),
            ));
        }

        playlist
    }

    /// Extract a single JPEG frame at the given timestamp.
    pub async fn thumbnail(
        &self,
        input: &Path,
        output: &Path,
        timestamp_seconds: f64,
    ) -> Result<(), TranscodeError> {
        let args = vec![
            "-ss".to_string(),
            format!("{:.3}", timestamp_seconds),
            "-i".to_string(),
            input.to_string_lossy().to_string(),
            "-vframes".to_string(),
            "1".to_string(),
            "-q:v".to_string(),
            "2".to_string(),
            "-y".to_string(),
            output.to_string_lossy().to_string(),
        ];

        let output_result = Command::new(&self.ffmpeg_path)
            .args(&args)
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| TranscodeError::Thumbnail(format!("Failed to execute ffmpeg: {}", e)))?;

        if !output_result.status.success() {
            return Err(TranscodeError::Thumbnail(
                String::from_utf8_lossy(&output_result.stderr).to_string(),
            ));
        }

        Ok(())
    }
}

/// Display width hint for the master playlist. The encode itself preserves
/// the source aspect ratio.
fn display_width(height: u32) -> u32 {
    (height as f64 * 16.0 / 9.0).round() as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ladder::derive_ladder;

    fn test_transcoder() -> FfmpegTranscoder {
        FfmpegTranscoder::new(
            "ffmpeg".to_string(),
            "ffprobe".to_string(),
            4,
            Duration::from_secs(3600),
        )
        .unwrap()
    }

    #[test]
    fn test_new_rejects_shell_metacharacters() {
        let result = FfmpegTranscoder::new(
            "ffmpeg; rm -rf /".to_string(),
            "ffprobe".to_string(),
            4,
            Duration::from_secs(1),
        );
        assert!(matches!(result, Err(TranscodeError::InvalidBinaryPath(_))));
    }

    #[test]
    fn test_display_width() {
        assert_eq!(display_width(1080), 1920);
        assert_eq!(display_width(720), 1280);
        assert_eq!(display_width(480), 853);
        assert_eq!(display_width(360), 640);
        assert_eq!(display_width(240), 427);
    }

    #[test]
    fn test_master_playlist_full_ladder() {
        let transcoder = test_transcoder();
        let playlist = transcoder.master_playlist(&derive_ladder(1080));

        assert!(playlist.starts_with("#EXTM3U\n#EXT-X-VERSION:3\n"));
        assert_eq!(playlist.matches("#EXT-X-STREAM-INF").count(), 4);
        assert!(playlist.contains("BANDWIDTH=5000000,RESOLUTION=1920x1080\n1080p.m3u8"));
        assert!(playlist.contains("BANDWIDTH=2800000,RESOLUTION=1280x720\n720p.m3u8"));
        assert!(playlist.contains("BANDWIDTH=1400000,RESOLUTION=853x480\n480p.m3u8"));
        assert!(playlist.contains("BANDWIDTH=800000,RESOLUTION=640x360\n360p.m3u8"));

        // Ladder order is preserved
        let pos_1080 = playlist.find("1080p.m3u8").unwrap();
        let pos_360 = playlist.find("360p.m3u8").unwrap();
        assert!(pos_1080 < pos_360);
    }

    #[test]
    fn test_master_playlist_single_tiny_rendition() {
        let transcoder = test_transcoder();
        let playlist = transcoder.master_playlist(&derive_ladder(240));

        assert_eq!(playlist.matches("#EXT-X-STREAM-INF").count(), 1);
        assert!(playlist.contains("BANDWIDTH=800000,RESOLUTION=427x240\n240p.m3u8"));
    }

    #[test]
    fn test_master_playlist_skips_failed_renditions() {
        let transcoder = test_transcoder();
        // 1080p failed, only the rest made it
        let survivors: Vec<Rendition> = derive_ladder(1080)
            .into_iter()
            .filter(|r| r.name != "1080p")
            .collect();
        let playlist = transcoder.master_playlist(&survivors);

        assert_eq!(playlist.matches("#EXT-X-STREAM-INF").count(), 3);
        assert!(!playlist.contains("1080p.m3u8"));
    }
}

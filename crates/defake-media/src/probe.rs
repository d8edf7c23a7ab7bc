//! ffprobe stream information.

use crate::error::{MediaError, MediaResult};
use serde::Deserialize;
use std::path::Path;
use std::process::{Command, Stdio};

/// Geometry and length of the first video stream.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoInfo {
    pub width: u32,
    pub height: u32,
    /// Container frame count, or `duration × frame rate` when the container
    /// does not record one. `None` when neither is available.
    pub frame_count: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    streams: Vec<FfprobeStream>,
    format: Option<FfprobeFormat>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    nb_frames: Option<String>,
    duration: Option<String>,
    avg_frame_rate: Option<String>,
    r_frame_rate: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

/// Probe the first video stream of `path`.
pub fn probe_video(path: &Path) -> MediaResult<VideoInfo> {
    if !path.exists() {
        return Err(MediaError::FileNotFound(path.to_path_buf()));
    }
    which::which("ffprobe").map_err(|_| MediaError::FfprobeNotFound)?;

    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-show_entries",
            "stream=codec_type,width,height,nb_frames,duration,avg_frame_rate,r_frame_rate:format=duration",
            "-of",
            "json",
        ])
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()?;

    if !output.status.success() {
        return Err(MediaError::InvalidVideo(format!(
            "ffprobe rejected input: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    let info = parse_probe_output(&output.stdout)?;
    tracing::debug!(
        path = %path.display(),
        width = info.width,
        height = info.height,
        frame_count = ?info.frame_count,
        "probed video"
    );
    Ok(info)
}

pub(crate) fn parse_probe_output(json: &[u8]) -> MediaResult<VideoInfo> {
    let probe: FfprobeOutput = serde_json::from_slice(json)?;

    let stream = probe
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref().map_or(true, |t| t == "video"))
        .ok_or_else(|| MediaError::InvalidVideo("no video stream found".into()))?;

    let (width, height) = match (stream.width, stream.height) {
        (Some(w), Some(h)) if w > 0 && h > 0 => (w, h),
        _ => {
            return Err(MediaError::InvalidVideo(
                "video stream has no frame dimensions".into(),
            ))
        }
    };

    let declared = stream
        .nb_frames
        .as_deref()
        .and_then(|n| n.parse::<u64>().ok())
        .filter(|&n| n > 0);

    let estimated = || {
        let duration = stream
            .duration
            .as_deref()
            .or(probe.format.as_ref().and_then(|f| f.duration.as_deref()))
            .and_then(|d| d.parse::<f64>().ok())?;
        let fps = stream
            .avg_frame_rate
            .as_deref()
            .and_then(parse_frame_rate)
            .or_else(|| stream.r_frame_rate.as_deref().and_then(parse_frame_rate))?;
        let frames = (duration * fps).round();
        (frames.is_finite() && frames > 0.0).then_some(frames as u64)
    };

    Ok(VideoInfo {
        width,
        height,
        frame_count: declared.or_else(estimated),
    })
}

/// Parse `"30000/1001"` or `"29.97"`. Zero rates are treated as unknown.
fn parse_frame_rate(s: &str) -> Option<f64> {
    let rate = match s.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.parse().ok()?;
            let den: f64 = den.parse().ok()?;
            if den <= 0.0 {
                return None;
            }
            num / den
        }
        None => s.parse().ok()?,
    };
    (rate > 0.0).then_some(rate)
}

//! Frame-by-frame video decoding through an ffmpeg subprocess.
//!
//! ffmpeg decodes the first video stream to packed rgb24 on stdout; frames
//! are read one at a time so sampling can stop without decoding the rest.

use crate::error::{MediaError, MediaResult};
use crate::probe::{probe_video, VideoInfo};
use defake_core::{FrameSource, FrameSourceError};
use image::RgbImage;
use std::io::{BufReader, ErrorKind, Read, Write};
use std::path::Path;
use std::process::{Child, ChildStdout, Command, Stdio};
use tempfile::NamedTempFile;

/// Reads fixed-size rgb24 frames from a byte stream.
pub struct RawFrameReader<R> {
    reader: R,
    width: u32,
    height: u32,
}

impl<R: Read> RawFrameReader<R> {
    pub fn new(reader: R, width: u32, height: u32) -> Self {
        Self { reader, width, height }
    }

    fn frame_len(&self) -> usize {
        self.width as usize * self.height as usize * 3
    }

    /// Next frame, `Ok(None)` on a clean end of stream.
    pub fn read_frame(&mut self) -> MediaResult<Option<RgbImage>> {
        let mut buf = vec![0u8; self.frame_len()];
        let filled = read_full(&mut self.reader, &mut buf)?;
        if filled == 0 {
            return Ok(None);
        }
        if filled < buf.len() {
            return Err(MediaError::FfmpegFailed(format!(
                "truncated frame: {filled} of {} bytes",
                buf.len()
            )));
        }
        RgbImage::from_raw(self.width, self.height, buf)
            .map(Some)
            .ok_or_else(|| MediaError::FfmpegFailed("frame buffer size mismatch".into()))
    }
}

/// Fill `buf` as far as the stream allows, returning the byte count.
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// A video being decoded by ffmpeg.
pub struct FfmpegVideo {
    info: VideoInfo,
    child: Child,
    frames: RawFrameReader<BufReader<ChildStdout>>,
    /// Keeps spilled upload bytes on disk until decoding is done.
    _spill: Option<NamedTempFile>,
}

impl FfmpegVideo {
    /// Probe and start decoding a video file.
    pub fn open(path: &Path) -> MediaResult<Self> {
        let info = probe_video(path)?;
        Self::spawn(path, info, None)
    }

    /// Decode in-memory container bytes via a temporary file, since most
    /// containers need seeking to locate their index.
    pub fn from_bytes(bytes: &[u8]) -> MediaResult<Self> {
        let mut spill = tempfile::Builder::new().prefix("defake-upload-").tempfile()?;
        spill.write_all(bytes)?;
        spill.flush()?;
        tracing::debug!(path = %spill.path().display(), size = bytes.len(), "spilled video bytes");

        let info = probe_video(spill.path())?;
        let path = spill.path().to_path_buf();
        Self::spawn(&path, info, Some(spill))
    }

    fn spawn(path: &Path, info: VideoInfo, spill: Option<NamedTempFile>) -> MediaResult<Self> {
        which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)?;

        let mut child = Command::new("ffmpeg")
            .args(["-hide_banner", "-loglevel", "error", "-nostdin", "-noautorotate", "-i"])
            .arg(path)
            .args([
                "-map", "0:v:0", "-vsync", "passthrough", "-f", "rawvideo", "-pix_fmt", "rgb24", "-",
            ])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| MediaError::FfmpegFailed(format!("failed to spawn ffmpeg: {e}")))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| MediaError::FfmpegFailed("failed to capture ffmpeg stdout".into()))?;

        tracing::debug!(
            path = %path.display(),
            width = info.width,
            height = info.height,
            "ffmpeg decoder started"
        );

        Ok(Self {
            frames: RawFrameReader::new(BufReader::new(stdout), info.width, info.height),
            info,
            child,
            _spill: spill,
        })
    }

    pub fn info(&self) -> &VideoInfo {
        &self.info
    }
}

impl FrameSource for FfmpegVideo {
    fn total_frames(&self) -> Option<u64> {
        self.info.frame_count
    }

    fn next_frame(&mut self) -> Result<Option<RgbImage>, FrameSourceError> {
        match self.frames.read_frame() {
            Ok(Some(frame)) => Ok(Some(frame)),
            Ok(None) => {
                if let Ok(status) = self.child.wait() {
                    if !status.success() {
                        tracing::warn!(code = ?status.code(), "ffmpeg exited with an error");
                    }
                }
                Ok(None)
            }
            Err(e) => Err(FrameSourceError::Decode(e.to_string())),
        }
    }
}

impl Drop for FfmpegVideo {
    fn drop(&mut self) {
        // Sampling usually stops before the end of the stream.
        if let Ok(None) = self.child.try_wait() {
            let _ = self.child.kill();
        }
        let _ = self.child.wait();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    /// Yields at most `chunk` bytes per read, like a pipe.
    struct Trickle {
        data: Cursor<Vec<u8>>,
        chunk: usize,
    }

    impl Read for Trickle {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            let n = buf.len().min(self.chunk);
            self.data.read(&mut buf[..n])
        }
    }

    #[test]
    fn test_reads_consecutive_frames() {
        // Two 2x1 frames.
        let bytes = vec![1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12];
        let mut reader = RawFrameReader::new(Cursor::new(bytes), 2, 1);

        let first = reader.read_frame().unwrap().unwrap();
        assert_eq!(first.get_pixel(1, 0).0, [4, 5, 6]);
        let second = reader.read_frame().unwrap().unwrap();
        assert_eq!(second.get_pixel(0, 0).0, [7, 8, 9]);
        assert!(reader.read_frame().unwrap().is_none());
    }

    #[test]
    fn test_short_reads_are_reassembled() {
        let data: Vec<u8> = (0..48).collect();
        let trickle = Trickle { data: Cursor::new(data), chunk: 5 };
        let mut reader = RawFrameReader::new(trickle, 4, 2);
        let frame = reader.read_frame().unwrap().unwrap();
        assert_eq!(frame.get_pixel(3, 1).0, [21, 22, 23]);
        assert!(reader.read_frame().unwrap().is_some());
        assert!(reader.read_frame().unwrap().is_none());
    }

    #[test]
    fn test_truncated_frame_is_error() {
        let mut reader = RawFrameReader::new(Cursor::new(vec![0u8; 10]), 2, 2);
        assert!(matches!(reader.read_frame(), Err(MediaError::FfmpegFailed(_))));
    }

    fn ffmpeg_available() -> bool {
        which::which("ffmpeg").is_ok() && which::which("ffprobe").is_ok()
    }

    /// 20 frames of the lavfi test pattern at 64x48, 10 fps.
    fn make_clip(dir: &Path) -> std::path::PathBuf {
        let path = dir.join("testsrc.mp4");
        let status = Command::new("ffmpeg")
            .args(["-hide_banner", "-loglevel", "error", "-nostdin", "-y"])
            .args(["-f", "lavfi", "-i", "testsrc=size=64x48:rate=10", "-frames:v", "20"])
            .args(["-c:v", "mpeg4", "-pix_fmt", "yuv420p"])
            .arg(&path)
            .status()
            .unwrap();
        assert!(status.success(), "ffmpeg failed to encode the test clip");
        path
    }

    fn drain(video: &mut FfmpegVideo) -> Vec<RgbImage> {
        let mut frames = Vec::new();
        while let Some(frame) = video.next_frame().unwrap() {
            frames.push(frame);
        }
        frames
    }

    #[test]
    fn test_decodes_real_clip() {
        if !ffmpeg_available() {
            eprintln!("skipping: ffmpeg/ffprobe not in PATH");
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let path = make_clip(dir.path());

        let mut video = FfmpegVideo::open(&path).unwrap();
        assert_eq!(
            video.info(),
            &VideoInfo { width: 64, height: 48, frame_count: Some(20) }
        );
        assert_eq!(video.total_frames(), Some(20));

        let frames = drain(&mut video);
        assert_eq!(frames.len(), 20);
        assert!(frames.iter().all(|f| f.dimensions() == (64, 48)));
        // Clean EOF stays at EOF.
        assert!(video.next_frame().unwrap().is_none());
    }

    #[test]
    fn test_bytes_decode_like_file() {
        if !ffmpeg_available() {
            eprintln!("skipping: ffmpeg/ffprobe not in PATH");
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let path = make_clip(dir.path());

        let from_file = drain(&mut FfmpegVideo::open(&path).unwrap());
        let mut spilled = FfmpegVideo::from_bytes(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(spilled.total_frames(), Some(20));
        let from_bytes = drain(&mut spilled);

        assert_eq!(from_bytes.len(), from_file.len());
        assert_eq!(from_bytes[0], from_file[0]);
        assert_eq!(from_bytes[19], from_file[19]);
    }

    #[test]
    fn test_drop_mid_stream() {
        if !ffmpeg_available() {
            eprintln!("skipping: ffmpeg/ffprobe not in PATH");
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let path = make_clip(dir.path());

        let mut video = FfmpegVideo::open(&path).unwrap();
        assert!(video.next_frame().unwrap().is_some());
        drop(video);
    }

    #[test]
    fn test_garbage_bytes_rejected() {
        if !ffmpeg_available() {
            eprintln!("skipping: ffmpeg/ffprobe not in PATH");
            return;
        }
        let err = FfmpegVideo::from_bytes(b"not a video container").err().unwrap();
        assert!(err.is_invalid_input(), "{err}");
    }

    #[test]
    fn test_open_missing_file() {
        let err = FfmpegVideo::open(Path::new("/nonexistent/clip.mp4")).err().unwrap();
        assert!(err.is_invalid_input());
    }
}

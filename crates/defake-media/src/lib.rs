//! defake-media — Decoding of caller-supplied videos and still images.
//!
//! Videos are probed with ffprobe and decoded frame by frame by an ffmpeg
//! subprocess; stills are decoded in-process with the `image` crate.

pub mod error;
pub mod probe;
pub mod source;
pub mod still;
pub mod video;

pub use error::{MediaError, MediaResult};
pub use probe::{probe_video, VideoInfo};
pub use source::MediaSource;
pub use video::FfmpegVideo;

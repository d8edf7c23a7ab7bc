use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use defake_core::{Pipeline, Report, DEFAULT_VIDEO_FRAME_COUNT};
use defake_media::MediaSource;
use std::io::Read;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "defake", about = "Deepfake likelihood scoring for videos and images")]
struct Cli {
    /// Directory containing the ONNX models
    #[arg(long, env = "DEFAKE_MODEL_DIR", global = true)]
    model_dir: Option<PathBuf>,

    /// Skip face detection and always use the centered crop
    #[arg(long, global = true)]
    no_detect: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a video file ("-" reads the container from stdin)
    Video {
        path: PathBuf,
        /// Number of faces to sample across the video
        #[arg(short, long, default_value_t = DEFAULT_VIDEO_FRAME_COUNT)]
        frame_count: usize,
    },
    /// Analyze a single image ("-" reads it from stdin)
    Frame { path: PathBuf },
    /// Show today's detection tip and news insights
    Learn,
    /// Show daemon status
    Status,
}

#[zbus::proxy(
    interface = "org.defake.Scanner1",
    default_service = "org.defake.Scanner1",
    default_path = "/org/defake/Scanner1"
)]
trait Scanner {
    fn status(&self) -> zbus::Result<String>;
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Video { path, frame_count } => {
            let pipeline = load_pipeline(cli.model_dir, cli.no_detect)?;
            let source = if is_stdin(&path) {
                MediaSource::video_from_bytes(&read_stdin()?)?
            } else {
                MediaSource::open_video(&path)?
            };
            let analysis = source.analyze(&pipeline, frame_count.max(1))?;
            let filename = path
                .file_name()
                .filter(|_| !is_stdin(&path))
                .map(|name| name.to_string_lossy().into_owned());
            println!("{}", Report::new(analysis, filename).to_json());
        }
        Commands::Frame { path } => {
            let pipeline = load_pipeline(cli.model_dir, cli.no_detect)?;
            let source = if is_stdin(&path) {
                MediaSource::still_from_bytes(&read_stdin()?)?
            } else {
                MediaSource::open_still(&path)?
            };
            let analysis = source.analyze(&pipeline, 1)?;
            println!("{}", Report::new(analysis, None).to_json());
        }
        Commands::Learn => {
            let digest = defake_core::learn::todays_digest();
            println!("{}", serde_json::to_string_pretty(&digest)?);
        }
        Commands::Status => match daemon_status().await {
            Ok(status) => println!("{status}"),
            Err(e) => {
                tracing::debug!(error = %e, "status call failed");
                println!("defaked: not connected");
            }
        },
    }

    Ok(())
}

fn load_pipeline(model_dir: Option<PathBuf>, no_detect: bool) -> Result<Pipeline> {
    let dir = model_dir.unwrap_or_else(defake_core::default_model_dir);
    let detector = (!no_detect).then(|| model_path(&dir, defake_core::DETECTOR_MODEL_FILE));
    let classifier = model_path(&dir, defake_core::CLASSIFIER_MODEL_FILE);
    Pipeline::load(detector.as_deref(), &classifier)
        .with_context(|| format!("loading models from {}", dir.display()))
}

fn model_path(dir: &Path, file: &str) -> String {
    dir.join(file).to_string_lossy().into_owned()
}

fn is_stdin(path: &Path) -> bool {
    path.as_os_str() == "-"
}

fn read_stdin() -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    std::io::stdin()
        .read_to_end(&mut bytes)
        .context("reading media from stdin")?;
    Ok(bytes)
}

async fn daemon_status() -> zbus::Result<String> {
    let conn = match zbus::Connection::session().await {
        Ok(conn) => conn,
        Err(_) => zbus::Connection::system().await?,
    };
    ScannerProxy::new(&conn).await?.status().await
}

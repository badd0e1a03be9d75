use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{info, Level};

use greenscreen::{
    config::Config,
    remote::{GcsObjectStore, GcsObjectStoreConfig, HttpSegmenter, HttpSegmenterConfig},
    video::{check_ffmpeg_available, extract_first_frame, MatteCompositor},
    AnnotationPoint, PipelineEngine, Session,
};

#[derive(Parser)]
#[command(
    name = "greenscreen",
    version,
    about = "Green-screen video compositing from segmentation masks",
    long_about = "greenscreen composites a video against a segmentation-mask video, replacing \
                  background pixels with a solid key color. It can also run the full pipeline: \
                  submit point annotations to a segmentation service, fetch the generated mask, \
                  composite, and upload the result."
)]
struct Cli {
    /// Configuration file (optional)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Composite a local original video against a local mask video
    Composite {
        /// Original video file
        #[arg(short = 'i', long)]
        original: PathBuf,

        /// Mask video file
        #[arg(short, long)]
        mask: PathBuf,

        /// Output video file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Extract the first frame of a video as a PNG
    Preview {
        /// Video file
        #[arg(short, long)]
        input: PathBuf,

        /// Output image file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Run the full pipeline for a video URL with point annotations
    Run {
        /// Source video URL
        #[arg(short, long)]
        url: String,

        /// Annotation points in original pixel coordinates, "x,y" repeated
        #[arg(short, long, value_parser = parse_point)]
        point: Vec<AnnotationPoint>,

        /// Directory for the composite output
        #[arg(short, long, default_value = "output")]
        output_dir: PathBuf,
    },
}

/// Parse a "x,y" pair into an annotation point
fn parse_point(value: &str) -> std::result::Result<AnnotationPoint, String> {
    let (x, y) = value
        .split_once(',')
        .ok_or_else(|| format!("expected x,y - got '{}'", value))?;
    let x = x.trim().parse().map_err(|_| format!("bad x coordinate in '{}'", value))?;
    let y = y.trim().parse().map_err(|_| format!("bad y coordinate in '{}'", value))?;
    Ok(AnnotationPoint::new(x, y))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt().with_max_level(log_level).init();

    info!("Starting greenscreen v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = match cli.config {
        Some(config_path) => {
            info!("Loading configuration from {:?}", config_path);
            Config::from_file(&config_path)?
        }
        None => {
            info!("Using default configuration");
            Config::default()
        }
    };
    config.validate()?;

    if !check_ffmpeg_available() {
        anyhow::bail!("ffmpeg not found on PATH; install FFmpeg to decode and encode video");
    }

    match cli.command {
        Command::Composite {
            original,
            mask,
            output,
        } => {
            let compositor = MatteCompositor::new(config.matte.clone(), config.encoder.clone());
            let result = tokio::task::spawn_blocking(move || {
                compositor.composite(&original, &mask, &output)
            })
            .await??;

            info!(
                "Composite complete: {:?} ({} frames, {}x{} @ {:.2} fps)",
                result.path, result.frame_count, result.width, result.height, result.fps
            );
        }

        Command::Preview { input, output } => {
            let frame =
                tokio::task::spawn_blocking(move || extract_first_frame(&input)).await??;
            frame.save_png(&output)?;
            info!(
                "First frame saved to {:?} ({}x{})",
                output,
                frame.width(),
                frame.height()
            );
        }

        Command::Run {
            url,
            point,
            output_dir,
        } => {
            let segmenter = build_segmenter(&config)?;
            let store = build_store(&config)?;

            let mut session = Session::new(url);
            for p in point {
                session.add_point(p);
            }

            let engine = PipelineEngine::new(config, segmenter, store, output_dir);
            let output = engine.process(&session).await?;

            info!("Pipeline complete:");
            info!("   Local file: {:?}", output.local_path);
            info!("   Frames: {}", output.frame_count);
            match output.remote_url {
                Some(url) => info!("   Uploaded: {}", url),
                None => info!("   Not uploaded (no object store configured or upload failed)"),
            }
        }
    }

    Ok(())
}

fn build_segmenter(config: &Config) -> Result<HttpSegmenter> {
    let token = std::env::var(&config.segmentation.token_env).map_err(|_| {
        anyhow::anyhow!(
            "segmentation API token not set; export {}",
            config.segmentation.token_env
        )
    })?;

    Ok(HttpSegmenter::new(
        reqwest::Client::new(),
        HttpSegmenterConfig {
            api_base_url: config.segmentation.api_base_url.clone(),
            model_version: config.segmentation.model_version.clone(),
            api_token: token,
            poll_interval: std::time::Duration::from_secs(config.segmentation.poll_interval_secs),
            max_polls: config.segmentation.max_polls,
        },
    ))
}

fn build_store(config: &Config) -> Result<Option<GcsObjectStore>> {
    if !config.storage.upload_enabled() {
        return Ok(None);
    }

    let token = std::env::var(&config.storage.token_env).map_err(|_| {
        anyhow::anyhow!(
            "object store token not set; export {} or clear storage.bucket",
            config.storage.token_env
        )
    })?;

    Ok(Some(GcsObjectStore::new(
        reqwest::Client::new(),
        GcsObjectStoreConfig {
            bucket: config.storage.bucket.clone(),
            access_token: token,
        },
    )))
}

use anyhow::{Context, Result};
use clap::Parser;
use motioncam::annotate::Annotator;
use motioncam::capture::{CaptureSource, WebcamCapture};
use motioncam::config::Config;
use motioncam::display::{DisplaySink, LoopbackDisplay};
use motioncam::pipeline::{run_pipeline, scaled_height, MotionSession, PipelineOptions};
use motioncam::upload::{DirectoryStore, DropboxStore, ObjectStore, Uploader};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the JSON configuration file
    #[arg(short, long)]
    conf: PathBuf,

    /// Input webcam device index
    #[arg(short, long, default_value_t = 0)]
    device: u32,

    /// Store confirmed frames in this directory when Dropbox is disabled
    #[arg(long)]
    save_dir: Option<PathBuf>,

    /// Send the live feed to this v4l2loopback device instead of a window
    #[arg(long)]
    loopback: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    tracing::info!("motioncam starting");

    // Config problems must surface before the camera is touched
    let config = Config::from_file(&args.conf)
        .with_context(|| format!("Failed to load configuration from {}", args.conf.display()))?;

    let (width, height) = config.dimensions();
    tracing::info!("Capture: {}x{} @ {} fps", width, height, config.fps);
    tracing::info!(
        "Detection: delta_thresh={}, min_area={}, min_motion_frames={}, min_upload_seconds={}",
        config.delta_thresh,
        config.min_area,
        config.min_motion_frames,
        config.min_upload_seconds
    );

    let mut uploader = build_uploader(&config, args.save_dir.as_ref())?;

    let mut capture = WebcamCapture::new(args.device, width, height, config.fps)
        .context("Failed to initialize webcam capture")?;

    tracing::info!("Warming up for {:.1}s", config.camera_warmup_time);
    std::thread::sleep(Duration::from_secs_f64(config.camera_warmup_time));

    let (capture_width, capture_height) = capture.resolution();
    let display_size = (
        config.resize_width,
        scaled_height(capture_width, capture_height, config.resize_width),
    );
    let mut display = build_display(&config, args.loopback.as_ref(), display_size)?;

    let mut session = MotionSession::from_config(&config);
    let annotator = Annotator::default();
    let options = PipelineOptions::from_config(&config);

    let summary = run_pipeline(
        &mut capture,
        &mut session,
        &annotator,
        uploader.as_mut(),
        display.as_deref_mut(),
        &options,
    )
    .context("Pipeline stopped")?;

    tracing::info!(
        "Processed {} frames, {} motion events, {} uploads ({} failed)",
        summary.frames,
        summary.motion_events,
        summary.uploads,
        summary.failed_uploads
    );

    Ok(())
}

fn build_uploader(config: &Config, save_dir: Option<&PathBuf>) -> Result<Option<Uploader>> {
    let store: Box<dyn ObjectStore> = if config.use_dropbox {
        let token = config
            .access_token()
            .context("Dropbox enabled without an access token")?;
        tracing::info!("Dropbox uploads enabled under {}", config.dropbox_base_path);
        Box::new(DropboxStore::new(
            token,
            Duration::from_secs(config.upload_timeout_seconds),
        ))
    } else if let Some(dir) = save_dir {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create save directory {}", dir.display()))?;
        tracing::info!("Saving confirmed frames under {}", dir.display());
        Box::new(DirectoryStore::new(dir.clone()))
    } else {
        return Ok(None);
    };

    Ok(Some(Uploader::new(
        store,
        config.dropbox_base_path.clone(),
        config.temp_dir.clone(),
    )))
}

fn build_display(
    config: &Config,
    loopback: Option<&PathBuf>,
    (width, height): (u32, u32),
) -> Result<Option<Box<dyn DisplaySink>>> {
    if !config.show_video {
        return Ok(None);
    }

    if let Some(device) = loopback {
        let display = LoopbackDisplay::new(device, width, height)
            .context("Failed to initialize v4l2loopback output")?;
        return Ok(Some(Box::new(display)));
    }

    open_window(width, height)
}

#[cfg(feature = "window")]
fn open_window(width: u32, height: u32) -> Result<Option<Box<dyn DisplaySink>>> {
    let window = motioncam::display::WindowDisplay::new("Security Feed", width, height)
        .context("Failed to open preview window")?;
    tracing::info!("Press q in the preview window to stop");
    Ok(Some(Box::new(window)))
}

#[cfg(not(feature = "window"))]
fn open_window(_width: u32, _height: u32) -> Result<Option<Box<dyn DisplaySink>>> {
    tracing::warn!(
        "show_video is set but this build has no window support; \
         use --loopback or build with --features window"
    );
    Ok(None)
}

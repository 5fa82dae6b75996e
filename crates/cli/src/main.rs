use std::path::{Path, PathBuf};
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::Parser;

use eyetrack_core::capture::domain::frame_sink::FrameSink;
use eyetrack_core::capture::domain::frame_source::FrameSource;
use eyetrack_core::capture::infrastructure::camera_source::CameraSource;
use eyetrack_core::capture::infrastructure::coordinate_log_sink::CoordinateLogSink;
use eyetrack_core::capture::infrastructure::display_window_sink::DisplayWindowSink;
use eyetrack_core::capture::infrastructure::ffmpeg_file_source::FfmpegFileSource;
use eyetrack_core::capture::infrastructure::image_file_source::ImageFileSource;
use eyetrack_core::capture::infrastructure::image_file_writer::ImageFileWriter;
use eyetrack_core::capture::infrastructure::image_sequence_sink::ImageSequenceSink;
use eyetrack_core::config::settings::TrackerSettings;
use eyetrack_core::detection::domain::face_locator::NosePolicy;
use eyetrack_core::detection::domain::feature_detector::FeatureDetector;
use eyetrack_core::detection::infrastructure::cascade_detector::{CascadeDetector, CascadeParams};
use eyetrack_core::detection::infrastructure::model_resolver::{self, ModelRequest};
use eyetrack_core::preprocessing::infrastructure::luma_preprocessor::LumaPreprocessor;
use eyetrack_core::shared::constants::{
    EYE_CASCADE_NAME, EYE_CASCADE_URL, IMAGE_EXTENSIONS, NOSE_CASCADE_NAME, NOSE_CASCADE_URL,
};
use eyetrack_core::tracking::domain::face_finder::FaceFinder;
use eyetrack_core::tracking::domain::frame_annotator::MarkerStyle;
use eyetrack_core::tracking::infrastructure::threaded_pipeline_executor::ThreadedPipelineExecutor;
use eyetrack_core::tracking::locate_once_use_case::LocateOnceUseCase;
use eyetrack_core::tracking::pipeline_logger::StdoutPipelineLogger;
use eyetrack_core::tracking::track_faces_use_case::TrackFacesUseCase;

/// Eye and nose tracking from a webcam, video or still image.
#[derive(Parser)]
#[command(name = "eyetrack")]
struct Cli {
    /// Video or image file. Without it the camera is used.
    input: Option<PathBuf>,

    /// Camera device index.
    #[arg(long)]
    camera: Option<i32>,

    /// Settings file (defaults to the user config directory).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Locate once on the first frame and exit.
    #[arg(long)]
    single: bool,

    /// Show the annotated and optimized frames; space stops.
    #[arg(long)]
    display: bool,

    /// Save every annotated frame to this directory.
    #[arg(long)]
    save_frames: Option<PathBuf>,

    /// Also save the optimized grayscale frames (requires --save-frames).
    #[arg(long)]
    save_gray: bool,

    /// Write per-frame coordinates as JSON lines.
    #[arg(long)]
    coords_out: Option<PathBuf>,

    /// Save the annotated frame in single mode.
    #[arg(long)]
    snapshot: Option<PathBuf>,

    /// Eye cascade XML.
    #[arg(long)]
    eye_model: Option<PathBuf>,

    /// Nose cascade XML.
    #[arg(long)]
    nose_model: Option<PathBuf>,

    /// Directory searched for cascades before downloading.
    #[arg(long)]
    models_dir: Option<PathBuf>,

    /// Cascade pyramid scale step (greater than 1.0).
    #[arg(long)]
    scale_factor: Option<f64>,

    /// Neighbor hits a cascade candidate needs to be kept.
    #[arg(long)]
    min_neighbors: Option<i32>,

    /// Minimum horizontal distance between eye centers, in pixels.
    #[arg(long)]
    min_eye_separation: Option<f64>,

    /// Only accept frames where exactly one nose was found.
    #[arg(long)]
    require_nose: bool,

    /// Frames the ID rate is computed over.
    #[arg(long)]
    accuracy_window: Option<usize>,

    /// Search for better lighting parameters when accuracy drops.
    #[arg(long)]
    auto_tune: bool,

    /// Equalize the grayscale histogram before detection.
    #[arg(long)]
    equalize: bool,

    /// Contrast multiplier.
    #[arg(long)]
    alpha: Option<f64>,

    /// Brightness offset.
    #[arg(long, allow_hyphen_values = true)]
    beta: Option<f64>,

    /// Gamma correction (above 1.0 brightens shadows).
    #[arg(long)]
    gamma: Option<f64>,

    /// Mirror camera frames horizontally.
    #[arg(long)]
    mirror: bool,

    /// Coordinate smoothing weight in (0, 1].
    #[arg(long)]
    smoothing: Option<f64>,

    /// Pause between captured frames, in milliseconds.
    #[arg(long)]
    frame_delay_ms: Option<u64>,

    /// Stop after this many frames.
    #[arg(long)]
    max_frames: Option<usize>,

    /// Marker style: dot or cross.
    #[arg(long)]
    marker: Option<MarkerStyle>,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    validate(&cli)?;

    let settings = load_settings(&cli)?;
    let single = cli.single || cli.input.as_deref().is_some_and(is_image);
    let annotate = cli.display || cli.save_frames.is_some() || cli.snapshot.is_some();

    let finder = settings.build_finder(
        Box::new(LumaPreprocessor::new()),
        build_detector("eye", &settings, &settings.eye_model, EYE_CASCADE_NAME, EYE_CASCADE_URL)?,
        build_detector("nose", &settings, &settings.nose_model, NOSE_CASCADE_NAME, NOSE_CASCADE_URL)?,
        annotate,
    )?;
    let source = open_source(cli.input.as_deref(), &settings);

    if single {
        run_single(source, finder, cli.snapshot)
    } else {
        run_live(&cli, &settings, source, finder)
    }
}

fn run_single(
    source: Box<dyn FrameSource>,
    finder: FaceFinder,
    snapshot: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut use_case = LocateOnceUseCase::new(source, finder);
    if let Some(path) = snapshot {
        use_case = use_case.with_snapshot(path, Box::new(ImageFileWriter::new()));
    }

    let observation = use_case.execute()?;
    match observation.coords {
        Some(coords) => println!("{coords}"),
        None => println!("No face located"),
    }
    Ok(())
}

fn run_live(
    cli: &Cli,
    settings: &TrackerSettings,
    source: Box<dyn FrameSource>,
    finder: FaceFinder,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut sinks: Vec<Box<dyn FrameSink>> = Vec::new();
    if cli.display {
        sinks.push(Box::new(DisplayWindowSink::new(true)));
    }
    if let Some(dir) = &cli.save_frames {
        sinks.push(Box::new(ImageSequenceSink::new(
            dir,
            cli.save_gray,
            Box::new(ImageFileWriter::new()),
        )));
    }
    if let Some(path) = &cli.coords_out {
        sinks.push(Box::new(CoordinateLogSink::new(path)));
    }

    let cancelled = Arc::new(AtomicBool::new(false));
    let flag = cancelled.clone();
    ctrlc::set_handler(move || flag.store(true, Ordering::Relaxed))?;

    let mut use_case = TrackFacesUseCase::new(
        source,
        finder,
        sinks,
        Box::new(ThreadedPipelineExecutor::new()),
    )
    .with_max_frames(cli.max_frames)
    .with_frame_delay(settings.frame_delay())
    .with_cancel_flag(cancelled)
    .with_logger(Box::new(StdoutPipelineLogger::default()));

    let summary = use_case.execute()?;
    println!("{summary}");
    Ok(())
}

fn load_settings(cli: &Cli) -> Result<TrackerSettings, Box<dyn std::error::Error>> {
    let mut s = match &cli.config {
        Some(path) => TrackerSettings::from_file(path)?,
        None => TrackerSettings::load_or_default(),
    };

    if let Some(index) = cli.camera {
        s.camera_index = index;
    }
    if cli.eye_model.is_some() {
        s.eye_model = cli.eye_model.clone();
    }
    if cli.nose_model.is_some() {
        s.nose_model = cli.nose_model.clone();
    }
    if cli.models_dir.is_some() {
        s.models_dir = cli.models_dir.clone();
    }
    if let Some(v) = cli.scale_factor {
        s.scale_factor = v;
    }
    if let Some(v) = cli.min_neighbors {
        s.min_neighbors = v;
    }
    if let Some(v) = cli.min_eye_separation {
        s.min_eye_separation = v;
    }
    if cli.require_nose {
        s.nose_policy = NosePolicy::Required;
    }
    if let Some(v) = cli.accuracy_window {
        s.accuracy_window = v;
    }
    s.auto_tune |= cli.auto_tune;
    s.enhancement.equalize |= cli.equalize;
    if let Some(v) = cli.alpha {
        s.enhancement.alpha = v;
    }
    if let Some(v) = cli.beta {
        s.enhancement.beta = v;
    }
    if let Some(v) = cli.gamma {
        s.enhancement.gamma = v;
    }
    s.mirror |= cli.mirror;
    if cli.smoothing.is_some() {
        s.smoothing = cli.smoothing;
    }
    if let Some(v) = cli.frame_delay_ms {
        s.frame_delay_ms = v;
    }
    if let Some(v) = cli.marker {
        s.marker = v;
    }

    s.validate()?;
    Ok(s)
}

fn build_detector(
    label: &str,
    settings: &TrackerSettings,
    explicit: &Option<PathBuf>,
    name: &str,
    url: &str,
) -> Result<Box<dyn FeatureDetector>, Box<dyn std::error::Error>> {
    log::info!("Resolving {label} cascade: {name}");
    let request = ModelRequest {
        name,
        url,
        explicit: explicit.as_deref(),
        bundled_dir: settings.models_dir.as_deref(),
    };
    let progress = ProgressLine::default();
    let resolved = model_resolver::resolve(&request, Some(progress.callback()));
    progress.finish();
    let path = resolved?;

    let params = CascadeParams {
        scale_factor: settings.scale_factor,
        min_neighbors: settings.min_neighbors,
        min_size: settings.min_feature_size,
    };
    Ok(Box::new(CascadeDetector::new(&path, params)?))
}

fn open_source(input: Option<&Path>, settings: &TrackerSettings) -> Box<dyn FrameSource> {
    match input {
        Some(path) if is_image(path) => Box::new(ImageFileSource::new(path)),
        Some(path) => Box::new(FfmpegFileSource::new(path)),
        None => Box::new(CameraSource::new(settings.camera_index).with_mirror(settings.mirror)),
    }
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(input) = &cli.input {
        if !input.exists() {
            return Err(format!("Input file not found: {}", input.display()).into());
        }
        if cli.camera.is_some() {
            return Err("--camera cannot be combined with an input file".into());
        }
    }
    if cli.save_gray && cli.save_frames.is_none() {
        return Err("--save-gray requires --save-frames".into());
    }
    let single = cli.single || cli.input.as_deref().is_some_and(is_image);
    if cli.snapshot.is_some() && !single {
        return Err("--snapshot is only used with --single or an image input".into());
    }
    if single && (cli.display || cli.save_frames.is_some() || cli.coords_out.is_some()) {
        return Err(
            "--display, --save-frames and --coords-out are not available in single mode".into(),
        );
    }
    if cli.max_frames == Some(0) {
        return Err("Max frames must be at least 1".into());
    }
    Ok(())
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// A `\r`-rewritten download line on stderr, ended once the download is done.
#[derive(Clone, Default)]
struct ProgressLine {
    open: Arc<AtomicBool>,
}

impl ProgressLine {
    fn callback(&self) -> model_resolver::ProgressFn {
        let open = self.open.clone();
        Box::new(move |downloaded, total| {
            open.store(true, Ordering::Relaxed);
            eprint!("\r{}", download_message(downloaded, total));
        })
    }

    /// Terminates the progress line if one was started. Returns whether it did.
    fn finish(&self) -> bool {
        let was_open = self.open.swap(false, Ordering::Relaxed);
        if was_open {
            eprintln!();
        }
        was_open
    }
}

fn download_message(downloaded: u64, total: u64) -> String {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        format!("Downloading cascade... {pct}%")
    } else {
        format!("Downloading cascade... {downloaded} bytes")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_line_finishes_only_after_output() {
        let line = ProgressLine::default();
        assert!(!line.finish());

        let callback = line.callback();
        callback(512, 1024);
        assert!(line.finish());
        assert!(!line.finish());
    }

    #[test]
    fn test_download_message() {
        assert_eq!(download_message(512, 1024), "Downloading cascade... 50%");
        assert_eq!(download_message(300, 0), "Downloading cascade... 300 bytes");
    }
}

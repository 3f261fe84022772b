//! Command-line front end: argument definitions and the commands that drive
//! a [`LabelingSession`] without a window.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use thiserror::Error;

use crate::canvas::{RenderError, load_font};
use crate::capture::{CaptureError, CaptureWorker, FolderReplaySource};
use crate::config::{AppConfig, ConfigError, LogLevel, UserPreferences};
use crate::dataset::Split;
use crate::format::LabelStatus;
use crate::geometry::{PixelPoint, Size};
use crate::session::{DiscardReason, LabelingSession, SessionError, SessionEvent};

/// Label images of a YOLO dataset.
#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Cli {
    /// Settings JSON. Defaults to the file in the user config directory when present.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Override the configured log level (`RUST_LOG` still applies on top).
    #[arg(long, value_enum, global = true)]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List the images of a split with the state of their label files.
    Scan(DatasetArgs),

    /// Render an image with its labels into a PNG.
    Preview(PreviewArgs),

    /// Draw one box on an image and append it to the label file.
    Label(LabelArgs),

    /// Show or edit the classes in data.yaml.
    Classes {
        #[command(flatten)]
        dataset: DatasetArgs,

        #[command(subcommand)]
        action: ClassAction,
    },

    /// Save frames from a folder of images as captures.
    Capture(CaptureArgs),
}

/// Dataset selection shared by every command.
#[derive(Debug, Args)]
pub struct DatasetArgs {
    /// Dataset root folder (contains images/, labels/ and data.yaml).
    pub dataset: PathBuf,

    /// Split to work on (train or val). Defaults to the configured split.
    #[arg(long)]
    pub split: Option<Split>,

    /// Create missing split folders and data.yaml.
    #[arg(long)]
    pub create: bool,
}

#[derive(Debug, Args)]
pub struct PreviewArgs {
    #[command(flatten)]
    pub dataset: DatasetArgs,

    /// Image file name inside images/<split>.
    pub image: String,

    /// Canvas size as WxH. Defaults to the configured viewport.
    #[arg(long)]
    pub viewport: Option<Size>,

    /// Output PNG. Defaults to `<image stem>_preview.png`.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Draw the crosshair at X,Y.
    #[arg(long, value_name = "X,Y")]
    pub pointer: Option<PixelPoint>,

    /// TrueType font for captions.
    #[arg(long)]
    pub font: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct LabelArgs {
    #[command(flatten)]
    pub dataset: DatasetArgs,

    /// Image file name inside images/<split>.
    pub image: String,

    /// Class id for the new box.
    #[arg(long = "class")]
    pub class_id: u32,

    /// Drag start in canvas pixels.
    #[arg(long, value_name = "X,Y")]
    pub from: PixelPoint,

    /// Drag end in canvas pixels.
    #[arg(long, value_name = "X,Y")]
    pub to: PixelPoint,

    /// Canvas size as WxH. Defaults to the configured viewport.
    #[arg(long)]
    pub viewport: Option<Size>,
}

#[derive(Debug, Subcommand)]
pub enum ClassAction {
    /// Print `<id> <name>` per class.
    List,
    /// Append a class.
    Add { name: String },
    /// Remove a class by name.
    Remove { name: String },
}

#[derive(Debug, Args)]
pub struct CaptureArgs {
    #[command(flatten)]
    pub dataset: DatasetArgs,

    /// Folder whose images are replayed as camera frames.
    pub frames: PathBuf,

    /// Number of frames to save.
    #[arg(long, default_value_t = 1)]
    pub count: usize,

    /// Milliseconds between replayed frames.
    #[arg(long, default_value_t = 100)]
    pub interval_ms: u64,
}

/// Failures surfaced by the binary.
#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Capture(#[from] CaptureError),

    #[error("failed to write image: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Load settings from `path`, or from the default location when it exists.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    match path {
        Some(path) => AppConfig::load_from_path(path),
        None => Ok(AppConfig::load_from_default_path().unwrap_or_default()),
    }
}

/// Install `env_logger` at `level`. `RUST_LOG` overrides it.
pub fn init_logging(level: log::LevelFilter) {
    let result = env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp_millis()
        .try_init();
    if let Err(e) = result {
        eprintln!("Logger already initialized: {e}");
    }
}

/// Execute one command, writing its report to `out`.
pub fn run(command: Command, config: &AppConfig, out: &mut impl Write) -> Result<(), CliError> {
    let prefs = &config.preferences;
    match command {
        Command::Scan(args) => scan(&args, prefs, out),
        Command::Preview(args) => preview(&args, prefs, out),
        Command::Label(args) => label(&args, prefs, out),
        Command::Classes { dataset, action } => classes(&dataset, action, prefs, out),
        Command::Capture(args) => capture(&args, prefs, out),
    }
}

fn open_session(
    args: &DatasetArgs,
    prefs: &UserPreferences,
    viewport: Option<Size>,
) -> Result<LabelingSession, CliError> {
    let mut session = LabelingSession::new(
        viewport.unwrap_or(prefs.viewport),
        prefs.inference_interval(),
    );
    session.set_split(args.split.unwrap_or(prefs.default_split))?;
    session.open_dataset(&args.dataset, args.create || prefs.create_missing_dirs)?;
    Ok(session)
}

fn scan(args: &DatasetArgs, prefs: &UserPreferences, out: &mut impl Write) -> Result<(), CliError> {
    let session = open_session(args, prefs, None)?;
    let entries = session.entries();
    let count = |status| entries.iter().filter(|e| e.status == status).count();

    writeln!(
        out,
        "{}: {} images ({} labeled, {} invalid, {} unlabeled)",
        session.split(),
        entries.len(),
        count(LabelStatus::Valid),
        count(LabelStatus::Invalid),
        count(LabelStatus::Missing),
    )?;
    for entry in entries {
        writeln!(out, "{}\t{}", entry.status, entry.file_name)?;
    }
    Ok(())
}

fn preview(
    args: &PreviewArgs,
    prefs: &UserPreferences,
    out: &mut impl Write,
) -> Result<(), CliError> {
    let mut session = open_session(&args.dataset, prefs, args.viewport)?;
    session.open_preview(&args.image)?;
    if let Some(pos) = args.pointer {
        session.pointer_move(pos);
    }

    let font_path = args.font.as_deref().or(prefs.font_path.as_deref());
    let font = load_font(font_path);
    if font.is_none() {
        log::warn!("No font found, captions are not drawn");
    }

    let pixels = session.canvas().rasterize(font.as_ref())?;
    let output = args.output.clone().unwrap_or_else(|| {
        let stem = Path::new(&args.image)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("image");
        PathBuf::from(format!("{stem}_preview.png"))
    });
    pixels.save(&output)?;

    writeln!(
        out,
        "{} boxes -> {}",
        session.canvas().boxes().len(),
        output.display()
    )?;
    Ok(())
}

fn label(args: &LabelArgs, prefs: &UserPreferences, out: &mut impl Write) -> Result<(), CliError> {
    let mut session = open_session(&args.dataset, prefs, args.viewport)?;
    session.open_preview(&args.image)?;
    session.select_class(Some(args.class_id))?;

    session.pointer_down(args.from);
    session.pointer_move(args.to);
    match session.pointer_up(args.to)? {
        Some(SessionEvent::LabelSaved { label_path, record }) => {
            writeln!(out, "{record} -> {}", label_path.display())?;
        }
        Some(SessionEvent::BoxDiscarded(reason)) => {
            let why = match reason {
                DiscardReason::LiveMode => "no image previewed",
                DiscardReason::NoClassSelected => "no class selected",
            };
            writeln!(out, "box discarded: {why}")?;
        }
        None => writeln!(out, "no box: the drag has no area inside the image")?,
    }
    Ok(())
}

fn classes(
    args: &DatasetArgs,
    action: ClassAction,
    prefs: &UserPreferences,
    out: &mut impl Write,
) -> Result<(), CliError> {
    let mut session = open_session(args, prefs, None)?;
    match action {
        ClassAction::List => {
            for (id, name) in session.classes().iter().enumerate() {
                writeln!(out, "{id} {name}")?;
            }
        }
        ClassAction::Add { name } => {
            let id = session.add_class(&name)?;
            writeln!(out, "{id} {}", name.trim())?;
        }
        ClassAction::Remove { name } => {
            session.remove_class(&name)?;
            writeln!(out, "removed {name}")?;
        }
    }
    Ok(())
}

fn capture(
    args: &CaptureArgs,
    prefs: &UserPreferences,
    out: &mut impl Write,
) -> Result<(), CliError> {
    let mut session = open_session(&args.dataset, prefs, None)?;
    let source = FolderReplaySource::open(&args.frames, false)?;
    let mut worker = CaptureWorker::spawn(
        Box::new(source),
        Duration::from_millis(args.interval_ms),
    )?;

    let mut saved = 0;
    while saved < args.count {
        let Some(frame) = worker.recv_timeout(Duration::from_secs(5)) else {
            log::warn!("Frame source ended after {saved} captures");
            break;
        };
        session.on_frame(frame);
        let path = session.capture()?;
        writeln!(out, "{}", path.display())?;
        saved += 1;
    }
    worker.stop();
    Ok(())
}

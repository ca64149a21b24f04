// heapanim: animate heap allocation churn across heap snapshots

use anyhow::{Context, Result};
use clap::Parser;
use env_logger::{Builder, Env};
use log::error;
use std::path::PathBuf;

use heapanim::config::{self, AnimConfig};
use heapanim::layout::GlobalLayout;
use heapanim::render::raster::{RasterOptions, RasterSink};
use heapanim::render::terminal::TerminalSink;
use heapanim::render::{play, FrameRenderer};
use heapanim::snapshot::load::load_frames;

#[derive(Parser, Debug)]
#[command(
    name = "heapanim",
    version,
    about = "Animate heap allocation churn across a sequence of heap snapshots"
)]
struct Args {
    /// First frame index (inclusive)
    #[arg(long)]
    start: u64,
    /// Last frame index (inclusive)
    #[arg(long)]
    end: u64,
    /// Snapshot path pattern; {k} is replaced by the frame index
    #[arg(long, default_value = config::DEFAULT_PATTERN)]
    pattern: String,
    /// Zone to animate
    #[arg(long, default_value = config::DEFAULT_ZONE)]
    zone: String,
    /// Use the first zone of each snapshot instead of --zone
    #[arg(long)]
    first_zone: bool,
    /// Bytes per display row
    #[arg(long, default_value_t = config::DEFAULT_ROW_BYTES)]
    row_bytes: u64,
    /// Minimum drawn thickness of a block, in pixels
    #[arg(long, default_value_t = config::DEFAULT_MIN_PX)]
    min_px: u32,
    /// Animated GIF output
    #[arg(long, default_value = config::DEFAULT_OUT)]
    out: PathBuf,
    /// Also write one PNG per frame into this directory
    #[arg(long)]
    png_dir: Option<PathBuf>,
    #[arg(long, default_value_t = config::DEFAULT_WIDTH)]
    width: u32,
    #[arg(long, default_value_t = config::DEFAULT_HEIGHT)]
    height: u32,
    /// Print a terminal heap map of the last frame
    #[arg(long)]
    preview: bool,
}

impl Args {
    fn to_config(&self) -> AnimConfig {
        AnimConfig {
            pattern: self.pattern.clone(),
            start: self.start,
            end: self.end,
            zone: (!self.first_zone).then(|| self.zone.clone()),
            row_bytes: self.row_bytes,
            min_px: self.min_px,
            out: Some(self.out.clone()),
            png_dir: self.png_dir.clone(),
            width: self.width,
            height: self.height,
        }
    }
}

fn init_logger() {
    // RUST_LOG overrides, e.g. RUST_LOG=debug heapanim --start 0 --end 9
    Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();
}

fn main() {
    init_logger();

    if let Err(e) = run(Args::parse()) {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    let config = args.to_config();
    config.validate().context("invalid configuration")?;

    let report = load_frames(&config).context("loading snapshots")?;
    if let (Some(first), Some(last)) = (report.first_path(), report.last_path()) {
        println!(
            "[heapanim] frames: {} ({} .. {})",
            report.frames.len(),
            first.display(),
            last.display()
        );
    }
    if !report.skipped.is_empty() {
        println!("[heapanim] skipped {} missing file(s)", report.skipped.len());
    }
    if !report.recovered.is_empty() {
        println!(
            "[heapanim] {} file(s) needed lenient recovery",
            report.recovered.len()
        );
    }

    let layout = GlobalLayout::compute(&report.frames, config.row_bytes);
    for line in layout.summary() {
        println!("[heapanim] {}", line);
    }
    let title = layout.title(config.zone_label());

    let mut sink = RasterSink::create(RasterOptions {
        width: config.width,
        height: config.height,
        gif: config.out.clone(),
        png_dir: config.png_dir.clone(),
        summary_png: Some(config.summary_png()),
    })
    .context("opening outputs")?;

    let renderer = FrameRenderer::new(layout, config.min_px);
    let summary =
        play(&report.frames, &renderer, &title, &mut sink).context("rendering frames")?;
    log::info!(
        "rendered {} frame(s), {} draw instruction(s)",
        summary.frames,
        summary.instructions
    );
    if let Some(out) = &config.out {
        println!("[heapanim] wrote {}", out.display());
    }
    match &config.png_dir {
        Some(dir) => println!(
            "[heapanim] wrote {} frame PNG(s) to {}",
            summary.frames,
            dir.display()
        ),
        None => println!("[heapanim] wrote {}", config.summary_png().display()),
    }

    if args.preview {
        let mut preview = TerminalSink::default();
        // One cell is already coarse; no extra widening
        let renderer = FrameRenderer::new(layout, 1);
        play(&report.frames, &renderer, config.zone_label(), &mut preview)
            .context("rendering preview")?;
        if let Some(text) = preview.last_frame() {
            println!("{}", text);
        }
    }

    Ok(())
}

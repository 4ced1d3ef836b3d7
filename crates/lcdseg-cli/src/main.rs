//! lcdseg CLI — command-line frontend for the seven-segment panel decoder.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use lcdseg::{draw_marks, geometry, glyph, PanelDecoder, PanelLayout};

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "lcdseg")]
#[command(about = "Decode seven-segment LCD meter panels from camera frames")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode a single frame and print per-digit results.
    Decode(CliDecodeArgs),

    /// Learn calibration from a frame with known content and save the cache.
    Calibrate(CliCalibrateArgs),

    /// Draw a diagnostic sample overlay onto a copy of a frame.
    Overlay(CliOverlayArgs),

    /// Print the glyph for a raw seven-bit segment mask.
    MaskTest {
        /// Segment mask (hex, e.g. 0x5B).
        #[arg(long)]
        mask: String,
    },

    /// Print a panel layout summary.
    PanelInfo {
        /// Path to the panel layout (JSON).
        #[arg(long)]
        panel: PathBuf,
    },
}

#[derive(Debug, Clone, Args)]
struct CliDecodeArgs {
    /// Path to the input frame.
    #[arg(long)]
    image: PathBuf,

    /// Path to the panel layout (JSON).
    #[arg(long)]
    panel: PathBuf,

    /// Calibration cache to restore before decoding.
    #[arg(long)]
    calib: Option<PathBuf>,

    /// Path to write the full reading (JSON).
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
struct CliCalibrateArgs {
    /// Path to the input frame.
    #[arg(long)]
    image: PathBuf,

    /// Path to the panel layout (JSON).
    #[arg(long)]
    panel: PathBuf,

    /// Expected glyphs, one per digit, '.' after a digit for a lit decimal
    /// point (e.g. 0123.4).
    #[arg(long)]
    digits: String,

    /// Calibration cache to write (also restored first when it exists, so
    /// repeated calibration accumulates).
    #[arg(long)]
    calib: PathBuf,
}

#[derive(Debug, Clone, Args)]
struct CliOverlayArgs {
    /// Path to the input frame.
    #[arg(long)]
    image: PathBuf,

    /// Path to the panel layout (JSON).
    #[arg(long)]
    panel: PathBuf,

    /// Calibration cache to restore before classifying.
    #[arg(long)]
    calib: Option<PathBuf>,

    /// Draw filled rectangles instead of sampling lines.
    #[arg(long)]
    fill: bool,

    /// Path to write the annotated image.
    #[arg(long)]
    out: PathBuf,
}

fn main() -> CliResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Decode(args) => run_decode(&args),
        Commands::Calibrate(args) => run_calibrate(&args),
        Commands::Overlay(args) => run_overlay(&args),
        Commands::MaskTest { mask } => run_mask_test(&mask),
        Commands::PanelInfo { panel } => run_panel_info(&panel),
    }
}

/// Load a frame and reduce it to BT.601 luminance.
fn load_gray(path: &PathBuf) -> CliResult<image::GrayImage> {
    let img = image::open(path)
        .map_err(|e| -> CliError { format!("failed to open image {}: {}", path.display(), e).into() })?;
    Ok(geometry::rgb_to_gray(&img.to_rgb8()))
}

fn build_decoder(panel: &PathBuf, calib: Option<&PathBuf>) -> CliResult<PanelDecoder> {
    let layout = PanelLayout::from_json_file(panel)?;
    tracing::info!("Panel {:?}: {} digits", layout.name, layout.digit_count());
    let mut decoder = PanelDecoder::from_layout(&layout)?;
    if let Some(path) = calib {
        decoder.load_calibration(path)?;
        tracing::info!("Calibration restored from {}", path.display());
    }
    Ok(decoder)
}

// ── decode ─────────────────────────────────────────────────────────────────

fn run_decode(args: &CliDecodeArgs) -> CliResult<()> {
    let gray = load_gray(&args.image)?;
    tracing::info!("Image size: {}x{}", gray.width(), gray.height());

    let decoder = build_decoder(&args.panel, args.calib.as_ref())?;
    let reading = decoder.decode(&gray);

    println!("reading: {:?}", reading.text());
    for (i, d) in reading.digits.iter().enumerate() {
        println!(
            "  digit {}: {:>3}  mask=0x{:02X} valid={} samples={:?}",
            i, d.text, d.mask, d.valid, d.samples
        );
    }
    if !reading.all_valid() {
        tracing::warn!("frame has unrecognised digits");
    }

    if let Some(out) = &args.out {
        let json = serde_json::to_string_pretty(&reading)?;
        std::fs::write(out, &json)?;
        tracing::info!("Reading written to {}", out.display());
    }
    Ok(())
}

// ── calibrate ──────────────────────────────────────────────────────────────

fn run_calibrate(args: &CliCalibrateArgs) -> CliResult<()> {
    let gray = load_gray(&args.image)?;
    let mut decoder = build_decoder(
        &args.panel,
        args.calib.exists().then_some(&args.calib),
    )?;

    decoder.calibrate(&gray, &args.digits)?;
    decoder.save_calibration(&args.calib)?;
    tracing::info!("Calibration saved to {}", args.calib.display());

    for (i, tpl) in decoder.templates().iter().enumerate() {
        let ranges: Vec<String> = (0..7)
            .map(|s| {
                let (min, max) = tpl.range(s);
                format!("{}..{}", min, max)
            })
            .collect();
        println!("  digit {}: {}", i, ranges.join(" "));
    }
    Ok(())
}

// ── overlay ────────────────────────────────────────────────────────────────

fn run_overlay(args: &CliOverlayArgs) -> CliResult<()> {
    let gray = load_gray(&args.image)?;
    let decoder = build_decoder(&args.panel, args.calib.as_ref())?;

    let marks = decoder.sample_marks(&gray);
    let work = decoder.working_frame(&gray);
    let mut canvas = image::DynamicImage::ImageLuma8(work).to_rgb8();
    draw_marks(&mut canvas, &marks, args.fill);

    canvas.save(&args.out)?;
    tracing::info!("Overlay written to {}", args.out.display());
    Ok(())
}

// ── mask-test ──────────────────────────────────────────────────────────────

fn run_mask_test(mask_str: &str) -> CliResult<()> {
    let mask_str = mask_str
        .trim()
        .trim_start_matches("0x")
        .trim_start_matches("0X");
    let mask = u8::from_str_radix(mask_str, 16)
        .map_err(|e| -> CliError { format!("invalid hex mask: {}", e).into() })?;

    match glyph::mask_to_char(mask) {
        Some(c) => println!("mask 0x{:02X} -> {:?}", mask, c),
        None => println!("mask 0x{:02X} -> unrecognised", mask),
    }
    Ok(())
}

// ── panel-info ─────────────────────────────────────────────────────────────

fn run_panel_info(panel: &PathBuf) -> CliResult<()> {
    let layout = PanelLayout::from_json_file(panel)?;

    println!("panel layout");
    println!("  name:       {}", layout.name);
    println!("  digits:     {}", layout.digit_count());
    println!("  threshold:  {}", layout.threshold);
    println!("  rotation:   {} deg", layout.rotation_deg);
    for (i, d) in layout.digits.iter().enumerate() {
        let mut extra = String::new();
        if let Some(c) = d.fixed {
            extra.push_str(&format!("  fixed={:?}", c));
        }
        if d.decimal_point {
            extra.push_str("  dp");
        }
        println!(
            "  digit {}: bbox=({}, {})..({}, {}){}",
            i, d.bbox[0], d.bbox[1], d.bbox[2], d.bbox[3], extra
        );
    }
    Ok(())
}

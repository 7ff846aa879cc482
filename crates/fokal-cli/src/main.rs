//! Analyze a still image's depth and apply a selective blur: estimate a
//! depth-proxy map, segment focus regions, and composite the original
//! against a blurred rendition weighted by distance from the focus
//! plane.

use std::path::{Path, PathBuf};

use clap::Parser;
use fokal_pipeline::{
    AnalyzerContext, BlurParams, FocusRegion, InstantClock, RgbaImage, analyze_with_diagnostics,
    auto_focus_depth, blur, composite,
};
use serde::Serialize;

/// Estimate depth from a single image and composite a selective blur.
#[derive(Parser)]
#[command(version)]
struct Args {
    /// Input image path (PNG, JPEG, BMP, WebP).
    input: PathBuf,

    /// Output path for the composited image.
    #[arg(short, long)]
    output: PathBuf,

    /// Also write the grayscale depth visualization (JPEG) here.
    #[arg(long, value_name = "PATH")]
    depth_map: Option<PathBuf>,

    /// Number of depth buckets to segment into (1-20).
    #[arg(long, default_value_t = 5)]
    regions: u32,

    /// Scales distance-from-focus into blend weight. Must be positive.
    #[arg(long, default_value_t = 1.0)]
    focus_strength: f32,

    /// Radius of the Gaussian blur applied to the out-of-focus buffer.
    #[arg(long, default_value_t = 15)]
    blur_radius: u32,

    /// Focus plane depth in [0, 1]. Pixels nearer than this stay sharp.
    /// Defaults to the automatically estimated subject depth.
    #[arg(long, value_name = "DEPTH")]
    depth_threshold: Option<f32>,

    /// Print the segmented focus regions as JSON to stdout.
    #[arg(long)]
    print_regions: bool,

    /// Print per-stage timing diagnostics as JSON to stderr.
    #[arg(long)]
    diagnostics: bool,
}

/// Region view for `--print-regions`, omitting the per-pixel mask.
#[derive(Serialize)]
struct RegionSummary {
    id: u32,
    depth: f32,
    confidence: f32,
    x: u32,
    y: u32,
    width: u32,
    height: u32,
}

impl From<&FocusRegion> for RegionSummary {
    fn from(region: &FocusRegion) -> Self {
        Self {
            id: region.id,
            depth: region.depth,
            confidence: region.confidence,
            x: region.bounding_box.x,
            y: region.bounding_box.y,
            width: region.bounding_box.width,
            height: region.bounding_box.height,
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    eprintln!("Reading image from {}", args.input.display());
    let image_bytes = std::fs::read(&args.input)?;

    eprintln!("Analyzing depth ({} regions)...", args.regions);
    let ctx = AnalyzerContext::default();
    let mut clock = InstantClock::new();
    let (analysis, diagnostics) =
        analyze_with_diagnostics(&image_bytes, args.regions, &ctx, &mut clock)?;

    eprintln!(
        "Original: {}x{}, depth map: {}x{}, {} region(s)",
        analysis.dimensions.width,
        analysis.dimensions.height,
        analysis.depth_map.width(),
        analysis.depth_map.height(),
        analysis.regions.len(),
    );

    if args.diagnostics {
        eprintln!("{}", serde_json::to_string_pretty(&diagnostics)?);
    }

    if args.print_regions {
        let summaries: Vec<RegionSummary> =
            analysis.regions.iter().map(RegionSummary::from).collect();
        println!("{}", serde_json::to_string_pretty(&summaries)?);
    }

    if let Some(path) = &args.depth_map {
        eprintln!("Saving depth visualization to {}", path.display());
        std::fs::write(path, &analysis.depth_image)?;
    }

    let depth_threshold = args.depth_threshold.unwrap_or_else(|| {
        let auto = auto_focus_depth(&analysis.depth_map);
        eprintln!("Auto focus plane: {auto:.3}");
        auto
    });

    let params = BlurParams {
        focus_strength: args.focus_strength,
        blur_radius: args.blur_radius,
        depth_threshold,
    };

    eprintln!(
        "Compositing (strength: {:.2}, radius: {}, threshold: {:.3})...",
        params.focus_strength, params.blur_radius, params.depth_threshold,
    );
    let blurred = blur::gaussian_blur_rgba(&analysis.original, params.blur_radius);
    let output = composite(&analysis.original, &blurred, &analysis.upscaled_depth, &params)?;

    eprintln!("Saving to {}", args.output.display());
    save_output(output, &args.output)?;

    eprintln!("Done.");
    Ok(())
}

/// Save the composited image, dropping the alpha channel for formats
/// whose encoders reject RGBA input.
fn save_output(image: RgbaImage, path: &Path) -> Result<(), image::ImageError> {
    let alpha_less = image::ImageFormat::from_path(path)
        .is_ok_and(|format| format == image::ImageFormat::Jpeg);
    if alpha_less {
        return image::DynamicImage::ImageRgba8(image).to_rgb8().save(path);
    }
    image.save(path)
}

// Bonsai renderer, CLI entry point.
//
// Reads a metric record, grows a tree and writes the drawing as JSON (the
// library's primitive list) or as an SVG document.
//
// Usage:
//   cargo run -p bonsai_tree --bin render_tree -- [metrics.json] [--config cfg.json]
//     [--mode lsystem|colonization] [--seed N] [--output out.json|out.svg]
//
// Without a metrics file the neutral default metrics are used. Without
// `--output` the JSON drawing goes to stdout. Logs go to stderr; set
// RUST_LOG=bonsai_tree=debug to see per-stage details.

use bonsai_tree::config::{GeneratorConfig, GrowthMode};
use bonsai_tree::render::{Drawing, Primitive};
use bonsai_tree::types::{Color, MetricRecord, MetricVector};
use std::fmt::Write as _;
use std::path::Path;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Pixel width of the longer side of an SVG document.
const SVG_SIZE: f64 = 800.0;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

/// Parsed command line.
#[derive(Debug, Default, PartialEq)]
struct CliArgs {
    metrics_path: Option<String>,
    config_path: Option<String>,
    mode: Option<GrowthMode>,
    seed: Option<u64>,
    output: Option<String>,
}

/// Parse arguments (without the program name). The metrics file may appear
/// anywhere among the flags; a flag with a missing or unparseable value, an
/// unknown flag, or a second positional argument is an error.
fn parse_args(args: &[String]) -> Result<CliArgs, String> {
    let mut cli = CliArgs::default();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if !arg.starts_with("--") {
            if let Some(first) = &cli.metrics_path {
                return Err(format!(
                    "unexpected argument '{arg}' (metrics file is already '{first}')"
                ));
            }
            cli.metrics_path = Some(arg.clone());
            continue;
        }
        let value = iter.next().ok_or_else(|| format!("{arg} needs a value"))?;
        match arg.as_str() {
            "--config" => cli.config_path = Some(value.clone()),
            "--output" => cli.output = Some(value.clone()),
            "--seed" => cli.seed = Some(parse_value(arg, value)?),
            "--mode" => {
                cli.mode = Some(GrowthMode::from_name(value).ok_or_else(|| {
                    format!("unknown mode '{value}' (expected lsystem or colonization)")
                })?)
            }
            _ => return Err(format!("unknown flag '{arg}'")),
        }
    }
    Ok(cli)
}

fn parse_value<T: std::str::FromStr>(flag: &str, value: &str) -> Result<T, String> {
    value
        .parse()
        .map_err(|_| format!("{flag}: invalid value '{value}'"))
}

fn run() -> Result<(), String> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let CliArgs {
        metrics_path,
        config_path,
        mode,
        seed,
        output,
    } = parse_args(&args)?;

    let mut config = match &config_path {
        Some(path) => {
            let json = read(path)?;
            GeneratorConfig::from_json(&json).map_err(|e| format!("{path}: {e}"))?
        }
        None => GeneratorConfig::default(),
    };
    if let Some(mode) = mode {
        config.mode = mode;
    }
    if let Some(seed) = seed {
        config.seed = seed;
    }

    let metrics = match metrics_path.as_deref() {
        Some(path) => {
            let json = read(path)?;
            let record: MetricRecord =
                serde_json::from_str(&json).map_err(|e| format!("{path}: {e}"))?;
            MetricVector::from(record)
        }
        None => MetricVector::default(),
    };

    tracing::info!(mode = ?config.mode, seed = config.seed, ?metrics, "growing bonsai");
    let drawing = bonsai_tree::generate(&metrics, &config).map_err(|e| e.to_string())?;
    tracing::info!(
        lines = drawing.lines().count(),
        leaves = drawing.ellipses().count(),
        width = drawing.bounds.width(),
        height = drawing.bounds.height(),
        "tree grown"
    );

    match output {
        Some(path) if path.ends_with(".svg") => write(&path, &to_svg(&drawing)),
        Some(path) => write(&path, &to_json(&drawing)?),
        None => {
            println!("{}", to_json(&drawing)?);
            Ok(())
        }
    }
}

fn read(path: &str) -> Result<String, String> {
    std::fs::read_to_string(Path::new(path)).map_err(|e| format!("{path}: {e}"))
}

fn write(path: &str, contents: &str) -> Result<(), String> {
    std::fs::write(Path::new(path), contents).map_err(|e| format!("{path}: {e}"))?;
    tracing::info!(path, "wrote drawing");
    Ok(())
}

fn to_json(drawing: &Drawing) -> Result<String, String> {
    serde_json::to_string_pretty(drawing).map_err(|e| e.to_string())
}

// ---------------------------------------------------------------------------
// SVG
// ---------------------------------------------------------------------------

/// SVG document for `drawing`. Geometry is y-up, so everything sits in a
/// group flipped about the x axis; stroke widths are in screen pixels
/// whatever the drawing's units.
fn to_svg(drawing: &Drawing) -> String {
    let b = drawing.bounds;
    let (w, h) = (b.width().max(f64::EPSILON), b.height().max(f64::EPSILON));
    let px = SVG_SIZE / w.max(h);

    let mut svg = String::new();
    let _ = writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{:.0}" height="{:.0}" viewBox="{} {} {} {}">"#,
        w * px,
        h * px,
        b.min_x,
        -b.max_y,
        w,
        h
    );
    let _ = writeln!(svg, r#"<rect x="{}" y="{}" width="{w}" height="{h}" fill="white"/>"#, b.min_x, -b.max_y);
    let _ = writeln!(svg, r#"<g transform="scale(1,-1)">"#);

    for p in &drawing.primitives {
        match *p {
            Primitive::Line {
                x1,
                y1,
                x2,
                y2,
                width,
                color,
            } => {
                let _ = writeln!(
                    svg,
                    r#"<line x1="{x1}" y1="{y1}" x2="{x2}" y2="{y2}" stroke="{}" stroke-opacity="{}" stroke-width="{width}" stroke-linecap="round" vector-effect="non-scaling-stroke"/>"#,
                    color.to_hex(),
                    color.a
                );
            }
            Primitive::Ellipse {
                cx,
                cy,
                w,
                h,
                rotation,
                color,
            } => {
                let _ = writeln!(
                    svg,
                    r#"<ellipse cx="{cx}" cy="{cy}" rx="{}" ry="{}" transform="rotate({rotation} {cx} {cy})" {}/>"#,
                    w / 2.0,
                    h / 2.0,
                    fill(color)
                );
            }
        }
    }

    svg.push_str("</g>\n</svg>\n");
    svg
}

fn fill(color: Color) -> String {
    format!(r#"fill="{}" fill-opacity="{}""#, color.to_hex(), color.a)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn metrics_path_may_follow_flags() {
        let cli = parse_args(&args(&["--seed", "3", "m.json", "--mode", "sc"])).unwrap();
        assert_eq!(cli.metrics_path.as_deref(), Some("m.json"));
        assert_eq!(cli.seed, Some(3));
        assert_eq!(cli.mode, Some(GrowthMode::Colonization));
    }

    #[test]
    fn bad_seed_is_an_error() {
        let err = parse_args(&args(&["--seed", "abc"])).unwrap_err();
        assert!(err.contains("--seed"), "got {err}");
    }

    #[test]
    fn missing_value_unknown_flag_and_extra_positional_are_errors() {
        assert!(parse_args(&args(&["m.json", "--output"])).is_err());
        assert!(parse_args(&args(&["--size", "3"])).is_err());
        assert!(parse_args(&args(&["a.json", "b.json"])).is_err());
        assert!(parse_args(&args(&["--mode", "fractal"])).is_err());
    }

    #[test]
    fn no_arguments_means_defaults() {
        assert_eq!(parse_args(&[]).unwrap(), CliArgs::default());
    }

    #[test]
    fn svg_flips_the_y_axis() {
        let drawing = bonsai_tree::generate(&MetricVector::default(), &GeneratorConfig::default())
            .unwrap();
        let svg = to_svg(&drawing);
        assert!(svg.contains(r#"transform="scale(1,-1)""#));
        assert!(svg.contains("vector-effect=\"non-scaling-stroke\""));
    }
}

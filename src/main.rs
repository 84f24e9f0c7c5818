use clap::Parser;
use dualscale::config::{self, Config};
use dualscale::imaging::{CropRect, EngineBackend, FitBox, Quality, RustBackend, Scaler};
use dualscale::pipeline::{self, PipelineOutput, PipelineRequest};
use dualscale::{engine, output};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "dualscale")]
#[command(version)]
#[command(about = "Crop, resize, blur and re-encode one image")]
#[command(long_about = "\
Crop, resize, blur and re-encode one image

Stages run in a fixed order: decode, crop, resize, blur, encode. The output
container follows the source: JPEG stays JPEG, WebP stays WebP, PNG and GIF
stay as they are on the software backend and become PNG on the engine.

Two backends are available:

  software (default)  the image crate; -s picks the resampling kernel,
                      blur is skipped with a notice, WebP output is unsupported
  engine (-v)         the in-process accelerated engine; Lanczos3 resampling,
                      engine diagnostics are printed on failure

Defaults for -q, -s and --fast-resize come from dualscale.toml in the working
directory, or the file named by --config.

Examples:

  dualscale -r 1152x1152 --fast-resize photo.jpg thumb.jpg
  dualscale -c 0x50y400w300h -b 3 -v photo.png out.png
  dualscale https://example.com/photo.jpg out/photo.jpg")]
struct Cli {
    /// Local path or http(s) URL
    source: String,

    /// File to write
    destination: PathBuf,

    /// Fit within this box, never upscaling
    #[arg(short = 'r', value_name = "WxH")]
    resize: Option<FitBox>,

    /// Integer pre-shrink before the final resample
    #[arg(long)]
    fast_resize: bool,

    /// Crop before resizing
    #[arg(short = 'c', value_name = "XxYyWwHh")]
    crop: Option<CropRect>,

    /// Encode quality
    #[arg(short = 'q', value_name = "1-100", value_parser = clap::value_parser!(u32).range(1..=100))]
    quality: Option<u32>,

    /// Blur radius in pixels (0 = off)
    #[arg(short = 'b', default_value_t = 0)]
    blur: u32,

    /// Software-backend resampling kernel
    #[arg(short = 's', value_name = "NAME", long_help = scaler_help())]
    scaler: Option<Scaler>,

    /// Use the accelerated engine backend
    #[arg(short = 'v')]
    engine: bool,

    /// Config file (default: ./dualscale.toml when present)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

fn scaler_help() -> String {
    format!(
        "Software-backend resampling kernel. One of: {}",
        Scaler::NAMES.join(", ")
    )
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    let code = match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let buffer = if cli.engine {
                engine::error_buffer()
            } else {
                None
            };
            output::print_failure(e.as_ref(), buffer.as_deref());
            ExitCode::from(1)
        }
    };
    engine::shutdown();
    code
}

fn run(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(cli.config.as_deref())?;
    let request = PipelineRequest {
        crop: cli.crop,
        resize: cli.resize,
        fast_resize: cli.fast_resize || config.pipeline.fast_resize,
        blur: cli.blur,
        quality: Quality::new(cli.quality.unwrap_or(config.pipeline.quality)),
    };
    tracing::debug!(?request, engine = cli.engine, "request");

    let source = pipeline::resolve_source(&cli.source, &cli.destination)?;
    let output = process(cli, &config, &source, &request)?;
    output::print_success(&output, &cli.destination);
    Ok(())
}

/// Pick the backend once and run the whole pipeline on it.
fn process(
    cli: &Cli,
    config: &Config,
    source: &Path,
    request: &PipelineRequest,
) -> Result<PipelineOutput, Box<dyn std::error::Error>> {
    let output = if cli.engine {
        let backend = EngineBackend::with_config(config.engine.to_engine_config())?;
        pipeline::process_file(&backend, source, &cli.destination, request)?
    } else {
        let backend = RustBackend::new(cli.scaler.unwrap_or(config.pipeline.scaler));
        pipeline::process_file(&backend, source, &cli.destination, request)?
    };
    Ok(output)
}

fn load_config(explicit: Option<&Path>) -> Result<Config, config::ConfigError> {
    match explicit {
        Some(path) => config::load_config_file(path),
        None => config::load_config(Path::new(".")),
    }
}

/// Log to stderr. `RUST_LOG` wins; otherwise only warnings from this crate.
fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("dualscale=warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

use clap::{Parser, Subcommand};
use kenburns_gif::imaging::{
    AnimationConfig, RenderOptions, RenderedAnimation, RustBackend, plan_frames, render_animation,
};
use kenburns_gif::{config, server};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "kenburns-gif")]
#[command(about = "Turn a photo into a looping Ken Burns zoom GIF")]
#[command(long_about = "\
Turn a photo into a looping Ken Burns zoom GIF

Runs an HTTP service with a single upload endpoint, or renders local files
with the same pipeline.

HTTP surface:

  GET  /            → {\"message\": \"...\"}  (liveness check)
  POST /generate/   → multipart field `file` (image/*) → image/gif

Animation (defaults, set in the config file):
  300x300 frames, 10 frames at 100 ms, zoom 1.0 → 1.3 (zoom out), loop forever

Run 'kenburns-gif gen-config' to generate a documented config file.")]
#[command(version)]
struct Cli {
    /// Config file (missing file = stock defaults)
    #[arg(long, default_value = "kenburns.toml", global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP service
    Serve {
        /// Override server.host
        #[arg(long)]
        host: Option<String>,
        /// Override server.port
        #[arg(long)]
        port: Option<u16>,
    },
    /// Render a local image to a GIF with the configured animation
    Render {
        /// Source image
        input: PathBuf,
        /// Destination GIF
        output: PathBuf,
    },
    /// Print the crop plan for a source size as JSON
    Plan {
        width: u32,
        height: u32,
    },
    /// Print a stock config file with all options documented
    GenConfig,
}

type CliResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

#[tokio::main]
async fn main() -> CliResult<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Serve { host, port } => {
            let mut service_config = prepare(&cli.config)?;
            if let Some(host) = host {
                service_config.server.host = host;
            }
            if let Some(port) = port {
                service_config.server.port = port;
            }
            let backend = RustBackend::with_pixel_limit(service_config.limits.max_source_pixels);
            server::serve(&service_config, backend).await?;
        }
        Command::Render { input, output } => {
            let service_config = prepare(&cli.config)?;
            let backend = RustBackend::with_pixel_limit(service_config.limits.max_source_pixels);
            let options = service_config.render_options();
            let (src, dst) = (input.clone(), output.clone());
            let rendered =
                tokio::task::spawn_blocking(move || render_file(&backend, &src, &dst, &options))
                    .await??;
            println!(
                "{} ({}x{}) → {} ({} frames, {} bytes)",
                input.display(),
                rendered.source.width,
                rendered.source.height,
                output.display(),
                rendered.frame_count(),
                rendered.bytes.len()
            );
        }
        Command::Plan { width, height } => {
            let service_config = prepare(&cli.config)?;
            println!("{}", plan_json(&service_config.animation, width, height)?);
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Render `input` with the configured animation and write the GIF to `output`.
fn render_file(
    backend: &RustBackend,
    input: &Path,
    output: &Path,
    options: &RenderOptions,
) -> CliResult<RenderedAnimation> {
    let bytes = std::fs::read(input)?;
    let rendered = render_animation(backend, &bytes, options)?;
    std::fs::write(output, &rendered.bytes)?;
    Ok(rendered)
}

/// Crop plan for a `width`×`height` source, as pretty-printed JSON.
fn plan_json(animation: &AnimationConfig, width: u32, height: u32) -> CliResult<String> {
    let plan = plan_frames(animation, width, height)?;
    Ok(serde_json::to_string_pretty(&plan)?)
}

/// Load the config file and set up logging and the frame worker pool.
fn prepare(path: &Path) -> Result<config::ServiceConfig, config::ConfigError> {
    let service_config = config::load_config(path)?;
    init_tracing(&service_config.logging);
    init_thread_pool(&service_config.processing);
    Ok(service_config)
}

/// Install the fmt subscriber. `RUST_LOG` wins over the configured level.
fn init_tracing(logging: &config::LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Initialize the rayon thread pool used for per-frame rendering.
///
/// Capped at the number of available CPU cores.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}

use clap::Parser;
use tracing::{debug, info, Level};
use tracing_subscriber::EnvFilter;

use music_video_combiner::cli::{self, Cli};
use music_video_combiner::combine::Stage;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize logging; RUST_LOG takes precedence over --verbose
    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.to_string()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    info!("Starting music-video-combiner v{}", env!("CARGO_PKG_VERSION"));
    debug!("Video: {:?}", cli.video);
    debug!("Audio: {:?}", cli.audio);
    debug!("Output: {:?}", cli.output);

    match cli::run(&cli).await {
        Ok(report) => {
            info!(
                "Combine complete: {:.2}s, {}x{} @ {} fps, {} bytes",
                report.duration, report.width, report.height, report.fps, report.file_size
            );
        }
        Err(e) => {
            cli.reporter().report(Stage::Error, &e.user_message());
            std::process::exit(e.exit_code());
        }
    }
}

// Prints the metadata the combiner would see for each file given

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use music_video_combiner::media::{AudioSource, VideoSource};

#[derive(Parser)]
#[command(name = "probe-media", about = "Show decoded metadata of media files")]
struct Args {
    /// Files to probe
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Treat every file as audio
    #[arg(short, long)]
    audio: bool,

    /// ffprobe executable
    #[arg(long, default_value = "ffprobe")]
    ffprobe: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::WARN)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    for path in &args.files {
        println!("📁 {}", path.display());

        if args.audio {
            let audio = AudioSource::open(path, &args.ffprobe)
                .await
                .with_context(|| format!("probing audio {}", path.display()))?;
            let meta = audio.metadata();
            println!("   Duration:    {:.3}s", meta.duration);
            println!("   Sample rate: {}", meta.sample_rate.map(|r| format!("{} Hz", r)).unwrap_or_else(|| "unknown".into()));
            println!("   Channels:    {}", meta.channels.map(|c| c.to_string()).unwrap_or_else(|| "unknown".into()));
            println!("   Read with:   {:?}", meta.backend);
        } else {
            let video = VideoSource::open(path, &args.ffprobe)
                .await
                .with_context(|| format!("probing video {}", path.display()))?;
            let meta = video.metadata();
            println!("   Duration:    {:.3}s", meta.duration);
            println!("   Resolution:  {}x{}", meta.width, meta.height);
            println!("   Frame rate:  {:.3} fps ({})", meta.fps, meta.frame_rate);
            println!("   Codec:       {}", meta.codec);
            println!("   Has audio:   {}", meta.has_audio);
        }
    }

    Ok(())
}

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};

use glyphcast::schema::{
    Background, Charset, FontProfile, RenderOptions, RenderVariant, VideoOptions,
};
use glyphcast::{render_image, render_video};

const LONG_VERSION: &str = match option_env!("GLYPHCAST_GIT_HASH") {
    Some(hash) => hash,
    None => env!("CARGO_PKG_VERSION"),
};

#[derive(Debug, Parser)]
#[command(name = "glyphcast", version, long_version = LONG_VERSION)]
#[command(about = "Image and video to character-mosaic renderer")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Render a still image into a PNG character mosaic.
    Image {
        input: PathBuf,
        #[arg(short = 'o', long = "output")]
        output: PathBuf,
        #[command(flatten)]
        render: RenderFlags,
    },
    /// Render a video into a character-mosaic video.
    Video {
        input: PathBuf,
        #[arg(short = 'o', long = "output")]
        output: PathBuf,
        #[command(flatten)]
        render: RenderFlags,
        /// Paint glyphs with each cell's average color.
        #[arg(long)]
        color: bool,
        /// Output frame rate; 0 inherits the source rate.
        #[arg(long, default_value_t = 0)]
        fps: u32,
        /// Width ratio of the original-frame overlay; 0 disables it.
        #[arg(long, default_value_t = 0.2)]
        overlay_ratio: f32,
        /// FourCC for the intermediate container.
        #[arg(long, default_value = "mp4v")]
        codec: String,
    },
}

#[derive(Debug, Args)]
struct RenderFlags {
    /// 10 (simple) or 70 (complex) glyph ramp.
    #[arg(long, value_enum, default_value = "simple")]
    charset: CharsetArg,
    #[arg(long, value_enum, default_value = "black")]
    background: BackgroundArg,
    /// Mosaic width in glyph cells.
    #[arg(long, default_value_t = 100)]
    num_cols: u32,
    /// Font size multiplier.
    #[arg(long, default_value_t = 1)]
    scale: u32,
    /// Monospaced TTF to rasterize with.
    #[arg(long)]
    font: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CharsetArg {
    Simple,
    Complex,
}

impl From<CharsetArg> for Charset {
    fn from(value: CharsetArg) -> Self {
        match value {
            CharsetArg::Simple => Charset::Simple,
            CharsetArg::Complex => Charset::Complex,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum BackgroundArg {
    Black,
    White,
}

impl From<BackgroundArg> for Background {
    fn from(value: BackgroundArg) -> Self {
        match value {
            BackgroundArg::Black => Background::Black,
            BackgroundArg::White => Background::White,
        }
    }
}

impl RenderFlags {
    fn into_options(self) -> RenderOptions {
        let mut font = FontProfile::default();
        if let Some(path) = self.font {
            font.path = path;
        }
        RenderOptions {
            charset: self.charset.into(),
            background: self.background.into(),
            num_cols: self.num_cols,
            scale: self.scale,
            font,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Image {
            input,
            output,
            render,
        } => {
            let options = render.into_options();
            let bytes = fs::read(&input)
                .with_context(|| format!("failed to read input image '{}'", input.display()))?;
            let png = render_image(&bytes, &options)?;
            fs::write(&output, png)
                .with_context(|| format!("failed to write output '{}'", output.display()))?;
            println!("[glyphcast] wrote {}", output.display());
            Ok(())
        }
        Commands::Video {
            input,
            output,
            render,
            color,
            fps,
            overlay_ratio,
            codec,
        } => {
            let options = VideoOptions {
                render: render.into_options(),
                variant: if color {
                    RenderVariant::Color
                } else {
                    RenderVariant::Mono
                },
                fps,
                overlay_ratio,
                codec,
            };
            render_video(&input, &output, &options)?;
            Ok(())
        }
    }
}

//! Whisplay Control Tool
//!
//! CLI for drawing on the Whisplay LCD and driving its lights and button.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use whisplay_hw::probe::{probe_audio_codec, probe_variant, Variant};
use whisplay_hw::{parse_hex_color, BacklightMode, Config, Platform, Rgb, Whisplay};

#[derive(Parser)]
#[command(name = "whisplayctl")]
#[command(about = "Control tool for the Whisplay LCD HAT")]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Configuration file (defaults apply if it does not exist)
    #[arg(short, long, default_value = "config/default.toml")]
    config: PathBuf,

    /// Keep the board driven until Ctrl-C after the command runs
    #[arg(long)]
    hold: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show detected hardware
    Info {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    #[command(flatten)]
    Board(BoardCommands),
}

/// Commands that claim the board.
#[derive(Subcommand)]
enum BoardCommands {
    /// Scale, crop and draw an image file
    Show {
        /// Image path (any format the image crate decodes)
        path: PathBuf,
    },
    /// Clear the display to black
    Clear,
    /// Fill the display with a solid color
    Fill {
        /// Color in hex format (e.g., #FF0000 for red)
        color: String,
    },
    /// Draw a single pixel
    Pixel {
        x: u16,
        y: u16,
        /// Color in hex format
        color: String,
    },
    /// Draw a line between two points
    Line {
        #[arg(allow_hyphen_values = true)]
        x0: i32,
        #[arg(allow_hyphen_values = true)]
        y0: i32,
        #[arg(allow_hyphen_values = true)]
        x1: i32,
        #[arg(allow_hyphen_values = true)]
        y1: i32,
        /// Color in hex format
        color: String,
    },
    /// Set backlight brightness
    Backlight {
        /// Brightness (0-100)
        #[arg(value_parser = clap::value_parser!(u8).range(0..=100))]
        brightness: u8,
    },
    /// Switch the backlight control path
    BacklightMode {
        /// Mode: pwm, switch
        mode: String,
    },
    /// Set the RGB LED color
    Rgb {
        r: u8,
        g: u8,
        b: u8,
        /// Fade from the current color over this many milliseconds
        #[arg(long)]
        fade: Option<u64>,
    },
    /// Print button events until Ctrl-C
    Button,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = load_config(&cli.config)?;

    match cli.command {
        Commands::Info { json } => handle_info(&config, json),
        Commands::Board(command) => run(&config, command, cli.hold).await,
    }
}

fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        debug!("No configuration at {}, using defaults", path.display());
        return Ok(Config::default());
    }
    let config = Config::load(path)
        .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
    info!("Loaded configuration from: {}", path.display());
    Ok(config)
}

#[cfg(target_os = "linux")]
async fn run(config: &Config, command: BoardCommands, hold: bool) -> Result<()> {
    let platform = whisplay_hw::LinuxPlatform::new(config);
    let board = Whisplay::initialize(platform, config)
        .context("Failed to initialize the Whisplay board. Is SPI enabled?")?;

    execute(&board, command).await?;
    if hold {
        println!("Holding; press Ctrl-C to release the board");
        tokio::signal::ctrl_c().await?;
    }
    board.shutdown();
    Ok(())
}

#[cfg(not(target_os = "linux"))]
async fn run(_config: &Config, _command: BoardCommands, _hold: bool) -> Result<()> {
    anyhow::bail!("whisplayctl needs Linux spidev and GPIO character devices")
}

async fn execute<P>(board: &Whisplay<P>, command: BoardCommands) -> Result<()>
where
    P: Platform + 'static,
{
    let controller = board.controller();

    match command {
        BoardCommands::Show { path } => {
            let image = image::open(&path)
                .with_context(|| format!("Failed to open image {}", path.display()))?;
            board.render(&image)?;
            println!("Displayed: {}", path.display());
        }
        BoardCommands::Clear => {
            board.clear()?;
            println!("Display cleared");
        }
        BoardCommands::Fill { color } => {
            controller.fill(parse_hex_color(&color)?)?;
            println!("Display filled with: {}", color);
        }
        BoardCommands::Pixel { x, y, color } => {
            controller.draw_pixel(x, y, parse_hex_color(&color)?)?;
        }
        BoardCommands::Line {
            x0,
            y0,
            x1,
            y1,
            color,
        } => {
            controller.draw_line(x0, y0, x1, y1, parse_hex_color(&color)?)?;
        }
        BoardCommands::Backlight { brightness } => {
            board.set_backlight(brightness)?;
            println!("Backlight set to: {}", brightness);
        }
        BoardCommands::BacklightMode { mode } => {
            let mode: BacklightMode = mode.parse()?;
            board.set_backlight_mode(mode)?;
            println!("Backlight mode set to: {}", mode);
        }
        BoardCommands::Rgb { r, g, b, fade } => {
            let color = Rgb::new(r, g, b);
            match fade {
                Some(ms) => {
                    tokio::task::spawn_blocking(move || {
                        controller.fade(color, Duration::from_millis(ms))
                    })
                    .await??;
                }
                None => board.set_rgb(color)?,
            }
            println!("RGB LED set to: ({}, {}, {})", r, g, b);
        }
        BoardCommands::Button => {
            if !board.has_button() {
                anyhow::bail!("Button line is unavailable");
            }
            board.on_press(|| println!("pressed"));
            board.on_release(|| println!("released"));
            println!("Watching button; press Ctrl-C to stop");
            tokio::signal::ctrl_c().await?;
        }
    }

    Ok(())
}

fn handle_info(config: &Config, json: bool) -> Result<()> {
    let variant = std::fs::read_to_string(&config.platform.cpuinfo)
        .map(|text| probe_variant(&text))
        .unwrap_or_else(|_| Variant::default());
    let audio_codec = std::fs::read_to_string(&config.platform.sound_cards)
        .map(|cards| probe_audio_codec(&cards))
        .unwrap_or(false);
    let mode = config.lighting.backlight_mode.resolve(variant.pwm_capable);
    let (width, height) = config.panel.orientation.dimensions();
    let model = variant.model.as_deref().unwrap_or("unknown");

    if json {
        let info = serde_json::json!({
            "model": variant.model,
            "pwm_capable": variant.pwm_capable,
            "backlight_mode": mode.to_string(),
            "audio_codec": audio_codec,
            "orientation": config.panel.orientation.to_string(),
            "width": width,
            "height": height,
        });
        println!("{}", serde_json::to_string_pretty(&info)?);
        return Ok(());
    }

    println!("Whisplay:");
    println!("  Model: {}", model);
    println!("  Backlight mode: {}", mode);
    println!(
        "  WM8960 audio codec: {}",
        if audio_codec { "present" } else { "not found" }
    );
    println!(
        "  Display: {}x{} ({})",
        width, height, config.panel.orientation
    );
    Ok(())
}

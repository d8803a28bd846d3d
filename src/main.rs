use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use shelfmedia::{MediaSettings, MigrationOptions, PresetName, ShelfMediaPlugin, SourceImage};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "shelfmedia")]
#[command(about = "Adaptive image optimization for bookstore media")]
#[command(version)]
struct Cli {
    /// Settings file (JSON); defaults apply when omitted
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Optimize one image file for a preset
    Optimize {
        input: PathBuf,
        /// bookCover, authorPhoto, heroBackground, postFeaturedImage or postInlineImage
        #[arg(long)]
        preset: PresetName,
        /// Output file; defaults to the input name with the new extension
        #[arg(long)]
        output: Option<PathBuf>,
        /// Declared MIME type; sniffed from the content when omitted
        #[arg(long)]
        mime: Option<String>,
    },
    /// Re-optimize stored images that exceed their preset budget
    Migrate {
        /// Report what would change without writing
        #[arg(long)]
        dry_run: bool,
        #[arg(long)]
        preset: Option<PresetName>,
        /// Process at most this many records
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Print the preset table
    Presets,
}

fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if json {
        fmt().json().with_env_filter(filter).init();
    } else {
        fmt().with_env_filter(filter).init();
    }
}

fn load_settings(path: Option<&Path>) -> anyhow::Result<MediaSettings> {
    let settings = match path {
        Some(path) => MediaSettings::load(path)
            .with_context(|| format!("failed to load settings from {}", path.display()))?,
        None => MediaSettings::default(),
    };
    settings.validate()?;
    Ok(settings)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let settings = load_settings(cli.config.as_deref())?;
    init_logging(cli.json_logs || settings.json_logs);

    let plugin = ShelfMediaPlugin::with_settings(settings);

    match cli.command {
        Command::Optimize {
            input,
            preset,
            output,
            mime,
        } => {
            let data = tokio::fs::read(&input)
                .await
                .with_context(|| format!("failed to read {}", input.display()))?;
            let filename = input
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();

            let source = match mime {
                Some(mime) => SourceImage::new(data, mime, filename),
                None => SourceImage::sniffed(data, filename),
            };

            let optimized = match plugin.optimizer().validate_and_optimize(source, preset).await {
                Ok(optimized) => optimized,
                Err(e) => {
                    tracing::error!(input = %input.display(), error = %e, "Optimization failed");
                    bail!("{}", e.user_message());
                }
            };

            let output = output.unwrap_or_else(|| input.with_file_name(&optimized.filename));
            if output == input {
                bail!("refusing to overwrite the input file {}", input.display());
            }
            tokio::fs::write(&output, &optimized.data)
                .await
                .with_context(|| format!("failed to write {}", output.display()))?;

            println!(
                "{} -> {} ({}x{}, {} bytes, quality {}, {} attempt(s){})",
                input.display(),
                output.display(),
                optimized.dimensions.width,
                optimized.dimensions.height,
                optimized.size,
                optimized.quality,
                optimized.attempts(),
                if optimized.within_budget() { "" } else { ", over budget" },
            );
        }
        Command::Migrate {
            dry_run,
            preset,
            limit,
        } => {
            plugin.initialize().await.context("failed to initialize storage")?;

            let options = MigrationOptions {
                dry_run,
                preset,
                limit,
            };
            let report = plugin
                .migrate(&options)
                .await
                .context("failed to read image records")?;

            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Presets => {
            println!("{:<18} {:>10} {:>9} {:>8}  {}", "PRESET", "BUDGET", "MAX EDGE", "QUALITY", "FORMAT");
            for preset in plugin.presets().iter() {
                println!(
                    "{:<18} {:>10} {:>9} {:>8}  {}",
                    preset.name.as_str(),
                    preset.max_output_bytes,
                    preset.max_dimension,
                    preset.initial_quality(),
                    preset.preferred_format,
                );
            }
        }
    }

    Ok(())
}

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use voice_translator_lib::languages;
use voice_translator_lib::logging::init_tracing;
use voice_translator_lib::{AppConfig, Services, SourceLanguageConfig, TargetLanguageConfig};

/// Translate a spoken recording into synthesized speech in another language.
#[derive(Debug, Parser)]
#[command(name = "voice-translator", version, about)]
struct Cli {
    /// Recording to translate (WAV, 16 kHz mono preferred)
    #[arg(short, long)]
    input: PathBuf,

    /// Recognition language tag (e.g. es-ES) or "auto"
    #[arg(long, default_value = "auto")]
    from: String,

    /// Target language code (e.g. en)
    #[arg(long)]
    to: String,

    /// Voice used for synthesis; defaults to the first voice of the target language
    #[arg(long)]
    voice: Option<String>,

    /// Where to write the synthesized MP3
    #[arg(short, long, default_value = "translation.mp3")]
    output: PathBuf,

    /// Optional JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Also export the run log as CSV
    #[arg(long)]
    history_csv: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    init_tracing(config.log_json);
    tracing::debug!("Loaded config: {:?}", config);

    let source = if cli.from.trim().eq_ignore_ascii_case("auto") {
        SourceLanguageConfig::auto_detect()
    } else {
        SourceLanguageConfig::manual(&cli.from)?
    };
    let target = match cli.voice.as_deref() {
        Some(voice) => TargetLanguageConfig::new(&cli.to, voice)?,
        None => TargetLanguageConfig::with_default_voice(&cli.to)?,
    };
    if !languages::target_languages().any(|code| code == target.language_code()) {
        tracing::warn!(
            "Target language {} is not in the voice catalog",
            target.language_code()
        );
    }

    let audio = tokio::fs::read(&cli.input)
        .await
        .with_context(|| format!("Failed to read {}", cli.input.display()))?;

    let services = Services::from_config(&config)?;
    let result = services.pipeline.run_pipeline(&audio, source, &target).await?;

    tokio::fs::write(&cli.output, &result.synthesized_audio)
        .await
        .with_context(|| format!("Failed to write {}", cli.output.display()))?;

    println!("Source ({}): {}", result.source.effective_language(), result.original_text);
    println!("Target ({}): {}", result.target.language_code(), result.translated_text);
    println!("Audio written to {}", cli.output.display());

    if let Some(path) = cli.history_csv {
        tokio::fs::write(&path, services.run_log.to_csv())
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }

    Ok(())
}

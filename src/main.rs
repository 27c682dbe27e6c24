use std::io::BufRead;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing_subscriber::EnvFilter;

use lyra_voice::voice::{
    AudioPlayback, AudioSink, Embellisher, Markup, SpeechEngine, VoiceTable, WavFileSink,
    Waveform, profile,
};
use lyra_voice::{Config, Effect, Language, Speaker, UtteranceRequest};

/// Lyra - emotive speech for the Lyra voice assistant
#[derive(Parser)]
#[command(name = "lyra", version, about)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Write audio to a WAV file instead of the speakers
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Args)]
struct Delivery {
    /// Reply language (en, hi, hinglish)
    #[arg(short, long, default_value = "en")]
    lang: Language,

    /// Emotion id (happy, sad, flirty, ...)
    #[arg(short, long, default_value = "neutral")]
    emotion: String,

    /// Delivery effect (none, whisper, giggle)
    #[arg(long, default_value = "none")]
    effect: Effect,
}

#[derive(Subcommand)]
enum Command {
    /// Speak a reply
    Speak {
        text: String,
        #[command(flatten)]
        delivery: Delivery,
    },
    /// Speak each line read from stdin
    Repl {
        #[command(flatten)]
        delivery: Delivery,
    },
    /// Play a giggle
    Giggle {
        #[arg(short, long, default_value = "en")]
        lang: Language,
        #[arg(short, long, default_value = "happy")]
        emotion: String,
    },
    /// Speak a short emotional interjection
    Sound {
        #[arg(short, long, default_value = "en")]
        lang: Language,
        #[arg(short, long)]
        emotion: String,
    },
    /// Pre-render the giggle cache
    Warm {
        /// Language to render; all languages when omitted
        #[arg(short, long)]
        lang: Option<Language>,
    },
    /// Print the markup for a reply without synthesizing it
    Markup {
        text: String,
        #[command(flatten)]
        delivery: Delivery,
        /// Seed for the embellishment draws
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Test speaker output
    TestSpeaker,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "warn,lyra_voice=info",
        1 => "info,lyra_voice=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

#[allow(clippy::future_not_send)]
async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Markup {
            text,
            delivery,
            seed,
        } => {
            print_markup(&text, &delivery, seed);
            Ok(())
        }
        Command::TestSpeaker => test_speaker(cli.output),
        Command::Warm { lang } => warm(lang).await,
        command => {
            let config = Config::load()?;
            let mut speaker = Speaker::from_config(&config, open_sink(cli.output)?)?;
            tracing::debug!(
                provider = ?config.tts.provider,
                cache = %config.cache.dir.display(),
                "speaker ready"
            );
            talk(&mut speaker, command).await
        }
    }
}

#[allow(clippy::future_not_send)]
async fn talk(speaker: &mut Speaker, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Speak { text, delivery } => {
            let request = UtteranceRequest::new(text, delivery.lang, delivery.emotion)
                .with_effect(delivery.effect);
            speaker.respond(&request).await;
        }
        Command::Repl { delivery } => {
            // Warm-up runs alongside the conversation; nothing waits on it
            drop(speaker.warm_cache(delivery.lang));

            for line in std::io::stdin().lock().lines() {
                let line = line?;
                let request = UtteranceRequest::new(line, delivery.lang, delivery.emotion.clone())
                    .with_effect(delivery.effect);
                speaker.respond(&request).await;
            }
        }
        Command::Giggle { lang, emotion } => {
            if !speaker.play_giggle(lang, &emotion).await {
                tracing::warn!(%lang, emotion = %emotion, "no giggle could be played");
            }
        }
        Command::Sound { lang, emotion } => {
            speaker.play_emotional_sound(&emotion, lang).await;
        }
        Command::Warm { .. } | Command::Markup { .. } | Command::TestSpeaker => {}
    }
    Ok(())
}

/// Build the giggle cache and report what was rendered
async fn warm(lang: Option<Language>) -> anyhow::Result<()> {
    let config = Config::load()?;
    let engine = SpeechEngine::new(config.speech_provider()?);
    let cache = Arc::new(config.giggle_cache());

    let languages = lang.map_or_else(|| Language::ALL.to_vec(), |l| vec![l]);
    for language in languages {
        let report = Arc::clone(&cache)
            .warm(engine.clone(), config.voices.clone(), language)
            .await?;
        println!(
            "{language}: {} written, {} already cached, {} failed",
            report.written, report.skipped, report.failed
        );
    }
    println!("Cache: {}", cache.root().display());

    Ok(())
}

fn print_markup(text: &str, delivery: &Delivery, seed: Option<u64>) {
    let mut rng = seed.map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);
    let profile = profile::get(&delivery.emotion);
    let embellished = Embellisher::new().embellish(text, profile, &mut rng);
    let voices = Config::load().map_or_else(|_| VoiceTable::default(), |c| c.voices);
    let markup = Markup::build(
        &embellished,
        voices.voice_for(delivery.lang),
        profile.emotion,
        delivery.effect,
    );

    println!("{}", markup.as_str());
}

fn open_sink(output: Option<PathBuf>) -> anyhow::Result<Box<dyn AudioSink>> {
    Ok(match output {
        Some(path) => Box::new(WavFileSink::new(path)),
        None => Box::new(AudioPlayback::new()?),
    })
}

/// Test speaker output with a sine tone
fn test_speaker(output: Option<PathBuf>) -> anyhow::Result<()> {
    println!("Testing speaker output...");
    println!("You should hear a 440Hz tone for 2 seconds\n");

    let sink = open_sink(output)?;

    let sample_rate = 24_000_u32;
    let frequency = 440.0_f32;
    let num_samples = 48_000_usize;

    #[allow(clippy::cast_precision_loss)]
    let samples: Vec<f32> = (0..num_samples)
        .map(|i| {
            let t = i as f32 / sample_rate as f32;
            (2.0 * std::f32::consts::PI * frequency * t).sin() * 0.3 // 30% volume
        })
        .collect();

    println!("Playing {} samples at {} Hz...", samples.len(), sample_rate);

    sink.play(&Waveform::new(samples, sample_rate))?;

    println!("\n---");
    println!("If you heard the tone, your speakers are working!");
    println!("If you didn't hear anything, check:");
    println!("  1. Run: pactl info | grep 'Default Sink'");
    println!("  2. Run: pactl list sinks short");
    println!("  3. Try: pavucontrol (to check output levels)");

    Ok(())
}

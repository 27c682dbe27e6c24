//! Voice pipeline integration tests
//!
//! Drives the speaker end to end with a scripted provider and an in-memory sink

use std::collections::BTreeSet;

use lyra_voice::voice::decode::decode;
use lyra_voice::voice::{SpeechEngine, Stage, StageOutcome};
use lyra_voice::{Effect, Language, SpeakOutcome, UtteranceRequest};
use tempfile::TempDir;

mod common;

use common::{SAMPLE_RATE, ScriptedProvider, Seen, rms, speaker};

#[tokio::test]
async fn test_neutral_english_hello() {
    let dir = TempDir::new().unwrap();
    let provider = ScriptedProvider::ok();
    let (mut speaker, sink) = speaker(provider.clone(), dir.path(), 1);

    let outcome = speaker
        .speak("hello", Language::En, "neutral", Effect::None)
        .await;

    let SpeakOutcome::Spoken(processed) = outcome else {
        panic!("expected speech");
    };
    assert_eq!(processed.outcome(Stage::PitchShift), Some(&StageOutcome::Skipped));
    assert_eq!(processed.outcome(Stage::SpeedChange), Some(&StageOutcome::Skipped));
    assert_eq!(processed.waveform.len(), SAMPLE_RATE as usize);

    let seen = provider.seen();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].voice(), "en-US-JennyNeural");

    let played = sink.played();
    assert_eq!(played.len(), 1);
    assert!(!played[0].is_empty());
}

#[tokio::test]
async fn test_whisper_is_quieter() {
    let dir = TempDir::new().unwrap();
    let provider = ScriptedProvider::ok();
    let (mut speaker, _) = speaker(provider.clone(), dir.path(), 3);

    let normal = speaker.prepare("come closer", Language::En, "tender", Effect::None);
    let whisper = speaker.prepare("come closer", Language::En, "tender", Effect::Whisper);
    assert!(whisper.markup.volume_db() < normal.markup.volume_db());

    speaker
        .speak("come closer", Language::En, "tender", Effect::Whisper)
        .await;
    let seen = provider.seen();
    let Seen::Markup { document, .. } = &seen[0] else {
        panic!("expected a markup request");
    };
    assert!(document.contains("volume=\"-8dB\""));
}

#[tokio::test]
async fn test_whisper_is_quieter_without_markup_support() {
    let dir = TempDir::new().unwrap();
    let (mut speaker, sink) = speaker(ScriptedProvider::plain_only(), dir.path(), 3);

    let normal = speaker
        .speak("come closer", Language::En, "neutral", Effect::None)
        .await;
    let whisper = speaker
        .speak("come closer", Language::En, "neutral", Effect::Whisper)
        .await;
    assert!(normal.is_spoken() && whisper.is_spoken());

    let played = sink.played();
    assert_eq!(played.len(), 2);
    assert!(rms(played[1].samples()) < rms(played[0].samples()) * 0.5);
}

#[tokio::test]
async fn test_provider_failure_falls_back_to_text() {
    let dir = TempDir::new().unwrap();
    let (mut speaker, sink) = speaker(ScriptedProvider::failing(), dir.path(), 1);

    let outcome = speaker
        .speak("are you there?", Language::Hi, "confused", Effect::None)
        .await;

    assert!(matches!(outcome, SpeakOutcome::TextFallback));
    assert!(sink.played().is_empty());
}

#[tokio::test]
async fn test_blank_reply_is_silent() {
    let dir = TempDir::new().unwrap();
    let provider = ScriptedProvider::ok();
    let (mut speaker, sink) = speaker(provider.clone(), dir.path(), 1);

    let outcome = speaker.speak("   ", Language::En, "happy", Effect::None).await;
    assert!(matches!(outcome, SpeakOutcome::Silent));
    assert!(provider.seen().is_empty());
    assert!(sink.played().is_empty());
}

#[tokio::test]
async fn test_plain_provider_gets_text_without_pauses() {
    let dir = TempDir::new().unwrap();
    let provider = ScriptedProvider::plain_only();
    let (mut speaker, _) = speaker(provider.clone(), dir.path(), 9);

    let outcome = speaker
        .speak("Hi. How are you?", Language::Hinglish, "neutral", Effect::None)
        .await;
    assert!(outcome.is_spoken());

    let seen = provider.seen();
    let Seen::Plain { text, voice } = &seen[0] else {
        panic!("expected a plain request");
    };
    assert_eq!(text, "Hi. How are you?");
    assert_eq!(voice, "hi-IN-SwaraNeural");
}

#[tokio::test]
async fn test_happy_laugh_is_sometimes_appended() {
    let dir = TempDir::new().unwrap();
    let mut lengths = Vec::new();

    for seed in 0..40 {
        let (mut speaker, _) = speaker(ScriptedProvider::ok(), dir.path(), seed);
        let outcome = speaker
            .speak("Great news", Language::En, "happy", Effect::None)
            .await;
        let SpeakOutcome::Spoken(processed) = outcome else {
            panic!("expected speech");
        };
        lengths.push(processed.waveform.len());
    }

    // The tone and giggle are fixed, so the shortest runs are the ones without a laugh
    let shortest = *lengths.iter().min().unwrap();
    let distinct: BTreeSet<usize> = lengths.iter().copied().collect();
    assert!(lengths.iter().filter(|&&l| l == shortest).count() >= 2);
    assert!(distinct.len() >= 2, "laugh never appended: {lengths:?}");
}

#[tokio::test]
async fn test_giggle_on_empty_cache_still_plays() {
    let dir = TempDir::new().unwrap();
    let provider = ScriptedProvider::ok();
    let (mut speaker, sink) = speaker(provider, &dir.path().join("does-not-exist"), 2);

    assert!(speaker.play_giggle(Language::Hi, "playful").await);

    let played = sink.played();
    assert_eq!(played.len(), 1);
    assert!(!played[0].is_empty());
    assert_eq!(speaker.cache().entries(Language::Hi).len(), 9);
}

#[tokio::test]
async fn test_giggle_without_provider_reports_nothing_played() {
    let dir = TempDir::new().unwrap();
    let (mut speaker, sink) = speaker(ScriptedProvider::failing(), dir.path(), 2);

    assert!(!speaker.play_giggle(Language::En, "happy").await);
    assert!(sink.played().is_empty());
}

#[tokio::test]
async fn test_giggle_effect_plays_before_reply() {
    let dir = TempDir::new().unwrap();
    let provider = ScriptedProvider::ok();
    let (mut speaker, sink) = speaker(provider.clone(), dir.path(), 4);

    let request =
        UtteranceRequest::new("you are funny", Language::En, "playful").with_effect(Effect::Giggle);
    let outcome = speaker.respond(&request).await;
    assert!(outcome.is_spoken());

    // Cache build renders nine variants, then the reply itself
    let seen = provider.seen();
    assert_eq!(seen.len(), 10);
    assert!(matches!(&seen[9], Seen::Markup { document, .. } if document.contains("funny")));
    assert_eq!(sink.played().len(), 2);
}

#[tokio::test]
async fn test_emotional_sound_for_unknown_emotion_says_okay() {
    let dir = TempDir::new().unwrap();
    let provider = ScriptedProvider::plain_only();
    let (mut speaker, _) = speaker(provider.clone(), dir.path(), 6);

    let outcome = speaker.play_emotional_sound("bored", Language::En).await;
    assert!(outcome.is_spoken());
    assert!(matches!(&provider.seen()[0], Seen::Plain { text, .. } if text == "okay"));
}

#[tokio::test]
async fn test_warm_cache_can_be_awaited() {
    let dir = TempDir::new().unwrap();
    let (speaker, _) = speaker(ScriptedProvider::ok(), dir.path(), 1);

    let report = speaker.warm_cache(Language::En).await.unwrap();
    assert_eq!(report.written, 9);
    assert_eq!(report.failed, 0);

    let again = speaker.warm_cache(Language::En).await.unwrap();
    assert_eq!(again.written, 0);
    assert_eq!(again.skipped, 9);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_warm_up_and_giggle_share_the_cache() {
    let dir = TempDir::new().unwrap();
    let provider = ScriptedProvider::ok();
    let (mut speaker, sink) = speaker(provider.clone(), dir.path(), 8);

    // Background warm-up and a second builder race the foreground giggle
    let warm = speaker.warm_cache(Language::En);
    let cache = speaker.cache().clone();
    let voices = speaker.voices().clone();
    let engine = SpeechEngine::new(provider);
    let builder = tokio::spawn(async move { cache.build(&engine, &voices, Language::En).await });

    assert!(speaker.play_giggle(Language::En, "happy").await);
    assert_eq!(warm.await.unwrap().failed, 0);
    assert_eq!(builder.await.unwrap().failed, 0);
    assert_eq!(sink.played().len(), 1);

    let names: Vec<String> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names.len(), 9, "{names:?}");
    assert!(names.iter().all(|n| n.starts_with("giggle_en_") && n.ends_with(".wav")));

    for path in speaker.cache().entries(Language::En) {
        let wave = decode(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(wave.len(), SAMPLE_RATE as usize);
    }
}

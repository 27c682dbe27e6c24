//! Pre-rendered non-verbal vocalizations (giggles)
//!
//! One WAV file per (language, phrase, variant) under a cache root. The disk
//! is authoritative: concurrent builders writing the same key produce the same
//! content, and each write lands atomically via a temp file rename, so the
//! last writer wins without locking.

use std::collections::{BTreeSet, HashMap};
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use rand::Rng;
use rand::seq::SliceRandom;
use tokio::task::JoinHandle;

use super::decode::{decode, to_wav};
use super::language::Language;
use super::markup::{Markup, VoiceTable};
use super::playback::AudioSink;
use super::tts::SpeechEngine;
use super::waveform::Waveform;
use crate::{Error, Result};

/// Giggle phrases rendered for every language unless configured otherwise
pub const DEFAULT_PHRASES: [&str; 3] = ["हाहा", "हेहे", "hehe"];

/// Prosody variants rendered per phrase
pub const DEFAULT_VARIANTS: usize = 3;

/// Identity of one cached vocalization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey {
    pub language: Language,
    /// Index into the language's phrase list
    pub phrase: usize,
    pub variant: usize,
}

impl CacheKey {
    /// Deterministic file name, unique per key
    #[must_use]
    pub fn file_name(&self) -> String {
        format!(
            "giggle_{}_{}_{}.wav",
            self.language.tag(),
            self.phrase,
            self.variant
        )
    }
}

/// Outcome of one build pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheReport {
    pub written: usize,
    /// Keys already on disk
    pub skipped: usize,
    pub failed: usize,
}

impl CacheReport {
    /// Entries present after the pass
    #[must_use]
    pub const fn available(&self) -> usize {
        self.written + self.skipped
    }
}

/// On-disk giggle cache with an in-memory index of known keys
#[derive(Debug)]
pub struct GiggleCache {
    root: PathBuf,
    phrases: HashMap<Language, Vec<String>>,
    variants: usize,
    index: Mutex<BTreeSet<CacheKey>>,
}

impl GiggleCache {
    /// Create a cache with explicit per-language phrases
    ///
    /// Languages without an entry use [`DEFAULT_PHRASES`].
    #[must_use]
    pub fn new(root: PathBuf, phrases: HashMap<Language, Vec<String>>, variants: usize) -> Self {
        Self {
            root,
            phrases,
            variants,
            index: Mutex::new(BTreeSet::new()),
        }
    }

    /// Create a cache with the default phrases and variants
    #[must_use]
    pub fn with_defaults(root: PathBuf) -> Self {
        Self::new(root, HashMap::new(), DEFAULT_VARIANTS)
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Phrases rendered for a language
    #[must_use]
    pub fn phrases(&self, language: Language) -> Vec<String> {
        self.phrases.get(&language).cloned().unwrap_or_else(|| {
            DEFAULT_PHRASES.iter().map(ToString::to_string).collect()
        })
    }

    /// Every key the cache is expected to hold for a language
    #[must_use]
    pub fn keys(&self, language: Language) -> Vec<CacheKey> {
        let phrase_count = self.phrases(language).len();
        (0..phrase_count)
            .flat_map(|phrase| {
                (0..self.variants).map(move |variant| CacheKey {
                    language,
                    phrase,
                    variant,
                })
            })
            .collect()
    }

    #[must_use]
    pub fn path_for(&self, key: &CacheKey) -> PathBuf {
        self.root.join(key.file_name())
    }

    /// Persisted entries for a language, rescanned from disk
    #[must_use]
    pub fn entries(&self, language: Language) -> Vec<PathBuf> {
        self.scan(language)
            .iter()
            .map(|key| self.path_for(key))
            .collect()
    }

    /// Rescan the disk and replace the index for a language
    fn scan(&self, language: Language) -> Vec<CacheKey> {
        let present: Vec<CacheKey> = self
            .keys(language)
            .into_iter()
            .filter(|key| self.path_for(key).is_file())
            .collect();

        if let Ok(mut index) = self.index.lock() {
            index.retain(|key| key.language != language);
            index.extend(present.iter().copied());
        }

        present
    }

    /// Indexed keys, falling back to a disk scan when the index has none
    fn lookup(&self, language: Language) -> Vec<CacheKey> {
        let known = self.known(language);
        if known.is_empty() {
            self.scan(language)
        } else {
            known
        }
    }

    /// Keys seen on disk by the last scan or build
    ///
    /// Lookups trust this index; [`Self::entries`] resyncs it with the disk.
    #[must_use]
    pub fn known(&self, language: Language) -> Vec<CacheKey> {
        self.index
            .lock()
            .map(|index| {
                index
                    .iter()
                    .filter(|key| key.language == language)
                    .copied()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Render every missing (phrase, variant) pair for a language
    ///
    /// Per-entry failures are logged and counted; the cache may end up
    /// partially populated.
    pub async fn build(
        &self,
        engine: &SpeechEngine,
        voices: &VoiceTable,
        language: Language,
    ) -> CacheReport {
        let voice = voices.voice_for(language);
        let phrases = self.phrases(language);
        let mut report = CacheReport::default();

        for key in self.keys(language) {
            let path = self.path_for(&key);
            if path.is_file() {
                report.skipped += 1;
                self.remember(key);
                continue;
            }

            let phrase = &phrases[key.phrase];
            match self.render(engine, &key, phrase, voice, &path).await {
                Ok(()) => {
                    report.written += 1;
                    self.remember(key);
                }
                Err(e) => {
                    report.failed += 1;
                    tracing::warn!(key = %key.file_name(), error = %e, "skipping giggle cache entry");
                }
            }
        }

        tracing::info!(
            language = %language,
            written = report.written,
            skipped = report.skipped,
            failed = report.failed,
            "giggle cache build finished"
        );
        report
    }

    async fn render(
        &self,
        engine: &SpeechEngine,
        key: &CacheKey,
        phrase: &str,
        voice: &str,
        path: &Path,
    ) -> Result<()> {
        let markup = Markup::variant(phrase, voice, key.variant);
        let wave = engine.synthesize(&markup, phrase).await?;
        self.persist(path, &wave)
    }

    /// Write a waveform atomically to its final path
    fn persist(&self, path: &Path, wave: &Waveform) -> Result<()> {
        let cache_error = |reason: String| Error::CacheWrite {
            path: path.display().to_string(),
            reason,
        };

        std::fs::create_dir_all(&self.root).map_err(|e| cache_error(e.to_string()))?;
        let bytes = to_wav(wave).map_err(|e| cache_error(e.to_string()))?;

        let mut file =
            tempfile::NamedTempFile::new_in(&self.root).map_err(|e| cache_error(e.to_string()))?;
        file.write_all(&bytes)
            .map_err(|e| cache_error(e.to_string()))?;
        file.persist(path)
            .map_err(|e| cache_error(e.error.to_string()))?;

        tracing::debug!(path = %path.display(), "cached giggle");
        Ok(())
    }

    fn remember(&self, key: CacheKey) {
        if let Ok(mut index) = self.index.lock() {
            index.insert(key);
        }
    }

    fn forget(&self, key: &CacheKey) {
        if let Ok(mut index) = self.index.lock() {
            index.remove(key);
        }
    }

    /// Play one cached giggle, building the cache once if it is empty
    ///
    /// If nothing could be cached, a short phrase is synthesized live instead.
    /// Returns the waveform that was played.
    ///
    /// # Errors
    ///
    /// Returns error only if the live fallback or playback fails
    pub async fn play_random<R: Rng + ?Sized>(
        &self,
        engine: &SpeechEngine,
        voices: &VoiceTable,
        sink: &dyn AudioSink,
        rng: &mut R,
        language: Language,
    ) -> Result<Waveform> {
        let mut keys = self.lookup(language);
        if keys.is_empty() {
            tracing::debug!(language = %language, "giggle cache empty, building");
            self.build(engine, voices, language).await;
            keys = self.scan(language);
        }

        let wave = match keys.choose(rng) {
            Some(key) => {
                let path = self.path_for(key);
                match load(&path) {
                    Ok(wave) => wave,
                    Err(e) => {
                        tracing::warn!(path = %path.display(), error = %e, "unreadable cache entry");
                        self.forget(key);
                        improvise(engine, voices, language).await?
                    }
                }
            }
            None => improvise(engine, voices, language).await?,
        };

        sink.play(&wave)?;
        Ok(wave)
    }

    /// Build the cache for a language on a background task
    ///
    /// The handle resolves with the build report once warm-up is done.
    #[must_use]
    pub fn warm(
        self: Arc<Self>,
        engine: SpeechEngine,
        voices: VoiceTable,
        language: Language,
    ) -> JoinHandle<CacheReport> {
        tokio::spawn(async move { self.build(&engine, &voices, language).await })
    }
}

fn load(path: &Path) -> Result<Waveform> {
    decode(&std::fs::read(path)?)
}

/// Last-resort giggle spoken without the cache
async fn improvise(
    engine: &SpeechEngine,
    voices: &VoiceTable,
    language: Language,
) -> Result<Waveform> {
    let phrase = if language.is_indic() { "हाहा" } else { "hehe" };
    tracing::debug!(phrase, "improvising giggle");
    engine
        .synthesize_text(phrase, voices.voice_for(language))
        .await
}

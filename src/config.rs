//! Quote-corpus configuration: where new games draw their phrases from.

use std::{env, fs, io::ErrorKind, path::PathBuf};

use rand::seq::IndexedRandom;
use serde::Deserialize;
use tracing::{info, warn};

/// Default location on disk where the library looks for the JSON corpus.
const DEFAULT_CORPUS_PATH: &str = "config/quotes.json";
/// Environment variable that overrides [`DEFAULT_CORPUS_PATH`].
const CORPUS_PATH_ENV: &str = "CRYPTOGRAM_QUOTES_PATH";

/// One playable phrase with its attribution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quote {
    /// The phrase itself. Uppercased when a game is created from it.
    pub text: String,
    /// Author, shown only after a win.
    pub major_attribution: String,
    /// Source work, shown only after a win.
    pub minor_attribution: String,
}

/// Immutable set of quotes shared across the application.
#[derive(Debug, Clone)]
pub struct QuoteCorpus {
    quotes: Vec<Quote>,
}

impl QuoteCorpus {
    /// Load the corpus from disk, falling back to the baked-in default set.
    pub fn load() -> Self {
        let path = resolve_corpus_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawCorpus>(&contents) {
                Ok(raw) => {
                    let corpus: Self = raw.into();
                    if corpus.quotes.is_empty() {
                        warn!(
                            path = %path.display(),
                            "corpus file holds no quotes; falling back to defaults"
                        );
                        return Self::default();
                    }
                    info!(
                        path = %path.display(),
                        count = corpus.quotes.len(),
                        "loaded quote corpus from config"
                    );
                    corpus
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse quote corpus; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "quote corpus file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read quote corpus; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Draw a random quote, preferring those whose text fits within
    /// `max_length` characters.
    ///
    /// When no quote satisfies the constraint the whole corpus is used
    /// instead, so callers always receive a phrase.
    pub fn random_quote(&self, max_length: Option<usize>) -> Quote {
        let mut rng = rand::rng();

        if let Some(limit) = max_length {
            let fitting: Vec<&Quote> = self
                .quotes
                .iter()
                .filter(|quote| quote.text.chars().count() <= limit)
                .collect();
            if let Some(quote) = fitting.choose(&mut rng) {
                return (*quote).clone();
            }
        }

        self.quotes
            .choose(&mut rng)
            .cloned()
            .unwrap_or_else(default_fallback_quote)
    }

    /// Number of quotes available.
    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    /// Whether the corpus holds no quotes (never true for a loaded corpus).
    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }
}

impl Default for QuoteCorpus {
    fn default() -> Self {
        Self {
            quotes: default_quotes(),
        }
    }
}

#[derive(Debug, Deserialize)]
/// JSON representation of the corpus file at [`DEFAULT_CORPUS_PATH`].
struct RawCorpus {
    quotes: Vec<RawQuote>,
}

#[derive(Debug, Deserialize)]
/// JSON representation of a single quote entry.
struct RawQuote {
    text: String,
    #[serde(default)]
    major_attribution: String,
    #[serde(default)]
    minor_attribution: String,
}

impl From<RawCorpus> for QuoteCorpus {
    fn from(value: RawCorpus) -> Self {
        let quotes = value
            .quotes
            .into_iter()
            .filter(|quote| !quote.text.trim().is_empty())
            .map(|quote| Quote {
                text: quote.text,
                major_attribution: quote.major_attribution,
                minor_attribution: quote.minor_attribution,
            })
            .collect();
        Self { quotes }
    }
}

/// Resolve the corpus path taking the environment override into account.
fn resolve_corpus_path() -> PathBuf {
    env::var_os(CORPUS_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CORPUS_PATH))
}

fn default_fallback_quote() -> Quote {
    Quote {
        text: "THE QUICK BROWN FOX JUMPS OVER THE LAZY DOG".into(),
        major_attribution: "ANONYMOUS".into(),
        minor_attribution: "Typing drill".into(),
    }
}

/// Built-in quote set shipped with the library.
fn default_quotes() -> Vec<Quote> {
    vec![
        Quote {
            text: "THE QUICK BROWN FOX JUMPS OVER THE LAZY DOG".into(),
            major_attribution: "ANONYMOUS".into(),
            minor_attribution: "Typing drill".into(),
        },
        Quote {
            text: "A JOURNEY OF A THOUSAND MILES BEGINS WITH A SINGLE STEP".into(),
            major_attribution: "LAO TZU".into(),
            minor_attribution: "Tao Te Ching".into(),
        },
        Quote {
            text: "CLEOPATRA ASCENDED THE THRONE AT 18 AFTER HER FATHERS DEATH".into(),
            major_attribution: "ANONYMOUS".into(),
            minor_attribution: "Historical miscellany".into(),
        },
        Quote {
            text: "LEONARDO DA VINCI WAS BORN IN 1452 NEAR FLORENCE".into(),
            major_attribution: "ANONYMOUS".into(),
            minor_attribution: "Historical miscellany".into(),
        },
        Quote {
            text: "ABRAHAM LINCOLN DELIVERED THE GETTYSBURG ADDRESS IN 1863".into(),
            major_attribution: "ANONYMOUS".into(),
            minor_attribution: "Historical miscellany".into(),
        },
    ]
}

//! Substitution-cipher primitives: mapping generation, encryption, masked
//! display rendering, frequency tables, and hint candidate selection.
//!
//! Everything here is a pure function over its inputs; game state lives in
//! [`crate::state`].

use std::collections::{BTreeMap, BTreeSet};

use indexmap::IndexMap;
use rand::seq::{IndexedRandom, SliceRandom};
use thiserror::Error;

/// The 26 uppercase letters every mapping is a permutation of.
pub const ALPHABET: [char; 26] = [
    'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'I', 'J', 'K', 'L', 'M', 'N', 'O', 'P', 'Q', 'R', 'S',
    'T', 'U', 'V', 'W', 'X', 'Y', 'Z',
];

/// Glyph emitted for letters the player has not yet resolved.
pub const MASK_GLYPH: char = '?';

/// Error raised when a persisted mapping cannot be rebuilt into a bijection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MappingError {
    /// A plaintext letter of the alphabet has no entry in the forward map.
    #[error("mapping has no entry for letter `{0}`")]
    MissingLetter(char),
    /// Two plaintext letters map to the same cipher letter.
    #[error("cipher letter `{0}` is the image of more than one letter")]
    DuplicateImage(char),
    /// The map contains a key or value outside `A..=Z`.
    #[error("mapping contains out-of-alphabet character `{0}`")]
    OutOfAlphabet(char),
}

/// A bijection between the alphabet and itself, kept alongside its inverse.
///
/// The only constructors are [`LetterMapping::random`] and
/// [`LetterMapping::from_forward`], so a value of this type is always a valid
/// bijection and `reverse[forward[x]] == x` holds for every letter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LetterMapping {
    forward: BTreeMap<char, char>,
    reverse: BTreeMap<char, char>,
}

impl LetterMapping {
    /// Draw a uniformly random permutation of the alphabet.
    pub fn random() -> Self {
        let mut images = ALPHABET.to_vec();
        let mut rng = rand::rng();
        images.shuffle(&mut rng);

        let forward: BTreeMap<char, char> = ALPHABET.iter().copied().zip(images).collect();
        let reverse = forward.iter().map(|(&k, &v)| (v, k)).collect();
        Self { forward, reverse }
    }

    /// Rebuild a mapping from a persisted forward table, recomputing the
    /// inverse rather than trusting a stored one.
    pub fn from_forward(forward: BTreeMap<char, char>) -> Result<Self, MappingError> {
        let mut reverse = BTreeMap::new();
        for (&plain, &cipher) in &forward {
            if !plain.is_ascii_uppercase() {
                return Err(MappingError::OutOfAlphabet(plain));
            }
            if !cipher.is_ascii_uppercase() {
                return Err(MappingError::OutOfAlphabet(cipher));
            }
            if reverse.insert(cipher, plain).is_some() {
                return Err(MappingError::DuplicateImage(cipher));
            }
        }
        for letter in ALPHABET {
            if !forward.contains_key(&letter) {
                return Err(MappingError::MissingLetter(letter));
            }
        }
        Ok(Self { forward, reverse })
    }

    /// Cipher letter standing for `plain`, if `plain` is in the alphabet.
    pub fn cipher_for(&self, plain: char) -> Option<char> {
        self.forward.get(&plain).copied()
    }

    /// Plaintext letter that `cipher` stands for, if `cipher` is in the alphabet.
    pub fn plain_for(&self, cipher: char) -> Option<char> {
        self.reverse.get(&cipher).copied()
    }

    /// The plaintext → cipher table.
    pub fn forward(&self) -> &BTreeMap<char, char> {
        &self.forward
    }

    /// The cipher → plaintext table.
    pub fn reverse(&self) -> &BTreeMap<char, char> {
        &self.reverse
    }
}

/// Encrypt `text` with `mapping`, uppercasing first. Non-alphabetic
/// characters pass through verbatim.
pub fn encrypt(text: &str, mapping: &LetterMapping) -> String {
    text.chars()
        .map(|c| {
            let upper = c.to_ascii_uppercase();
            mapping.cipher_for(upper).unwrap_or(c)
        })
        .collect()
}

/// Invert [`encrypt`]: substitute each cipher letter back to its plaintext.
pub fn decrypt(text: &str, mapping: &LetterMapping) -> String {
    text.chars()
        .map(|c| mapping.plain_for(c).unwrap_or(c))
        .collect()
}

/// Render the player-facing display of an encrypted text.
///
/// Revealed cipher letters show their plaintext, unrevealed letters show
/// [`MASK_GLYPH`], everything else passes through. Deterministic and
/// idempotent for identical inputs.
pub fn render_display(
    encrypted: &str,
    correctly_guessed: &BTreeSet<char>,
    mapping: &LetterMapping,
) -> String {
    encrypted
        .chars()
        .map(|c| {
            if !c.is_ascii_alphabetic() {
                c
            } else if correctly_guessed.contains(&c) {
                mapping.plain_for(c).unwrap_or(MASK_GLYPH)
            } else {
                MASK_GLYPH
            }
        })
        .collect()
}

/// Count each alphabetic character of `text`, case-folded.
///
/// The table always holds all 26 letters in alphabet order, with explicit
/// zeros for letters that do not occur.
pub fn letter_frequency(text: &str) -> IndexMap<char, u32> {
    let mut table: IndexMap<char, u32> = ALPHABET.iter().map(|&c| (c, 0)).collect();
    for c in text.chars() {
        let upper = c.to_ascii_uppercase();
        if let Some(count) = table.get_mut(&upper) {
            *count += 1;
        }
    }
    table
}

/// Distinct cipher letters occurring in `encrypted`.
pub fn cipher_letters(encrypted: &str) -> BTreeSet<char> {
    encrypted.chars().filter(char::is_ascii_alphabetic).collect()
}

/// Pick a uniformly random hint candidate: a cipher letter that occurs in
/// `encrypted` and has not been guessed yet.
///
/// `None` means every occurring letter is already revealed, the normal
/// terminal "no hints left" condition.
pub fn select_hint_candidate(
    mapping: &LetterMapping,
    correctly_guessed: &BTreeSet<char>,
    encrypted: &str,
) -> Option<char> {
    let candidates: Vec<char> = mapping
        .reverse
        .keys()
        .copied()
        .filter(|c| !correctly_guessed.contains(c))
        .filter(|c| encrypted.contains(*c))
        .collect();

    let mut rng = rand::rng();
    candidates.choose(&mut rng).copied()
}

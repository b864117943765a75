//! Readable pseudo-random text substitution used by the cipher engine.
//!
//! The scrambled string keeps the shape of the original: same character
//! count, same number of spaces, same line count, and the original casing
//! applied positionally over the replacement letters. The letters themselves
//! alternate vowels and consonants so the output still reads like language.
//! Lines that carry no letters worth hiding (whitespace, digits, dots) pass
//! through unchanged.
//!
//! Results are cached per distinct input line for the lifetime of one
//! scrambler, so the same source text ciphers identically everywhere in one
//! document run while staying unrecoverable without the original. The cache
//! dies with the scrambler; nothing leaks across documents.
use std::collections::HashMap;

use once_cell::sync::Lazy;
use rand::rngs::StdRng;
use rand::seq::index;
use rand::{Rng, SeedableRng};
use regex::Regex;

static IGNORABLE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[\s\d\n\r\.]*$").unwrap());

const VOWELS: &[u8] = b"aeiou";
const CONSONANTS: &[u8] = b"bcdfghjklmnpqrstvwxyz";

/// True for input that should survive a cipher pass untouched.
pub fn is_ignorable(input: &str) -> bool {
    IGNORABLE_RE.is_match(input)
}

pub struct ReadableScrambler {
    rng: StdRng,
    cache: HashMap<String, String>,
}

impl ReadableScrambler {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
            cache: HashMap::new(),
        }
    }

    /// Deterministic scrambler for reproducible output.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            cache: HashMap::new(),
        }
    }

    /// Scramble a value line by line, preserving the line count.
    pub fn scramble(&mut self, input: &str) -> String {
        if input.trim().is_empty() {
            return input.to_string();
        }
        let lines: Vec<String> = input
            .split('\n')
            .map(|line| self.scramble_line(line))
            .collect();
        lines.join("\n")
    }

    fn scramble_line(&mut self, line: &str) -> String {
        if is_ignorable(line) {
            return line.to_string();
        }
        if let Some(hit) = self.cache.get(line) {
            return hit.clone();
        }

        // Lengths are counted in characters so multibyte input keeps its
        // visible width.
        let chars: Vec<char> = line.chars().collect();
        let space_count = chars.iter().filter(|&&c| c == ' ').count();
        let non_space = chars.len() - space_count;
        if non_space == 0 {
            return line.to_string();
        }

        // One word per space gap, but never more words than letters to put
        // in them.
        let word_count = (space_count + 1).min(non_space);
        let mut letters = Vec::with_capacity(non_space);
        for length in self.word_lengths(non_space, word_count) {
            self.push_pseudo_word(length, &mut letters);
        }

        // Spaces land at distinct positions drawn from everywhere but the
        // first slot, so the line never starts with one.
        let total = chars.len();
        let mut is_space = vec![false; total];
        for picked in index::sample(&mut self.rng, total - 1, space_count) {
            is_space[picked + 1] = true;
        }

        let mut out = Vec::with_capacity(total);
        let mut next_letter = 0;
        for slot_is_space in is_space {
            if slot_is_space {
                out.push(' ');
            } else {
                out.push(letters[next_letter]);
                next_letter += 1;
            }
        }

        apply_casing(&chars, &mut out);

        let result: String = out.into_iter().collect();
        self.cache.insert(line.to_string(), result.clone());
        result
    }

    /// Split `total` letters into `words` lengths, each at least one.
    fn word_lengths(&mut self, total: usize, words: usize) -> Vec<usize> {
        let mut lengths = vec![1usize; words];
        for _ in 0..total - words {
            let index = self.rng.random_range(0..words);
            lengths[index] += 1;
        }
        lengths
    }

    fn push_pseudo_word(&mut self, length: usize, out: &mut Vec<char>) {
        // A single-letter word is always a vowel.
        if length == 1 {
            out.push(VOWELS[self.rng.random_range(0..VOWELS.len())] as char);
            return;
        }
        let start_with_vowel = self.rng.random_bool(0.5);
        for i in 0..length {
            let set = if (i % 2 == 0) == start_with_vowel {
                VOWELS
            } else {
                CONSONANTS
            };
            out.push(set[self.rng.random_range(0..set.len())] as char);
        }
    }
}

impl Default for ReadableScrambler {
    fn default() -> Self {
        Self::new()
    }
}

/// Transfer the original's per-character casing onto the scrambled letters,
/// matched by non-space position.
fn apply_casing(original: &[char], out: &mut [char]) {
    let casing: Vec<bool> = original
        .iter()
        .filter(|&&c| c != ' ')
        .map(|c| c.is_uppercase())
        .collect();

    let mut non_space_index = 0;
    for c in out.iter_mut() {
        if *c == ' ' {
            continue;
        }
        if non_space_index < casing.len() && casing[non_space_index] {
            *c = c.to_ascii_uppercase();
        } else {
            *c = c.to_ascii_lowercase();
        }
        non_space_index += 1;
    }
}

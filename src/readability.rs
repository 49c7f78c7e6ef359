//! Readability indicators for task descriptions
//!
//! Syllables are approximated for Portuguese text: vowels (accented ones
//! included) are counted, each adjacent vowel pair takes off half a
//! syllable, and so does a final `e`.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use once_cell::sync::Lazy;

const LETTERS: &str = "abcdefghijklmnopqrstuvwxyzáàâãéêíóôõúç";
const VOWELS: &str = "aeiouáàâãéêíóôõúç";
const PLAIN_VOWELS: &str = "aeiou";

/// Words treated as easy by the difficult-word count.
static COMMON_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "a", "e", "o", "as", "os", "um", "uma", "de", "do", "da", "dos", "das", "em", "no", "na",
        "nos", "nas", "para", "por", "com", "sem", "sobre", "entre", "até", "desde", "durante",
        "após", "antes", "depois", "que", "qual", "quais", "quando", "onde", "como", "porque",
        "se", "mas", "ou", "nem", "também", "já", "ainda", "sempre", "nunca", "muito", "pouco",
        "mais", "menos", "bem", "mal", "melhor", "pior", "ser", "estar", "ter", "haver", "fazer",
        "ir", "vir", "dar", "ver", "saber", "poder", "querer", "dizer", "falar", "pensar",
        "achar", "ficar", "deixar", "passar", "chegar", "sair", "entrar", "eu", "tu", "ele",
        "ela", "nós", "vós", "eles", "elas", "me", "te", "vos", "lhe", "lhes", "meu", "teu",
        "seu", "nosso", "vosso", "minha", "tua", "sua", "nossa", "vossa", "este", "esta",
        "esse", "essa", "aquele", "aquela", "isto", "isso", "aquilo", "mesmo", "próprio",
        "outro", "outra", "todo", "toda", "alguns", "algumas", "muitos", "muitas", "poucos",
        "poucas", "cada", "qualquer", "sistema", "dados", "usuário", "função", "método",
        "classe", "objeto", "arquivo", "código", "programa",
    ]
    .into_iter()
    .collect()
});

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadabilityMetrics {
    pub gunning_fog: f64,
    pub flesch_reading_ease: f64,
    pub flesch_kincaid_grade: f64,
    pub smog_index: f64,
    pub coleman_liau_index: f64,
    pub automated_readability_index: f64,
    pub dale_chall_readability_score: f64,
    pub difficult_words: usize,
    pub linsear_write_formula: f64,
    pub word_count: usize,
    pub sentence_count: usize,
    pub syllable_count: usize,
    pub character_count: usize,
}

/// Reading-level label for a score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReadabilityLevel {
    pub level: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<&'static str>,
}

fn letters_only(word: &str) -> String {
    word.to_lowercase()
        .chars()
        .filter(|c| LETTERS.contains(*c))
        .collect()
}

/// Approximate syllable count of a single word; 0 for words with no letters.
pub fn count_syllables(word: &str) -> usize {
    let word = letters_only(word);
    let chars: Vec<char> = word.chars().collect();

    if chars.is_empty() {
        return 0;
    }
    if chars.len() <= 2 {
        return 1;
    }

    let mut syllables = chars.iter().filter(|c| VOWELS.contains(**c)).count() as f64;

    // Non-overlapping pairs of plain vowels
    let mut diphthongs = 0;
    let mut i = 0;
    while i + 1 < chars.len() {
        if PLAIN_VOWELS.contains(chars[i]) && PLAIN_VOWELS.contains(chars[i + 1]) {
            diphthongs += 1;
            i += 2;
        } else {
            i += 1;
        }
    }
    syllables -= diphthongs as f64 * 0.5;

    if word.ends_with('e') && syllables > 1.0 {
        syllables -= 0.5;
    }

    (syllables.round() as usize).max(1)
}

/// Runs of sentence terminators; text without any counts as one sentence.
fn count_sentences(text: &str) -> usize {
    let mut count = 0;
    let mut in_run = false;
    for c in text.chars() {
        let terminator = matches!(c, '.' | '!' | '?');
        if terminator && !in_run {
            count += 1;
        }
        in_run = terminator;
    }
    count.max(1)
}

fn count_difficult_words(text: &str) -> usize {
    text.split_whitespace()
        .map(letters_only)
        .filter(|w| !w.is_empty() && !COMMON_WORDS.contains(w.as_str()))
        .count()
}

pub fn calculate_readability_metrics(text: &str) -> ReadabilityMetrics {
    if text.trim().is_empty() {
        return ReadabilityMetrics::default();
    }

    let words: Vec<&str> = text.split_whitespace().collect();
    let word_count = words.len();
    let sentence_count = count_sentences(text);
    let syllable_count: usize = words.iter().map(|w| count_syllables(w)).sum();
    let character_count = text.chars().filter(|c| !c.is_whitespace()).count();
    let difficult_words = count_difficult_words(text);
    let complex_words = words.iter().filter(|w| count_syllables(w) >= 3).count();

    let w = word_count as f64;
    let s = sentence_count as f64;
    let syl = syllable_count as f64;
    let chars = character_count as f64;
    let complex = complex_words as f64;
    let difficult = difficult_words as f64;

    let words_per_sentence = w / s;
    let syllables_per_word = syl / w;

    let dale_chall_pct = difficult / w * 100.0;
    let mut dale_chall = 0.1579 * dale_chall_pct + 0.0496 * words_per_sentence;
    if dale_chall_pct > 5.0 {
        dale_chall += 3.6365;
    }

    let linsear_raw = ((w - complex) + complex * 3.0) / s;
    let linsear = if linsear_raw > 20.0 {
        linsear_raw / 2.0
    } else {
        (linsear_raw - 2.0) / 2.0
    };

    ReadabilityMetrics {
        gunning_fog: 0.4 * (words_per_sentence + complex / w * 100.0),
        flesch_reading_ease: 206.835 - 1.015 * words_per_sentence - 84.6 * syllables_per_word,
        flesch_kincaid_grade: 0.39 * words_per_sentence + 11.8 * syllables_per_word - 15.59,
        smog_index: 1.043 * (complex / s * 30.0).sqrt() + 3.1291,
        coleman_liau_index: 0.0588 * (chars / w * 100.0) - 0.296 * (s / w * 100.0) - 15.8,
        automated_readability_index: 4.71 * (chars / w) + 0.5 * words_per_sentence - 21.43,
        dale_chall_readability_score: dale_chall,
        difficult_words,
        linsear_write_formula: linsear,
        word_count,
        sentence_count,
        syllable_count,
        character_count,
    }
}

pub fn interpret_flesch_reading_ease(score: f64) -> ReadabilityLevel {
    let (level, description) = match score {
        s if s >= 90.0 => ("Very easy", "Easily understood by 11-year-old students"),
        s if s >= 80.0 => ("Easy", "Easily understood by 13-year-old students"),
        s if s >= 70.0 => ("Fairly easy", "Easily understood by 15-year-old students"),
        s if s >= 60.0 => ("Standard", "Easily understood by 17-year-old students"),
        s if s >= 50.0 => ("Fairly difficult", "Understood by university students"),
        s if s >= 30.0 => ("Difficult", "Understood by university graduates"),
        _ => ("Very difficult", "Understood by postgraduates"),
    };
    ReadabilityLevel {
        level,
        description: Some(description),
    }
}

pub fn interpret_flesch_kincaid_grade(grade: f64) -> ReadabilityLevel {
    let level = match grade {
        g if g <= 6.0 => "Elementary school",
        g if g <= 9.0 => "Middle school",
        g if g <= 12.0 => "High school",
        g if g <= 16.0 => "College",
        _ => "Postgraduate",
    };
    ReadabilityLevel {
        level,
        description: None,
    }
}

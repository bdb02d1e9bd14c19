//! The fixed catalog of similarity comparators a genome can choose from.
//!
//! The evolutionary core only cares about comparator identity. The
//! similarity functions here back the bundled in-memory engine and are
//! deliberately compact.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use crate::error::LinktuneError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ComparatorKind {
    DiceCoefficient,
    Different,
    Exact,
    JaroWinkler,
    JaroWinklerTokenized,
    Levenshtein,
    Numeric,
    PersonName,
    Soundex,
    WeightedLevenshtein,
    Norphone,
    Metaphone,
    QGram,
    Geoposition,
}

impl ComparatorKind {
    pub const ALL: [ComparatorKind; 14] = [
        ComparatorKind::DiceCoefficient,
        ComparatorKind::Different,
        ComparatorKind::Exact,
        ComparatorKind::JaroWinkler,
        ComparatorKind::JaroWinklerTokenized,
        ComparatorKind::Levenshtein,
        ComparatorKind::Numeric,
        ComparatorKind::PersonName,
        ComparatorKind::Soundex,
        ComparatorKind::WeightedLevenshtein,
        ComparatorKind::Norphone,
        ComparatorKind::Metaphone,
        ComparatorKind::QGram,
        ComparatorKind::Geoposition,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ComparatorKind::DiceCoefficient => "DiceCoefficient",
            ComparatorKind::Different => "Different",
            ComparatorKind::Exact => "Exact",
            ComparatorKind::JaroWinkler => "JaroWinkler",
            ComparatorKind::JaroWinklerTokenized => "JaroWinklerTokenized",
            ComparatorKind::Levenshtein => "Levenshtein",
            ComparatorKind::Numeric => "Numeric",
            ComparatorKind::PersonName => "PersonName",
            ComparatorKind::Soundex => "Soundex",
            ComparatorKind::WeightedLevenshtein => "WeightedLevenshtein",
            ComparatorKind::Norphone => "Norphone",
            ComparatorKind::Metaphone => "Metaphone",
            ComparatorKind::QGram => "QGram",
            ComparatorKind::Geoposition => "Geoposition",
        }
    }

    /// Similarity of two values in [0, 1].
    pub fn compare(self, v1: &str, v2: &str) -> f64 {
        match self {
            ComparatorKind::DiceCoefficient => dice_coefficient(v1, v2),
            ComparatorKind::Different => {
                if v1 == v2 {
                    0.0
                } else {
                    1.0
                }
            }
            ComparatorKind::Exact => {
                if v1 == v2 {
                    1.0
                } else {
                    0.0
                }
            }
            ComparatorKind::JaroWinkler => jaro_winkler(v1, v2),
            ComparatorKind::JaroWinklerTokenized => jaro_winkler_tokenized(v1, v2),
            ComparatorKind::Levenshtein => levenshtein_similarity(v1, v2, |_| 1.0),
            ComparatorKind::Numeric => numeric(v1, v2),
            ComparatorKind::PersonName => person_name(v1, v2),
            ComparatorKind::Soundex => phonetic(v1, v2, soundex),
            ComparatorKind::WeightedLevenshtein => levenshtein_similarity(v1, v2, char_weight),
            ComparatorKind::Norphone => phonetic(v1, v2, norphone),
            ComparatorKind::Metaphone => phonetic(v1, v2, metaphone),
            ComparatorKind::QGram => qgram(v1, v2),
            ComparatorKind::Geoposition => geoposition(v1, v2),
        }
    }
}

impl fmt::Display for ComparatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ComparatorKind {
    type Err = LinktuneError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().trim_end_matches("Comparator");
        ComparatorKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| LinktuneError::UnknownComparator(s.to_string()))
    }
}

fn tokens(value: &str) -> Vec<String> {
    value.split_whitespace().map(str::to_lowercase).collect()
}

fn dice_coefficient(v1: &str, v2: &str) -> f64 {
    if v1 == v2 {
        return 1.0;
    }
    let t1: HashSet<String> = tokens(v1).into_iter().collect();
    let t2: HashSet<String> = tokens(v2).into_iter().collect();
    if t1.is_empty() || t2.is_empty() {
        return 0.0;
    }
    let common = t1.intersection(&t2).count();
    (2 * common) as f64 / (t1.len() + t2.len()) as f64
}

fn char_weight(ch: char) -> f64 {
    if ch.is_ascii_digit() {
        2.0
    } else if ch.is_alphabetic() {
        1.0
    } else {
        0.1
    }
}

/// Edit distance with per-character weights, normalised by the longer string.
fn levenshtein_similarity(v1: &str, v2: &str, weight: impl Fn(char) -> f64) -> f64 {
    if v1 == v2 {
        return 1.0;
    }
    let a: Vec<char> = v1.chars().collect();
    let b: Vec<char> = v2.chars().collect();
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let mut prev: Vec<f64> = Vec::with_capacity(b.len() + 1);
    prev.push(0.0);
    for &ch in &b {
        let last = prev[prev.len() - 1];
        prev.push(last + weight(ch));
    }
    let mut curr = vec![0.0; b.len() + 1];

    for &ca in &a {
        curr[0] = prev[0] + weight(ca);
        for (j, &cb) in b.iter().enumerate() {
            let substitution = if ca == cb { 0.0 } else { weight(ca).max(weight(cb)) };
            curr[j + 1] = (prev[j] + substitution)
                .min(prev[j + 1] + weight(ca))
                .min(curr[j] + weight(cb));
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    let longest = a.len().max(b.len()) as f64;
    (1.0 - prev[b.len()] / longest).clamp(0.0, 1.0)
}

fn jaro(a: &[char], b: &[char]) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let window = (a.len().max(b.len()) / 2).saturating_sub(1);
    let mut a_matched = vec![false; a.len()];
    let mut b_matched = vec![false; b.len()];
    let mut matches = 0usize;

    for (i, &ca) in a.iter().enumerate() {
        let start = i.saturating_sub(window);
        let end = (i + window + 1).min(b.len());
        for j in start..end {
            if !b_matched[j] && b[j] == ca {
                a_matched[i] = true;
                b_matched[j] = true;
                matches += 1;
                break;
            }
        }
    }
    if matches == 0 {
        return 0.0;
    }

    let a_seq = a.iter().zip(&a_matched).filter(|(_, m)| **m).map(|(c, _)| c);
    let b_seq = b.iter().zip(&b_matched).filter(|(_, m)| **m).map(|(c, _)| c);
    let transpositions = a_seq.zip(b_seq).filter(|(x, y)| x != y).count() / 2;

    let m = matches as f64;
    (m / a.len() as f64 + m / b.len() as f64 + (m - transpositions as f64) / m) / 3.0
}

fn jaro_winkler(v1: &str, v2: &str) -> f64 {
    if v1 == v2 {
        return 1.0;
    }
    let a: Vec<char> = v1.chars().collect();
    let b: Vec<char> = v2.chars().collect();
    let j = jaro(&a, &b);
    let prefix = a.iter().zip(&b).take(4).take_while(|(x, y)| x == y).count();
    j + prefix as f64 * 0.1 * (1.0 - j)
}

fn jaro_winkler_tokenized(v1: &str, v2: &str) -> f64 {
    let (t1, t2) = (tokens(v1), tokens(v2));
    if t1.is_empty() || t2.is_empty() {
        return 0.0;
    }
    let (short, long) = if t1.len() <= t2.len() { (&t1, &t2) } else { (&t2, &t1) };
    let total: f64 = short
        .iter()
        .map(|s| long.iter().map(|l| jaro_winkler(s, l)).fold(0.0, f64::max))
        .sum();
    total / long.len() as f64
}

fn numeric(v1: &str, v2: &str) -> f64 {
    let (Ok(d1), Ok(d2)) = (v1.trim().parse::<f64>(), v2.trim().parse::<f64>()) else {
        return 0.0;
    };
    if d1 == d2 {
        return 1.0;
    }
    let (small, large) = (d1.abs().min(d2.abs()), d1.abs().max(d2.abs()));
    if large == 0.0 || d1.signum() != d2.signum() {
        return 0.0;
    }
    small / large
}

fn person_name(v1: &str, v2: &str) -> f64 {
    let clean = |v: &str| -> Vec<String> {
        tokens(&v.replace(['.', ',', '-'], " "))
    };
    let (t1, t2) = (clean(v1), clean(v2));
    if t1 == t2 {
        return 1.0;
    }
    if t1.is_empty() || t2.is_empty() {
        return 0.0;
    }
    if t1.len() == t2.len() {
        let sum: f64 = t1
            .iter()
            .zip(&t2)
            .map(|(a, b)| {
                // an initial matches the full name it abbreviates
                if (a.len() == 1 || b.len() == 1) && a.chars().next() == b.chars().next() {
                    0.9
                } else {
                    levenshtein_similarity(a, b, |_| 1.0)
                }
            })
            .sum();
        return sum / t1.len() as f64;
    }
    dice_coefficient(&t1.join(" "), &t2.join(" ")) * 0.9
}

fn phonetic(v1: &str, v2: &str, key: fn(&str) -> String) -> f64 {
    if v1 == v2 {
        return 1.0;
    }
    let (k1, k2) = (key(v1), key(v2));
    if !k1.is_empty() && k1 == k2 {
        0.9
    } else {
        0.0
    }
}

fn soundex(value: &str) -> String {
    let code = |ch: char| match ch {
        'B' | 'F' | 'P' | 'V' => Some('1'),
        'C' | 'G' | 'J' | 'K' | 'Q' | 'S' | 'X' | 'Z' => Some('2'),
        'D' | 'T' => Some('3'),
        'L' => Some('4'),
        'M' | 'N' => Some('5'),
        'R' => Some('6'),
        _ => None,
    };
    let letters: Vec<char> = value
        .chars()
        .filter(|c| c.is_ascii_alphabetic())
        .map(|c| c.to_ascii_uppercase())
        .collect();
    let Some(&first) = letters.first() else {
        return String::new();
    };

    let mut key = String::from(first);
    let mut last = code(first);
    for &ch in &letters[1..] {
        let digit = code(ch);
        if digit.is_some() && digit != last {
            key.extend(digit);
        }
        if ch != 'H' && ch != 'W' {
            last = digit;
        }
        if key.len() == 4 {
            break;
        }
    }
    while key.len() < 4 {
        key.push('0');
    }
    key
}

fn is_vowel(ch: char) -> bool {
    matches!(ch, 'A' | 'E' | 'I' | 'O' | 'U' | 'Y' | 'Æ' | 'Ø' | 'Å')
}

/// Reduced English metaphone key.
fn metaphone(value: &str) -> String {
    let w: Vec<char> = value
        .to_uppercase()
        .chars()
        .filter(|c| c.is_ascii_alphabetic())
        .collect();
    let at = |i: usize| w.get(i).copied().unwrap_or(' ');
    let mut key = String::new();

    let mut i = 0;
    while i < w.len() {
        let ch = w[i];
        let next = at(i + 1);
        if i > 0 && ch == w[i - 1] && ch != 'C' {
            i += 1;
            continue;
        }
        match ch {
            _ if is_vowel(ch) => {
                if i == 0 {
                    key.push(ch);
                }
            }
            'C' if matches!(next, 'I' | 'E' | 'Y') => key.push('S'),
            'C' if next == 'H' => {
                key.push('X');
                i += 1;
            }
            'C' | 'K' | 'Q' => {
                if !(ch == 'K' && i > 0 && w[i - 1] == 'C') {
                    key.push('K');
                }
            }
            'G' if matches!(next, 'I' | 'E' | 'Y') => key.push('J'),
            'G' if next == 'H' => i += 1,
            'D' if next == 'G' => {
                key.push('J');
                i += 1;
            }
            'P' if next == 'H' => {
                key.push('F');
                i += 1;
            }
            'S' if next == 'H' => {
                key.push('X');
                i += 1;
            }
            'T' if next == 'H' => {
                key.push('0');
                i += 1;
            }
            'W' | 'H' | 'Y' => {
                if is_vowel(next) {
                    key.push(ch);
                }
            }
            'X' => key.push_str("KS"),
            'Z' => key.push('S'),
            'V' => key.push('F'),
            _ => key.push(ch),
        }
        i += 1;
    }
    key
}

/// Reduced Norwegian phonetic key.
fn norphone(value: &str) -> String {
    let upper = value
        .to_uppercase()
        .replace("AA", "Å")
        .replace("SKJ", "X")
        .replace("KJ", "X")
        .replace("SJ", "X")
        .replace("HJ", "J")
        .replace("GJ", "J")
        .replace("TH", "T")
        .replace("CK", "K")
        .replace("PH", "F")
        .replace("CH", "K");
    let w: Vec<char> = upper.chars().filter(|c| c.is_alphabetic()).collect();
    let mut key = String::new();
    for (i, &ch) in w.iter().enumerate() {
        if i > 0 && w[i - 1] == ch {
            continue;
        }
        let mapped = match ch {
            _ if is_vowel(ch) => {
                if i == 0 {
                    Some('A')
                } else {
                    None
                }
            }
            'W' => Some('V'),
            'Z' => Some('S'),
            'Q' => Some('K'),
            'C' => Some(if matches!(w.get(i + 1), Some('E' | 'I' | 'Y')) { 'S' } else { 'K' }),
            'D' if i + 1 == w.len() && i > 0 && matches!(w[i - 1], 'R' | 'N' | 'L') => None,
            'H' => None,
            other => Some(other),
        };
        key.extend(mapped);
    }
    key
}

fn qgram(v1: &str, v2: &str) -> f64 {
    if v1 == v2 {
        return 1.0;
    }
    let grams = |v: &str| -> HashSet<(char, char)> {
        let chars: Vec<char> = v.to_lowercase().chars().collect();
        chars.windows(2).map(|w| (w[0], w[1])).collect()
    };
    let (g1, g2) = (grams(v1), grams(v2));
    if g1.is_empty() || g2.is_empty() {
        return 0.0;
    }
    let common = g1.intersection(&g2).count();
    (2 * common) as f64 / (g1.len() + g2.len()) as f64
}

const GEO_MAX_DISTANCE_METERS: f64 = 100.0;

fn geoposition(v1: &str, v2: &str) -> f64 {
    let parse = |v: &str| -> Option<(f64, f64)> {
        let (lat, lon) = v.split_once(',')?;
        Some((lat.trim().parse().ok()?, lon.trim().parse().ok()?))
    };
    let (Some((lat1, lon1)), Some((lat2, lon2))) = (parse(v1), parse(v2)) else {
        return 0.0;
    };

    let r = 6_371_000.0_f64;
    let (p1, p2) = (lat1.to_radians(), lat2.to_radians());
    let dp = (lat2 - lat1).to_radians();
    let dl = (lon2 - lon1).to_radians();
    let h = (dp / 2.0).sin().powi(2) + p1.cos() * p2.cos() * (dl / 2.0).sin().powi(2);
    let distance = 2.0 * r * h.sqrt().asin();

    (1.0 - distance / GEO_MAX_DISTANCE_METERS).max(0.0)
}

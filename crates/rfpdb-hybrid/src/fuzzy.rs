//! Partial fuzzy similarity: the best normalized Levenshtein similarity
//! between the shorter string and any equally long window of the longer one.
//!
//! For equal-length strings the edit distance is at least the number of
//! query characters the window cannot supply, so `shared / m` bounds a
//! window's similarity. The window is slid with running character counts and
//! the edit distance is only computed where that bound beats the best so far.

use std::collections::HashMap;

/// Running multiset overlap between a sliding window and the query.
struct WindowOverlap {
    need: HashMap<char, usize>,
    have: HashMap<char, usize>,
    shared: usize,
}

impl WindowOverlap {
    fn new(query: &[char]) -> Self {
        let mut need = HashMap::new();
        for &c in query {
            *need.entry(c).or_insert(0) += 1;
        }
        Self { need, have: HashMap::new(), shared: 0 }
    }

    fn push(&mut self, c: char) {
        let Some(&need) = self.need.get(&c) else { return };
        let have = self.have.entry(c).or_insert(0);
        if *have < need {
            self.shared += 1;
        }
        *have += 1;
    }

    fn pop(&mut self, c: char) {
        let Some(&need) = self.need.get(&c) else { return };
        if let Some(have) = self.have.get_mut(&c) {
            *have -= 1;
            if *have < need {
                self.shared -= 1;
            }
        }
    }
}

pub fn partial_ratio(a: &str, b: &str) -> f32 {
    let (short, long) = if a.chars().count() <= b.chars().count() { (a, b) } else { (b, a) };
    let query: Vec<char> = short.chars().collect();
    let m = query.len();
    if m == 0 {
        return 0.0;
    }
    let text: Vec<char> = long.chars().collect();
    // byte offsets of every char boundary, including the end
    let bounds: Vec<usize> = long.char_indices().map(|(i, _)| i).chain(std::iter::once(long.len())).collect();

    let mut overlap = WindowOverlap::new(&query);
    for &c in &text[..m] {
        overlap.push(c);
    }
    let mut best = 0.0f64;
    for start in 0..=(text.len() - m) {
        if start > 0 {
            overlap.pop(text[start - 1]);
            overlap.push(text[start + m - 1]);
        }
        if overlap.shared as f64 / m as f64 <= best {
            continue;
        }
        let sim = strsim::normalized_levenshtein(short, &long[bounds[start]..bounds[start + m]]);
        if sim > best {
            best = sim;
            if best >= 1.0 {
                break;
            }
        }
    }
    best as f32
}

//! Single-edit neighbourhoods of a word (deletes, transposes, replaces, inserts).

use std::collections::HashSet;

const ALPHABET: &str = "abcdefghijklmnopqrstuvwxyz";

/// All strings one edit away from `word`.
pub(crate) fn edits1(word: &str) -> HashSet<String> {
    let chars: Vec<char> = word.chars().collect();
    let mut out = HashSet::new();

    for i in 0..=chars.len() {
        let (left, right) = chars.split_at(i);

        if !right.is_empty() {
            // delete
            out.insert(join(left, &right[1..], None));

            // replace
            for c in ALPHABET.chars() {
                out.insert(join(left, &right[1..], Some(c)));
            }
        }

        if right.len() > 1 {
            let mut swapped = String::with_capacity(word.len());
            swapped.extend(left);
            swapped.push(right[1]);
            swapped.push(right[0]);
            swapped.extend(&right[2..]);
            out.insert(swapped);
        }

        // insert
        for c in ALPHABET.chars() {
            out.insert(join(left, right, Some(c)));
        }
    }

    out.remove(word);
    out
}

fn join(left: &[char], right: &[char], middle: Option<char>) -> String {
    let mut s = String::with_capacity(left.len() + right.len() + 1);
    s.extend(left);
    if let Some(c) = middle {
        s.push(c);
    }
    s.extend(right);
    s
}

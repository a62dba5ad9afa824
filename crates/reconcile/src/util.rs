/// Levenshtein edit distance over Unicode scalar values.
///
/// Single-row dynamic programme: `row[j]` holds the distance between the
/// first `i` chars of `a` and the first `j` chars of `b`.
pub fn edit_distance(a: &[char], b: &[char]) -> usize {
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut row: Vec<usize> = (0..=b.len()).collect();

    for (i, &ca) in a.iter().enumerate() {
        let mut diagonal = row[0];
        row[0] = i + 1;
        for (j, &cb) in b.iter().enumerate() {
            let above = row[j + 1];
            let substitution = diagonal + usize::from(ca != cb);
            row[j + 1] = substitution.min(above + 1).min(row[j] + 1);
            diagonal = above;
        }
    }

    row[b.len()]
}

/// Lower-cases and splits into chars for case-insensitive comparison.
pub fn folded_chars(s: &str) -> Vec<char> {
    s.to_lowercase().chars().collect()
}

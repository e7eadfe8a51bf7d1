//! Rank-weighted voting across parallel annotation sources.

use std::borrow::Cow;

use ofl_types::{join_alternatives, split_alternatives, strip_digits};

/// Flat weight every source contributes per option. Large next to the
/// positional bonus, so agreement between sources outweighs source order.
const BASE_WEIGHT: usize = 100;

/// Merge competing candidate strings into the best-supported option(s).
///
/// Candidate `i` of `n` non-empty candidates adds `(n - i) + 100` to each of
/// its `|`-delimited options; the options tied at the maximum are returned
/// joined with `|`, in first-seen order. An option repeated inside one
/// candidate counts once. Empty candidates are ignored, and an
/// all-empty input yields an empty string. With `ignore_numbers`, digits are
/// removed from each candidate before it is split.
///
/// ```rust
/// use ofl_compare::vote;
///
/// assert_eq!(vote(&["a|b", "a"], false), "a");
/// assert_eq!(vote(&["a", "b"], false), "a");
/// assert_eq!(vote(&["a|b"], false), "a|b");
/// assert_eq!(vote(&["", ""], false), "");
/// ```
pub fn vote<S: AsRef<str>>(candidates: &[S], ignore_numbers: bool) -> String {
    join_alternatives(vote_options(candidates, ignore_numbers))
}

/// Like [`vote`], returning the winning options unjoined.
pub fn vote_options<S: AsRef<str>>(candidates: &[S], ignore_numbers: bool) -> Vec<String> {
    let sources: Vec<Cow<'_, str>> = candidates
        .iter()
        .map(AsRef::<str>::as_ref)
        .filter(|c| !c.is_empty())
        .map(|c| {
            if ignore_numbers {
                Cow::Owned(strip_digits(c))
            } else {
                Cow::Borrowed(c)
            }
        })
        .collect();

    let n = sources.len();
    let mut tally: Vec<(&str, usize)> = Vec::new();
    for (i, source) in sources.iter().enumerate() {
        let weight = (n - i) + BASE_WEIGHT;
        let mut seen: Vec<&str> = Vec::new();
        for option in split_alternatives(source) {
            if seen.contains(&option) {
                continue;
            }
            seen.push(option);
            match tally.iter_mut().find(|(o, _)| *o == option) {
                Some((_, score)) => *score += weight,
                None => tally.push((option, weight)),
            }
        }
    }

    let Some(max) = tally.iter().map(|(_, score)| *score).max() else {
        return Vec::new();
    };
    tally
        .into_iter()
        .filter(|(_, score)| *score == max)
        .map(|(option, _)| option.to_string())
        .collect()
}

//! Token-form canonicalization shared by lexicon building and lookup.

/// Written in place of a non-ASCII character the diacritic table cannot fold.
pub const PLACEHOLDER: char = '?';

const APOSTROPHES: [char; 2] = ['\'', '\u{2019}'];
const HYPHEN: char = '-';

/// Occurrences a punctuation mark needs in a lexicon before sniffing keeps it.
const SNIFF_MIN_OCCURRENCES: usize = 5;

/// How a [`Normalizer`] treats case, diacritics, and punctuation.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct NormalizerOptions {
    /// Keep case as written; fold to lowercase when false.
    pub uppercase: bool,
    /// Fold diacritics to plain ASCII.
    pub is_ascii: bool,
    /// Keep punctuation inside tokens that also contain letters or digits.
    pub pnc_in_tok: bool,
    /// Punctuation kept even when `pnc_in_tok` is false.
    pub pnc_in_tok_except: Vec<char>,
}

impl Default for NormalizerOptions {
    fn default() -> Self {
        let mut except = APOSTROPHES.to_vec();
        except.push(HYPHEN);
        Self {
            uppercase: false,
            is_ascii: false,
            pnc_in_tok: true,
            pnc_in_tok_except: except,
        }
    }
}

impl NormalizerOptions {
    /// Derive lookup options from the forms a lexicon actually contains.
    ///
    /// Case is kept if any form carries uppercase, diacritics are folded only
    /// when the whole lexicon is ASCII, and apostrophes or hyphens survive
    /// punctuation stripping only when the lexicon uses them often enough.
    pub fn sniff<'a, I>(forms: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut uppercase = false;
        let mut is_ascii = true;
        let mut apostrophes = 0usize;
        let mut hyphens = 0usize;
        for form in forms {
            uppercase |= form.chars().any(char::is_uppercase);
            is_ascii &= form.is_ascii();
            apostrophes += form.chars().filter(|c| APOSTROPHES.contains(c)).count();
            hyphens += form.chars().filter(|c| *c == HYPHEN).count();
        }

        let mut pnc_in_tok_except = Vec::new();
        if apostrophes > SNIFF_MIN_OCCURRENCES {
            pnc_in_tok_except.extend(APOSTROPHES);
        }
        if hyphens > SNIFF_MIN_OCCURRENCES {
            pnc_in_tok_except.push(HYPHEN);
        }

        Self {
            uppercase,
            is_ascii,
            pnc_in_tok: false,
            pnc_in_tok_except,
        }
    }
}

/// Canonicalizes raw tokens into lexicon matching keys.
///
/// Normalization never fails and is idempotent:
/// `normalize(normalize(x)) == normalize(x)`.
///
/// ```rust
/// use ofl_lexicon::{Normalizer, NormalizerOptions};
///
/// let n = Normalizer::new(NormalizerOptions {
///     is_ascii: true,
///     pnc_in_tok: false,
///     ..NormalizerOptions::default()
/// });
/// assert_eq!(n.normalize(" Çà-t,il "), "ca-til");
/// assert_eq!(n.normalize("..."), "...");
/// ```
#[derive(Clone, Debug, Default)]
pub struct Normalizer {
    options: NormalizerOptions,
}

impl Normalizer {
    pub fn new(options: NormalizerOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &NormalizerOptions {
        &self.options
    }

    pub fn normalize(&self, raw: &str) -> String {
        let mut folded = String::with_capacity(raw.len());
        for c in raw.trim().chars() {
            if self.options.uppercase {
                self.push_folded(&mut folded, c);
            } else {
                for lower in c.to_lowercase() {
                    self.push_folded(&mut folded, lower);
                }
            }
        }

        // All-punctuation tokens are kept whole.
        if self.options.pnc_in_tok || !folded.chars().any(char::is_alphanumeric) {
            return folded;
        }
        folded
            .chars()
            .filter(|c| c.is_alphanumeric() || self.preserves(*c))
            .collect()
    }

    fn push_folded(&self, out: &mut String, c: char) {
        if !self.options.is_ascii || c.is_ascii() {
            out.push(c);
            return;
        }
        match fold_diacritic(c) {
            Some(ascii) => out.push_str(ascii),
            None => out.push(PLACEHOLDER),
        }
    }

    fn preserves(&self, c: char) -> bool {
        (self.options.is_ascii && c == PLACEHOLDER) || self.options.pnc_in_tok_except.contains(&c)
    }
}

fn fold_diacritic(c: char) -> Option<&'static str> {
    let ascii = match c {
        'à' | 'á' | 'â' | 'ā' | 'ã' | 'ä' | 'å' => "a",
        'ç' | 'ć' => "c",
        'è' | 'é' | 'ê' | 'ē' | 'ẽ' | 'ë' => "e",
        'ì' | 'í' | 'î' | 'ī' | 'ĩ' | 'ï' => "i",
        'ñ' => "n",
        'ò' | 'ó' | 'ô' | 'ō' | 'õ' | 'ö' => "o",
        'ù' | 'ú' | 'û' | 'ū' | 'ũ' | 'ü' => "u",
        'ý' | 'ỳ' | 'ŷ' | 'ÿ' => "y",
        'À' | 'Á' | 'Â' | 'Ā' | 'Ã' | 'Ä' | 'Å' => "A",
        'Ç' | 'Ć' => "C",
        'È' | 'É' | 'Ê' | 'Ē' | 'Ẽ' | 'Ë' => "E",
        'Ì' | 'Í' | 'Î' | 'Ī' | 'Ĩ' | 'Ï' => "I",
        'Ñ' => "N",
        'Ò' | 'Ó' | 'Ô' | 'Ō' | 'Õ' | 'Ö' => "O",
        'Ù' | 'Ú' | 'Û' | 'Ū' | 'Ũ' | 'Ü' => "U",
        'Ý' | 'Ỳ' | 'Ŷ' | 'Ÿ' => "Y",
        'æ' => "ae",
        'Æ' => "AE",
        'œ' => "oe",
        'Œ' => "OE",
        'ß' => "ss",
        '\u{2019}' => "'",
        _ => return None,
    };
    Some(ascii)
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn arb_options() -> impl Strategy<Value = NormalizerOptions> {
        (any::<bool>(), any::<bool>(), any::<bool>(), any::<bool>()).prop_map(
            |(uppercase, is_ascii, pnc_in_tok, keep_marks)| NormalizerOptions {
                uppercase,
                is_ascii,
                pnc_in_tok,
                pnc_in_tok_except: if keep_marks {
                    vec!['\'', '\u{2019}', '-']
                } else {
                    Vec::new()
                },
            },
        )
    }

    proptest! {
        #[test]
        fn normalize_is_idempotent_for_generated_tokens(
            options in arb_options(),
            raw in "[ a-zA-Z0-9àéîÇÉœßæ’'\\-.,;!?«»@中İ]{0,16}",
        ) {
            let n = Normalizer::new(options);
            let once = n.normalize(&raw);
            prop_assert_eq!(n.normalize(&once), once);
        }
    }
}

//! Reconcile competing lemma annotations for one token at a time.
//!
//! - [`vote`] merges parallel tagger outputs by rank-weighted frequency.
//! - [`Disambiguator`] walks an ordered list of [`Resolver`]s over the gold,
//!   automatic, and lexicon evidence and returns a lemma with a [`Score`].
//! - [`attestation_filter`] demotes lemmas missing from a reference lexicon.
//! - [`Corrector`] rewrites known systematic errors in the final stream.
//!
//! ```rust
//! use ofl_compare::{Disambiguator, Score};
//!
//! let engine = Disambiguator::default();
//! let r = engine.score_lemmas(&["NOUN"], &[], &[], &["cat", "dog"], &["NOUN", "VERB"]);
//! assert_eq!((r.lemma.as_str(), r.score), ("cat", Score::UniquePos));
//! ```

mod attest;
mod correct;
mod resolve;
mod vote;

pub use attest::attestation_filter;
pub use correct::{CorrectionPass, CorrectionRule, Corrector, CorrectorError};
pub use ofl_types::Score;
pub use resolve::{
    AutoOnlyResolver, Disambiguator, Evidence, GoldResolver, LookupFallbackResolver,
    PosPassResolver, Resolution, Resolver, Simplification, SingleLookupResolver,
};
pub use vote::{vote, vote_options};

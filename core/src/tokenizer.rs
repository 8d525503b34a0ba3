use lazy_static::lazy_static;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    static ref RE: Regex = Regex::new(r"(?u)\p{L}[\p{L}\p{N}_']*").expect("valid regex");
    static ref STEMMER: Stemmer = Stemmer::create(Algorithm::English);
}

/// Turns a string into an ordered sequence of normalized terms.
pub trait TermTokenizer: Send + Sync {
    fn tokenize(&self, text: &str) -> Vec<String>;
}

/// NFKC + lowercase + English Snowball stemming. Stopwords are kept; the
/// indexing pipeline filters them separately.
#[derive(Debug, Default, Clone, Copy)]
pub struct StemmingTokenizer;

impl TermTokenizer for StemmingTokenizer {
    fn tokenize(&self, text: &str) -> Vec<String> {
        tokenize(text)
    }
}

pub fn tokenize(text: &str) -> Vec<String> {
    let normalized = text.nfkc().collect::<String>().to_lowercase();
    RE.find_iter(&normalized).map(|mat| stem(mat.as_str())).collect()
}

pub fn stem(word: &str) -> String {
    STEMMER.stem(word).into_owned()
}

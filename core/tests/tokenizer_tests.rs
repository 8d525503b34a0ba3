use searchcore::stopwords::{EnglishStopwords, StopwordSet};
use searchcore::tokenizer::{tokenize, StemmingTokenizer, TermTokenizer};

#[test]
fn it_normalizes_and_stems() {
    let words = tokenize("Running Runners RUN! The café's menu.");
    // Stemming to "run" should appear
    assert!(words.contains(&"run".to_string()));
    // Unicode normalization keeps the accented letter, lowercased
    assert!(words.iter().any(|w| w.starts_with("café")));
}

#[test]
fn it_keeps_stopwords_for_the_pipeline() {
    let words = StemmingTokenizer.tokenize("The quick brown fox and the lazy dog");
    assert_eq!(words.len(), 8);
    let kept: Vec<_> = words.iter().filter(|w| !EnglishStopwords.contains(w)).collect();
    assert!(!kept.iter().any(|w| *w == "the" || *w == "and"));
    assert_eq!(kept.len(), 5);
}

#[test]
fn it_folds_compatibility_forms() {
    // NFKC maps the "ﬁ" ligature to "fi"
    assert_eq!(tokenize("ﬁsh"), tokenize("fish"));
}

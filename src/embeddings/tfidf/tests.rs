use super::*;

const CORPUS: &str = "The borrow checker enforces ownership. Ownership rules keep memory safe. \
                      The compiler checks lifetimes and ownership at compile time.";

#[test]
fn stop_words_are_sorted() {
    assert!(ENGLISH_STOP_WORDS.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn tokenize_lowercases_and_filters() {
    let tokens = tokenize("The Rust compiler, a BORROW checker & x y_z!");
    assert_eq!(tokens, vec!["rust", "compiler", "borrow", "checker", "y_z"]);
}

#[test]
fn fit_builds_alphabetical_vocabulary() {
    let vectorizer = TfidfVectorizer::fitted(100, &[CORPUS]).expect("vectorizer should fit");

    assert!(vectorizer.is_fitted());
    let names = vectorizer.feature_names();
    let mut sorted = names.clone();
    sorted.sort_unstable();
    assert_eq!(names, sorted);
    assert!(names.contains(&"ownership"));
    assert!(!names.contains(&"the"));
}

#[test]
fn max_features_keeps_most_frequent_terms() {
    let vectorizer = TfidfVectorizer::fitted(1, &[CORPUS]).expect("vectorizer should fit");
    assert_eq!(vectorizer.feature_names(), vec!["ownership"]);

    // Ties are broken alphabetically
    let vectorizer =
        TfidfVectorizer::fitted(2, &["zebra apple mango"]).expect("vectorizer should fit");
    assert_eq!(vectorizer.feature_names(), vec!["apple", "mango"]);
}

#[test]
fn rows_are_l2_normalised() {
    let vectorizer = TfidfVectorizer::fitted(100, &[CORPUS]).expect("vectorizer should fit");
    let row = vectorizer
        .transform("ownership and the borrow checker")
        .expect("transform should succeed");

    assert_eq!(row.len(), vectorizer.vocabulary_size());
    let norm: f32 = row.iter().map(|v| v * v).sum::<f32>().sqrt();
    assert!((norm - 1.0).abs() < 1e-5);
}

#[test]
fn out_of_vocabulary_text_yields_zero_vector() {
    let vectorizer = TfidfVectorizer::fitted(100, &[CORPUS]).expect("vectorizer should fit");
    let row = vectorizer
        .transform("completely unrelated words")
        .expect("transform should succeed");
    assert!(row.iter().all(|&v| v == 0.0));
}

#[test]
fn smooth_idf_weights() {
    let vectorizer = TfidfVectorizer::fitted(100, &["apple banana", "apple cherry"])
        .expect("vectorizer should fit");

    let names = vectorizer.feature_names();
    assert_eq!(names, vec!["apple", "banana", "cherry"]);
    assert!((vectorizer.idf[0] - 1.0).abs() < 1e-6);
    let expected = (3.0_f32 / 2.0).ln() + 1.0;
    assert!((vectorizer.idf[1] - expected).abs() < 1e-6);
}

#[test]
fn unfitted_vectorizer_rejects_transform() {
    let vectorizer = TfidfVectorizer::default();
    assert!(!vectorizer.is_fitted());
    assert!(matches!(
        vectorizer.transform("anything"),
        Err(RagError::Embedding(_))
    ));
}

#[test]
fn stop_word_only_corpus_fails_to_fit() {
    let result = TfidfVectorizer::fitted(100, &["the and of to a"]);
    assert!(matches!(result, Err(RagError::Embedding(_))));
}

#[test]
fn fitting_is_deterministic_and_persists() {
    let first = TfidfVectorizer::fitted(100, &[CORPUS]).expect("vectorizer should fit");
    let second = TfidfVectorizer::fitted(100, &[CORPUS]).expect("vectorizer should fit");
    assert_eq!(first, second);

    let json = serde_json::to_string(&first).expect("should serialize vectorizer");
    let restored: TfidfVectorizer = serde_json::from_str(&json).expect("should deserialize");
    assert_eq!(
        restored.transform("borrow checker").expect("transform"),
        first.transform("borrow checker").expect("transform")
    );
}

use flipflop::alignment::{LOW_SIMILARITY_THRESHOLD, token_overlap};

#[test]
fn given_disjoint_texts_when_scored_then_similarity_is_zero() {
    let score = token_overlap("short bursts of memory", "long deep archives");

    assert_eq!(score, 0.0);
    assert!(score < LOW_SIMILARITY_THRESHOLD);
}

#[test]
fn given_identical_texts_when_scored_then_similarity_reaches_one() {
    let text = "Consolidation moves memories from the hippocampus to the cortex.";
    let score = token_overlap(text, text);

    assert!(score >= 1.0 - 1e-9, "score was {score}");
    assert!(score >= LOW_SIMILARITY_THRESHOLD);
}

#[test]
fn given_case_and_punctuation_differences_when_scored_then_they_are_ignored() {
    let score = token_overlap("Deep, DEEP learning!", "deep learning");

    assert!((score - 1.0).abs() < 1e-9, "score was {score}");
}

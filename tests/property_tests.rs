use proptest::prelude::*;

use vault_assistant::vault::chunker::TextChunker;
use vault_assistant::vault::parser::MarkdownParser;

fn word() -> impl Strategy<Value = String> {
    "[a-z]{1,12}"
}

fn prose() -> impl Strategy<Value = String> {
    proptest::collection::vec(word(), 1..120).prop_map(|words| words.join(" "))
}

fn markdown_ish() -> impl Strategy<Value = String> {
    proptest::collection::vec(
        prop_oneof![
            prose(),
            word().prop_map(|w| format!("#{}", w)),
            word().prop_map(|w| format!("[[{}]]", w)),
            word().prop_map(|w| format!("[[[[{}]]]]", w)),
            (word(), word()).prop_map(|(a, b)| format!("[[{}|{}]]", a, b)),
            (word(), word()).prop_map(|(a, b)| format!("[[{}|[[{}]]]]", a, b)),
            word().prop_map(|w| format!("%% {} %%", w)),
            Just("\n\n".to_string()),
            Just("\n\n\n\n".to_string()),
        ],
        1..40,
    )
    .prop_map(|parts| parts.join(" "))
}

proptest! {
    #[test]
    fn chunks_never_exceed_chunk_size(
        text in prose(),
        chunk_size in 10usize..200,
    ) {
        let overlap = chunk_size / 4;
        let chunker = TextChunker::new(chunk_size, overlap);
        for chunk in chunker.split(&text) {
            // A single unsplittable word longer than chunk_size is the only
            // permitted overflow.
            let is_single_word = !chunk.contains(' ');
            prop_assert!(
                chunk.chars().count() <= chunk_size || is_single_word,
                "oversized chunk: {:?}",
                chunk
            );
        }
    }

    #[test]
    fn chunking_preserves_every_word(text in prose()) {
        let chunker = TextChunker::new(50, 10);
        let joined = chunker.split(&text).join(" ");
        for word in text.split_whitespace() {
            prop_assert!(joined.contains(word), "missing word {:?}", word);
        }
    }

    #[test]
    fn chunks_are_trimmed_and_non_empty(
        text in prose(),
        chunk_size in 10usize..200,
    ) {
        let chunker = TextChunker::new(chunk_size, chunk_size / 4);
        for chunk in chunker.split(&text) {
            prop_assert!(!chunk.is_empty());
            prop_assert_eq!(chunk.trim(), chunk.as_str());
        }
    }

    #[test]
    fn clean_is_idempotent(text in markdown_ish()) {
        let parser = MarkdownParser::new().unwrap();
        let once = parser.clean(&text);
        let twice = parser.clean(&once);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn clean_removes_markup(text in markdown_ish()) {
        let parser = MarkdownParser::new().unwrap();
        let cleaned = parser.clean(&text);
        prop_assert!(!cleaned.contains("[["));
        prop_assert!(!cleaned.contains("]]"));
        prop_assert!(!cleaned.contains("%%"));
        prop_assert!(!cleaned.contains("\n\n\n"));
    }

    #[test]
    fn extracted_tags_appear_in_text(text in markdown_ish()) {
        let parser = MarkdownParser::new().unwrap();
        for tag in parser.extract_tags(&text) {
            let needle = format!("#{}", tag);
            prop_assert!(text.contains(&needle), "tag {:?} not in text", tag);
        }
    }
}

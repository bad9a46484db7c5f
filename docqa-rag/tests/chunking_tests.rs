//! Property and scenario tests for chunking.

use docqa_rag::{
    Chunk, Chunker, FixedSizeChunker, RagError, RecursiveChunker, Segment, SourceLocator,
    chunk_segments,
};
use proptest::prelude::*;

fn page(text: &str, page: u32) -> Segment {
    Segment::new(text, SourceLocator { source: "synthetic.pdf".into(), page: Some(page) })
}

/// Concatenate the non-overlapping part of every chunk cut from `segment_index`.
fn rebuild(chunks: &[Chunk], segment_index: usize) -> String {
    chunks
        .iter()
        .filter(|c| c.segment_index == segment_index)
        .map(Chunk::fresh_content)
        .collect()
}

fn arb_size_and_overlap() -> impl Strategy<Value = (usize, usize)> {
    (1usize..40).prop_flat_map(|size| (Just(size), 0..size))
}

fn arb_segments() -> impl Strategy<Value = Vec<Segment>> {
    proptest::collection::vec("[a-zé .!?\n]{0,200}", 0..4).prop_map(|texts| {
        texts.iter().enumerate().map(|(i, t)| page(t, i as u32 + 1)).collect()
    })
}

/// **Property: chunking loses and duplicates nothing beyond the declared overlap**
/// *For any* segments and valid `(chunk_size, chunk_overlap)`, dropping each
/// chunk's overlap prefix and concatenating rebuilds every segment exactly,
/// and no chunk exceeds `chunk_size` characters.
mod prop_reconstruction {
    use super::*;

    fn check(chunks: &[Chunk], segments: &[Segment], size: usize, overlap: usize) -> Result<(), TestCaseError> {
        for (i, segment) in segments.iter().enumerate() {
            prop_assert_eq!(rebuild(chunks, i), segment.content.clone());
        }
        for (i, chunk) in chunks.iter().enumerate() {
            prop_assert!(chunk.char_len() <= size);
            prop_assert_eq!(chunk.sequence_index, i);
            prop_assert!(chunk.overlap_chars == 0 || chunk.overlap_chars == overlap);
            if chunk.overlap_chars > 0 {
                let prev = &chunks[i - 1];
                prop_assert_eq!(prev.segment_index, chunk.segment_index);
                let prev_tail: String =
                    prev.content.chars().skip(prev.char_len() - overlap).collect();
                let head: String = chunk.content.chars().take(overlap).collect();
                prop_assert_eq!(prev_tail, head);
            }
        }
        Ok(())
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn recursive_chunks_rebuild_segments(
            segments in arb_segments(),
            (size, overlap) in arb_size_and_overlap(),
        ) {
            let chunks = RecursiveChunker::new(size, overlap).unwrap().chunk(&segments);
            check(&chunks, &segments, size, overlap)?;
        }

        #[test]
        fn fixed_chunks_rebuild_segments(
            segments in arb_segments(),
            (size, overlap) in arb_size_and_overlap(),
        ) {
            let chunks = FixedSizeChunker::new(size, overlap).unwrap().chunk(&segments);
            check(&chunks, &segments, size, overlap)?;
        }

        #[test]
        fn overlap_at_or_above_size_always_fails(
            segments in arb_segments(),
            size in 1usize..40,
            extra in 0usize..10,
        ) {
            let result = chunk_segments(&segments, size, size + extra);
            prop_assert!(matches!(result, Err(RagError::InvalidConfiguration(_))));
        }
    }
}

#[test]
fn three_page_alphabet_with_size_ten_overlap_two() {
    let pages = [page("ABCDEFGH", 1), page("IJKLMNOPQRSTUV", 2), page("WXYZ", 3)];
    let chunks = chunk_segments(&pages, 10, 2).unwrap();

    let texts: Vec<&str> = chunks.iter().map(|c| c.content.as_str()).collect();
    assert_eq!(texts, ["ABCDEFGH", "IJKLMNOPQR", "QRSTUV", "WXYZ"]);

    assert_eq!(chunks[2].overlap_chars, 2);
    assert_eq!(chunks[2].start_char, 8);
    assert_eq!(chunks[2].metadata.page, Some(2));
    assert_eq!(chunks[3].metadata.page, Some(3));
    assert!(chunks.iter().all(|c| c.char_len() <= 10));

    let rebuilt: String = chunks.iter().map(Chunk::fresh_content).collect();
    assert_eq!(rebuilt, "ABCDEFGHIJKLMNOPQRSTUVWXYZ");
}

#[test]
fn long_single_page_slides_by_size_minus_overlap() {
    let chunks = chunk_segments(&[page("ABCDEFGHIJKLMNOPQRSTUVWXYZ", 1)], 10, 2).unwrap();
    let texts: Vec<&str> = chunks.iter().map(|c| c.content.as_str()).collect();
    assert_eq!(texts, ["ABCDEFGHIJ", "IJKLMNOPQR", "QRSTUVWXYZ"]);
}

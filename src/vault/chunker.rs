/// Recursive character splitter.
///
/// Tries the coarsest separator first (`"\n\n"`, then `"\n"`, `". "`,
/// `" "`, finally character level), recursing into pieces that still exceed
/// `chunk_size`, and merges small pieces back together so consecutive chunks
/// share a `chunk_overlap`-sized span.
pub struct TextChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

const SEPARATORS: [&str; 5] = ["\n\n", "\n", ". ", " ", ""];

impl TextChunker {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        debug_assert!(chunk_overlap < chunk_size);
        Self { chunk_size, chunk_overlap }
    }

    pub fn split(&self, text: &str) -> Vec<String> {
        self.split_recursive(text, &SEPARATORS)
    }

    fn split_recursive(&self, text: &str, separators: &[&str]) -> Vec<String> {
        // Coarsest separator that actually occurs in the text; the final ""
        // entry always applies and splits into characters.
        let index = separators
            .iter()
            .position(|sep| sep.is_empty() || text.contains(sep))
            .unwrap_or(separators.len() - 1);
        let separator = separators[index];
        let remaining = &separators[index + 1..];

        let pieces: Vec<String> = if separator.is_empty() {
            text.chars().map(|c| c.to_string()).collect()
        } else {
            text.split(separator)
                .filter(|s| !s.is_empty())
                .map(|s| s.to_string())
                .collect()
        };

        let mut chunks = Vec::new();
        let mut pending: Vec<String> = Vec::new();

        for piece in pieces {
            if char_len(&piece) <= self.chunk_size {
                pending.push(piece);
                continue;
            }
            if !pending.is_empty() {
                chunks.extend(self.merge(&pending, separator));
                pending.clear();
            }
            if remaining.is_empty() {
                // Unsplittable token longer than chunk_size.
                chunks.push(piece);
            } else {
                chunks.extend(self.split_recursive(&piece, remaining));
            }
        }
        if !pending.is_empty() {
            chunks.extend(self.merge(&pending, separator));
        }
        chunks
    }

    /// Joins pieces back up to `chunk_size`, re-inserting the separator and
    /// carrying a `chunk_overlap`-sized tail of each emitted chunk into the
    /// next one.
    fn merge(&self, pieces: &[String], separator: &str) -> Vec<String> {
        let sep_len = char_len(separator);
        let mut chunks = Vec::new();
        let mut window: Vec<String> = Vec::new();
        let mut total = 0usize;

        for piece in pieces {
            let piece_len = char_len(piece);
            let added = piece_len + if window.is_empty() { 0 } else { sep_len };

            if total + added > self.chunk_size && !window.is_empty() {
                if let Some(chunk) = join_trimmed(&window, separator) {
                    chunks.push(chunk);
                }
                // Shrink the window down to the overlap budget before the
                // next piece enters.
                while total > self.chunk_overlap
                    || (total + piece_len + if window.is_empty() { 0 } else { sep_len }
                        > self.chunk_size
                        && total > 0)
                {
                    let removed = window.remove(0);
                    total -= char_len(&removed) + if window.is_empty() { 0 } else { sep_len };
                }
            }

            total += piece_len + if window.is_empty() { 0 } else { sep_len };
            window.push(piece.clone());
        }

        if let Some(chunk) = join_trimmed(&window, separator) {
            chunks.push(chunk);
        }
        chunks
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn join_trimmed(pieces: &[String], separator: &str) -> Option<String> {
    let joined = pieces.join(separator);
    let trimmed = joined.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

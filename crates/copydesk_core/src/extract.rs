use serde::Serialize;

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Normalized form of one editor snapshot. Recomputed on every edit; the
/// `fingerprint` is the identity used for caching and request deduplication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractedContent {
    pub html: String,
    pub plain_text: String,
    pub word_count: u32,
    pub character_count: u32,
    pub is_empty: bool,
    pub fingerprint: u64,
}

/// Normalizes raw editor output into an [`ExtractedContent`].
///
/// The editor supplies both its HTML and the plain text it derived from it;
/// the plain text is trimmed and all derived fields are computed from the
/// trimmed form. Deterministic and side-effect free.
pub fn extract_content(html: &str, plain_text: &str) -> ExtractedContent {
    let trimmed = plain_text.trim();
    ExtractedContent {
        html: html.to_string(),
        plain_text: trimmed.to_string(),
        word_count: trimmed.split_whitespace().count() as u32,
        character_count: trimmed.chars().count() as u32,
        is_empty: trimmed.is_empty(),
        fingerprint: fingerprint(trimmed),
    }
}

/// FNV-1a over the text bytes. Cheap and deterministic; the value only keys
/// the in-memory cache and pending-request map, so collisions are tolerated.
pub fn fingerprint(text: &str) -> u64 {
    let mut hash = FNV_OFFSET_BASIS;
    for byte in text.as_bytes() {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::{extract_content, fingerprint};

    #[test]
    fn identical_text_yields_identical_fingerprint() {
        let a = extract_content("<p>Hello world</p>", "Hello world");
        let b = extract_content("<div>Hello world</div>", "Hello world");
        assert_eq!(a.fingerprint, b.fingerprint);
        assert_eq!(a.fingerprint, fingerprint("Hello world"));
    }

    #[test]
    fn different_text_yields_different_fingerprint() {
        let a = extract_content("", "Hello world");
        let b = extract_content("", "Hello world, how are you");
        assert_ne!(a.fingerprint, b.fingerprint);
    }

    #[test]
    fn surrounding_whitespace_is_trimmed_before_hashing() {
        let padded = extract_content("", "  Hello world \n");
        let bare = extract_content("", "Hello world");
        assert_eq!(padded.plain_text, "Hello world");
        assert_eq!(padded.fingerprint, bare.fingerprint);
    }

    #[test]
    fn counts_words_on_whitespace_boundaries() {
        let content = extract_content("", "one  two\tthree\nfour");
        assert_eq!(content.word_count, 4);
    }

    #[test]
    fn counts_unicode_scalar_values_not_bytes() {
        let content = extract_content("", "héllo wörld");
        assert_eq!(content.character_count, 11);
    }

    #[test]
    fn whitespace_only_input_is_empty() {
        let content = extract_content("<p><br></p>", " \n\t ");
        assert!(content.is_empty);
        assert_eq!(content.word_count, 0);
        assert_eq!(content.character_count, 0);
    }

    #[test]
    fn empty_and_whitespace_share_a_fingerprint() {
        assert_eq!(
            extract_content("", "").fingerprint,
            extract_content("", "   ").fingerprint
        );
    }
}

//! Point identifier assignment
//!
//! `Sequential` numbers the points of one indexing call `0..n-1`, so a
//! later call overwrites earlier points position by position.
//! `ContentDerived` hashes source and page into a UUIDv5 instead.

use docsearch_core::{Document, PointId, PointIdPolicy};
use uuid::Uuid;

/// Namespace for content-derived point identifiers
const POINT_NAMESPACE: Uuid = Uuid::from_u128(0x6f1c_2a3e_8b4d_4e5f_9a0b_1c2d_3e4f_5a6b);

/// Identifier for the `ordinal`-th document of an indexing call
pub fn assign_id(policy: PointIdPolicy, ordinal: usize, document: &Document) -> PointId {
    match policy {
        PointIdPolicy::Sequential => PointId::Num(ordinal as u64),
        PointIdPolicy::ContentDerived => {
            // Unpaginated sources fall back to their position in the call
            let position = document
                .page_number()
                .map_or_else(|| format!("#{ordinal}"), |page| format!("p{page}"));
            let key = format!("{}/{position}", document.source());
            PointId::Uuid(Uuid::new_v5(&POINT_NAMESPACE, key.as_bytes()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(source: &str, page: u32) -> Document {
        Document::new("text", source).unwrap().with_page(page)
    }

    #[test]
    fn test_sequential_ignores_content() {
        assert_eq!(
            assign_id(PointIdPolicy::Sequential, 0, &page("a.pdf", 4)),
            PointId::Num(0)
        );
        assert_eq!(
            assign_id(PointIdPolicy::Sequential, 0, &page("b.pdf", 9)),
            PointId::Num(0)
        );
    }

    #[test]
    fn test_content_derived_is_stable() {
        let first = assign_id(PointIdPolicy::ContentDerived, 0, &page("a.pdf", 1));
        let again = assign_id(PointIdPolicy::ContentDerived, 5, &page("a.pdf", 1));
        assert_eq!(first, again);
    }

    #[test]
    fn test_content_derived_separates_sources_and_pages() {
        let a1 = assign_id(PointIdPolicy::ContentDerived, 0, &page("a.pdf", 1));
        let a2 = assign_id(PointIdPolicy::ContentDerived, 1, &page("a.pdf", 2));
        let b1 = assign_id(PointIdPolicy::ContentDerived, 0, &page("b.pdf", 1));

        assert_ne!(a1, a2);
        assert_ne!(a1, b1);
    }

    #[test]
    fn test_content_derived_without_page_uses_ordinal() {
        let audio = Document::new("transcript", "aula.wav").unwrap();
        let id = assign_id(PointIdPolicy::ContentDerived, 0, &audio);
        assert!(matches!(id, PointId::Uuid(_)));
        assert_ne!(id, assign_id(PointIdPolicy::ContentDerived, 0, &page("aula.wav", 1)));
    }
}

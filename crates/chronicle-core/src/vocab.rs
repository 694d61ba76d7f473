//! # Vocabulary
//!
//! Identifier constants for the HQDM predicates and kinds the core relies on.
//!
//! Constants are plain `&str` so they can be used in `const` contexts; wrap them
//! with [`term`] to get an [`Iri`].

use crate::Iri;

/// HQDM namespace.
pub const HQDM_NS: &str = "https://hqdmtop.github.io/hqdm#";

/// `rdf:type`.
pub const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";

/// `xsd:integer`.
pub const XSD_INTEGER: &str = "http://www.w3.org/2001/XMLSchema#integer";

/// `xsd:boolean`.
pub const XSD_BOOLEAN: &str = "http://www.w3.org/2001/XMLSchema#boolean";

/// `xsd:string`.
pub const XSD_STRING: &str = "http://www.w3.org/2001/XMLSchema#string";

/// Wrap a vocabulary constant as an [`Iri`].
#[must_use]
pub fn term(constant: &'static str) -> Iri {
    Iri::from_static(constant)
}

// =============================================================================
// PREDICATES
// =============================================================================

/// Names an entity; on a point in time or event it carries the timestamp.
pub const ENTITY_NAME: &str = "https://hqdmtop.github.io/hqdm#data_EntityName";
/// Literal value of a sign.
pub const VALUE: &str = "https://hqdmtop.github.io/hqdm#value_";
/// Class membership.
pub const MEMBER_OF: &str = "https://hqdmtop.github.io/hqdm#member_of";
/// Membership of a sign in a pattern, or of a representation in a representation-by-pattern.
pub const MEMBER_OF_: &str = "https://hqdmtop.github.io/hqdm#member_of_";
/// Membership of a kind.
pub const MEMBER_OF_KIND: &str = "https://hqdmtop.github.io/hqdm#member_of_kind";
/// Participation in an association or representation.
pub const PARTICIPANT_IN: &str = "https://hqdmtop.github.io/hqdm#participant_in";
/// A representation-by-sign represents the subject.
pub const REPRESENTS: &str = "https://hqdmtop.github.io/hqdm#represents";
/// Event that begins a spatio-temporal extent.
pub const BEGINNING: &str = "https://hqdmtop.github.io/hqdm#beginning";
/// Event that ends a spatio-temporal extent.
pub const ENDING: &str = "https://hqdmtop.github.io/hqdm#ending";
/// A state is a temporal part of a longer-lived individual.
pub const TEMPORAL_PART_OF: &str = "https://hqdmtop.github.io/hqdm#temporal_part_of";
/// Composition: the subject is a part of a whole.
pub const PART__OF: &str = "https://hqdmtop.github.io/hqdm#part__of";
/// An activity references the things it is about.
pub const REFERENCES: &str = "https://hqdmtop.github.io/hqdm#references";
/// Part of a possible world.
pub const PART_OF_POSSIBLE_WORLD: &str = "https://hqdmtop.github.io/hqdm#part_of_possible_world";

// =============================================================================
// KINDS
// =============================================================================

/// Kind: sign.
pub const SIGN: &str = "https://hqdmtop.github.io/hqdm#sign";
/// Kind: pattern.
pub const PATTERN: &str = "https://hqdmtop.github.io/hqdm#pattern";
/// Kind: representation_by_sign.
pub const REPRESENTATION_BY_SIGN: &str = "https://hqdmtop.github.io/hqdm#representation_by_sign";
/// Kind: representation_by_pattern.
pub const REPRESENTATION_BY_PATTERN: &str =
    "https://hqdmtop.github.io/hqdm#representation_by_pattern";
/// Kind: recognizing_language_community.
pub const RECOGNIZING_LANGUAGE_COMMUNITY: &str =
    "https://hqdmtop.github.io/hqdm#recognizing_language_community";
/// Kind: point_in_time.
pub const POINT_IN_TIME: &str = "https://hqdmtop.github.io/hqdm#point_in_time";
/// Kind: event.
pub const EVENT: &str = "https://hqdmtop.github.io/hqdm#event";
/// Kind: person.
pub const PERSON: &str = "https://hqdmtop.github.io/hqdm#person";
/// Kind: state_of_person.
pub const STATE_OF_PERSON: &str = "https://hqdmtop.github.io/hqdm#state_of_person";
/// Kind: possible_world.
pub const POSSIBLE_WORLD: &str = "https://hqdmtop.github.io/hqdm#possible_world";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constants_are_valid_identifiers() {
        for c in [
            RDF_TYPE,
            ENTITY_NAME,
            VALUE,
            MEMBER_OF,
            MEMBER_OF_,
            PARTICIPANT_IN,
            REPRESENTS,
            BEGINNING,
            ENDING,
            TEMPORAL_PART_OF,
            MEMBER_OF_KIND,
            PART__OF,
            REFERENCES,
            REPRESENTATION_BY_SIGN,
            RECOGNIZING_LANGUAGE_COMMUNITY,
        ] {
            assert!(Iri::parse(c).is_ok(), "{c}");
        }
    }

    #[test]
    fn hqdm_constants_share_namespace() {
        assert!(VALUE.starts_with(HQDM_NS));
        assert!(STATE_OF_PERSON.starts_with(HQDM_NS));
    }
}

//! # Query Module
//!
//! Typed, parameterized query templates and the row model they return.
//!
//! - Every lookup the core performs is one of the [`QueryType`] templates
//! - Parameters are typed (`Iri`, `Value`, `String`), never spliced text
//! - [`Query::to_sparql`] renders a template for providers that accept query
//!   strings; literals are escaped structurally
//!
//! Rows are [`QueryResult`] binding maps collected in a [`QueryResultList`]
//! together with the projected variable names.

mod evaluate;

pub use evaluate::{TripleSource, evaluate};

use crate::vocab::{
    BEGINNING, ENDING, ENTITY_NAME, MEMBER_OF, MEMBER_OF_, MEMBER_OF_KIND, PART__OF,
    PARTICIPANT_IN, RDF_TYPE, REFERENCES, REPRESENTS, TEMPORAL_PART_OF, VALUE, XSD_BOOLEAN,
    XSD_INTEGER,
};
use crate::{Iri, Value};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write as _;

// =============================================================================
// COLUMN NAMES
// =============================================================================

/// Subject column of a triple row.
pub const SUBJECT: &str = "s";
/// Predicate column of a triple row.
pub const PREDICATE: &str = "p";
/// Object column of a triple row.
pub const OBJECT: &str = "o";
/// First valid instant of a row (inclusive).
pub const START: &str = "start";
/// Last valid instant of a row (inclusive).
pub const FINISH: &str = "finish";
/// Sign text in an inverse sign lookup.
pub const SIGN_VALUE: &str = "sign_value";
/// Pattern name in an inverse sign lookup.
pub const PATTERN_NAME: &str = "pattern_name";
/// Representation-by-pattern name in an inverse sign lookup.
pub const REP_BY_PATTERN_NAME: &str = "rep_by_pattern_name";

const TRIPLE_COLUMNS: &[&str] = &[SUBJECT, PREDICATE, OBJECT];
const TEMPORAL_TRIPLE_COLUMNS: &[&str] = &[SUBJECT, PREDICATE, OBJECT, START, FINISH];
const SIGN_COLUMNS: &[&str] = &[SIGN_VALUE, PATTERN_NAME, REP_BY_PATTERN_NAME, START, FINISH];

// =============================================================================
// QUERY TYPES
// =============================================================================

/// Query templates supported by every provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueryType {
    /// Subjects represented by a sign with exactly this value, under the given
    /// pattern and recognizing community.
    FindBySignValue {
        community: Iri,
        pattern: Iri,
        value: String,
    },

    /// Like `FindBySignValue`, matching signs that contain `text` ignoring case.
    FindByPartialSignValue {
        community: Iri,
        pattern: Iri,
        text: String,
    },

    /// The signs that represent an entity, with their pattern names.
    FindSignsForEntity { entity: Iri },

    /// Members of a class represented by any sign containing `text`.
    FindMembersOfClassByPartialSign {
        class: Iri,
        text: String,
        case_sensitive: bool,
    },

    /// Subjects of an `rdf:type` that are members of `class` and are
    /// represented by any sign of `pattern`.
    FindByTypeClassAndSignPattern {
        rdf_type: Iri,
        class: Iri,
        pattern: Iri,
    },

    /// Like `FindByTypeClassAndSignPattern`, with membership of a kind.
    FindByTypeKindAndSignPattern {
        rdf_type: Iri,
        kind: Iri,
        pattern: Iri,
    },

    /// Members of a class referenced by `activity` and represented by a sign
    /// containing `text`.
    FindMembersOfClassByActivityAndPartialSign {
        activity: Iri,
        class: Iri,
        text: String,
        case_sensitive: bool,
    },

    /// Members of a class that are `part__of` `whole` and represented by a
    /// sign containing `text`.
    FindMembersOfClassByCompositionAndPartialSign {
        whole: Iri,
        class: Iri,
        text: String,
        case_sensitive: bool,
    },

    /// Individuals with a state participating in an association of `kind`.
    /// Bounds are the participating state's.
    FindByKindOfAssociation { kind: Iri },

    /// Individuals associated with `item` through an association of `kind`,
    /// excluding `item` itself.
    FindAssociated { item: Iri, kind: Iri },

    /// The participating states of `first` and `second` in associations of
    /// `kind` that involve both.
    FindParticipantDetails { first: Iri, second: Iri, kind: Iri },

    /// Subjects with a predicate, optionally restricted to one object.
    FindByPredicate {
        predicate: Iri,
        object: Option<Value>,
    },

    /// Subjects whose text value for a predicate equals `text` ignoring case.
    FindByPredicateTextCaseInsensitive { predicate: Iri, text: String },

    /// Members of a class holding a field value.
    FindByFieldValueAndClass {
        field: Iri,
        value: Value,
        class: Iri,
    },
}

impl QueryType {
    /// The variables projected by this template, in column order.
    #[must_use]
    pub fn var_names(&self) -> Vec<String> {
        let columns = match self {
            Self::FindBySignValue { .. }
            | Self::FindByPartialSignValue { .. }
            | Self::FindMembersOfClassByPartialSign { .. }
            | Self::FindByTypeClassAndSignPattern { .. }
            | Self::FindByTypeKindAndSignPattern { .. }
            | Self::FindMembersOfClassByActivityAndPartialSign { .. }
            | Self::FindMembersOfClassByCompositionAndPartialSign { .. }
            | Self::FindByKindOfAssociation { .. }
            | Self::FindAssociated { .. }
            | Self::FindParticipantDetails { .. } => TEMPORAL_TRIPLE_COLUMNS,
            Self::FindSignsForEntity { .. } => SIGN_COLUMNS,
            Self::FindByPredicate { .. }
            | Self::FindByPredicateTextCaseInsensitive { .. }
            | Self::FindByFieldValueAndClass { .. } => TRIPLE_COLUMNS,
        };
        columns.iter().map(|c| (*c).to_string()).collect()
    }

    /// Short name for logging.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::FindBySignValue { .. } => "find_by_sign_value",
            Self::FindByPartialSignValue { .. } => "find_by_partial_sign_value",
            Self::FindSignsForEntity { .. } => "find_signs_for_entity",
            Self::FindMembersOfClassByPartialSign { .. } => "find_members_of_class_by_partial_sign",
            Self::FindByTypeClassAndSignPattern { .. } => "find_by_type_class_and_sign_pattern",
            Self::FindByTypeKindAndSignPattern { .. } => "find_by_type_kind_and_sign_pattern",
            Self::FindMembersOfClassByActivityAndPartialSign { .. } => {
                "find_members_of_class_by_activity_and_partial_sign"
            }
            Self::FindMembersOfClassByCompositionAndPartialSign { .. } => {
                "find_members_of_class_by_composition_and_partial_sign"
            }
            Self::FindByKindOfAssociation { .. } => "find_by_kind_of_association",
            Self::FindAssociated { .. } => "find_associated",
            Self::FindParticipantDetails { .. } => "find_participant_details",
            Self::FindByPredicate { .. } => "find_by_predicate",
            Self::FindByPredicateTextCaseInsensitive { .. } => {
                "find_by_predicate_text_case_insensitive"
            }
            Self::FindByFieldValueAndClass { .. } => "find_by_field_value_and_class",
        }
    }
}

/// A structured query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    /// The template and its parameters.
    pub query_type: QueryType,
}

impl Query {
    /// Create a new query.
    #[must_use]
    pub fn new(query_type: QueryType) -> Self {
        Self { query_type }
    }

    /// Exact sign lookup helper.
    #[must_use]
    pub fn sign_value(community: Iri, pattern: Iri, value: impl Into<String>) -> Self {
        Self::new(QueryType::FindBySignValue {
            community,
            pattern,
            value: value.into(),
        })
    }

    /// Partial sign lookup helper.
    #[must_use]
    pub fn partial_sign_value(community: Iri, pattern: Iri, text: impl Into<String>) -> Self {
        Self::new(QueryType::FindByPartialSignValue {
            community,
            pattern,
            text: text.into(),
        })
    }

    /// Inverse sign lookup helper.
    #[must_use]
    pub fn signs_for_entity(entity: Iri) -> Self {
        Self::new(QueryType::FindSignsForEntity { entity })
    }

    /// Class-restricted partial sign lookup helper.
    #[must_use]
    pub fn members_of_class_by_partial_sign(
        class: Iri,
        text: impl Into<String>,
        case_sensitive: bool,
    ) -> Self {
        Self::new(QueryType::FindMembersOfClassByPartialSign {
            class,
            text: text.into(),
            case_sensitive,
        })
    }

    /// Type, class and sign pattern lookup helper.
    #[must_use]
    pub fn by_type_class_and_sign_pattern(rdf_type: Iri, class: Iri, pattern: Iri) -> Self {
        Self::new(QueryType::FindByTypeClassAndSignPattern {
            rdf_type,
            class,
            pattern,
        })
    }

    /// Type, kind and sign pattern lookup helper.
    #[must_use]
    pub fn by_type_kind_and_sign_pattern(rdf_type: Iri, kind: Iri, pattern: Iri) -> Self {
        Self::new(QueryType::FindByTypeKindAndSignPattern {
            rdf_type,
            kind,
            pattern,
        })
    }

    /// Activity-scoped partial sign lookup helper.
    #[must_use]
    pub fn members_of_class_by_activity_and_partial_sign(
        activity: Iri,
        class: Iri,
        text: impl Into<String>,
        case_sensitive: bool,
    ) -> Self {
        Self::new(QueryType::FindMembersOfClassByActivityAndPartialSign {
            activity,
            class,
            text: text.into(),
            case_sensitive,
        })
    }

    /// Composition-scoped partial sign lookup helper.
    #[must_use]
    pub fn members_of_class_by_composition_and_partial_sign(
        whole: Iri,
        class: Iri,
        text: impl Into<String>,
        case_sensitive: bool,
    ) -> Self {
        Self::new(QueryType::FindMembersOfClassByCompositionAndPartialSign {
            whole,
            class,
            text: text.into(),
            case_sensitive,
        })
    }

    /// Kind-of-association lookup helper.
    #[must_use]
    pub fn by_kind_of_association(kind: Iri) -> Self {
        Self::new(QueryType::FindByKindOfAssociation { kind })
    }

    /// Associated individuals lookup helper.
    #[must_use]
    pub fn associated(item: Iri, kind: Iri) -> Self {
        Self::new(QueryType::FindAssociated { item, kind })
    }

    /// Participant details lookup helper.
    #[must_use]
    pub fn participant_details(first: Iri, second: Iri, kind: Iri) -> Self {
        Self::new(QueryType::FindParticipantDetails {
            first,
            second,
            kind,
        })
    }

    /// Predicate lookup helper.
    #[must_use]
    pub fn by_predicate(predicate: Iri, object: Option<Value>) -> Self {
        Self::new(QueryType::FindByPredicate { predicate, object })
    }

    /// Case-insensitive text lookup helper.
    #[must_use]
    pub fn by_predicate_text_case_insensitive(predicate: Iri, text: impl Into<String>) -> Self {
        Self::new(QueryType::FindByPredicateTextCaseInsensitive {
            predicate,
            text: text.into(),
        })
    }

    /// Field value and class lookup helper.
    #[must_use]
    pub fn by_field_value_and_class(field: Iri, value: Value, class: Iri) -> Self {
        Self::new(QueryType::FindByFieldValueAndClass {
            field,
            value,
            class,
        })
    }

    /// Render the template as SPARQL.
    ///
    /// Identifiers are validated on construction and written verbatim inside
    /// `<...>`; literals go through [`render_term`].
    #[must_use]
    pub fn to_sparql(&self) -> String {
        let mut out = String::new();
        let vars: Vec<String> = self
            .query_type
            .var_names()
            .iter()
            .map(|v| format!("?{v}"))
            .collect();
        let _ = writeln!(out, "SELECT DISTINCT {}", vars.join(" "));
        out.push_str("WHERE {\n");

        match &self.query_type {
            QueryType::FindBySignValue {
                community,
                pattern,
                value,
            } => {
                let _ = writeln!(out, "  ?sign <{VALUE}> {} .", render_term(&Value::text(value)));
                sign_body(&mut out, Some(community), Some(pattern));
            }
            QueryType::FindByPartialSignValue {
                community,
                pattern,
                text,
            } => {
                let _ = writeln!(out, "  ?sign <{VALUE}> ?sign_text .");
                let _ = writeln!(
                    out,
                    "  FILTER(CONTAINS(LCASE(?sign_text), LCASE({})))",
                    render_term(&Value::text(text))
                );
                sign_body(&mut out, Some(community), Some(pattern));
            }
            QueryType::FindSignsForEntity { entity } => {
                let _ = writeln!(out, "  ?rep_by_sign <{REPRESENTS}> <{entity}> .");
                let _ = writeln!(out, "  ?sign <{PARTICIPANT_IN}> ?rep_by_sign ;");
                let _ = writeln!(out, "        <{VALUE}> ?sign_value ;");
                let _ = writeln!(out, "        <{MEMBER_OF_}> ?pattern .");
                let _ = writeln!(out, "  ?pattern <{ENTITY_NAME}> ?pattern_name .");
                let _ = writeln!(
                    out,
                    "  OPTIONAL {{ ?rep_by_sign <{MEMBER_OF_}> ?rbp . ?rbp <{ENTITY_NAME}> ?rep_by_pattern_name . }}"
                );
                interval_body(&mut out);
            }
            QueryType::FindMembersOfClassByPartialSign {
                class,
                text,
                case_sensitive,
            } => {
                let _ = writeln!(out, "  ?s <{MEMBER_OF}> <{class}> .");
                partial_sign_filter(&mut out, text, *case_sensitive);
                sign_body(&mut out, None, None);
            }
            QueryType::FindByTypeClassAndSignPattern {
                rdf_type,
                class,
                pattern,
            } => {
                let _ = writeln!(out, "  ?s <{RDF_TYPE}> <{rdf_type}> ;");
                let _ = writeln!(out, "     <{MEMBER_OF}> <{class}> .");
                let _ = writeln!(out, "  ?sign <{VALUE}> ?sign_text .");
                sign_body(&mut out, None, Some(pattern));
            }
            QueryType::FindByTypeKindAndSignPattern {
                rdf_type,
                kind,
                pattern,
            } => {
                let _ = writeln!(out, "  ?s <{RDF_TYPE}> <{rdf_type}> ;");
                let _ = writeln!(out, "     <{MEMBER_OF_KIND}> <{kind}> .");
                let _ = writeln!(out, "  ?sign <{VALUE}> ?sign_text .");
                sign_body(&mut out, None, Some(pattern));
            }
            QueryType::FindMembersOfClassByActivityAndPartialSign {
                activity,
                class,
                text,
                case_sensitive,
            } => {
                let _ = writeln!(out, "  <{activity}> <{REFERENCES}> ?s .");
                let _ = writeln!(out, "  ?s <{MEMBER_OF}> <{class}> .");
                partial_sign_filter(&mut out, text, *case_sensitive);
                sign_body(&mut out, None, None);
            }
            QueryType::FindMembersOfClassByCompositionAndPartialSign {
                whole,
                class,
                text,
                case_sensitive,
            } => {
                let _ = writeln!(out, "  ?s <{PART__OF}> <{whole}> ;");
                let _ = writeln!(out, "     <{MEMBER_OF}> <{class}> .");
                partial_sign_filter(&mut out, text, *case_sensitive);
                sign_body(&mut out, None, None);
            }
            QueryType::FindByKindOfAssociation { kind } => {
                let _ = writeln!(out, "  ?association <{MEMBER_OF_KIND}> <{kind}> .");
                let _ = writeln!(out, "  ?participant <{PARTICIPANT_IN}> ?association ;");
                let _ = writeln!(out, "               <{TEMPORAL_PART_OF}> ?s .");
                out.push_str("  ?s ?p ?o .\n");
                participant_interval_body(&mut out);
            }
            QueryType::FindAssociated { item, kind } => {
                let _ = writeln!(out, "  ?association <{MEMBER_OF_KIND}> <{kind}> .");
                let _ = writeln!(out, "  ?own <{PARTICIPANT_IN}> ?association ;");
                let _ = writeln!(out, "       <{TEMPORAL_PART_OF}> <{item}> .");
                let _ = writeln!(out, "  ?participant <{PARTICIPANT_IN}> ?association ;");
                let _ = writeln!(out, "               <{TEMPORAL_PART_OF}> ?s .");
                let _ = writeln!(out, "  FILTER(?s != <{item}>)");
                out.push_str("  ?s ?p ?o .\n");
                participant_interval_body(&mut out);
            }
            QueryType::FindParticipantDetails {
                first,
                second,
                kind,
            } => {
                let _ = writeln!(out, "  ?association <{MEMBER_OF_KIND}> <{kind}> .");
                for individual in [first, second] {
                    let _ = writeln!(
                        out,
                        "  [] <{PARTICIPANT_IN}> ?association ; <{TEMPORAL_PART_OF}> <{individual}> ."
                    );
                }
                let _ = writeln!(out, "  ?s <{PARTICIPANT_IN}> ?association ;");
                let _ = writeln!(out, "     <{TEMPORAL_PART_OF}> ?whole .");
                let _ = writeln!(out, "  VALUES ?whole {{ <{first}> <{second}> }}");
                out.push_str("  ?s ?p ?o .\n");
                let _ = writeln!(
                    out,
                    "  OPTIONAL {{ ?s <{BEGINNING}> ?b . ?b <{ENTITY_NAME}> ?start . }}"
                );
                let _ = writeln!(
                    out,
                    "  OPTIONAL {{ ?s <{ENDING}> ?e . ?e <{ENTITY_NAME}> ?finish . }}"
                );
            }
            QueryType::FindByPredicate { predicate, object } => {
                match object {
                    Some(o) => {
                        let _ = writeln!(out, "  ?s <{predicate}> {} .", render_term(o));
                    }
                    None => {
                        let _ = writeln!(out, "  ?s <{predicate}> ?any .");
                    }
                }
                out.push_str("  ?s ?p ?o .\n");
            }
            QueryType::FindByPredicateTextCaseInsensitive { predicate, text } => {
                let _ = writeln!(out, "  ?s <{predicate}> ?text .");
                let _ = writeln!(
                    out,
                    "  FILTER(LCASE(STR(?text)) = LCASE({}))",
                    render_term(&Value::text(text))
                );
                out.push_str("  ?s ?p ?o .\n");
            }
            QueryType::FindByFieldValueAndClass {
                field,
                value,
                class,
            } => {
                let _ = writeln!(out, "  ?s <{field}> {} ;", render_term(value));
                let _ = writeln!(out, "     <{MEMBER_OF}> <{class}> .");
                out.push_str("  ?s ?p ?o .\n");
            }
        }

        out.push('}');
        out
    }
}

fn sign_body(out: &mut String, community: Option<&Iri>, pattern: Option<&Iri>) {
    if let Some(pattern) = pattern {
        let _ = writeln!(out, "  ?sign <{MEMBER_OF_}> <{pattern}> .");
    }
    let _ = writeln!(out, "  ?sign <{PARTICIPANT_IN}> ?rep_by_sign .");
    if let Some(community) = community {
        let _ = writeln!(out, "  <{community}> <{PARTICIPANT_IN}> ?rep_by_sign .");
    }
    let _ = writeln!(out, "  ?rep_by_sign <{REPRESENTS}> ?s .");
    out.push_str("  ?s ?p ?o .\n");
    interval_body(out);
}

fn partial_sign_filter(out: &mut String, text: &str, case_sensitive: bool) {
    let _ = writeln!(out, "  ?sign <{VALUE}> ?sign_text .");
    let needle = render_term(&Value::text(text));
    if case_sensitive {
        let _ = writeln!(out, "  FILTER(CONTAINS(?sign_text, {needle}))");
    } else {
        let _ = writeln!(out, "  FILTER(CONTAINS(LCASE(?sign_text), LCASE({needle})))");
    }
}

fn participant_interval_body(out: &mut String) {
    let _ = writeln!(
        out,
        "  OPTIONAL {{ ?participant <{BEGINNING}> ?b . ?b <{ENTITY_NAME}> ?start . }}"
    );
    let _ = writeln!(
        out,
        "  OPTIONAL {{ ?participant <{ENDING}> ?e . ?e <{ENTITY_NAME}> ?finish . }}"
    );
}

fn interval_body(out: &mut String) {
    let _ = writeln!(
        out,
        "  OPTIONAL {{ ?rep_by_sign <{BEGINNING}> ?b . ?b <{ENTITY_NAME}> ?start . }}"
    );
    let _ = writeln!(
        out,
        "  OPTIONAL {{ ?rep_by_sign <{ENDING}> ?e . ?e <{ENTITY_NAME}> ?finish . }}"
    );
}

/// Render a value as an RDF term: `<iri>`, `"text"`, or a typed literal.
#[must_use]
pub fn render_term(value: &Value) -> String {
    match value {
        Value::Iri(iri) => format!("<{iri}>"),
        Value::Text(s) => format!("\"{}\"", escape_literal(s)),
        Value::Integer(i) => format!("\"{i}\"^^<{XSD_INTEGER}>"),
        Value::Boolean(b) => format!("\"{b}\"^^<{XSD_BOOLEAN}>"),
    }
}

/// Escape a string for use inside a double-quoted RDF literal.
#[must_use]
pub fn escape_literal(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out
}

// =============================================================================
// RESULT ROWS
// =============================================================================

/// One result row: variable name to bound value.
///
/// Unbound variables (an unmatched `OPTIONAL`) are simply absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryResult {
    bindings: BTreeMap<String, Value>,
}

impl QueryResult {
    /// Create an empty row.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a variable, replacing any previous binding.
    pub fn bind(&mut self, name: &str, value: impl Into<Value>) {
        self.bindings.insert(name.to_string(), value.into());
    }

    /// Builder-style variant of [`QueryResult::bind`].
    #[must_use]
    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.bind(name, value);
        self
    }

    /// The value bound to a variable.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.bindings.get(name)
    }

    /// All bindings.
    #[must_use]
    pub fn bindings(&self) -> &BTreeMap<String, Value> {
        &self.bindings
    }
}

/// The rows returned by a query, with the projected variable names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryResultList {
    var_names: Vec<String>,
    results: Vec<QueryResult>,
}

impl QueryResultList {
    /// Create a result list.
    #[must_use]
    pub fn new(var_names: Vec<String>, results: Vec<QueryResult>) -> Self {
        Self { var_names, results }
    }

    /// The projected variable names, in column order.
    #[must_use]
    pub fn var_names(&self) -> &[String] {
        &self.var_names
    }

    /// The rows.
    #[must_use]
    pub fn results(&self) -> &[QueryResult] {
        &self.results
    }

    /// Split into variable names and rows.
    #[must_use]
    pub fn into_parts(self) -> (Vec<String>, Vec<QueryResult>) {
        (self.var_names, self.results)
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// Check if there are no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn iri(s: &str) -> Iri {
        Iri::parse(s).expect("valid iri")
    }

    #[test]
    fn literals_are_escaped() {
        assert_eq!(
            render_term(&Value::text("a \"b\" \\ c\nd")),
            "\"a \\\"b\\\" \\\\ c\\nd\""
        );
    }

    #[test]
    fn typed_literals() {
        assert_eq!(render_term(&Value::Integer(42)), format!("\"42\"^^<{XSD_INTEGER}>"));
        assert_eq!(render_term(&Value::Boolean(true)), format!("\"true\"^^<{XSD_BOOLEAN}>"));
    }

    #[test]
    fn hostile_sign_value_stays_inside_literal() {
        let query = Query::sign_value(
            iri("http://example.com/community"),
            iri("http://example.com/pattern"),
            "x\" . ?s ?p ?o } #",
        );
        let text = query.to_sparql();
        assert!(text.contains("\"x\\\" . ?s ?p ?o } #\""));
        assert_eq!(text.matches('}').count(), 4);
    }

    #[test]
    fn sparql_projects_template_columns() {
        let query = Query::signs_for_entity(iri("http://example.com/alice"));
        let text = query.to_sparql();
        assert!(text.starts_with("SELECT DISTINCT ?sign_value ?pattern_name ?rep_by_pattern_name ?start ?finish"));
        assert!(text.contains("<http://example.com/alice>"));
    }

    #[test]
    fn var_names_per_template() {
        let q = Query::by_predicate(iri("http://example.com/p"), None);
        assert_eq!(q.query_type.var_names(), vec!["s", "p", "o"]);
        let q = Query::partial_sign_value(
            iri("http://example.com/c"),
            iri("http://example.com/pt"),
            "x",
        );
        assert_eq!(q.query_type.var_names(), vec!["s", "p", "o", "start", "finish"]);
    }

    #[test]
    fn association_templates_bind_participant_interval() {
        let text = Query::associated(
            iri("http://example.com/alice"),
            iri("http://example.com/employment"),
        )
        .to_sparql();
        assert!(text.contains("FILTER(?s != <http://example.com/alice>)"));
        assert!(text.contains(&format!("?participant <{BEGINNING}> ?b")));
        assert!(text.contains(&format!(
            "?association <{MEMBER_OF_KIND}> <http://example.com/employment>"
        )));
    }

    #[test]
    fn scoped_partial_sign_templates() {
        let activity = Query::members_of_class_by_activity_and_partial_sign(
            iri("http://example.com/audit"),
            iri("http://example.com/employee"),
            "smi",
            false,
        )
        .to_sparql();
        assert!(activity.contains(&format!("<http://example.com/audit> <{REFERENCES}> ?s")));
        assert!(activity.contains("LCASE(\"smi\")"));

        let composition = Query::members_of_class_by_composition_and_partial_sign(
            iri("http://example.com/team"),
            iri("http://example.com/employee"),
            "Smi",
            true,
        )
        .to_sparql();
        assert!(composition.contains(&format!("?s <{PART__OF}> <http://example.com/team>")));
        assert!(composition.contains("FILTER(CONTAINS(?sign_text, \"Smi\"))"));
    }

    #[test]
    fn row_binding_replaces() {
        let mut row = QueryResult::new().with(SUBJECT, iri("http://example.com/s"));
        row.bind(SUBJECT, iri("http://example.com/t"));
        assert_eq!(
            row.get(SUBJECT).and_then(Value::as_iri),
            Some(&iri("http://example.com/t"))
        );
        assert_eq!(row.bindings().len(), 1);
    }
}

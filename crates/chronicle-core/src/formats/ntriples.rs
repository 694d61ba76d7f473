//! N-Triples text dump.
//!
//! Writing emits one `<s> <p> object .` line per triple, subjects in the order
//! given. Reading accepts the subset the writer produces plus comments, blank
//! lines, language tags (dropped) and `\uXXXX` escapes. Blank nodes are
//! rejected.

use crate::change::Triple;
use crate::primitives::MAX_LITERAL_LENGTH;
use crate::query::render_term;
use crate::vocab::{XSD_BOOLEAN, XSD_INTEGER};
use crate::{ChronicleError, Iri, Thing, Value};
use std::io::Write;

/// Write Things as N-Triples.
pub fn write_ntriples(things: &[Thing], out: &mut dyn Write) -> Result<(), ChronicleError> {
    for thing in things {
        for (predicate, value) in thing.triples() {
            writeln!(out, "<{}> <{}> {} .", thing.id(), predicate, render_term(value))?;
        }
    }
    Ok(())
}

/// Parse an N-Triples document.
pub fn parse_ntriples(text: &str) -> Result<Vec<Triple>, ChronicleError> {
    let mut triples = Vec::new();
    for (index, line) in text.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let mut parser = LineParser {
            rest: trimmed,
            line: index + 1,
        };
        let subject = parser.iri()?;
        let predicate = parser.iri()?;
        let object = parser.object()?;
        parser.end()?;
        triples.push(Triple::new(subject, predicate, object));
    }
    Ok(triples)
}

struct LineParser<'a> {
    rest: &'a str,
    line: usize,
}

impl LineParser<'_> {
    fn error(&self, message: impl std::fmt::Display) -> ChronicleError {
        ChronicleError::Serialization(format!("N-Triples line {}: {message}", self.line))
    }

    fn skip_whitespace(&mut self) {
        self.rest = self.rest.trim_start();
    }

    fn iri(&mut self) -> Result<Iri, ChronicleError> {
        self.skip_whitespace();
        if self.rest.starts_with("_:") {
            return Err(self.error("blank nodes are not supported"));
        }
        let Some(body) = self.rest.strip_prefix('<') else {
            return Err(self.error("expected '<'"));
        };
        let Some(end) = body.find('>') else {
            return Err(self.error("unterminated IRI"));
        };
        let iri = Iri::parse(&body[..end]).map_err(|e| self.error(e))?;
        self.rest = &body[end + 1..];
        Ok(iri)
    }

    fn object(&mut self) -> Result<Value, ChronicleError> {
        self.skip_whitespace();
        if !self.rest.starts_with('"') {
            return self.iri().map(Value::Iri);
        }

        let lexical = self.literal()?;
        if let Some(after) = self.rest.strip_prefix("^^") {
            self.rest = after;
            let datatype = self.iri()?;
            return match datatype.as_str() {
                XSD_INTEGER => lexical
                    .parse::<i64>()
                    .map(Value::Integer)
                    .map_err(|e| self.error(format!("bad integer {lexical:?}: {e}"))),
                XSD_BOOLEAN => match lexical.as_str() {
                    "true" | "1" => Ok(Value::Boolean(true)),
                    "false" | "0" => Ok(Value::Boolean(false)),
                    _ => Err(self.error(format!("bad boolean {lexical:?}"))),
                },
                _ => Ok(Value::Text(lexical)),
            };
        }
        if let Some(after) = self.rest.strip_prefix('@') {
            let tag_len = after
                .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-'))
                .unwrap_or(after.len());
            self.rest = &after[tag_len..];
        }
        Ok(Value::Text(lexical))
    }

    fn literal(&mut self) -> Result<String, ChronicleError> {
        let mut out = String::new();
        let mut chars = self.rest.char_indices().skip(1);
        while let Some((i, c)) = chars.next() {
            match c {
                '"' => {
                    self.rest = &self.rest[i + 1..];
                    return Ok(out);
                }
                '\\' => {
                    let Some((_, escaped)) = chars.next() else {
                        break;
                    };
                    match escaped {
                        '\\' => out.push('\\'),
                        '"' => out.push('"'),
                        'n' => out.push('\n'),
                        'r' => out.push('\r'),
                        't' => out.push('\t'),
                        'u' => {
                            let hex: String = chars.by_ref().take(4).map(|(_, h)| h).collect();
                            let decoded = u32::from_str_radix(&hex, 16)
                                .ok()
                                .and_then(char::from_u32)
                                .ok_or_else(|| self.error(format!("bad escape \\u{hex}")))?;
                            out.push(decoded);
                        }
                        other => return Err(self.error(format!("bad escape \\{other}"))),
                    }
                }
                c => out.push(c),
            }
            if out.len() > MAX_LITERAL_LENGTH {
                return Err(self.error(format!(
                    "literal exceeds maximum length of {MAX_LITERAL_LENGTH}"
                )));
            }
        }
        Err(self.error("unterminated literal"))
    }

    fn end(&mut self) -> Result<(), ChronicleError> {
        self.skip_whitespace();
        let Some(after) = self.rest.strip_prefix('.') else {
            return Err(self.error("expected '.'"));
        };
        let trailing = after.trim_start();
        if !trailing.is_empty() && !trailing.starts_with('#') {
            return Err(self.error(format!("unexpected trailing text {trailing:?}")));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn iri(s: &str) -> Iri {
        Iri::parse(format!("http://example.com/{s}")).expect("valid iri")
    }

    #[test]
    fn writes_one_line_per_triple() {
        let thing = Thing::new(iri("a"))
            .with_value(iri("name"), "Ann \"A\"")
            .with_value(iri("age"), 42i64);
        let mut out = Vec::new();
        write_ntriples(&[thing], &mut out).expect("write");
        let text = String::from_utf8(out).expect("utf8");
        assert_eq!(text.lines().count(), 2);
        assert!(text.contains(&format!(
            "<http://example.com/a> <http://example.com/age> \"42\"^^<{XSD_INTEGER}> ."
        )));
        assert!(text.contains("\"Ann \\\"A\\\"\""));
    }

    #[test]
    fn parses_comments_and_blank_lines() {
        let doc = "# header\n\n<http://example.com/a> <http://example.com/p> <http://example.com/b> .\n";
        let triples = parse_ntriples(doc).expect("parse");
        assert_eq!(triples.len(), 1);
        assert_eq!(triples[0].object(), &Value::from(iri("b")));
    }

    #[test]
    fn parses_typed_and_tagged_literals() {
        let doc = format!(
            "<http://example.com/a> <http://example.com/p> \"true\"^^<{XSD_BOOLEAN}> .\n\
             <http://example.com/a> <http://example.com/q> \"hi\\tthere\"@en-GB .\n\
             <http://example.com/a> <http://example.com/r> \"caf\\u00E9\" . # trailing\n"
        );
        let triples = parse_ntriples(&doc).expect("parse");
        assert_eq!(triples[0].object(), &Value::Boolean(true));
        assert_eq!(triples[1].object(), &Value::text("hi\tthere"));
        assert_eq!(triples[2].object(), &Value::text("café"));
    }

    #[test]
    fn reports_line_numbers() {
        let doc = "<http://example.com/a> <http://example.com/p> \"x\" .\n<http://example.com/a> oops .\n";
        let err = parse_ntriples(doc).expect_err("should fail");
        assert!(err.to_string().contains("line 2"), "{err}");
    }

    #[test]
    fn rejects_blank_nodes_and_unterminated_literals() {
        assert!(parse_ntriples("_:b0 <http://example.com/p> \"x\" .").is_err());
        assert!(parse_ntriples("<http://example.com/a> <http://example.com/p> \"x .").is_err());
        assert!(parse_ntriples("<http://example.com/a> <http://example.com/p> \"x\"").is_err());
    }
}

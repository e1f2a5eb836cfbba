//! `//spicegen:` metatag parsing
//!
//! Doc comments on a member may carry directives that override automatic
//! inference:
//!
//! - `//spicegen:subject_type=<type>[#<relation>]` adds an allowed subject
//!   type (repeatable). The type does not have to exist in the schema.
//! - `//spicegen:rename=<name>` changes the generated name of the member.
//!
//! Unknown tags are accepted and ignored. Malformed metatags are reported as
//! [`MetatagError`] and skipped by [`extract_metatags`].

use crate::schema::{AllowedSubjectTypes, SubjectRef};
use regex::Regex;
use std::sync::OnceLock;
use thiserror::Error;
use tracing::warn;

const METATAG_PREFIX: &str = "spicegen:";

/// Errors for a single malformed metatag
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MetatagError {
    #[error("metatag has no tag name: {0:?}")]
    MissingTag(String),

    #[error("invalid metatag name: {0:?}")]
    InvalidTag(String),

    #[error("metatag '{tag}' requires a value")]
    MissingValue { tag: String },

    #[error("invalid subject type {0:?} (expected <type>[#<relation>])")]
    InvalidSubjectType(String),

    #[error("invalid rename target {0:?}")]
    InvalidRename(String),
}

/// One parsed metatag
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Metatag {
    SubjectType {
        subject_type: String,
        relation: SubjectRef,
    },
    Rename(String),
    Unrecognized {
        tag: String,
        value: Option<String>,
    },
}

/// Overrides collected from all metatags of a member
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metatags {
    /// `Some` once at least one `subject_type` tag parsed
    pub override_subject_types: Option<AllowedSubjectTypes>,
    pub rename: Option<String>,
}

/// Tag body: `<tag>` or `<tag>=<value>`
const TAG_PATTERN: &str = r"^(?P<tag>[^=\s]*)(?:=(?P<value>.*))?$";
const IDENTIFIER_PATTERN: &str = r"^[A-Za-z_][A-Za-z0-9_]*$";
/// Optionally prefixed type name, or the wildcard
const TYPE_NAME_PATTERN: &str = r"^(?:[A-Za-z_][A-Za-z0-9_]*/)*[A-Za-z_][A-Za-z0-9_]*$|^\*$";

struct Patterns {
    tag: Regex,
    identifier: Regex,
    type_name: Regex,
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        let compile = |pattern: &str| Regex::new(pattern).expect("Invalid metatag pattern");
        Patterns {
            tag: compile(TAG_PATTERN),
            identifier: compile(IDENTIFIER_PATTERN),
            type_name: compile(TYPE_NAME_PATTERN),
        }
    })
}

/// Strips comment decoration: leading `/` and `*`, trailing `*/`, whitespace.
fn strip_comment(line: &str) -> &str {
    let line = line.trim();
    let line = line.strip_suffix("*/").unwrap_or(line);
    line.trim_start_matches(&['/', '*'][..]).trim()
}

/// Parses one comment line.
///
/// Returns `Ok(None)` when the line is not a spicegen metatag at all.
pub fn parse_metatag(line: &str) -> Result<Option<Metatag>, MetatagError> {
    let Some(body) = strip_comment(line).strip_prefix(METATAG_PREFIX) else {
        return Ok(None);
    };
    let body = body.trim();

    let captures = patterns()
        .tag
        .captures(body)
        .ok_or_else(|| MetatagError::InvalidTag(body.to_string()))?;
    let tag = captures.name("tag").map_or("", |m| m.as_str());
    let value = captures.name("value").map(|m| m.as_str().trim());

    if tag.is_empty() {
        return Err(MetatagError::MissingTag(body.to_string()));
    }
    if !patterns().identifier.is_match(tag) {
        return Err(MetatagError::InvalidTag(tag.to_string()));
    }

    let metatag = match tag {
        "subject_type" => {
            let value = require_value(tag, value)?;
            parse_subject_type(value)?
        }
        "rename" => {
            let value = require_value(tag, value)?;
            if !patterns().identifier.is_match(value) {
                return Err(MetatagError::InvalidRename(value.to_string()));
            }
            Metatag::Rename(value.to_string())
        }
        _ => Metatag::Unrecognized {
            tag: tag.to_string(),
            value: value.map(str::to_string),
        },
    };
    Ok(Some(metatag))
}

fn require_value<'a>(tag: &str, value: Option<&'a str>) -> Result<&'a str, MetatagError> {
    match value {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(MetatagError::MissingValue {
            tag: tag.to_string(),
        }),
    }
}

fn parse_subject_type(value: &str) -> Result<Metatag, MetatagError> {
    let invalid = || MetatagError::InvalidSubjectType(value.to_string());

    let (subject_type, relation) = match value.split_once('#') {
        Some((subject_type, relation)) => {
            if relation != "..." && !patterns().identifier.is_match(relation) {
                return Err(invalid());
            }
            (subject_type, Some(relation))
        }
        None => (value, None),
    };
    if !patterns().type_name.is_match(subject_type) {
        return Err(invalid());
    }

    Ok(Metatag::SubjectType {
        subject_type: subject_type.to_string(),
        relation: SubjectRef::from_relation(relation),
    })
}

/// Collects the overrides declared by a member's doc comments.
///
/// Each comment may span several lines; every line is parsed on its own.
/// Malformed metatags are logged and skipped. A repeated `rename` keeps the
/// last value.
pub fn extract_metatags<'a>(comments: impl IntoIterator<Item = &'a str>) -> Metatags {
    let mut metatags = Metatags::default();

    for line in comments.into_iter().flat_map(str::lines) {
        match parse_metatag(line) {
            Ok(Some(Metatag::SubjectType {
                subject_type,
                relation,
            })) => {
                metatags
                    .override_subject_types
                    .get_or_insert_with(AllowedSubjectTypes::new)
                    .insert(subject_type, relation);
            }
            Ok(Some(Metatag::Rename(name))) => metatags.rename = Some(name),
            Ok(Some(Metatag::Unrecognized { tag, .. })) => {
                warn!(tag = %tag, "ignoring unrecognized spicegen metatag");
            }
            Ok(None) => {}
            Err(err) => {
                warn!(line = line.trim(), error = %err, "skipping malformed spicegen metatag");
            }
        }
    }

    metatags
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_patterns_compile() {
        for pattern in [TAG_PATTERN, IDENTIFIER_PATTERN, TYPE_NAME_PATTERN] {
            assert!(Regex::new(pattern).is_ok(), "{pattern}");
        }

        let patterns = patterns();
        let captures = patterns.tag.captures("subject_type=team#member").unwrap();
        assert_eq!(&captures["tag"], "subject_type");
        assert_eq!(&captures["value"], "team#member");
        assert!(patterns.identifier.is_match("can_view"));
        assert!(!patterns.identifier.is_match("9lives"));
        assert!(patterns.type_name.is_match("org/user"));
        assert!(patterns.type_name.is_match("*"));
        assert!(!patterns.type_name.is_match("org/"));
    }

    #[test_case("//spicegen:subject_type=widget", "widget", SubjectRef::Direct ; "plain type")]
    #[test_case("//spicegen:subject_type=team#member", "team", SubjectRef::Via("member".to_string()) ; "type with relation")]
    #[test_case("// spicegen:subject_type=team#...", "team", SubjectRef::Direct ; "explicit direct marker")]
    #[test_case("/** spicegen:subject_type=org/user */", "org/user", SubjectRef::Direct ; "block comment with prefixed type")]
    #[test_case("//spicegen:subject_type=*", "*", SubjectRef::Direct ; "wildcard")]
    fn test_parse_subject_type(line: &str, subject_type: &str, relation: SubjectRef) {
        let parsed = parse_metatag(line).unwrap().unwrap();
        assert_eq!(
            parsed,
            Metatag::SubjectType {
                subject_type: subject_type.to_string(),
                relation,
            }
        );
    }

    #[test]
    fn test_parse_rename() {
        assert_eq!(
            parse_metatag("//spicegen:rename=can_read").unwrap(),
            Some(Metatag::Rename("can_read".to_string()))
        );
    }

    #[test]
    fn test_parse_unrecognized() {
        assert_eq!(
            parse_metatag("//spicegen:deprecated").unwrap(),
            Some(Metatag::Unrecognized {
                tag: "deprecated".to_string(),
                value: None,
            })
        );
    }

    #[test_case("// just a comment" ; "plain comment")]
    #[test_case("" ; "empty line")]
    #[test_case("// see spicegen:rename=x" ; "tag not at start")]
    fn test_not_a_metatag(line: &str) {
        assert_eq!(parse_metatag(line).unwrap(), None);
    }

    #[test_case("//spicegen:", MetatagError::MissingTag(String::new()) ; "no tag")]
    #[test_case("//spicegen:=widget", MetatagError::MissingTag("=widget".to_string()) ; "no tag before value")]
    #[test_case("//spicegen:sub-type=x", MetatagError::InvalidTag("sub-type".to_string()) ; "bad tag name")]
    #[test_case("//spicegen:subject_type", MetatagError::MissingValue { tag: "subject_type".to_string() } ; "no value")]
    #[test_case("//spicegen:subject_type=", MetatagError::MissingValue { tag: "subject_type".to_string() } ; "empty value")]
    #[test_case("//spicegen:subject_type=#member", MetatagError::InvalidSubjectType("#member".to_string()) ; "missing type")]
    #[test_case("//spicegen:subject_type=team#", MetatagError::InvalidSubjectType("team#".to_string()) ; "missing relation")]
    #[test_case("//spicegen:subject_type=team#a#b", MetatagError::InvalidSubjectType("team#a#b".to_string()) ; "two relations")]
    #[test_case("//spicegen:rename=can read", MetatagError::InvalidRename("can read".to_string()) ; "rename with space")]
    fn test_malformed(line: &str, expected: MetatagError) {
        assert_eq!(parse_metatag(line), Err(expected));
    }

    #[test]
    fn test_extract_collects_overrides() {
        let comments = [
            "//spicegen:subject_type=user",
            "//spicegen:subject_type=team#member",
            "//spicegen:rename=readers",
        ];
        let metatags = extract_metatags(comments);

        let overrides = metatags.override_subject_types.unwrap();
        assert_eq!(overrides.len(), 2);
        assert_eq!(overrides.get("user"), Some(&SubjectRef::Direct));
        assert_eq!(overrides.get("team"), Some(&SubjectRef::Via("member".to_string())));
        assert_eq!(metatags.rename.as_deref(), Some("readers"));
    }

    #[test]
    fn test_extract_skips_malformed() {
        let comments = [
            "//spicegen:subject_type=",
            "//spicegen:rename=",
            "//spicegen:subject_type=widget",
        ];
        let metatags = extract_metatags(comments);

        let overrides = metatags.override_subject_types.unwrap();
        assert_eq!(overrides.len(), 1);
        assert!(overrides.contains("widget"));
        assert_eq!(metatags.rename, None);
    }

    #[test]
    fn test_extract_multiline_comment() {
        let comments = ["/**\n * viewers of the document\n * spicegen:rename=viewers\n */"];
        let metatags = extract_metatags(comments);
        assert_eq!(metatags.rename.as_deref(), Some("viewers"));
        assert!(metatags.override_subject_types.is_none());
    }

    #[test]
    fn test_extract_nothing() {
        let metatags = extract_metatags(["// documents readable by anyone"]);
        assert_eq!(metatags, Metatags::default());
    }
}

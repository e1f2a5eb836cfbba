//! Member kind classification

use crate::compiled::{MemberKind, MetadataMessage};
use crate::schema::RelationKind;

/// Classifies a member from its compiler metadata.
///
/// The first `RelationMetadata` message carrying a relation or permission
/// kind decides; anything else yields [`RelationKind::Unknown`].
pub fn classify_kind(metadata: &[MetadataMessage]) -> RelationKind {
    metadata
        .iter()
        .find_map(|message| match message {
            MetadataMessage::RelationMetadata {
                kind: MemberKind::Relation,
            } => Some(RelationKind::Relation),
            MetadataMessage::RelationMetadata {
                kind: MemberKind::Permission,
            } => Some(RelationKind::Permission),
            _ => None,
        })
        .unwrap_or(RelationKind::Unknown)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_relation() {
        let metadata = vec![MetadataMessage::RelationMetadata {
            kind: MemberKind::Relation,
        }];
        assert_eq!(classify_kind(&metadata), RelationKind::Relation);
    }

    #[test]
    fn test_classify_permission_after_comments() {
        let metadata = vec![
            MetadataMessage::DocComment {
                content: "// who can view".to_string(),
            },
            MetadataMessage::RelationMetadata {
                kind: MemberKind::Unspecified,
            },
            MetadataMessage::RelationMetadata {
                kind: MemberKind::Permission,
            },
        ];
        assert_eq!(classify_kind(&metadata), RelationKind::Permission);
    }

    #[test]
    fn test_classify_unknown() {
        assert_eq!(classify_kind(&[]), RelationKind::Unknown);
        assert_eq!(
            classify_kind(&[MetadataMessage::Other]),
            RelationKind::Unknown
        );
    }
}

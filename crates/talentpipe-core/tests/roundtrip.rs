//! Property tests for attachment id round-trips.

use proptest::prelude::*;

use talentpipe_core::{AttachmentId, attachment_descriptors, locate};
use talentpipe_imap::{BodyStructure, LeafPart, Uid};

fn leaf_strategy() -> impl Strategy<Value = BodyStructure> {
    (
        prop_oneof![
            Just(("TEXT", "PLAIN")),
            Just(("TEXT", "HTML")),
            Just(("APPLICATION", "PDF")),
            Just(("APPLICATION", "MSWORD")),
            Just(("IMAGE", "PNG")),
        ],
        proptest::option::of("[a-z]{1,8}\\.(pdf|docx|png)"),
        proptest::option::of(prop_oneof![
            Just("attachment".to_string()),
            Just("inline".to_string())
        ]),
    )
        .prop_map(|((media, sub), filename, disposition)| {
            BodyStructure::Part(LeafPart {
                media_type: media.to_string(),
                media_subtype: sub.to_string(),
                encoding: "BASE64".to_string(),
                size: 1024,
                disposition,
                disposition_params: filename
                    .map(|f| vec![("filename".to_string(), f)])
                    .unwrap_or_default(),
                ..LeafPart::default()
            })
        })
}

fn tree_strategy() -> impl Strategy<Value = BodyStructure> {
    leaf_strategy().prop_recursive(3, 24, 4, |inner| {
        (
            proptest::collection::vec(inner, 1..4),
            prop_oneof![Just("MIXED".to_string()), Just("ALTERNATIVE".to_string())],
        )
            .prop_map(|(parts, subtype)| BodyStructure::Multipart { parts, subtype })
    })
}

proptest! {
    /// Every descriptor the indexer produces resolves, through the
    /// locator, back to the exact part path that produced it.
    #[test]
    fn list_then_locate_is_identity(tree in tree_strategy(), uid in 1u32..10_000) {
        let uid = Uid::new(uid).unwrap();
        for descriptor in attachment_descriptors(uid, &tree) {
            let id: AttachmentId = descriptor.id.parse().unwrap();
            let located = locate(&tree, &id).unwrap();
            prop_assert_eq!(located.part_path, descriptor.part_path);
            prop_assert_eq!(located.filename, descriptor.filename);
        }
    }

    /// An ordinal past the end of the walk is NotFound, never a panic.
    #[test]
    fn out_of_range_ordinal_never_panics(tree in tree_strategy(), uid in 1u32..10_000) {
        let uid = Uid::new(uid).unwrap();
        let count = attachment_descriptors(uid, &tree).len();
        let id: AttachmentId = format!("att-{}-{}", uid.get(), count + 1).parse().unwrap();
        prop_assert!(locate(&tree, &id).is_err());
    }
}

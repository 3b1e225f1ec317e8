//! Property tests for the YAML codec and the merge engine.

use proptest::prelude::*;
use serde_json::{Map, Value};
use vconf_document::{merge, parse, to_yaml, Fragment, Section, SectionKind, VectorConfig};

/// Strings a YAML parser would read as something other than a plain string
fn yaml_significant() -> impl Strategy<Value = String> {
    prop::sample::select(vec![
        "<<", "~", "null", "true", "no", "123", "-1.5", "0x1F", ".inf", "a: b", "- item",
        "#comment", "line one\nline two", "trailing\n", " padded ", "&anchor", "*alias",
        "!tag", "'", "\"", "{}", "[]", "%directive", "---",
    ])
    .prop_map(String::from)
}

fn key() -> impl Strategy<Value = String> {
    prop_oneof![
        3 => any::<String>().prop_filter("key must be non-empty", |s| !s.is_empty()),
        1 => yaml_significant(),
    ]
}

fn leaf() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::from),
        (-1.0e6f64..1.0e6).prop_map(Value::from),
        any::<String>().prop_map(Value::String),
        yaml_significant().prop_map(Value::String),
        Just(Value::String(String::new())),
        Just(Value::String("contains(string(.message) ?? \"\", \"no_tag\") != true".into())),
    ]
}

fn opaque() -> impl Strategy<Value = Value> {
    leaf().prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::btree_map(key(), inner, 0..4)
                .prop_map(|entries| Value::Object(entries.into_iter().collect::<Map<_, _>>())),
        ]
    })
}

fn section() -> impl Strategy<Value = Section> {
    prop::collection::btree_map(key(), opaque(), 0..5)
}

fn document() -> impl Strategy<Value = VectorConfig> {
    (
        prop::option::of("/[a-z0-9/_-]{1,20}"),
        section(),
        section(),
        section(),
    )
        .prop_map(|(data_dir, sources, transforms, sinks)| VectorConfig {
            data_dir,
            sources,
            transforms,
            sinks,
            ..VectorConfig::default()
        })
}

fn fragment() -> impl Strategy<Value = Fragment> {
    (section(), section(), section()).prop_map(|(sources, transforms, sinks)| Fragment {
        sources,
        transforms,
        sinks,
    })
}

proptest! {
    #[test]
    fn prop_parse_inverts_to_yaml(doc in document()) {
        let text = to_yaml(&doc).unwrap();
        prop_assert_eq!(parse(&text).unwrap(), doc);
    }

    #[test]
    fn prop_merge_empty_fragment_is_identity(doc in document()) {
        prop_assert_eq!(merge(&doc, &Fragment::new()), doc);
    }

    #[test]
    fn prop_merge_keeps_untouched_and_applies_supplied(doc in document(), frag in fragment()) {
        let merged = merge(&doc, &frag);
        prop_assert_eq!(&merged.data_dir, &doc.data_dir);

        for kind in SectionKind::ALL {
            let before = doc.section(kind);
            let patch = frag.section(kind);
            let after = merged.section(kind);

            for (key, value) in patch {
                prop_assert_eq!(after.get(key), Some(value));
            }
            for (key, value) in before {
                if !patch.contains_key(key) {
                    prop_assert_eq!(after.get(key), Some(value));
                }
            }
            for key in after.keys() {
                prop_assert!(before.contains_key(key) || patch.contains_key(key));
            }
        }
    }

    #[test]
    fn prop_merge_is_idempotent(doc in document(), frag in fragment()) {
        let once = merge(&doc, &frag);
        prop_assert_eq!(merge(&once, &frag), once);
    }

    #[test]
    fn prop_merged_document_roundtrips(doc in document(), frag in fragment()) {
        let merged = merge(&doc, &frag);
        let text = to_yaml(&merged).unwrap();
        prop_assert_eq!(parse(&text).unwrap(), merged);
    }
}

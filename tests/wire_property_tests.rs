//! Property-based tests for the data wire adapter (proptest).

use proptest::prelude::*;
use serde_json::{json, Value};

use batchsave::wire::persisted_id;
use batchsave::{generate_temp_id, is_temp_id, prepare_data_for_server, process_data_from_server};
use batchsave::{Record, WireSchema};

/// What the backend hands back for a row it stored: array columns come back as JSON text.
fn as_stored(wire: &Record, array_fields: &[&str]) -> Record {
    let mut stored = wire.clone();
    for field in array_fields {
        if let Some(value) = stored.get_mut(*field) {
            *value = Value::String(value.to_string());
        }
    }
    stored
}

proptest! {
    #[test]
    fn prop_arrays_and_bools_survive_a_save_and_reload(
        tags in prop::collection::vec("[a-z]{1,8}", 0..6),
        active in any::<bool>(),
        area in -1_000_000i64..1_000_000,
    ) {
        let mut entity = Record::new();
        entity.insert("id".to_string(), json!(-1));
        entity.insert("tags".to_string(), json!(tags));
        entity.insert("is_active".to_string(), json!(active));
        entity.insert("area".to_string(), json!(area));

        let wire = prepare_data_for_server(&entity, &WireSchema::new());
        prop_assert!(!wire.contains_key("id"));
        prop_assert_eq!(&wire["is_active"], &json!(i64::from(active)));

        let reloaded = process_data_from_server(&as_stored(&wire, &["tags"]), &["tags"], &["is_active"]);
        prop_assert_eq!(&reloaded["tags"], &json!(tags));
        prop_assert_eq!(&reloaded["is_active"], &json!(active));
        prop_assert_eq!(&reloaded["area"], &json!(area));
    }

    #[test]
    fn prop_null_fields_never_reach_the_wire(
        keys in prop::collection::btree_set("[a-z_]{1,10}", 1..8),
    ) {
        let entity: Record = keys.iter().map(|k| (k.clone(), Value::Null)).collect();
        prop_assert!(prepare_data_for_server(&entity, &WireSchema::new()).is_empty());
    }

    #[test]
    fn prop_text_fields_are_always_strings(n in any::<i32>(), f in -1e6f64..1e6) {
        let mut entity = Record::new();
        entity.insert("code".to_string(), json!(n));
        entity.insert("share".to_string(), json!(f));
        let schema = WireSchema::new().with_text_field("code").with_text_field("share");

        let wire = prepare_data_for_server(&entity, &schema);
        prop_assert_eq!(&wire["code"], &json!(n.to_string()));
        prop_assert!(wire["share"].is_string());
    }

    #[test]
    fn prop_only_positive_ids_count_as_persisted(id in any::<i64>()) {
        let mut record = Record::new();
        record.insert("id".to_string(), json!(id));
        prop_assert_eq!(persisted_id(&record), (id > 0).then_some(id));
    }

    #[test]
    fn prop_temp_ids_carry_their_prefix(prefix in "[a-z]{1,12}") {
        let id = generate_temp_id(&prefix);
        prop_assert!(is_temp_id(&id));
        let expected = format!("temp_{prefix}_");
        prop_assert!(id.starts_with(&expected));
    }
}

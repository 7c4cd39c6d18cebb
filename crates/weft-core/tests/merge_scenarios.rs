//! Concrete merge scenarios across change kinds

use serde_json::json;
use std::sync::Arc;
use weft_core::{
    encode_value, Change, CoreError, FieldKind, Key, Move, PathChange, Registry, Replace, Splice,
    StructDef, Value, MAX_POSITION,
};

fn splice(offset: i64, before: &str, after: &str) -> Change {
    Change::Splice(Splice::new(offset, Value::text(before), Value::text(after)))
}

fn moved(offset: i64, count: i64, distance: i64) -> Change {
    Change::Move(Move::new(offset, count, distance))
}

/// Merge `a` with `b` over `v` in both directions and return the result.
fn converge(v: &Value, a: &Change, b: &Change) -> Value {
    let (b2, a2) = a.merge(Some(b));
    let left = v.apply(a).apply_opt(b2.as_ref());
    let right = v.apply(b).apply_opt(a2.as_ref());
    assert_eq!(left, right, "diverged merging {:?} with {:?}", a, b);
    left
}

#[test]
fn test_append_and_capitalise_read_hello_world() {
    let v = Value::text("hello");
    let append = splice(5, "", " world");
    let capitalise = splice(0, "h", "H");
    assert_eq!(converge(&v, &append, &capitalise), Value::text("Hello world"));
    assert_eq!(converge(&v, &capitalise, &append), Value::text("Hello world"));
}

#[test]
fn test_move_index_table() {
    let forward = Move::new(1, 2, 3);
    let mapped: Vec<i64> = (0..7).map(|i| forward.map_index(i)).collect();
    assert_eq!(mapped, vec![0, 4, 5, 1, 2, 3, 6]);

    let backward = Move::new(3, 2, -2);
    let mapped: Vec<i64> = (0..6).map(|i| backward.map_index(i)).collect();
    assert_eq!(mapped, vec![0, 3, 4, 1, 2, 5]);

    // "abcdef" -> "adebcf": element "b" at 1 ends up at 3.
    assert_eq!(Value::text("abcdef").apply(&backward.into()), Value::text("adebcf"));
}

#[test]
fn test_disjoint_moves_converge() {
    let v = Value::text("abcdefgh");
    assert_eq!(
        converge(&v, &moved(0, 2, 2), &moved(5, 2, 1)),
        Value::text("cdabehfg")
    );
    assert_eq!(
        converge(&v, &moved(4, 2, -3), &moved(0, 1, 6)),
        Value::text("efbcdgah")
    );
}

#[test]
fn test_move_against_splice() {
    let v = Value::text("abcdefgh");

    // Splice entirely before the moved run.
    assert_eq!(
        converge(&v, &moved(5, 2, -4), &splice(2, "cd", "X")),
        Value::text("afgbXeh")
    );

    // Splice inside the moved run travels with it.
    assert_eq!(
        converge(&v, &moved(1, 3, 2), &splice(2, "c", "XY")),
        Value::text("aefbXYdgh")
    );
}

#[test]
fn test_move_remaps_list_path() {
    let v = Value::list((0..7).map(Value::int));
    let m = moved(1, 2, 3);
    let set = Change::Path(PathChange::new(
        vec![Key::Int(2)],
        Some(Change::Replace(Replace::new(Value::int(2), Value::int(20)))),
    ));

    let (set2, m2) = m.merge(Some(&set));
    assert_eq!(
        set2,
        Some(Change::Path(PathChange::new(
            vec![Key::Int(5)],
            Some(Change::Replace(Replace::new(Value::int(2), Value::int(20)))),
        )))
    );
    assert_eq!(m2, Some(m.clone()));
    assert_eq!(
        converge(&v, &m, &set),
        Value::list([0, 3, 4, 5, 1, 20, 6].map(Value::int))
    );
}

#[test]
fn test_replace_absorbs_nested_edits() {
    let v = Value::list([Value::text("boo"), Value::text("hoo")]);
    let edit = Change::Path(PathChange::new(vec![Key::Int(1)], Some(splice(0, "h", "m"))));
    let reset = Change::Replace(Replace::new(v.clone(), Value::list([])));

    assert_eq!(converge(&v, &edit, &reset), Value::list([]));
    let (edit2, reset2) = reset.merge(Some(&edit));
    assert_eq!(edit2, None);
    assert_eq!(
        reset2,
        Some(Change::Replace(Replace::new(
            Value::list([Value::text("boo"), Value::text("moo")]),
            Value::list([]),
        )))
    );
}

#[test]
fn test_decoder_rejects_positions_outside_the_safe_range() {
    let registry = Registry::new();
    let rejected = [
        json!({"changes.Move": [i64::MAX, 1, 1]}),
        json!({"changes.Move": [0, -1, 1]}),
        json!({"changes.Move": [-1, 1, 1]}),
        json!({"changes.Move": [0, 1, i64::MIN]}),
        json!({"changes.Move": [0, MAX_POSITION + 1, 0]}),
        json!({"changes.Splice": [i64::MAX, {"changes/types.S16": ""}, {"changes/types.S16": "x"}]}),
        json!({"changes.Splice": [-3, {"changes/types.S16": ""}, {"changes/types.S16": "x"}]}),
    ];
    for json in rejected {
        match registry.decode_change(&json) {
            Err(CoreError::Malformed(_)) => {}
            other => panic!("expected Malformed for {}, got {:?}", json, other),
        }
    }

    let accepted = registry
        .decode_change(&json!({"changes.Move": [MAX_POSITION, 0, -MAX_POSITION]}))
        .unwrap();
    assert_eq!(accepted, Some(moved(MAX_POSITION, 0, -MAX_POSITION)));
}

#[test]
fn test_extreme_moves_are_ignored_on_apply() {
    let v = Value::text("abc");
    assert_eq!(v.apply(&moved(i64::MAX, 1, 1)), v);
    assert_eq!(v.apply(&moved(1, i64::MAX, 1)), v);
    assert_eq!(v.apply(&moved(1, 1, i64::MIN)), v);
    assert_eq!(v.apply(&moved(i64::MIN, 1, -1)), v);

    let list = Value::list([Value::int(1), Value::int(2)]);
    assert_eq!(list.apply(&moved(0, 1, i64::MAX)), list);
}

#[test]
fn test_out_of_range_changes_merge_as_no_ops() {
    let v = Value::text("abc");
    let huge = splice(i64::MAX, "", "x");
    let upper = splice(1, "b", "B");
    assert!(!huge.within_bounds());
    assert!(upper.within_bounds());

    assert_eq!(converge(&v, &huge, &upper), Value::text("aBc"));
    assert_eq!(converge(&v, &upper, &huge), Value::text("aBc"));

    let wild = moved(1, 1, i64::MIN);
    assert!(!wild.within_bounds());
    assert_eq!(converge(&v, &wild, &moved(0, 1, 2)), Value::text("bca"));
    assert_eq!(converge(&v, &moved(0, 1, 2), &wild), Value::text("bca"));

    let nested = Change::Path(PathChange::new(vec![Key::Str("t".into())], Some(huge)));
    assert!(!nested.within_bounds());
    let doc = Value::map([(Key::Str("t".into()), v.clone())]);
    let edit = Change::Path(PathChange::new(vec![Key::Str("t".into())], Some(upper)));
    assert_eq!(
        converge(&doc, &nested, &edit),
        Value::map([(Key::Str("t".into()), Value::text("aBc"))])
    );
}

#[test]
fn test_huge_list_index_in_path_is_left_alone() {
    let v = Value::list([Value::int(1), Value::int(2), Value::int(3)]);
    let far = Change::Path(PathChange::new(
        vec![Key::Int(i64::MAX)],
        Some(Change::Replace(Replace::new(Value::Null, Value::int(9)))),
    ));
    let insert = Change::Splice(Splice::new(0, Value::list([]), Value::list([Value::int(0)])));
    let (far_after, _) = insert.merge(Some(&far));
    assert_eq!(far_after, Some(far.clone()));
    converge(&v, &far, &insert);
    converge(&v, &far, &moved(0, 1, 2));
}

fn todo_registry() -> (Arc<StructDef>, Registry) {
    let def = Arc::new(
        StructDef::new("Todo")
            .with_field("done", "done", FieldKind::Bool)
            .with_field("title", "title", FieldKind::Text),
    );
    let registry = Registry::new().with_struct(Arc::clone(&def));
    (def, registry)
}

#[test]
fn test_struct_field_rejects_value_of_wrong_kind() {
    let (def, registry) = todo_registry();
    let todo = def
        .instantiate(vec![Value::atomic(false), Value::text("milk")])
        .unwrap();

    let wrong = Change::Path(PathChange::new(
        vec![Key::Str("done".into())],
        Some(Change::Replace(Replace::new(Value::atomic(false), Value::text("yes")))),
    ));
    let after = todo.apply(&wrong);
    assert_eq!(after, todo);
    assert_eq!(registry.decode_value(&encode_value(&after)).unwrap(), todo);

    let right = Change::Path(PathChange::new(
        vec![Key::Str("done".into())],
        Some(Change::Replace(Replace::new(Value::atomic(false), Value::atomic(true)))),
    ));
    let done = todo.apply(&right);
    assert_eq!(done.get(&Key::Str("done".into())), Value::atomic(true));
    assert_eq!(registry.decode_value(&encode_value(&done)).unwrap(), done);

    let cleared = Change::Path(PathChange::new(
        vec![Key::Str("title".into())],
        Some(Change::Replace(Replace::new(Value::text("milk"), Value::Null))),
    ));
    let untitled = todo.apply(&cleared);
    assert_eq!(untitled.get(&Key::Str("title".into())), Value::Null);
    assert_eq!(registry.decode_value(&encode_value(&untitled)).unwrap(), untitled);

    assert!(def
        .instantiate(vec![Value::int(1), Value::text("milk")])
        .is_err());
}

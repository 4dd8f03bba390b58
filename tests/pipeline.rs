//! End-to-end coverage of the parse -> type-bind -> input-bind -> scan-bind
//! pipeline, against the mock reflector exposed by `sigilsql::testing`.

use std::any::TypeId;
use std::collections::BTreeMap;

use sigilsql::testing::{MockReflector, MockValue};
use sigilsql::value::Value;
use sigilsql::{bind_query, bind_scan, bind_types, ArgInfo, ScanContext, ScanTarget};

#[derive(Debug)]
struct PersonMarker;
#[derive(Debug)]
struct AddressMarker;
#[derive(Debug)]
struct PMarker;
#[derive(Debug)]
struct SMarker;
#[derive(Debug)]
struct S2Marker;
#[derive(Debug)]
struct MMarker;

fn person(id: i64, name: &str) -> MockValue {
    MockValue::struct_of(
        TypeId::of::<PersonMarker>(),
        "Person",
        vec![("id", false, Value::I64(id)), ("name", true, Value::Str(name.to_string()))],
    )
}

fn address(id: i64, district: &str, street: &str) -> MockValue {
    MockValue::struct_of(
        TypeId::of::<AddressMarker>(),
        "Address",
        vec![
            ("id", false, Value::I64(id)),
            ("district", false, Value::Str(district.to_string())),
            ("street", false, Value::Str(street.to_string())),
        ],
    )
}

/// Scenario A: generated output plus a plain member input.
#[test]
fn scenario_a_generated_output_and_member_input() {
    let prepare_args = [person(0, "")];
    let exprs = sigilsql::parser::parse("SELECT &Person.* FROM t WHERE id = $Person.id").unwrap();
    let arg_info = ArgInfo::build(&MockReflector, &prepare_args).unwrap();
    let typed = bind_types(exprs, &arg_info).unwrap();

    let mut bind_args = [person(7, "")];
    let primed = bind_query(&MockReflector, &typed, &mut bind_args).unwrap();

    assert_eq!(
        primed.sql,
        "SELECT id AS _sqlair_0, name AS _sqlair_1 FROM t WHERE id = @sqlair_0"
    );
    assert_eq!(primed.params.len(), 1);
    assert_eq!(primed.params[0].name, "sqlair_0");
    assert_eq!(primed.params[0].value, Value::I64(7));
    assert_eq!(primed.outputs.len(), 2);
}

/// Scenario B: two struct destinations scanned from one row, in order.
#[test]
fn scenario_b_scans_two_struct_destinations_in_order() {
    let prepare_args = [person(0, ""), address(0, "", "")];
    let exprs = sigilsql::parser::parse(
        "SELECT p.* AS &Person.*, a.id AS &Address.id FROM person p, address a",
    )
    .unwrap();
    let arg_info = ArgInfo::build(&MockReflector, &prepare_args).unwrap();
    let typed = bind_types(exprs, &arg_info).unwrap();

    let mut bind_args = [person(0, ""), address(0, "", "")];
    let primed = bind_query(&MockReflector, &typed, &mut bind_args).unwrap();
    assert_eq!(primed.outputs.len(), 3);

    let columns = vec![
        "_sqlair_0".to_string(),
        "_sqlair_1".to_string(),
        "_sqlair_2".to_string(),
    ];
    let mut destinations = [person(0, ""), address(0, "", "")];
    let ctx = ScanContext::build(&MockReflector, &mut destinations).unwrap();
    let (targets, on_success) = bind_scan(&primed.outputs, &columns, &ctx).unwrap();

    let values = [Value::I64(42), Value::Str("alice".into()), Value::I64(9)];
    for (target, value) in targets.iter().zip(values) {
        if let ScanTarget::Slot(slot) = target {
            slot.set(value);
        }
    }
    drop(ctx);

    let mut ctx = ScanContext::build(&MockReflector, &mut destinations).unwrap();
    on_success.commit(&MockReflector, ctx.type_to_value()).unwrap();

    assert_eq!(destinations[0].field("id"), Some(&Value::I64(42)));
    assert_eq!(destinations[0].field("name"), Some(&Value::Str("alice".into())));
    assert_eq!(destinations[1].field("id"), Some(&Value::I64(9)));
}

/// Scenario C: omitempty drops a zero-valued column from an asterisk INSERT.
#[test]
fn scenario_c_omitempty_insert_drops_zero_value() {
    let prepare_args = [MockValue::struct_of(
        TypeId::of::<PMarker>(),
        "P",
        vec![("id", false, Value::I64(0)), ("name", true, Value::Str(String::new()))],
    )];
    let exprs = sigilsql::parser::parse("INSERT INTO t (*) VALUES ($P.*)").unwrap();
    let arg_info = ArgInfo::build(&MockReflector, &prepare_args).unwrap();
    let typed = bind_types(exprs, &arg_info).unwrap();

    let mut empty_name = [MockValue::struct_of(
        TypeId::of::<PMarker>(),
        "P",
        vec![("id", false, Value::I64(1)), ("name", true, Value::Str(String::new()))],
    )];
    let primed = bind_query(&MockReflector, &typed, &mut empty_name).unwrap();
    assert_eq!(primed.sql, "(id) VALUES (@sqlair_0)");

    let mut with_name = [MockValue::struct_of(
        TypeId::of::<PMarker>(),
        "P",
        vec![("id", false, Value::I64(1)), ("name", true, Value::Str("x".into()))],
    )];
    let primed2 = bind_query(&MockReflector, &typed, &mut with_name).unwrap();
    assert_eq!(primed2.sql, "(id, name) VALUES (@sqlair_0, @sqlair_1)");
}

/// Scenario D: bulk INSERT expands one row tuple per slice element, and
/// rejects mismatched bulk lengths.
#[test]
fn scenario_d_bulk_insert_expands_rows_and_detects_mismatch() {
    let s = MockValue::slice_of(
        TypeId::of::<SMarker>(),
        "S",
        vec![Value::Str("a".into()), Value::Str("b".into())],
    );
    let s2 = MockValue::slice_of(TypeId::of::<S2Marker>(), "S2", vec![Value::I64(1), Value::I64(2)]);
    let exprs = sigilsql::parser::parse("INSERT INTO t (name, age) VALUES ($S[:], $S2[:])").unwrap();
    let arg_info = ArgInfo::build(&MockReflector, &[s.clone(), s2.clone()]).unwrap();
    let typed = bind_types(exprs, &arg_info).unwrap();

    let mut bind_args = [s, s2];
    let primed = bind_query(&MockReflector, &typed, &mut bind_args).unwrap();
    assert_eq!(
        primed.sql,
        "(name, age) VALUES (@sqlair_0, @sqlair_1), (@sqlair_2, @sqlair_3)"
    );
    let values: Vec<_> = primed.params.iter().map(|p| p.value.clone()).collect();
    assert_eq!(
        values,
        vec![
            Value::Str("a".into()),
            Value::Str("b".into()),
            Value::I64(1),
            Value::I64(2),
        ]
    );

    let mut mismatched = [
        MockValue::slice_of(TypeId::of::<SMarker>(), "S", vec![Value::Str("a".into())]),
        MockValue::slice_of(TypeId::of::<S2Marker>(), "S2", vec![Value::I64(1), Value::I64(2)]),
    ];
    let err = bind_query(&MockReflector, &typed, &mut mismatched).unwrap_err();
    assert!(matches!(
        err,
        sigilsql::Error::Bind(sigilsql::error::BindError::BulkLengthMismatch { .. })
    ));
}

/// Scenario E: map input resolves a key, and a missing key is the canonical
/// "does not contain key" error.
#[test]
fn scenario_e_map_input_and_missing_key() {
    let m = MockValue::map_of(
        TypeId::of::<MMarker>(),
        "M",
        BTreeMap::from([("k".to_string(), Value::Str("v".into()))]),
    );
    let exprs = sigilsql::parser::parse("SELECT street FROM t WHERE x = $M.k").unwrap();
    let arg_info = ArgInfo::build(&MockReflector, &[m.clone()]).unwrap();
    let typed = bind_types(exprs, &arg_info).unwrap();

    let mut ok = [m];
    let primed = bind_query(&MockReflector, &typed, &mut ok).unwrap();
    assert_eq!(primed.sql, "SELECT street FROM t WHERE x = @sqlair_0");
    assert_eq!(primed.params[0].value, Value::Str("v".into()));

    let mut wrong_key = [MockValue::map_of(
        TypeId::of::<MMarker>(),
        "M",
        BTreeMap::from([("K".to_string(), Value::Str("v".into()))]),
    )];
    let err = bind_query(&MockReflector, &typed, &mut wrong_key).unwrap_err();
    assert!(matches!(
        err,
        sigilsql::Error::Bind(sigilsql::error::BindError::MissingMapKey { .. })
    ));
}

/// Scenario F: a positional multi-column output, and the duplicate-output
/// prepare-time error when the same member is targeted twice.
#[test]
fn scenario_f_positional_output_and_duplicate_output_rejected() {
    let args = [address(1, "", "")];
    let exprs = sigilsql::parser::parse(
        "SELECT (a.district, a.street) AS (&Address.district, &Address.street) FROM a",
    )
    .unwrap();
    let arg_info = ArgInfo::build(&MockReflector, &args).unwrap();
    let typed = bind_types(exprs, &arg_info).unwrap();

    let mut bind_args = [address(1, "north", "main st")];
    let primed = bind_query(&MockReflector, &typed, &mut bind_args).unwrap();
    assert_eq!(
        primed.sql,
        "SELECT a.district AS _sqlair_0, a.street AS _sqlair_1 FROM a"
    );
    assert_eq!(primed.outputs.len(), 2);

    let dup_exprs = sigilsql::parser::parse(
        "SELECT (a.district, a.street) AS (&Address.district, &Address.street), a.district AS &Address.district FROM a",
    )
    .unwrap();
    let err = bind_types(dup_exprs, &arg_info).unwrap_err();
    assert!(matches!(err, sigilsql::error::PrepareError::DuplicateOutput { .. }));
}

/// Invariant 4: an argument passed to bind but never referenced by any
/// input or output expression is rejected.
#[test]
fn unused_argument_is_rejected() {
    let args = [person(0, "")];
    let exprs = sigilsql::parser::parse("SELECT 1 FROM t").unwrap();
    let arg_info = ArgInfo::build(&MockReflector, &args).unwrap();
    let typed = bind_types(exprs, &arg_info).unwrap();

    let mut bind_args = [person(1, "x")];
    let err = bind_query(&MockReflector, &typed, &mut bind_args).unwrap_err();
    assert!(matches!(
        err,
        sigilsql::Error::Bind(sigilsql::error::BindError::UnusedType { .. })
    ));
}

/// Spec §4.6 / §8 testable property 7: a NULL-scanned column lands in a
/// non-nullable struct field as that field's zero value, never as
/// `Value::Null` itself.
#[test]
fn null_column_scans_to_field_zero_value_not_null() {
    let prepare_args = [person(0, "")];
    let exprs = sigilsql::parser::parse("SELECT &Person.* FROM t").unwrap();
    let arg_info = ArgInfo::build(&MockReflector, &prepare_args).unwrap();
    let typed = bind_types(exprs, &arg_info).unwrap();

    let mut destinations = [person(7, "preexisting")];
    let ctx = ScanContext::build(&MockReflector, &mut destinations).unwrap();
    let columns = vec!["_sqlair_0".to_string(), "_sqlair_1".to_string()];
    let (targets, on_success) = bind_scan(
        &bind_query(&MockReflector, &typed, &mut [person(0, "")])
            .unwrap()
            .outputs,
        &columns,
        &ctx,
    )
    .unwrap();

    for target in &targets {
        if let ScanTarget::Slot(slot) = target {
            slot.set(Value::Null);
        }
    }
    drop(ctx);

    let mut ctx = ScanContext::build(&MockReflector, &mut destinations).unwrap();
    on_success.commit(&MockReflector, ctx.type_to_value()).unwrap();

    assert_eq!(destinations[0].field("id"), Some(&Value::I64(0)));
    assert_eq!(destinations[0].field("name"), Some(&Value::Str(String::new())));
}

/// Invariant 3: concatenating bypass text and every substitution's raw
/// source reproduces the original query byte for byte.
#[test]
fn text_preservation_round_trips_every_byte() {
    let query = "SELECT &Person.* FROM t WHERE id = $Person.id -- trailing\n";
    let exprs = sigilsql::parser::parse(query).unwrap();
    let mut joined = String::new();
    for expr in &exprs {
        match expr {
            sigilsql::parser::Expr::Bypass { text } => joined.push_str(text),
            sigilsql::parser::Expr::Input { raw, .. }
            | sigilsql::parser::Expr::Output { raw, .. }
            | sigilsql::parser::Expr::Insert { raw, .. } => joined.push_str(raw),
        }
    }
    assert_eq!(joined, query);
}

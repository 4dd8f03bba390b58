//! Input-binder / SQL builder: resolves locators to runtime values against
//! caller-supplied arguments, assigns numbered placeholders, rewrites
//! INSERT expressions into multi-row `VALUES` lists, and assembles the
//! final [`PrimedQuery`] (spec §4.5).

use std::collections::{HashMap, HashSet};

use smallvec::SmallVec;

use crate::config::{Config, UnusedArgPolicy};
use crate::error::{BindError, Error, Result};
use crate::locator::{Locator, TypeToValue};
use crate::reflect::{HostTypeId, Kind, Reflector};
use crate::typebind::{self, TypedColumnSource, TypedExpr, TypedInsert};
use crate::value::Value;

/// One driver-bound argument, paired with the placeholder name it fills.
#[derive(Debug, Clone)]
pub struct NamedArg {
    pub name: String,
    pub value: Value,
}

/// The artifact handed to the driver: final SQL, ordered named arguments,
/// and the ordered output locators the scan-binder will later resolve
/// against driver-reported column names (spec §3 "Primed query").
#[derive(Debug, Clone)]
pub struct PrimedQuery {
    pub sql: String,
    pub params: Vec<NamedArg>,
    pub outputs: Vec<Locator>,
}

/// Validated, per-execution directory of argument values keyed by type
/// identity (spec §4.5 `ValidateInputs`), plus enough bookkeeping to produce
/// the "shadowed type" hint when a locator's type is absent but another
/// value shares its short name under a different identity.
struct InputContext<'v, R: Reflector> {
    type_to_value: TypeToValue<'v, R::Value>,
    by_short_name: HashMap<String, HostTypeId>,
    id_to_name: HashMap<HostTypeId, String>,
}

impl<'v, R: Reflector> InputContext<'v, R> {
    fn build(reflector: &R, values: &'v mut [R::Value]) -> std::result::Result<Self, BindError> {
        let mut type_to_value = TypeToValue::new();
        let mut by_short_name = HashMap::new();
        let mut id_to_name = HashMap::new();

        for value in values.iter_mut() {
            if let Kind::Other = reflector.kind(value) {
                return Err(BindError::NotBindable {
                    type_name: reflector.short_name(value),
                });
            }
            let type_id = reflector.type_id(value);
            let short_name = reflector.short_name(value);
            if id_to_name.contains_key(&type_id) {
                return Err(BindError::DuplicateTypeInstance {
                    type_name: short_name,
                });
            }
            by_short_name.insert(short_name.clone(), type_id);
            id_to_name.insert(type_id, short_name);
            type_to_value.insert(type_id, value);
        }

        Ok(InputContext {
            type_to_value,
            by_short_name,
            id_to_name,
        })
    }
}

fn locate_or_shadow<R: Reflector>(
    ctx: &InputContext<'_, R>,
    reflector: &R,
    locator: &Locator,
) -> std::result::Result<crate::locator::Params, BindError> {
    match locator.locate_input(reflector, &ctx.type_to_value) {
        Err(BindError::NotBindable { type_name }) => {
            if let Some(shadow_id) = ctx.by_short_name.get(&type_name) {
                if *shadow_id != locator.type_id() {
                    let shadow = ctx
                        .type_to_value
                        .get(*shadow_id)
                        .map(|v| reflector.qualified_name(v))
                        .unwrap_or_else(|| type_name.clone());
                    return Err(BindError::ShadowedType {
                        missing: type_name,
                        shadow,
                    });
                }
            }
            Err(BindError::NotBindable { type_name })
        }
        other => other,
    }
}

enum Cell {
    Literal(String),
    Values(SmallVec<[Value; 1]>),
}

struct BoundColumn {
    column: String,
    omit: bool,
    bulk: bool,
    bulk_type_name: Option<String>,
    cell: Cell,
}

fn bind_insert_columns<R: Reflector>(
    ctx: &InputContext<'_, R>,
    reflector: &R,
    insert: &TypedInsert,
    used_types: &mut HashSet<HostTypeId>,
) -> std::result::Result<Vec<BoundColumn>, BindError> {
    let mut bound = Vec::with_capacity(insert.columns.len());

    for col in &insert.columns {
        match &col.source {
            TypedColumnSource::Literal(text) => bound.push(BoundColumn {
                column: col.column.clone(),
                omit: false,
                bulk: false,
                bulk_type_name: None,
                cell: Cell::Literal(text.clone()),
            }),
            TypedColumnSource::Input(locator) => {
                let params = locate_or_shadow(ctx, reflector, locator)?;
                used_types.insert(params.arg_type_used);

                if params.omit {
                    if col.explicit {
                        return Err(BindError::ExplicitColumnOmitted {
                            column: col.column.clone(),
                        });
                    }
                    bound.push(BoundColumn {
                        column: col.column.clone(),
                        omit: true,
                        bulk: false,
                        bulk_type_name: None,
                        cell: Cell::Values(SmallVec::new()),
                    });
                    continue;
                }

                bound.push(BoundColumn {
                    column: col.column.clone(),
                    omit: false,
                    bulk: params.bulk,
                    bulk_type_name: params.bulk.then(|| locator.type_name().to_string()),
                    cell: Cell::Values(params.values),
                });
            }
        }
    }

    Ok(bound)
}

fn compute_num_rows(bound: &[BoundColumn]) -> std::result::Result<usize, BindError> {
    let mut current: Option<(usize, String)> = None;
    for b in bound {
        if !b.bulk {
            continue;
        }
        let len = match &b.cell {
            Cell::Values(v) => v.len(),
            Cell::Literal(_) => unreachable!("bulk columns always carry resolved values"),
        };
        let type_name = b
            .bulk_type_name
            .clone()
            .expect("bulk columns record their source type name");
        match &current {
            None => current = Some((len, type_name)),
            Some((first_len, first_type)) if *first_len != len => {
                return Err(BindError::BulkLengthMismatch {
                    first_type: first_type.clone(),
                    first_len: *first_len,
                    second_type: type_name,
                    second_len: len,
                })
            }
            Some(_) => {}
        }
    }
    Ok(current.map(|(len, _)| len).unwrap_or(1))
}

fn emit_insert(
    config: &Config,
    bound: &[BoundColumn],
    placeholder_no: &mut usize,
    params_out: &mut Vec<NamedArg>,
) -> std::result::Result<String, BindError> {
    let num_rows = compute_num_rows(bound)?;
    let kept: Vec<&BoundColumn> = bound.iter().filter(|b| !b.omit).collect();

    let column_list = kept
        .iter()
        .map(|b| b.column.as_str())
        .collect::<Vec<_>>()
        .join(", ");

    let mut rows = Vec::with_capacity(num_rows);
    for row in 0..num_rows {
        let mut cells = Vec::with_capacity(kept.len());
        for b in &kept {
            match &b.cell {
                Cell::Literal(text) => cells.push(text.clone()),
                Cell::Values(values) => {
                    let value = if b.bulk {
                        values[row].clone()
                    } else {
                        values[0].clone()
                    };
                    cells.push(config.placeholder(*placeholder_no));
                    params_out.push(NamedArg {
                        name: config.placeholder_name(*placeholder_no),
                        value,
                    });
                    *placeholder_no += 1;
                }
            }
        }
        rows.push(format!("({})", cells.join(", ")));
    }

    Ok(format!("({column_list}) VALUES {}", rows.join(", ")))
}

/// Walks the type-bound expression list against the default [`Config`],
/// resolving every locator against `values` and producing the final SQL,
/// params, and output list.
pub fn bind_query<R: Reflector>(
    reflector: &R,
    typed: &[TypedExpr],
    values: &mut [R::Value],
) -> Result<PrimedQuery> {
    bind_query_with_config(reflector, typed, values, &Config::default())
}

/// As [`bind_query`], but with an explicit [`Config`] controlling the
/// generated placeholder/alias prefixes and the unused-argument policy.
pub fn bind_query_with_config<R: Reflector>(
    reflector: &R,
    typed: &[TypedExpr],
    values: &mut [R::Value],
    config: &Config,
) -> Result<PrimedQuery> {
    let ctx = InputContext::build(reflector, values).map_err(Error::from)?;

    let mut sql = String::new();
    let mut params = Vec::new();
    let mut outputs = Vec::new();
    let mut placeholder_no = 0usize;
    let mut output_no = 0usize;
    let mut used_types: HashSet<HostTypeId> = HashSet::new();

    for expr in typed {
        match expr {
            TypedExpr::Bypass(text) => sql.push_str(text),

            TypedExpr::Input(input) => {
                let params_result =
                    locate_or_shadow(&ctx, reflector, &input.locator).map_err(Error::from)?;
                used_types.insert(params_result.arg_type_used);

                if typebind::is_bulk(&input.locator) {
                    let mut parts = Vec::with_capacity(params_result.values.len());
                    for value in params_result.values {
                        parts.push(config.placeholder(placeholder_no));
                        params.push(NamedArg {
                            name: config.placeholder_name(placeholder_no),
                            value,
                        });
                        placeholder_no += 1;
                    }
                    sql.push_str(&parts.join(", "));
                } else {
                    if params_result.omit {
                        let member = match &input.locator {
                            Locator::StructField { field, .. } => field.field_name.clone(),
                            _ => String::new(),
                        };
                        return Err(Error::from(BindError::OmitemptyOnExplicitInput {
                            type_name: input.locator.type_name().to_string(),
                            member,
                        }));
                    }
                    sql.push_str(&config.placeholder(placeholder_no));
                    params.push(NamedArg {
                        name: config.placeholder_name(placeholder_no),
                        value: params_result
                            .values
                            .into_iter()
                            .next()
                            .expect("non-bulk input resolves to exactly one value"),
                    });
                    placeholder_no += 1;
                }
            }

            TypedExpr::Output(entries) => {
                let mut parts = Vec::with_capacity(entries.len());
                for entry in entries {
                    let alias = config.output_alias(output_no);
                    parts.push(format!("{} AS {alias}", entry.column.render()));
                    used_types.insert(entry.locator.type_id());
                    outputs.push(entry.locator.clone());
                    output_no += 1;
                }
                sql.push_str(&parts.join(", "));
            }

            TypedExpr::Insert(insert) => {
                let bound =
                    bind_insert_columns(&ctx, reflector, insert, &mut used_types)
                        .map_err(Error::from)?;
                let rendered = emit_insert(config, &bound, &mut placeholder_no, &mut params)
                    .map_err(Error::from)?;
                sql.push_str(&rendered);
            }
        }
    }

    for (type_id, name) in &ctx.id_to_name {
        if !used_types.contains(type_id) {
            match config.unused_arg_policy {
                UnusedArgPolicy::Error => {
                    return Err(Error::from(BindError::UnusedType {
                        type_name: name.clone(),
                    }))
                }
                UnusedArgPolicy::Warn => {
                    tracing::warn!(type_name = %name, "argument passed to bind but never referenced by the query");
                }
            }
        }
    }

    tracing::trace!(target: "sigilsql::bind", sql = %sql, params = params.len(), outputs = outputs.len(), "bound query");

    Ok(PrimedQuery {
        sql,
        params,
        outputs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arginfo::test_support::{TestReflector, TestValue};
    use crate::arginfo::ArgInfo;
    use crate::parser;
    use crate::typeinfo::cache;
    use std::any::TypeId;

    #[derive(Debug)]
    struct PersonMarker;
    #[derive(Debug)]
    struct SMarker;
    #[derive(Debug)]
    struct S2Marker;
    #[derive(Debug)]
    struct MMarker;

    fn person(id: i64, name: &str) -> TestValue {
        TestValue::Struct {
            type_name: "Person",
            type_id: TypeId::of::<PersonMarker>(),
            fields: vec![
                ("id", false, Value::I64(id)),
                ("name", true, Value::Str(name.to_string())),
            ],
        }
    }

    fn typed_for(query: &str, args: &[TestValue]) -> Vec<TypedExpr> {
        let exprs = parser::parse(query).unwrap();
        let arg_info = ArgInfo::build(&TestReflector, args).unwrap();
        crate::typebind::bind(exprs, &arg_info).unwrap()
    }

    #[test]
    fn scenario_a_emits_generated_output_and_one_placeholder() {
        cache::clear();
        let prepare_args = [person(0, "")];
        let typed = typed_for(
            "SELECT &Person.* FROM t WHERE id = $Person.id",
            &prepare_args,
        );
        let mut bind_args = [person(7, "")];
        let primed = bind_query(&TestReflector, &typed, &mut bind_args).unwrap();
        assert_eq!(
            primed.sql,
            "SELECT id AS _sqlair_0, name AS _sqlair_1 FROM t WHERE id = @sqlair_0"
        );
        assert_eq!(primed.params.len(), 1);
        assert_eq!(primed.params[0].name, "sqlair_0");
        assert_eq!(primed.params[0].value, Value::I64(7));
        assert_eq!(primed.outputs.len(), 2);
    }

    #[test]
    fn scenario_c_omitempty_drops_empty_column() {
        cache::clear();
        let prepare_args = [person(0, "")];
        let typed = typed_for("INSERT INTO t (*) VALUES ($Person.*)", &prepare_args);

        let mut empty_name = [person(1, "")];
        let primed = bind_query(&TestReflector, &typed, &mut empty_name).unwrap();
        assert_eq!(primed.sql, "(id) VALUES (@sqlair_0)");

        let mut with_name = [person(1, "x")];
        let primed2 = bind_query(&TestReflector, &typed, &mut with_name).unwrap();
        assert_eq!(primed2.sql, "(id, name) VALUES (@sqlair_0, @sqlair_1)");
    }

    #[test]
    fn scenario_d_bulk_insert_expands_rows_and_detects_mismatch() {
        cache::clear();
        let s = TestValue::Slice {
            type_name: "S",
            type_id: TypeId::of::<SMarker>(),
            elements: vec![Value::Str("a".into()), Value::Str("b".into())],
        };
        let s2 = TestValue::Slice {
            type_name: "S2",
            type_id: TypeId::of::<S2Marker>(),
            elements: vec![Value::I64(1), Value::I64(2)],
        };
        let typed = typed_for(
            "INSERT INTO t (name, age) VALUES ($S[:], $S2[:])",
            &[s.clone(), s2.clone()],
        );
        let mut bind_args = [s, s2];
        let primed = bind_query(&TestReflector, &typed, &mut bind_args).unwrap();
        assert_eq!(
            primed.sql,
            "(name, age) VALUES (@sqlair_0, @sqlair_1), (@sqlair_2, @sqlair_3)"
        );
        assert_eq!(primed.params.len(), 4);

        let mut mismatched = [
            TestValue::Slice {
                type_name: "S",
                type_id: TypeId::of::<SMarker>(),
                elements: vec![Value::Str("a".into())],
            },
            TestValue::Slice {
                type_name: "S2",
                type_id: TypeId::of::<S2Marker>(),
                elements: vec![Value::I64(1), Value::I64(2)],
            },
        ];
        let err = bind_query(&TestReflector, &typed, &mut mismatched).unwrap_err();
        assert!(matches!(err, Error::Bind(BindError::BulkLengthMismatch { .. })));
    }

    #[test]
    fn scenario_e_missing_map_key_reports_canonical_error() {
        cache::clear();
        let m = TestValue::Map {
            type_name: "M",
            type_id: TypeId::of::<MMarker>(),
            entries: std::collections::BTreeMap::from([("k".to_string(), Value::Str("v".into()))]),
        };
        let typed = typed_for("SELECT street FROM t WHERE x = $M.k", &[m.clone()]);

        let mut ok = [m.clone()];
        let primed = bind_query(&TestReflector, &typed, &mut ok).unwrap();
        assert_eq!(primed.sql, "SELECT street FROM t WHERE x = @sqlair_0");
        assert_eq!(primed.params[0].value, Value::Str("v".into()));

        let mut wrong_key = [TestValue::Map {
            type_name: "M",
            type_id: TypeId::of::<MMarker>(),
            entries: std::collections::BTreeMap::from([("K".to_string(), Value::Str("v".into()))]),
        }];
        let err = bind_query(&TestReflector, &typed, &mut wrong_key).unwrap_err();
        assert!(matches!(err, Error::Bind(BindError::MissingMapKey { .. })));
    }

    #[test]
    fn output_only_argument_is_not_treated_as_unused() {
        cache::clear();
        let prepare_args = [person(0, "")];
        let typed = typed_for("SELECT &Person.* FROM t", &prepare_args);
        let mut bind_args = [person(7, "alice")];
        let primed = bind_query(&TestReflector, &typed, &mut bind_args).unwrap();
        assert_eq!(primed.sql, "SELECT id AS _sqlair_0, name AS _sqlair_1 FROM t");
        assert_eq!(primed.outputs.len(), 2);
    }

    #[test]
    fn unreferenced_argument_is_rejected() {
        cache::clear();
        let prepare_args = [person(0, "")];
        let typed = typed_for("SELECT 1 FROM t", &prepare_args);
        let mut bind_args = [person(1, "x")];
        let err = bind_query(&TestReflector, &typed, &mut bind_args).unwrap_err();
        assert!(matches!(err, Error::Bind(BindError::UnusedType { .. })));
    }
}

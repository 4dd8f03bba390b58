//! Type-binder: validates the parsed expression list against an [`ArgInfo`]
//! directory, expands asterisks, disambiguates the three output shapes and
//! the three INSERT shapes, and produces a typed expression list (spec
//! §4.4).

use std::collections::HashSet;

use crate::arginfo::ArgInfo;
use crate::error::PrepareError;
use crate::locator::Locator;
use crate::parser::{ColumnAccessor, Expr, InputSource, InsertExpr, InsertValue, MemberAccessor};
use crate::reflect::HostTypeId;
use crate::typeinfo::TypeInfo;

/// One resolved input, carrying the locator that will later be asked for its
/// runtime value (spec §4.5).
#[derive(Debug, Clone)]
pub struct TypedInput {
    pub locator: Locator,
}

/// One resolved `column AS _sqlair_k` pairing inside an output expression.
#[derive(Debug, Clone)]
pub struct TypedOutputEntry {
    pub column: ColumnAccessor,
    pub locator: Locator,
}

/// Where one INSERT column's value comes from.
#[derive(Debug, Clone)]
pub enum TypedColumnSource {
    Input(Locator),
    Literal(String),
}

/// One column of a type-bound INSERT, with the explicitness the omitempty
/// rule (spec §4.5) needs: implicit columns may be silently dropped when
/// their value is the omitempty zero value; explicit columns may not.
#[derive(Debug, Clone)]
pub struct TypedColumn {
    pub column: String,
    pub explicit: bool,
    pub source: TypedColumnSource,
}

#[derive(Debug, Clone)]
pub struct TypedInsert {
    pub columns: Vec<TypedColumn>,
}

/// A single node of the type-bound expression list (spec §4.4 output).
#[derive(Debug, Clone)]
pub enum TypedExpr {
    Bypass(String),
    Input(TypedInput),
    Output(Vec<TypedOutputEntry>),
    Insert(TypedInsert),
}

/// Binds a parsed expression list against `arg_info`, consuming it in
/// document order.
pub fn bind(exprs: Vec<Expr>, arg_info: &ArgInfo) -> Result<Vec<TypedExpr>, PrepareError> {
    let mut used_outputs: HashSet<(HostTypeId, String)> = HashSet::new();
    let mut out = Vec::with_capacity(exprs.len());

    for expr in exprs {
        let typed = match expr {
            Expr::Bypass { text } => TypedExpr::Bypass(text),
            Expr::Input { source, .. } => TypedExpr::Input(bind_input(arg_info, source)?),
            Expr::Output {
                source_columns,
                target_types,
                ..
            } => TypedExpr::Output(bind_output(
                arg_info,
                &source_columns,
                &target_types,
                &mut used_outputs,
            )?),
            Expr::Insert { insert, .. } => TypedExpr::Insert(bind_insert(arg_info, insert)?),
        };
        out.push(typed);
    }

    Ok(out)
}

/// Binds a standalone (non-INSERT) input expression. A bare `$Type[:]`
/// outside an INSERT value list is rejected here (spec §4.5: "Slice inputs
/// outside an INSERT are rejected earlier") — the only place a slice
/// accessor may legally resolve is as a `BasicInsert` value
/// (`bind_basic_insert`), which calls `arg_info.get_slice` directly rather
/// than going through this function.
fn bind_input(arg_info: &ArgInfo, source: InputSource) -> Result<TypedInput, PrepareError> {
    let locator = match source {
        InputSource::Member(m) => arg_info.get_member(&m.type_name, &m.member_name)?,
        InputSource::Slice(s) => {
            return Err(PrepareError::SliceOutsideInsert {
                type_name: s.type_name,
            })
        }
    };
    Ok(TypedInput { locator })
}

fn mark_output_used(
    used: &mut HashSet<(HostTypeId, String)>,
    type_id: HostTypeId,
    type_name: &str,
    tag: &str,
) -> Result<(), PrepareError> {
    if !used.insert((type_id, tag.to_string())) {
        return Err(PrepareError::DuplicateOutput {
            member: format!("{type_name}.{tag}"),
        });
    }
    Ok(())
}

fn generated_column(table: Option<&str>, tag: &str) -> ColumnAccessor {
    ColumnAccessor::Basic {
        table: table.map(str::to_string),
        column: tag.to_string(),
    }
}

/// Expands one output expression into its per-column locators, using the
/// three shapes of spec §4.2/§4.4. The parser has already enforced the
/// structural invariants (parenthesis symmetry, asterisk placement and
/// counts), so the shape here is determined purely by counting columns and
/// targets.
fn bind_output(
    arg_info: &ArgInfo,
    source_columns: &[ColumnAccessor],
    target_types: &[MemberAccessor],
    used: &mut HashSet<(HostTypeId, String)>,
) -> Result<Vec<TypedOutputEntry>, PrepareError> {
    for target in target_types {
        if matches!(arg_info.kind(&target.type_name), Some(TypeInfo::Slice { .. })) {
            return Err(PrepareError::SliceInOutput {
                type_name: target.type_name.clone(),
            });
        }
    }

    let is_generated =
        source_columns.is_empty() || (source_columns.len() == 1 && source_columns[0].is_asterisk());

    if is_generated {
        let table = match source_columns.first() {
            Some(ColumnAccessor::Basic { table, .. }) => table.clone(),
            _ => None,
        };
        let mut out = Vec::new();
        for target in target_types {
            if target.is_asterisk() {
                let (locators, tags) = arg_info.get_all_struct_members(&target.type_name)?;
                for (locator, tag) in locators.into_iter().zip(tags) {
                    mark_output_used(used, locator.type_id(), &target.type_name, &tag)?;
                    out.push(TypedOutputEntry {
                        column: generated_column(table.as_deref(), &tag),
                        locator,
                    });
                }
            } else {
                let locator = arg_info.get_member(&target.type_name, &target.member_name)?;
                mark_output_used(used, locator.type_id(), &target.type_name, &target.member_name)?;
                out.push(TypedOutputEntry {
                    column: generated_column(table.as_deref(), &target.member_name),
                    locator,
                });
            }
        }
        return Ok(out);
    }

    if target_types.len() == 1 && target_types[0].is_asterisk() {
        let type_name = &target_types[0].type_name;
        let mut out = Vec::new();
        for col in source_columns {
            let tag = match col {
                ColumnAccessor::Basic { column, .. } => column.clone(),
                ColumnAccessor::SqlFunctionCall { raw } => {
                    return Err(PrepareError::TagNotFound {
                        type_name: type_name.clone(),
                        tag: raw.clone(),
                    })
                }
            };
            let locator = arg_info.get_member(type_name, &tag)?;
            mark_output_used(used, locator.type_id(), type_name, &tag)?;
            out.push(TypedOutputEntry {
                column: col.clone(),
                locator,
            });
        }
        return Ok(out);
    }

    if !source_columns.is_empty() && source_columns.len() == target_types.len() {
        let mut out = Vec::new();
        for (col, target) in source_columns.iter().zip(target_types) {
            let locator = arg_info.get_member(&target.type_name, &target.member_name)?;
            mark_output_used(used, locator.type_id(), &target.type_name, &target.member_name)?;
            out.push(TypedOutputEntry {
                column: col.clone(),
                locator,
            });
        }
        return Ok(out);
    }

    unreachable!("parser enforces matching column/target shapes before type-bind runs")
}

fn bind_insert(arg_info: &ArgInfo, insert: InsertExpr) -> Result<TypedInsert, PrepareError> {
    match insert {
        InsertExpr::Asterisk { sources } => bind_asterisk_insert(arg_info, sources),
        InsertExpr::Columns { columns, sources } => {
            bind_columns_insert(arg_info, columns, sources)
        }
        InsertExpr::Basic { columns, values } => bind_basic_insert(arg_info, columns, values),
    }
}

fn bind_asterisk_insert(
    arg_info: &ArgInfo,
    sources: Vec<MemberAccessor>,
) -> Result<TypedInsert, PrepareError> {
    let mut columns = Vec::new();
    for source in sources {
        if source.is_asterisk() {
            let (locators, tags) = arg_info.get_all_struct_members(&source.type_name)?;
            for (locator, tag) in locators.into_iter().zip(tags) {
                columns.push(TypedColumn {
                    column: tag,
                    explicit: false,
                    source: TypedColumnSource::Input(locator),
                });
            }
        } else {
            let locator = arg_info.get_member(&source.type_name, &source.member_name)?;
            columns.push(TypedColumn {
                column: source.member_name,
                explicit: true,
                source: TypedColumnSource::Input(locator),
            });
        }
    }
    Ok(TypedInsert { columns })
}

/// Builds the column-name -> candidate-inputs map from every source, then
/// resolves each declared left-side column to exactly one candidate (spec
/// §4.4 `ColumnsInsert`). At most one `$M.*` map source may act as a
/// catch-all: it never contributes named candidates up front (it can't know
/// the declared column names), and instead matches any column no specific
/// source claims. A second `$M.*` catch-all source is rejected rather than
/// silently shadowing the first.
fn bind_columns_insert(
    arg_info: &ArgInfo,
    columns: Vec<ColumnAccessor>,
    sources: Vec<MemberAccessor>,
) -> Result<TypedInsert, PrepareError> {
    let mut candidates: std::collections::HashMap<String, Vec<Locator>> =
        std::collections::HashMap::new();
    let mut catch_all_map_type: Option<String> = None;

    for source in sources {
        if source.is_asterisk() {
            match arg_info.get_all_struct_members(&source.type_name) {
                Ok((locators, tags)) => {
                    for (locator, tag) in locators.into_iter().zip(tags) {
                        candidates.entry(tag).or_default().push(locator);
                    }
                }
                Err(PrepareError::MapNeedsColumns { .. }) => {
                    if let Some(first) = &catch_all_map_type {
                        return Err(PrepareError::MultipleCatchAllMaps {
                            first: first.clone(),
                            second: source.type_name.clone(),
                        });
                    }
                    catch_all_map_type = Some(source.type_name.clone());
                }
                Err(other) => return Err(other),
            }
        } else {
            let locator = arg_info.get_member(&source.type_name, &source.member_name)?;
            candidates
                .entry(source.member_name.clone())
                .or_default()
                .push(locator);
        }
    }

    let mut typed = Vec::with_capacity(columns.len());
    for col in columns {
        let column_name = match &col {
            ColumnAccessor::Basic { column, .. } => column.clone(),
            ColumnAccessor::SqlFunctionCall { raw } => {
                return Err(PrepareError::MissingColumnProvider { column: raw.clone() })
            }
        };
        let locator = match candidates.get(&column_name) {
            Some(found) if found.len() == 1 => found[0].clone(),
            Some(found) if found.len() > 1 => {
                return Err(PrepareError::AmbiguousColumnProvider {
                    column: column_name,
                })
            }
            _ => match &catch_all_map_type {
                Some(map_type) => arg_info.get_member(map_type, &column_name)?,
                None => {
                    return Err(PrepareError::MissingColumnProvider {
                        column: column_name,
                    })
                }
            },
        };
        typed.push(TypedColumn {
            column: column_name,
            explicit: true,
            source: TypedColumnSource::Input(locator),
        });
    }

    Ok(TypedInsert { columns: typed })
}

fn bind_basic_insert(
    arg_info: &ArgInfo,
    columns: Vec<ColumnAccessor>,
    values: Vec<InsertValue>,
) -> Result<TypedInsert, PrepareError> {
    if columns.len() != values.len() {
        return Err(PrepareError::InsertColumnMismatch);
    }

    let mut typed = Vec::with_capacity(columns.len());
    for (col, val) in columns.into_iter().zip(values) {
        let column_name = match &col {
            ColumnAccessor::Basic { column, .. } => column.clone(),
            ColumnAccessor::SqlFunctionCall { raw } => raw.clone(),
        };
        let source = match val {
            InsertValue::Member(m) => {
                TypedColumnSource::Input(arg_info.get_member(&m.type_name, &m.member_name)?)
            }
            InsertValue::Slice(s) => TypedColumnSource::Input(arg_info.get_slice(&s.type_name)?),
            InsertValue::Literal(text) => TypedColumnSource::Literal(text),
        };
        typed.push(TypedColumn {
            column: column_name,
            explicit: true,
            source,
        });
    }

    Ok(TypedInsert { columns: typed })
}

/// True if a locator's input resolves to more than one value per row
/// (spec glossary "Bulk input").
pub(crate) fn is_bulk(locator: &Locator) -> bool {
    matches!(locator, Locator::SliceAll { .. })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arginfo::test_support::{TestReflector, TestValue};
    use crate::parser::{self};
    use crate::typeinfo::cache;
    use crate::value::Value;
    use std::any::TypeId;

    #[derive(Debug)]
    struct PersonMarker;
    #[derive(Debug)]
    struct AddressMarker;

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

    fn address(id: i64) -> TestValue {
        TestValue::Struct {
            type_name: "Address",
            type_id: TypeId::of::<AddressMarker>(),
            fields: vec![("id", false, Value::I64(id))],
        }
    }

    #[test]
    fn scenario_a_generated_output_and_plain_input() {
        cache::clear();
        let exprs = parser::parse("SELECT &Person.* FROM t WHERE id = $Person.id").unwrap();
        let args = [person(7, "")];
        let arg_info = ArgInfo::build(&TestReflector, &args).unwrap();
        let typed = bind(exprs, &arg_info).unwrap();

        let output_cols: Vec<_> = typed
            .iter()
            .filter_map(|t| match t {
                TypedExpr::Output(entries) => Some(entries.clone()),
                _ => None,
            })
            .next()
            .unwrap();
        assert_eq!(output_cols.len(), 2);
        assert_eq!(output_cols[0].column.render(), "id");
        assert_eq!(output_cols[1].column.render(), "name");
    }

    #[test]
    fn scenario_f_reusing_output_member_is_a_prepare_error() {
        cache::clear();
        let exprs = parser::parse(
            "SELECT (a.district, a.street) AS (&Address.district, &Address.street), a.district AS &Address.district FROM a",
        )
        .unwrap();
        let args = [address(1)];
        let arg_info = ArgInfo::build(&TestReflector, &args).unwrap();
        let err = bind(exprs, &arg_info).unwrap_err();
        assert!(matches!(err, PrepareError::DuplicateOutput { .. }));
    }

    #[test]
    fn columns_insert_resolves_unambiguous_columns() {
        cache::clear();
        let exprs =
            parser::parse("INSERT INTO t (id, name) VALUES ($Person.*)").unwrap();
        let args = [person(1, "a")];
        let arg_info = ArgInfo::build(&TestReflector, &args).unwrap();
        let typed = bind(exprs, &arg_info).unwrap();
        let insert = typed.iter().find_map(|t| match t {
            TypedExpr::Insert(ins) => Some(ins.clone()),
            _ => None,
        }).unwrap();
        assert_eq!(insert.columns.len(), 2);
        assert!(insert.columns.iter().all(|c| c.explicit));
    }

    #[test]
    fn columns_insert_rejects_a_second_catch_all_map() {
        cache::clear();
        #[derive(Debug)]
        struct M1Marker;
        #[derive(Debug)]
        struct M2Marker;
        let exprs =
            parser::parse("INSERT INTO t (a, b) VALUES ($M1.*, $M2.*)").unwrap();
        let args = [
            TestValue::Map {
                type_name: "M1",
                type_id: TypeId::of::<M1Marker>(),
                entries: std::collections::BTreeMap::from([(
                    "a".to_string(),
                    Value::Str("x".into()),
                )]),
            },
            TestValue::Map {
                type_name: "M2",
                type_id: TypeId::of::<M2Marker>(),
                entries: std::collections::BTreeMap::from([(
                    "b".to_string(),
                    Value::Str("y".into()),
                )]),
            },
        ];
        let arg_info = ArgInfo::build(&TestReflector, &args).unwrap();
        let err = bind(exprs, &arg_info).unwrap_err();
        assert!(matches!(err, PrepareError::MultipleCatchAllMaps { .. }));
    }

    #[test]
    fn slice_type_used_in_output_is_rejected() {
        cache::clear();
        #[derive(Debug)]
        struct IdsMarker;
        let exprs = parser::parse("SELECT &Ids.* FROM t").unwrap();
        let args = [TestValue::Slice {
            type_name: "Ids",
            type_id: TypeId::of::<IdsMarker>(),
            elements: vec![Value::I64(1)],
        }];
        let arg_info = ArgInfo::build(&TestReflector, &args).unwrap();
        let err = bind(exprs, &arg_info).unwrap_err();
        assert!(matches!(err, PrepareError::SliceInOutput { .. }));
    }

    #[test]
    fn standalone_slice_input_outside_insert_is_rejected() {
        cache::clear();
        #[derive(Debug)]
        struct IdsMarker;
        let exprs = parser::parse("SELECT name FROM t WHERE id IN ($Ids[:])").unwrap();
        let args = [TestValue::Slice {
            type_name: "Ids",
            type_id: TypeId::of::<IdsMarker>(),
            elements: vec![Value::I64(1), Value::I64(2)],
        }];
        let arg_info = ArgInfo::build(&TestReflector, &args).unwrap();
        let err = bind(exprs, &arg_info).unwrap_err();
        assert!(matches!(err, PrepareError::SliceOutsideInsert { .. }));
    }
}

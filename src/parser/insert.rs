//! INSERT expression parsing: `(*) VALUES (...)`, `(cols) VALUES (...)`
//! (spec §3, §4.2 items 3-4). Disambiguating `ColumnsInsert` vs
//! `BasicInsert` happens here (by checking whether any source is
//! `$Type.*`), matching "Input expression dispatch" in spec §4.2.

use crate::error::ParseError;
use crate::lexer::Scanner;
use crate::parser::expr::{Expr, InputSource, InsertExpr, InsertValue};
use crate::parser::{parse_column_accessor, parse_member_or_slice};

/// Attempts to parse an INSERT expression at a `(`. Returns `Ok(None)`
/// without consuming anything if the parenthesized group is not followed by
/// `VALUES` — i.e. it was just an ordinary parenthesized SQL fragment.
pub(crate) fn try_parse(scanner: &mut Scanner<'_>) -> Result<Option<Expr>, ParseError> {
    let snapshot = *scanner;
    let start = scanner.pos();
    let at = scanner.position();

    let asterisk_columns = match parse_asterisk_or_column_list(scanner) {
        Some(v) => v,
        None => {
            *scanner = snapshot;
            return Ok(None);
        }
    };

    scanner.skip_blanks();
    if !scanner.skip_string("VALUES") {
        *scanner = snapshot;
        return Ok(None);
    }
    scanner.skip_blanks();

    let values = match parse_value_list(scanner, at)? {
        Some(v) => v,
        None => {
            *scanner = snapshot;
            return Ok(None);
        }
    };

    let insert = match asterisk_columns {
        None => {
            // "(*) VALUES (...)": every value must be a plain member accessor.
            let mut sources = Vec::with_capacity(values.len());
            for v in values {
                match v {
                    InsertValue::Member(m) => sources.push(m),
                    _ => return Err(ParseError::InvalidExpression { at }),
                }
            }
            InsertExpr::Asterisk { sources }
        }
        Some(columns) => {
            let any_asterisk_source = values
                .iter()
                .any(|v| matches!(v, InsertValue::Member(m) if m.is_asterisk()));
            if any_asterisk_source {
                let mut sources = Vec::with_capacity(values.len());
                for v in values {
                    match v {
                        InsertValue::Member(m) => sources.push(m),
                        _ => return Err(ParseError::InvalidExpression { at }),
                    }
                }
                InsertExpr::Columns { columns, sources }
            } else {
                InsertExpr::Basic { columns, values }
            }
        }
    };

    let raw = scanner.slice(start, scanner.pos()).to_string();
    Ok(Some(Expr::Insert { insert, raw, at }))
}

/// Parses `(*)` (returns `None`-as-columns sentinel, i.e. `Ok(None)` inside
/// the outer `Option`) or `(col1, col2, ...)`.
fn parse_asterisk_or_column_list(
    scanner: &mut Scanner<'_>,
) -> Option<Option<Vec<crate::parser::expr::ColumnAccessor>>> {
    if !scanner.skip_byte(b'(') {
        return None;
    }
    scanner.skip_blanks();
    if scanner.skip_byte(b'*') {
        scanner.skip_blanks();
        if !scanner.skip_byte(b')') {
            return None;
        }
        return Some(None);
    }

    let mut cols = Vec::new();
    loop {
        scanner.skip_blanks();
        cols.push(parse_column_accessor(scanner)?);
        scanner.skip_blanks();
        if scanner.skip_byte(b',') {
            continue;
        }
        if scanner.skip_byte(b')') {
            break;
        }
        return None;
    }
    Some(Some(cols))
}

fn parse_value_list(
    scanner: &mut Scanner<'_>,
    at: crate::error::Position,
) -> Result<Option<Vec<InsertValue>>, ParseError> {
    if !scanner.skip_byte(b'(') {
        return Ok(None);
    }
    let mut values = Vec::new();
    loop {
        scanner.skip_blanks();
        values.push(parse_one_value(scanner, at)?);
        scanner.skip_blanks();
        if scanner.skip_byte(b',') {
            continue;
        }
        if scanner.skip_byte(b')') {
            break;
        }
        return Ok(None);
    }
    Ok(Some(values))
}

fn parse_one_value(
    scanner: &mut Scanner<'_>,
    at: crate::error::Position,
) -> Result<InsertValue, ParseError> {
    if scanner.peek_byte() == Some(b'$') {
        scanner.advance_one();
        return match parse_member_or_slice(scanner, at)? {
            InputSource::Member(m) => Ok(InsertValue::Member(m)),
            InputSource::Slice(s) => Ok(InsertValue::Slice(s)),
        };
    }

    // A literal: any run of SQL tokens up to the next unquoted `,` / `)`,
    // with balanced parens and quoted literals preserved verbatim.
    let start = scanner.pos();
    let mut depth = 0usize;
    loop {
        match scanner.peek_byte() {
            None => return Err(ParseError::MissingClosingParenthesis { at }),
            Some(b'\'') | Some(b'"') => scanner.skip_string_literal()?,
            Some(b'(') => {
                depth += 1;
                scanner.advance_one();
            }
            Some(b')') if depth > 0 => {
                depth -= 1;
                scanner.advance_one();
            }
            Some(b')') => break,
            Some(b',') if depth == 0 => break,
            Some(_) => scanner.advance_one(),
        }
    }
    let literal = scanner.slice(start, scanner.pos()).trim().to_string();
    if literal.is_empty() {
        return Err(ParseError::InvalidExpression { at });
    }
    Ok(InsertValue::Literal(literal))
}


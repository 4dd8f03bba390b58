//! Output expression parsing: `&Type.member`, `&Type.*`, and the
//! `<columns> AS <targets>` forms (spec §4.2). Shape classification
//! (Generated / Single-asterisk-target / Positional) is a type-bind time
//! decision (spec §4.4); the parser only captures the raw column/target
//! lists and enforces the parenthesization symmetry rule.

use crate::error::{ParseError, Position};
use crate::lexer::Scanner;
use crate::parser::expr::{ColumnAccessor, Expr, MemberAccessor};
use crate::parser::parse_column_accessor;

/// Attempts to parse an output expression starting at the scanner's current
/// position. Returns `Ok(None)` without consuming anything if this position
/// does not begin a valid output expression (the caller falls back to
/// input-expression parsing, then a single-byte advance).
pub(crate) fn try_parse(scanner: &mut Scanner<'_>) -> Result<Option<Expr>, ParseError> {
    let snapshot = *scanner;
    let start = scanner.pos();
    let at = scanner.position();

    let (columns, lhs_parenthesized) = if scanner.peek_byte() == Some(b'&') {
        (Vec::new(), false)
    } else {
        match parse_column_list(scanner) {
            Some(cols) => cols,
            None => {
                *scanner = snapshot;
                return Ok(None);
            }
        }
    };

    let has_explicit_columns = !columns.is_empty();
    if has_explicit_columns {
        scanner.skip_blanks();
        if !scanner.skip_string("AS") {
            *scanner = snapshot;
            return Ok(None);
        }
        scanner.skip_blanks();
    }

    let (targets, rhs_parenthesized) = match parse_target_list(scanner, at)? {
        Some(t) => t,
        None => {
            *scanner = snapshot;
            return Ok(None);
        }
    };

    if has_explicit_columns && lhs_parenthesized != rhs_parenthesized {
        return Err(ParseError::MismatchedParenthesesAroundAs { at });
    }

    validate_asterisks(&columns, &targets, at)?;

    let raw = scanner.slice(start, scanner.pos()).to_string();
    Ok(Some(Expr::Output {
        source_columns: columns,
        target_types: targets,
        raw,
        at,
    }))
}

fn parse_column_list(scanner: &mut Scanner<'_>) -> Option<(Vec<ColumnAccessor>, bool)> {
    if scanner.skip_byte(b'(') {
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
        Some((cols, true))
    } else {
        let col = parse_column_accessor(scanner)?;
        Some((vec![col], false))
    }
}

fn parse_target_list(
    scanner: &mut Scanner<'_>,
    at: Position,
) -> Result<Option<(Vec<MemberAccessor>, bool)>, ParseError> {
    if scanner.skip_byte(b'(') {
        let mut targets = Vec::new();
        loop {
            scanner.skip_blanks();
            match parse_one_target(scanner, at)? {
                Some(t) => targets.push(t),
                None => return Err(ParseError::MismatchedParenthesesAroundAs { at }),
            }
            scanner.skip_blanks();
            if scanner.skip_byte(b',') {
                continue;
            }
            if scanner.skip_byte(b')') {
                break;
            }
            return Err(ParseError::MismatchedParenthesesAroundAs { at });
        }
        Ok(Some((targets, true)))
    } else {
        match parse_one_target(scanner, at)? {
            Some(t) => Ok(Some((vec![t], false))),
            None => Ok(None),
        }
    }
}

fn parse_one_target(
    scanner: &mut Scanner<'_>,
    at: Position,
) -> Result<Option<MemberAccessor>, ParseError> {
    if !scanner.skip_byte(b'&') {
        return Ok(None);
    }
    let type_name = scanner
        .skip_name()
        .ok_or(ParseError::UnqualifiedType { at })?
        .to_string();
    if !scanner.skip_byte(b'.') {
        return Err(ParseError::UnqualifiedType { at });
    }
    if scanner.skip_byte(b'*') {
        return Ok(Some(MemberAccessor {
            type_name,
            member_name: "*".to_string(),
        }));
    }
    let member_name = scanner
        .skip_name()
        .ok_or(ParseError::InvalidIdentifierSuffix { at })?
        .to_string();
    Ok(Some(MemberAccessor {
        type_name,
        member_name,
    }))
}

fn validate_asterisks(
    columns: &[ColumnAccessor],
    targets: &[MemberAccessor],
    at: Position,
) -> Result<(), ParseError> {
    let column_asterisks = columns.iter().filter(|c| c.is_asterisk()).count();
    if column_asterisks > 0 && columns.len() > 1 {
        return Err(ParseError::AsteriskInOutputColumns { at });
    }
    if targets.iter().any(|t| t.is_asterisk()) {
        for col in columns {
            if let ColumnAccessor::SqlFunctionCall { raw } = col {
                return Err(ParseError::FunctionCallIntoAsterisk {
                    at,
                    raw: raw.clone(),
                });
            }
        }
    }
    let target_asterisks = targets.iter().filter(|t| t.is_asterisk()).count();
    if target_asterisks > 0 && targets.len() > 1 {
        return Err(ParseError::AsteriskInOutputTypes { at });
    }
    if !columns.is_empty() && column_asterisks == 0 && target_asterisks == 0 {
        if columns.len() != targets.len() {
            return Err(ParseError::MismatchedColumnsAndTargets { at });
        }
    }
    Ok(())
}

//! Error and Result types.
//!
//! Each pipeline stage (parse, prepare, input-bind, scan-bind) has its own
//! error enum with the canonical message text; [`Error`] aggregates them and
//! layers on the stage-level context prefix described in the design notes.

use std::fmt;

/// A specialized `Result` type for this crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// A type-erased error, used where the underlying cause does not need to be
/// matched on (e.g. reflector failures surfaced from host code).
pub type BoxDynError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A generic error representing every way the pipeline can fail.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Failed while turning query text into an expression list.
    #[error("cannot parse expression: {0}")]
    Parse(#[from] ParseError),

    /// Failed while binding the parsed expression list against the passed
    /// argument types (asterisk expansion, INSERT column matching, ...).
    #[error("cannot prepare statement: {0}")]
    Prepare(#[from] PrepareError),

    /// Failed while resolving locators to runtime values and building the
    /// final SQL and driver argument list.
    #[error("invalid input parameter: {0}")]
    Bind(#[from] BindError),

    /// Failed while resolving scan pointers for a returned row.
    #[error("cannot scan row: {0}")]
    Scan(#[from] ScanError),

    /// An invariant that the pipeline itself is responsible for maintaining
    /// was violated. Never raised in response to user input; indicates a bug.
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    pub(crate) fn internal(msg: impl Into<String>) -> Self {
        Error::Internal(msg.into())
    }
}

/// Errors raised while turning query text into an [`crate::parser::Expr`] list.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ParseError {
    #[error("{at}missing closing quote in string literal")]
    MissingClosingQuote { at: Position },

    #[error("{at}missing closing parenthesis")]
    MissingClosingParenthesis { at: Position },

    #[error("{at}expected 'T.*' or 'T.<db tag>' or 'T[:]'")]
    UnqualifiedType { at: Position },

    #[error("{at}invalid identifier suffix")]
    InvalidIdentifierSuffix { at: Position },

    #[error("{at}expected 'T[:]'")]
    InvalidSlice { at: Position },

    #[error("{at}asterisk not allowed on its own in an input expression: \"${type_name}.*\"")]
    AsteriskInInput { at: Position, type_name: String },

    #[error("{at}invalid asterisk in output expression columns")]
    AsteriskInOutputColumns { at: Position },

    #[error("{at}invalid asterisk in output expression types")]
    AsteriskInOutputTypes { at: Position },

    #[error("{at}mismatched number of columns and targets")]
    MismatchedColumnsAndTargets { at: Position },

    #[error("{at}missing or unexpected parentheses around types after \"AS\"")]
    MismatchedParenthesesAroundAs { at: Position },

    #[error("{at}cannot read function call \"{raw}\" into asterisk")]
    FunctionCallIntoAsterisk { at: Position, raw: String },

    #[error("{at}invalid expression in list")]
    InvalidExpression { at: Position },
}

/// Errors raised while type-binding the parsed expression list against an
/// [`crate::arginfo::ArgInfo`] directory.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum PrepareError {
    #[error("type {type_name:?} not passed as a parameter ({have})", have = have_list(have_names))]
    TypeMissing {
        type_name: String,
        have_names: Vec<String>,
    },

    #[error("two types found with name {type_name:?}: {first:?} and {second:?}")]
    DuplicateTypeName {
        type_name: String,
        first: String,
        second: String,
    },

    #[error("found multiple instances of type {type_name:?}")]
    DuplicateTypeInstance { type_name: String },

    #[error("type {type_name:?} has no {tag:?} db tag")]
    TagNotFound { type_name: String, tag: String },

    #[error("missing type that provides column {column:?}")]
    MissingColumnProvider { column: String },

    #[error("more than one type provides column {column:?}")]
    AmbiguousColumnProvider { column: String },

    #[error("{member:?} appears more than once in output expressions")]
    DuplicateOutput { member: String },

    #[error("type {type_name:?} cannot be used for maps when no column names are specified")]
    MapNeedsColumns { type_name: String },

    #[error("slice type {type_name:?} cannot be used in an output expression")]
    SliceInOutput { type_name: String },

    #[error("slice type {type_name:?} can only be used in an INSERT ... VALUES expression")]
    SliceOutsideInsert { type_name: String },

    #[error("anonymous argument types are not supported")]
    AnonymousType,

    #[error("pointer argument types are not supported")]
    PointerType,

    #[error("unsupported argument kind for type {type_name:?}: must be a struct, a string-keyed map, or a slice")]
    UnsupportedKind { type_name: String },

    #[error("mismatched number of columns and sources in INSERT")]
    InsertColumnMismatch,

    #[error("more than one map type can act as a catch-all for INSERT columns: {first:?} and {second:?}")]
    MultipleCatchAllMaps { first: String, second: String },
}

fn have_list(names: &[String]) -> String {
    if names.is_empty() {
        "have no parameters".to_string()
    } else {
        let quoted: Vec<String> = names.iter().map(|n| format!("{n:?}")).collect();
        format!("have {}", quoted.join(", "))
    }
}

/// Errors raised while resolving locators to runtime values (input-binding).
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum BindError {
    #[error("type {type_name:?} is not a struct, a string-keyed map, or a slice")]
    NotBindable { type_name: String },

    #[error("nil argument of type {type_name:?}")]
    NilArgument { type_name: String },

    #[error("pointer to nil argument of type {type_name:?}")]
    PointerToNilArgument { type_name: String },

    #[error("found multiple instances of type {type_name:?}")]
    DuplicateTypeInstance { type_name: String },

    #[error(
        "parameter with type {missing:?} missing, have type with same name: {shadow:?}"
    )]
    ShadowedType { missing: String, shadow: String },

    #[error("map {type_name:?} does not contain key {key:?}")]
    MissingMapKey { type_name: String, key: String },

    #[error("cannot use zero value of {type_name}.{member} as explicit input: field is marked omitempty")]
    OmitemptyOnExplicitInput { type_name: String, member: String },

    #[error(
        "different slices sizes in bulk insert: slice of {first_type:?} has length {first_len} but slice of {second_type:?} has length {second_len}"
    )]
    BulkLengthMismatch {
        first_type: String,
        first_len: usize,
        second_type: String,
        second_len: usize,
    },

    #[error("explicit column {column:?} cannot be omitted")]
    ExplicitColumnOmitted { column: String },

    #[error("{type_name:?} not referenced in query")]
    UnusedType { type_name: String },

    #[error(transparent)]
    Reflector(#[from] BoxDynError),
}

/// Errors raised while resolving scan pointers for a returned row (scan-binding).
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ScanError {
    #[error("destination for type {type_name:?} is not a pointer to a struct or a map")]
    NotScannable { type_name: String },

    #[error("nil destination for type {type_name:?}")]
    NilDestination { type_name: String },

    #[error("found multiple destinations for type {type_name:?}")]
    DuplicateTypeInstance { type_name: String },

    #[error("type {type_name:?} not passed as a parameter to scan")]
    TypeNotInQuery { type_name: String },

    #[error("internal column index {index} has no matching output expression")]
    ColumnIndexInconsistent { index: usize },

    #[error("query uses \"&{type_name}.{member}\" outside of a result context")]
    OutsideResultContext { type_name: String, member: String },

    #[error("{type_name:?} not referenced in query")]
    UnusedType { type_name: String },

    #[error(transparent)]
    Reflector(#[from] BoxDynError),
}

/// A 1-based line/column position used to prefix parse error messages the
/// way the lexer's `column N:` / `line L, column N:` convention requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.line <= 1 {
            write!(f, "column {}: ", self.column)
        } else {
            write!(f, "line {}, column {}: ", self.line, self.column)
        }
    }
}

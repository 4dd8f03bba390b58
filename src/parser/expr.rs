//! The parsed expression list (spec §3) produced by [`super::parse`].

use crate::error::Position;

/// A reference to a single member (or `*`) of a host type:
/// `$TypeName.memberName`, `$TypeName.*`, `&TypeName.memberName`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberAccessor {
    pub type_name: String,
    /// A `db` tag, or `"*"` for the whole-type shorthand.
    pub member_name: String,
}

impl MemberAccessor {
    pub fn is_asterisk(&self) -> bool {
        self.member_name == "*"
    }
}

/// `$TypeName[:]`, a slice expansion input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SliceAccessor {
    pub type_name: String,
}

/// The left-hand (SQL) side of an output expression or an INSERT column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnAccessor {
    Basic { table: Option<String>, column: String },
    SqlFunctionCall { raw: String },
}

impl ColumnAccessor {
    pub fn is_asterisk(&self) -> bool {
        matches!(self, ColumnAccessor::Basic { column, .. } if column == "*")
    }

    /// Rendered SQL text for this column, including table prefix.
    pub fn render(&self) -> String {
        match self {
            ColumnAccessor::Basic {
                table: Some(t),
                column,
            } => format!("{t}.{column}"),
            ColumnAccessor::Basic { table: None, column } => column.clone(),
            ColumnAccessor::SqlFunctionCall { raw } => raw.clone(),
        }
    }
}

/// Either side of a `BasicInsert` value position. Slice sources (`$T[:]`)
/// are the bulk-insert case of spec §4.5; the formal grammar of spec §3
/// lists only member/literal but spec §4.5 and scenario D require slices to
/// appear here too.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertValue {
    Member(MemberAccessor),
    Slice(SliceAccessor),
    Literal(String),
}

/// One of the three INSERT shapes (spec §3, §4.2).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertExpr {
    Asterisk { sources: Vec<MemberAccessor> },
    Columns {
        columns: Vec<ColumnAccessor>,
        sources: Vec<MemberAccessor>,
    },
    Basic {
        columns: Vec<ColumnAccessor>,
        values: Vec<InsertValue>,
    },
}

/// A single node of the parsed expression list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Bypass {
        text: String,
    },
    Input {
        source: InputSource,
        raw: String,
        at: Position,
    },
    Output {
        source_columns: Vec<ColumnAccessor>,
        target_types: Vec<MemberAccessor>,
        raw: String,
        at: Position,
    },
    Insert {
        insert: InsertExpr,
        raw: String,
        at: Position,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource {
    Member(MemberAccessor),
    Slice(SliceAccessor),
}

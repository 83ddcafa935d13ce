//! Operator kinds and their printing facts.

/// Prefix unary operators.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum UnaryOp {
    /// `!e`
    Not,
    /// `-e`
    Neg,
    /// `~e`
    BitNot,
}

impl UnaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Not => "!",
            UnaryOp::Neg => "-",
            UnaryOp::BitNot => "~",
        }
    }
}

/// Binary operators.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    /// `&&`
    And,
    /// `||`
    Or,
    BitAnd,
    BitOr,
    BitXor,
    /// `??`
    Coalesce,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Eq => "==",
            BinaryOp::NotEq => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::LtEq => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::GtEq => ">=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitOr => "|",
            BinaryOp::BitXor => "^",
            BinaryOp::Coalesce => "??",
        }
    }

    /// Binding strength on the printer's scale; higher binds tighter.
    pub fn precedence(self) -> u8 {
        match self {
            BinaryOp::Coalesce => 3,
            BinaryOp::Or => 4,
            BinaryOp::And => 5,
            BinaryOp::BitOr => 6,
            BinaryOp::BitXor => 7,
            BinaryOp::BitAnd => 8,
            BinaryOp::Eq | BinaryOp::NotEq => 9,
            BinaryOp::Lt | BinaryOp::LtEq | BinaryOp::Gt | BinaryOp::GtEq => 10,
            BinaryOp::Add | BinaryOp::Sub => 12,
            BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => 13,
        }
    }

    /// `??` is the only right-associative binary operator.
    pub fn is_right_assoc(self) -> bool {
        matches!(self, BinaryOp::Coalesce)
    }

    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Eq
                | BinaryOp::NotEq
                | BinaryOp::Lt
                | BinaryOp::LtEq
                | BinaryOp::Gt
                | BinaryOp::GtEq
        )
    }

    pub fn is_logical(self) -> bool {
        matches!(self, BinaryOp::And | BinaryOp::Or)
    }
}

/// Comparison operator of a relational pattern (`> 3`).
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum RelationalOp {
    Lt,
    LtEq,
    Gt,
    GtEq,
}

impl RelationalOp {
    pub fn to_binary(self) -> BinaryOp {
        match self {
            RelationalOp::Lt => BinaryOp::Lt,
            RelationalOp::LtEq => BinaryOp::LtEq,
            RelationalOp::Gt => BinaryOp::Gt,
            RelationalOp::GtEq => BinaryOp::GtEq,
        }
    }
}

/// Pattern combinators `and` / `or`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum PatternOp {
    And,
    Or,
}

impl PatternOp {
    pub fn keyword(self) -> &'static str {
        match self {
            PatternOp::And => "and",
            PatternOp::Or => "or",
        }
    }

    pub fn to_binary(self) -> BinaryOp {
        match self {
            PatternOp::And => BinaryOp::And,
            PatternOp::Or => BinaryOp::Or,
        }
    }
}

//! Condition syntax tree

/// A parsed guard condition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Int(i64),
    Str(String),
    Bool(bool),
    None,
    Name(String),
    Call { function: String, args: Vec<Expr> },
    Neg(Box<Expr>),
    Not(Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    /// `a < b <= c` holds when every adjacent pair holds
    Compare { first: Box<Expr>, rest: Vec<(CompareOp, Expr)> },
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    FloorDiv,
    Mod,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    In,
    NotIn,
}

impl Expr {
    /// Every variable name referenced by the expression, in source order.
    pub fn names(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect_names(&mut names);
        names
    }

    fn collect_names<'a>(&'a self, names: &mut Vec<&'a str>) {
        match self {
            Expr::Name(name) => names.push(name),
            Expr::Call { args, .. } => args.iter().for_each(|arg| arg.collect_names(names)),
            Expr::Neg(inner) | Expr::Not(inner) => inner.collect_names(names),
            Expr::Binary(_, lhs, rhs) | Expr::And(lhs, rhs) | Expr::Or(lhs, rhs) => {
                lhs.collect_names(names);
                rhs.collect_names(names);
            }
            Expr::Compare { first, rest } => {
                first.collect_names(names);
                rest.iter().for_each(|(_, expr)| expr.collect_names(names));
            }
            Expr::Int(_) | Expr::Str(_) | Expr::Bool(_) | Expr::None => {}
        }
    }
}

impl std::fmt::Display for CompareOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let symbol = match self {
            CompareOp::Eq => "==",
            CompareOp::NotEq => "!=",
            CompareOp::Lt => "<",
            CompareOp::LtEq => "<=",
            CompareOp::Gt => ">",
            CompareOp::GtEq => ">=",
            CompareOp::In => "in",
            CompareOp::NotIn => "not in",
        };
        f.write_str(symbol)
    }
}

impl std::fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let symbol = match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::FloorDiv => "//",
            BinaryOp::Mod => "%",
        };
        f.write_str(symbol)
    }
}

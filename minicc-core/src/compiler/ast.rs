//! Abstract Syntax Tree
//!
//! AST node types produced by the parser and consumed by the lowering pass.
//! Grammar sketches are given in EBNF above each node, where `[]` means
//! optional and `{}` means repetition.
//!
//! Operator payloads are the literal source strings (`"+"`, `"<="`, `"!"`)
//! and function types are the strings `"int"` and `"void"`; the lowering pass
//! maps them onto IR opcodes and types and rejects anything else.
//!
//! Every node implements `dump`, an indented debug rendering used by the
//! CLI's AST mode.

use std::fmt::Write;

/// Append `s` at `level` indents (two spaces each), newline-terminated.
fn dump_indent(out: &mut String, level: usize, s: &str) {
    for _ in 0..level {
        out.push_str("  ");
    }
    let _ = writeln!(out, "{}", s);
}

// CompUnit ::= { FuncDef }
#[derive(Debug, Clone)]
pub struct CompUnit {
    pub func_defs: Vec<FuncDef>,
}

impl CompUnit {
    pub fn dump(&self, out: &mut String, level: usize) {
        dump_indent(out, level, "CompUnitAST {");
        for func_def in &self.func_defs {
            func_def.dump(out, level + 1);
        }
        dump_indent(out, level, "}");
    }
}

// FuncDef ::= ("int" | "void") Ident "(" [FuncFParams] ")" Block
// FuncFParams ::= FuncFParam {"," FuncFParam}
#[derive(Debug, Clone)]
pub struct FuncDef {
    pub ident: String,
    /// `"int"` or `"void"`.
    pub func_type: String,
    pub params: Vec<FuncFParam>,
    pub block: Block,
}

impl FuncDef {
    pub fn dump(&self, out: &mut String, level: usize) {
        dump_indent(out, level, "FuncDefAST {");
        dump_indent(out, level + 1, &format!("ident: {}", self.ident));
        dump_indent(out, level + 1, &format!("func_type: {}", self.func_type));
        for param in &self.params {
            param.dump(out, level + 1);
        }
        dump_indent(out, level + 1, "block: {");
        self.block.dump(out, level + 2);
        dump_indent(out, level + 1, "}");
        dump_indent(out, level, "}");
    }
}

// FuncFParam ::= "int" Ident
#[derive(Debug, Clone)]
pub struct FuncFParam {
    /// `"int"` (the only parameter type).
    pub ty: String,
    pub ident: String,
}

impl FuncFParam {
    pub fn dump(&self, out: &mut String, level: usize) {
        dump_indent(
            out,
            level,
            &format!("FuncFParamAST {{ {} {} }}", self.ty, self.ident),
        );
    }
}

// Block ::= "{" {Stmt} "}"
#[derive(Debug, Clone)]
pub struct Block {
    pub stmts: Vec<Stmt>,
}

impl Block {
    pub fn dump(&self, out: &mut String, level: usize) {
        dump_indent(out, level, "BlockAST {");
        for stmt in &self.stmts {
            stmt.dump(out, level + 1);
        }
        dump_indent(out, level, "}");
    }
}

// Stmt ::= ReturnStmt | VarDeclStmt | VarAssignStmt | Exp ";" | Block | ";"
//        | IfStmt | WhileStmt | "break" ";" | "continue" ";"
#[derive(Debug, Clone)]
pub enum Stmt {
    // ReturnStmt ::= "return" [Exp] ";"
    Return(Option<Exp>),
    // VarDeclStmt ::= "int" Ident "=" Exp ";"
    VarDecl { ident: String, exp: Exp },
    // VarAssignStmt ::= LVal "=" Exp ";"
    Assign { lval: LVal, exp: Exp },
    Exp(Exp),
    Block(Block),
    Empty,
    // IfStmt ::= "if" "(" Exp ")" Stmt ["else" Stmt]
    If {
        cond: Exp,
        then_stmt: Box<Stmt>,
        else_stmt: Option<Box<Stmt>>,
    },
    // WhileStmt ::= "while" "(" Exp ")" Stmt
    While { cond: Exp, body: Box<Stmt> },
    Break,
    Continue,
}

impl Stmt {
    pub fn dump(&self, out: &mut String, level: usize) {
        match self {
            Stmt::Return(exp) => {
                dump_indent(out, level, "ReturnAST {");
                if let Some(exp) = exp {
                    exp.dump(out, level + 1);
                }
                dump_indent(out, level, "}");
            }
            Stmt::VarDecl { ident, exp } => {
                dump_indent(out, level, "VarDeclAST {");
                dump_indent(out, level + 1, &format!("ident: {}", ident));
                exp.dump(out, level + 1);
                dump_indent(out, level, "}");
            }
            Stmt::Assign { lval, exp } => {
                dump_indent(out, level, "VarAssignAST {");
                lval.dump(out, level + 1);
                exp.dump(out, level + 1);
                dump_indent(out, level, "}");
            }
            Stmt::Exp(exp) => exp.dump(out, level),
            Stmt::Block(block) => block.dump(out, level),
            Stmt::Empty => dump_indent(out, level, "EmptyStmtAST"),
            Stmt::If {
                cond,
                then_stmt,
                else_stmt,
            } => {
                dump_indent(out, level, "IfAST {");
                cond.dump(out, level + 1);
                then_stmt.dump(out, level + 1);
                if let Some(else_stmt) = else_stmt {
                    dump_indent(out, level + 1, "else:");
                    else_stmt.dump(out, level + 1);
                }
                dump_indent(out, level, "}");
            }
            Stmt::While { cond, body } => {
                dump_indent(out, level, "WhileAST {");
                cond.dump(out, level + 1);
                body.dump(out, level + 1);
                dump_indent(out, level, "}");
            }
            Stmt::Break => dump_indent(out, level, "BreakAST"),
            Stmt::Continue => dump_indent(out, level, "ContinueAST"),
        }
    }
}

// Exp ::= LOrExp
#[derive(Debug, Clone)]
pub struct Exp {
    pub lor: LOrExp,
}

impl Exp {
    pub fn dump(&self, out: &mut String, level: usize) {
        dump_indent(out, level, "ExpAST {");
        self.lor.dump(out, level + 1);
        dump_indent(out, level, "}");
    }
}

// LOrExp ::= LAndExp | LOrExp "||" LAndExp
#[derive(Debug, Clone)]
pub enum LOrExp {
    LAnd(LAndExp),
    LOr { lhs: Box<LOrExp>, rhs: LAndExp },
}

impl LOrExp {
    pub fn dump(&self, out: &mut String, level: usize) {
        dump_indent(out, level, "LOrExpAST {");
        match self {
            LOrExp::LAnd(inner) => inner.dump(out, level + 1),
            LOrExp::LOr { lhs, rhs } => {
                dump_indent(out, level + 1, "op: ||");
                lhs.dump(out, level + 1);
                rhs.dump(out, level + 1);
            }
        }
        dump_indent(out, level, "}");
    }
}

// LAndExp ::= EqExp | LAndExp "&&" EqExp
#[derive(Debug, Clone)]
pub enum LAndExp {
    Eq(EqExp),
    LAnd { lhs: Box<LAndExp>, rhs: EqExp },
}

impl LAndExp {
    pub fn dump(&self, out: &mut String, level: usize) {
        dump_indent(out, level, "LAndExpAST {");
        match self {
            LAndExp::Eq(inner) => inner.dump(out, level + 1),
            LAndExp::LAnd { lhs, rhs } => {
                dump_indent(out, level + 1, "op: &&");
                lhs.dump(out, level + 1);
                rhs.dump(out, level + 1);
            }
        }
        dump_indent(out, level, "}");
    }
}

// EqExp ::= RelExp | EqExp ("==" | "!=") RelExp
#[derive(Debug, Clone)]
pub enum EqExp {
    Rel(RelExp),
    Eq {
        lhs: Box<EqExp>,
        /// `"=="` or `"!="`.
        op: String,
        rhs: RelExp,
    },
}

impl EqExp {
    pub fn dump(&self, out: &mut String, level: usize) {
        dump_indent(out, level, "EqExpAST {");
        match self {
            EqExp::Rel(inner) => inner.dump(out, level + 1),
            EqExp::Eq { lhs, op, rhs } => {
                dump_indent(out, level + 1, &format!("eq_op: {}", op));
                lhs.dump(out, level + 1);
                rhs.dump(out, level + 1);
            }
        }
        dump_indent(out, level, "}");
    }
}

// RelExp ::= AddExp | RelExp ("<" | ">" | "<=" | ">=") AddExp
#[derive(Debug, Clone)]
pub enum RelExp {
    Add(AddExp),
    Rel {
        lhs: Box<RelExp>,
        /// `"<"`, `">"`, `"<="` or `">="`.
        op: String,
        rhs: AddExp,
    },
}

impl RelExp {
    pub fn dump(&self, out: &mut String, level: usize) {
        dump_indent(out, level, "RelExpAST {");
        match self {
            RelExp::Add(inner) => inner.dump(out, level + 1),
            RelExp::Rel { lhs, op, rhs } => {
                dump_indent(out, level + 1, &format!("rel_op: {}", op));
                lhs.dump(out, level + 1);
                rhs.dump(out, level + 1);
            }
        }
        dump_indent(out, level, "}");
    }
}

// AddExp ::= MulExp | AddExp ("+" | "-") MulExp
#[derive(Debug, Clone)]
pub enum AddExp {
    Mul(MulExp),
    Add {
        lhs: Box<AddExp>,
        /// `"+"` or `"-"`.
        op: String,
        rhs: MulExp,
    },
}

impl AddExp {
    pub fn dump(&self, out: &mut String, level: usize) {
        dump_indent(out, level, "AddExpAST {");
        match self {
            AddExp::Mul(inner) => inner.dump(out, level + 1),
            AddExp::Add { lhs, op, rhs } => {
                dump_indent(out, level + 1, &format!("add_op: {}", op));
                lhs.dump(out, level + 1);
                rhs.dump(out, level + 1);
            }
        }
        dump_indent(out, level, "}");
    }
}

// MulExp ::= UnaryExp | MulExp ("*" | "/" | "%") UnaryExp
#[derive(Debug, Clone)]
pub enum MulExp {
    Unary(UnaryExp),
    Mul {
        lhs: Box<MulExp>,
        /// `"*"`, `"/"` or `"%"`.
        op: String,
        rhs: UnaryExp,
    },
}

impl MulExp {
    pub fn dump(&self, out: &mut String, level: usize) {
        dump_indent(out, level, "MulExpAST {");
        match self {
            MulExp::Unary(inner) => inner.dump(out, level + 1),
            MulExp::Mul { lhs, op, rhs } => {
                dump_indent(out, level + 1, &format!("mul_op: {}", op));
                lhs.dump(out, level + 1);
                rhs.dump(out, level + 1);
            }
        }
        dump_indent(out, level, "}");
    }
}

// UnaryExp ::= PrimaryExp | UnaryOp UnaryExp | FuncCall
#[derive(Debug, Clone)]
pub enum UnaryExp {
    Primary(PrimaryExp),
    Unary {
        /// `"+"`, `"-"` or `"!"`.
        op: String,
        exp: Box<UnaryExp>,
    },
    Call(FuncCall),
}

impl UnaryExp {
    pub fn dump(&self, out: &mut String, level: usize) {
        dump_indent(out, level, "UnaryExpAST {");
        match self {
            UnaryExp::Primary(inner) => inner.dump(out, level + 1),
            UnaryExp::Unary { op, exp } => {
                dump_indent(out, level + 1, &format!("unary_op: {}", op));
                exp.dump(out, level + 1);
            }
            UnaryExp::Call(call) => call.dump(out, level + 1),
        }
        dump_indent(out, level, "}");
    }
}

// FuncCall ::= Ident "(" [FuncRParams] ")"
// FuncRParams ::= Exp {"," Exp}
#[derive(Debug, Clone)]
pub struct FuncCall {
    pub ident: String,
    pub args: Vec<Exp>,
}

impl FuncCall {
    pub fn dump(&self, out: &mut String, level: usize) {
        dump_indent(out, level, "FuncCallAST {");
        dump_indent(out, level + 1, &format!("ident: {}", self.ident));
        for arg in &self.args {
            arg.dump(out, level + 1);
        }
        dump_indent(out, level, "}");
    }
}

// PrimaryExp ::= "(" Exp ")" | Number | LVal
#[derive(Debug, Clone)]
pub enum PrimaryExp {
    Paren(Box<Exp>),
    Number(i32),
    LVal(LVal),
}

impl PrimaryExp {
    pub fn dump(&self, out: &mut String, level: usize) {
        dump_indent(out, level, "PrimaryAST {");
        match self {
            PrimaryExp::Paren(exp) => exp.dump(out, level + 1),
            PrimaryExp::Number(value) => {
                dump_indent(out, level + 1, "NumberAST {");
                dump_indent(out, level + 2, &format!("value: {}", value));
                dump_indent(out, level + 1, "}");
            }
            PrimaryExp::LVal(lval) => lval.dump(out, level + 1),
        }
        dump_indent(out, level, "}");
    }
}

// LVal ::= Ident
#[derive(Debug, Clone)]
pub struct LVal {
    pub ident: String,
}

impl LVal {
    pub fn dump(&self, out: &mut String, level: usize) {
        dump_indent(out, level, &format!("LValAST {{ {} }}", self.ident));
    }
}

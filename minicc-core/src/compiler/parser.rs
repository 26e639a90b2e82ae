//! MiniC Parser
//!
//! Recursive-descent parser over the token stream, producing the AST the
//! lowering pass consumes. Left-recursive productions in the reference
//! grammar (`AddExp ::= AddExp "+" MulExp` and friends) are parsed
//! iteratively and rebuilt left-associated.

use crate::compiler::ast::{
    AddExp, Block, CompUnit, EqExp, Exp, FuncCall, FuncDef, FuncFParam, LAndExp, LOrExp, LVal,
    MulExp, PrimaryExp, RelExp, Stmt, UnaryExp,
};
use crate::compiler::error::CompilerError;
use crate::compiler::lexer::{tokenize, SpannedToken, Token};

/// Parse MiniC source text into a [`CompUnit`].
///
/// # Errors
/// Returns [`CompilerError::LexError`] or [`CompilerError::ParseError`] when
/// the source does not conform to the grammar.
pub fn parse(source: &str) -> Result<CompUnit, CompilerError> {
    let tokens = tokenize(source)?;
    let mut parser = Parser { tokens, pos: 0 };
    parser.parse_comp_unit()
}

struct Parser {
    tokens: Vec<SpannedToken>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|t| &t.token)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset).map(|t| &t.token)
    }

    /// Line of the current token, or of the last token at end of input.
    fn line(&self) -> usize {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map_or(1, |t| t.line)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).map(|t| t.token.clone());
        self.pos += 1;
        token
    }

    fn error(&self, message: impl Into<String>) -> CompilerError {
        CompilerError::ParseError {
            line: self.line(),
            message: message.into(),
        }
    }

    fn expect(&mut self, expected: Token) -> Result<(), CompilerError> {
        match self.peek() {
            Some(token) if *token == expected => {
                self.pos += 1;
                Ok(())
            }
            Some(token) => Err(self.error(format!(
                "expected '{}', found '{}'",
                expected.spelling(),
                token.spelling()
            ))),
            None => Err(self.error(format!(
                "expected '{}', found end of input",
                expected.spelling()
            ))),
        }
    }

    fn expect_ident(&mut self) -> Result<String, CompilerError> {
        match self.advance() {
            Some(Token::Ident(name)) => Ok(name),
            Some(token) => Err(self.error(format!(
                "expected identifier, found '{}'",
                token.spelling()
            ))),
            None => Err(self.error("expected identifier, found end of input")),
        }
    }

    // CompUnit ::= {FuncDef}
    fn parse_comp_unit(&mut self) -> Result<CompUnit, CompilerError> {
        let mut func_defs = Vec::new();
        while self.peek().is_some() {
            func_defs.push(self.parse_func_def()?);
        }
        Ok(CompUnit { func_defs })
    }

    // FuncDef ::= ("int" | "void") Ident "(" [FuncFParams] ")" Block
    fn parse_func_def(&mut self) -> Result<FuncDef, CompilerError> {
        let func_type = match self.advance() {
            Some(Token::Int) => "int".to_string(),
            Some(Token::Void) => "void".to_string(),
            Some(token) => {
                return Err(self.error(format!(
                    "expected 'int' or 'void', found '{}'",
                    token.spelling()
                )))
            }
            None => return Err(self.error("expected function definition, found end of input")),
        };
        let ident = self.expect_ident()?;
        self.expect(Token::LParen)?;

        let mut params = Vec::new();
        if self.peek() != Some(&Token::RParen) {
            loop {
                self.expect(Token::Int)?;
                let param_ident = self.expect_ident()?;
                params.push(FuncFParam {
                    ty: "int".to_string(),
                    ident: param_ident,
                });
                if self.peek() == Some(&Token::Comma) {
                    self.pos += 1;
                } else {
                    break;
                }
            }
        }
        self.expect(Token::RParen)?;

        let block = self.parse_block()?;
        Ok(FuncDef {
            ident,
            func_type,
            params,
            block,
        })
    }

    // Block ::= "{" {Stmt} "}"
    fn parse_block(&mut self) -> Result<Block, CompilerError> {
        self.expect(Token::LBrace)?;
        let mut stmts = Vec::new();
        while self.peek() != Some(&Token::RBrace) {
            if self.peek().is_none() {
                return Err(self.error("unclosed block, expected '}'"));
            }
            stmts.push(self.parse_stmt()?);
        }
        self.expect(Token::RBrace)?;
        Ok(Block { stmts })
    }

    fn parse_stmt(&mut self) -> Result<Stmt, CompilerError> {
        match self.peek() {
            Some(Token::Return) => {
                self.pos += 1;
                let exp = if self.peek() == Some(&Token::Semicolon) {
                    None
                } else {
                    Some(self.parse_exp()?)
                };
                self.expect(Token::Semicolon)?;
                Ok(Stmt::Return(exp))
            }
            Some(Token::Int) => {
                // VarDeclStmt ::= "int" Ident "=" Exp ";"
                self.pos += 1;
                let ident = self.expect_ident()?;
                self.expect(Token::Assign)?;
                let exp = self.parse_exp()?;
                self.expect(Token::Semicolon)?;
                Ok(Stmt::VarDecl { ident, exp })
            }
            Some(Token::LBrace) => Ok(Stmt::Block(self.parse_block()?)),
            Some(Token::Semicolon) => {
                self.pos += 1;
                Ok(Stmt::Empty)
            }
            Some(Token::If) => {
                self.pos += 1;
                self.expect(Token::LParen)?;
                let cond = self.parse_exp()?;
                self.expect(Token::RParen)?;
                let then_stmt = Box::new(self.parse_stmt()?);
                let else_stmt = if self.peek() == Some(&Token::Else) {
                    self.pos += 1;
                    Some(Box::new(self.parse_stmt()?))
                } else {
                    None
                };
                Ok(Stmt::If {
                    cond,
                    then_stmt,
                    else_stmt,
                })
            }
            Some(Token::While) => {
                self.pos += 1;
                self.expect(Token::LParen)?;
                let cond = self.parse_exp()?;
                self.expect(Token::RParen)?;
                let body = Box::new(self.parse_stmt()?);
                Ok(Stmt::While { cond, body })
            }
            Some(Token::Break) => {
                self.pos += 1;
                self.expect(Token::Semicolon)?;
                Ok(Stmt::Break)
            }
            Some(Token::Continue) => {
                self.pos += 1;
                self.expect(Token::Semicolon)?;
                Ok(Stmt::Continue)
            }
            // Assignment needs two tokens of lookahead to distinguish
            // `x = ...` from an expression statement starting with `x`.
            Some(Token::Ident(_)) if self.peek_at(1) == Some(&Token::Assign) => {
                let ident = self.expect_ident()?;
                self.pos += 1; // '='
                let exp = self.parse_exp()?;
                self.expect(Token::Semicolon)?;
                Ok(Stmt::Assign {
                    lval: LVal { ident },
                    exp,
                })
            }
            Some(_) => {
                let exp = self.parse_exp()?;
                self.expect(Token::Semicolon)?;
                Ok(Stmt::Exp(exp))
            }
            None => Err(self.error("expected statement, found end of input")),
        }
    }

    // Exp ::= LOrExp
    fn parse_exp(&mut self) -> Result<Exp, CompilerError> {
        Ok(Exp {
            lor: self.parse_lor_exp()?,
        })
    }

    // LOrExp ::= LAndExp {"||" LAndExp}
    fn parse_lor_exp(&mut self) -> Result<LOrExp, CompilerError> {
        let mut node = LOrExp::LAnd(self.parse_land_exp()?);
        while self.peek() == Some(&Token::LOr) {
            self.pos += 1;
            let rhs = self.parse_land_exp()?;
            node = LOrExp::LOr {
                lhs: Box::new(node),
                rhs,
            };
        }
        Ok(node)
    }

    // LAndExp ::= EqExp {"&&" EqExp}
    fn parse_land_exp(&mut self) -> Result<LAndExp, CompilerError> {
        let mut node = LAndExp::Eq(self.parse_eq_exp()?);
        while self.peek() == Some(&Token::LAnd) {
            self.pos += 1;
            let rhs = self.parse_eq_exp()?;
            node = LAndExp::LAnd {
                lhs: Box::new(node),
                rhs,
            };
        }
        Ok(node)
    }

    // EqExp ::= RelExp {("==" | "!=") RelExp}
    fn parse_eq_exp(&mut self) -> Result<EqExp, CompilerError> {
        let mut node = EqExp::Rel(self.parse_rel_exp()?);
        loop {
            let op = match self.peek() {
                Some(Token::Eq) => "==",
                Some(Token::Ne) => "!=",
                _ => break,
            };
            self.pos += 1;
            let rhs = self.parse_rel_exp()?;
            node = EqExp::Eq {
                lhs: Box::new(node),
                op: op.to_string(),
                rhs,
            };
        }
        Ok(node)
    }

    // RelExp ::= AddExp {("<" | ">" | "<=" | ">=") AddExp}
    fn parse_rel_exp(&mut self) -> Result<RelExp, CompilerError> {
        let mut node = RelExp::Add(self.parse_add_exp()?);
        loop {
            let op = match self.peek() {
                Some(Token::Lt) => "<",
                Some(Token::Gt) => ">",
                Some(Token::Le) => "<=",
                Some(Token::Ge) => ">=",
                _ => break,
            };
            self.pos += 1;
            let rhs = self.parse_add_exp()?;
            node = RelExp::Rel {
                lhs: Box::new(node),
                op: op.to_string(),
                rhs,
            };
        }
        Ok(node)
    }

    // AddExp ::= MulExp {("+" | "-") MulExp}
    fn parse_add_exp(&mut self) -> Result<AddExp, CompilerError> {
        let mut node = AddExp::Mul(self.parse_mul_exp()?);
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => "+",
                Some(Token::Minus) => "-",
                _ => break,
            };
            self.pos += 1;
            let rhs = self.parse_mul_exp()?;
            node = AddExp::Add {
                lhs: Box::new(node),
                op: op.to_string(),
                rhs,
            };
        }
        Ok(node)
    }

    // MulExp ::= UnaryExp {("*" | "/" | "%") UnaryExp}
    fn parse_mul_exp(&mut self) -> Result<MulExp, CompilerError> {
        let mut node = MulExp::Unary(self.parse_unary_exp()?);
        loop {
            let op = match self.peek() {
                Some(Token::Star) => "*",
                Some(Token::Slash) => "/",
                Some(Token::Percent) => "%",
                _ => break,
            };
            self.pos += 1;
            let rhs = self.parse_unary_exp()?;
            node = MulExp::Mul {
                lhs: Box::new(node),
                op: op.to_string(),
                rhs,
            };
        }
        Ok(node)
    }

    // UnaryExp ::= PrimaryExp | ("+" | "-" | "!") UnaryExp | FuncCall
    fn parse_unary_exp(&mut self) -> Result<UnaryExp, CompilerError> {
        match self.peek() {
            Some(Token::Plus) | Some(Token::Minus) | Some(Token::Not) => {
                let op = match self.advance() {
                    Some(Token::Plus) => "+",
                    Some(Token::Minus) => "-",
                    _ => "!",
                };
                let exp = Box::new(self.parse_unary_exp()?);
                Ok(UnaryExp::Unary {
                    op: op.to_string(),
                    exp,
                })
            }
            Some(Token::Ident(_)) if self.peek_at(1) == Some(&Token::LParen) => {
                let ident = self.expect_ident()?;
                self.pos += 1; // '('
                let mut args = Vec::new();
                if self.peek() != Some(&Token::RParen) {
                    loop {
                        args.push(self.parse_exp()?);
                        if self.peek() == Some(&Token::Comma) {
                            self.pos += 1;
                        } else {
                            break;
                        }
                    }
                }
                self.expect(Token::RParen)?;
                Ok(UnaryExp::Call(FuncCall { ident, args }))
            }
            _ => Ok(UnaryExp::Primary(self.parse_primary_exp()?)),
        }
    }

    // PrimaryExp ::= "(" Exp ")" | Number | LVal
    fn parse_primary_exp(&mut self) -> Result<PrimaryExp, CompilerError> {
        match self.advance() {
            Some(Token::LParen) => {
                let exp = self.parse_exp()?;
                self.expect(Token::RParen)?;
                Ok(PrimaryExp::Paren(Box::new(exp)))
            }
            Some(Token::IntConst(value)) => Ok(PrimaryExp::Number(value)),
            Some(Token::Ident(ident)) => Ok(PrimaryExp::LVal(LVal { ident })),
            Some(token) => Err(self.error(format!(
                "expected expression, found '{}'",
                token.spelling()
            ))),
            None => Err(self.error("expected expression, found end of input")),
        }
    }
}

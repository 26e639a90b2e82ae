// Unit tests for the MiniC parser
#[cfg(test)]
mod tests {
    use minicc_core::compiler::ast::{AddExp, LOrExp, MulExp, Stmt};
    use minicc_core::compiler::parser::parse;

    #[test]
    fn test_parse_identity_main() {
        let unit = parse("int main() { return 0; }").unwrap();
        assert_eq!(unit.func_defs.len(), 1);
        let func = &unit.func_defs[0];
        assert_eq!(func.ident, "main");
        assert_eq!(func.func_type, "int");
        assert!(func.params.is_empty());
        assert_eq!(func.block.stmts.len(), 1);
        assert!(matches!(func.block.stmts[0], Stmt::Return(Some(_))));
    }

    #[test]
    fn test_parse_function_parameters() {
        let unit = parse("int add(int a, int b) { return a + b; }").unwrap();
        let func = &unit.func_defs[0];
        assert_eq!(func.params.len(), 2);
        assert_eq!(func.params[0].ident, "a");
        assert_eq!(func.params[1].ident, "b");
        assert_eq!(func.params[0].ty, "int");
    }

    #[test]
    fn test_parse_precedence() {
        // 1 + 2 * 3 parses as 1 + (2 * 3)
        let unit = parse("int main() { return 1 + 2 * 3; }").unwrap();
        let stmt = &unit.func_defs[0].block.stmts[0];
        let exp = match stmt {
            Stmt::Return(Some(exp)) => exp,
            _ => panic!("expected return statement"),
        };
        let add = match &exp.lor {
            LOrExp::LAnd(land) => match land {
                minicc_core::compiler::ast::LAndExp::Eq(eq) => match eq {
                    minicc_core::compiler::ast::EqExp::Rel(rel) => match rel {
                        minicc_core::compiler::ast::RelExp::Add(add) => add,
                        _ => panic!("expected additive expression"),
                    },
                    _ => panic!("expected relational expression"),
                },
                _ => panic!("expected equality expression"),
            },
            _ => panic!("expected logical-and expression"),
        };
        match add {
            AddExp::Add { op, rhs, .. } => {
                assert_eq!(op, "+");
                assert!(matches!(rhs, MulExp::Mul { .. }), "rhs binds the product");
            }
            _ => panic!("expected addition at the top"),
        }
    }

    #[test]
    fn test_parse_unary_chain() {
        let unit = parse("int main() { return -!5; }").unwrap();
        let stmt = &unit.func_defs[0].block.stmts[0];
        let text = {
            let mut out = String::new();
            stmt.dump(&mut out, 0);
            out
        };
        assert!(text.contains("unary_op: -"));
        assert!(text.contains("unary_op: !"));
    }

    #[test]
    fn test_parse_call_vs_lval() {
        let unit = parse("int main() { int f = 1; return f; }").unwrap();
        let stmts = &unit.func_defs[0].block.stmts;
        assert!(matches!(stmts[0], Stmt::VarDecl { .. }));

        let unit = parse("int main() { return f(); }").unwrap();
        let stmt = &unit.func_defs[0].block.stmts[0];
        let exp = match stmt {
            Stmt::Return(Some(exp)) => exp,
            _ => panic!("expected return"),
        };
        let mut out = String::new();
        exp.dump(&mut out, 0);
        assert!(out.contains("FuncCallAST"), "call parses as FuncCall: {}", out);
    }

    #[test]
    fn test_parse_dangling_else() {
        // else binds to the innermost if
        let unit = parse("int main() { if (1) if (2) return 1; else return 2; return 3; }");
        let unit = unit.unwrap();
        let outer = &unit.func_defs[0].block.stmts[0];
        match outer {
            Stmt::If {
                else_stmt: None,
                then_stmt,
                ..
            } => match then_stmt.as_ref() {
                Stmt::If {
                    else_stmt: Some(_), ..
                } => {}
                _ => panic!("inner if should carry the else"),
            },
            _ => panic!("outer if should have no else"),
        }
    }

    #[test]
    fn test_parse_paren_grouping() {
        let unit = parse("int main() { return (1 + 2) * 3; }").unwrap();
        let mut out = String::new();
        unit.dump(&mut out, 0);
        assert!(out.contains("mul_op: *"));
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse("int main() { return 0 }").is_err(), "missing semicolon");
        assert!(parse("int main() { return 0; ").is_err(), "unclosed block");
        assert!(parse("float main() { return 0; }").is_err(), "unknown type");
        assert!(parse("int main(int) { return 0; }").is_err(), "missing param name");
    }

    #[test]
    fn test_ast_dump_shape() {
        let unit = parse("int main() { int x = 3; while (x) { x = x - 1; } return x; }").unwrap();
        let mut out = String::new();
        unit.dump(&mut out, 0);
        assert!(out.starts_with("CompUnitAST {"));
        assert!(out.contains("FuncDefAST {"));
        assert!(out.contains("WhileAST {"));
        assert!(out.contains("VarAssignAST {"));
        assert!(out.trim_end().ends_with('}'));
    }
}

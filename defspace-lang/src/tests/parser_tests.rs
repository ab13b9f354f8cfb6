use crate::ast::*;
use crate::parse_source;

#[test]
fn test_parse_import_forms() {
    let program = parse_source("import greet\nimport tools.format as fmt").unwrap();
    assert_eq!(program.stmts.len(), 2);
    match &program.stmts[0] {
        Stmt::Import { path, alias, .. } => {
            assert_eq!(path, &vec!["greet".to_string()]);
            assert!(alias.is_none());
        }
        other => panic!("Expected import, got {:?}", other),
    }
    match &program.stmts[1] {
        Stmt::Import { path, alias, .. } => {
            assert_eq!(path, &vec!["tools".to_string(), "format".to_string()]);
            assert_eq!(alias.as_deref(), Some("fmt"));
        }
        other => panic!("Expected import, got {:?}", other),
    }
}

#[test]
fn test_parse_fn_with_defaults_and_doc() {
    let program =
        parse_source(r#"fn greet(name, greeting = "hi") { "Say hello."; greeting + name }"#)
            .unwrap();
    let Stmt::FnDecl(def) = &program.stmts[0] else {
        panic!("Expected fn declaration");
    };
    assert_eq!(def.name.as_deref(), Some("greet"));
    assert_eq!(def.params.len(), 2);
    assert!(def.params[1].default.is_some());
    assert_eq!(def.doc.as_deref(), Some("Say hello."));
    assert_eq!(def.body.stmts.len(), 1);
    assert_eq!(def.signature(), "greet(name, greeting = ...)");
}

#[test]
fn test_single_string_body_is_not_doc() {
    let program = parse_source(r#"fn motto() { "keep going" }"#).unwrap();
    let Stmt::FnDecl(def) = &program.stmts[0] else {
        panic!("Expected fn declaration");
    };
    assert!(def.doc.is_none());
    assert_eq!(def.body.stmts.len(), 1);
}

#[test]
fn test_precedence() {
    let program = parse_source("1 + 2 * 3").unwrap();
    let Stmt::Expr(expr) = &program.stmts[0] else {
        panic!("Expected expression");
    };
    match &expr.kind {
        ExprKind::Binary { op, rhs, .. } => {
            assert_eq!(*op, BinaryOp::Add);
            assert!(matches!(rhs.kind, ExprKind::Binary { op: BinaryOp::Mul, .. }));
        }
        other => panic!("Expected binary, got {:?}", other),
    }
}

#[test]
fn test_parse_postfix_chain() {
    let program = parse_source("tools.format(items[0], sep = \", \")").unwrap();
    let Stmt::Expr(expr) = &program.stmts[0] else {
        panic!("Expected expression");
    };
    let ExprKind::Call { callee, args } = &expr.kind else {
        panic!("Expected call");
    };
    assert!(matches!(callee.kind, ExprKind::Attr { .. }));
    assert_eq!(args.len(), 2);
    assert!(args[0].name.is_none());
    assert!(matches!(args[0].value.kind, ExprKind::Index { .. }));
    assert_eq!(args[1].name.as_deref(), Some("sep"));
}

#[test]
fn test_parse_map_and_assignment() {
    let program = parse_source(r#"let config = { name: "x", "max size": 3 }; config.name = "y""#)
        .unwrap();
    assert_eq!(program.stmts.len(), 2);
    match &program.stmts[0] {
        Stmt::Let { value, .. } => match &value.kind {
            ExprKind::Map(entries) => {
                assert_eq!(entries[0].0, "name");
                assert_eq!(entries[1].0, "max size");
            }
            other => panic!("Expected map, got {:?}", other),
        },
        other => panic!("Expected let, got {:?}", other),
    }
    assert!(matches!(program.stmts[1], Stmt::Assign { .. }));
}

#[test]
fn test_else_if_chain() {
    let program = parse_source("if a { 1 } else if b { 2 } else { 3 }").unwrap();
    let Stmt::Expr(expr) = &program.stmts[0] else {
        panic!("Expected expression");
    };
    let ExprKind::If { else_branch, .. } = &expr.kind else {
        panic!("Expected if");
    };
    let nested = else_branch.as_ref().unwrap();
    assert!(matches!(
        &nested.stmts[0],
        Stmt::Expr(Expr { kind: ExprKind::If { .. }, .. })
    ));
}

#[test]
fn test_invalid_assignment_target() {
    let err = parse_source("1 + 2 = 3").unwrap_err();
    assert!(matches!(err, crate::LangError::ParserError { .. }));
}

#[test]
fn test_positional_after_keyword() {
    let err = parse_source("f(a = 1, 2)").unwrap_err();
    assert!(matches!(err, crate::LangError::ParserError { .. }));
}

#[test]
fn test_required_param_after_default() {
    let err = parse_source("fn f(a = 1, b) { a }").unwrap_err();
    assert!(matches!(err, crate::LangError::ParserError { .. }));
}

#[test]
fn test_unclosed_block() {
    let err = parse_source("fn f() { 1").unwrap_err();
    assert!(matches!(err, crate::LangError::ParserError { .. }));
}

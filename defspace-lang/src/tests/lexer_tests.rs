use crate::lexer::*;

#[test]
fn test_tokenize_keywords() {
    let tokens = tokenize("import as let fn return if else while for in").unwrap();
    assert!(matches!(tokens[0].token, Token::Import));
    assert!(matches!(tokens[1].token, Token::As));
    assert!(matches!(tokens[2].token, Token::Let));
    assert!(matches!(tokens[3].token, Token::Fn));
    assert!(matches!(tokens[4].token, Token::Return));
    assert!(matches!(tokens[5].token, Token::If));
    assert!(matches!(tokens[6].token, Token::Else));
    assert!(matches!(tokens[7].token, Token::While));
    assert!(matches!(tokens[8].token, Token::For));
    assert!(matches!(tokens[9].token, Token::In));
    assert!(tokens[0].token.is_keyword());
}

#[test]
fn test_tokenize_identifiers() {
    let tokens = tokenize("greet load_once _private importer").unwrap();
    assert!(matches!(&tokens[0].token, Token::Identifier(s) if s == "greet"));
    assert!(matches!(&tokens[1].token, Token::Identifier(s) if s == "load_once"));
    assert!(matches!(&tokens[2].token, Token::Identifier(s) if s == "_private"));
    // Keyword prefixes stay identifiers
    assert!(matches!(&tokens[3].token, Token::Identifier(s) if s == "importer"));
}

#[test]
fn test_tokenize_numbers() {
    let tokens = tokenize("0 42 3.25 -7").unwrap();
    assert!(matches!(tokens[0].token, Token::IntLiteral(0)));
    assert!(matches!(tokens[1].token, Token::IntLiteral(42)));
    assert!(matches!(tokens[2].token, Token::FloatLiteral(f) if f == 3.25));
    // Negation is an operator, not part of the literal
    assert!(matches!(tokens[3].token, Token::Minus));
    assert!(matches!(tokens[4].token, Token::IntLiteral(7)));
}

#[test]
fn test_tokenize_strings() {
    let tokens = tokenize(r#""hi" "line\nbreak" """#).unwrap();
    assert!(matches!(&tokens[0].token, Token::StringLiteral(s) if s == "hi"));
    assert!(matches!(&tokens[1].token, Token::StringLiteral(s) if s == "line\nbreak"));
    assert!(matches!(&tokens[2].token, Token::StringLiteral(s) if s.is_empty()));
}

#[test]
fn test_comments_are_skipped() {
    let tokens = tokenize("# a comment\nlet x = 1 # trailing\n").unwrap();
    assert!(matches!(tokens[0].token, Token::Let));
    assert_eq!(tokens.len(), 5);
    assert!(matches!(tokens[4].token, Token::Eof));
}

#[test]
fn test_operators() {
    let tokens = tokenize("+ - * / % == != < <= > >= && || ! =").unwrap();
    let expected = [
        Token::Plus,
        Token::Minus,
        Token::Star,
        Token::Slash,
        Token::Percent,
        Token::EqEq,
        Token::NotEq,
        Token::Lt,
        Token::Le,
        Token::Gt,
        Token::Ge,
        Token::AndAnd,
        Token::OrOr,
        Token::Bang,
        Token::Eq,
    ];
    for (token, expected) in tokens.iter().zip(expected.iter()) {
        assert_eq!(&token.token, expected);
    }
}

#[test]
fn test_spans() {
    let tokens = tokenize("let greet").unwrap();
    assert_eq!(tokens[0].span, crate::Span::new(0, 3));
    assert_eq!(tokens[1].span, crate::Span::new(4, 9));
}

#[test]
fn test_invalid_token() {
    let err = tokenize("let x = @").unwrap_err();
    assert!(matches!(err, crate::LangError::LexerError { .. }));
}

use keel_syntax::lexer::{self, LexOptions};
use keel_syntax::{Keyword, KeywordCategory, LexError, Token};

fn kinds(source: &str) -> Vec<Token> {
    lexer::tokenize(source, "test.keel")
        .tokens
        .into_iter()
        .map(|t| t.token)
        .collect()
}

#[test]
fn test_field_declaration() {
    let tokens = kinds("username: string! @min(3)");

    assert_eq!(
        tokens,
        vec![
            Token::Identifier("username".to_string()),
            Token::Colon,
            Token::Keyword(Keyword::String),
            Token::Bang,
            Token::At,
            Token::Identifier("min".to_string()),
            Token::LeftParen,
            Token::Int(3),
            Token::RightParen,
            Token::Eof,
        ]
    );
}

#[test]
fn test_unicode_identifiers() {
    let output = lexer::tokenize("имя 名前 größe δ_1", "unicode.keel");

    assert!(output.errors.is_empty());
    assert_eq!(output.tokens[0].token, Token::Identifier("имя".to_string()));
    assert_eq!(output.tokens[1].token, Token::Identifier("名前".to_string()));
    assert_eq!(output.tokens[2].token, Token::Identifier("größe".to_string()));
    assert_eq!(output.tokens[3].token, Token::Identifier("δ_1".to_string()));
    assert_eq!(output.tokens.len(), 5);
}

#[test]
fn test_identifiers_with_combining_marks() {
    let output = lexer::tokenize("नमस्ते สวัสดี வணக்கம்", "marks.keel");

    assert!(output.errors.is_empty(), "{:?}", output.errors);
    assert_eq!(output.tokens[0].token, Token::Identifier("नमस्ते".to_string()));
    assert_eq!(output.tokens[1].token, Token::Identifier("สวัสดี".to_string()));
    assert_eq!(output.tokens[2].token, Token::Identifier("வணக்கம்".to_string()));
    assert_eq!(output.tokens.len(), 4);
}

#[test]
fn test_unicode_columns_count_characters() {
    let output = lexer::tokenize("名前 x", "unicode.keel");

    assert_eq!(output.tokens[1].span.col, 4);
    assert_eq!(output.tokens[1].span.start, "名前 ".len());
}

#[test]
fn test_word_operators() {
    let tokens = kinds("a and b or not c");

    assert_eq!(tokens[1], Token::And);
    assert_eq!(tokens[3], Token::Or);
    assert_eq!(tokens[4], Token::Bang);
}

#[test]
fn test_keyword_categories_are_grouped() {
    let count = |category| {
        Keyword::ALL
            .iter()
            .filter(|kw| kw.category() == category)
            .count()
    };

    assert_eq!(count(KeywordCategory::Resource), 4);
    assert_eq!(count(KeywordCategory::Literal), 3);
    assert!(count(KeywordCategory::Type) >= 17);
}

#[test]
fn test_lexer_keeps_going_after_errors() {
    let output = lexer::tokenize("a ~ \"open\nb ` c", "bad.keel");

    assert_eq!(output.errors.len(), 2);
    assert!(matches!(output.errors[0], LexError::UnexpectedChar { ch: '~', .. }));
    assert!(matches!(output.errors[1], LexError::UnterminatedString { start_line: 1, .. }));
    assert_eq!(output.tokens.last().map(|t| &t.token), Some(&Token::Eof));
}

#[test]
fn test_invalid_integer_literal() {
    let output = lexer::tokenize("99999999999999999999", "big.keel");

    assert_eq!(output.errors.len(), 1);
    assert!(matches!(output.errors[0], LexError::InvalidNumber { .. }));
}

#[test]
fn test_trivia_mode_newlines_and_comments() {
    let output = lexer::tokenize_with(
        "resource A { # note\n}\n",
        "trivia.keel",
        LexOptions {
            preserve_trivia: true,
        },
    );
    let tokens: Vec<_> = output.tokens.into_iter().map(|t| t.token).collect();

    assert_eq!(
        tokens,
        vec![
            Token::Keyword(Keyword::Resource),
            Token::Identifier("A".to_string()),
            Token::LeftBrace,
            Token::Comment(" note".to_string()),
            Token::Newline,
            Token::RightBrace,
            Token::Newline,
            Token::Eof,
        ]
    );
}

#[test]
fn test_interpolated_string_is_one_token() {
    let output = lexer::tokenize(r#""Hello #{user.name}!""#, "s.keel");

    assert!(output.errors.is_empty());
    assert_eq!(
        output.tokens[0].token,
        Token::String("Hello #{user.name}!".to_string())
    );
    assert_eq!(output.tokens[0].lexeme, r#""Hello #{user.name}!""#);
}

#[test]
fn test_safe_navigation_and_null_coalesce() {
    let tokens = kinds("post?.author ?? nil");

    assert_eq!(tokens[0], Token::Identifier("post".to_string()));
    assert_eq!(tokens[1], Token::QuestionDot);
    assert_eq!(tokens[2], Token::Identifier("author".to_string()));
    assert_eq!(tokens[3], Token::QuestionQuestion);
    assert_eq!(tokens[4], Token::Keyword(Keyword::Nil));
}

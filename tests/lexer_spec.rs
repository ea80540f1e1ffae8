/// Spec tests for the idzey lexer.
///
/// Each test verifies that specific source text scans to the expected
/// sequence of token kinds. The trailing Eof token is filtered out unless a
/// test is specifically about it.
use idzey::lexer::{Lexer, Token, TokenKind, TokenValue};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn lex_tokens(src: &str) -> Vec<Token> {
    let mut lexer = Lexer::new(src);
    let mut tokens = Vec::new();
    loop {
        let tok = lexer.next_token();
        let done = tok.kind == TokenKind::Eof;
        tokens.push(tok);
        if done {
            break;
        }
    }
    tokens
}

fn lex(src: &str) -> Vec<TokenKind> {
    lex_tokens(src)
        .into_iter()
        .map(|t| t.kind)
        .filter(|k| *k != TokenKind::Eof)
        .collect()
}

// ---------------------------------------------------------------------------
// Literals
// ---------------------------------------------------------------------------

#[test]
fn number_integer() {
    let tokens = lex_tokens("42");
    assert_eq!(tokens[0].kind, TokenKind::Number);
    assert_eq!(tokens[0].value, TokenValue::Num(42.0));
    assert_eq!(tokens[0].lexeme, "42");
}

#[test]
fn number_fractional() {
    let tokens = lex_tokens("3.14");
    assert_eq!(tokens[0].kind, TokenKind::Number);
    assert_eq!(tokens[0].value, TokenValue::Num(3.14));
    assert_eq!(tokens[0].lexeme, "3.14");
}

#[test]
fn number_dot_without_digits_is_separate_token() {
    // "1." is NUMBER then DOT; the fractional part needs a digit.
    assert_eq!(lex("1."), vec![TokenKind::Number, TokenKind::Dot]);
}

#[test]
fn string_basic() {
    let tokens = lex_tokens("\"hello\"");
    assert_eq!(tokens[0].kind, TokenKind::Str);
    assert_eq!(tokens[0].value, TokenValue::Str("hello".to_string()));
}

#[test]
fn string_empty() {
    let tokens = lex_tokens("\"\"");
    assert_eq!(tokens[0].value, TokenValue::Str(String::new()));
}

#[test]
fn string_preserves_inner_bytes_verbatim() {
    // No escape processing: backslashes come through untouched.
    let tokens = lex_tokens(r#""a\nb""#);
    assert_eq!(tokens[0].value, TokenValue::Str("a\\nb".to_string()));
}

#[test]
fn string_may_span_lines() {
    let tokens = lex_tokens("\"a\nb\"");
    assert_eq!(tokens[0].kind, TokenKind::Str);
    assert_eq!(tokens[0].value, TokenValue::Str("a\nb".to_string()));
}

#[test]
fn bool_true_carries_payload() {
    let tokens = lex_tokens("true");
    assert_eq!(tokens[0].kind, TokenKind::True);
    assert_eq!(tokens[0].value, TokenValue::Bool(true));
}

#[test]
fn bool_false_carries_payload() {
    let tokens = lex_tokens("false");
    assert_eq!(tokens[0].kind, TokenKind::False);
    assert_eq!(tokens[0].value, TokenValue::Bool(false));
}

// ---------------------------------------------------------------------------
// Identifiers vs keywords
// ---------------------------------------------------------------------------

#[test]
fn ident_simple() {
    let tokens = lex_tokens("myVar");
    assert_eq!(tokens[0].kind, TokenKind::Ident);
    assert_eq!(tokens[0].value, TokenValue::Str("myVar".to_string()));
}

#[test]
fn ident_with_underscore_and_digits() {
    let tokens = lex_tokens("_x1");
    assert_eq!(tokens[0].kind, TokenKind::Ident);
    assert_eq!(tokens[0].value, TokenValue::Str("_x1".to_string()));
}

#[test]
fn keywords_lex_to_keyword_kinds() {
    assert_eq!(
        lex("func print println loop if else return var null break"),
        vec![
            TokenKind::Func,
            TokenKind::Print,
            TokenKind::Println,
            TokenKind::Loop,
            TokenKind::If,
            TokenKind::Else,
            TokenKind::Return,
            TokenKind::Var,
            TokenKind::Null,
            TokenKind::Break,
        ]
    );
}

#[test]
fn keyword_prefix_is_still_ident() {
    assert_eq!(lex("iffy"), vec![TokenKind::Ident]);
    assert_eq!(lex("looper"), vec![TokenKind::Ident]);
}

// ---------------------------------------------------------------------------
// Operators and punctuation
// ---------------------------------------------------------------------------

#[test]
fn single_char_operators() {
    assert_eq!(
        lex("+ - * / % = < > !"),
        vec![
            TokenKind::Plus,
            TokenKind::Minus,
            TokenKind::Star,
            TokenKind::Slash,
            TokenKind::Percent,
            TokenKind::Assign,
            TokenKind::Lt,
            TokenKind::Gt,
            TokenKind::Bang,
        ]
    );
}

#[test]
fn two_char_operators() {
    assert_eq!(
        lex("== != <= >= && ||"),
        vec![
            TokenKind::Eq,
            TokenKind::Neq,
            TokenKind::Lte,
            TokenKind::Gte,
            TokenKind::And,
            TokenKind::Or,
        ]
    );
}

#[test]
fn two_char_operators_without_spaces() {
    // ==== is two EQUALS tokens, not ASSIGN noise.
    assert_eq!(lex("===="), vec![TokenKind::Eq, TokenKind::Eq]);
    assert_eq!(lex("<=="), vec![TokenKind::Lte, TokenKind::Assign]);
}

#[test]
fn punctuation() {
    assert_eq!(
        lex("( ) { } [ ] , ; ."),
        vec![
            TokenKind::LParen,
            TokenKind::RParen,
            TokenKind::LBrace,
            TokenKind::RBrace,
            TokenKind::LBracket,
            TokenKind::RBracket,
            TokenKind::Comma,
            TokenKind::Semicolon,
            TokenKind::Dot,
        ]
    );
}

#[test]
fn lone_ampersand_is_error_token() {
    let tokens = lex_tokens("&");
    assert_eq!(tokens[0].kind, TokenKind::Error);
    assert_eq!(tokens[0].lexeme, "Expected '&' after '&'");
}

#[test]
fn lone_pipe_is_error_token() {
    let tokens = lex_tokens("|");
    assert_eq!(tokens[0].kind, TokenKind::Error);
    assert_eq!(tokens[0].lexeme, "Expected '|' after '|'");
}

#[test]
fn unexpected_character_is_error_token() {
    let tokens = lex_tokens("#");
    assert_eq!(tokens[0].kind, TokenKind::Error);
}

#[test]
fn unterminated_string_is_error_token() {
    let tokens = lex_tokens("\"hello");
    assert_eq!(tokens[0].kind, TokenKind::Error);
    assert_eq!(tokens[0].lexeme, "Unterminated string");
}

#[test]
fn error_tokens_do_not_stop_the_scan() {
    // Lexing never fails; the bad byte becomes a token and scanning goes on.
    assert_eq!(
        lex("1 # 2"),
        vec![TokenKind::Number, TokenKind::Error, TokenKind::Number]
    );
}

// ---------------------------------------------------------------------------
// Whitespace and comments
// ---------------------------------------------------------------------------

#[test]
fn line_comment_is_skipped() {
    assert_eq!(lex("// a comment\n42"), vec![TokenKind::Number]);
}

#[test]
fn trailing_comment_is_skipped() {
    assert_eq!(lex("42 // trailing"), vec![TokenKind::Number]);
}

#[test]
fn slash_alone_is_divide() {
    assert_eq!(lex("4 / 2"), vec![TokenKind::Number, TokenKind::Slash, TokenKind::Number]);
}

#[test]
fn empty_source_is_just_eof() {
    let tokens = lex_tokens("");
    assert_eq!(tokens.len(), 1);
    assert_eq!(tokens[0].kind, TokenKind::Eof);
}

// ---------------------------------------------------------------------------
// Positions
// ---------------------------------------------------------------------------

#[test]
fn positions_are_one_based() {
    let tokens = lex_tokens("var x");
    assert_eq!((tokens[0].line, tokens[0].col), (1, 1));
    assert_eq!((tokens[1].line, tokens[1].col), (1, 5));
}

#[test]
fn newline_advances_line_and_resets_column() {
    let tokens = lex_tokens("a\nbb\n  c");
    assert_eq!((tokens[0].line, tokens[0].col), (1, 1));
    assert_eq!((tokens[1].line, tokens[1].col), (2, 1));
    assert_eq!((tokens[2].line, tokens[2].col), (3, 3));
}

// ---------------------------------------------------------------------------
// Contextual rewrite: loop(
// ---------------------------------------------------------------------------

#[test]
fn loop_followed_by_paren_emits_loop_then_lparen() {
    assert_eq!(lex("loop("), vec![TokenKind::Loop, TokenKind::LParen]);
}

#[test]
fn loop_with_space_before_paren_is_identical() {
    assert_eq!(lex("loop ("), vec![TokenKind::Loop, TokenKind::LParen]);
}

#[test]
fn loop_rewrite_inside_full_statement() {
    assert_eq!(
        lex("loop(x) { }"),
        vec![
            TokenKind::Loop,
            TokenKind::LParen,
            TokenKind::Ident,
            TokenKind::RParen,
            TokenKind::LBrace,
            TokenKind::RBrace,
        ]
    );
}

#[test]
fn loop_without_paren_is_plain_keyword() {
    assert_eq!(lex("loop { }"), vec![TokenKind::Loop, TokenKind::LBrace, TokenKind::RBrace]);
}

// ---------------------------------------------------------------------------
// Round-trip law
// ---------------------------------------------------------------------------

#[test]
fn relexing_joined_lexemes_preserves_token_kinds() {
    // String literals excluded: their lexemes drop the quotes.
    let src = "var x = 1 + 2 * 3; if (x >= 7) { println(x); } loop(x) { break; }";
    let first = lex(src);
    let joined = lex_tokens(src)
        .iter()
        .filter(|t| t.kind != TokenKind::Eof)
        .map(|t| t.lexeme.clone())
        .collect::<Vec<_>>()
        .join(" ");
    assert_eq!(lex(&joined), first);
}

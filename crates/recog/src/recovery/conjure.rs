//! Placeholder tokens standing in for input that recovery decided was missing.
//!
//! A conjured token has no backing input: its stream index and both char
//! offsets are `-1`. It is positioned at the current token, or at the
//! previous one when the current token is EOF, so that diagnostics and actions
//! reading its line and column point somewhere useful.

use crate::atn::IntervalSet;
use crate::grammar::Vocabulary;
use crate::lexer::{EOF, Token, TokenType};

/// Text of a conjured token of type `t`: `<missing 'b'>`, `<missing ID>`.
#[must_use]
pub fn missing_text(t: TokenType, vocabulary: &Vocabulary) -> String {
    if t == EOF {
        "<missing EOF>".to_string()
    } else {
        format!("<missing {}>", vocabulary.display_name(t))
    }
}

/// Conjure a token for the lowest type in `expected`.
///
/// `current` is the token recovery stopped at and `previous` the last token
/// before it, if any.
#[must_use]
pub fn conjure(
    expected: &IntervalSet,
    vocabulary: &Vocabulary,
    current: &Token,
    previous: Option<&Token>,
) -> Token {
    let token_type = expected.min_element().unwrap_or(EOF);
    let anchor = match previous {
        Some(prev) if current.is_eof() => prev,
        _ => current,
    };
    Token::new(
        token_type,
        missing_text(token_type, vocabulary),
        -1,
        -1,
        anchor.line,
        anchor.column,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vocab() -> Vocabulary {
        let mut v = Vocabulary::new();
        v.define_literal("a");
        v.define_literal("b");
        v.define_literal("c");
        v.define_name("ID");
        v
    }

    #[test]
    fn test_lowest_expected_type_wins() {
        let v = vocab();
        let expected: IntervalSet = [3, 2].into_iter().collect();
        let current = Token::new(4, "x", 1, 1, 1, 1).with_index(1);
        let tok = conjure(&expected, &v, &current, None);
        assert_eq!(tok.token_type, 2);
        assert_eq!(tok.text, "<missing 'b'>");
        assert!(tok.is_missing());
        assert_eq!(tok.to_string(), "[@-1,-1:-1='<missing 'b'>',<2>,1:1]");
    }

    #[test]
    fn test_positioned_at_previous_token_at_eof() {
        let v = vocab();
        let current = Token::eof(5, 2, 0).with_index(3);
        let previous = Token::new(1, "a", 3, 3, 1, 7).with_index(2);
        let tok = conjure(&IntervalSet::of(4), &v, &current, Some(&previous));
        assert_eq!(tok.text, "<missing ID>");
        assert_eq!((tok.line, tok.column), (1, 7));
    }

    #[test]
    fn test_missing_eof_text() {
        assert_eq!(missing_text(EOF, &vocab()), "<missing EOF>");
    }
}

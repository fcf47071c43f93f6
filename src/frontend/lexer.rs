//! Token enum for the reference tensor-notation grammar (spec.md §6:
//! "accepts `A(i,j) = B(i,k)*C(k,j)` style input"). Grounded on the teacher
//! `compiler/src/parser/lexer.rs`'s `logos`-derived token shape.

use logos::Logos;

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\n\f]+")]
pub enum Token {
    #[regex(r"[A-Za-z][A-Za-z0-9_]*", |lex| lex.slice().to_string())]
    Ident(String),

    #[regex(r"[0-9]+\.[0-9]+", |lex| lex.slice().parse().ok())]
    Float(f64),

    #[regex(r"[0-9]+", |lex| lex.slice().parse().ok())]
    Int(i64),

    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token(",")]
    Comma,

    #[token("+=")]
    PlusEq,
    #[token("*=")]
    StarEq,

    #[token("=")]
    Eq,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lexes_an_einsum_assignment() {
        let tokens: Vec<Token> = Token::lexer("A(i,j) = B(i,k)*C(k,j)")
            .filter_map(|t| t.ok())
            .collect();
        assert_eq!(
            tokens,
            vec![
                Token::Ident("A".into()),
                Token::LParen,
                Token::Ident("i".into()),
                Token::Comma,
                Token::Ident("j".into()),
                Token::RParen,
                Token::Eq,
                Token::Ident("B".into()),
                Token::LParen,
                Token::Ident("i".into()),
                Token::Comma,
                Token::Ident("k".into()),
                Token::RParen,
                Token::Star,
                Token::Ident("C".into()),
                Token::LParen,
                Token::Ident("k".into()),
                Token::Comma,
                Token::Ident("j".into()),
                Token::RParen,
            ]
        );
    }

    #[test]
    fn lexes_compound_assignment_and_float() {
        let tokens: Vec<Token> = Token::lexer("A(i) += 0.5").filter_map(|t| t.ok()).collect();
        assert_eq!(
            tokens,
            vec![Token::Ident("A".into()), Token::LParen, Token::Ident("i".into()), Token::RParen, Token::PlusEq, Token::Float(0.5)]
        );
    }
}

use crate::error::ParseError;
use nom::branch::alt;
use nom::bytes::complete::{tag, tag_no_case};
use nom::character::complete::{alpha1, alphanumeric1, digit0, digit1, hex_digit1, multispace1, one_of};
use nom::combinator::{opt, recognize};
use nom::multi::many0_count;
use nom::sequence::{pair, tuple};
use nom::IResult;
use nom_locate::LocatedSpan;

pub(crate) type Span<'a> = LocatedSpan<&'a str>;

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum TokenKind<'a> {
    Ident(&'a str),
    Int(i64),
    Float(f64),
    Punct(&'a str),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Token<'a> {
    pub kind: TokenKind<'a>,
    pub row: u32,
    pub col: usize,
}

impl<'a> Token<'a> {
    pub fn ident(&self) -> Option<&'a str> {
        match self.kind {
            TokenKind::Ident(ident) => Some(ident),
            _ => None,
        }
    }

    pub fn is_punct(&self, punct: &str) -> bool {
        matches!(self.kind, TokenKind::Punct(p) if p == punct)
    }

    pub fn is_ident(&self, ident: &str) -> bool {
        matches!(self.kind, TokenKind::Ident(i) if i == ident)
    }
}

// Longest operators first.
const PUNCTUATION: [&str; 46] = [
    "<<=", ">>=", "++", "--", "<=", ">=", "==", "!=", "&&", "||", "^^", "+=", "-=", "*=", "/=",
    "%=", "&=", "^=", "|=", "<<", ">>", "{", "}", "[", "]", "(", ")", ";", ",", ".", "=", "+",
    "-", "*", "/", "%", "<", ">", "!", "~", "?", ":", "&", "|", "^", "#",
];

fn whitespace(input: Span) -> IResult<Span, Span> {
    multispace1(input)
}

fn identifier(input: Span) -> IResult<Span, Span> {
    recognize(pair(
        alt((alpha1, tag("_"))),
        many0_count(alt((alphanumeric1, tag("_")))),
    ))(input)
}

fn hex_literal(input: Span) -> IResult<Span, Span> {
    recognize(tuple((tag_no_case("0x"), hex_digit1, opt(one_of("uU")))))(input)
}

fn decimal_literal(input: Span) -> IResult<Span, Span> {
    recognize(tuple((
        alt((
            recognize(pair(digit1, opt(pair(tag("."), digit0)))),
            recognize(pair(tag("."), digit1)),
        )),
        opt(tuple((one_of("eE"), opt(one_of("+-")), digit1))),
        opt(alt((tag_no_case("lf"), recognize(one_of("uUfF"))))),
    )))(input)
}

fn punctuation(input: Span) -> IResult<Span, Span> {
    for punct in PUNCTUATION {
        if let Ok(result) = tag::<_, _, nom::error::Error<Span>>(punct)(input) {
            return Ok(result);
        }
    }
    Err(nom::Err::Error(nom::error::Error::new(
        input,
        nom::error::ErrorKind::OneOf,
    )))
}

fn number_kind(literal: &str) -> Option<TokenKind> {
    if let Some(hex) = literal
        .strip_prefix("0x")
        .or_else(|| literal.strip_prefix("0X"))
    {
        let hex = hex.trim_end_matches(['u', 'U']);
        return i64::from_str_radix(hex, 16).ok().map(TokenKind::Int);
    }

    let is_float = literal.contains(['.', 'e', 'E', 'f', 'F']);
    let digits = literal.trim_end_matches(['u', 'U', 'f', 'F', 'l', 'L']);
    if is_float {
        digits.parse().ok().map(TokenKind::Float)
    } else if digits.len() > 1 && digits.starts_with('0') {
        i64::from_str_radix(digits, 8).ok().map(TokenKind::Int)
    } else {
        digits.parse().ok().map(TokenKind::Int)
    }
}

fn lexer_error(span: Span) -> ParseError {
    ParseError::LexerError {
        offset: span.location_offset(),
        row: span.location_line(),
        col: span.get_column(),
    }
}

pub(crate) fn do_lex(input: &str) -> Result<Vec<Token>, ParseError> {
    let mut span = Span::new(input);
    let mut tokens = Vec::new();

    while !span.is_empty() {
        if let Ok((rest, _)) = whitespace(span) {
            span = rest;
            continue;
        }

        let (row, col) = (span.location_line(), span.get_column());
        let (rest, kind) = if let Ok((rest, ident)) = identifier(span) {
            (rest, TokenKind::Ident(*ident.fragment()))
        } else if let Ok((rest, literal)) = alt((hex_literal, decimal_literal))(span) {
            let kind = number_kind(*literal.fragment()).ok_or_else(|| lexer_error(span))?;
            (rest, kind)
        } else if let Ok((rest, punct)) = punctuation(span) {
            (rest, TokenKind::Punct(*punct.fragment()))
        } else {
            return Err(lexer_error(span));
        };

        tokens.push(Token { kind, row, col });
        span = rest;
    }

    Ok(tokens)
}

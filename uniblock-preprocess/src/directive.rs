use nom::branch::alt;
use nom::bytes::complete::{tag, take_while};
use nom::character::complete::{alpha1, alphanumeric1, char, space0};
use nom::combinator::{opt, recognize, rest};
use nom::multi::{many0_count, separated_list0};
use nom::sequence::{delimited, pair, preceded};
use nom::IResult;

/// A single preprocessor directive line.
#[derive(Debug, Eq, PartialEq)]
pub(crate) enum Directive<'a> {
    Version(&'a str),
    Extension(&'a str),
    Pragma(&'a str),
    Line,
    Define {
        name: &'a str,
        params: Option<Vec<&'a str>>,
        body: &'a str,
    },
    Undef(&'a str),
    Ifdef(&'a str),
    Ifndef(&'a str),
    If(&'a str),
    Elif(&'a str),
    Else,
    Endif,
    Error(&'a str),
    Include(&'a str),
    Null,
    Unknown(&'a str),
}

impl Directive<'_> {
    pub(crate) fn is_conditional(&self) -> bool {
        matches!(
            self,
            Directive::Ifdef(_)
                | Directive::Ifndef(_)
                | Directive::If(_)
                | Directive::Elif(_)
                | Directive::Else
                | Directive::Endif
        )
    }
}

pub(crate) fn identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        alt((alpha1, tag("_"))),
        many0_count(alt((alphanumeric1, tag("_")))),
    ))(input)
}

fn parameter_list(input: &str) -> IResult<&str, Vec<&str>> {
    delimited(
        char('('),
        delimited(
            space0,
            separated_list0(delimited(space0, char(','), space0), identifier),
            space0,
        ),
        char(')'),
    )(input)
}

fn define_body(input: &str) -> IResult<&str, Directive> {
    let (input, name) = preceded(space0, identifier)(input)?;
    // A parameter list must follow the name without whitespace.
    let (input, params) = opt(parameter_list)(input)?;
    let (input, body) = rest(input)?;
    Ok((
        input,
        Directive::Define {
            name,
            params,
            body: body.trim(),
        },
    ))
}

fn directive_name(input: &str) -> IResult<&str, &str> {
    let (input, _) = preceded(space0, char('#'))(input)?;
    let (input, _) = space0(input)?;
    take_while(|c: char| c.is_ascii_alphanumeric() || c == '_')(input)
}

/// Parse a line as a directive.
///
/// Returns `None` if the line is not a directive, and `Some(Err(line))` if the directive
/// is recognised but malformed.
pub(crate) fn parse_directive(line: &str) -> Option<Result<Directive, &str>> {
    let Ok((args, name)) = directive_name(line) else {
        return None;
    };
    let trimmed = args.trim();

    let directive = match name {
        "" if trimmed.is_empty() => Ok(Directive::Null),
        "version" => Ok(Directive::Version(trimmed)),
        "extension" => Ok(Directive::Extension(trimmed)),
        "pragma" => Ok(Directive::Pragma(trimmed)),
        "line" => Ok(Directive::Line),
        "define" => define_body(args).map(|(_, d)| d).map_err(|_| line),
        "undef" => single_identifier(args).map(Directive::Undef).ok_or(line),
        "ifdef" => single_identifier(args).map(Directive::Ifdef).ok_or(line),
        "ifndef" => single_identifier(args).map(Directive::Ifndef).ok_or(line),
        "if" if !trimmed.is_empty() => Ok(Directive::If(trimmed)),
        "elif" if !trimmed.is_empty() => Ok(Directive::Elif(trimmed)),
        "else" => Ok(Directive::Else),
        "endif" => Ok(Directive::Endif),
        "error" => Ok(Directive::Error(trimmed)),
        "include" => Ok(Directive::Include(trimmed)),
        "if" | "elif" => Err(line),
        other => Ok(Directive::Unknown(other)),
    };
    Some(directive)
}

fn single_identifier(input: &str) -> Option<&str> {
    match preceded(space0, identifier)(input) {
        Ok((_, ident)) => Some(ident),
        Err(_) => None,
    }
}

#[cfg(test)]
mod test {
    use crate::directive::{parse_directive, Directive};

    #[test]
    fn parses_object_define() {
        assert_eq!(
            parse_directive("#define NUM_LIGHTS 4").unwrap().unwrap(),
            Directive::Define {
                name: "NUM_LIGHTS",
                params: None,
                body: "4"
            }
        );
    }

    #[test]
    fn parses_function_define() {
        assert_eq!(
            parse_directive("  #  define SQR(a, b) ((a) * (b))")
                .unwrap()
                .unwrap(),
            Directive::Define {
                name: "SQR",
                params: Some(vec!["a", "b"]),
                body: "((a) * (b))"
            }
        );
    }

    #[test]
    fn spaced_paren_is_object_like() {
        assert_eq!(
            parse_directive("#define X (1 + 2)").unwrap().unwrap(),
            Directive::Define {
                name: "X",
                params: None,
                body: "(1 + 2)"
            }
        );
    }

    #[test]
    fn non_directives_are_ignored() {
        assert!(parse_directive("uniform float a;").is_none());
        assert_eq!(parse_directive("#").unwrap().unwrap(), Directive::Null);
        assert!(parse_directive("#ifdef").unwrap().is_err());
        assert!(parse_directive("#if").unwrap().is_err());
    }
}

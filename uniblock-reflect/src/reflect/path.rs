use nom::branch::alt;
use nom::bytes::complete::tag;
use nom::character::complete::{alpha1, alphanumeric1, char, digit1};
use nom::combinator::{all_consuming, map, map_res, opt, recognize};
use nom::multi::{many0_count, separated_list1};
use nom::sequence::{delimited, pair};
use nom::IResult;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// One segment of a uniform path: an identifier with an optional array index.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct PathSegment {
    pub name: String,
    pub index: Option<u32>,
}

/// A parsed dotted and bracketed uniform name, such as `uBlock.shapes[2].color`.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct UniformPath {
    segments: Vec<PathSegment>,
}

/// The error returned when a uniform name is not a valid path.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct InvalidPath(pub String);

fn identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        alt((alpha1, tag("_"))),
        many0_count(alt((alphanumeric1, tag("_")))),
    ))(input)
}

fn segment(input: &str) -> IResult<&str, PathSegment> {
    map(
        pair(
            identifier,
            opt(delimited(char('['), map_res(digit1, u32::from_str), char(']'))),
        ),
        |(name, index)| PathSegment {
            name: name.to_string(),
            index,
        },
    )(input)
}

impl FromStr for UniformPath {
    type Err = InvalidPath;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match all_consuming(separated_list1(char('.'), segment))(name) {
            Ok((_, segments)) => Ok(UniformPath { segments }),
            Err(_) => Err(InvalidPath(name.to_string())),
        }
    }
}

impl UniformPath {
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// The first segment.
    pub fn root(&self) -> &PathSegment {
        // separated_list1 never yields an empty list.
        &self.segments[0]
    }

    /// The last segment.
    pub fn leaf(&self) -> &PathSegment {
        &self.segments[self.segments.len() - 1]
    }

    /// The path with the index of the last segment removed, the name used to address
    /// a whole array of primitives.
    pub fn without_leaf_index(&self) -> UniformPath {
        let mut path = self.clone();
        if let Some(last) = path.segments.last_mut() {
            last.index = None;
        }
        path
    }
}

impl Display for PathSegment {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)?;
        if let Some(index) = self.index {
            write!(f, "[{index}]")?;
        }
        Ok(())
    }
}

impl Display for UniformPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            Display::fmt(segment, f)?;
        }
        Ok(())
    }
}

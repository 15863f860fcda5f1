use nom::IResult;
use nom::Parser;
use nom::bytes::complete::{tag, take_until, take_while_m_n};
use nom::sequence::delimited;

/// Matches `{{...}}` and returns whatever sits between the braces, up to the
/// first `}}`. Used by the compiler, where a placeholder is any literal
/// `{{name}}` token, not only a well-formed identifier.
pub fn parse_placeholder(input: &str) -> IResult<&str, &str> {
    delimited(tag("{{"), take_until("}}"), tag("}}")).parse(input)
}

/// Matches `{{identifier}}`.
pub fn parse_named_placeholder(input: &str) -> IResult<&str, &str> {
    delimited(tag("{{"), identifier, tag("}}")).parse(input)
}

fn identifier(input: &str) -> IResult<&str, &str> {
    // Limit identifiers to 1-64 characters with alphanumeric, dash, underscore
    take_while_m_n(1, 64, |c: char| c.is_alphanumeric() || c == '-' || c == '_').parse(input)
}

/// Names of all `{{identifier}}` placeholders in `template`, in order of
/// appearance, without duplicates.
pub fn placeholder_names(template: &str) -> Vec<&str> {
    let mut names: Vec<&str> = Vec::new();
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        rest = &rest[start..];
        match parse_named_placeholder(rest) {
            Ok((remaining, name)) => {
                if !names.contains(&name) {
                    names.push(name);
                }
                rest = remaining;
            }
            Err(_) => rest = &rest[1..],
        }
    }

    names
}

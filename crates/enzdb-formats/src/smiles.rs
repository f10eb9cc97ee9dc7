//! SMILES syntax validation.
//!
//! A structural check of the SMILES grammar: atoms from the organic subset,
//! bracket atoms, bonds, branches, ring-closure labels and dot-separated
//! components. Ring-closure labels must pair up. Valence is not checked.

use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::{char, digit1, one_of, satisfy},
    combinator::{all_consuming, opt, recognize, value},
    multi::many0,
    sequence::{delimited, pair, preceded, tuple},
    IResult,
};

/// True when `smiles` parses as a syntactically valid SMILES string.
pub fn is_valid_smiles(smiles: &str) -> bool {
    !smiles.is_empty() && all_consuming(chain)(smiles).is_ok() && ring_labels_pair_up(smiles)
}

fn chain(input: &str) -> IResult<&str, ()> {
    let (input, _) = atom(input)?;
    let (input, _) = many0(chain_unit)(input)?;
    Ok((input, ()))
}

fn chain_unit(input: &str) -> IResult<&str, ()> {
    alt((
        value((), preceded(opt(bond), ring_closure)),
        value((), delimited(char('('), preceded(opt(bond), chain), char(')'))),
        value((), preceded(opt(bond), atom)),
        value((), preceded(char('.'), chain)),
    ))(input)
}

fn atom(input: &str) -> IResult<&str, &str> {
    alt((bracket_atom, organic_atom))(input)
}

/// Atoms writable without brackets, aromatic forms included.
fn organic_atom(input: &str) -> IResult<&str, &str> {
    alt((
        tag("Br"),
        tag("Cl"),
        tag("B"),
        tag("C"),
        tag("N"),
        tag("O"),
        tag("P"),
        tag("S"),
        tag("F"),
        tag("I"),
        tag("b"),
        tag("c"),
        tag("n"),
        tag("o"),
        tag("p"),
        tag("s"),
        tag("*"),
    ))(input)
}

fn bracket_atom(input: &str) -> IResult<&str, &str> {
    recognize(delimited(char('['), bracket_body, char(']')))(input)
}

fn bracket_body(input: &str) -> IResult<&str, ()> {
    value(
        (),
        tuple((
            opt(digit1),
            bracket_symbol,
            opt(chirality),
            opt(hydrogen_count),
            opt(charge),
            opt(atom_class),
        )),
    )(input)
}

fn bracket_symbol(input: &str) -> IResult<&str, &str> {
    alt((
        recognize(pair(
            satisfy(|c| c.is_ascii_uppercase()),
            opt(satisfy(|c| c.is_ascii_lowercase())),
        )),
        recognize(one_of("bcnops")),
        tag("*"),
    ))(input)
}

fn chirality(input: &str) -> IResult<&str, &str> {
    recognize(pair(char('@'), opt(char('@'))))(input)
}

fn hydrogen_count(input: &str) -> IResult<&str, &str> {
    recognize(pair(char('H'), opt(digit1)))(input)
}

fn charge(input: &str) -> IResult<&str, &str> {
    alt((
        recognize(pair(char('+'), opt(alt((digit1, recognize(char('+'))))))),
        recognize(pair(char('-'), opt(alt((digit1, recognize(char('-'))))))),
    ))(input)
}

fn atom_class(input: &str) -> IResult<&str, &str> {
    recognize(pair(char(':'), digit1))(input)
}

fn bond(input: &str) -> IResult<&str, char> {
    one_of("-=#$:/\\")(input)
}

fn ring_closure(input: &str) -> IResult<&str, &str> {
    alt((
        recognize(tuple((
            char('%'),
            satisfy(|c| c.is_ascii_digit()),
            satisfy(|c| c.is_ascii_digit()),
        ))),
        recognize(satisfy(|c| c.is_ascii_digit())),
    ))(input)
}

/// Every ring-closure label outside brackets must appear an even number of
/// times, otherwise a ring was opened and never closed.
fn ring_labels_pair_up(smiles: &str) -> bool {
    let mut counts = [0usize; 100];
    let mut chars = smiles.chars();
    let mut in_bracket = false;
    while let Some(c) = chars.next() {
        match c {
            '[' => in_bracket = true,
            ']' => in_bracket = false,
            '%' if !in_bracket => {
                let tens = chars.next().and_then(|d| d.to_digit(10));
                let ones = chars.next().and_then(|d| d.to_digit(10));
                if let (Some(tens), Some(ones)) = (tens, ones) {
                    counts[(tens * 10 + ones) as usize] += 1;
                }
            }
            _ if !in_bracket => {
                if let Some(label) = c.to_digit(10) {
                    counts[label as usize] += 1;
                }
            }
            _ => {}
        }
    }
    counts.iter().all(|&n| n % 2 == 0)
}

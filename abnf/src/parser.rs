//! RFC 5234 section 4 grammar, written with nom.
//!
//! Line endings may be CRLF or a bare LF.

use std::borrow::Cow;
use std::num::ParseIntError;

use nom::{
    branch::alt,
    bytes::complete::{tag, tag_no_case, take_while, take_while1, take_while_m_n},
    character::complete::{char, digit0, line_ending},
    combinator::{map, map_res, opt, recognize, value},
    error::ErrorKind,
    multi::{many0, many1, separated_list1},
    sequence::{delimited, pair, tuple},
    IResult,
};

use crate::{
    Alternation, Base, Concatenation, DefinedAs, Element, NumVal, Repeat, Repetition, Rule,
    RuleName,
};

/// Rules end in a newline, make sure the last one has one.
pub fn terminate_line(s: &str) -> Cow<'_, str> {
    if s.ends_with('\n') {
        Cow::Borrowed(s)
    } else {
        Cow::Owned(format!("{}\n", s))
    }
}

pub fn rulelist(input: &str) -> IResult<&str, Vec<Rule>> {
    let (rem, rules) = many1(alt((
        map(rule, Some),
        value(None, pair(many0(c_wsp), c_nl)),
    )))(input)?;
    Ok((rem, rules.into_iter().flatten().collect()))
}

pub fn rule(input: &str) -> IResult<&str, Rule> {
    let (rem, (name, defined_as, body, _, _)) =
        tuple((rulename, defined_as, alternation, many0(c_wsp), c_nl))(input)?;
    Ok((
        rem,
        Rule {
            name,
            defined_as,
            body,
        },
    ))
}

pub fn rulename(input: &str) -> IResult<&str, RuleName> {
    let (rem, matched) = recognize(pair(
        take_while_m_n(1, 1, |c: char| c.is_ascii_alphabetic()),
        take_while(|c: char| c.is_ascii_alphanumeric() || c == '-'),
    ))(input)?;
    Ok((rem, RuleName(matched.to_owned())))
}

fn defined_as(input: &str) -> IResult<&str, DefinedAs> {
    delimited(
        many0(c_wsp),
        alt((
            value(DefinedAs::Incremental, tag("=/")),
            value(DefinedAs::Fresh, tag("=")),
        )),
        many0(c_wsp),
    )(input)
}

fn wsp(input: &str) -> IResult<&str, char> {
    alt((char(' '), char('\t')))(input)
}

fn c_wsp(input: &str) -> IResult<&str, ()> {
    alt((value((), wsp), value((), pair(c_nl, wsp))))(input)
}

fn c_nl(input: &str) -> IResult<&str, &str> {
    alt((comment, line_ending))(input)
}

fn comment(input: &str) -> IResult<&str, &str> {
    recognize(tuple((
        char(';'),
        take_while(|c: char| c != '\r' && c != '\n'),
        line_ending,
    )))(input)
}

pub fn alternation(input: &str) -> IResult<&str, Alternation> {
    map_res(
        separated_list1(tuple((many0(c_wsp), char('/'), many0(c_wsp))), concatenation),
        Alternation::new,
    )(input)
}

fn concatenation(input: &str) -> IResult<&str, Concatenation> {
    map_res(separated_list1(many1(c_wsp), repetition), Concatenation::new)(input)
}

fn repetition(input: &str) -> IResult<&str, Repetition> {
    let (rem, (repeat, element)) = pair(opt(repeat), element)(input)?;
    Ok((rem, Repetition { repeat, element }))
}

fn repeat(input: &str) -> IResult<&str, Repeat> {
    let fail = |kind: ErrorKind| nom::Err::Failure(nom::error::Error::new(input, kind));

    let (rem, min) = digit0(input)?;
    match rem.strip_prefix('*') {
        Some(after_star) => {
            let (rem, max) = digit0(after_star)?;
            let repeat = match (bound(min), bound(max)) {
                (Ok(min), Ok(max)) => Repeat::range(min, max).ok(),
                _ => None,
            };
            match repeat {
                Some(repeat) => Ok((rem, repeat)),
                None => Err(fail(ErrorKind::MapRes)),
            }
        }
        None if !min.is_empty() => match min.parse() {
            Ok(n) => Ok((rem, Repeat::Exact(n))),
            Err(_) => Err(fail(ErrorKind::MapRes)),
        },
        None => Err(nom::Err::Error(nom::error::Error::new(
            input,
            ErrorKind::Digit,
        ))),
    }
}

fn bound(digits: &str) -> Result<Option<u32>, ParseIntError> {
    if digits.is_empty() {
        return Ok(None);
    }
    digits.parse().map(Some)
}

pub fn element(input: &str) -> IResult<&str, Element> {
    alt((
        map(rulename, Element::Rulename),
        map(group, Element::Group),
        map(option, Element::Option),
        map(char_val, Element::CharVal),
        map(num_val, Element::NumVal),
        map(prose_val, Element::ProseVal),
    ))(input)
}

fn group(input: &str) -> IResult<&str, Alternation> {
    delimited(
        pair(char('('), many0(c_wsp)),
        alternation,
        pair(many0(c_wsp), char(')')),
    )(input)
}

fn option(input: &str) -> IResult<&str, Alternation> {
    delimited(
        pair(char('['), many0(c_wsp)),
        alternation,
        pair(many0(c_wsp), char(']')),
    )(input)
}

fn char_val(input: &str) -> IResult<&str, String> {
    let (rem, matched) = delimited(
        char('"'),
        take_while(|c: char| c == ' ' || c == '!' || ('#'..='~').contains(&c)),
        char('"'),
    )(input)?;
    Ok((rem, matched.to_owned()))
}

fn prose_val(input: &str) -> IResult<&str, String> {
    let (rem, matched) = delimited(
        char('<'),
        take_while(|c: char| (' '..='=').contains(&c) || ('?'..='~').contains(&c)),
        char('>'),
    )(input)?;
    Ok((rem, matched.to_owned()))
}

pub fn num_val(input: &str) -> IResult<&str, NumVal> {
    let (rem, _) = char('%')(input)?;
    let (rem, base) = alt((
        value(Base::Bin, tag_no_case("b")),
        value(Base::Dec, tag_no_case("d")),
        value(Base::Hex, tag_no_case("x")),
    ))(rem)?;
    num_spec(base, rem)
}

fn num_digits(base: Base, input: &str) -> IResult<&str, &str> {
    take_while1(move |c: char| c.is_digit(base.radix()))(input)
}

/// Values that don't fit or ranges that run backwards are hard failures, no
/// other element could match them.
fn num_value(base: Base, input: &str) -> IResult<&str, u32> {
    let (rem, digits) = num_digits(base, input)?;
    match u32::from_str_radix(digits, base.radix()) {
        Ok(v) => Ok((rem, v)),
        Err(_) => Err(nom::Err::Failure(nom::error::Error::new(
            input,
            ErrorKind::MapRes,
        ))),
    }
}

fn num_spec(base: Base, input: &str) -> IResult<&str, NumVal> {
    let (mut rem, first) = num_value(base, input)?;

    if let Some(after_dash) = rem.strip_prefix('-') {
        let (rem, hi) = num_value(base, after_dash)?;
        return match NumVal::range(base, first, hi) {
            Ok(num) => Ok((rem, num)),
            Err(_) => Err(nom::Err::Failure(nom::error::Error::new(
                input,
                ErrorKind::MapRes,
            ))),
        };
    }

    let mut values = vec![first];
    while let Some(after_dot) = rem.strip_prefix('.') {
        let (after, v) = num_value(base, after_dot)?;
        values.push(v);
        rem = after;
    }

    if values.len() == 1 {
        Ok((rem, NumVal::single(base, first)))
    } else {
        Ok((
            rem,
            NumVal {
                base,
                spec: crate::NumSpec::Concat(values),
            },
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NumSpec;
    use std::fmt::Debug;

    struct TestCase<T> {
        input: &'static str,
        // Some is the expected value and remaining input, None indicates an
        // error.
        out: Option<(&'static str, T)>,
    }

    fn assert_test_cases<T, F>(f: F, tests: Vec<TestCase<T>>)
    where
        T: Debug + Eq,
        F: Fn(&'static str) -> IResult<&'static str, T>,
    {
        for t in tests {
            let res = f(t.input);
            match t.out {
                Some((rem, out)) => assert_eq!(res, Ok((rem, out)), "input: {:?}", t.input),
                None => assert!(res.is_err(), "expected error: {:?}", res),
            }
        }
    }

    fn name(s: &str) -> RuleName {
        RuleName::new(s).unwrap()
    }

    fn single(element: Element) -> Alternation {
        Alternation::from(Concatenation::from(Repetition::from(element)))
    }

    #[test]
    fn parse_rulename() {
        let tests = vec![
            TestCase {
                input: "c-wsp rest",
                out: Some((" rest", name("c-wsp"))),
            },
            TestCase {
                input: "ALPHA2=",
                out: Some(("=", name("ALPHA2"))),
            },
            TestCase {
                input: "2abc",
                out: None,
            },
            TestCase {
                input: "-abc",
                out: None,
            },
        ];

        assert_test_cases(rulename, tests);
    }

    #[test]
    fn parse_repeat() {
        let tests = vec![
            TestCase {
                input: "*x",
                out: Some(("x", Repeat::Range { min: None, max: None })),
            },
            TestCase {
                input: "1*x",
                out: Some((
                    "x",
                    Repeat::Range {
                        min: Some(1),
                        max: None,
                    },
                )),
            },
            TestCase {
                input: "2*3x",
                out: Some((
                    "x",
                    Repeat::Range {
                        min: Some(2),
                        max: Some(3),
                    },
                )),
            },
            TestCase {
                input: "*1x",
                out: Some((
                    "x",
                    Repeat::Range {
                        min: None,
                        max: Some(1),
                    },
                )),
            },
            TestCase {
                input: "4x",
                out: Some(("x", Repeat::Exact(4))),
            },
            TestCase {
                input: "3*2x",
                out: None,
            },
            TestCase {
                input: "x",
                out: None,
            },
        ];

        assert_test_cases(repeat, tests);
    }

    #[test]
    fn parse_num_val() {
        let tests = vec![
            TestCase {
                input: "%x41",
                out: Some(("", NumVal::single(Base::Hex, 0x41))),
            },
            TestCase {
                input: "%X41-5a rest",
                out: Some((
                    " rest",
                    NumVal {
                        base: Base::Hex,
                        spec: NumSpec::Range(0x41, 0x5a),
                    },
                )),
            },
            TestCase {
                input: "%d13.10",
                out: Some((
                    "",
                    NumVal {
                        base: Base::Dec,
                        spec: NumSpec::Concat(vec![13, 10]),
                    },
                )),
            },
            TestCase {
                input: "%b0101",
                out: Some(("", NumVal::single(Base::Bin, 5))),
            },
            TestCase {
                input: "%x5A-41",
                out: None,
            },
            TestCase {
                input: "%q41",
                out: None,
            },
            TestCase {
                input: "%x",
                out: None,
            },
        ];

        assert_test_cases(num_val, tests);
    }

    #[test]
    fn parse_element() {
        let tests = vec![
            TestCase {
                input: "\"hello\" world",
                out: Some((" world", Element::CharVal("hello".to_owned()))),
            },
            TestCase {
                input: "<any text>",
                out: Some(("", Element::ProseVal("any text".to_owned()))),
            },
            TestCase {
                input: "( a )",
                out: Some(("", Element::Group(single(Element::Rulename(name("a")))))),
            },
            TestCase {
                input: "[a]",
                out: Some(("", Element::Option(single(Element::Rulename(name("a")))))),
            },
            TestCase {
                input: "\"unterminated",
                out: None,
            },
        ];

        assert_test_cases(element, tests);
    }

    #[test]
    fn parse_alternation() {
        let bit = Alternation::new(vec![
            Repetition::from(Element::CharVal("0".to_owned())).into(),
            Repetition::from(Element::CharVal("1".to_owned())).into(),
        ])
        .unwrap();
        let cnl_wsp = Alternation::from(
            Concatenation::new(vec![
                Element::Rulename(name("cnl")).into(),
                Element::Rulename(name("WSP")).into(),
            ])
            .unwrap(),
        );

        let tests = vec![
            TestCase {
                input: "\"0\" / \"1\"",
                out: Some(("", bit.clone())),
            },
            TestCase {
                input: "\"0\"/\"1\" ",
                out: Some((" ", bit)),
            },
            TestCase {
                input: "cnl WSP\nnext",
                out: Some(("\nnext", cnl_wsp.clone())),
            },
            // A continuation line starts with whitespace.
            TestCase {
                input: "cnl\n  WSP",
                out: Some(("", cnl_wsp)),
            },
        ];

        assert_test_cases(alternation, tests);
    }

    #[test]
    fn parse_rule() {
        let tests = vec![
            TestCase {
                input: "a = b\n",
                out: Some((
                    "",
                    Rule {
                        name: name("a"),
                        defined_as: DefinedAs::Fresh,
                        body: single(Element::Rulename(name("b"))),
                    },
                )),
            },
            TestCase {
                input: "a =/ b ; trailing comment\r\nc = d\r\n",
                out: Some((
                    "c = d\r\n",
                    Rule {
                        name: name("a"),
                        defined_as: DefinedAs::Incremental,
                        body: single(Element::Rulename(name("b"))),
                    },
                )),
            },
            TestCase {
                input: "a = b",
                out: None,
            },
        ];

        assert_test_cases(rule, tests);
    }

    #[test]
    fn parse_rulelist() {
        let input = "; leading comment\n\
                     \n\
                     a = b\n\
                     \x20  ; continuation comment\n\
                     \x20  / c\n\
                     d = \"e\"\n";
        let (rem, rules) = rulelist(input).unwrap();
        assert_eq!(rem, "");
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].name, name("a"));
        assert_eq!(rules[0].body.branches().len(), 2);
        assert_eq!(rules[1].name, name("d"));
    }
}

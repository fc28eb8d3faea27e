/// SearchExpr is the syntax tree of a search query.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchExpr {
    Filter(SearchFilter),
    And(Vec<SearchExpr>),
    Or(Vec<SearchExpr>),
}

/// SearchFilter is a single `[!]key:[comparator]value` term.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchFilter {
    pub negated: bool,
    pub key: String,
    pub comparator: Comparator,
    pub value: FilterValue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparator {
    Eq,
    Gt,
    Gte,
    Lt,
    Lte,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Text(String),
    List(Vec<String>),
}

#[must_use]
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("unterminated quoted value starting at offset {offset}")]
    UnterminatedQuote { offset: usize },
    #[error("unterminated list value in {term:?}")]
    UnterminatedList { term: String },
    #[error("unbalanced parenthesis at offset {offset}")]
    UnbalancedParen { offset: usize },
    #[error("empty parenthesized group")]
    EmptyGroup,
    #[error("boolean operator {op} must be placed between two filters")]
    DanglingOperator { op: &'static str },
    #[error("free text {text:?} is not supported; filters must be of the form key:value")]
    FreeText { text: String },
    #[error("filter {term:?} has an empty key")]
    EmptyKey { term: String },
    #[error("filter {key:?} has an empty value")]
    EmptyValue { key: String },
    #[error("filter {key:?} expects a number, but got {value:?}")]
    InvalidNumber { key: String, value: String },
    #[error("filter {key:?} expects a duration, but got {value:?}")]
    InvalidDuration { key: String, value: String },
    #[error("filter {key:?} does not support the {comparator:?} comparison")]
    InvalidComparator { key: String, comparator: Comparator },
    #[error("filter {key:?} does not support list values")]
    InvalidList { key: String },
    #[error("aggregate {aggregate:?} is malformed")]
    MalformedAggregate { aggregate: String },
    #[error("function {function:?} is not a known aggregate")]
    UnknownFunction { function: String },
    #[error("aggregate filter {key:?} may not be nested within a boolean condition")]
    NestedAggregate { key: String },
    #[error("parenthesized groups may not be nested more than {max} levels deep")]
    TooDeep { max: usize },
}

/// Maximum nesting depth of parenthesized groups within a query.
pub const MAX_GROUP_DEPTH: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token<'q> {
    LParen(usize),
    RParen(usize),
    And,
    Or,
    Term(&'q str),
}

/// Parse a search query into its syntax tree.
///
/// Filters are joined by AND when placed next to each other, and AND binds
/// more tightly than OR. An empty query parses to an empty `And`.
pub fn parse_query(query: &str) -> Result<SearchExpr, ParseError> {
    let tokens = tokenize(query)?;
    if tokens.is_empty() {
        return Ok(SearchExpr::And(Vec::new()));
    }

    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let expr = parser.parse_or()?;

    match parser.tokens.get(parser.pos) {
        None => Ok(expr),
        Some(Token::RParen(offset)) | Some(Token::LParen(offset)) => {
            Err(ParseError::UnbalancedParen { offset: *offset })
        }
        // parse_or consumes everything other than parentheses.
        Some(_) => Err(ParseError::UnbalancedParen { offset: query.len() }),
    }
}

fn tokenize(query: &str) -> Result<Vec<Token<'_>>, ParseError> {
    let mut tokens = Vec::new();
    let mut offset = 0;

    while let Some(c) = query[offset..].chars().next() {
        if c.is_whitespace() {
            offset += c.len_utf8();
        } else if c == '(' {
            tokens.push(Token::LParen(offset));
            offset += 1;
        } else if c == ')' {
            tokens.push(Token::RParen(offset));
            offset += 1;
        } else {
            let end = scan_term(query, offset)?;
            tokens.push(match &query[offset..end] {
                "AND" => Token::And,
                "OR" => Token::Or,
                term => Token::Term(term),
            });
            offset = end;
        }
    }
    Ok(tokens)
}

// Returns the end offset of the term beginning at `start`. Terms end at
// whitespace or at a ')' which closes an enclosing group. Whitespace is
// permitted within quotes, lists, and function call parentheses.
fn scan_term(query: &str, start: usize) -> Result<usize, ParseError> {
    let mut depth = 0usize;
    let mut in_list = false;
    let mut quote_start: Option<usize> = None;
    let mut escaped = false;

    for (index, c) in query[start..].char_indices() {
        let index = start + index;

        if quote_start.is_some() {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                quote_start = None;
            }
            continue;
        }

        match c {
            '"' => quote_start = Some(index),
            '[' => in_list = true,
            ']' => in_list = false,
            '(' => depth += 1,
            ')' if depth == 0 => return Ok(index),
            ')' => depth -= 1,
            c if c.is_whitespace() && depth == 0 && !in_list => return Ok(index),
            _ => (),
        }
    }

    if let Some(offset) = quote_start {
        return Err(ParseError::UnterminatedQuote { offset });
    }
    if in_list {
        return Err(ParseError::UnterminatedList {
            term: query[start..].to_string(),
        });
    }
    Ok(query.len())
}

struct Parser<'q> {
    tokens: Vec<Token<'q>>,
    pos: usize,
    // Number of currently open groups.
    depth: usize,
}

impl<'q> Parser<'q> {
    fn peek(&self) -> Option<Token<'q>> {
        self.tokens.get(self.pos).copied()
    }

    fn parse_or(&mut self) -> Result<SearchExpr, ParseError> {
        let mut branches = vec![self.parse_and()?];

        while let Some(Token::Or) = self.peek() {
            self.pos += 1;

            if matches!(self.peek(), None | Some(Token::RParen(_)) | Some(Token::Or)) {
                return Err(ParseError::DanglingOperator { op: "OR" });
            }
            branches.push(self.parse_and()?);
        }

        Ok(if branches.len() == 1 {
            branches.swap_remove(0)
        } else {
            SearchExpr::Or(branches)
        })
    }

    fn parse_and(&mut self) -> Result<SearchExpr, ParseError> {
        let mut terms = Vec::new();

        loop {
            match self.peek() {
                None | Some(Token::RParen(_)) | Some(Token::Or) => break,
                Some(Token::And) => {
                    self.pos += 1;
                    // AND must be preceded and followed by a term or group.
                    if terms.is_empty()
                        || matches!(
                            self.peek(),
                            None | Some(Token::RParen(_)) | Some(Token::Or) | Some(Token::And)
                        )
                    {
                        return Err(ParseError::DanglingOperator { op: "AND" });
                    }
                }
                Some(Token::LParen(offset)) => {
                    if self.depth == MAX_GROUP_DEPTH {
                        return Err(ParseError::TooDeep { max: MAX_GROUP_DEPTH });
                    }
                    self.pos += 1;
                    self.depth += 1;
                    let inner = self.parse_or()?;
                    self.depth -= 1;

                    match self.peek() {
                        Some(Token::RParen(_)) => self.pos += 1,
                        _ => return Err(ParseError::UnbalancedParen { offset }),
                    }
                    terms.push(inner);
                }
                Some(Token::Term(term)) => {
                    self.pos += 1;
                    terms.push(SearchExpr::Filter(parse_filter(term)?));
                }
            }
        }

        match terms.len() {
            0 => Err(match self.peek() {
                Some(Token::RParen(_)) => ParseError::EmptyGroup,
                _ => ParseError::DanglingOperator { op: "OR" },
            }),
            1 => Ok(terms.swap_remove(0)),
            _ => Ok(SearchExpr::And(terms)),
        }
    }
}

fn parse_filter(term: &str) -> Result<SearchFilter, ParseError> {
    let (negated, body) = match term.strip_prefix('!') {
        Some(body) => (true, body),
        None => (false, term),
    };

    let Some(split) = find_key_separator(body) else {
        return Err(ParseError::FreeText {
            text: term.to_string(),
        });
    };
    let (key, rest) = (&body[..split], &body[split + 1..]);

    if key.is_empty() {
        return Err(ParseError::EmptyKey {
            term: term.to_string(),
        });
    }

    let (comparator, raw) = if let Some(raw) = rest.strip_prefix(">=") {
        (Comparator::Gte, raw)
    } else if let Some(raw) = rest.strip_prefix("<=") {
        (Comparator::Lte, raw)
    } else if let Some(raw) = rest.strip_prefix('>') {
        (Comparator::Gt, raw)
    } else if let Some(raw) = rest.strip_prefix('<') {
        (Comparator::Lt, raw)
    } else if let Some(raw) = rest.strip_prefix('=') {
        (Comparator::Eq, raw)
    } else {
        (Comparator::Eq, rest)
    };

    let empty = || ParseError::EmptyValue {
        key: key.to_string(),
    };

    let value = if let Some(list) = raw.strip_prefix('[') {
        let Some(list) = list.strip_suffix(']') else {
            return Err(ParseError::UnterminatedList {
                term: term.to_string(),
            });
        };
        let items = split_list(list)
            .into_iter()
            .map(|item| unquote(item.trim()).ok_or_else(empty))
            .collect::<Result<Vec<_>, _>>()?;

        if items.is_empty() {
            return Err(empty());
        }
        FilterValue::List(items)
    } else {
        FilterValue::Text(unquote(raw).ok_or_else(empty)?)
    };

    Ok(SearchFilter {
        negated,
        key: key.to_string(),
        comparator,
        value,
    })
}

// Aggregate keys like `p95(transaction.duration)` may not contain ':', but
// their parentheses must be skipped over.
fn find_key_separator(body: &str) -> Option<usize> {
    let mut depth = 0usize;
    for (index, c) in body.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ':' if depth == 0 => return Some(index),
            _ => (),
        }
    }
    None
}

fn split_list(list: &str) -> Vec<&str> {
    let mut items = Vec::new();
    let mut in_quote = false;
    let mut escaped = false;
    let mut begin = 0;

    for (index, c) in list.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_quote => escaped = true,
            '"' => in_quote = !in_quote,
            ',' if !in_quote => {
                items.push(&list[begin..index]);
                begin = index + 1;
            }
            _ => (),
        }
    }
    if !list[begin..].trim().is_empty() || !items.is_empty() {
        items.push(&list[begin..]);
    }
    items
}

// Unquote a value, returning None if it's empty. A quoted empty string
// (`""`) is a valid, empty value.
fn unquote(raw: &str) -> Option<String> {
    if raw.len() >= 2 && raw.starts_with('"') && raw.ends_with('"') {
        let mut out = String::with_capacity(raw.len() - 2);
        let mut chars = raw[1..raw.len() - 1].chars();

        while let Some(c) = chars.next() {
            if c == '\\' {
                if let Some(next) = chars.next() {
                    out.push(next);
                }
            } else {
                out.push(c);
            }
        }
        Some(out)
    } else if raw.is_empty() {
        None
    } else {
        Some(raw.to_string())
    }
}

#[cfg(test)]
mod test {
    use super::{
        parse_query, Comparator, FilterValue, ParseError, SearchExpr, SearchFilter,
        MAX_GROUP_DEPTH,
    };

    fn filter(key: &str, comparator: Comparator, value: &str) -> SearchExpr {
        SearchExpr::Filter(SearchFilter {
            negated: false,
            key: key.to_string(),
            comparator,
            value: FilterValue::Text(value.to_string()),
        })
    }

    #[test]
    fn test_implicit_and_explicit_conjunctions() {
        let expect = SearchExpr::And(vec![
            filter("release", Comparator::Eq, "1.0"),
            filter("transaction.duration", Comparator::Gte, "1s"),
        ]);
        assert_eq!(
            parse_query("release:1.0 transaction.duration:>=1s").unwrap(),
            expect
        );
        assert_eq!(
            parse_query("  release:1.0   AND transaction.duration:>=1s ").unwrap(),
            expect
        );
    }

    #[test]
    fn test_or_binds_loosest() {
        assert_eq!(
            parse_query("a:1 b:2 OR c:3").unwrap(),
            SearchExpr::Or(vec![
                SearchExpr::And(vec![
                    filter("a", Comparator::Eq, "1"),
                    filter("b", Comparator::Eq, "2"),
                ]),
                filter("c", Comparator::Eq, "3"),
            ])
        );
        assert_eq!(
            parse_query("a:1 (b:2 OR c:<3)").unwrap(),
            SearchExpr::And(vec![
                filter("a", Comparator::Eq, "1"),
                SearchExpr::Or(vec![
                    filter("b", Comparator::Eq, "2"),
                    filter("c", Comparator::Lt, "3"),
                ]),
            ])
        );
        // Redundant parentheses collapse.
        assert_eq!(
            parse_query("((a:1))").unwrap(),
            filter("a", Comparator::Eq, "1")
        );
    }

    #[test]
    fn test_values() {
        let SearchExpr::And(terms) = parse_query(
            r#"!release:"1.0 beta" transaction:[/a, "/b,c"] p95():>1s os.name:"" tx:"say \"hi\"""#,
        )
        .unwrap() else {
            panic!("expected an And");
        };

        assert_eq!(
            terms,
            vec![
                SearchExpr::Filter(SearchFilter {
                    negated: true,
                    key: "release".to_string(),
                    comparator: Comparator::Eq,
                    value: FilterValue::Text("1.0 beta".to_string()),
                }),
                SearchExpr::Filter(SearchFilter {
                    negated: false,
                    key: "transaction".to_string(),
                    comparator: Comparator::Eq,
                    value: FilterValue::List(vec!["/a".to_string(), "/b,c".to_string()]),
                }),
                filter("p95()", Comparator::Gt, "1s"),
                filter("os.name", Comparator::Eq, ""),
                filter("tx", Comparator::Eq, "say \"hi\""),
            ]
        );
    }

    #[test]
    fn test_empty_query() {
        assert_eq!(parse_query("").unwrap(), SearchExpr::And(Vec::new()));
        assert_eq!(parse_query("   ").unwrap(), SearchExpr::And(Vec::new()));
    }

    #[test]
    fn test_errors() {
        for (query, expect) in [
            ("hello", ParseError::FreeText { text: "hello".to_string() }),
            ("release:", ParseError::EmptyValue { key: "release".to_string() }),
            (":1.0", ParseError::EmptyKey { term: ":1.0".to_string() }),
            ("release:\"1.0", ParseError::UnterminatedQuote { offset: 8 }),
            ("release:[1, 2", ParseError::UnterminatedList { term: "release:[1, 2".to_string() }),
            ("(release:1.0", ParseError::UnbalancedParen { offset: 0 }),
            ("release:1.0)", ParseError::UnbalancedParen { offset: 11 }),
            ("()", ParseError::EmptyGroup),
            ("OR release:1.0", ParseError::DanglingOperator { op: "OR" }),
            ("release:1.0 OR", ParseError::DanglingOperator { op: "OR" }),
            ("release:1.0 AND", ParseError::DanglingOperator { op: "AND" }),
            ("AND release:1.0", ParseError::DanglingOperator { op: "AND" }),
            ("a:1 AND OR b:2", ParseError::DanglingOperator { op: "AND" }),
            ("(a:1 OR)", ParseError::DanglingOperator { op: "OR" }),
            ("a:1 OR OR b:2", ParseError::DanglingOperator { op: "OR" }),
            ("a:1 (() OR b:2)", ParseError::EmptyGroup),
        ] {
            assert_eq!(parse_query(query).unwrap_err(), expect, "query {query:?}");
        }
    }

    fn nested(depth: usize) -> String {
        format!("{}release:1.0{}", "(".repeat(depth), ")".repeat(depth))
    }

    #[test]
    fn test_nesting_depth_is_limited() {
        assert_eq!(
            parse_query(&nested(MAX_GROUP_DEPTH)).unwrap(),
            filter("release", Comparator::Eq, "1.0")
        );
        assert_eq!(
            parse_query(&format!("a:1 {}", nested(MAX_GROUP_DEPTH))).unwrap(),
            SearchExpr::And(vec![
                filter("a", Comparator::Eq, "1"),
                filter("release", Comparator::Eq, "1.0"),
            ])
        );

        for depth in [MAX_GROUP_DEPTH + 1, 1_000, 100_000] {
            assert_eq!(
                parse_query(&nested(depth)).unwrap_err(),
                ParseError::TooDeep { max: MAX_GROUP_DEPTH },
                "depth {depth}"
            );
        }

        // Sibling groups don't add to the depth.
        let siblings = vec![nested(MAX_GROUP_DEPTH); 100].join(" OR ");
        assert!(parse_query(&siblings).is_ok());
    }
}

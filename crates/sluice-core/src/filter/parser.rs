//! Recursive-descent parser for filter text.

use super::{Comparison, Filter, FilterParseError, SubstringPattern};

/// Deepest composite nesting accepted; keeps evaluation and rendering off the
/// end of the stack.
pub(super) const MAX_DEPTH: usize = 64;

pub(super) fn parse(text: &str) -> Result<Filter, FilterParseError> {
    let mut parser = Parser::new(text);
    parser.skip_whitespace();
    if parser.at_end() {
        return Err(FilterParseError::new(0, "filter text is empty"));
    }
    let filter = parser.parse_filter()?;
    parser.skip_whitespace();
    if !parser.at_end() {
        return Err(parser.error("unexpected characters after filter"));
    }
    Ok(filter)
}

struct Parser<'a> {
    text: &'a str,
    chars: Vec<(usize, char)>,
    position: usize,
    depth: usize,
}

/// Operand text of a simple item, split on unescaped `*` wildcards.
struct Operand {
    segments: Vec<String>,
}

impl Operand {
    fn has_wildcard(&self) -> bool {
        self.segments.len() > 1
    }

    fn into_literal(self) -> String {
        self.segments.concat()
    }
}

impl<'a> Parser<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            text,
            chars: text.char_indices().collect(),
            position: 0,
            depth: 0,
        }
    }

    fn at_end(&self) -> bool {
        self.position >= self.chars.len()
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.position).map(|(_, character)| *character)
    }

    fn offset(&self) -> usize {
        self.chars
            .get(self.position)
            .map_or(self.text.len(), |(offset, _)| *offset)
    }

    fn advance(&mut self) -> Option<char> {
        let next = self.peek();
        if next.is_some() {
            self.position += 1;
        }
        next
    }

    fn error(&self, message: impl Into<String>) -> FilterParseError {
        FilterParseError::new(self.offset(), message)
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.position += 1;
        }
    }

    fn expect(&mut self, expected: char) -> Result<(), FilterParseError> {
        match self.peek() {
            Some(found) if found == expected => {
                self.position += 1;
                Ok(())
            }
            Some(found) => Err(self.error(format!("expected '{expected}' but found '{found}'"))),
            None => Err(self.error(format!("expected '{expected}' but reached end of filter"))),
        }
    }

    fn parse_filter(&mut self) -> Result<Filter, FilterParseError> {
        self.skip_whitespace();
        if self.depth >= MAX_DEPTH {
            return Err(self.error("filter nesting too deep"));
        }
        self.depth += 1;
        let filter = self.parse_nested();
        self.depth -= 1;
        filter
    }

    fn parse_nested(&mut self) -> Result<Filter, FilterParseError> {
        self.expect('(')?;
        self.skip_whitespace();
        let filter = match self.peek() {
            Some('&') => {
                self.position += 1;
                Filter::And(self.parse_operands()?)
            }
            Some('|') => {
                self.position += 1;
                Filter::Or(self.parse_operands()?)
            }
            Some('!') => {
                self.position += 1;
                Filter::Not(Box::new(self.parse_filter()?))
            }
            Some(_) => self.parse_item()?,
            None => return Err(self.error("unterminated filter")),
        };
        self.skip_whitespace();
        self.expect(')')?;
        Ok(filter)
    }

    fn parse_operands(&mut self) -> Result<Vec<Filter>, FilterParseError> {
        let mut operands = Vec::new();
        loop {
            self.skip_whitespace();
            if self.peek() != Some('(') {
                break;
            }
            operands.push(self.parse_filter()?);
        }
        if operands.is_empty() {
            return Err(self.error("composite filter requires at least one operand"));
        }
        Ok(operands)
    }

    fn parse_item(&mut self) -> Result<Filter, FilterParseError> {
        let key = self.parse_key()?;
        let comparison = self.parse_comparison()?;
        let operand = self.parse_operand()?;

        if comparison != Comparison::Equal {
            if operand.has_wildcard() {
                return Err(self.error("wildcards are only allowed in equality filters"));
            }
            return Ok(Filter::Compare {
                key,
                comparison,
                value: operand.into_literal(),
            });
        }

        if !operand.has_wildcard() {
            return Ok(Filter::Compare {
                key,
                comparison,
                value: operand.into_literal(),
            });
        }

        if operand.segments.iter().all(String::is_empty) && operand.segments.len() == 2 {
            return Ok(Filter::Present { key });
        }

        Ok(Filter::Substring {
            key,
            pattern: SubstringPattern::from_segments(operand.segments),
        })
    }

    fn parse_key(&mut self) -> Result<String, FilterParseError> {
        let start = self.offset();
        let mut key = String::new();
        while let Some(character) = self.peek() {
            if matches!(character, '=' | '~' | '<' | '>' | '(' | ')') {
                break;
            }
            key.push(character);
            self.position += 1;
        }
        let trimmed = key.trim();
        if trimmed.is_empty() {
            return Err(FilterParseError::new(start, "missing attribute name"));
        }
        Ok(trimmed.to_owned())
    }

    fn parse_comparison(&mut self) -> Result<Comparison, FilterParseError> {
        let comparison = match self.advance() {
            Some('=') => return Ok(Comparison::Equal),
            Some('~') => Comparison::Approx,
            Some('>') => Comparison::GreaterOrEqual,
            Some('<') => Comparison::LessOrEqual,
            Some(found) => return Err(self.error(format!("unexpected '{found}' after attribute"))),
            None => return Err(self.error("missing comparison operator")),
        };
        self.expect('=')?;
        Ok(comparison)
    }

    fn parse_operand(&mut self) -> Result<Operand, FilterParseError> {
        let mut segments = vec![String::new()];
        loop {
            match self.peek() {
                None => return Err(self.error("unterminated filter value")),
                Some(')') => break,
                Some('(') => return Err(self.error("unescaped '(' in filter value")),
                Some('*') => {
                    self.position += 1;
                    segments.push(String::new());
                }
                Some('\\') => {
                    self.position += 1;
                    let escaped = self
                        .advance()
                        .ok_or_else(|| self.error("dangling escape at end of filter"))?;
                    push_char(&mut segments, escaped);
                }
                Some(character) => {
                    self.position += 1;
                    push_char(&mut segments, character);
                }
            }
        }
        Ok(Operand { segments })
    }
}

fn push_char(segments: &mut [String], character: char) {
    if let Some(current) = segments.last_mut() {
        current.push(character);
    }
}

//! Stylesheet and declaration-list parsing on top of `cssparser`.
//!
//! Only structure is parsed. Selector preludes, at-rule headers, rule bodies and
//! declaration values come back as the exact source slices, so captured rules
//! can be re-emitted without reformatting values the export never inspects.

use cssparser::{
    AtRuleParser, CowRcStr, DeclarationParser, Delimiter, ParseError, Parser, ParserInput,
    ParserState, QualifiedRuleParser, RuleBodyItemParser, RuleBodyParser, StyleSheetParser, Token,
};

#[derive(Debug, Clone, PartialEq)]
pub struct CssRule {
    /// Selector list, or the at-rule header including its `@name`.
    pub prelude: String,
    /// Source text between the outer braces (empty for statement at-rules).
    pub block: String,
}

impl CssRule {
    pub fn is_at_rule(&self) -> bool {
        self.prelude.starts_with('@')
    }
}

/// Consumes the rest of `input` and returns what it spanned, trimmed.
fn rest_of<'i>(input: &mut Parser<'i, '_>) -> &'i str {
    let start = input.position();
    while input.next_including_whitespace_and_comments().is_ok() {}
    input.slice_from(start).trim()
}

// ────────────────────────────────────────────────────────────────────────────
// Top-level rules
// ────────────────────────────────────────────────────────────────────────────

struct TopLevelRules;

impl<'i> QualifiedRuleParser<'i> for TopLevelRules {
    type Prelude = String;
    type QualifiedRule = CssRule;
    type Error = ();

    fn parse_prelude<'t>(
        &mut self,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::Prelude, ParseError<'i, ()>> {
        Ok(rest_of(input).to_string())
    }

    fn parse_block<'t>(
        &mut self,
        prelude: Self::Prelude,
        _start: &ParserState,
        input: &mut Parser<'i, 't>,
    ) -> Result<CssRule, ParseError<'i, ()>> {
        Ok(CssRule {
            prelude,
            block: rest_of(input).to_string(),
        })
    }
}

impl<'i> AtRuleParser<'i> for TopLevelRules {
    type Prelude = String;
    type AtRule = CssRule;
    type Error = ();

    fn parse_prelude<'t>(
        &mut self,
        name: CowRcStr<'i>,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::Prelude, ParseError<'i, ()>> {
        let name: &str = &name;
        let header = rest_of(input);
        Ok(if header.is_empty() {
            format!("@{name}")
        } else {
            format!("@{name} {header}")
        })
    }

    fn rule_without_block(
        &mut self,
        prelude: Self::Prelude,
        _start: &ParserState,
    ) -> Result<CssRule, ()> {
        Ok(CssRule {
            prelude,
            block: String::new(),
        })
    }

    fn parse_block<'t>(
        &mut self,
        prelude: Self::Prelude,
        _start: &ParserState,
        input: &mut Parser<'i, 't>,
    ) -> Result<CssRule, ParseError<'i, ()>> {
        Ok(CssRule {
            prelude,
            block: rest_of(input).to_string(),
        })
    }
}

/// Top-level rules of a stylesheet in source order. Nested blocks (`@media`)
/// stay inside their parent's `block`; unparseable rules are skipped.
pub fn parse_rules(css: &str) -> Vec<CssRule> {
    let mut input = ParserInput::new(css);
    let mut parser = Parser::new(&mut input);
    let mut rules = TopLevelRules;
    StyleSheetParser::new(&mut parser, &mut rules)
        .filter_map(Result::ok)
        .collect()
}

// ────────────────────────────────────────────────────────────────────────────
// Declaration lists
// ────────────────────────────────────────────────────────────────────────────

struct Declarations;

impl<'i> DeclarationParser<'i> for Declarations {
    type Declaration = (String, String);
    type Error = ();

    fn parse_value<'t>(
        &mut self,
        name: CowRcStr<'i>,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::Declaration, ParseError<'i, ()>> {
        let value = rest_of(input);
        if value.is_empty() {
            return Err(input.new_custom_error(()));
        }
        Ok((name.to_ascii_lowercase(), value.to_string()))
    }
}

impl<'i> AtRuleParser<'i> for Declarations {
    type Prelude = ();
    type AtRule = (String, String);
    type Error = ();
}

impl<'i> QualifiedRuleParser<'i> for Declarations {
    type Prelude = ();
    type QualifiedRule = (String, String);
    type Error = ();
}

impl<'i> RuleBodyItemParser<'i, (String, String), ()> for Declarations {
    fn parse_declarations(&self) -> bool {
        true
    }

    fn parse_qualified(&self) -> bool {
        false
    }
}

/// `(property, value)` pairs of a declaration list. Property names are
/// lowercased; values keep their source text including any `!important`.
/// Malformed declarations are skipped.
pub fn parse_declarations(text: &str) -> Vec<(String, String)> {
    let mut input = ParserInput::new(text);
    let mut parser = Parser::new(&mut input);
    let mut declarations = Declarations;
    RuleBodyParser::new(&mut parser, &mut declarations)
        .filter_map(Result::ok)
        .collect()
}

// ────────────────────────────────────────────────────────────────────────────
// Selector lists
// ────────────────────────────────────────────────────────────────────────────

/// Splits a selector list on its top-level commas. Commas inside
/// `:not(...)` or attribute selectors do not split.
pub fn split_selector_list(text: &str) -> Vec<String> {
    let mut input = ParserInput::new(text);
    let mut parser = Parser::new(&mut input);
    let mut selectors = Vec::new();
    loop {
        let start = parser.position();
        let _: Result<(), ParseError<()>> = parser.parse_until_before(Delimiter::Comma, |p| {
            while p.next_including_whitespace_and_comments().is_ok() {}
            Ok(())
        });
        let selector = parser.slice_from(start).trim();
        if !selector.is_empty() {
            selectors.push(selector.to_string());
        }
        if !matches!(parser.next(), Ok(Token::Comma)) {
            break;
        }
    }
    selectors
}

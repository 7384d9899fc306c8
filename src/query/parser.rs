//! Traversal parser using Pest

use crate::query::ast::*;
use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser;
use thiserror::Error;

#[derive(Parser)]
#[grammar = "query/traversal.pest"]
struct TraversalParser;

/// Parser errors
#[derive(Error, Debug)]
pub enum ParseError {
    /// Pest parsing error
    #[error("Parse error: {0}")]
    PestError(#[from] pest::error::Error<Rule>),

    /// Semantic error
    #[error("Semantic error: {0}")]
    SemanticError(String),
}

pub type ParseResult<T> = Result<T, ParseError>;

/// Parse a traversal string into an AST
pub fn parse_query(input: &str) -> ParseResult<Traversal> {
    let mut pairs = TraversalParser::parse(Rule::query, input)?;
    let query = pairs
        .next()
        .ok_or_else(|| ParseError::SemanticError("empty query".to_string()))?;

    let mut source = None;
    let mut steps = Vec::new();
    for inner in query.into_inner() {
        match inner.as_rule() {
            Rule::vertices => {
                let args = inner.into_inner().map(parse_arg).collect::<ParseResult<Vec<_>>>()?;
                source = Some(Source::Vertices(args));
            }
            Rule::edges => source = Some(Source::Edges),
            Rule::EOI => {}
            _ => steps.push(parse_step(inner)?),
        }
    }

    let source = source.ok_or_else(|| ParseError::SemanticError("missing V() or E() source".to_string()))?;
    Ok(Traversal { source, steps })
}

fn parse_step(pair: Pair<Rule>) -> ParseResult<Step> {
    let rule = pair.as_rule();
    let mut args = pair.into_inner().map(parse_arg).collect::<ParseResult<Vec<_>>>()?.into_iter();

    let step = match rule {
        Rule::has_label => Step::HasLabel(required(&mut args, "hasLabel")?),
        Rule::has => {
            let key = required(&mut args, "has")?;
            Step::Has(key, args.next())
        }
        Rule::out_step => Step::Walk(Direction::Out, args.next()),
        Rule::in_step => Step::Walk(Direction::In, args.next()),
        Rule::both_step => Step::Walk(Direction::Both, args.next()),
        Rule::out_v => Step::OutV,
        Rule::in_v => Step::InV,
        Rule::values => Step::Values(required(&mut args, "values")?),
        Rule::id_step => Step::Id,
        Rule::dedup => Step::Dedup,
        Rule::limit => Step::Limit(required(&mut args, "limit")?),
        Rule::count => Step::Count,
        other => return Err(ParseError::SemanticError(format!("unexpected step {:?}", other))),
    };
    Ok(step)
}

fn required(args: &mut impl Iterator<Item = Arg>, step: &str) -> ParseResult<Arg> {
    args.next()
        .ok_or_else(|| ParseError::SemanticError(format!("{}() needs an argument", step)))
}

fn parse_arg(pair: Pair<Rule>) -> ParseResult<Arg> {
    let text = pair.as_str();
    match pair.as_rule() {
        Rule::string => Ok(Arg::String(
            pair.into_inner().next().map(|p| p.as_str().to_string()).unwrap_or_default(),
        )),
        Rule::integer => text
            .parse()
            .map(Arg::Integer)
            .map_err(|_| ParseError::SemanticError(format!("integer out of range: {}", text))),
        Rule::float => text
            .parse()
            .map(Arg::Float)
            .map_err(|_| ParseError::SemanticError(format!("invalid number: {}", text))),
        Rule::boolean => Ok(Arg::Boolean(text == "true")),
        Rule::binding => Ok(Arg::Binding(text.trim_start_matches('$').to_string())),
        other => Err(ParseError::SemanticError(format!("unexpected argument {:?}", other))),
    }
}

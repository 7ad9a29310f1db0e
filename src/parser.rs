//! This module provides the parser for `.tm` presets, utilizing the `pest` crate.
//! It defines the grammar for `.tm` files and functions to parse the input into a `Preset`.

use crate::types::{Direction, MachineError, Preset, Symbol, TransitionRule, BLANK, MAX_PRESET_SIZE};
use pest::{
    error::{Error, ErrorVariant},
    iterators::{Pair, Pairs},
    Parser as PestParser, Span,
};
use pest_derive::Parser as PestParser;
use std::collections::HashSet;

/// Derives a `PestParser` for the preset grammar defined in `grammar.pest`.
#[derive(PestParser)]
#[grammar = "grammar.pest"]
pub struct PresetParser;

/// Parses the given input string into a `Preset`.
///
/// Only the syntax is checked here. The resulting rule set is not analyzed:
/// conflicting or unreachable rules load as written and resolve by first match.
///
/// # Returns
///
/// * `Ok(Preset)` if the input is successfully parsed.
/// * `Err(MachineError::ParseError)` if there are any syntax errors.
/// * `Err(MachineError::ValidationError)` if a required section is missing or the input is too large.
pub fn parse(input: &str) -> Result<Preset, MachineError> {
    if input.len() > MAX_PRESET_SIZE {
        return Err(MachineError::ValidationError(format!(
            "Preset is {} bytes, the limit is {} bytes",
            input.len(),
            MAX_PRESET_SIZE
        )));
    }

    let root = PresetParser::parse(Rule::program, input.trim())
        .map_err(|e| MachineError::ParseError(e.into()))?
        .next()
        .ok_or_else(|| MachineError::ValidationError("Empty preset".to_string()))?;

    parse_program(root)
}

/// Parses the top-level sections of a preset from a `Pair<Rule::program>`.
fn parse_program(pair: Pair<Rule>) -> Result<Preset, MachineError> {
    let mut name: Option<String> = None;
    let mut description: Option<String> = None;
    let mut tape: Option<String> = None;
    let mut initial_state: Option<String> = None;
    let mut rules: Option<Vec<TransitionRule>> = None;
    let mut seen = HashSet::new();

    for p in pair.into_inner() {
        let span = p.as_span();
        let kind = p.as_rule();

        check_unique_section(kind, span, &mut seen)?;

        match kind {
            Rule::name => name = Some(parse_inner_text(p)),
            Rule::description => description = Some(parse_inner_text(p)),
            Rule::tape => tape = Some(parse_inner_text(p)),
            Rule::state => initial_state = Some(parse_inner_text(p)),
            Rule::rules => rules = Some(parse_rules(p)?),
            _ => {} // EOI
        }
    }

    let name = check_required_rule(name, "name")?;
    let rules = check_required_rule(rules, "rules")?;

    // Without an explicit state, the first rule's state is the initial one
    let initial_state = match initial_state {
        Some(state) => state,
        None => rules
            .first()
            .map(|rule| rule.current_state.clone())
            .ok_or_else(|| {
                MachineError::ValidationError(
                    "Missing 'state' section and no rules to infer it from".to_string(),
                )
            })?,
    };

    Ok(Preset {
        name,
        description: description.unwrap_or_default(),
        rules,
        initial_tape: tape.unwrap_or_default(),
        initial_state,
    })
}

/// Parses the rules section, keeping authoring order.
fn parse_rules(pair: Pair<Rule>) -> Result<Vec<TransitionRule>, MachineError> {
    pair.into_inner()
        .filter(|p| p.as_rule() == Rule::transition)
        .map(parse_rule)
        .collect()
}

/// Parses a single `state, read -> write, direction, next` line.
fn parse_rule(pair: Pair<Rule>) -> Result<TransitionRule, MachineError> {
    let mut pairs = pair.into_inner();
    let current_state = parse_string(&mut pairs)?;
    let read_symbol = parse_symbol_from_pairs(&mut pairs)?;
    let write_symbol = parse_symbol_from_pairs(&mut pairs)?;
    let direction = match pairs.next() {
        Some(p) => parse_direction(p)?,
        None => return Err(missing("direction")),
    };
    let next_state = parse_string(&mut pairs)?;

    Ok(TransitionRule {
        current_state,
        read_symbol,
        write_symbol,
        direction,
        next_state,
    })
}

/// Parses a single direction from a `Pair<Rule::direction>`.
///
/// Supports `L` for Left, `R` for Right, and `N` or `S` for Stay.
fn parse_direction(pair: Pair<Rule>) -> Result<Direction, MachineError> {
    let span = pair.as_span();
    match pair.as_str() {
        "L" => Ok(Direction::Left),
        "R" => Ok(Direction::Right),
        "N" | "S" => Ok(Direction::Stay),
        other => Err(parse_error(&format!("Unsupported direction: {other}"), span)),
    }
}

/// Parses a single character symbol, handling quoted and unquoted symbols.
fn parse_symbol(input: &str) -> Symbol {
    let inner = if input.len() > 1 {
        input
            .strip_prefix('\'')
            .and_then(|s| s.strip_suffix('\''))
            .unwrap_or(input)
    } else {
        input
    };
    inner.chars().next().unwrap_or(BLANK)
}

fn parse_symbol_from_pairs(pairs: &mut Pairs<Rule>) -> Result<Symbol, MachineError> {
    Ok(parse_symbol(&parse_string(pairs)?))
}

/// Extracts the trimmed inner text of a section, or an empty string if it has none.
fn parse_inner_text(pair: Pair<Rule>) -> String {
    pair.into_inner()
        .next()
        .map(|p| p.as_str().trim().to_string())
        .unwrap_or_default()
}

fn parse_string(pairs: &mut Pairs<Rule>) -> Result<String, MachineError> {
    pairs
        .next()
        .map(|p| p.as_str().to_string())
        .ok_or_else(|| missing("token"))
}

fn missing(what: &str) -> MachineError {
    MachineError::ValidationError(format!("Malformed rule: missing {what}"))
}

/// Creates a `MachineError::ParseError` from a message and a `Span`.
fn parse_error(msg: &str, span: Span) -> MachineError {
    MachineError::ParseError(Box::new(Error::new_from_span(
        ErrorVariant::CustomError {
            message: msg.to_string(),
        },
        span,
    )))
}

/// Checks if a given section has already been declared.
fn check_unique_section(kind: Rule, span: Span, seen: &mut HashSet<Rule>) -> Result<(), MachineError> {
    if !matches!(
        kind,
        Rule::name | Rule::description | Rule::tape | Rule::state | Rule::rules
    ) {
        return Ok(());
    };

    if !seen.insert(kind) {
        return Err(parse_error(
            &format!("Duplicate \"{kind:?}:\" declaration"),
            span,
        ));
    }

    Ok(())
}

/// Checks if a required section is present, returning an `Err` if it's missing.
fn check_required_rule<T>(value: Option<T>, name: &str) -> Result<T, MachineError> {
    value.ok_or_else(|| MachineError::ValidationError(format!("Missing '{name}' section")))
}

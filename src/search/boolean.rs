//! Boolean search (C4): `AND` / `OR` / prefix `NOT`, quoted phrases, and
//! parenthesised grouping. Precedence: `NOT` > `AND` > `OR`, left-associative.

use crate::atoms::error::{GraphError, GraphResult};
use crate::atoms::types::KnowledgeGraph;
use crate::index::{tokenize, Indices};
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq)]
enum Token {
    And,
    Or,
    Not,
    LParen,
    RParen,
    Phrase(String),
    Term(String),
}

fn lex(query: &str) -> GraphResult<Vec<Token>> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = query.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
            continue;
        }
        if c == '(' {
            tokens.push(Token::LParen);
            i += 1;
            continue;
        }
        if c == ')' {
            tokens.push(Token::RParen);
            i += 1;
            continue;
        }
        if c == '"' {
            let start = i + 1;
            let mut j = start;
            while j < chars.len() && chars[j] != '"' {
                j += 1;
            }
            if j >= chars.len() {
                return Err(GraphError::invalid_query("unterminated quoted phrase"));
            }
            let phrase: String = chars[start..j].iter().collect();
            tokens.push(Token::Phrase(phrase));
            i = j + 1;
            continue;
        }
        let start = i;
        while i < chars.len() && !chars[i].is_whitespace() && chars[i] != '(' && chars[i] != ')' && chars[i] != '"' {
            i += 1;
        }
        let word: String = chars[start..i].iter().collect();
        match word.to_uppercase().as_str() {
            "AND" => tokens.push(Token::And),
            "OR" => tokens.push(Token::Or),
            "NOT" => tokens.push(Token::Not),
            _ => tokens.push(Token::Term(word)),
        }
    }
    Ok(tokens)
}

#[derive(Debug, Clone)]
enum Expr {
    Term(String),
    Phrase(String),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let t = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        t
    }

    fn parse_or(&mut self) -> GraphResult<Expr> {
        let mut left = self.parse_and()?;
        while matches!(self.peek(), Some(Token::Or)) {
            self.next();
            let right = self.parse_and()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> GraphResult<Expr> {
        let mut left = self.parse_not()?;
        loop {
            match self.peek() {
                Some(Token::And) => {
                    self.next();
                    let right = self.parse_not()?;
                    left = Expr::And(Box::new(left), Box::new(right));
                }
                // Juxtaposition with a bare NOT (no explicit AND) is the same
                // as "AND NOT" — matches the seed scenario's
                // `"person NOT pasta"` query shape.
                Some(Token::Not) => {
                    let right = self.parse_not()?;
                    left = Expr::And(Box::new(left), Box::new(right));
                }
                _ => break,
            }
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> GraphResult<Expr> {
        if matches!(self.peek(), Some(Token::Not)) {
            self.next();
            let inner = self.parse_not()?;
            return Ok(Expr::Not(Box::new(inner)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> GraphResult<Expr> {
        match self.next() {
            Some(Token::LParen) => {
                let expr = self.parse_or()?;
                match self.next() {
                    Some(Token::RParen) => Ok(expr),
                    _ => Err(GraphError::invalid_query("expected closing parenthesis")),
                }
            }
            Some(Token::Phrase(p)) => Ok(Expr::Phrase(p)),
            Some(Token::Term(t)) => Ok(Expr::Term(t)),
            other => Err(GraphError::invalid_query(format!(
                "unexpected token in boolean query: {other:?}"
            ))),
        }
    }
}

fn parse(query: &str) -> GraphResult<Expr> {
    let tokens = lex(query)?;
    if tokens.is_empty() {
        return Err(GraphError::invalid_query("empty boolean query"));
    }
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.parse_or()?;
    if parser.pos != parser.tokens.len() {
        return Err(GraphError::invalid_query("trailing tokens in boolean query"));
    }
    Ok(expr)
}

fn phrase_matches_entity(graph: &KnowledgeGraph, name: &str, phrase_tokens: &[String]) -> bool {
    let Some(entity) = graph.find_entity(name) else {
        return false;
    };
    for observation in &entity.observations {
        let obs_tokens = tokenize(observation);
        if contains_sequence(&obs_tokens, phrase_tokens) {
            return true;
        }
    }
    false
}

fn contains_sequence(haystack: &[String], needle: &[String]) -> bool {
    if needle.is_empty() || haystack.len() < needle.len() {
        return false;
    }
    haystack.windows(needle.len()).any(|window| window == needle)
}

fn evaluate(expr: &Expr, graph: &KnowledgeGraph, indices: &Indices, universe: &BTreeSet<String>) -> BTreeSet<String> {
    match expr {
        Expr::Term(term) => {
            let token = term.to_lowercase();
            indices.observation.postings_for(&token)
        }
        Expr::Phrase(phrase) => {
            let phrase_tokens = tokenize(phrase);
            universe
                .iter()
                .filter(|name| phrase_matches_entity(graph, name, &phrase_tokens))
                .cloned()
                .collect()
        }
        Expr::And(a, b) => {
            let left = evaluate(a, graph, indices, universe);
            let right = evaluate(b, graph, indices, universe);
            left.intersection(&right).cloned().collect()
        }
        Expr::Or(a, b) => {
            let left = evaluate(a, graph, indices, universe);
            let right = evaluate(b, graph, indices, universe);
            left.union(&right).cloned().collect()
        }
        Expr::Not(inner) => {
            let inner_set = evaluate(inner, graph, indices, universe);
            universe.difference(&inner_set).cloned().collect()
        }
    }
}

/// Returns the unsorted, unique set of matching entity names; callers apply
/// C3 filtering/pagination afterward.
pub fn boolean_search(
    graph: &KnowledgeGraph,
    indices: &Indices,
    query: &str,
) -> GraphResult<BTreeSet<String>> {
    let expr = parse(query)?;
    let universe: BTreeSet<String> = graph.entities.iter().map(|e| e.name.clone()).collect();
    Ok(evaluate(&expr, graph, indices, &universe))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atoms::types::Entity;

    fn sample() -> (KnowledgeGraph, Indices) {
        let mut graph = KnowledgeGraph::new();
        let mut a = Entity::new("A", "person");
        a.add_observation("loves pasta".to_string());
        let mut b = Entity::new("B", "person");
        b.add_observation("manages A".to_string());
        graph.entities.push(a);
        graph.entities.push(b);
        let mut indices = Indices::default();
        indices.rebuild(&graph);
        (graph, indices)
    }

    #[test]
    fn and_intersects() {
        let (graph, indices) = sample();
        let result = boolean_search(&graph, &indices, "pasta AND person").unwrap();
        assert_eq!(result, BTreeSet::from(["A".to_string()]));
    }

    #[test]
    fn not_subtracts_from_universe() {
        let (graph, indices) = sample();
        let result = boolean_search(&graph, &indices, "person NOT pasta").unwrap();
        assert_eq!(result, BTreeSet::from(["B".to_string()]));
    }

    #[test]
    fn parentheses_group_before_or() {
        let (graph, indices) = sample();
        let result = boolean_search(&graph, &indices, "(pasta AND person) OR manages").unwrap();
        assert!(result.contains("A"));
        assert!(result.contains("B"));
    }
}

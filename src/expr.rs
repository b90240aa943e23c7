//! Boolean activation functions over fault modes.
//!
//! An [`Expr`] is a tree of `AND`, `OR`, `NOT` and `K-out-of-N` operators whose
//! leaves are fault modes. Expressions are parsed from text against a
//! [`FaultRegistry`], which resolves leaf names to [`FaultModeId`]s and
//! registers unknown names as new internal fault modes.
//!
//! # Text forms
//!
//! Three textual forms are produced, and all of them parse back:
//!
//! | Form | AND / OR | NOT | K-out-of-N | Leaf |
//! |------|----------|-----|------------|------|
//! | [simple][Expr::to_simple_string] | `(A)&&(B)` | `!A`, `!(..)` | `2/3(A,B,C)` | `A` |
//! | [bracketed][Expr::to_bracket_format] | `(A)&&(B)` | `!(A)` | `KOUTOFN[2/3](A),(B),(C)` | `A` |
//! | [enabling][Expr::to_enabling_string] | `(A>0)&&(B>0)` | `!(A>0)` | OR of all 2-subset ANDs | `A>0` |
//!
//! The bracketed form wraps every operand of every operator in its own pair
//! of parentheses; the [activation function parser][crate::entities] relies
//! on that to find sub-expressions by parenthesis depth alone.
//!
//! # Grammar
//!
//! Operators are written `&&`, `||`, `!` and `K/N(op1,...,opN)`. There is no
//! precedence: at each level the **last** top-level binary operator is the
//! root and the text is split at every top-level occurrence of it, so mixed
//! operators should be bracketed explicitly.
//!
//! ```
//! use faultflow::expr::Expr;
//! use faultflow::fault::FaultRegistry;
//!
//! let mut registry = FaultRegistry::new();
//! let expr = Expr::parse("(A && B) || 2/3(C, D, E)", &mut registry).unwrap();
//!
//! let a = registry.lookup("A").unwrap();
//! let b = registry.lookup("B").unwrap();
//! assert!(expr.compute(&|id| id == a || id == b));
//! assert!(!expr.compute(&|id| id == a));
//! assert_eq!(expr.to_bracket_format(&registry), "((A)&&(B))||(KOUTOFN[2/3](C),(D),(E))");
//! ```

use crate::error::{Error, Result};
use crate::fault::FaultRegistry;
use crate::types::FaultModeId;
use crate::utils::k_subsets;

const AND_MARK: char = '&';
const OR_MARK: char = '|';
const NOT_MARK: char = '!';
const KOUTOFN_TAG: &str = "KOUTOFN[";
const ENABLING_SUFFIX: &str = ">0";
const RESERVED: &[char] = &['(', ')', '[', ']', '&', '|', '!', '/', ','];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Leaf(FaultModeId),
    Not(Box<Expr>),
    And(Vec<Expr>),
    Or(Vec<Expr>),
    /// At least `k` of the `n` children hold.
    KofN {
        k: u32,
        n: u32,
        children: Vec<Expr>,
    },
}

// Constructors
impl Expr {
    pub fn leaf(id: FaultModeId) -> Self {
        Expr::Leaf(id)
    }

    pub fn not(inner: Expr) -> Self {
        Expr::Not(Box::new(inner))
    }

    pub fn and(children: impl IntoIterator<Item = Expr>) -> Self {
        Expr::And(children.into_iter().collect())
    }

    pub fn or(children: impl IntoIterator<Item = Expr>) -> Self {
        Expr::Or(children.into_iter().collect())
    }

    /// Builds a K-out-of-N operator over `children`, with `n = children.len()`.
    pub fn k_of_n(k: u32, children: impl IntoIterator<Item = Expr>) -> Result<Self> {
        let children: Vec<Expr> = children.into_iter().collect();
        let n = children.len() as u32;
        if k == 0 || k > n {
            return Err(Error::malformed(
                &format!("{}/{}", k, n),
                "K must satisfy 1 <= K <= N",
            ));
        }
        Ok(Expr::KofN { k, n, children })
    }
}

// Getters
impl Expr {
    /// Operands of an operator; empty for a leaf.
    pub fn children(&self) -> &[Expr] {
        match self {
            Expr::Leaf(_) => &[],
            Expr::Not(inner) => std::slice::from_ref(inner.as_ref()),
            Expr::And(children) | Expr::Or(children) => children,
            Expr::KofN { children, .. } => children,
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, Expr::Leaf(_))
    }

    /// Evaluates the expression, reading each leaf's state from `state`.
    pub fn compute<F>(&self, state: &F) -> bool
    where
        F: Fn(FaultModeId) -> bool,
    {
        match self {
            Expr::Leaf(id) => state(*id),
            Expr::Not(inner) => !inner.compute(state),
            Expr::And(children) => children.iter().all(|c| c.compute(state)),
            Expr::Or(children) => children.iter().any(|c| c.compute(state)),
            Expr::KofN { k, children, .. } => {
                let active = children.iter().filter(|c| c.compute(state)).count();
                active >= *k as usize
            }
        }
    }

    /// Distinct leaves in first-occurrence order.
    pub fn input_fault_modes(&self) -> Vec<FaultModeId> {
        let mut out = Vec::new();
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves(&self, out: &mut Vec<FaultModeId>) {
        match self {
            Expr::Leaf(id) => {
                if !out.contains(id) {
                    out.push(*id);
                }
            }
            _ => {
                for child in self.children() {
                    child.collect_leaves(out);
                }
            }
        }
    }

    /// Whether the expression is free of negation.
    pub fn is_coherent(&self) -> bool {
        match self {
            Expr::Not(_) => false,
            _ => self.children().iter().all(Expr::is_coherent),
        }
    }
}

// Serialization
impl Expr {
    /// Flat infix form, e.g. `(A)&&(!B)` or `2/3(A,B,C)`.
    pub fn to_simple_string(&self, registry: &FaultRegistry) -> String {
        let mut out = String::new();
        self.write_simple(registry, &mut out);
        out
    }

    fn write_simple(&self, registry: &FaultRegistry, out: &mut String) {
        match self {
            Expr::Leaf(id) => out.push_str(registry.name(*id)),
            Expr::Not(inner) => {
                out.push(NOT_MARK);
                if inner.is_leaf() {
                    inner.write_simple(registry, out);
                } else {
                    out.push('(');
                    inner.write_simple(registry, out);
                    out.push(')');
                }
            }
            Expr::And(children) => write_joined(children, "&&", out, |c, o| c.write_simple(registry, o)),
            Expr::Or(children) => write_joined(children, "||", out, |c, o| c.write_simple(registry, o)),
            Expr::KofN { k, n, children } => {
                out.push_str(&format!("{}/{}(", k, n));
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    child.write_simple(registry, out);
                }
                out.push(')');
            }
        }
    }

    /// Fully bracketed form: every operand of every operator is parenthesized.
    pub fn to_bracket_format(&self, registry: &FaultRegistry) -> String {
        let mut out = String::new();
        self.write_bracketed(registry, &mut out);
        out
    }

    fn write_bracketed(&self, registry: &FaultRegistry, out: &mut String) {
        match self {
            Expr::Leaf(id) => out.push_str(registry.name(*id)),
            Expr::Not(inner) => {
                out.push(NOT_MARK);
                out.push('(');
                inner.write_bracketed(registry, out);
                out.push(')');
            }
            Expr::And(children) => write_joined(children, "&&", out, |c, o| c.write_bracketed(registry, o)),
            Expr::Or(children) => write_joined(children, "||", out, |c, o| c.write_bracketed(registry, o)),
            Expr::KofN { k, n, children } => {
                out.push_str(&format!("{}{}/{}]", KOUTOFN_TAG, k, n));
                write_joined(children, ",", out, |c, o| c.write_bracketed(registry, o));
            }
        }
    }

    /// Enabling-function form used on Petri-net transitions: leaves are
    /// marking tests (`A>0`) and K-out-of-N is expanded into the OR of the
    /// ANDs of all its `k`-subsets.
    pub fn to_enabling_string(&self, registry: &FaultRegistry) -> String {
        let mut out = String::new();
        self.write_enabling(registry, &mut out);
        out
    }

    fn write_enabling(&self, registry: &FaultRegistry, out: &mut String) {
        match self {
            Expr::Leaf(id) => {
                out.push_str(registry.name(*id));
                out.push_str(ENABLING_SUFFIX);
            }
            Expr::Not(inner) => {
                out.push(NOT_MARK);
                out.push('(');
                inner.write_enabling(registry, out);
                out.push(')');
            }
            Expr::And(children) => write_joined(children, "&&", out, |c, o| c.write_enabling(registry, o)),
            Expr::Or(children) => write_joined(children, "||", out, |c, o| c.write_enabling(registry, o)),
            Expr::KofN { k, n, children } => {
                if k == n {
                    write_joined(children, "&&", out, |c, o| c.write_enabling(registry, o));
                } else if *k == 1 {
                    write_joined(children, "||", out, |c, o| c.write_enabling(registry, o));
                } else {
                    let groups = k_subsets(children.len(), *k as usize);
                    write_joined(&groups, "||", out, |group, o| {
                        let members: Vec<&Expr> = group.iter().map(|&i| &children[i]).collect();
                        write_joined(&members, "&&", o, |c, o| c.write_enabling(registry, o));
                    });
                }
            }
        }
    }
}

/// Writes `(item)sep(item)...`.
fn write_joined<T, F>(items: &[T], sep: &str, out: &mut String, mut write_item: F)
where
    F: FnMut(&T, &mut String),
{
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.push_str(sep);
        }
        out.push('(');
        write_item(item, out);
        out.push(')');
    }
}

// Parsing
impl Expr {
    /// Parses `text`, resolving leaves through `registry`.
    ///
    /// Unknown leaf names are registered in `registry` as internal fault
    /// modes without a distribution.
    pub fn parse(text: &str, registry: &mut FaultRegistry) -> Result<Expr> {
        // Single-character markers keep operator splitting independent of parentheses.
        let normalized = text.replace("&&", "&").replace("||", "|");
        check_balanced(text, &normalized)?;

        let mut parser = Parser { source: text, registry };
        parser.parse(&normalized)
    }
}

struct Parser<'a> {
    source: &'a str,
    registry: &'a mut FaultRegistry,
}

impl Parser<'_> {
    fn error(&self, reason: impl Into<String>) -> Error {
        Error::malformed(self.source, reason)
    }

    fn parse(&mut self, text: &str) -> Result<Expr> {
        let text = strip_enclosing(text.trim());
        if text.is_empty() {
            return Err(self.error("empty operand"));
        }

        if let Some(op) = outer_operator(text) {
            let children = split_top_level(text, op)
                .into_iter()
                .map(|operand| self.parse(operand))
                .collect::<Result<Vec<_>>>()?;
            return Ok(if op == AND_MARK {
                Expr::And(children)
            } else {
                Expr::Or(children)
            });
        }

        if let Some(rest) = text.strip_prefix(NOT_MARK) {
            return self.parse_not(rest);
        }
        if let Some(rest) = text.strip_prefix(KOUTOFN_TAG) {
            return self.parse_bracketed_k_of_n(rest);
        }
        if text.contains('/') {
            return self.parse_k_of_n(text);
        }
        self.parse_leaf(text)
    }

    /// Operand of `!`: a parenthesized sub-expression or a single token.
    fn parse_not(&mut self, rest: &str) -> Result<Expr> {
        let rest = rest.trim_start();
        let operand = if rest.starts_with('(') {
            let close = matching_paren(rest, 0).ok_or_else(|| self.error("unbalanced parentheses"))?;
            if !rest[close + 1..].trim().is_empty() {
                return Err(self.error(format!("unexpected text after negated operand `{}`", rest)));
            }
            &rest[1..close]
        } else {
            rest
        };
        Ok(Expr::not(self.parse(operand)?))
    }

    /// `K/N(op1,...,opN)`.
    fn parse_k_of_n(&mut self, text: &str) -> Result<Expr> {
        let slash = text.find('/').ok_or_else(|| self.error("missing `/` in K/N"))?;
        let open = text.find('(').ok_or_else(|| self.error("missing operand list after K/N"))?;
        if open < slash {
            return Err(self.error(format!("invalid K/N operator `{}`", text)));
        }
        let k = self.parse_count(&text[..slash])?;
        let n = self.parse_count(&text[slash + 1..open])?;
        let close = matching_paren(text, open).ok_or_else(|| self.error("unbalanced parentheses"))?;
        if close != text.len() - 1 {
            return Err(self.error(format!("unexpected text after K/N operands `{}`", text)));
        }
        let operands = split_top_level(&text[open + 1..close], ',');
        self.finish_k_of_n(k, n, operands)
    }

    /// `KOUTOFN[K/N](op1),...,(opN)`, with the tag already stripped.
    fn parse_bracketed_k_of_n(&mut self, rest: &str) -> Result<Expr> {
        let end = rest.find(']').ok_or_else(|| self.error("unterminated KOUTOFN tag"))?;
        let (k, n) = rest[..end]
            .split_once('/')
            .ok_or_else(|| self.error("KOUTOFN tag must be of the form [K/N]"))?;
        let k = self.parse_count(k)?;
        let n = self.parse_count(n)?;
        let operands = split_top_level(&rest[end + 1..], ',');
        self.finish_k_of_n(k, n, operands)
    }

    fn finish_k_of_n(&mut self, k: u32, n: u32, operands: Vec<&str>) -> Result<Expr> {
        if k == 0 || k > n {
            return Err(self.error(format!("K/N requires 1 <= K <= N, got {}/{}", k, n)));
        }
        if operands.len() != n as usize {
            return Err(self.error(format!(
                "K/N with N = {} has {} operands",
                n,
                operands.len()
            )));
        }
        let children = operands
            .into_iter()
            .map(|operand| self.parse(operand))
            .collect::<Result<Vec<_>>>()?;
        Ok(Expr::KofN { k, n, children })
    }

    fn parse_count(&self, text: &str) -> Result<u32> {
        text.trim()
            .parse::<u32>()
            .map_err(|_| self.error(format!("`{}` is not a valid K/N count", text.trim())))
    }

    fn parse_leaf(&mut self, text: &str) -> Result<Expr> {
        let name = text.strip_suffix(ENABLING_SUFFIX).unwrap_or(text).trim();
        if name.is_empty() || name.contains(RESERVED) || name.contains(char::is_whitespace) {
            return Err(self.error(format!("invalid fault mode name `{}`", name)));
        }
        Ok(Expr::Leaf(self.registry.resolve_or_insert(name)))
    }
}

fn check_balanced(source: &str, text: &str) -> Result<()> {
    let mut depth = 0i32;
    for c in text.chars() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth < 0 {
                    return Err(Error::malformed(source, "unbalanced parentheses"));
                }
            }
            _ => {}
        }
    }
    if depth != 0 {
        return Err(Error::malformed(source, "unbalanced parentheses"));
    }
    Ok(())
}

/// Byte index of the `)` matching the `(` at `open`.
pub(crate) fn matching_paren(text: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, b) in text.bytes().enumerate().skip(open) {
        match b {
            b'(' => depth += 1,
            b')' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Removes parentheses that enclose the whole text, repeatedly.
fn strip_enclosing(mut text: &str) -> &str {
    while text.starts_with('(') && matching_paren(text, 0) == Some(text.len() - 1) {
        text = text[1..text.len() - 1].trim();
    }
    text
}

/// The last binary operator marker found outside parentheses.
fn outer_operator(text: &str) -> Option<char> {
    let mut depth = 0usize;
    let mut found = None;
    for c in text.chars() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            AND_MARK | OR_MARK if depth == 0 => found = Some(c),
            _ => {}
        }
    }
    found
}

/// Splits at every occurrence of `sep` outside parentheses.
fn split_top_level(text: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in text.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            _ if c == sep && depth == 0 => {
                parts.push(&text[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&text[start..]);
    parts
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use test_log::test;

    use super::*;

    fn parse(text: &str) -> (Expr, FaultRegistry) {
        let mut registry = FaultRegistry::new();
        let expr = Expr::parse(text, &mut registry).unwrap();
        (expr, registry)
    }

    fn id(registry: &FaultRegistry, name: &str) -> FaultModeId {
        registry.lookup(name).unwrap()
    }

    /// Truth table of `expr` over the given leaf names, in a fixed order.
    fn truth_table(expr: &Expr, registry: &FaultRegistry, names: &[&str]) -> Vec<bool> {
        (0..1u32 << names.len())
            .map(|bits| {
                let active: HashSet<FaultModeId> = names
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| bits & (1 << i) != 0)
                    .filter_map(|(_, name)| registry.lookup(name))
                    .collect();
                expr.compute(&|id| active.contains(&id))
            })
            .collect()
    }

    #[test]
    fn test_parse_leaf_registers_fault() {
        let (expr, registry) = parse("  Valve  ");
        assert_eq!(expr, Expr::Leaf(id(&registry, "Valve")));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_parse_and_or() {
        let (expr, registry) = parse("A && B && C");
        let (a, b, c) = (id(&registry, "A"), id(&registry, "B"), id(&registry, "C"));
        assert_eq!(expr, Expr::and([Expr::leaf(a), Expr::leaf(b), Expr::leaf(c)]));

        let (expr, registry) = parse("(A || B) && C");
        let (a, b, c) = (id(&registry, "A"), id(&registry, "B"), id(&registry, "C"));
        assert_eq!(
            expr,
            Expr::and([Expr::or([Expr::leaf(a), Expr::leaf(b)]), Expr::leaf(c)])
        );
    }

    #[test]
    fn test_last_operator_is_root() {
        // Without brackets, the last top-level operator wins.
        let (expr, registry) = parse("A && B || C");
        let (a, b, c) = (id(&registry, "A"), id(&registry, "B"), id(&registry, "C"));
        assert_eq!(
            expr,
            Expr::or([Expr::and([Expr::leaf(a), Expr::leaf(b)]), Expr::leaf(c)])
        );
    }

    #[test]
    fn test_parse_reuses_known_faults() {
        let mut registry = FaultRegistry::new();
        let a = registry.declare_internal("A", Some("exp(1)")).unwrap();
        let expr = Expr::parse("A || (A && B)", &mut registry).unwrap();
        assert_eq!(registry.len(), 2);
        assert_eq!(expr.input_fault_modes(), vec![a, id(&registry, "B")]);
    }

    #[test]
    fn test_parse_not() {
        let (expr, registry) = parse("!A");
        assert_eq!(expr, Expr::not(Expr::leaf(id(&registry, "A"))));

        let (expr, registry) = parse("!(A || B) && C");
        let (a, b, c) = (id(&registry, "A"), id(&registry, "B"), id(&registry, "C"));
        assert_eq!(
            expr,
            Expr::and([
                Expr::not(Expr::or([Expr::leaf(a), Expr::leaf(b)])),
                Expr::leaf(c)
            ])
        );

        let (expr, registry) = parse("!!A");
        assert_eq!(expr, Expr::not(Expr::not(Expr::leaf(id(&registry, "A")))));
    }

    #[test]
    fn test_parse_k_of_n() {
        let (expr, registry) = parse("2/3(A, B, C)");
        let (a, b, c) = (id(&registry, "A"), id(&registry, "B"), id(&registry, "C"));
        assert_eq!(
            expr,
            Expr::KofN {
                k: 2,
                n: 3,
                children: vec![Expr::leaf(a), Expr::leaf(b), Expr::leaf(c)],
            }
        );

        let (expr, registry) = parse("10/12(A1,A2,A3,A4,A5,A6,A7,A8,A9,A10,A11,A12)");
        assert!(matches!(expr, Expr::KofN { k: 10, n: 12, .. }));
        assert_eq!(registry.len(), 12);
    }

    #[test]
    fn test_parse_nested_k_of_n() {
        let (expr, registry) = parse("D && 2/3(A, (B || E), 1/2(C, F))");
        assert_eq!(registry.len(), 6);
        let Expr::And(children) = &expr else {
            panic!("expected AND, got {:?}", expr);
        };
        assert!(matches!(&children[1], Expr::KofN { k: 2, n: 3, .. }));
    }

    #[test]
    fn test_parse_bracketed_k_of_n() {
        let (expr, registry) = parse("KOUTOFN[2/3](A),(B),(C)");
        assert_eq!(expr.to_simple_string(&registry), "2/3(A,B,C)");
    }

    #[test]
    fn test_parse_enabling_leaves() {
        let (expr, registry) = parse("(A>0)&&(B>0)");
        assert_eq!(expr.to_simple_string(&registry), "(A)&&(B)");
    }

    #[test]
    fn test_parse_errors() {
        let cases = [
            "(A && B",
            "A && B)",
            ")A(",
            "A && ",
            "",
            "()",
            "4/3(A,B,C)",
            "0/2(A,B)",
            "2/3(A,B)",
            "x/3(A,B,C)",
            "2/3(A,B,C) D",
            "!(A) B",
            "KOUTOFN[2/3",
            "KOUTOFN[2](A),(B)",
            "A B",
            "A[1]",
        ];
        for case in cases {
            let mut registry = FaultRegistry::new();
            let result = Expr::parse(case, &mut registry);
            assert!(
                matches!(result, Err(Error::MalformedExpression { .. })),
                "expected error for {:?}, got {:?}",
                case,
                result
            );
        }
    }

    #[test]
    fn test_compute() {
        let (expr, registry) = parse("(A && B) || !C");
        let (a, b, c) = (id(&registry, "A"), id(&registry, "B"), id(&registry, "C"));
        assert!(expr.compute(&|_| false));
        assert!(!expr.compute(&|id| id == c));
        assert!(expr.compute(&|id| id == a || id == b || id == c));
        assert!(!expr.compute(&|id| id == a || id == c));
    }

    #[test]
    fn test_compute_k_of_n() {
        let (expr, registry) = parse("2/3(A,B,C)");
        assert_eq!(
            truth_table(&expr, &registry, &["A", "B", "C"]),
            // bits: CBA
            vec![false, false, false, true, false, true, true, true]
        );
    }

    #[test]
    fn test_to_strings() {
        let (expr, registry) = parse("(A && !B) || 2/3(C, D, !(E || F))");
        assert_eq!(
            expr.to_simple_string(&registry),
            "((A)&&(!B))||(2/3(C,D,!((E)||(F))))"
        );
        assert_eq!(
            expr.to_bracket_format(&registry),
            "((A)&&(!(B)))||(KOUTOFN[2/3](C),(D),(!((E)||(F))))"
        );
    }

    #[test]
    fn test_enabling_string_expands_k_of_n() {
        let (expr, registry) = parse("2/3(A,B,C)");
        assert_eq!(
            expr.to_enabling_string(&registry),
            "((A>0)&&(B>0))||((A>0)&&(C>0))||((B>0)&&(C>0))"
        );

        let (expr, registry) = parse("3/3(A,B,C)");
        assert_eq!(expr.to_enabling_string(&registry), "(A>0)&&(B>0)&&(C>0)");

        let (expr, registry) = parse("1/2(A,B)");
        assert_eq!(expr.to_enabling_string(&registry), "(A>0)||(B>0)");
    }

    #[test]
    fn test_round_trip_all_forms() {
        let cases = [
            "A",
            "!A",
            "A && B",
            "(A || B) && C",
            "A && B || C",
            "!(A && B) || C",
            "2/3(A, B, C)",
            "1/3(A, B && C, D)",
            "3/4(A, B, C, !D)",
            "(A || 2/3(B, C, D)) && !(E || !A)",
            "2/4(A, 1/2(B, C), D && E, F)",
        ];
        for case in cases {
            let (expr, registry) = parse(case);
            let names: Vec<String> = registry.iter().map(|f| f.name().to_string()).collect();
            let names: Vec<&str> = names.iter().map(String::as_str).collect();
            let expected = truth_table(&expr, &registry, &names);

            for text in [
                expr.to_bracket_format(&registry),
                expr.to_simple_string(&registry),
                expr.to_enabling_string(&registry),
            ] {
                let mut fresh = FaultRegistry::new();
                let reparsed = Expr::parse(&text, &mut fresh)
                    .unwrap_or_else(|e| panic!("cannot reparse {:?} from {:?}: {}", text, case, e));
                assert_eq!(
                    truth_table(&reparsed, &fresh, &names),
                    expected,
                    "{:?} does not match {:?}",
                    text,
                    case
                );
            }
        }
    }

    #[test]
    fn test_bracket_round_trip_is_structural() {
        let (expr, registry) = parse("(A || 2/3(B, C, D)) && !(E || F)");
        let text = expr.to_bracket_format(&registry);
        let mut fresh = FaultRegistry::new();
        let reparsed = Expr::parse(&text, &mut fresh).unwrap();
        assert_eq!(reparsed.to_bracket_format(&fresh), text);
    }

    #[test]
    fn test_k_of_n_constructor() {
        let mut registry = FaultRegistry::new();
        let leaves: Vec<Expr> = ["A", "B", "C"]
            .iter()
            .map(|n| Expr::leaf(registry.resolve_or_insert(n)))
            .collect();
        assert!(Expr::k_of_n(0, leaves.clone()).is_err());
        assert!(Expr::k_of_n(4, leaves.clone()).is_err());
        let expr = Expr::k_of_n(2, leaves).unwrap();
        assert_eq!(expr.children().len(), 3);
    }

    #[test]
    fn test_is_coherent() {
        assert!(parse("A && 2/3(B, C, D)").0.is_coherent());
        assert!(!parse("A && !B").0.is_coherent());
    }
}

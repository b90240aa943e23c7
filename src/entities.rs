//! Interval-based decomposition of fully bracketed activation functions.
//!
//! Given the output of [`Expr::to_bracket_format`], [`entities`] maps every
//! sub-expression to its immediate operands, identifying sub-expressions by
//! parenthesis depth alone. The map is ordered bottom-up: an entry appears only
//! after every entry for the sub-expressions it contains, and the whole
//! expression comes last. [`assemble`] relies on that order to rebuild an
//! [`Expr`] in a single pass.
//!
//! ```
//! use faultflow::entities::{entities, Entity, GateTag};
//!
//! let map = entities("((A)&&(B))||(C)").unwrap();
//! let keys: Vec<&str> = map.keys().map(String::as_str).collect();
//! assert_eq!(keys, ["A", "B", "(A)&&(B)", "C", "((A)&&(B))||(C)"]);
//! assert_eq!(map["(A)&&(B)"].tokens(), ["AND", "A", "B"]);
//! assert_eq!(map["A"], Entity::Leaf);
//! ```

use std::collections::HashMap;
use std::fmt;

use indexmap::IndexMap;

use crate::error::{Error, Result};
use crate::expr::{matching_paren, Expr};
use crate::fault::FaultRegistry;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum GateTag {
    And,
    Or,
    Not,
    KofN { k: u32, n: u32 },
}

impl fmt::Display for GateTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GateTag::And => write!(f, "AND"),
            GateTag::Or => write!(f, "OR"),
            GateTag::Not => write!(f, "NOT"),
            GateTag::KofN { k, n } => write!(f, "{}/{}", k, n),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entity {
    Leaf,
    /// An operator over sub-expressions; each operand is the key of another entity.
    Gate { tag: GateTag, operands: Vec<String> },
}

impl Entity {
    /// Flat token list: the gate tag followed by the operand texts.
    /// Leaves have no tokens.
    pub fn tokens(&self) -> Vec<String> {
        match self {
            Entity::Leaf => Vec::new(),
            Entity::Gate { tag, operands } => {
                let mut tokens = Vec::with_capacity(operands.len() + 1);
                tokens.push(tag.to_string());
                tokens.extend(operands.iter().cloned());
                tokens
            }
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, Entity::Leaf)
    }
}

/// Decomposes a fully bracketed expression into its sub-expressions, keyed by
/// their text without the enclosing parentheses.
pub fn entities(bracketed: &str) -> Result<IndexMap<String, Entity>> {
    let bracketed = bracketed.trim();
    let mut map = IndexMap::new();

    // Closing order of the intervals is already bottom-up.
    for (open, close) in paren_intervals(bracketed)? {
        let key = entity_key(&bracketed[open..=close]);
        if !map.contains_key(key) {
            let entity = decompose(bracketed, key)?;
            map.insert(key.to_string(), entity);
        }
    }

    let root = entity_key(bracketed);
    if !map.contains_key(root) {
        let entity = decompose(bracketed, root)?;
        map.insert(root.to_string(), entity);
    }
    Ok(map)
}

/// Key under which [`entities`] files the whole expression.
pub fn root_key(bracketed: &str) -> &str {
    entity_key(bracketed.trim())
}

/// Rebuilds the expression rooted at `root` from an entity map in one pass.
pub fn assemble(entities: &IndexMap<String, Entity>, root: &str, registry: &mut FaultRegistry) -> Result<Expr> {
    let mut built: HashMap<&str, Expr> = HashMap::with_capacity(entities.len());

    for (key, entity) in entities {
        let expr = match entity {
            Entity::Leaf => Expr::parse(key, registry)?,
            Entity::Gate { tag, operands } => {
                let children = operands
                    .iter()
                    .map(|operand| {
                        built.get(operand.as_str()).cloned().ok_or_else(|| {
                            Error::malformed(key, format!("operand `{}` is not defined before use", operand))
                        })
                    })
                    .collect::<Result<Vec<_>>>()?;
                match *tag {
                    GateTag::And => Expr::And(children),
                    GateTag::Or => Expr::Or(children),
                    GateTag::Not => match <[Expr; 1]>::try_from(children) {
                        Ok([inner]) => Expr::not(inner),
                        Err(_) => return Err(Error::malformed(key, "NOT takes exactly one operand")),
                    },
                    GateTag::KofN { k, n } => Expr::KofN { k, n, children },
                }
            }
        };
        built.insert(key.as_str(), expr);
    }

    built
        .remove(root)
        .ok_or_else(|| Error::malformed(root, "root is not part of the entity map"))
}

/// Strips one pair of parentheses enclosing the whole text.
fn entity_key(text: &str) -> &str {
    if text.starts_with('(') && matching_paren(text, 0) == Some(text.len() - 1) {
        &text[1..text.len() - 1]
    } else {
        text
    }
}

/// Matching parenthesis pairs, in closing order.
fn paren_intervals(text: &str) -> Result<Vec<(usize, usize)>> {
    let mut open = Vec::new();
    let mut intervals = Vec::new();
    for (i, b) in text.bytes().enumerate() {
        match b {
            b'(' => open.push(i),
            b')' => {
                let start = open
                    .pop()
                    .ok_or_else(|| Error::malformed(text, "unbalanced parentheses"))?;
                intervals.push((start, i));
            }
            _ => {}
        }
    }
    if !open.is_empty() {
        return Err(Error::malformed(text, "unbalanced parentheses"));
    }
    Ok(intervals)
}

/// Splits `key` into its top-level operands and reads the connective from the
/// text left over.
fn decompose(source: &str, key: &str) -> Result<Entity> {
    let mut operands = Vec::new();
    let mut residual = String::new();
    let mut pos = 0;
    while let Some(offset) = key[pos..].find('(') {
        let open = pos + offset;
        let close = matching_paren(key, open).ok_or_else(|| Error::malformed(source, "unbalanced parentheses"))?;
        residual.push_str(&key[pos..open]);
        operands.push(key[open + 1..close].to_string());
        pos = close + 1;
    }
    residual.push_str(&key[pos..]);
    let connective: String = residual.chars().filter(|c| !c.is_whitespace()).collect();

    if operands.is_empty() {
        return Ok(Entity::Leaf);
    }

    let separators = operands.len() - 1;
    let tag = if operands.len() >= 2 && connective == "&&".repeat(separators) {
        GateTag::And
    } else if operands.len() >= 2 && connective == "||".repeat(separators) {
        GateTag::Or
    } else if operands.len() == 1 && connective == "!" {
        GateTag::Not
    } else if let Some(tag) = k_of_n_tag(&connective, operands.len()) {
        tag
    } else {
        return Err(Error::malformed(
            source,
            format!("cannot identify the connective of `{}`", key),
        ));
    };
    Ok(Entity::Gate { tag, operands })
}

/// Reads `KOUTOFN[k/n],,...` with one comma between consecutive operands.
fn k_of_n_tag(connective: &str, operands: usize) -> Option<GateTag> {
    let rest = connective.strip_prefix("KOUTOFN[")?;
    let (counts, commas) = rest.split_once(']')?;
    let (k, n) = counts.split_once('/')?;
    let k: u32 = k.parse().ok()?;
    let n: u32 = n.parse().ok()?;
    if k == 0 || k > n || n as usize != operands || commas != ",".repeat(operands - 1) {
        return None;
    }
    Some(GateTag::KofN { k, n })
}

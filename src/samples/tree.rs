//! Binary tree and its in-order walk
//!
//! The walk is the canonical self-referential generator: each subtree is
//! visited by a fresh generator of the same body, whose values the parent
//! re-yields.

use std::fmt;
use std::str::FromStr;

use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser;
use thiserror::Error;

use crate::allocator::ContinuationAllocator;
use crate::context::Context;
use crate::error::CoroutineResult;
use crate::recursive::RecursiveCoroutine;

/* ===================== Tree ===================== */

/// Binary tree of integers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tree {
    Empty,
    Node {
        value: i64,
        left: Box<Tree>,
        right: Box<Tree>,
    },
}

impl Tree {
    pub fn leaf(value: i64) -> Self {
        Self::node(value, Tree::Empty, Tree::Empty)
    }

    pub fn node(value: i64, left: Tree, right: Tree) -> Self {
        Tree::Node {
            value,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        match self {
            Tree::Empty => 0,
            Tree::Node { left, right, .. } => 1 + left.len() + right.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Tree::Empty)
    }

    /// Parse the literal form: `_`, `7`, or `{value:[left,right]}`.
    pub fn parse(source: &str) -> Result<Tree, ParseError> {
        let mut pairs = TreeParser::parse(Rule::tree_text, source)?;
        let text = next_pair(pairs.next())?;
        build_tree(next_pair(text.into_inner().next())?)
    }
}

impl FromStr for Tree {
    type Err = ParseError;

    fn from_str(source: &str) -> Result<Self, Self::Err> {
        Tree::parse(source)
    }
}

impl fmt::Display for Tree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tree::Empty => write!(f, "_"),
            Tree::Node { value, left, right } if left.is_empty() && right.is_empty() => {
                write!(f, "{}", value)
            }
            Tree::Node { value, left, right } => write!(f, "{{{}:[{},{}]}}", value, left, right),
        }
    }
}

/* ===================== PEST Parser ===================== */

#[derive(Parser)]
#[grammar = "samples/tree.pest"]
struct TreeParser;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("{0}")]
    Syntax(String),
    #[error("node value `{0}` does not fit in a 64-bit integer")]
    Value(String),
}

impl From<pest::error::Error<Rule>> for ParseError {
    fn from(err: pest::error::Error<Rule>) -> Self {
        ParseError::Syntax(err.to_string())
    }
}

fn next_pair(pair: Option<Pair<'_, Rule>>) -> Result<Pair<'_, Rule>, ParseError> {
    pair.ok_or_else(|| ParseError::Syntax("unexpected end of tree".to_string()))
}

fn parse_value(pair: &Pair<'_, Rule>) -> Result<i64, ParseError> {
    pair.as_str()
        .parse()
        .map_err(|_| ParseError::Value(pair.as_str().to_string()))
}

fn build_tree(pair: Pair<'_, Rule>) -> Result<Tree, ParseError> {
    let inner = next_pair(pair.into_inner().next())?;

    match inner.as_rule() {
        Rule::empty => Ok(Tree::Empty),
        Rule::leaf => Ok(Tree::leaf(parse_value(&inner)?)),
        Rule::branch => {
            let mut parts = inner.into_inner();
            let value = parse_value(&next_pair(parts.next())?)?;
            let left = build_tree(next_pair(parts.next())?)?;
            let right = build_tree(next_pair(parts.next())?)?;
            Ok(Tree::node(value, left, right))
        }
        rule => Err(ParseError::Syntax(format!("unexpected tree element: {:?}", rule))),
    }
}

/* ===================== In-order Walk ===================== */

/// Yield the values of `tree` in order: left subtree, node, right subtree.
///
/// Every non-empty subtree gets its own [`RecursiveCoroutine`] running this
/// same body, with storage from `allocator`.
pub async fn inorder<A>(mut ctx: Context<(), i64>, tree: &Tree, allocator: &A)
where
    A: ContinuationAllocator + ?Sized,
{
    let Tree::Node { value, left, right } = tree else {
        return;
    };

    if let Err(err) = descend(&mut ctx, left, allocator).await {
        return ctx.fail(err);
    }
    ctx.yield_(*value).await;
    if let Err(err) = descend(&mut ctx, right, allocator).await {
        ctx.fail(err);
    }
}

async fn descend<A>(ctx: &mut Context<(), i64>, subtree: &Tree, allocator: &A) -> CoroutineResult<()>
where
    A: ContinuationAllocator + ?Sized,
{
    if subtree.is_empty() {
        return Ok(());
    }

    let mut child =
        RecursiveCoroutine::new(move |c| inorder(c, subtree, allocator), allocator)?.with_default_message(());
    ctx.yield_from(&mut child).await?;
    child.dispose();
    Ok(())
}

//! Query Evaluation Engine
//!
//! Evaluates compiled expressions against one or more roots of any
//! [`DocumentAccess`] tree.
//!
//! - Absolute paths start at a virtual document whose children are the roots
//! - Relative paths start at each root
//! - Node sets come out in document order with no duplicate node identities
//! - Type mismatches inside predicates degrade to `false`, never to errors

use super::axes::{descendant_or_self, matches_node_test, navigate, Item};
use super::compiler::{Expression, QueryOptions};
use super::functions;
use super::parser::{ArithmeticOp, CompareOp, Expr, NameTest, NodeTest, PathExpr, Step};
use super::value::{format_number, Value};
use crate::dom::{parse_number, DocumentAccess, NodeId};
use crate::error::EvaluationError;
use std::collections::HashMap;
use tracing::trace;

/// Evaluation context - generic over document type
pub struct EvalContext<'a, D: DocumentAccess + ?Sized> {
    pub doc: &'a D,
    /// Context node
    pub node: NodeId,
    /// 1-based position among the step's candidates
    pub position: usize,
    /// Number of candidates
    pub size: usize,
}

/// Evaluate a node-selecting expression with default limits
pub fn evaluate<D: DocumentAccess + ?Sized>(
    doc: &D,
    roots: &[NodeId],
    expr: &Expression,
) -> Result<Vec<NodeId>, EvaluationError> {
    evaluate_with(doc, roots, expr, &QueryOptions::default())
}

/// Evaluate a node-selecting expression
///
/// Expressions yielding anything but nodes fail with
/// [`EvaluationError::NotANodeSet`].
pub fn evaluate_with<D: DocumentAccess + ?Sized>(
    doc: &D,
    roots: &[NodeId],
    expr: &Expression,
    options: &QueryOptions,
) -> Result<Vec<NodeId>, EvaluationError> {
    evaluate_value_with(doc, roots, expr, options)?
        .into_nodeset()
        .map_err(|other| EvaluationError::NotANodeSet(other.type_name()))
}

/// Evaluate any expression to its raw value with default limits
pub fn evaluate_value<D: DocumentAccess + ?Sized>(
    doc: &D,
    roots: &[NodeId],
    expr: &Expression,
) -> Result<Value, EvaluationError> {
    evaluate_value_with(doc, roots, expr, &QueryOptions::default())
}

/// Evaluate any expression to its raw value
///
/// Paths and unions start from all roots at once. Any other expression is
/// evaluated with the first root as its context node. At least one root is
/// required.
pub fn evaluate_value_with<D: DocumentAccess + ?Sized>(
    doc: &D,
    roots: &[NodeId],
    expr: &Expression,
    options: &QueryOptions,
) -> Result<Value, EvaluationError> {
    if roots.is_empty() {
        return Err(EvaluationError::InvalidRoot("no evaluation root".to_string()));
    }
    check_roots(doc, roots)?;
    let mut evaluator = Evaluator::new(doc, roots, options.max_visited_nodes);
    let starts: Vec<Item> = roots.iter().map(|&r| Item::Node(r)).collect();

    let value = match expr.ast() {
        Expr::Path(path) => evaluator.eval_path(path, &starts)?,
        Expr::Union(paths) => evaluator.eval_union(paths, &starts)?,
        Expr::AttributeRef(name) => Value::Attributes(attribute_values(doc, &starts, name)),
        other => {
            let ctx = EvalContext {
                doc,
                node: roots[0],
                position: 1,
                size: 1,
            };
            evaluator.eval(other, &ctx)?
        }
    };

    trace!(
        expression = expr.source(),
        roots = roots.len(),
        visited = evaluator.visited,
        result = value.type_name(),
        "evaluated expression"
    );
    Ok(value)
}

/// Keep the nodes for which `predicate` holds
///
/// Each node is its own context; position and size refer to `nodes`.
pub fn filter<D: DocumentAccess + ?Sized>(
    doc: &D,
    roots: &[NodeId],
    nodes: &[NodeId],
    predicate: &Expr,
) -> Result<Vec<NodeId>, EvaluationError> {
    check_roots(doc, roots)?;
    check_roots(doc, nodes)?;
    let mut evaluator = Evaluator::new(doc, roots, None);
    evaluator.filter_candidates(nodes, std::slice::from_ref(predicate))
}

fn check_roots<D: DocumentAccess + ?Sized>(doc: &D, roots: &[NodeId]) -> Result<(), EvaluationError> {
    match roots.iter().find(|&&r| !doc.contains(r)) {
        Some(root) => Err(EvaluationError::InvalidRoot(format!(
            "node {} is not in this document",
            root
        ))),
        None => Ok(()),
    }
}

/// Per-evaluation state
struct Evaluator<'a, D: DocumentAccess + ?Sized> {
    doc: &'a D,
    roots: &'a [NodeId],
    limit: Option<usize>,
    visited: usize,
    /// Pre-order rank of every element, built on first sort
    order: Option<HashMap<NodeId, usize>>,
}

impl<'a, D: DocumentAccess + ?Sized> Evaluator<'a, D> {
    fn new(doc: &'a D, roots: &'a [NodeId], limit: Option<usize>) -> Self {
        Evaluator {
            doc,
            roots,
            limit,
            visited: 0,
            order: None,
        }
    }

    fn visit(&mut self, count: usize) -> Result<(), EvaluationError> {
        self.visited += count;
        match self.limit {
            Some(limit) if self.visited > limit => Err(EvaluationError::LimitExceeded { limit }),
            _ => Ok(()),
        }
    }

    fn eval(&mut self, expr: &Expr, ctx: &EvalContext<'_, D>) -> Result<Value, EvaluationError> {
        let here = [Item::Node(ctx.node)];
        match expr {
            Expr::Path(path) => self.eval_path(path, &here),
            Expr::Union(paths) => self.eval_union(paths, &here),
            Expr::AttributeRef(name) => Ok(Value::Attributes(attribute_values(self.doc, &here, name))),

            // Short-circuit, left to right
            Expr::Or(lhs, rhs) => {
                if self.eval(lhs, ctx)?.to_boolean() {
                    return Ok(Value::Boolean(true));
                }
                Ok(Value::Boolean(self.eval(rhs, ctx)?.to_boolean()))
            }
            Expr::And(lhs, rhs) => {
                if !self.eval(lhs, ctx)?.to_boolean() {
                    return Ok(Value::Boolean(false));
                }
                Ok(Value::Boolean(self.eval(rhs, ctx)?.to_boolean()))
            }
            Expr::Not(inner) => Ok(Value::Boolean(!self.eval(inner, ctx)?.to_boolean())),

            Expr::Compare(lhs, op, rhs) => {
                let left = self.eval(lhs, ctx)?;
                let right = self.eval(rhs, ctx)?;
                Ok(Value::Boolean(compare_values(self.doc, &left, *op, &right)))
            }
            Expr::Arithmetic(lhs, op, rhs) => {
                let left = self.eval(lhs, ctx)?.to_number(self.doc);
                let right = self.eval(rhs, ctx)?.to_number(self.doc);
                Ok(Value::Number(arithmetic(left, *op, right)))
            }
            Expr::Negate(inner) => Ok(Value::Number(-self.eval(inner, ctx)?.to_number(self.doc))),

            Expr::FunctionCall(name, args) => {
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    values.push(self.eval(arg, ctx)?);
                }
                functions::call(name, values, ctx)
            }
            Expr::Number(n) => Ok(Value::Number(*n)),
            Expr::String(s) => Ok(Value::String(s.clone())),
        }
    }

    /// Apply each step to the current item set in order
    fn eval_path(&mut self, path: &PathExpr, start: &[Item]) -> Result<Value, EvaluationError> {
        let mut current: Vec<Item> = if path.absolute {
            vec![Item::Document]
        } else {
            start.to_vec()
        };

        for (index, step) in path.steps.iter().enumerate() {
            if let NodeTest::Attribute(name) = &step.test {
                // Always the last step
                return Ok(Value::Attributes(attribute_values(self.doc, &current, name)));
            }
            let nodes = self.eval_step(step, &current)?;
            trace!(
                step = index,
                axis = ?step.axis,
                inputs = current.len(),
                matched = nodes.len(),
                "evaluated step"
            );
            current = nodes.into_iter().map(Item::Node).collect();
        }

        Ok(Value::NodeSet(
            current
                .into_iter()
                .filter_map(|item| match item {
                    Item::Node(id) => Some(id),
                    Item::Document => None,
                })
                .collect(),
        ))
    }

    fn eval_step(&mut self, step: &Step, items: &[Item]) -> Result<Vec<NodeId>, EvaluationError> {
        let doc = self.doc;
        let mut result = Vec::new();
        let mut candidates = Vec::new();
        let mut contributors = 0;

        for &item in items {
            candidates.clear();
            navigate(doc, self.roots, item, step.axis, &mut candidates);
            self.visit(candidates.len())?;
            candidates.retain(|&id| matches_node_test(doc, id, &step.test));
            // Roots arrive in caller order and may nest; positions follow document order
            if item == Item::Document && self.roots.len() > 1 {
                self.sort_document_order(&mut candidates);
            }

            // Position and size are counted per context item
            let kept = if step.predicates.is_empty() {
                std::mem::take(&mut candidates)
            } else {
                self.filter_candidates(&candidates, &step.predicates)?
            };
            if !kept.is_empty() {
                contributors += 1;
                result.extend(kept);
            }
        }

        // One node's axis is already ordered and duplicate-free
        if contributors > 1 {
            self.sort_document_order(&mut result);
        }
        Ok(result)
    }

    /// Candidates for which every predicate holds, all sharing the same positions
    fn filter_candidates(
        &mut self,
        candidates: &[NodeId],
        predicates: &[Expr],
    ) -> Result<Vec<NodeId>, EvaluationError> {
        let size = candidates.len();
        let mut kept = Vec::with_capacity(size);
        'candidates: for (index, &node) in candidates.iter().enumerate() {
            let ctx = EvalContext {
                doc: self.doc,
                node,
                position: index + 1,
                size,
            };
            for predicate in predicates {
                if !self.predicate_holds(predicate, &ctx)? {
                    continue 'candidates;
                }
            }
            kept.push(node);
        }
        Ok(kept)
    }

    /// A number result means "position equals"; anything else is coerced to boolean
    fn predicate_holds(&mut self, predicate: &Expr, ctx: &EvalContext<'_, D>) -> Result<bool, EvaluationError> {
        Ok(match self.eval(predicate, ctx)? {
            Value::Number(n) => n == ctx.position as f64,
            other => other.to_boolean(),
        })
    }

    /// Evaluate each path independently and merge by identity
    fn eval_union(&mut self, paths: &[PathExpr], start: &[Item]) -> Result<Value, EvaluationError> {
        let mut merged = Vec::new();
        for path in paths {
            if let Value::NodeSet(nodes) = self.eval_path(path, start)? {
                merged.extend(nodes);
            }
        }
        self.sort_document_order(&mut merged);
        Ok(Value::NodeSet(merged))
    }

    fn sort_document_order(&mut self, nodes: &mut Vec<NodeId>) {
        let doc = self.doc;
        let roots = self.roots;
        let order = self.order.get_or_insert_with(|| document_order_index(doc, roots));
        nodes.sort_unstable_by_key(|id| order.get(id).copied().unwrap_or(usize::MAX));
        nodes.dedup();
    }
}

/// Pre-order rank of every element under the topmost ancestors of `roots`
fn document_order_index<D: DocumentAccess + ?Sized>(doc: &D, roots: &[NodeId]) -> HashMap<NodeId, usize> {
    let mut tops: Vec<NodeId> = Vec::new();
    for &root in roots {
        let mut top = root;
        while let Some(parent) = doc.parent_of(top) {
            top = parent;
        }
        if !tops.contains(&top) {
            tops.push(top);
        }
    }

    let mut ordered = Vec::new();
    for top in tops {
        descendant_or_self(doc, top, &mut ordered);
    }
    ordered
        .into_iter()
        .enumerate()
        .map(|(rank, id)| (id, rank))
        .collect()
}

/// Values of the matching attributes of every node item
fn attribute_values<D: DocumentAccess + ?Sized>(doc: &D, items: &[Item], name: &NameTest) -> Vec<String> {
    let mut values = Vec::new();
    for item in items {
        let Item::Node(id) = *item else {
            continue;
        };
        for attr in doc.attributes(id) {
            let local = attr.name.rsplit(':').next().unwrap_or(&attr.name);
            if name.matches(local, &attr.name) {
                values.push(attr.value.clone());
            }
        }
    }
    values
}

/// Reduced comparison operand
enum Operand {
    Number(f64),
    Text(String),
}

impl Operand {
    fn number(&self) -> Option<f64> {
        match self {
            Operand::Number(n) => Some(*n),
            Operand::Text(s) => parse_number(s),
        }
    }

    fn text(&self) -> String {
        match self {
            Operand::Number(n) => format_number(*n),
            Operand::Text(s) => s.clone(),
        }
    }
}

/// Sets reduce to their first value; an empty set has none
fn reduce<D: DocumentAccess + ?Sized>(value: &Value, doc: &D) -> Option<Operand> {
    match value {
        Value::Number(n) => Some(Operand::Number(*n)),
        Value::String(s) => Some(Operand::Text(s.clone())),
        other => other.first_value(doc).map(Operand::Text),
    }
}

/// Compare two values
///
/// - A boolean on either side compares both sides as booleans
/// - Otherwise each side reduces to one value; an empty set compares false
/// - Numeric comparison when both sides parse as numbers (NaN compares false)
/// - Else `=`/`!=` compare strings and ordering operators are false
fn compare_values<D: DocumentAccess + ?Sized>(doc: &D, left: &Value, op: CompareOp, right: &Value) -> bool {
    if matches!(left, Value::Boolean(_)) || matches!(right, Value::Boolean(_)) {
        let (l, r) = (left.to_boolean(), right.to_boolean());
        return compare_numbers(f64::from(u8::from(l)), op, f64::from(u8::from(r)));
    }

    let (Some(left), Some(right)) = (reduce(left, doc), reduce(right, doc)) else {
        return false;
    };

    if let (Some(l), Some(r)) = (left.number(), right.number()) {
        return compare_numbers(l, op, r);
    }
    match op {
        CompareOp::Eq => left.text() == right.text(),
        CompareOp::NotEq => left.text() != right.text(),
        _ => false,
    }
}

/// IEEE comparison, except that NaN makes every operator false
fn compare_numbers(l: f64, op: CompareOp, r: f64) -> bool {
    if l.is_nan() || r.is_nan() {
        return false;
    }
    match op {
        CompareOp::Eq => l == r,
        CompareOp::NotEq => l != r,
        CompareOp::Lt => l < r,
        CompareOp::LtEq => l <= r,
        CompareOp::Gt => l > r,
        CompareOp::GtEq => l >= r,
    }
}

fn arithmetic(l: f64, op: ArithmeticOp, r: f64) -> f64 {
    match op {
        ArithmeticOp::Add => l + r,
        ArithmeticOp::Sub => l - r,
        ArithmeticOp::Mul => l * r,
        ArithmeticOp::Div => l / r,
        ArithmeticOp::Mod => l % r,
    }
}

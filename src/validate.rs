//! Offline audit of an element stream, typically a dump written by a third
//! party indexer. Unlike the builder, nothing is rejected: every violation is
//! collected so one pass reports every defect.

use crate::error::GraphError;
use crate::model::{Edge, EdgeLabel, Element, Id, VertexData, VertexLabel};
use crate::schema;
use crate::store::Store;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum ViolationKind {
    DuplicateId,
    UnknownVertex,
    ForwardReference,
    LabelMismatch,
    SchemaViolation,
    CyclicResult,
    MetaData,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    pub kind: ViolationKind,
    pub element_ids: Vec<Id>,
    pub message: String,
}

impl Violation {
    fn meta_data(element_ids: Vec<Id>, message: &str) -> Self {
        Self {
            kind: ViolationKind::MetaData,
            element_ids,
            message: message.to_string(),
        }
    }
}

impl From<GraphError> for Violation {
    fn from(err: GraphError) -> Self {
        let kind = match &err {
            GraphError::DuplicateId(_) => ViolationKind::DuplicateId,
            GraphError::NotFound(_) | GraphError::UnknownVertex { .. } => {
                ViolationKind::UnknownVertex
            }
            GraphError::LabelMismatch { .. } => ViolationKind::LabelMismatch,
            GraphError::SchemaViolation { .. } | GraphError::NoResult { .. } => {
                ViolationKind::SchemaViolation
            }
            GraphError::ForwardReference { .. } => ViolationKind::ForwardReference,
            GraphError::CyclicResult(_) => ViolationKind::CyclicResult,
        };
        let mut element_ids = err.element_ids();
        if let GraphError::LabelMismatch { .. } = &err {
            element_ids.truncate(1);
        }
        Violation {
            kind,
            element_ids,
            message: err.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub violations: Vec<Violation>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.violations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn of_kind(&self, kind: ViolationKind) -> impl Iterator<Item = &Violation> + '_ {
        self.violations
            .iter()
            .filter(move |violation| violation.kind == kind)
    }

    pub fn counts(&self) -> BTreeMap<ViolationKind, usize> {
        let mut counts = BTreeMap::new();
        for violation in &self.violations {
            *counts.entry(violation.kind).or_default() += 1;
        }
        counts
    }
}

/// Validates a complete element sequence in emission order.
pub fn validate<'a>(elements: impl IntoIterator<Item = &'a Element>) -> ValidationReport {
    let mut validator = StreamValidator::new();
    for element in elements {
        validator.check(element);
    }
    validator.finish()
}

/// Validates a store in its insertion order.
pub fn validate_store(store: &Store) -> ValidationReport {
    validate(store.elements())
}

#[derive(Debug, Clone, Copy)]
struct Seen {
    index: usize,
    /// `None` for edges.
    label: Option<VertexLabel>,
}

enum Endpoint {
    Vertex(VertexLabel),
    NotVertex,
    Unseen,
}

/// Continuous validator: feed records one at a time with [`check`], then call
/// [`finish`] for the checks that need the whole stream.
///
/// Memory is proportional to the number of ids, not the size of payloads.
///
/// [`check`]: StreamValidator::check
/// [`finish`]: StreamValidator::finish
#[derive(Debug, Default)]
pub struct StreamValidator {
    next_index: usize,
    seen: HashMap<Id, Seen>,
    /// Edges with at least one endpoint not seen yet.
    pending: Vec<Edge>,
    meta_data: Vec<(Id, usize)>,
    /// range id -> contains edges targeting it
    containers: HashMap<Id, Vec<Id>>,
    /// result id -> chained result ids, in discovery order
    chain: HashMap<Id, Vec<Id>>,
    chain_order: Vec<Id>,
    /// Payload-declared arcs whose targets are checked at the end.
    payload_arcs: Vec<(Id, Id)>,
    violations: Vec<Violation>,
}

impl StreamValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records checked so far.
    pub fn checked(&self) -> usize {
        self.next_index
    }

    pub fn check(&mut self, element: &Element) {
        let index = self.next_index;
        self.next_index += 1;

        let id = element.id();
        if self.seen.contains_key(id) {
            self.report(GraphError::DuplicateId(id.clone()));
            return;
        }

        match element {
            Element::Vertex(vertex) => {
                let label = vertex.label();
                self.seen.insert(
                    id.clone(),
                    Seen {
                        index,
                        label: Some(label),
                    },
                );
                if let VertexData::MetaData(_) = vertex.data {
                    self.meta_data.push((id.clone(), index));
                }
                if let Err(reason) = schema::check_vertex(&vertex.data) {
                    self.report(GraphError::schema(id, reason));
                }
                for nested in vertex.data.chained_results() {
                    self.payload_arcs.push((id.clone(), nested.clone()));
                    self.link(id, nested);
                }
            }
            Element::Edge(edge) => {
                self.seen.insert(id.clone(), Seen { index, label: None });
                if edge.property.is_some() && !schema::property_allowed(edge.label) {
                    self.report(GraphError::schema(
                        id,
                        format!("{} edges cannot carry a property", edge.label),
                    ));
                }
                match (self.endpoint(&edge.out_v), self.endpoint(&edge.in_v)) {
                    (Endpoint::Vertex(out_label), Endpoint::Vertex(in_label)) => {
                        self.check_labels(edge, out_label, in_label);
                    }
                    (Endpoint::Unseen, _) | (_, Endpoint::Unseen) => {
                        self.pending.push(edge.clone());
                    }
                    (out, inn) => {
                        if let Endpoint::NotVertex = out {
                            self.unknown(edge, &edge.out_v);
                        }
                        if let Endpoint::NotVertex = inn {
                            self.unknown(edge, &edge.in_v);
                        }
                    }
                }
            }
        }
    }

    pub fn finish(mut self) -> ValidationReport {
        for edge in std::mem::take(&mut self.pending) {
            let out_label = self.resolve_late(&edge, &edge.out_v);
            let in_label = self.resolve_late(&edge, &edge.in_v);
            if let (Some(out_label), Some(in_label)) = (out_label, in_label) {
                self.check_labels(&edge, out_label, in_label);
            }
        }

        for (referrer, nested) in std::mem::take(&mut self.payload_arcs) {
            let expected = self.seen.get(&referrer).and_then(|seen| seen.label);
            match self.seen.get(&nested).and_then(|seen| seen.label) {
                None => self.report(GraphError::UnknownVertex {
                    referrer,
                    vertex: nested,
                }),
                Some(label) if Some(label) != expected => {
                    let expected = expected.map_or("a result", VertexLabel::as_str);
                    self.report(GraphError::schema(
                        &referrer,
                        format!("nested result {nested} is a {label}, expected {expected}"),
                    ))
                }
                Some(_) => {}
            }
        }

        self.check_meta_data();
        self.check_containers();
        self.check_cycles();

        ValidationReport {
            violations: self.violations,
        }
    }

    fn report(&mut self, err: GraphError) {
        self.violations.push(Violation::from(err));
    }

    fn unknown(&mut self, edge: &Edge, vertex: &Id) {
        self.report(GraphError::UnknownVertex {
            referrer: edge.id.clone(),
            vertex: vertex.clone(),
        });
    }

    fn endpoint(&self, id: &Id) -> Endpoint {
        match self.seen.get(id) {
            Some(Seen {
                label: Some(label), ..
            }) => Endpoint::Vertex(*label),
            Some(_) => Endpoint::NotVertex,
            None => Endpoint::Unseen,
        }
    }

    /// Endpoint check for an edge that was pending at emission time.
    fn resolve_late(&mut self, edge: &Edge, vertex: &Id) -> Option<VertexLabel> {
        let edge_index = self.seen.get(&edge.id).map(|seen| seen.index);
        match self.seen.get(vertex).copied() {
            Some(Seen {
                index,
                label: Some(label),
            }) => {
                if edge_index.is_some_and(|edge_index| index > edge_index) {
                    self.report(GraphError::ForwardReference {
                        edge: edge.id.clone(),
                        vertex: vertex.clone(),
                    });
                }
                Some(label)
            }
            _ => {
                self.unknown(edge, vertex);
                None
            }
        }
    }

    fn check_labels(&mut self, edge: &Edge, out_label: VertexLabel, in_label: VertexLabel) {
        if !schema::permits(edge.label, out_label, in_label) {
            self.violations.push(Violation {
                kind: ViolationKind::LabelMismatch,
                element_ids: vec![edge.id.clone(), edge.out_v.clone(), edge.in_v.clone()],
                message: GraphError::LabelMismatch {
                    edge: edge.id.clone(),
                    label: edge.label,
                    out_label,
                    in_label,
                }
                .to_string(),
            });
            return;
        }
        match edge.label {
            EdgeLabel::Contains if in_label == VertexLabel::Range => {
                self.containers
                    .entry(edge.in_v.clone())
                    .or_default()
                    .push(edge.id.clone());
            }
            EdgeLabel::Item if in_label.is_chained_result() => {
                self.link(&edge.out_v, &edge.in_v);
            }
            _ => {}
        }
    }

    fn link(&mut self, from: &Id, to: &Id) {
        if !self.chain.contains_key(from) {
            self.chain_order.push(from.clone());
        }
        self.chain.entry(from.clone()).or_default().push(to.clone());
    }

    fn check_meta_data(&mut self) {
        match self.meta_data.as_slice() {
            [] => self
                .violations
                .push(Violation::meta_data(Vec::new(), "graph has no metaData vertex")),
            [(first, index), rest @ ..] => {
                if *index != 0 {
                    let violation =
                        Violation::meta_data(vec![first.clone()], "metaData is not the first element");
                    self.violations.push(violation);
                }
                if !rest.is_empty() {
                    let ids = rest.iter().map(|(id, _)| id.clone()).collect();
                    self.violations
                        .push(Violation::meta_data(ids, "graph has more than one metaData vertex"));
                }
            }
        }
    }

    fn check_containers(&mut self) {
        let mut shared: Vec<(usize, Vec<Id>)> = Vec::new();
        for (range, edges) in &self.containers {
            if edges.len() > 1 {
                let mut ids = vec![range.clone()];
                ids.extend(edges.iter().cloned());
                let index = self.seen.get(range).map_or(usize::MAX, |seen| seen.index);
                shared.push((index, ids));
            }
        }
        shared.sort_by_key(|(index, _)| *index);
        for (_, ids) in shared {
            self.violations.push(Violation {
                kind: ViolationKind::SchemaViolation,
                message: format!("range {} is contained by more than one document", ids[0]),
                element_ids: ids,
            });
        }
    }

    /// Iterative depth-first search with an explicit recursion stack; every
    /// arc back into the stack is one cycle.
    fn check_cycles(&mut self) {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            OnStack,
            Done,
        }

        let mut marks: HashMap<&Id, Mark> = HashMap::new();
        let mut cycles: Vec<Vec<Id>> = Vec::new();
        for root in &self.chain_order {
            if marks.contains_key(root) {
                continue;
            }
            let mut stack: Vec<(&Id, usize)> = vec![(root, 0)];
            marks.insert(root, Mark::OnStack);
            while let Some((node, next)) = stack.last_mut() {
                let children = self.chain.get(*node).map(Vec::as_slice).unwrap_or(&[]);
                let Some(child) = children.get(*next) else {
                    marks.insert(*node, Mark::Done);
                    stack.pop();
                    continue;
                };
                *next += 1;
                match marks.get(child) {
                    Some(Mark::OnStack) => {
                        let start = stack
                            .iter()
                            .position(|(id, _)| *id == child)
                            .unwrap_or(0);
                        cycles.push(stack[start..].iter().map(|(id, _)| (*id).clone()).collect());
                    }
                    Some(Mark::Done) => {}
                    None => {
                        marks.insert(child, Mark::OnStack);
                        stack.push((child, 0));
                    }
                }
            }
        }
        for cycle in cycles {
            self.report(GraphError::CyclicResult(cycle));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ImplementationResult, MetaData, ReferenceResult, Vertex};

    fn meta(id: i64) -> Element {
        Element::Vertex(Vertex {
            id: Id::Int(id),
            data: VertexData::MetaData(MetaData {
                version: "0.4.0".to_string(),
            }),
        })
    }

    fn result_set(id: i64) -> Element {
        Element::Vertex(Vertex {
            id: Id::Int(id),
            data: VertexData::ResultSet,
        })
    }

    #[test]
    fn empty_stream_is_missing_meta_data() {
        let report = validate(&[]);
        assert_eq!(report.len(), 1);
        assert_eq!(report.violations[0].kind, ViolationKind::MetaData);
    }

    #[test]
    fn duplicate_ids_are_reported_once_each() {
        let elements = vec![meta(1), result_set(2), result_set(2), result_set(2)];
        let report = validate(&elements);
        assert_eq!(report.counts().get(&ViolationKind::DuplicateId), Some(&2));
    }

    #[test]
    fn payload_chain_cycle_is_detected() {
        let rr = |id: i64, nested: i64| {
            Element::Vertex(Vertex {
                id: Id::Int(id),
                data: VertexData::ReferenceResult(ReferenceResult {
                    reference_results: vec![Id::Int(nested)],
                    ..ReferenceResult::default()
                }),
            })
        };
        let elements = vec![meta(1), rr(2, 3), rr(3, 4), rr(4, 2)];
        let report = validate(&elements);
        let cycles: Vec<_> = report.of_kind(ViolationKind::CyclicResult).collect();
        assert_eq!(cycles.len(), 1);
        assert_eq!(
            cycles[0].element_ids,
            vec![Id::Int(2), Id::Int(3), Id::Int(4)]
        );
    }

    #[test]
    fn nested_result_must_share_the_referrer_label() {
        let elements = vec![
            meta(1),
            Element::Vertex(Vertex {
                id: Id::Int(2),
                data: VertexData::ImplementationResult(ImplementationResult::default()),
            }),
            Element::Vertex(Vertex {
                id: Id::Int(3),
                data: VertexData::ReferenceResult(ReferenceResult {
                    reference_results: vec![Id::Int(2)],
                    ..ReferenceResult::default()
                }),
            }),
        ];
        let report = validate(&elements);
        assert_eq!(report.len(), 1, "{:?}", report.violations);
        assert_eq!(report.violations[0].kind, ViolationKind::SchemaViolation);
        assert_eq!(report.violations[0].element_ids, vec![Id::Int(3)]);
    }
}

use crate::error::{GraphError, Result};
use crate::model::{Edge, EdgeLabel, Element, Id, Vertex, VertexData, VertexLabel};
use crate::schema;
use crate::store::{Snapshot, Store};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// The only way elements enter a [`Store`].
///
/// Every call either fully succeeds (the element is appended) or fails and
/// leaves the store untouched. Edges may only name vertices inserted earlier,
/// so a builder-produced stream never contains forward references.
#[derive(Debug, Default)]
pub struct Builder {
    store: Store,
    next_id: i64,
    /// Ranges that already have a containing document.
    contained: HashSet<Id>,
    /// Arcs between chained reference/implementation results.
    chain: HashMap<Id, Vec<Id>>,
}

impl Builder {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            ..Self::default()
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn finish(self) -> Snapshot {
        Arc::new(self.store)
    }

    /// Adds a vertex under the next free integer id.
    pub fn add_vertex(&mut self, data: VertexData) -> Result<Id> {
        let id = self.next_free_id()?;
        self.insert_vertex(id, data)
    }

    /// Adds a vertex under a caller-chosen id.
    pub fn insert_vertex(&mut self, id: Id, data: VertexData) -> Result<Id> {
        if self.store.contains(&id) {
            return Err(GraphError::DuplicateId(id));
        }
        self.check_meta_data_order(&id, &data)?;
        schema::check_vertex(&data).map_err(|reason| GraphError::schema(&id, reason))?;
        self.check_chained_results(&id, &data)?;

        let chained = data.chained_results().to_vec();
        self.commit(Element::Vertex(Vertex {
            id: id.clone(),
            data,
        }))?;
        if !chained.is_empty() {
            self.chain.insert(id.clone(), chained);
        }
        Ok(id)
    }

    pub fn add_edge(&mut self, label: EdgeLabel, out_v: Id, in_v: Id) -> Result<Id> {
        let id = self.next_free_id()?;
        self.insert_edge(Edge::new(id, label, out_v, in_v))
    }

    /// Adds an `item` edge, optionally tagged with a property such as
    /// `definitions` or `references`.
    pub fn add_item_edge(&mut self, out_v: Id, in_v: Id, property: Option<String>) -> Result<Id> {
        let id = self.next_free_id()?;
        let mut edge = Edge::new(id, EdgeLabel::Item, out_v, in_v);
        edge.property = property;
        self.insert_edge(edge)
    }

    pub fn insert_edge(&mut self, edge: Edge) -> Result<Id> {
        if self.store.contains(&edge.id) {
            return Err(GraphError::DuplicateId(edge.id));
        }
        let out_label = self.endpoint_label(&edge.id, &edge.out_v)?;
        let in_label = self.endpoint_label(&edge.id, &edge.in_v)?;
        if !schema::permits(edge.label, out_label, in_label) {
            return Err(GraphError::LabelMismatch {
                edge: edge.id,
                label: edge.label,
                out_label,
                in_label,
            });
        }
        if edge.property.is_some() && !schema::property_allowed(edge.label) {
            return Err(GraphError::schema(
                &edge.id,
                format!("{} edges cannot carry a property", edge.label),
            ));
        }
        let contains_range = edge.label == EdgeLabel::Contains && in_label == VertexLabel::Range;
        if contains_range && self.contained.contains(&edge.in_v) {
            return Err(GraphError::schema(
                &edge.id,
                format!("range {} already belongs to a document", edge.in_v),
            ));
        }
        let chains = edge.label == EdgeLabel::Item && in_label.is_chained_result();
        if chains {
            self.check_acyclic(&edge.out_v, &edge.in_v)?;
        }

        let id = edge.id.clone();
        let (out_v, in_v) = (edge.out_v.clone(), edge.in_v.clone());
        self.commit(Element::Edge(edge))?;
        if contains_range {
            self.contained.insert(in_v);
        } else if chains {
            self.chain.entry(out_v).or_default().push(in_v);
        }
        Ok(id)
    }

    /// Dispatches a decoded record to the vertex or edge path.
    pub fn insert(&mut self, element: Element) -> Result<Id> {
        match element {
            Element::Vertex(vertex) => self.insert_vertex(vertex.id, vertex.data),
            Element::Edge(edge) => self.insert_edge(edge),
        }
    }

    fn commit(&mut self, element: Element) -> Result<()> {
        if let Id::Int(value) = element.id() {
            self.next_id = self.next_id.max(value.saturating_add(1));
        }
        self.store.insert(element)
    }

    fn next_free_id(&self) -> Result<Id> {
        let mut candidate = self.next_id.max(1);
        while self.store.contains(&Id::Int(candidate)) {
            candidate = candidate.checked_add(1).ok_or_else(|| {
                GraphError::schema(&Id::Int(candidate), "integer id space exhausted")
            })?;
        }
        Ok(Id::Int(candidate))
    }

    fn endpoint_label(&self, edge: &Id, vertex: &Id) -> Result<VertexLabel> {
        self.store
            .vertex(vertex)
            .map(|vertex| vertex.label())
            .map_err(|_| GraphError::UnknownVertex {
                referrer: edge.clone(),
                vertex: vertex.clone(),
            })
    }

    fn check_meta_data_order(&self, id: &Id, data: &VertexData) -> Result<()> {
        let is_meta = matches!(data, VertexData::MetaData(_));
        if self.store.is_empty() && !is_meta {
            return Err(GraphError::schema(
                id,
                "the first element of a graph must be a metaData vertex",
            ));
        }
        if !self.store.is_empty() && is_meta {
            return Err(GraphError::schema(
                id,
                "metaData may only be emitted once, as the first element",
            ));
        }
        Ok(())
    }

    /// Nested result ids must name earlier vertices of the same label, which
    /// keeps payload chains acyclic by construction.
    fn check_chained_results(&self, id: &Id, data: &VertexData) -> Result<()> {
        let label = data.label();
        for nested in data.chained_results() {
            let vertex = self
                .store
                .vertex(nested)
                .map_err(|_| GraphError::UnknownVertex {
                    referrer: id.clone(),
                    vertex: nested.clone(),
                })?;
            if vertex.label() != label {
                return Err(GraphError::schema(
                    id,
                    format!("nested result {nested} is a {}, expected {label}", vertex.label()),
                ));
            }
        }
        Ok(())
    }

    /// Rejects an arc `from -> to` when `from` is already reachable from `to`.
    fn check_acyclic(&self, from: &Id, to: &Id) -> Result<()> {
        let mut stack: Vec<(&Id, usize)> = vec![(to, 0)];
        let mut visited: HashSet<&Id> = HashSet::from([to]);
        while let Some((node, next)) = stack.last_mut() {
            if *node == from {
                let mut cycle: Vec<Id> = vec![from.clone()];
                cycle.extend(stack.iter().map(|(id, _)| (*id).clone()));
                cycle.pop();
                return Err(GraphError::CyclicResult(cycle));
            }
            let children = self.chain.get(*node).map(Vec::as_slice).unwrap_or(&[]);
            match children.get(*next) {
                Some(child) => {
                    *next += 1;
                    if visited.insert(child) {
                        stack.push((child, 0));
                    }
                }
                None => {
                    stack.pop();
                }
            }
        }
        Ok(())
    }
}

/// Builder behind a single writer lock, for producers that emit from more
/// than one thread. Calls are serialized; each one is still all-or-nothing.
#[derive(Debug, Clone, Default)]
pub struct SharedBuilder {
    inner: Arc<Mutex<Builder>>,
}

impl SharedBuilder {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Builder::new())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Builder> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn add_vertex(&self, data: VertexData) -> Result<Id> {
        self.lock().add_vertex(data)
    }

    pub fn insert_vertex(&self, id: Id, data: VertexData) -> Result<Id> {
        self.lock().insert_vertex(id, data)
    }

    pub fn add_edge(&self, label: EdgeLabel, out_v: Id, in_v: Id) -> Result<Id> {
        self.lock().add_edge(label, out_v, in_v)
    }

    pub fn add_item_edge(&self, out_v: Id, in_v: Id, property: Option<String>) -> Result<Id> {
        self.lock().add_item_edge(out_v, in_v, property)
    }

    pub fn insert(&self, element: Element) -> Result<Id> {
        self.lock().insert(element)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Hands back the snapshot once this is the last handle; otherwise
    /// returns the handle unchanged.
    pub fn finish(self) -> std::result::Result<Snapshot, SharedBuilder> {
        match Arc::try_unwrap(self.inner) {
            Ok(mutex) => Ok(mutex
                .into_inner()
                .unwrap_or_else(PoisonError::into_inner)
                .finish()),
            Err(inner) => Err(SharedBuilder { inner }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{MetaData, Range, RangeData, ReferenceResult};

    fn started() -> Builder {
        let mut builder = Builder::new();
        builder
            .add_vertex(VertexData::MetaData(MetaData {
                version: "0.4.0".to_string(),
            }))
            .unwrap();
        builder
    }

    #[test]
    fn first_element_must_be_meta_data() {
        let mut builder = Builder::new();
        let err = builder.add_vertex(VertexData::ResultSet).unwrap_err();
        assert!(matches!(err, GraphError::SchemaViolation { .. }));
        assert!(builder.is_empty());
    }

    #[test]
    fn meta_data_only_once() {
        let mut builder = started();
        let err = builder
            .add_vertex(VertexData::MetaData(MetaData {
                version: "0.4.0".to_string(),
            }))
            .unwrap_err();
        assert!(matches!(err, GraphError::SchemaViolation { .. }));
        assert_eq!(builder.len(), 1);
    }

    #[test]
    fn allocated_ids_skip_caller_ids() {
        let mut builder = started();
        builder
            .insert_vertex(Id::Int(2), VertexData::ResultSet)
            .unwrap();
        let next = builder.add_vertex(VertexData::ResultSet).unwrap();
        assert_eq!(next, Id::Int(3));
        builder
            .insert_vertex(Id::from("rs"), VertexData::ResultSet)
            .unwrap();
        assert_eq!(builder.add_vertex(VertexData::ResultSet).unwrap(), Id::Int(4));
    }

    #[test]
    fn exhausted_id_space_is_an_error() {
        let mut builder = started();
        builder
            .insert_vertex(Id::Int(i64::MAX), VertexData::ResultSet)
            .unwrap();
        let before = builder.len();
        let err = builder.add_vertex(VertexData::ResultSet).unwrap_err();
        assert_eq!(
            err,
            GraphError::schema(&Id::Int(i64::MAX), "integer id space exhausted")
        );
        assert_eq!(builder.len(), before);
        builder
            .insert_vertex(Id::from("still-open"), VertexData::ResultSet)
            .unwrap();
    }

    #[test]
    fn inverted_range_is_a_schema_violation() {
        let mut builder = started();
        let err = builder
            .add_vertex(VertexData::Range(RangeData::new(Range::on_line(3, 9, 1))))
            .unwrap_err();
        assert!(matches!(err, GraphError::SchemaViolation { .. }));
        assert_eq!(builder.len(), 1);
    }

    #[test]
    fn item_cycle_is_rejected() {
        let mut builder = started();
        let a = builder
            .add_vertex(VertexData::ReferenceResult(ReferenceResult::default()))
            .unwrap();
        let b = builder
            .add_vertex(VertexData::ReferenceResult(ReferenceResult::default()))
            .unwrap();
        builder.add_item_edge(a.clone(), b.clone(), None).unwrap();
        let before = builder.len();
        let err = builder.add_item_edge(b.clone(), a.clone(), None).unwrap_err();
        assert_eq!(err, GraphError::CyclicResult(vec![b.clone(), a.clone()]));
        assert_eq!(builder.len(), before);

        let err = builder.add_item_edge(a.clone(), a.clone(), None).unwrap_err();
        assert_eq!(err, GraphError::CyclicResult(vec![a]));
    }

    #[test]
    fn nested_results_must_exist() {
        let mut builder = started();
        let err = builder
            .add_vertex(VertexData::ReferenceResult(ReferenceResult {
                reference_results: vec![Id::Int(40)],
                ..ReferenceResult::default()
            }))
            .unwrap_err();
        assert!(matches!(err, GraphError::UnknownVertex { .. }));
    }

    #[test]
    fn shared_builder_serializes_writers() {
        let shared = SharedBuilder::new();
        shared
            .add_vertex(VertexData::MetaData(MetaData {
                version: "0.4.0".to_string(),
            }))
            .unwrap();
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let shared = shared.clone();
                std::thread::spawn(move || {
                    for _ in 0..25 {
                        shared.add_vertex(VertexData::ResultSet).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        let snapshot = shared.finish().unwrap();
        assert_eq!(snapshot.len(), 101);
        assert_eq!(snapshot.vertex_count(), 101);
    }
}

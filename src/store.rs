use crate::error::{GraphError, Result};
use crate::model::{Edge, EdgeLabel, Element, GraphOverview, Id, MetaData, Vertex, VertexData};
use blake3::Hasher;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Finished graph shared by any number of readers.
pub type Snapshot = Arc<Store>;

type Adjacency = HashMap<EdgeLabel, Vec<usize>>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreDigest {
    pub rows: usize,
    pub hash: String,
}

/// Append-only element storage with id lookup and per-label adjacency lists.
#[derive(Debug, Default)]
pub struct Store {
    elements: Vec<Element>,
    index: HashMap<Id, usize>,
    outgoing: HashMap<Id, Adjacency>,
    incoming: HashMap<Id, Adjacency>,
    vertices: usize,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `element`. Fails with `DuplicateId` and leaves the store as it
    /// was when the id is taken. Endpoint checks are the builder's job.
    pub fn insert(&mut self, element: Element) -> Result<()> {
        if self.index.contains_key(element.id()) {
            return Err(GraphError::DuplicateId(element.id().clone()));
        }
        let slot = self.elements.len();
        match &element {
            Element::Vertex(_) => self.vertices += 1,
            Element::Edge(edge) => {
                self.outgoing
                    .entry(edge.out_v.clone())
                    .or_default()
                    .entry(edge.label)
                    .or_default()
                    .push(slot);
                self.incoming
                    .entry(edge.in_v.clone())
                    .or_default()
                    .entry(edge.label)
                    .or_default()
                    .push(slot);
            }
        }
        self.index.insert(element.id().clone(), slot);
        self.elements.push(element);
        Ok(())
    }

    pub fn get(&self, id: &Id) -> Result<&Element> {
        self.index
            .get(id)
            .map(|&slot| &self.elements[slot])
            .ok_or_else(|| GraphError::NotFound(id.clone()))
    }

    /// Vertex lookup; an id naming an edge counts as not found.
    pub fn vertex(&self, id: &Id) -> Result<&Vertex> {
        self.get(id)?
            .as_vertex()
            .ok_or_else(|| GraphError::NotFound(id.clone()))
    }

    pub fn edge(&self, id: &Id) -> Result<&Edge> {
        self.get(id)?
            .as_edge()
            .ok_or_else(|| GraphError::NotFound(id.clone()))
    }

    pub fn contains(&self, id: &Id) -> bool {
        self.index.contains_key(id)
    }

    /// Insertion index of `id`.
    pub fn position(&self, id: &Id) -> Option<usize> {
        self.index.get(id).copied()
    }

    /// Edges leaving `vertex` with `label`, in insertion order.
    pub fn outgoing(&self, vertex: &Id, label: EdgeLabel) -> Edges<'_> {
        Edges::new(self, lookup(&self.outgoing, vertex, label))
    }

    /// Edges entering `vertex` with `label`, in insertion order.
    pub fn incoming(&self, vertex: &Id, label: EdgeLabel) -> Edges<'_> {
        Edges::new(self, lookup(&self.incoming, vertex, label))
    }

    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices
    }

    pub fn edge_count(&self) -> usize {
        self.elements.len() - self.vertices
    }

    pub fn meta_data(&self) -> Option<&MetaData> {
        match self.elements.first()? {
            Element::Vertex(Vertex {
                data: VertexData::MetaData(meta),
                ..
            }) => Some(meta),
            _ => None,
        }
    }

    pub fn overview(&self) -> GraphOverview {
        let mut vertex_labels: BTreeMap<String, usize> = BTreeMap::new();
        let mut edge_labels: BTreeMap<String, usize> = BTreeMap::new();
        for element in &self.elements {
            let counts = match element {
                Element::Vertex(_) => &mut vertex_labels,
                Element::Edge(_) => &mut edge_labels,
            };
            *counts.entry(element.label().to_string()).or_default() += 1;
        }
        GraphOverview {
            version: self.meta_data().map(|meta| meta.version.clone()),
            vertices: self.vertex_count(),
            edges: self.edge_count(),
            vertex_labels,
            edge_labels,
        }
    }

    /// blake3 over the serialized elements in insertion order. Equal digests
    /// mean equal ids, payloads and order.
    pub fn digest(&self) -> serde_json::Result<StoreDigest> {
        let mut hasher = Hasher::new();
        for element in &self.elements {
            hasher.update(&serde_json::to_vec(element)?);
            hasher.update(b"\n");
        }
        Ok(StoreDigest {
            rows: self.elements.len(),
            hash: hasher.finalize().to_hex().to_string(),
        })
    }
}

fn lookup<'a>(adjacency: &'a HashMap<Id, Adjacency>, vertex: &Id, label: EdgeLabel) -> &'a [usize] {
    adjacency
        .get(vertex)
        .and_then(|by_label| by_label.get(&label))
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// Iterator over adjacency slots, yielding edges.
pub struct Edges<'a> {
    store: &'a Store,
    slots: std::slice::Iter<'a, usize>,
}

impl<'a> Edges<'a> {
    fn new(store: &'a Store, slots: &'a [usize]) -> Self {
        Self {
            store,
            slots: slots.iter(),
        }
    }
}

impl<'a> Iterator for Edges<'a> {
    type Item = &'a Edge;

    fn next(&mut self) -> Option<Self::Item> {
        for &slot in self.slots.by_ref() {
            if let Some(edge) = self.store.elements[slot].as_edge() {
                return Some(edge);
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.slots.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Document, MetaData, Range, RangeData};

    fn vertex(id: i64, data: VertexData) -> Element {
        Element::Vertex(Vertex {
            id: Id::Int(id),
            data,
        })
    }

    fn sample() -> Store {
        let mut store = Store::new();
        store
            .insert(vertex(
                1,
                VertexData::MetaData(MetaData {
                    version: "0.4.0".to_string(),
                }),
            ))
            .unwrap();
        store
            .insert(vertex(
                2,
                VertexData::Document(Document {
                    uri: "file:///a.ts".to_string(),
                    language_id: "typescript".to_string(),
                    data: None,
                    contents: None,
                }),
            ))
            .unwrap();
        store
            .insert(vertex(3, VertexData::Range(RangeData::new(Range::on_line(0, 0, 5)))))
            .unwrap();
        store
            .insert(vertex(4, VertexData::Range(RangeData::new(Range::on_line(1, 0, 5)))))
            .unwrap();
        for (id, target) in [(5, 3), (6, 4)] {
            store
                .insert(Element::Edge(Edge::new(
                    Id::Int(id),
                    EdgeLabel::Contains,
                    Id::Int(2),
                    Id::Int(target),
                )))
                .unwrap();
        }
        store
    }

    #[test]
    fn duplicate_id_leaves_store_unchanged() {
        let mut store = sample();
        let before = store.len();
        let err = store
            .insert(vertex(3, VertexData::ResultSet))
            .unwrap_err();
        assert_eq!(err, GraphError::DuplicateId(Id::Int(3)));
        assert_eq!(store.len(), before);
        assert!(matches!(
            store.vertex(&Id::Int(3)).unwrap().data,
            VertexData::Range(_)
        ));
    }

    #[test]
    fn adjacency_is_insertion_ordered() {
        let store = sample();
        let targets: Vec<_> = store
            .outgoing(&Id::Int(2), EdgeLabel::Contains)
            .map(|edge| edge.in_v.clone())
            .collect();
        assert_eq!(targets, vec![Id::Int(3), Id::Int(4)]);
        assert_eq!(store.incoming(&Id::Int(4), EdgeLabel::Contains).count(), 1);
        assert_eq!(store.outgoing(&Id::Int(2), EdgeLabel::Item).count(), 0);
        assert_eq!(store.outgoing(&Id::Int(99), EdgeLabel::Contains).count(), 0);
    }

    #[test]
    fn lookups_distinguish_vertices_and_edges() {
        let store = sample();
        assert!(store.edge(&Id::Int(5)).is_ok());
        assert_eq!(
            store.vertex(&Id::Int(5)).unwrap_err(),
            GraphError::NotFound(Id::Int(5))
        );
        assert_eq!(
            store.get(&Id::Int(42)).unwrap_err(),
            GraphError::NotFound(Id::Int(42))
        );
        assert_eq!(store.position(&Id::Int(4)), Some(3));
    }

    #[test]
    fn overview_counts_labels() {
        let overview = sample().overview();
        assert_eq!(overview.version.as_deref(), Some("0.4.0"));
        assert_eq!(overview.vertices, 4);
        assert_eq!(overview.edges, 2);
        assert_eq!(overview.vertex_labels.get("range"), Some(&2));
        assert_eq!(overview.edge_labels.get("contains"), Some(&2));
    }

    #[test]
    fn digest_is_stable() {
        let a = sample().digest().unwrap();
        let b = sample().digest().unwrap();
        assert_eq!(a, b);
        assert_eq!(a.rows, 6);
    }
}

use crate::config::Config;
use crate::error::{GraphError, Result};
use crate::model::{
    Diagnostic, DocumentLink, DocumentSymbol, DocumentSymbolPayload, EdgeLabel, FoldingRange,
    Hover, Id, LocationRef, MonikerItem, Range, RangeBasedDocumentSymbol, RangeData,
    RequestKind, Vertex, VertexData, VertexLabel,
};
use crate::store::{Snapshot, Store};
use log::{debug, warn};
use serde::Serialize;
use std::collections::HashSet;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ResolvedLocation {
    /// Uri of the containing document; `None` for a range no document contains.
    pub uri: Option<String>,
    pub range: Range,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range_id: Option<Id>,
}

/// Document symbol normalized from either the LSP shape or a range-based tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SymbolNode {
    pub name: String,
    pub kind: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub deprecated: bool,
    pub range: Range,
    pub selection_range: Range,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range_id: Option<Id>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<SymbolNode>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedMoniker {
    pub moniker: String,
    pub locations: Vec<ResolvedLocation>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "result", rename_all = "camelCase")]
pub enum Resolution {
    Locations(Vec<ResolvedLocation>),
    Hover(Hover),
    DocumentSymbols(Vec<SymbolNode>),
    Diagnostics(Vec<Diagnostic>),
    FoldingRanges(Vec<FoldingRange>),
    DocumentLinks(Vec<DocumentLink>),
    Monikers(Vec<ResolvedMoniker>),
}

impl Resolution {
    pub fn locations(&self) -> Option<&[ResolvedLocation]> {
        match self {
            Resolution::Locations(locations) => Some(locations),
            _ => None,
        }
    }

    pub fn hover(&self) -> Option<&Hover> {
        match self {
            Resolution::Hover(hover) => Some(hover),
            _ => None,
        }
    }

    pub fn symbols(&self) -> Option<&[SymbolNode]> {
        match self {
            Resolution::DocumentSymbols(symbols) => Some(symbols),
            _ => None,
        }
    }

    pub fn monikers(&self) -> Option<&[ResolvedMoniker]> {
        match self {
            Resolution::Monikers(monikers) => Some(monikers),
            _ => None,
        }
    }
}

/// Read-only query engine over a finished graph.
///
/// The resolver assumes a validated graph but never panics on a defective
/// one: missing ids surface as `NotFound`, wrongly labeled vertices as
/// `SchemaViolation`.
#[derive(Debug, Clone)]
pub struct Resolver {
    store: Snapshot,
    slow_query: Duration,
}

impl Resolver {
    pub fn new(store: Snapshot) -> Self {
        Self {
            store,
            slow_query: Duration::from_millis(Config::get().slow_query_ms),
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn resolve(&self, start: &Id, kind: RequestKind) -> Result<Resolution> {
        let started = Instant::now();
        let result = self.resolve_inner(start, kind);
        let elapsed = started.elapsed();
        if elapsed > self.slow_query {
            warn!("lsifg: slow query: {kind} from {start} took {elapsed:?}");
        }
        result
    }

    fn resolve_inner(&self, start: &Id, kind: RequestKind) -> Result<Resolution> {
        let results = self.result_vertices(start, kind)?;
        debug!(
            "resolving {kind} from {start} through {} result vertices",
            results.len()
        );
        match kind {
            RequestKind::Definition | RequestKind::Declaration | RequestKind::TypeDefinition => {
                let mut locations = Locations::default();
                for vertex in results {
                    let result = match &vertex.data {
                        VertexData::DefinitionResult(result)
                        | VertexData::DeclarationResult(result)
                        | VertexData::TypeDefinitionResult(result) => result,
                        _ => return Err(unexpected(vertex, "a location result")),
                    };
                    for entry in result.result.iter().flat_map(|result| result.as_slice()) {
                        self.push_ref(&mut locations, entry)?;
                    }
                }
                Ok(Resolution::Locations(locations.items))
            }
            RequestKind::References | RequestKind::Implementation => {
                let roots = results.iter().map(|vertex| vertex.id.clone()).collect();
                Ok(Resolution::Locations(self.walk_chain(roots)?))
            }
            RequestKind::Hover => match &results[0].data {
                VertexData::HoverResult(hover) => Ok(Resolution::Hover(hover.result.clone())),
                _ => Err(unexpected(results[0], "a hoverResult")),
            },
            RequestKind::DocumentSymbol => {
                let mut symbols = Vec::new();
                for vertex in results {
                    let VertexData::DocumentSymbolResult(result) = &vertex.data else {
                        return Err(unexpected(vertex, "a documentSymbolResult"));
                    };
                    match &result.result {
                        Some(DocumentSymbolPayload::Symbols(items)) => {
                            symbols.extend(items.iter().map(lsp_symbol));
                        }
                        Some(DocumentSymbolPayload::Ranges(items)) => {
                            for item in items {
                                symbols.push(self.range_symbol(item)?);
                            }
                        }
                        None => {}
                    }
                }
                Ok(Resolution::DocumentSymbols(symbols))
            }
            RequestKind::Diagnostic => {
                let mut items = Vec::new();
                for vertex in results {
                    let VertexData::DiagnosticResult(result) = &vertex.data else {
                        return Err(unexpected(vertex, "a diagnosticResult"));
                    };
                    items.extend(result.result.iter().flatten().cloned());
                }
                Ok(Resolution::Diagnostics(items))
            }
            RequestKind::FoldingRange => {
                let mut items = Vec::new();
                for vertex in results {
                    let VertexData::FoldingRangeResult(result) = &vertex.data else {
                        return Err(unexpected(vertex, "a foldingRangeResult"));
                    };
                    items.extend(result.result.iter().flatten().cloned());
                }
                Ok(Resolution::FoldingRanges(items))
            }
            RequestKind::DocumentLink => {
                let mut items = Vec::new();
                for vertex in results {
                    let VertexData::DocumentLinkResult(result) = &vertex.data else {
                        return Err(unexpected(vertex, "a documentLinkResult"));
                    };
                    items.extend(result.result.iter().flatten().cloned());
                }
                Ok(Resolution::DocumentLinks(items))
            }
            RequestKind::Exports | RequestKind::Imports => {
                Ok(Resolution::Monikers(self.monikers(&results)?))
            }
        }
    }

    /// Result vertices reached from `start` over the request's edge label,
    /// falling back from a range to its result sets.
    fn result_vertices(&self, start: &Id, kind: RequestKind) -> Result<Vec<&Vertex>> {
        let vertex = self.store.vertex(start)?;
        let label = kind.edge_label();
        let mut edges: Vec<_> = self.store.outgoing(start, label).collect();
        if edges.is_empty() && vertex.label() == VertexLabel::Range {
            for refers in self.store.outgoing(start, EdgeLabel::RefersTo) {
                edges.extend(self.store.outgoing(&refers.in_v, label));
            }
        }
        if edges.is_empty() {
            return Err(GraphError::NoResult {
                start: start.clone(),
                kind,
            });
        }
        edges
            .into_iter()
            .map(|edge| self.store.vertex(&edge.in_v))
            .collect()
    }

    /// Flattens reference or implementation results, following nested result
    /// ids and `item` edges with a work-list instead of native recursion.
    fn walk_chain(&self, roots: Vec<Id>) -> Result<Vec<ResolvedLocation>> {
        let mut locations = Locations::default();
        let mut visited: HashSet<Id> = HashSet::new();
        let mut work: Vec<Id> = roots.into_iter().rev().collect();

        while let Some(id) = work.pop() {
            if !visited.insert(id.clone()) {
                continue;
            }
            let vertex = self.store.vertex(&id)?;
            let mut children: Vec<Id> = Vec::new();
            match &vertex.data {
                VertexData::ReferenceResult(result) => {
                    for entry in result
                        .declarations
                        .iter()
                        .chain(&result.definitions)
                        .chain(&result.references)
                    {
                        self.push_ref(&mut locations, entry)?;
                    }
                    children.extend(result.reference_results.iter().cloned());
                }
                VertexData::ImplementationResult(result) => {
                    for entry in &result.result {
                        self.push_ref(&mut locations, entry)?;
                    }
                    children.extend(result.implementation_results.iter().cloned());
                }
                _ => return Err(unexpected(vertex, "a reference or implementation result")),
            }
            for edge in self.store.outgoing(&id, EdgeLabel::Item) {
                let target = self.store.vertex(&edge.in_v)?;
                match target.label() {
                    VertexLabel::Range => {
                        let location = self.range_location(&target.id)?;
                        locations.push(location);
                    }
                    label if label == vertex.label() => children.push(target.id.clone()),
                    _ => debug!("skipping item edge {} to a {}", edge.id, target.label()),
                }
            }
            work.extend(children.into_iter().rev());
        }
        Ok(locations.items)
    }

    fn monikers(&self, results: &[&Vertex]) -> Result<Vec<ResolvedMoniker>> {
        let mut seen: HashSet<&MonikerItem> = HashSet::new();
        let mut items: Vec<&MonikerItem> = Vec::new();
        for vertex in results {
            let inline = match &vertex.data {
                VertexData::ExportResult(result) | VertexData::ExternalImportResult(result) => {
                    result
                }
                _ => return Err(unexpected(vertex, "an export or import result")),
            };
            for item in inline.result.iter().flatten() {
                if seen.insert(item) {
                    items.push(item);
                }
            }
            for edge in self.store.outgoing(&vertex.id, EdgeLabel::Item) {
                let target = self.store.vertex(&edge.in_v)?;
                match &target.data {
                    VertexData::ExportItem(item) | VertexData::ExternalImportItem(item) => {
                        if seen.insert(item) {
                            items.push(item);
                        }
                    }
                    _ => return Err(unexpected(target, "an export or import item")),
                }
            }
        }

        items
            .into_iter()
            .map(|item| {
                let mut locations = Locations::default();
                for range_id in &item.range_ids {
                    locations.push(self.range_location(range_id)?);
                }
                Ok(ResolvedMoniker {
                    moniker: item.moniker.clone(),
                    locations: locations.items,
                })
            })
            .collect()
    }

    fn push_ref(&self, locations: &mut Locations, entry: &LocationRef) -> Result<()> {
        let location = match entry {
            LocationRef::Range(id) => self.range_location(id)?,
            LocationRef::Location(location) => ResolvedLocation {
                uri: Some(location.uri.clone()),
                range: location.range,
                range_id: None,
            },
        };
        locations.push(location);
        Ok(())
    }

    fn range_location(&self, id: &Id) -> Result<ResolvedLocation> {
        let range = self.range_data(id)?;
        Ok(ResolvedLocation {
            uri: self.document_uri(id),
            range: range.span(),
            range_id: Some(id.clone()),
        })
    }

    fn range_data(&self, id: &Id) -> Result<&RangeData> {
        let vertex = self.store.vertex(id)?;
        match &vertex.data {
            VertexData::Range(range) => Ok(range),
            _ => Err(unexpected(vertex, "a range")),
        }
    }

    fn document_uri(&self, range: &Id) -> Option<String> {
        self.store
            .incoming(range, EdgeLabel::Contains)
            .find_map(|edge| match self.store.vertex(&edge.out_v).ok()?.data {
                VertexData::Document(ref document) => Some(document.uri.clone()),
                _ => None,
            })
    }

    fn range_symbol(&self, symbol: &RangeBasedDocumentSymbol) -> Result<SymbolNode> {
        let range = self.range_data(&symbol.id)?;
        let span = range.span();
        let tag = range.tag.as_ref();
        let declared = tag.and_then(|tag| tag.symbol());
        let children = symbol
            .children
            .iter()
            .map(|child| self.range_symbol(child))
            .collect::<Result<Vec<_>>>()?;
        Ok(SymbolNode {
            name: tag.map(|tag| tag.text().to_string()).unwrap_or_default(),
            kind: declared.map(|symbol| symbol.kind),
            detail: declared.and_then(|symbol| symbol.detail.clone()),
            deprecated: declared.and_then(|symbol| symbol.deprecated).unwrap_or(false),
            range: declared.map_or(span, |symbol| symbol.full_range),
            selection_range: span,
            range_id: Some(symbol.id.clone()),
            children,
        })
    }
}

fn lsp_symbol(symbol: &DocumentSymbol) -> SymbolNode {
    SymbolNode {
        name: symbol.name.clone(),
        kind: Some(symbol.kind),
        detail: symbol.detail.clone(),
        deprecated: symbol.deprecated.unwrap_or(false),
        range: symbol.range,
        selection_range: symbol.selection_range,
        range_id: None,
        children: symbol.children.iter().map(lsp_symbol).collect(),
    }
}

fn unexpected(vertex: &Vertex, expected: &str) -> GraphError {
    GraphError::schema(
        &vertex.id,
        format!("expected {expected}, found a {}", vertex.label()),
    )
}

/// Locations de-duplicated by (uri, range), first occurrence wins.
#[derive(Default)]
struct Locations {
    seen: HashSet<(Option<String>, Range)>,
    items: Vec<ResolvedLocation>,
}

impl Locations {
    fn push(&mut self, location: ResolvedLocation) {
        if self.seen.insert((location.uri.clone(), location.range)) {
            self.items.push(location);
        }
    }
}

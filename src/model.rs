use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Identifier of a vertex or an edge. Producers pick the scheme; the graph
/// only compares ids for equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Id {
    Int(i64),
    Str(String),
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Id::Int(value) => write!(f, "{value}"),
            Id::Str(value) => write!(f, "{value:?}"),
        }
    }
}

impl From<i64> for Id {
    fn from(value: i64) -> Self {
        Id::Int(value)
    }
}

impl From<&str> for Id {
    fn from(value: &str) -> Self {
        Id::Str(value.to_string())
    }
}

impl From<String> for Id {
    fn from(value: String) -> Self {
        Id::Str(value)
    }
}

impl FromStr for Id {
    type Err = std::convert::Infallible;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        Ok(match trimmed.parse::<i64>() {
            Ok(value) => Id::Int(value),
            Err(_) => Id::Str(trimmed.to_string()),
        })
    }
}

pub fn join_ids(ids: &[Id]) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Zero based line/character position. Ordering is (line, character).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
pub struct Position {
    pub line: u32,
    pub character: u32,
}

impl Position {
    pub fn new(line: u32, character: u32) -> Self {
        Self { line, character }
    }
}

/// Half-open text span `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

impl Range {
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// Single-line span, handy for tests and synthetic graphs.
    pub fn on_line(line: u32, start: u32, end: u32) -> Self {
        Self::new(Position::new(line, start), Position::new(line, end))
    }

    pub fn is_ordered(&self) -> bool {
        self.start <= self.end
    }

    pub fn contains(&self, other: &Range) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    pub uri: String,
    pub range: Range,
}

// Vertex payloads

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaData {
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contents: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub uri: String,
    #[serde(rename = "languageId")]
    pub language_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contents: Option<String>,
}

/// Tag payload shared by declaration and definition ranges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolTag {
    pub text: String,
    pub kind: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deprecated: Option<bool>,
    #[serde(rename = "fullRange")]
    pub full_range: Range,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextTag {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum RangeTag {
    Declaration(SymbolTag),
    Definition(SymbolTag),
    Reference(TextTag),
    Unknown(TextTag),
}

impl RangeTag {
    pub fn text(&self) -> &str {
        match self {
            RangeTag::Declaration(tag) | RangeTag::Definition(tag) => &tag.text,
            RangeTag::Reference(tag) | RangeTag::Unknown(tag) => &tag.text,
        }
    }

    pub fn symbol(&self) -> Option<&SymbolTag> {
        match self {
            RangeTag::Declaration(tag) | RangeTag::Definition(tag) => Some(tag),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeData {
    pub start: Position,
    pub end: Position,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<RangeTag>,
}

impl RangeData {
    pub fn new(span: Range) -> Self {
        Self {
            start: span.start,
            end: span.end,
            tag: None,
        }
    }

    pub fn tagged(span: Range, tag: RangeTag) -> Self {
        Self {
            start: span.start,
            end: span.end,
            tag: Some(tag),
        }
    }

    pub fn span(&self) -> Range {
        Range::new(self.start, self.end)
    }
}

/// Either a range id emitted earlier or a literal LSP location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LocationRef {
    Range(Id),
    Location(Location),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> OneOrMany<T> {
    pub fn as_slice(&self) -> &[T] {
        match self {
            OneOrMany::Many(items) => items,
            OneOrMany::One(item) => std::slice::from_ref(item),
        }
    }
}

/// Payload of declaration, definition and type definition results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct LocationsResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<OneOrMany<LocationRef>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hover {
    pub contents: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<Range>,
}

impl Hover {
    pub fn text(value: &str) -> Self {
        Self {
            contents: Value::String(value.to_string()),
            range: None,
        }
    }

    /// Plain text of the hover contents, joining marked strings with blank lines.
    pub fn plain_text(&self) -> String {
        fn part(value: &Value) -> Option<String> {
            match value {
                Value::String(text) => Some(text.clone()),
                Value::Object(map) => map
                    .get("value")
                    .and_then(|value| value.as_str())
                    .map(|value| value.to_string()),
                _ => None,
            }
        }
        match &self.contents {
            Value::Array(items) => items.iter().filter_map(part).collect::<Vec<_>>().join("\n\n"),
            other => part(other).unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoverResult {
    pub result: Hover,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ReferenceResult {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub declarations: Vec<LocationRef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub definitions: Vec<LocationRef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub references: Vec<LocationRef>,
    #[serde(
        rename = "referenceResults",
        default,
        skip_serializing_if = "Vec::is_empty"
    )]
    pub reference_results: Vec<Id>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ImplementationResult {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub result: Vec<LocationRef>,
    #[serde(
        rename = "implementationResults",
        default,
        skip_serializing_if = "Vec::is_empty"
    )]
    pub implementation_results: Vec<Id>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentSymbol {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub kind: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deprecated: Option<bool>,
    pub range: Range,
    #[serde(rename = "selectionRange")]
    pub selection_range: Range,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<DocumentSymbol>,
    /// Fields this crate does not interpret, kept so dumps survive a rewrite.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Document symbol that reuses an emitted declaration range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeBasedDocumentSymbol {
    pub id: Id,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<RangeBasedDocumentSymbol>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DocumentSymbolPayload {
    Ranges(Vec<RangeBasedDocumentSymbol>),
    Symbols(Vec<DocumentSymbol>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct DocumentSymbolResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<DocumentSymbolPayload>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub range: Range,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub message: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoldingRange {
    #[serde(rename = "startLine")]
    pub start_line: u32,
    #[serde(
        rename = "startCharacter",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub start_character: Option<u32>,
    #[serde(rename = "endLine")]
    pub end_line: u32,
    #[serde(
        rename = "endCharacter",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub end_character: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentLink {
    pub range: Range,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct ListResult<T> {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Vec<T>>,
}

impl<T> Default for ListResult<T> {
    fn default() -> Self {
        Self { result: None }
    }
}

impl<T> ListResult<T> {
    pub fn inline(items: Vec<T>) -> Self {
        Self {
            result: Some(items),
        }
    }
}

/// A moniker plus the ranges it denotes; used by export and import items.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MonikerItem {
    pub moniker: String,
    #[serde(rename = "rangeIds", default)]
    pub range_ids: Vec<Id>,
}

pub type MonikerResult = ListResult<MonikerItem>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "label", rename_all = "camelCase")]
pub enum VertexData {
    MetaData(MetaData),
    Project(Project),
    Document(Document),
    Range(RangeData),
    ResultSet,
    DeclarationResult(LocationsResult),
    DefinitionResult(LocationsResult),
    TypeDefinitionResult(LocationsResult),
    HoverResult(HoverResult),
    ReferenceResult(ReferenceResult),
    ImplementationResult(ImplementationResult),
    DocumentSymbolResult(DocumentSymbolResult),
    DiagnosticResult(ListResult<Diagnostic>),
    FoldingRangeResult(ListResult<FoldingRange>),
    DocumentLinkResult(ListResult<DocumentLink>),
    ExportResult(MonikerResult),
    ExternalImportResult(MonikerResult),
    ExportItem(MonikerItem),
    ExternalImportItem(MonikerItem),
}

impl VertexData {
    pub fn label(&self) -> VertexLabel {
        match self {
            VertexData::MetaData(_) => VertexLabel::MetaData,
            VertexData::Project(_) => VertexLabel::Project,
            VertexData::Document(_) => VertexLabel::Document,
            VertexData::Range(_) => VertexLabel::Range,
            VertexData::ResultSet => VertexLabel::ResultSet,
            VertexData::DeclarationResult(_) => VertexLabel::DeclarationResult,
            VertexData::DefinitionResult(_) => VertexLabel::DefinitionResult,
            VertexData::TypeDefinitionResult(_) => VertexLabel::TypeDefinitionResult,
            VertexData::HoverResult(_) => VertexLabel::HoverResult,
            VertexData::ReferenceResult(_) => VertexLabel::ReferenceResult,
            VertexData::ImplementationResult(_) => VertexLabel::ImplementationResult,
            VertexData::DocumentSymbolResult(_) => VertexLabel::DocumentSymbolResult,
            VertexData::DiagnosticResult(_) => VertexLabel::DiagnosticResult,
            VertexData::FoldingRangeResult(_) => VertexLabel::FoldingRangeResult,
            VertexData::DocumentLinkResult(_) => VertexLabel::DocumentLinkResult,
            VertexData::ExportResult(_) => VertexLabel::ExportResult,
            VertexData::ExternalImportResult(_) => VertexLabel::ExternalImportResult,
            VertexData::ExportItem(_) => VertexLabel::ExportItem,
            VertexData::ExternalImportItem(_) => VertexLabel::ExternalImportItem,
        }
    }

    /// Nested result ids carried in the payload (`referenceResults` /
    /// `implementationResults`).
    pub fn chained_results(&self) -> &[Id] {
        match self {
            VertexData::ReferenceResult(result) => &result.reference_results,
            VertexData::ImplementationResult(result) => &result.implementation_results,
            _ => &[],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum VertexLabel {
    MetaData,
    Project,
    Document,
    Range,
    ResultSet,
    DeclarationResult,
    DefinitionResult,
    TypeDefinitionResult,
    HoverResult,
    ReferenceResult,
    ImplementationResult,
    DocumentSymbolResult,
    DiagnosticResult,
    FoldingRangeResult,
    DocumentLinkResult,
    ExportResult,
    ExternalImportResult,
    ExportItem,
    ExternalImportItem,
}

impl VertexLabel {
    pub fn as_str(self) -> &'static str {
        match self {
            VertexLabel::MetaData => "metaData",
            VertexLabel::Project => "project",
            VertexLabel::Document => "document",
            VertexLabel::Range => "range",
            VertexLabel::ResultSet => "resultSet",
            VertexLabel::DeclarationResult => "declarationResult",
            VertexLabel::DefinitionResult => "definitionResult",
            VertexLabel::TypeDefinitionResult => "typeDefinitionResult",
            VertexLabel::HoverResult => "hoverResult",
            VertexLabel::ReferenceResult => "referenceResult",
            VertexLabel::ImplementationResult => "implementationResult",
            VertexLabel::DocumentSymbolResult => "documentSymbolResult",
            VertexLabel::DiagnosticResult => "diagnosticResult",
            VertexLabel::FoldingRangeResult => "foldingRangeResult",
            VertexLabel::DocumentLinkResult => "documentLinkResult",
            VertexLabel::ExportResult => "exportResult",
            VertexLabel::ExternalImportResult => "externalImportResult",
            VertexLabel::ExportItem => "exportItem",
            VertexLabel::ExternalImportItem => "externalImportItem",
        }
    }

    /// Result vertices that may chain to further results of the same label.
    pub fn is_chained_result(self) -> bool {
        matches!(
            self,
            VertexLabel::ReferenceResult | VertexLabel::ImplementationResult
        )
    }
}

impl fmt::Display for VertexLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    pub id: Id,
    #[serde(flatten)]
    pub data: VertexData,
}

impl Vertex {
    pub fn label(&self) -> VertexLabel {
        self.data.label()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EdgeLabel {
    #[serde(rename = "contains")]
    Contains,
    #[serde(rename = "item")]
    Item,
    #[serde(rename = "refersTo")]
    RefersTo,
    #[serde(rename = "exports")]
    Exports,
    #[serde(rename = "imports")]
    Imports,
    #[serde(rename = "textDocument/documentSymbol")]
    DocumentSymbol,
    #[serde(rename = "textDocument/foldingRange")]
    FoldingRange,
    #[serde(rename = "textDocument/documentLink")]
    DocumentLink,
    #[serde(rename = "textDocument/diagnostic")]
    Diagnostic,
    #[serde(rename = "textDocument/definition")]
    Definition,
    #[serde(rename = "textDocument/declaration")]
    Declaration,
    #[serde(rename = "textDocument/typeDefinition")]
    TypeDefinition,
    #[serde(rename = "textDocument/hover")]
    Hover,
    #[serde(rename = "textDocument/references")]
    References,
    #[serde(rename = "textDocument/implementation")]
    Implementation,
}

impl EdgeLabel {
    pub const ALL: [EdgeLabel; 15] = [
        EdgeLabel::Contains,
        EdgeLabel::Item,
        EdgeLabel::RefersTo,
        EdgeLabel::Exports,
        EdgeLabel::Imports,
        EdgeLabel::DocumentSymbol,
        EdgeLabel::FoldingRange,
        EdgeLabel::DocumentLink,
        EdgeLabel::Diagnostic,
        EdgeLabel::Definition,
        EdgeLabel::Declaration,
        EdgeLabel::TypeDefinition,
        EdgeLabel::Hover,
        EdgeLabel::References,
        EdgeLabel::Implementation,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EdgeLabel::Contains => "contains",
            EdgeLabel::Item => "item",
            EdgeLabel::RefersTo => "refersTo",
            EdgeLabel::Exports => "exports",
            EdgeLabel::Imports => "imports",
            EdgeLabel::DocumentSymbol => "textDocument/documentSymbol",
            EdgeLabel::FoldingRange => "textDocument/foldingRange",
            EdgeLabel::DocumentLink => "textDocument/documentLink",
            EdgeLabel::Diagnostic => "textDocument/diagnostic",
            EdgeLabel::Definition => "textDocument/definition",
            EdgeLabel::Declaration => "textDocument/declaration",
            EdgeLabel::TypeDefinition => "textDocument/typeDefinition",
            EdgeLabel::Hover => "textDocument/hover",
            EdgeLabel::References => "textDocument/references",
            EdgeLabel::Implementation => "textDocument/implementation",
        }
    }
}

impl fmt::Display for EdgeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub id: Id,
    pub label: EdgeLabel,
    #[serde(rename = "outV")]
    pub out_v: Id,
    #[serde(rename = "inV")]
    pub in_v: Id,
    /// Only meaningful on `item` edges, e.g. `definitions` or `references`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property: Option<String>,
}

impl Edge {
    pub fn new(id: Id, label: EdgeLabel, out_v: Id, in_v: Id) -> Self {
        Self {
            id,
            label,
            out_v,
            in_v,
            property: None,
        }
    }
}

/// One record of the element stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Element {
    Vertex(Vertex),
    Edge(Edge),
}

impl Element {
    pub fn id(&self) -> &Id {
        match self {
            Element::Vertex(vertex) => &vertex.id,
            Element::Edge(edge) => &edge.id,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Element::Vertex(vertex) => vertex.label().as_str(),
            Element::Edge(edge) => edge.label.as_str(),
        }
    }

    pub fn as_vertex(&self) -> Option<&Vertex> {
        match self {
            Element::Vertex(vertex) => Some(vertex),
            Element::Edge(_) => None,
        }
    }

    pub fn as_edge(&self) -> Option<&Edge> {
        match self {
            Element::Edge(edge) => Some(edge),
            Element::Vertex(_) => None,
        }
    }
}

impl From<Vertex> for Element {
    fn from(vertex: Vertex) -> Self {
        Element::Vertex(vertex)
    }
}

impl From<Edge> for Element {
    fn from(edge: Edge) -> Self {
        Element::Edge(edge)
    }
}

/// Query kinds answered by the resolver; each follows one edge label.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RequestKind {
    Definition,
    Declaration,
    TypeDefinition,
    Hover,
    References,
    Implementation,
    DocumentSymbol,
    FoldingRange,
    DocumentLink,
    Diagnostic,
    Exports,
    Imports,
}

impl RequestKind {
    pub fn edge_label(self) -> EdgeLabel {
        match self {
            RequestKind::Definition => EdgeLabel::Definition,
            RequestKind::Declaration => EdgeLabel::Declaration,
            RequestKind::TypeDefinition => EdgeLabel::TypeDefinition,
            RequestKind::Hover => EdgeLabel::Hover,
            RequestKind::References => EdgeLabel::References,
            RequestKind::Implementation => EdgeLabel::Implementation,
            RequestKind::DocumentSymbol => EdgeLabel::DocumentSymbol,
            RequestKind::FoldingRange => EdgeLabel::FoldingRange,
            RequestKind::DocumentLink => EdgeLabel::DocumentLink,
            RequestKind::Diagnostic => EdgeLabel::Diagnostic,
            RequestKind::Exports => EdgeLabel::Exports,
            RequestKind::Imports => EdgeLabel::Imports,
        }
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.edge_label().as_str())
    }
}

#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct GraphOverview {
    pub version: Option<String>,
    pub vertices: usize,
    pub edges: usize,
    pub vertex_labels: BTreeMap<String, usize>,
    pub edge_labels: BTreeMap<String, usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_records_use_label_tags() {
        let raw = r#"{"id":"r1","type":"vertex","label":"range","start":{"line":1,"character":2},"end":{"line":1,"character":6},"tag":{"type":"reference","text":"foo"}}"#;
        let element: Element = serde_json::from_str(raw).unwrap();
        assert_eq!(element.id(), &Id::from("r1"));
        assert_eq!(element.label(), "range");
        let Some(Vertex {
            data: VertexData::Range(range),
            ..
        }) = element.as_vertex()
        else {
            panic!("expected a range vertex");
        };
        assert_eq!(range.span(), Range::on_line(1, 2, 6));
        assert_eq!(range.tag.as_ref().map(RangeTag::text), Some("foo"));

        let unit: Element =
            serde_json::from_str(r#"{"id":4,"type":"vertex","label":"resultSet"}"#).unwrap();
        assert_eq!(unit.label(), "resultSet");
    }

    #[test]
    fn edge_records_use_lsp_method_labels() {
        let raw = r#"{"id":9,"type":"edge","label":"textDocument/hover","outV":4,"inV":"h"}"#;
        let element: Element = serde_json::from_str(raw).unwrap();
        let edge = element.as_edge().unwrap();
        assert_eq!(edge.label, EdgeLabel::Hover);
        assert_eq!(edge.out_v, Id::Int(4));
        assert_eq!(edge.in_v, Id::from("h"));
        assert_eq!(
            serde_json::to_value(&element).unwrap(),
            serde_json::from_str::<Value>(raw).unwrap()
        );
    }

    #[test]
    fn location_results_accept_one_or_many() {
        let one: LocationsResult = serde_json::from_str(r#"{"result":3}"#).unwrap();
        assert_eq!(
            one.result.unwrap().as_slice(),
            &[LocationRef::Range(Id::Int(3))]
        );
        let many: LocationsResult = serde_json::from_str(
            r#"{"result":[3,{"uri":"file:///x.ts","range":{"start":{"line":0,"character":0},"end":{"line":0,"character":1}}}]}"#,
        )
        .unwrap();
        assert_eq!(many.result.unwrap().as_slice().len(), 2);
    }

    #[test]
    fn hover_plain_text_joins_marked_strings() {
        let hover = Hover {
            contents: serde_json::json!(["a", {"language": "ts", "value": "b"}]),
            range: None,
        };
        assert_eq!(hover.plain_text(), "a\n\nb");
        assert_eq!(Hover::text("X").plain_text(), "X");
    }

    #[test]
    fn numeric_ids_parse_as_integers() {
        assert_eq!("42".parse::<Id>().unwrap(), Id::Int(42));
        assert_eq!("r42".parse::<Id>().unwrap(), Id::from("r42"));
    }
}

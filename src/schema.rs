//! Static shape of the graph: which vertex labels an edge label may connect,
//! and the per-label payload rules. Shared by the builder (reject on insert)
//! and the validator (report after the fact).

use crate::model::{EdgeLabel, MonikerItem, RangeData, VertexData, VertexLabel};

use VertexLabel as V;

type Pair = (VertexLabel, VertexLabel);

const CONTAINS: &[Pair] = &[(V::Project, V::Document), (V::Document, V::Range)];
const ITEM: &[Pair] = &[
    (V::ReferenceResult, V::Range),
    (V::ReferenceResult, V::ReferenceResult),
    (V::ExportResult, V::ExportItem),
    (V::ExternalImportResult, V::ExternalImportItem),
];
const REFERS_TO: &[Pair] = &[(V::Range, V::ResultSet)];
const EXPORTS: &[Pair] = &[(V::Document, V::ExportResult)];
const IMPORTS: &[Pair] = &[(V::Document, V::ExternalImportResult)];
const DOCUMENT_SYMBOL: &[Pair] = &[(V::Document, V::DocumentSymbolResult)];
const FOLDING_RANGE: &[Pair] = &[(V::Document, V::FoldingRangeResult)];
const DOCUMENT_LINK: &[Pair] = &[(V::Document, V::DocumentLinkResult)];
const DIAGNOSTIC: &[Pair] = &[
    (V::Project, V::DiagnosticResult),
    (V::Document, V::DiagnosticResult),
];
const DEFINITION: &[Pair] = &[
    (V::Range, V::DefinitionResult),
    (V::ResultSet, V::DefinitionResult),
];
const DECLARATION: &[Pair] = &[
    (V::Range, V::DeclarationResult),
    (V::ResultSet, V::DeclarationResult),
];
const TYPE_DEFINITION: &[Pair] = &[
    (V::Range, V::TypeDefinitionResult),
    (V::ResultSet, V::TypeDefinitionResult),
];
const HOVER: &[Pair] = &[(V::Range, V::HoverResult), (V::ResultSet, V::HoverResult)];
const REFERENCES: &[Pair] = &[
    (V::Range, V::ReferenceResult),
    (V::ResultSet, V::ReferenceResult),
];
const IMPLEMENTATION: &[Pair] = &[
    (V::Range, V::ImplementationResult),
    (V::ResultSet, V::ImplementationResult),
];

/// Permitted (out label, in label) pairs for an edge label.
pub fn permitted_pairs(label: EdgeLabel) -> &'static [Pair] {
    match label {
        EdgeLabel::Contains => CONTAINS,
        EdgeLabel::Item => ITEM,
        EdgeLabel::RefersTo => REFERS_TO,
        EdgeLabel::Exports => EXPORTS,
        EdgeLabel::Imports => IMPORTS,
        EdgeLabel::DocumentSymbol => DOCUMENT_SYMBOL,
        EdgeLabel::FoldingRange => FOLDING_RANGE,
        EdgeLabel::DocumentLink => DOCUMENT_LINK,
        EdgeLabel::Diagnostic => DIAGNOSTIC,
        EdgeLabel::Definition => DEFINITION,
        EdgeLabel::Declaration => DECLARATION,
        EdgeLabel::TypeDefinition => TYPE_DEFINITION,
        EdgeLabel::Hover => HOVER,
        EdgeLabel::References => REFERENCES,
        EdgeLabel::Implementation => IMPLEMENTATION,
    }
}

pub fn permits(label: EdgeLabel, out_label: VertexLabel, in_label: VertexLabel) -> bool {
    permitted_pairs(label)
        .iter()
        .any(|&(out, inn)| out == out_label && inn == in_label)
}

/// Only `item` edges may carry a `property`.
pub fn property_allowed(label: EdgeLabel) -> bool {
    label == EdgeLabel::Item
}

/// Payload shape rules for a single vertex. Returns the reason on failure.
pub fn check_vertex(data: &VertexData) -> Result<(), String> {
    match data {
        VertexData::MetaData(meta) => non_empty(&meta.version, "metaData version"),
        VertexData::Project(project) => non_empty(&project.kind, "project kind"),
        VertexData::Document(document) => non_empty(&document.uri, "document uri"),
        VertexData::Range(range) => check_range(range),
        VertexData::ExportItem(item) | VertexData::ExternalImportItem(item) => check_item(item),
        VertexData::ExportResult(result) | VertexData::ExternalImportResult(result) => result
            .result
            .iter()
            .flatten()
            .try_for_each(check_item),
        VertexData::ResultSet
        | VertexData::DeclarationResult(_)
        | VertexData::DefinitionResult(_)
        | VertexData::TypeDefinitionResult(_)
        | VertexData::HoverResult(_)
        | VertexData::ReferenceResult(_)
        | VertexData::ImplementationResult(_)
        | VertexData::DocumentSymbolResult(_)
        | VertexData::DiagnosticResult(_)
        | VertexData::FoldingRangeResult(_)
        | VertexData::DocumentLinkResult(_) => Ok(()),
    }
}

fn check_range(range: &RangeData) -> Result<(), String> {
    let span = range.span();
    if !span.is_ordered() {
        return Err(format!(
            "range start {}:{} is after end {}:{}",
            span.start.line, span.start.character, span.end.line, span.end.character
        ));
    }
    if let Some(symbol) = range.tag.as_ref().and_then(|tag| tag.symbol()) {
        if !symbol.full_range.is_ordered() {
            return Err("fullRange start is after its end".to_string());
        }
        if !symbol.full_range.contains(&span) {
            return Err("fullRange does not contain the range".to_string());
        }
    }
    Ok(())
}

fn check_item(item: &MonikerItem) -> Result<(), String> {
    non_empty(&item.moniker, "moniker")
}

fn non_empty(value: &str, what: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        Err(format!("{what} must not be empty"))
    } else {
        Ok(())
    }
}

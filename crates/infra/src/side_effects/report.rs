use std::collections::HashMap;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};

use procura_core::AggregateId;

use super::SideEffectError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportKind {
    InventoryReceipt,
    Invoice,
}

impl ReportKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ReportKind::InventoryReceipt => "inventory_receipt",
            ReportKind::Invoice => "invoice",
        }
    }
}

/// What to render: a title line followed by labelled fields, in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportRequest {
    pub kind: ReportKind,
    pub entity_id: AggregateId,
    pub title: String,
    pub fields: Vec<(String, String)>,
}

impl ReportRequest {
    pub fn new(kind: ReportKind, entity_id: AggregateId, title: impl Into<String>) -> Self {
        Self {
            kind,
            entity_id,
            title: title.into(),
            fields: Vec::new(),
        }
    }

    pub fn field(mut self, label: impl Into<String>, value: impl ToString) -> Self {
        self.fields.push((label.into(), value.to_string()));
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedReport {
    pub kind: ReportKind,
    pub entity_id: AggregateId,
    pub filename: String,
    pub content: String,
}

/// Produces the document attached to a receipt or invoice.
pub trait ReportRenderer: Send + Sync {
    fn render(&self, request: ReportRequest) -> Result<RenderedReport, SideEffectError>;
}

/// Line-oriented text documents, kept in memory keyed by entity.
///
/// Re-rendering an entity replaces its previous document.
#[derive(Debug, Default)]
pub struct PlainTextReportRenderer {
    documents: RwLock<HashMap<AggregateId, RenderedReport>>,
}

impl PlainTextReportRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Latest document rendered for `entity_id`.
    pub fn document(&self, entity_id: AggregateId) -> Option<RenderedReport> {
        self.documents
            .read()
            .ok()
            .and_then(|docs| docs.get(&entity_id).cloned())
    }
}

impl ReportRenderer for PlainTextReportRenderer {
    fn render(&self, request: ReportRequest) -> Result<RenderedReport, SideEffectError> {
        let mut content = request.title.clone();
        content.push('\n');
        for (label, value) in &request.fields {
            content.push_str(&format!("{label}: {value}\n"));
        }

        let report = RenderedReport {
            kind: request.kind,
            entity_id: request.entity_id,
            filename: format!("{}_report_{}.txt", request.kind.as_str(), request.entity_id),
            content,
        };

        let mut docs = self
            .documents
            .write()
            .map_err(|_| SideEffectError::Render("document store lock poisoned".to_string()))?;
        docs.insert(report.entity_id, report.clone());

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_title_and_fields_in_order() {
        let renderer = PlainTextReportRenderer::new();
        let id = AggregateId::new();

        let report = renderer
            .render(
                ReportRequest::new(ReportKind::Invoice, id, "Invoice Report - INV-7")
                    .field("Account Number", "ACC-1")
                    .field("Total Amount", "500.00"),
            )
            .unwrap();

        assert_eq!(report.filename, format!("invoice_report_{id}.txt"));
        assert_eq!(
            report.content,
            "Invoice Report - INV-7\nAccount Number: ACC-1\nTotal Amount: 500.00\n"
        );
    }

    #[test]
    fn re_rendering_replaces_the_stored_document() {
        let renderer = PlainTextReportRenderer::new();
        let id = AggregateId::new();

        for qty in [10, 12] {
            renderer
                .render(
                    ReportRequest::new(ReportKind::InventoryReceipt, id, "Inventory Receipt Report")
                        .field("Received Quantity", qty),
                )
                .unwrap();
        }

        let doc = renderer.document(id).unwrap();
        assert!(doc.content.contains("Received Quantity: 12"));
        assert!(doc.filename.starts_with("inventory_receipt_report_"));
    }
}

//! DOM report sink
//!
//! Mirrors the in-memory [`Report`] into the page. Each group renders into
//! `<tbody id="{group}-report">`, each row is a `<tr id="{row-key}">` with a
//! name cell, a status cell and a detail cell. Text is always set through
//! `textContent`, never as markup. A row left in the page by an earlier run
//! is reset to Pending and reused.

use std::collections::HashMap;

use integrity_core::{
    DeclareOutcome, Report, ReportSink, ResolveOutcome, RowSpec, Status, Verdict,
};
use web_sys::{Document, Element};

use crate::error::{CheckError, Result};

/// Get the current document.
pub fn document() -> Result<Document> {
    web_sys::window()
        .ok_or(CheckError::NoWindow)?
        .document()
        .ok_or(CheckError::NoDocument)
}

/// Id of the `<tbody>` a group renders into.
pub fn table_id(group: &str) -> String {
    format!("{}-report", group)
}

/// Classes of the status label text.
pub fn label_class(status: Status) -> &'static str {
    match status {
        Status::Pending => "text-yellow-400 font-semibold",
        Status::Pass => "text-green-400 font-semibold",
        Status::Flagged => "text-red-400 font-semibold",
    }
}

/// Classes of the detail cell.
pub fn detail_class(status: Status) -> &'static str {
    match status {
        Status::Pending => "p-3 table-cell-data text-gray-500",
        Status::Pass => "p-3 table-cell-data text-gray-300",
        Status::Flagged => "p-3 table-cell-data text-red-300",
    }
}

/// Elements of one rendered row that change on resolution.
struct RowElements {
    icon: Element,
    label: Element,
    detail: Element,
}

impl RowElements {
    fn show(&self, verdict: &Verdict) {
        let status = verdict.status();
        self.icon
            .set_class_name(&format!("status-icon {}", status.css_class()));
        self.label.set_class_name(label_class(status));
        self.label.set_text_content(Some(status.label()));
        self.detail.set_class_name(detail_class(status));
        self.detail.set_text_content(Some(verdict.detail()));
    }
}

/// [`ReportSink`] that renders into the page.
pub struct DomReportSink {
    document: Document,
    report: Report,
    rows: HashMap<String, RowElements>,
}

impl DomReportSink {
    pub fn new(document: Document) -> Self {
        Self {
            document,
            report: Report::new(),
            rows: HashMap::new(),
        }
    }

    pub fn report(&self) -> &Report {
        &self.report
    }

    pub fn into_report(self) -> Report {
        self.report
    }

    /// Number of rows present in the page.
    pub fn rendered(&self) -> usize {
        self.rows.len()
    }

    /// Render a Pending row, reusing the row a previous run left in the page.
    fn render_row(&self, row: &RowSpec) -> Result<Option<RowElements>> {
        let Some(table) = self.document.get_element_by_id(&table_id(&row.group)) else {
            log::warn!(
                "⚠️ No table '{}' for row '{}'; row not rendered",
                table_id(&row.group),
                row.key
            );
            return Ok(None);
        };

        let elements = match self.document.get_element_by_id(&row.key) {
            Some(existing) => adopt_row(&existing)?,
            None => self.create_row(&table, row)?,
        };
        elements.show(&Verdict::pending());
        Ok(Some(elements))
    }

    fn create_row(&self, table: &Element, row: &RowSpec) -> Result<RowElements> {
        let tr = self.create("tr", "")?;
        tr.set_id(&row.key);

        let name = self.create("td", "p-3 font-medium text-white")?;
        name.set_text_content(Some(&row.display_name));

        let status_cell = self.create("td", "p-3")?;
        let wrapper = self.create("div", "flex items-center")?;
        let icon = self.create("div", "")?;
        let label = self.create("span", "")?;
        wrapper.append_child(&icon).map_err(CheckError::dom)?;
        wrapper.append_child(&label).map_err(CheckError::dom)?;
        status_cell.append_child(&wrapper).map_err(CheckError::dom)?;

        let detail = self.create("td", "")?;

        for cell in [&name, &status_cell, &detail] {
            tr.append_child(cell).map_err(CheckError::dom)?;
        }
        table.append_child(&tr).map_err(CheckError::dom)?;

        Ok(RowElements { icon, label, detail })
    }

    fn create(&self, tag: &str, class: &str) -> Result<Element> {
        let element = self.document.create_element(tag).map_err(CheckError::dom)?;
        if !class.is_empty() {
            element.set_class_name(class);
        }
        Ok(element)
    }
}

/// Find the cells of a row rendered earlier.
fn adopt_row(tr: &Element) -> Result<RowElements> {
    let cells = tr.children();
    let malformed = || CheckError::Dom(format!("row '{}' is not a report row", tr.id()));

    let wrapper = cells
        .item(1)
        .and_then(|cell| cell.first_element_child())
        .ok_or_else(malformed)?;
    let icon = wrapper.first_element_child().ok_or_else(malformed)?;
    let label = wrapper.last_element_child().ok_or_else(malformed)?;
    let detail = cells.item(2).ok_or_else(malformed)?;

    Ok(RowElements { icon, label, detail })
}

impl ReportSink for DomReportSink {
    fn declare_row(&mut self, row: &RowSpec) {
        if self.report.declare(row) == DeclareOutcome::AlreadyDeclared {
            return;
        }
        match self.render_row(row) {
            Ok(Some(elements)) => {
                self.rows.insert(row.key.clone(), elements);
            }
            Ok(None) => {}
            Err(err) => log::error!("❌ Failed to render row '{}': {}", row.key, err),
        }
    }

    fn resolve_row(&mut self, key: &str, verdict: &Verdict) {
        if self.report.resolve(key, verdict) != ResolveOutcome::Applied {
            return;
        }
        if let Some(elements) = self.rows.get(key) {
            elements.show(verdict);
        }
    }
}

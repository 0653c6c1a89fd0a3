//! Structured table extraction for labeling sections.
//!
//! Labeling text sometimes embeds an HTML table (dosage by age group, for
//! instance). The first table is reduced to rows of `col1..colN → value`.

use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;

use super::extract::collapse_whitespace;
use crate::types::labeling::{CellValue, TableRow};

static TABLE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("table").unwrap());
static ROWS: LazyLock<Selector> = LazyLock::new(|| Selector::parse("tr").unwrap());
static LIST_ITEMS: LazyLock<Selector> = LazyLock::new(|| Selector::parse("li, item").unwrap());

/// Whether a text field carries an embedded table.
pub fn contains_table(text: &str) -> bool {
    text.to_ascii_lowercase().contains("<table")
}

/// Rows of the first table in `html`. No table yields an empty vec.
///
/// Rows without any `td` (header and spacer rows) are skipped.
pub fn extract_table(html: &str) -> Vec<TableRow> {
    let fragment = Html::parse_fragment(html);
    let Some(table) = fragment.select(&TABLE).next() else {
        return vec![];
    };

    table
        .select(&ROWS)
        .filter(|row| owning_table(*row).map(|t| t.id()) == Some(table.id()))
        .filter_map(extract_row)
        .collect()
}

fn owning_table(row: ElementRef<'_>) -> Option<ElementRef<'_>> {
    (*row)
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name() == "table")
}

fn extract_row(row: ElementRef<'_>) -> Option<TableRow> {
    let cells: Vec<ElementRef<'_>> = row
        .children()
        .filter_map(ElementRef::wrap)
        .filter(|el| el.value().name() == "td")
        .collect();

    if cells.is_empty() {
        return None;
    }

    Some(
        cells
            .into_iter()
            .enumerate()
            .map(|(i, cell)| (format!("col{}", i + 1), cell_value(cell)))
            .collect(),
    )
}

fn cell_value(cell: ElementRef<'_>) -> CellValue {
    let items: Vec<String> = cell.select(&LIST_ITEMS).map(element_text).collect();
    if items.is_empty() {
        CellValue::Text(element_text(cell))
    } else {
        CellValue::List(items)
    }
}

fn element_text(el: ElementRef<'_>) -> String {
    collapse_whitespace(&el.text().collect::<String>())
}

/// Embed rows back into an HTML table that [`extract_table`] reads as the
/// same rows.
pub fn render_table(rows: &[TableRow]) -> String {
    let mut html = String::from("<table><tbody>");
    for row in rows {
        html.push_str("<tr>");
        for value in row.values() {
            html.push_str("<td>");
            match value {
                CellValue::Text(text) => html.push_str(&escape_html(text)),
                CellValue::List(items) => {
                    html.push_str("<ul>");
                    for item in items {
                        html.push_str("<li>");
                        html.push_str(&escape_html(item));
                        html.push_str("</li>");
                    }
                    html.push_str("</ul>");
                }
            }
            html.push_str("</td>");
        }
        html.push_str("</tr>");
    }
    html.push_str("</tbody></table>");
    html
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOSAGE: &str = r#"
        <p>Directions</p>
        <table width="100%">
          <thead><tr><th>Age</th><th>Dose</th></tr></thead>
          <tbody>
            <tr><td>adults and children 12 years and over</td>
                <td><list><item>take 1 tablet every 4 to 6 hours</item>
                          <item>do not exceed 6 tablets in 24 hours</item></list></td></tr>
            <tr><td>children under 12   years</td><td>ask a doctor</td></tr>
            <tr></tr>
            <tr><td>notes</td><td><table><tr><td>inner</td></tr></table></td></tr>
          </tbody>
        </table>
        <table><tr><td>second table</td></tr></table>
    "#;

    #[test]
    fn test_extracts_rows() {
        let rows = extract_table(DOSAGE);
        assert_eq!(rows.len(), 3);

        assert_eq!(
            rows[0]["col1"],
            CellValue::Text("adults and children 12 years and over".into())
        );
        assert_eq!(
            rows[0]["col2"],
            CellValue::List(vec![
                "take 1 tablet every 4 to 6 hours".into(),
                "do not exceed 6 tablets in 24 hours".into(),
            ])
        );
        assert_eq!(rows[1]["col1"], CellValue::Text("children under 12 years".into()));
        assert_eq!(rows[1]["col2"], CellValue::Text("ask a doctor".into()));
        assert_eq!(rows[2]["col2"], CellValue::Text("inner".into()));
    }

    #[test]
    fn test_html_lists_are_list_cells() {
        let rows = extract_table("<table><tr><td><ul><li> a </li><li>b</li></ul></td></tr></table>");
        assert_eq!(rows[0]["col1"], CellValue::List(vec!["a".into(), "b".into()]));
    }

    #[test]
    fn test_no_table_is_empty() {
        assert!(extract_table("<p>Take 2 tablets daily.</p>").is_empty());
        assert!(extract_table("").is_empty());
    }

    #[test]
    fn test_reextracting_rendered_rows_is_idempotent() {
        let rows = extract_table(DOSAGE);
        let rendered = render_table(&rows);
        assert_eq!(extract_table(&rendered), rows);

        let tricky = extract_table("<table><tr><td>a &lt;b&gt; &amp; \"c\"</td></tr></table>");
        assert_eq!(tricky[0]["col1"], CellValue::Text("a <b> & \"c\"".into()));
        assert_eq!(extract_table(&render_table(&tricky)), tricky);
    }

    #[test]
    fn test_contains_table() {
        assert!(contains_table("<TABLE border=1>"));
        assert!(!contains_table("Keep tablets dry"));
    }
}

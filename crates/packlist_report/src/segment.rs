//! Table segmentation of a free-form packing-list sheet.

use packlist_io_xlsx::{EnumCellValue, SpecRawSheet};
use tracing::debug;

use crate::conf::{IDX_SIG_CASE_NOS, N_COL_SIDE_TEXT, TUP_ROWS_SIDE_TEXT};
use crate::matcher::is_header_match_with;
use crate::spec::{SpecExtractedTable, SpecMatchOptions};
use crate::util::derive_text;

/// Segmentation inputs beyond the sheet itself.
#[derive(Debug, Clone, Default)]
pub struct SpecSegmentOptions {
    pub spec_match: SpecMatchOptions,
    /// Externally supplied model name; wins over the sheet lookup.
    pub model_name: Option<String>,
}

/// Slice `sheet` into one table per header occurrence.
///
/// A table runs from its header to the first entirely empty row or the next
/// header, both excluded. Returns an empty vector when no header matches.
pub fn segment_sheet(
    sheet: &SpecRawSheet,
    signature: &[&str],
    options: &SpecSegmentOptions,
) -> Vec<SpecExtractedTable> {
    let c_side_text = derive_side_text(sheet);
    let is_header = |n_row: usize| is_header_match_with(sheet.row(n_row), signature, &options.spec_match);

    let mut l_tables = Vec::new();
    let mut n_row = 0usize;
    while n_row < sheet.n_rows() {
        if !is_header(n_row) {
            n_row += 1;
            continue;
        }

        let n_row_header = n_row;
        let n_width = sheet.row(n_row_header).len().max(signature.len());
        let mut n_row_end = n_row_header + 1;
        while n_row_end < sheet.n_rows() && !sheet.is_row_empty(n_row_end) && !is_header(n_row_end) {
            n_row_end += 1;
        }

        let rows: Vec<Vec<EnumCellValue>> = (n_row_header..n_row_end)
            .map(|idx| pad_row(sheet.row(idx), n_width))
            .collect();
        let model_name = match options.model_name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => derive_model_name(sheet, n_row_header, n_row_end),
        };

        debug!(
            n_table_idx = l_tables.len(),
            n_row_header,
            n_data_rows = n_row_end - n_row_header - 1,
            "segmented table"
        );
        l_tables.push(SpecExtractedTable {
            n_table_idx: l_tables.len(),
            rows,
            model_name,
            side_text: c_side_text.clone(),
            n_row_start: n_row_header,
        });
        n_row = n_row_end;
    }

    l_tables
}

fn pad_row(row: &[EnumCellValue], n_width: usize) -> Vec<EnumCellValue> {
    let mut l_cells = row.to_vec();
    if l_cells.len() < n_width {
        l_cells.resize(n_width, EnumCellValue::None);
    }
    l_cells
}

/// Value two sheet rows above the first case-number marker of the table.
///
/// The marker is normally the header itself, so the lookup reaches above the
/// table into the sheet. Empty when no marker exists or the row is out of range.
pub fn derive_model_name(sheet: &SpecRawSheet, n_row_start: usize, n_row_end: usize) -> String {
    (n_row_start..n_row_end)
        .find(|n_row| {
            derive_text(sheet.cell(*n_row, IDX_SIG_CASE_NOS))
                .to_lowercase()
                .contains("case")
        })
        .and_then(|n_row| n_row.checked_sub(2))
        .map(|n_row| derive_text(sheet.cell(n_row, IDX_SIG_CASE_NOS)))
        .unwrap_or_default()
}

/// Ship-to side panel: fixed rows of one column, trimmed, joined by newlines.
pub fn derive_side_text(sheet: &SpecRawSheet) -> String {
    let (n_row_first, n_row_last) = TUP_ROWS_SIDE_TEXT;
    (n_row_first..=n_row_last)
        .map(|n_row| derive_text(sheet.cell(n_row, N_COL_SIDE_TEXT)))
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::conf::TUP_HEADER_SIGNATURE;

    pub(crate) fn header_row() -> Vec<EnumCellValue> {
        TUP_HEADER_SIGNATURE
            .iter()
            .map(|label| EnumCellValue::from(*label))
            .collect()
    }

    pub(crate) fn data_row(carton: &str, color: &str) -> Vec<EnumCellValue> {
        let mut l_cells = vec![EnumCellValue::None; 21];
        l_cells[0] = EnumCellValue::from(carton);
        l_cells[1] = EnumCellValue::from("4500001");
        l_cells[7] = EnumCellValue::from(color);
        l_cells[9] = EnumCellValue::Number(12.0);
        l_cells
    }

    #[test]
    fn test_segment_two_tables_split_by_blank_and_header() {
        let mut l_rows = vec![Vec::new(); 20];
        l_rows[0] = vec![EnumCellValue::from("Air Jacket")];
        l_rows.push(vec![]);
        l_rows.push(header_row());
        l_rows.push(data_row("1", "Red"));
        l_rows.push(data_row("", "Red"));
        l_rows.push(vec![]);
        l_rows.push(data_row("9", "Stray"));
        l_rows.push(header_row());
        l_rows.push(data_row("2", "Blue"));
        l_rows.push(header_row());
        let sheet = SpecRawSheet::from_rows("PL", l_rows);

        let l_tables = segment_sheet(&sheet, &TUP_HEADER_SIGNATURE, &SpecSegmentOptions::default());

        assert_eq!(l_tables.len(), 3);
        assert_eq!(l_tables[0].n_row_start, 21);
        assert_eq!(l_tables[0].data_rows().len(), 2);
        assert_eq!(l_tables[1].n_row_start, 26);
        assert_eq!(l_tables[1].data_rows().len(), 1);
        assert_eq!(l_tables[2].data_rows().len(), 0);

        let mut l_rows_used: Vec<usize> = l_tables
            .iter()
            .flat_map(|table| table.n_row_start..table.n_row_start + table.rows.len())
            .collect();
        let n_rows_total = l_rows_used.len();
        l_rows_used.dedup();
        assert_eq!(l_rows_used.len(), n_rows_total);
    }

    #[test]
    fn test_model_name_from_two_rows_above_header_and_override() {
        let mut l_rows = vec![Vec::new(); 5];
        l_rows[2] = vec![EnumCellValue::from("Shipment 7")];
        l_rows[3] = vec![EnumCellValue::from(" Trail Runner 2 ")];
        l_rows.push(header_row());
        l_rows.push(data_row("1", "Red"));
        let sheet = SpecRawSheet::from_rows("PL", l_rows);

        let l_tables = segment_sheet(&sheet, &TUP_HEADER_SIGNATURE, &SpecSegmentOptions::default());
        assert_eq!(l_tables[0].model_name, "Trail Runner 2");

        let options = SpecSegmentOptions {
            model_name: Some("Given".to_string()),
            ..Default::default()
        };
        let l_tables = segment_sheet(&sheet, &TUP_HEADER_SIGNATURE, &options);
        assert_eq!(l_tables[0].model_name, "Given");
    }

    #[test]
    fn test_side_text_joins_fixed_rows() {
        let mut l_rows = vec![Vec::new(); 22];
        l_rows[14] = vec![EnumCellValue::None, EnumCellValue::None, EnumCellValue::from(" ACME GmbH ")];
        l_rows[16] = vec![EnumCellValue::None, EnumCellValue::None, EnumCellValue::from("Hamburg")];
        l_rows[20] = vec![EnumCellValue::None, EnumCellValue::None, EnumCellValue::from("ignored")];
        let sheet = SpecRawSheet::from_rows("PL", l_rows);

        assert_eq!(derive_side_text(&sheet), "ACME GmbH\nHamburg");
    }

    #[test]
    fn test_rows_are_padded_to_header_width() {
        let l_rows = vec![header_row(), vec![EnumCellValue::from("1")]];
        let sheet = SpecRawSheet::from_rows("PL", l_rows);

        let l_tables = segment_sheet(&sheet, &TUP_HEADER_SIGNATURE, &SpecSegmentOptions::default());
        assert_eq!(l_tables[0].data_rows()[0].len(), 21);
        assert_eq!(l_tables[0].model_name, "");
    }
}

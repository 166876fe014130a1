/// Render an aligned plain-text table. Numeric cells are right-aligned.
#[must_use]
pub fn render(headers: &[&str], rows: &[Vec<String>]) -> String {
    let widths: Vec<usize> = headers
        .iter()
        .enumerate()
        .map(|(index, header)| {
            rows.iter()
                .filter_map(|row| row.get(index))
                .map(|cell| cell.chars().count())
                .max()
                .unwrap_or(0)
                .max(header.chars().count())
        })
        .collect();

    let header_line = join_cells(headers.iter().map(|h| (*h).to_string()), &widths, false);
    let divider = "-".repeat(header_line.chars().count());

    let mut lines = Vec::with_capacity(rows.len() + 2);
    lines.push(header_line);
    lines.push(divider);
    for row in rows {
        let cells = (0..widths.len())
            .map(|i| row.get(i).cloned().unwrap_or_else(|| "-".to_string()));
        lines.push(join_cells(cells, &widths, true));
    }
    lines.join("\n")
}

fn join_cells(
    cells: impl Iterator<Item = String>,
    widths: &[usize],
    align_numbers: bool,
) -> String {
    cells
        .zip(widths)
        .map(|(cell, width)| {
            let pad = width.saturating_sub(cell.chars().count());
            if align_numbers && looks_numeric(&cell) {
                format!("{}{cell}", " ".repeat(pad))
            } else {
                format!("{cell}{}", " ".repeat(pad))
            }
        })
        .collect::<Vec<_>>()
        .join("  ")
        .trim_end()
        .to_string()
}

fn looks_numeric(value: &str) -> bool {
    let trimmed = value.trim();
    !trimmed.is_empty()
        && trimmed.parse::<f64>().is_ok()
}

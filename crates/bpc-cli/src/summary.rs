use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::{UTF8_FULL, UTF8_FULL_CONDENSED};
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use bpc_cli::types::{CategoryStatus, CategorySummary, CohortRun};

pub fn print_summary(run: &CohortRun) {
    println!("Cohort: {}", run.cohort);
    println!("Release: {}", run.release);
    if run.dry_run {
        println!("Output: none (dry run)");
    } else {
        println!("Output: {}", run.output_dir.join(&run.cohort).display());
    }

    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Category"),
        header_cell("Records"),
        header_cell("File"),
        header_cell("Status"),
    ]);
    apply_summary_table_style(&mut table);
    align_column(&mut table, 1, CellAlignment::Right);
    align_column(&mut table, 3, CellAlignment::Center);
    for summary in &run.categories {
        table.add_row(vec![
            name_cell(summary.category.name()),
            records_cell(summary),
            file_cell(summary),
            status_cell(summary.status),
        ]);
    }
    table.add_row(vec![
        Cell::new("TOTAL")
            .fg(Color::Cyan)
            .add_attribute(Attribute::Bold),
        Cell::new(run.total_records()).add_attribute(Attribute::Bold),
        dim_cell("-"),
        dim_cell("-"),
    ]);
    println!("{table}");
}

fn records_cell(summary: &CategorySummary) -> Cell {
    match summary.records {
        Some(count) if summary.status == CategoryStatus::Composed => dim_cell(count),
        Some(count) => Cell::new(count),
        None => dim_cell("-"),
    }
}

fn file_cell(summary: &CategorySummary) -> Cell {
    let name = summary
        .path
        .as_ref()
        .and_then(|path| path.file_name())
        .map(|name| name.to_string_lossy().into_owned());
    match name {
        Some(name) => Cell::new(name),
        None => dim_cell("-"),
    }
}

fn status_cell(status: CategoryStatus) -> Cell {
    let cell = Cell::new(status.label());
    match status {
        CategoryStatus::Written => cell.fg(Color::Green).add_attribute(Attribute::Bold),
        CategoryStatus::DryRun => cell.fg(Color::Yellow),
        CategoryStatus::Composed => cell.fg(Color::Blue),
        CategoryStatus::Skipped | CategoryStatus::Excluded => cell.fg(Color::DarkGrey),
    }
}

pub fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

fn apply_summary_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

pub fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

pub fn name_cell(label: &str) -> Cell {
    Cell::new(label).add_attribute(Attribute::Bold)
}

pub fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}

use std::time::Duration;

use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Modifier, Style, Stylize},
    symbols::border,
    text::{Line, Span, Text},
    widgets::{Block, Cell, Clear, Paragraph, Row, Table},
};

use crate::engine::SortDirection;
use crate::model::{Model, UIData, UiColumn};

pub const TITLE_HEIGHT: u16 = 1;
pub const FOOTER_HEIGHT: u16 = 2;
pub const COLUMN_WIDTH_MARGIN: u16 = 2;
const STATUS_MESSAGE_TTL: Duration = Duration::from_secs(5);

pub struct DashUI {}

impl DashUI {
    pub fn new() -> Self {
        Self {}
    }

    pub fn draw(&self, model: &Model, frame: &mut Frame) {
        let uidata = model.get_uidata();
        let [title_area, table_area, footer_area] = Layout::vertical([
            Constraint::Length(TITLE_HEIGHT),
            Constraint::Min(1),
            Constraint::Length(FOOTER_HEIGHT),
        ])
        .areas(frame.area());

        self.draw_title(uidata, title_area, frame);

        if let Some(detail) = &uidata.detail {
            let lines: Vec<Line> = detail
                .fields
                .iter()
                .map(|(label, value)| {
                    Line::from(vec![
                        Span::styled(format!("{label:>12}  "), Style::new().bold()),
                        Span::raw(value.clone()),
                    ])
                })
                .collect();
            let block = Block::bordered()
                .title(format!(
                    " {} ({}/{}) ",
                    detail.record_id,
                    detail.position + 1,
                    detail.total
                ))
                .border_set(border::THICK);
            frame.render_widget(Paragraph::new(lines).block(block), table_area);
        } else {
            self.draw_table(uidata, table_area, frame);
        }

        self.draw_footer(uidata, footer_area, frame);

        if let Some(menu) = &uidata.menu {
            let lines: Vec<Line> = menu
                .entries
                .iter()
                .enumerate()
                .map(|(idx, (label, visible))| {
                    let marker = if *visible { "[x]" } else { "[ ]" };
                    let line = Line::from(format!(" {marker} {label}"));
                    if idx == menu.cursor {
                        line.style(Style::new().add_modifier(Modifier::REVERSED))
                    } else {
                        line
                    }
                })
                .collect();
            let area = centered(frame.area(), 30, lines.len() as u16 + 2);
            frame.render_widget(Clear, area);
            frame.render_widget(
                Paragraph::new(lines).block(Block::bordered().title(" Toggle columns ")),
                area,
            );
        }

        if uidata.show_popup {
            let height = uidata.popup_message.lines().count() as u16 + 2;
            let area = centered(frame.area(), 50, height);
            frame.render_widget(Clear, area);
            frame.render_widget(
                Paragraph::new(uidata.popup_message.as_str())
                    .block(Block::bordered().title(" Help ").border_set(border::THICK)),
                area,
            );
        }
    }

    fn draw_title(&self, uidata: &UIData, area: Rect, frame: &mut Frame) {
        let mut spans = vec![Span::styled(uidata.title.clone(), Style::new().bold())];
        if uidata.table.filter_pending {
            spans.push(Span::raw("  filtering...").italic());
        }
        frame.render_widget(Line::from(spans), area);
    }

    fn draw_table(&self, uidata: &UIData, area: Rect, frame: &mut Frame) {
        // Emptiness is judged on the post-filter row count, before any
        // column is hidden.
        if uidata.table.total_filtered == 0 {
            frame.render_widget(
                Paragraph::new("No results.").centered().dim(),
                area,
            );
            return;
        }

        let columns = &uidata.table.columns;
        let header = Row::new(
            columns
                .iter()
                .map(|c| Cell::from(aligned(header_label(c), c.numeric)))
                .collect::<Vec<Cell>>(),
        )
        .style(Style::new().bold().underlined());

        let nrows = columns.first().map_or(0, |c| c.cells.len());
        let rows: Vec<Row> = (0..nrows)
            .map(|r| {
                let cells = columns.iter().enumerate().map(|(ci, c)| {
                    let cell = Cell::from(aligned(c.cells[r].clone(), c.numeric));
                    if r == uidata.selected_row && ci == uidata.selected_column {
                        cell.style(Style::new().add_modifier(Modifier::BOLD | Modifier::REVERSED))
                    } else if r == uidata.selected_row {
                        cell.style(Style::new().add_modifier(Modifier::REVERSED))
                    } else {
                        cell
                    }
                });
                Row::new(cells.collect::<Vec<Cell>>())
            })
            .collect();

        let widths: Vec<Constraint> = columns
            .iter()
            .map(|c| Constraint::Length(c.width as u16 + COLUMN_WIDTH_MARGIN))
            .collect();

        frame.render_widget(Table::new(rows, widths).header(header), area);
    }

    fn draw_footer(&self, uidata: &UIData, area: Rect, frame: &mut Frame) {
        let [meta_area, status_area] =
            Layout::vertical([Constraint::Length(1), Constraint::Length(1)]).areas(area);

        let table = &uidata.table;
        let page_display = if table.total_pages == 0 {
            "Page 0/0".to_string()
        } else {
            format!("Page {}/{}", table.page_index + 1, table.total_pages)
        };
        let meta = Line::from(format!(
            "{page_display}  |  {} rows  |  size {}",
            table.total_filtered, table.page_size
        ))
        .dim();
        frame.render_widget(meta, meta_area);

        if uidata.active_cmdinput {
            let input = &uidata.cmdinput;
            let line = Line::from(vec![
                Span::styled("/", Style::new().bold()),
                Span::raw(input.input.clone()),
                Span::styled(" ", Style::new().add_modifier(Modifier::REVERSED)),
            ]);
            frame.render_widget(line, status_area);
        } else if uidata.last_status_message_update.elapsed() < STATUS_MESSAGE_TTL {
            frame.render_widget(Line::from(uidata.status_message.clone()), status_area);
        }
    }
}

fn aligned(text: String, numeric: bool) -> Text<'static> {
    let text = Text::from(text);
    if numeric { text.right_aligned() } else { text }
}

fn header_label(column: &UiColumn) -> String {
    match column.sort {
        Some((SortDirection::Ascending, 0)) => format!("{} ^", column.label),
        Some((SortDirection::Descending, 0)) => format!("{} v", column.label),
        Some((SortDirection::Ascending, pos)) => format!("{} ^{}", column.label, pos + 1),
        Some((SortDirection::Descending, pos)) => format!("{} v{}", column.label, pos + 1),
        None => column.label.clone(),
    }
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let [area] = Layout::horizontal([Constraint::Length(width.min(area.width))])
        .flex(ratatui::layout::Flex::Center)
        .areas(area);
    let [area] = Layout::vertical([Constraint::Length(height.min(area.height))])
        .flex(ratatui::layout::Flex::Center)
        .areas(area);
    area
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_labels_mark_sort_direction_and_rank() {
        let col = |sort| UiColumn {
            key: "price".to_string(),
            label: "Price".to_string(),
            width: 5,
            numeric: true,
            cells: Vec::new(),
            sort,
        };
        assert_eq!(header_label(&col(None)), "Price");
        assert_eq!(
            header_label(&col(Some((SortDirection::Ascending, 0)))),
            "Price ^"
        );
        assert_eq!(
            header_label(&col(Some((SortDirection::Descending, 1)))),
            "Price v2"
        );
    }

    #[test]
    fn centered_rect_fits_inside_the_area() {
        let area = Rect::new(0, 0, 80, 24);
        let popup = centered(area, 30, 10);
        assert!(popup.width <= 30);
        assert!(popup.height <= 10);
        assert!(popup.x >= area.x && popup.right() <= area.right());
        assert!(popup.y >= area.y && popup.bottom() <= area.bottom());
    }
}

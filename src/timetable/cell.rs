use std::sync::LazyLock;

use scraper::{ElementRef, Html, Node, Selector};

static ROW: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("tr").expect("Invalid tr selector"));
static CELL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("td, th").expect("Invalid cell selector"));

/// Column of the schedule table a cell belongs to, taken from its CSS class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Day,
    Time,
    Subject,
    Counterpart,
    Room,
}

impl Column {
    fn from_classes<'a>(mut classes: impl Iterator<Item = &'a str>) -> Option<Self> {
        classes.find_map(|class| match class {
            "daeweek" => Some(Column::Day),
            "schtime" => Some(Column::Time),
            "schname" => Some(Column::Subject),
            "schteacher" => Some(Column::Counterpart),
            "schclass" => Some(Column::Room),
            _ => None,
        })
    }
}

/// One table cell in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    /// Index of the `<tr>` the cell sits in.
    pub row: usize,
    /// Trimmed lines of text, `<br>` separated in the source, joined with '\n'.
    pub text: String,
    pub rowspan: bool,
    pub column: Option<Column>,
}

impl Cell {
    pub fn is_blank(&self) -> bool {
        self.text.is_empty()
    }
}

#[cfg(test)]
impl Cell {
    pub fn new(row: usize, text: &str) -> Self {
        Self {
            row,
            text: normalize_lines(text),
            rowspan: false,
            column: None,
        }
    }

    pub fn with_rowspan(mut self) -> Self {
        self.rowspan = true;
        self
    }

    pub fn in_column(mut self, column: Column) -> Self {
        self.column = Some(column);
        self
    }
}

/// Flatten every table row of a schedule page into its cells.
pub fn cells_from_html(html: &str) -> Vec<Cell> {
    let document = Html::parse_document(html);
    let mut cells = Vec::new();

    for (row, tr) in document.select(&ROW).enumerate() {
        for td in tr.select(&CELL) {
            let element = td.value();
            cells.push(Cell {
                row,
                text: normalize_lines(&cell_text(td)),
                rowspan: element.attr("rowspan").is_some(),
                column: Column::from_classes(element.classes()),
            });
        }
    }

    cells
}

/// Text of an element with `<br>` rendered as a line break.
pub fn cell_text(element: ElementRef) -> String {
    let mut text = String::new();
    for node in element.descendants() {
        match node.value() {
            Node::Text(t) => text.push_str(t),
            Node::Element(e) if e.name() == "br" => text.push('\n'),
            _ => {}
        }
    }
    text
}

fn normalize_lines(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

use std::cmp::Ordering;

/// One cell's value. Dates carry unix seconds so they order chronologically.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Number(f64),
    Date(i64),
}

impl CellValue {
    pub fn display(&self) -> String {
        match self {
            CellValue::Text(s) => s.clone(),
            CellValue::Number(n) => {
                if n.fract() == 0.0 {
                    format!("{:.0}", n)
                } else {
                    format!("{}", n)
                }
            }
            CellValue::Date(secs) => format_date(*secs),
        }
    }

    /// Value-type-aware comparison: numeric/chronological where the value
    /// carries one, lexicographic (case-sensitive) otherwise. Total order
    /// so it can drive a stable sort; NaN sorts as equal.
    pub fn compare(&self, other: &CellValue) -> Ordering {
        match (self, other) {
            (CellValue::Number(a), CellValue::Number(b)) => {
                a.partial_cmp(b).unwrap_or(Ordering::Equal)
            }
            (CellValue::Date(a), CellValue::Date(b)) => a.cmp(b),
            (a, b) => a.display().cmp(&b.display()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ValueKind {
    Text,
    Number,
    Date,
}

/// Row data as the view engine sees it: identity plus field access by
/// column key. Implementors return `Text("")` for keys they do not carry.
pub trait Record {
    fn id(&self) -> &str;
    fn value(&self, key: &str) -> CellValue;
}

/// Schema entry for one table column.
pub struct ColumnDescriptor {
    /// Stable key, unique within a schema. Filter and sort specs refer to it.
    pub key: &'static str,
    pub label: &'static str,
    pub kind: ValueKind,
    /// Whether the visibility menu may hide this column.
    pub hideable: bool,
    /// Custom cell rendering; `None` falls back to `CellValue::display`.
    pub format: Option<fn(&CellValue) -> String>,
}

impl ColumnDescriptor {
    pub fn render(&self, value: &CellValue) -> String {
        match self.format {
            Some(f) => f(value),
            None => value.display(),
        }
    }
}

fn format_money(value: &CellValue) -> String {
    match value {
        CellValue::Number(n) => format!("${:.2}", n),
        other => other.display(),
    }
}

pub fn product_columns() -> Vec<ColumnDescriptor> {
    vec![
        ColumnDescriptor {
            key: "id",
            label: "Id",
            kind: ValueKind::Text,
            hideable: true,
            format: None,
        },
        ColumnDescriptor {
            key: "name",
            label: "Name",
            kind: ValueKind::Text,
            hideable: false,
            format: None,
        },
        ColumnDescriptor {
            key: "description",
            label: "Description",
            kind: ValueKind::Text,
            hideable: true,
            format: None,
        },
        ColumnDescriptor {
            key: "price",
            label: "Price",
            kind: ValueKind::Number,
            hideable: true,
            format: Some(format_money),
        },
        ColumnDescriptor {
            key: "color",
            label: "Color",
            kind: ValueKind::Text,
            hideable: true,
            format: None,
        },
        ColumnDescriptor {
            key: "created_at",
            label: "Created",
            kind: ValueKind::Date,
            hideable: true,
            format: None,
        },
    ]
}

pub fn order_columns() -> Vec<ColumnDescriptor> {
    vec![
        ColumnDescriptor {
            key: "id",
            label: "Id",
            kind: ValueKind::Text,
            hideable: true,
            format: None,
        },
        ColumnDescriptor {
            key: "product_name",
            label: "Product",
            kind: ValueKind::Text,
            hideable: false,
            format: None,
        },
        ColumnDescriptor {
            key: "quantity",
            label: "Quantity",
            kind: ValueKind::Number,
            hideable: true,
            format: None,
        },
        ColumnDescriptor {
            key: "total",
            label: "Total",
            kind: ValueKind::Number,
            hideable: true,
            format: Some(format_money),
        },
        ColumnDescriptor {
            key: "ordered_at",
            label: "Ordered",
            kind: ValueKind::Date,
            hideable: true,
            format: None,
        },
    ]
}

// Unix seconds to "YYYY-MM-DD", days-from-epoch civil conversion.
fn format_date(secs: i64) -> String {
    let days = secs.div_euclid(86_400);
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097);
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let y = yoe + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = doy - (153 * mp + 2) / 5 + 1;
    let m = if mp < 10 { mp + 3 } else { mp - 9 };
    let y = if m <= 2 { y + 1 } else { y };
    format!("{:04}-{:02}-{:02}", y, m, d)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dates_render_as_iso_days() {
        assert_eq!(format_date(0), "1970-01-01");
        assert_eq!(format_date(86_400), "1970-01-02");
        // 2024-02-29 00:00:00 UTC
        assert_eq!(format_date(1_709_164_800), "2024-02-29");
    }

    #[test]
    fn numbers_compare_numerically_not_lexically() {
        let a = CellValue::Number(9.0);
        let b = CellValue::Number(10.0);
        assert_eq!(a.compare(&b), Ordering::Less);
    }

    #[test]
    fn money_format_applies_to_numbers_only() {
        assert_eq!(format_money(&CellValue::Number(12.5)), "$12.50");
        assert_eq!(format_money(&CellValue::Text("n/a".into())), "n/a");
    }
}

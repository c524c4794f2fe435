use polars::prelude::*;
use rayon::prelude::*;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};

use crate::columns::{CellValue, Record};
use crate::domain::DashError;

#[derive(Debug)]
enum FileType {
    CSV,
    PARQUET,
}

#[derive(Debug, Clone)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub description: String,
    pub price: f64,
    pub color: String,
    pub created_at: i64,
}

impl Record for Product {
    fn id(&self) -> &str {
        &self.id
    }

    fn value(&self, key: &str) -> CellValue {
        match key {
            "id" => CellValue::Text(self.id.clone()),
            "name" => CellValue::Text(self.name.clone()),
            "description" => CellValue::Text(self.description.clone()),
            "price" => CellValue::Number(self.price),
            "color" => CellValue::Text(self.color.clone()),
            "created_at" => CellValue::Date(self.created_at),
            _ => CellValue::Text(String::new()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Order {
    pub id: String,
    pub product_id: String,
    pub product_name: String,
    pub quantity: f64,
    pub total: f64,
    pub ordered_at: i64,
}

impl Record for Order {
    fn id(&self) -> &str {
        &self.id
    }

    fn value(&self, key: &str) -> CellValue {
        match key {
            "id" => CellValue::Text(self.id.clone()),
            "product_id" => CellValue::Text(self.product_id.clone()),
            "product_name" => CellValue::Text(self.product_name.clone()),
            "quantity" => CellValue::Number(self.quantity),
            "total" => CellValue::Number(self.total),
            "ordered_at" => CellValue::Date(self.ordered_at),
            _ => CellValue::Text(String::new()),
        }
    }
}

pub fn load_products(path: &Path) -> Result<Vec<Product>, DashError> {
    let df = load_frame(path)?;
    let ids = str_column(&df, "id")?;
    let names = str_column(&df, "name")?;
    let descriptions = str_column(&df, "description")?;
    let prices = f64_column(&df, "price")?;
    let colors = str_column(&df, "color")?;
    let created = date_column(&df, "created_at")?;

    let products = (0..df.height())
        .into_par_iter()
        .map(|i| Product {
            id: ids[i].clone(),
            name: names[i].clone(),
            description: descriptions[i].clone(),
            price: prices[i],
            color: colors[i].clone(),
            created_at: created[i],
        })
        .collect();
    Ok(products)
}

pub fn load_orders(path: &Path) -> Result<Vec<Order>, DashError> {
    let df = load_frame(path)?;
    let ids = str_column(&df, "id")?;
    let product_ids = str_column(&df, "product_id")?;
    let product_names = str_column(&df, "product_name")?;
    let quantities = f64_column(&df, "quantity")?;
    let totals = f64_column(&df, "total")?;
    let ordered = date_column(&df, "ordered_at")?;

    let orders = (0..df.height())
        .into_par_iter()
        .map(|i| Order {
            id: ids[i].clone(),
            product_id: product_ids[i].clone(),
            product_name: product_names[i].clone(),
            quantity: quantities[i],
            total: totals[i],
            ordered_at: ordered[i],
        })
        .collect();
    Ok(orders)
}

fn load_frame(path: &Path) -> Result<DataFrame, DashError> {
    let file_type = file_info(path)?;
    let frame = match file_type {
        FileType::CSV => load_csv(path)?,
        FileType::PARQUET => load_parquet(path)?,
    };

    let start_time = Instant::now();
    let df = frame.collect()?;
    info!(
        "Loaded {} rows from {} in {}ms",
        df.height(),
        path.display(),
        start_time.elapsed().as_millis()
    );
    debug!("Schema: {:?}", df.schema());
    Ok(df)
}

fn detect_file_type(path: &Path) -> Result<FileType, DashError> {
    match path
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_uppercase())
        .as_deref()
    {
        Some("CSV") => Ok(FileType::CSV),
        Some("PARQUET") | Some("PQ") => Ok(FileType::PARQUET),
        _ => Err(DashError::UnknownFileType(path.display().to_string())),
    }
}

fn file_info(path: &Path) -> Result<FileType, DashError> {
    let metadata = fs::metadata(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => DashError::FileNotFound(path.display().to_string()),
        ErrorKind::PermissionDenied => DashError::PermissionDenied(path.display().to_string()),
        _ => DashError::IoError(e),
    })?;
    if !metadata.is_file() {
        return Err(DashError::LoadingFailed(format!(
            "{} is not a file",
            path.display()
        )));
    }
    detect_file_type(path)
}

fn load_csv(path: &Path) -> Result<LazyFrame, PolarsError> {
    LazyCsvReader::new(PlPath::Local(path.into()))
        .with_has_header(true)
        .finish()
}

fn load_parquet(path: &Path) -> Result<LazyFrame, PolarsError> {
    LazyFrame::scan_parquet(PlPath::Local(path.into()), ScanArgsParquet::default())
}

fn require_column<'a>(df: &'a DataFrame, name: &str) -> Result<&'a Column, DashError> {
    df.column(name)
        .map_err(|_| DashError::MissingColumn(name.to_string()))
}

fn str_column(df: &DataFrame, name: &str) -> Result<Vec<String>, DashError> {
    let col = require_column(df, name)?.cast(&DataType::String)?;
    let series = col.str()?;
    Ok(series
        .into_iter()
        .map(|v| v.map(|s| s.to_string()).unwrap_or_default())
        .collect())
}

fn f64_column(df: &DataFrame, name: &str) -> Result<Vec<f64>, DashError> {
    let col = require_column(df, name)?.cast(&DataType::Float64)?;
    let series = col.f64()?;
    Ok(series.into_iter().map(|v| v.unwrap_or(0.0)).collect())
}

// Date columns arrive either as "YYYY-MM-DD" strings or as unix seconds.
fn date_column(df: &DataFrame, name: &str) -> Result<Vec<i64>, DashError> {
    let values = str_column(df, name)?;
    Ok(values.iter().map(|s| parse_date(s)).collect())
}

fn parse_date(s: &str) -> i64 {
    if let Ok(secs) = s.parse::<i64>() {
        return secs;
    }
    let mut parts = s.splitn(3, '-');
    let (y, m, d) = match (
        parts.next().and_then(|p| p.parse::<i64>().ok()),
        parts.next().and_then(|p| p.parse::<i64>().ok()),
        parts.next().and_then(|p| p.parse::<i64>().ok()),
    ) {
        (Some(y), Some(m), Some(d)) => (y, m, d),
        _ => return 0,
    };
    // Civil date to days-from-epoch.
    let y = if m <= 2 { y - 1 } else { y };
    let era = y.div_euclid(400);
    let yoe = y - era * 400;
    let mp = if m > 2 { m - 3 } else { m + 9 };
    let doy = (153 * mp + 2) / 5 + d - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    (era * 146_097 + doe - 719_468) * 86_400
}

pub fn expand_path(raw: &str) -> Result<PathBuf, DashError> {
    let expanded = shellexpand::full(raw)
        .map_err(|e| DashError::LoadingFailed(format!("Cannot expand path {raw}: {e}")))?;
    Ok(PathBuf::from(expanded.as_ref()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iso_dates_round_trip_through_parse() {
        assert_eq!(parse_date("1970-01-01"), 0);
        assert_eq!(parse_date("1970-01-02"), 86_400);
        assert_eq!(parse_date("2024-02-29"), 1_709_164_800);
    }

    #[test]
    fn numeric_dates_pass_through_as_seconds() {
        assert_eq!(parse_date("1709164800"), 1_709_164_800);
    }

    #[test]
    fn unparsable_dates_fall_back_to_epoch() {
        assert_eq!(parse_date("soon"), 0);
    }

    #[test]
    fn record_values_resolve_by_column_key() {
        let p = Product {
            id: "p1".into(),
            name: "Mug".into(),
            description: "Ceramic".into(),
            price: 12.5,
            color: "blue".into(),
            created_at: 0,
        };
        assert_eq!(p.id(), "p1");
        assert_eq!(p.value("price"), CellValue::Number(12.5));
        assert_eq!(p.value("nonexistent"), CellValue::Text(String::new()));
    }
}

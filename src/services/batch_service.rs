use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use sqlx::SqlitePool;
use tracing::info;

use crate::errors::AppError;
use crate::external::page_fetcher::SharedSession;
use crate::services::price_service::{self, FetchPolicy};

/// Ingest files are semicolon-delimited, as exported by the collection
/// tools this service is fed from.
const DELIMITER: u8 = b';';

const URL_COLUMN: &str = "URL";
const TREND_COLUMN: &str = "Trend Price";
const AVG_30_COLUMN: &str = "30-Day Avg Price";

#[derive(Debug)]
pub struct BatchOutput {
    pub filename: String,
    pub content: Vec<u8>,
    pub rows: usize,
}

/// Run every row of an uploaded CSV through the price lookup, in input
/// order, and produce the same table with `Trend Price` and `30-Day Avg
/// Price` appended. A row whose fetch degrades comes back with empty price
/// cells; the batch keeps going. Rows are processed one at a time since any
/// of them may need the single fetching session.
pub async fn run_csv_batch(
    pool: &SqlitePool,
    session: &SharedSession,
    policy: &FetchPolicy,
    input_name: &str,
    data: &[u8],
) -> Result<BatchOutput, AppError> {
    let mut reader = ReaderBuilder::new()
        .delimiter(DELIMITER)
        .has_headers(true)
        .from_reader(data);

    let headers = reader.headers().map_err(csv_invalid)?.clone();
    let url_index = headers
        .iter()
        .position(|h| h == URL_COLUMN)
        .ok_or_else(|| {
            AppError::Validation(format!("CSV file must contain a '{URL_COLUMN}' column."))
        })?;

    let mut writer = WriterBuilder::new().delimiter(DELIMITER).from_writer(Vec::new());

    let mut out_headers = headers.clone();
    out_headers.push_field(TREND_COLUMN);
    out_headers.push_field(AVG_30_COLUMN);
    writer.write_record(&out_headers).map_err(csv_invalid)?;

    let mut rows = 0;
    for row in reader.records() {
        let row = row.map_err(csv_invalid)?;
        let url = row.get(url_index).unwrap_or("").trim().to_string();

        info!("📢 Fetching prices for: {}...", url);
        let quote = price_service::fetch_price(pool, session, policy, &url).await?;

        let mut out_row = StringRecord::new();
        for field in row.iter() {
            out_row.push_field(field);
        }
        out_row.push_field(&format_price(quote.trend_price));
        out_row.push_field(&format_price(quote.avg_30_price));
        writer.write_record(&out_row).map_err(csv_invalid)?;

        rows += 1;
    }

    let content = writer
        .into_inner()
        .map_err(|e| AppError::Validation(format!("Failed to assemble CSV output: {e}")))?;

    Ok(BatchOutput {
        filename: format!("updated_{input_name}"),
        content,
        rows,
    })
}

fn format_price(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn csv_invalid(e: csv::Error) -> AppError {
    AppError::Validation(format!("Invalid CSV file: {e}"))
}

use crate::data::bar::Bar;
use anyhow::{bail, Context, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use csv::ReaderBuilder;
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct CsvRecord {
    #[serde(alias = "Date", alias = "date", alias = "Datetime", alias = "Timestamp")]
    timestamp: String,
    #[serde(alias = "Open")]
    open: f64,
    #[serde(alias = "High")]
    high: f64,
    #[serde(alias = "Low")]
    low: f64,
    #[serde(alias = "Close")]
    close: f64,
    #[serde(alias = "Volume", default)]
    volume: f64,
    #[serde(alias = "Symbol", alias = "Ticker", default)]
    symbol: Option<String>,
}

//loads bars from a csv file
pub fn load_csv<P: AsRef<Path>>(path: P) -> Result<Vec<Bar>> {
    load_csv_for_symbol(path, None)
}

//loads bars from a csv file, keeping only rows for `symbol` when the file
//carries a symbol column
pub fn load_csv_for_symbol<P: AsRef<Path>>(path: P, symbol: Option<&str>) -> Result<Vec<Bar>> {
    let path = path.as_ref();
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .context(format!("Failed to open CSV file: {:?}", path))?;

    let mut bars = Vec::new();

    for (index, result) in reader.deserialize().enumerate() {
        let record: CsvRecord =
            result.context(format!("Failed to parse CSV record at line {}", index + 2))?;

        if let (Some(wanted), Some(found)) = (symbol, record.symbol.as_deref()) {
            if !found.eq_ignore_ascii_case(wanted) {
                continue;
            }
        }

        let timestamp = parse_timestamp(&record.timestamp).context(format!(
            "Failed to parse timestamp '{}' at line {}",
            record.timestamp,
            index + 2
        ))?;

        let bar = Bar::new(
            timestamp,
            record.open,
            record.high,
            record.low,
            record.close,
            record.volume,
        )
        .context(format!("Invalid bar at line {}", index + 2))?;
        bars.push(bar);
    }

    //sort by timestamp to ensure chronological order
    bars.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));

    if let Some(pair) = bars.windows(2).find(|w| w[0].timestamp == w[1].timestamp) {
        bail!("Duplicate timestamp {} in {:?}", pair[0].timestamp, path);
    }

    Ok(bars)
}

//accepts rfc3339, "YYYY-MM-DD HH:MM:SS" and plain dates (midnight utc)
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }

    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Ok(naive.and_utc());
    }

    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")?;
    match date.and_hms_opt(0, 0, 0) {
        Some(naive) => Ok(naive.and_utc()),
        None => bail!("invalid date {}", raw),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn loads_yahoo_style_headers_and_sorts() {
        let file = write_csv(
            "Date,Open,High,Low,Close,Volume\n\
             2024-01-03,11,12,10,11.5,200\n\
             2024-01-02,10,11,9,10.5,100\n",
        );

        let bars = load_csv(file.path()).unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].close, 10.5);
        assert_eq!(bars[1].volume, 200.0);
        assert!(bars[0].timestamp < bars[1].timestamp);
    }

    #[test]
    fn filters_rows_by_symbol() {
        let file = write_csv(
            "timestamp,open,high,low,close,volume,symbol\n\
             2024-01-02T00:00:00Z,1,1,1,1,1,AAPL\n\
             2024-01-02T00:00:00Z,2,2,2,2,1,MSFT\n\
             2024-01-03T00:00:00Z,3,3,3,3,1,AAPL\n",
        );

        let bars = load_csv_for_symbol(file.path(), Some("aapl")).unwrap();
        assert_eq!(bars.len(), 2);
        assert!(bars.iter().all(|b| b.close != 2.0));
    }

    #[test]
    fn duplicate_timestamps_are_rejected() {
        let file = write_csv(
            "Date,Open,High,Low,Close\n\
             2024-01-02,1,1,1,1\n\
             2024-01-02,2,2,2,2\n",
        );

        assert!(load_csv(file.path()).is_err());
    }

    #[test]
    fn inconsistent_ohlc_is_rejected() {
        let file = write_csv(
            "Date,Open,High,Low,Close\n\
             2024-01-02,1,1,2,1\n",
        );

        let err = load_csv(file.path()).unwrap_err();
        assert!(format!("{:#}", err).contains("line 2"));
    }

    #[test]
    fn parses_space_separated_datetime() {
        let ts = parse_timestamp("2024-05-01 13:30:00").unwrap();
        assert_eq!(ts.to_rfc3339(), "2024-05-01T13:30:00+00:00");
    }
}

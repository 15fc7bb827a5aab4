use std::{io::Read, path::Path};

use serde::{Deserialize, Serialize};

use super::{HOURS_PER_YEAR, LoadError, LoadProfile};

/// Unit of the power columns in a load file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PowerUnit {
    Watt,
    #[default]
    Kilowatt,
    Megawatt,
}

impl PowerUnit {
    fn to_kilowatt(self) -> f64 {
        match self {
            Self::Watt => 1e-3,
            Self::Kilowatt => 1.0,
            Self::Megawatt => 1e3,
        }
    }
}

/// Layout of an hourly load file.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CsvOptions {
    pub delimiter: u8,
    pub decimal: char,
    pub has_header: bool,
    /// Zero-based column of the heating (extraction) power.
    pub heating_column: usize,
    /// Zero-based column of the cooling (injection) power.
    pub cooling_column: usize,
    pub unit: PowerUnit,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            delimiter: b';',
            decimal: '.',
            has_header: true,
            heating_column: 0,
            cooling_column: 1,
            unit: PowerUnit::Kilowatt,
        }
    }
}

/// Reads an hourly heating/cooling load.
///
/// 8760 rows give a single-year profile; any other whole number of years gives
/// a multi-year profile.
///
/// # Errors
///
/// Returns an error if the file cannot be parsed or the row count is not a
/// multiple of 8760.
pub fn read_hourly_csv<R: Read>(reader: R, options: &CsvOptions) -> Result<LoadProfile, LoadError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(options.delimiter)
        .has_headers(options.has_header)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);
    parse(&mut reader, options)
}

/// Reads an hourly load from a file.
///
/// # Errors
///
/// See [`read_hourly_csv`].
pub fn read_hourly_csv_path(
    path: impl AsRef<Path>,
    options: &CsvOptions,
) -> Result<LoadProfile, LoadError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(options.delimiter)
        .has_headers(options.has_header)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)?;
    parse(&mut reader, options)
}

fn parse<R: Read>(
    reader: &mut csv::Reader<R>,
    options: &CsvOptions,
) -> Result<LoadProfile, LoadError> {
    let scale = options.unit.to_kilowatt();
    let mut heating = Vec::with_capacity(HOURS_PER_YEAR);
    let mut cooling = Vec::with_capacity(HOURS_PER_YEAR);

    for (row, record) in reader.records().enumerate() {
        let record = record?;
        heating.push(field(&record, row, options.heating_column, options.decimal)? * scale);
        cooling.push(field(&record, row, options.cooling_column, options.decimal)? * scale);
    }

    if heating.len() == HOURS_PER_YEAR {
        LoadProfile::hourly(heating, cooling)
    } else {
        LoadProfile::multi_year_hourly(heating, cooling)
    }
}

fn field(
    record: &csv::StringRecord,
    row: usize,
    column: usize,
    decimal: char,
) -> Result<f64, LoadError> {
    let raw = record
        .get(column)
        .ok_or(LoadError::MissingColumn { row, column })?;
    let normalized = if decimal == '.' {
        raw.to_owned()
    } else {
        raw.replace(decimal, ".")
    };
    normalized.parse().map_err(|_| LoadError::Parse {
        row,
        column,
        value: raw.to_owned(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;

    fn hourly_file(delimiter: char, decimal: char, header: bool) -> String {
        let mut text = String::new();
        if header {
            text.push_str(&format!("heating{delimiter}cooling\n"));
        }
        for hour in 0..HOURS_PER_YEAR {
            let heating = format!("{}", (hour % 24) as f64 + 0.5).replace('.', &decimal.to_string());
            text.push_str(&format!("{heating}{delimiter}2\n"));
        }
        text
    }

    #[test]
    fn reads_default_layout() {
        let text = hourly_file(';', '.', true);
        let profile = read_hourly_csv(text.as_bytes(), &CsvOptions::default()).unwrap();
        let view = profile.hourly_view(1).unwrap();

        assert_relative_eq!(view.extraction(0), 0.5);
        assert_relative_eq!(view.extraction(25), 1.5);
        assert_relative_eq!(view.injection(100), 2.0);
    }

    #[test]
    fn reads_comma_decimals_in_watts() {
        let text = hourly_file('\t', ',', false);
        let options = CsvOptions {
            delimiter: b'\t',
            decimal: ',',
            has_header: false,
            unit: PowerUnit::Watt,
            ..CsvOptions::default()
        };
        let profile = read_hourly_csv(text.as_bytes(), &options).unwrap();
        let view = profile.hourly_view(1).unwrap();

        assert_relative_eq!(view.extraction(3), 3.5e-3);
        assert_relative_eq!(view.injection(3), 2e-3);
    }

    #[test]
    fn reports_bad_cells() {
        let text = "heating;cooling\n1;2\nx;3\n";
        assert!(matches!(
            read_hourly_csv(text.as_bytes(), &CsvOptions::default()),
            Err(LoadError::Parse { row: 1, column: 0, .. })
        ));

        let text = "heating;cooling\n1\n";
        assert!(matches!(
            read_hourly_csv(text.as_bytes(), &CsvOptions::default()),
            Err(LoadError::MissingColumn { row: 0, column: 1 })
        ));
    }

    #[test]
    fn rejects_partial_years() {
        let text = "heating;cooling\n1;2\n3;4\n";
        assert!(matches!(
            read_hourly_csv(text.as_bytes(), &CsvOptions::default()),
            Err(LoadError::NotMultiple { len: 2, .. })
        ));
    }
}

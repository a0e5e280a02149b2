/// In-memory table of text columns
use std::path::Path;

/// Named string columns of equal length.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextTable {
    names: Vec<String>,
    columns: Vec<Vec<String>>,
    rows: usize,
}

impl TextTable {
    /// Build from `(name, values)` pairs
    pub fn new(columns: Vec<(String, Vec<String>)>) -> crate::Result<Self> {
        let rows = columns.first().map_or(0, |(_, values)| values.len());
        let mut names = Vec::with_capacity(columns.len());
        let mut values = Vec::with_capacity(columns.len());

        for (name, column) in columns {
            if column.len() != rows {
                return Err(crate::DatasetError::Shape(format!(
                    "Column '{}' has {} rows, expected {}",
                    name,
                    column.len(),
                    rows
                )));
            }
            if names.contains(&name) {
                return Err(crate::DatasetError::Shape(format!(
                    "Duplicate column '{}'",
                    name
                )));
            }
            names.push(name);
            values.push(column);
        }

        Ok(Self {
            names,
            columns: values,
            rows,
        })
    }

    /// Load a table from a file, picking the reader by extension
    pub fn load<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let path = path.as_ref();
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("csv") => Self::from_csv(path),
            _ => Err(crate::DatasetError::UnsupportedFormat(format!(
                "A csv file must be given as path, got {:?}",
                path
            ))),
        }
    }

    /// Read a UTF-8 CSV file with a header row
    pub fn from_csv<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let path = path.as_ref();
        log::info!("Loading table from: {:?}", path);

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_path(path)?;

        let names: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        let mut columns: Vec<Vec<String>> = vec![Vec::new(); names.len()];

        for record in reader.records() {
            let record = record?;
            for (column, field) in columns.iter_mut().zip(record.iter()) {
                column.push(field.to_string());
            }
        }

        let table = Self::new(names.into_iter().zip(columns).collect())?;

        if table.is_empty() {
            log::warn!("Table {:?} has no rows", path);
        }
        log::info!(
            "Loaded table: {} rows, columns {:?}",
            table.len(),
            table.column_names()
        );

        Ok(table)
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    pub fn column_names(&self) -> &[String] {
        &self.names
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    /// Get all values of a column
    pub fn column(&self, name: &str) -> crate::Result<&[String]> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|pos| self.columns[pos].as_slice())
            .ok_or_else(|| crate::DatasetError::MissingColumn(name.to_string()))
    }

    /// Get a single cell
    pub fn cell(&self, row: usize, name: &str) -> crate::Result<&str> {
        super::check_index(row, self.rows)?;
        Ok(self.column(name)?[row].as_str())
    }
}

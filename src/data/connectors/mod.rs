mod csv;

pub use csv::CsvConnector;

use crate::error::{Result, StoreError};
use crate::infrastructure::in_memory::CatalogEntry;
use std::io::Read;

/// Store catalog in CSV, one product per row: `sku, price, currency, title`.
///
/// Cells are trimmed. Rows may leave out the title.
pub struct CatalogReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> CatalogReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Products on sale, in file order. A bad row yields an error and the rest still follow.
    pub fn entries(self) -> impl Iterator<Item = Result<CatalogEntry>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(StoreError::from))
    }
}

//! Asynchronous CSV reader with batch interface
//!
//! Provides batched reading of operation records for the multi-worker driver.
//!
//! # Architecture
//!
//! ```text
//! CSV Reader → AsyncReader → Batches of AccountOperations
//!                  ↓
//!           csv_format module
//!           (CsvRecord, convert_csv_record)
//! ```

use crate::io::csv_format::{convert_csv_record, AmountPolicy, CsvRecord};
use crate::types::AccountOperation;
use csv_async::AsyncReaderBuilder;
use futures::io::AsyncRead;
use futures::stream::StreamExt;
use tracing::warn;

/// Asynchronous CSV reader
pub struct AsyncReader<R: AsyncRead + Unpin> {
    csv_reader: csv_async::AsyncDeserializer<R>,
    policy: AmountPolicy,
}

impl<R: AsyncRead + Unpin + Send + 'static> AsyncReader<R> {
    pub fn new(reader: R, policy: AmountPolicy) -> Self {
        let csv_reader = AsyncReaderBuilder::new()
            .flexible(true)
            .trim(csv_async::Trim::All)
            .create_deserializer(reader);

        Self { csv_reader, policy }
    }

    /// Read up to `batch_size` operations
    ///
    /// Invalid records are logged and skipped. Returns an empty vector once
    /// the input is exhausted.
    pub async fn read_batch(&mut self, batch_size: usize) -> Vec<AccountOperation> {
        let mut batch = Vec::with_capacity(batch_size);
        let policy = self.policy;
        let mut records = self.csv_reader.deserialize::<CsvRecord>();

        while batch.len() < batch_size {
            match records.next().await {
                Some(Ok(csv_record)) => match convert_csv_record(csv_record, &policy) {
                    Ok(operation) => batch.push(operation),
                    Err(e) => warn!(error = %e, "record conversion error"),
                },
                Some(Err(e)) => warn!(error = %e, "CSV parse error"),
                None => break,
            }
        }

        batch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::io::Cursor;
    use rust_decimal::Decimal;

    #[tokio::test]
    async fn test_async_reader_read_batch() {
        let csv_content = "op,account,to,amount\ncreate,,,1\ncreate,,,2\ntransfer,1,2,1\n";
        let mut reader =
            AsyncReader::new(Cursor::new(csv_content.as_bytes()), AmountPolicy::default());

        let batch = reader.read_batch(2).await;
        assert_eq!(batch.len(), 2);
        assert!(batch.iter().all(AccountOperation::is_create));

        let batch = reader.read_batch(2).await;
        assert_eq!(
            batch,
            vec![AccountOperation::Transfer {
                from: 1,
                to: 2,
                amount: Some(Decimal::ONE)
            }]
        );

        assert!(reader.read_batch(2).await.is_empty());
    }

    #[tokio::test]
    async fn test_async_reader_skips_invalid_records() {
        let csv_content = "op,account,to,amount\nbogus,,,1\ncreate,,,abc\ncreate,,,3\n";
        let mut reader =
            AsyncReader::new(Cursor::new(csv_content.as_bytes()), AmountPolicy::default());

        let batch = reader.read_batch(10).await;

        assert_eq!(
            batch,
            vec![AccountOperation::Create {
                opening_balance: Some(Decimal::new(3, 0))
            }]
        );
    }

    #[tokio::test]
    async fn test_async_reader_applies_amount_policy() {
        let csv_content = "op,account,to,amount\ncreate,,,1.001\ncreate,,,1.01\n";
        let mut reader = AsyncReader::new(
            Cursor::new(csv_content.as_bytes()),
            AmountPolicy::with_max_scale(2),
        );

        let batch = reader.read_batch(10).await;

        assert_eq!(batch.len(), 1);
    }
}

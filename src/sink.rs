//! Record sinks of the local runtime.

use anyhow::Result;
use async_trait::async_trait;
use fake_types::Schema;
use serde_json::{Map, Value};
use split_source::SourceRecord;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter};

/// Destination of generated records.
///
/// `flush` is called at every checkpoint barrier; records written before it
/// returns must be durable before the checkpoint is persisted.
#[async_trait]
pub trait RecordSink: Send {
    async fn write(&mut self, record: &SourceRecord) -> Result<()>;

    async fn flush(&mut self) -> Result<()>;
}

/// Writes one JSON object per record, columns keyed by name.
///
/// ```json
/// {"table":"fake","split_id":0,"row_index":3,"row":{"id":17,"name":"aZ3kq"}}
/// ```
pub struct JsonLinesSink<W> {
    writer: BufWriter<W>,
    columns: Vec<String>,
}

impl<W: AsyncWrite + Unpin + Send> JsonLinesSink<W> {
    pub fn new(writer: W, schema: &Schema) -> Self {
        Self {
            writer: BufWriter::new(writer),
            columns: schema.column_names().into_iter().map(String::from).collect(),
        }
    }

    fn to_json(&self, record: &SourceRecord) -> Result<Value> {
        let mut row = Map::with_capacity(self.columns.len());
        for (name, value) in self.columns.iter().zip(record.row.values()) {
            row.insert(name.clone(), serde_json::to_value(value)?);
        }
        let mut object = Map::with_capacity(4);
        object.insert("table".into(), Value::String(record.table.to_string()));
        object.insert("split_id".into(), record.split_id.into());
        object.insert("row_index".into(), record.row_index.into());
        object.insert("row".into(), Value::Object(row));
        Ok(Value::Object(object))
    }
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> RecordSink for JsonLinesSink<W> {
    async fn write(&mut self, record: &SourceRecord) -> Result<()> {
        let mut line = serde_json::to_vec(&self.to_json(record)?)?;
        line.push(b'\n');
        self.writer.write_all(&line).await?;
        Ok(())
    }

    async fn flush(&mut self) -> Result<()> {
        self.writer.flush().await?;
        Ok(())
    }
}

/// Collects records in memory; clones share the buffer.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    records: Arc<Mutex<Vec<SourceRecord>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything written so far.
    pub fn records(&self) -> Vec<SourceRecord> {
        self.records
            .lock()
            .map(|records| records.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl RecordSink for MemorySink {
    async fn write(&mut self, record: &SourceRecord) -> Result<()> {
        self.records
            .lock()
            .map_err(|_| anyhow::anyhow!("Memory sink lock poisoned"))?
            .push(record.clone());
        Ok(())
    }

    async fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

//! Arrow layout of the `code_chunks` table and row conversions.

use std::sync::Arc;

use arrow_array::{
    Array, ArrayRef, FixedSizeListArray, Float32Array, RecordBatch, StringArray, UInt32Array,
};
use arrow_schema::{DataType, Field, Schema, SchemaRef};
use code_chunker::{ChunkType, CodeChunk, IndexedChunk};

use crate::errors::{Result, StoreError};
use crate::types::SearchHit;

pub const TABLE_NAME: &str = "code_chunks";

pub(crate) const VECTOR_COLUMN: &str = "vector";
pub(crate) const DISTANCE_COLUMN: &str = "_distance";

/// Symbols are flattened into one column.
const SYMBOL_SEPARATOR: &str = ",";

pub(crate) fn chunk_schema(dim: usize) -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new("id", DataType::Utf8, false),
        Field::new("file_path", DataType::Utf8, false),
        Field::new("relative_path", DataType::Utf8, false),
        Field::new("file_hash", DataType::Utf8, false),
        Field::new("content", DataType::Utf8, false),
        Field::new("start_line", DataType::UInt32, false),
        Field::new("end_line", DataType::UInt32, false),
        Field::new("chunk_type", DataType::Utf8, false),
        Field::new("language", DataType::Utf8, false),
        Field::new("symbols", DataType::Utf8, false),
        Field::new(
            VECTOR_COLUMN,
            DataType::FixedSizeList(
                Arc::new(Field::new("item", DataType::Float32, true)),
                dim as i32,
            ),
            false,
        ),
    ]))
}

/// Fixed vector length declared by a table schema, if it has a vector column.
pub(crate) fn vector_dim(schema: &Schema) -> Option<usize> {
    match schema.field_with_name(VECTOR_COLUMN).ok()?.data_type() {
        DataType::FixedSizeList(_, n) => Some(*n as usize),
        _ => None,
    }
}

/// Builds one record batch. All vectors must already have length `dim`.
pub(crate) fn chunks_to_batch(chunks: &[IndexedChunk], dim: usize) -> Result<RecordBatch> {
    let col = |f: fn(&CodeChunk) -> &str| -> ArrayRef {
        Arc::new(StringArray::from_iter_values(chunks.iter().map(|c| f(&c.chunk))))
    };
    let lines = |f: fn(&CodeChunk) -> usize| -> ArrayRef {
        Arc::new(UInt32Array::from_iter_values(
            chunks.iter().map(|c| f(&c.chunk) as u32),
        ))
    };

    let symbols: ArrayRef = Arc::new(StringArray::from_iter_values(
        chunks.iter().map(|c| c.chunk.symbols.join(SYMBOL_SEPARATOR)),
    ));
    let chunk_types: ArrayRef = Arc::new(StringArray::from_iter_values(
        chunks.iter().map(|c| c.chunk.chunk_type.as_str()),
    ));

    let values = Float32Array::from_iter_values(chunks.iter().flat_map(|c| c.vector.iter().copied()));
    let vectors: ArrayRef = Arc::new(FixedSizeListArray::try_new(
        Arc::new(Field::new("item", DataType::Float32, true)),
        dim as i32,
        Arc::new(values),
        None,
    )?);

    let batch = RecordBatch::try_new(
        chunk_schema(dim),
        vec![
            col(|c| c.id.as_str()),
            col(|c| c.file_path.as_str()),
            col(|c| c.relative_path.as_str()),
            col(|c| c.file_hash.as_str()),
            col(|c| c.content.as_str()),
            lines(|c| c.start_line),
            lines(|c| c.end_line),
            chunk_types,
            col(|c| c.language.as_str()),
            symbols,
            vectors,
        ],
    )?;
    Ok(batch)
}

fn string_col<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<StringArray>())
        .ok_or_else(|| StoreError::Schema(format!("missing utf8 column `{name}`")))
}

fn u32_col<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a UInt32Array> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<UInt32Array>())
        .ok_or_else(|| StoreError::Schema(format!("missing u32 column `{name}`")))
}

/// Rows of a search result batch; `_distance` is turned into a score.
pub(crate) fn batch_to_hits(batch: &RecordBatch) -> Result<Vec<SearchHit>> {
    let ids = string_col(batch, "id")?;
    let file_paths = string_col(batch, "file_path")?;
    let relative_paths = string_col(batch, "relative_path")?;
    let file_hashes = string_col(batch, "file_hash")?;
    let contents = string_col(batch, "content")?;
    let start_lines = u32_col(batch, "start_line")?;
    let end_lines = u32_col(batch, "end_line")?;
    let chunk_types = string_col(batch, "chunk_type")?;
    let languages = string_col(batch, "language")?;
    let symbols = string_col(batch, "symbols")?;
    let distances = batch
        .column_by_name(DISTANCE_COLUMN)
        .and_then(|c| c.as_any().downcast_ref::<Float32Array>());

    let mut out = Vec::with_capacity(batch.num_rows());
    for i in 0..batch.num_rows() {
        let chunk_type = chunk_types
            .value(i)
            .parse::<ChunkType>()
            .map_err(|e| StoreError::Schema(e.to_string()))?;
        let symbol_list = symbols.value(i);
        let chunk = CodeChunk {
            id: ids.value(i).to_string(),
            file_path: file_paths.value(i).to_string(),
            relative_path: relative_paths.value(i).to_string(),
            file_hash: file_hashes.value(i).to_string(),
            content: contents.value(i).to_string(),
            start_line: start_lines.value(i) as usize,
            end_line: end_lines.value(i) as usize,
            chunk_type,
            language: languages.value(i).to_string(),
            symbols: if symbol_list.is_empty() {
                Vec::new()
            } else {
                symbol_list.split(SYMBOL_SEPARATOR).map(str::to_string).collect()
            },
        };
        let distance = match distances {
            Some(d) if !d.is_null(i) => d.value(i),
            _ => 0.0,
        };
        out.push(SearchHit {
            chunk,
            score: 1.0 - distance,
        });
    }
    Ok(out)
}

/// `(file_path, file_hash)` pairs from a batch selecting those two columns.
pub(crate) fn batch_to_file_hashes(batch: &RecordBatch) -> Result<Vec<(String, String)>> {
    let paths = string_col(batch, "file_path")?;
    let hashes = string_col(batch, "file_hash")?;
    Ok((0..batch.num_rows())
        .map(|i| (paths.value(i).to_string(), hashes.value(i).to_string()))
        .collect())
}

/// SQL-style string literal with single quotes doubled.
pub(crate) fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn indexed(path: &str, start: usize, symbols: &[&str], vector: Vec<f32>) -> IndexedChunk {
        IndexedChunk::new(
            CodeChunk {
                id: code_chunker::chunk_id(path, start),
                file_path: path.to_string(),
                relative_path: path.trim_start_matches('/').to_string(),
                file_hash: "h".into(),
                content: "fn a() {}".into(),
                start_line: start,
                end_line: start + 1,
                chunk_type: ChunkType::Block,
                language: "rs".into(),
                symbols: symbols.iter().map(|s| s.to_string()).collect(),
            },
            vector,
        )
    }

    #[test]
    fn batch_round_trips_chunk_fields() {
        let chunks = vec![
            indexed("/w/a.rs", 1, &["a", "B"], vec![1.0, 0.0]),
            indexed("/w/b.rs", 7, &[], vec![0.0, 1.0]),
        ];
        let batch = chunks_to_batch(&chunks, 2).unwrap();
        assert_eq!(batch.num_rows(), 2);
        assert_eq!(vector_dim(&batch.schema()), Some(2));

        let hits = batch_to_hits(&batch).unwrap();
        assert_eq!(hits[0].chunk, chunks[0].chunk);
        assert_eq!(hits[1].chunk.symbols, Vec::<String>::new());
        // No `_distance` column outside a vector query.
        assert_eq!(hits[0].score, 1.0);
    }

    #[test]
    fn quotes_are_doubled() {
        assert_eq!(quote_literal("/w/it's.rs"), "'/w/it''s.rs'");
    }
}

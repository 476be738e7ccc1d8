use anyhow::{anyhow, Context, Result};
use arrow::{
    array::{Array, ArrayRef, BooleanArray, StringArray, UInt32Array},
    compute::{filter_record_batch, take_record_batch},
    datatypes::{DataType, Field, FieldRef, Schema},
    record_batch::RecordBatch,
    util::display::array_value_to_string,
};
use std::{collections::HashSet, sync::Arc};

/// One rendered row, comparable and hashable. `None` is a null cell.
pub type RowKey = Vec<Option<String>>;

/// Build a table of nullable `Utf8` columns, in the given column order.
pub fn from_columns(columns: &[(&str, Vec<Option<&str>>)]) -> Result<RecordBatch> {
    let fields: Vec<Field> = columns
        .iter()
        .map(|(name, _)| Field::new(*name, DataType::Utf8, true))
        .collect();
    let arrays: Vec<ArrayRef> = columns
        .iter()
        .map(|(_, values)| Arc::new(StringArray::from(values.clone())) as ArrayRef)
        .collect();

    RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays).context("building string table")
}

/// Look up a column by name and downcast it to the expected array type.
pub fn typed_column<'a, T: Array + 'static>(batch: &'a RecordBatch, name: &str) -> Result<&'a T> {
    let col = batch
        .column_by_name(name)
        .ok_or_else(|| anyhow!("missing column `{}`", name))?;
    col.as_any().downcast_ref::<T>().ok_or_else(|| {
        anyhow!(
            "column `{}` has unexpected type {}",
            name,
            col.data_type()
        )
    })
}

pub fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
    typed_column::<StringArray>(batch, name)
}

/// Return a new batch with `array` appended as `name`. An existing column of
/// the same name is replaced in place, keeping its position.
pub fn with_column(batch: &RecordBatch, name: &str, array: ArrayRef) -> Result<RecordBatch> {
    let schema = batch.schema();
    let field: FieldRef = Arc::new(Field::new(name, array.data_type().clone(), true));

    let mut fields: Vec<FieldRef> = schema.fields().iter().cloned().collect();
    let mut columns: Vec<ArrayRef> = batch.columns().to_vec();
    match schema.index_of(name) {
        Ok(idx) => {
            fields[idx] = field;
            columns[idx] = array;
        }
        Err(_) => {
            fields.push(field);
            columns.push(array);
        }
    }

    RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)
        .with_context(|| format!("adding column `{}`", name))
}

/// Render every row into a [`RowKey`]. With `trim`, string cells are compared
/// by their whitespace-trimmed form.
pub fn row_keys(batch: &RecordBatch, trim: bool) -> Result<Vec<RowKey>> {
    let mut keys: Vec<RowKey> = vec![Vec::with_capacity(batch.num_columns()); batch.num_rows()];

    for col in batch.columns() {
        let strings = col.as_any().downcast_ref::<StringArray>();
        for (row, key) in keys.iter_mut().enumerate() {
            let cell = if col.is_null(row) {
                None
            } else if let Some(sarr) = strings {
                let v = sarr.value(row);
                let v = if trim { v.trim() } else { v };
                Some(v.to_string())
            } else {
                Some(array_value_to_string(col.as_ref(), row)?)
            };
            key.push(cell);
        }
    }

    Ok(keys)
}

/// `true` for the first occurrence of each key, `false` for every repeat.
pub fn first_occurrence_mask(keys: &[RowKey]) -> Vec<bool> {
    let mut seen: HashSet<&RowKey> = HashSet::with_capacity(keys.len());
    keys.iter().map(|k| seen.insert(k)).collect()
}

pub fn filter_rows(batch: &RecordBatch, keep: &[bool]) -> Result<RecordBatch> {
    let mask = BooleanArray::from(keep.to_vec());
    filter_record_batch(batch, &mask).context("filtering rows")
}

/// Gather rows by position, in the order given.
pub fn take_rows(batch: &RecordBatch, rows: &[usize]) -> Result<RecordBatch> {
    let indices = UInt32Array::from_iter_values(rows.iter().map(|&i| i as u32));
    take_record_batch(batch, &indices).context("taking rows")
}

use arrow::datatypes::DataType;

/// Trim leading/trailing whitespace. Interior whitespace is kept.
pub fn clean_str(raw: &str) -> &str {
    raw.trim()
}

/// Empty or whitespace-only.
pub fn is_blank(raw: &str) -> bool {
    raw.trim().is_empty()
}

/// Infer an Arrow dtype from a single string value.
pub fn infer_arrow_dtype_from_str(s: &str) -> DataType {
    if s.parse::<i64>().is_ok() {
        DataType::Int64
    } else if s.parse::<f64>().is_ok() {
        DataType::Float64
    } else {
        DataType::Utf8
    }
}

/// Widest dtype over all values: any text makes the column `Utf8`, any
/// non-integer number makes it `Float64`. No values at all means `Utf8`.
pub fn infer_arrow_dtype<'a, I>(values: I) -> DataType
where
    I: IntoIterator<Item = &'a str>,
{
    let mut inferred: Option<DataType> = None;
    for v in values {
        inferred = match (inferred, infer_arrow_dtype_from_str(v)) {
            (_, DataType::Utf8) => return DataType::Utf8,
            (Some(DataType::Float64), _) | (_, DataType::Float64) => Some(DataType::Float64),
            _ => Some(DataType::Int64),
        };
    }
    inferred.unwrap_or(DataType::Utf8)
}

/// Number of whitespace-separated tokens.
pub fn word_count(s: &str) -> i64 {
    s.split_whitespace().count() as i64
}

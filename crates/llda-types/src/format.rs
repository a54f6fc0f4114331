//! Line-oriented interchange formats.
//!
//! - Corpus: `term:count` tokens per line, terms 1-indexed.
//! - Labels: space-separated label ids per line, 1-indexed.
//! - Sparse count tables: `topic:count` tokens per line, topics 1-indexed.
//! - Dense matrices: whitespace-separated floats, one row per line.
//!
//! Corpus and label files hold exactly one line per document; an empty line
//! is an empty document.

use std::io::{BufRead, Write};

use crate::corpus::{Corpus, Document};
use crate::error::{LldaError, Result};
use crate::labels::{LabelSet, LabelSets};

fn parse_error(line: usize, message: impl Into<String>) -> LldaError {
    LldaError::Parse {
        line: line + 1,
        message: message.into(),
    }
}

/// Parse a 1-indexed `id:count` token into a 0-based id and its count.
fn parse_pair(token: &str, line: usize) -> Result<(usize, u32)> {
    let (id, count) = token
        .split_once(':')
        .ok_or_else(|| parse_error(line, format!("expected id:count, got '{}'", token)))?;
    let id: usize = id
        .parse()
        .map_err(|_| parse_error(line, format!("invalid id '{}'", id)))?;
    if id == 0 {
        return Err(parse_error(line, "ids are 1-indexed, got 0"));
    }
    let count: u32 = count
        .parse()
        .map_err(|_| parse_error(line, format!("invalid count '{}'", count)))?;
    Ok((id - 1, count))
}

/// Read a `term:count` corpus file.
pub fn read_corpus<R: BufRead>(reader: R) -> Result<Corpus> {
    let mut documents = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let entries = line
            .split_whitespace()
            .map(|token| parse_pair(token, index))
            .collect::<Result<Vec<_>>>()?;
        let document = Document::new(entries).map_err(|e| parse_error(index, e.to_string()))?;
        documents.push(document);
    }
    Corpus::new(documents)
}

/// Write a corpus as `term:count` lines.
pub fn write_corpus<W: Write>(mut writer: W, corpus: &Corpus) -> Result<()> {
    for document in corpus.documents() {
        let line: Vec<String> = document
            .entries()
            .iter()
            .map(|(term, count)| format!("{}:{}", term + 1, count))
            .collect();
        writeln!(writer, "{}", line.join(" "))?;
    }
    writer.flush()?;
    Ok(())
}

/// Read a 1-indexed label file.
///
/// Without an explicit `class_num` the label space spans the largest id seen.
pub fn read_labels<R: BufRead>(reader: R, class_num: Option<usize>) -> Result<LabelSets> {
    let mut sets = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let labels = line
            .split_whitespace()
            .map(|token| match token.parse::<usize>() {
                Ok(0) => Err(parse_error(index, "label ids are 1-indexed, got 0")),
                Ok(id) => Ok(id - 1),
                Err(_) => Err(parse_error(index, format!("invalid label '{}'", token))),
            })
            .collect::<Result<Vec<_>>>()?;
        sets.push(LabelSet::new(labels));
    }
    let class_num = class_num.unwrap_or_else(|| {
        sets.iter()
            .filter_map(LabelSet::max)
            .max()
            .map_or(0, |max| max + 1)
    });
    LabelSets::new(sets, class_num)
}

/// Write label sets as 1-indexed id lines.
pub fn write_labels<W: Write>(mut writer: W, sets: &[LabelSet]) -> Result<()> {
    for set in sets {
        let line: Vec<String> = set.iter().map(|l| (l + 1).to_string()).collect();
        writeln!(writer, "{}", line.join(" "))?;
    }
    writer.flush()?;
    Ok(())
}

/// Read a sparse `topic:count` table with `width` columns per row.
pub fn read_sparse_counts<R: BufRead>(reader: R, width: usize) -> Result<Vec<Vec<u32>>> {
    let mut rows = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let mut row = vec![0u32; width];
        for token in line.split_whitespace() {
            let (column, count) = parse_pair(token, index)?;
            if column >= width {
                return Err(parse_error(
                    index,
                    format!("column {} outside width {}", column + 1, width),
                ));
            }
            row[column] = count;
        }
        rows.push(row);
    }
    Ok(rows)
}

/// Write a count table in sparse `topic:count` form, skipping zeros.
pub fn write_sparse_counts<W: Write>(mut writer: W, rows: &[Vec<u32>]) -> Result<()> {
    for row in rows {
        let line: Vec<String> = row
            .iter()
            .enumerate()
            .filter(|&(_, &count)| count > 0)
            .map(|(column, count)| format!("{}:{}", column + 1, count))
            .collect();
        writeln!(writer, "{}", line.join(" "))?;
    }
    writer.flush()?;
    Ok(())
}

/// Read a dense float matrix; blank lines are skipped.
pub fn read_matrix<R: BufRead>(reader: R) -> Result<Vec<Vec<f64>>> {
    let mut rows: Vec<Vec<f64>> = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let row = line
            .split_whitespace()
            .map(|v| {
                v.parse::<f64>()
                    .map_err(|_| parse_error(index, format!("invalid number '{}'", v)))
            })
            .collect::<Result<Vec<_>>>()?;
        if let Some(first) = rows.first() {
            if first.len() != row.len() {
                return Err(parse_error(
                    index,
                    format!("expected {} columns, got {}", first.len(), row.len()),
                ));
            }
        }
        rows.push(row);
    }
    Ok(rows)
}

/// Write a dense float matrix, one row per line.
pub fn write_matrix<W: Write>(mut writer: W, rows: &[Vec<f64>]) -> Result<()> {
    for row in rows {
        let line: Vec<String> = row.iter().map(f64::to_string).collect();
        writeln!(writer, "{}", line.join(" "))?;
    }
    writer.flush()?;
    Ok(())
}

/// Read one float per line (e.g. a log-likelihood trace).
pub fn read_vector<R: BufRead>(reader: R) -> Result<Vec<f64>> {
    let mut values = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let value = line.trim();
        if value.is_empty() {
            continue;
        }
        values.push(
            value
                .parse::<f64>()
                .map_err(|_| parse_error(index, format!("invalid number '{}'", value)))?,
        );
    }
    Ok(values)
}

/// Write one float per line.
pub fn write_vector<W: Write>(mut writer: W, values: &[f64]) -> Result<()> {
    for value in values {
        writeln!(writer, "{}", value)?;
    }
    writer.flush()?;
    Ok(())
}

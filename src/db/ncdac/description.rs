use std::{collections::HashSet, fs, path::Path};

use regex::Regex;

use crate::error::{Error, Result};

/// Column names of the `*_desc` tables, also the optional header line of a
/// `.des` file.
pub const DESC_COLUMNS: [&str; 5] = ["Name", "Description", "Type", "Start", "Length"];

/// Largest start or length accepted in a `.des` file.  The published
/// records are a few hundred characters wide.
pub const MAX_POSITION: usize = 1_000_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    Char,
    Date,
    Other(String),
}

impl FieldType {
    fn parse(s: &str) -> FieldType {
        match s.to_ascii_uppercase().as_str() {
            "CHAR" => FieldType::Char,
            "DATE" => FieldType::Date,
            _ => FieldType::Other(s.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            FieldType::Char => "CHAR",
            FieldType::Date => "DATE",
            FieldType::Other(s) => s,
        }
    }
}

/// One line of a `.des` file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: String,
    pub description: String,
    pub kind: FieldType,
    /// 1-based position of the first character
    pub start: usize,
    pub length: usize,
}

impl FieldSpec {
    fn end(&self) -> usize {
        self.start - 1 + self.length
    }
}

/// Layout of the records of a fixed-width `.dat` file, as published in the
/// matching `.des` file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordLayout {
    pub fields: Vec<FieldSpec>,
}

impl RecordLayout {
    pub fn from_des_file(path: &Path) -> Result<RecordLayout> {
        let text = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        RecordLayout::from_des_str(&text, path)
    }

    /// Parse the content of a `.des` file.  Columns are separated by runs of
    /// three or more whitespace characters, so single spaces inside a
    /// description survive.  `path` is only used in error messages.
    pub fn from_des_str(text: &str, path: &Path) -> Result<RecordLayout> {
        let separator = Regex::new(r"\s{3,}").expect("static regex");

        let mut fields: Vec<FieldSpec> = Vec::new();
        let mut names = HashSet::new();
        for (i, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let parts: Vec<&str> = separator.split(line).collect();
            if fields.is_empty() && is_header(&parts) {
                continue;
            }
            let (name, description, kind, start, length) = match parts.as_slice() {
                [name, description, kind, start, length] => {
                    (*name, *description, *kind, *start, *length)
                }
                [name, kind, start, length] => (*name, "", *kind, *start, *length),
                _ => {
                    return Err(Error::schema(
                        path,
                        format!("line {}: expected 5 columns, found {}", i + 1, parts.len()),
                    ))
                }
            };
            let start = parse_position(start, path, i)?;
            let length = parse_position(length, path, i)?;
            if (start - 1).checked_add(length).is_none() {
                return Err(Error::schema(
                    path,
                    format!("line {}: field ends past the largest supported offset", i + 1),
                ));
            }
            if !names.insert(name.to_string()) {
                return Err(Error::schema(
                    path,
                    format!("line {}: duplicate field {}", i + 1, name),
                ));
            }
            fields.push(FieldSpec {
                name: name.to_string(),
                description: description.to_string(),
                kind: FieldType::parse(kind),
                start,
                length,
            });
        }

        if fields.is_empty() {
            return Err(Error::schema(path, "no fields described"));
        }
        Ok(RecordLayout { fields })
    }

    /// Number of characters of a full record.
    pub fn width(&self) -> usize {
        self.fields.iter().map(|f| f.end()).max().unwrap_or(0)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }

    /// Cut a record into its fields, trimmed.  A short line yields empty
    /// trailing fields.
    pub fn split<'a>(&self, line: &'a str) -> Vec<&'a str> {
        self.fields
            .iter()
            .map(|f| {
                let begin = char_offset(line, f.start - 1);
                let end = char_offset(line, f.end());
                line[begin..end].trim()
            })
            .collect()
    }
}

fn is_header(parts: &[&str]) -> bool {
    parts.len() == DESC_COLUMNS.len()
        && parts
            .iter()
            .zip(DESC_COLUMNS)
            .all(|(p, c)| p.eq_ignore_ascii_case(c))
}

fn parse_position(s: &str, path: &Path, line: usize) -> Result<usize> {
    match s.parse::<usize>() {
        Ok(n) if n > 0 && n <= MAX_POSITION => Ok(n),
        _ => Err(Error::schema(
            path,
            format!("line {}: invalid position {:?}", line + 1, s),
        )),
    }
}

/// Byte offset of the n-th character, or the end of the string.
fn char_offset(s: &str, n: usize) -> usize {
    s.char_indices().nth(n).map_or(s.len(), |(i, _)| i)
}

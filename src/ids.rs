use std::{collections::HashSet, fs, path::PathBuf};

use crate::error::LoadError;
use crate::feature::FsStore;

/// Enumerates the ids of the records belonging to a layer.
pub trait RecordIds {
    fn ids(&self, layer: &str) -> Result<Vec<String>, LoadError>;
}

impl FsStore {
    /// The path of the record listing of a layer: `<directory>/meta/wof-<layer>-latest.csv`.
    pub fn listing_path(&self, layer: &str) -> PathBuf {
        self.directory()
            .join("meta")
            .join(format!("wof-{layer}-latest.csv"))
    }
}

impl RecordIds for FsStore {
    /// Reads the `id` column of the layer listing.
    ///
    /// Ids come out in file order, without blanks or duplicates.
    fn ids(&self, layer: &str) -> Result<Vec<String>, LoadError> {
        let path = self.listing_path(layer);
        let content = fs::read_to_string(&path).map_err(|source| LoadError::Io {
            path: path.clone(),
            source,
        })?;

        let mut lines = content.lines();
        let column = lines
            .next()
            .and_then(|header| split_row(header).iter().position(|name| name == "id"))
            .ok_or_else(|| LoadError::MissingIdColumn { path: path.clone() })?;

        let mut seen = HashSet::new();
        Ok(lines
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| split_row(line).into_iter().nth(column))
            .map(|id| id.trim().to_owned())
            .filter(|id| !id.is_empty() && seen.insert(id.clone()))
            .collect())
    }
}

/// Splits a CSV row into its fields, honoring double quotes.
fn split_row(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut quoted = false;
    let mut chars = line.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' if quoted && chars.peek() == Some(&'"') => {
                field.push('"');
                chars.next();
            }
            '"' => quoted = !quoted,
            ',' if !quoted => fields.push(std::mem::take(&mut field)),
            _ => field.push(c),
        }
    }
    fields.push(field);
    fields
}

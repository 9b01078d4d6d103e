// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Daniel Negri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Bulk article import from CSV.

use crate::article::NewArticle;
use crate::store::Store;
use csv::{ReaderBuilder, Trim};
use std::io::Read;
use tracing::{info, warn};

/// Outcome of an import run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub imported: usize,
    pub skipped: usize,
}

/// Streams articles from a CSV reader into `store`.
///
/// Rows go through the same validation as `POST /articles`. Malformed rows and
/// rows that fail validation (a duplicate barcode, say) are skipped and
/// counted.
///
/// # CSV Format
///
/// ```csv
/// barcode,description,manufacturer
/// 7501031311309,Android phone,Sony
/// ```
///
/// # Errors
///
/// Returns a CSV error only if the header row cannot be read.
pub fn import_articles<R: Read>(store: &Store, reader: R) -> Result<SeedSummary, csv::Error> {
    let mut rdr = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .has_headers(true)
        .from_reader(reader);
    rdr.headers()?;

    let mut summary = SeedSummary::default();
    for (row, result) in rdr.deserialize::<NewArticle>().enumerate() {
        let outcome = result
            .map_err(|e| e.to_string())
            .and_then(|input| store.create_article(&input).map_err(|e| e.to_string()));
        match outcome {
            Ok(_) => summary.imported += 1,
            Err(reason) => {
                warn!(row = row + 1, %reason, "skipping article row");
                summary.skipped += 1;
            }
        }
    }

    info!(
        imported = summary.imported,
        skipped = summary.skipped,
        "article import finished"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::ArticleFilter;

    #[test]
    fn imports_valid_rows_and_skips_the_rest() {
        let data = "\
barcode,description,manufacturer
111, Android phone ,Sony
222,Television,Samsung
111,Duplicate barcode,Sony
333,,LG
";
        let store = Store::new();
        let summary = import_articles(&store, data.as_bytes()).unwrap();

        assert_eq!(
            summary,
            SeedSummary {
                imported: 2,
                skipped: 2
            }
        );
        let page = store.list_articles(&ArticleFilter::default(), 1);
        assert_eq!(page.total, 2);
        assert_eq!(page.items[0].description, "Android phone");
    }

    #[test]
    fn empty_input_imports_nothing() {
        let store = Store::new();
        let summary = import_articles(&store, "barcode,description,manufacturer\n".as_bytes()).unwrap();
        assert_eq!(summary, SeedSummary::default());
    }
}

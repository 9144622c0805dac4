//! Country-based row post-filtering.
//!
//! A simple client-side filter applied after execution, not an access
//! control boundary: rows without a recognizable country column pass
//! through unfiltered, with a note saying so.
use serde_json::Value;

use crate::executor::Row;

/// Result-set column names that carry a country code.
const COUNTRY_KEYS: &[&str] = &["country", "country_code", "pais"];

/// Outcome of applying (or skipping) the country filter.
#[derive(Debug, Clone, serde::Serialize)]
pub struct AccessFiltered {
    pub rows: Vec<Row>,
    pub rowcount: usize,
    pub access_filter_applied: bool,
    pub access_note: String,
}

/// Parse `"ES,FR"` into `["ES", "FR"]` (trimmed, uppercased).
///
/// `None` or an empty string means a global user with no filtering.
#[must_use]
pub fn parse_countries(user_countries: Option<&str>) -> Option<Vec<String>> {
    let raw = user_countries?;
    let items: Vec<String> = raw
        .split(',')
        .map(|c| c.trim().to_uppercase())
        .filter(|c| !c.is_empty())
        .collect();
    if items.is_empty() { None } else { Some(items) }
}

/// Filter rows by the first country-ish column present in the result.
pub fn filter_rows_by_country(rows: Vec<Row>, allowed: Option<&[String]>) -> AccessFiltered {
    let Some(allowed) = allowed else {
        let rowcount = rows.len();
        return AccessFiltered {
            rows,
            rowcount,
            access_filter_applied: false,
            access_note: "GLOBAL_USER: no country filtering applied (full result returned)."
                .to_string(),
        };
    };

    let country_key = COUNTRY_KEYS
        .iter()
        .find(|key| rows.iter().any(|r| r.contains_key(**key)));

    let Some(key) = country_key else {
        let rowcount = rows.len();
        return AccessFiltered {
            rows,
            rowcount,
            access_filter_applied: false,
            access_note: "RESTRICTED_USER: no country column ('country', 'country_code' or \
                          'pais') found in the result; rows cannot be filtered."
                .to_string(),
        };
    };

    let filtered: Vec<Row> = rows
        .into_iter()
        .filter(|r| match r.get(*key) {
            Some(Value::String(v)) => allowed.contains(&v.to_uppercase()),
            _ => false,
        })
        .collect();

    AccessFiltered {
        rowcount: filtered.len(),
        rows: filtered,
        access_filter_applied: true,
        access_note: format!("Filtered by country column '{key}' · allowed={allowed:?}"),
    }
}

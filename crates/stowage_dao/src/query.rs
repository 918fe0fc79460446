// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use stowage::Value;

use crate::ReadError;

/// Checks that `name` is a plain identifier: ASCII letters, digits and
/// underscores, not starting with a digit.
pub(crate) fn validate_identifier(name: &str) -> Result<(), ReadError> {
    if is_identifier(name) { Ok(()) } else { Err(invalid(name)) }
}

/// Table names may be schema qualified.
pub(crate) fn validate_table(table: &str) -> Result<(), ReadError> {
    if table.split('.').all(is_identifier) { Ok(()) } else { Err(invalid(table)) }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next().is_some_and(|first| first.is_ascii_alphabetic() || first == '_') && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn invalid(identifier: &str) -> ReadError {
    ReadError::InvalidIdentifier {
        identifier: identifier.to_owned(),
    }
}

/// `col = :col AND ...` in key order.
pub(crate) fn predicate(keys: &[(String, Value)]) -> String {
    keys.iter()
        .map(|(column, _)| format!("{column} = :{column}"))
        .collect::<Vec<_>>()
        .join(" AND ")
}

pub(crate) fn select(table: &str, predicate: &str) -> String {
    if predicate.is_empty() {
        format!("SELECT * FROM {table}")
    } else {
        format!("SELECT * FROM {table} WHERE {predicate}")
    }
}

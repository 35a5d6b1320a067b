//! Shared utilities for the SQLite adapter
//!
//! Error mapping and document (de)serialization used by all record modules.

use serde::{Serialize, de::DeserializeOwned};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use treebranch_types::prelude::*;

/// Build an IN clause with parameterized values
pub(crate) fn push_in<'a>(
	mut query: sqlx::QueryBuilder<'a, sqlx::Sqlite>,
	values: &'a [impl AsRef<str>],
) -> sqlx::QueryBuilder<'a, sqlx::Sqlite> {
	query.push("(");
	for (i, value) in values.iter().enumerate() {
		if i > 0 {
			query.push(", ");
		}
		query.push_bind(value.as_ref());
	}
	query.push(")");
	query
}

/// Log database error for debugging
pub(crate) fn inspect(err: &sqlx::Error) {
	warn!("DB: {:#?}", err);
}

/// Translate a statement result, a constraint violation included, to `DbError`
pub(crate) fn db_err<T>(res: Result<T, sqlx::Error>) -> TbResult<T> {
	res.inspect_err(inspect).map_err(|_| Error::DbError)
}

/// Decode the JSON document column of a row
pub(crate) fn decode<T: DeserializeOwned>(row: &SqliteRow) -> Result<T, sqlx::Error> {
	let doc: &str = row.try_get("doc")?;
	serde_json::from_str(doc).map_err(|err| sqlx::Error::Decode(Box::new(err)))
}

pub(crate) fn encode<T: Serialize>(record: &T) -> TbResult<String> {
	Ok(serde_json::to_string(record)?)
}

/// Map an optional single-row query result
pub(crate) fn map_opt<T: DeserializeOwned>(row: Result<Option<SqliteRow>, sqlx::Error>) -> TbResult<Option<T>> {
	match row {
		Ok(Some(row)) => decode(&row).inspect_err(inspect).map(Some).map_err(|_| Error::DbError),
		Ok(None) => Ok(None),
		Err(err) => {
			inspect(&err);
			Err(Error::DbError)
		}
	}
}

/// Decode every row of a query result
pub(crate) fn collect_res<T: DeserializeOwned>(rows: Result<Vec<SqliteRow>, sqlx::Error>) -> TbResult<Vec<T>> {
	let rows = db_err(rows)?;
	let mut items = Vec::with_capacity(rows.len());
	for row in &rows {
		items.push(decode(row).inspect_err(inspect).map_err(|_| Error::DbError)?);
	}
	Ok(items)
}

// vim: ts=4

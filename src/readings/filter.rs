use std::collections::HashMap;

use sqlx::{Postgres, QueryBuilder};
use time::{macros::format_description, Date};

use crate::error::ApiError;

/// Conjunctive predicate over readings, parsed from recognized query
/// parameters. Unrecognized parameters impose no constraint.
///
/// Supported params:
///   date_from / date_to  - inclusive bounds on the UTC date of `timestamp`
///   notes                - case-insensitive exact match
///   notes_icontains      - case-insensitive substring match
///   status               - case-insensitive match, CSV treated as any-of
#[derive(Debug, Default, PartialEq)]
pub struct ReadingFilter {
    date_from: Option<Date>,
    date_to: Option<Date>,
    notes_iexact: Option<String>,
    notes_icontains: Option<String>,
    statuses: Option<Vec<String>>,
}

fn parse_date(raw: &str, param: &str) -> Result<Date, ApiError> {
    let format = format_description!("[year]-[month]-[day]");
    Date::parse(raw, &format)
        .map_err(|_| ApiError::field(param, "Enter a valid date (YYYY-MM-DD)."))
}

fn split_csv(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.to_lowercase())
        .collect()
}

/// Escapes LIKE wildcards so user input matches literally.
fn escape_like(raw: &str) -> String {
    raw.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}

impl ReadingFilter {
    pub fn from_query(params: &HashMap<String, String>) -> Result<Self, ApiError> {
        let mut filter = ReadingFilter::default();
        for (name, value) in params {
            match name.as_str() {
                "date_from" => filter.date_from = Some(parse_date(value, "date_from")?),
                "date_to" => filter.date_to = Some(parse_date(value, "date_to")?),
                "notes" => filter.notes_iexact = Some(value.clone()),
                "notes_icontains" => filter.notes_icontains = Some(value.clone()),
                "status" => {
                    let statuses = split_csv(value);
                    if !statuses.is_empty() {
                        filter.statuses = Some(statuses);
                    }
                }
                _ => {}
            }
        }
        Ok(filter)
    }

    /// Appends ` AND ...` fragments to a query whose WHERE clause already
    /// binds the owner. Values go through `push_bind`, never the SQL text.
    pub fn apply(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        if let Some(date_from) = self.date_from {
            qb.push(" AND (timestamp AT TIME ZONE 'UTC')::date >= ");
            qb.push_bind(date_from);
        }
        if let Some(date_to) = self.date_to {
            qb.push(" AND (timestamp AT TIME ZONE 'UTC')::date <= ");
            qb.push_bind(date_to);
        }
        if let Some(notes) = &self.notes_iexact {
            qb.push(" AND LOWER(notes) = LOWER(");
            qb.push_bind(notes.clone());
            qb.push(")");
        }
        if let Some(fragment) = &self.notes_icontains {
            qb.push(" AND notes ILIKE ");
            qb.push_bind(format!("%{}%", escape_like(fragment)));
        }
        if let Some(statuses) = &self.statuses {
            qb.push(" AND LOWER(status) = ANY(");
            qb.push_bind(statuses.clone());
            qb.push(")");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn rendered_sql(filter: &ReadingFilter) -> String {
        let mut qb = QueryBuilder::new("SELECT * FROM readings WHERE user_id = 'x'");
        filter.apply(&mut qb);
        qb.sql().to_string()
    }

    #[test]
    fn empty_query_imposes_no_constraint() {
        let filter = ReadingFilter::from_query(&params(&[])).unwrap();
        assert_eq!(filter, ReadingFilter::default());
        assert_eq!(rendered_sql(&filter), "SELECT * FROM readings WHERE user_id = 'x'");
    }

    #[test]
    fn unrecognized_params_are_ignored() {
        let filter = ReadingFilter::from_query(&params(&[
            ("page", "3"),
            ("unit", "mmol/L"),
            ("user_id", "someone-else"),
        ]))
        .unwrap();
        assert_eq!(filter, ReadingFilter::default());
    }

    #[test]
    fn date_bounds_compare_against_utc_date() {
        let filter = ReadingFilter::from_query(&params(&[
            ("date_from", "2025-10-18"),
            ("date_to", "2025-10-18"),
        ]))
        .unwrap();
        assert_eq!(filter.date_from, Some(date!(2025 - 10 - 18)));
        assert_eq!(filter.date_to, Some(date!(2025 - 10 - 18)));
        let sql = rendered_sql(&filter);
        assert!(sql.contains("(timestamp AT TIME ZONE 'UTC')::date >= "));
        assert!(sql.contains("(timestamp AT TIME ZONE 'UTC')::date <= "));
    }

    #[test]
    fn malformed_date_names_the_parameter() {
        let err = ReadingFilter::from_query(&params(&[("date_from", "18/10/2025")])).unwrap_err();
        match err {
            ApiError::Validation(errors) => assert!(errors.contains_key("date_from")),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn notes_exact_is_case_insensitive() {
        let filter =
            ReadingFilter::from_query(&params(&[("notes", "After Dinner")])).unwrap();
        let sql = rendered_sql(&filter);
        assert!(sql.contains("LOWER(notes) = LOWER("));
    }

    #[test]
    fn notes_icontains_uses_ilike() {
        let filter =
            ReadingFilter::from_query(&params(&[("notes_icontains", "dinner")])).unwrap();
        let sql = rendered_sql(&filter);
        assert!(sql.contains("notes ILIKE "));
    }

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(escape_like("50%_done\\"), "50\\%\\_done\\\\");
    }

    #[test]
    fn status_csv_becomes_any_of() {
        let filter =
            ReadingFilter::from_query(&params(&[("status", "Fasting, post-meal ,,")])).unwrap();
        assert_eq!(
            filter.statuses,
            Some(vec!["fasting".to_string(), "post-meal".to_string()])
        );
        let sql = rendered_sql(&filter);
        assert!(sql.contains("LOWER(status) = ANY("));
    }

    #[test]
    fn blank_status_imposes_no_constraint() {
        let filter = ReadingFilter::from_query(&params(&[("status", " , ")])).unwrap();
        assert_eq!(filter.statuses, None);
    }

    #[test]
    fn all_fragments_are_anded() {
        let filter = ReadingFilter::from_query(&params(&[
            ("date_from", "2025-01-01"),
            ("notes_icontains", "walk"),
            ("status", "fasting"),
        ]))
        .unwrap();
        let sql = rendered_sql(&filter);
        assert_eq!(sql.matches(" AND ").count(), 3);
    }
}

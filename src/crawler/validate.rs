use serde_json::Value;
use thiserror::Error;
use tracing::error;

use crate::crawler::models::{CandidateJob, JobRecord};

#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("job_id is missing or empty")]
    MissingJobId,

    #[error("field {field} cannot hold {found}")]
    Coercion { field: &'static str, found: String },
}

#[derive(Debug, Default)]
pub struct Validated {
    pub records: Vec<JobRecord>,
    pub rejected: usize,
}

/// Keeps every candidate that fits the schema; the rest are logged and dropped.
pub fn validate_all(candidates: Vec<CandidateJob>) -> Validated {
    let mut out = Validated::default();

    for candidate in candidates {
        let job_id = candidate.job_id.clone();
        match validate(candidate) {
            Ok(record) => out.records.push(record),
            Err(e) => {
                error!(job_id = ?job_id, error = %e, "Data validation error");
                out.rejected += 1;
            }
        }
    }

    out
}

pub fn validate(c: CandidateJob) -> Result<JobRecord, ValidationError> {
    let job_id = match text("job_id", c.job_id)? {
        Some(id) if !id.trim().is_empty() => id,
        _ => return Err(ValidationError::MissingJobId),
    };
    if let Some((field, found)) = &c.malformed {
        return Err(mismatch(*field, found));
    }

    Ok(JobRecord {
        job_id,
        job_title: text("job_title", c.job_title)?,
        company: text("company", c.company)?,
        company_logo_url: text("company_logo_url", c.company_logo_url)?,
        location: text("location", c.location)?,
        area: text("area", c.area)?,
        suburb: text("suburb", c.suburb)?,
        work_type: text("work_type", c.work_type)?,
        work_arrangement: text("work_arrangement", c.work_arrangement)?,
        salary: text("salary", c.salary)?,
        listing_date: c.listing_date,
        teaser: text("teaser", c.teaser)?,
        classification: text("classification", c.classification)?,
        sub_classification: text("sub_classification", c.sub_classification)?,
        is_premium: flag("is_premium", c.is_premium)?,
        is_standout: flag("is_standout", c.is_standout)?,
        job_location_label: text("job_location_label", c.job_location_label)?,
        job_advertiser_id: text("job_advertiser_id", c.job_advertiser_id)?,
        request_token: text("request_token", c.request_token)?,
    })
}

fn text(field: &'static str, value: Option<Value>) -> Result<Option<String>, ValidationError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(mismatch(field, &other)),
    }
}

fn flag(field: &'static str, value: Option<Value>) -> Result<Option<bool>, ValidationError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(b)),
        Some(Value::Number(ref n)) if n.as_i64() == Some(0) => Ok(Some(false)),
        Some(Value::Number(ref n)) if n.as_i64() == Some(1) => Ok(Some(true)),
        Some(Value::String(ref s)) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(Some(true)),
            "false" | "0" | "no" => Ok(Some(false)),
            _ => Err(mismatch(field, &Value::String(s.clone()))),
        },
        Some(other) => Err(mismatch(field, &other)),
    }
}

fn mismatch(field: &'static str, found: &Value) -> ValidationError {
    ValidationError::Coercion {
        field,
        found: found.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;

    fn candidate(id: Option<Value>) -> CandidateJob {
        CandidateJob {
            job_id: id,
            job_title: Some(json!("Data Engineer")),
            company: None,
            company_logo_url: None,
            location: Some(json!("Sydney")),
            area: None,
            suburb: None,
            work_type: Some(json!("Full Time")),
            work_arrangement: None,
            salary: Some(json!("Not provided")),
            listing_date: NaiveDate::from_ymd_opt(2024, 4, 28)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            teaser: None,
            classification: None,
            sub_classification: None,
            is_premium: Some(json!(false)),
            is_standout: None,
            job_location_label: None,
            job_advertiser_id: Some(json!(12345)),
            request_token: None,
            malformed: None,
        }
    }

    #[test]
    fn missing_or_blank_job_id_is_rejected() {
        for id in [None, Some(Value::Null), Some(json!("")), Some(json!("   "))] {
            assert_eq!(validate(candidate(id)), Err(ValidationError::MissingJobId));
        }
    }

    #[test]
    fn job_id_is_kept_as_received() {
        let record = validate(candidate(Some(json!(" 80012345 ")))).unwrap();
        assert_eq!(record.job_id, " 80012345 ");
    }

    #[test]
    fn numeric_ids_and_fields_are_rendered_as_text() {
        let record = validate(candidate(Some(json!(80012345)))).unwrap();
        assert_eq!(record.job_id, "80012345");
        assert_eq!(record.job_advertiser_id.as_deref(), Some("12345"));
        assert_eq!(record.salary.as_deref(), Some("Not provided"));
        assert_eq!(record.is_premium, Some(false));
        assert_eq!(record.is_standout, None);
    }

    #[test]
    fn flags_accept_common_spellings() {
        let mut c = candidate(Some(json!("1")));
        c.is_premium = Some(json!("Yes"));
        c.is_standout = Some(json!(0));
        let record = validate(c).unwrap();
        assert_eq!(record.is_premium, Some(true));
        assert_eq!(record.is_standout, Some(false));
    }

    #[test]
    fn uncoercible_field_rejects_only_that_record() {
        let mut bad = candidate(Some(json!("2")));
        bad.job_title = Some(json!({ "nested": true }));
        let mut bad_flag = candidate(Some(json!("3")));
        bad_flag.is_standout = Some(json!("sometimes"));

        let out = validate_all(vec![
            candidate(Some(json!("1"))),
            bad,
            bad_flag,
            candidate(None),
            candidate(Some(json!("4"))),
        ]);

        let ids: Vec<_> = out.records.iter().map(|r| r.job_id.as_str()).collect();
        assert_eq!(ids, vec!["1", "4"]);
        assert_eq!(out.rejected, 3);
    }

    #[test]
    fn malformed_nested_object_rejects_the_record() {
        let mut c = candidate(Some(json!("5")));
        c.malformed = Some(("classification", json!("ICT")));
        assert_eq!(
            validate(c),
            Err(ValidationError::Coercion {
                field: "classification",
                found: "\"ICT\"".to_string(),
            })
        );
    }

    #[test]
    fn coercion_error_names_the_field() {
        let mut c = candidate(Some(json!("9")));
        c.teaser = Some(json!(["a", "b"]));
        match validate(c) {
            Err(ValidationError::Coercion { field, .. }) => assert_eq!(field, "teaser"),
            other => panic!("unexpected {:?}", other),
        }
    }
}

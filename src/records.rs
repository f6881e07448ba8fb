use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::models::CompanyRecord;
use crate::source::SourceRecord;

fn number(fields: &Map<String, Value>, key: &str) -> Option<f64> {
    let value = match fields.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        // Lookup/rollup fields arrive as single-element arrays.
        Value::Array(items) if items.len() == 1 => match &items[0] {
            Value::Number(n) => n.as_f64(),
            _ => None,
        },
        _ => None,
    }?;
    value.is_finite().then_some(value)
}

fn count(fields: &Map<String, Value>, key: &str) -> u64 {
    match number(fields, key) {
        Some(value) if value > 0.0 => value.round() as u64,
        _ => 0,
    }
}

fn company_name(fields: &Map<String, Value>) -> Option<String> {
    let name = match fields.get("company")? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!name.is_empty()).then_some(name)
}

pub fn company_record(record: &SourceRecord) -> Option<CompanyRecord> {
    let fields = &record.fields;
    let company = company_name(fields)?;

    Some(CompanyRecord {
        company,
        current_headcount: count(fields, "count_current_employees"),
        headcount_last_year: count(fields, "headcount_last_year"),
        current_engineers: count(fields, "engineers"),
        engineers_24mo: count(fields, "engineers_24m"),
        engineers_18mo: count(fields, "engineers_18m"),
        engineers_12mo: count(fields, "engineers_1yr"),
        engineers_6mo: count(fields, "engineers_6mo"),
        voluntary_departures: count(fields, "voluntarily_left"),
        retention: number(fields, "retention"),
        engineer_hiring_velocity: number(fields, "eng_velocity"),
        percent_headcount_change: number(fields, "pct_change"),
    })
}

/// Convert raw rows, dropping the ones without a company name.
pub fn normalize(records: &[SourceRecord]) -> Vec<CompanyRecord> {
    let mut companies = Vec::with_capacity(records.len());
    let mut discarded = 0usize;

    for record in records {
        match company_record(record) {
            Some(company) => companies.push(company),
            None => {
                discarded += 1;
                debug!(id = %record.id, "discarding record without company name");
            }
        }
    }

    if discarded > 0 {
        warn!(discarded, kept = companies.len(), "records without a company name were skipped");
    }
    companies
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::tests::record;
    use serde_json::json;

    #[test]
    fn maps_source_field_names() {
        let parsed = company_record(&record(json!({
            "company": "  Acme ",
            "count_current_employees": 120,
            "headcount_last_year": 100,
            "engineers": 40,
            "engineers_1yr": 30,
            "engineers_6mo": 35,
            "engineers_18m": 25,
            "engineers_24m": 20,
            "voluntarily_left": 6,
            "retention": 0.95,
            "eng_velocity": 1.5,
            "pct_change": 0.2
        })))
        .unwrap();

        assert_eq!(parsed.company, "Acme");
        assert_eq!(parsed.current_headcount, 120);
        assert_eq!(parsed.engineer_history(), [20, 25, 30, 35, 40]);
        assert_eq!(parsed.voluntary_departures, 6);
        assert_eq!(parsed.retention, Some(0.95));
        assert_eq!(parsed.engineer_hiring_velocity, Some(1.5));
        assert_eq!(parsed.percent_headcount_change, Some(0.2));
    }

    #[test]
    fn malformed_numbers_default_to_zero() {
        let parsed = company_record(&record(json!({
            "company": "Acme",
            "count_current_employees": "lots",
            "engineers": -4,
            "headcount_last_year": "80",
            "engineers_6mo": [12],
            "retention": {"bad": true}
        })))
        .unwrap();

        assert_eq!(parsed.current_headcount, 0);
        assert_eq!(parsed.current_engineers, 0);
        assert_eq!(parsed.headcount_last_year, 80);
        assert_eq!(parsed.engineers_6mo, 12);
        assert_eq!(parsed.retention, None);
    }

    #[test]
    fn nameless_records_are_skipped_without_aborting() {
        let companies = normalize(&[
            record(json!({"company": "A", "engineers": 1})),
            record(json!({"engineers": 5})),
            record(json!({"company": "   "})),
            record(json!({"company": null})),
            record(json!({"company": "B"})),
        ]);
        let names: Vec<_> = companies.iter().map(|c| c.company.as_str()).collect();
        assert_eq!(names, vec!["A", "B"]);
    }

    #[test]
    fn numeric_company_names_are_kept() {
        let parsed = company_record(&record(json!({"company": 1776, "engineers": 3}))).unwrap();
        assert_eq!(parsed.company, "1776");
        assert_eq!(parsed.current_engineers, 3);
    }
}

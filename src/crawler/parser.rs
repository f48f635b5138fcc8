use chrono::NaiveDateTime;
use serde_json::Value;

use crate::crawler::models::{CandidateJob, Nested, RawListing, RawPage, SALARY_NOT_PROVIDED};

pub const LISTING_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Flattens every listing on every page, keeping page order then in-page order.
pub fn flatten_pages(pages: &[RawPage], now: NaiveDateTime) -> Vec<CandidateJob> {
    pages
        .iter()
        .flat_map(|page| {
            let request_token = page
                .sol_metadata
                .as_ref()
                .and_then(|m| m.request_token.clone());

            page.listings()
                .iter()
                .map(move |job| flatten_listing(job, request_token.clone(), now))
        })
        .collect()
}

pub fn flatten_listing(
    job: &RawListing,
    request_token: Option<Value>,
    now: NaiveDateTime,
) -> CandidateJob {
    let advertiser = job.advertiser.as_ref().and_then(Nested::shaped);

    CandidateJob {
        job_id: job.id.clone(),
        job_title: job.title.clone(),
        company: advertiser.and_then(|a| a.description.clone()),
        company_logo_url: job
            .branding
            .as_ref()
            .and_then(Nested::shaped)
            .and_then(|b| b.assets.as_ref())
            .and_then(|a| a.logo.as_ref())
            .and_then(|l| l.strategies.as_ref())
            .and_then(|s| s.serp_logo.clone()),
        location: job.location.clone(),
        area: job.area.clone(),
        suburb: job.suburb.clone(),
        work_type: job.work_type.clone(),
        work_arrangement: job
            .work_arrangements
            .as_ref()
            .and_then(Nested::shaped)
            .and_then(|w| w.data.as_ref())
            .and_then(|d| d.first())
            .and_then(|d| d.label.as_ref())
            .and_then(|l| l.text.clone()),
        salary: match &job.salary {
            None => Some(Value::String(SALARY_NOT_PROVIDED.to_string())),
            Some(Value::Null) => None,
            Some(v) => Some(v.clone()),
        },
        listing_date: parse_listing_date(job.listing_date.as_ref()).unwrap_or(now),
        teaser: job.teaser.clone(),
        classification: job
            .classification
            .as_ref()
            .and_then(Nested::shaped)
            .and_then(|c| c.description.clone()),
        sub_classification: job
            .sub_classification
            .as_ref()
            .and_then(Nested::shaped)
            .and_then(|c| c.description.clone()),
        is_premium: job.is_premium.clone(),
        is_standout: job.is_standout.clone(),
        job_location_label: job
            .job_location
            .as_ref()
            .and_then(Nested::shaped)
            .and_then(|l| l.label.clone()),
        job_advertiser_id: advertiser.and_then(|a| a.id.clone()),
        request_token,
        malformed: malformed_field(job),
    }
}

fn malformed_field(job: &RawListing) -> Option<(&'static str, Value)> {
    [
        ("company", job.advertiser.as_ref().and_then(Nested::malformed)),
        ("company_logo_url", job.branding.as_ref().and_then(Nested::malformed)),
        ("work_arrangement", job.work_arrangements.as_ref().and_then(Nested::malformed)),
        ("classification", job.classification.as_ref().and_then(Nested::malformed)),
        ("sub_classification", job.sub_classification.as_ref().and_then(Nested::malformed)),
        ("job_location_label", job.job_location.as_ref().and_then(Nested::malformed)),
    ]
    .into_iter()
    .find_map(|(field, value)| value.map(|v| (field, v.clone())))
}

fn parse_listing_date(raw: Option<&Value>) -> Option<NaiveDateTime> {
    let text = raw?.as_str()?;
    NaiveDateTime::parse_from_str(text.trim(), LISTING_DATE_FORMAT).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap()
    }

    fn page(body: Value) -> RawPage {
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn maps_full_listing() {
        let pages = vec![page(json!({
            "totalPages": 1,
            "solMetadata": { "requestToken": "req-123" },
            "data": [{
                "id": "77001",
                "title": "Data Engineer",
                "advertiser": { "id": "adv-9", "description": "Acme Pty Ltd" },
                "branding": { "assets": { "logo": { "strategies": { "serpLogo": "https://img/logo.png" } } } },
                "location": "Sydney",
                "area": "CBD, Inner West & Eastern Suburbs",
                "suburb": "Sydney",
                "workType": "Full Time",
                "workArrangements": { "data": [ { "label": { "text": "Hybrid" } }, { "label": { "text": "Remote" } } ] },
                "salary": "$150k - $170k",
                "listingDate": "2024-04-28T03:12:45Z",
                "teaser": "Build pipelines",
                "classification": { "description": "Information & Communication Technology" },
                "subClassification": { "description": "Engineering - Software" },
                "isPremium": false,
                "isStandOut": true,
                "jobLocation": { "label": "Sydney NSW" }
            }]
        }))];

        let out = flatten_pages(&pages, now());
        assert_eq!(out.len(), 1);
        let job = &out[0];

        assert_eq!(job.job_id, Some(json!("77001")));
        assert_eq!(job.company, Some(json!("Acme Pty Ltd")));
        assert_eq!(job.company_logo_url, Some(json!("https://img/logo.png")));
        assert_eq!(job.work_arrangement, Some(json!("Hybrid")));
        assert_eq!(job.salary, Some(json!("$150k - $170k")));
        assert_eq!(
            job.listing_date,
            NaiveDate::from_ymd_opt(2024, 4, 28)
                .unwrap()
                .and_hms_opt(3, 12, 45)
                .unwrap()
        );
        assert_eq!(job.sub_classification, Some(json!("Engineering - Software")));
        assert_eq!(job.is_standout, Some(json!(true)));
        assert_eq!(job.job_location_label, Some(json!("Sydney NSW")));
        assert_eq!(job.job_advertiser_id, Some(json!("adv-9")));
        assert_eq!(job.request_token, Some(json!("req-123")));
    }

    #[test]
    fn missing_nested_objects_become_null_leaves() {
        let pages = vec![page(json!({
            "data": [{
                "id": "1",
                "advertiser": {},
                "branding": { "assets": null },
                "workArrangements": { "data": [] },
                "classification": null
            }]
        }))];

        let job = &flatten_pages(&pages, now())[0];
        assert_eq!(job.company, None);
        assert_eq!(job.job_advertiser_id, None);
        assert_eq!(job.company_logo_url, None);
        assert_eq!(job.work_arrangement, None);
        assert_eq!(job.classification, None);
        assert_eq!(job.sub_classification, None);
        assert_eq!(job.job_location_label, None);
        assert_eq!(job.request_token, None);
        assert_eq!(job.malformed, None);
    }

    #[test]
    fn wrongly_shaped_nested_object_is_flagged_not_mapped() {
        let pages = vec![page(json!({
            "data": [{
                "id": "2",
                "title": "Analyst",
                "advertiser": { "id": "adv", "description": "Acme" },
                "classification": "ICT",
                "branding": { "assets": "logo.png" }
            }]
        }))];

        let job = &flatten_pages(&pages, now())[0];
        assert_eq!(job.company, Some(json!("Acme")));
        assert_eq!(job.classification, None);
        assert_eq!(job.company_logo_url, None);
        assert_eq!(job.malformed, Some(("company_logo_url", json!({ "assets": "logo.png" }))));
    }

    #[test]
    fn absent_salary_gets_sentinel_but_null_stays_null() {
        let pages = vec![page(json!({
            "data": [
                { "id": "absent" },
                { "id": "null", "salary": null },
                { "id": "empty", "salary": "" }
            ]
        }))];

        let out = flatten_pages(&pages, now());
        assert_eq!(out[0].salary, Some(json!("Not provided")));
        assert_eq!(out[1].salary, None);
        assert_eq!(out[2].salary, Some(json!("")));
    }

    #[test]
    fn missing_or_bad_listing_date_falls_back_to_now() {
        let pages = vec![page(json!({
            "data": [
                { "id": "a" },
                { "id": "b", "listingDate": "28/04/2024" },
                { "id": "c", "listingDate": 1714270365 }
            ]
        }))];

        for job in flatten_pages(&pages, now()) {
            assert_eq!(job.listing_date, now());
        }
    }

    #[test]
    fn keeps_page_then_listing_order_and_page_token() {
        let pages = vec![
            page(json!({ "solMetadata": { "requestToken": "t1" }, "data": [ { "id": "1" }, { "id": "2" } ] })),
            page(json!({ "data": null })),
            page(json!({ "solMetadata": { "requestToken": "t3" }, "data": [ { "id": "3" } ] })),
        ];

        let out = flatten_pages(&pages, now());
        let ids: Vec<_> = out.iter().map(|j| j.job_id.clone().unwrap()).collect();
        assert_eq!(ids, vec![json!("1"), json!("2"), json!("3")]);
        assert_eq!(out[1].request_token, Some(json!("t1")));
        assert_eq!(out[2].request_token, Some(json!("t3")));
    }
}

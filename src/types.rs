//! Core types for toprated
//!
//! [`Record`] and [`PageResult`] are the validated forms of what the API returns. The raw
//! wire shapes are private; [`decode_page`] is the only way from bytes to a `PageResult`.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Highest rating the API can report
pub const MAX_RATING: f64 = 5.0;

/// One ranked item
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Identifier, unique within one query key
    pub id: u64,
    /// Display name
    pub name: String,
    /// City (or other query key) the API filed this record under
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    /// Estimated cost
    pub cost: u64,
    /// Average rating, 0.0 to 5.0
    pub rating: f64,
    /// Number of votes behind `rating`
    pub votes: u64,
}

/// One fetched page with its pagination metadata
#[derive(Clone, Debug, PartialEq)]
pub struct PageResult {
    /// Records in the order the API returned them
    pub records: Vec<Record>,
    /// 1-based page number reported by the API
    pub page_number: u32,
    /// Page size reported by the API
    pub per_page: u32,
    /// Total number of records across all pages
    pub total_items: u32,
    /// Number of pages for this query; identical on every page of one query
    pub total_pages: u32,
}

#[derive(Deserialize)]
struct RawPage {
    data: Vec<RawItem>,
    page: u32,
    per_page: u32,
    total: u32,
    total_pages: u32,
}

#[derive(Deserialize)]
struct RawItem {
    id: u64,
    name: String,
    #[serde(default)]
    city: Option<String>,
    #[serde(alias = "estimated_cost")]
    cost: u64,
    #[serde(default)]
    user_rating: Option<RawRating>,
    // Some deployments flatten the rating onto the item
    #[serde(default)]
    average_rating: Option<f64>,
    #[serde(default)]
    votes: Option<u64>,
}

#[derive(Deserialize)]
struct RawRating {
    average_rating: f64,
    votes: u64,
}

/// Decode and validate one response body
///
/// `key` and `page` are only used to give errors their context. An empty `data` array
/// decodes successfully; deciding that it is an error is up to the caller.
pub fn decode_page(key: &str, page: u32, body: &[u8]) -> Result<PageResult> {
    let decode_error = |reason: String| Error::Decode {
        key: key.to_string(),
        page,
        reason,
    };

    let raw: RawPage =
        serde_json::from_slice(body).map_err(|e| decode_error(format!("malformed body: {e}")))?;

    if raw.page == 0 {
        return Err(decode_error("page must be >= 1".to_string()));
    }
    // Unknown keys come back as total_pages 0 with no data; that is an empty page, not garbage
    if raw.total_pages == 0 && !raw.data.is_empty() {
        return Err(decode_error("total_pages must be >= 1".to_string()));
    }

    let records = raw
        .data
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            item.into_record()
                .map_err(|reason| decode_error(format!("item {index}: {reason}")))
        })
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(PageResult {
        records,
        page_number: raw.page,
        per_page: raw.per_page,
        total_items: raw.total,
        total_pages: raw.total_pages,
    })
}

impl RawItem {
    fn into_record(self) -> std::result::Result<Record, String> {
        let (rating, votes) = match (self.user_rating, self.average_rating, self.votes) {
            (Some(r), _, _) => (r.average_rating, r.votes),
            (None, Some(rating), Some(votes)) => (rating, votes),
            _ => return Err("missing user_rating".to_string()),
        };

        let record = Record {
            id: self.id,
            name: self.name,
            city: self.city,
            cost: self.cost,
            rating,
            votes,
        };
        record.validate()?;
        Ok(record)
    }
}

impl Record {
    /// Validate record data integrity
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.id == 0 {
            return Err("id must be positive".to_string());
        }

        if self.name.trim().is_empty() {
            return Err(format!("record {} has an empty name", self.id));
        }

        if self.cost == 0 {
            return Err(format!("record {} has a non-positive cost", self.id));
        }

        if !self.rating.is_finite() || !(0.0..=MAX_RATING).contains(&self.rating) {
            return Err(format!(
                "record {} has rating {} outside 0.0..={MAX_RATING}",
                self.id, self.rating
            ));
        }

        Ok(())
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_PAGE: &str = r#"{
        "page": 2,
        "per_page": 10,
        "total": 12,
        "total_pages": 2,
        "data": [
            {
                "city": "Denver",
                "name": "Pizza Pie",
                "estimated_cost": 40,
                "user_rating": { "average_rating": 4.7, "votes": 120 },
                "id": 11
            },
            {
                "city": "Denver",
                "name": "Bistro",
                "estimated_cost": 25,
                "user_rating": { "average_rating": 3.9, "votes": 0 },
                "id": 12
            }
        ]
    }"#;

    #[test]
    fn decodes_nested_rating() {
        let page = decode_page("denver", 2, SAMPLE_PAGE.as_bytes()).unwrap();

        assert_eq!(page.page_number, 2);
        assert_eq!(page.per_page, 10);
        assert_eq!(page.total_items, 12);
        assert_eq!(page.total_pages, 2);
        assert_eq!(page.records.len(), 2);

        let first = &page.records[0];
        assert_eq!(first.id, 11);
        assert_eq!(first.name, "Pizza Pie");
        assert_eq!(first.city.as_deref(), Some("Denver"));
        assert_eq!(first.cost, 40);
        assert_eq!(first.rating, 4.7);
        assert_eq!(first.votes, 120);
    }

    #[test]
    fn preserves_item_order() {
        let page = decode_page("denver", 2, SAMPLE_PAGE.as_bytes()).unwrap();
        let ids: Vec<_> = page.records.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![11, 12]);
    }

    #[test]
    fn accepts_flat_rating_and_plain_cost() {
        let body = r#"{
            "page": 1, "per_page": 1, "total": 1, "total_pages": 1,
            "data": [ { "id": 1, "name": "Cafe", "cost": 10, "average_rating": 4.0, "votes": 3 } ]
        }"#;
        let page = decode_page("k", 1, body.as_bytes()).unwrap();
        assert_eq!(page.records[0].cost, 10);
        assert_eq!(page.records[0].rating, 4.0);
        assert_eq!(page.records[0].city, None);
    }

    #[test]
    fn empty_data_decodes() {
        let body = r#"{ "page": 1, "per_page": 10, "total": 0, "total_pages": 1, "data": [] }"#;
        let page = decode_page("nowhere", 1, body.as_bytes()).unwrap();
        assert!(page.records.is_empty());
    }

    #[test]
    fn malformed_json_is_decode_error() {
        let err = decode_page("denver", 3, b"<html>oops</html>").unwrap_err();
        match err {
            Error::Decode { key, page, reason } => {
                assert_eq!(key, "denver");
                assert_eq!(page, 3);
                assert!(reason.contains("malformed body"), "{reason}");
            }
            other => panic!("expected decode error, got {other:?}"),
        }
    }

    #[test]
    fn missing_pagination_field_is_decode_error() {
        let body = r#"{ "page": 1, "per_page": 10, "total": 0, "data": [] }"#;
        assert!(matches!(
            decode_page("k", 1, body.as_bytes()),
            Err(Error::Decode { .. })
        ));
    }

    #[test]
    fn zero_total_pages_with_data_is_rejected() {
        let body = r#"{ "page": 1, "per_page": 10, "total": 1, "total_pages": 0, "data": [
            { "id": 1, "name": "A", "estimated_cost": 10,
              "user_rating": { "average_rating": 4.0, "votes": 1 } }
        ] }"#;
        assert!(matches!(
            decode_page("k", 1, body.as_bytes()),
            Err(Error::Decode { .. })
        ));
    }

    #[test]
    fn zero_total_pages_without_data_decodes_empty() {
        let body = r#"{ "page": 1, "per_page": 10, "total": 0, "total_pages": 0, "data": [] }"#;
        let page = decode_page("k", 1, body.as_bytes()).unwrap();
        assert!(page.records.is_empty());
        assert_eq!(page.total_pages, 0);
    }

    #[test]
    fn rating_out_of_range_is_rejected() {
        let body = r#"{
            "page": 1, "per_page": 1, "total": 1, "total_pages": 1,
            "data": [ { "id": 1, "name": "Cafe", "estimated_cost": 10,
                        "user_rating": { "average_rating": 5.5, "votes": 3 } } ]
        }"#;
        let err = decode_page("k", 1, body.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("item 0"), "{err}");
    }

    #[test]
    fn negative_votes_are_rejected() {
        let body = r#"{
            "page": 1, "per_page": 1, "total": 1, "total_pages": 1,
            "data": [ { "id": 1, "name": "Cafe", "estimated_cost": 10,
                        "user_rating": { "average_rating": 4.5, "votes": -1 } } ]
        }"#;
        assert!(matches!(
            decode_page("k", 1, body.as_bytes()),
            Err(Error::Decode { .. })
        ));
    }

    #[test]
    fn missing_rating_is_rejected() {
        let body = r#"{
            "page": 1, "per_page": 1, "total": 1, "total_pages": 1,
            "data": [ { "id": 1, "name": "Cafe", "estimated_cost": 10 } ]
        }"#;
        let err = decode_page("k", 1, body.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("missing user_rating"), "{err}");
    }

    #[test]
    fn record_validate() {
        let mut record = Record {
            id: 1,
            name: "Cafe".to_string(),
            city: None,
            cost: 10,
            rating: 4.2,
            votes: 7,
        };
        assert!(record.validate().is_ok());

        record.id = 0;
        assert!(record.validate().is_err());
        record.id = 1;

        record.name = "   ".to_string();
        assert!(record.validate().is_err());
        record.name = "Cafe".to_string();

        record.cost = 0;
        assert!(record.validate().is_err());
        record.cost = 10;

        record.rating = -0.1;
        assert!(record.validate().is_err());
        record.rating = f64::NAN;
        assert!(record.validate().is_err());
        record.rating = 0.0;
        assert!(record.validate().is_ok());
        record.rating = MAX_RATING;
        assert!(record.validate().is_ok());
    }
}

//! Response bodies and configurations shared by the integration tests

use serde_json::{Value, json};
use std::time::Duration;
use toprated::{ApiConfig, Config, RetryConfig};

/// One item as the API returns it
#[derive(Clone, Debug)]
pub struct Item {
    pub id: u64,
    pub name: String,
    pub rating: f64,
    pub votes: u64,
}

/// Shorthand for building an [`Item`]
pub fn item(id: u64, name: &str, rating: f64, votes: u64) -> Item {
    Item {
        id,
        name: name.to_string(),
        rating,
        votes,
    }
}

/// `count` items with ids starting at `first_id`, named `"<prefix>-<id>"`
pub fn items(prefix: &str, first_id: u64, count: u64) -> Vec<Item> {
    (first_id..first_id + count)
        .map(|id| item(id, &format!("{prefix}-{id}"), 3.0 + (id % 5) as f64 * 0.25, id * 3))
        .collect()
}

/// JSON body for one page in the API's wire format
pub fn page_json(page: u32, total_pages: u32, total: u32, data: &[Item]) -> Value {
    json!({
        "page": page,
        "per_page": 5,
        "total": total,
        "total_pages": total_pages,
        "data": data.iter().map(|i| json!({
            "city": "Denver",
            "name": i.name,
            "estimated_cost": 20 + i.id,
            "user_rating": { "average_rating": i.rating, "votes": i.votes },
            "id": i.id,
        })).collect::<Vec<_>>(),
    })
}

/// Serialized form of [`page_json`]
pub fn page_body(page: u32, total_pages: u32, total: u32, data: &[Item]) -> Vec<u8> {
    page_json(page, total_pages, total, data).to_string().into_bytes()
}

/// Retry settings fast enough for tests, with jitter off so delays are predictable
pub fn fast_retry(max_attempts: u32) -> RetryConfig {
    RetryConfig {
        max_attempts,
        initial_delay: Duration::from_millis(20),
        max_delay: Duration::from_secs(2),
        backoff_multiplier: 2.0,
        jitter: false,
    }
}

/// Configuration pointing at a mock server
pub fn mock_config(server_uri: &str) -> Config {
    Config {
        api: ApiConfig {
            base_url: format!("{server_uri}/api/food_outlets"),
            request_timeout: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(2),
            ..ApiConfig::default()
        },
        retry: fast_retry(3),
        ..Config::default()
    }
}

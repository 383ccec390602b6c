#![allow(dead_code)]

mod test_http_server;

use std::path::PathBuf;

use warp::http::StatusCode;
use warp::{Filter, Rejection, Reply};

pub use test_http_server::{TestHttpServer, test_http_server};

/// Directory holding the specifications used by the integration tests.
pub fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
}

/// Spawn a server exposing [inventory_routes].
pub fn inventory_server() -> TestHttpServer {
    test_http_server(inventory_routes())
}

/// Routes of an inventory api, plus the specifications describing it under `/specs`.
pub fn inventory_routes()
-> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone + Send + Sync + 'static {
    let specs = warp::path("specs").and(warp::fs::dir(fixtures_dir()));

    let list_items = warp::path!("inventory")
        .and(warp::get())
        .map(|| warp::reply::json(&serde_json::json!([inventory_item()])));
    let list_items_with_missing_fields = warp::path!("inventory-incomplete")
        .and(warp::get())
        .map(|| warp::reply::json(&serde_json::json!([{ "name": "Widget Adapter" }])));
    let add_item = warp::path!("inventory")
        .and(warp::post())
        .map(|| {
            warp::reply::with_status(
                warp::reply::with_header(
                    "d290f1ee-6c54-4b01-90e6-d701748f0851",
                    "content-type",
                    "text/plain; charset=utf-8",
                ),
                StatusCode::CREATED,
            )
        });
    let delete_item = warp::path!("inventory" / String)
        .and(warp::delete())
        .map(|_id| StatusCode::NO_CONTENT);
    let item_not_found = warp::path!("inventory" / String)
        .and(warp::get())
        .map(|_id| {
            warp::reply::with_status(
                warp::reply::json(&serde_json::json!({ "message": "item not found" })),
                StatusCode::NOT_FOUND,
            )
        });

    specs
        .or(list_items)
        .or(list_items_with_missing_fields)
        .or(add_item)
        .or(delete_item)
        .or(item_not_found)
}

/// An inventory item conforming to the specification.
pub fn inventory_item() -> serde_json::Value {
    serde_json::json!({
        "id": "d290f1ee-6c54-4b01-90e6-d701748f0851",
        "name": "Widget Adapter",
        "releaseDate": "2016-08-29T09:12:33.001Z",
        "manufacturer": {
            "name": "ACME Corporation",
            "homePage": "https://www.acme-corp.com",
            "phone": "408-867-5309"
        }
    })
}

// ABOUTME: End-to-end smoke test for the full comicstrip lifecycle.
// ABOUTME: Creates, reads, updates, empties, and auto-saves a comic through the router with a local backend.

use std::sync::Arc;

use axum::body::Body;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use comicstrip_core::IdStyle;
use comicstrip_server::{AppState, create_router};
use comicstrip_store::{ComicStore, LocalBackend};
use http::Request;
use tower::ServiceExt;

const BASE_URL: &str = "http://localhost:7332";

/// Helper to create a test AppState backed by SQLite and blob files in `home`.
fn test_app_state(home: &std::path::Path) -> Arc<AppState> {
    let backend = LocalBackend::open(home, BASE_URL).unwrap();
    let blob_dir = backend.blob_dir().to_path_buf();
    let store = ComicStore::new(Arc::new(backend), IdStyle::Uuid);
    Arc::new(AppState::new(store, BASE_URL, true).with_blob_dir(blob_dir))
}

/// Helper to extract JSON body from a response.
async fn json_body(resp: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

fn json_request(method: &str, uri: &str, body: &serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

fn captions(comic: &serde_json::Value) -> Vec<String> {
    comic["pages"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["caption"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn smoke_test_full_lifecycle() {
    let dir = tempfile::TempDir::new().unwrap();
    let state = test_app_state(dir.path());
    let app = create_router(Arc::clone(&state));

    // 1. Create a comic with an inline image and a linked image
    let create_body = serde_json::json!({
        "title": "Smoke Test Comic",
        "pages": [
            {
                "image": {
                    "file_name": "first panel.png",
                    "content_type": "image/png",
                    "data_base64": STANDARD.encode(b"fake-png-bytes"),
                },
                "caption": "Once upon a time"
            },
            { "image_url": "https://img.test/two.png", "caption": "The end" }
        ]
    });
    let resp = app
        .clone()
        .oneshot(json_request("POST", "/api/comics", &create_body))
        .await
        .unwrap();
    assert_eq!(resp.status(), 201, "create comic should return 201");
    let comic_id = json_body(resp).await["id"].as_str().unwrap().to_string();
    assert!(!comic_id.is_empty());

    // 2. Read it back in order, with the upload resolved to a public URL
    let resp = app
        .clone()
        .oneshot(get(&format!("/api/comics/{}", comic_id)))
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let comic = json_body(resp).await;
    assert_eq!(comic["title"], "Smoke Test Comic");
    assert_eq!(captions(&comic), vec!["Once upon a time", "The end"]);
    assert_eq!(comic["pages"][0]["page_number"], 1);
    assert_eq!(comic["pages"][1]["page_number"], 2);
    let uploaded_url = comic["pages"][0]["image_url"].as_str().unwrap().to_string();
    assert!(
        uploaded_url.starts_with(&format!("{}/blobs/{}/", BASE_URL, comic_id)),
        "unexpected blob url: {}",
        uploaded_url
    );
    assert!(uploaded_url.ends_with("-first-panel.png"));

    // 3. The uploaded blob is served back
    let blob_path = uploaded_url.strip_prefix(BASE_URL).unwrap();
    let resp = app.clone().oneshot(get(blob_path)).await.unwrap();
    assert_eq!(resp.status(), 200);
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&bytes[..], b"fake-png-bytes");

    // 4. Update: drop page 1, edit page 2 in place, append a new page
    let kept_id = comic["pages"][1]["id"].as_str().unwrap().to_string();
    let update_body = serde_json::json!({
        "title": "Smoke Test Comic (revised)",
        "pages": [
            { "id": kept_id, "image_url": "https://img.test/two.png", "caption": "The middle" },
            { "image_url": "https://img.test/three.png", "caption": "The real end" }
        ]
    });
    let resp = app
        .clone()
        .oneshot(json_request(
            "PUT",
            &format!("/api/comics/{}", comic_id),
            &update_body,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let comic = json_body(
        app.clone()
            .oneshot(get(&format!("/api/comics/{}", comic_id)))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(comic["title"], "Smoke Test Comic (revised)");
    assert_eq!(captions(&comic), vec!["The middle", "The real end"]);
    assert_eq!(comic["pages"][0]["id"], kept_id.as_str());

    // 5. The reader shows the second page and the list has one entry
    let resp = app
        .clone()
        .oneshot(get(&format!("/comic/{}?page=2", comic_id)))
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let html = String::from_utf8(
        axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap()
            .to_vec(),
    )
    .unwrap();
    assert!(html.contains("The real end"));

    let list = json_body(app.clone().oneshot(get("/api/comics")).await.unwrap()).await;
    assert_eq!(list.as_array().unwrap().len(), 1);
    assert_eq!(list[0]["id"], comic_id.as_str());

    // 6. Removing every page and saving yields an empty page list
    let resp = app
        .clone()
        .oneshot(json_request(
            "PUT",
            &format!("/api/comics/{}", comic_id),
            &serde_json::json!({ "title": "Empty now", "pages": [] }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let comic = json_body(
        app.clone()
            .oneshot(get(&format!("/api/comics/{}", comic_id)))
            .await
            .unwrap(),
    )
    .await;
    assert!(comic["pages"].as_array().unwrap().is_empty());

    // 7. An empty comic has nothing to read
    let resp = app
        .clone()
        .oneshot(get(&format!("/comic/{}", comic_id)))
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn api_errors_map_to_statuses() {
    let dir = tempfile::TempDir::new().unwrap();
    let app = create_router(test_app_state(dir.path()));

    let resp = app.clone().oneshot(get("/api/comics/missing-comic")).await.unwrap();
    assert_eq!(resp.status(), 404);
    assert!(json_body(resp).await["error"].as_str().unwrap().contains("not found"));

    let resp = app.clone().oneshot(get("/api/comics/bad%20id")).await.unwrap();
    assert_eq!(resp.status(), 400);

    let resp = app
        .clone()
        .oneshot(json_request(
            "PUT",
            "/api/comics/missing-comic",
            &serde_json::json!({ "title": "x", "pages": [] }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    let resp = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/comics",
            &serde_json::json!({
                "title": "bad",
                "pages": [{ "image": { "file_name": "notes.txt", "data_base64": "aGk=" }, "caption": "x" }]
            }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    assert!(json_body(resp).await["error"].as_str().unwrap().starts_with("page 1:"));
}

#[tokio::test]
async fn editor_autosaves_changes_to_an_existing_comic() {
    let dir = tempfile::TempDir::new().unwrap();
    let state = test_app_state(dir.path());
    let app = create_router(Arc::clone(&state));

    let resp = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/comics",
            &serde_json::json!({
                "title": "Autosaved",
                "pages": [{ "image_url": "https://img.test/a.png", "caption": "first" }]
            }),
        ))
        .await
        .unwrap();
    let comic_id = json_body(resp).await["id"].as_str().unwrap().to_string();

    let resp = app
        .clone()
        .oneshot(get(&format!("/edit?id={}", comic_id)))
        .await
        .unwrap();
    assert_eq!(resp.status(), 303);
    let draft = resp.headers()["location"].to_str().unwrap().to_string();

    let resp = app
        .clone()
        .oneshot(
            Request::post(format!("{}/caption/edit", draft))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resp = app
        .clone()
        .oneshot(
            Request::post(format!("{}/caption/save", draft))
                .header("content-type", "application/x-www-form-urlencoded")
                .body(Body::from("text=first%2C+revised"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let comic = json_body(
        app.clone()
            .oneshot(get(&format!("/api/comics/{}", comic_id)))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(captions(&comic), vec!["first, revised"]);
}

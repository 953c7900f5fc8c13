#![deny(clippy::all, clippy::pedantic)]

use httpmock::{Method::GET, MockServer};
use serde_json::json;
use tempfile::tempdir;
use vetrina::domain::record::ImageExporter;
use vetrina::infra::figma::FigmaClient;

fn client(server: &MockServer) -> FigmaClient {
    FigmaClient::new(&server.base_url(), "token".to_string(), 2).expect("client")
}

#[tokio::test]
async fn export_downloads_the_rendered_frame() {
    let server = MockServer::start_async().await;
    let images = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/v1/images/testkey")
                .header("X-Figma-Token", "token")
                .query_param("ids", "12-34")
                .query_param("format", "png")
                .query_param("scale", "2");
            then.status(200).json_body(json!({
                "images": {"12:34": format!("{}/render/frame.png", server.base_url())}
            }));
        })
        .await;
    let download = server
        .mock_async(|when, then| {
            when.method(GET).path("/render/frame.png");
            then.status(200).body("fake png bytes");
        })
        .await;

    let dir = tempdir().expect("tempdir");
    let dest = dir.path().join("state-diagram.png");
    client(&server)
        .export_png(
            "https://www.figma.com/design/testkey/Order?node-id=12-34",
            &dest,
        )
        .await
        .expect("export");

    assert_eq!(std::fs::read(&dest).expect("written"), b"fake png bytes");
    images.assert_async().await;
    download.assert_async().await;
}

#[tokio::test]
async fn a_null_image_url_means_the_link_no_longer_resolves() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/v1/images/testkey");
            then.status(200).json_body(json!({"images": {"12:34": null}}));
        })
        .await;

    let dir = tempdir().expect("tempdir");
    let error = client(&server)
        .export_png(
            "https://www.figma.com/design/testkey/Order?node-id=12-34",
            &dir.path().join("out.png"),
        )
        .await
        .expect_err("must fail");
    assert!(error.to_string().contains("no longer resolves"));
}

#[tokio::test]
async fn forbidden_points_at_the_token() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/v1/images/testkey");
            then.status(403).body("Forbidden");
        })
        .await;

    let dir = tempdir().expect("tempdir");
    let error = client(&server)
        .export_png(
            "https://www.figma.com/design/testkey/Order?node-id=12-34",
            &dir.path().join("out.png"),
        )
        .await
        .expect_err("must fail");
    assert!(error.to_string().contains("403"));
}

#[tokio::test]
async fn unparseable_references_never_reach_the_network() {
    let server = MockServer::start_async().await;
    let any = server
        .mock_async(|when, then| {
            when.method(GET).path_includes("/");
            then.status(200);
        })
        .await;

    let dir = tempdir().expect("tempdir");
    let error = client(&server)
        .export_png("https://example.com/not-figma", &dir.path().join("out.png"))
        .await
        .expect_err("must fail");
    assert!(error.to_string().contains("not a Figma URL"));
    any.assert_hits_async(0).await;
}

use actix_web::dev::{ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{test, web, App};
use serde_json::{json, Value};

use vault_drive::app_state::AppState;
use vault_drive::folders::FolderStore as _;
use vault_drive::service::{delete_service, serve_service, upload_service};

fn app(
    state: AppState,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    App::new()
        .app_data(web::Data::new(state))
        .route("/files", web::post().to(upload_service))
        .route("/files", web::delete().to(delete_service))
        .route("/uploads/{path:.*}", web::get().to(serve_service))
}

#[actix_web::test]
async fn test_upload_serve_delete_round_trip() {
    let root = tempfile::tempdir().unwrap();
    let state = AppState::new_for_testing(root.path());
    let app = test::init_service(app(state)).await;

    let req = test::TestRequest::post()
        .uri("/files")
        .insert_header(("X-File-Hash", "abc123"))
        .insert_header(("X-File-Ext", "png"))
        .insert_header(("X-Dir-Hint", "Café Photos/Ãrvore"))
        .set_payload(vec![1u8, 2, 3, 4])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["path"], "Cafe-Photos/Arvore/abc123.png");
    assert_eq!(body["url"], "/uploads/Cafe-Photos/Arvore/abc123.png");

    let req = test::TestRequest::get()
        .uri("/uploads/Cafe-Photos/Arvore/abc123.png")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());
    let bytes = test::read_body(resp).await;
    assert_eq!(bytes.as_ref(), &[1u8, 2, 3, 4]);

    let req = test::TestRequest::delete()
        .uri("/files")
        .set_json(json!({"hash": "abc123", "dir_hint": "Café Photos/Ãrvore", "ext": "png"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["deleted"], true);

    let req = test::TestRequest::get()
        .uri("/uploads/Cafe-Photos/Arvore/abc123.png")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 404);
}

#[actix_web::test]
async fn test_delete_from_url_only_descriptor() {
    let root = tempfile::tempdir().unwrap();
    let state = AppState::new_for_testing(root.path());
    let app = test::init_service(app(state)).await;

    let req = test::TestRequest::post()
        .uri("/files")
        .insert_header(("X-File-Hash", "feedbeef"))
        .insert_header(("X-File-Ext", "pdf"))
        .insert_header(("X-Dir-Hint", "reports"))
        .set_payload(b"pdf bytes".to_vec())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());
    let body: Value = test::read_body_json(resp).await;
    let url = body["url"].as_str().unwrap().to_string();

    // no hint and no extension, just the public URL
    let req = test::TestRequest::delete()
        .uri("/files")
        .set_json(json!({"hash": "feedbeef", "url": url}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["deleted"], true);
}

#[actix_web::test]
async fn test_delete_unknown_object_reports_not_found() {
    let root = tempfile::tempdir().unwrap();
    let state = AppState::new_for_testing(root.path());
    let app = test::init_service(app(state)).await;

    let req = test::TestRequest::delete()
        .uri("/files")
        .set_json(json!({"hash": "nothere"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["deleted"], false);
}

#[actix_web::test]
async fn test_upload_without_hash_is_rejected() {
    let root = tempfile::tempdir().unwrap();
    let state = AppState::new_for_testing(root.path());
    let app = test::init_service(app(state)).await;

    let req = test::TestRequest::post()
        .uri("/files")
        .set_payload(b"data".to_vec())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 400);
}

#[actix_web::test]
async fn test_private_object_requires_credentials() {
    let root = tempfile::tempdir().unwrap();
    let state = AppState::new_for_testing(root.path());
    let app = test::init_service(app(state)).await;

    let req = test::TestRequest::post()
        .uri("/files")
        .insert_header(("X-File-Hash", "priv01"))
        .insert_header(("X-File-Ext", "png"))
        .insert_header(("X-Private", "true"))
        .insert_header(("X-Owner", "u1"))
        .set_payload(b"secret image".to_vec())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["path"], "private/u1/priv01.png");
    let signed_url = body["signed_url"].as_str().unwrap().to_string();

    // anonymous read is denied
    let req = test::TestRequest::get()
        .uri("/uploads/private/u1/priv01.png")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 403);

    // privileged bearer is allowed
    let req = test::TestRequest::get()
        .uri("/uploads/private/u1/priv01.png")
        .insert_header(("Authorization", "Bearer admin-token"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());

    // the owner is allowed
    let req = test::TestRequest::get()
        .uri("/uploads/private/u1/priv01.png")
        .insert_header(("Authorization", "Bearer user-token"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());

    // the signed URL from the upload response is allowed
    let req = test::TestRequest::get().uri(&signed_url).to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());
    let bytes = test::read_body(resp).await;
    assert_eq!(bytes.as_ref(), b"secret image");
}

#[actix_web::test]
async fn test_private_object_of_another_owner_is_denied() {
    let root = tempfile::tempdir().unwrap();
    let state = AppState::new_for_testing(root.path());
    let app = test::init_service(app(state)).await;

    let req = test::TestRequest::post()
        .uri("/files")
        .insert_header(("X-File-Hash", "priv02"))
        .insert_header(("X-File-Ext", "png"))
        .insert_header(("X-Private", "true"))
        .insert_header(("X-Owner", "u2"))
        .set_payload(b"not yours".to_vec())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());

    // user-token belongs to u1
    let req = test::TestRequest::get()
        .uri("/uploads/private/u2/priv02.png")
        .insert_header(("Authorization", "Bearer user-token"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 403);
}

#[actix_web::test]
async fn test_encoded_private_prefix_is_still_gated() {
    let root = tempfile::tempdir().unwrap();
    let state = AppState::new_for_testing(root.path());
    let app = test::init_service(app(state)).await;

    let req = test::TestRequest::post()
        .uri("/files")
        .insert_header(("X-File-Hash", "priv99"))
        .insert_header(("X-File-Ext", "png"))
        .insert_header(("X-Private", "true"))
        .insert_header(("X-Owner", "u1"))
        .set_payload(b"secret".to_vec())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());

    // an encoded spelling of the private folder must not slip past the gate
    let req = test::TestRequest::get()
        .uri("/uploads/%70rivate/u1/priv99.png")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 403);

    // credentials still work through the encoded spelling
    let req = test::TestRequest::get()
        .uri("/uploads/%70rivate/u1/priv99.png")
        .insert_header(("Authorization", "Bearer admin-token"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());
    let bytes = test::read_body(resp).await;
    assert_eq!(bytes.as_ref(), b"secret");
}

#[actix_web::test]
async fn test_partial_delete_prunes_empty_folders() {
    let root = tempfile::tempdir().unwrap();
    let state = AppState::new_for_testing(root.path());
    let folders = state.folders.clone();
    let app = test::init_service(app(state)).await;

    let req = test::TestRequest::post()
        .uri("/files")
        .insert_header(("X-File-Hash", "lonely1"))
        .insert_header(("X-File-Ext", "png"))
        .insert_header(("X-Virtual-Dir", "solo"))
        .set_payload(b"x".to_vec())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());
    assert!(folders.folder_by_path("solo").unwrap().is_some());

    // hash-only descriptor: the folder reference must come from the file
    // record, which has to survive until after the prune
    let req = test::TestRequest::delete()
        .uri("/files")
        .set_json(json!({"hash": "lonely1"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["deleted"], true);

    assert!(folders.folder_by_path("solo").unwrap().is_none());
    assert!(folders.folder_of_file("lonely1").unwrap().is_none());
}

#[actix_web::test]
async fn test_private_upload_without_owner_is_rejected() {
    let root = tempfile::tempdir().unwrap();
    let state = AppState::new_for_testing(root.path());
    let app = test::init_service(app(state)).await;

    let req = test::TestRequest::post()
        .uri("/files")
        .insert_header(("X-File-Hash", "priv03"))
        .insert_header(("X-Private", "true"))
        .set_payload(b"x".to_vec())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 400);
}

#[actix_web::test]
async fn test_public_reads_bypass_the_gate() {
    let root = tempfile::tempdir().unwrap();
    let state = AppState::new_for_testing(root.path());
    let app = test::init_service(app(state)).await;

    let req = test::TestRequest::post()
        .uri("/files")
        .insert_header(("X-File-Hash", "pub01"))
        .insert_header(("X-File-Ext", "txt"))
        .set_payload(b"hello".to_vec())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());

    let req = test::TestRequest::get().uri("/uploads/pub01.txt").to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());
}

#[actix_web::test]
async fn test_read_path_cannot_escape_the_root() {
    let root = tempfile::tempdir().unwrap();
    std::fs::write(root.path().join("outside.txt"), b"outside").unwrap();
    let inner = root.path().join("store");
    std::fs::create_dir_all(&inner).unwrap();
    let state = AppState::new_for_testing(&inner);
    let app = test::init_service(app(state)).await;

    let req = test::TestRequest::get()
        .uri("/uploads/..%2Foutside.txt")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert!(!resp.status().is_success());
}

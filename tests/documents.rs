#[macro_use]
mod common;

use actix_web::http::{header, StatusCode};
use actix_web::test;
use common::{bearer, read_json, register_and_login, TestContext, TestUser};
use pretty_assertions::assert_eq;

const BOUNDARY: &str = "----fieldtask-boundary";

/// Builds a `multipart/form-data` body with text fields and at most one `file` part.
fn multipart_body(fields: &[(&str, &str)], file: Option<(&str, &[u8])>) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                BOUNDARY, name, value
            )
            .as_bytes(),
        );
    }
    if let Some((filename, bytes)) = file {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\n\
                 Content-Type: application/octet-stream\r\n\r\n",
                BOUNDARY, filename
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

fn multipart_request(
    method: test::TestRequest,
    uri: &str,
    user: &TestUser,
    body: Vec<u8>,
) -> actix_http::Request {
    method
        .uri(uri)
        .insert_header(bearer(&user.token))
        .insert_header((
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        ))
        .set_payload(body)
        .to_request()
}

#[actix_rt::test]
async fn test_document_upload_list_download_delete() {
    let ctx = TestContext::new();
    let app = test_app!(ctx);
    let supervisor =
        register_and_login(&app, &ctx, "Sam Supervisor", "sam@example.com", "supervisor").await;
    let operator = register_and_login(&app, &ctx, "Otto", "otto@example.com", "operator").await;

    let contents: &[u8] = b"%PDF-1.4 safety rules";
    let req = multipart_request(
        test::TestRequest::post(),
        "/api/uploadDocument",
        &supervisor,
        multipart_body(
            &[("title", "Safety rules"), ("filter", "Safety")],
            Some(("rules.pdf", contents)),
        ),
    );
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body = read_json(resp).await;
    let document = &body["document"];
    assert_eq!(document["title"], "Safety rules");
    assert_eq!(document["filter"], "Safety");
    assert_eq!(document["original_name"], "rules.pdf");
    assert_eq!(document["uploaded_by"], supervisor.id.to_string());
    let document_id = document["id"].as_str().unwrap().to_string();
    assert_eq!(ctx.stored_files(), 1);

    let req = multipart_request(
        test::TestRequest::post(),
        "/api/uploadDocument",
        &supervisor,
        multipart_body(&[("title", "Holiday plan")], Some(("plan.txt", b"closed".as_slice()))),
    );
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body = read_json(resp).await;
    assert_eq!(body["document"]["filter"], "General");

    let req = test::TestRequest::get()
        .uri("/api/documents")
        .insert_header(bearer(&operator.token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    let body = read_json(resp).await;
    let titles: Vec<&str> = body["documents"]
        .as_array()
        .unwrap()
        .iter()
        .map(|doc| doc["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["Holiday plan", "Safety rules"]);

    let req = test::TestRequest::get()
        .uri("/api/documents?filter=Safety")
        .insert_header(bearer(&operator.token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    let body = read_json(resp).await;
    assert_eq!(body["documents"].as_array().unwrap().len(), 1);

    let req = test::TestRequest::get()
        .uri(&format!("/api/documents/{}/download", document_id))
        .insert_header(bearer(&operator.token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let disposition = resp
        .headers()
        .get(header::CONTENT_DISPOSITION)
        .and_then(|value| value.to_str().ok())
        .unwrap()
        .to_string();
    assert!(disposition.starts_with("attachment"));
    assert!(disposition.contains("rules.pdf"));
    let bytes = test::read_body(resp).await;
    assert_eq!(&bytes[..], contents);

    let req = test::TestRequest::delete()
        .uri(&format!("/api/documents/{}", document_id))
        .insert_header(bearer(&operator.token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let req = test::TestRequest::delete()
        .uri(&format!("/api/documents/{}", document_id))
        .insert_header(bearer(&supervisor.token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = read_json(resp).await;
    assert_eq!(body["message"], "Document deleted");
    assert_eq!(ctx.stored_files(), 1);

    let req = test::TestRequest::get()
        .uri(&format!("/api/documents/{}/download", document_id))
        .insert_header(bearer(&operator.token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_rt::test]
async fn test_document_upload_rejections() {
    let ctx = TestContext::new();
    let app = test_app!(ctx);
    let supervisor =
        register_and_login(&app, &ctx, "Sam Supervisor", "sam@example.com", "supervisor").await;
    let operator = register_and_login(&app, &ctx, "Otto", "otto@example.com", "operator").await;

    let req = multipart_request(
        test::TestRequest::post(),
        "/api/uploadDocument",
        &supervisor,
        multipart_body(&[("title", "Empty")], None),
    );
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = read_json(resp).await;
    assert_eq!(body["error"], "No file uploaded");

    // A rejected upload leaves nothing behind.
    let req = multipart_request(
        test::TestRequest::post(),
        "/api/uploadDocument",
        &supervisor,
        multipart_body(&[("filter", "HR")], Some(("untitled.pdf", b"data".as_slice()))),
    );
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(ctx.stored_files(), 0);

    let oversized = vec![b'x'; 64 * 1024 + 1];
    let req = multipart_request(
        test::TestRequest::post(),
        "/api/uploadDocument",
        &supervisor,
        multipart_body(&[("title", "Too big")], Some(("big.bin", oversized.as_slice()))),
    );
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(ctx.stored_files(), 0);

    let req = multipart_request(
        test::TestRequest::post(),
        "/api/uploadDocument",
        &operator,
        multipart_body(&[("title", "Nope")], Some(("nope.pdf", b"data".as_slice()))),
    );
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[actix_rt::test]
async fn test_failed_form_after_the_file_leaves_nothing_behind() {
    let ctx = TestContext::new();
    let app = test_app!(ctx);
    let supervisor =
        register_and_login(&app, &ctx, "Sam Supervisor", "sam@example.com", "supervisor").await;

    // The file part comes first and is already on disk when the title fails to decode.
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"rules.pdf\"\r\n\
             Content-Type: application/pdf\r\n\r\n%PDF-1.4\r\n",
            BOUNDARY
        )
        .as_bytes(),
    );
    body.extend_from_slice(
        format!(
            "--{}\r\nContent-Disposition: form-data; name=\"title\"\r\n\r\n",
            BOUNDARY
        )
        .as_bytes(),
    );
    body.extend_from_slice(&[0xff, 0xfe]);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());

    let req = multipart_request(
        test::TestRequest::post(),
        "/api/uploadDocument",
        &supervisor,
        body,
    );
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(ctx.stored_files(), 0);

    let req = test::TestRequest::get()
        .uri("/api/documents")
        .insert_header(bearer(&supervisor.token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    let body = read_json(resp).await;
    assert!(body["documents"].as_array().unwrap().is_empty());
}

#[actix_rt::test]
async fn test_profile_picture_upload_is_served_publicly() {
    let ctx = TestContext::new();
    let app = test_app!(ctx);
    let operator = register_and_login(&app, &ctx, "Otto", "otto@example.com", "operator").await;

    let req = multipart_request(
        test::TestRequest::put(),
        "/api/user/my-profile/profilepic",
        &operator,
        multipart_body(&[], Some(("virus.exe", b"MZ".as_slice()))),
    );
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(ctx.stored_files(), 0);

    let png: &[u8] = b"\x89PNG\r\n\x1a\nfirst";
    let req = multipart_request(
        test::TestRequest::put(),
        "/api/user/my-profile/profilepic",
        &operator,
        multipart_body(&[], Some(("me.png", png))),
    );
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = read_json(resp).await;
    assert_eq!(body["message"], "Profile picture updated");
    let first_path = body["user"]["profile_picture"].as_str().unwrap().to_string();
    assert!(first_path.starts_with("/public/"));
    assert!(first_path.ends_with(".png"));

    let req = test::TestRequest::get().uri(&first_path).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get(header::CONTENT_TYPE).unwrap(),
        "image/png"
    );
    let bytes = test::read_body(resp).await;
    assert_eq!(&bytes[..], png);

    // Replacing the picture removes the old file.
    let req = multipart_request(
        test::TestRequest::put(),
        "/api/user/my-profile/profilepic",
        &operator,
        multipart_body(&[], Some(("me.jpg", b"jpeg".as_slice()))),
    );
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(ctx.stored_files(), 1);

    let req = test::TestRequest::get().uri(&first_path).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let req = test::TestRequest::get()
        .uri("/public/not-an-upload.png")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

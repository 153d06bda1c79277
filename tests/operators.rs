#[macro_use]
mod common;

use actix_web::http::StatusCode;
use actix_web::test;
use common::{assign, bearer, create_task, read_json, register_and_login, TestContext};
use fieldtask::availability::{Availability, OperatorSummary};
use fieldtask::models::OperatorCategory;
use pretty_assertions::assert_eq;
use serde_json::json;
use uuid::Uuid;

#[actix_rt::test]
async fn test_operator_list_reports_load_and_availability() {
    let ctx = TestContext::new();
    let app = test_app!(ctx);
    let supervisor =
        register_and_login(&app, &ctx, "Sam Supervisor", "sam@example.com", "supervisor").await;
    let zoe = register_and_login(&app, &ctx, "Zoe", "zoe@example.com", "operator").await;
    let adam = register_and_login(&app, &ctx, "Adam", "adam@example.com", "operator").await;

    for title in ["Trim", "Polish", "Pack"] {
        let task_id = create_task(&app, &supervisor, title).await;
        let (status, _) = assign(&app, &supervisor, task_id, &[zoe.id]).await;
        assert_eq!(status, StatusCode::OK);
    }

    let req = test::TestRequest::get()
        .uri("/api/user/operators")
        .insert_header(bearer(&supervisor.token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = read_json(resp).await;
    assert_eq!(body["success"], true);

    let operators: Vec<OperatorSummary> =
        serde_json::from_value(body["operators"].clone()).unwrap();
    assert_eq!(operators.len(), 2);

    assert_eq!(operators[0].id, adam.id);
    assert_eq!(operators[0].total_tasks, 0);
    assert_eq!(operators[0].availability, Availability::Available);
    assert_eq!(operators[0].category, OperatorCategory::Unassigned);

    assert_eq!(operators[1].id, zoe.id);
    assert_eq!(operators[1].total_tasks, 3);
    assert_eq!(operators[1].availability, Availability::Busy);
}

#[actix_rt::test]
async fn test_operator_list_is_for_supervisors() {
    let ctx = TestContext::new();
    let app = test_app!(ctx);
    let operator = register_and_login(&app, &ctx, "Zoe", "zoe@example.com", "operator").await;

    let req = test::TestRequest::get()
        .uri("/api/user/operators")
        .insert_header(bearer(&operator.token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[actix_rt::test]
async fn test_update_operator() {
    let ctx = TestContext::new();
    let app = test_app!(ctx);
    let supervisor =
        register_and_login(&app, &ctx, "Sam Supervisor", "sam@example.com", "supervisor").await;
    let zoe = register_and_login(&app, &ctx, "Zoe", "zoe@example.com", "operator").await;

    let req = test::TestRequest::put()
        .uri(&format!("/api/user/operators/{}", zoe.id))
        .insert_header(bearer(&supervisor.token))
        .set_json(json!({ "name": "Zoe Q", "category": "Refining" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = read_json(resp).await;
    assert_eq!(body["message"], "Operator updated successfully");
    assert_eq!(body["operator"]["name"], "Zoe Q");
    assert_eq!(body["operator"]["category"], "Refining");
    assert_eq!(body["operator"]["email"], "zoe@example.com");

    let req = test::TestRequest::put()
        .uri(&format!("/api/user/operators/{}", zoe.id))
        .insert_header(bearer(&supervisor.token))
        .set_json(json!({ "category": "Welding" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::put()
        .uri(&format!("/api/user/operators/{}", zoe.id))
        .insert_header(bearer(&supervisor.token))
        .set_json(json!({ "name": "  " }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

    // Supervisors are not operators.
    let req = test::TestRequest::put()
        .uri(&format!("/api/user/operators/{}", supervisor.id))
        .insert_header(bearer(&supervisor.token))
        .set_json(json!({ "category": "Plastic" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body = read_json(resp).await;
    assert_eq!(body["error"], "Operator not found");

    let req = test::TestRequest::put()
        .uri(&format!("/api/user/operators/{}", Uuid::new_v4()))
        .insert_header(bearer(&supervisor.token))
        .set_json(json!({ "category": "Plastic" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let req = test::TestRequest::put()
        .uri(&format!("/api/user/operators/{}", zoe.id))
        .insert_header(bearer(&zoe.token))
        .set_json(json!({ "category": "Plastic" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

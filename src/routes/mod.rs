pub mod auth;
pub mod documents;
pub mod health;
pub mod tasks;
pub mod users;

use actix_web::web;

/// Routes mounted under `/api`, behind `AuthMiddleware`.
pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/user")
            .service(auth::register)
            .service(auth::verify_user)
            .service(auth::login)
            .service(auth::forgot_password)
            .service(auth::reset_password)
            .service(users::get_my_profile)
            .service(users::update_my_profile)
            .service(users::update_profile_pic)
            .service(users::get_all_operators)
            .service(users::update_operator),
    )
    .service(
        // `/my-tasks` must be registered before `/{task_id}`.
        web::scope("/task")
            .service(tasks::create_task)
            .service(tasks::get_my_tasks)
            .service(tasks::get_task)
            .service(tasks::update_task)
            .service(tasks::delete_task)
            .service(tasks::assign_task)
            .service(tasks::update_task_status)
            .service(tasks::add_comment),
    )
    .service(documents::upload_document)
    .service(documents::get_documents)
    .service(documents::download_document)
    .service(documents::delete_document);
}

/// Routes reachable without a token.
pub fn public(cfg: &mut web::ServiceConfig) {
    cfg.service(health::health).service(documents::serve_public);
}

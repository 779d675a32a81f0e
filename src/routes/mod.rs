pub mod auth;
pub mod candidacies;
pub mod events;
pub mod health;
pub mod participants;
pub mod tasks;
pub mod users;

use actix_web::web;

/// Mounts every `/api` route; wrap the enclosing scope with `AuthMiddleware`.
pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/auth")
            .service(auth::login)
            .service(auth::register),
    )
    .service(
        web::scope("/events")
            .service(events::list_events)
            .service(events::create_event)
            .service(events::get_event)
            .service(events::delete_event)
            .service(participants::list_participants)
            .service(participants::register_participant)
            .service(participants::unregister_participant)
            .service(candidacies::list_candidacies)
            .service(candidacies::submit_candidacy)
            .service(candidacies::cancel_candidacy),
    )
    .service(
        web::scope("/users")
            .service(users::me)
            .service(users::my_events),
    )
    .service(
        web::scope("/tasks")
            .service(tasks::get_tasks)
            .service(tasks::create_task)
            .service(tasks::get_task)
            .service(tasks::delete_task)
            .service(tasks::claim_task)
            .service(tasks::release_task),
    );
}

pub mod auth;
mod bookings;
pub mod error;
mod feedbacks;
mod flights;
pub mod forms;
mod home;
mod passengers;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout));

    let booking_routes = Router::new()
        .route("/", get(bookings::list_bookings))
        .route(
            "/create",
            get(bookings::create_form).post(bookings::create_booking),
        )
        .route("/taken-seats", get(bookings::taken_seats))
        .route("/:id", get(bookings::get_booking))
        .route(
            "/:id/edit",
            get(bookings::edit_form).post(bookings::edit_booking),
        )
        .route(
            "/:id/delete",
            get(bookings::delete_confirmation).post(bookings::delete_booking),
        );

    let feedback_routes = Router::new()
        .route("/", get(feedbacks::list_feedback))
        .route(
            "/create",
            get(feedbacks::create_form).post(feedbacks::create_feedback),
        )
        .route("/:id", get(feedbacks::get_feedback))
        .route(
            "/:id/edit",
            get(feedbacks::edit_form).post(feedbacks::edit_feedback),
        )
        .route("/:id/delete", post(feedbacks::delete_feedback));

    let passenger_routes = Router::new()
        .route("/", get(passengers::list_passengers))
        .route(
            "/create",
            get(passengers::create_form).post(passengers::create_passenger),
        )
        .route(
            "/register",
            get(passengers::register_form).post(passengers::register_passenger),
        )
        .route("/:id", get(passengers::get_passenger))
        .route(
            "/:id/edit",
            get(passengers::edit_form).post(passengers::edit_passenger),
        )
        .route("/:id/delete", post(passengers::delete_passenger));

    let flight_routes = Router::new()
        .route("/", get(flights::list_flights))
        .route("/create", post(flights::create_flight))
        .route("/:id", get(flights::get_flight))
        .route("/:id/seats", get(bookings::seat_map))
        .route("/:id/edit", post(flights::edit_flight))
        .route("/:id/delete", post(flights::delete_flight));

    Router::new()
        .route("/", get(home::index))
        .route("/admin-dashboard", get(home::admin_dashboard))
        .route("/error", get(home::error_page))
        .route("/health", get(home::health_check))
        .nest("/auth", auth_routes)
        .nest("/bookings", booking_routes)
        .nest("/feedbacks", feedback_routes)
        .nest("/passengers", passenger_routes)
        .nest("/flights", flight_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

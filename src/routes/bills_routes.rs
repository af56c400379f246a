use axum::{Router, routing::{get, post}};
use crate::{AppState, controllers::bills_controller};

pub fn add_routes(router: Router<AppState>) -> Router<AppState> {
    router
        .route("/", get(bills_controller::get_add_bill))
        .route("/addBill", post(bills_controller::post_add_bill))
}

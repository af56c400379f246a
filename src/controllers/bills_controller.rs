use axum::{
    extract::{Form, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use serde_json::json;

use crate::{
    error::ValidationError,
    flash::{self, Flash},
    models::Bill,
    render,
    services::bills_service,
    AppState,
};

pub const DUE_DATE_FORMAT: &str = "%Y-%m-%d";

fn redirect_home(jar: CookieJar) -> Response {
    (
        jar,
        (StatusCode::SEE_OTHER, [("Location", "/")], Html("".to_string())),
    )
        .into_response()
}

fn redirect_with(state: &AppState, jar: CookieJar, msg: Flash) -> Response {
    let jar = flash::set(jar, &msg, state.settings.cookie_secure);
    redirect_home(jar)
}

// GET /
pub async fn get_add_bill(State(state): State<AppState>, jar: CookieJar) -> Response {
    let (jar, message) = flash::take(jar);

    let ctx = json!({
        "page_title": "Add Electricity Bill",
        "flash": message,
        "today": Utc::now().date_naive().format(DUE_DATE_FORMAT).to_string(),
    });

    let body = match state.hbs.render("pages/add_bill", &ctx) {
        Ok(s) => s,
        Err(e) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Html(format!("template error: {e}")),
            )
                .into_response()
        }
    };

    match render::render_full(&state, "Add Electricity Bill", body) {
        Ok(page) => (jar, Html(page)).into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, Html(e)).into_response(),
    }
}

#[derive(Deserialize)]
pub struct BillForm {
    pub month: String,
    pub amount: String,
    pub units: String,
    #[serde(rename = "dueDate")]
    pub due_date: String,
    #[serde(default)]
    pub notes: Option<String>,
}

impl BillForm {
    /// Binds the raw form strings to a bill stamped with `added_by` and now.
    pub fn bind(&self, added_by: &str) -> Result<Bill, ValidationError> {
        let amount: f64 = self
            .amount
            .trim()
            .parse()
            .map_err(|_| ValidationError::new("Please enter a valid amount."))?;

        let units: i64 = self
            .units
            .trim()
            .parse()
            .map_err(|_| ValidationError::new("Please enter a whole number of units."))?;

        let due_date = NaiveDate::parse_from_str(self.due_date.trim(), DUE_DATE_FORMAT)
            .map_err(|_| ValidationError::new("Due date must look like 2025-02-15."))?;

        Ok(Bill {
            month: self.month.trim().to_string(),
            amount,
            units,
            due_date,
            notes: self.notes.clone().unwrap_or_default(),
            created_at: Some(Utc::now()),
            added_by: Some(added_by.to_string()),
        })
    }
}

// POST /addBill
pub async fn post_add_bill(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<BillForm>,
) -> Response {
    let bill = match form
        .bind(&state.settings.added_by)
        .and_then(|b| bills_service::validate_bill(&b, &state.settings.validation).map(|_| b))
    {
        Ok(b) => b,
        Err(e) => {
            tracing::warn!(error = %e, "rejected bill submission");
            return redirect_with(&state, jar, Flash::error(format!("❌ Error adding bill: {e}")));
        }
    };

    let id = match bills_service::create_bill(&state, &bill).await {
        Ok(id) => id,
        Err(e) => {
            tracing::error!(error = %e, month = %bill.month, "could not store bill");
            return redirect_with(&state, jar, Flash::error(format!("❌ Error adding bill: {e}")));
        }
    };

    // delivery problems are logged by the dispatcher and never undo the write
    bills_service::announce_bill(&state, &bill).await;

    redirect_with(
        &state,
        jar,
        Flash::success(format!("✅ Bill added successfully! ID: {id}")),
    )
}

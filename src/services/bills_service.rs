use crate::{
    AppState,
    config::ValidationRules,
    error::{StoreError, ValidationError},
    models::Bill,
    services::notification_service::DispatchReport,
};

pub const BILLS_COLLECTION: &str = "bills";
pub const NEW_BILL_TITLE: &str = "New Electricity Bill Added";

pub fn validate_bill(bill: &Bill, rules: &ValidationRules) -> Result<(), ValidationError> {
    if bill.month.trim().is_empty() {
        return Err(ValidationError::new("Billing month is required."));
    }
    if !bill.amount.is_finite() {
        return Err(ValidationError::new("Amount must be a number."));
    }
    if rules.require_positive_amount && bill.amount <= 0.0 {
        return Err(ValidationError::new("Amount must be greater than 0."));
    }
    if rules.require_non_negative_units && bill.units < 0 {
        return Err(ValidationError::new("Units cannot be negative."));
    }
    Ok(())
}

/// Writes the bill as one document and returns its id.
pub async fn create_bill(state: &AppState, bill: &Bill) -> Result<String, StoreError> {
    let id = state
        .store
        .create_document(BILLS_COLLECTION, bill.to_fields())
        .await?;

    tracing::info!(%id, month = %bill.month, "bill added");
    Ok(id)
}

pub fn new_bill_message(bill: &Bill) -> (String, String) {
    let body = format!(
        "Your bill for {} is ready. Amount: ₹{:.2}",
        bill.month, bill.amount
    );
    (NEW_BILL_TITLE.to_string(), body)
}

/// Tells every registered device about the bill. Best effort.
pub async fn announce_bill(state: &AppState, bill: &Bill) -> DispatchReport {
    let (title, body) = new_bill_message(bill);
    let report = state.notifier.notify_all(&title, &body, &bill.month).await;

    tracing::info!(
        tokens = report.token_count,
        batches = report.batches.len(),
        delivered = report.delivered(),
        failed = report.failed_recipients.len(),
        "bill announcement finished"
    );
    report
}

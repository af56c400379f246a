use chrono::{DateTime, NaiveDate, Utc};

use crate::config::DEFAULT_ADDED_BY;

use super::document::{FieldValue, Fields};

/// An electricity bill as entered in the admin form.
#[derive(Debug, Clone, PartialEq)]
pub struct Bill {
    // billing period label, e.g. "January 2025"
    pub month: String,
    pub amount: f64,
    pub units: i64,
    pub due_date: NaiveDate,
    pub notes: String,

    pub created_at: Option<DateTime<Utc>>,
    pub added_by: Option<String>,
}

impl Bill {
    /// Store field map for the `bills` collection. Missing `created_at` and
    /// `added_by` fall back to now and the default creator label.
    pub fn to_fields(&self) -> Fields {
        let created_at = self.created_at.unwrap_or_else(Utc::now);
        let added_by = self
            .added_by
            .clone()
            .unwrap_or_else(|| DEFAULT_ADDED_BY.to_string());

        let mut fields = Fields::new();
        fields.insert("month".into(), self.month.as_str().into());
        fields.insert("amount".into(), self.amount.into());
        fields.insert("units".into(), self.units.into());
        fields.insert("dueDate".into(), due_date_timestamp(self.due_date));
        fields.insert("notes".into(), self.notes.as_str().into());
        fields.insert("createdAt".into(), created_at.into());
        fields.insert("addedBy".into(), added_by.into());
        fields
    }
}

fn due_date_timestamp(date: NaiveDate) -> FieldValue {
    FieldValue::Timestamp(date.and_time(chrono::NaiveTime::MIN).and_utc())
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn january() -> Bill {
        Bill {
            month: "January 2025".to_string(),
            amount: 1500.50,
            units: 320,
            due_date: NaiveDate::from_ymd_opt(2025, 2, 15).unwrap(),
            notes: String::new(),
            created_at: None,
            added_by: None,
        }
    }

    #[test]
    fn all_seven_fields_are_written() {
        let fields = january().to_fields();
        let keys: Vec<&str> = fields.keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            ["addedBy", "amount", "createdAt", "dueDate", "month", "notes", "units"]
        );
        assert_eq!(fields["amount"], FieldValue::Double(1500.50));
        assert_eq!(fields["units"], FieldValue::Integer(320));
        assert_eq!(fields["notes"], FieldValue::String(String::new()));
        assert_eq!(
            fields["dueDate"],
            FieldValue::Timestamp(Utc.with_ymd_and_hms(2025, 2, 15, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn defaults_fill_missing_metadata() {
        let before = Utc::now();
        let fields = january().to_fields();

        assert_eq!(fields["addedBy"].as_str(), Some("Admin"));
        match &fields["createdAt"] {
            FieldValue::Timestamp(t) => assert!(*t >= before),
            other => panic!("unexpected createdAt: {other:?}"),
        }
    }

    #[test]
    fn explicit_metadata_is_kept() {
        let at = Utc.with_ymd_and_hms(2025, 1, 31, 9, 30, 0).unwrap();
        let bill = Bill {
            created_at: Some(at),
            added_by: Some("Billing Desk".to_string()),
            ..january()
        };
        let fields = bill.to_fields();
        assert_eq!(fields["createdAt"], FieldValue::Timestamp(at));
        assert_eq!(fields["addedBy"].as_str(), Some("Billing Desk"));
    }
}

pub mod bill;
pub mod device_token;
pub mod document;

pub use bill::Bill;
pub use device_token::DeviceToken;
pub use document::{FieldValue, Fields};

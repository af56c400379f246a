pub mod credentials;
pub mod fcm;
pub mod firestore;

pub mod bills_service;
pub mod notification_service;

pub mod bills_controller;
pub mod home_controller;

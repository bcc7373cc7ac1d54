pub mod academics;
pub mod attendance;
pub mod core;
pub mod events;
pub mod fees;
pub mod front_office;
pub mod inventory;
pub mod library;
pub mod reports;
pub mod settings;
pub mod staff;
pub mod students;
pub mod transport;

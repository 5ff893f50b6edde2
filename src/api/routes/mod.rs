pub mod alerts;
pub mod control;
pub mod health;
pub mod history;
pub mod images;
pub mod status;

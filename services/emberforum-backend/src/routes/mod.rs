pub mod change_email;
pub mod confirmation;
pub mod health;
pub mod login;
pub mod register;
pub mod send_confirmation;

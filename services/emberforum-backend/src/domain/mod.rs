pub mod confirmation_token;
pub mod email_address;
pub mod events;
pub mod ports;
pub mod user;
pub mod user_credentials;
pub mod username;

pub use confirmation_token::ConfirmationToken;
pub use email_address::EmailAddress;
pub use events::{EventBus, EventHandler, UserEvent};
pub use user::{NewUser, User};
pub use user_credentials::Credentials;
pub use username::Username;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{EmailAddress, Username};

/// A registered forum member.
///
/// This core only reads users; mutation happens in the registration
/// endpoint and in the token redemption flow, which flips
/// `email_confirmed` and records the confirmed address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: Username,
    pub email: EmailAddress,
    pub email_confirmed: bool,
}

/// A not-yet-stored user, carrying validated fields only.
#[derive(Debug, Clone, PartialEq)]
pub struct NewUser {
    pub username: Username,
    pub email: EmailAddress,
}

impl TryFrom<RegistrationRequest> for NewUser {
    type Error = String;

    fn try_from(request: RegistrationRequest) -> Result<Self, Self::Error> {
        let RegistrationRequest {
            username,
            email,
            password: _,
        } = request;

        let username = Username::try_from(username)?;

        let email = EmailAddress::try_from(email)?;

        Ok(NewUser { username, email })
    }
}

/// This is the information sent by the user to sign up.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct RegistrationRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

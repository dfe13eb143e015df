use secrecy::SecretString;

/// Process-wide credentials, read once from the environment at startup and
/// immutable afterwards.
#[derive(Debug, Clone)]
pub struct GlobalArgs {
    pub jwt_secret: SecretString,
    pub twilio_account_sid: String,
    pub twilio_auth_token: SecretString,
    pub twilio_from: String,
}

impl GlobalArgs {
    #[must_use]
    pub fn new(
        jwt_secret: SecretString,
        twilio_account_sid: String,
        twilio_auth_token: SecretString,
        twilio_from: String,
    ) -> Self {
        Self {
            jwt_secret,
            twilio_account_sid,
            twilio_auth_token,
            twilio_from,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_global_args() {
        let args = GlobalArgs::new(
            SecretString::from("jwt-secret".to_string()),
            "AC00000000000000000000000000000000".to_string(),
            SecretString::from("twilio-token".to_string()),
            "+15550000000".to_string(),
        );

        assert_eq!(args.jwt_secret.expose_secret(), "jwt-secret");
        assert_eq!(args.twilio_from, "+15550000000");
    }
}

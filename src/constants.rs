pub mod limits {

    pub const USERNAME_MAX_LENGTH: usize = 150;

    pub const EMAIL_MAX_LENGTH: usize = 254;

    pub const SLUG_MAX_LENGTH: usize = 50;

    pub const SCORE_MIN: i32 = 1;

    pub const SCORE_MAX: i32 = 10;
}

pub mod auth {

    /// Reserved by the self-service profile endpoint.
    pub const RESERVED_USERNAME: &str = "me";

    pub const CONFIRMATION_MAIL_SUBJECT: &str = "Your confirmation code";
}

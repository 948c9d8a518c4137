pub mod access_token;
pub mod confirmation;
pub mod permissions;

pub use access_token::AccessTokens;
pub use confirmation::ConfirmationCodes;
pub use permissions::{
    Access, Action, evaluate_catalog, evaluate_content, evaluate_user_admin, may_change_role,
};

pub mod presentation_token;
pub mod user;
pub mod verification_record;

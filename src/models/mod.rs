pub mod assessment;
pub mod question;
pub mod submission;
pub mod type_policy;

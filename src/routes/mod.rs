pub mod assessments;
pub mod attempts;
pub mod health;

// Persisted data models
pub mod guild;

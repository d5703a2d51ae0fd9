// Storage models. Ids are UUID strings, timestamps RFC 3339 strings and
// nested documents are stored as JSON text.
pub mod user;
pub mod plan;
pub mod habit;
pub mod check_in;
pub mod subscription;
pub mod message;

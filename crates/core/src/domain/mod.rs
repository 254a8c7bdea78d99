pub mod commerce;
pub mod conversation;
pub mod lenient;

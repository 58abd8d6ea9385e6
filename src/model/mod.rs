//! Data model for harvested archives
//!
//! # Components
//!
//! - `MailingList`: case-insensitive list identifier, only used as an iteration key
//! - `MessageStub`: identity and thread-structure fields produced by the thread parser
//! - `MessageDetails`: optional fields extracted from a message detail page
//! - `Message`: a stub merged with its details, ready for the store

mod list;
mod message;

pub use list::MailingList;
pub use message::{Message, MessageDetails, MessageStub};

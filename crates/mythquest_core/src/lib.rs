pub mod chat;
pub mod domain;
pub mod memory;
pub mod ports;
pub mod progress;
pub mod quiz;
pub mod unlock;

pub use domain::{
    AuthSession, BioForm, BiographySection, Character, CharacterBio, ChatMessage, ChatRole,
    ChatSession, Question, User, UserCredentials,
};
pub use ports::{
    ChatTurn, ContentCatalog, IdentityStore, PortError, PortResult, ReplyGenerator, StateStore,
};

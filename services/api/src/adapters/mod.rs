pub mod content;
pub mod db;
pub mod reply_llm;

pub use content::FsContentCatalog;
pub use db::DbAdapter;
pub use reply_llm::OpenAiReplyAdapter;

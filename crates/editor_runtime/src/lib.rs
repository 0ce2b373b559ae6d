//! Editor runtime: the user-facing actions that tie the tab session to a storage root.
//!
//! [`EditorWorkspace`] owns the [`editor_session::TabSessionStore`], attaches a granted root
//! (starting the backup and file tree workers from `editor_sync`), and implements open, save,
//! file management and the streaming assistant on top of them.

pub mod assist;
pub mod error;
pub mod root;
pub mod workspace;

pub use assist::{
    run_assist, AssistConfig, AssistError, AssistFuture, ChatChunk, ChatRequest, ChatTransport,
    HttpChatTransport, NdjsonDecoder, ReplyStream, Selection, ASSIST_CONFIG_KEY,
    INSERT_PLACEHOLDER,
};
pub use error::EditorError;
pub use root::{StoredRoot, ROOT_KEY};
pub use workspace::{EditorWorkspace, DUPLICATE_SUFFIX};

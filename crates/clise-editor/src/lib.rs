pub mod commands;
pub mod config;
pub mod document;
pub mod engine;
pub mod error;
pub mod generate;
pub mod guides;
pub mod input;
pub mod interaction;
pub mod resize;
pub mod scheduler;
pub mod shortcuts;
pub mod tools;

pub use commands::{Command, CommandStack};
pub use config::EditorConfig;
pub use document::{Clipboard, Document};
pub use engine::CanvasEngine;
pub use error::EngineError;
pub use generate::{BulkGenerator, GeneratorOptions};
pub use input::{InputEvent, Modifiers, PointerButton};
pub use interaction::{Interaction, InteractionState, Response};
pub use shortcuts::{ShortcutAction, ShortcutMap};
pub use tools::ToolKind;

//! Typed feature wrappers over AgentBay remote tools.
//!
//! Every wrapper borrows a `ToolCaller` and maps its parameters into a
//! typed request:
//! - `Command` - Shell command execution
//! - `Code` - Python/JavaScript execution
//! - `FileSystem` - File and directory operations
//! - `Oss` - Object storage transfer
//! - `ApplicationManager`, `WindowManager`, `Computer` - Desktop control
//! - `Mobile` - Mobile device control

pub mod application;
pub mod code;
pub mod command;
pub mod computer;
pub mod filesystem;
pub mod mobile;
pub mod oss;
pub mod window;

#[cfg(test)]
pub(crate) mod mock;

pub use application::ApplicationManager;
pub use code::{Code, CodeLanguage};
pub use command::Command;
pub use computer::Computer;
pub use filesystem::FileSystem;
pub use mobile::Mobile;
pub use oss::Oss;
pub use window::WindowManager;

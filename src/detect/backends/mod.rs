mod stub;
#[cfg(feature = "backend-tract")]
mod tract;

pub use stub::ScriptedBackend;
#[cfg(feature = "backend-tract")]
pub use tract::TractBackend;

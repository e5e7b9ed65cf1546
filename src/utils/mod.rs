pub mod template;
pub mod threads;

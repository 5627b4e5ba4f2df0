pub mod encode;
pub mod variants;

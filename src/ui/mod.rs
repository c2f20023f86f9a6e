pub mod callbacks;
pub mod layout;
pub mod theme;

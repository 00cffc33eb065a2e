//! 渠道集成

#[cfg(feature = "whatsapp")]
pub mod whatsapp;

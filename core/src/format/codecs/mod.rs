//! format/codecs/mod.rs
//! Builtin codecs. Each module exposes `create_encoder` and/or
//! `create_decoder` for registration.

pub mod debug;
pub mod opl;
pub mod osmb;

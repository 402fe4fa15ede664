pub mod codec;
pub mod vbyte;

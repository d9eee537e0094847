//! Built-in allocation policy modules.

pub mod block;

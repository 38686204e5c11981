//! IO modules - side effects (network, filesystem)

pub mod checksums;
pub mod fetch;

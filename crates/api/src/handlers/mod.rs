pub mod conversion;
pub mod diagnostics;

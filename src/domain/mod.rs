// ============================================================
// Layer 3 - Domain Layer
// ============================================================
// Plain structs, enums and traits describing what the system
// works with. No SQL, HTTP, ONNX or plotting in here.

// A single air-quality observation and its numeric coercion rules
pub mod reading;

// The error taxonomy shared by every layer below the CLI
pub mod error;

// Capabilities the pipeline depends on abstractly
pub mod traits;

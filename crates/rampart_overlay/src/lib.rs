//! # rampart_overlay
//!
//! Typed overlays over loosely-typed configuration.
//!
//! Users write partial resource definitions that carry far more keys than any
//! typed model knows about. An [`Overlaid<T>`] decodes such a definition twice:
//! once into the typed schema `T`, once into a verbatim raw capture. Policy code
//! mutates the typed half; encoding deep-merges it back over the raw capture so
//! that every unmodeled key survives unchanged.
//!
//! ## Example
//!
//! ```rust
//! use rampart_overlay::Overlaid;
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, Default, Serialize, Deserialize)]
//! struct Bucket {
//!     #[serde(default, skip_serializing_if = "String::is_empty")]
//!     name: String,
//! }
//!
//! let mut bucket: Overlaid<Bucket> =
//!     Overlaid::decode(br#"{"name": "logs", "storageClass": "COLDLINE"}"#).unwrap();
//! bucket.typed_mut().name = "audit-logs".to_string();
//!
//! let encoded = bucket.to_value().unwrap();
//! assert_eq!(encoded["name"], "audit-logs");
//! assert_eq!(encoded["storageClass"], "COLDLINE");
//! ```

pub mod error;
pub mod merge;
pub mod overlay;

pub use error::{DecodeError, EncodeError, OverlayResult};
pub use merge::deep_merge;
pub use overlay::{is_default, Overlaid};

//! # talentpipe-mime
//!
//! MIME building blocks for attachment extraction from raw email:
//! header parsing, content types, transfer-encoding normalization,
//! and a boundary-scan recovery path for messages whose structured
//! fetch fails.
//!
//! ## Quick Start
//!
//! ```ignore
//! use talentpipe_mime::{
//!     recover_attachment, normalize_to_base64, ScanRules, ScanTarget,
//! };
//!
//! let target = ScanTarget {
//!     filename: Some("resume.pdf".to_string()),
//!     mime_type: "application/pdf".to_string(),
//! };
//! let segment = recover_attachment(&raw_message, &target, &ScanRules::default())?;
//! let payload = normalize_to_base64(segment.body.as_bytes(), segment.encoding)?;
//! ```

pub mod content_type;
pub mod encoding;
pub mod error;
pub mod header;
pub mod rawscan;
pub mod transfer;

pub use content_type::ContentType;
pub use encoding::{decode_base64, decode_header_text, decode_quoted_printable, encode_base64};
pub use error::{Error, Result};
pub use header::{Headers, extract_boundary, parse_mailbox, split_headers_body};
pub use rawscan::{
    MatchRule, RecoveredSegment, RecoveryPath, ScanRules, ScanTarget, recover_attachment,
};
pub use transfer::{TransferEncoding, decode_body, normalize_to_base64};

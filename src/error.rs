//! # Builder Error Taxonomy
//!
//! Every failure the encoder can hit is one of the kinds below. All of them
//! are fatal: the top-level build removes the output ISO and any temporary
//! files, then surfaces the error. Nothing retries internally.
//!
//! The kinds are carried as a typed [`BuildError`] inside `eyre::Report` so
//! call sites keep the crate-wide `eyre::Result` flow while callers (and the
//! integration tests) can recover the kind with `downcast_ref::<BuildError>()`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BuildError {
    /// The upstream record stream ended without a terminating `End` record.
    #[error("record stream ended mid-region without an End record")]
    InputExhausted,

    /// A single parcel payload exceeded the 32-bit length field.
    #[error("parcel payload of {len} bytes exceeds the 32-bit length limit")]
    PayloadOverflow { len: u64 },

    /// The region size-class table is full and no class fits the payload.
    #[error("size-class table exhausted ({classes} entries) for a {len}-byte payload")]
    PayloadTooLarge { len: usize, classes: usize },

    /// Two roads carried the same OSM way id.
    #[error("duplicate way id {way_id} in B+-tree input")]
    DuplicateWayId { way_id: u64 },

    /// A region produced no parcels or a degenerate bounding box.
    #[error("region {region:?} has no road parcels or a degenerate bounding box")]
    BboxInvalid { region: String },

    /// Filesystem I/O failed underneath the builder.
    #[error("write failed: {0}")]
    WriteFailed(#[from] std::io::Error),

    /// Post-build self-verification found a mismatch.
    #[error("verification failed: {detail}")]
    VerificationFailed { detail: String },

    /// The caller signalled cancellation.
    #[error("build cancelled by caller")]
    Cancelled,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_survive_eyre_downcast() {
        let report = eyre::Report::new(BuildError::DuplicateWayId { way_id: 7 });
        let kind = report.downcast_ref::<BuildError>().unwrap();
        assert!(matches!(kind, BuildError::DuplicateWayId { way_id: 7 }));
    }

    #[test]
    fn messages_name_the_offending_value() {
        let err = BuildError::PayloadTooLarge {
            len: 9000,
            classes: 255,
        };
        assert!(err.to_string().contains("9000"));
        assert!(err.to_string().contains("255"));
    }
}

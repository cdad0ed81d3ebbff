//! Status helper enums mapping to SMALLINT lookup tables.
//!
//! Each enum variant's discriminant matches the seed data order (1-based)
//! in the corresponding lookup table (`job_statuses`, `job_stages`,
//! `purchase_statuses`, `purchase_tiers`). On the wire every enum is
//! serialized as its snake_case name.

use crate::error::CoreError;

/// Status ID type matching SMALLINT in the database.
pub type StatusId = i16;

macro_rules! define_status_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $val:expr => $label:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[repr(i16)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum $name {
            $( $(#[$vmeta])* $variant = $val ),+
        }

        impl $name {
            /// Every variant in discriminant order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Return the database status ID.
            pub fn id(self) -> StatusId {
                self as StatusId
            }

            /// Look up a variant by its database ID.
            pub fn from_id(id: StatusId) -> Option<Self> {
                Self::ALL.iter().copied().find(|v| v.id() == id)
            }

            /// The snake_case wire name.
            pub fn as_str(self) -> &'static str {
                match self {
                    $( $name::$variant => $label ),+
                }
            }

            /// Parse a snake_case wire name.
            pub fn parse(value: &str) -> Option<Self> {
                match value {
                    $( $label => Some($name::$variant), )+
                    _ => None,
                }
            }
        }

        impl From<$name> for StatusId {
            fn from(value: $name) -> Self {
                value as StatusId
            }
        }

        impl TryFrom<StatusId> for $name {
            type Error = CoreError;

            fn try_from(id: StatusId) -> Result<Self, Self::Error> {
                Self::from_id(id).ok_or_else(|| {
                    CoreError::Internal(format!(
                        "Unknown {} id {id}",
                        stringify!($name)
                    ))
                })
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl serde::Serialize for $name {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> serde::Deserialize<'de> for $name {
            fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                Self::parse(&raw).ok_or_else(|| {
                    serde::de::Error::custom(format!(
                        "unknown {} '{raw}'",
                        stringify!($name)
                    ))
                })
            }
        }
    };
}

define_status_enum! {
    /// Coarse job lifecycle status.
    JobStatus {
        Pending = 1 => "pending",
        Processing = 2 => "processing",
        Completed = 3 => "completed",
        Failed = 4 => "failed",
    }
}

define_status_enum! {
    /// Fine-grained processing stage. Discriminants follow the forward
    /// order of the pipeline, so `Ord` compares pipeline position.
    JobStage {
        Validating = 1 => "validating",
        Generating = 2 => "generating",
        FirstReady = 3 => "first_ready",
        Storing = 4 => "storing",
        Watermarking = 5 => "watermarking",
        Complete = 6 => "complete",
        Failed = 7 => "failed",
    }
}

define_status_enum! {
    /// Payment outcome of a purchase.
    PurchaseStatus {
        Pending = 1 => "pending",
        Completed = 2 => "completed",
        Failed = 3 => "failed",
        Refunded = 4 => "refunded",
    }
}

define_status_enum! {
    /// What a purchase unlocks.
    PurchaseTier {
        /// Exactly one variant (by index, or the primary result).
        Single = 1 => "single",
        /// Every variant under the job.
        All = 2 => "all",
    }
}

impl JobStatus {
    /// Completed and failed jobs never change status again.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl JobStage {
    /// The stage that must directly follow `current` in the forward order.
    ///
    /// `None` (no stage yet, i.e. pending) is followed by `Validating`.
    /// Terminal stages have no successor.
    pub fn successor(current: Option<JobStage>) -> Option<JobStage> {
        match current {
            None => Some(JobStage::Validating),
            Some(JobStage::Validating) => Some(JobStage::Generating),
            Some(JobStage::Generating) => Some(JobStage::FirstReady),
            Some(JobStage::FirstReady) => Some(JobStage::Storing),
            Some(JobStage::Storing) => Some(JobStage::Watermarking),
            Some(JobStage::Watermarking) => Some(JobStage::Complete),
            Some(JobStage::Complete) | Some(JobStage::Failed) => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, JobStage::Complete | JobStage::Failed)
    }

    /// Stages during which variant results may still arrive.
    pub fn accepts_variants(self) -> bool {
        matches!(
            self,
            JobStage::Generating | JobStage::FirstReady | JobStage::Storing | JobStage::Watermarking
        )
    }
}

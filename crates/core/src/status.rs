//! Status enums mapping to SMALLINT lookup tables, plus provider status
//! string parsing.
//!
//! Each enum variant's discriminant matches the seed data order (1-based)
//! in the corresponding `*_statuses` database table. The variants are
//! closed sets; transitions between them happen only through the guarded
//! repository updates in `atelier-db`.

/// Status ID type matching SMALLINT/SMALLSERIAL in the database.
pub type StatusId = i16;

macro_rules! define_status_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $val:expr ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[repr(i16)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum $name {
            $( $(#[$vmeta])* $variant = $val ),+
        }

        impl $name {
            /// Return the database status ID.
            pub fn id(self) -> StatusId {
                self as StatusId
            }

            /// Map a database status ID back to the enum.
            ///
            /// Returns `None` for IDs outside the lookup table. Rows read
            /// from the database always map, since `status_id` columns
            /// reference the seeded lookup tables.
            pub fn from_id(id: StatusId) -> Option<Self> {
                match id {
                    $( $val => Some(Self::$variant), )+
                    _ => None,
                }
            }
        }

        impl From<$name> for StatusId {
            fn from(value: $name) -> Self {
                value as StatusId
            }
        }
    };
}

define_status_enum! {
    /// Personalization-model training lifecycle status.
    ///
    /// "No model" is represented by the absence of a `training_jobs` row,
    /// not by a status value. `Stale` is entered from `Ready` when the
    /// training photo set changes, and left only via an explicit reset.
    TrainingStatus {
        Training = 1,
        Ready = 2,
        Failed = 3,
        Canceled = 4,
        Stale = 5,
    }
}

define_status_enum! {
    /// Generation job (parent) status, always recomputed from the full
    /// unit set.
    GenerationJobStatus {
        Queued = 1,
        Running = 2,
        Succeeded = 3,
        SucceededPartial = 4,
        Failed = 5,
        Canceled = 6,
    }
}

define_status_enum! {
    /// Generation unit (single prediction) status, mirroring the
    /// provider's unit status.
    GenerationUnitStatus {
        Queued = 1,
        Running = 2,
        Succeeded = 3,
        Failed = 4,
        Canceled = 5,
    }
}

impl TrainingStatus {
    /// Whether this status is terminal for the training run itself.
    ///
    /// Everything except `Training` is settled: a terminal status never
    /// moves back to `Training` except through an explicit reset that
    /// deletes the row.
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Training)
    }

    /// Wire name, matching the lookup-table seed data.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Training => "training",
            Self::Ready => "ready",
            Self::Failed => "failed",
            Self::Canceled => "canceled",
            Self::Stale => "stale",
        }
    }
}

impl GenerationJobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Succeeded | Self::SucceededPartial | Self::Failed | Self::Canceled
        )
    }

    /// Wire name, matching the lookup-table seed data.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Succeeded => "succeeded",
            Self::SucceededPartial => "succeeded_partial",
            Self::Failed => "failed",
            Self::Canceled => "canceled",
        }
    }
}

impl GenerationUnitStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Canceled)
    }

    /// Wire name, matching the lookup-table seed data.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Canceled => "canceled",
        }
    }

    /// Map a provider status string onto the unit status.
    ///
    /// Returns `None` for statuses this system does not track (unknown
    /// strings, provider-internal phases). Callers treat `None` as a
    /// no-op rather than an error so new provider phases cannot break
    /// reconciliation.
    pub fn from_provider(status: &str) -> Option<Self> {
        match status {
            "starting" | "processing" => Some(Self::Running),
            "succeeded" => Some(Self::Succeeded),
            "failed" => Some(Self::Failed),
            "canceled" | "cancelled" => Some(Self::Canceled),
            _ => None,
        }
    }
}

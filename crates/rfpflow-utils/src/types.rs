use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use strum::VariantNames;

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl $name {
            /// Returns the raw numeric identifier.
            #[must_use]
            pub const fn get(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u64> for $name {
            fn from(raw: u64) -> Self {
                Self(raw)
            }
        }
    };
}

entity_id!(
    /// Identifier of an RFP record.
    RfpId
);
entity_id!(
    /// Identifier of a vendor in the read-only vendor directory.
    VendorId
);
entity_id!(
    /// Identifier of a configured AI provider.
    ProviderId
);
entity_id!(
    /// Identifier of a stored prompt template.
    PromptId
);
entity_id!(
    /// Identifier of a technical proposal.
    ProposalId
);
entity_id!(
    /// Identifier of a service-scope entry.
    ScopeId
);
entity_id!(
    /// Identifier of an uploaded source document.
    FileId
);

/// Generation stages of the RFP pipeline.
///
/// Each stage is independently re-triggerable. The stage engine allows at most
/// one in-flight run per `(RfpId, StageId)` pair.
///
/// ```text
/// Analysis ─┬─> VendorMatch
///           ├─> Bom
///           ├─> Scope
///           └─> Proposal
/// ```
///
/// Every stage other than `Analysis` requires the RFP to have been analyzed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[derive(strum::VariantNames)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum StageId {
    /// Textual analysis of the uploaded source documents.
    Analysis,
    /// Vendor-fit scoring against the vendor roster.
    VendorMatch,
    /// Bill-of-materials extraction.
    Bom,
    /// Service-scope suggestion.
    Scope,
    /// Technical-proposal composition.
    Proposal,
}

impl StageId {
    /// All stages in pipeline order.
    pub const ALL: [Self; 5] = [
        Self::Analysis,
        Self::VendorMatch,
        Self::Bom,
        Self::Scope,
        Self::Proposal,
    ];

    /// Canonical lowercase name used in logs, config keys and error messages.
    ///
    /// ```rust
    /// use rfpflow_utils::types::StageId;
    ///
    /// assert_eq!(StageId::VendorMatch.as_str(), "vendor_match");
    /// ```
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Analysis => "analysis",
            Self::VendorMatch => "vendor_match",
            Self::Bom => "bom",
            Self::Scope => "scope",
            Self::Proposal => "proposal",
        }
    }

    /// Minimum RFP status required before this stage may run.
    #[must_use]
    pub const fn required_status(&self) -> RfpStatus {
        match self {
            Self::Analysis => RfpStatus::DocumentReceived,
            Self::VendorMatch | Self::Bom | Self::Scope | Self::Proposal => RfpStatus::Analyzed,
        }
    }

    /// Status reached once this stage's artifact is persisted.
    ///
    /// For scope that is an accepted entry, not the drafted suggestion.
    #[must_use]
    pub const fn completed_status(&self) -> RfpStatus {
        match self {
            Self::Analysis => RfpStatus::Analyzed,
            Self::VendorMatch => RfpStatus::VendorsMatched,
            Self::Bom => RfpStatus::BomGenerated,
            Self::Scope => RfpStatus::ScopeDrafted,
            Self::Proposal => RfpStatus::ProposalGenerated,
        }
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StageId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "analysis" | "analyze" => Ok(Self::Analysis),
            "vendor_match" | "vendor-match" | "vendors" => Ok(Self::VendorMatch),
            "bom" => Ok(Self::Bom),
            "scope" => Ok(Self::Scope),
            "proposal" => Ok(Self::Proposal),
            other => Err(format!(
                "Unknown stage '{other}'. Available stages: {}",
                Self::VARIANTS.join(", ")
            )),
        }
    }
}

/// Soft progress marker of an RFP through the pipeline.
///
/// Variants are declared in pipeline order so that the derived `Ord` doubles
/// as the progress order. Status never moves backward: [`RfpStatus::advance`]
/// keeps the maximum of the current and the reached status.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[derive(strum::VariantNames)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RfpStatus {
    #[default]
    New,
    DocumentReceived,
    Analyzed,
    VendorsMatched,
    #[serde(rename = "bom_generated")]
    BomGenerated,
    ScopeDrafted,
    ProposalGenerated,
}

impl RfpStatus {
    /// Returns the status after reaching `reached`, never moving backward.
    #[must_use]
    pub fn advance(self, reached: Self) -> Self {
        self.max(reached)
    }

    /// Whether this status satisfies the given minimum.
    #[must_use]
    pub fn at_least(self, minimum: Self) -> bool {
        self >= minimum
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::DocumentReceived => "document_received",
            Self::Analyzed => "analyzed",
            Self::VendorsMatched => "vendors_matched",
            Self::BomGenerated => "bom_generated",
            Self::ScopeDrafted => "scope_drafted",
            Self::ProposalGenerated => "proposal_generated",
        }
    }
}

impl fmt::Display for RfpStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

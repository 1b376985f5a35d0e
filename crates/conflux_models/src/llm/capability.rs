//! Capability tags advertised by models.

use bitflags::bitflags;
use core::fmt;
use serde::{Deserialize, Serialize};

/// An operation class a model can serve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Capability {
    /// One-shot text generation (`do_generate`).
    TextGeneration,
    /// Incremental generation (`do_stream`).
    Streaming,
    /// Batch embeddings (`do_embed`).
    Embedding,
    /// Native schema-constrained output.
    ObjectGeneration,
}

impl Capability {
    const ALL: [Capability; 4] = [
        Capability::TextGeneration,
        Capability::Streaming,
        Capability::Embedding,
        Capability::ObjectGeneration,
    ];

    /// The single-flag set for this capability.
    #[must_use]
    pub const fn flag(self) -> CapabilitySet {
        match self {
            Capability::TextGeneration => CapabilitySet::TEXT_GENERATION,
            Capability::Streaming => CapabilitySet::STREAMING,
            Capability::Embedding => CapabilitySet::EMBEDDING,
            Capability::ObjectGeneration => CapabilitySet::OBJECT_GENERATION,
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Capability::TextGeneration => "text-generation",
            Capability::Streaming => "streaming",
            Capability::Embedding => "embedding",
            Capability::ObjectGeneration => "object-generation",
        })
    }
}

bitflags! {
    /// A set of [`Capability`] values.
    ///
    /// ```
    /// use conflux_models::llm::{Capability, CapabilitySet};
    ///
    /// let caps = CapabilitySet::TEXT.with(Capability::Streaming);
    /// assert!(caps.supports(Capability::Streaming));
    /// assert!(!caps.supports(Capability::Embedding));
    /// ```
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
    pub struct CapabilitySet: u8 {
        /// See [`Capability::TextGeneration`].
        const TEXT_GENERATION = 1;
        /// See [`Capability::Streaming`].
        const STREAMING = 1 << 1;
        /// See [`Capability::Embedding`].
        const EMBEDDING = 1 << 2;
        /// See [`Capability::ObjectGeneration`].
        const OBJECT_GENERATION = 1 << 3;
    }
}

impl CapabilitySet {
    /// No capabilities.
    pub const EMPTY: Self = Self::empty();
    /// Text generation only.
    pub const TEXT: Self = Self::TEXT_GENERATION;
    /// Text generation and streaming.
    pub const CHAT: Self = Self::TEXT_GENERATION.union(Self::STREAMING);

    /// Builds a set from a list of capabilities.
    #[must_use]
    pub fn of(capabilities: &[Capability]) -> Self {
        capabilities.iter().map(|capability| capability.flag()).collect()
    }

    /// Returns a copy of this set including `capability`.
    #[must_use]
    pub const fn with(self, capability: Capability) -> Self {
        self.union(capability.flag())
    }

    /// Returns a copy of this set without `capability`.
    #[must_use]
    pub const fn without(self, capability: Capability) -> Self {
        self.difference(capability.flag())
    }

    /// Returns whether `capability` is advertised.
    #[must_use]
    pub const fn supports(self, capability: Capability) -> bool {
        self.contains(capability.flag())
    }

    /// Iterates the advertised capabilities.
    pub fn capabilities(self) -> impl Iterator<Item = Capability> {
        Capability::ALL
            .into_iter()
            .filter(move |capability| self.supports(*capability))
    }
}

impl From<Capability> for CapabilitySet {
    fn from(capability: Capability) -> Self {
        capability.flag()
    }
}
